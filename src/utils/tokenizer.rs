use rustc_hash::FxHashSet;

/// Maximum token length to store in a name index.
/// Longer runs are hashes or generated names nobody types.
const MAX_TOKEN_LENGTH: usize = 64;

/// Split a file name (or a query) into lowercase word tokens.
///
/// Handles snake_case, kebab-case, dotted names and camelCase:
/// `"getUserById.rs"` yields `get`, `user`, `by`, `id`, `rs`.
/// Non-ASCII letters and digits are kept inside tokens.
pub fn name_tokens(name: &str) -> FxHashSet<String> {
    let mut tokens = FxHashSet::default();
    let mut current = String::new();
    let mut prev = CharType::Other;

    for ch in name.chars() {
        let char_type = classify_char(ch);

        match char_type {
            CharType::Lower | CharType::Digit => current.push(ch),
            CharType::Upper => {
                if prev == CharType::Lower && !current.is_empty() {
                    add_token(&mut tokens, &current);
                    current.clear();
                }
                current.extend(ch.to_lowercase());
            }
            CharType::Other => {
                if !current.is_empty() {
                    add_token(&mut tokens, &current);
                    current.clear();
                }
            }
        }

        prev = char_type;
    }

    if !current.is_empty() {
        add_token(&mut tokens, &current);
    }

    tokens
}

/// Tokens of a query in a stable order
pub fn tokenize_query(query: &str) -> Vec<String> {
    let mut result: Vec<_> = name_tokens(query).into_iter().collect();
    result.sort();
    result
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CharType {
    Upper,
    Lower,
    Digit,
    Other,
}

fn classify_char(ch: char) -> CharType {
    if ch.is_uppercase() {
        CharType::Upper
    } else if ch.is_alphabetic() {
        CharType::Lower
    } else if ch.is_numeric() {
        CharType::Digit
    } else {
        CharType::Other
    }
}

fn add_token(tokens: &mut FxHashSet<String>, token: &str) {
    if token.chars().count() <= MAX_TOKEN_LENGTH {
        tokens.insert(token.to_string());
    }
}
