use std::io::{self, Read};

/// Check if content appears to be binary
pub fn is_binary(content: &[u8]) -> bool {
    let sample_size = content.len().min(8192);
    let sample = &content[..sample_size];

    // Check for null bytes
    let null_count = sample.iter().filter(|&&b| b == 0).count();
    if null_count > sample_size / 10 {
        return true;
    }

    let non_text_count = sample
        .iter()
        .filter(|&&b| b < 0x20 && b != b'\n' && b != b'\r' && b != b'\t')
        .count();

    non_text_count > sample_size / 8
}

/// Read at most `limit` bytes and decode them as text.
///
/// Returns `Ok(None)` for binary content. Invalid UTF-8 sequences are
/// replaced rather than rejected, so a truncated multibyte character at the
/// cut does not hide the rest of the file.
pub fn read_text(reader: impl Read, limit: u64) -> io::Result<Option<String>> {
    let mut buf = Vec::new();
    reader.take(limit).read_to_end(&mut buf)?;
    if is_binary(&buf) {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
}
