//! Property filters applied to each candidate before matching.

use crate::config::{DateField, PropertyFilters};
use crate::platform::FileMetadata;
use crate::tree::FolderNode;
use chrono::{DateTime, Utc};

/// Why an entry was left out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Size,
    Date(DateField),
    Owner,
    Extension,
}

/// Calendar day of a timestamp, in UTC.
fn day_of(at: DateTime<Utc>) -> chrono::NaiveDate {
    at.date_naive()
}

/// Lowercase extension of a file name, if it has one.
pub fn extension_of(name: &str) -> Option<String> {
    match name.rfind('.') {
        Some(0) | None => None,
        Some(pos) if pos + 1 < name.len() => Some(name[pos + 1..].to_lowercase()),
        Some(_) => None,
    }
}

/// Check one entry against the configured filters.
///
/// Size and extension filters apply to files only; date and owner filters
/// apply to files and folders. A missing timestamp passes the date filter,
/// a missing owner fails the owner filter. `meta` may be `None` only when
/// [`PropertyFilters::needs_metadata`] is false.
pub fn check(
    filters: &PropertyFilters,
    node: &FolderNode,
    meta: Option<&FileMetadata>,
) -> Result<(), Rejection> {
    let is_file = !node.is_dir();

    if let Some(extensions) = &filters.extensions {
        if is_file {
            let accepted = extension_of(&node.name).is_some_and(|ext| extensions.contains(&ext));
            if !accepted {
                return Err(Rejection::Extension);
            }
        }
    }

    let Some(meta) = meta else {
        return Ok(());
    };

    if let Some(size) = filters.size {
        if is_file && !size.contains(meta.size_bytes) {
            return Err(Rejection::Size);
        }
    }

    for field in [DateField::Created, DateField::Modified] {
        let Some(range) = filters.date_range(field) else {
            continue;
        };
        let stamp = match field {
            DateField::Created => meta.created_at,
            DateField::Modified => meta.modified_at,
        };
        if stamp.is_some_and(|stamp| !range.contains(day_of(stamp))) {
            return Err(Rejection::Date(field));
        }
    }

    if let Some(wanted) = &filters.owner {
        let wanted = wanted.to_lowercase();
        let owned = meta
            .owner
            .as_deref()
            .is_some_and(|owner| owner.to_lowercase().contains(&wanted));
        if !owned {
            return Err(Rejection::Owner);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DateRange, SizeRange};
    use crate::tree::NodeKind;
    use chrono::{NaiveDate, TimeZone};
    use std::path::PathBuf;

    fn file(name: &str) -> FolderNode {
        FolderNode {
            name: name.to_string(),
            path: PathBuf::from("/vol").join(name),
            kind: NodeKind::File,
        }
    }

    fn dir(name: &str) -> FolderNode {
        FolderNode {
            kind: NodeKind::Directory,
            ..file(name)
        }
    }

    fn meta(size: u64) -> FileMetadata {
        FileMetadata {
            size_bytes: size,
            modified_at: Some(Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap()),
            created_at: Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()),
            owner: Some("Alice".to_string()),
            is_symlink: false,
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.TXT").as_deref(), Some("txt"));
        assert_eq!(extension_of("a.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of(".bashrc"), None);
        assert_eq!(extension_of("trailing."), None);
        assert_eq!(extension_of("Makefile"), None);
    }

    #[test]
    fn test_no_filters_pass() {
        assert_eq!(check(&PropertyFilters::default(), &file("x"), None), Ok(()));
    }

    #[test]
    fn test_extension_files_only() {
        let filters = PropertyFilters {
            extensions: Some(["rs".to_string(), "md".to_string()].into()),
            ..PropertyFilters::default()
        };
        assert_eq!(check(&filters, &file("main.RS"), None), Ok(()));
        assert_eq!(check(&filters, &file("main.c"), None), Err(Rejection::Extension));
        assert_eq!(check(&filters, &file("Makefile"), None), Err(Rejection::Extension));
        assert_eq!(check(&filters, &dir("src"), None), Ok(()));
    }

    #[test]
    fn test_size_inclusive_and_files_only() {
        let filters = PropertyFilters {
            size: Some(SizeRange { min: 10, max: 20 }),
            ..PropertyFilters::default()
        };
        assert_eq!(check(&filters, &file("a"), Some(&meta(10))), Ok(()));
        assert_eq!(check(&filters, &file("a"), Some(&meta(20))), Ok(()));
        assert_eq!(check(&filters, &file("a"), Some(&meta(21))), Err(Rejection::Size));
        assert_eq!(check(&filters, &dir("d"), Some(&meta(4096))), Ok(()));
    }

    #[test]
    fn test_date_truncated_to_day() {
        let mut filters = PropertyFilters {
            modified: Some(DateRange {
                start: day(2024, 3, 1),
                end: day(2024, 3, 10),
            }),
            ..PropertyFilters::default()
        };
        // 23:59:59 on the last day still counts
        assert_eq!(check(&filters, &file("a"), Some(&meta(0))), Ok(()));

        filters.modified = None;
        filters.created = Some(DateRange {
            start: day(2024, 3, 1),
            end: day(2024, 3, 10),
        });
        assert_eq!(
            check(&filters, &dir("d"), Some(&meta(0))),
            Err(Rejection::Date(DateField::Created))
        );

        let mut undated = meta(0);
        undated.created_at = None;
        assert_eq!(check(&filters, &file("a"), Some(&undated)), Ok(()));
    }

    #[test]
    fn test_created_and_modified_both_apply() {
        let mut filters = PropertyFilters {
            created: Some(DateRange {
                start: day(2022, 12, 1),
                end: day(2023, 1, 31),
            }),
            modified: Some(DateRange {
                start: day(2024, 3, 1),
                end: day(2024, 3, 31),
            }),
            ..PropertyFilters::default()
        };
        assert_eq!(check(&filters, &file("a"), Some(&meta(0))), Ok(()));

        // Each range is checked against its own timestamp
        filters.modified = Some(DateRange {
            start: day(2023, 1, 1),
            end: day(2023, 1, 1),
        });
        assert_eq!(
            check(&filters, &file("a"), Some(&meta(0))),
            Err(Rejection::Date(DateField::Modified))
        );

        filters.modified = Some(DateRange {
            start: day(2024, 3, 1),
            end: day(2024, 3, 31),
        });
        filters.created = Some(DateRange {
            start: day(2024, 3, 1),
            end: day(2024, 3, 31),
        });
        assert_eq!(
            check(&filters, &file("a"), Some(&meta(0))),
            Err(Rejection::Date(DateField::Created))
        );
    }

    #[test]
    fn test_owner_case_insensitive_substring() {
        let filters = PropertyFilters {
            owner: Some("LIC".to_string()),
            ..PropertyFilters::default()
        };
        assert_eq!(check(&filters, &file("a"), Some(&meta(0))), Ok(()));

        let mut unknown = meta(0);
        unknown.owner = None;
        assert_eq!(check(&filters, &file("a"), Some(&unknown)), Err(Rejection::Owner));
    }
}
