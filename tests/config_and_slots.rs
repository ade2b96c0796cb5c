//! Validator properties, draft building and slot persistence.

use chrono::NaiveDate;
use fsweep::config::validate::{
    MAX_SIZE_BYTES, validate_config, validate_date_range_on, validate_size_range,
};
use fsweep::config::{
    ConfigDraft, DateField, MatchDefaults, MatchMethod, MethodChoice, SearchConfig, TargetType,
    ThreadPool, ValidationReason,
};
use fsweep::slots::{SLOTS_FILE, SlotError, SlotStore};
use std::sync::Arc;
use std::thread;

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
}

#[test]
fn test_size_range_properties() {
    let cases: &[(i64, i64, Option<ValidationReason>)] = &[
        (0, 1, None),
        (5, 5, None),
        (6, 5, Some(ValidationReason::RangeInverted)),
        (-1, 5, Some(ValidationReason::NegativeValue)),
        (0, 0, Some(ValidationReason::NegativeValue)),
        (0, MAX_SIZE_BYTES as i64, None),
        (0, MAX_SIZE_BYTES as i64 + 1, Some(ValidationReason::TooLarge)),
    ];
    for (min, max, expected) in cases {
        let got = validate_size_range(Some(&min.to_string()), Some(&max.to_string()))
            .err()
            .map(|e| e.reason);
        assert_eq!(&got, expected, "min={min} max={max}");
    }
}

#[test]
fn test_date_range_properties() {
    let fmt = |d: NaiveDate| d.format("%Y-%m-%d").to_string();
    let base = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

    for offset in 1..30 {
        let start = base + chrono::Duration::days(offset);
        let end = base;
        let err = validate_date_range_on(
            Some(&fmt(start)),
            Some(&fmt(end)),
            DateField::Modified,
            today(),
        )
        .unwrap_err();
        assert_eq!(err.reason, ValidationReason::RangeInverted);
    }

    let tomorrow = today().succ_opt().unwrap();
    for (start, end) in [(today(), tomorrow), (tomorrow, tomorrow)] {
        let err = validate_date_range_on(
            Some(&fmt(start)),
            Some(&fmt(end)),
            DateField::Created,
            today(),
        )
        .unwrap_err();
        assert_eq!(err.reason, ValidationReason::FutureDate);
    }

    assert!(
        validate_date_range_on(Some(&fmt(today())), Some(&fmt(today())), DateField::Modified, today())
            .is_ok()
    );
}

#[test]
fn test_draft_output_passes_config_validation() {
    let mut draft = ConfigDraft::new("IMG_\\d+", MethodChoice::Regex);
    draft.target = TargetType::FilesOnly;
    draft.use_file_types = true;
    draft.file_types = "jpg jpeg".into();
    draft.use_modified_date = true;
    draft.modified_start = "2023-01-01".into();
    draft.modified_end = "2023-12-31".into();
    draft.use_created_date = true;
    draft.created_start = "2022-01-01".into();
    draft.created_end = "2023-12-31".into();
    draft.use_thread_pool = true;
    draft.threads = "2".into();

    let config = draft.build(&MatchDefaults::default()).unwrap();
    assert!(validate_config(&config).is_ok());
    assert_eq!(config.thread_pool, ThreadPool::Custom { threads: 2 });
}

fn sample_config() -> SearchConfig {
    let mut draft = ConfigDraft::new("budget", MethodChoice::Jaccard);
    draft.min_similarity = Some(0.7);
    draft.use_size = true;
    draft.size_min = "1KB".into();
    draft.size_max = "10MB".into();
    draft.use_owner = true;
    draft.owner = "alice".into();
    draft.use_content = true;
    draft.content_pattern = "Q3".into();
    draft.batch_results = true;
    draft.build(&MatchDefaults::default()).unwrap()
}

#[test]
fn test_slot_round_trip_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(SLOTS_FILE);
    let config = sample_config();

    {
        let store = SlotStore::open(&path).unwrap();
        store.save("finance", &config).unwrap();
        store.save("everything", &SearchConfig::new(MatchMethod::Regex { pattern: ".*".into() })).unwrap();
    }

    let store = SlotStore::open(&path).unwrap();
    assert_eq!(store.list(), vec!["finance", "everything"]);
    assert_eq!(store.load("finance").unwrap(), config);

    store.delete("finance").unwrap();
    assert!(matches!(store.load("finance"), Err(SlotError::NotFound(_))));
    assert_eq!(SlotStore::open(&path).unwrap().list(), vec!["everything"]);
}

#[test]
fn test_concurrent_saves_all_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(SLOTS_FILE);
    let store = Arc::new(SlotStore::open(&path).unwrap());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                let config = SearchConfig::new(MatchMethod::Default {
                    pattern: format!("p{i}"),
                });
                store.save(&format!("slot{i}"), &config).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let reopened = SlotStore::open(&path).unwrap();
    let mut names = reopened.list();
    names.sort();
    assert_eq!(names.len(), 8);
    assert_eq!(reopened.load("slot5").unwrap().matching.pattern(), "p5");
}
