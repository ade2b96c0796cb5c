#![no_main]

use fsweep::config::validate::{MAX_SIZE_BYTES, validate_size_range};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|input: (&str, &str)| {
    // Any accepted range must be ordered and within the ceiling
    if let Ok(Some(range)) = validate_size_range(Some(input.0), Some(input.1)) {
        assert!(range.min <= range.max);
        assert!(range.max >= 1);
        assert!(range.max <= MAX_SIZE_BYTES);
    }
});
