#![no_main]

use libfuzzer_sys::fuzz_target;

use graphpost::logging::redact::{redact_string, Redacted};

fuzz_target!(|data: &str| {
    // Error text is redacted before it reaches item outputs and logs.
    // libFuzzer's per-input timeout catches catastrophic backtracking.
    let redacted = redact_string(data);

    // The Display wrapper must agree with the function.
    assert_eq!(Redacted(data).to_string(), redacted);
});
