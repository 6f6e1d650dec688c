#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::Value;

use graphpost::publish::poll::{classify_token, ContainerStatus, StatusSnapshot};

fuzz_target!(|data: &[u8]| {
    // Arbitrary status responses must classify without panicking, and an
    // ERROR verdict on any field must win over READY.
    let Ok(response) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let snapshot = StatusSnapshot::from_response(&response);
    let verdict = snapshot.classify();

    let fields = [snapshot.status_code.as_deref(), snapshot.status.as_deref()];
    let any_error = fields
        .iter()
        .flatten()
        .any(|raw| classify_token(raw) == ContainerStatus::Error);
    if any_error {
        assert_eq!(verdict, ContainerStatus::Error);
    }
    if verdict == ContainerStatus::Pending {
        assert!(snapshot.joined().is_empty() || !any_error);
    }
});
