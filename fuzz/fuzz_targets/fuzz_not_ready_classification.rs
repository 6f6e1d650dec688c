#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::Value;

use graphpost::graph::GraphError;
use graphpost::publish::attempt::{is_not_ready, NOT_READY_CODE, NOT_READY_SUBCODE};

fuzz_target!(|data: &[u8]| {
    // Any error body the platform might send must classify without panicking.
    let Ok(body) = serde_json::from_slice::<Value>(data) else {
        return;
    };
    let err = GraphError::api(400, &body);
    let not_ready = is_not_ready(&err);

    if let Some(platform) = err.platform_error() {
        if platform.code() == Some(NOT_READY_CODE)
            || platform.subcode() == Some(NOT_READY_SUBCODE)
        {
            assert!(not_ready);
        }
    }
});
