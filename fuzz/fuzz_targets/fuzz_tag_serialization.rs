#![no_main]

use libfuzzer_sys::fuzz_target;
use serde_json::Value;

use graphpost::publish::tags::{serialize_product_tags, serialize_user_tags};
use graphpost::publish::{ProductTagInput, UserTagInput};

fuzz_target!(|data: &[u8]| {
    // Whatever survives filtering must be a non-empty JSON array.
    if let Ok(tags) = serde_json::from_slice::<Vec<UserTagInput>>(data) {
        if let Ok(Some(encoded)) = serialize_user_tags(&tags) {
            let decoded: Value = serde_json::from_str(&encoded).unwrap();
            assert!(decoded.as_array().is_some_and(|a| !a.is_empty() && a.len() <= tags.len()));
        }
    }
    if let Ok(tags) = serde_json::from_slice::<Vec<ProductTagInput>>(data) {
        if let Ok(Some(encoded)) = serialize_product_tags(&tags) {
            let decoded: Value = serde_json::from_str(&encoded).unwrap();
            assert!(decoded.as_array().is_some_and(|a| !a.is_empty() && a.len() <= tags.len()));
        }
    }
});
