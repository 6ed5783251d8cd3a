//! Fuzz target for wire decoding.
//!
//! Arbitrary bytes fed to the persisted schema decoder and to dynamic
//! message decoding must return errors, never panic. Decoded messages are
//! re-encoded to exercise the encoder on whatever the decoder accepted.

#![no_main]

use std::sync::LazyLock;

use libfuzzer_sys::fuzz_target;
use tessera_proto::{DynamicMessage, WireSchema};
use tessera_test_utils::{fixtures, wire};

static SCHEMA: LazyLock<WireSchema> = LazyLock::new(|| wire::group_schema(&fixtures::orders_items_group()));

fuzz_target!(|data: &[u8]| {
    let Some((&selector, payload)) = data.split_first() else {
        return;
    };

    if selector % 2 == 0 {
        let _ = WireSchema::decode(payload);
        return;
    }

    let messages = SCHEMA.messages();
    let descriptor = &messages[usize::from(selector / 2) % messages.len()];
    if let Ok(message) = DynamicMessage::decode(descriptor, payload) {
        let bytes = message.encode_to_vec();
        let again = DynamicMessage::decode(descriptor, bytes.as_slice()).expect("re-encoded message decodes");
        assert_eq!(again.populated(), message.populated());
    }
});
