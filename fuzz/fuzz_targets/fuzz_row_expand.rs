//! Fuzz target for row expansion.
//!
//! Stored values are untrusted once they reach disk. Expanding arbitrary
//! bytes through the key-value and B-tree descriptions must fail cleanly,
//! and the B-tree display path must always render something.

#![no_main]

use std::sync::{Arc, LazyLock};

use libfuzzer_sys::fuzz_target;
use tessera_store::{BTreeStorageDescription, KvStorageDescription, RowStorageDescription, ValueBuffer};
use tessera_test_utils::{fixtures, test_row_format_config, wire};
use tessera_types::ProtobufFormatType;

struct Descriptions {
    kv: KvStorageDescription,
    btree: BTreeStorageDescription,
}

static DESCRIPTIONS: LazyLock<Descriptions> = LazyLock::new(|| {
    let group = fixtures::orders_items_group();
    let schema = Arc::new(wire::group_schema(&group));
    Descriptions {
        kv: KvStorageDescription::new(
            Arc::clone(&group),
            ProtobufFormatType::Group,
            Arc::clone(&schema),
            test_row_format_config(),
        ),
        btree: BTreeStorageDescription::new(group, ProtobufFormatType::Group, schema, test_row_format_config()),
    }
});

fuzz_target!(|data: &[u8]| {
    let descriptions = &*DESCRIPTIONS;

    let _ = descriptions.kv.expand_row(&data.to_vec().into());

    let buf = ValueBuffer::from_vec(data.to_vec());
    let _ = descriptions.btree.expand_row(&buf);
    assert!(!descriptions.btree.display(&buf).is_empty());
});
