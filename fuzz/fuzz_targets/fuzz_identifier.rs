// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
#![no_main]

use libfuzzer_sys::fuzz_target;
use metaweave::id::{self, MetadataId, PhysicalTypeIdentifier};

fuzz_target!(|data: &str| {
    let class = id::get_metadata_class(data);
    let instance = id::get_metadata_instance(data);
    if instance.is_some() {
        assert!(class.is_some());
    }

    if let Ok(parsed) = MetadataId::parse(data) {
        assert_eq!(parsed.is_class(), !parsed.is_instance());
        assert!(parsed.class_id().is_class());
        assert_eq!(parsed.class_id().metadata_class(), parsed.metadata_class());
        if PhysicalTypeIdentifier::is_valid(&parsed) {
            let _ = PhysicalTypeIdentifier::parse(&parsed);
        }
    }
});
