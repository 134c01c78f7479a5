// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
#![no_main]

use libfuzzer_sys::fuzz_target;
use metaweave::scanner::{scan_source, scan_types};
use metaweave::types::JavaType;

fuzz_target!(|data: &str| {
    for details in scan_types(data) {
        assert!(!details.name.simple_name().is_empty());
    }
    let _ = scan_source(&JavaType::new("com.example.Person"), data);
});
