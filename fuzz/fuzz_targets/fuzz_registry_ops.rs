// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use metaweave::id::MetadataId;
use metaweave::registry::DependencyRegistry;

#[derive(Debug, Arbitrary)]
enum Op {
    Register(u8, u8),
    Deregister(u8, u8),
    DeregisterAll(u8),
    DeregisterUpstream(u8),
    Notify(u8),
}

fn id(n: u8) -> MetadataId {
    let class = format!("fuzz.C{}", n % 4);
    if n & 0x80 == 0 {
        MetadataId::of_class(&class)
    } else {
        MetadataId::for_instance(&class, &(n % 3).to_string()).unwrap_or_else(|_| MetadataId::of_class(&class))
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let registry = DependencyRegistry::new();
    for op in ops {
        match op {
            Op::Register(u, d) => {
                let (u, d) = (id(u), id(d));
                let valid = registry.is_valid_dependency(&u, &d);
                assert_eq!(registry.register_dependency(&u, &d), valid);
                // a registered edge can never be reversed
                if valid {
                    assert!(!registry.is_valid_dependency(&d, &u));
                }
            }
            Op::Deregister(u, d) => registry.deregister_dependency(&id(u), &id(d)),
            Op::DeregisterAll(u) => registry.deregister_dependencies(&id(u)),
            Op::DeregisterUpstream(d) => registry.deregister_upstream_dependencies(&id(d)),
            Op::Notify(u) => registry.notify_downstream(&id(u)),
        }
    }
    assert_eq!(registry.stats().edges, registry.dependencies().len());
});
