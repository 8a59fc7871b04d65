//! Fuzz target for the wire schema decoder.
//!
//! Any document that decodes must export again, and the exported form must
//! decode to the same schema.

#![no_main]

use std::sync::OnceLock;

use kntable_arrow::geo::register_geo_factories;
use kntable_core::wire::{schema_from_json, schema_to_json};
use kntable_core::ExtensionRegistry;
use libfuzzer_sys::fuzz_target;

fn registry() -> &'static ExtensionRegistry {
    static REGISTRY: OnceLock<ExtensionRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = ExtensionRegistry::with_builtins().unwrap();
        register_geo_factories(&mut registry).unwrap();
        registry
    })
}

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let registry = registry();
    let Ok(schema) = schema_from_json(text, registry) else {
        return;
    };
    // Duplicate names decode fine but cannot be exported.
    let Ok(json) = schema_to_json(&schema, registry) else {
        return;
    };
    let again = schema_from_json(&json, registry).unwrap();
    assert_eq!(again, schema);
});
