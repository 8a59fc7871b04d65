//! Fuzz target for value factory decoding.
//!
//! Builds a storage value of each registered storage shape from the input
//! bytes and decodes it. Out-of-range storage must fail, never panic.

#![no_main]

use std::sync::OnceLock;

use kntable_arrow::geo::register_geo_factories;
use kntable_core::types::{KnimeType, PrimitiveId};
use kntable_core::{ExtensionRegistry, StorageValue};
use libfuzzer_sys::fuzz_target;

fn registry() -> &'static ExtensionRegistry {
    static REGISTRY: OnceLock<ExtensionRegistry> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut registry = ExtensionRegistry::with_builtins().unwrap();
        register_geo_factories(&mut registry).unwrap();
        registry
    })
}

struct Input<'a> {
    data: &'a [u8],
}

impl Input<'_> {
    fn take<const N: usize>(&mut self) -> [u8; N] {
        let mut out = [0u8; N];
        let n = N.min(self.data.len());
        out[..n].copy_from_slice(&self.data[..n]);
        self.data = &self.data[n..];
        out
    }

    fn value(&mut self, ktype: &KnimeType) -> StorageValue {
        if self.take::<1>()[0] == 0xff {
            return StorageValue::Null;
        }
        match ktype {
            KnimeType::Primitive(p) => match p.id() {
                PrimitiveId::Int => StorageValue::Int(i32::from_le_bytes(self.take())),
                PrimitiveId::Long => StorageValue::Long(i64::from_le_bytes(self.take())),
                PrimitiveId::Double => StorageValue::Double(f64::from_le_bytes(self.take())),
                PrimitiveId::Bool => StorageValue::Bool(self.take::<1>()[0] & 1 == 1),
                PrimitiveId::String | PrimitiveId::Blob => {
                    let len = self.take::<1>()[0] as usize;
                    let len = len.min(self.data.len());
                    let bytes = self.data[..len].to_vec();
                    self.data = &self.data[len..];
                    match p.id() {
                        PrimitiveId::String => String::from_utf8_lossy(&bytes).into_owned().into(),
                        _ => StorageValue::Blob(bytes),
                    }
                }
            },
            KnimeType::List(inner) => {
                let len = self.take::<1>()[0] % 8;
                StorageValue::List((0..len).map(|_| self.value(inner)).collect())
            }
            KnimeType::Struct(inner) => StorageValue::Struct(
                inner.inner_types().iter().map(|t| self.value(t)).collect(),
            ),
            KnimeType::Logical(l) => self.value(l.storage_type()),
        }
    }
}

fuzz_target!(|data: &[u8]| {
    let Some((&selector, rest)) = data.split_first() else {
        return;
    };
    let registry = registry();
    let Some(converter) = registry.iter().nth(selector as usize % registry.len()) else {
        return;
    };
    let mut input = Input { data: rest };
    let storage = input.value(converter.storage_type());
    let _ = converter.decode_any(&storage);
});
