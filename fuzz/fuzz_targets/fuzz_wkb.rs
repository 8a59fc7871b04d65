//! Fuzz target for the WKB geometry reader.
//!
//! Exercises both byte orders, nested collections and count fields larger
//! than the remaining input.

#![no_main]

use kntable_arrow::geo::{read_wkb, write_wkb};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(geometry) = read_wkb(data) else {
        return;
    };
    let bytes = write_wkb(&geometry);
    let again = read_wkb(&bytes).unwrap();
    // Compared as bytes since NaN coordinates never compare equal.
    assert_eq!(write_wkb(&again), bytes);
});
