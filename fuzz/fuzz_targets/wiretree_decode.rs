//! Fuzz target for the schema-less wire-tree walker.
//!
//! Arbitrary bytes either decode to a tree or return `None`; neither path
//! may panic or recurse unboundedly.

#![no_main]

use bpsr_core::decode_message;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = decode_message(data);
});
