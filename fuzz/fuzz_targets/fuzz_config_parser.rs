//! Fuzz target for the configuration parser.
//!
//! Anything that parses must render back into text that parses to the same
//! tree.

#![no_main]

use fortisync::tree::ConfigTree;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let mut tree = ConfigTree::new("fuzz");
    if tree.parse_config_output(text).is_err() {
        return;
    }

    let mut reparsed = ConfigTree::new("fuzz");
    reparsed
        .parse_config_output(&tree.to_text())
        .expect("rendered text must parse");
});
