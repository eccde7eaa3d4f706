//! Fuzz target for command scripts.
//!
//! Applies an arbitrary script to a small scoped tree and diffs the result
//! against the original. Neither step may panic.

#![no_main]

use arbitrary::Arbitrary;
use fortisync::diff::{compare, ScriptStats};
use fortisync::tree::{apply_script, ConfigTree};
use libfuzzer_sys::fuzz_target;

const BASE: &str = r#"config system interface
    edit "port1"
        set ip 192.168.1.99 255.255.255.0
        set allowaccess ping https ssh
    next
end
config router static
    edit 1
        set gateway 10.0.0.1
    next
end
"#;

#[derive(Debug, Arbitrary)]
struct FuzzScript {
    vdom: Option<String>,
    script: String,
}

fuzz_target!(|input: FuzzScript| {
    let mut original = ConfigTree::with_vdom("original", input.vdom);
    if original.parse_config_output(BASE).is_err() {
        return;
    }

    let mut changed = original.clone();
    if apply_script(&mut changed, &input.script).is_err() {
        return;
    }

    let back = compare(&changed, &original);
    let _ = ScriptStats::from_script(&back);
    let _ = apply_script(&mut changed, &back);
});
