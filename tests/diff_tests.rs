//! Diff tests: command scripts between realistic trees and their effect.

mod common;

use common::*;
use pretty_assertions::assert_eq;

use fortisync::diff::{compare, diff_blocks, text_diff, ScriptStats};
use fortisync::tree::{apply_script, BlockKind, ConfigTree};

fn applied(running: &ConfigTree, script: &str) -> ConfigTree {
    let mut model = running.clone();
    apply_script(&mut model, script).unwrap();
    model
}

#[test]
fn test_mode_change_yields_single_set() {
    let running = parse_tree(
        "running",
        "config system interface\n    edit port1\n        set mode dhcp\n    next\nend\n",
    );
    let candidate = parse_tree(
        "candidate",
        "config system interface\n    edit port1\n        set mode \"static\"\n    next\nend\n",
    );

    let script = compare(&running, &candidate);
    let statements: Vec<&str> = script
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("set ") || l.starts_with("unset ") || l.starts_with("delete "))
        .collect();
    assert_eq!(statements, vec!["set mode \"static\""]);
}

#[test]
fn test_removed_edit_block_is_deleted_once() {
    let running = parse_tree(
        "running",
        "config firewall address\n    edit \"1.1.1.1\"\n        set subnet 1.1.1.1 255.255.255.255\n    next\nend\n",
    );
    let candidate = parse_tree("candidate", "config firewall address\nend\n");

    let script = compare(&running, &candidate);
    assert_eq!(
        script,
        "    config firewall address\n      delete 1.1.1.1\n    end\n"
    );
    assert!(!script.contains("subnet"));
}

#[test]
fn test_add_bgp_neighbor() {
    let running = parse_tree("running", BGP);
    let mut candidate = running.clone();
    let neighbors = candidate.find(&["router bgp", "neighbor"]).unwrap();
    let peer = candidate.add_block(neighbors, "10.6.6.6", BlockKind::Edit);
    candidate.set_param(peer, "remote-as", "666");

    assert_eq!(
        compare(&running, &candidate),
        "    config router bgp\n        config neighbor\n            edit 10.6.6.6\n              set remote-as 666\n            next\n        end\n    end\n"
    );
}

#[test]
fn test_grafted_block_replaces_existing() {
    let running = parse_tree("running", BGP);
    let mut candidate = running.clone();

    let mut neighbors = ConfigTree::detached("neighbor", BlockKind::Config);
    let root = neighbors.root();
    let peer = neighbors.add_block(root, "10.0.0.9", BlockKind::Edit);
    neighbors.set_param(peer, "remote-as", "65009");

    let bgp = candidate.find(&["router bgp"]).unwrap();
    candidate.set_block(bgp, &neighbors);

    let script = compare(&running, &candidate);
    assert!(script.contains("delete 10.0.0.2"));
    assert!(script.contains("edit 10.0.0.9"));
    assert_eq!(applied(&running, &script), candidate);
}

#[test]
fn test_diff_blocks_from_nested_block() {
    let running = parse_tree("running", BGP);
    let mut candidate = running.clone();
    let peer = candidate
        .find(&["router bgp", "neighbor", "10.0.0.2"])
        .unwrap();
    candidate.set_param(peer, "remote-as", "65099");

    let a = running.find(&["router bgp", "neighbor"]).unwrap();
    let b = candidate.find(&["router bgp", "neighbor"]).unwrap();
    assert_eq!(
        diff_blocks(&running, a, &candidate, b, 0),
        "config router bgp\nconfig neighbor\n    edit 10.0.0.2\n      set remote-as 65099\n    next\nend\nend\n"
    );
}

#[test]
fn test_scripts_reproduce_candidate() {
    let mut running = ConfigTree::new("running");
    running.parse_config_output(INTERFACES).unwrap();
    running.parse_config_output(STATIC_ROUTES).unwrap();
    running.parse_config_output(BGP).unwrap();

    let mut candidate = running.clone();
    let port2 = candidate.find(&["system interface", "port2"]).unwrap();
    candidate.del_param(port2, "mode");
    candidate.set_param(port2, "ip", "10.1.1.1 255.255.255.0");
    let root = candidate.root();
    candidate.del_block(root, "router static");
    let dns = candidate.add_block(root, "system dns", BlockKind::Config);
    candidate.set_param(dns, "primary", "8.8.8.8");

    let forward = compare(&running, &candidate);
    assert_eq!(applied(&running, &forward), candidate);

    let backward = compare(&candidate, &running);
    assert!(backward.contains("  delete system dns\n"));
    assert!(backward.contains("set mode dhcp"));

    let stats = ScriptStats::from_script(&forward);
    assert_eq!(stats.unsets, 1);
    assert_eq!(stats.deletes, 1);
    assert_eq!(stats.sets, 2);
}

#[test]
fn test_scoped_script_applies_to_scoped_tree() {
    let mut running = ConfigTree::with_vdom("running", Some("customer".to_string()));
    running.parse_config_output(STATIC_ROUTES).unwrap();
    let mut candidate = running.clone();
    let route = candidate.find(&["router static", "1"]).unwrap();
    candidate.set_param(route, "gateway", "10.9.9.9");

    let script = compare(&running, &candidate);
    assert!(script.starts_with("config vdom\n  edit customer\n"));
    assert_eq!(applied(&running, &script), candidate);
}

#[test]
fn test_text_diff_marks_changed_lines() {
    let running = parse_tree("running", STATIC_ROUTES);
    let mut candidate = running.clone();
    let route = candidate.find(&["router static", "1"]).unwrap();
    candidate.set_param(route, "gateway", "10.0.0.254");

    let diff = text_diff(&running, &candidate);
    assert!(diff.contains("-           set gateway 10.0.0.1"));
    assert!(diff.contains("+           set gateway 10.0.0.254"));
    assert_eq!(diff.lines().filter(|l| l.starts_with("+ ")).count(), 1);
}
