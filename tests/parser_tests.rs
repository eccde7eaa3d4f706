//! Parser and renderer tests on realistic device output.

mod common;

use common::*;
use pretty_assertions::assert_eq;

use fortisync::tree::{BlockKind, ConfigTree, ParseError};

const FIREWALL_POLICY: &str = r#"config firewall policy
    edit 1
        set name "outbound"
        set uuid 6b1e0a2c-27a2-51ea-8f4f-3bd1a4b1c0de
        set srcintf "port2"
        set dstintf "port1"
        set srcaddr "all"
        set dstaddr "all"
        set action accept
        set schedule "always"
        set service "ALL"
        set nat enable
    next
end
"#;

const CERTIFICATE: &str = r#"config vpn certificate local
    edit "fw-cert"
        set password ENC abc123
        set certificate "-----BEGIN CERTIFICATE-----
MIIBszCCAVmgAwIBAgIUe8G
-----END CERTIFICATE-----"
        set range global
    next
end
"#;

#[test]
fn test_parse_policy_drops_uuid() {
    let tree = parse_tree("running", FIREWALL_POLICY);
    let policy = tree.find(&["firewall policy", "1"]).unwrap();
    let node = tree.node(policy);

    assert_eq!(node.kind(), BlockKind::Edit);
    assert_eq!(node.param("uuid"), None);
    assert_eq!(node.param("name"), Some("\"outbound\""));
    assert_eq!(node.param("action"), Some("accept"));
    assert_eq!(node.param_count(), 9);
}

#[test]
fn test_parse_multi_line_certificate() {
    let tree = parse_tree("running", CERTIFICATE);
    let cert = tree.find(&["vpn certificate local", "fw-cert"]).unwrap();
    let node = tree.node(cert);

    assert_eq!(
        node.param("certificate"),
        Some("\"-----BEGIN CERTIFICATE-----\nMIIBszCCAVmgAwIBAgIUe8G\n-----END CERTIFICATE-----\"")
    );
    assert_eq!(node.param("range"), Some("global"));
    assert_eq!(node.param("password"), Some("ENC abc123"));
}

#[test]
fn test_parse_several_sections() {
    let mut tree = ConfigTree::new("running");
    tree.parse_config_output(INTERFACES).unwrap();
    tree.parse_config_output(BGP).unwrap();

    let names: Vec<&str> = tree.node(tree.root()).block_names().collect();
    assert_eq!(names, vec!["system interface", "router bgp"]);

    let neighbor = tree.find(&["router bgp", "neighbor", "10.0.0.2"]).unwrap();
    assert_eq!(tree.node(neighbor).param("remote-as"), Some("65002"));
    assert_eq!(
        tree.full_open(neighbor),
        "config router bgp\nconfig neighbor\nedit 10.0.0.2\n"
    );
    assert_eq!(tree.full_close(neighbor), "next\nend\nend\n");
}

#[test]
fn test_end_inside_edit_returns_to_root() {
    let tree = parse_tree("running", "config x\n edit y\n end\nconfig z\nend\n");
    let names: Vec<&str> = tree.node(tree.root()).block_names().collect();
    assert_eq!(names, vec!["x", "z"]);
}

#[test]
fn test_prompt_and_banner_lines_are_skipped() {
    let text = "FGT60E # show system dns\nconfig system dns\n    set primary 8.8.8.8\nend\n\nFGT60E # ";
    let tree = parse_tree("running", text);
    let dns = tree.find(&["system dns"]).unwrap();
    assert_eq!(tree.node(dns).param("primary"), Some("8.8.8.8"));
    assert_eq!(tree.node(tree.root()).child_count(), 1);
}

#[test]
fn test_render_round_trip() {
    let mut tree = ConfigTree::new("running");
    tree.parse_config_output(INTERFACES).unwrap();
    tree.parse_config_output(FIREWALL_POLICY).unwrap();
    tree.parse_config_output(BGP).unwrap();

    let reparsed = parse_tree("reparsed", &tree.to_text());
    assert_eq!(reparsed, tree);
}

#[test]
fn test_render_multi_line_round_trip() {
    let tree = parse_tree("running", CERTIFICATE);
    let reparsed = parse_tree("reparsed", &tree.to_text());
    assert_eq!(reparsed, tree);
}

#[test]
fn test_render_layout() {
    let tree = parse_tree("running", BGP);
    assert_eq!(
        tree.to_text(),
        "    config router bgp\n      set as 65001\n      set router-id 10.0.0.1\n        config neighbor\n            edit 10.0.0.2\n              set remote-as 65002\n            next\n        end\n    end\n"
    );
}

#[test]
fn test_parse_errors_carry_line_numbers() {
    let mut tree = ConfigTree::new("running");
    let err = tree
        .parse_config_output("config system dns\n    set primary\nend\n")
        .unwrap_err();
    assert_eq!(
        err,
        ParseError::MissingValue {
            line: 2,
            field: "primary".to_string()
        }
    );
    assert_eq!(err.to_string(), "line 2: missing value for field 'primary'");
}
