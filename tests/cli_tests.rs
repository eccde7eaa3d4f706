//! CLI tests for fortisync
//!
//! Argument handling and the offline subcommands (`render`, `compare`) are
//! exercised through the built binary with assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

const RUNNING: &str = r#"config system dns
    set primary 8.8.8.8
    set secondary 8.8.4.4
end
config router static
    edit 1
        set gateway 10.0.0.1
        set device "port1"
    next
end
"#;

const CANDIDATE: &str = r#"config system dns
    set primary 1.1.1.1
end
config router static
end
"#;

// Helper to get a command for testing
fn fortisync_cmd() -> Command {
    let mut cmd = Command::cargo_bin("fortisync").unwrap();
    cmd.env_remove("FORTISYNC_CONFIG")
        .env_remove("FORTISYNC_VDOM")
        .env("NO_COLOR", "1");
    cmd
}

fn config_file(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{}", content).unwrap();
    file
}

// ============================================================================
// Argument Parsing
// ============================================================================

#[test]
fn test_help_lists_subcommands() {
    fortisync_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("diff"))
        .stdout(predicate::str::contains("commit"))
        .stdout(predicate::str::contains("render"))
        .stdout(predicate::str::contains("compare"));
}

#[test]
fn test_version() {
    fortisync_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_missing_subcommand_fails() {
    fortisync_cmd().assert().failure();
}

#[test]
fn test_compare_requires_two_files() {
    fortisync_cmd()
        .args(["compare", "running.conf"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CANDIDATE"));
}

// ============================================================================
// render
// ============================================================================

#[test]
fn test_render_normalizes_file() {
    let file = config_file("config system dns\nset primary 8.8.8.8\n   end\n");

    fortisync_cmd()
        .args(["render", "--no-color"])
        .arg(file.path())
        .assert()
        .success()
        .stdout("    config system dns\n      set primary 8.8.8.8\n    end\n");
}

#[test]
fn test_render_collapse_empty() {
    let file = config_file("config system dns\nend\nconfig router static\n    edit 1\n        set gateway 10.0.0.1\n    next\nend\n");

    fortisync_cmd()
        .args(["render", "--collapse-empty"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("config router static"))
        .stdout(predicate::str::contains("system dns").not());
}

#[test]
fn test_render_collapse_empty_nested() {
    let file = config_file("config firewall address
    edit \"lan\"
    next
    edit \"wan\"
        set subnet 10.0.0.0 255.0.0.0
    next
end
config router bgp
    config neighbor
    end
end
");

    fortisync_cmd()
        .args(["render", "--collapse-empty"])
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("set subnet 10.0.0.0 255.0.0.0"))
        .stdout(predicate::str::contains("lan").not())
        .stdout(predicate::str::contains("router bgp").not());
}

#[test]
fn test_render_parse_error_exit_code() {
    let file = config_file("config system dns\n    set primary\nend\n");

    fortisync_cmd()
        .arg("render")
        .arg(file.path())
        .assert()
        .code(4)
        .stderr(predicate::str::contains("line 2"));
}

#[test]
fn test_render_missing_file() {
    fortisync_cmd()
        .args(["render", "/nonexistent/fortisync/fw.conf"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("fw.conf"));
}

// ============================================================================
// compare
// ============================================================================

#[test]
fn test_compare_prints_script() {
    let running = config_file(RUNNING);
    let candidate = config_file(CANDIDATE);

    fortisync_cmd()
        .arg("compare")
        .arg(running.path())
        .arg(candidate.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("set primary 1.1.1.1"))
        .stdout(predicate::str::contains("unset secondary"))
        .stdout(predicate::str::contains("delete 1"));
}

#[test]
fn test_compare_identical_files_prints_nothing() {
    let running = config_file(RUNNING);
    let candidate = config_file(RUNNING);

    fortisync_cmd()
        .arg("compare")
        .arg(running.path())
        .arg(candidate.path())
        .assert()
        .success()
        .stdout("");
}

#[test]
fn test_compare_stat_summary() {
    let running = config_file(RUNNING);
    let candidate = config_file(CANDIDATE);

    fortisync_cmd()
        .args(["compare", "--stat"])
        .arg(running.path())
        .arg(candidate.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("1 set, 1 unset, 1 delete"));
}

#[test]
fn test_compare_text_diff() {
    let running = config_file(RUNNING);
    let candidate = config_file(CANDIDATE);

    fortisync_cmd()
        .args(["compare", "--text"])
        .arg(running.path())
        .arg(candidate.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("-       set primary 8.8.8.8"))
        .stdout(predicate::str::contains("+       set primary 1.1.1.1"));
}

#[test]
fn test_compare_scoped_to_vdom() {
    let running = config_file(RUNNING);
    let candidate = config_file(CANDIDATE);

    fortisync_cmd()
        .args(["--vdom", "customer", "compare"])
        .arg(running.path())
        .arg(candidate.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("config vdom\n  edit customer\n"));
}

#[test]
fn test_config_file_vdom() {
    let running = config_file(RUNNING);
    let candidate = config_file(CANDIDATE);
    let mut settings = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    writeln!(settings, "[device]\nvdom = \"tenant\"").unwrap();

    fortisync_cmd()
        .arg("--config")
        .arg(settings.path())
        .arg("compare")
        .arg(running.path())
        .arg(candidate.path())
        .assert()
        .success()
        .stdout(predicate::str::starts_with("config vdom\n  edit tenant\n"));
}
