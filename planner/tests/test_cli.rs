// Licensed under the Apache-2.0 license

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

const TOPOLOGY: &str = r#"
[[tiles]]
kind = "compute"
cmdline = "kernel"
memory_pe = 1
spm = "SPM"

[[tiles]]
kind = "memory"
capacity = "8GB"
"#;

fn run_planner(dir: &Path, spm: &str, extra: &[&str]) -> Output {
    let topology = dir.join("system.toml");
    fs::write(&topology, TOPOLOGY.replace("SPM", spm)).unwrap();
    Command::new(env!("CARGO_BIN_EXE_m3-planner"))
        .arg("-t")
        .arg(&topology)
        .arg("-o")
        .arg(dir.join("plan.json"))
        .args(extra)
        .env_remove("M3_NUMFS")
        .output()
        .unwrap()
}

#[test]
fn test_plan_written() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_planner(dir.path(), "8MB", &[]);
    assert!(output.status.success(), "{:?}", output);

    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("PE00: kernel\n"), "{}", stdout);
    let plan: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(dir.path().join("plan.json")).unwrap()).unwrap();
    assert_eq!(plan["tiles"].as_array().unwrap().len(), 2);
}

#[test]
fn test_oversized_scratchpad_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_planner(dir.path(), "16MB", &[]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(!dir.path().join("plan.json").exists());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("PE00 is too large"), "{}", stderr);
}

#[test]
fn test_overflowing_base_offset_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_planner(
        dir.path(),
        "8MB",
        &["--base-offset", "0xfffffffffffff000", "--mod-size", "0x2000"],
    );

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(!dir.path().join("plan.json").exists());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("Invalid memory map"), "{}", stderr);
}
