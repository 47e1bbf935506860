//! End-to-end tests that drive the built binary, including a real SIGTERM.

#![cfg(unix)]

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use serde_json::json;

const BIN: &str = env!("CARGO_BIN_EXE_stateful-processor");

fn write_manifest(dir: &Path) -> PathBuf {
    let path = dir.join("job.toml");
    std::fs::write(&path, "items = [\"a\", \"b\", \"c\"]\n").unwrap();
    path
}

fn processor(dir: &Path) -> Command {
    let mut cmd = Command::new(BIN);
    cmd.current_dir(dir)
        .env_remove("SNAPSHOT_PATH")
        .env_remove("RESUME")
        .env_remove("OTEL_ENDPOINT")
        .env("RUST_LOG", "info");
    cmd
}

fn read_snapshot(path: &Path) -> serde_json::Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn run_processes_manifest_and_show_prints_snapshot() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path());
    let snapshot = dir.path().join("state.json");

    let output = processor(dir.path())
        .arg("run")
        .arg("--items")
        .arg(&manifest)
        .arg("--snapshot")
        .arg(&snapshot)
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "{stdout}");
    assert!(stdout.contains("Processed item c 3 / 3"), "{stdout}");
    assert!(stdout.contains("Finished processing all items."), "{stdout}");
    assert!(stdout.contains("completed: 3 processed, 0 skipped, 3 total"), "{stdout}");
    assert_eq!(read_snapshot(&snapshot), json!({"a": "a!", "b": "b!", "c": "c!"}));

    let shown = processor(dir.path())
        .arg("show")
        .arg("--snapshot")
        .arg(&snapshot)
        .output()
        .unwrap();
    assert!(shown.status.success());
    let shown: serde_json::Value = serde_json::from_slice(&shown.stdout).unwrap();
    assert_eq!(shown, json!({"a": "a!", "b": "b!", "c": "c!"}));
}

#[test]
fn sigterm_saves_progress_and_resume_finishes() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path());
    let snapshot = dir.path().join("state.json");

    let mut child = processor(dir.path())
        .arg("run")
        .arg("--items")
        .arg(&manifest)
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--delay-ms")
        .arg("1500")
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();

    let mut lines = BufReader::new(child.stdout.take().unwrap()).lines();
    let mut seen = Vec::new();
    for line in lines.by_ref() {
        let line = line.unwrap();
        let first_done = line.contains("Processed item a 1 / 3");
        seen.push(line);
        if first_done {
            break;
        }
    }
    assert!(
        seen.iter().any(|l| l.contains("Processed item a 1 / 3")),
        "{seen:#?}"
    );

    // "b" is now sleeping inside the worker.
    kill(Pid::from_raw(child.id() as i32), Signal::SIGTERM).unwrap();
    seen.extend(lines.map(|l| l.unwrap()));
    let status = child.wait().unwrap();

    assert_eq!(status.code(), Some(128 + 15), "{seen:#?}");
    assert!(seen.iter().any(|l| l.contains("Interrupt signal received, saving data...")));
    assert!(seen.iter().any(|l| l.contains("Data saved, exiting.")));
    assert!(!seen.iter().any(|l| l.contains("Processed item b")));
    assert!(
        seen.iter()
            .any(|l| l.contains("interrupted: 1 processed, 0 skipped, 3 total")),
        "{seen:#?}"
    );
    assert_eq!(read_snapshot(&snapshot), json!({"a": "a!"}));

    let output = processor(dir.path())
        .arg("run")
        .arg("--items")
        .arg(&manifest)
        .arg("--snapshot")
        .arg(&snapshot)
        .arg("--resume")
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "{stdout}");
    assert!(
        stdout.contains(&format!("Read from store: {} data of len 1", snapshot.display())),
        "{stdout}"
    );
    assert!(stdout.contains("Item a already processed, skipping..."), "{stdout}");
    assert!(stdout.contains("Processed item b 2 / 3"), "{stdout}");
    assert!(stdout.contains("Processed item c 3 / 3"), "{stdout}");
    assert!(stdout.contains("Finished processing all items."), "{stdout}");
    assert_eq!(read_snapshot(&snapshot), json!({"a": "a!", "b": "b!", "c": "c!"}));
}

#[test]
fn resume_with_everything_done_skips_all() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = write_manifest(dir.path());
    let snapshot = dir.path().join("state.json");
    std::fs::write(&snapshot, r#"{"a": "a!", "b": "b!", "c": "c!"}"#).unwrap();

    let output = processor(dir.path())
        .arg("run")
        .arg("--items")
        .arg(&manifest)
        .arg("--snapshot")
        .arg(&snapshot)
        .env("RESUME", "true")
        .output()
        .unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(output.status.success(), "{stdout}");
    assert!(stdout.contains("All items already processed, skipping..."), "{stdout}");
    assert!(stdout.contains("all_done: 0 processed, 3 skipped, 3 total"), "{stdout}");
}
