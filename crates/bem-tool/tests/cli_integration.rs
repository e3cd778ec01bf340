//! Integration tests for the tta-bem CLI.

use bem_core::{BinaryEncoding, RfPortCode, SlotSide, SocketEncoding};
use bem_tool::file::save_map;
use serde_json as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing as _;
use tracing_subscriber as _;

fn binary_path() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop();
    path.pop();
    path.join("tta-bem")
}

fn sample_map() -> BinaryEncoding {
    let mut bem = BinaryEncoding::new();
    let id = bem.add_socket_code_table("rf").unwrap();
    bem.socket_code_table_by_id_mut(id)
        .unwrap()
        .add_rf_port_code(RfPortCode::new("RF", 0, 0, 4))
        .unwrap();
    bem.add_move_slot("B1")
        .unwrap()
        .add_destination_field()
        .unwrap()
        .add_socket_encoding(SocketEncoding::new("S1", 1, 0))
        .unwrap();
    bem.set_socket_codes("B1", SlotSide::Destination, "S1", "rf")
        .unwrap();
    bem.add_immediate_slot("imm", 8).unwrap();
    bem
}

fn write_sample(dir: &Path) -> PathBuf {
    let path = dir.join("sample.json");
    save_map(&path, &sample_map()).unwrap();
    path
}

#[test]
fn check_reports_width() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_sample(temp_dir.path());

    let output = Command::new(binary_path())
        .args(["check", input.to_str().unwrap()])
        .output()
        .expect("failed to run tta-bem");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ok: 14 bits, 2 fields, 1 socket code tables"));
}

#[test]
fn view_prints_report() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_sample(temp_dir.path());

    let output = Command::new(binary_path())
        .args(["view", input.to_str().unwrap()])
        .output()
        .expect("failed to run tta-bem");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("Binary Encoding Map: sample.json\n"));
    assert!(stdout.contains("| limm slot imm: 8 | move slot B1: 6 |"));
    assert!(stdout.contains("1SSSSS : socket S1"));
    assert!(stdout.contains(" 0RRRR : RF: RF"));
}

#[test]
fn normalize_writes_canonical_file() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_sample(temp_dir.path());
    let output = temp_dir.path().join("canonical.json");

    let status = Command::new(binary_path())
        .args([
            "normalize",
            input.to_str().unwrap(),
            "-o",
            output.to_str().unwrap(),
        ])
        .status()
        .expect("failed to run tta-bem");

    assert!(status.success());
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        fs::read_to_string(&input).unwrap()
    );
}

#[test]
fn normalize_to_stdout() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = write_sample(temp_dir.path());

    let output = Command::new(binary_path())
        .args(["normalize", input.to_str().unwrap()])
        .output()
        .expect("failed to run tta-bem");

    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout),
        fs::read_to_string(&input).unwrap()
    );
}

#[test]
fn dangling_table_reference_fails_with_load_status() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = temp_dir.path().join("broken.json");
    fs::write(
        &input,
        r#"{
  "name": "bem",
  "attributes": [{ "name": "extra_bits", "value": 0 }],
  "children": [
    {
      "name": "move_slot",
      "attributes": [
        { "name": "bus_name", "value": "B1" },
        { "name": "position", "value": 0 },
        { "name": "extra_bits", "value": 0 }
      ],
      "children": [
        {
          "name": "destination_field",
          "attributes": [
            { "name": "position", "value": 0 },
            { "name": "extra_bits", "value": 0 },
            { "name": "component_id_position", "value": "left" }
          ],
          "children": [
            {
              "name": "socket_encoding",
              "attributes": [
                { "name": "socket_name", "value": "S1" },
                { "name": "encoding", "value": 0 },
                { "name": "extra_bits", "value": 0 },
                { "name": "sc_table", "value": "missing" }
              ]
            }
          ]
        }
      ]
    }
  ]
}
"#,
    )
    .unwrap();

    let output = Command::new(binary_path())
        .args(["check", input.to_str().unwrap()])
        .output()
        .expect("failed to run tta-bem");

    assert_eq!(output.status.code(), Some(2));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("broken.json: error: cannot load 'socket_encoding'"));
}

#[test]
fn missing_file_fails() {
    let temp_dir = tempfile::tempdir().unwrap();
    let input = temp_dir.path().join("absent.json");

    let status = Command::new(binary_path())
        .args(["view", input.to_str().unwrap()])
        .status()
        .expect("failed to run tta-bem");

    assert_eq!(status.code(), Some(1));
}

#[test]
fn help_succeeds() {
    let output = Command::new(binary_path())
        .arg("--help")
        .output()
        .expect("failed to run tta-bem");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("Usage: tta-bem"));
}
