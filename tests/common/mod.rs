#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use tempfile::{TempDir, tempdir};

/// Returns the absolute path to a fixture under `tests/data`.
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name)
}

/// `name` or `ALIAS=name` pointing at a fixture, ready to pass to `-i`.
pub fn fixture_input(alias: Option<char>, name: &str) -> String {
    let path = fixture_path(name).display().to_string();
    match alias {
        Some(alias) => format!("{alias}={path}"),
        None => path,
    }
}

pub fn thresh() -> Command {
    let mut cmd = Command::cargo_bin("thresh").expect("binary exists");
    cmd.env("RUST_LOG", "warn");
    cmd
}

/// Parses the fixed-width `cat` output back into a header and rows of numbers.
pub fn parse_cat_output(text: &str) -> (Vec<String>, Vec<Vec<f64>>) {
    let mut lines = text.lines();
    let header = lines
        .next()
        .map(|line| line.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    let rows = lines
        .map(|line| {
            line.split_whitespace()
                .map(|cell| cell.parse::<f64>().expect("numeric cell"))
                .collect()
        })
        .collect();
    (header, rows)
}

/// Scratch directory helper that cleans up files automatically on drop.
pub struct TestWorkspace {
    temp_dir: TempDir,
}

impl TestWorkspace {
    /// Creates a fresh scratch directory for the current test case.
    pub fn new() -> Self {
        Self {
            temp_dir: tempdir().expect("temp dir"),
        }
    }

    /// Returns the root path for all files owned by this workspace.
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Writes `contents` into a file under the workspace and returns the path.
    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp_dir.path().join(name);
        fs::write(&path, contents).expect("write temp file contents");
        path
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.temp_dir.path().join(name)).expect("read temp file")
    }
}
