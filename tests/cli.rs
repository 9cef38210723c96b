mod common;

use std::fs;

use common::{TestWorkspace, fixture_input, fixture_path, parse_cat_output, thresh};
use predicates::str::contains;

fn cat_output(args: &[&str]) -> (Vec<String>, Vec<Vec<f64>>) {
    let assert = thresh().arg("cat").args(args).assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    parse_cat_output(&stdout)
}

fn column(header: &[String], rows: &[Vec<f64>], name: &str) -> Vec<f64> {
    let idx = header
        .iter()
        .position(|h| h == name)
        .unwrap_or_else(|| panic!("column {name} missing from {header:?}"));
    rows.iter().map(|row| row[idx]).collect()
}

#[test]
fn alias_expands_to_every_column_and_feeds_expressions() {
    let input = fixture_input(Some('A'), "data_1.txt");
    let (header, rows) = cat_output(&["-i", input.as_str(), "A", "mtime=1000*time"]);
    assert_eq!(header, vec!["time", "strain", "stress", "mtime"]);
    assert_eq!(
        column(&header, &rows, "mtime"),
        vec![0.0, 1000.0, 2000.0, 3000.0, 4000.0]
    );
}

#[test]
fn no_descriptors_prints_every_input() {
    let first = fixture_input(None, "data_1.txt");
    let third = fixture_input(None, "data_3.csv");
    let (header, rows) = cat_output(&["-i", first.as_str(), "-i", third.as_str()]);
    assert_eq!(
        header,
        vec!["time", "strain", "stress", "temperature", "heat_flux"]
    );
    assert_eq!(rows.len(), 5);
}

#[test]
fn shared_column_name_is_ambiguous_until_qualified() {
    let first = fixture_input(None, "data_1.txt");
    let second = fixture_input(None, "data_2.txt");
    thresh()
        .args(["cat", "-i", first.as_str(), "-i", second.as_str(), "time"])
        .assert()
        .code(2)
        .stderr(contains("Ambiguous column 'time'"));

    let aliased = fixture_input(Some('A'), "data_1.txt");
    let (header, rows) = cat_output(&["-i", aliased.as_str(), "-i", second.as_str(), "Atime", "density"]);
    assert_eq!(header, vec!["time", "density"]);
    assert_eq!(column(&header, &rows, "time"), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
}

#[test]
fn generated_columns_need_no_input() {
    let (header, rows) = cat_output(&["t=arange(1,6,1)", "squares=t**2"]);
    assert_eq!(header, vec!["t", "squares"]);
    assert_eq!(
        column(&header, &rows, "squares"),
        vec![1.0, 4.0, 9.0, 16.0, 25.0]
    );
}

#[test]
fn none_removes_a_column() {
    let input = fixture_input(None, "data_1.txt");
    let (header, rows) = cat_output(&["-i", input.as_str(), "time", "strain", "stress", "stress=None"]);
    assert_eq!(header, vec!["time", "strain"]);
    assert_eq!(column(&header, &rows, "strain")[1], 0.01);

    thresh()
        .args(["cat", "-i", input.as_str(), "time", "density=None"])
        .assert()
        .code(2)
        .stderr(contains("Failed to remove 'density'"));
}

#[test]
fn cells_use_fixed_width_scientific_notation() {
    let assert = thresh()
        .args(["cat", "seven=7"])
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    assert_eq!(
        stdout,
        format!("{:>23}\n{:>23}\n", "seven", "+7.00000000000000e+00")
    );
}

#[test]
fn csv_output_file_is_comma_delimited() {
    let workspace = TestWorkspace::new();
    let input = fixture_input(None, "data_1.txt");
    let output = workspace.path().join("out.csv");
    thresh()
        .args(["cat", "-i", input.as_str(), "-o", output.to_str().unwrap(), "time", "stress"])
        .assert()
        .success()
        .stdout("");
    let written = workspace.read("out.csv");
    let first = written.lines().next().expect("header line");
    assert_eq!(first.matches(',').count(), 1);
    assert!(first.trim_start().starts_with("time"));
}

#[test]
fn stdin_is_read_with_dash() {
    let data = fs::read_to_string(fixture_path("data_1.txt")).expect("fixture");
    let assert = thresh()
        .args(["cat", "-i", "s=-", "sstress"])
        .write_stdin(data)
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8");
    let (header, rows) = parse_cat_output(&stdout);
    assert_eq!(header, vec!["stress"]);
    assert_eq!(rows.len(), 5);
}

#[test]
fn invalid_alias_is_rejected() {
    let input = format!("AB={}", fixture_path("data_1.txt").display());
    thresh()
        .args(["cat", "-i", input.as_str()])
        .assert()
        .code(2)
        .stderr(contains("Invalid alias 'AB'"));
}

#[test]
fn unknown_descriptor_and_identifier_are_fatal() {
    let input = fixture_input(None, "data_1.txt");
    thresh()
        .args(["cat", "-i", input.as_str(), "velocity"])
        .assert()
        .code(2)
        .stderr(contains("Alias/column not found: 'velocity'"));
    thresh()
        .args(["cat", "-i", input.as_str(), "v=velocity*2"])
        .assert()
        .code(2)
        .stderr(contains("Unknown identifier 'velocity'"));
}

#[test]
fn seeded_random_columns_are_reproducible() {
    let args = ["--seed", "42", "r=random(3)"];
    let (_, first) = cat_output(&args);
    let (_, second) = cat_output(&args);
    assert_eq!(first, second);
    assert!(first.iter().all(|row| (0.0..1.0).contains(&row[0])));
}

#[test]
fn list_shows_columns_with_their_source() {
    let input = fixture_input(Some('A'), "data_1.txt");
    thresh()
        .args(["list", "-i", input.as_str(), "A", "mtime=1000*time"])
        .assert()
        .success()
        .stdout(contains("stress"))
        .stdout(contains("data_1.txt"))
        .stdout(contains("<derived>"));
}

#[test]
fn burst_writes_one_file_per_column_and_respects_force() {
    let workspace = TestWorkspace::new();
    let input = fixture_input(None, "data_1.txt");
    let dir = workspace.path().to_str().unwrap().to_string();
    thresh()
        .args(["burst", "-i", input.as_str(), "--output-dir", dir.as_str(), "time", "stress"])
        .assert()
        .success();
    let stress = workspace.read("data_1_stress.txt");
    let (header, rows) = parse_cat_output(&stress);
    assert_eq!(header, vec!["stress"]);
    assert_eq!(rows.last().map(|r| r[0]), Some(14.0));
    assert!(workspace.path().join("data_1_time.txt").exists());
    assert!(!workspace.path().join("data_1_strain.txt").exists());

    thresh()
        .args(["burst", "-i", input.as_str(), "--output-dir", dir.as_str(), "time"])
        .assert()
        .code(2)
        .stderr(contains("--force"));
    thresh()
        .args(["burst", "-i", input.as_str(), "--output-dir", dir.as_str(), "--force", "time"])
        .assert()
        .success();
}

#[test]
fn burst_refuses_column_names_that_are_paths() {
    let workspace = TestWorkspace::new();
    let input = workspace.write("loads.txt", "time force/area\n0 1\n1 2\n");
    let out = workspace.path().join("out");
    fs::create_dir(&out).expect("output dir");
    let dir = out.to_str().unwrap().to_string();
    let input = input.to_str().unwrap().to_string();

    thresh()
        .args(["burst", "-i", input.as_str(), "--output-dir", dir.as_str()])
        .assert()
        .code(2)
        .stderr(contains("cannot name a burst file"));
    assert_eq!(fs::read_dir(&out).expect("list output").count(), 0);

    thresh()
        .args(["burst", "--output-dir", dir.as_str(), "a/../../escaped=1"])
        .assert()
        .code(2)
        .stderr(contains("Invalid descriptor"));
    assert!(!workspace.path().join("escaped.txt").exists());
    assert_eq!(fs::read_dir(&out).expect("list output").count(), 0);
}

#[test]
fn check_exit_code_reflects_conditions() {
    let input = fixture_input(None, "data_1.txt");
    thresh()
        .args(["check", "-i", input.as_str(), "-c", "all(stress >= 0)"])
        .assert()
        .code(0);
    thresh()
        .args([
            "check",
            "-i",
            input.as_str(),
            "-c",
            "all(stress >= 0)",
            "-c",
            "max(stress) > 100",
        ])
        .assert()
        .code(1);
    thresh()
        .args(["check", "-i", input.as_str(), "-c", "pressure > 0"])
        .assert()
        .code(2)
        .stderr(contains("Unknown identifier 'pressure'"));
}

#[test]
fn check_sees_derived_columns() {
    let input = fixture_input(None, "data_1.txt");
    thresh()
        .args([
            "check",
            "-i",
            input.as_str(),
            "-c",
            "sum(mtime) == 10000",
            "mtime=1000*time",
        ])
        .assert()
        .code(0);
}
