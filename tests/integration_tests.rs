//! Integration tests for BOQ CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper to get a command for the boq binary
fn boq() -> Command {
    let mut cmd = Command::cargo_bin("boq").unwrap();
    cmd.env("BOQ_AUTHOR", "Test Estimator");
    cmd.env_remove("BOQ_LOG");
    cmd
}

/// Helper to create a test project in a temp directory
fn setup_test_project() -> TempDir {
    let tmp = TempDir::new().unwrap();
    boq().current_dir(tmp.path()).arg("init").assert().success();
    tmp
}

/// Helper to create a BOQ and return its number (BOQ-YYYY-NNN)
fn create_test_boq(tmp: &TempDir, title: &str, customer: Option<&str>) -> String {
    let mut cmd = boq();
    cmd.current_dir(tmp.path())
        .args(["boq", "new", "--title", title]);
    if let Some(customer) = customer {
        cmd.args(["--customer", customer]);
    }
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "boq new failed: {:?}", output);

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .find(|l| l.contains("Created BOQ"))
        .and_then(|l| l.split_whitespace().find(|w| w.starts_with("BOQ-")))
        .map(|s| s.to_string())
        .unwrap_or_else(|| "@1".to_string())
}

/// Helper to append a line item
fn add_item(tmp: &TempDir, boq_ref: &str, description: &str, qty: &str, unit: &str, rate: Option<&str>) {
    let mut cmd = boq();
    cmd.current_dir(tmp.path()).args([
        "item",
        "add",
        boq_ref,
        "--description",
        description,
        "--quantity",
        qty,
        "--unit",
        unit,
    ]);
    if let Some(rate) = rate {
        cmd.args(["--rate", rate]);
    }
    cmd.assert().success();
}

fn boq_files(root: &Path) -> Vec<std::path::PathBuf> {
    fs::read_dir(root.join("boqs"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.to_string_lossy().ends_with(".boq.yaml"))
        .collect()
}

// ============================================================================
// Basic Commands
// ============================================================================

#[test]
fn test_help_displays() {
    boq()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("bills of quantities"))
        .stdout(predicate::str::contains("catalog"));
}

#[test]
fn test_version_displays() {
    boq()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("boq"));
}

#[test]
fn test_completions_bash() {
    boq()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("boq"));
}

// ============================================================================
// Init
// ============================================================================

#[test]
fn test_init_creates_project_structure() {
    let tmp = TempDir::new().unwrap();

    boq()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized BOQ project"));

    assert!(tmp.path().join(".boq").is_dir());
    assert!(tmp.path().join(".boq/config.yaml").is_file());
    assert!(tmp.path().join("boqs").is_dir());
    assert!(tmp.path().join("catalog").is_dir());
}

#[test]
fn test_init_twice_warns() {
    let tmp = setup_test_project();

    boq()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_command_outside_project_fails() {
    let tmp = TempDir::new().unwrap();

    boq()
        .current_dir(tmp.path())
        .args(["boq", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a BOQ project"));
}

#[test]
fn test_project_flag_from_other_directory() {
    let tmp = setup_test_project();
    create_test_boq(&tmp, "Remote Project", None);
    let elsewhere = TempDir::new().unwrap();

    boq()
        .current_dir(elsewhere.path())
        .args(["--project", tmp.path().to_str().unwrap(), "boq", "list", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1"));
}

// ============================================================================
// BOQ Lifecycle
// ============================================================================

#[test]
fn test_boq_new_requires_title() {
    let tmp = setup_test_project();

    boq()
        .current_dir(tmp.path())
        .args(["boq", "new"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Title is required"));
}

#[test]
fn test_boq_new_assigns_number_and_short_id() {
    let tmp = setup_test_project();

    boq()
        .current_dir(tmp.path())
        .args(["boq", "new", "--title", "Hotel Kitchen", "--currency", "INR"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created BOQ BOQ-"))
        .stdout(predicate::str::contains("-001"))
        .stdout(predicate::str::contains("(@1)"));

    assert_eq!(boq_files(tmp.path()).len(), 1);
}

#[test]
fn test_boq_numbers_increase() {
    let tmp = setup_test_project();
    let first = create_test_boq(&tmp, "First", None);
    let second = create_test_boq(&tmp, "Second", None);

    assert!(first.ends_with("-001"), "got {}", first);
    assert!(second.ends_with("-002"), "got {}", second);
}

#[test]
fn test_boq_list_shows_created() {
    let tmp = setup_test_project();
    create_test_boq(&tmp, "Hotel Kitchen", Some("Grand Hotels"));
    create_test_boq(&tmp, "Hospital Laundry", None);

    boq()
        .current_dir(tmp.path())
        .args(["boq", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hotel Kitchen"))
        .stdout(predicate::str::contains("Hospital Laundry"))
        .stdout(predicate::str::contains("2 BOQ(s) found"));
}

#[test]
fn test_boq_list_count_and_search() {
    let tmp = setup_test_project();
    create_test_boq(&tmp, "Hotel Kitchen", None);
    create_test_boq(&tmp, "Hospital Laundry", None);

    boq()
        .current_dir(tmp.path())
        .args(["boq", "list", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::diff("2\n"));

    boq()
        .current_dir(tmp.path())
        .args(["boq", "list", "--search", "laundry", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::diff("1\n"));
}

#[test]
fn test_boq_list_json_output() {
    let tmp = setup_test_project();
    create_test_boq(&tmp, "Hotel Kitchen", None);

    let output = boq()
        .current_dir(tmp.path())
        .args(["-f", "json", "boq", "list"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let list = value.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["title"], "Hotel Kitchen");
    assert_eq!(list[0]["status"], "draft");
}

#[test]
fn test_boq_show_by_short_id() {
    let tmp = setup_test_project();
    create_test_boq(&tmp, "Hotel Kitchen", Some("Grand Hotels"));

    boq()
        .current_dir(tmp.path())
        .args(["boq", "show", "@1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Hotel Kitchen"))
        .stdout(predicate::str::contains("Grand Hotels"));
}

#[test]
fn test_boq_show_unknown_fails() {
    let tmp = setup_test_project();

    boq()
        .current_dir(tmp.path())
        .args(["boq", "show", "BOQ-1999-999"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn test_boq_edit_header_fields() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Hotel Kitchen", None);

    boq()
        .current_dir(tmp.path())
        .args(["boq", "edit", &number, "--customer-name", "Grand Hotels Ltd"])
        .assert()
        .success();

    boq()
        .current_dir(tmp.path())
        .args(["boq", "show", &number])
        .assert()
        .success()
        .stdout(predicate::str::contains("Grand Hotels Ltd"));
}

#[test]
fn test_boq_delete_with_yes() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Throwaway", None);

    boq()
        .current_dir(tmp.path())
        .args(["boq", "delete", &number, "--yes"])
        .assert()
        .success();

    assert!(boq_files(tmp.path()).is_empty());
}

// ============================================================================
// Line Items
// ============================================================================

#[test]
fn test_item_add_updates_totals() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Hotel Kitchen", None);

    boq()
        .current_dir(tmp.path())
        .args([
            "item", "add", &number, "-d", "Exhaust Hood SS304", "--quantity", "2", "-u", "nos",
            "--rate", "90000",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added line 1"))
        .stdout(predicate::str::contains("180000.00"));

    boq()
        .current_dir(tmp.path())
        .args(["item", "list", &number])
        .assert()
        .success()
        .stdout(predicate::str::contains("Exhaust Hood SS304"))
        .stdout(predicate::str::contains("1 line item(s)"));
}

#[test]
fn test_item_update_and_remove() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Hotel Kitchen", None);
    add_item(&tmp, &number, "Exhaust Hood SS304", "2", "nos", Some("90000"));
    add_item(&tmp, &number, "Dishwasher", "1", "nos", Some("250000"));

    boq()
        .current_dir(tmp.path())
        .args(["item", "update", &number, "1", "--quantity", "3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("520000.00"));

    boq()
        .current_dir(tmp.path())
        .args(["item", "remove", &number, "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed 'Dishwasher'"));

    let output = boq()
        .current_dir(tmp.path())
        .args(["-f", "json", "item", "list", &number])
        .output()
        .unwrap();
    let items: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(items.as_array().unwrap().len(), 1);
    assert_eq!(items[0]["quantity"], 3.0);
}

#[test]
fn test_item_remove_unknown_line_fails() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Hotel Kitchen", None);

    boq()
        .current_dir(tmp.path())
        .args(["item", "remove", &number, "7"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

// ============================================================================
// Validation and Workflow
// ============================================================================

#[test]
fn test_validate_empty_boq_fails() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Empty", None);

    boq()
        .current_dir(tmp.path())
        .args(["boq", "validate", &number])
        .assert()
        .failure()
        .stdout(predicate::str::contains("BOQ has no line items"))
        .stderr(predicate::str::contains("Validation failed"));
}

#[test]
fn test_validate_reports_invalid_quantity() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Negative", Some("Acme"));
    add_item(&tmp, &number, "Exhaust Hood SS304", "-1", "nos", Some("100"));

    boq()
        .current_dir(tmp.path())
        .args(["boq", "validate", &number])
        .assert()
        .failure()
        .stdout(predicate::str::contains("line 1"))
        .stdout(predicate::str::contains("must be greater than 0"));
}

#[test]
fn test_validate_clean_boq_passes() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Hotel Kitchen", Some("Grand Hotels"));
    add_item(&tmp, &number, "Exhaust Hood SS304", "2", "nos", Some("90000"));

    boq()
        .current_dir(tmp.path())
        .args(["boq", "validate", &number])
        .assert()
        .success();

    let output = boq()
        .current_dir(tmp.path())
        .args(["-f", "json", "boq", "show", &number])
        .output()
        .unwrap();
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["status"], "validated");
}

#[test]
fn test_approve_with_errors_fails() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Empty", None);

    boq()
        .current_dir(tmp.path())
        .args(["boq", "approve", &number])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Cannot approve BOQ with validation errors",
        ));
}

#[test]
fn test_approve_then_locked() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Hotel Kitchen", Some("Grand Hotels"));
    add_item(&tmp, &number, "Exhaust Hood SS304", "2", "nos", Some("90000"));

    boq()
        .current_dir(tmp.path())
        .args(["boq", "approve", &number, "--by", "Chief Estimator"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Approved"))
        .stdout(predicate::str::contains("Chief Estimator"));

    boq()
        .current_dir(tmp.path())
        .args(["item", "add", &number, "-d", "Late addition", "--quantity", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("cannot be modified"));
}

#[test]
fn test_reject_requires_reason() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Hotel Kitchen", None);

    boq()
        .current_dir(tmp.path())
        .args(["boq", "reject", &number])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--reason"));

    boq()
        .current_dir(tmp.path())
        .args(["boq", "reject", &number, "--reason", "Scope changed"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rejected"));
}

// ============================================================================
// Versions
// ============================================================================

#[test]
fn test_version_copies_items() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Hotel Kitchen", Some("Grand Hotels"));
    add_item(&tmp, &number, "Exhaust Hood SS304", "2", "nos", Some("90000"));

    boq()
        .current_dir(tmp.path())
        .args(["boq", "reject", &number, "--reason", "Rates too high"])
        .assert()
        .success();

    boq()
        .current_dir(tmp.path())
        .args(["boq", "version", &number])
        .assert()
        .success()
        .stdout(predicate::str::contains("v2"));

    assert_eq!(boq_files(tmp.path()).len(), 2);

    // the number now resolves to the latest version, which is an editable draft
    add_item(&tmp, &number, "Dishwasher", "1", "nos", Some("250000"));

    boq()
        .current_dir(tmp.path())
        .args(["boq", "history", &number])
        .assert()
        .success()
        .stdout(predicate::str::contains("rejected"))
        .stdout(predicate::str::contains("draft"));
}

#[test]
fn test_version_of_superseded_fails() {
    let tmp = setup_test_project();
    create_test_boq(&tmp, "Hotel Kitchen", None);

    boq()
        .current_dir(tmp.path())
        .args(["boq", "version", "@1"])
        .assert()
        .success();

    boq()
        .current_dir(tmp.path())
        .args(["boq", "version", "@1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("superseded"));
}

#[test]
fn test_superseded_version_is_frozen() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Hotel Kitchen", Some("Grand Hotels"));
    add_item(&tmp, &number, "Exhaust Hood SS304", "2", "nos", Some("90000"));

    boq()
        .current_dir(tmp.path())
        .args(["boq", "version", "@1"])
        .assert()
        .success();

    boq()
        .current_dir(tmp.path())
        .args(["item", "add", "@1", "-d", "Dishwasher", "--quantity", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("superseded"));

    boq()
        .current_dir(tmp.path())
        .args(["boq", "edit", "@1", "--title", "Renamed"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("superseded"));

    boq()
        .current_dir(tmp.path())
        .args(["boq", "approve", "@1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("superseded"));

    // the number resolves to the new head, which can still be approved
    boq()
        .current_dir(tmp.path())
        .args(["boq", "approve", &number])
        .assert()
        .success();

    boq()
        .current_dir(tmp.path())
        .args(["boq", "list", "--all-versions", "--status", "approved", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::diff("1\n"));
}

#[test]
fn test_list_hides_old_versions() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Hotel Kitchen", None);

    boq()
        .current_dir(tmp.path())
        .args(["boq", "version", &number])
        .assert()
        .success();

    boq()
        .current_dir(tmp.path())
        .args(["boq", "list", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::diff("1\n"));

    boq()
        .current_dir(tmp.path())
        .args(["boq", "list", "--all-versions", "--count"])
        .assert()
        .success()
        .stdout(predicate::str::diff("2\n"));
}

// ============================================================================
// Catalog and Mapping
// ============================================================================

#[test]
fn test_catalog_new_and_list() {
    let tmp = setup_test_project();

    boq()
        .current_dir(tmp.path())
        .args([
            "catalog", "new", "--code", "HOOD-SS", "-n", "Exhaust Hood SS304", "-p", "85000",
            "-c", "Ventilation",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created catalog item HOOD-SS"));

    boq()
        .current_dir(tmp.path())
        .args(["catalog", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("HOOD-SS"))
        .stdout(predicate::str::contains("1 catalog item(s) found"));
}

#[test]
fn test_catalog_duplicate_code_fails() {
    let tmp = setup_test_project();

    for expect_ok in [true, false] {
        let assert = boq()
            .current_dir(tmp.path())
            .args(["catalog", "new", "--code", "HOOD-SS", "-n", "Exhaust Hood"])
            .assert();
        if expect_ok {
            assert.success();
        } else {
            assert
                .failure()
                .stderr(predicate::str::contains("already exists"));
        }
    }
}

#[test]
fn test_map_suggest_and_confirm() {
    let tmp = setup_test_project();
    boq()
        .current_dir(tmp.path())
        .args([
            "catalog", "new", "--code", "HOOD-SS", "-n", "Exhaust Hood SS304", "-p", "85000",
            "-k", "hood,canopy",
        ])
        .assert()
        .success();

    let number = create_test_boq(&tmp, "Hotel Kitchen", None);
    add_item(&tmp, &number, "Kitchen Exhaust Hood SS304", "2", "nos", None);

    boq()
        .current_dir(tmp.path())
        .args(["map", "suggest", &number])
        .assert()
        .success()
        .stdout(predicate::str::contains("HOOD-SS"));

    boq()
        .current_dir(tmp.path())
        .args(["map", "confirm", &number, "1", "HOOD-SS"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Mapped line 1"))
        .stdout(predicate::str::contains("85000.00"));

    let output = boq()
        .current_dir(tmp.path())
        .args(["-f", "json", "item", "list", &number])
        .output()
        .unwrap();
    let items: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(items[0]["mapping_status"], "confirmed");
    assert_eq!(items[0]["estimated_unit_price"], 85000.0);
}

#[test]
fn test_map_custom_and_reset() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Hotel Kitchen", None);
    add_item(&tmp, &number, "Bespoke pass-through counter", "1", "nos", Some("40000"));

    boq()
        .current_dir(tmp.path())
        .args(["map", "custom", &number, "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("as custom"));

    boq()
        .current_dir(tmp.path())
        .args(["map", "reset", &number, "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cleared mapping"));
}

// ============================================================================
// Import / Export / Report
// ============================================================================

#[test]
fn test_import_and_export_csv() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Imported", None);

    let csv_path = tmp.path().join("lines.csv");
    fs::write(
        &csv_path,
        "Sl No,Description,Qty,UOM,Rate\n\
         1.0,\"Exhaust Hood, SS304\",2,nos,90000\n\
         2.0,Dishwasher,1,nos,250000\n",
    )
    .unwrap();

    boq()
        .current_dir(tmp.path())
        .args(["boq", "import", &number, csv_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 line item(s)"));

    let out_path = tmp.path().join("out.csv");
    boq()
        .current_dir(tmp.path())
        .args(["boq", "export", &number, "-o", out_path.to_str().unwrap()])
        .assert()
        .success();

    let exported = fs::read_to_string(&out_path).unwrap();
    assert!(exported.starts_with("item_no,description,quantity"));
    assert!(exported.contains("\"Exhaust Hood, SS304\""));
    assert!(exported.contains("Dishwasher"));
}

#[test]
fn test_import_missing_column_fails() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Imported", None);

    let csv_path = tmp.path().join("bad.csv");
    fs::write(&csv_path, "Description,UOM\nHood,nos\n").unwrap();

    boq()
        .current_dir(tmp.path())
        .args(["boq", "import", &number, csv_path.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("quantity"));
}

#[test]
fn test_report_renders_markdown() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Hotel Kitchen", Some("Grand Hotels"));
    add_item(&tmp, &number, "Exhaust Hood SS304", "2", "nos", Some("90000"));

    boq()
        .current_dir(tmp.path())
        .args(["boq", "report", &number])
        .assert()
        .success()
        .stdout(predicate::str::contains("# BOQ-"))
        .stdout(predicate::str::contains("Exhaust Hood SS304"));
}

#[test]
fn test_stats_json() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Hotel Kitchen", None);
    add_item(&tmp, &number, "Exhaust Hood SS304", "2", "nos", Some("90000"));
    create_test_boq(&tmp, "Laundry", None);

    let output = boq()
        .current_dir(tmp.path())
        .args(["-f", "json", "boq", "stats"])
        .output()
        .unwrap();
    assert!(output.status.success());
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["total_boqs"], 2);
    assert_eq!(stats["total_items"], 1);
}

#[test]
fn test_stats_markdown() {
    let tmp = setup_test_project();
    create_test_boq(&tmp, "Hotel Kitchen", None);

    boq()
        .current_dir(tmp.path())
        .args(["-f", "md", "boq", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("# BOQ Statistics"))
        .stdout(predicate::str::contains("| draft"));
}

// ============================================================================
// Check
// ============================================================================

#[test]
fn test_check_passes_on_fresh_project() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Hotel Kitchen", None);
    add_item(&tmp, &number, "Exhaust Hood SS304", "2", "nos", Some("90000"));

    boq()
        .current_dir(tmp.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("All files passed"));
}

#[test]
fn test_check_broken_file_fails() {
    let tmp = setup_test_project();
    fs::write(
        tmp.path().join("boqs/BOQ-01ARZ3NDEKTSV4RRFFQ69G5FAV.boq.yaml"),
        "id: BOQ-01ARZ3NDEKTSV4RRFFQ69G5FAV\ntitle: 42\n",
    )
    .unwrap();

    boq()
        .current_dir(tmp.path())
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Check failed"));
}

#[test]
fn test_check_fix_rewrites_stale_totals() {
    let tmp = setup_test_project();
    let number = create_test_boq(&tmp, "Hotel Kitchen", None);
    add_item(&tmp, &number, "Exhaust Hood SS304", "2", "nos", Some("90000"));

    let path = boq_files(tmp.path()).remove(0);
    let content = fs::read_to_string(&path).unwrap();
    let tampered = content.replace("estimated_total_value: 180000.0", "estimated_total_value: 1.0");
    assert_ne!(content, tampered, "fixture did not contain the expected total");
    fs::write(&path, tampered).unwrap();

    boq()
        .current_dir(tmp.path())
        .args(["check", "--strict"])
        .assert()
        .failure();

    boq()
        .current_dir(tmp.path())
        .args(["check", "--fix"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Files fixed"));

    let fixed = fs::read_to_string(&path).unwrap();
    assert!(fixed.contains("estimated_total_value: 180000.0"));
}
