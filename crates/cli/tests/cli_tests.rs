// End-to-end tests for the ledgerlink binary: stdout contract, exit codes,
// and error/hint lines on stderr.
//
// Run with: cargo test -p ledgerlink-cli --test cli_tests -- --nocapture

use std::path::PathBuf;
use std::process::{Command, Output};

fn ledgerlink() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_ledgerlink"));
    cmd.current_dir(env!("CARGO_MANIFEST_DIR"));
    cmd.env_remove("LEDGERLINK_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd
}

fn fixture(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../recon/tests/fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

fn run(args: &[&str]) -> Output {
    ledgerlink().args(args).output().expect("run ledgerlink")
}

fn code(output: &Output) -> i32 {
    output.status.code().expect("exit code")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn json(output: &Output) -> serde_json::Value {
    let out = stdout(output);
    serde_json::from_str(out.trim())
        .unwrap_or_else(|e| panic!("stdout must be one JSON value: {e}\n{out}"))
}

// ===========================================================================
// ledgerlink match
// ===========================================================================

#[test]
fn match_contacts_json() {
    let out = run(&[
        "match",
        "--kind", "contact",
        "--rows", &fixture("contacts.csv"),
        "--existing", &fixture("contacts_existing.csv"),
        "--config", &fixture("ledgerlink.toml"),
        "--json",
    ]);
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));

    let val = json(&out);
    assert_eq!(val["kind"], "contact");
    assert_eq!(val["summary"]["to_create"], 2);
    assert_eq!(val["summary"]["to_update"], 1);
    assert_eq!(val["summary"]["to_skip"], 3);
    assert_eq!(val["decisions"].as_array().unwrap().len(), 6);

    let err = stderr(&out);
    assert!(err.contains("contact: 2 to create, 1 to update, 3 to skip"), "{err}");
    assert!(err.contains("3 write(s) in 2 batch(es)"), "{err}");
}

#[test]
fn match_plan_table() {
    let out = run(&[
        "match",
        "--kind", "contact",
        "--rows", &fixture("contacts.csv"),
        "--existing", &fixture("contacts_existing.csv"),
        "--config", &fixture("ledgerlink.toml"),
    ]);
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));

    let lines: Vec<String> = stdout(&out).lines().map(str::to_string).collect();
    assert_eq!(lines.len(), 6);
    assert_eq!(lines[0], "row 2     skip    c_1          no changes");
    assert_eq!(lines[1], "row 3     update  c_2          name");
    assert_eq!(lines[4], "row 6     skip    -            duplicate within file");
}

#[test]
fn match_only_create_flag() {
    let out = run(&[
        "match",
        "--kind", "contact",
        "--rows", &fixture("contacts.csv"),
        "--existing", &fixture("contacts_existing.csv"),
        "--only-create",
        "--json",
    ]);
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    let val = json(&out);
    assert_eq!(val["summary"]["to_update"], 0);
    assert_eq!(val["decisions"][1]["reason"]["reason"], "already_exists");
}

#[test]
fn match_writes_output_file() {
    let dir = tempfile::tempdir().unwrap();
    let plan = dir.path().join("plan.json");

    let out = run(&[
        "match",
        "--kind", "bank-account",
        "--rows", &fixture("bank_accounts.csv"),
        "--existing", &fixture("bank_accounts_existing.csv"),
        "--config", &fixture("ledgerlink.toml"),
        "--output", plan.to_str().unwrap(),
    ]);
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&plan).unwrap()).unwrap();
    assert_eq!(written["kind"], "bank_account");
    assert_eq!(written["decisions"][1]["action"], "update");
    assert!(stderr(&out).contains("warning: column 'bic' not found"));
}

#[test]
fn match_two_defaults_blocked() {
    let dir = tempfile::tempdir().unwrap();
    let rows = dir.path().join("accounts.csv");
    std::fs::write(
        &rows,
        "IBAN,Name,Default\nDE02120300000000202051,Savings,yes\nES9121000418450200051332,Spain,yes\n",
    )
    .unwrap();

    let out = run(&[
        "match",
        "--kind", "bank_account",
        "--rows", rows.to_str().unwrap(),
        "--existing", &fixture("bank_accounts_existing.csv"),
        "--json",
    ]);
    assert_eq!(code(&out), 3);
    assert!(stdout(&out).is_empty(), "no plan on abort");
    let err = stderr(&out);
    assert!(err.contains("error: 'is_default' may be set on at most one row"), "{err}");
    assert!(err.contains("hint:"), "{err}");
}

#[test]
fn match_missing_key_column_blocked() {
    let dir = tempfile::tempdir().unwrap();
    let rows = dir.path().join("contacts.csv");
    std::fs::write(&rows, "Name,City\nAna,Madrid\n").unwrap();

    let out = run(&[
        "match",
        "--kind", "contact",
        "--rows", rows.to_str().unwrap(),
        "--existing", &fixture("contacts_existing.csv"),
    ]);
    assert_eq!(code(&out), 3);
    let err = stderr(&out);
    assert!(err.contains("missing column 'tax_id'"), "{err}");
    assert!(err.contains("[columns.contact] tax_id"), "{err}");
}

#[test]
fn match_unknown_kind_is_usage_error() {
    let out = run(&[
        "match",
        "--kind", "vendor",
        "--rows", &fixture("contacts.csv"),
        "--existing", &fixture("contacts_existing.csv"),
    ]);
    assert_eq!(code(&out), 2);
}

#[test]
fn match_missing_file_is_io_error() {
    let out = run(&[
        "match",
        "--kind", "contact",
        "--rows", "does-not-exist.csv",
        "--existing", &fixture("contacts_existing.csv"),
    ]);
    assert_eq!(code(&out), 7);
    assert!(stderr(&out).contains("cannot read does-not-exist.csv"));
}

// ===========================================================================
// ledgerlink payouts
// ===========================================================================

#[test]
fn payouts_ambiguous_deposit_exit_4() {
    let out = run(&[
        "payouts",
        "--charges", &fixture("stripe_charges.csv"),
        "--deposits", &fixture("deposits.csv"),
        "--json",
    ]);
    assert_eq!(code(&out), 4, "stderr: {}", stderr(&out));

    // The report is still printed before the exit code is set.
    let val = json(&out);
    assert_eq!(val["tolerance_cents"], 2);
    assert_eq!(val["groups"][0]["transfer"], "po_abc");
    assert_eq!(val["groups"][0]["net_cents"], 14505);
    assert_eq!(val["deposits"][0]["status"], "ambiguous");
    assert_eq!(val["deposits"][1]["status"], "unique");
    assert_eq!(val["deposits"][2]["status"], "no_match");
    assert_eq!(val["warnings"][0]["warning"], "refunded_charges_excluded");
    assert!(stderr(&out).contains("1 deposit(s) match more than one payout"));
}

#[test]
fn payouts_settled_transfer_resolves_tie() {
    let out = run(&[
        "payouts",
        "--charges", &fixture("stripe_charges.csv"),
        "--deposits", &fixture("deposits.csv"),
        "--settled", "po_abc",
    ]);
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    let text = stdout(&out);
    assert!(text.contains("deposit dep_1 145.05: unique -> po_ghi (+0)"), "{text}");
    assert!(text.contains("deposit dep_3 12.00: no_match"), "{text}");
}

#[test]
fn payouts_single_deposit_amount() {
    let out = run(&[
        "payouts",
        "--charges", &fixture("stripe_charges.csv"),
        "--deposit", "77.39",
        "--json",
    ]);
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    let val = json(&out);
    assert_eq!(val["deposits"][0]["candidates"][0]["transfer"], "po_def");
    assert_eq!(val["deposits"][0]["candidates"][0]["delta_cents"], -1);
}

#[test]
fn payouts_zero_tolerance() {
    let out = run(&[
        "payouts",
        "--charges", &fixture("stripe_charges.csv"),
        "--deposit", "77.39",
        "--tolerance", "0",
        "--json",
    ]);
    assert_eq!(code(&out), 0);
    assert_eq!(json(&out)["deposits"][0]["status"], "no_match");
}

#[test]
fn payouts_tolerance_out_of_range() {
    let out = run(&[
        "payouts",
        "--charges", &fixture("stripe_charges.csv"),
        "--tolerance", "250",
    ]);
    assert_eq!(code(&out), 2);
}

#[test]
fn payouts_missing_transfer_blocked() {
    let dir = tempfile::tempdir().unwrap();
    let charges = dir.path().join("charges.csv");
    std::fs::write(
        &charges,
        "id,Created date (UTC),Amount,Fee,Status,Transfer\nch_1,2026-01-15,10.00,0.59,Paid,\n",
    )
    .unwrap();

    let out = run(&["payouts", "--charges", charges.to_str().unwrap()]);
    assert_eq!(code(&out), 3);
    assert!(stderr(&out).contains("without a transfer id: ch_1"));
}

#[test]
fn payouts_bad_amount_is_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let charges = dir.path().join("charges.csv");
    std::fs::write(
        &charges,
        "id,Created date (UTC),Amount,Fee,Status,Transfer\nch_1,2026-01-15,ten,0.59,Paid,po_1\n",
    )
    .unwrap();

    let out = run(&["payouts", "--charges", charges.to_str().unwrap()]);
    assert_eq!(code(&out), 5);
}

// ===========================================================================
// ledgerlink split
// ===========================================================================

#[test]
fn split_balanced() {
    let out = run(&["split", "--parent", "100.00", "--line", "60.00", "--line", "40.00"]);
    assert_eq!(code(&out), 0);
    assert_eq!(stdout(&out).trim(), "balanced: 2 lines = 100.00");
}

#[test]
fn split_unbalanced_exit_6() {
    let out = run(&[
        "split", "--parent", "100.00", "--line", "60.00", "--line", "39.99", "--json",
    ]);
    assert_eq!(code(&out), 6);
    let val = json(&out);
    assert_eq!(val["delta_cents"], 1);
    assert_eq!(val["balanced"], false);
    assert!(stderr(&out).contains("off by 0.01"));
}

#[test]
fn split_negative_amounts() {
    let out = run(&[
        "split", "--parent", "-25.00", "--line", "-30.00", "--line", "5.00",
    ]);
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
}

#[test]
fn split_bad_amount_is_usage_error() {
    let out = run(&["split", "--parent", "abc", "--line", "1.00"]);
    assert_eq!(code(&out), 2);
}

// ===========================================================================
// ledgerlink config validate
// ===========================================================================

#[test]
fn config_validate_ok() {
    let out = run(&["config", "validate", &fixture("ledgerlink.toml")]);
    assert_eq!(code(&out), 0, "stderr: {}", stderr(&out));
    let err = stderr(&out);
    assert!(err.contains("ok:"));
    assert!(err.contains("contact: compare name, email, city"), "{err}");
    assert!(err.contains("bank_account: compare built-in"), "{err}");
}

#[test]
fn config_validate_out_of_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledgerlink.toml");
    std::fs::write(&path, "[batch]\nmax_writes = 1000\n").unwrap();

    let out = run(&["config", "validate", path.to_str().unwrap()]);
    assert_eq!(code(&out), 2);
    assert!(stderr(&out).contains("batch.max_writes"));
}

#[test]
fn config_validate_syntax_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledgerlink.toml");
    std::fs::write(&path, "[tolerance\namount_cents = 2\n").unwrap();

    let out = run(&["config", "validate", path.to_str().unwrap()]);
    assert_eq!(code(&out), 5);
}
