mod common;

use common::TestEnv;
use std::fs;

#[test]
fn preprocess_writes_graph_and_side_tables() {
    let env = TestEnv::new();
    let pre = env.run_json(&[
        "preprocess",
        "--dump",
        &env.dump_arg(),
        "--data-dir",
        &env.data_arg(),
    ]);
    assert_eq!(pre["ok"], true);
    assert_eq!(pre["data"]["scan"]["total_keys"], 6);
    assert_eq!(pre["data"]["scan"]["usable_keys"], 4);
    assert_eq!(pre["data"]["scan"]["total_sigs"], 4);
    assert_eq!(pre["data"]["dropped_keys"], 0);

    let graph = fs::read_to_string(env.data.join("preprocessed")).expect("preprocessed file");
    assert!(graph.contains("pAAAAAAAAAAAAAAA1\nsCCCCCCCCCCCCCCC3\n"));
    // Revoked and unself-signed keys stay out entirely.
    assert!(!graph.contains("EEEEEEEEEEEEEEE5"));
    assert!(!graph.contains("FFFFFFFFFFFFFFF6"));

    let status = fs::read_to_string(env.data.join("keystatus.csv")).expect("keystatus file");
    assert!(status.contains("VC;AAAAAAAAAAAAAAA1;17;1024;2001-01-01;0;4;1"));
    assert!(status.contains("R;EEEEEEEEEEEEEEE5"));
    assert!(status.contains("I;FFFFFFFFFFFFFFF6"));

    let names = fs::read_to_string(env.data.join("keynames.csv")).expect("keynames file");
    assert!(names.contains("AAAAAAAAAAAAAAA1;Alice <alice@example.org>"));
}

#[test]
fn analyze_computes_strong_set_and_msd() {
    let env = TestEnv::new();
    let summary = env.analyzed("200108");
    assert_eq!(summary["ok"], true);

    let data = &summary["data"];
    assert_eq!(data["period"], "200108");
    assert_eq!(data["strong"]["size"], 3);
    assert_eq!(data["strong"]["signers"], 3);
    assert_eq!(data["strong"]["signed"], 4);
    assert_eq!(data["msd"]["average"], 1.5);
    assert_eq!(data["msd"]["median"], 1.5);
    assert_eq!(data["general"]["total_keys"], 6);

    // Ascending MSD, ties broken by key id: A, B, C, then the leaf D.
    let top = data["top"].as_array().expect("top array");
    assert_eq!(top.len(), 4);
    assert_eq!(top[0]["key_id"], "AAAAAAAAAAAAAAA1");
    assert_eq!(top[0]["rank"], 1);
    assert_eq!(top[0]["name"], "Alice <alice@example.org>");
    assert_eq!(top[0]["msd"], 1.5);
    assert_eq!(top[3]["key_id"], "DDDDDDDDDDDDDDD4");
    assert_eq!(top[3]["msd"], 3.0);
}

#[test]
fn analyze_writes_period_artifacts() {
    let env = TestEnv::new();
    env.analyzed("200108");
    let dir = env.output.join("200108");

    for name in [
        "msd.csv",
        "msd-sorted-200108.txt",
        "othersets.txt",
        "setsize.csv",
        "preprocessed.strongset",
        "summary.json",
    ] {
        assert!(dir.join(name).exists(), "missing artifact {}", name);
    }

    let sorted = fs::read_to_string(dir.join("msd-sorted-200108.txt")).expect("sorted msd");
    let first = sorted.lines().next().expect("at least one row");
    assert_eq!(first, "AAAAAAAA AAAAAAA1   1.5000");
    assert!(sorted.lines().last().expect("rows").starts_with("DDDDDDDD DDDDDDD4"));

    let msd_csv = fs::read_to_string(dir.join("msd.csv")).expect("msd csv");
    // D: one signer (A), no outgoing sigs, not in the strong set.
    assert!(msd_csv.contains("DDDDDDDDDDDDDDD4; 3.00000;1;0;0;1;0;0;3;0"));

    let strongset = fs::read_to_string(dir.join("preprocessed.strongset")).expect("strongset");
    assert!(strongset.contains("pAAAAAAAAAAAAAAA1"));
    assert!(!strongset.contains("DDDDDDDDDDDDDDD4"));

    let setsize = fs::read_to_string(dir.join("setsize.csv")).expect("setsize");
    assert!(setsize.lines().next().expect("rows").ends_with(";3"));
}

#[test]
fn individual_reports_land_in_hex_subdirectories() {
    let env = TestEnv::new();
    env.analyzed("200108");

    let report_path = env.output.join("200108/keys/DD/DDDDDDD4");
    let report = fs::read_to_string(report_path).expect("individual report");
    assert!(report.contains("KeyID DDDDDDDD DDDDDDD4"));
    assert!(report.contains("This key is not in the strong set."));
    assert!(report.contains(" 3.00000"));
    assert!(report.contains("Signatures to this key:\n  AAAAAAAA AAAAAAA1"));
    assert!(report.contains("Farthest keys (3 hops):\n  BBBBBBBB BBBBBBB2"));
}

#[test]
fn no_individual_flag_skips_key_reports() {
    let env = TestEnv::new();
    let pre = env.run_json(&[
        "preprocess",
        "--dump",
        &env.dump_arg(),
        "--data-dir",
        &env.data_arg(),
    ]);
    assert_eq!(pre["ok"], true);
    let out = env.run_json(&[
        "analyze",
        "--data-dir",
        &env.data_arg(),
        "--period",
        "200108",
        "--no-individual",
    ]);
    assert_eq!(out["ok"], true);
    assert!(!env.output.join("200108/keys").exists());
}

#[test]
fn top_lists_best_connected_keys() {
    let env = TestEnv::new();
    env.analyzed("200108");

    let top = env.run_json(&["top", "--period", "200108", "--count", "2"]);
    assert_eq!(top["ok"], true);
    let rows = top["data"].as_array().expect("top rows");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["short_id"], "AAAAAAA1");
    assert_eq!(rows[0]["msd"], 1.5);
    assert_eq!(rows[1]["short_id"], "BBBBBBB2");

    env.cmd()
        .args(["top", "--period", "200108", "--count", "1"])
        .assert()
        .success()
        .stdout(predicates::str::contains("1\t0xAAAAAAA1\t1.5000\tAlice"));
}
