use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

pub struct TestEnv {
    _tmp: TempDir,
    pub data: PathBuf,
    pub output: PathBuf,
    pub dump: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let data = tmp.path().join("data");
        let output = tmp.path().join("output");
        fs::create_dir_all(&data).expect("create data dir");

        let dump = tmp.path().join("pgpring.dump");
        fs::write(&dump, fixture_dump()).expect("write fixture dump");

        Self {
            _tmp: tmp,
            data,
            output,
            dump,
        }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("wotstat");
        cmd.arg("--output-dir").arg(&self.output);
        cmd
    }

    pub fn run_json(&self, args: &[&str]) -> Value {
        let mut cmd = self.cmd();
        let out = cmd
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }

    pub fn data_arg(&self) -> String {
        self.data.to_string_lossy().to_string()
    }

    pub fn dump_arg(&self) -> String {
        self.dump.to_string_lossy().to_string()
    }

    /// Runs preprocess + analyze for the given period.
    pub fn analyzed(&self, period: &str) -> Value {
        let pre = self.run_json(&["preprocess", "--dump", &self.dump_arg(), "--data-dir", &self.data_arg()]);
        assert_eq!(pre["ok"], true);
        self.run_json(&["analyze", "--data-dir", &self.data_arg(), "--period", period])
    }
}

/// Six keys: A, B and C sign in a cycle (the strong set), D hangs off A,
/// E is revoked and F carries no self-signature.
///
/// Expected numbers: 6 keys total, 4 usable, 4 graph signatures; strong set
/// of 3, one-hop signers 3, reachable 4; MSD 1.5 inside the cycle, 3.0 for D.
fn fixture_dump() -> String {
    let mut dump = String::new();

    // A: self-signed, signed by C (closing the cycle), signs B, D and E.
    dump.push_str("pub::1024:17:AAAAAAAAAAAAAAA1:2001-01-01:0:4\n");
    dump.push_str("uid:::::::::Alice <alice@example.org>\n");
    dump.push_str("sig:AAAAAAAAAAAAAAA1:2001-01-02:0:10::4:17:2\n");
    dump.push_str("sig:CCCCCCCCCCCCCCC3:2001-02-01:0:10::4:17:2\n");

    // B: signed by A.
    dump.push_str("pub::1024:17:BBBBBBBBBBBBBBB2:2001-01-01:0:4\n");
    dump.push_str("uid:::::::::Bob <bob@example.org>\n");
    dump.push_str("sig:BBBBBBBBBBBBBBB2:2001-01-02:0:10::4:17:2\n");
    dump.push_str("sig:AAAAAAAAAAAAAAA1:2001-02-01:0:10::4:17:2\n");

    // C: signed by B.
    dump.push_str("pub::1024:17:CCCCCCCCCCCCCCC3:2001-01-01:0:4\n");
    dump.push_str("uid:::::::::Carol <carol@example.org>\n");
    dump.push_str("sig:CCCCCCCCCCCCCCC3:2001-01-02:0:10::4:17:2\n");
    dump.push_str("sig:BBBBBBBBBBBBBBB2:2001-02-01:0:10::4:17:2\n");

    // D: reachable leaf, signed by A only.
    dump.push_str("pub::1024:17:DDDDDDDDDDDDDDD4:2001-01-01:0:4\n");
    dump.push_str("uid:::::::::Dave <dave@example.org>\n");
    dump.push_str("sig:DDDDDDDDDDDDDDD4:2001-01-02:0:10::4:17:2\n");
    dump.push_str("sig:AAAAAAAAAAAAAAA1:2001-02-01:0:10::4:17:2\n");

    // E: revoked; its material must stay out of the graph.
    dump.push_str("pub:r:1024:17:EEEEEEEEEEEEEEE5:2001-01-01:0:4\n");
    dump.push_str("uid:::::::::Eve <eve@example.org>\n");
    dump.push_str("sig:EEEEEEEEEEEEEEE5:2001-01-02:0:10::4:17:2\n");
    dump.push_str("sig:AAAAAAAAAAAAAAA1:2001-02-01:0:10::4:17:2\n");

    // F: no self-signature, hence invalid.
    dump.push_str("pub::1024:17:FFFFFFFFFFFFFFF6:2001-01-01:0:4\n");
    dump.push_str("uid:::::::::Frank <frank@example.org>\n");
    dump.push_str("sig:BBBBBBBBBBBBBBB2:2001-02-01:0:10::4:17:2\n");

    dump
}
