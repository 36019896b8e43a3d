//! End-to-end tests for the trace reconstruction flow.
//!
//! Tests the full pipeline: trace directory → build → output file → show

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

const SCHEDULER_CSV: &str = "\
,time,begins,ends,start,finish,called_from,stimulus_id,key
0,100.0,,,released,waiting,tcp://10.0.0.1:8786,update-graph-1,inc-1
1,105.0,102.0,104.0,processing,memory,tcp://10.0.0.1:8786,task-finished-1,inc-1
2,107.0,,,released,waiting,tcp://10.0.0.1:8786,update-graph-1,\"('getitem', 3)\"
";

const TRANSFER_CSV: &str = "\
,start,stop,middle,duration,keys,total,bandwidth,compressed,who,called_from,type,time
0,104.5,105.5,105.0,1.0,\"{'inc-1': 28, ('getitem', 3): 12}\",40,40.0,1.0,tcp://10.0.0.2:40000,tcp://10.0.0.3:40001,incoming,105.5
";

const WORKER_CSV: &str = "\
,time,begins,ends,start,finish,called_from,stimulus_id,key
0,104.0,101.8,103.9,processing,memory,tcp://10.0.0.2:40000,compute-1,inc-1
";

fn binary() -> String {
    env!("CARGO_BIN_EXE_wfmeta-dask").to_string()
}

/// Creates a workspace holding a `trace/` directory with all three files.
fn trace_workspace() -> TempDir {
    let temp = TempDir::new().unwrap();
    let trace = temp.path().join("trace");
    fs::create_dir(&trace).unwrap();
    fs::write(trace.join("scheduler_transition.csv"), SCHEDULER_CSV).unwrap();
    fs::write(trace.join("worker_transfer.csv"), TRANSFER_CSV).unwrap();
    fs::write(trace.join("worker_transition.csv"), WORKER_CSV).unwrap();
    temp
}

/// Runs the binary inside `cwd` with user config isolated from the host.
fn run(cwd: &Path, args: &[&str]) -> Output {
    Command::new(binary())
        .current_dir(cwd)
        .env("HOME", cwd)
        .env("XDG_CONFIG_HOME", cwd.join(".config"))
        .env_remove("WFMETA_FORMAT")
        .env_remove("WFMETA_TEXT_OUTPUT")
        .env_remove("WFMETA_SNAPSHOT_OUTPUT")
        .env_remove("WFMETA_CSV_OUTPUT_DIR")
        .env_remove("RUST_LOG")
        .args(args)
        .output()
        .expect("failed to run wfmeta-dask")
}

fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "command should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn build_writes_default_text_output() {
    let temp = trace_workspace();

    let output = run(temp.path(), &["build", "trace"]);
    assert_success(&output);

    let text = fs::read_to_string(temp.path().join("compiled_tasks.txt")).unwrap();
    let headers: Vec<&str> = text
        .lines()
        .filter(|line| line.starts_with("Task object for task"))
        .collect();
    assert_eq!(
        headers,
        [
            "Task object for task inc-1:",
            "Task object for task ('getitem', 3):",
        ]
    );
}

#[test]
fn build_snapshot_then_show() {
    let temp = trace_workspace();

    let output = run(
        temp.path(),
        &["build", "trace", "-f", "snapshot", "-o", "run.json.gz"],
    );
    assert_success(&output);
    assert!(temp.path().join("run.json.gz").is_file());

    let output = run(temp.path(), &["show", "run.json.gz"]);
    assert_success(&output);
    let stdout = String::from_utf8(output.stdout).unwrap();
    let mut lines = stdout.lines();
    assert_eq!(lines.next(), Some("2 tasks, 6 events"));
    assert!(lines.next().unwrap().starts_with("inc-1\t4 events"));
    assert!(lines.next().unwrap().starts_with("('getitem', 3)\t2 events"));

    let output = run(temp.path(), &["show", "run.json.gz", "--task", "inc-1"]);
    assert_success(&output);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.starts_with("Task object for task inc-1:"));
}

#[test]
fn build_csv_writes_one_file_per_category() {
    let temp = trace_workspace();

    let output = run(temp.path(), &["build", "trace", "--format", "csv", "-o", "tables"]);
    assert_success(&output);

    let tables = temp.path().join("tables");
    for name in [
        "scheduler_transition_df.csv",
        "worker_transfer_df.csv",
        "worker_transition_df.csv",
    ] {
        assert!(tables.join(name).is_file(), "{name} should exist");
    }

    // Transfers fan out to both keys.
    let transfers = fs::read_to_string(tables.join("worker_transfer_df.csv")).unwrap();
    assert_eq!(transfers.lines().count(), 3);
}

#[test]
fn config_file_selects_default_format() {
    let temp = trace_workspace();
    fs::write(
        temp.path().join("wfmeta.toml"),
        "format = \"snapshot\"\nsnapshot_output = \"from-config.json\"\n",
    )
    .unwrap();

    let output = run(temp.path(), &["-c", "wfmeta.toml", "build", "trace"]);
    assert_success(&output);

    let json = fs::read_to_string(temp.path().join("from-config.json")).unwrap();
    assert!(json.contains("\"name\": \"inc-1\""));
}

#[test]
fn missing_directory_fails_without_output() {
    let temp = TempDir::new().unwrap();

    let output = run(temp.path(), &["build", "absent"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("does not exist"), "stderr: {stderr}");
    assert!(!temp.path().join("compiled_tasks.txt").exists());
}

#[test]
fn missing_trace_file_is_reported() {
    let temp = trace_workspace();
    fs::remove_file(temp.path().join("trace/worker_transfer.csv")).unwrap();

    let output = run(temp.path(), &["build", "trace"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("There is no"), "stderr: {stderr}");
    assert!(stderr.contains("worker_transfer.csv"), "stderr: {stderr}");
}
