use std::io::Write;
use std::process::Command;

fn run_check(config_path: &str) -> std::process::Output {
    let binary_path = env!("CARGO_BIN_EXE_fcs-ws-demos");
    Command::new(binary_path)
        .arg("--log-level")
        .arg("error")
        .arg("check")
        .arg("--config")
        .arg(config_path)
        .env_remove("FCS_API_KEY")
        .output()
        .expect("Failed to start fcs-ws-demos binary")
}

#[test]
fn check_accepts_bundled_configs() {
    for name in ["forex", "stock", "crypto"] {
        let config_path = format!("{}/configs/{name}.yaml", env!("CARGO_MANIFEST_DIR"));
        let output = run_check(&config_path);

        assert!(
            output.status.success(),
            "{name}: exited with {}\nStdout: {}\nStderr: {}",
            output.status,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        let stdout = String::from_utf8_lossy(&output.stdout);
        assert!(stdout.contains("OK"), "{name}: unexpected stdout {stdout}");
    }
}

#[test]
fn check_rejects_symbol_without_exchange() {
    let mut file = tempfile::NamedTempFile::new().expect("temp config");
    writeln!(file, "preset: crypto\nsymbols: [BTCUSDT]").expect("write config");

    let output = run_check(file.path().to_str().expect("utf-8 path"));
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("BTCUSDT"), "stderr: {stderr}");
}

#[test]
fn check_rejects_missing_file() {
    let output = run_check("/nonexistent/fcs-demo.yaml");
    assert!(!output.status.success());
}

#[test]
fn help_lists_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_fcs-ws-demos"))
        .arg("--help")
        .output()
        .expect("Failed to start fcs-ws-demos binary");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    for command in ["stream", "simple", "background", "serve", "check"] {
        assert!(stdout.contains(command), "missing {command} in help");
    }
}
