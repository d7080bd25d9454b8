use std::process::{Command, Output};

use tempfile::TempDir;

fn run_with(vars: &[(&str, &str)]) -> Output {
    // Keeps a real options file under the user's config dir out of the run.
    let config_home = TempDir::new().unwrap();
    Command::new(env!("CARGO_BIN_EXE_watch2putio"))
        .arg("--once")
        .env_clear()
        .env("XDG_CONFIG_HOME", config_home.path())
        .envs(vars.iter().copied())
        .output()
        .expect("binary runs")
}

fn all_output(output: &Output) -> String {
    format!(
        "{}{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    )
}

#[test]
fn missing_settings_exit_with_one_combined_message() {
    let output = run_with(&[("API_TOKEN", "token")]);
    let text = all_output(&output);

    assert!(!output.status.success());
    let message = "WATCH_FOLDER is not set / DOWNLOAD_FOLDER_ID is not set";
    assert_eq!(text.matches(message).count(), 1, "{text}");
    assert!(!text.contains("API_TOKEN is not set"), "{text}");
}

#[test]
fn missing_watch_folder_exits_with_directory_error() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("nope");
    let missing = missing.to_string_lossy();
    let output = run_with(&[
        ("WATCH_FOLDER", missing.as_ref()),
        ("API_TOKEN", "token"),
        ("DOWNLOAD_FOLDER_ID", "12"),
    ]);
    let text = all_output(&output);

    assert!(!output.status.success());
    assert_eq!(text.matches("cannot access watch folder").count(), 1, "{text}");
}

#[test]
fn sweep_only_run_on_an_empty_folder_succeeds() {
    let dir = TempDir::new().unwrap();
    let folder = dir.path().to_string_lossy();
    let output = run_with(&[
        ("WATCH_FOLDER", folder.as_ref()),
        ("API_TOKEN", "token"),
        ("DOWNLOAD_FOLDER_ID", "12"),
    ]);

    assert!(output.status.success(), "{}", all_output(&output));
}
