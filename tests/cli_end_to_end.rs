use assert_cmd::Command;
use predicates::str::contains;
use tempfile::TempDir;

fn figura(workdir: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("figura"));
    cmd.current_dir(workdir.path());
    cmd
}

#[test]
fn highlight_prints_raw_node() {
    let workdir = TempDir::new().expect("workdir");
    let assert = figura(&workdir)
        .args(["highlight", "python", "-o", "linenos"])
        .write_stdin("def main():\n    return 1\n")
        .assert()
        .success();

    let output = String::from_utf8_lossy(&assert.get_output().stdout);
    assert!(output.contains("\"node\": \"raw\""), "stdout: {output}");
    assert!(output.contains("\"format\": \"html\""), "stdout: {output}");
    assert!(output.contains("class=\\\"lineno\\\""), "stdout: {output}");
}

#[test]
fn highlight_latex_target() {
    let workdir = TempDir::new().expect("workdir");
    figura(&workdir)
        .args(["--target", "latex", "highlight", "text"])
        .write_stdin("plain words\n")
        .assert()
        .success()
        .stdout(contains("\"format\": \"latex\""))
        .stdout(contains("begin{Verbatim}"));
}

#[test]
fn invalid_option_value_fails() {
    let workdir = TempDir::new().expect("workdir");
    figura(&workdir)
        .args(["highlight", "python", "-o", "hl_lines=1,-2"])
        .write_stdin("x = 1\n")
        .assert()
        .code(2)
        .stderr(contains("\"code\" directive"));
}

#[test]
fn disabled_file_access_prints_warning() {
    let workdir = TempDir::new().expect("workdir");
    figura(&workdir)
        .args(["render", "graph", "--file-insertion", "false"])
        .write_stdin("digraph { a -> b; }\n")
        .assert()
        .success()
        .stdout(contains("\"node\": \"warning\""))
        .stdout(contains("File and URL access deactivated"));

    assert!(!workdir.path().join("images").exists());
}

#[test]
fn blank_command_in_environment_is_rejected() {
    let workdir = TempDir::new().expect("workdir");
    figura(&workdir)
        .env("FIGURA__RENDER__GRAPH__COMMAND", " ")
        .args(["render", "graph", "--reuse"])
        .assert()
        .code(2)
        .stderr(contains("render.graph.command"));
}

#[cfg(unix)]
#[test]
fn render_writes_artifact_and_prints_image() {
    use std::{fs, os::unix::fs::PermissionsExt};

    let workdir = TempDir::new().expect("workdir");
    let script = workdir.path().join("fake-dot");
    fs::write(
        &script,
        "#!/bin/sh\nfor last; do :; done\ncp \"$last\" \"${last%.dot}.png\"\n",
    )
    .expect("write script");
    let mut perms = fs::metadata(&script).expect("metadata").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(&script, perms).expect("set perms");

    figura(&workdir)
        .args(["render", "dot", "--name", "deps", "-o", "align=left"])
        .args(["--raster", "true", "--graph-command"])
        .arg(&script)
        .write_stdin("digraph { a -> b; }\n")
        .assert()
        .success()
        .stdout(contains("\"node\": \"image\""))
        .stdout(contains("\"uri\": \"images/deps.png\""))
        .stdout(contains("\"align\": \"left\""));

    assert_eq!(
        fs::read_to_string(workdir.path().join("images/deps.dot")).expect("source"),
        "\ndigraph { a -> b; }"
    );
    assert!(workdir.path().join("images/deps.png").is_file());
}
