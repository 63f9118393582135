use predicates::str::contains;

mod util;
use util::Sandbox;

#[test]
fn live_session_from_stdin() {
    let sb = Sandbox::new();
    sb.cmd()
        .arg("live")
        .write_stdin("content hello live\nshape rounded\nsave svg live.svg\nquit\n")
        .assert()
        .success()
        .stdout(contains("ready"))
        .stdout(contains("SVG exported successfully"));

    let svg = std::fs::read_to_string(sb.work().join("live.svg")).unwrap();
    assert!(svg.starts_with("<svg"));

    let history = std::fs::read_to_string(sb.history_file()).unwrap();
    assert!(history.contains("hello live"));
}

#[test]
fn live_session_flushes_on_eof() {
    let sb = Sandbox::new();
    sb.cmd()
        .arg("live")
        .write_stdin("content written before eof\n")
        .assert()
        .success()
        .stdout(contains("saved"));
    let history = std::fs::read_to_string(sb.history_file()).unwrap();
    assert!(history.contains("written before eof"));
}

#[test]
fn live_session_reports_bad_commands() {
    let sb = Sandbox::new();
    sb.cmd()
        .arg("live")
        .write_stdin("fg nope\nsize 99999\nshow\n")
        .assert()
        .success()
        .stdout(contains("Invalid color"))
        .stdout(contains("failed"))
        .stdout(contains("size         99999px"));
}
