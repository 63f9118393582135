use predicates::prelude::*;
use predicates::str::contains;
use serde_json::Value;

mod util;
use util::Sandbox;

fn generate(sb: &Sandbox, url: &str) -> i64 {
    let out = sb
        .cmd()
        .args(["--json", "generate", "url", "--url", url, "-o", "last.png"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let v: Value = serde_json::from_slice(&out).unwrap();
    v["history_id"].as_i64().unwrap()
}

fn list(sb: &Sandbox) -> Vec<Value> {
    let out = sb
        .cmd()
        .args(["--json", "history", "list"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    match serde_json::from_slice(&out).unwrap() {
        Value::Array(items) => items,
        other => panic!("expected array, got {other}"),
    }
}

#[test]
fn history_list_empty() {
    let sb = Sandbox::new();
    sb.cmd()
        .args(["history", "list"])
        .assert()
        .success()
        .stdout(contains("No history yet"));
    assert!(list(&sb).is_empty());
}

#[test]
fn history_lists_newest_first() {
    let sb = Sandbox::new();
    let first = generate(&sb, "https://one.example");
    let second = generate(&sb, "https://two.example");
    assert_ne!(first, second);

    let items = list(&sb);
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["content"], "https://two.example");
    assert_eq!(items[1]["content"], "https://one.example");

    sb.cmd()
        .args(["history", "list", "--limit", "1"])
        .assert()
        .success()
        .stdout(contains("two.example"))
        .stdout(contains("one.example").not());
}

#[test]
fn history_show_prints_settings() {
    let sb = Sandbox::new();
    let id = generate(&sb, "https://show.example");
    sb.cmd()
        .args(["history", "show", &id.to_string()])
        .assert()
        .success()
        .stdout(contains("https://show.example"))
        .stdout(contains("square"))
        .stdout(contains("300px"));
}

#[test]
fn history_delete_and_missing_id() {
    let sb = Sandbox::new();
    let id = generate(&sb, "https://gone.example");
    sb.cmd()
        .args(["history", "delete", &id.to_string()])
        .assert()
        .success();
    assert!(list(&sb).is_empty());

    sb.cmd()
        .args(["history", "delete", &id.to_string()])
        .assert()
        .code(1)
        .stderr(contains("No history entry"));
}

#[test]
fn history_clear_requires_confirmation() {
    let sb = Sandbox::new();
    generate(&sb, "https://keep.example");

    sb.cmd()
        .args(["history", "clear"])
        .assert()
        .code(2)
        .stderr(contains("--yes"));
    assert_eq!(list(&sb).len(), 1);

    sb.cmd()
        .args(["history", "clear", "--yes"])
        .assert()
        .success();
    assert!(list(&sb).is_empty());
}

#[test]
fn history_export_uses_dated_filename() {
    let sb = Sandbox::new();
    generate(&sb, "https://export.example");

    sb.cmd().args(["history", "export"]).assert().success();

    let name = format!(
        "qr-history-{}.json",
        chrono::Local::now().date_naive().format("%Y-%m-%d")
    );
    let text = std::fs::read_to_string(sb.work().join(&name)).unwrap();
    let v: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(v.as_array().unwrap().len(), 1);
    assert_eq!(v[0]["content"], "https://export.example");
    assert!(v[0]["settings"]["fgColor"].is_string());
}

#[test]
fn history_export_into_directory() {
    let sb = Sandbox::new();
    generate(&sb, "https://dir.example");
    let out_dir = sb.home().join("exports");
    std::fs::create_dir_all(&out_dir).unwrap();

    sb.cmd()
        .args(["history", "export"])
        .arg(&out_dir)
        .assert()
        .success();
    let entries: Vec<_> = std::fs::read_dir(&out_dir).unwrap().collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn history_import_merges_into_other_store() {
    let source = Sandbox::new();
    generate(&source, "https://a.example");
    generate(&source, "https://b.example");
    let file = source.home().join("backup.json");
    source
        .cmd()
        .args(["history", "export"])
        .arg(&file)
        .assert()
        .success();

    let target = Sandbox::new();
    generate(&target, "https://local.example");
    target
        .cmd()
        .args(["history", "import"])
        .arg(&file)
        .assert()
        .success()
        .stdout(contains("History imported (3 entries)"));

    // Importing again is idempotent.
    target
        .cmd()
        .args(["history", "import"])
        .arg(&file)
        .assert()
        .success();
    let items = list(&target);
    assert_eq!(items.len(), 3);
}

#[test]
fn history_import_rejects_non_array() {
    let sb = Sandbox::new();
    let file = sb.home().join("bad.json");
    std::fs::write(&file, r#"{"not": "an array"}"#).unwrap();
    sb.cmd()
        .args(["history", "import"])
        .arg(&file)
        .assert()
        .code(5)
        .stderr(contains("JSON array"));

    std::fs::write(&file, "[{").unwrap();
    sb.cmd()
        .args(["history", "import"])
        .arg(&file)
        .assert()
        .code(5)
        .stderr(contains("not valid JSON"));
}

#[test]
fn history_render_reproduces_entry() {
    let sb = Sandbox::new();
    let id = generate(&sb, "https://again.example");

    sb.cmd()
        .args(["history", "render", &id.to_string(), "-o", "again.svg"])
        .assert()
        .success();
    let svg = std::fs::read_to_string(sb.work().join("again.svg")).unwrap();
    assert!(svg.contains(r#"width="300""#));
}

#[test]
fn corrupt_history_file_reads_as_empty() {
    let sb = Sandbox::new();
    std::fs::create_dir_all(sb.data()).unwrap();
    std::fs::write(sb.history_file(), "{{ not json").unwrap();

    assert!(list(&sb).is_empty());
    // The next write replaces the corrupt data.
    generate(&sb, "https://fresh.example");
    assert_eq!(list(&sb).len(), 1);
}
