use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

fn demo() -> assert_cmd::Command {
    cargo_bin_cmd!("quarrel-demo")
}

#[test]
fn create_with_aliases_and_clusters() {
    demo()
        .args(["-vv", "c", "-zf", "out.tar", "--exclude", "*.o", "src", "docs"])
        .assert()
        .success()
        .stdout("verbosity: 2\ncreate out.tar (gzip) from src, docs\n  excluding *.o\n");
}

#[test]
fn extract_uses_defaults() {
    demo()
        .args(["extract", "--file=backup.tar"])
        .assert()
        .success()
        .stdout("extract backup.tar into . (all members)\n");

    demo()
        .args(["x", "-f", "backup.tar", "-C", "/tmp", "a.txt"])
        .assert()
        .success()
        .stdout("extract backup.tar into /tmp: a.txt\n");
}

#[test]
fn list_format_choices() {
    demo()
        .args(["t", "-f", "a.tar", "--form", "long"])
        .assert()
        .success()
        .stdout("list a.tar (long)\n");

    demo()
        .args(["list", "-f", "a.tar", "--format", "wide"])
        .assert()
        .code(2)
        .stdout("")
        .stderr(predicate::str::contains(
            "quarrel-demo list: error: argument --format: invalid choice: 'wide' (choose from 'short', 'long')",
        ));
}

#[test]
fn help_goes_to_stdout() {
    demo()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("usage: quarrel-demo [-h]"))
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("create (c)"))
        .stderr("");

    demo()
        .args(["create", "-h"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("usage: quarrel-demo create [-h]"));
}

#[test]
fn version() {
    demo()
        .arg("-V")
        .assert()
        .success()
        .stdout(format!("quarrel-demo {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn errors_go_to_stderr_with_code_2() {
    demo()
        .assert()
        .code(2)
        .stdout("")
        .stderr(predicate::str::starts_with("usage: quarrel-demo"))
        .stderr(predicate::str::ends_with(
            "quarrel-demo: error: the following arguments are required: {create,extract,list}\n",
        ));

    demo()
        .args(["create", "-f", "a.tar"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "the following arguments are required: paths",
        ));

    demo()
        .args(["archive"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("invalid choice: 'archive'"));
}

#[test]
fn diagnostics_follow_the_language_flag() {
    demo()
        .args(["--lang", "fr", "create", "x"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains(
            "quarrel-demo create: erreur: les arguments suivants sont requis : -f/--file",
        ));
}

#[test]
fn argument_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("args");
    std::fs::write(&path, "create\n-f 'my archive.tar'\nnotes.txt\n").unwrap();

    demo()
        .arg(format!("@{}", path.display()))
        .assert()
        .success()
        .stdout("create my archive.tar from notes.txt\n");
}
