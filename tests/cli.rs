use assert_cmd::Command;
use predicates::prelude::*;

mod common;
use common::{write_tree, Archive};

fn sitecar() -> Command {
    Command::cargo_bin("sitecar").unwrap()
}

#[test]
fn prints_file_name_in_directory_mode() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_tree(
        src.path(),
        &[("index.html", "<html></html>".as_bytes()), ("style.css", "body{}".as_bytes())],
    );

    let output = sitecar()
        .arg(src.path())
        .arg(dst.path())
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"^bafybei[a-z2-7]+\.car\n$").unwrap())
        .get_output()
        .stdout
        .clone();

    let file_name = String::from_utf8(output).unwrap();
    let archive = Archive::read(&dst.path().join(file_name.trim()));
    assert_eq!(
        format!("{}.car", archive.header.roots[0]),
        file_name.trim()
    );
}

#[test]
fn file_mode_is_quiet_and_replaces_stale_output() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_tree(src.path(), &[("index.html", "<html></html>".as_bytes())]);
    let out = dst.path().join("site.car");
    std::fs::create_dir_all(out.join("stale")).unwrap();

    sitecar()
        .arg(src.path())
        .arg(&out)
        .args(["--chunker", "size-1024", "--hash", "blake3"])
        .assert()
        .success()
        .stdout("");

    let archive = Archive::read(&out);
    assert_eq!(archive.header.roots[0].hash().code(), 0x1e);
}

#[test]
fn failures_exit_with_one() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_tree(src.path(), &[("index.html", "<img src=\"/logo.png\">".as_bytes())]);

    sitecar()
        .arg(src.path())
        .arg(dst.path())
        .assert()
        .code(1)
        .stdout("")
        .stderr(predicate::str::contains("src=\"/logo.png\""));
    assert_eq!(std::fs::read_dir(dst.path()).unwrap().count(), 0);

    sitecar()
        .arg(src.path())
        .assert()
        .code(1)
        .stderr(predicate::str::contains("DESTINATION"));

    sitecar()
        .arg(src.path())
        .arg(dst.path())
        .args(["--chunker", "rabin"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("unknown chunker"));
}

#[test]
fn custom_entry_point() {
    let src = tempfile::tempdir().unwrap();
    let dst = tempfile::tempdir().unwrap();
    write_tree(src.path(), &[("index.html", "<html></html>".as_bytes())]);

    sitecar()
        .arg(src.path())
        .arg(dst.path())
        .args(["--entry-point", "main.html"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("\"main.html\""));
}
