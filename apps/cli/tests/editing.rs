use std::error::Error;
use std::fs;
use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::{tempdir, TempDir};

const SAMPLE: &str = "主函数() {\n    输出(\"你好\", 42); // 注释\n}\n结束\n";

fn cli(workspace: &Path) -> Result<Command, Box<dyn Error>> {
    let mut cmd = Command::cargo_bin("chplus-ide")?;
    cmd.arg("--workspace").arg(workspace);
    Ok(cmd)
}

fn sample(name: &str, contents: &str) -> Result<(TempDir, std::path::PathBuf), Box<dyn Error>> {
    let workspace = tempdir()?;
    let path = workspace.path().join(name);
    fs::write(&path, contents)?;
    Ok((workspace, path))
}

#[test]
fn highlight_lists_tokens_with_one_based_columns() -> Result<(), Box<dyn Error>> {
    let (workspace, path) = sample("demo.ch", SAMPLE)?;

    cli(workspace.path())?
        .arg("highlight")
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("1:1\tkeyword\t主函数"))
        .stdout(predicate::str::contains("2:8\tstring\t\"你好\""))
        .stdout(predicate::str::contains("2:14\tnumber\t42"))
        .stdout(predicate::str::contains("2:19\tcomment\t// 注释"));
    Ok(())
}

#[test]
fn highlight_json_is_machine_readable() -> Result<(), Box<dyn Error>> {
    let (workspace, path) = sample("demo.ch", SAMPLE)?;

    let output = cli(workspace.path())?
        .args(["highlight", "--format", "json"])
        .arg(&path)
        .output()?;
    assert!(output.status.success());
    let lines: serde_json::Value = serde_json::from_slice(&output.stdout)?;
    assert_eq!(lines[0]["spans"][0]["kind"], "keyword");
    assert_eq!(lines[1]["line"], 2);
    Ok(())
}

#[test]
fn brackets_reports_partner_position() -> Result<(), Box<dyn Error>> {
    let (workspace, path) = sample("demo.ch", SAMPLE)?;

    cli(workspace.path())?
        .args(["brackets", "--line", "1", "--column", "8"])
        .arg(&path)
        .assert()
        .success()
        .stdout("1:7 -> 3:1\n");

    cli(workspace.path())?
        .args(["brackets", "--line", "4", "--column", "1"])
        .arg(&path)
        .assert()
        .success()
        .stdout("No matching bracket.\n");
    Ok(())
}

#[test]
fn fold_hides_block_body() -> Result<(), Box<dyn Error>> {
    let (workspace, path) = sample("demo.ch", SAMPLE)?;

    cli(workspace.path())?
        .args(["fold", "--line", "1"])
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("主函数() { ..."))
        .stdout(predicate::str::contains("输出").not())
        .stdout(predicate::str::contains("结束"))
        .stderr(predicate::str::contains("Folded lines 2-3"));
    Ok(())
}

#[test]
fn edit_toggle_comment_writes_in_place() -> Result<(), Box<dyn Error>> {
    let (workspace, path) = sample("lines.ch", "a\nb\nc")?;

    cli(workspace.path())?
        .args(["edit", "toggle-comment", "--lines", "1-2", "--in-place"])
        .arg(&path)
        .assert()
        .success()
        .stderr(predicate::str::contains("Commented lines"));
    assert_eq!(fs::read_to_string(&path)?, "//a\n//b\nc");

    cli(workspace.path())?
        .args(["edit", "duplicate", "--lines", "3"])
        .arg(&path)
        .assert()
        .success()
        .stdout("//a\n//b\nc\nc\n");
    Ok(())
}

#[test]
fn edit_rejects_lines_past_the_end() -> Result<(), Box<dyn Error>> {
    let (workspace, path) = sample("lines.ch", "a\nb")?;

    cli(workspace.path())?
        .args(["edit", "delete", "--lines", "2-9"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("line 9 is beyond the end"));
    Ok(())
}

#[test]
fn normalize_leaves_strings_alone() -> Result<(), Box<dyn Error>> {
    let (workspace, path) = sample("punct.ch", "输出（\"你好，世界\"）；")?;

    cli(workspace.path())?
        .arg("normalize")
        .arg(&path)
        .assert()
        .success()
        .stdout("输出(\"你好，世界\");\n");

    cli(workspace.path())?
        .args(["normalize", "--include-strings"])
        .arg(&path)
        .assert()
        .success()
        .stdout("输出(\"你好,世界\");\n");
    Ok(())
}

#[test]
fn in_place_writes_keep_crlf_line_endings() -> Result<(), Box<dyn Error>> {
    let (workspace, path) = sample("crlf.ch", "输出（1）；\r\n结束\r\n")?;

    cli(workspace.path())?
        .args(["normalize", "--in-place"])
        .arg(&path)
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&path)?, "输出(1);\r\n结束\r\n");

    cli(workspace.path())?
        .args(["edit", "toggle-comment", "--lines", "2", "--in-place"])
        .arg(&path)
        .assert()
        .success();
    assert_eq!(fs::read_to_string(&path)?, "输出(1);\r\n//结束\r\n");
    Ok(())
}

#[test]
fn find_lists_matches_or_wraps_from_cursor() -> Result<(), Box<dyn Error>> {
    let (workspace, path) = sample("find.ch", "输出(1);\n如果 (x) {\n    输出(x);\n}")?;

    cli(workspace.path())?
        .arg("find")
        .arg(&path)
        .arg("输出")
        .assert()
        .success()
        .stdout("1:1\n3:5\n");

    cli(workspace.path())?
        .args(["find", "--line", "3", "--column", "6"])
        .arg(&path)
        .arg("输出")
        .assert()
        .success()
        .stdout("1:1\n");

    cli(workspace.path())?
        .arg("find")
        .arg(&path)
        .arg("否则")
        .assert()
        .success()
        .stdout("Not found: 否则\n");
    Ok(())
}

#[test]
fn replace_rewrites_every_occurrence() -> Result<(), Box<dyn Error>> {
    let (workspace, path) = sample("replace.ch", "输出(1);\r\n输出(2);\r\n")?;

    cli(workspace.path())?
        .args(["replace", "--in-place"])
        .arg(&path)
        .args(["输出", "打印"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Replaced 2 occurrence(s)"));
    assert_eq!(fs::read_to_string(&path)?, "打印(1);\r\n打印(2);\r\n");
    Ok(())
}

#[test]
fn doc_and_catalog_lookups() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;

    cli(workspace.path())?
        .args(["doc", "如果()"])
        .assert()
        .success()
        .stdout(predicate::str::contains("条件判断"));

    cli(workspace.path())?
        .args(["doc", "不存在的词"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown keyword"));

    cli(workspace.path())?
        .args(["catalog", "--node", "控制台"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("控制台\n  - 控制台输出()\n"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn run_uses_interpreter_and_records_recent_file() -> Result<(), Box<dyn Error>> {
    let (workspace, script) = sample("hello.sh", "echo \"ran $0\"\nexit 2\n")?;

    cli(workspace.path())?
        .arg("run")
        .arg(&script)
        .args(["--interpreter", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ran "))
        .stdout(predicate::str::contains("hello.sh"))
        .stdout(predicate::str::contains("进程退出码: 2"));

    cli(workspace.path())?
        .args(["settings", "recent"])
        .assert()
        .success()
        .stdout(predicate::str::contains("hello.sh"));
    Ok(())
}

#[cfg(unix)]
#[test]
fn run_honours_working_dir_flag() -> Result<(), Box<dyn Error>> {
    let (workspace, script) = sample("pwd.sh", "pwd\n")?;
    let elsewhere = tempdir()?;
    let expected = elsewhere.path().canonicalize()?;

    cli(workspace.path())?
        .arg("run")
        .arg(&script)
        .args(["--interpreter", "bash", "--no-pause", "--working-dir"])
        .arg(&expected)
        .assert()
        .success()
        .stdout(predicate::str::contains(expected.display().to_string()));
    Ok(())
}

#[test]
fn run_without_script_reports_on_console() -> Result<(), Box<dyn Error>> {
    let workspace = tempdir()?;
    let missing = workspace.path().join("missing.ch");

    cli(workspace.path())?
        .arg("run")
        .arg(&missing)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("运行错误: script "))
        .stdout(predicate::str::contains("does not exist"));
    Ok(())
}
