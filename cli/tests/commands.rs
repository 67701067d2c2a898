use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};

const FLAG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100">
<defs><rect id="shapeA" width="100" height="80" fill="#123456"/></defs>
<use href="#shapeA"/>
<line x1="0" y1="90" x2="100" y2="91" stroke="#00ff00"/>
</svg>"##;

fn nurie() -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_nurie-cli"));
    command.env("RUST_LOG", "off");
    command
}

fn write_flag(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("flag.svg");
    std::fs::write(&path, FLAG).expect("write svg");
    path
}

fn stdout(output: &Output) -> String {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn normalize_inlines_uses_and_renames_ids() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write_flag(dir.path());
    let output = nurie()
        .args(["normalize", "--seed", "7"])
        .arg(&file)
        .output()
        .expect("run");
    let svg = stdout(&output);
    assert!(!svg.contains("<use"));
    assert!(!svg.contains("shapeA"));
    assert!(svg.contains(r#"id="id_"#));
    assert!(svg.contains(r##"fill="#123456""##));
}

#[test]
fn pieces_lists_palette_and_rejections() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write_flag(dir.path());
    let output = nurie().arg("pieces").arg(&file).output().expect("run");
    let text = stdout(&output);
    assert!(text.contains("0: <rect> fill=#123456"), "{text}");
    assert!(text.contains(" *0: #123456"), "{text}");
    assert!(text.contains("<line>"), "{text}");
}

#[test]
fn identical_files_score_full() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write_flag(dir.path());
    let output = nurie()
        .args(["score", "--config"])
        .arg(dir.path().join("small.json"))
        .arg(&file)
        .arg(&file)
        .output();
    // a missing config file is an error
    assert!(!output.expect("run").status.success());

    std::fs::write(dir.path().join("small.json"), r#"{"raster":{"width":32,"height":32}}"#)
        .expect("write config");
    let output = nurie()
        .arg("score")
        .arg("--config")
        .arg(dir.path().join("small.json"))
        .arg(&file)
        .arg(&file)
        .output()
        .expect("run");
    assert_eq!(stdout(&output).trim(), "100");
}

#[test]
fn config_prints_merged_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{"clear_score":90}"#).expect("write config");
    let output = nurie()
        .arg("config")
        .env("NURIE_CONFIG", &path)
        .output()
        .expect("run");
    let text = stdout(&output);
    assert!(text.contains(r#""clear_score": 90"#), "{text}");
    assert!(text.contains(r#""manifest_dir": "data""#), "{text}");

    std::fs::write(&path, r#"{"area_ratio":2.0}"#).expect("write config");
    let output = nurie()
        .arg("config")
        .env("NURIE_CONFIG", &path)
        .output()
        .expect("run");
    assert!(!output.status.success());
}

#[test]
fn render_writes_png() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file = write_flag(dir.path());
    let out = dir.path().join("flag.png");
    let output = nurie()
        .arg("render")
        .arg(&file)
        .arg("--out")
        .arg(&out)
        .args(["--width", "16", "--height", "16"])
        .output()
        .expect("run");
    stdout(&output);
    let png = std::fs::read(&out).expect("png");
    assert_eq!(&png[1..4], b"PNG");
}

#[test]
fn play_session_paints_and_saves() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_flag(dir.path());
    let saved = dir.path().join("saved.svg");
    let mut child = nurie()
        .arg("play")
        .arg("--root")
        .arg(dir.path())
        .args(["--file", "flag.svg", "--seed", "1"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    {
        let mut stdin = child.stdin.take().expect("stdin");
        writeln!(stdin, "show").expect("write");
        writeln!(stdin, "paint 0").expect("write");
        writeln!(stdin, "swatch 5").expect("write");
        writeln!(stdin, "save {}", saved.display()).expect("write");
        writeln!(stdin, "quit").expect("write");
    }
    let output = child.wait_with_output().expect("wait");
    let text = stdout(&output);
    assert!(text.contains("score: 0 (best 85)"), "{text}");
    assert!(text.contains("score: 100"), "{text}");
    assert!(text.contains("ignored"), "{text}");
    let svg = std::fs::read_to_string(&saved).expect("saved");
    assert!(svg.contains(r##"fill="#123456""##));
}
