use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn workdir(name: &str) -> PathBuf {
    let dir = PathBuf::from(env!("CARGO_TARGET_TMPDIR")).join(name);
    fs::remove_dir_all(&dir).ok();
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn gii2stl() -> Command {
    Command::new(env!("CARGO_BIN_EXE_gii2stl"))
}

#[test]
fn one_input_aborts_before_writing() {
    let dir = workdir("cli_one_input");
    let input = dir.join("lh.surf.gii");
    fs::write(&input, "irrelevant").unwrap();

    let out = gii2stl()
        .arg("-i")
        .arg(&input)
        .arg("-o")
        .arg(dir.join("out.stl"))
        .arg("-s")
        .arg(dir.join("smooth.mlx"))
        .output()
        .unwrap();

    assert!(!out.status.success());
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("exactly two"), "stdout was: {stdout}");
    assert!(!dir.join("out.stl").exists());
    assert!(!dir.join("out_lh.stl").exists());
}

#[test]
fn three_inputs_abort_before_writing() {
    let dir = workdir("cli_three_inputs");
    let a = dir.join("lh.surf.gii");
    let b = dir.join("rh.surf.gii");
    let c = dir.join("mid.surf.gii");
    for p in [&a, &b, &c] {
        fs::write(p, "irrelevant").unwrap();
    }

    let out = gii2stl()
        .arg("-i")
        .arg(&a)
        .arg(&b)
        .arg(&c)
        .arg("-o")
        .arg(dir.join("out.stl"))
        .arg("-s")
        .arg(dir.join("smooth.mlx"))
        .output()
        .unwrap();

    assert!(!out.status.success());
    assert!(!dir.join("out.stl").exists());
    assert!(!dir.join("out_lh.stl").exists());
    assert!(!dir.join("out_rh.stl").exists());
}

#[test]
fn missing_required_argument_fails() {
    let out = gii2stl().arg("-i").arg("lh.gii").arg("rh.gii").output().unwrap();
    assert!(!out.status.success());
}
