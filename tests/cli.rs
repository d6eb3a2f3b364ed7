use assert_cmd::prelude::*;
use color_eyre::Result;
use std::fs;
use std::process::Command;

const MISSING_INTERFACE: &str = "dfnb-missing0";

#[test]
fn test_help_output() -> Result<()> {
    let output = Command::cargo_bin("dragonfly-boot")?.arg("--help").output()?;
    assert!(output.status.success());

    let stdout_str = String::from_utf8_lossy(&output.stdout);
    assert!(stdout_str.contains("Usage: dragonfly-boot"), "Missing usage text");
    for flag in ["--interface", "--file", "--output", "--local", "--retries", "--timeout"] {
        assert!(stdout_str.contains(flag), "Missing {} flag", flag);
    }
    Ok(())
}

#[test]
fn test_falls_back_to_local_image() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let local = dir.path().join("vmlinux.local");
    let output_path = dir.path().join("vmlinux");
    let kernel: Vec<u8> = (0..4096u32).map(|i| (i % 256) as u8).collect();
    fs::write(&local, &kernel)?;

    let output = Command::cargo_bin("dragonfly-boot")?
        .args(["--interface", MISSING_INTERFACE])
        .arg("--local")
        .arg(&local)
        .arg("--output")
        .arg(&output_path)
        .output()?;

    assert!(
        output.status.success(),
        "Fallback boot failed. Stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert_eq!(fs::read(&output_path)?, kernel);

    let stdout_str = String::from_utf8_lossy(&output.stdout);
    assert!(stdout_str.contains("local image"), "Missing image source");
    Ok(())
}

#[test]
fn test_fails_without_any_image() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let output_path = dir.path().join("vmlinux");

    let output = Command::cargo_bin("dragonfly-boot")?
        .args(["--interface", MISSING_INTERFACE])
        .arg("--output")
        .arg(&output_path)
        .output()?;

    assert!(!output.status.success());
    assert!(!output_path.exists());
    Ok(())
}

#[test]
fn test_rejects_invalid_chunk_size() -> Result<()> {
    let dir = tempfile::tempdir()?;

    let output = Command::cargo_bin("dragonfly-boot")?
        .args(["--interface", MISSING_INTERFACE, "--chunk-size", "1000"])
        .arg("--output")
        .arg(dir.path().join("vmlinux"))
        .output()?;

    assert!(!output.status.success());
    let stderr_str = String::from_utf8_lossy(&output.stderr);
    assert!(stderr_str.contains("Invalid boot configuration"), "stderr: {}", stderr_str);
    Ok(())
}
