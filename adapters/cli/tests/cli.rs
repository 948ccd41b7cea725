use std::{
    fs,
    path::{Path, PathBuf},
    process::{Command, Output},
};

fn assets_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets")
}

fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!(
        "kinetic-perimetry-{}-{name}",
        std::process::id()
    ));
    fs::write(&path, contents).expect("failed to write scratch file");
    path
}

fn run(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kinetic-perimetry"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to launch kinetic-perimetry")
}

#[test]
fn sample_session_exports_every_detection_as_csv() {
    let assets = assets_dir();
    let output_path = std::env::temp_dir().join(format!(
        "kinetic-perimetry-{}-sample.csv",
        std::process::id()
    ));
    let output = run(&[
        "--config",
        assets.join("perimetry.toml").to_str().expect("utf-8 path"),
        "--script",
        assets.join("session.toml").to_str().expect("utf-8 path"),
        "--seed",
        "7",
        "--output",
        output_path.to_str().expect("utf-8 path"),
    ]);

    assert!(
        output.status.success(),
        "replay failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let csv = fs::read_to_string(&output_path).expect("export written");
    let lines: Vec<_> = csv.lines().collect();
    assert_eq!(
        lines[0],
        "index,size,meridian_deg,theta_deg,phi_deg,eccentricity_deg"
    );
    assert_eq!(lines.len(), 5, "unexpected export:\n{csv}");
    assert!(lines[1..].iter().all(|line| line.contains(",IV,")));

    let _ = fs::remove_file(output_path);
}

#[test]
fn halfway_detection_is_reported_as_json() {
    let config = scratch_file(
        "halfway-config.toml",
        r#"
        meridians_deg = [0.0]
        randomize_meridians = false
        wait_duration_secs = 0.0

        [enabled_sizes]
        V = true
        "#,
    );
    let script = scratch_file(
        "halfway-script.toml",
        r#"
        [[events]]
        at_secs = 0.0
        action = "start"

        [[events]]
        at_secs = 4.5
        action = "detect"
        "#,
    );

    let output = run(&[
        "--config",
        config.to_str().expect("utf-8 path"),
        "--script",
        script.to_str().expect("utf-8 path"),
        "--frame-ms",
        "500",
        "--format",
        "json",
    ]);

    assert!(
        output.status.success(),
        "replay failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let rows: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json on stdout");
    let rows = rows.as_array().expect("array of records");
    assert_eq!(rows.len(), 1);

    let record = &rows[0];
    assert_eq!(record["size"], "V");
    assert_eq!(record["meridian_deg"], 0.0);
    let theta = record["theta_deg"].as_f64().expect("theta");
    let phi = record["phi_deg"].as_f64().expect("phi");
    let expected_phi = 90.0 * std::f64::consts::FRAC_1_SQRT_2;
    assert!(theta.abs() < 1e-6);
    assert!((phi - expected_phi).abs() < 1e-6, "phi = {phi}");
    assert!(record["eccentricity_deg"].as_f64().expect("eccentricity") > 0.0);

    let _ = fs::remove_file(config);
    let _ = fs::remove_file(script);
}

#[test]
fn invalid_configuration_is_reported() {
    let config = scratch_file("invalid-config.toml", "[enabled_sizes]\nIII = false\n");
    let script = scratch_file("invalid-script.toml", "");

    let output = run(&[
        "--config",
        config.to_str().expect("utf-8 path"),
        "--script",
        script.to_str().expect("utf-8 path"),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("no stimulus size is enabled"),
        "unexpected stderr: {stderr}"
    );

    let _ = fs::remove_file(config);
    let _ = fs::remove_file(script);
}
