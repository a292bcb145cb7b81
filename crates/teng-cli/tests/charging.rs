use assert_cmd::cargo::cargo_bin_cmd;
use serde::Deserialize;
use std::{error::Error, fmt::Write, fs, path::Path};
use tempfile::tempdir;

#[derive(Deserialize)]
struct Profile {
    max_voltage: f64,
    time_at_max: f64,
    time_to_fraction: Option<f64>,
}

#[derive(Deserialize)]
struct Line {
    label: String,
    profile: Profile,
}

/// Logger export: "ms volts" with decimal commas, RC charging towards `v_inf`.
fn write_logger_export(path: &Path, tau_s: f64, v_inf: f64) {
    let mut text = String::new();
    for i in 0..=600 {
        let t_ms = i as f64 * 10.0;
        let v = if t_ms < 500.0 {
            -1.0
        } else {
            v_inf * (1.0 - (-(t_ms - 500.0) / 1000.0 / tau_s).exp())
        };
        let line = format!("{:.1}\t{:.9}", t_ms, v).replace('.', ",");
        writeln!(text, "{}", line).unwrap();
    }
    fs::write(path, text).unwrap();
}

#[test]
fn charging_reports_one_line_per_file() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let small = dir.path().join("1uF.xls");
    let large = dir.path().join("10uF.xls");
    write_logger_export(&small, 0.5, 8.0);
    write_logger_export(&large, 2.0, 8.0);

    let mut cmd = cargo_bin_cmd!("teng");
    cmd.arg("charging")
        .arg("--input")
        .arg(&small)
        .arg("--input")
        .arg(&large)
        .args(["--label", "1µF"]);
    let out = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(out)?;
    let lines: Vec<Line> = text
        .lines()
        .map(serde_json::from_str)
        .collect::<Result<_, _>>()?;

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0].label, "1µF");
    assert_eq!(lines[1].label, "10uF");
    // Time axis is re-zeroed at the 500 ms cut.
    assert!((lines[0].profile.time_at_max - 5.5).abs() < 1e-9);
    let fast = lines[0].profile.time_to_fraction.expect("90% point");
    let slow = lines[1].profile.time_to_fraction.expect("90% point");
    assert!(fast < slow);
    assert!(lines[0].profile.max_voltage > lines[1].profile.max_voltage);
    Ok(())
}

#[test]
fn charging_text_output_and_plot() -> Result<(), Box<dyn Error>> {
    let dir = tempdir()?;
    let input = dir.path().join("curve.txt");
    let png = dir.path().join("charging.png");
    write_logger_export(&input, 1.0, 5.0);

    let mut cmd = cargo_bin_cmd!("teng");
    cmd.arg("charging")
        .arg("--input")
        .arg(&input)
        .args(["--format", "text", "--fraction", "0.5"])
        .arg("--plot")
        .arg(&png);
    let out = cmd.assert().success().get_output().stdout.clone();
    let text = String::from_utf8(out)?;
    assert!(text.starts_with("curve: max "));
    assert!(text.contains("50% reached at"));
    assert!(fs::metadata(&png)?.len() > 0);
    Ok(())
}
