use std::time::Duration;

use tempfile::tempdir;

use super::types::{HookTaskConfig, PropertyValue, RequestSpec};
use super::types::{DurationValue, LoadConfig, RunFile};
use super::{LoadProfile, Timings, load_run_file_at, parse_duration_value};

#[test]
fn parse_toml_run_file() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("grinder.toml");
    let content = r#"
artifacts-dir = "/tmp/run"
poll-interval = "500ms"

[executor]
path = "~/grinder/lib/grinder.jar"
properties-file = "base.properties"

[executor.properties]
"grinder.useConsole" = false
"grinder.threads" = 4

[scenario]
script = "scenario.py"
requests = ["http://localhost/a", { url = "http://localhost/b", method = "post" }]

[load]
concurrency = 10
ramp-up = "1m"
hold-for = 120
iterations = 5

[hooks]
prepare = ["echo prepare"]
"#;
    std::fs::write(&path, content).map_err(|err| format!("write failed: {}", err))?;

    let run = load_run_file_at(&path).map_err(|err| format!("load failed: {}", err))?;
    if run.artifacts_dir.as_deref() != Some("/tmp/run") {
        return Err("Unexpected artifacts dir".to_owned());
    }
    if run.executor.path.as_deref() != Some("~/grinder/lib/grinder.jar") {
        return Err("Unexpected tool path".to_owned());
    }
    if run.executor.properties.get("grinder.threads") != Some(&PropertyValue::Integer(4)) {
        return Err("Unexpected grinder.threads".to_owned());
    }
    if run.executor.version != "3.11" {
        return Err(format!("Unexpected default version: {}", run.executor.version));
    }

    let requests = run.scenario.requests();
    let expected = vec![
        RequestSpec {
            method: "GET".to_owned(),
            url: "http://localhost/a".to_owned(),
        },
        RequestSpec {
            method: "POST".to_owned(),
            url: "http://localhost/b".to_owned(),
        },
    ];
    if requests != expected {
        return Err(format!("Unexpected requests: {:?}", requests));
    }

    let profile =
        LoadProfile::from_config(&run.load).map_err(|err| format!("profile failed: {}", err))?;
    if profile.duration != Some(Duration::from_secs(120)) {
        return Err(format!("Unexpected duration: {:?}", profile.duration));
    }
    if profile.ramp_interval_ms() != Some(6000) {
        return Err(format!(
            "Unexpected ramp interval: {:?}",
            profile.ramp_interval_ms()
        ));
    }

    match run.hooks.prepare.first() {
        Some(HookTaskConfig::Command(command)) if command == "echo prepare" => Ok(()),
        other => Err(format!("Unexpected prepare hooks: {:?}", other)),
    }
}

#[test]
fn parse_json_run_file() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("grinder.json");
    let content = r#"{
  "scenario": { "requests": ["http://localhost/"] },
  "load": { "concurrency": 2 }
}"#;
    std::fs::write(&path, content).map_err(|err| format!("write failed: {}", err))?;

    let run = load_run_file_at(&path).map_err(|err| format!("load failed: {}", err))?;
    if run.scenario.requests.len() != 1 {
        return Err("Expected one request".to_owned());
    }
    let profile =
        LoadProfile::from_config(&run.load).map_err(|err| format!("profile failed: {}", err))?;
    if profile.ramp_interval_ms().is_some() {
        return Err("Ramp interval needs ramp-up".to_owned());
    }
    Ok(())
}

#[test]
fn unsupported_extension_is_rejected() -> Result<(), String> {
    let dir = tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
    let path = dir.path().join("grinder.yaml");
    std::fs::write(&path, "load: {}").map_err(|err| format!("write failed: {}", err))?;
    if load_run_file_at(&path).is_ok() {
        return Err("Expected yaml to be rejected".to_owned());
    }
    Ok(())
}

#[test]
fn parse_duration_units() -> Result<(), String> {
    let cases = [
        ("250ms", Duration::from_millis(250)),
        ("10", Duration::from_secs(10)),
        ("10s", Duration::from_secs(10)),
        ("2m", Duration::from_secs(120)),
        ("1h", Duration::from_secs(3600)),
    ];
    for (input, expected) in cases {
        let parsed = parse_duration_value(input).map_err(|err| err.to_string())?;
        if parsed != expected {
            return Err(format!("{} parsed as {:?}", input, parsed));
        }
    }
    for invalid in ["", "ms", "0s", "5d"] {
        if parse_duration_value(invalid).is_ok() {
            return Err(format!("Expected '{}' to be rejected", invalid));
        }
    }
    Ok(())
}

#[test]
fn timings_default_and_override() -> Result<(), String> {
    let defaults = Timings::from_run_file(&RunFile::default(), None)
        .map_err(|err| format!("resolve failed: {}", err))?;
    if defaults != Timings::default() || defaults.stop_grace != Duration::from_secs(10) {
        return Err(format!("Unexpected defaults: {:?}", defaults));
    }

    let run: RunFile = toml::from_str(
        r#"
poll-interval = "2s"

[executor]
stop-grace = "3s"
download-timeout = 15
"#,
    )
    .map_err(|err| format!("parse failed: {}", err))?;
    let timings = Timings::from_run_file(&run, Some(Duration::from_millis(250)))
        .map_err(|err| format!("resolve failed: {}", err))?;
    if timings.poll_interval != Duration::from_millis(250) {
        return Err("CLI poll interval must win".to_owned());
    }
    if timings.stop_grace != Duration::from_secs(3) || timings.download_timeout != Duration::from_secs(15) {
        return Err(format!("Unexpected timings: {:?}", timings));
    }
    Ok(())
}

#[test]
fn zero_ramp_up_means_no_ramp() -> Result<(), String> {
    for ramp_up in [DurationValue::Seconds(0), DurationValue::Text("0s".to_owned())] {
        let config = LoadConfig {
            concurrency: Some(4),
            ramp_up: Some(ramp_up),
            ..LoadConfig::default()
        };
        let profile =
            LoadProfile::from_config(&config).map_err(|err| format!("profile failed: {}", err))?;
        if profile.ramp_up.is_some() || profile.ramp_interval_ms().is_some() {
            return Err(format!("Zero ramp-up must be unset: {:?}", profile));
        }
    }

    let config = LoadConfig {
        duration: Some(DurationValue::Seconds(0)),
        ..LoadConfig::default()
    };
    if LoadProfile::from_config(&config).is_ok() {
        return Err("Zero duration must still be rejected".to_owned());
    }
    Ok(())
}
