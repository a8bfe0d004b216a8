//! Harness configuration loaded from TOML files.

use std::io::Write;

use jury_core::{ExecutionMode, HarnessConfig};

#[test]
fn config_round_trips_through_a_toml_file() -> anyhow::Result<()> {
    let config = HarnessConfig::default()
        .with_threshold(0.7)
        .with_execution_mode(ExecutionMode::Sequential)
        .with_verbose_mode(true);

    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(toml::to_string(&config)?.as_bytes())?;

    let loaded: HarnessConfig = toml::from_str(&std::fs::read_to_string(file.path())?)?;
    assert_eq!(loaded, config);
    Ok(())
}

#[test]
fn partial_toml_file_falls_back_to_defaults() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("jury.toml");
    std::fs::write(&path, "strict_mode = true\ninclude_reason = false\n")?;

    let loaded: HarnessConfig = toml::from_str(&std::fs::read_to_string(&path)?)?;
    assert!(loaded.strict_mode);
    assert!(!loaded.include_reason);
    assert_eq!(loaded.threshold, 0.5);
    assert_eq!(loaded.execution_mode, ExecutionMode::Concurrent);
    assert_eq!(loaded.effective_threshold(), 1.0);
    Ok(())
}

#[test]
fn unknown_execution_mode_is_rejected() {
    let res = toml::from_str::<HarnessConfig>("execution_mode = \"eventually\"\n");
    assert!(res.is_err());
}
