use std::path::Path;

use quiz_core::EngineConfig;

use crate::error::SettingsError;

/// Read and validate an engine config from a TOML file.
///
/// Keys that are absent keep their defaults, so an empty file is valid.
///
/// # Errors
///
/// Returns `SettingsError::Io` if the file cannot be read and `SettingsError::Config`
/// if it does not parse or validate.
pub fn load_config(path: impl AsRef<Path>) -> Result<EngineConfig, SettingsError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| SettingsError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = EngineConfig::from_toml_str(&raw)?;
    tracing::debug!(path = %path.display(), ?config, "engine config loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_overrides_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "question_time_limit_secs = 15").unwrap();
        writeln!(file, "[scoring]").unwrap();
        writeln!(file, "base_points = 50").unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.question_time_limit_secs(), 15);
        assert_eq!(config.scoring().base_points(), 50);
        assert_eq!(config.scoring().max_time_bonus(), 100);
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, SettingsError::Io { .. }));
    }

    #[test]
    fn invalid_values_are_config_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "question_time_limit_secs = 0").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(matches!(err, SettingsError::Config(_)));
    }
}
