use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

/// Contents of the exclusion denylist file.
///
/// ```yaml
/// exclusions:
///   - vloerverwarming
///   - cadeaubon
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct ExclusionsFile {
    #[serde(default)]
    pub exclusions: Vec<String>,
}

/// Load and validate the exclusion denylist from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_exclusions(path: &Path) -> Result<ExclusionsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ExclusionsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let file: ExclusionsFile =
        serde_yaml::from_str(&content).map_err(ConfigError::ExclusionsFileParse)?;

    validate_exclusions(&file)?;

    Ok(file)
}

/// Like [`load_exclusions`], but a missing file yields an empty denylist.
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read, parsed, or
/// validated.
pub fn load_exclusions_or_empty(path: &Path) -> Result<ExclusionsFile, ConfigError> {
    if !path.exists() {
        return Ok(ExclusionsFile::default());
    }
    load_exclusions(path)
}

fn validate_exclusions(file: &ExclusionsFile) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for (idx, entry) in file.exclusions.iter().enumerate() {
        let normalized = entry.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(ConfigError::InvalidExclusions(format!(
                "entry {idx} is blank"
            )));
        }
        if !seen.insert(normalized) {
            return Err(ConfigError::InvalidExclusions(format!(
                "duplicate entry \"{}\"",
                entry.trim()
            )));
        }
    }
    Ok(())
}
