use crate::constants::{DEFAULT_BATCH_SIZE, DEFAULT_GROUP_TAG, DEFAULT_RECORD_TAG};
use crate::errors::{AppError, AppResult};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved configuration with all values filled in (no Options).
///
/// This struct represents the pipeline defaults and can be deserialized by the TOML
/// loader. All fields have concrete values, making it safe to access directly without unwrapping.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResolvedConfig {
    /// Records buffered per intermediate Parquet file.
    /// This also bounds the peak in-memory batch size.
    pub batch_size: usize,
    /// Tag establishing an identifier context for nested record tags.
    pub group_tag: String,
    /// Tag whose flattened subtree becomes one output row.
    pub record_tag: String,
    /// Policy name applied when a grouping tag has no `id` attribute:
    /// `"carry-forward"` (keep the previous context) or `"skip-group"`.
    pub missing_group_id: String,
    /// Directory receiving the intermediate chunk files.
    pub chunk_dir: PathBuf,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            group_tag: DEFAULT_GROUP_TAG.to_string(),
            record_tag: DEFAULT_RECORD_TAG.to_string(),
            missing_group_id: "carry-forward".to_string(),
            chunk_dir: PathBuf::from("."),
        }
    }
}

/// Configuration that can be loaded from a TOML file.
///
/// Deserializes required fields (input) and optional pipeline configuration.
/// The parser rejects unknown keys to catch typos, and validates that batch_size
/// and the boundary tags are non-degenerate.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionConfigFile {
    /// XML file to convert, or a directory of XML files
    pub input: PathBuf,
    /// Output Parquet file (or directory when `input` is a directory).
    /// Defaults to the input path with a `.parquet` extension.
    #[serde(default)]
    pub output: Option<PathBuf>,
    /// Whether to delete intermediate chunk files after the merge (defaults to `true`)
    #[serde(default = "default_cleanup")]
    pub cleanup: bool,
    /// Flattened resolved configuration with pipeline defaults
    #[serde(flatten)]
    pub resolved: ResolvedConfig,
}

impl ConversionConfigFile {
    /// Loads and validates configuration from a TOML file.
    ///
    /// Deserializes the TOML file and ensures all required fields are present.
    /// Validates that batch_size is greater than 0 and the boundary tags are
    /// non-empty. Rejects unknown keys to prevent typos from being silently ignored.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the TOML is malformed, required fields are missing,
    /// unknown keys are present, or a validated field is degenerate.
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let contents = fs::read_to_string(path)?;
        let config: ConversionConfigFile = toml::from_str(&contents)
            .map_err(|e| AppError::InvalidInput(format!("Failed to parse config: {e}")))?;

        config.resolved.validate()?;
        Ok(config)
    }
}

impl ResolvedConfig {
    /// Rejects degenerate values that would make the conversion loop misbehave.
    pub fn validate(&self) -> AppResult<()> {
        if self.batch_size == 0 {
            return Err(AppError::InvalidInput(
                "Batch size must be greater than 0".into(),
            ));
        }
        if self.group_tag.trim().is_empty() {
            return Err(AppError::InvalidInput("Group tag must not be empty".into()));
        }
        if self.record_tag.trim().is_empty() {
            return Err(AppError::InvalidInput(
                "Record tag must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_cleanup() -> bool {
    true
}
