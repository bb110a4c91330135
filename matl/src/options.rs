//! Codec behaviour options
//!
//! Options can be built in code or loaded from a TOML file:
//!
//! ```toml
//! size_check = "warn"
//! report_anomalies = false
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// What to do when an entity header does not occupy its documented size
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeCheck {
    /// Fail with [`MatlError::SizeMismatch`](crate::MatlError::SizeMismatch)
    #[default]
    Strict,
    /// Log a warning; the reader then resumes at the documented size
    Warn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    pub size_check: SizeCheck,
    /// Log tolerated oddities such as non-empty reserved descriptors
    pub report_anomalies: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            size_check: SizeCheck::Strict,
            report_anomalies: true,
        }
    }
}

impl CodecOptions {
    /// Lenient options: size mismatches are logged instead of failing
    pub fn lenient() -> Self {
        Self {
            size_check: SizeCheck::Warn,
            ..Default::default()
        }
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load options from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let options = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded codec options from {}", path.as_ref().display());
        Ok(options)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MatlError;

    #[test]
    fn test_defaults() {
        let options = CodecOptions::default();
        assert_eq!(options.size_check, SizeCheck::Strict);
        assert!(options.report_anomalies);
    }

    #[test]
    fn test_parse_partial() {
        let options = CodecOptions::from_toml_str("size_check = \"warn\"").unwrap();
        assert_eq!(options.size_check, SizeCheck::Warn);
        assert!(options.report_anomalies);

        let options = CodecOptions::from_toml_str("").unwrap();
        assert_eq!(options, CodecOptions::default());
    }

    #[test]
    fn test_parse_invalid() {
        let err = CodecOptions::from_toml_str("size_check = \"sometimes\"").unwrap_err();
        assert!(matches!(err, MatlError::Config(_)));
    }

    #[test]
    fn test_toml_roundtrip() {
        let options = CodecOptions {
            size_check: SizeCheck::Warn,
            report_anomalies: false,
        };
        let text = options.to_toml_string().unwrap();
        assert!(text.contains("size_check = \"warn\""));
        assert_eq!(CodecOptions::from_toml_str(&text).unwrap(), options);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matl.toml");
        std::fs::write(&path, "report_anomalies = false\n").unwrap();
        let options = CodecOptions::load(&path).unwrap();
        assert!(!options.report_anomalies);
        assert_eq!(options.size_check, SizeCheck::Strict);
    }
}
