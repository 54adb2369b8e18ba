// src/config.rs
//! Gather settings
//!
//! Loaded from a TOML file:
//!
//! ```toml
//! max_degree_of_parallelism = 16
//! request_timeout = "5m"
//!
//! [source_mapping]
//! "nuget.org" = ["*"]
//! contoso = ["Contoso.*"]
//! ```

use crate::error::{Error, Result};
use crate::source::PackageSourceMapping;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Tunables for a gather run
#[derive(Debug, Clone, Deserialize)]
pub struct GatherSettings {
    /// Maximum number of concurrent source requests
    #[serde(default = "default_max_degree_of_parallelism")]
    pub max_degree_of_parallelism: usize,

    /// Per-request timeout (e.g. "30s", "5m")
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,

    /// Which sources may answer for which package ids
    #[serde(default)]
    pub source_mapping: PackageSourceMapping,
}

fn default_max_degree_of_parallelism() -> usize {
    16
}

fn default_request_timeout() -> String {
    "5m".to_string()
}

impl Default for GatherSettings {
    fn default() -> Self {
        Self {
            max_degree_of_parallelism: default_max_degree_of_parallelism(),
            request_timeout: default_request_timeout(),
            source_mapping: PackageSourceMapping::default(),
        }
    }
}

impl GatherSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load settings from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate settings from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let settings: Self = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse gather settings: {}", e)))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<()> {
        if self.request_timeout()?.is_zero() {
            return Err(Error::Config(
                "request_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Effective parallelism, never below one
    pub fn degree_of_parallelism(&self) -> usize {
        self.max_degree_of_parallelism.max(1)
    }

    /// Parse the request timeout
    pub fn request_timeout(&self) -> Result<Duration> {
        parse_duration(&self.request_timeout)
    }
}

/// Parse a human-readable duration (e.g., "30s", "5m", "1h", "1d")
pub fn parse_duration(s: &str) -> Result<Duration> {
    let s = s.trim().to_lowercase();

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix("ms") {
        (n, 0)
    } else if let Some(n) = s.strip_suffix('d') {
        (n, 24 * 60 * 60)
    } else if let Some(n) = s.strip_suffix('h') {
        (n, 60 * 60)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Assume seconds
        (s.as_str(), 1)
    };

    let num: u64 = num_str
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("Invalid duration: {}", s)))?;

    if multiplier == 0 {
        return Ok(Duration::from_millis(num));
    }
    let secs = num
        .checked_mul(multiplier)
        .ok_or_else(|| Error::Config(format!("Duration out of range: {}", s)))?;
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::PackageId;
    use std::io::Write;

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_duration("1d").unwrap(), Duration::from_secs(86400));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert!(parse_duration("soon").is_err());
    }

    #[test]
    fn test_parse_duration_overflow() {
        let result = parse_duration("99999999999999999d");
        assert!(matches!(result, Err(Error::Config(_))));

        let result = GatherSettings::from_toml_str(r#"request_timeout = "99999999999999999d""#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_defaults() {
        let settings = GatherSettings::from_toml_str("").unwrap();
        assert_eq!(settings.max_degree_of_parallelism, 16);
        assert_eq!(settings.request_timeout().unwrap(), Duration::from_secs(300));
        assert!(!settings.source_mapping.is_enabled());
    }

    #[test]
    fn test_parallelism_clamped() {
        let settings = GatherSettings::from_toml_str("max_degree_of_parallelism = 0").unwrap();
        assert_eq!(settings.degree_of_parallelism(), 1);
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = GatherSettings::from_toml_str(r#"request_timeout = "0s""#);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
max_degree_of_parallelism = 4
request_timeout = "30s"

[source_mapping]
"nuget.org" = ["*"]
contoso = ["Contoso.*"]
"#
        )
        .unwrap();

        let settings = GatherSettings::load(file.path()).unwrap();
        assert_eq!(settings.degree_of_parallelism(), 4);
        assert_eq!(settings.request_timeout().unwrap(), Duration::from_secs(30));
        assert_eq!(
            settings
                .source_mapping
                .configured_sources(&PackageId::new("Contoso.Lib")),
            vec!["contoso"]
        );
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = GatherSettings::load(&dir.path().join("missing.toml"));
        assert!(matches!(result, Err(Error::IoError(_))));
    }
}
