use crate::language::Language;
use serde::{Deserialize, Serialize};

/// Configuration for chunk extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Function-name prefixes that classify a receiver-less function as a test
    pub test_prefixes: Vec<String>,

    /// Capture leading documentation comments into `Chunk::doc`
    pub include_documentation: bool,

    /// What a file-level parse failure takes down with it
    pub parse_failure_policy: ParseFailurePolicy,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            test_prefixes: Language::Go
                .test_name_prefixes()
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
            include_documentation: true,
            parse_failure_policy: ParseFailurePolicy::SkipFile,
        }
    }
}

impl ChunkerConfig {
    /// Create config where any malformed file skips its whole compilation unit
    pub fn strict_units() -> Self {
        Self {
            parse_failure_policy: ParseFailurePolicy::SkipUnit,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.test_prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err("test_prefixes must not contain empty prefixes".to_string());
        }

        Ok(())
    }

    /// Whether a function name follows the test naming convention
    pub fn is_test_name(&self, name: &str) -> bool {
        self.test_prefixes
            .iter()
            .any(|prefix| name.starts_with(prefix.as_str()))
    }
}

/// Isolation granularity for syntactically invalid files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseFailurePolicy {
    /// Drop the malformed file; the rest of its unit is still chunked
    SkipFile,

    /// Drop the whole unit the malformed file belongs to
    SkipUnit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChunkerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.test_prefixes, vec!["Test".to_string()]);
        assert_eq!(config.parse_failure_policy, ParseFailurePolicy::SkipFile);
    }

    #[test]
    fn test_strict_units() {
        let config = ChunkerConfig::strict_units();
        assert_eq!(config.parse_failure_policy, ParseFailurePolicy::SkipUnit);
        assert!(config.include_documentation);
    }

    #[test]
    fn test_invalid_config() {
        let config = ChunkerConfig {
            test_prefixes: vec![" ".to_string()],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_is_test_name() {
        let config = ChunkerConfig::default();
        assert!(config.is_test_name("TestSave"));
        assert!(config.is_test_name("Testify"));
        assert!(!config.is_test_name("testSave"));
        assert!(!config.is_test_name("Save"));
    }
}
