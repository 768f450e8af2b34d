use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;

use crate::ConfigError;

const BUILTIN_SYNONYMS: &str = include_str!("../../../config/category_synonyms.yaml");

#[derive(Debug, Deserialize)]
struct SynonymsFile {
    subcategories: BTreeMap<String, Vec<String>>,
}

/// Many-to-one map from free-text product-type aliases to canonical
/// subcategory names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynonymTable {
    aliases: HashMap<String, String>,
}

impl SynonymTable {
    /// Parses and validates a synonyms document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SynonymsFileParse`] for malformed YAML and
    /// [`ConfigError::Validation`] for empty names or an alias claimed by two
    /// subcategories.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let file: SynonymsFile = serde_yaml::from_str(content)?;
        build_table(file)
    }

    /// The table compiled into the binary from `config/category_synonyms.yaml`.
    ///
    /// # Errors
    ///
    /// Only fails if the bundled file itself is invalid.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_yaml(BUILTIN_SYNONYMS)
    }

    /// Returns the canonical subcategory for `alias`, ignoring case and
    /// surrounding whitespace.
    #[must_use]
    pub fn lookup(&self, alias: &str) -> Option<&str> {
        self.aliases
            .get(&normalize(alias))
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}

/// Load and validate the synonym table from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_synonyms(path: &Path) -> Result<SynonymTable, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::SynonymsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    SynonymTable::from_yaml(&content)
}

/// Like [`load_synonyms`], but falls back to the built-in table when the file
/// does not exist. A file that exists but is invalid is still an error.
///
/// # Errors
///
/// Returns `ConfigError` if an existing file cannot be read, parsed, or fails
/// validation.
pub fn load_synonyms_or_builtin(path: &Path) -> Result<SynonymTable, ConfigError> {
    match load_synonyms(path) {
        Err(ConfigError::SynonymsFileIo { source, .. })
            if source.kind() == std::io::ErrorKind::NotFound =>
        {
            tracing::warn!(
                path = %path.display(),
                "category synonyms file not found; using built-in table"
            );
            SynonymTable::builtin()
        }
        other => other,
    }
}

fn build_table(file: SynonymsFile) -> Result<SynonymTable, ConfigError> {
    let mut aliases: HashMap<String, String> = HashMap::new();

    for (canonical, entries) in file.subcategories {
        let canonical = canonical.trim().to_string();
        if canonical.is_empty() {
            return Err(ConfigError::Validation(
                "subcategory name must be non-empty".to_string(),
            ));
        }

        for entry in entries {
            let alias = normalize(&entry);
            if alias.is_empty() {
                return Err(ConfigError::Validation(format!(
                    "subcategory '{canonical}' has an empty alias"
                )));
            }

            match aliases.get(&alias) {
                Some(existing) if *existing != canonical => {
                    return Err(ConfigError::Validation(format!(
                        "alias '{alias}' maps to both '{existing}' and '{canonical}'"
                    )));
                }
                Some(_) => {}
                None => {
                    aliases.insert(alias, canonical.clone());
                }
            }
        }
    }

    Ok(SynonymTable { aliases })
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
#[path = "synonyms_test.rs"]
mod tests;
