//! Source-path profile store.
//!
//! A profile is a named, ordered list of directories or archives searched for
//! source and class files. `DEFAULT` and `SANDBOX` always exist and cannot be
//! removed. The store persists as a flat TOML table:
//!
//! ```toml
//! DEFAULT = []
//! SANDBOX = ["sandbox/sources"]
//! work = ["/home/me/project/src", "/opt/jdk/src.zip"]
//! ```

use super::config::BUILTIN_PROFILES;
use super::error::ConfigError;
use log::{debug, info};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Named source-path profiles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileStore {
    profiles: BTreeMap<String, Vec<String>>,
}

impl Default for ProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileStore {
    /// Create a store holding only the built-in profiles
    pub fn new() -> Self {
        let mut store = Self {
            profiles: BTreeMap::new(),
        };
        store.ensure_builtins();
        store
    }

    fn ensure_builtins(&mut self) {
        for name in BUILTIN_PROFILES {
            self.profiles.entry((*name).to_string()).or_default();
        }
    }

    /// Check whether a profile name is one of the built-ins
    pub fn is_builtin(name: &str) -> bool {
        BUILTIN_PROFILES.contains(&name)
    }

    /// Load a store from a TOML file
    ///
    /// A missing file yields the built-ins only.
    ///
    /// # Errors
    /// * `ConfigError::IoError` - If the file exists but cannot be read
    /// * `ConfigError::ParseFailed` - If the TOML is invalid
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("Profile store {} not found, using built-ins", path.display());
            return Ok(Self::new());
        }
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse a store from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let profiles: BTreeMap<String, Vec<String>> = toml::from_str(contents)?;
        let mut store = Self { profiles };
        store.ensure_builtins();
        Ok(store)
    }

    /// Serialize to TOML text
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(&self.profiles)?)
    }

    /// Write the store to a TOML file, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, self.to_toml()?)?;
        info!("Saved {} profiles to {}", self.profiles.len(), path.display());
        Ok(())
    }

    /// Profile names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Search paths of a profile
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.profiles.get(name).map(Vec::as_slice)
    }

    /// Create or replace a profile
    ///
    /// # Errors
    /// * `ConfigError::InvalidName` - Empty or whitespace-containing names
    pub fn set(&mut self, name: &str, paths: Vec<String>) -> Result<(), ConfigError> {
        if name.is_empty() || name.chars().any(char::is_whitespace) {
            return Err(ConfigError::InvalidName(name.to_string()));
        }
        self.profiles.insert(name.to_string(), paths);
        Ok(())
    }

    /// Remove a user profile
    ///
    /// # Errors
    /// * `ConfigError::BuiltinProfile` - `DEFAULT` and `SANDBOX` are permanent
    /// * `ConfigError::UnknownProfile` - No profile with that name
    pub fn remove(&mut self, name: &str) -> Result<Vec<String>, ConfigError> {
        if Self::is_builtin(name) {
            return Err(ConfigError::BuiltinProfile(name.to_string()));
        }
        self.profiles
            .remove(name)
            .ok_or_else(|| ConfigError::UnknownProfile(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::config::{PROFILE_DEFAULT, PROFILE_SANDBOX};

    #[test]
    fn test_builtins_always_present() {
        let store = ProfileStore::from_toml("work = [\"src\"]").unwrap();
        let names: Vec<&str> = store.names().collect();
        assert_eq!(names, vec![PROFILE_DEFAULT, PROFILE_SANDBOX, "work"]);
        assert_eq!(store.get("work").unwrap(), ["src".to_string()]);
    }

    #[test]
    fn test_builtins_cannot_be_removed() {
        let mut store = ProfileStore::new();
        assert!(matches!(
            store.remove(PROFILE_SANDBOX),
            Err(ConfigError::BuiltinProfile(_))
        ));
        assert!(matches!(
            store.remove("nope"),
            Err(ConfigError::UnknownProfile(_))
        ));
    }

    #[test]
    fn test_builtins_can_be_edited() {
        let mut store = ProfileStore::new();
        store
            .set(PROFILE_DEFAULT, vec!["/src/a".to_string(), "/src/b".to_string()])
            .unwrap();
        assert_eq!(store.get(PROFILE_DEFAULT).unwrap().len(), 2);
    }

    #[test]
    fn test_invalid_name_rejected() {
        let mut store = ProfileStore::new();
        assert!(store.set("", vec![]).is_err());
        assert!(store.set("my profile", vec![]).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested/profiles.toml");

        let mut store = ProfileStore::new();
        store
            .set("work", vec!["/a".to_string(), "/b".to_string()])
            .unwrap();
        store.save(&path).unwrap();

        let loaded = ProfileStore::load(&path).unwrap();
        assert_eq!(loaded, store);
        assert_eq!(loaded.get("work").unwrap(), ["/a".to_string(), "/b".to_string()]);
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ProfileStore::load(temp_dir.path().join("absent.toml")).unwrap();
        assert_eq!(store, ProfileStore::new());
    }
}
