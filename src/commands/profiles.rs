//! Profiles command: manage named source-search path lists.

use super::models::ProfileAction;
use crate::utils::profiles::ProfileStore;
use anyhow::{Context, Result};
use log::info;
use std::path::Path;

/// Execute one profile store operation
///
/// **Public** - main entry point called from main.rs
///
/// Mutating actions save the store back to `store_path`.
pub fn execute_profiles(store_path: &Path, action: ProfileAction) -> Result<ProfileStore> {
    let mut store = ProfileStore::load(store_path)
        .with_context(|| format!("Failed to load profile store {}", store_path.display()))?;

    match action {
        ProfileAction::List => {
            for name in store.names() {
                let count = store.get(name).map(<[String]>::len).unwrap_or(0);
                let marker = if ProfileStore::is_builtin(name) { " (built-in)" } else { "" };
                println!("{}{}: {} paths", name, marker, count);
            }
        }
        ProfileAction::Show { name } => {
            let paths = store
                .get(&name)
                .with_context(|| format!("Unknown profile: {}", name))?;
            println!("{}:", name);
            for path in paths {
                println!("  {}", path);
            }
        }
        ProfileAction::Add { name, paths } => {
            store.set(&name, paths)?;
            store
                .save(store_path)
                .context("Failed to save profile store")?;
            info!("✓ Profile {} saved", name);
        }
        ProfileAction::Remove { name } => {
            store.remove(&name)?;
            store
                .save(store_path)
                .context("Failed to save profile store")?;
            info!("✓ Profile {} removed", name);
        }
    }

    Ok(store)
}
