//! Load catalogs, profiles, and weapon-class tables from TOML files
//!
//! Any failure here is fatal for session start: the engine refuses to
//! run without a validated catalog and profile.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::catalog::{AbilityCatalog, Action, CombatProfile};
use crate::core::error::{CombatError, Result};
use crate::learning::effectiveness::WeaponClassMap;

/// Everything the engine needs for one build identifier
#[derive(Debug, Clone)]
pub struct LoadedBuild {
    pub catalog: AbilityCatalog,
    pub profile: CombatProfile,
    pub weapon_classes: WeaponClassMap,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(rename = "action")]
    actions: Vec<Action>,
}

#[derive(Debug, Deserialize)]
struct WeaponClassFile {
    #[serde(default = "default_weapon_class")]
    default_class: String,
    /// Weapon class name mapped to the action ids it covers
    classes: BTreeMap<String, Vec<String>>,
}

fn default_weapon_class() -> String {
    "unarmed".into()
}

/// Resolve catalog, profile, and weapon-class map for a build identifier
///
/// Expects `catalog.toml`, `weapon_classes.toml`, and
/// `profiles/<build>.toml` under `data_dir`.
pub fn load_build(data_dir: &Path, build: &str) -> Result<LoadedBuild> {
    let catalog = load_catalog(&data_dir.join("catalog.toml"))?;
    let profile = load_profile(&data_dir.join("profiles").join(format!("{build}.toml")), &catalog)?;
    let weapon_classes = load_weapon_classes(&data_dir.join("weapon_classes.toml"))?;

    tracing::info!(
        build,
        actions = catalog.len(),
        rotation = profile.rotation.len(),
        "loaded combat build"
    );

    Ok(LoadedBuild {
        catalog,
        profile,
        weapon_classes,
    })
}

pub fn load_catalog(path: &Path) -> Result<AbilityCatalog> {
    let content = fs::read_to_string(path).map_err(|e| {
        CombatError::ProfileLoad(format!("failed to read {}: {e}", path.display()))
    })?;
    let file: CatalogFile = toml::from_str(&content)?;
    AbilityCatalog::new(file.actions)
}

pub fn load_profile(path: &Path, catalog: &AbilityCatalog) -> Result<CombatProfile> {
    let content = fs::read_to_string(path).map_err(|e| {
        CombatError::ProfileLoad(format!("failed to read {}: {e}", path.display()))
    })?;
    let mut profile: CombatProfile = toml::from_str(&content)?;
    profile.normalize();
    profile.validate_against(catalog)?;
    Ok(profile)
}

pub fn load_weapon_classes(path: &Path) -> Result<WeaponClassMap> {
    let content = fs::read_to_string(path).map_err(|e| {
        CombatError::ProfileLoad(format!("failed to read {}: {e}", path.display()))
    })?;
    let file: WeaponClassFile = toml::from_str(&content)?;
    Ok(WeaponClassMap::from_classes(
        file.default_class,
        file.classes,
    ))
}
