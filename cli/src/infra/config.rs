//! Profile defaults file: `~/.fleet/config.yaml`.
//!
//! ```yaml
//! default:
//!   region: virginia
//!   user: ubuntu
//!   key: ~/.ssh/virginia.pem
//! bench:
//!   region: oregon
//! ```
//!
//! Loaded exactly once by the CLI layer; the resulting [`Defaults`] value
//! is passed by reference into command handlers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::domain::config::{DEFAULT_PROFILE, Defaults};

/// Default location of the profile file.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn default_path() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.join(".fleet").join("config.yaml"))
}

/// Load the defaults for `profile` (or the `default` profile).
///
/// A missing file yields empty defaults; a present file must contain the
/// requested profile.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or names an
/// explicitly requested profile that does not exist.
pub fn load_profile(path: &Path, profile: Option<&str>) -> Result<Defaults> {
    if !path.exists() {
        return Ok(Defaults::default());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let profiles: BTreeMap<String, Defaults> = serde_yaml::from_str(&content)
        .with_context(|| format!("parsing config file {}", path.display()))?;

    let name = profile.unwrap_or(DEFAULT_PROFILE);
    match profiles.get(name) {
        Some(defaults) => Ok(defaults.clone()),
        // Only an explicit --profile is an error; an absent default
        // profile just means no defaults.
        None if profile.is_none() => Ok(Defaults::default()),
        None => bail!("profile '{name}' not found in {}", path.display()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("config.yaml");
        std::fs::write(
            &path,
            "default:\n  region: virginia\n  user: ubuntu\n  key: ~/.ssh/virginia.pem\nbench:\n  region: oregon\n",
        )
        .expect("write config");
        path
    }

    #[test]
    fn missing_file_gives_empty_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let defaults =
            load_profile(&dir.path().join("config.yaml"), None).expect("load");
        assert_eq!(defaults, Defaults::default());
    }

    #[test]
    fn default_profile_is_used_when_none_requested() {
        let dir = TempDir::new().expect("tempdir");
        let defaults = load_profile(&write_config(&dir), None).expect("load");
        assert_eq!(defaults.region.as_deref(), Some("virginia"));
        assert_eq!(defaults.user, "ubuntu");
    }

    #[test]
    fn named_profile_is_selected() {
        let dir = TempDir::new().expect("tempdir");
        let defaults = load_profile(&write_config(&dir), Some("bench")).expect("load");
        assert_eq!(defaults.region.as_deref(), Some("oregon"));
        assert_eq!(defaults.user, "");
    }

    #[test]
    fn unknown_named_profile_is_an_error() {
        let dir = TempDir::new().expect("tempdir");
        assert!(load_profile(&write_config(&dir), Some("nope")).is_err());
    }
}
