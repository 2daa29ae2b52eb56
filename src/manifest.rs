#![allow(clippy::module_name_repetitions)]
//! Project manifest (`devcell.yml`) loading.
//!
//! A missing manifest is the common case and yields an empty manifest. A
//! manifest that exists but cannot be parsed is always an error: falling back
//! to "no packages" would silently build the wrong image.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use crate::errors::{DevcellError, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    /// Packages installed one per directive, in this order.
    #[serde(default)]
    pub packages: Vec<String>,
    /// Extra variables applied on top of the host snapshot.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    /// Host variables to leave out of the image (e.g. PWD, SHLVL).
    #[serde(default)]
    pub exclude_env: Vec<String>,
    /// Dotenv file, relative to the manifest, layered under `env`.
    #[serde(default)]
    pub env_file: Option<String>,
}

fn valid_package_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphanumeric() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || "+.:=~_-".contains(c))
}

impl Manifest {
    /// Parse manifest text; `origin` is only used in error messages.
    pub fn parse(content: &str, origin: &str) -> Result<Self> {
        let parse_err = |message: String| DevcellError::ManifestParse {
            path: origin.to_string(),
            message,
        };
        // An empty document (or one holding only comments) declares nothing.
        let doc: Option<Manifest> =
            serde_yaml::from_str(content).map_err(|e| parse_err(e.to_string()))?;
        let manifest = doc.unwrap_or_default();
        for pkg in &manifest.packages {
            if !valid_package_name(pkg) {
                return Err(parse_err(format!("invalid package name {pkg:?}")));
            }
        }
        Ok(manifest)
    }

    /// Load the manifest at `path`; absent file means an empty manifest.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(content) => {
                let manifest = Self::parse(&content, &path.display().to_string())?;
                tracing::debug!(
                    path = %path.display(),
                    packages = manifest.packages.len(),
                    "loaded manifest"
                );
                Ok(manifest)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Manifest::default()),
            Err(e) => Err(DevcellError::ManifestParse {
                path: path.display().to_string(),
                message: e.to_string(),
            }),
        }
    }

    /// Variables from `env_file`, resolved against `base_dir`.
    ///
    /// No `env_file` or a missing file yields nothing; a file that exists but
    /// cannot be parsed is a [`DevcellError::ManifestParse`].
    pub fn load_env_file(&self, base_dir: &Path) -> Result<BTreeMap<String, String>> {
        let Some(name) = self.env_file.as_deref().filter(|n| !n.trim().is_empty()) else {
            return Ok(BTreeMap::new());
        };
        let path = base_dir.join(name);
        let parse_err = |message: String| DevcellError::ManifestParse {
            path: path.display().to_string(),
            message,
        };
        let iter = match dotenvy::from_path_iter(&path) {
            Ok(iter) => iter,
            Err(dotenvy::Error::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "env_file not found; skipping");
                return Ok(BTreeMap::new());
            }
            Err(e) => return Err(parse_err(e.to_string())),
        };
        let mut vars = BTreeMap::new();
        for item in iter {
            let (key, value) = item.map_err(|e| parse_err(e.to_string()))?;
            vars.insert(key, value);
        }
        tracing::debug!(path = %path.display(), vars = vars.len(), "loaded env_file");
        Ok(vars)
    }
}

/// Resolve just the declared package list.
pub fn resolve_packages(path: &Path) -> Result<Vec<String>> {
    Manifest::load(path).map(|m| m.packages)
}
