//! Where a project's state lives and how its paths map into the container.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::{DevcellError, Result};

pub const STATE_DIR_NAME: &str = ".devcell";
pub const SPEC_FILE_NAME: &str = "Dockerfile";
pub const BUILD_HASH_FILE_NAME: &str = "build.hash";
pub const LOCK_FILE_NAME: &str = "activate.lock";

/// Mount point used when the project has no usable base name (e.g. `/`).
const FALLBACK_CONTAINER_DIR: &str = "workspace";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProjectLayout {
    root: PathBuf,
    name: String,
    manifest_path: PathBuf,
}

impl ProjectLayout {
    /// Resolve the layout for `dir` (canonicalized when possible).
    pub fn discover(dir: &Path, manifest_name: &str) -> Result<Self> {
        let root = fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf());
        let name = root
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| FALLBACK_CONTAINER_DIR.to_string());
        crate::reject_newlines(&name, "project directory name")
            .map_err(DevcellError::Precondition)?;
        if name.contains(':') {
            return Err(DevcellError::Precondition(format!(
                "refusing to use project directory name {name:?}: ':' cannot appear in a bind mount"
            )));
        }
        // WORKDIR is not shell-quoted: a trailing '\' continues the line and '$' is expanded.
        if let Some(c) = name.chars().find(|c| matches!(c, '\\' | '$')) {
            return Err(DevcellError::Precondition(format!(
                "refusing to use project directory name {name:?}: {c:?} is not allowed in a WORKDIR"
            )));
        }
        let manifest_path = root.join(manifest_name);
        Ok(ProjectLayout {
            root,
            name,
            manifest_path,
        })
    }

    /// Layout for the current working directory.
    pub fn current(manifest_name: &str) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        Self::discover(&cwd, manifest_name)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Base name of the project directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Absolute path inside the container where the project is mounted.
    pub fn container_dir(&self) -> String {
        format!("/{}", self.name)
    }

    pub fn manifest_path(&self) -> &Path {
        &self.manifest_path
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(STATE_DIR_NAME)
    }

    pub fn spec_path(&self) -> PathBuf {
        self.state_dir().join(SPEC_FILE_NAME)
    }

    pub fn build_hash_path(&self) -> PathBuf {
        self.state_dir().join(BUILD_HASH_FILE_NAME)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.state_dir().join(LOCK_FILE_NAME)
    }

    pub fn spec_exists(&self) -> bool {
        self.spec_path().is_file()
    }

    /// Hash recorded after the last successful build, if any.
    pub fn recorded_build_hash(&self) -> Option<String> {
        fs::read_to_string(self.build_hash_path())
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn record_build_hash(&self, hash: &str) -> io::Result<()> {
        fs::create_dir_all(self.state_dir())?;
        fs::write(self.build_hash_path(), format!("{hash}\n"))
    }

    pub fn clear_build_hash(&self) -> io::Result<()> {
        match fs::remove_file(self.build_hash_path()) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Name under which the project's image is registered with the runtime.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ImageIdentity(String);

const SLUG_MAX: usize = 32;

/// Lowercase, docker-safe rendition of a directory name.
fn slug(name: &str) -> String {
    let mapped: String = name
        .chars()
        .map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '.' || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let trimmed: String = mapped
        .trim_matches(|c| c == '-' || c == '.' || c == '_')
        .chars()
        .take(SLUG_MAX)
        .collect();
    let trimmed = trimmed.trim_end_matches(|c| c == '-' || c == '.' || c == '_');
    if trimmed.is_empty() {
        "project".to_string()
    } else {
        trimmed.to_string()
    }
}

impl ImageIdentity {
    /// Stable per-project identity: `devcell-<slug>-<hash16>:latest`.
    pub fn for_project(layout: &ProjectLayout) -> Self {
        let key = layout.root().to_string_lossy();
        let hash = crate::fnv1a_hex(key.as_bytes());
        ImageIdentity(format!("devcell-{}-{}:latest", slug(layout.name()), hash))
    }

    /// Identity from an explicit override, else derived from the project.
    pub fn resolve(layout: &ProjectLayout, override_ref: Option<&str>) -> Self {
        match override_ref.map(str::trim).filter(|s| !s.is_empty()) {
            Some(r) => ImageIdentity(r.to_string()),
            None => Self::for_project(layout),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
