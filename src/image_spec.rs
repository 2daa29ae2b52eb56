#![allow(clippy::module_name_repetitions)]
//! Image specification synthesis.
//!
//! `synthesize` is a pure function of its inputs: the same snapshot, package
//! list and host features always render to the same bytes. Reconciliation and
//! the runtime's layer cache both rely on that.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::env_snapshot::EnvSnapshot;
use crate::project::ProjectLayout;

pub const BASE_IMAGE: &str = "ubuntu:latest";
pub const DEFAULT_SHELL: &str = "bash";
pub const SHELL_ENHANCEMENT_DIR: &str = ".oh-my-zsh";
const OH_MY_ZSH_INSTALLER: &str =
    "https://raw.githubusercontent.com/ohmyzsh/ohmyzsh/master/tools/install.sh";

/// Host facts that influence the image beyond the environment snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostFeatures {
    /// Interpreter package and entrypoint, e.g. `zsh`.
    pub shell: String,
    /// The invoking user has oh-my-zsh installed.
    pub shell_enhancement: bool,
}

fn valid_shell_name(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "._+-".contains(c))
}

impl HostFeatures {
    /// Detect from the captured snapshot (`SHELL`) and the user's home directory.
    pub fn detect(snapshot: &EnvSnapshot, home: Option<&Path>) -> Self {
        let shell = snapshot
            .get("SHELL")
            .and_then(|s| Path::new(s).file_name())
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| valid_shell_name(s))
            .unwrap_or_else(|| DEFAULT_SHELL.to_string());
        let shell_enhancement = home
            .map(|h| h.join(SHELL_ENHANCEMENT_DIR).is_dir())
            .unwrap_or(false);
        HostFeatures {
            shell,
            shell_enhancement,
        }
    }
}

impl Default for HostFeatures {
    fn default() -> Self {
        HostFeatures {
            shell: DEFAULT_SHELL.to_string(),
            shell_enhancement: false,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Directive {
    From(String),
    Env { key: String, value: String },
    Run(String),
    Workdir(String),
    Entrypoint(Vec<String>),
}

fn escape_env_value(v: &str) -> String {
    let mut out = String::with_capacity(v.len() + 2);
    for ch in v.chars() {
        if matches!(ch, '\\' | '"' | '$') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

impl Directive {
    fn install(package: &str) -> Self {
        Directive::Run(format!(
            "DEBIAN_FRONTEND=noninteractive apt-get install -y {package}"
        ))
    }

    pub fn render(&self) -> String {
        match self {
            Directive::From(image) => format!("FROM {image}"),
            Directive::Env { key, value } => format!("ENV {key}=\"{}\"", escape_env_value(value)),
            Directive::Run(cmd) => format!("RUN {cmd}"),
            Directive::Workdir(dir) => format!("WORKDIR {dir}"),
            Directive::Entrypoint(argv) => {
                // JSON (exec) form; serializing a Vec<String> cannot fail.
                let json = serde_json::to_string(argv).unwrap_or_else(|_| "[]".to_string());
                format!("ENTRYPOINT {json}")
            }
        }
    }

    /// Package name if this directive installs exactly one package.
    pub fn installed_package(&self) -> Option<&str> {
        match self {
            Directive::Run(cmd) => cmd
                .strip_prefix("DEBIAN_FRONTEND=noninteractive apt-get install -y ")
                .filter(|rest| !rest.contains(' ')),
            _ => None,
        }
    }
}

/// Ordered build recipe for one project image.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageSpec {
    directives: Vec<Directive>,
}

/// Build the specification for `container_dir` (e.g. `/my-app`).
pub fn synthesize(
    snapshot: &EnvSnapshot,
    packages: &[String],
    features: &HostFeatures,
    container_dir: &str,
) -> ImageSpec {
    let mut d = Vec::with_capacity(snapshot.len() + packages.len() + 10);
    d.push(Directive::From(BASE_IMAGE.to_string()));
    for (key, value) in snapshot.iter() {
        d.push(Directive::Env {
            key: key.to_string(),
            value: value.to_string(),
        });
    }
    d.push(Directive::Run("apt-get update".to_string()));
    d.push(Directive::install(&features.shell));
    // One package per directive so a bad name fails on its own line.
    for pkg in packages {
        d.push(Directive::install(pkg));
    }
    if features.shell_enhancement {
        for prereq in ["zsh", "git", "curl"] {
            if prereq != features.shell {
                d.push(Directive::install(prereq));
            }
        }
        d.push(Directive::Run(format!(
            "sh -c \"$(curl -fsSL {OH_MY_ZSH_INSTALLER})\" \"\" --unattended"
        )));
    }
    d.push(Directive::Run(format!(
        "mkdir -p {}",
        crate::shell_escape(container_dir)
    )));
    d.push(Directive::Workdir(container_dir.to_string()));
    d.push(Directive::Entrypoint(vec![features.shell.clone()]));
    ImageSpec { directives: d }
}

/// Synthesize for a project layout.
pub fn synthesize_for(
    layout: &ProjectLayout,
    snapshot: &EnvSnapshot,
    packages: &[String],
    features: &HostFeatures,
) -> ImageSpec {
    synthesize(snapshot, packages, features, &layout.container_dir())
}

impl ImageSpec {
    pub fn directives(&self) -> &[Directive] {
        &self.directives
    }

    /// Render the Dockerfile text (newline-terminated).
    pub fn render(&self) -> String {
        let mut out = String::new();
        for d in &self.directives {
            out.push_str(&d.render());
            out.push('\n');
        }
        out
    }

    /// Content hash of the rendered text.
    pub fn content_hash(&self) -> String {
        crate::fnv1a_hex(self.render().as_bytes())
    }

    /// Replace `path` with the rendered specification.
    ///
    /// Written to a temporary file next to `path` and renamed into place, so a
    /// concurrent `docker build -f` never reads a partial file.
    pub fn write_to(&self, path: &Path) -> io::Result<()> {
        let parent = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(self.render().as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}
