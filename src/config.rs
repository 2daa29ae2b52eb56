//! Process-level settings, read from the environment exactly once at startup.

use std::env;

pub const DEFAULT_MANIFEST_NAME: &str = "devcell.yml";

/// When an existing image is replaced.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum RebuildPolicy {
    /// Remove and rebuild on every reconcile.
    #[default]
    Always,
    /// Skip when the image exists and the recorded build hash matches the spec.
    IfChanged,
}

impl RebuildPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" | "" => Some(RebuildPolicy::Always),
            "changed" | "if-changed" | "if_changed" => Some(RebuildPolicy::IfChanged),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RebuildPolicy::Always => "always",
            RebuildPolicy::IfChanged => "changed",
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Settings {
    pub rebuild: RebuildPolicy,
    pub image_override: Option<String>,
    pub manifest_name: Option<String>,
    pub verbose: bool,
    pub skip_docker: bool,
    pub log_filter: Option<String>,
}

fn non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl Settings {
    pub fn from_env() -> Self {
        let rebuild = match non_empty("DEVCELL_REBUILD") {
            Some(v) => RebuildPolicy::parse(&v).unwrap_or_else(|| {
                crate::warn_print(&format!(
                    "ignoring DEVCELL_REBUILD={v}; expected 'always' or 'changed'"
                ));
                RebuildPolicy::Always
            }),
            None => RebuildPolicy::Always,
        };
        Settings {
            rebuild,
            image_override: non_empty("DEVCELL_IMAGE"),
            manifest_name: non_empty("DEVCELL_MANIFEST"),
            verbose: env::var("DEVCELL_VERBOSE").ok().as_deref() == Some("1"),
            skip_docker: env::var("DEVCELL_SKIP_DOCKER").ok().as_deref() == Some("1"),
            log_filter: non_empty("DEVCELL_LOG"),
        }
    }

    pub fn manifest_name(&self) -> &str {
        self.manifest_name.as_deref().unwrap_or(DEFAULT_MANIFEST_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rebuild_policy_parse() {
        assert_eq!(RebuildPolicy::parse("always"), Some(RebuildPolicy::Always));
        assert_eq!(RebuildPolicy::parse("Changed"), Some(RebuildPolicy::IfChanged));
        assert_eq!(RebuildPolicy::parse("if-changed"), Some(RebuildPolicy::IfChanged));
        assert_eq!(RebuildPolicy::parse("sometimes"), None);
    }

    #[test]
    fn test_default_manifest_name() {
        let s = Settings::default();
        assert_eq!(s.manifest_name(), "devcell.yml");
        assert_eq!(s.rebuild, RebuildPolicy::Always);
        let s = Settings {
            manifest_name: Some("env.yaml".into()),
            ..Settings::default()
        };
        assert_eq!(s.manifest_name(), "env.yaml");
    }
}
