//! Error taxonomy for a single devcell invocation and its exit-code mapping.
//!
//! - 127 when the container runtime CLI cannot be found (shell convention).
//! - 125 when the image could not be removed or built.
//! - 126 when the session could not be launched.
//! - 1 for everything else.
//!
//! None of these are retried: every failure comes from a side effect on the
//! shared image slot.
use std::fmt;
use std::io;

pub const EXIT_GENERIC: u8 = 1;
pub const EXIT_IMAGE: u8 = 125;
pub const EXIT_SESSION: u8 = 126;
pub const EXIT_NOT_FOUND: u8 = 127;

#[derive(Debug)]
pub enum DevcellError {
    /// The image specification has not been generated yet.
    Precondition(String),
    /// The project manifest exists but could not be understood.
    ManifestParse { path: String, message: String },
    /// A required external tool is missing.
    DependencyMissing { tool: String, hint: String },
    /// The stale image could not be removed; no build was attempted.
    ImageRemoval { image: String, message: String },
    /// The runtime rejected the build; the identity is left absent.
    Build { image: String, message: String },
    /// The run request failed before the session's shell started.
    SessionLaunch(String),
    /// Another activation holds the project's reconcile lock.
    Busy(String),
    Io(io::Error),
}

impl fmt::Display for DevcellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DevcellError::Precondition(msg) => write!(f, "{msg}"),
            DevcellError::ManifestParse { path, message } => {
                write!(f, "cannot parse manifest {path}: {message}")
            }
            DevcellError::DependencyMissing { tool, hint } => {
                write!(f, "{tool} is required but was not found in PATH. {hint}")
            }
            DevcellError::ImageRemoval { image, message } => {
                write!(f, "failed to remove stale image {image}: {message}")
            }
            DevcellError::Build { image, message } => {
                write!(f, "failed to build image {image}: {message}")
            }
            DevcellError::SessionLaunch(msg) => write!(f, "failed to launch session: {msg}"),
            DevcellError::Busy(msg) => write!(f, "{msg}"),
            DevcellError::Io(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DevcellError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DevcellError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for DevcellError {
    fn from(e: io::Error) -> Self {
        DevcellError::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, DevcellError>;

/// Map an io::Error to a process exit code: 127 for NotFound, 1 otherwise.
pub fn exit_code_for_io_error(e: &io::Error) -> u8 {
    if e.kind() == io::ErrorKind::NotFound {
        EXIT_NOT_FOUND
    } else {
        EXIT_GENERIC
    }
}

pub fn exit_code_for_error(e: &DevcellError) -> u8 {
    match e {
        DevcellError::DependencyMissing { .. } => EXIT_NOT_FOUND,
        DevcellError::ImageRemoval { .. } | DevcellError::Build { .. } => EXIT_IMAGE,
        DevcellError::SessionLaunch(_) => EXIT_SESSION,
        DevcellError::Io(ioe) => exit_code_for_io_error(ioe),
        DevcellError::Precondition(_)
        | DevcellError::ManifestParse { .. }
        | DevcellError::Busy(_) => EXIT_GENERIC,
    }
}

/// Render the single diagnostic line printed before exiting.
pub fn display_for_error(e: &DevcellError) -> String {
    format!("devcell: {e}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes_are_distinct_per_class() {
        let pre = DevcellError::Precondition("x".into());
        let dep = DevcellError::DependencyMissing {
            tool: "docker".into(),
            hint: String::new(),
        };
        let build = DevcellError::Build {
            image: "i".into(),
            message: "m".into(),
        };
        let launch = DevcellError::SessionLaunch("gone".into());
        assert_eq!(exit_code_for_error(&pre), 1);
        assert_eq!(exit_code_for_error(&dep), 127);
        assert_eq!(exit_code_for_error(&build), 125);
        assert_eq!(exit_code_for_error(&launch), 126);
    }

    #[test]
    fn test_io_not_found_maps_to_127() {
        let e = DevcellError::from(io::Error::new(io::ErrorKind::NotFound, "nope"));
        assert_eq!(exit_code_for_error(&e), 127);
        let e = DevcellError::from(io::Error::other("boom"));
        assert_eq!(exit_code_for_error(&e), 1);
    }

    #[test]
    fn test_display_prefixes_tool_name() {
        let e = DevcellError::ManifestParse {
            path: "devcell.yml".into(),
            message: "bad".into(),
        };
        assert_eq!(
            display_for_error(&e),
            "devcell: cannot parse manifest devcell.yml: bad"
        );
    }
}
