#![allow(clippy::module_name_repetitions)]
//! `docker` CLI adapter.

use std::cell::RefCell;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};

use which::which;

use super::{BuildRequest, ContainerRuntime, SessionRequest};
use crate::project::ImageIdentity;

/// `docker run` exits 125 when docker itself (not the container) failed.
const DOCKER_RUN_SELF_FAILURE: i32 = 125;

pub fn container_runtime_path(skip_docker: bool) -> io::Result<PathBuf> {
    // Allow tests or callers to explicitly disable Docker detection
    if skip_docker {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            "Docker disabled by environment override.",
        ));
    }
    if let Ok(p) = which("docker") {
        return Ok(p);
    }
    Err(io::Error::new(
        io::ErrorKind::NotFound,
        "Docker is required but was not found in PATH.",
    ))
}

pub fn inspect_args(image: &ImageIdentity) -> Vec<String> {
    vec![
        "image".to_string(),
        "inspect".to_string(),
        image.to_string(),
    ]
}

/// No `--force`: an image still used by a container must fail removal.
pub fn remove_args(image: &ImageIdentity) -> Vec<String> {
    vec!["image".to_string(), "rm".to_string(), image.to_string()]
}

pub fn build_args(req: &BuildRequest) -> Vec<String> {
    vec![
        "build".to_string(),
        "-t".to_string(),
        req.image.to_string(),
        "-f".to_string(),
        req.spec_path.display().to_string(),
        req.context_dir.display().to_string(),
    ]
}

pub fn run_args(req: &SessionRequest) -> Vec<String> {
    let mut args = vec!["run".to_string(), "--rm".to_string()];
    args.push(if req.tty { "-it" } else { "-i" }.to_string());
    args.push("-v".to_string());
    args.push(format!("{}:{}", req.host_dir.display(), req.container_dir));
    args.push("-w".to_string());
    args.push(req.container_dir.clone());
    args.push(req.image.to_string());
    args
}

/// Shell-escaped one-line rendering of a docker invocation.
pub fn preview(args: &[String]) -> String {
    let mut words = Vec::with_capacity(args.len() + 1);
    words.push("docker".to_string());
    words.extend(args.iter().cloned());
    crate::shell_join(&words)
}

fn last_line(bytes: &[u8]) -> Option<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .last()
        .map(str::to_string)
}

fn exit_code(status: &ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return 128 + sig;
        }
    }
    1
}

/// Runtime backed by the `docker` binary.
#[derive(Clone, Debug)]
pub struct DockerCli {
    path: PathBuf,
    verbose: bool,
    dry_run: bool,
    // Images "built" by a dry run, so later steps see them as present.
    previewed: RefCell<BTreeSet<String>>,
}

impl DockerCli {
    pub fn new(path: PathBuf, verbose: bool, dry_run: bool) -> Self {
        DockerCli {
            path,
            verbose,
            dry_run,
            previewed: RefCell::new(BTreeSet::new()),
        }
    }

    pub fn discover(skip_docker: bool, verbose: bool, dry_run: bool) -> io::Result<Self> {
        container_runtime_path(skip_docker).map(|p| Self::new(p, verbose, dry_run))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Print the preview; returns true when the caller should skip execution.
    fn announce(&self, args: &[String]) -> bool {
        if self.verbose || self.dry_run {
            let use_err = crate::color_enabled_stderr();
            crate::log_info_stderr(use_err, &format!("devcell: docker: {}", preview(args)));
        }
        self.dry_run
    }

    fn command(&self, args: &[String]) -> Command {
        let mut cmd = Command::new(&self.path);
        cmd.args(args);
        cmd
    }

    fn run_captured(&self, args: &[String]) -> io::Result<()> {
        let out = self
            .command(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()?;
        if out.status.success() {
            return Ok(());
        }
        tracing::debug!(
            stderr = %String::from_utf8_lossy(&out.stderr),
            "docker {} failed",
            args.first().map(String::as_str).unwrap_or("")
        );
        let msg = last_line(&out.stderr)
            .or_else(|| last_line(&out.stdout))
            .unwrap_or_else(|| format!("docker exited with status {}", exit_code(&out.status)));
        Err(io::Error::other(msg))
    }
}

impl ContainerRuntime for DockerCli {
    fn image_exists(&self, image: &ImageIdentity) -> io::Result<bool> {
        if self.previewed.borrow().contains(image.as_str()) {
            return Ok(true);
        }
        // Read-only; runs even in dry-run mode.
        let status = self
            .command(&inspect_args(image))
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        Ok(status.success())
    }

    fn remove_image(&self, image: &ImageIdentity) -> io::Result<()> {
        let args = remove_args(image);
        if self.announce(&args) {
            self.previewed.borrow_mut().remove(image.as_str());
            return Ok(());
        }
        self.run_captured(&args)
    }

    fn build_image(&self, request: &BuildRequest) -> io::Result<()> {
        let args = build_args(request);
        if self.announce(&args) {
            self.previewed
                .borrow_mut()
                .insert(request.image.as_str().to_string());
            return Ok(());
        }
        if self.verbose {
            // Stream build progress; the error then only carries the status.
            let status = self.command(&args).status()?;
            if status.success() {
                return Ok(());
            }
            return Err(io::Error::other(format!(
                "docker build exited with status {}",
                exit_code(&status)
            )));
        }
        self.run_captured(&args)
    }

    fn run_session(&self, request: &SessionRequest) -> io::Result<i32> {
        let args = run_args(request);
        if self.announce(&args) {
            return Ok(0);
        }
        let status = self.command(&args).status()?;
        let code = exit_code(&status);
        if code == DOCKER_RUN_SELF_FAILURE {
            return Err(io::Error::other(format!(
                "docker run exited with status {code}"
            )));
        }
        Ok(code)
    }
}
