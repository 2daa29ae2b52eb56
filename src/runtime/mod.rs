//! Container runtime capability.
//!
//! The lifecycle and session code only talk to the runtime through
//! [`ContainerRuntime`], so the whole pipeline can run against a fake that
//! records calls and fails on command.

use std::io;
use std::path::PathBuf;

use crate::project::ImageIdentity;

pub mod docker;

pub use docker::{container_runtime_path, DockerCli};

/// Request to build `image` from the spec file, using `context_dir` as build context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildRequest {
    pub image: ImageIdentity,
    pub spec_path: PathBuf,
    pub context_dir: PathBuf,
}

/// Request for one interactive, auto-removed session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionRequest {
    pub image: ImageIdentity,
    /// Host directory bind-mounted into the container.
    pub host_dir: PathBuf,
    /// Mount point inside the container, also the working directory.
    pub container_dir: String,
    /// Allocate a TTY (`-it`) rather than plain interactive stdin (`-i`).
    pub tty: bool,
}

pub trait ContainerRuntime {
    /// Whether an image is registered under `image` (never pulls).
    fn image_exists(&self, image: &ImageIdentity) -> io::Result<bool>;

    /// Remove the image registered under `image`.
    fn remove_image(&self, image: &ImageIdentity) -> io::Result<()>;

    /// Build and register an image. On error nothing is registered.
    fn build_image(&self, request: &BuildRequest) -> io::Result<()>;

    /// Run the session, blocking until it exits; returns its exit code.
    fn run_session(&self, request: &SessionRequest) -> io::Result<i32>;
}

impl<T: ContainerRuntime + ?Sized> ContainerRuntime for &T {
    fn image_exists(&self, image: &ImageIdentity) -> io::Result<bool> {
        (**self).image_exists(image)
    }
    fn remove_image(&self, image: &ImageIdentity) -> io::Result<()> {
        (**self).remove_image(image)
    }
    fn build_image(&self, request: &BuildRequest) -> io::Result<()> {
        (**self).build_image(request)
    }
    fn run_session(&self, request: &SessionRequest) -> io::Result<i32> {
        (**self).run_session(request)
    }
}
