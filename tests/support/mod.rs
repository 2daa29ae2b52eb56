/*!
Test support helpers shared across integration tests.

- FakeRuntime: a ContainerRuntime that records every call and fails on command
- project(name): a temporary project directory and its layout
- host(): a fixed HostContext so tests never depend on the real environment
- run_devcell(dir, args): run the built binary in `dir` with docker disabled
*/

use std::cell::{Cell, RefCell};
use std::collections::BTreeSet;
use std::io;
use std::path::Path;
use std::process::{Command, Output};

use devcell::{
    BuildRequest, ContainerRuntime, EnvSnapshot, HostContext, HostFeatures, ImageIdentity,
    ProjectLayout, SessionRequest,
};

#[allow(dead_code)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    Exists(String),
    Remove(String),
    Build(String),
    Run(SessionRequest),
}

/// In-memory runtime; images are just a set of names.
#[derive(Default)]
pub struct FakeRuntime {
    calls: RefCell<Vec<Call>>,
    images: RefCell<BTreeSet<String>>,
    pub fail_remove: Cell<bool>,
    pub fail_build: RefCell<Option<String>>,
    pub fail_run: Cell<bool>,
    /// Drop the image right before a run, as if removed by someone else.
    pub vanish_before_run: Cell<bool>,
    pub session_exit: Cell<i32>,
    pub builds: RefCell<Vec<BuildRequest>>,
}

#[allow(dead_code)]
impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_image(image: &ImageIdentity) -> Self {
        let rt = Self::default();
        rt.images.borrow_mut().insert(image.to_string());
        rt
    }

    pub fn has_image(&self, image: &ImageIdentity) -> bool {
        self.images.borrow().contains(image.as_str())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    /// Call kinds only, e.g. ["exists", "remove", "build"].
    pub fn call_kinds(&self) -> Vec<&'static str> {
        self.calls
            .borrow()
            .iter()
            .map(|c| match c {
                Call::Exists(_) => "exists",
                Call::Remove(_) => "remove",
                Call::Build(_) => "build",
                Call::Run(_) => "run",
            })
            .collect()
    }
}

impl ContainerRuntime for FakeRuntime {
    fn image_exists(&self, image: &ImageIdentity) -> io::Result<bool> {
        self.calls.borrow_mut().push(Call::Exists(image.to_string()));
        if self.vanish_before_run.get() && self.calls.borrow().iter().any(|c| matches!(c, Call::Build(_))) {
            self.images.borrow_mut().remove(image.as_str());
        }
        Ok(self.images.borrow().contains(image.as_str()))
    }

    fn remove_image(&self, image: &ImageIdentity) -> io::Result<()> {
        self.calls.borrow_mut().push(Call::Remove(image.to_string()));
        if self.fail_remove.get() {
            return Err(io::Error::other(
                "conflict: unable to remove repository reference (must force) - container is using its referenced image",
            ));
        }
        self.images.borrow_mut().remove(image.as_str());
        Ok(())
    }

    fn build_image(&self, request: &BuildRequest) -> io::Result<()> {
        self.calls
            .borrow_mut()
            .push(Call::Build(request.image.to_string()));
        self.builds.borrow_mut().push(request.clone());
        if let Some(msg) = self.fail_build.borrow().clone() {
            return Err(io::Error::other(msg));
        }
        self.images.borrow_mut().insert(request.image.to_string());
        Ok(())
    }

    fn run_session(&self, request: &SessionRequest) -> io::Result<i32> {
        self.calls.borrow_mut().push(Call::Run(request.clone()));
        if self.fail_run.get() {
            return Err(io::Error::other("docker run exited with status 125"));
        }
        Ok(self.session_exit.get())
    }
}

/// Temporary project directory `<tmp>/<name>` and its layout.
#[allow(dead_code)]
pub fn project(name: &str) -> (tempfile::TempDir, ProjectLayout) {
    let td = tempfile::tempdir().expect("tmpdir");
    let dir = td.path().join(name);
    std::fs::create_dir_all(&dir).expect("mkdir project");
    let layout = ProjectLayout::discover(&dir, "devcell.yml").expect("layout");
    (td, layout)
}

#[allow(dead_code)]
pub fn write_manifest(layout: &ProjectLayout, content: &str) {
    std::fs::write(layout.manifest_path(), content).expect("write manifest");
}

/// Fixed host context: a handful of variables including the reserved ones.
#[allow(dead_code)]
pub fn host() -> HostContext {
    let snapshot = EnvSnapshot::from_pairs([
        ("PATH", "/usr/local/bin:/usr/bin"),
        ("HOME", "/home/dev"),
        ("LANG", "en_US.UTF-8"),
        ("EDITOR", "vim"),
        ("SHELL", "/bin/bash"),
    ]);
    HostContext::new(snapshot, HostFeatures::default())
}

/// Run the devcell binary in `dir` with docker discovery disabled and an empty HOME.
#[allow(dead_code)]
pub fn run_devcell(dir: &Path, home: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_devcell"))
        .args(args)
        .current_dir(dir)
        .env("HOME", home)
        .env("DEVCELL_SKIP_DOCKER", "1")
        .env("NO_COLOR", "1")
        .env_remove("DEVCELL_IMAGE")
        .env_remove("DEVCELL_MANIFEST")
        .env_remove("DEVCELL_REBUILD")
        .output()
        .expect("failed to run devcell")
}
