//! The `init` and `activate` pipelines.
//!
//! Everything here works on an explicitly captured [`HostContext`]; host state
//! is read once, in [`HostContext::capture`], and never again.

use std::path::Path;

use crate::config::RebuildPolicy;
use crate::env_snapshot::EnvSnapshot;
use crate::errors::Result;
use crate::image_spec::{synthesize_for, HostFeatures, ImageSpec};
use crate::lifecycle::{ensure_initialized, reconcile_spec, ReconcileOptions, Reconciled};
use crate::lock::acquire_lock_at;
use crate::manifest::Manifest;
use crate::project::{ImageIdentity, ProjectLayout};
use crate::runtime::ContainerRuntime;
use crate::session::{launch, session_request};

/// Host inputs captured at the start of an invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostContext {
    pub snapshot: EnvSnapshot,
    pub features: HostFeatures,
}

impl HostContext {
    pub fn new(snapshot: EnvSnapshot, features: HostFeatures) -> Self {
        HostContext { snapshot, features }
    }

    /// Capture the process environment and detect host features under `home`.
    pub fn capture(home: Option<&Path>) -> Self {
        let snapshot = EnvSnapshot::capture();
        let features = HostFeatures::detect(&snapshot, home);
        HostContext { snapshot, features }
    }
}

/// Resolve the manifest and synthesize the project's specification.
///
/// Variables are layered: host snapshot minus `exclude_env`, then `env_file`,
/// then `env`.
pub fn prepare_spec(layout: &ProjectLayout, host: &HostContext) -> Result<ImageSpec> {
    let manifest = Manifest::load(layout.manifest_path())?;
    let file_vars = manifest.load_env_file(layout.root())?;
    let snapshot = host
        .snapshot
        .clone()
        .without(&manifest.exclude_env)
        .with_overrides(&file_vars)
        .with_overrides(&manifest.env);
    Ok(synthesize_for(layout, &snapshot, &manifest.packages, &host.features))
}

/// Generate (or regenerate) the specification file. No runtime calls.
pub fn init(layout: &ProjectLayout, host: &HostContext) -> Result<ImageSpec> {
    let spec = prepare_spec(layout, host)?;
    // Never replace the spec under an activation that is building from it.
    let _lock = acquire_lock_at(&layout.lock_path())?;
    spec.write_to(&layout.spec_path())?;
    tracing::info!(path = %layout.spec_path().display(), "wrote image specification");
    Ok(spec)
}

#[derive(Copy, Clone, Debug, Default)]
pub struct ActivateOptions {
    pub policy: RebuildPolicy,
    pub tty: bool,
    /// Leave `.devcell/` untouched; the runtime is expected to only preview.
    pub dry_run: bool,
}

/// Regenerate the spec, reconcile the image and run the session.
///
/// `on_reconciled` is told what reconciliation did before the session starts.
/// Returns the session's exit code. Without an existing spec this fails
/// before touching the manifest, the spec file or the runtime.
///
/// The spec is regenerated and written only while the project lock is held,
/// and the image is built from exactly the bytes that were written.
pub fn activate<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    layout: &ProjectLayout,
    host: &HostContext,
    image: &ImageIdentity,
    opts: ActivateOptions,
    on_reconciled: &dyn Fn(Reconciled),
) -> Result<i32> {
    ensure_initialized(layout)?;

    let outcome = {
        // A dry run writes nothing, so it has nothing to serialize against.
        let _lock = if opts.dry_run {
            None
        } else {
            Some(acquire_lock_at(&layout.lock_path())?)
        };
        let spec = prepare_spec(layout, host)?;
        let rendered = spec.render();
        if !opts.dry_run {
            spec.write_to(&layout.spec_path())?;
        }
        let reconcile_opts = ReconcileOptions {
            policy: opts.policy,
            dry_run: opts.dry_run,
        };
        reconcile_spec(runtime, layout, image, rendered.as_bytes(), reconcile_opts)?
    };
    on_reconciled(outcome);

    let request = session_request(layout, image, opts.tty);
    launch(runtime, &request)
}
