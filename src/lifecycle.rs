//! Image reconciliation: bring the project's image identity in line with the
//! specification on disk.
//!
//! `Absent -> Present` when no image exists, `Present -> Rebuilding -> Present`
//! when one does. A failed removal stops before any build; a failed build
//! leaves the identity absent and the recorded build hash cleared.

use std::fs;
use std::io;

use tracing::instrument;

use crate::config::RebuildPolicy;
use crate::errors::{DevcellError, Result};
use crate::project::{ImageIdentity, ProjectLayout};
use crate::runtime::{BuildRequest, ContainerRuntime};

/// What a reconcile did.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Reconciled {
    /// No image existed; one was built.
    Built,
    /// A stale image was removed and rebuilt.
    Replaced,
    /// The image matched the recorded build hash and was kept.
    Unchanged,
}

pub fn precondition_error(layout: &ProjectLayout) -> DevcellError {
    DevcellError::Precondition(format!(
        "no image specification at {}; run `devcell init` first",
        layout.spec_path().display()
    ))
}

/// Fail unless the specification has been generated.
pub fn ensure_initialized(layout: &ProjectLayout) -> Result<()> {
    if layout.spec_exists() {
        Ok(())
    } else {
        Err(precondition_error(layout))
    }
}

/// How a reconcile may act on the image and the project's state files.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ReconcileOptions {
    pub policy: RebuildPolicy,
    /// Leave the recorded build hash alone.
    pub dry_run: bool,
}

fn read_spec(layout: &ProjectLayout) -> Result<Vec<u8>> {
    match fs::read(layout.spec_path()) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Err(precondition_error(layout)),
        Err(e) => Err(e.into()),
    }
}

/// Reconcile against the specification file on disk.
pub fn reconcile<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    layout: &ProjectLayout,
    image: &ImageIdentity,
    policy: RebuildPolicy,
) -> Result<Reconciled> {
    let spec = read_spec(layout)?;
    let opts = ReconcileOptions {
        policy,
        dry_run: false,
    };
    reconcile_spec(runtime, layout, image, &spec, opts)
}

/// Reconcile against `spec`, the exact bytes the runtime will build from.
#[instrument(level = "info", skip(runtime, layout, spec), fields(image = %image, policy = opts.policy.as_str(), dry_run = opts.dry_run))]
pub fn reconcile_spec<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    layout: &ProjectLayout,
    image: &ImageIdentity,
    spec: &[u8],
    opts: ReconcileOptions,
) -> Result<Reconciled> {
    let spec_hash = crate::fnv1a_hex(spec);

    let present = runtime.image_exists(image)?;
    tracing::debug!(present, spec_hash = %spec_hash, "queried image");

    if present
        && opts.policy == RebuildPolicy::IfChanged
        && layout.recorded_build_hash().as_deref() == Some(spec_hash.as_str())
    {
        tracing::info!("image matches recorded build hash; skipping rebuild");
        return Ok(Reconciled::Unchanged);
    }

    // From here on the recorded hash no longer describes a live image.
    if !opts.dry_run {
        layout.clear_build_hash()?;
    }

    if present {
        runtime
            .remove_image(image)
            .map_err(|e| DevcellError::ImageRemoval {
                image: image.to_string(),
                message: e.to_string(),
            })?;
        tracing::debug!("removed stale image");
    }

    let request = BuildRequest {
        image: image.clone(),
        spec_path: layout.spec_path(),
        context_dir: layout.state_dir(),
    };
    runtime
        .build_image(&request)
        .map_err(|e| DevcellError::Build {
            image: image.to_string(),
            message: e.to_string(),
        })?;
    if !opts.dry_run {
        layout.record_build_hash(&spec_hash)?;
    }
    tracing::info!("image built");

    Ok(if present {
        Reconciled::Replaced
    } else {
        Reconciled::Built
    })
}

/// Remove the project's image and forget its build record.
///
/// Returns whether an image was present. The specification is kept. Under
/// `dry_run` the build record is left in place.
#[instrument(level = "info", skip(runtime, layout), fields(image = %image))]
pub fn clean<R: ContainerRuntime + ?Sized>(
    runtime: &R,
    layout: &ProjectLayout,
    image: &ImageIdentity,
    dry_run: bool,
) -> Result<bool> {
    let present = runtime.image_exists(image)?;
    if present {
        runtime
            .remove_image(image)
            .map_err(|e| DevcellError::ImageRemoval {
                image: image.to_string(),
                message: e.to_string(),
            })?;
    }
    if !dry_run {
        layout.clear_build_hash()?;
    }
    Ok(present)
}
