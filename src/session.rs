//! Interactive session launch.

use tracing::instrument;

use crate::errors::{DevcellError, Result};
use crate::project::{ImageIdentity, ProjectLayout};
use crate::runtime::{ContainerRuntime, SessionRequest};

/// Session request binding the project root at its container path.
pub fn session_request(layout: &ProjectLayout, image: &ImageIdentity, tty: bool) -> SessionRequest {
    SessionRequest {
        image: image.clone(),
        host_dir: layout.root().to_path_buf(),
        container_dir: layout.container_dir(),
        tty,
    }
}

/// Whether the session should get a TTY: true when stdin or stdout is a terminal.
pub fn want_tty() -> bool {
    atty::is(atty::Stream::Stdin) || atty::is(atty::Stream::Stdout)
}

/// Run the session and return the shell's exit code.
#[instrument(level = "info", skip(runtime, request), fields(image = %request.image, dir = %request.container_dir))]
pub fn launch<R: ContainerRuntime + ?Sized>(runtime: &R, request: &SessionRequest) -> Result<i32> {
    if !runtime.image_exists(&request.image)? {
        return Err(DevcellError::SessionLaunch(format!(
            "image {} is not present",
            request.image
        )));
    }
    let code = runtime
        .run_session(request)
        .map_err(|e| DevcellError::SessionLaunch(e.to_string()))?;
    tracing::info!(code, "session exited");
    Ok(code)
}
