/*!
devcell: disposable per-project shell containers.

`devcell init` captures the host environment and the project's `devcell.yml`
package list into `.devcell/Dockerfile`. `devcell activate` regenerates that
file, reconciles the project's image against it and opens an interactive,
auto-removed container with the project directory mounted at `/<name>`.

Modules:
- env_snapshot: host environment capture with PATH/HOME excluded
- manifest: `devcell.yml` loading
- image_spec: deterministic specification synthesis
- project: state layout and per-project image identity
- runtime: the container runtime capability and its docker adapter
- lifecycle: image reconciliation
- session: interactive session launch
- activate: the init/activate pipelines
- color, telemetry: stderr diagnostics and tracing setup
*/

mod activate;
mod color;
mod config;
mod env_snapshot;
mod errors;
mod image_spec;
mod lifecycle;
mod lock;
mod manifest;
mod project;
pub mod runtime;
mod session;
mod telemetry;
mod util;

pub use activate::*;
pub use color::*;
pub use config::*;
pub use env_snapshot::*;
pub use errors::*;
pub use image_spec::*;
pub use lifecycle::*;
pub use lock::*;
pub use manifest::*;
pub use project::*;
pub use runtime::{BuildRequest, ContainerRuntime, DockerCli, SessionRequest};
pub use session::*;
pub use telemetry::*;
pub use util::*;
