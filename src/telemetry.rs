use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Default filter when `DEVCELL_LOG` is unset; `--verbose` raises it to info.
fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "devcell=info"
    } else {
        "warn"
    }
}

/// Install the stderr fmt subscriber once per process.
///
/// `filter` is an `EnvFilter` directive (e.g. `devcell=debug`). Returns false
/// when a global subscriber was already set.
pub fn telemetry_init(filter: Option<&str>, verbose: bool) -> bool {
    if INIT.get().is_some() {
        return false;
    }
    let directive = filter.unwrap_or_else(|| default_filter(verbose));
    let env_filter = EnvFilter::try_new(directive).unwrap_or_else(|e| {
        crate::warn_print(&format!("ignoring DEVCELL_LOG={directive}: {e}"));
        EnvFilter::new(default_filter(verbose))
    });
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        return false;
    }
    let _ = INIT.set(());
    true
}
