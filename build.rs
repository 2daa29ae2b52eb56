use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

/// Trimmed stdout of a successful command, if any.
fn capture(program: &str, args: &[&str]) -> Option<String> {
    let out = Command::new(program).args(args).output().ok()?;
    if !out.status.success() {
        return None;
    }
    let s = String::from_utf8_lossy(&out.stdout).trim().to_string();
    (!s.is_empty()).then_some(s)
}

fn env_or_unknown(key: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| "unknown".to_string())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // `devcell doctor` prints these.
    let date = capture("date", &["-u", "+%Y-%m-%dT%H:%M:%SZ"]).unwrap_or_else(|| {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        format!("unix:{secs}")
    });

    // Package version plus the commit it was built from, when known.
    let version = match capture("git", &["rev-parse", "--short", "HEAD"]) {
        Some(rev) => format!("{}+{rev}", env_or_unknown("CARGO_PKG_VERSION")),
        None => env_or_unknown("CARGO_PKG_VERSION"),
    };

    let vars = [
        ("DEVCELL_BUILD_VERSION", version),
        ("DEVCELL_BUILD_DATE", date),
        ("DEVCELL_BUILD_TARGET", env_or_unknown("TARGET")),
        ("DEVCELL_BUILD_PROFILE", env_or_unknown("PROFILE")),
        (
            "DEVCELL_BUILD_RUSTC",
            capture("rustc", &["--version"]).unwrap_or_else(|| "unknown".to_string()),
        ),
    ];
    for (key, value) in vars {
        println!("cargo:rustc-env={key}={value}");
    }
}
