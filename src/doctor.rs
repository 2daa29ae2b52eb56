use std::process::Command;

use devcell::{HostContext, ImageIdentity, ProjectLayout, Settings};

fn highlight(s: &str) -> String {
    devcell::paint(devcell::color_enabled_stderr(), "\x1b[34;1m", s)
}

pub(crate) fn run_doctor(settings: &Settings) {
    eprintln!("devcell doctor");
    eprintln!();
    eprintln!("  version: v{}", env!("DEVCELL_BUILD_VERSION"));
    eprintln!(
        "  build:   {} ({}, {}, {})",
        env!("DEVCELL_BUILD_DATE"),
        env!("DEVCELL_BUILD_TARGET"),
        env!("DEVCELL_BUILD_PROFILE"),
        env!("DEVCELL_BUILD_RUSTC")
    );
    eprintln!(
        "  host:    {} / {}",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
    eprintln!();

    match devcell::runtime::container_runtime_path(settings.skip_docker) {
        Ok(p) => {
            eprintln!("  docker: {}", highlight(&p.display().to_string()));
            if let Ok(out) = Command::new(&p).arg("--version").output() {
                let s = String::from_utf8_lossy(&out.stdout).trim().to_string();
                if !s.is_empty() {
                    eprintln!("  docker --version: {}", s);
                }
            }
        }
        Err(e) => {
            eprintln!("  docker: not found ({e})");
        }
    }

    let home = home::home_dir();
    let host = HostContext::capture(home.as_deref());
    eprintln!(
        "  home: {}",
        home.as_ref()
            .map(|h| h.display().to_string())
            .unwrap_or_else(|| "(unknown)".to_string())
    );
    eprintln!("  shell: {}", highlight(&host.features.shell));
    eprintln!(
        "  oh-my-zsh: {}",
        if host.features.shell_enhancement {
            "detected (installed into the image)"
        } else {
            "not detected"
        }
    );
    eprintln!(
        "  environment: {} variables captured (PATH and HOME excluded)",
        host.snapshot.len()
    );
    eprintln!();

    match ProjectLayout::current(settings.manifest_name()) {
        Ok(layout) => {
            let image = ImageIdentity::resolve(&layout, settings.image_override.as_deref());
            eprintln!("  project: {}", layout.root().display());
            eprintln!("  image: {}", highlight(image.as_str()));
            eprintln!(
                "  manifest: {} ({})",
                layout.manifest_path().display(),
                if layout.manifest_path().is_file() { "present" } else { "absent" }
            );
            eprintln!(
                "  specification: {} ({})",
                layout.spec_path().display(),
                if layout.spec_exists() { "present" } else { "missing" }
            );
        }
        Err(e) => eprintln!("  project: unusable ({e})"),
    }
    eprintln!("  rebuild policy: {}", settings.rebuild.as_str());

    eprintln!();
    eprintln!("doctor: completed diagnostics.");
}
