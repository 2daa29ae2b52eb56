use std::fs;
use std::process::ExitCode;

use serde::Serialize;

use devcell::{
    ActivateOptions, ContainerRuntime, DevcellError, DockerCli, HostContext, ImageIdentity,
    ProjectLayout, Reconciled, Settings,
};

use crate::cli::Cli;

const DOCKER_INSTALL_HINT: &str =
    "Install Docker manually (https://docs.docker.com/get-docker/) and make sure `docker` is on your PATH.";

/// Print the one-line diagnostic and map the error to an exit code.
pub(crate) fn fail(e: &DevcellError) -> ExitCode {
    let use_err = devcell::color_enabled_stderr();
    devcell::log_error_stderr(use_err, &devcell::display_for_error(e));
    ExitCode::from(devcell::exit_code_for_error(e))
}

fn exit_with(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(devcell::EXIT_GENERIC))
}

fn discover_runtime(cli: &Cli, settings: &Settings) -> devcell::Result<DockerCli> {
    let verbose = cli.verbose || settings.verbose;
    DockerCli::discover(settings.skip_docker, verbose, cli.dry_run).map_err(|e| {
        tracing::debug!(error = %e, "docker discovery failed");
        DevcellError::DependencyMissing {
            tool: "docker".to_string(),
            hint: DOCKER_INSTALL_HINT.to_string(),
        }
    })
}

fn capture_host() -> HostContext {
    HostContext::capture(home::home_dir().as_deref())
}

pub(crate) fn run_init(_cli: &Cli, settings: &Settings) -> ExitCode {
    let result = (|| -> devcell::Result<(ProjectLayout, devcell::ImageSpec)> {
        let layout = ProjectLayout::current(settings.manifest_name())?;
        let host = capture_host();
        let spec = devcell::init(&layout, &host)?;
        Ok((layout, spec))
    })();
    match result {
        Ok((layout, spec)) => {
            let use_err = devcell::color_enabled_stderr();
            let packages = spec
                .directives()
                .iter()
                .filter_map(devcell::Directive::installed_package)
                .count();
            devcell::log_info_stderr(
                use_err,
                &format!(
                    "devcell: wrote image specification ({} directives, {} installs)",
                    spec.directives().len(),
                    packages
                ),
            );
            devcell::log_info_stderr(use_err, "devcell: next: devcell activate");
            println!("{}", layout.spec_path().display());
            ExitCode::from(0)
        }
        Err(e) => fail(&e),
    }
}

fn activate_inner(cli: &Cli, settings: &Settings) -> devcell::Result<i32> {
    let layout = ProjectLayout::current(settings.manifest_name())?;
    // Gate before looking for docker: a missing spec must not touch the runtime.
    devcell::ensure_initialized(&layout)?;
    let runtime = discover_runtime(cli, settings)?;
    let host = capture_host();
    let image = ImageIdentity::resolve(&layout, settings.image_override.as_deref());
    let opts = ActivateOptions {
        policy: settings.rebuild,
        tty: devcell::want_tty(),
        dry_run: cli.dry_run,
    };
    let use_err = devcell::color_enabled_stderr();
    devcell::log_info_stderr(use_err, &format!("devcell: reconciling image {image}"));
    devcell::activate(&runtime, &layout, &host, &image, opts, &|outcome| {
        let msg = match outcome {
            Reconciled::Built => format!("devcell: built {image}"),
            Reconciled::Replaced => format!("devcell: rebuilt {image}"),
            Reconciled::Unchanged => format!("devcell: {image} is up to date"),
        };
        devcell::log_info_stderr(use_err, &msg);
        devcell::log_info_stderr(
            use_err,
            &format!("devcell: entering {} (exit the shell to leave)", layout.container_dir()),
        );
    })
}

pub(crate) fn run_activate(cli: &Cli, settings: &Settings) -> ExitCode {
    match activate_inner(cli, settings) {
        Ok(code) => exit_with(code),
        Err(e) => fail(&e),
    }
}

#[derive(Serialize, Debug)]
struct StatusReport {
    project: String,
    container_dir: String,
    image: String,
    spec_path: String,
    spec_present: bool,
    spec_hash: Option<String>,
    recorded_build_hash: Option<String>,
    /// None when docker is unavailable.
    image_present: Option<bool>,
    rebuild_policy: &'static str,
}

fn status_report(cli: &Cli, settings: &Settings) -> devcell::Result<StatusReport> {
    let layout = ProjectLayout::current(settings.manifest_name())?;
    let image = ImageIdentity::resolve(&layout, settings.image_override.as_deref());
    let spec_hash = fs::read(layout.spec_path())
        .ok()
        .map(|bytes| devcell::fnv1a_hex(&bytes));
    let image_present = discover_runtime(cli, settings)
        .ok()
        .and_then(|rt| rt.image_exists(&image).ok());
    Ok(StatusReport {
        project: layout.root().display().to_string(),
        container_dir: layout.container_dir(),
        image: image.to_string(),
        spec_path: layout.spec_path().display().to_string(),
        spec_present: spec_hash.is_some(),
        spec_hash,
        recorded_build_hash: layout.recorded_build_hash(),
        image_present,
        rebuild_policy: settings.rebuild.as_str(),
    })
}

fn yes_no(v: Option<bool>) -> &'static str {
    match v {
        Some(true) => "yes",
        Some(false) => "no",
        None => "unknown (docker unavailable)",
    }
}

pub(crate) fn run_status(cli: &Cli, settings: &Settings, json: bool) -> ExitCode {
    let report = match status_report(cli, settings) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };
    if json {
        match serde_json::to_string(&report) {
            Ok(s) => println!("{s}"),
            Err(e) => return fail(&DevcellError::Io(std::io::Error::other(e))),
        }
        return ExitCode::from(0);
    }
    let up_to_date = match (&report.spec_hash, &report.recorded_build_hash) {
        (Some(a), Some(b)) => Some(a == b),
        _ => None,
    };
    println!("project:        {}", report.project);
    println!("container dir:  {}", report.container_dir);
    println!("image:          {}", report.image);
    println!(
        "specification:  {} ({})",
        report.spec_path,
        if report.spec_present { "present" } else { "missing; run `devcell init`" }
    );
    println!("image present:  {}", yes_no(report.image_present));
    println!("last build:     {}", match up_to_date {
        Some(true) => "matches specification",
        Some(false) => "specification changed since last build",
        None => "none recorded",
    });
    println!("rebuild policy: {}", report.rebuild_policy);
    ExitCode::from(0)
}

fn clean_inner(cli: &Cli, settings: &Settings) -> devcell::Result<bool> {
    let layout = ProjectLayout::current(settings.manifest_name())?;
    let runtime = discover_runtime(cli, settings)?;
    let image = ImageIdentity::resolve(&layout, settings.image_override.as_deref());
    devcell::clean(&runtime, &layout, &image, cli.dry_run)
}

pub(crate) fn run_clean(cli: &Cli, settings: &Settings) -> ExitCode {
    match clean_inner(cli, settings) {
        Ok(removed) => {
            let use_err = devcell::color_enabled_stderr();
            let msg = if removed {
                "devcell: removed project image"
            } else {
                "devcell: no project image to remove"
            };
            devcell::log_info_stderr(use_err, msg);
            ExitCode::from(0)
        }
        Err(e) => fail(&e),
    }
}
