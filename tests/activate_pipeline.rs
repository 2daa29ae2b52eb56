mod support;

use std::fs;

use devcell::{
    acquire_lock_at, activate, init, ActivateOptions, DevcellError, ImageIdentity, RebuildPolicy,
    Reconciled,
};
use support::{host, project, write_manifest, Call, FakeRuntime};

fn opts() -> ActivateOptions {
    ActivateOptions {
        policy: RebuildPolicy::Always,
        tty: true,
        dry_run: false,
    }
}

#[test]
fn test_activate_without_spec_touches_nothing() {
    let (_td, layout) = project("demo");
    write_manifest(&layout, "packages: [git]\n");
    let image = ImageIdentity::for_project(&layout);
    let rt = FakeRuntime::new();

    let err = activate(&rt, &layout, &host(), &image, opts(), &|_| {}).unwrap_err();
    assert!(matches!(err, DevcellError::Precondition(_)), "{err:?}");
    assert!(err.to_string().contains("devcell init"));
    assert!(rt.calls().is_empty());
    assert!(!layout.state_dir().exists(), "state dir must not be created");
    assert_eq!(devcell::exit_code_for_error(&err), 1);
}

#[test]
fn test_activate_builds_then_runs_with_project_mount() {
    let (_td, layout) = project("my-service");
    init(&layout, &host()).expect("init");
    let image = ImageIdentity::for_project(&layout);
    let rt = FakeRuntime::new();
    rt.session_exit.set(3);

    let seen = std::cell::Cell::new(None);
    let code = activate(&rt, &layout, &host(), &image, opts(), &|o| seen.set(Some(o)))
        .expect("activate");
    assert_eq!(code, 3, "session exit code must propagate");
    assert_eq!(seen.get(), Some(Reconciled::Built));
    assert_eq!(rt.call_kinds(), vec!["exists", "build", "exists", "run"]);

    let run = rt
        .calls()
        .into_iter()
        .find_map(|c| match c {
            Call::Run(r) => Some(r),
            _ => None,
        })
        .expect("run call");
    assert_eq!(run.container_dir, "/my-service");
    assert_eq!(run.host_dir, layout.root());
    assert_eq!(run.image, image);
    assert!(run.tty);
}

#[test]
fn test_activate_regenerates_spec_from_current_manifest() {
    let (_td, layout) = project("demo");
    init(&layout, &host()).expect("init");
    let before = fs::read_to_string(layout.spec_path()).expect("read");
    assert!(!before.contains("install -y ripgrep"));

    write_manifest(&layout, "packages: [ripgrep]\n");
    let rt = FakeRuntime::new();
    let image = ImageIdentity::for_project(&layout);
    activate(&rt, &layout, &host(), &image, opts(), &|_| {}).expect("activate");
    let after = fs::read_to_string(layout.spec_path()).expect("read");
    assert!(after.contains("RUN DEBIAN_FRONTEND=noninteractive apt-get install -y ripgrep\n"));
}

#[test]
fn test_activate_with_malformed_manifest_makes_no_runtime_calls() {
    let (_td, layout) = project("demo");
    init(&layout, &host()).expect("init");
    write_manifest(&layout, "packages: {git: yes}\n");
    let rt = FakeRuntime::new();
    let image = ImageIdentity::for_project(&layout);
    let err = activate(&rt, &layout, &host(), &image, opts(), &|_| {}).unwrap_err();
    assert!(matches!(err, DevcellError::ManifestParse { .. }), "{err:?}");
    assert!(rt.calls().is_empty());
}

#[test]
fn test_build_failure_does_not_launch() {
    let (_td, layout) = project("demo");
    init(&layout, &host()).expect("init");
    let rt = FakeRuntime::new();
    *rt.fail_build.borrow_mut() = Some("E: Unable to locate package nope".into());
    let image = ImageIdentity::for_project(&layout);
    let err = activate(&rt, &layout, &host(), &image, opts(), &|_| {}).unwrap_err();
    assert!(matches!(err, DevcellError::Build { .. }));
    assert!(!rt.call_kinds().contains(&"run"));
    assert_eq!(devcell::exit_code_for_error(&err), 125);
}

#[test]
fn test_vanished_image_is_session_launch_error() {
    let (_td, layout) = project("demo");
    init(&layout, &host()).expect("init");
    let rt = FakeRuntime::new();
    rt.vanish_before_run.set(true);
    let image = ImageIdentity::for_project(&layout);
    let err = activate(&rt, &layout, &host(), &image, opts(), &|_| {}).unwrap_err();
    assert!(matches!(err, DevcellError::SessionLaunch(_)), "{err:?}");
    assert!(!rt.call_kinds().contains(&"run"));
    assert_eq!(devcell::exit_code_for_error(&err), 126);
}

#[test]
fn test_run_failure_is_reported_verbatim() {
    let (_td, layout) = project("demo");
    init(&layout, &host()).expect("init");
    let rt = FakeRuntime::new();
    rt.fail_run.set(true);
    let image = ImageIdentity::for_project(&layout);
    let err = activate(&rt, &layout, &host(), &image, opts(), &|_| {}).unwrap_err();
    assert_eq!(
        err.to_string(),
        "failed to launch session: docker run exited with status 125"
    );
}

#[test]
fn test_held_lock_is_busy_without_runtime_calls() {
    let (_td, layout) = project("demo");
    init(&layout, &host()).expect("init");
    let _held = acquire_lock_at(&layout.lock_path()).expect("hold lock");
    let rt = FakeRuntime::new();
    let image = ImageIdentity::for_project(&layout);
    let err = activate(&rt, &layout, &host(), &image, opts(), &|_| {}).unwrap_err();
    assert!(matches!(err, DevcellError::Busy(_)), "{err:?}");
    assert!(rt.calls().is_empty());
}

#[test]
fn test_busy_activation_leaves_spec_untouched() {
    let (_td, layout) = project("demo");
    init(&layout, &host()).expect("init");
    let before = fs::read(layout.spec_path()).expect("read");

    let _held = acquire_lock_at(&layout.lock_path()).expect("hold lock");
    write_manifest(&layout, "packages: [ripgrep]\n");
    let rt = FakeRuntime::new();
    let image = ImageIdentity::for_project(&layout);
    let err = activate(&rt, &layout, &host(), &image, opts(), &|_| {}).unwrap_err();
    assert!(matches!(err, DevcellError::Busy(_)), "{err:?}");
    assert_eq!(fs::read(layout.spec_path()).expect("read"), before);
}

#[test]
fn test_recorded_hash_matches_written_spec() {
    let (_td, layout) = project("demo");
    init(&layout, &host()).expect("init");
    write_manifest(&layout, "packages: [jq]\n");
    let rt = FakeRuntime::new();
    let image = ImageIdentity::for_project(&layout);
    activate(&rt, &layout, &host(), &image, opts(), &|_| {}).expect("activate");
    let written = fs::read(layout.spec_path()).expect("read");
    assert_eq!(
        layout.recorded_build_hash().as_deref(),
        Some(devcell::fnv1a_hex(&written).as_str())
    );
}

#[test]
fn test_dry_run_leaves_state_files_untouched() {
    let (_td, layout) = project("demo");
    init(&layout, &host()).expect("init");
    layout.record_build_hash("previous").expect("record");
    let before = fs::read(layout.spec_path()).expect("read");

    write_manifest(&layout, "packages: [htop]\n");
    let rt = FakeRuntime::new();
    let image = ImageIdentity::for_project(&layout);
    let dry = ActivateOptions {
        dry_run: true,
        ..opts()
    };
    activate(&rt, &layout, &host(), &image, dry, &|_| {}).expect("activate");
    assert_eq!(fs::read(layout.spec_path()).expect("read"), before);
    assert_eq!(layout.recorded_build_hash().as_deref(), Some("previous"));
}

#[test]
fn test_lock_released_before_session() {
    let (_td, layout) = project("demo");
    init(&layout, &host()).expect("init");
    let rt = FakeRuntime::new();
    let image = ImageIdentity::for_project(&layout);
    activate(&rt, &layout, &host(), &image, opts(), &|_| {
        let relock = acquire_lock_at(&layout.lock_path());
        assert!(relock.is_ok(), "lock still held after reconcile: {relock:?}");
    })
    .expect("activate");
}

#[test]
fn test_init_refuses_while_locked() {
    let (_td, layout) = project("demo");
    init(&layout, &host()).expect("init");
    let before = fs::read(layout.spec_path()).expect("read");
    let held = acquire_lock_at(&layout.lock_path()).expect("hold lock");
    write_manifest(&layout, "packages: [jq]\n");
    let err = init(&layout, &host()).unwrap_err();
    assert!(matches!(err, DevcellError::Busy(_)), "{err:?}");
    assert_eq!(fs::read(layout.spec_path()).expect("read"), before);
    drop(held);
    init(&layout, &host()).expect("init after release");
}
