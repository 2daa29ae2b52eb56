#![allow(clippy::module_name_repetitions)]
//! Color mode selection and the stderr one-liner helpers.
//!
//! All user-facing diagnostics are single `devcell: ...` lines on stderr.
//! Compute `color_enabled_stderr()` once per function and pass it down.

use clap::ValueEnum;
use once_cell::sync::OnceCell;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug, ValueEnum)]
pub enum ColorMode {
    Auto,
    Always,
    Never,
}

static COLOR_MODE: OnceCell<ColorMode> = OnceCell::new();

/// Pin the color mode for the rest of the process (first call wins).
pub fn set_color_mode(mode: ColorMode) {
    let _ = COLOR_MODE.set(mode);
}

pub(crate) fn parse_color_mode(s: &str) -> Option<ColorMode> {
    match s.trim().to_ascii_lowercase().as_str() {
        "auto" => Some(ColorMode::Auto),
        "always" | "on" | "true" | "yes" => Some(ColorMode::Always),
        "never" | "off" | "false" | "no" => Some(ColorMode::Never),
        _ => None,
    }
}

fn resolve(mode: Option<ColorMode>, env_pref: Option<ColorMode>, no_color: bool, is_tty: bool) -> bool {
    // NO_COLOR (https://no-color.org/) beats everything
    if no_color {
        return false;
    }
    match mode.or(env_pref).unwrap_or(ColorMode::Auto) {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => is_tty,
    }
}

fn color_enabled_for(is_tty: bool) -> bool {
    let env_pref = std::env::var("DEVCELL_COLOR")
        .ok()
        .and_then(|v| parse_color_mode(&v));
    let no_color = std::env::var_os("NO_COLOR").is_some();
    resolve(COLOR_MODE.get().copied(), env_pref, no_color, is_tty)
}

pub fn color_enabled_stderr() -> bool {
    color_enabled_for(atty::is(atty::Stream::Stderr))
}

/// Wrap string with ANSI color code when enabled; otherwise return unchanged.
pub fn paint(enabled: bool, code: &str, s: &str) -> String {
    if enabled {
        format!("{code}{s}\x1b[0m")
    } else {
        s.to_string()
    }
}

pub fn log_info_stderr(use_color: bool, msg: &str) {
    eprintln!("{}", paint(use_color, "\x1b[36;1m", msg));
}

pub fn log_warn_stderr(use_color: bool, msg: &str) {
    eprintln!("{}", paint(use_color, "\x1b[33m", msg));
}

pub fn log_error_stderr(use_color: bool, msg: &str) {
    eprintln!("{}", paint(use_color, "\x1b[31;1m", msg));
}

/// Print a standardized warning line to stderr (color-aware).
pub fn warn_print(msg: &str) {
    let use_err = color_enabled_stderr();
    log_warn_stderr(use_err, &format!("devcell: warning: {msg}"));
}
