//! Terminal colors for status output.
//!
//! Respects `NO_COLOR`, `FORCE_COLOR` and TTY detection through
//! `owo-colors`' `if_supports_color()`. `--no-color` sets an in-process flag.

use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;
use owo_colors::Stream::{Stderr, Stdout};
use worktide_core::{CiStatus, RefreshState};

static NO_COLOR_FLAG: AtomicBool = AtomicBool::new(false);

pub fn set_no_color() {
    NO_COLOR_FLAG.store(true, Ordering::Relaxed);
}

#[derive(Debug, Clone, Copy)]
struct Rgb {
    r: u8,
    g: u8,
    b: u8,
}

impl Rgb {
    const fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xFF) as u8,
            g: ((hex >> 8) & 0xFF) as u8,
            b: (hex & 0xFF) as u8,
        }
    }
}

const TIDE: Rgb = Rgb::from_hex(0x5FA8C8); // Branch names
const KELP: Rgb = Rgb::from_hex(0x6B8F5E); // Success
const SAND: Rgb = Rgb::from_hex(0xC49A5C); // Pending/loading
const CORAL: Rgb = Rgb::from_hex(0xB87060); // Failure
const FOG: Rgb = Rgb::from_hex(0x5C6370); // Secondary info

fn no_color() -> bool {
    NO_COLOR_FLAG.load(Ordering::Relaxed)
}

fn paint(text: &str, color: Rgb) -> String {
    if no_color() {
        return text.to_string();
    }
    text.if_supports_color(Stdout, |t| t.truecolor(color.r, color.g, color.b))
        .to_string()
}

pub fn branch(text: &str) -> String {
    paint(text, TIDE)
}

pub fn muted(text: &str) -> String {
    paint(text, FOG)
}

pub fn bold(text: &str) -> String {
    if no_color() {
        return text.to_string();
    }
    text.if_supports_color(Stdout, |t| t.bold()).to_string()
}

/// Color-code a refresh state (idle/loading/failed).
pub fn refresh_state(state: &RefreshState) -> String {
    let label = match state {
        RefreshState::Idle => "idle",
        RefreshState::Loading => "loading",
        RefreshState::Failed(_) => "failed",
    };
    match state {
        RefreshState::Idle => paint(label, KELP),
        RefreshState::Loading => paint(label, SAND),
        RefreshState::Failed(_) => paint(label, CORAL),
    }
}

pub fn ci(status: CiStatus) -> String {
    let label = status.to_string();
    match status {
        CiStatus::Passing => paint(&label, KELP),
        CiStatus::Pending => paint(&label, SAND),
        CiStatus::Failing => paint(&label, CORAL),
        CiStatus::Unknown => paint(&label, FOG),
    }
}

/// Error styling for stderr messages.
pub fn error(text: &str) -> String {
    if no_color() {
        return text.to_string();
    }
    text.if_supports_color(Stderr, |t| t.truecolor(CORAL.r, CORAL.g, CORAL.b))
        .to_string()
}

pub fn warning(text: &str) -> String {
    if no_color() {
        return text.to_string();
    }
    text.if_supports_color(Stderr, |t| t.truecolor(SAND.r, SAND.g, SAND.b))
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rgb_from_hex() {
        let c = Rgb::from_hex(0x5FA8C8);
        assert_eq!(c.r, 95);
        assert_eq!(c.g, 168);
        assert_eq!(c.b, 200);
    }

    #[test]
    fn test_no_color_returns_plain_text() {
        set_no_color();
        assert_eq!(branch("main"), "main");
        assert_eq!(refresh_state(&RefreshState::Failed("x".into())), "failed");
        assert_eq!(ci(CiStatus::Passing), "passing");
        assert_eq!(error("boom"), "boom");
    }
}
