//! Rendering and audio surfaces the core calls into.
//!
//! Both are fire-and-forget: implementations must return promptly and never
//! hold up the protocol.

use std::io::Write;

use crate::grid::{Cell, Grid};

pub const CELL_WIDTH: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Achievement,
    Winning,
    Countdown,
}

pub trait Surface: Send + Sync {
    fn render_grid(&self, grid: &Grid, highlight: Option<(usize, usize)>);
    fn render_status(&self, text: &str);
}

pub trait Audio: Send + Sync {
    fn play_effect(&self, effect: Effect);
}

pub struct ConsoleSurface;

impl Surface for ConsoleSurface {
    fn render_grid(&self, grid: &Grid, highlight: Option<(usize, usize)>) {
        print!("{}", format_grid(grid, highlight));
        let _ = std::io::stdout().flush();
    }

    fn render_status(&self, text: &str) {
        println!("{text}");
    }
}

pub struct SilentSurface;

impl Surface for SilentSurface {
    fn render_grid(&self, _grid: &Grid, _highlight: Option<(usize, usize)>) {}
    fn render_status(&self, _text: &str) {}
}

pub struct SilentAudio;

impl Audio for SilentAudio {
    fn play_effect(&self, _effect: Effect) {}
}

/// Rings the terminal bell; the closest a plain console gets to sound.
pub struct BellAudio;

impl Audio for BellAudio {
    fn play_effect(&self, effect: Effect) {
        let rings = match effect {
            Effect::Achievement | Effect::Countdown => 1,
            Effect::Winning => 3,
        };
        let mut stdout = std::io::stdout();
        for _ in 0..rings {
            let _ = stdout.write_all(b"\x07");
        }
        let _ = stdout.flush();
    }
}

/// Fixed-width table; over-long words are cut with an ellipsis and the
/// highlighted cell is flagged with `>`.
pub fn format_grid(grid: &Grid, highlight: Option<(usize, usize)>) -> String {
    let mut out = String::new();
    for (row, cells) in grid.rows().enumerate() {
        for (col, cell) in cells.iter().enumerate() {
            let text = match cell {
                Cell::Word (word) => fit_cell(word),
                Cell::Marked => "X".to_owned(),
            };
            let edge = if highlight == Some((row, col)) { "|>" } else { "| " };
            out.push_str(&format!("{edge}{text:<width$}", width = CELL_WIDTH - 1));
        }
        out.push_str("|\n");
    }
    let size = grid.size();
    out.push_str(&format!("+{}+\n", "-".repeat(CELL_WIDTH * size + size - 1)));
    out
}

fn fit_cell(word: &str) -> String {
    if word.chars().count() > CELL_WIDTH - 1 {
        let mut cut: String = word.chars().take(CELL_WIDTH - 2).collect();
        cut.push('…');
        cut
    }
    else {
        word.to_owned()
    }
}
