use std::{fmt::Write, path::Path};

use chrono::{DateTime, Local};
use msgs::ParticipantId;

use crate::round_state::ParticipantRecord;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    Winner { id: ParticipantId, name: String },
    /// Every word was drawn without anyone completing a line.
    PoolExhausted,
    /// All participants dropped out.
    NoParticipants,
    /// The pool cannot fill a single grid, so no round was played.
    InsufficientWords { needed: usize, available: usize },
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SessionReport {
    pub outcome: Outcome,
    pub rounds: u32,
    pub drawn_words: Vec<String>,
    pub participants: Vec<ParticipantRecord>,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
}

impl SessionReport {
    pub fn insufficient_words(needed: usize, available: usize) -> SessionReport {
        let now = Local::now();
        SessionReport {
            outcome: Outcome::InsufficientWords { needed, available },
            rounds: 0,
            drawn_words: Vec::new(),
            participants: Vec::new(),
            started_at: now,
            ended_at: now,
        }
    }

    pub fn save(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = match &self.outcome {
            Outcome::Winner { name, .. } => writeln!(out, "{name} won after {} rounds!", self.rounds),
            Outcome::PoolExhausted => writeln!(out, "No winner: all words were drawn after {} rounds.", self.rounds),
            Outcome::NoParticipants => writeln!(out, "No winner: every participant left after {} rounds.", self.rounds),
            Outcome::InsufficientWords { needed, available } => {
                writeln!(out, "No winner: a grid needs {needed} words but the list only has {available}.")
            }
        };
        for participant in &self.participants {
            let left = if participant.connected { "" } else { " (left)" };
            let _ = writeln!(out, "  {}: {} points{left}", participant.display_name, participant.score);
        }
        out
    }
}
