//! Best-score persistence: one entry per difficulty, stored as plain lines
//! under the XDG config dir (or ~/.config/stacktui).

use crate::Difficulty;
use anyhow::Result;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

const FILENAME: &str = "highscores";

/// Best score per difficulty. The loader is tolerant: missing or garbled
/// lines read as zero.
#[derive(Debug, Clone, Copy, Default)]
pub struct HighScores {
    pub easy: u32,
    pub medium: u32,
    pub hard: u32,
}

impl HighScores {
    pub fn best(&self, difficulty: Difficulty) -> u32 {
        match difficulty {
            Difficulty::Easy => self.easy,
            Difficulty::Medium => self.medium,
            Difficulty::Hard => self.hard,
        }
    }

    /// Record a finished run; returns true when it set a new best.
    pub fn record(&mut self, difficulty: Difficulty, score: u32) -> bool {
        let slot = match difficulty {
            Difficulty::Easy => &mut self.easy,
            Difficulty::Medium => &mut self.medium,
            Difficulty::Hard => &mut self.hard,
        };
        if score > *slot {
            *slot = score;
            true
        } else {
            false
        }
    }

    /// Load from disk; any failure yields an empty table.
    pub fn load() -> Self {
        let Ok(path) = config_path() else {
            return Self::default();
        };
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        let mut lines = content.lines();
        let mut next = || {
            lines
                .next()
                .and_then(|l| l.trim().parse::<u32>().ok())
                .unwrap_or(0)
        };
        Self {
            easy: next(),
            medium: next(),
            hard: next(),
        }
    }

    /// Save to disk, creating the config directory if needed.
    pub fn save(&self) -> Result<()> {
        let path = config_path()?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut f = fs::File::create(path)?;
        writeln!(f, "{}", self.easy)?;
        writeln!(f, "{}", self.medium)?;
        writeln!(f, "{}", self.hard)?;
        Ok(())
    }
}

/// Path to the high scores file (config dir / stacktui / highscores).
fn config_path() -> Result<PathBuf> {
    let base = if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        if xdg.is_empty() {
            std::env::var("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("."))
                .join(".config")
        } else {
            PathBuf::from(xdg)
        }
    } else {
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".config"))
            .unwrap_or_else(|_| PathBuf::from("."))
    };
    Ok(base.join("stacktui").join(FILENAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_keeps_the_larger_score() {
        let mut scores = HighScores::default();
        assert!(scores.record(Difficulty::Medium, 12));
        assert!(!scores.record(Difficulty::Medium, 7));
        assert_eq!(scores.best(Difficulty::Medium), 12);
        assert_eq!(scores.best(Difficulty::Easy), 0);
    }
}
