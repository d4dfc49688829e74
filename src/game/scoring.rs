//! Level scoring, the final leaderboard and its on-disk snapshot

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::player::PlayerRegistry;
use super::tuning::Tuning;

/// One leaderboard line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub name: String,
    pub score: f64,
}

/// Scoring rules applied at level boundaries and at round end
pub struct ScoreKeeper;

impl ScoreKeeper {
    /// Credit finishers by how quickly they finished and penalise everyone else.
    /// Consumes every winner flag.
    pub fn apply_level_score(registry: &mut PlayerRegistry, tuning: &Tuning, level_duration: Duration) {
        let duration = level_duration.as_secs_f64();

        for player in registry.iter_mut() {
            if player.winner {
                // Not clamped: finishing late yields a negative bonus
                let bonus = if duration > 0.0 {
                    tuning.max_level_points * (1.0 - player.finish_duration.as_secs_f64() / duration)
                } else {
                    0.0
                };
                player.score += bonus;
            } else {
                player.score -= tuning.non_completion_penalty;
            }
            player.winner = false;
        }
    }

    /// Every player ordered by descending score
    pub fn finalize_round(registry: &PlayerRegistry) -> Vec<ScoreRecord> {
        let mut remaining: Vec<ScoreRecord> = registry
            .iter()
            .map(|p| ScoreRecord {
                name: p.name.clone(),
                score: p.score,
            })
            .collect();

        let mut leaderboard = Vec::with_capacity(remaining.len());
        while !remaining.is_empty() {
            let best = remaining
                .iter()
                .enumerate()
                .max_by(|(_, a), (_, b)| a.score.total_cmp(&b.score))
                .map_or(0, |(idx, _)| idx);
            leaderboard.push(remaining.swap_remove(best));
        }
        leaderboard
    }

    /// The `places` best players right now
    pub fn podium(registry: &PlayerRegistry, places: usize) -> Vec<ScoreRecord> {
        let mut standings = Self::finalize_round(registry);
        standings.truncate(places);
        standings
    }
}

/// File layout of the persisted leaderboard
#[derive(Debug, Serialize, Deserialize)]
pub struct ScoreSnapshot {
    pub finished_at: DateTime<Utc>,
    pub entries: Vec<ScoreRecord>,
}

/// Writes the end-of-round leaderboard as JSON
#[derive(Debug, Clone)]
pub struct ScoreStore {
    path: PathBuf,
}

impl ScoreStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, entries: &[ScoreRecord]) -> Result<(), ScoreStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let snapshot = ScoreSnapshot {
            finished_at: Utc::now(),
            entries: entries.to_vec(),
        };
        let json = serde_json::to_string_pretty(&snapshot)?;
        std::fs::write(&self.path, json)?;

        info!(path = %self.path.display(), entries = entries.len(), "Leaderboard saved");
        Ok(())
    }
}

/// Leaderboard persistence errors
#[derive(Debug, thiserror::Error)]
pub enum ScoreStoreError {
    #[error("failed to write leaderboard: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode leaderboard: {0}")]
    Encode(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::PlayerKey;
    use crate::ws::protocol::Registration;
    use std::net::SocketAddr;

    fn key(port: u16) -> PlayerKey {
        SocketAddr::from(([192, 168, 1, 20], port))
    }

    fn registry(names: &[&str], tuning: &Tuning) -> PlayerRegistry {
        let mut registry = PlayerRegistry::new();
        for (i, name) in names.iter().enumerate() {
            registry
                .register(
                    key(i as u16 + 1),
                    Registration {
                        hat_id: 0,
                        character_id: 0,
                        name: name.to_string(),
                    },
                    (0.0, 0.0),
                    tuning,
                )
                .unwrap();
        }
        registry
    }

    fn finish(registry: &mut PlayerRegistry, port: u16, after: Duration) {
        let player = registry.get_mut(&key(port)).unwrap();
        player.winner = true;
        player.finish_duration = after;
    }

    #[test]
    fn level_bonus_scales_with_finish_time() {
        let tuning = Tuning::default();
        let mut registry = registry(&["instant", "buzzer", "late", "dnf"], &tuning);
        let level = Duration::from_secs(60);
        finish(&mut registry, 1, Duration::ZERO);
        finish(&mut registry, 2, level);
        finish(&mut registry, 3, Duration::from_secs(90));

        ScoreKeeper::apply_level_score(&mut registry, &tuning, level);

        let score = |port| registry.get(&key(port)).unwrap().score;
        assert_eq!(score(1), tuning.starting_score + tuning.max_level_points);
        assert_eq!(score(2), tuning.starting_score);
        assert_eq!(score(3), tuning.starting_score - tuning.max_level_points / 2.0);
        assert_eq!(score(4), tuning.starting_score - tuning.non_completion_penalty);
        assert!(registry.iter().all(|p| !p.winner));
    }

    #[test]
    fn winner_flag_is_consumed_once() {
        let tuning = Tuning::default();
        let mut registry = registry(&["Ann"], &tuning);
        finish(&mut registry, 1, Duration::from_secs(15));
        let level = Duration::from_secs(30);

        ScoreKeeper::apply_level_score(&mut registry, &tuning, level);
        ScoreKeeper::apply_level_score(&mut registry, &tuning, level);

        let expected = tuning.starting_score + tuning.max_level_points / 2.0 - tuning.non_completion_penalty;
        assert_eq!(registry.get(&key(1)).unwrap().score, expected);
    }

    #[test]
    fn zero_length_level_gives_no_bonus() {
        let tuning = Tuning::default();
        let mut registry = registry(&["Ann"], &tuning);
        finish(&mut registry, 1, Duration::ZERO);
        ScoreKeeper::apply_level_score(&mut registry, &tuning, Duration::ZERO);
        assert_eq!(registry.get(&key(1)).unwrap().score, tuning.starting_score);
    }

    #[test]
    fn leaderboard_is_descending() {
        let tuning = Tuning::default();
        let mut registry = registry(&["low", "high", "mid"], &tuning);
        registry.get_mut(&key(1)).unwrap().score = 10.0;
        registry.get_mut(&key(2)).unwrap().score = 300.0;
        registry.get_mut(&key(3)).unwrap().score = 150.0;

        let board = ScoreKeeper::finalize_round(&registry);
        let names: Vec<&str> = board.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["high", "mid", "low"]);

        let podium = ScoreKeeper::podium(&registry, 2);
        assert_eq!(podium.len(), 2);
        assert_eq!(podium[0].name, "high");
    }

    #[test]
    fn empty_round_has_empty_leaderboard() {
        assert!(ScoreKeeper::finalize_round(&PlayerRegistry::new()).is_empty());
    }

    #[test]
    fn store_writes_snapshot_file() {
        let dir = std::env::temp_dir().join(format!("goobers-scores-{}", std::process::id()));
        let path = dir.join("nested").join("scores.json");
        let store = ScoreStore::new(&path);
        let entries = vec![
            ScoreRecord {
                name: "Ann".to_string(),
                score: 101_000.0,
            },
            ScoreRecord {
                name: "Bo".to_string(),
                score: 99_000.0,
            },
        ];

        store.save(&entries).unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let snapshot: ScoreSnapshot = serde_json::from_str(&raw).unwrap();
        assert_eq!(snapshot.entries, entries);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
