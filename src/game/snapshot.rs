//! Renderer-facing world snapshots

use std::time::Instant;

use serde::Serialize;

use super::director::{LevelDirector, Phase};
use super::grid::TileGrid;
use super::player::{Animation, Player, PlayerRegistry};
use super::scoring::{ScoreKeeper, ScoreRecord};

/// Number of places shown on the podium between levels
pub const PODIUM_PLACES: usize = 3;

/// One player as the renderer draws it
#[derive(Debug, Clone, Serialize)]
pub struct PlayerView {
    pub name: String,
    pub hat_id: u32,
    pub character_id: u32,
    pub wearing_hat: bool,
    pub animation: Animation,
    pub x: f32,
    pub y: f32,
    pub health: f32,
    pub bombs_left: u32,
    pub armed: bool,
    pub active: bool,
    pub score: f64,
}

impl From<&Player> for PlayerView {
    fn from(p: &Player) -> Self {
        Self {
            name: p.name.clone(),
            hat_id: p.hat_id,
            character_id: p.character_id,
            wearing_hat: p.wearing_hat,
            animation: p.animation,
            x: p.x,
            y: p.y,
            health: p.health(),
            bombs_left: p.bombs_left,
            armed: p.is_armed(),
            active: p.is_active(),
            score: p.score,
        }
    }
}

/// Everything a renderer needs for one frame
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorldSnapshot {
    pub phase: &'static str,
    /// Story page, when showing slides
    pub story_page: Option<usize>,
    pub level_index: Option<usize>,
    pub level_id: Option<String>,
    pub remaining_ms: u64,
    /// Tile rows, top row first
    pub grid: Vec<String>,
    pub players: Vec<PlayerView>,
    /// Top players, shown while holding between levels
    pub podium: Vec<ScoreRecord>,
    /// Final standings once the round is over
    pub leaderboard: Vec<ScoreRecord>,
}

/// Builds snapshots at a fraction of the frame rate
pub struct SnapshotBuilder {
    /// Frames since last snapshot
    frames_since_snapshot: u32,
    /// Snapshot interval in frames
    snapshot_interval: u32,
}

impl SnapshotBuilder {
    pub fn new(snapshot_interval: u32) -> Self {
        Self {
            frames_since_snapshot: 0,
            snapshot_interval: snapshot_interval.max(1),
        }
    }

    /// Check if it's time to publish a snapshot
    pub fn should_send(&mut self) -> bool {
        self.frames_since_snapshot += 1;
        if self.frames_since_snapshot >= self.snapshot_interval {
            self.frames_since_snapshot = 0;
            true
        } else {
            false
        }
    }

    /// Force snapshot on next check (phase changes)
    pub fn force_next(&mut self) {
        self.frames_since_snapshot = self.snapshot_interval;
    }

    pub fn build(
        &self,
        director: &LevelDirector,
        grid: &TileGrid,
        registry: &PlayerRegistry,
        leaderboard: &[ScoreRecord],
        now: Instant,
    ) -> WorldSnapshot {
        let phase = director.phase();
        let mut players: Vec<PlayerView> = registry.iter().map(PlayerView::from).collect();
        players.sort_by(|a, b| a.name.cmp(&b.name));

        let podium = match phase {
            Phase::LevelTransition { .. } => ScoreKeeper::podium(registry, PODIUM_PLACES),
            _ => Vec::new(),
        };

        WorldSnapshot {
            phase: phase.name(),
            story_page: match phase {
                Phase::StorySlides { page } => Some(page),
                _ => None,
            },
            level_index: director.current_index(),
            level_id: director.current_level().map(|l| l.id.clone()),
            remaining_ms: director.level_remaining(now).as_millis() as u64,
            grid: grid.rows_top_down(),
            players,
            podium,
            leaderboard: leaderboard.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sends_every_nth_frame() {
        let mut builder = SnapshotBuilder::new(3);
        let sent: Vec<bool> = (0..6).map(|_| builder.should_send()).collect();
        assert_eq!(sent, [false, false, true, false, false, true]);

        builder.should_send();
        builder.force_next();
        assert!(builder.should_send());
    }

    #[test]
    fn zero_interval_sends_every_frame() {
        let mut builder = SnapshotBuilder::new(0);
        assert!(builder.should_send());
        assert!(builder.should_send());
    }
}
