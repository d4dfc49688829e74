//! Player state and the shared player table

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use serde::Serialize;

use super::grid::CellCoord;
use super::tuning::Tuning;
use crate::ws::protocol::Registration;

/// Players are keyed by the source address of their controller connection
pub type PlayerKey = SocketAddr;

/// Sprite state picked by the animation classifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Animation {
    #[default]
    Idle,
    WalkingRight,
    WalkingLeft,
    Falling,
    Exploding,
}

/// Horizontal speed above which a player counts as walking
const WALKING_THRESHOLD: f32 = 10.0;

/// Player state (authoritative)
#[derive(Debug, Clone)]
pub struct Player {
    pub key: PlayerKey,
    pub name: String,

    // Cosmetics
    pub hat_id: u32,
    pub character_id: u32,
    pub wearing_hat: bool,
    pub animation: Animation,

    // Kinematics. The velocity pair is what controls and blasts push on.
    pub x: f32,
    pub y: f32,
    pub vel_x: f32,
    pub vel_y: f32,
    pub terminal_vel_x: f32,
    pub terminal_vel_y: f32,
    pub grounded: bool,
    pub jump_power: f32,
    pub speed: f32,

    // Resources
    pub bombs_left: u32,
    health: f32,
    max_health: f32,

    /// Set while a bomb is armed
    pub armed_at: Option<Instant>,

    // Progression
    pub winner: bool,
    pub finish_duration: Duration,
    pub score: f64,

    claimed_tiles: HashSet<CellCoord>,
}

impl Player {
    pub fn new(key: PlayerKey, registration: Registration, spawn: (f32, f32), tuning: &Tuning) -> Self {
        Self {
            key,
            name: registration.name,
            hat_id: registration.hat_id,
            character_id: registration.character_id,
            wearing_hat: true,
            animation: Animation::Idle,
            x: spawn.0,
            y: spawn.1,
            vel_x: 0.0,
            vel_y: 0.0,
            terminal_vel_x: tuning.terminal_velocity_x,
            terminal_vel_y: tuning.terminal_velocity_y,
            grounded: false,
            jump_power: tuning.jump_power,
            speed: tuning.speed,
            bombs_left: tuning.starting_bombs,
            health: tuning.max_health,
            max_health: tuning.max_health,
            armed_at: None,
            winner: false,
            finish_duration: Duration::ZERO,
            score: tuning.starting_score,
            claimed_tiles: HashSet::new(),
        }
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    /// Set health, clamped to `[0, max]`
    pub fn set_health(&mut self, health: f32) {
        self.health = if health.is_nan() {
            0.0
        } else {
            health.clamp(0.0, self.max_health)
        };
    }

    /// Subtract damage, returns true when this knocked the player out
    pub fn apply_damage(&mut self, amount: f32) -> bool {
        let was_active = self.is_active();
        self.set_health(self.health - amount.max(0.0));
        was_active && !self.is_active()
    }

    /// Still taking part in the current level
    pub fn is_active(&self) -> bool {
        self.health > 0.0
    }

    pub fn is_armed(&self) -> bool {
        self.armed_at.is_some()
    }

    /// Record a one-shot tile; false if this player already claimed it this level
    pub fn claim_tile(&mut self, cell: CellCoord) -> bool {
        self.claimed_tiles.insert(cell)
    }

    pub fn has_claimed(&self, cell: CellCoord) -> bool {
        self.claimed_tiles.contains(&cell)
    }

    /// Clamp both velocity axes to the terminal velocity. NaN becomes rest.
    pub fn clamp_velocity(&mut self) {
        self.vel_x = clamp_axis(self.vel_x, self.terminal_vel_x);
        self.vel_y = clamp_axis(self.vel_y, self.terminal_vel_y);
    }

    /// Put the player back at the level spawn with full health
    pub fn reset_for_level(&mut self, spawn: (f32, f32)) {
        self.x = spawn.0;
        self.y = spawn.1;
        self.vel_x = 0.0;
        self.vel_y = 0.0;
        self.grounded = false;
        self.health = self.max_health;
        self.finish_duration = Duration::ZERO;
        self.claimed_tiles.clear();
        // A fuse never carries over into the next level
        self.armed_at = None;
        self.wearing_hat = true;
    }

    /// Pick the sprite state from the current motion
    pub fn classify_animation(&self) -> Animation {
        if self.is_armed() {
            Animation::Exploding
        } else if self.vel_y < 0.0 {
            Animation::Falling
        } else if self.vel_x.abs() > WALKING_THRESHOLD {
            if self.vel_x > 0.0 {
                Animation::WalkingRight
            } else {
                Animation::WalkingLeft
            }
        } else {
            Animation::Idle
        }
    }
}

fn clamp_axis(velocity: f32, terminal: f32) -> f32 {
    if velocity.is_nan() {
        0.0
    } else {
        velocity.clamp(-terminal, terminal)
    }
}

/// The shared player table.
///
/// Entries are never removed during a round; a dropped connection leaves its
/// player in place.
#[derive(Debug, Default)]
pub struct PlayerRegistry {
    players: HashMap<PlayerKey, Player>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a player for a connection
    pub fn register(
        &mut self,
        key: PlayerKey,
        registration: Registration,
        spawn: (f32, f32),
        tuning: &Tuning,
    ) -> Result<&Player, RegistryError> {
        if self.players.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered(key));
        }
        let player = Player::new(key, registration, spawn, tuning);
        Ok(self.players.entry(key).or_insert(player))
    }

    pub fn get(&self, key: &PlayerKey) -> Option<&Player> {
        self.players.get(key)
    }

    pub fn get_mut(&mut self, key: &PlayerKey) -> Option<&mut Player> {
        self.players.get_mut(key)
    }

    pub fn contains(&self, key: &PlayerKey) -> bool {
        self.players.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Player> {
        self.players.values_mut()
    }

    /// True when there is at least one player and none is still in the level
    pub fn all_out(&self) -> bool {
        !self.players.is_empty() && self.players.values().all(|p| !p.is_active())
    }

    /// Level reset: position, health and claimed tiles for everyone
    pub fn reset_for_level(&mut self, spawn: (f32, f32)) {
        for player in self.players.values_mut() {
            player.reset_for_level(spawn);
        }
    }
}

/// Player table errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("connection {0} already has a player")]
    AlreadyRegistered(PlayerKey),
}
