//! Per-frame platformer physics against the tile grid

use std::time::Duration;

use super::grid::{CellCoord, Tile, TileGrid};
use super::player::{Player, PlayerKey, PlayerRegistry};
use super::tuning::Tuning;

/// Something a tile did to a player during a step
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepEvent {
    /// Health ran out (lava or the void below the floor)
    KnockedOut { key: PlayerKey, after: Duration },
    /// Reached a finish tile
    Finished { key: PlayerKey, after: Duration },
    /// First touch of an ability tile this level
    BombGranted { key: PlayerKey, cell: CellCoord },
}

/// Physics system for advancing every player one frame
pub struct PhysicsSystem;

impl PhysicsSystem {
    /// Advance all active players by `dt` seconds.
    /// `level_elapsed` is the time since the current level started.
    pub fn step(
        registry: &mut PlayerRegistry,
        grid: &TileGrid,
        tuning: &Tuning,
        dt: f32,
        level_elapsed: Duration,
    ) -> Vec<StepEvent> {
        let dt = if dt.is_finite() {
            dt.clamp(0.0, tuning.max_frame_delta)
        } else {
            0.0
        };

        registry
            .iter_mut()
            .filter_map(|player| Self::step_player(player, grid, tuning, dt, level_elapsed))
            .collect()
    }

    /// Advance one player. Players that are out of the level are left alone.
    pub fn step_player(
        player: &mut Player,
        grid: &TileGrid,
        tuning: &Tuning,
        dt: f32,
        level_elapsed: Duration,
    ) -> Option<StepEvent> {
        if !player.is_active() {
            return None;
        }

        let cell = tuning.cell_size;
        let feet = grid.tile_at(cell, player.x, player.y - cell / 2.0);
        let on_floor = player.y - tuning.floor_y < tuning.floor_contact;
        let on_tile = feet.map_or(false, |(_, tile)| tile.is_blocking());

        // Ground resolution
        if on_floor || on_tile {
            if player.vel_y < 0.0 {
                player.vel_y = 0.0;
            }
            player.grounded = true;
        } else {
            player.grounded = false;
            player.vel_y -= tuning.gravity * dt;
        }

        // Tile side effects
        let mut event = None;
        let below_floor = player.y < tuning.floor_y;
        match feet {
            _ if below_floor => {
                event = Self::burn(player, tuning, dt, level_elapsed);
            }
            Some((_, Tile::Lava)) => {
                event = Self::burn(player, tuning, dt, level_elapsed);
            }
            Some((coord, Tile::Ability)) => {
                if player.claim_tile(coord) {
                    player.bombs_left += 1;
                    event = Some(StepEvent::BombGranted {
                        key: player.key,
                        cell: coord,
                    });
                }
            }
            Some((_, Tile::Finish)) => {
                player.winner = true;
                player.set_health(0.0);
                player.finish_duration = level_elapsed;
                return Some(StepEvent::Finished {
                    key: player.key,
                    after: level_elapsed,
                });
            }
            Some((_, Tile::Solid | Tile::Empty)) | None => {}
        }
        if !player.is_active() {
            return event;
        }

        Self::integrate(player, grid, tuning, dt);
        event
    }

    fn burn(player: &mut Player, tuning: &Tuning, dt: f32, level_elapsed: Duration) -> Option<StepEvent> {
        if player.apply_damage(tuning.lava_damage * dt) {
            player.finish_duration = level_elapsed;
            return Some(StepEvent::KnockedOut {
                key: player.key,
                after: level_elapsed,
            });
        }
        None
    }

    /// Clamp, move, decay, and stop at ceilings and walls
    fn integrate(player: &mut Player, grid: &TileGrid, tuning: &Tuning, dt: f32) {
        let cell = tuning.cell_size;
        player.clamp_velocity();

        let mut dx = player.vel_x * dt;
        let mut dy = player.vel_y * dt;

        // Velocity decays by its own displacement
        player.vel_x -= dx;
        player.vel_y -= dy;

        // Constant friction against horizontal motion, never past zero
        if dx != 0.0 {
            let kick = tuning.friction_kick.min(player.vel_x.abs());
            player.vel_x -= player.vel_x.signum() * kick;
        }

        // Ceiling
        if dy > 0.0 && grid.blocks_at(cell, player.x, player.y + dy + tuning.player_height) {
            dy = 0.0;
        }

        // Walls, only in the direction of travel
        if dx != 0.0 {
            let probe_x = player.x + dx + dx.signum() * tuning.player_half_width;
            let probe_y = player.y + tuning.player_height / 2.0;
            if grid.blocks_at(cell, probe_x, probe_y) {
                dx = 0.0;
            }
        }

        player.x += dx;
        player.y += dy;
    }
}
