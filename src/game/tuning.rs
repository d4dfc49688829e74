//! Gameplay constants

use std::time::Duration;

/// Every tunable number of the simulation.
///
/// `Default` carries the values the game ships with; `Config` overrides the
/// few that operators are expected to change.
#[derive(Debug, Clone)]
pub struct Tuning {
    /// Edge length of one grid cell in world units
    pub cell_size: f32,
    /// Height of the virtual floor below the grid
    pub floor_y: f32,
    /// Distance above the floor that still counts as standing on it
    pub floor_contact: f32,
    /// Player body height (ceiling probe)
    pub player_height: f32,
    /// Half of the player body width (wall probe)
    pub player_half_width: f32,

    /// Downward acceleration per second while airborne
    pub gravity: f32,
    pub terminal_velocity_x: f32,
    pub terminal_velocity_y: f32,
    /// Vertical impulse of a jump
    pub jump_power: f32,
    /// Horizontal control gain
    pub speed: f32,
    /// Constant horizontal deceleration applied each moving frame
    pub friction_kick: f32,
    /// Largest delta time a single physics step will integrate
    pub max_frame_delta: f32,

    pub max_health: f32,
    /// Lava damage per second
    pub lava_damage: f32,

    pub starting_bombs: u32,
    pub explosion_fuse: Duration,
    pub explosion_power: f32,
    pub explosion_decay: f32,
    pub explosion_spread: f32,
    /// Health lost per unit of knockback magnitude (zero = knockback only)
    pub explosion_damage: f32,
    /// Lifespan requested for the explosion visual effect
    pub explosion_effect_lifespan: Duration,

    pub starting_score: f64,
    pub correct_answer_points: f64,
    pub max_level_points: f64,
    pub non_completion_penalty: f64,

    /// How long the podium holds the level transition
    pub podium_hold: Duration,
    /// How long each story slide is shown
    pub story_slide: Duration,
    /// Transition as soon as every player is out of the level
    pub early_finish: bool,
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            cell_size: 50.0,
            floor_y: 0.0,
            floor_contact: 50.0,
            player_height: 50.0,
            player_half_width: 25.0,

            gravity: 1000.0,
            terminal_velocity_x: 1000.0,
            terminal_velocity_y: 1000.0,
            jump_power: 400.0,
            speed: 35.0,
            friction_kick: 5.0,
            max_frame_delta: crate::util::time::MAX_FRAME_DELTA,

            max_health: 100.0,
            lava_damage: 100.0,

            starting_bombs: 3,
            explosion_fuse: Duration::from_secs(1),
            explosion_power: 10_000.0,
            explosion_decay: 0.01,
            explosion_spread: 1.0,
            explosion_damage: 0.0,
            explosion_effect_lifespan: Duration::from_secs(1),

            starting_score: 100_000.0,
            correct_answer_points: 1_000.0,
            max_level_points: 10_000.0,
            non_completion_penalty: 1_000.0,

            podium_hold: Duration::from_secs(5),
            story_slide: Duration::from_secs(2),
            early_finish: true,
        }
    }
}
