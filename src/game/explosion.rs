//! Bomb fuses, detonations and area-of-effect knockback

use std::time::{Duration, Instant};

use serde::Serialize;

use super::player::{PlayerKey, PlayerRegistry};
use super::tuning::Tuning;
use crate::util::time::unix_millis;

/// A bomb whose fuse ran out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Detonation {
    pub bomber: PlayerKey,
    pub x: f32,
    pub y: f32,
}

/// Visual effect kinds the renderer knows how to draw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Explosion,
}

/// Request for the renderer to spawn a particle effect
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EffectRequest {
    pub kind: EffectKind,
    pub x: f32,
    pub y: f32,
    /// Unix millis at creation
    pub created_at_ms: u64,
    pub lifespan_ms: u64,
}

/// Impulse one blast applies to one target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Knockback {
    pub magnitude: f32,
    pub accel_x: f32,
    pub accel_y: f32,
}

/// Explosion system for fuses and blasts
pub struct ExplosionSystem;

impl ExplosionSystem {
    /// Disarm every bomb whose fuse has elapsed and return where they went off.
    /// The bomber gets its hat back.
    pub fn detonate_due(registry: &mut PlayerRegistry, fuse: Duration, now: Instant) -> Vec<Detonation> {
        let mut detonations = Vec::new();
        for player in registry.iter_mut() {
            let Some(armed_at) = player.armed_at else {
                continue;
            };
            if now.saturating_duration_since(armed_at) < fuse {
                continue;
            }
            player.armed_at = None;
            player.wearing_hat = true;
            detonations.push(Detonation {
                bomber: player.key,
                x: player.x,
                y: player.y,
            });
        }
        detonations
    }

    /// Exponential falloff impulse from `origin` to `target`.
    ///
    /// A target sitting exactly on the origin is pushed straight up.
    pub fn knockback(tuning: &Tuning, origin: (f32, f32), target: (f32, f32)) -> Knockback {
        let dx = target.0 - origin.0;
        let dy = target.1 - origin.1;
        let distance = dx.hypot(dy);
        let magnitude = tuning.explosion_power
            * (-tuning.explosion_decay * distance).exp()
            * tuning.explosion_spread;
        if !magnitude.is_finite() {
            return Knockback {
                magnitude: 0.0,
                accel_x: 0.0,
                accel_y: 0.0,
            };
        }

        let (dir_x, dir_y) = if distance > f32::EPSILON && distance.is_finite() {
            (dx / distance, dy / distance)
        } else {
            (0.0, 1.0)
        };

        Knockback {
            magnitude,
            accel_x: magnitude * dir_x,
            accel_y: magnitude * dir_y,
        }
    }

    /// Push every other active player away from a detonation.
    /// Returns the keys of players this blast knocked out.
    pub fn apply_blast(
        registry: &mut PlayerRegistry,
        tuning: &Tuning,
        detonation: &Detonation,
        level_elapsed: Duration,
    ) -> Vec<PlayerKey> {
        let origin = (detonation.x, detonation.y);
        let mut knocked_out = Vec::new();

        for target in registry.iter_mut() {
            // Identity, not distance, decides who is the bomber
            if target.key == detonation.bomber || !target.is_active() {
                continue;
            }

            let impulse = Self::knockback(tuning, origin, (target.x, target.y));
            target.vel_x += impulse.accel_x;
            target.vel_y += impulse.accel_y;

            if tuning.explosion_damage > 0.0
                && target.apply_damage(impulse.magnitude * tuning.explosion_damage)
            {
                target.finish_duration = level_elapsed;
                knocked_out.push(target.key);
            }
        }

        knocked_out
    }

    /// Renderer request for a detonation's visual effect
    pub fn effect_for(tuning: &Tuning, detonation: &Detonation) -> EffectRequest {
        EffectRequest {
            kind: EffectKind::Explosion,
            x: detonation.x,
            y: detonation.y,
            created_at_ms: unix_millis(),
            lifespan_ms: tuning.explosion_effect_lifespan.as_millis() as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::protocol::Registration;
    use std::net::SocketAddr;

    fn key(port: u16) -> PlayerKey {
        SocketAddr::from(([172, 16, 0, 9], port))
    }

    fn registry_with(positions: &[(u16, f32, f32)], tuning: &Tuning) -> PlayerRegistry {
        let mut registry = PlayerRegistry::new();
        for (port, x, y) in positions {
            registry
                .register(
                    key(*port),
                    Registration {
                        hat_id: 1,
                        character_id: 1,
                        name: format!("p{port}"),
                    },
                    (*x, *y),
                    tuning,
                )
                .unwrap();
        }
        registry
    }

    #[test]
    fn fuse_must_elapse_before_detonation() {
        let tuning = Tuning::default();
        let mut registry = registry_with(&[(1, 10.0, 20.0)], &tuning);
        let armed_at = Instant::now();
        {
            let bomber = registry.get_mut(&key(1)).unwrap();
            bomber.armed_at = Some(armed_at);
            bomber.wearing_hat = false;
        }

        let early = ExplosionSystem::detonate_due(&mut registry, tuning.explosion_fuse, armed_at + Duration::from_millis(900));
        assert!(early.is_empty());
        assert!(registry.get(&key(1)).unwrap().is_armed());

        let due = ExplosionSystem::detonate_due(&mut registry, tuning.explosion_fuse, armed_at + Duration::from_millis(1_000));
        assert_eq!(
            due,
            vec![Detonation {
                bomber: key(1),
                x: 10.0,
                y: 20.0
            }]
        );
        let bomber = registry.get(&key(1)).unwrap();
        assert!(!bomber.is_armed());
        assert!(bomber.wearing_hat);

        // Already detonated
        let again = ExplosionSystem::detonate_due(&mut registry, tuning.explosion_fuse, armed_at + Duration::from_secs(5));
        assert!(again.is_empty());
    }

    #[test]
    fn knockback_strictly_decreases_with_distance() {
        let tuning = Tuning::default();
        let mut previous = f32::INFINITY;
        for step in 0..200 {
            let distance = step as f32 * 2.5;
            let impulse = ExplosionSystem::knockback(&tuning, (100.0, 100.0), (100.0 + distance, 100.0));
            assert!(impulse.magnitude < previous, "not decreasing at {distance}");
            previous = impulse.magnitude;
        }
    }

    #[test]
    fn knockback_points_away_from_origin() {
        let tuning = Tuning::default();
        let impulse = ExplosionSystem::knockback(&tuning, (0.0, 0.0), (-30.0, 40.0));
        assert!((impulse.magnitude - 10_000.0 * (-0.5f32).exp()).abs() < 0.01);
        assert!((impulse.accel_x - impulse.magnitude * -0.6).abs() < 0.01);
        assert!((impulse.accel_y - impulse.magnitude * 0.8).abs() < 0.01);
    }

    #[test]
    fn coincident_target_gets_finite_upward_push() {
        let tuning = Tuning::default();
        let impulse = ExplosionSystem::knockback(&tuning, (75.0, 75.0), (75.0, 75.0));
        assert!(impulse.magnitude.is_finite());
        assert_eq!(impulse.accel_x, 0.0);
        assert_eq!(impulse.accel_y, tuning.explosion_power * tuning.explosion_spread);
    }

    #[test]
    fn lost_bomber_leaves_others_untouched() {
        let tuning = Tuning::default();
        let impulse = ExplosionSystem::knockback(&tuning, (f32::NAN, 0.0), (10.0, 0.0));
        assert_eq!((impulse.magnitude, impulse.accel_x, impulse.accel_y), (0.0, 0.0, 0.0));

        let mut registry = registry_with(&[(1, 0.0, 0.0), (2, 10.0, 0.0)], &tuning);
        let detonation = Detonation {
            bomber: key(1),
            x: f32::NAN,
            y: f32::NAN,
        };
        ExplosionSystem::apply_blast(&mut registry, &tuning, &detonation, Duration::ZERO);
        let victim = registry.get(&key(2)).unwrap();
        assert_eq!((victim.vel_x, victim.vel_y), (0.0, 0.0));
        assert_eq!(victim.health(), 100.0);
    }

    #[test]
    fn blast_skips_the_bomber_by_identity() {
        let tuning = Tuning::default();
        // Second player stands exactly where the bomber is
        let mut registry = registry_with(&[(1, 50.0, 50.0), (2, 50.0, 50.0), (3, 150.0, 50.0)], &tuning);
        let detonation = Detonation {
            bomber: key(1),
            x: 50.0,
            y: 50.0,
        };

        let knocked = ExplosionSystem::apply_blast(&mut registry, &tuning, &detonation, Duration::ZERO);

        assert!(knocked.is_empty());
        let bomber = registry.get(&key(1)).unwrap();
        assert_eq!((bomber.vel_x, bomber.vel_y), (0.0, 0.0));
        let stacked = registry.get(&key(2)).unwrap();
        assert!(stacked.vel_y > 0.0 && stacked.vel_x == 0.0);
        let near = registry.get(&key(3)).unwrap();
        assert!(near.vel_x > 0.0);
        // Zero damage coefficient means knockback only
        assert_eq!(near.health(), 100.0);
    }

    #[test]
    fn damage_coefficient_hurts_and_records_knock_out() {
        let tuning = Tuning {
            explosion_damage: 0.05,
            ..Tuning::default()
        };
        let mut registry = registry_with(&[(1, 0.0, 0.0), (2, 10.0, 0.0), (3, 900.0, 0.0)], &tuning);
        let detonation = Detonation {
            bomber: key(1),
            x: 0.0,
            y: 0.0,
        };
        let elapsed = Duration::from_secs(7);

        let knocked = ExplosionSystem::apply_blast(&mut registry, &tuning, &detonation, elapsed);

        assert_eq!(knocked, vec![key(2)]);
        let close = registry.get(&key(2)).unwrap();
        assert_eq!(close.health(), 0.0);
        assert_eq!(close.finish_duration, elapsed);
        let far = registry.get(&key(3)).unwrap();
        assert!(far.health() < 100.0 && far.health() > 0.0);
    }

    #[test]
    fn effect_request_sits_at_blast_origin() {
        let tuning = Tuning::default();
        let effect = ExplosionSystem::effect_for(
            &tuning,
            &Detonation {
                bomber: key(1),
                x: 12.0,
                y: 34.0,
            },
        );
        assert_eq!(effect.kind, EffectKind::Explosion);
        assert_eq!((effect.x, effect.y), (12.0, 34.0));
        assert_eq!(effect.lifespan_ms, 1_000);
    }
}
