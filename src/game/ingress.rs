//! Applying decoded controller commands to the player table

use std::time::Instant;

use super::player::{Player, PlayerKey, PlayerRegistry};
use super::trivia::TriviaGate;
use super::tuning::Tuning;
use crate::ws::protocol::ClientCommand;

/// What the round currently lets controllers do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundGate {
    /// Registration is open
    pub accepts_players: bool,
    /// Trivia answers count
    pub accepts_answers: bool,
    /// Movement and bombs count
    pub accepts_controls: bool,
}

/// Frame context a command is applied in
#[derive(Debug, Clone, Copy)]
pub struct IngressContext {
    pub gate: RoundGate,
    /// Delta time of the latest frame
    pub frame_delta: f32,
    pub now: Instant,
    /// Where new players appear
    pub spawn: (f32, f32),
}

/// Result of applying one command
#[derive(Debug, Clone, PartialEq)]
pub enum IngressOutcome {
    Registered,
    Jumped,
    Moved { vel_x: f32 },
    BombArmed { bombs_left: u32 },
    CorrectAnswer { bombs_left: u32 },
    WrongAnswer,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    AlreadyRegistered,
    RegistrationClosed,
    UnknownSender,
    RoundInactive,
    /// Player is out of the current level
    Sidelined,
    NotGrounded,
    NoBombsLeft,
    AlreadyArmed,
    NoQuestion,
}

/// Apply one controller command from `from`
pub fn apply_command(
    registry: &mut PlayerRegistry,
    trivia: &TriviaGate,
    tuning: &Tuning,
    ctx: &IngressContext,
    from: PlayerKey,
    command: ClientCommand,
) -> IngressOutcome {
    use IgnoreReason::*;

    match command {
        ClientCommand::Register(registration) => {
            if !ctx.gate.accepts_players {
                return IngressOutcome::Ignored(RegistrationClosed);
            }
            match registry.register(from, registration, ctx.spawn, tuning) {
                Ok(_) => IngressOutcome::Registered,
                Err(_) => IngressOutcome::Ignored(AlreadyRegistered),
            }
        }
        command => match registry.get_mut(&from) {
            Some(player) => apply_to_player(player, trivia, tuning, ctx, command),
            None => IngressOutcome::Ignored(UnknownSender),
        },
    }
}

fn apply_to_player(
    player: &mut Player,
    trivia: &TriviaGate,
    tuning: &Tuning,
    ctx: &IngressContext,
    command: ClientCommand,
) -> IngressOutcome {
    use IgnoreReason::*;

    match command {
        ClientCommand::Register(_) => IngressOutcome::Ignored(AlreadyRegistered),
        ClientCommand::TriviaResponse(answer) => {
            if !ctx.gate.accepts_answers {
                return IngressOutcome::Ignored(RoundInactive);
            }
            match trivia.check(&answer) {
                None => IngressOutcome::Ignored(NoQuestion),
                Some(true) => {
                    player.bombs_left += 1;
                    player.score += tuning.correct_answer_points;
                    IngressOutcome::CorrectAnswer {
                        bombs_left: player.bombs_left,
                    }
                }
                Some(false) => IngressOutcome::WrongAnswer,
            }
        }
        _ if !ctx.gate.accepts_controls => IngressOutcome::Ignored(RoundInactive),
        _ if !player.is_active() => IngressOutcome::Ignored(Sidelined),
        ClientCommand::Jump => {
            if !player.grounded {
                return IngressOutcome::Ignored(NotGrounded);
            }
            player.vel_y += player.jump_power;
            player.grounded = false;
            IngressOutcome::Jumped
        }
        ClientCommand::Balance(value) => {
            // Overflow saturates at terminal velocity
            let increment = player.speed * ctx.frame_delta * value;
            if !increment.is_nan() {
                player.vel_x = (player.vel_x + increment).clamp(-player.terminal_vel_x, player.terminal_vel_x);
            }
            IngressOutcome::Moved {
                vel_x: player.vel_x,
            }
        }
        ClientCommand::ArmBomb => {
            if player.is_armed() {
                return IngressOutcome::Ignored(AlreadyArmed);
            }
            if player.bombs_left == 0 {
                return IngressOutcome::Ignored(NoBombsLeft);
            }
            player.bombs_left -= 1;
            player.armed_at = Some(ctx.now);
            player.wearing_hat = false;
            IngressOutcome::BombArmed {
                bombs_left: player.bombs_left,
            }
        }
    }
}
