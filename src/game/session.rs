//! The game session: authoritative owner of players, grid and round state

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::util::time::{
    frame_delta, frame_duration, ANIMATION_MILLIS, FRAME_TPS, FUSE_SCAN_MILLIS, SNAPSHOT_TPS,
    STATUS_PUSH_MILLIS,
};
use crate::ws::protocol::{ClientCommand, ServerMsg};

use super::director::{LevelDirector, Phase, Transition};
use super::explosion::{EffectRequest, ExplosionSystem};
use super::grid::TileGrid;
use super::ingress::{apply_command, IngressContext, IngressOutcome};
use super::level::LevelDescriptor;
use super::physics::{PhysicsSystem, StepEvent};
use super::player::{PlayerKey, PlayerRegistry};
use super::scoring::{ScoreKeeper, ScoreRecord, ScoreStore};
use super::snapshot::{SnapshotBuilder, WorldSnapshot};
use super::trivia::{QuestionBank, TriviaGate};
use super::tuning::Tuning;

const COMMAND_QUEUE: usize = 1024;
const OUTBOUND_QUEUE: usize = 256;
const EFFECT_QUEUE: usize = 64;

/// Signals from the operator at the shared screen
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorSignal {
    /// Skip story, start from the menu, or end the running level
    Proceed,
}

/// Everything the session can be asked to do
#[derive(Debug, Clone)]
pub enum GameCommand {
    /// A decoded controller message
    Control {
        from: PlayerKey,
        command: ClientCommand,
    },
    Operator(OperatorSignal),
}

/// Handle to the running session
#[derive(Clone)]
pub struct GameHandle {
    command_tx: mpsc::Sender<GameCommand>,
    outbound_tx: broadcast::Sender<ServerMsg>,
    effects_tx: broadcast::Sender<EffectRequest>,
    latest: Arc<RwLock<WorldSnapshot>>,
}

impl GameHandle {
    /// Queue a command for the next frame
    pub async fn send(&self, command: GameCommand) -> Result<(), SessionClosed> {
        self.command_tx.send(command).await.map_err(|_| SessionClosed)
    }

    /// Messages for every controller
    pub fn subscribe_outbound(&self) -> broadcast::Receiver<ServerMsg> {
        self.outbound_tx.subscribe()
    }

    /// Effect spawn requests for the renderer
    pub fn subscribe_effects(&self) -> broadcast::Receiver<EffectRequest> {
        self.effects_tx.subscribe()
    }

    /// Latest published world snapshot
    pub fn snapshot(&self) -> WorldSnapshot {
        self.latest.read().clone()
    }
}

/// The session task is gone (round over or shut down)
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("game session has stopped")]
pub struct SessionClosed;

/// The authoritative game session
pub struct GameSession {
    registry: PlayerRegistry,
    grid: Arc<TileGrid>,
    director: LevelDirector,
    trivia: TriviaGate,
    tuning: Tuning,
    store: ScoreStore,
    rng: ChaCha8Rng,
    leaderboard: Vec<ScoreRecord>,
    snapshot_builder: SnapshotBuilder,
    last_frame: Instant,
    last_delta: f32,
    command_rx: mpsc::Receiver<GameCommand>,
    outbound_tx: broadcast::Sender<ServerMsg>,
    effects_tx: broadcast::Sender<EffectRequest>,
    latest: Arc<RwLock<WorldSnapshot>>,
}

impl GameSession {
    pub fn new(
        levels: Vec<LevelDescriptor>,
        bank: QuestionBank,
        tuning: Tuning,
        store: ScoreStore,
        story_slides: usize,
        seed: u64,
    ) -> (Self, GameHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (outbound_tx, _) = broadcast::channel(OUTBOUND_QUEUE);
        let (effects_tx, _) = broadcast::channel(EFFECT_QUEUE);
        let latest = Arc::new(RwLock::new(WorldSnapshot::default()));

        let handle = GameHandle {
            command_tx,
            outbound_tx: outbound_tx.clone(),
            effects_tx: effects_tx.clone(),
            latest: latest.clone(),
        };

        let now = Instant::now();
        let mut session = Self {
            registry: PlayerRegistry::new(),
            grid: Arc::new(TileGrid::default()),
            director: LevelDirector::new(levels, story_slides, &tuning, now),
            trivia: TriviaGate::new(bank, outbound_tx.clone()),
            tuning,
            store,
            rng: ChaCha8Rng::seed_from_u64(seed),
            leaderboard: Vec::new(),
            snapshot_builder: SnapshotBuilder::new(FRAME_TPS / SNAPSHOT_TPS),
            last_frame: now,
            last_delta: 0.0,
            command_rx,
            outbound_tx,
            effects_tx,
            latest,
        };
        session.publish_snapshot(now);

        (session, handle)
    }

    /// Run until the level sequence is exhausted
    pub async fn run(mut self) {
        info!(levels = self.director.level_count(), phase = self.director.phase().name(), "Game session started");

        let mut frame_ticker = interval(frame_duration());
        let mut fuse_ticker = interval(Duration::from_millis(FUSE_SCAN_MILLIS));
        let mut animation_ticker = interval(Duration::from_millis(ANIMATION_MILLIS));
        let mut status_ticker = interval(Duration::from_millis(STATUS_PUSH_MILLIS));
        for ticker in [&mut frame_ticker, &mut fuse_ticker, &mut animation_ticker, &mut status_ticker] {
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        }

        loop {
            tokio::select! {
                _ = frame_ticker.tick() => self.run_frame(Instant::now()),
                _ = fuse_ticker.tick() => self.scan_fuses(Instant::now()),
                _ = animation_ticker.tick() => self.update_animations(),
                _ = status_ticker.tick() => self.push_status(),
            }

            if self.director.is_finished() {
                break;
            }
        }

        self.publish_snapshot(Instant::now());
        info!(players = self.registry.len(), "Game session finished");
    }

    /// One frame: drain commands, advance the director, step physics
    fn run_frame(&mut self, now: Instant) {
        let dt = frame_delta(self.last_frame, now);
        self.last_frame = now;
        self.last_delta = dt;

        self.process_commands(now);

        if let Some(transition) = self.director.poll(now, self.registry.all_out()) {
            self.apply_transition(transition, now);
        }

        if self.director.is_playing() {
            let elapsed = self.director.level_elapsed(now);
            let events = PhysicsSystem::step(&mut self.registry, &self.grid, &self.tuning, dt, elapsed);
            for event in events {
                self.log_step_event(event);
            }
        }

        if self.snapshot_builder.should_send() {
            self.publish_snapshot(now);
        }
    }

    fn process_commands(&mut self, now: Instant) {
        while let Ok(command) = self.command_rx.try_recv() {
            self.handle_command(command, now);
        }
    }

    fn handle_command(&mut self, command: GameCommand, now: Instant) {
        match command {
            GameCommand::Control { from, command } => {
                let ctx = IngressContext {
                    gate: self.director.gate(),
                    frame_delta: self.last_delta,
                    now,
                    spawn: self.spawn_position(),
                };
                let outcome = apply_command(&mut self.registry, &self.trivia, &self.tuning, &ctx, from, command);
                match outcome {
                    IngressOutcome::Registered => {
                        let display_name = self.registry.get(&from).map(|p| p.name.as_str()).unwrap_or_default();
                        info!(player = %from, display_name, players = self.registry.len(), "Player registered");
                    }
                    IngressOutcome::CorrectAnswer { bombs_left } => {
                        info!(player = %from, bombs_left, "Correct trivia answer");
                    }
                    IngressOutcome::Ignored(reason) => {
                        debug!(player = %from, ?reason, "Command ignored");
                    }
                    other => debug!(player = %from, outcome = ?other, "Command applied"),
                }
            }
            GameCommand::Operator(OperatorSignal::Proceed) => {
                let has_players = !self.registry.is_empty();
                match self.director.proceed(now, has_players) {
                    Some(transition) => {
                        info!(phase = self.director.phase().name(), "Operator proceed");
                        self.apply_transition(transition, now);
                    }
                    None => debug!(phase = self.director.phase().name(), has_players, "Operator proceed ignored"),
                }
            }
        }
    }

    fn apply_transition(&mut self, transition: Transition, now: Instant) {
        self.snapshot_builder.force_next();

        match transition {
            Transition::Menu => info!("Story finished, waiting for operator"),
            Transition::Resume => {
                info!(level = ?self.director.current_index(), "Podium over, level clock started");
            }
            Transition::Level { index, previous } => {
                let asked = self.trivia.ask_question(&mut self.rng);
                debug!(correct = asked.correct, "Level question asked");

                if let Some(previous) = previous {
                    ScoreKeeper::apply_level_score(&mut self.registry, &self.tuning, previous);
                }

                if let Some(level) = self.director.current_level() {
                    self.registry.reset_for_level(level.spawn_position(self.tuning.cell_size));
                    self.grid = level.grid.clone();
                }

                info!(
                    index,
                    players = self.registry.len(),
                    playing = self.director.is_playing(),
                    "Level transition"
                );
            }
            Transition::Finished { previous } => self.finish_round(previous),
        }

        self.publish_snapshot(now);
    }

    /// Final scoring and persistence, once per round
    fn finish_round(&mut self, previous: Duration) {
        ScoreKeeper::apply_level_score(&mut self.registry, &self.tuning, previous);
        let leaderboard = ScoreKeeper::finalize_round(&self.registry);

        if let Err(e) = self.store.save(&leaderboard) {
            error!(error = %e, path = %self.store.path().display(), "Failed to persist leaderboard");
        }

        if let Some(best) = leaderboard.first() {
            info!(winner = %best.name, score = best.score, players = leaderboard.len(), "Round finished");
        } else {
            info!("Round finished without players");
        }
        self.leaderboard = leaderboard;
    }

    /// Detonate expired fuses and apply their blasts
    fn scan_fuses(&mut self, now: Instant) {
        if !self.director.is_playing() {
            return;
        }

        let detonations = ExplosionSystem::detonate_due(&mut self.registry, self.tuning.explosion_fuse, now);
        if detonations.is_empty() {
            return;
        }

        let elapsed = self.director.level_elapsed(now);
        for detonation in detonations {
            let knocked_out = ExplosionSystem::apply_blast(&mut self.registry, &self.tuning, &detonation, elapsed);
            let _ = self
                .effects_tx
                .send(ExplosionSystem::effect_for(&self.tuning, &detonation));

            debug!(bomber = %detonation.bomber, x = detonation.x, y = detonation.y, "Bomb detonated");
            for key in knocked_out {
                info!(player = %key, bomber = %detonation.bomber, "Player knocked out by blast");
            }
        }
    }

    fn update_animations(&mut self) {
        if !matches!(self.director.phase(), Phase::Playing | Phase::LevelTransition { .. }) {
            return;
        }
        for player in self.registry.iter_mut() {
            player.animation = player.classify_animation();
        }
    }

    /// Bomb count and health for every player
    fn push_status(&self) {
        if self.registry.is_empty() {
            return;
        }
        for player in self.registry.iter() {
            let _ = self.outbound_tx.send(ServerMsg::Bombs {
                name: player.name.clone(),
                bombs_left: player.bombs_left,
            });
            let _ = self.outbound_tx.send(ServerMsg::Health {
                name: player.name.clone(),
                health: player.health(),
            });
        }
    }

    fn publish_snapshot(&self, now: Instant) {
        let snapshot = self
            .snapshot_builder
            .build(&self.director, &self.grid, &self.registry, &self.leaderboard, now);
        *self.latest.write() = snapshot;
    }

    fn spawn_position(&self) -> (f32, f32) {
        self.director
            .current_level()
            .map_or((0.0, 0.0), |level| level.spawn_position(self.tuning.cell_size))
    }

    fn log_step_event(&self, event: StepEvent) {
        match event {
            StepEvent::Finished { key, after } => {
                info!(player = %key, after_ms = after.as_millis() as u64, "Player reached the finish");
            }
            StepEvent::KnockedOut { key, after } => {
                info!(player = %key, after_ms = after.as_millis() as u64, "Player knocked out");
            }
            StepEvent::BombGranted { key, cell } => {
                debug!(player = %key, x = cell.x, y = cell.y, "Ability tile claimed");
            }
        }
    }
}
