//! Game simulation modules

pub mod director;
pub mod explosion;
pub mod grid;
pub mod ingress;
pub mod level;
pub mod physics;
pub mod player;
pub mod scoring;
pub mod session;
pub mod snapshot;
pub mod trivia;
pub mod tuning;

pub use director::{LevelDirector, Phase};
pub use explosion::{EffectKind, EffectRequest};
pub use level::{load_levels, LevelDescriptor, LevelError};
pub use player::{Player, PlayerKey, PlayerRegistry};
pub use scoring::{ScoreRecord, ScoreStore};
pub use session::{GameCommand, GameHandle, GameSession, OperatorSignal, SessionClosed};
pub use snapshot::WorldSnapshot;
pub use trivia::{QuestionBank, TriviaError};
pub use tuning::Tuning;
