//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::game::Tuning;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// File receiving WARN and above (recovered runtime faults)
    pub fault_log_path: PathBuf,

    /// Directory holding `<id>.txt` level files
    pub levels_dir: PathBuf,
    /// Level ids played in order
    pub level_sequence: Vec<String>,
    /// Trivia question bank (JSON)
    pub questions_path: PathBuf,
    /// End-of-round leaderboard output
    pub scores_path: PathBuf,

    /// Number of story slides shown before the menu
    pub story_slides: usize,
    /// Fixed RNG seed, random when absent
    pub seed: Option<u64>,
    /// Gameplay constants with operator overrides applied
    pub tuning: Tuning,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // PORT wins over SERVER_ADDR when both are present
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string())
        };

        let level_sequence = parse_sequence(
            &env::var("LEVEL_SEQUENCE").unwrap_or_else(|_| "1,2".to_string()),
        )?;

        let mut tuning = Tuning::default();
        if let Some(damage) = parse_optional::<f32>("EXPLOSION_DAMAGE")? {
            if !damage.is_finite() || damage < 0.0 {
                return Err(ConfigError::Invalid("EXPLOSION_DAMAGE"));
            }
            tuning.explosion_damage = damage;
        }
        if let Some(early_finish) = parse_optional::<bool>("EARLY_FINISH")? {
            tuning.early_finish = early_finish;
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            fault_log_path: path_or("FAULT_LOG_PATH", "faults.log"),

            levels_dir: path_or("LEVELS_DIR", "levels"),
            level_sequence,
            questions_path: path_or("QUESTIONS_PATH", "questions.json"),
            scores_path: path_or("SCORES_PATH", "scores.json"),

            story_slides: parse_optional("STORY_SLIDES")?.unwrap_or(0),
            seed: parse_optional("GAME_SEED")?,
            tuning,
        })
    }
}

fn path_or(name: &str, default: &str) -> PathBuf {
    env::var(name)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn parse_optional<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(name)),
        Err(_) => Ok(None),
    }
}

/// Split a comma-separated level list, rejecting an empty sequence
fn parse_sequence(raw: &str) -> Result<Vec<String>, ConfigError> {
    let ids: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();

    if ids.is_empty() {
        return Err(ConfigError::Invalid("LEVEL_SEQUENCE"));
    }
    Ok(ids)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
