//! Level descriptors and their text format
//!
//! A level file lists grid rows top-to-bottom as single-letter tokens
//! separated by spaces, followed by a trailer line
//! `<durationSeconds> <spawnX> <spawnY>` in grid-cell units.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::grid::{CellCoord, Tile, TileGrid};

/// A decoded level, consumed by the level director
#[derive(Debug, Clone)]
pub struct LevelDescriptor {
    pub id: String,
    pub duration: Duration,
    pub spawn: CellCoord,
    pub grid: Arc<TileGrid>,
}

impl LevelDescriptor {
    /// Decode a level description
    pub fn parse(id: &str, source: &str) -> Result<Self, LevelError> {
        let lines: Vec<(usize, &str)> = source
            .lines()
            .enumerate()
            .map(|(idx, line)| (idx + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty())
            .collect();

        let ((trailer_line, trailer), grid_lines) =
            lines.split_last().ok_or(LevelError::MissingTrailer)?;
        if grid_lines.is_empty() {
            return Err(LevelError::EmptyGrid);
        }

        let fields: Vec<&str> = trailer.split_whitespace().collect();
        let [duration, spawn_x, spawn_y] = fields.as_slice() else {
            return Err(LevelError::InvalidTrailer {
                line: *trailer_line,
                reason: "expected `<durationSeconds> <spawnX> <spawnY>`",
            });
        };
        let seconds: f64 = duration.parse().map_err(|_| LevelError::InvalidTrailer {
            line: *trailer_line,
            reason: "duration is not a number",
        })?;
        if !seconds.is_finite() || seconds <= 0.0 {
            return Err(LevelError::InvalidTrailer {
                line: *trailer_line,
                reason: "duration must be positive",
            });
        }
        let duration = Duration::try_from_secs_f64(seconds).map_err(|_| LevelError::InvalidTrailer {
            line: *trailer_line,
            reason: "duration out of range",
        })?;
        let spawn = CellCoord::new(
            spawn_x.parse().map_err(|_| LevelError::InvalidTrailer {
                line: *trailer_line,
                reason: "spawn x is not a cell index",
            })?,
            spawn_y.parse().map_err(|_| LevelError::InvalidTrailer {
                line: *trailer_line,
                reason: "spawn y is not a cell index",
            })?,
        );

        let mut rows = Vec::with_capacity(grid_lines.len());
        for (line, text) in grid_lines {
            let row = text
                .split_whitespace()
                .map(|token| {
                    Tile::from_token(token).ok_or_else(|| LevelError::UnknownTile {
                        line: *line,
                        token: token.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            if let Some(first) = rows.first().map(Vec::len) {
                if row.len() != first {
                    return Err(LevelError::RaggedRow { line: *line });
                }
            }
            rows.push(row);
        }
        // File lists the top row first, the grid counts from the bottom
        rows.reverse();
        let grid = TileGrid::from_rows(rows).ok_or(LevelError::EmptyGrid)?;

        if grid.get(spawn).is_none() {
            return Err(LevelError::SpawnOutOfBounds {
                x: spawn.x,
                y: spawn.y,
            });
        }

        Ok(Self {
            id: id.to_string(),
            duration,
            spawn,
            grid: Arc::new(grid),
        })
    }

    /// Spawn point in world units
    pub fn spawn_position(&self, cell_size: f32) -> (f32, f32) {
        (
            self.spawn.x as f32 * cell_size,
            self.spawn.y as f32 * cell_size,
        )
    }
}

/// Load every level of the sequence from `<dir>/<id>.txt`
pub fn load_levels(dir: &Path, ids: &[String]) -> Result<Vec<LevelDescriptor>, LevelError> {
    ids.iter()
        .map(|id| {
            let path = dir.join(format!("{id}.txt"));
            let source = std::fs::read_to_string(&path).map_err(|source| LevelError::Read {
                path: path.clone(),
                source,
            })?;
            let level = LevelDescriptor::parse(id, &source)?;
            info!(
                level = %id,
                width = level.grid.width(),
                height = level.grid.height(),
                duration_secs = level.duration.as_secs_f32(),
                "Loaded level"
            );
            Ok(level)
        })
        .collect()
}

/// Level decoding errors
#[derive(Debug, thiserror::Error)]
pub enum LevelError {
    #[error("failed to read level file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("level has no trailer line")]
    MissingTrailer,

    #[error("level has no grid rows")]
    EmptyGrid,

    #[error("invalid trailer on line {line}: {reason}")]
    InvalidTrailer { line: usize, reason: &'static str },

    #[error("unknown tile {token:?} on line {line}")]
    UnknownTile { line: usize, token: String },

    #[error("row on line {line} has a different width than the first row")]
    RaggedRow { line: usize },

    #[error("spawn cell ({x}, {y}) is outside the grid")]
    SpawnOutOfBounds { x: usize, y: usize },
}
