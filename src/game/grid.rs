//! Tile grid and bounds-checked cell lookups

use serde::Serialize;

/// One grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tile {
    #[default]
    Empty,
    Solid,
    Lava,
    /// Grants one bomb per player per level
    Ability,
    Finish,
}

impl Tile {
    /// Decode a level file token
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "e" => Some(Self::Empty),
            "s" => Some(Self::Solid),
            "l" => Some(Self::Lava),
            "a" => Some(Self::Ability),
            "f" => Some(Self::Finish),
            _ => None,
        }
    }

    pub fn token(self) -> char {
        match self {
            Self::Empty => 'e',
            Self::Solid => 's',
            Self::Lava => 'l',
            Self::Ability => 'a',
            Self::Finish => 'f',
        }
    }

    /// Whether the tile stops players (floor, ceiling and walls)
    pub fn is_blocking(self) -> bool {
        match self {
            Self::Empty => false,
            Self::Solid | Self::Lava | Self::Ability | Self::Finish => true,
        }
    }
}

/// Grid coordinate, `y` counted upwards from the bottom row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct CellCoord {
    pub x: usize,
    pub y: usize,
}

impl CellCoord {
    pub fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }
}

/// Fixed-size 2D tile array, replaced wholesale on level load
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TileGrid {
    width: usize,
    height: usize,
    /// Row-major from the bottom row up
    cells: Vec<Tile>,
}

impl TileGrid {
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            cells: vec![Tile::Empty; width * height],
        }
    }

    /// Build from rows listed bottom-to-top. Rows must share one width.
    pub fn from_rows(rows: Vec<Vec<Tile>>) -> Option<Self> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|row| row.len() != width) {
            return None;
        }
        Some(Self {
            width,
            height,
            cells: rows.into_iter().flatten().collect(),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn get(&self, cell: CellCoord) -> Option<Tile> {
        if cell.x < self.width && cell.y < self.height {
            self.cells.get(cell.y * self.width + cell.x).copied()
        } else {
            None
        }
    }

    /// Grid cell containing a world point.
    ///
    /// Off-grid points (including non-finite ones) have no cell.
    pub fn cell_at(&self, cell_size: f32, x: f32, y: f32) -> Option<CellCoord> {
        if !x.is_finite() || !y.is_finite() || cell_size <= 0.0 {
            return None;
        }
        let cx = (x / cell_size).floor();
        let cy = (y / cell_size).floor();
        if cx < 0.0 || cy < 0.0 || cx >= self.width as f32 || cy >= self.height as f32 {
            return None;
        }
        Some(CellCoord::new(cx as usize, cy as usize))
    }

    /// Tile under a world point, `None` when the point is off-grid
    pub fn tile_at(&self, cell_size: f32, x: f32, y: f32) -> Option<(CellCoord, Tile)> {
        let cell = self.cell_at(cell_size, x, y)?;
        self.get(cell).map(|tile| (cell, tile))
    }

    /// Whether the tile under a world point blocks movement
    pub fn blocks_at(&self, cell_size: f32, x: f32, y: f32) -> bool {
        self.tile_at(cell_size, x, y)
            .map_or(false, |(_, tile)| tile.is_blocking())
    }

    /// Rows as token strings, top row first (renderer view)
    pub fn rows_top_down(&self) -> Vec<String> {
        (0..self.height)
            .rev()
            .map(|y| {
                self.cells[y * self.width..(y + 1) * self.width]
                    .iter()
                    .map(|tile| tile.token())
                    .collect()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TileGrid {
        // bottom row first
        TileGrid::from_rows(vec![
            vec![Tile::Solid, Tile::Lava, Tile::Solid],
            vec![Tile::Empty, Tile::Empty, Tile::Ability],
            vec![Tile::Empty, Tile::Empty, Tile::Finish],
        ])
        .unwrap()
    }

    #[test]
    fn lookups_use_floor_division() {
        let grid = sample();
        assert_eq!(grid.tile_at(50.0, 75.0, 10.0), Some((CellCoord::new(1, 0), Tile::Lava)));
        assert_eq!(grid.tile_at(50.0, 149.9, 149.9), Some((CellCoord::new(2, 2), Tile::Finish)));
        assert_eq!(grid.tile_at(50.0, 0.0, 50.0), Some((CellCoord::new(0, 1), Tile::Empty)));
    }

    #[test]
    fn off_grid_points_have_no_tile() {
        let grid = sample();
        assert_eq!(grid.tile_at(50.0, -0.1, 10.0), None);
        assert_eq!(grid.tile_at(50.0, 10.0, -30.0), None);
        assert_eq!(grid.tile_at(50.0, 150.0, 10.0), None);
        assert_eq!(grid.tile_at(50.0, 10.0, 1.0e9), None);
        assert_eq!(grid.tile_at(50.0, f32::NAN, 10.0), None);
        assert_eq!(grid.tile_at(50.0, f32::INFINITY, 10.0), None);
        assert!(!grid.blocks_at(50.0, -500.0, -500.0));
    }

    #[test]
    fn ragged_rows_are_refused() {
        assert!(TileGrid::from_rows(vec![vec![Tile::Solid], vec![]]).is_none());
    }

    #[test]
    fn only_empty_tiles_are_passable() {
        assert!(!Tile::Empty.is_blocking());
        for tile in [Tile::Solid, Tile::Lava, Tile::Ability, Tile::Finish] {
            assert!(tile.is_blocking());
            assert_eq!(Tile::from_token(&tile.token().to_string()), Some(tile));
        }
    }

    #[test]
    fn renders_rows_top_down() {
        assert_eq!(sample().rows_top_down(), vec!["eef", "eea", "sls"]);
    }
}
