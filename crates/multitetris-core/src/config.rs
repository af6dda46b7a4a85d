use serde::{Deserialize, Serialize};

use crate::shapes::TETROMINOES;

/// Largest row or column count a board accepts.
pub const MAX_BOARD_DIMENSION: usize = 1024;

/// Static board parameters shared by every board in a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Number of rows (height).
    pub rows: usize,
    /// Number of columns (width).
    pub cols: usize,
    /// How many upcoming shapes are kept in the queue.
    pub lookahead: usize,
    /// Seed for shape and color selection. `None` seeds from the OS.
    pub seed: Option<u64>,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            rows: 20,
            cols: 10,
            lookahead: 2,
            seed: None,
        }
    }
}

impl BoardConfig {
    /// Load config from environment or TOML file, falling back to defaults.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("MULTITETRIS_BOARD_CONFIG")
            && let Ok(contents) = std::fs::read_to_string(&path)
            && let Ok(config) = toml::from_str::<Self>(&contents)
        {
            return config;
        }
        if let Ok(contents) = std::fs::read_to_string("config/board.toml")
            && let Ok(config) = toml::from_str::<Self>(&contents)
        {
            return config;
        }
        Self::default()
    }

    /// `(rows, cols)` as grid coordinates, clamped to `MAX_BOARD_DIMENSION`.
    pub fn dimensions(&self) -> (i32, i32) {
        let clamp = |n: usize| i32::try_from(n.min(MAX_BOARD_DIMENSION)).unwrap_or(0);
        (clamp(self.rows), clamp(self.cols))
    }

    /// Every tetromino fits when spawned at `(cols / 2, 0)`, and every
    /// rotation of it fits vertically.
    pub fn is_playable(&self) -> bool {
        if self.lookahead == 0
            || self.rows > MAX_BOARD_DIMENSION
            || self.cols > MAX_BOARD_DIMENSION
        {
            return false;
        }
        let (Ok(rows), Ok(cols)) = (i32::try_from(self.rows), i32::try_from(self.cols)) else {
            return false;
        };
        let anchor = cols / 2;
        TETROMINOES.iter().all(|template| {
            let spawn_fits = template.rotations[0]
                .iter()
                .all(|&(dx, dy)| (0..cols).contains(&(anchor + dx)) && (0..rows).contains(&dy));
            let rotations_fit = template
                .rotations
                .iter()
                .flat_map(|rotation| rotation.iter())
                .all(|&(_, dy)| dy < rows);
            spawn_fits && rotations_fit
        })
    }
}
