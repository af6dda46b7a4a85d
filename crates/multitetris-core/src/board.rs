use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::BoardConfig;
use crate::geometry::{Direction, Position};
use crate::replication::SnapshotCell;
use crate::shapes::{BrickColor, BrickShape, random_shape, single_cell_shape};

/// Key of a brick in the board's brick arena.
pub type BrickId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrickState {
    Falling,
    /// Inert scenery. Its cells stay occupied until a row clear vacates them.
    Locked,
    GameOver,
}

/// One grid location and the brick occupying it, if any.
#[derive(Debug, Clone)]
pub struct Cell {
    position: Position,
    occupant: Option<BrickId>,
}

impl Cell {
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn occupant(&self) -> Option<BrickId> {
        self.occupant
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct Brick {
    id: BrickId,
    shape: BrickShape,
    anchor: Position,
    color: BrickColor,
    cells: HashSet<Position>,
    state: BrickState,
}

impl Brick {
    pub fn id(&self) -> BrickId {
        self.id
    }

    pub fn shape(&self) -> BrickShape {
        self.shape
    }

    pub fn anchor(&self) -> Position {
        self.anchor
    }

    pub fn color(&self) -> BrickColor {
        self.color
    }

    pub fn state(&self) -> BrickState {
        self.state
    }

    /// Positions this brick currently occupies.
    pub fn cells(&self) -> impl Iterator<Item = Position> + '_ {
        self.cells.iter().copied()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub(crate) fn set_state(&mut self, state: BrickState) {
        self.state = state;
    }
}

/// Notifications for the rendering side, drained with [`Board::take_events`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardEvent {
    Changed,
    Locked { brick: BrickId },
    RowsCleared { count: u32, score: u64 },
    GameOver { score: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardError {
    /// A row shift found its destination already occupied.
    ShiftCollision { from: Position, to: Position },
    /// Cell and brick bookkeeping disagree.
    Inconsistent(String),
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShiftCollision { from, to } => write!(
                f,
                "shifting ({}, {}) onto occupied cell ({}, {})",
                from.x, from.y, to.x, to.y
            ),
            Self::Inconsistent(detail) => write!(f, "board inconsistent: {detail}"),
        }
    }
}

impl std::error::Error for BoardError {}

/// Points for clearing `rows` rows in a single pass: `rows^rows`.
pub fn combo_score(rows: u32) -> u64 {
    u64::from(rows).saturating_pow(rows)
}

/// A single player's grid.
///
/// Cells live in a flat arena indexed by position and bricks live in a map
/// keyed by [`BrickId`]. A cell names its occupant and a brick lists its
/// positions; both sides are kept in step by `occupy` and `vacate`.
#[derive(Debug)]
pub struct Board {
    rows: i32,
    cols: i32,
    cells: Vec<Cell>,
    bricks: HashMap<BrickId, Brick>,
    next_brick_id: BrickId,
    queue: VecDeque<BrickShape>,
    lookahead: usize,
    current: Option<BrickId>,
    score: u64,
    game_over: bool,
    rng: StdRng,
    events: Vec<BoardEvent>,
}

impl Board {
    /// Dimensions beyond `MAX_BOARD_DIMENSION` are clamped; check
    /// `BoardConfig::is_playable` before building a board from user config.
    pub fn new(config: &BoardConfig) -> Self {
        let (rows, cols) = config.dimensions();
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let cells = (0..rows)
            .flat_map(|y| {
                (0..cols).map(move |x| Cell {
                    position: Position::new(x, y),
                    occupant: None,
                })
            })
            .collect();
        let lookahead = config.lookahead.max(1);
        let queue = (0..lookahead).map(|_| random_shape(&mut rng)).collect();

        Self {
            rows,
            cols,
            cells,
            bricks: HashMap::new(),
            next_brick_id: 1,
            queue,
            lookahead,
            current: None,
            score: 0,
            game_over: false,
            rng,
            events: Vec::new(),
        }
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn score(&self) -> u64 {
        self.score
    }

    /// Overwrite the score. Used for mirrored boards, where the owner's
    /// reported score is authoritative.
    pub fn set_score(&mut self, score: u64) {
        self.score = score;
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// All cells in row-major order.
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn brick(&self, id: BrickId) -> Option<&Brick> {
        self.bricks.get(&id)
    }

    pub fn brick_count(&self) -> usize {
        self.bricks.len()
    }

    pub fn current_brick(&self) -> Option<&Brick> {
        self.current.and_then(|id| self.bricks.get(&id))
    }

    /// Upcoming shapes, front first.
    pub fn next_shapes(&self) -> impl Iterator<Item = &BrickShape> {
        self.queue.iter()
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_occupied()).count()
    }

    /// Drain pending notifications.
    pub fn take_events(&mut self) -> Vec<BoardEvent> {
        std::mem::take(&mut self.events)
    }

    fn index(&self, pos: Position) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.cols || pos.y >= self.rows {
            return None;
        }
        Some((pos.y * self.cols + pos.x) as usize)
    }

    /// The cell at `pos`, or `None` outside the board.
    pub fn cell_at(&self, pos: Position) -> Option<&Cell> {
        self.index(pos).map(|i| &self.cells[i])
    }

    pub fn occupant_at(&self, pos: Position) -> Option<BrickId> {
        self.cell_at(pos).and_then(Cell::occupant)
    }

    pub fn is_row_full(&self, row: i32) -> bool {
        if row < 0 || row >= self.rows || self.cols == 0 {
            return false;
        }
        let start = (row * self.cols) as usize;
        let end = start + self.cols as usize;
        self.cells[start..end].iter().all(Cell::is_occupied)
    }

    /// Scans from the bottom row upward.
    pub fn lowest_full_row(&self) -> Option<i32> {
        (0..self.rows).rev().find(|&row| self.is_row_full(row))
    }

    /// Remove every full row, shifting the rows above each one down.
    ///
    /// Returns the number of rows cleared. Clearing `k` rows in one pass adds
    /// `k^k` to the score. Runs after a lock, while no brick is falling.
    pub fn clear_full_rows(&mut self) -> Result<u32, BoardError> {
        let mut combo = 0u32;
        while let Some(row) = self.lowest_full_row() {
            for x in 0..self.cols {
                self.vacate(Position::new(x, row));
            }
            self.shift_rows_above(row)?;
            combo += 1;
        }
        self.collect_empty_bricks();

        if combo > 0 {
            let gained = combo_score(combo);
            self.score = self.score.saturating_add(gained);
            self.events.push(BoardEvent::RowsCleared {
                count: combo,
                score: self.score,
            });
            tracing::debug!(rows = combo, gained, score = self.score, "Rows cleared");
        }
        Ok(combo)
    }

    /// Move every occupant above `row` down by one, nearest row first.
    fn shift_rows_above(&mut self, row: i32) -> Result<(), BoardError> {
        for y in (0..row).rev() {
            for x in 0..self.cols {
                let from = Position::new(x, y);
                let Some(id) = self.occupant_at(from) else {
                    continue;
                };
                let to = from.next(Direction::Down);
                if self.occupant_at(to).is_some() {
                    return Err(BoardError::ShiftCollision { from, to });
                }
                self.vacate(from);
                self.occupy(to, id);
            }
        }
        Ok(())
    }

    /// Cells targeted by `shape` anchored at `anchor`, one entry per offset.
    /// `None` marks a target outside the board.
    pub fn map_shape_to_cells(
        &self,
        shape: BrickShape,
        anchor: Position,
    ) -> impl Iterator<Item = Option<&Cell>> + '_ {
        shape
            .offsets()
            .iter()
            .map(move |&(dx, dy)| self.cell_at(anchor.offset(dx, dy)))
    }

    /// Every occupied cell with its brick's color, row-major.
    pub fn snapshot_active_cells(&self) -> Vec<SnapshotCell> {
        self.cells
            .iter()
            .filter_map(|cell| {
                let brick = self.bricks.get(&cell.occupant?)?;
                Some(SnapshotCell {
                    x: cell.position.x,
                    y: cell.position.y,
                    color: brick.color,
                })
            })
            .collect()
    }

    /// Overwrite the board with a remote snapshot.
    ///
    /// Listed cells become single-cell scenery in the listed color, every
    /// other cell is vacated. Applying the same snapshot twice yields the
    /// same board.
    pub fn apply_snapshot(&mut self, cells: &[SnapshotCell]) {
        let mut listed: HashMap<Position, BrickColor> = HashMap::with_capacity(cells.len());
        for cell in cells {
            let pos = Position::new(cell.x, cell.y);
            if self.index(pos).is_none() {
                tracing::warn!(x = cell.x, y = cell.y, "Snapshot cell outside board, skipped");
                continue;
            }
            listed.insert(pos, cell.color);
        }

        if let Some(id) = self.current.take()
            && let Some(brick) = self.bricks.get_mut(&id)
        {
            brick.state = BrickState::Locked;
        }

        for cell in &mut self.cells {
            cell.occupant = None;
        }
        self.bricks.clear();

        for (pos, color) in listed {
            let id = self.insert_brick(single_cell_shape(), pos, color, BrickState::Locked);
            self.occupy(pos, id);
        }
        self.events.push(BoardEvent::Changed);
    }

    /// Verify that cell occupants and brick cell-sets agree in both directions.
    pub fn check_consistency(&self) -> Result<(), BoardError> {
        for cell in &self.cells {
            if let Some(id) = cell.occupant {
                let brick = self.bricks.get(&id).ok_or_else(|| {
                    BoardError::Inconsistent(format!(
                        "cell ({}, {}) names missing brick {id}",
                        cell.position.x, cell.position.y
                    ))
                })?;
                if !brick.cells.contains(&cell.position) {
                    return Err(BoardError::Inconsistent(format!(
                        "brick {id} does not list cell ({}, {})",
                        cell.position.x, cell.position.y
                    )));
                }
            }
        }
        for (id, brick) in &self.bricks {
            for pos in &brick.cells {
                if self.occupant_at(*pos) != Some(*id) {
                    return Err(BoardError::Inconsistent(format!(
                        "brick {id} claims ({}, {}) held by {:?}",
                        pos.x,
                        pos.y,
                        self.occupant_at(*pos)
                    )));
                }
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Arena bookkeeping shared with the controller.
    // ------------------------------------------------------------------

    pub(crate) fn current_id(&self) -> Option<BrickId> {
        self.current
    }

    pub(crate) fn set_current(&mut self, id: Option<BrickId>) {
        self.current = id;
    }

    pub(crate) fn brick_mut(&mut self, id: BrickId) -> Option<&mut Brick> {
        self.bricks.get_mut(&id)
    }

    pub(crate) fn push_event(&mut self, event: BoardEvent) {
        self.events.push(event);
    }

    pub(crate) fn mark_game_over(&mut self) {
        self.game_over = true;
    }

    pub(crate) fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Pop the front of the queue and refill it to the lookahead length.
    pub(crate) fn pop_next_shape(&mut self) -> BrickShape {
        let shape = self
            .queue
            .pop_front()
            .unwrap_or_else(|| random_shape(&mut self.rng));
        while self.queue.len() < self.lookahead {
            let next = random_shape(&mut self.rng);
            self.queue.push_back(next);
        }
        shape
    }

    pub(crate) fn insert_brick(
        &mut self,
        shape: BrickShape,
        anchor: Position,
        color: BrickColor,
        state: BrickState,
    ) -> BrickId {
        let id = self.next_brick_id;
        self.next_brick_id += 1;
        self.bricks.insert(
            id,
            Brick {
                id,
                shape,
                anchor,
                color,
                cells: HashSet::new(),
                state,
            },
        );
        id
    }

    pub(crate) fn occupy(&mut self, pos: Position, id: BrickId) {
        if let Some(i) = self.index(pos) {
            self.cells[i].occupant = Some(id);
            if let Some(brick) = self.bricks.get_mut(&id) {
                brick.cells.insert(pos);
            }
        }
    }

    pub(crate) fn vacate(&mut self, pos: Position) -> Option<BrickId> {
        let i = self.index(pos)?;
        let id = self.cells[i].occupant.take()?;
        if let Some(brick) = self.bricks.get_mut(&id) {
            brick.cells.remove(&pos);
        }
        Some(id)
    }

    /// Move a brick onto `targets`, vacating cells it no longer covers.
    pub(crate) fn relocate(
        &mut self,
        id: BrickId,
        targets: &[Position],
        anchor: Position,
        shape: BrickShape,
    ) {
        let Some(brick) = self.bricks.get(&id) else {
            return;
        };
        let stale: Vec<Position> = brick
            .cells
            .iter()
            .filter(|pos| !targets.contains(pos))
            .copied()
            .collect();
        for pos in stale {
            self.vacate(pos);
        }
        for &pos in targets {
            self.occupy(pos, id);
        }
        if let Some(brick) = self.bricks.get_mut(&id) {
            brick.anchor = anchor;
            brick.shape = shape;
        }
    }

    /// Drop bricks whose last cell has been cleared.
    fn collect_empty_bricks(&mut self) {
        let current = self.current;
        self.bricks
            .retain(|id, brick| !brick.cells.is_empty() || Some(*id) == current);
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.cols.max(1) as usize) {
            write!(f, "|")?;
            for cell in row {
                let glyph = match cell.occupant {
                    Some(id) if Some(id) == self.current => '@',
                    Some(_) => '#',
                    None => '.',
                };
                write!(f, "{glyph}")?;
            }
            writeln!(f, "|")?;
        }
        write!(f, "score: {}", self.score)?;
        if self.game_over {
            write!(f, " (game over)")?;
        }
        Ok(())
    }
}
