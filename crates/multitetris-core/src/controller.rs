//! Falling-brick movement: validation, move, rotate, lock, and spawn.

use crate::board::{Board, BoardEvent, BrickId, BrickState};
use crate::geometry::{Direction, Position};
use crate::shapes::{BrickShape, random_color};

/// Outcome of checking a set of target positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    Accepted,
    RejectedOutOfBounds,
    RejectedCollision,
}

impl Validation {
    pub fn is_accepted(self) -> bool {
        self == Validation::Accepted
    }
}

/// Result of a move or rotate request against the falling brick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    Moved,
    /// The request was refused and nothing changed.
    Rejected(Validation),
    /// The brick came to rest, rows were cleared, and the next brick spawned.
    Locked { rows_cleared: u32 },
    GameOver,
    /// No brick is falling, either before the first spawn or after game over.
    Inactive,
}

impl Board {
    /// Check `targets` against bounds and occupancy. Occupants listed in
    /// `ignore` do not count as collisions. Out of bounds wins over collision.
    pub fn validate<I>(&self, targets: I, ignore: &[BrickId]) -> Validation
    where
        I: IntoIterator<Item = Position>,
    {
        let mut collided = false;
        for pos in targets {
            match self.cell_at(pos) {
                None => return Validation::RejectedOutOfBounds,
                Some(cell) => {
                    if let Some(occupant) = cell.occupant()
                        && !ignore.contains(&occupant)
                    {
                        collided = true;
                    }
                },
            }
        }
        if collided {
            Validation::RejectedCollision
        } else {
            Validation::Accepted
        }
    }

    /// Spawn the first brick. Does nothing once a brick is falling or the game
    /// has ended.
    pub fn start(&mut self) -> bool {
        if self.is_game_over() {
            return false;
        }
        if self.current_id().is_some() {
            return true;
        }
        self.spawn_next()
    }

    /// Gravity step.
    pub fn tick(&mut self) -> MoveOutcome {
        self.move_brick(Direction::Down)
    }

    /// Move the falling brick one step.
    ///
    /// A blocked downward move locks the brick, or ends the game when the
    /// brick never left row 0. Blocked sideways moves change nothing.
    pub fn move_brick(&mut self, direction: Direction) -> MoveOutcome {
        let Some(id) = self.current_id() else {
            return MoveOutcome::Inactive;
        };
        let Some(brick) = self.brick(id) else {
            return MoveOutcome::Inactive;
        };
        let anchor = brick.anchor();
        let shape = brick.shape();
        let targets: Vec<Position> = brick.cells().map(|p| p.next(direction)).collect();

        let validation = self.validate(targets.iter().copied(), &[id]);
        if validation.is_accepted() {
            self.relocate(id, &targets, anchor.next(direction), shape);
            self.push_event(BoardEvent::Changed);
            return MoveOutcome::Moved;
        }

        if direction != Direction::Down {
            return MoveOutcome::Rejected(validation);
        }

        if anchor.y == 0 {
            self.end_game();
            return MoveOutcome::GameOver;
        }

        self.lock_current(id)
    }

    /// Rotate the falling brick in place.
    ///
    /// The brick's own cells never block its rotation. A refused rotation
    /// leaves the shape and the cells unchanged.
    pub fn rotate_brick(&mut self) -> MoveOutcome {
        let Some(id) = self.current_id() else {
            return MoveOutcome::Inactive;
        };
        let Some(brick) = self.brick(id) else {
            return MoveOutcome::Inactive;
        };
        let anchor = brick.anchor();
        let rotated = brick.shape().rotated();

        let mut targets = Vec::with_capacity(rotated.offsets().len());
        for cell in self.map_shape_to_cells(rotated, anchor) {
            match cell {
                Some(cell) => targets.push(cell.position()),
                None => return MoveOutcome::Rejected(Validation::RejectedOutOfBounds),
            }
        }

        let validation = self.validate(targets.iter().copied(), &[id]);
        if !validation.is_accepted() {
            return MoveOutcome::Rejected(validation);
        }
        self.relocate(id, &targets, anchor, rotated);
        self.push_event(BoardEvent::Changed);
        MoveOutcome::Moved
    }

    /// Place `shape` at the spawn point `(cols / 2, 0)`.
    ///
    /// A brick still falling is locked where it is first. If the spawn
    /// footprint is blocked the board ends instead and nothing is placed.
    pub fn spawn_brick(&mut self, shape: BrickShape) -> bool {
        if self.is_game_over() {
            return false;
        }
        if let Some(previous) = self.current_id()
            && let Some(brick) = self.brick_mut(previous)
        {
            brick.set_state(BrickState::Locked);
        }
        self.set_current(None);

        let anchor = Position::new(self.cols() / 2, 0);
        let targets: Vec<Position> = shape
            .offsets()
            .iter()
            .map(|&(dx, dy)| anchor.offset(dx, dy))
            .collect();
        if !self.validate(targets.iter().copied(), &[]).is_accepted() {
            tracing::debug!(shape = shape.name(), "Spawn blocked");
            self.end_game();
            return false;
        }

        let color = random_color(self.rng_mut());
        let id = self.insert_brick(shape, anchor, color, BrickState::Falling);
        for pos in targets {
            self.occupy(pos, id);
        }
        self.set_current(Some(id));
        self.push_event(BoardEvent::Changed);
        true
    }

    fn spawn_next(&mut self) -> bool {
        let shape = self.pop_next_shape();
        self.spawn_brick(shape)
    }

    fn lock_current(&mut self, id: BrickId) -> MoveOutcome {
        if let Some(brick) = self.brick_mut(id) {
            brick.set_state(BrickState::Locked);
        }
        self.set_current(None);
        self.push_event(BoardEvent::Locked { brick: id });

        let rows_cleared = match self.clear_full_rows() {
            Ok(n) => n,
            Err(e) => {
                tracing::error!(error = %e, "Row clear failed, ending game");
                self.end_game();
                return MoveOutcome::GameOver;
            },
        };

        if !self.spawn_next() {
            return MoveOutcome::GameOver;
        }
        MoveOutcome::Locked { rows_cleared }
    }

    fn end_game(&mut self) {
        if let Some(id) = self.current_id()
            && let Some(brick) = self.brick_mut(id)
        {
            brick.set_state(BrickState::GameOver);
        }
        self.set_current(None);
        if !self.is_game_over() {
            self.mark_game_over();
            let score = self.score();
            self.push_event(BoardEvent::GameOver { score });
            tracing::info!(score, "Game over");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BoardConfig;
    use crate::shapes::{BrickShape, I_SHAPE, O_SHAPE, T_SHAPE};
    use crate::test_helpers::{fill_cells, fill_row_except, seeded_config};

    fn board() -> Board {
        Board::new(&seeded_config(42))
    }

    fn current_cells(b: &Board) -> Vec<Position> {
        let mut cells: Vec<Position> = b.current_brick().unwrap().cells().collect();
        cells.sort();
        cells
    }

    fn drop_to_rest(b: &mut Board) -> MoveOutcome {
        loop {
            match b.move_brick(Direction::Down) {
                MoveOutcome::Moved => continue,
                other => return other,
            }
        }
    }

    #[test]
    fn validate_reports_bounds_before_collision() {
        let mut b = board();
        fill_cells(&mut b, &[(0, 0)]);
        let occupied = [Position::new(0, 0)];
        assert_eq!(
            b.validate(occupied, &[]),
            Validation::RejectedCollision
        );
        assert_eq!(
            b.validate([Position::new(0, 0), Position::new(-1, 0)], &[]),
            Validation::RejectedOutOfBounds
        );
        let id = b.occupant_at(Position::new(0, 0)).unwrap();
        assert_eq!(b.validate(occupied, &[id]), Validation::Accepted);
    }

    #[test]
    fn spawn_places_brick_at_top_center() {
        let mut b = board();
        assert!(b.spawn_brick(BrickShape::new(&O_SHAPE)));
        let brick = b.current_brick().unwrap();
        assert_eq!(brick.anchor(), Position::new(5, 0));
        assert_eq!(brick.state(), BrickState::Falling);
        assert_eq!(
            current_cells(&b),
            vec![
                Position::new(5, 0),
                Position::new(6, 0),
                Position::new(5, 1),
                Position::new(6, 1)
            ]
        );
        b.check_consistency().unwrap();
    }

    #[test]
    fn start_pops_queue_and_refills() {
        let mut b = board();
        let front = *b.next_shapes().next().unwrap();
        assert!(b.start());
        assert_eq!(b.current_brick().unwrap().shape(), front);
        assert_eq!(b.next_shapes().count(), 2);
        // Starting again is a no-op.
        let id = b.current_brick().unwrap().id();
        assert!(b.start());
        assert_eq!(b.current_brick().unwrap().id(), id);
    }

    #[test]
    fn sideways_moves_stop_at_walls() {
        let mut b = board();
        b.spawn_brick(BrickShape::new(&O_SHAPE));
        for _ in 0..4 {
            assert_eq!(b.move_brick(Direction::Right), MoveOutcome::Moved);
        }
        assert_eq!(
            b.move_brick(Direction::Right),
            MoveOutcome::Rejected(Validation::RejectedOutOfBounds)
        );
        assert_eq!(b.current_brick().unwrap().anchor(), Position::new(8, 0));
        b.check_consistency().unwrap();
    }

    #[test]
    fn sideways_move_blocked_by_scenery() {
        let mut b = board();
        fill_cells(&mut b, &[(4, 1)]);
        b.spawn_brick(BrickShape::new(&O_SHAPE));
        let before = current_cells(&b);
        assert_eq!(
            b.move_brick(Direction::Left),
            MoveOutcome::Rejected(Validation::RejectedCollision)
        );
        assert_eq!(current_cells(&b), before);
    }

    #[test]
    fn move_down_vacates_old_cells() {
        let mut b = board();
        b.spawn_brick(BrickShape::new(&O_SHAPE));
        assert_eq!(b.tick(), MoveOutcome::Moved);
        assert!(b.occupant_at(Position::new(5, 0)).is_none());
        assert!(b.occupant_at(Position::new(5, 2)).is_some());
        assert_eq!(b.occupied_count(), 4);
        b.check_consistency().unwrap();
    }

    #[test]
    fn blocked_down_locks_and_spawns_next() {
        let mut b = board();
        b.spawn_brick(BrickShape::new(&O_SHAPE));
        let first = b.current_brick().unwrap().id();
        assert_eq!(
            drop_to_rest(&mut b),
            MoveOutcome::Locked { rows_cleared: 0 }
        );
        assert_eq!(b.brick(first).unwrap().state(), BrickState::Locked);
        assert!(b.occupant_at(Position::new(5, 19)).is_some());
        let next = b.current_brick().unwrap();
        assert_ne!(next.id(), first);
        assert_eq!(next.anchor().y, 0);
        assert_eq!(b.next_shapes().count(), 2);
        b.check_consistency().unwrap();
    }

    #[test]
    fn horizontal_i_completes_bottom_row() {
        let mut b = board();
        // Spawned I covers columns 4..=7.
        fill_row_except(&mut b, 19, &[4, 5, 6, 7]);
        fill_cells(&mut b, &[(0, 18)]);
        b.spawn_brick(BrickShape::new(&I_SHAPE));

        assert_eq!(
            drop_to_rest(&mut b),
            MoveOutcome::Locked { rows_cleared: 1 }
        );
        assert_eq!(b.score(), 1);
        assert!(b.lowest_full_row().is_none());
        // The block that sat on row 18 shifted onto the bottom row.
        assert!(b.occupant_at(Position::new(0, 19)).is_some());
        assert!(b.occupant_at(Position::new(1, 19)).is_none());
        let events = b.take_events();
        assert!(events.contains(&BoardEvent::RowsCleared { count: 1, score: 1 }));
        b.check_consistency().unwrap();
    }

    #[test]
    fn stuck_on_row_zero_is_game_over() {
        let mut b = board();
        fill_cells(&mut b, &[(5, 2)]);
        b.spawn_brick(BrickShape::new(&O_SHAPE));
        assert_eq!(b.tick(), MoveOutcome::GameOver);
        assert!(b.is_game_over());
        assert!(b.current_brick().is_none());
        assert!(
            b.take_events()
                .iter()
                .any(|e| matches!(e, BoardEvent::GameOver { .. }))
        );
        // Further input is ignored.
        assert_eq!(b.move_brick(Direction::Left), MoveOutcome::Inactive);
        assert_eq!(b.rotate_brick(), MoveOutcome::Inactive);
        assert!(!b.start());
    }

    #[test]
    fn blocked_spawn_ends_game_without_overwriting() {
        let mut b = board();
        fill_cells(&mut b, &[(5, 0)]);
        let scenery = b.occupant_at(Position::new(5, 0));
        assert!(!b.spawn_brick(BrickShape::new(&O_SHAPE)));
        assert!(b.is_game_over());
        assert_eq!(b.occupant_at(Position::new(5, 0)), scenery);
        assert_eq!(b.occupied_count(), 1);
    }

    #[test]
    fn rotation_changes_footprint() {
        let mut b = board();
        b.spawn_brick(BrickShape::new(&I_SHAPE));
        assert_eq!(b.rotate_brick(), MoveOutcome::Moved);
        assert_eq!(
            current_cells(&b),
            vec![
                Position::new(5, 0),
                Position::new(5, 1),
                Position::new(5, 2),
                Position::new(5, 3)
            ]
        );
        assert_eq!(b.current_brick().unwrap().shape().rotation(), 1);
        b.check_consistency().unwrap();
    }

    #[test]
    fn rotation_out_of_bounds_is_noop() {
        let mut b = Board::new(&BoardConfig {
            rows: 3,
            ..seeded_config(1)
        });
        b.spawn_brick(BrickShape::new(&I_SHAPE));
        let before = current_cells(&b);
        assert_eq!(
            b.rotate_brick(),
            MoveOutcome::Rejected(Validation::RejectedOutOfBounds)
        );
        assert_eq!(current_cells(&b), before);
        assert_eq!(b.current_brick().unwrap().shape().rotation(), 0);
    }

    #[test]
    fn rotation_collision_is_noop() {
        let mut b = board();
        fill_cells(&mut b, &[(5, 2)]);
        b.spawn_brick(BrickShape::new(&T_SHAPE));
        let before = current_cells(&b);
        assert_eq!(
            b.rotate_brick(),
            MoveOutcome::Rejected(Validation::RejectedCollision)
        );
        assert_eq!(current_cells(&b), before);
    }

    #[test]
    fn rotation_may_overlap_own_cells() {
        let mut b = board();
        b.spawn_brick(BrickShape::new(&T_SHAPE));
        b.tick();
        for _ in 0..4 {
            assert_eq!(b.rotate_brick(), MoveOutcome::Moved);
        }
        assert_eq!(b.current_brick().unwrap().shape().rotation(), 0);
        assert_eq!(b.occupied_count(), 4);
    }

    #[test]
    fn seeded_boards_play_identically() {
        let mut a = board();
        let mut b = board();
        a.start();
        b.start();
        let inputs = [
            Direction::Left,
            Direction::Down,
            Direction::Right,
            Direction::Right,
            Direction::Down,
        ];
        for _ in 0..200 {
            for dir in inputs {
                assert_eq!(a.move_brick(dir), b.move_brick(dir));
            }
            assert_eq!(a.rotate_brick(), b.rotate_brick());
        }
        assert_eq!(a.snapshot_active_cells(), b.snapshot_active_cells());
        assert_eq!(a.score(), b.score());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone, Copy)]
        enum Input {
            Move(Direction),
            Rotate,
        }

        fn input_strategy() -> impl Strategy<Value = Input> {
            prop_oneof![
                Just(Input::Move(Direction::Left)),
                Just(Input::Move(Direction::Right)),
                Just(Input::Move(Direction::Down)),
                Just(Input::Rotate),
            ]
        }

        proptest! {
            #[test]
            fn moves_never_leave_bounds_or_overlap(
                seed in 0u64..1000,
                inputs in proptest::collection::vec(input_strategy(), 1..400),
            ) {
                let mut b = Board::new(&seeded_config(seed));
                b.start();
                for input in inputs {
                    let before = b.snapshot_active_cells();
                    let outcome = match input {
                        Input::Move(dir) => b.move_brick(dir),
                        Input::Rotate => b.rotate_brick(),
                    };
                    if let MoveOutcome::Rejected(_) = outcome {
                        prop_assert_eq!(&before, &b.snapshot_active_cells());
                    }
                    b.check_consistency().unwrap();
                    if let Some(brick) = b.current_brick() {
                        prop_assert_eq!(brick.cell_count(), 4);
                        for pos in brick.cells() {
                            prop_assert!(b.cell_at(pos).is_some());
                            prop_assert_eq!(b.occupant_at(pos), Some(brick.id()));
                        }
                    }
                    if let MoveOutcome::Locked { .. } = outcome {
                        prop_assert!(!b.is_row_full(b.rows() - 1));
                    }
                }
            }
        }
    }
}
