use serde::{Deserialize, Serialize};

/// A grid coordinate. `y` grows downward; row 0 is the top of the board.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Position displaced by a raw `(dx, dy)` offset.
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// The neighbouring position one step in `direction`.
    pub const fn next(self, direction: Direction) -> Self {
        let (dx, dy) = direction.delta();
        self.offset(dx, dy)
    }
}

/// Movement directions. `Up` exists for completeness; gameplay never moves a brick up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn down_increases_row() {
        let p = Position::new(3, 4);
        assert_eq!(p.next(Direction::Down), Position::new(3, 5));
        assert_eq!(p.next(Direction::Up), Position::new(3, 3));
        assert_eq!(p.next(Direction::Left), Position::new(2, 4));
        assert_eq!(p.next(Direction::Right), Position::new(4, 4));
    }

    #[test]
    fn opposite_directions_cancel() {
        for dir in [
            Direction::Up,
            Direction::Down,
            Direction::Left,
            Direction::Right,
        ] {
            let (dx, dy) = dir.delta();
            assert_eq!(dx.abs() + dy.abs(), 1, "{dir:?} must be a unit step");
        }
        let p = Position::new(5, 5);
        assert_eq!(p.next(Direction::Left).next(Direction::Right), p);
        assert_eq!(p.next(Direction::Up).next(Direction::Down), p);
    }
}
