use rand::Rng;
use serde::{Deserialize, Serialize};

/// A cell offset `(dx, dy)` from a brick's anchor.
pub type Offset = (i32, i32);

/// Immutable rotation table for one kind of brick.
///
/// Every offset has `dy >= 0`, so a brick anchored on row 0 never pokes
/// above the board.
#[derive(Debug, PartialEq, Eq)]
pub struct ShapeTemplate {
    pub name: &'static str,
    pub rotations: &'static [&'static [Offset]],
}

pub static I_SHAPE: ShapeTemplate = ShapeTemplate {
    name: "I",
    rotations: &[
        &[(-1, 0), (0, 0), (1, 0), (2, 0)],
        &[(0, 0), (0, 1), (0, 2), (0, 3)],
    ],
};

pub static O_SHAPE: ShapeTemplate = ShapeTemplate {
    name: "O",
    rotations: &[&[(0, 0), (1, 0), (0, 1), (1, 1)]],
};

pub static T_SHAPE: ShapeTemplate = ShapeTemplate {
    name: "T",
    rotations: &[
        &[(-1, 0), (0, 0), (1, 0), (0, 1)],
        &[(0, 0), (0, 1), (1, 1), (0, 2)],
        &[(0, 0), (-1, 1), (0, 1), (1, 1)],
        &[(0, 0), (-1, 1), (0, 1), (0, 2)],
    ],
};

pub static S_SHAPE: ShapeTemplate = ShapeTemplate {
    name: "S",
    rotations: &[
        &[(0, 0), (1, 0), (-1, 1), (0, 1)],
        &[(0, 0), (0, 1), (1, 1), (1, 2)],
    ],
};

pub static Z_SHAPE: ShapeTemplate = ShapeTemplate {
    name: "Z",
    rotations: &[
        &[(-1, 0), (0, 0), (0, 1), (1, 1)],
        &[(1, 0), (0, 1), (1, 1), (0, 2)],
    ],
};

pub static J_SHAPE: ShapeTemplate = ShapeTemplate {
    name: "J",
    rotations: &[
        &[(-1, 0), (0, 0), (1, 0), (1, 1)],
        &[(0, 0), (0, 1), (-1, 2), (0, 2)],
        &[(-1, 0), (-1, 1), (0, 1), (1, 1)],
        &[(0, 0), (1, 0), (0, 1), (0, 2)],
    ],
};

pub static L_SHAPE: ShapeTemplate = ShapeTemplate {
    name: "L",
    rotations: &[
        &[(-1, 0), (0, 0), (1, 0), (-1, 1)],
        &[(-1, 0), (0, 0), (0, 1), (0, 2)],
        &[(1, 0), (-1, 1), (0, 1), (1, 1)],
        &[(0, 0), (0, 1), (0, 2), (1, 2)],
    ],
};

/// Scenery cell rebuilt from a network snapshot.
pub static SINGLE_CELL: ShapeTemplate = ShapeTemplate {
    name: "cell",
    rotations: &[&[(0, 0)]],
};

/// The seven shapes a falling brick is drawn from.
pub static TETROMINOES: [&ShapeTemplate; 7] = [
    &I_SHAPE, &O_SHAPE, &T_SHAPE, &S_SHAPE, &Z_SHAPE, &J_SHAPE, &L_SHAPE,
];

/// A template plus the rotation state currently in use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrickShape {
    template: &'static ShapeTemplate,
    rotation: usize,
}

impl BrickShape {
    pub const fn new(template: &'static ShapeTemplate) -> Self {
        Self {
            template,
            rotation: 0,
        }
    }

    pub fn template(&self) -> &'static ShapeTemplate {
        self.template
    }

    pub fn name(&self) -> &'static str {
        self.template.name
    }

    pub fn rotation(&self) -> usize {
        self.rotation
    }

    /// Offsets of the current rotation state.
    pub fn offsets(&self) -> &'static [Offset] {
        self.template.rotations[self.rotation]
    }

    /// Advance to the next rotation state, wrapping around.
    pub fn rotate(&mut self) {
        self.rotation = (self.rotation + 1) % self.template.rotations.len();
    }

    /// A rotated copy; `self` is left untouched.
    pub fn rotated(&self) -> Self {
        let mut next = *self;
        next.rotate();
        next
    }
}

/// Uniformly pick one of the seven tetrominoes.
pub fn random_shape<R: Rng + ?Sized>(rng: &mut R) -> BrickShape {
    let template = TETROMINOES[rng.random_range(0..TETROMINOES.len())];
    BrickShape::new(template)
}

pub fn single_cell_shape() -> BrickShape {
    BrickShape::new(&SINGLE_CELL)
}

/// RGBA brick color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BrickColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Default for BrickColor {
    fn default() -> Self {
        Self::PALETTE[0]
    }
}

impl BrickColor {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Colors handed out to freshly spawned bricks.
    pub const PALETTE: &[BrickColor] = &[
        BrickColor::rgb(0, 240, 240),  // Cyan
        BrickColor::rgb(240, 240, 0),  // Yellow
        BrickColor::rgb(160, 0, 240),  // Purple
        BrickColor::rgb(0, 240, 0),    // Green
        BrickColor::rgb(240, 0, 0),    // Red
        BrickColor::rgb(0, 0, 240),    // Blue
        BrickColor::rgb(240, 160, 0),  // Orange
    ];
}

pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> BrickColor {
    BrickColor::PALETTE[rng.random_range(0..BrickColor::PALETTE.len())]
}
