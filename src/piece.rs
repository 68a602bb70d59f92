//! Tetromino families, their rotation-state shape tables, and the falling piece.

use crate::board::BOARD_WIDTH;

/// Tetromino families. Discriminants are the colour ids stored in the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tetromino {
    I = 1,
    J = 2,
    L = 3,
    O = 4,
    S = 5,
    T = 6,
    Z = 7,
}

/// One rotation state: rows of cells, 0 = empty, otherwise the family id.
#[derive(Debug, PartialEq, Eq)]
pub struct Shape {
    rows: &'static [&'static [u8]],
}

impl Shape {
    const fn new(rows: &'static [&'static [u8]]) -> Self {
        Self { rows }
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |row| row.len())
    }

    /// Offsets `(dx, dy)` of the occupied cells, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.rows.iter().enumerate().flat_map(|(dy, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, v)| **v != 0)
                .map(move |(dx, _)| (dx as i32, dy as i32))
        })
    }
}

static I_STATES: [Shape; 2] = [
    Shape::new(&[&[0, 0, 0, 0], &[1, 1, 1, 1], &[0, 0, 0, 0], &[0, 0, 0, 0]]),
    Shape::new(&[&[0, 0, 1, 0], &[0, 0, 1, 0], &[0, 0, 1, 0], &[0, 0, 1, 0]]),
];

static J_STATES: [Shape; 4] = [
    Shape::new(&[&[2, 0, 0], &[2, 2, 2], &[0, 0, 0]]),
    Shape::new(&[&[0, 2, 2], &[0, 2, 0], &[0, 2, 0]]),
    Shape::new(&[&[0, 0, 0], &[2, 2, 2], &[0, 0, 2]]),
    Shape::new(&[&[0, 2, 0], &[0, 2, 0], &[2, 2, 0]]),
];

static L_STATES: [Shape; 4] = [
    Shape::new(&[&[0, 0, 3], &[3, 3, 3], &[0, 0, 0]]),
    Shape::new(&[&[0, 3, 0], &[0, 3, 0], &[0, 3, 3]]),
    Shape::new(&[&[0, 0, 0], &[3, 3, 3], &[3, 0, 0]]),
    Shape::new(&[&[3, 3, 0], &[0, 3, 0], &[0, 3, 0]]),
];

static O_STATES: [Shape; 1] = [Shape::new(&[&[4, 4], &[4, 4]])];

static S_STATES: [Shape; 2] = [
    Shape::new(&[&[0, 5, 5], &[5, 5, 0], &[0, 0, 0]]),
    Shape::new(&[&[0, 5, 0], &[0, 5, 5], &[0, 0, 5]]),
];

static T_STATES: [Shape; 4] = [
    Shape::new(&[&[0, 6, 0], &[6, 6, 6], &[0, 0, 0]]),
    Shape::new(&[&[0, 6, 0], &[0, 6, 6], &[0, 6, 0]]),
    Shape::new(&[&[0, 0, 0], &[6, 6, 6], &[0, 6, 0]]),
    Shape::new(&[&[0, 6, 0], &[6, 6, 0], &[0, 6, 0]]),
];

static Z_STATES: [Shape; 2] = [
    Shape::new(&[&[7, 7, 0], &[0, 7, 7], &[0, 0, 0]]),
    Shape::new(&[&[0, 0, 7], &[0, 7, 7], &[0, 7, 0]]),
];

impl Tetromino {
    pub const ALL: [Self; 7] = [Self::I, Self::J, Self::L, Self::O, Self::S, Self::T, Self::Z];

    /// Family for a random draw in `0..7`.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % Self::ALL.len()]
    }

    /// Grid colour id, 1..=7.
    pub fn id(self) -> u8 {
        self as u8
    }

    /// Rotation states in clockwise order; state 0 is the spawn orientation.
    pub fn states(self) -> &'static [Shape] {
        match self {
            Self::I => &I_STATES,
            Self::J => &J_STATES,
            Self::L => &L_STATES,
            Self::O => &O_STATES,
            Self::S => &S_STATES,
            Self::T => &T_STATES,
            Self::Z => &Z_STATES,
        }
    }
}

/// Falling piece: family, grid anchor of the shape's top-left, rotation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub kind: Tetromino,
    pub x: i32,
    pub y: i32,
    pub rotation: usize,
}

impl Piece {
    /// New piece in its spawn orientation, centred at the top of the grid.
    pub fn spawn(kind: Tetromino) -> Self {
        let width = kind.states()[0].width() as i32;
        Self {
            kind,
            x: BOARD_WIDTH as i32 / 2 - width / 2,
            y: 0,
            rotation: 0,
        }
    }

    pub fn shape(&self) -> &'static Shape {
        let states = self.kind.states();
        &states[self.rotation % states.len()]
    }

    /// Rotation index after one clockwise step (O stays at 0).
    pub fn next_rotation(&self) -> usize {
        (self.rotation + 1) % self.kind.states().len()
    }

    /// Absolute grid coordinates of the occupied cells, displaced by `(dx, dy)`.
    pub fn cells_at(&self, dx: i32, dy: i32) -> impl Iterator<Item = (i32, i32)> + '_ {
        let (ox, oy) = (self.x + dx, self.y + dy);
        self.shape().cells().map(move |(cx, cy)| (ox + cx, oy + cy))
    }

    pub fn cells(&self) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.cells_at(0, 0)
    }
}
