//! Playfield grid and the collision validator.

use crate::piece::Piece;

pub const BOARD_WIDTH: usize = 10;
pub const BOARD_HEIGHT: usize = 20;

const BOARD_SIZE: usize = BOARD_WIDTH * BOARD_HEIGHT;

/// Fixed 10x20 grid of colour ids. y=0 is the top row; 0 means empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    /// Row-major: `cells[y * BOARD_WIDTH + x]`.
    cells: [u8; BOARD_SIZE],
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: [0; BOARD_SIZE],
        }
    }

    #[inline]
    fn index(x: usize, y: usize) -> usize {
        y * BOARD_WIDTH + x
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Option<u8> {
        if x >= BOARD_WIDTH || y >= BOARD_HEIGHT {
            return None;
        }
        Some(self.cells[Self::index(x, y)])
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, id: u8) {
        if x < BOARD_WIDTH && y < BOARD_HEIGHT {
            self.cells[Self::index(x, y)] = id;
        }
    }

    #[inline]
    pub fn is_occupied(&self, x: usize, y: usize) -> bool {
        self.get(x, y).is_some_and(|id| id != 0)
    }

    pub fn row(&self, y: usize) -> &[u8] {
        let start = Self::index(0, y);
        &self.cells[start..start + BOARD_WIDTH]
    }

    /// True if every occupied cell of `piece`, displaced by `(dx, dy)`, lies in
    /// `[0, W)` horizontally, above the floor, and (when at y >= 0) on an empty cell.
    /// Cells above the top edge are allowed.
    pub fn can_place_at(&self, piece: &Piece, dx: i32, dy: i32) -> bool {
        piece.cells_at(dx, dy).all(|(x, y)| {
            if x < 0 || x >= BOARD_WIDTH as i32 || y >= BOARD_HEIGHT as i32 {
                return false;
            }
            y < 0 || !self.is_occupied(x as usize, y as usize)
        })
    }

    pub fn can_place(&self, piece: &Piece) -> bool {
        self.can_place_at(piece, 0, 0)
    }

    /// Lock the piece's cells into the grid. Cells above the top edge are dropped.
    pub fn merge(&mut self, piece: &Piece) {
        let id = piece.kind.id();
        for (x, y) in piece.cells() {
            if x >= 0 && y >= 0 {
                self.set(x as usize, y as usize, id);
            }
        }
    }

    pub fn is_row_full(&self, y: usize) -> bool {
        y < BOARD_HEIGHT && self.row(y).iter().all(|&id| id != 0)
    }

    /// Indices of full rows, scanned bottom to top.
    pub fn full_rows(&self) -> Vec<usize> {
        (0..BOARD_HEIGHT).rev().filter(|&y| self.is_row_full(y)).collect()
    }

    /// Remove the given rows and compact everything above them downward,
    /// zero-filling the vacated top rows. Returns the number of rows removed.
    pub fn collapse_rows(&mut self, rows: &[usize]) -> usize {
        let removed = rows.iter().filter(|&&y| y < BOARD_HEIGHT).count();
        if removed == 0 {
            return 0;
        }
        let mut write = BOARD_HEIGHT;
        for read in (0..BOARD_HEIGHT).rev() {
            if rows.contains(&read) {
                continue;
            }
            write -= 1;
            if write != read {
                let src = Self::index(0, read);
                self.cells
                    .copy_within(src..src + BOARD_WIDTH, Self::index(0, write));
            }
        }
        for cell in &mut self.cells[..Self::index(0, write)] {
            *cell = 0;
        }
        BOARD_HEIGHT - write
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|&&id| id != 0).count()
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
