//! Game state: grid, current/next piece, gravity, line clear, score and level.

use crate::GameConfig;
use crate::board::Board;
use crate::piece::{Piece, Tetromino};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

/// How long full rows flash before they are removed.
pub const FLASH_DURATION: Duration = Duration::from_millis(500);

/// Repeat interval of the held soft-drop key.
pub const SOFT_DROP_INTERVAL: Duration = Duration::from_millis(100);

/// Largest slice of time advanced at once; longer frames are split into slices this size.
pub const MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

/// Most time one `step` will catch up on (e.g. after the process was suspended).
pub const MAX_CATCH_UP: Duration = Duration::from_secs(1);

const BASE_DROP_INTERVAL_MS: u64 = 1000;
const MIN_DROP_INTERVAL_MS: u64 = 100;
const DROP_INTERVAL_STEP_MS: u64 = 100;
const LINES_PER_LEVEL: u32 = 10;

/// Shake lengths in seconds.
const CLEAR_SHAKE_SECS: f64 = 0.3;
const GAME_OVER_SHAKE_SECS: f64 = 1.0;

/// Rotation fallback order: in place, left, right, up.
const ROTATION_PROBES: [(i32, i32); 4] = [(0, 0), (-1, 0), (1, 0), (0, -1)];

/// Points for clearing `lines` rows at once on `level`.
pub fn line_clear_score(lines: usize, level: u32) -> u32 {
    let base = match lines {
        1 => 100,
        2 => 300,
        3 => 500,
        4 => 800,
        _ => 0,
    };
    base * level
}

pub fn level_for_lines(lines: u32) -> u32 {
    1 + lines / LINES_PER_LEVEL
}

/// Gravity interval: 1000 ms at level 1, 100 ms faster per level, never below 100 ms.
pub fn drop_interval_for_level(level: u32) -> Duration {
    let speedup = u64::from(level.saturating_sub(1)) * DROP_INTERVAL_STEP_MS;
    Duration::from_millis(
        BASE_DROP_INTERVAL_MS
            .saturating_sub(speedup)
            .max(MIN_DROP_INTERVAL_MS),
    )
}

/// Input gathered by the host for one frame. Everything except `soft_drop`
/// is a press edge; `soft_drop` is true while the key is held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameInput {
    pub move_left: bool,
    pub move_right: bool,
    pub rotate: bool,
    pub soft_drop: bool,
    pub hard_drop: bool,
    pub restart: bool,
}

/// Uniform piece source over the 7 families.
#[derive(Debug, Clone)]
pub struct Randomizer {
    rng: StdRng,
}

impl Randomizer {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    pub fn next_kind(&mut self) -> Tetromino {
        Tetromino::from_index(self.rng.gen_range(0..Tetromino::ALL.len()))
    }
}

/// Rows waiting to be removed and the time left on their flash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineClear {
    pub rows: Vec<usize>,
    pub remaining: Duration,
}

#[derive(Debug)]
pub struct GameState {
    pub board: Board,
    pub piece: Option<Piece>,
    pub next_piece: Piece,
    pub score: u32,
    pub level: u32,
    pub lines_cleared: u32,
    pub drop_interval: Duration,
    pub game_over: bool,
    /// Pending clear; while set the falling piece is frozen.
    pub line_clear: Option<LineClear>,
    shake_timer: f64,
    pub shake_offset: f64,
    drop_elapsed: Duration,
    soft_drop_elapsed: Duration,
    soft_drop_held: bool,
    randomizer: Randomizer,
}

impl GameState {
    pub fn new(config: &GameConfig) -> Self {
        let mut randomizer = Randomizer::new(config.seed);
        let piece = Piece::spawn(randomizer.next_kind());
        let next_piece = Piece::spawn(randomizer.next_kind());
        Self {
            board: Board::new(),
            piece: Some(piece),
            next_piece,
            score: 0,
            level: 1,
            lines_cleared: 0,
            drop_interval: drop_interval_for_level(1),
            game_over: false,
            line_clear: None,
            shake_timer: 0.0,
            shake_offset: 0.0,
            drop_elapsed: Duration::ZERO,
            soft_drop_elapsed: Duration::ZERO,
            soft_drop_held: false,
            randomizer,
        }
    }

    /// Back to a fresh game. The piece sequence continues from the same source.
    pub fn restart(&mut self) {
        self.board = Board::new();
        self.piece = Some(Piece::spawn(self.randomizer.next_kind()));
        self.next_piece = Piece::spawn(self.randomizer.next_kind());
        self.score = 0;
        self.level = 1;
        self.lines_cleared = 0;
        self.drop_interval = drop_interval_for_level(1);
        self.game_over = false;
        self.line_clear = None;
        self.shake_timer = 0.0;
        self.shake_offset = 0.0;
        self.drop_elapsed = Duration::ZERO;
        self.soft_drop_elapsed = Duration::ZERO;
        self.soft_drop_held = false;
    }

    pub fn flash_rows(&self) -> &[usize] {
        self.line_clear.as_ref().map_or(&[], |c| c.rows.as_slice())
    }

    pub fn flash_remaining(&self) -> Duration {
        self.line_clear
            .as_ref()
            .map_or(Duration::ZERO, |c| c.remaining)
    }

    /// Advance one frame by `dt`. Long frames are consumed in `MAX_FRAME_DELTA`
    /// slices, up to `MAX_CATCH_UP`; press edges apply to the first slice only.
    /// Catch-up stops when a flash starts or the game ends.
    pub fn step(&mut self, dt: Duration, input: &FrameInput) {
        let mut left = dt.min(MAX_CATCH_UP);
        let mut input = *input;
        loop {
            let slice = left.min(MAX_FRAME_DELTA);
            left -= slice;
            let was_flashing = self.line_clear.is_some();
            self.advance(slice, &input);
            if left.is_zero() || self.game_over || (!was_flashing && self.line_clear.is_some()) {
                return;
            }
            input = FrameInput {
                soft_drop: input.soft_drop,
                ..FrameInput::default()
            };
        }
    }

    /// One slice: flash, inputs, soft drop, rotate, hard drop, gravity.
    fn advance(&mut self, dt: Duration, input: &FrameInput) {
        self.tick_shake(dt);

        if self.game_over {
            if input.restart {
                self.restart();
            }
            return;
        }

        if let Some(clear) = self.line_clear.as_mut() {
            clear.remaining = clear.remaining.saturating_sub(dt);
            if !clear.remaining.is_zero() {
                self.soft_drop_held = input.soft_drop;
                return;
            }
            self.finish_line_clear();
            if self.game_over {
                return;
            }
        } else {
            self.drop_elapsed += dt;
        }

        if input.move_left {
            self.move_left();
        }
        if input.move_right {
            self.move_right();
        }
        self.tick_soft_drop(dt, input.soft_drop);
        if input.rotate {
            self.rotate();
        }
        if input.hard_drop {
            self.hard_drop();
        }
        self.tick_gravity();
    }

    fn tick_shake(&mut self, dt: Duration) {
        if self.shake_timer <= 0.0 {
            return;
        }
        self.shake_timer -= dt.as_secs_f64();
        self.shake_offset = if self.shake_timer > 0.0 {
            (self.shake_timer * 50.0).sin() * 5.0 * self.shake_timer
        } else {
            0.0
        };
    }

    fn tick_soft_drop(&mut self, dt: Duration, held: bool) {
        if held {
            if self.soft_drop_held {
                self.soft_drop_elapsed += dt;
            } else {
                self.soft_drop_elapsed = Duration::ZERO;
            }
            if self.soft_drop_elapsed > SOFT_DROP_INTERVAL {
                self.shift(0, 1);
                self.soft_drop_elapsed = Duration::ZERO;
            }
        }
        self.soft_drop_held = held;
    }

    fn tick_gravity(&mut self) {
        if self.line_clear.is_some() || self.game_over {
            return;
        }
        if self.drop_elapsed > self.drop_interval {
            self.drop_elapsed = Duration::ZERO;
            if !self.shift(0, 1) {
                self.lock_piece();
            }
        }
    }

    /// Move the current piece if the target is free. Returns whether it moved.
    fn shift(&mut self, dx: i32, dy: i32) -> bool {
        let Some(piece) = self.piece.as_mut() else {
            return false;
        };
        if !self.board.can_place_at(piece, dx, dy) {
            return false;
        }
        piece.x += dx;
        piece.y += dy;
        true
    }

    fn accepts_input(&self) -> bool {
        !self.game_over && self.line_clear.is_none()
    }

    pub fn move_left(&mut self) {
        if self.accepts_input() {
            self.shift(-1, 0);
        }
    }

    pub fn move_right(&mut self) {
        if self.accepts_input() {
            self.shift(1, 0);
        }
    }

    /// Rotate clockwise to the family's next state, re-centred on the old
    /// footprint, trying in place, one left, one right, then one up.
    /// If every probe collides the piece is left as it was.
    pub fn rotate(&mut self) {
        if !self.accepts_input() {
            return;
        }
        let Some(piece) = self.piece else {
            return;
        };
        let old_width = piece.shape().width() as i32;
        let mut candidate = piece;
        candidate.rotation = piece.next_rotation();
        candidate.x += (old_width - candidate.shape().width() as i32) / 2;

        for (dx, dy) in ROTATION_PROBES {
            if self.board.can_place_at(&candidate, dx, dy) {
                candidate.x += dx;
                candidate.y += dy;
                self.piece = Some(candidate);
                return;
            }
        }
    }

    /// Drop to the lowest free row and lock immediately. Returns rows travelled.
    pub fn hard_drop(&mut self) -> u32 {
        if !self.accepts_input() {
            return 0;
        }
        let mut rows = 0;
        while self.shift(0, 1) {
            rows += 1;
        }
        self.lock_piece();
        self.drop_elapsed = Duration::ZERO;
        rows
    }

    /// Merge the current piece, start a flash if rows filled up, bring in the next piece.
    fn lock_piece(&mut self) {
        let Some(piece) = self.piece.take() else {
            return;
        };
        self.board.merge(&piece);

        let rows = self.board.full_rows();
        if !rows.is_empty() {
            self.line_clear = Some(LineClear {
                rows,
                remaining: FLASH_DURATION,
            });
            self.shake_timer = CLEAR_SHAKE_SECS;
        }
        self.spawn_next();
    }

    fn spawn_next(&mut self) {
        let next = Piece::spawn(self.randomizer.next_kind());
        let current = std::mem::replace(&mut self.next_piece, next);
        self.piece = Some(current);
        if !self.board.can_place(&current) {
            self.end_game();
        }
    }

    fn end_game(&mut self) {
        self.game_over = true;
        self.line_clear = None;
        self.shake_timer = GAME_OVER_SHAKE_SECS;
    }

    /// Flash has run out: remove the rows, then score and level up.
    fn finish_line_clear(&mut self) {
        let Some(clear) = self.line_clear.take() else {
            return;
        };
        let cleared = self.board.collapse_rows(&clear.rows);
        self.score += line_clear_score(cleared, self.level);
        self.lines_cleared += cleared as u32;
        self.level = level_for_lines(self.lines_cleared);
        self.drop_interval = drop_interval_for_level(self.level);
        self.drop_elapsed = Duration::ZERO;

        if let Some(piece) = self.piece {
            if !self.board.can_place(&piece) {
                self.end_game();
            }
        }
    }
}
