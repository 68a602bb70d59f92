//! Layout and drawing: playfield, flashing rows, side panel, pause and game over.

use crate::board::{BOARD_HEIGHT, BOARD_WIDTH};
use crate::game::{FLASH_DURATION, GameState};
use crate::piece::Piece;
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Position, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Widget};
use std::collections::HashSet;
use tachyonfx::{CellFilter, Duration as TfxDuration, EffectRenderer, Interpolation, fx, ref_count};

/// Each grid cell is two terminal columns wide so blocks look square.
const CELL_WIDTH: u16 = 2;
const CELL_HEIGHT: u16 = 1;

const SIDEBAR_WIDTH: u16 = 24;

/// Shake offset units per terminal column.
const SHAKE_UNITS_PER_COLUMN: f64 = 2.5;

const LOGO: &str = "BLOCKTUI";

const CONTROLS: [(&str, &str); 5] = [
    ("←→", "Move"),
    ("↑", "Rotate"),
    ("↓", "Soft drop"),
    ("Space", "Drop"),
    ("P", "Pause"),
];

/// Playfield size in terminal cells (border + grid).
fn playfield_size() -> (u16, u16) {
    (
        BOARD_WIDTH as u16 * CELL_WIDTH + 2,
        BOARD_HEIGHT as u16 * CELL_HEIGHT + 2,
    )
}

/// Horizontal board displacement, in terminal columns, for a shake offset.
pub fn shake_columns(offset: f64) -> i16 {
    (offset / SHAKE_UNITS_PER_COLUMN).round() as i16
}

/// Draw one frame. While rows are flashing and animation is on, runs the
/// TachyonFX fade over them.
pub fn draw(frame: &mut Frame, state: &GameState, theme: &Theme, paused: bool, no_animation: bool) {
    let area = frame.area();
    Block::default()
        .style(Style::default().bg(theme.bg))
        .render(area, frame.buffer_mut());

    let shake = if no_animation {
        0
    } else {
        shake_columns(state.shake_offset)
    };
    let board_rect = draw_game(frame, state, theme, area, shake);

    if !state.flash_rows().is_empty() && !no_animation {
        apply_line_clear_effect(frame, state, theme, board_rect);
    }
    if state.game_over {
        draw_game_over(frame, state, theme, area);
    } else if paused {
        draw_pause_overlay(frame, theme, area);
    }
}

/// Draw playfield + sidebar centred in `area`. Returns the board's inner rect.
fn draw_game(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect, shake: i16) -> Rect {
    let (playfield, sidebar) = game_layout(area);
    let board_rect = draw_playfield(frame, state, theme, shifted(playfield, shake, area));
    draw_sidebar(frame, state, theme, sidebar);
    board_rect
}

/// Unshaken playfield and sidebar rects, centred together in `area`.
fn game_layout(area: Rect) -> (Rect, Rect) {
    let (pw, ph) = playfield_size();
    let total_w = pw + SIDEBAR_WIDTH;

    let horiz_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(total_w),
            Constraint::Fill(1),
        ])
        .split(area);
    let vert_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Fill(1),
            Constraint::Length(ph),
            Constraint::Fill(1),
        ])
        .split(horiz_chunks[1]);
    let inner = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(pw), Constraint::Length(SIDEBAR_WIDTH)])
        .split(vert_chunks[1]);
    (inner[0], inner[1])
}

/// Move `rect` sideways by `dx` columns without leaving `bounds`.
fn shifted(rect: Rect, dx: i16, bounds: Rect) -> Rect {
    let min_x = i32::from(bounds.x);
    let max_x = i32::from(bounds.right()) - i32::from(rect.width);
    let x = (i32::from(rect.x) + i32::from(dx)).clamp(min_x, max_x.max(min_x));
    Rect { x: x as u16, ..rect }
}

fn draw_playfield(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) -> Rect {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    let board_rect = Rect {
        width: (BOARD_WIDTH as u16 * CELL_WIDTH).min(inner.width),
        height: (BOARD_HEIGHT as u16 * CELL_HEIGHT).min(inner.height),
        ..inner
    };

    let flash_rows = state.flash_rows();
    let flash_on = flash_pulse_on(state);
    let piece_cells: HashSet<(i32, i32)> = state
        .piece
        .as_ref()
        .map(|p| p.cells().collect())
        .unwrap_or_default();
    let piece_color = state.piece.map(|p| theme.piece_color(p.kind));

    let buf = frame.buffer_mut();
    for y in 0..BOARD_HEIGHT {
        for x in 0..BOARD_WIDTH {
            let id = state.board.get(x, y).unwrap_or(0);
            let style = if id != 0 && flash_rows.contains(&y) {
                let c = if flash_on { theme.flash } else { theme.cell_color(id) };
                Style::default().fg(c).bg(theme.empty)
            } else if let Some(c) = piece_color.filter(|_| piece_cells.contains(&(x as i32, y as i32))) {
                Style::default().fg(c).bg(theme.empty).bold()
            } else if id != 0 {
                Style::default().fg(theme.cell_color(id)).bg(theme.empty)
            } else {
                Style::default().fg(theme.div_line).bg(theme.empty)
            };
            let filled = id != 0 || piece_cells.contains(&(x as i32, y as i32));
            let symbol = if filled { "██" } else { " ·" };

            let rx = board_rect.x + x as u16 * CELL_WIDTH;
            let ry = board_rect.y + y as u16 * CELL_HEIGHT;
            if rx + CELL_WIDTH <= board_rect.right() && ry < board_rect.bottom() {
                buf.set_string(rx, ry, symbol, style);
            }
        }
    }
    board_rect
}

/// Flashing rows blink between the flash colour and their own.
fn flash_pulse_on(state: &GameState) -> bool {
    let remaining = state.flash_remaining().as_secs_f64();
    (remaining * 20.0).sin() >= 0.0
}

/// Build set of buffer (x, y) positions that belong to flashing rows.
fn flashing_buffer_positions(board_rect: Rect, rows: &[usize]) -> HashSet<(u16, u16)> {
    let mut set = HashSet::new();
    for &gy in rows {
        let by = board_rect.y + gy as u16 * CELL_HEIGHT;
        if by >= board_rect.bottom() {
            continue;
        }
        for bx in board_rect.x..board_rect.right() {
            set.insert((bx, by));
        }
    }
    set
}

/// Fade the flashing rows towards the empty colour. Rebuilt every frame over the
/// board's current (shaken) rect and advanced by the flash time already spent.
fn apply_line_clear_effect(frame: &mut Frame, state: &GameState, theme: &Theme, board_rect: Rect) {
    let flashing = flashing_buffer_positions(board_rect, state.flash_rows());
    let filter = CellFilter::PositionFn(ref_count(move |pos: Position| {
        flashing.contains(&(pos.x, pos.y))
    }));
    let fade_ms = FLASH_DURATION.as_millis() as u32;
    let mut effect = fx::fade_to(theme.empty, theme.empty, (fade_ms, Interpolation::Linear))
        .with_filter(filter);

    let spent = FLASH_DURATION.saturating_sub(state.flash_remaining());
    let spent_ms = spent.as_millis().min(u128::from(fade_ms)) as u32;
    frame.render_effect(&mut effect, board_rect, TfxDuration::from_millis(spent_ms));
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = Style::default().fg(theme.div_line).bg(theme.bg);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // logo
            Constraint::Length(1), // gap
            Constraint::Length(6), // next (border + title + 4 rows)
            Constraint::Length(1), // gap
            Constraint::Length(5), // stats
            Constraint::Length(1), // gap
            Constraint::Min(0),    // controls
        ])
        .split(area);

    let logo: Vec<Span> = LOGO
        .chars()
        .enumerate()
        .map(|(i, c)| Span::styled(format!("{c} "), Style::default().fg(theme.logo_color(i)).bold()))
        .collect();
    Paragraph::new(Line::from(logo))
        .alignment(Alignment::Center)
        .render(chunks[0], frame.buffer_mut());

    let next_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style)
        .title(Span::styled(" Next ", title_style));
    let next_inner = next_block.inner(chunks[2]);
    next_block.render(chunks[2], frame.buffer_mut());
    draw_next_preview(frame, &state.next_piece, theme, next_inner);

    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let stats_inner = stats_block.inner(chunks[4]);
    stats_block.render(chunks[4], frame.buffer_mut());
    let stats_lines = vec![
        stat_line("SCORE", state.score, title_style, fg_style),
        stat_line("LEVEL", state.level, title_style, fg_style),
        stat_line("LINES", state.lines_cleared, title_style, fg_style),
    ];
    Paragraph::new(Text::from(stats_lines)).render(stats_inner, frame.buffer_mut());

    let mut controls = vec![Line::from(Span::styled("Controls", title_style))];
    controls.extend(CONTROLS.iter().map(|(key, what)| {
        Line::from(vec![
            Span::styled(format!("{key:>6} "), fg_style),
            Span::styled(*what, Style::default().fg(theme.inactive_fg)),
        ])
    }));
    Paragraph::new(Text::from(controls)).render(chunks[6], frame.buffer_mut());
}

fn stat_line(label: &str, value: u32, label_style: Style, value_style: Style) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label:<7}"), label_style),
        Span::styled(format!("{value:>12}"), value_style),
    ])
}

/// Rows and columns of the shape that contain at least one block.
fn occupied_bounds(piece: &Piece) -> Option<(i32, i32, i32, i32)> {
    piece.shape().cells().fold(None, |acc, (x, y)| {
        Some(match acc {
            None => (x, y, x, y),
            Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
        })
    })
}

/// Next piece, trimmed to its blocks and centred in `area`.
fn draw_next_preview(frame: &mut Frame, piece: &Piece, theme: &Theme, area: Rect) {
    let Some((x0, y0, x1, y1)) = occupied_bounds(piece) else {
        return;
    };
    let bw = (x1 - x0 + 1) as u16 * CELL_WIDTH;
    let bh = (y1 - y0 + 1) as u16 * CELL_HEIGHT;
    let off_x = area.width.saturating_sub(bw) / 2;
    let off_y = area.height.saturating_sub(bh) / 2;
    let style = Style::default().fg(theme.piece_color(piece.kind));

    let buf = frame.buffer_mut();
    for (x, y) in piece.shape().cells() {
        let rx = area.x + off_x + (x - x0) as u16 * CELL_WIDTH;
        let ry = area.y + off_y + (y - y0) as u16 * CELL_HEIGHT;
        if rx + CELL_WIDTH <= area.right() && ry < area.bottom() {
            buf.set_string(rx, ry, "██", style);
        }
    }
}

fn centered_popup(area: Rect, width: u16, height: u16) -> Rect {
    Rect {
        x: area.x + area.width.saturating_sub(width) / 2,
        y: area.y + area.height.saturating_sub(height) / 2,
        width: width.min(area.width),
        height: height.min(area.height),
    }
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup = centered_popup(area, 28, 5);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Paused ",
            Style::default().fg(Color::Black).bg(Color::Yellow),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " P — Resume    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect) {
    let popup = centered_popup(area, 38, 8);
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            " GAME OVER ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", state.score),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " R / Space — Restart    Q — Quit ",
            Style::default().fg(theme.main_fg),
        )),
    ];
    Clear.render(popup, frame.buffer_mut());
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GameConfig;
    use crate::game::LineClear;
    use crate::piece::Tetromino;
    use ratatui::Terminal;
    use ratatui::backend::TestBackend;
    use ratatui::buffer::Buffer;
    use std::time::Duration;

    fn state() -> GameState {
        GameState::new(&GameConfig {
            seed: Some(1),
            frame_rate: 60.0,
            no_animation: true,
        })
    }

    fn render_buffer(state: &GameState, paused: bool, no_animation: bool) -> Buffer {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        let theme = Theme::classic();
        terminal
            .draw(|f| draw(f, state, &theme, paused, no_animation))
            .unwrap();
        terminal.backend().buffer().clone()
    }

    fn render(state: &GameState, paused: bool) -> String {
        render_buffer(state, paused, true)
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    #[test]
    fn test_shake_columns() {
        assert_eq!(shake_columns(0.0), 0);
        assert_eq!(shake_columns(5.0), 2);
        assert_eq!(shake_columns(-5.0), -2);
        assert_eq!(shake_columns(0.4), 0);
    }

    #[test]
    fn test_shifted_stays_in_bounds() {
        let bounds = Rect::new(0, 0, 40, 10);
        let r = Rect::new(2, 1, 10, 5);
        assert_eq!(shifted(r, -5, bounds).x, 0);
        assert_eq!(shifted(r, 3, bounds).x, 5);
        assert_eq!(shifted(r, 100, bounds).x, 30);
    }

    #[test]
    fn test_occupied_bounds_trims_empty_rows() {
        let i = Piece::spawn(Tetromino::I);
        assert_eq!(occupied_bounds(&i), Some((0, 1, 3, 1)));
        let o = Piece::spawn(Tetromino::O);
        assert_eq!(occupied_bounds(&o), Some((0, 0, 1, 1)));
    }

    #[test]
    fn test_render_shows_stats_and_logo() {
        let screen = render(&state(), false);
        assert!(screen.contains("SCORE"));
        assert!(screen.contains("LEVEL"));
        assert!(screen.contains("LINES"));
        assert!(screen.contains("Next"));
        assert!(screen.contains("██"));
    }

    #[test]
    fn test_render_overlays() {
        assert!(render(&state(), true).contains("Paused"));
        let mut over = state();
        over.game_over = true;
        let screen = render(&over, false);
        assert!(screen.contains("GAME OVER"));
        assert!(!screen.contains("Paused"));
    }

    #[test]
    fn test_fade_follows_shaken_board() {
        let mut state = state();
        for x in 0..BOARD_WIDTH {
            state.board.set(x, BOARD_HEIGHT - 1, 1);
        }
        state.line_clear = Some(LineClear {
            rows: vec![BOARD_HEIGHT - 1],
            remaining: Duration::from_millis(100),
        });
        state.shake_offset = 5.0;

        let buf = render_buffer(&state, false, false);
        let area = Rect::new(0, 0, 80, 30);
        let (playfield, _) = game_layout(area);
        let playfield = shifted(playfield, shake_columns(state.shake_offset), area);
        assert_ne!(playfield.x, game_layout(area).0.x);

        let theme = Theme::classic();
        let y = playfield.y + 1 + BOARD_HEIGHT as u16 - 1;
        let board_left = playfield.x + 1;
        let board_right = board_left + BOARD_WIDTH as u16 * CELL_WIDTH;
        for x in board_left..board_right {
            let cell = &buf[(x, y)];
            assert_eq!(cell.symbol(), "█");
            assert_ne!(cell.fg, theme.flash, "column {x} not faded");
        }
        // Borders either side of the flashing row are untouched.
        assert_eq!(buf[(board_left - 1, y)].fg, theme.div_line);
        assert_eq!(buf[(board_right, y)].fg, theme.div_line);
    }
}
