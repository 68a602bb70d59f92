//! App: terminal init, frame loop, key handling into per-frame simulation input.

use crate::GameConfig;
use crate::game::{FrameInput, GameState};
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};

/// Terminals without release reporting only send repeated presses for a held key;
/// treat soft drop as held until this long after the last one.
const HELD_KEY_TIMEOUT_MS: u64 = 150;

pub struct App {
    config: GameConfig,
    theme: Theme,
    state: GameState,
    paused: bool,
    last_frame: Instant,
    /// Press edges collected since the last simulation step.
    pending: FrameInput,
    soft_drop_down: bool,
    soft_drop_seen: Option<Instant>,
    /// Set once the terminal has sent a key release.
    release_reported: bool,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let state = GameState::new(&config);
        Self {
            config,
            theme,
            state,
            paused: false,
            last_frame: Instant::now(),
            pending: FrameInput::default(),
            soft_drop_down: false,
            soft_drop_seen: None,
            release_reported: false,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        // Release events let soft drop track the held key exactly.
        let _ = execute!(
            stdout,
            PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
        );

        let mut terminal =
            DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        self.last_frame = Instant::now();
        let result = self.run_loop(&mut terminal);

        // Restore
        let _ = execute!(std::io::stdout(), PopKeyboardEnhancementFlags);
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::try_from_secs_f64(1.0 / self.config.frame_rate)?;
        loop {
            let now = Instant::now();
            terminal.draw(|f| {
                crate::ui::draw(f, &self.state, &self.theme, self.paused, self.config.no_animation);
            })?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if self.handle_key(key, Instant::now()) {
                            return Ok(());
                        }
                    }
                }
            }

            let now = Instant::now();
            let dt = now.duration_since(self.last_frame);
            self.last_frame = now;
            if self.paused {
                self.pending = FrameInput::default();
                continue;
            }

            let mut input = std::mem::take(&mut self.pending);
            input.soft_drop = self.soft_drop_held(now);
            self.state.step(dt, &input);
        }
    }

    /// Record one key event. Returns true when the player asked to quit.
    fn handle_key(&mut self, key: KeyEvent, now: Instant) -> bool {
        let action = key_to_action(key);
        match key.kind {
            KeyEventKind::Release => {
                self.release_reported = true;
                if action == Action::SoftDrop {
                    self.soft_drop_down = false;
                    self.soft_drop_seen = None;
                }
                return false;
            }
            // Only soft drop repeats; every other key acts once per press.
            KeyEventKind::Repeat => {
                if action == Action::SoftDrop {
                    self.soft_drop_down = true;
                    self.soft_drop_seen = Some(now);
                }
                return false;
            }
            KeyEventKind::Press => {}
        }

        match action {
            Action::Quit => return true,
            Action::Pause => {
                if !self.state.game_over {
                    self.paused = !self.paused;
                }
            }
            _ if self.paused => {}
            Action::MoveLeft => self.pending.move_left = true,
            Action::MoveRight => self.pending.move_right = true,
            Action::Rotate => self.pending.rotate = true,
            Action::SoftDrop => {
                self.soft_drop_down = true;
                self.soft_drop_seen = Some(now);
            }
            Action::HardDrop if self.state.game_over => self.pending.restart = true,
            Action::HardDrop => self.pending.hard_drop = true,
            Action::Restart => self.pending.restart = true,
            Action::None => {}
        }
        false
    }

    fn soft_drop_held(&self, now: Instant) -> bool {
        if self.release_reported {
            return self.soft_drop_down;
        }
        self.soft_drop_seen.is_some_and(|seen| {
            now.saturating_duration_since(seen) < Duration::from_millis(HELD_KEY_TIMEOUT_MS)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyCode, KeyEventState, KeyModifiers};

    fn app() -> App {
        let config = GameConfig {
            seed: Some(3),
            frame_rate: 60.0,
            no_animation: true,
        };
        App::new(config, Theme::classic())
    }

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind,
            state: KeyEventState::NONE,
        }
    }

    #[test]
    fn test_presses_become_edges() {
        let mut app = app();
        let now = Instant::now();
        assert!(!app.handle_key(key(KeyCode::Left, KeyEventKind::Press), now));
        assert!(!app.handle_key(key(KeyCode::Up, KeyEventKind::Press), now));
        assert!(!app.handle_key(key(KeyCode::Char(' '), KeyEventKind::Press), now));
        assert!(app.pending.move_left);
        assert!(app.pending.rotate);
        assert!(app.pending.hard_drop);
        assert!(!app.pending.restart);
    }

    #[test]
    fn test_repeat_moves_are_ignored() {
        let mut app = app();
        app.handle_key(key(KeyCode::Right, KeyEventKind::Repeat), Instant::now());
        assert!(!app.pending.move_right);
    }

    #[test]
    fn test_quit_key() {
        let mut app = app();
        assert!(app.handle_key(key(KeyCode::Char('q'), KeyEventKind::Press), Instant::now()));
    }

    #[test]
    fn test_soft_drop_held_until_release() {
        let mut app = app();
        let now = Instant::now();
        app.handle_key(key(KeyCode::Down, KeyEventKind::Press), now);
        assert!(app.soft_drop_held(now));
        app.handle_key(key(KeyCode::Down, KeyEventKind::Release), now);
        assert!(!app.soft_drop_held(now));
        app.handle_key(key(KeyCode::Down, KeyEventKind::Press), now);
        assert!(app.soft_drop_held(now + Duration::from_secs(5)));
    }

    #[test]
    fn test_soft_drop_times_out_without_release_events() {
        let mut app = app();
        let now = Instant::now();
        app.handle_key(key(KeyCode::Down, KeyEventKind::Press), now);
        assert!(app.soft_drop_held(now + Duration::from_millis(100)));
        assert!(!app.soft_drop_held(now + Duration::from_millis(HELD_KEY_TIMEOUT_MS)));
    }

    #[test]
    fn test_space_restarts_after_game_over() {
        let mut app = app();
        app.state.game_over = true;
        app.handle_key(key(KeyCode::Char(' '), KeyEventKind::Press), Instant::now());
        assert!(app.pending.restart);
        assert!(!app.pending.hard_drop);
    }

    #[test]
    fn test_pause_swallows_moves() {
        let mut app = app();
        let now = Instant::now();
        app.handle_key(key(KeyCode::Char('p'), KeyEventKind::Press), now);
        assert!(app.paused);
        app.handle_key(key(KeyCode::Left, KeyEventKind::Press), now);
        assert!(!app.pending.move_left);
        app.handle_key(key(KeyCode::Char('p'), KeyEventKind::Press), now);
        assert!(!app.paused);
    }
}
