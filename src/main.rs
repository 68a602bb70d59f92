//! Blocktui: classic falling-block puzzle game in the terminal.

mod app;
mod board;
mod game;
mod input;
mod piece;
mod theme;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};

/// Options derived from CLI that affect the simulation and the frame loop.
#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Fixed piece sequence when set; otherwise seeded from OS entropy.
    pub seed: Option<u64>,
    pub frame_rate: f64,
    pub no_animation: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette)
        .with_context(|| format!("loading theme {:?}", args.theme))?;
    let config = GameConfig {
        seed: args.seed,
        frame_rate: args.frame_rate,
        no_animation: args.no_animation,
    };
    let mut app = App::new(config, theme);
    app.run()?;
    Ok(())
}

/// Classic falling-block puzzle game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "blocktui",
    version,
    about = "Classic falling-block puzzle in the terminal. Complete rows to clear them; the game speeds up every 10 lines.",
    long_about = "Blocktui is a terminal take on the classic falling-block puzzle.\n\n\
        Seven tetrominoes fall into a 10x20 well. Fill a row edge to edge to clear it; \
        clearing several at once scores more. Every 10 lines the level rises and pieces fall faster.\n\n\
        CONTROLS:\n  Left/Right or h/l  Move      Up or k      Rotate\n  Down or j          Soft drop Space/Enter  Hard drop\n  P                  Pause     Q / Esc      Quit\n  R or Space         Restart after game over"
)]
pub struct Args {
    /// Path to theme file (btop-style theme[key]=\"value\"). Uses the classic palette if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Seed for the piece sequence (same seed, same pieces).
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Target frames per second (1-1000); the simulation steps once per frame.
    #[arg(long, default_value = "60.0", value_name = "RATE", value_parser = parse_frame_rate)]
    pub frame_rate: f64,

    /// Disable the line-clear fade and board shake.
    #[arg(long)]
    pub no_animation: bool,
}

const FRAME_RATE_RANGE: std::ops::RangeInclusive<f64> = 1.0..=1000.0;

fn parse_frame_rate(s: &str) -> Result<f64, String> {
    let rate: f64 = s.parse().map_err(|e| format!("{e}"))?;
    if !FRAME_RATE_RANGE.contains(&rate) {
        return Err(format!(
            "must be between {} and {}",
            FRAME_RATE_RANGE.start(),
            FRAME_RATE_RANGE.end()
        ));
    }
    Ok(rate)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_cli_defaults() {
        let args = Args::try_parse_from(["blocktui"]).unwrap();
        assert_eq!(args.palette, Palette::Normal);
        assert_eq!(args.seed, None);
        assert!((args.frame_rate - 60.0).abs() < f64::EPSILON);
        assert!(!args.no_animation);
    }

    #[test]
    fn test_cli_palette_alias_and_seed() {
        let args =
            Args::try_parse_from(["blocktui", "--palette", "colourblind", "--seed", "9"]).unwrap();
        assert_eq!(args.palette, Palette::Colorblind);
        assert_eq!(args.seed, Some(9));
    }

    #[test]
    fn test_frame_rate_bounds() {
        for bad in ["0", "-5", "0.5", "1e-30", "1001", "NaN", "inf", "fast"] {
            assert!(
                Args::try_parse_from(["blocktui", "--frame-rate", bad]).is_err(),
                "{bad} accepted"
            );
        }
        let args = Args::try_parse_from(["blocktui", "--frame-rate", "1"]).unwrap();
        assert!((args.frame_rate - 1.0).abs() < f64::EPSILON);
        let args = Args::try_parse_from(["blocktui", "--frame-rate", "1000"]).unwrap();
        assert!((args.frame_rate - 1000.0).abs() < f64::EPSILON);
    }
}
