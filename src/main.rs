//! Stacktui — block-stacking timing game in the terminal.

mod app;
mod audio;
mod game;
mod highscores;
mod input;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};

/// Options derived from CLI that affect game behaviour (speed, spawn delay, sound).
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub difficulty: Difficulty,
    pub initial_speed: f32,
    pub spawn_delay_ms: u64,
    pub sound: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let config = GameConfig {
        difficulty: args.difficulty,
        initial_speed: args
            .speed
            .unwrap_or_else(|| initial_speed_for(args.difficulty)),
        spawn_delay_ms: args.spawn_delay_ms,
        sound: !args.no_sound,
    };
    let mut app = App::new(args, config, theme)?;
    app.run()
}

/// Block-stacking timing game in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "stacktui",
    version,
    about = "Block-stacking timing game in the terminal. Time the drop; overhang gets trimmed away.",
    long_about = "Stacktui is a terminal arcade game about timing.\n\n\
        A block slides back and forth above the tower. Drop it in time and the part \
        overlapping the block below survives; the overhang is cut off and falls away. \
        Each placement scores a point and speeds the slide up. Miss the tower entirely \
        and the run is over.\n\n\
        CONTROLS:\n  Space/Enter  Drop the block    P  Pause    Q / Esc  Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Difficulty: easy, medium, or hard. Sets the starting slide speed.
    #[arg(short, long, default_value = "easy")]
    pub difficulty: Difficulty,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Starting slide speed in world units per frame; overrides difficulty.
    #[arg(long, value_name = "SPEED")]
    pub speed: Option<f32>,

    /// Delay in ms between a placement and the next block entering.
    #[arg(long, default_value = "300", value_name = "MS")]
    pub spawn_delay_ms: u64,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Skip the menu and start playing immediately.
    #[arg(long)]
    pub no_menu: bool,

    /// Disable sound cues.
    #[arg(long)]
    pub no_sound: bool,
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

/// Starting slide speed per difficulty, in world units per reference frame.
pub fn initial_speed_for(difficulty: Difficulty) -> f32 {
    match difficulty {
        Difficulty::Easy => game::INITIAL_SPEED,
        Difficulty::Medium => 0.11,
        Difficulty::Hard => 0.14,
    }
}
