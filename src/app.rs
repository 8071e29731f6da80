//! App: terminal init, main loop, frame timing and key handling.

use crate::audio::Audio;
use crate::game::{self, GameState, PlaceOutcome};
use crate::highscores::HighScores;
use crate::input::{Action, key_to_action};
use crate::theme::Theme;
use crate::{Args, Difficulty, GameConfig};
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Menu,
    Playing,
    GameOver,
    QuitMenu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuitOption {
    Resume,
    MainMenu,
    Exit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuTab {
    Difficulty,
    Start,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuState {
    pub current_tab: MenuTab,
    pub selected_difficulty: Difficulty,
    pub animation_start: Instant,
}

impl Default for MenuState {
    fn default() -> Self {
        Self {
            current_tab: MenuTab::Difficulty,
            selected_difficulty: Difficulty::Easy,
            animation_start: Instant::now(),
        }
    }
}

pub struct App {
    args: Args,
    config: GameConfig,
    theme: Theme,
    state: GameState,
    screen: Screen,
    paused: bool,
    /// Frame timestamp the next dt is measured against.
    last_frame: Instant,
    menu_state: MenuState,
    quit_selected: QuitOption,
    /// None when sound is off or the output device refused to open.
    audio: Option<Audio>,
    high_scores: HighScores,
    new_high_score: bool,
    /// TachyonFX board fade shown behind the game-over popup.
    game_over_effect: Option<Effect>,
    game_over_effect_time: Option<Instant>,
}

impl App {
    pub fn new(args: Args, config: GameConfig, theme: Theme) -> Result<Self> {
        let state = GameState::new(&config)?;
        let screen = if args.no_menu {
            Screen::Playing
        } else {
            Screen::Menu
        };
        let audio = if config.sound { Audio::new().ok() } else { None };
        let menu_state = MenuState {
            selected_difficulty: config.difficulty,
            ..MenuState::default()
        };
        Ok(Self {
            args,
            config,
            theme,
            state,
            screen,
            paused: false,
            last_frame: Instant::now(),
            menu_state,
            quit_selected: QuitOption::Resume,
            audio,
            high_scores: HighScores::load(),
            new_high_score: false,
            game_over_effect: None,
            game_over_effect_time: None,
        })
    }

    /// Fresh run with the currently configured difficulty.
    fn start_run(&mut self) -> Result<()> {
        self.config.initial_speed = self
            .args
            .speed
            .unwrap_or_else(|| crate::initial_speed_for(self.config.difficulty));
        self.state = GameState::new(&self.config)?;
        self.screen = Screen::Playing;
        self.paused = false;
        self.new_high_score = false;
        self.game_over_effect = None;
        self.game_over_effect_time = None;
        self.last_frame = Instant::now();
        Ok(())
    }

    /// One placement request from any input channel.
    fn place_block(&mut self, now: Instant) -> Result<()> {
        match self.state.place(now)? {
            PlaceOutcome::Placed { perfect } => {
                if let Some(audio) = &self.audio {
                    if perfect {
                        audio.play_perfect();
                    } else {
                        audio.play_drop();
                    }
                }
            }
            PlaceOutcome::GameOver => {
                if let Some(audio) = &self.audio {
                    audio.play_miss();
                }
                self.finish_game();
            }
            PlaceOutcome::Ignored => {}
        }
        Ok(())
    }

    fn finish_game(&mut self) {
        self.screen = Screen::GameOver;
        self.game_over_effect = None;
        self.game_over_effect_time = None;
        self.new_high_score = self
            .high_scores
            .record(self.config.difficulty, self.state.score);
        if self.new_high_score {
            // Best effort; an unwritable config dir must not end the session.
            let _ = self.high_scores.save();
        }
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let mut terminal =
            ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))?;

        let result = self.run_loop(&mut terminal);

        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.args.frame_rate.max(1.0));
        loop {
            let now = Instant::now();
            let screen = self.screen;
            let paused = self.paused;
            let difficulty = self.config.difficulty;
            let best = self.high_scores.best(difficulty);
            let new_high = self.new_high_score;
            let quit_opt = (screen == Screen::QuitMenu).then_some(self.quit_selected);
            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    screen,
                    &self.state,
                    &self.theme,
                    paused,
                    difficulty,
                    best,
                    new_high,
                    &self.menu_state,
                    quit_opt,
                    now,
                    &mut self.game_over_effect,
                    &mut self.game_over_effect_time,
                )
            })?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        let action = key_to_action(key);
                        match self.screen {
                            Screen::Menu => {
                                if self.handle_menu_key(action)? {
                                    return Ok(());
                                }
                            }
                            Screen::Playing => self.handle_playing_key(action)?,
                            Screen::QuitMenu => {
                                if self.handle_quit_menu_key(action) {
                                    return Ok(());
                                }
                            }
                            Screen::GameOver => {
                                if action == Action::Quit {
                                    return Ok(());
                                }
                                if action == Action::Place
                                    || matches!(key.code, KeyCode::Char('r' | 'R'))
                                {
                                    self.start_run()?;
                                }
                            }
                        }
                    }
                }
            }

            let tick_now = Instant::now();
            let elapsed = tick_now.saturating_duration_since(self.last_frame);
            self.last_frame = tick_now;
            if self.screen == Screen::Playing && !self.paused {
                let dt = game::normalized_dt(elapsed);
                self.state.tick(tick_now, dt)?;
                self.state
                    .tick_popups(elapsed.as_millis().min(u128::from(u32::MAX)) as u32);
            }
        }
    }

    /// Returns true when the app should exit.
    fn handle_menu_key(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::Quit => return Ok(true),
            Action::Left => {
                if self.menu_state.current_tab == MenuTab::Difficulty {
                    self.menu_state.selected_difficulty =
                        match self.menu_state.selected_difficulty {
                            Difficulty::Easy => Difficulty::Hard,
                            Difficulty::Medium => Difficulty::Easy,
                            Difficulty::Hard => Difficulty::Medium,
                        };
                }
            }
            Action::Right => {
                if self.menu_state.current_tab == MenuTab::Difficulty {
                    self.menu_state.selected_difficulty =
                        match self.menu_state.selected_difficulty {
                            Difficulty::Easy => Difficulty::Medium,
                            Difficulty::Medium => Difficulty::Hard,
                            Difficulty::Hard => Difficulty::Easy,
                        };
                }
            }
            Action::Up | Action::Down => {
                self.menu_state.current_tab = match self.menu_state.current_tab {
                    MenuTab::Difficulty => MenuTab::Start,
                    MenuTab::Start => MenuTab::Difficulty,
                };
            }
            Action::Place => {
                if self.menu_state.current_tab == MenuTab::Start {
                    self.config.difficulty = self.menu_state.selected_difficulty;
                    self.start_run()?;
                } else {
                    self.menu_state.current_tab = MenuTab::Start;
                }
            }
            _ => {}
        }
        Ok(false)
    }

    fn handle_playing_key(&mut self, action: Action) -> Result<()> {
        if self.paused {
            match action {
                Action::Pause => {
                    self.paused = false;
                    self.last_frame = Instant::now();
                }
                Action::Quit => {
                    self.screen = Screen::QuitMenu;
                    self.quit_selected = QuitOption::Resume;
                }
                _ => {}
            }
            return Ok(());
        }
        match action {
            Action::Pause => self.paused = true,
            Action::Quit => {
                self.screen = Screen::QuitMenu;
                self.quit_selected = QuitOption::Resume;
            }
            Action::Place => self.place_block(Instant::now())?,
            _ => {}
        }
        Ok(())
    }

    /// Returns true when the app should exit.
    fn handle_quit_menu_key(&mut self, action: Action) -> bool {
        match action {
            Action::Down | Action::Right => {
                self.quit_selected = match self.quit_selected {
                    QuitOption::Resume => QuitOption::MainMenu,
                    QuitOption::MainMenu => QuitOption::Exit,
                    QuitOption::Exit => QuitOption::Resume,
                };
            }
            Action::Up | Action::Left => {
                self.quit_selected = match self.quit_selected {
                    QuitOption::Resume => QuitOption::Exit,
                    QuitOption::MainMenu => QuitOption::Resume,
                    QuitOption::Exit => QuitOption::MainMenu,
                };
            }
            Action::Place => match self.quit_selected {
                QuitOption::Resume => {
                    self.screen = Screen::Playing;
                    self.last_frame = Instant::now();
                }
                QuitOption::MainMenu => {
                    // Abandoning the run is an external termination.
                    self.state.end();
                    self.screen = Screen::Menu;
                    self.menu_state.animation_start = Instant::now();
                }
                QuitOption::Exit => {
                    self.state.end();
                    return true;
                }
            },
            Action::Pause | Action::Quit => {
                self.screen = Screen::Playing;
                self.last_frame = Instant::now();
            }
            _ => {}
        }
        false
    }
}
