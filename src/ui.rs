//! Layout and drawing: menu, tower board, sliding block, debris, sidebar,
//! pause and quit overlays, game over screen.

use crate::Difficulty;
use crate::app::{MenuState, MenuTab, QuitOption, Screen};
use crate::game::{self, GameState, color_for_row};
use crate::theme::Theme;
use ratatui::Frame;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style, Stylize};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Widget};
use std::time::{Duration, Instant};
use tachyonfx::{Duration as TfxDuration, Effect, EffectRenderer, Interpolation, fx};

/// Terminal columns per world unit. The slide range plus the base footprint
/// decides the board width.
const UNIT_COLS: f32 = 4.0;

/// Visible board height in rows; one tower block per row.
const BOARD_ROWS: u16 = 22;

const SIDEBAR_WIDTH: u16 = 24;

/// Rows from the board bottom where the tower top settles once it scrolls.
const ANCHOR_ROWS: f32 = 14.0;

/// Duration of the board fade behind the game-over popup.
const GAME_OVER_FADE_MS: u32 = 600;

/// Popup rise rate: one row per this many ms of age.
const POPUP_RISE_MS: u32 = 300;

fn world_span() -> f32 {
    2.0 * game::BOUNDS + game::BASE_WIDTH
}

/// Board inner width in columns.
fn board_cols() -> u16 {
    (world_span() * UNIT_COLS).round() as u16
}

/// Board outer size (border included).
fn board_size() -> (u16, u16) {
    (board_cols() + 2, BOARD_ROWS + 2)
}

/// Centered board + sidebar area for the given frame area.
fn game_area(area: Rect) -> Rect {
    let (bw, bh) = board_size();
    let total_w = bw + SIDEBAR_WIDTH;
    Rect {
        x: area.x + area.width.saturating_sub(total_w) / 2,
        y: area.y + area.height.saturating_sub(bh) / 2,
        width: total_w.min(area.width),
        height: bh.min(area.height),
    }
}

/// Board rect (border included) within the frame area; matches draw_game.
fn board_rect(area: Rect) -> Rect {
    let (bw, bh) = board_size();
    let outer = game_area(area);
    Rect {
        x: outer.x,
        y: outer.y,
        width: bw.min(outer.width),
        height: bh.min(outer.height),
    }
}

pub fn difficulty_label(difficulty: Difficulty) -> &'static str {
    match difficulty {
        Difficulty::Easy => "EASY",
        Difficulty::Medium => "MEDIUM",
        Difficulty::Hard => "HARD",
    }
}

/// Draw the current screen. The game-over fade effect is created on first
/// use and advanced by the wall-clock delta between draws.
#[allow(clippy::too_many_arguments)]
pub fn draw(
    frame: &mut Frame,
    screen: Screen,
    state: &GameState,
    theme: &Theme,
    paused: bool,
    difficulty: Difficulty,
    best: u32,
    new_high_score: bool,
    menu_state: &MenuState,
    quit_selected: Option<QuitOption>,
    now: Instant,
    game_over_effect: &mut Option<Effect>,
    game_over_effect_time: &mut Option<Instant>,
) {
    let area = frame.area();
    match screen {
        Screen::Menu => draw_menu(frame, theme, menu_state, area, now),
        Screen::Playing => {
            draw_game(frame, state, theme, area, difficulty, best);
            if paused {
                draw_pause_overlay(frame, theme, area);
            }
        }
        Screen::QuitMenu => {
            draw_game(frame, state, theme, area, difficulty, best);
            if let Some(opt) = quit_selected {
                draw_quit_menu(frame, theme, area, opt);
            }
        }
        Screen::GameOver => {
            draw_game(frame, state, theme, area, difficulty, best);
            apply_game_over_fade(
                frame,
                theme,
                board_rect(area),
                game_over_effect,
                game_over_effect_time,
                now,
            );
            draw_game_over(frame, state, theme, area, best, new_high_score);
        }
    }
}

fn apply_game_over_fade(
    frame: &mut Frame,
    theme: &Theme,
    rect: Rect,
    effect: &mut Option<Effect>,
    process_time: &mut Option<Instant>,
    now: Instant,
) {
    let delta = process_time
        .map(|t| now.saturating_duration_since(t))
        .unwrap_or(Duration::ZERO);
    let delta_ms = delta.as_millis().min(u128::from(u32::MAX)) as u32;
    *process_time = Some(now);

    if effect.is_none() {
        let bg = theme.bg;
        *effect = Some(
            fx::fade_to(bg, bg, (GAME_OVER_FADE_MS, Interpolation::Linear)).with_area(rect),
        );
    }
    if let Some(e) = effect {
        frame.render_effect(e, rect, TfxDuration::from_millis(delta_ms));
    }
}

fn draw_game(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    area: Rect,
    difficulty: Difficulty,
    best: u32,
) {
    let (bw, _bh) = board_size();
    let active_area = game_area(area);
    let (board_area, sidebar_area) = {
        let inner = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(bw), Constraint::Length(SIDEBAR_WIDTH)])
            .split(active_area);
        (inner[0], inner[1])
    };
    draw_board(frame, state, theme, board_area, difficulty);
    draw_sidebar(frame, state, theme, sidebar_area, best);
}

/// Column range a block covers, clipped to the board.
fn block_cols(inner: Rect, position: f32, width: f32) -> Option<(u16, u16)> {
    let left = (position - width / 2.0 + world_span() / 2.0) * UNIT_COLS;
    let cols = (width * UNIT_COLS).round().max(1.0) as i32;
    let x0 = (left.round() as i32).max(0);
    let x1 = (left.round() as i32 + cols).min(i32::from(inner.width));
    if x0 >= x1 {
        return None;
    }
    Some((inner.x + x0 as u16, inner.x + x1 as u16))
}

/// Screen row for a tower row under the current scroll, if visible.
fn row_to_y(inner: Rect, row: f32, scroll: f32) -> Option<u16> {
    let y = f32::from(inner.y) + f32::from(inner.height) - 1.0 - (row - scroll);
    let yi = y.round() as i32;
    if yi < i32::from(inner.y) || yi >= i32::from(inner.y + inner.height) {
        None
    } else {
        Some(yi as u16)
    }
}

fn draw_board(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect, difficulty: Difficulty) {
    let title = format!(" stacktui  |  {} ", difficulty_label(difficulty));
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
        .style(Style::default().bg(theme.bg))
        .title(Span::styled(title, theme.title));
    let inner = block.inner(area);
    block.render(area, frame.buffer_mut());

    // The camera trails the tower top; scroll only once it clears the anchor.
    let scroll = (state.camera - ANCHOR_ROWS).max(0.0);
    let buf = frame.buffer_mut();

    for (row, b) in state.stack.blocks().iter().enumerate() {
        let Some(y) = row_to_y(inner, row as f32, scroll) else {
            continue;
        };
        let Some((x0, x1)) = block_cols(inner, b.position, b.width) else {
            continue;
        };
        let color = theme.block_color(color_for_row(row));
        for x in x0..x1 {
            buf[(x, y)]
                .set_symbol("█")
                .set_style(Style::default().fg(color).bg(theme.bg));
        }
    }

    if let Some(active) = state.stack.active() {
        let row = state.stack.height();
        if let (Some(y), Some((x0, x1))) = (
            row_to_y(inner, row as f32, scroll),
            block_cols(inner, active.position, active.width),
        ) {
            let color = theme.block_color(color_for_row(row));
            for x in x0..x1 {
                buf[(x, y)]
                    .set_symbol("▓")
                    .set_style(Style::default().fg(color).bg(theme.bg));
            }
        }
    }

    for d in &state.debris {
        let row = d.row as f32 - d.drop;
        if let (Some(y), Some((x0, x1))) = (
            row_to_y(inner, row, scroll),
            block_cols(inner, d.position, d.width),
        ) {
            let color = theme.block_color(d.color_index);
            for x in x0..x1 {
                buf[(x, y)]
                    .set_symbol("▒")
                    .set_style(Style::default().fg(color).bg(theme.bg));
            }
        }
    }

    for popup in &state.popups {
        let rise = (popup.age_ms / POPUP_RISE_MS) as f32;
        let row = popup.row as f32 + 1.0 + rise;
        let Some(y) = row_to_y(inner, row, scroll) else {
            continue;
        };
        let anchor = state
            .stack
            .blocks()
            .get(popup.row)
            .map_or(0.0, |b| b.position);
        let label = if popup.perfect {
            " Perfect! ".to_string()
        } else {
            format!(" +{} ", popup.amount)
        };
        let cx = ((anchor + world_span() / 2.0) * UNIT_COLS).round() as i32;
        let x = i32::from(inner.x) + cx - label.len() as i32 / 2;
        let lo = i32::from(inner.x);
        let hi = (i32::from(inner.x + inner.width) - label.len() as i32).max(lo);
        let x = x.clamp(lo, hi);
        let style = if popup.perfect {
            Style::default().fg(theme.title).bg(theme.bg).bold()
        } else {
            Style::default().fg(theme.main_fg).bg(theme.bg)
        };
        frame.buffer_mut().set_string(x as u16, y, label, style);
    }
}

fn sidebar_block_style(theme: &Theme) -> Style {
    Style::default().fg(theme.div_line).bg(theme.bg)
}

fn draw_sidebar(frame: &mut Frame, state: &GameState, theme: &Theme, area: Rect, best: u32) {
    let title_style = Style::default().fg(theme.title);
    let fg_style = Style::default().fg(theme.main_fg);
    let border_style = sidebar_block_style(theme);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(7), // Stats
            Constraint::Length(1), // gap
            Constraint::Length(6), // Controls
            Constraint::Fill(1),
        ])
        .split(area);

    // --- Stats ---
    let stats_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let stats_inner = stats_block.inner(chunks[0]);
    stats_block.render(chunks[0], frame.buffer_mut());
    let stats_lines = vec![
        Line::from(vec![
            Span::styled("Score: ", title_style),
            Span::styled(state.score.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Best: ", title_style),
            Span::styled(best.to_string(), fg_style),
        ]),
        Line::from(vec![
            Span::styled("Speed: ", title_style),
            Span::styled(
                format!("x{:.2}", state.speed() / game::INITIAL_SPEED),
                fg_style,
            ),
        ]),
        Line::from(vec![
            Span::styled("Tower: ", title_style),
            Span::styled(
                format!("{}", state.stack.height().saturating_sub(1)),
                fg_style,
            ),
        ]),
    ];
    Paragraph::new(ratatui::text::Text::from(stats_lines))
        .render(stats_inner, frame.buffer_mut());

    // --- Controls ---
    let controls_block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style);
    let controls_inner = controls_block.inner(chunks[2]);
    controls_block.render(chunks[2], frame.buffer_mut());
    let controls_lines = vec![
        Line::from(Span::styled("Controls", title_style)),
        Line::from(Span::styled("Space — drop", fg_style)),
        Line::from(Span::styled("P — pause", fg_style)),
        Line::from(Span::styled("Q — quit", fg_style)),
    ];
    Paragraph::new(ratatui::text::Text::from(controls_lines))
        .render(controls_inner, frame.buffer_mut());
}

fn draw_menu(frame: &mut Frame, theme: &Theme, menu_state: &MenuState, area: Rect, now: Instant) {
    let popup_w = 44u16;
    let popup_h = 16u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };

    let title = Line::from(vec![
        Span::styled(" stack ", Style::default().fg(theme.block_color(2)).bold()),
        Span::styled(" tui ", Style::default().fg(theme.main_fg).bold()),
    ]);

    let highlight_style = Style::default()
        .fg(Color::Black)
        .bg(theme.block_color(1))
        .bold();
    let selected_style = Style::default().fg(theme.block_color(1)).bold();
    let normal_style = Style::default().fg(theme.main_fg);

    fn tab_style(current: bool, selected: bool, highlight: Style, select: Style, normal: Style) -> Style {
        if current {
            highlight
        } else if selected {
            select
        } else {
            normal
        }
    }

    let diff_span = |d: Difficulty| {
        Span::styled(
            format!(" {} ", difficulty_label(d)),
            tab_style(
                menu_state.current_tab == MenuTab::Difficulty
                    && menu_state.selected_difficulty == d,
                menu_state.selected_difficulty == d,
                highlight_style,
                selected_style,
                normal_style,
            ),
        )
    };

    let start_btn = if menu_state.current_tab == MenuTab::Start {
        Span::styled(" [ START ] ", highlight_style)
    } else {
        Span::styled(" [ START ] ", normal_style)
    };

    let lines = vec![
        Line::from(""),
        title,
        Line::from(""),
        Line::from(Span::styled(
            " slide · drop · keep the tower aligned ",
            Style::default().fg(theme.inactive_fg),
        )),
        Line::from(""),
        Line::from(Span::styled(
            " ─ DIFFICULTY ─ ",
            Style::default().fg(theme.div_line),
        )),
        Line::from(vec![
            diff_span(Difficulty::Easy),
            Span::from("  "),
            diff_span(Difficulty::Medium),
            Span::from("  "),
            diff_span(Difficulty::Hard),
        ]),
        Line::from(""),
        Line::from(start_btn),
        Line::from(""),
        Line::from(vec![
            Span::styled(" ↕ ", Style::default().fg(theme.block_color(3))),
            Span::from("NAVIGATE   "),
            Span::styled(" ↔ ", Style::default().fg(theme.block_color(3))),
            Span::from("CHANGE   "),
            Span::styled(" SPACE ", Style::default().fg(theme.block_color(3))),
            Span::from("GO"),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            " [Q] QUIT ",
            Style::default().fg(theme.block_color(2)),
        )),
    ];

    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );

    // Startup animation: slide in from the bottom, ease-out cubic.
    let elapsed = now.duration_since(menu_state.animation_start).as_millis() as u32;
    let anim_duration = 500u32;
    let t = (elapsed as f32 / anim_duration as f32).min(1.0);
    let offset_t = 1.0 - (1.0 - t).powi(3);
    let anim_y_offset = ((1.0 - offset_t) * 10.0) as u16;
    let mut anim_popup = popup;
    anim_popup.y += anim_y_offset;

    p.render(anim_popup, frame.buffer_mut());
}

fn draw_pause_overlay(frame: &mut Frame, theme: &Theme, area: Rect) {
    let popup_w = 28u16;
    let popup_h = 5u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
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
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_quit_menu(frame: &mut Frame, theme: &Theme, area: Rect, selected: QuitOption) {
    let popup_w = 28u16;
    let popup_h = 7u16;
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let entry = |label: &str, opt: QuitOption| {
        let style = if selected == opt {
            Style::default().fg(Color::Black).bg(theme.block_color(1)).bold()
        } else {
            Style::default().fg(theme.main_fg)
        };
        Line::from(Span::styled(format!(" {label} "), style))
    };
    let lines = vec![
        Line::from(""),
        entry("Resume", QuitOption::Resume),
        entry("Main menu", QuitOption::MainMenu),
        entry("Exit", QuitOption::Exit),
        Line::from(""),
    ];
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg)),
    );
    p.render(popup, frame.buffer_mut());
}

fn draw_game_over(
    frame: &mut Frame,
    state: &GameState,
    theme: &Theme,
    area: Rect,
    best: u32,
    new_high_score: bool,
) {
    let popup_w = 30u16;
    let popup_h = if new_high_score { 11u16 } else { 10u16 };
    let popup = Rect {
        x: area.x + area.width.saturating_sub(popup_w) / 2,
        y: area.y + area.height.saturating_sub(popup_h) / 2,
        width: popup_w.min(area.width),
        height: popup_h.min(area.height),
    };
    let mut lines: Vec<Line> = vec![
        Line::from(""),
        Line::from(Span::styled(
            " Game Over ",
            Style::default().fg(Color::White).bg(Color::Red),
        )),
        Line::from(""),
        Line::from(Span::styled(
            format!(" Score: {} ", state.score),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Best: {best} "),
            Style::default().fg(theme.main_fg),
        )),
        Line::from(Span::styled(
            format!(" Tower: {} ", state.stack.height().saturating_sub(1)),
            Style::default().fg(theme.main_fg),
        )),
    ];
    if new_high_score {
        lines.push(Line::from(Span::styled(
            " New record! ",
            Style::default().fg(Color::Yellow).bold(),
        )));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " R — Restart    Q — Quit ",
        Style::default().fg(theme.main_fg),
    )));
    let p = Paragraph::new(lines).alignment(Alignment::Center).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.div_line).bg(theme.bg))
            .title(Span::styled(" stacktui ", theme.title)),
    );
    p.render(popup, frame.buffer_mut());
}
