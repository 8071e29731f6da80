//! Game state: trim geometry, block stack, slide motion, speed ramp, session.

use std::time::{Duration, Instant};
use thiserror::Error;

/// Half-range of the slide; the active block's center stays in [-BOUNDS, BOUNDS].
pub const BOUNDS: f32 = 5.0;

/// Footprint of the base block, world units.
pub const BASE_WIDTH: f32 = 3.0;
pub const BASE_DEPTH: f32 = 3.0;

/// Starting slide speed in world units per reference frame.
pub const INITIAL_SPEED: f32 = 0.08;

/// Speed added per successful placement. The ramp has no cap.
pub const SPEED_INCREASE: f32 = 0.002;

/// Reference frame duration (60 Hz) that `dt` is normalized against.
pub const FRAME_REF_MS: f32 = 1000.0 / 60.0;

/// Elapsed wall time per step is capped here so a stall cannot teleport the block.
pub const MAX_STEP_MS: f32 = 100.0;

/// Overhang below this reads as a perfect drop. Cosmetic: popups and audio
/// only, the trim math is never rounded.
const PERFECT_EPSILON: f32 = 0.08;

/// Debris fall acceleration, rows per reference frame squared.
const DEBRIS_GRAVITY: f32 = 0.02;

/// Debris is culled once it has fallen this many rows past its spawn row.
const DEBRIS_CULL_ROWS: f32 = 30.0;

/// Camera approach factor per reference frame.
const CAMERA_LERP: f32 = 0.12;

/// Score popups live this long.
const POPUP_LIFETIME_MS: u32 = 1200;

/// Normalized time step: elapsed wall time (capped) over the reference frame,
/// so slide speed is independent of the terminal's refresh rate.
pub fn normalized_dt(elapsed: Duration) -> f32 {
    let ms = (elapsed.as_secs_f32() * 1000.0).min(MAX_STEP_MS);
    ms / FRAME_REF_MS
}

/// Precondition violations. None of these can occur through the normal
/// tick/place flow; they mark caller bugs, not gameplay outcomes.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("stack has no blocks")]
    EmptyStack,
    #[error("an active block is already in flight")]
    ActiveInFlight,
    #[error("no active block to place")]
    NoActiveBlock,
}

/// One block of the tower. `position` is the horizontal center; width and
/// depth stay positive, and a placed block's width is final.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Block {
    pub position: f32,
    pub width: f32,
    pub depth: f32,
    pub moving: bool,
}

/// Outcome of trimming a sliding block against the block beneath it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Landing {
    /// The block left the footprint beneath entirely. An exact edge-to-edge
    /// tie counts as a miss: no overlap survives.
    Miss { overhang: f32 },
    /// The block overlaps: the kept part and where the cut-off remainder goes.
    Hit {
        overhang: f32,
        new_width: f32,
        /// Center of the surviving part.
        position: f32,
        /// Side the block was hanging over: +1.0 right, -1.0 left.
        direction: f32,
        /// Center of the remainder, on the far side of the kept part.
        debris_position: f32,
    },
}

/// Overlap/trim computation. Pure; the only failure mode is `Landing::Miss`.
pub fn trim(moving_pos: f32, moving_width: f32, base_pos: f32) -> Landing {
    let delta = moving_pos - base_pos;
    let overhang = delta.abs();
    if overhang >= moving_width {
        return Landing::Miss { overhang };
    }
    // A dead-center drop has no overhang, so the side choice is arbitrary.
    let direction = if delta > 0.0 { 1.0 } else { -1.0 };
    let new_width = moving_width - overhang;
    let position = moving_pos - delta / 2.0;
    let debris_position = position + direction * (new_width / 2.0 + overhang / 2.0);
    Landing::Hit {
        overhang,
        new_width,
        position,
        direction,
        debris_position,
    }
}

/// Slide the block one step. On leaving the bounds the direction flips and
/// the position is clamped back onto the edge.
pub fn advance(position: f32, speed: f32, direction: f32, dt: f32) -> (f32, f32) {
    let next = position + speed * direction * dt;
    if next.abs() > BOUNDS {
        (next.clamp(-BOUNDS, BOUNDS), -direction)
    } else {
        (next, direction)
    }
}

/// Slide speed ramp: one fixed increment per successful placement, never down.
#[derive(Debug, Clone, Copy)]
pub struct Pace {
    speed: f32,
}

impl Pace {
    pub fn new(initial: f32) -> Self {
        Self { speed: initial }
    }

    pub fn bump(&mut self) {
        self.speed += SPEED_INCREASE;
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.speed
    }
}

/// The tower: placed blocks (append-only, index 0 is the base) plus at most
/// one sliding block.
#[derive(Debug, Clone)]
pub struct Stack {
    placed: Vec<Block>,
    active: Option<Block>,
}

impl Stack {
    pub fn new(base_width: f32, base_depth: f32) -> Self {
        let base = Block {
            position: 0.0,
            width: base_width,
            depth: base_depth,
            moving: false,
        };
        Self {
            placed: vec![base],
            active: None,
        }
    }

    /// Most recently placed block. `EmptyStack` is only possible before the
    /// base block exists, which the constructor rules out.
    pub fn top(&self) -> Result<&Block, GameError> {
        self.placed.last().ok_or(GameError::EmptyStack)
    }

    /// Number of placed blocks; the next sliding block travels at this row.
    #[inline]
    pub fn height(&self) -> usize {
        self.placed.len()
    }

    pub fn blocks(&self) -> &[Block] {
        &self.placed
    }

    pub fn active(&self) -> Option<&Block> {
        self.active.as_ref()
    }

    pub fn active_mut(&mut self) -> Option<&mut Block> {
        self.active.as_mut()
    }

    /// Spawn the next sliding block with the top block's footprint, entering
    /// at the negative bound edge.
    pub fn spawn_next(&mut self) -> Result<(), GameError> {
        if self.active.is_some() {
            return Err(GameError::ActiveInFlight);
        }
        let top = *self.top()?;
        self.active = Some(Block {
            position: -BOUNDS,
            width: top.width,
            depth: top.depth,
            moving: true,
        });
        Ok(())
    }

    /// Trim the active block against the top of the stack. A hit appends the
    /// kept part; a miss leaves the placed blocks untouched. The consumed
    /// active block is handed back so the caller can drop it as debris.
    pub fn place_active(&mut self) -> Result<(Landing, Block), GameError> {
        let active = self.active.take().ok_or(GameError::NoActiveBlock)?;
        let top = self.top()?;
        let landing = trim(active.position, active.width, top.position);
        if let Landing::Hit {
            new_width, position, ..
        } = landing
        {
            self.placed.push(Block {
                position,
                width: new_width,
                depth: active.depth,
                moving: false,
            });
        }
        Ok((landing, active))
    }
}

/// A trimmed-off remainder (or a whole missed block) falling away from the
/// tower. Visual only; it never feeds back into the geometry.
#[derive(Debug, Clone, Copy)]
pub struct Debris {
    pub position: f32,
    pub width: f32,
    /// Row it broke off from.
    pub row: usize,
    /// Rows fallen so far.
    pub drop: f32,
    vel: f32,
    pub color_index: u8,
}

/// "+1" marker floating above a fresh placement.
#[derive(Debug, Clone, Copy)]
pub struct ScorePopup {
    pub row: usize,
    pub amount: u32,
    pub perfect: bool,
    pub age_ms: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// A block is sliding and can be placed.
    Running,
    /// Between a successful placement and the next spawn; placement requests
    /// are ignored here, not queued.
    Placing,
    /// Terminal. Nothing moves and nothing flips this back.
    Ended,
}

/// What a placement request came to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceOutcome {
    /// Arrived during the spawn window or after the end; nothing changed.
    Ignored,
    Placed { perfect: bool },
    GameOver,
}

/// Tower palette index for a row.
#[inline]
pub fn color_for_row(row: usize) -> u8 {
    (row % 6) as u8
}

/// One run of the game: the tower, the sliding block, score, speed, and the
/// spawn timer, driven by `tick` and `place` from the app loop.
#[derive(Debug)]
pub struct GameState {
    pub stack: Stack,
    pub debris: Vec<Debris>,
    pub popups: Vec<ScorePopup>,
    pub score: u32,
    pace: Pace,
    direction: f32,
    phase: Phase,
    /// One-shot spawn timer; Some exactly while phase is `Placing`.
    spawn_at: Option<Instant>,
    spawn_delay: Duration,
    /// Smoothed camera row trailing the top of the tower.
    pub camera: f32,
}

impl GameState {
    pub fn new(config: &crate::GameConfig) -> Result<Self, GameError> {
        let mut stack = Stack::new(BASE_WIDTH, BASE_DEPTH);
        stack.spawn_next()?;
        Ok(Self {
            stack,
            debris: Vec::new(),
            popups: Vec::new(),
            score: 0,
            pace: Pace::new(config.initial_speed),
            direction: 1.0,
            phase: Phase::Running,
            spawn_at: None,
            spawn_delay: Duration::from_millis(config.spawn_delay_ms),
            camera: 1.0,
        })
    }

    #[inline]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[inline]
    pub fn ended(&self) -> bool {
        self.phase == Phase::Ended
    }

    #[inline]
    pub fn speed(&self) -> f32 {
        self.pace.speed()
    }

    #[inline]
    pub fn direction(&self) -> f32 {
        self.direction
    }

    /// Advance one frame: fire a due spawn, slide the active block, trail the
    /// camera, move debris. No-op once ended.
    pub fn tick(&mut self, now: Instant, dt: f32) -> Result<(), GameError> {
        if self.phase == Phase::Ended {
            return Ok(());
        }
        let mut spawned = false;
        if let Some(at) = self.spawn_at {
            if now >= at {
                self.stack.spawn_next()?;
                self.spawn_at = None;
                // The new block enters at the negative edge, heading right.
                self.direction = 1.0;
                self.phase = Phase::Running;
                spawned = true;
            }
        }
        // A freshly spawned block starts moving on the next tick.
        if self.phase == Phase::Running && !spawned {
            if let Some(active) = self.stack.active_mut() {
                let (pos, dir) = advance(active.position, self.pace.speed(), self.direction, dt);
                active.position = pos;
                self.direction = dir;
            }
        }
        let target = self.stack.height() as f32;
        self.camera += (target - self.camera) * (CAMERA_LERP * dt).min(1.0);
        self.tick_debris(dt);
        Ok(())
    }

    /// Player input: trim the sliding block against the stack top. Repeated
    /// requests during the spawn window are dropped (debounce, not a queue).
    pub fn place(&mut self, now: Instant) -> Result<PlaceOutcome, GameError> {
        match self.phase {
            Phase::Placing | Phase::Ended => return Ok(PlaceOutcome::Ignored),
            Phase::Running => {}
        }
        let row = self.stack.height();
        let (landing, block) = self.stack.place_active()?;
        match landing {
            Landing::Miss { .. } => {
                self.phase = Phase::Ended;
                self.spawn_at = None;
                self.debris.push(Debris {
                    position: block.position,
                    width: block.width,
                    row,
                    drop: 0.0,
                    vel: 0.0,
                    color_index: color_for_row(row),
                });
                Ok(PlaceOutcome::GameOver)
            }
            Landing::Hit {
                overhang,
                debris_position,
                ..
            } => {
                self.score += 1;
                self.pace.bump();
                let perfect = overhang < PERFECT_EPSILON;
                self.popups.push(ScorePopup {
                    row,
                    amount: 1,
                    perfect,
                    age_ms: 0,
                });
                if overhang > f32::EPSILON {
                    self.debris.push(Debris {
                        position: debris_position,
                        width: overhang,
                        row,
                        drop: 0.0,
                        vel: 0.0,
                        color_index: color_for_row(row),
                    });
                }
                self.spawn_at = Some(now + self.spawn_delay);
                self.phase = Phase::Placing;
                Ok(PlaceOutcome::Placed { perfect })
            }
        }
    }

    /// External termination (quitting mid-run). One-way and idempotent, and
    /// cancels the pending spawn so a block can never appear in an ended run.
    pub fn end(&mut self) {
        self.phase = Phase::Ended;
        self.spawn_at = None;
    }

    fn tick_debris(&mut self, dt: f32) {
        for d in &mut self.debris {
            d.vel += DEBRIS_GRAVITY * dt;
            d.drop += d.vel * dt;
        }
        self.debris.retain(|d| d.drop < DEBRIS_CULL_ROWS);
    }

    /// Age popups by wall time and drop the expired ones.
    pub fn tick_popups(&mut self, delta_ms: u32) {
        self.popups.retain_mut(|p| {
            p.age_ms += delta_ms;
            p.age_ms < POPUP_LIFETIME_MS
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Difficulty, GameConfig};

    fn config() -> GameConfig {
        GameConfig {
            difficulty: Difficulty::Easy,
            initial_speed: INITIAL_SPEED,
            spawn_delay_ms: 300,
            sound: false,
        }
    }

    fn state() -> GameState {
        GameState::new(&config()).unwrap()
    }

    /// Drop the active block at an exact position and place it.
    fn place_at(state: &mut GameState, pos: f32, now: Instant) -> PlaceOutcome {
        state.stack.active_mut().unwrap().position = pos;
        state.place(now).unwrap()
    }

    /// Run the spawn timer out so the next block is in flight.
    fn wait_for_spawn(state: &mut GameState, now: Instant) -> Instant {
        let later = now + Duration::from_millis(400);
        state.tick(later, 1.0).unwrap();
        later
    }

    #[test]
    fn trim_dead_center_is_perfect() {
        match trim(0.0, 3.0, 0.0) {
            Landing::Hit {
                overhang,
                new_width,
                position,
                direction,
                ..
            } => {
                assert_eq!(overhang, 0.0);
                assert_eq!(new_width, 3.0);
                assert_eq!(position, 0.0);
                assert_eq!(direction, -1.0);
            }
            Landing::Miss { .. } => panic!("centered drop must hit"),
        }
    }

    #[test]
    fn trim_offset_cuts_to_overlap() {
        match trim(2.0, 3.0, 0.0) {
            Landing::Hit {
                overhang,
                new_width,
                position,
                direction,
                debris_position,
            } => {
                assert_eq!(overhang, 2.0);
                assert_eq!(new_width, 1.0);
                assert_eq!(position, 1.0);
                assert_eq!(direction, 1.0);
                assert_eq!(debris_position, 2.5);
            }
            Landing::Miss { .. } => panic!("partial overlap must hit"),
        }
    }

    #[test]
    fn trim_left_offset_mirrors() {
        match trim(-2.0, 3.0, 0.0) {
            Landing::Hit {
                new_width,
                position,
                direction,
                debris_position,
                ..
            } => {
                assert_eq!(new_width, 1.0);
                assert_eq!(position, -1.0);
                assert_eq!(direction, -1.0);
                assert_eq!(debris_position, -2.5);
            }
            Landing::Miss { .. } => panic!("partial overlap must hit"),
        }
    }

    #[test]
    fn trim_edge_tie_misses() {
        // Overhang equal to the width leaves no overlap.
        assert!(matches!(trim(3.0, 3.0, 0.0), Landing::Miss { overhang } if overhang == 3.0));
        assert!(matches!(trim(4.5, 3.0, 0.0), Landing::Miss { .. }));
    }

    #[test]
    fn trim_new_width_is_width_minus_overhang() {
        for overhang in [0.0_f32, 0.4, 1.2, 2.9] {
            match trim(overhang, 3.0, 0.0) {
                Landing::Hit { new_width, .. } => {
                    assert!((new_width - (3.0 - overhang)).abs() < 1e-6);
                    assert!(new_width > 0.0);
                }
                Landing::Miss { .. } => panic!("overhang {overhang} is below the width"),
            }
        }
    }

    #[test]
    fn advance_scales_with_dt() {
        let (pos, dir) = advance(0.0, 0.08, 1.0, 2.0);
        assert!((pos - 0.16).abs() < 1e-6);
        assert_eq!(dir, 1.0);
    }

    #[test]
    fn advance_reverses_and_clamps_at_bound() {
        let (pos, dir) = advance(4.9, 0.08, 1.0, 2.0);
        assert_eq!(pos, BOUNDS);
        assert_eq!(dir, -1.0);
    }

    #[test]
    fn advance_reverses_at_negative_bound() {
        let (pos, dir) = advance(-4.95, 0.2, -1.0, 1.0);
        assert_eq!(pos, -BOUNDS);
        assert_eq!(dir, 1.0);
        // And the result is always inside the range right after a reversal.
        assert!((-BOUNDS..=BOUNDS).contains(&pos));
    }

    #[test]
    fn pace_ramps_linearly() {
        let mut pace = Pace::new(0.08);
        for _ in 0..5 {
            pace.bump();
        }
        assert!((pace.speed() - 0.09).abs() < 1e-6);
    }

    #[test]
    fn normalized_dt_caps_long_stalls() {
        assert!((normalized_dt(Duration::from_millis(17)) - 17.0 / FRAME_REF_MS).abs() < 1e-3);
        let capped = normalized_dt(Duration::from_secs(2));
        assert!((capped - MAX_STEP_MS / FRAME_REF_MS).abs() < 1e-3);
    }

    #[test]
    fn new_session_has_base_and_sliding_block() {
        let state = state();
        assert_eq!(state.phase(), Phase::Running);
        assert_eq!(state.stack.height(), 1);
        assert!(!state.stack.blocks()[0].moving);
        assert_eq!(state.stack.blocks()[0].position, 0.0);
        let active = state.stack.active().unwrap();
        assert!(active.moving);
        assert_eq!(active.position, -BOUNDS);
        assert_eq!(active.width, BASE_WIDTH);
    }

    #[test]
    fn place_grows_stack_and_score() {
        let mut state = state();
        let now = Instant::now();
        let outcome = place_at(&mut state, 0.0, now);
        assert_eq!(outcome, PlaceOutcome::Placed { perfect: true });
        assert_eq!(state.score, 1);
        assert_eq!(state.stack.height(), 2);
        assert_eq!(state.phase(), Phase::Placing);
        assert!(state.stack.active().is_none());
    }

    #[test]
    fn place_during_spawn_window_is_ignored() {
        let mut state = state();
        let now = Instant::now();
        place_at(&mut state, 0.5, now);
        let (score, height, debris) = (state.score, state.stack.height(), state.debris.len());
        // The debounce drops the request outright; nothing is queued.
        assert_eq!(state.place(now).unwrap(), PlaceOutcome::Ignored);
        assert_eq!(state.place(now).unwrap(), PlaceOutcome::Ignored);
        assert_eq!(state.score, score);
        assert_eq!(state.stack.height(), height);
        assert_eq!(state.debris.len(), debris);
    }

    #[test]
    fn spawn_fires_only_after_delay() {
        let mut state = state();
        let now = Instant::now();
        place_at(&mut state, 0.0, now);
        state.tick(now + Duration::from_millis(100), 1.0).unwrap();
        assert_eq!(state.phase(), Phase::Placing);
        assert!(state.stack.active().is_none());
        wait_for_spawn(&mut state, now);
        assert_eq!(state.phase(), Phase::Running);
        assert!(state.stack.active().is_some());
        assert_eq!(state.direction(), 1.0);
    }

    #[test]
    fn spawn_inherits_trimmed_width() {
        let mut state = state();
        let now = Instant::now();
        place_at(&mut state, 1.0, now);
        let now = wait_for_spawn(&mut state, now);
        let active = state.stack.active().unwrap();
        assert!((active.width - 2.0).abs() < 1e-6);
        assert_eq!(active.position, -BOUNDS);
        // And the trimmed part it inherits from is final.
        let top = state.stack.top().unwrap().position;
        place_at(&mut state, top, now);
        assert!((state.stack.blocks()[1].width - 2.0).abs() < 1e-6);
    }

    #[test]
    fn offcut_spawns_debris_on_the_overhung_side() {
        let mut state = state();
        let now = Instant::now();
        place_at(&mut state, 2.0, now);
        assert_eq!(state.debris.len(), 1);
        let d = &state.debris[0];
        assert!((d.width - 2.0).abs() < 1e-6);
        assert!((d.position - 2.5).abs() < 1e-6);
        assert_eq!(d.row, 1);
        // A clean drop adds no debris.
        let now = wait_for_spawn(&mut state, now);
        let top = state.stack.top().unwrap().position;
        place_at(&mut state, top, now);
        assert_eq!(state.debris.len(), 1);
    }

    #[test]
    fn miss_ends_the_session() {
        let mut state = state();
        let now = Instant::now();
        let outcome = place_at(&mut state, 3.0, now);
        assert_eq!(outcome, PlaceOutcome::GameOver);
        assert!(state.ended());
        assert_eq!(state.score, 0);
        // The whole block falls, the placed list is untouched.
        assert_eq!(state.stack.height(), 1);
        assert_eq!(state.debris.len(), 1);
        assert!((state.debris[0].width - 3.0).abs() < 1e-6);
    }

    #[test]
    fn ended_is_terminal_and_frozen() {
        let mut state = state();
        let now = Instant::now();
        place_at(&mut state, 3.0, now);
        assert!(state.ended());
        // Ticking past the (cancelled) spawn delay must not revive anything.
        let later = now + Duration::from_secs(1);
        state.tick(later, 5.0).unwrap();
        assert!(state.ended());
        assert!(state.stack.active().is_none());
        assert_eq!(state.place(later).unwrap(), PlaceOutcome::Ignored);
        state.end();
        assert!(state.ended());
    }

    #[test]
    fn end_cancels_pending_spawn() {
        let mut state = state();
        let now = Instant::now();
        place_at(&mut state, 0.0, now);
        state.end();
        wait_for_spawn(&mut state, now);
        assert!(state.stack.active().is_none());
        assert!(state.ended());
    }

    #[test]
    fn motion_is_frozen_without_an_active_block() {
        let mut state = state();
        let now = Instant::now();
        place_at(&mut state, 0.0, now);
        let dir = state.direction();
        state.tick(now + Duration::from_millis(10), 3.0).unwrap();
        assert_eq!(state.direction(), dir);
    }

    #[test]
    fn score_and_speed_climb_together() {
        let mut state = state();
        let mut now = Instant::now();
        let mut last_speed = state.speed();
        for expected in 1..=5 {
            let top = state.stack.top().unwrap().position;
            place_at(&mut state, top, now);
            assert_eq!(state.score, expected);
            assert!(state.speed() > last_speed);
            last_speed = state.speed();
            now = wait_for_spawn(&mut state, now);
        }
        assert!((state.speed() - 0.09).abs() < 1e-6);
    }

    #[test]
    fn sliding_block_stays_inside_bounds() {
        let mut state = state();
        let mut now = Instant::now();
        for _ in 0..500 {
            now += Duration::from_millis(16);
            state.tick(now, 1.7).unwrap();
            let pos = state.stack.active().unwrap().position;
            assert!((-BOUNDS..=BOUNDS).contains(&pos));
        }
    }

    #[test]
    fn double_spawn_is_rejected() {
        let mut stack = Stack::new(BASE_WIDTH, BASE_DEPTH);
        stack.spawn_next().unwrap();
        assert!(matches!(stack.spawn_next(), Err(GameError::ActiveInFlight)));
    }

    #[test]
    fn debris_falls_and_is_culled() {
        let mut state = state();
        let now = Instant::now();
        place_at(&mut state, 2.0, now);
        assert_eq!(state.debris.len(), 1);
        for i in 1..=600u64 {
            state.tick(now + Duration::from_millis(i), 1.0).unwrap();
        }
        assert!(state.debris.is_empty());
    }

    #[test]
    fn popups_expire() {
        let mut state = state();
        place_at(&mut state, 0.3, Instant::now());
        assert_eq!(state.popups.len(), 1);
        assert!(!state.popups[0].perfect);
        state.tick_popups(600);
        assert_eq!(state.popups.len(), 1);
        state.tick_popups(700);
        assert!(state.popups.is_empty());
    }
}
