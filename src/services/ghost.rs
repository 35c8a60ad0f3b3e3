//! Ghost cursor simulator: procedural crowd of synthetic participants.
//!
//! DESIGN
//! ======
//! Each ghost runs a three-phase state machine:
//!
//! 1. Approach: eased, incremental pursuit of a target inside a vote zone.
//!    Every tick moves `(target - position) * ease(p) * 0.1`, so arrival is
//!    an under-damped exponential approach rather than a straight lerp.
//! 2. Settle: blends from where the approach ended toward the live idle
//!    position over a fixed window so there is no visible snap.
//! 3. Idle: coherent-noise wander around the settle center, with per-ghost
//!    speed and radius drawn once at spawn.
//!
//! The simulator never touches the network. `tick` and `disable` return the
//! positions the room should broadcast as presence events.
//!
//! INVARIANTS
//! ==========
//! - Every position returned lies in `[0, 100]` on both axes.
//! - The population is created and destroyed as a whole.
//! - The observed active id is a change-detection hint; the queue stays the
//!   source of truth and is re-read every tick.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::RoomConfig;
use crate::protocol::{Position, SENTINEL_STATEMENT_ID};
use crate::services::noise::noise2d;
use crate::services::queue::Queue;

/// Fraction of the remaining distance covered per tick at full ease.
const APPROACH_GAIN: f64 = 0.1;
/// Distance at which an approaching ghost counts as arrived.
const ARRIVAL_DISTANCE: f64 = 2.0;
/// Time scale applied to the idle noise input.
const WANDER_TIME_SCALE: f64 = 0.0005;
/// Share of the lead time used for random start delay and early finish.
const JITTER_FRACTION: f64 = 0.2;
/// Share of ghosts drawn from the restless population.
const ACTIVE_SHARE: f64 = 0.3;

const CANVAS_MIN: f64 = 0.0;
const CANVAS_MAX: f64 = 100.0;

// =============================================================================
// GEOMETRY
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    #[must_use]
    pub fn clamped(self) -> Self {
        Self { x: self.x.clamp(CANVAS_MIN, CANVAS_MAX), y: self.y.clamp(CANVAS_MIN, CANVAS_MAX) }
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_on_canvas(self) -> bool {
        (CANVAS_MIN..=CANVAS_MAX).contains(&self.x) && (CANVAS_MIN..=CANVAS_MAX).contains(&self.y)
    }

    fn lerp(self, to: Self, t: f64) -> Self {
        Self { x: self.x + (to.x - self.x) * t, y: self.y + (to.y - self.y) * t }
    }
}

/// Named regions ghosts head for when the active statement changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Agree,
    Pass,
    Disagree,
    /// Center holding area used once the session has ended.
    Lobby,
}

impl Zone {
    pub const VOTE_ZONES: [Zone; 3] = [Zone::Agree, Zone::Pass, Zone::Disagree];

    /// Inclusive `(min, max)` corners in canvas units.
    #[must_use]
    pub fn bounds(self) -> (Point, Point) {
        match self {
            Self::Agree => (Point::new(8.0, 30.0), Point::new(30.0, 75.0)),
            Self::Pass => (Point::new(40.0, 30.0), Point::new(60.0, 75.0)),
            Self::Disagree => (Point::new(70.0, 30.0), Point::new(92.0, 75.0)),
            Self::Lobby => (Point::new(35.0, 80.0), Point::new(65.0, 95.0)),
        }
    }

    #[cfg(test)]
    #[must_use]
    pub fn contains(self, p: Point) -> bool {
        let (min, max) = self.bounds();
        (min.x..=max.x).contains(&p.x) && (min.y..=max.y).contains(&p.y)
    }

    fn random_point(self, rng: &mut impl Rng) -> Point {
        let (min, max) = self.bounds();
        Point::new(rng.random_range(min.x..=max.x), rng.random_range(min.y..=max.y))
    }
}

/// Cubic ease-in-out on `[0, 1]`.
#[must_use]
pub fn ease_in_out_cubic(p: f64) -> f64 {
    if p < 0.5 { 4.0 * p * p * p } else { 1.0 - (-2.0 * p + 2.0).powi(3) / 2.0 }
}

// =============================================================================
// GHOST CURSOR
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Approach,
    Settle,
    Idle,
}

#[derive(Debug, Clone)]
pub struct GhostCursor {
    pub id: String,
    pub position: Point,
    pub target: Point,
    pub phase: Phase,
    pub phase_start: i64,
    /// Approach: hold still this long after `phase_start` before moving.
    pub start_delay: i64,
    pub phase_duration: i64,
    /// Where the last approach ended; the settle blend starts here.
    pub settle_from: Point,
    pub settle_center: Point,
    pub noise_seed_x: f64,
    pub noise_seed_y: f64,
    pub wander_speed: f64,
    pub wander_radius: f64,
}

impl GhostCursor {
    /// Position of the idle wander at `now`.
    #[must_use]
    pub fn idle_position(&self, now: i64) -> Point {
        let t = now as f64 * WANDER_TIME_SCALE * self.wander_speed;
        Point::new(
            self.settle_center.x + noise2d(self.noise_seed_x, t) * self.wander_radius,
            self.settle_center.y + noise2d(self.noise_seed_y, t) * self.wander_radius,
        )
    }

    fn begin_approach(&mut self, target: Point, now: i64, start_delay: i64, duration: i64) {
        self.target = target;
        self.phase = Phase::Approach;
        self.phase_start = now;
        self.start_delay = start_delay;
        self.phase_duration = duration;
    }

    fn begin_settle(&mut self, now: i64, settle_ms: i64) {
        self.settle_from = self.position;
        self.settle_center = self.target;
        self.phase = Phase::Settle;
        self.phase_start = now;
        self.start_delay = 0;
        self.phase_duration = settle_ms;
    }

    /// Move one tick forward and clamp to the canvas.
    pub(crate) fn advance(&mut self, now: i64, settle_ms: i64) {
        match self.phase {
            Phase::Approach => {
                let elapsed = now - self.phase_start - self.start_delay;
                if elapsed >= 0 {
                    let p = (elapsed as f64 / self.phase_duration.max(1) as f64).clamp(0.0, 1.0);
                    let step = ease_in_out_cubic(p) * APPROACH_GAIN;
                    self.position.x += (self.target.x - self.position.x) * step;
                    self.position.y += (self.target.y - self.position.y) * step;
                    if self.position.distance(self.target) < ARRIVAL_DISTANCE || p >= 1.0 {
                        self.begin_settle(now, settle_ms);
                    }
                }
            }
            Phase::Settle => {
                let q = ((now - self.phase_start) as f64 / self.phase_duration.max(1) as f64).clamp(0.0, 1.0);
                let idle = self.idle_position(now);
                self.position = self.settle_from.lerp(idle, ease_in_out_cubic(q));
                if q >= 1.0 {
                    self.phase = Phase::Idle;
                }
            }
            Phase::Idle => {
                self.position = self.idle_position(now);
            }
        }
        self.position = self.position.clamped();
    }

    fn presence(&self, now: i64) -> Position {
        Position { x: self.position.x, y: self.position.y, timestamp: now, user_id: self.id.clone() }
    }
}

// =============================================================================
// SIMULATOR
// =============================================================================

pub struct Simulator {
    config: RoomConfig,
    cursors: Vec<GhostCursor>,
    enabled: bool,
    last_observed_active_id: Option<i64>,
    rng: StdRng,
}

impl Simulator {
    #[must_use]
    pub fn new(config: RoomConfig) -> Self {
        Self::with_rng(config, StdRng::from_os_rng())
    }

    #[must_use]
    pub fn with_rng(config: RoomConfig, rng: StdRng) -> Self {
        Self { config, cursors: Vec::new(), enabled: false, last_observed_active_id: None, rng }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    #[must_use]
    pub fn cursors(&self) -> &[GhostCursor] {
        &self.cursors
    }

    #[cfg(test)]
    pub fn last_observed_active_id(&self) -> Option<i64> {
        self.last_observed_active_id
    }

    /// Spawn the whole population at the canvas edges, replacing any
    /// existing ghosts.
    pub fn enable(&mut self, queue: &Queue, now: i64) {
        let active_id = queue.active_id(now);
        let lead = self.lead_time(queue, now);

        let mut cursors = Vec::with_capacity(self.config.ghost_count);
        for index in 0..self.config.ghost_count {
            let entry = self.edge_point();
            let mut cursor = self.spawn_cursor(index, entry);
            let target = self.pick_target(active_id);
            let (start_delay, duration) = self.approach_timing(lead);
            cursor.begin_approach(target, now, start_delay, duration);
            cursors.push(cursor);
        }

        self.cursors = cursors;
        self.enabled = true;
        self.last_observed_active_id = Some(active_id);
    }

    /// Tear down the population. Returns one final position per ghost for
    /// the room to announce as `remove` events.
    pub fn disable(&mut self, now: i64) -> Vec<Position> {
        if !self.enabled {
            return Vec::new();
        }
        self.enabled = false;
        self.last_observed_active_id = None;
        std::mem::take(&mut self.cursors)
            .iter()
            .map(|cursor| cursor.presence(now))
            .collect()
    }

    /// Advance every ghost one tick and return their positions. Retargets
    /// the whole crowd first if the active statement changed.
    pub fn tick(&mut self, queue: &Queue, now: i64) -> Vec<Position> {
        if !self.enabled {
            return Vec::new();
        }

        let active_id = queue.active_id(now);
        if self.last_observed_active_id != Some(active_id) {
            self.last_observed_active_id = Some(active_id);
            self.retarget(queue, active_id, now);
        }

        let settle_ms = self.config.settle_ms;
        self.cursors
            .iter_mut()
            .map(|cursor| {
                cursor.advance(now, settle_ms);
                cursor.presence(now)
            })
            .collect()
    }

    fn retarget(&mut self, queue: &Queue, active_id: i64, now: i64) {
        let lead = self.lead_time(queue, now);
        let mut cursors = std::mem::take(&mut self.cursors);
        for cursor in &mut cursors {
            let target = self.pick_target(active_id);
            let (start_delay, duration) = self.approach_timing(lead);
            cursor.begin_approach(target, now, start_delay, duration);
        }
        self.cursors = cursors;
    }

    /// Estimated time until the next scheduled activation, or the normal
    /// activation delay when nothing is pending.
    fn lead_time(&self, queue: &Queue, now: i64) -> i64 {
        queue
            .next_activation_after(now)
            .map_or(self.config.activation_delay_ms, |t| t - now)
    }

    /// Random start delay and approach duration for a given lead time.
    #[allow(clippy::cast_possible_truncation)]
    fn approach_timing(&mut self, lead: i64) -> (i64, i64) {
        let lead_f = lead.max(0) as f64;
        let start_delay = (self.rng.random_range(0.0..=JITTER_FRACTION) * lead_f) as i64;
        let early_finish = (self.rng.random_range(0.0..=JITTER_FRACTION) * lead_f) as i64;
        let duration = (lead - start_delay - early_finish).max(self.config.min_approach_ms);
        (start_delay, duration)
    }

    fn pick_target(&mut self, active_id: i64) -> Point {
        let zone = if active_id == SENTINEL_STATEMENT_ID {
            Zone::Lobby
        } else {
            Zone::VOTE_ZONES[self.rng.random_range(0..Zone::VOTE_ZONES.len())]
        };
        zone.random_point(&mut self.rng)
    }

    fn edge_point(&mut self) -> Point {
        let along = self.rng.random_range(CANVAS_MIN..=CANVAS_MAX);
        match self.rng.random_range(0..4) {
            0 => Point::new(along, CANVAS_MIN),
            1 => Point::new(CANVAS_MAX, along),
            2 => Point::new(along, CANVAS_MAX),
            _ => Point::new(CANVAS_MIN, along),
        }
    }

    fn spawn_cursor(&mut self, index: usize, entry: Point) -> GhostCursor {
        let (wander_speed, wander_radius) = if self.rng.random_bool(ACTIVE_SHARE) {
            (self.rng.random_range(0.8..=1.5), self.rng.random_range(4.0..=8.0))
        } else {
            (self.rng.random_range(0.2..=0.6), self.rng.random_range(2.0..=5.0))
        };
        GhostCursor {
            id: format!("ghost-{index}"),
            position: entry,
            target: entry,
            phase: Phase::Approach,
            phase_start: 0,
            start_delay: 0,
            phase_duration: self.config.min_approach_ms,
            settle_from: entry,
            settle_center: entry,
            noise_seed_x: self.rng.random_range(0.0..1000.0),
            noise_seed_y: self.rng.random_range(1000.0..2000.0),
            wander_speed,
            wander_radius,
        }
    }
}

#[cfg(test)]
#[path = "ghost_test.rs"]
mod tests;
