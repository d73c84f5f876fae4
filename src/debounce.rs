//! Gesture debouncing — converts noisy per-frame classifications into
//! discrete confirmed events.
//!
//! Two independent gating paths share one cooldown clock: single-hand
//! digits pass a stillness + changed-digit gate, two-hand gestures pass
//! an N-frame unanimity buffer.  Raw classification flips during hand
//! transitions must never reach the expression, and a held gesture must
//! not repeat-fire every frame.

use std::collections::VecDeque;

use tracing::debug;

use crate::hand::{GestureToken, LandmarkPoint, Op};

// ── Confirmed events ───────────────────────────────────────

/// A debounce-confirmed calculator event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalcEvent {
    Digit(u8),
    Operator(Op),
    Delete,
    Clear,
    Evaluate,
    Exit,
}

impl CalcEvent {
    /// String representation for IPC and logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Digit(d) => GestureToken::Digit(*d).as_str(),
            Self::Operator(op) => GestureToken::Operator(*op).as_str(),
            Self::Delete => "del",
            Self::Clear => "clear",
            Self::Evaluate => "=",
            Self::Exit => "exit",
        }
    }
}

// ── Per-frame input ────────────────────────────────────────

/// What one frame contributes to the debouncer, after counting and
/// classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameSignal {
    /// No hands detected this frame.
    NoHands,
    /// Exactly one hand: a candidate digit plus the wrist position used
    /// for the movement gate.
    Digit { value: u8, wrist: LandmarkPoint },
    /// Exactly two hands: the classified gesture token (possibly `None`).
    Gesture(GestureToken),
}

// ── Config ─────────────────────────────────────────────────

/// Debounce tuning.
#[derive(Debug, Clone)]
pub struct DebounceConfig {
    /// Consecutive identical frames required to confirm a two-hand gesture.
    pub buffer_size: usize,
    /// Minimum seconds between any two confirmed events.
    pub cooldown_s: f64,
    /// Maximum wrist travel (normalized coordinates) between consecutive
    /// frames for a digit to count as held still.
    pub movement_threshold: f32,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            buffer_size: 3,
            cooldown_s: 1.25,
            movement_threshold: 0.03,
        }
    }
}

// ── Engine ─────────────────────────────────────────────────

/// Stateful debouncer.  One instance per session; frame timestamps are
/// monotone seconds supplied by the caller.
#[derive(Debug)]
pub struct DebounceEngine {
    pub config: DebounceConfig,
    /// Sliding window of raw two-hand tokens, oldest first.
    buffer: VecDeque<GestureToken>,
    /// Timestamp of the last confirmed event; None until the first one.
    last_confirmed_s: Option<f64>,
    /// Last confirmed digit, cleared when the hand disappears.
    last_digit: Option<u8>,
    /// Previous frame's wrist position for the movement gate.
    last_wrist: Option<LandmarkPoint>,
}

impl DebounceEngine {
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            buffer: VecDeque::with_capacity(config.buffer_size),
            config,
            last_confirmed_s: None,
            last_digit: None,
            last_wrist: None,
        }
    }

    /// Whether the cooldown window since the last confirmation has passed.
    fn cooldown_elapsed(&self, now_s: f64) -> bool {
        match self.last_confirmed_s {
            Some(t) => now_s - t > self.config.cooldown_s,
            None => true,
        }
    }

    /// Feed one frame.  Returns a confirmed event on the rare frame that
    /// passes all gates.
    pub fn observe(&mut self, signal: FrameSignal, now_s: f64) -> Option<CalcEvent> {
        match signal {
            FrameSignal::NoHands => {
                // Occlusion gap: drop transient memory, keep the cooldown
                // clock running.
                self.buffer.clear();
                self.last_digit = None;
                self.last_wrist = None;
                None
            }
            FrameSignal::Digit { value, wrist } => self.observe_digit(value, wrist, now_s),
            FrameSignal::Gesture(token) => self.observe_gesture(token, now_s),
        }
    }

    fn observe_digit(
        &mut self,
        value: u8,
        wrist: LandmarkPoint,
        now_s: f64,
    ) -> Option<CalcEvent> {
        // First sample after a reset has no reference position and counts
        // as stationary.
        let movement = self
            .last_wrist
            .map(|prev| prev.distance_2d(&wrist))
            .unwrap_or(0.0);
        self.last_wrist = Some(wrist);

        if !self.cooldown_elapsed(now_s) || movement >= self.config.movement_threshold {
            return None;
        }
        if self.last_digit == Some(value) {
            return None;
        }

        self.last_digit = Some(value);
        self.last_confirmed_s = Some(now_s);
        debug!(digit = value, "digit confirmed");
        Some(CalcEvent::Digit(value))
    }

    fn observe_gesture(&mut self, token: GestureToken, now_s: f64) -> Option<CalcEvent> {
        // Every two-hand frame occupies a slot, `none` included, so a
        // flickering classification breaks unanimity.
        if self.buffer.len() >= self.config.buffer_size {
            self.buffer.pop_front();
        }
        self.buffer.push_back(token);

        if token == GestureToken::None
            || self.buffer.len() < self.config.buffer_size
            || !self.buffer.iter().all(|t| *t == token)
            || !self.cooldown_elapsed(now_s)
        {
            return None;
        }

        self.buffer.clear();
        self.last_confirmed_s = Some(now_s);
        debug!(token = token.as_str(), "gesture confirmed");
        Some(match token {
            GestureToken::Digit(d) => CalcEvent::Digit(d),
            GestureToken::Operator(op) => CalcEvent::Operator(op),
            GestureToken::Delete => CalcEvent::Delete,
            GestureToken::Clear => CalcEvent::Clear,
            GestureToken::Equals => CalcEvent::Evaluate,
            GestureToken::Exit => CalcEvent::Exit,
            GestureToken::None => unreachable!("none is filtered above"),
        })
    }

    /// Full reset: clear all transient memory and stamp the cooldown so
    /// nothing confirms for one full delay.  Used by the exit gesture.
    pub fn reset(&mut self, now_s: f64) {
        self.buffer.clear();
        self.last_digit = None;
        self.last_wrist = None;
        self.last_confirmed_s = Some(now_s);
    }
}

impl Default for DebounceEngine {
    fn default() -> Self {
        Self::new(DebounceConfig::default())
    }
}

// ── Tests ──────────────────────────────────────────────────
