//! Per-stream calculator session.
//!
//! One `CalcSession` per user/camera stream: owns the debounce engine,
//! the expression state, and a speech handle.  Concurrent sessions (for
//! example several tracker clients) each get their own instance —
//! nothing here is process-global.

use tracing::debug;

use crate::debounce::{CalcEvent, DebounceConfig, DebounceEngine, FrameSignal};
use crate::expression::{EventOutcome, ExpressionState};
use crate::hand::{classify_pair, count_fingers, HandObservation};
use crate::speech::SpeechHandle;

/// One frame of tracker input: timestamp plus zero, one, or two hand
/// observations.
#[derive(Debug, Clone)]
pub struct FrameInput {
    /// Monotone frame clock in seconds, supplied by the tracker.
    pub time_s: f64,
    pub hands: Vec<HandObservation>,
}

/// What one frame did to the session.
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    /// The event this frame confirmed, if any.
    pub confirmed: Option<CalcEvent>,
    /// Current expression text after the frame.
    pub expression: String,
    /// Current result text after the frame.
    pub result: String,
    /// True when the frame confirmed the exit gesture; the outer frame
    /// loop decides whether to stop.
    pub exit: bool,
}

/// Session context: all mutable calculator state for one stream.
pub struct CalcSession {
    debounce: DebounceEngine,
    state: ExpressionState,
    speech: SpeechHandle,
}

impl CalcSession {
    pub fn new(config: DebounceConfig, speech: SpeechHandle) -> Self {
        Self {
            debounce: DebounceEngine::new(config),
            state: ExpressionState::new(),
            speech,
        }
    }

    /// Route one frame through counting, classification, debouncing, and
    /// the expression reducer.
    pub fn process_frame(&mut self, frame: &FrameInput) -> FrameOutcome {
        let signal = match frame.hands.as_slice() {
            [] => FrameSignal::NoHands,
            [hand] => FrameSignal::Digit {
                value: count_fingers(hand),
                wrist: hand.wrist(),
            },
            [h1, h2, ..] => FrameSignal::Gesture(classify_pair(h1, h2)),
        };

        let confirmed = self.debounce.observe(signal, frame.time_s);
        let mut exit = false;

        if let Some(event) = confirmed {
            debug!(event = event.as_str(), time_s = frame.time_s, "event confirmed");
            match self.state.apply(event) {
                EventOutcome::Updated => {}
                EventOutcome::Announce(text) => self.speech.say(&text),
                EventOutcome::Exit => {
                    self.debounce.reset(frame.time_s);
                    exit = true;
                }
            }
        }

        FrameOutcome {
            confirmed,
            expression: self.state.expression.clone(),
            result: self.state.result.clone(),
            exit,
        }
    }

    /// External full reset (IPC `reset`): same effect as a confirmed exit
    /// minus the event itself.
    pub fn reset(&mut self, now_s: f64) {
        self.state = ExpressionState::new();
        self.debounce.reset(now_s);
    }

    pub fn expression(&self) -> &str {
        &self.state.expression
    }

    pub fn result(&self) -> &str {
        &self.state.result
    }

    pub fn config(&self) -> &DebounceConfig {
        &self.debounce.config
    }

    pub fn config_mut(&mut self) -> &mut DebounceConfig {
        &mut self.debounce.config
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hand::{HandLandmark, Handedness};
    use crate::speech::{NullSink, SpeechHandle, SpeechSink};

    fn quiet() -> SpeechHandle {
        SpeechHandle::spawn(NullSink)
    }

    fn session() -> CalcSession {
        CalcSession::new(DebounceConfig::default(), quiet())
    }

    /// Single hand showing `n` fingers (left hand geometry).
    fn hand(n: u8) -> HandObservation {
        crate::hand::fingers::make_hand(n, Handedness::Left)
    }

    /// Two-hand frame mapping to the given finger-count pair, index tips
    /// uncrossed.
    fn two_hands(fl: u8, fr: u8) -> Vec<HandObservation> {
        let mut left = crate::hand::fingers::make_hand(fl, Handedness::Left);
        let mut right = crate::hand::fingers::make_hand(fr, Handedness::Right);
        left.landmarks[HandLandmark::IndexTip.index()].x = 0.2;
        right.landmarks[HandLandmark::IndexTip.index()].x = 0.8;
        vec![left, right]
    }

    fn frame(time_s: f64, hands: Vec<HandObservation>) -> FrameInput {
        FrameInput { time_s, hands }
    }

    /// Hold a two-hand gesture until it confirms (3 frames at 30fps).
    fn hold_gesture(session: &mut CalcSession, fl: u8, fr: u8, start_s: f64) -> FrameOutcome {
        let mut last = session.process_frame(&frame(start_s, two_hands(fl, fr)));
        for i in 1..3 {
            last = session.process_frame(&frame(start_s + i as f64 * 0.033, two_hands(fl, fr)));
        }
        last
    }

    #[test]
    fn test_digit_then_operator_then_evaluate() {
        let mut s = session();
        // "1" from a single hand.
        let out = s.process_frame(&frame(0.0, vec![hand(1)]));
        assert_eq!(out.confirmed, Some(CalcEvent::Digit(1)));
        assert_eq!(out.expression, "1");

        // "+" from both hands showing one finger, after the cooldown.
        let out = hold_gesture(&mut s, 1, 1, 2.0);
        assert_eq!(out.expression, "1+");

        // "2" after another cooldown.
        let out = s.process_frame(&frame(4.0, vec![hand(2)]));
        assert_eq!(out.expression, "1+2");

        // "=" (two fists).
        let out = hold_gesture(&mut s, 0, 0, 6.0);
        assert_eq!(out.result, "3");
        assert!(!out.exit);
    }

    #[test]
    fn test_zero_hands_keeps_expression() {
        let mut s = session();
        s.process_frame(&frame(0.0, vec![hand(5)]));
        assert_eq!(s.expression(), "5");
        let out = s.process_frame(&frame(1.0, vec![]));
        assert_eq!(out.confirmed, None);
        assert_eq!(out.expression, "5");
    }

    #[test]
    fn test_exit_resets_everything() {
        let mut s = session();
        s.process_frame(&frame(0.0, vec![hand(3)]));
        assert_eq!(s.expression(), "3");

        // Crossed index tips: exit regardless of counts.
        let mut hands = two_hands(5, 5);
        hands[0].landmarks[HandLandmark::IndexTip.index()].x = 0.8;
        hands[1].landmarks[HandLandmark::IndexTip.index()].x = 0.2;
        s.process_frame(&frame(2.0, hands.clone()));
        s.process_frame(&frame(2.033, hands.clone()));
        let out = s.process_frame(&frame(2.066, hands));
        assert_eq!(out.confirmed, Some(CalcEvent::Exit));
        assert!(out.exit);
        assert_eq!(out.expression, "");
        assert_eq!(out.result, "");

        // Debounce was reset with a fresh cooldown stamp: an immediate
        // digit is blocked, a later one passes.
        assert_eq!(
            s.process_frame(&frame(2.5, vec![hand(1)])).confirmed,
            None
        );
        assert_eq!(
            s.process_frame(&frame(4.0, vec![hand(1)])).confirmed,
            Some(CalcEvent::Digit(1))
        );
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut a = session();
        let mut b = session();
        a.process_frame(&frame(0.0, vec![hand(4)]));
        assert_eq!(a.expression(), "4");
        assert_eq!(b.expression(), "");
    }

    #[test]
    fn test_successful_evaluation_speaks() {
        struct Capture(crossbeam_channel::Sender<String>);
        impl SpeechSink for Capture {
            fn vocalize(&mut self, text: &str) {
                self.0.send(text.to_string()).ok();
            }
        }
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut s = CalcSession::new(DebounceConfig::default(), SpeechHandle::spawn(Capture(tx)));

        s.process_frame(&frame(0.0, vec![hand(2)]));
        hold_gesture(&mut s, 0, 0, 2.0);
        let spoken = rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("speech scheduled");
        assert_eq!(spoken, "Result is 2");
    }

    #[test]
    fn test_failed_evaluation_stays_silent() {
        struct Capture(crossbeam_channel::Sender<String>);
        impl SpeechSink for Capture {
            fn vocalize(&mut self, text: &str) {
                self.0.send(text.to_string()).ok();
            }
        }
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut s = CalcSession::new(DebounceConfig::default(), SpeechHandle::spawn(Capture(tx)));

        hold_gesture(&mut s, 1, 1, 0.0); // "+" alone
        let out = hold_gesture(&mut s, 0, 0, 2.0);
        assert_eq!(out.result, "Error");
        assert!(rx
            .recv_timeout(std::time::Duration::from_millis(200))
            .is_err());
    }

    #[test]
    fn test_external_reset() {
        let mut s = session();
        s.process_frame(&frame(0.0, vec![hand(5)]));
        s.reset(1.0);
        assert_eq!(s.expression(), "");
        // Reset stamps the cooldown like exit does.
        assert_eq!(s.process_frame(&frame(1.5, vec![hand(2)])).confirmed, None);
        assert_eq!(
            s.process_frame(&frame(3.0, vec![hand(2)])).confirmed,
            Some(CalcEvent::Digit(2))
        );
    }
}
