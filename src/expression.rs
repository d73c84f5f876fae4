//! Expression accumulation and evaluation state.
//!
//! A single record {expression, result} mutated only by debounce-confirmed
//! events.  Evaluation failures are recovered locally as the literal
//! result text "Error" and never propagate.

use tracing::info;

use crate::debounce::CalcEvent;
use crate::eval;

/// What the caller owes after applying an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    /// Expression or result changed (or a no-op delete); nothing else.
    Updated,
    /// Evaluation succeeded; the text should be handed to the speech
    /// collaborator.
    Announce(String),
    /// Exit: expression cleared here, caller must reset debounce state
    /// and surface the exit to the frame-acquisition loop.
    Exit,
}

/// Accumulated calculator state for one session.
#[derive(Debug, Clone, Default)]
pub struct ExpressionState {
    pub expression: String,
    pub result: String,
}

impl ExpressionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one confirmed event.
    pub fn apply(&mut self, event: CalcEvent) -> EventOutcome {
        match event {
            CalcEvent::Digit(d) => {
                self.expression.push(char::from(b'0' + d.min(9)));
                EventOutcome::Updated
            }
            CalcEvent::Operator(op) => {
                self.expression.push(op.as_char());
                EventOutcome::Updated
            }
            CalcEvent::Delete => {
                self.expression.pop();
                EventOutcome::Updated
            }
            CalcEvent::Clear => {
                self.expression.clear();
                self.result.clear();
                EventOutcome::Updated
            }
            CalcEvent::Evaluate => match eval::evaluate(&self.expression) {
                Ok(value) => {
                    self.result = eval::format_result(value);
                    info!(expression = %self.expression, result = %self.result, "evaluated");
                    EventOutcome::Announce(format!("Result is {}", self.result))
                }
                Err(err) => {
                    info!(expression = %self.expression, %err, "evaluation failed");
                    self.result = "Error".to_string();
                    EventOutcome::Updated
                }
            },
            CalcEvent::Exit => {
                self.expression.clear();
                self.result.clear();
                EventOutcome::Exit
            }
        }
    }
}

// ── Tests ──────────────────────────────────────────────────
