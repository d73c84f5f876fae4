//! Offline trace replay — drive a session from a recorded frame log
//! without a live tracker.
//!
//! A trace file holds one frame s-expression per line, in the same shape
//! the IPC protocol uses; blank lines and `;` comments are skipped.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};

use crate::ipc::dispatch::decode_frame;
use crate::session::CalcSession;

/// Final state of a replayed session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: usize,
    pub confirmed: Vec<String>,
    pub expression: String,
    pub result: String,
    /// True when the trace ended on an exit gesture.
    pub exited: bool,
}

/// Feed every frame in the trace to the session.  Stops early when an
/// exit gesture confirms, mirroring the live standalone loop.
pub fn run(path: &Path, session: &mut CalcSession) -> anyhow::Result<ReplaySummary> {
    let file = File::open(path).with_context(|| format!("open trace {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut summary = ReplaySummary {
        frames: 0,
        confirmed: Vec::new(),
        expression: String::new(),
        result: String::new(),
        exited: false,
    };

    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("read trace line {}", line_no + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            continue;
        }

        let value = match lexpr::from_str(trimmed) {
            Ok(v) => v,
            Err(e) => {
                warn!(line = line_no + 1, "skipping malformed frame: {}", e);
                continue;
            }
        };
        let frame = match decode_frame(&value) {
            Ok(f) => f,
            Err(reason) => {
                warn!(line = line_no + 1, "skipping bad frame: {}", reason);
                continue;
            }
        };

        summary.frames += 1;
        let outcome = session.process_frame(&frame);
        if let Some(event) = outcome.confirmed {
            info!(
                event = event.as_str(),
                expression = %outcome.expression,
                result = %outcome.result,
                "confirmed"
            );
            summary.confirmed.push(event.as_str().to_string());
        }
        summary.expression = outcome.expression;
        summary.result = outcome.result;
        if outcome.exit {
            summary.exited = true;
            break;
        }
    }

    Ok(summary)
}

// ── Tests ──────────────────────────────────────────────────
