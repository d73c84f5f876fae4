//! IPC message dispatch — parse s-expressions and route to handlers.
//!
//! Each connected client owns one `CalcSession`; the dispatcher mutates
//! only that client's state, so tracker clients can never observe each
//! other's expressions.

use lexpr::Value;
use tracing::{debug, warn};

use crate::hand::{HandObservation, Handedness, LandmarkPoint, LANDMARK_COUNT};
use crate::session::{CalcSession, FrameInput};

/// Protocol version spoken by this server.
pub const PROTOCOL_VERSION: i64 = 1;

/// Per-client dispatch context.
pub struct ClientCtx {
    pub session: CalcSession,
    pub authenticated: bool,
    /// Last frame timestamp seen, reused for out-of-band resets.
    pub last_time_s: f64,
}

impl ClientCtx {
    pub fn new(session: CalcSession) -> Self {
        Self {
            session,
            authenticated: false,
            last_time_s: 0.0,
        }
    }
}

/// Parse one message and dispatch to the appropriate handler.  Returns
/// the response s-expression.
pub fn handle_message(ctx: &mut ClientCtx, client_id: u64, raw: &str) -> String {
    let value = match lexpr::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            warn!(client_id, "malformed s-expression: {}", e);
            return error_response(0, &format!("malformed s-expression: {e}"));
        }
    };

    let msg_type = get_keyword(&value, "type");
    let msg_id = get_int(&value, "id").unwrap_or(0);

    match msg_type.as_deref() {
        Some("hello") => handle_hello(ctx, client_id, msg_id, &value),
        _ if !ctx.authenticated => error_response(msg_id, "hello handshake required"),
        Some("ping") => ok_response(msg_id),
        Some("frame") => handle_frame(ctx, msg_id, &value),
        Some("state") => state_response(ctx, msg_id),
        Some("reset") => handle_reset(ctx, msg_id),
        Some("config") => handle_config(ctx, msg_id, &value),
        Some(other) => error_response(msg_id, &format!("unknown message type: {other}")),
        None => error_response(msg_id, "missing :type field"),
    }
}

// ── Handlers ───────────────────────────────────────────────

fn handle_hello(ctx: &mut ClientCtx, client_id: u64, msg_id: i64, value: &Value) -> String {
    let version = get_int(value, "version").unwrap_or(0);
    if version != PROTOCOL_VERSION {
        return error_response(msg_id, &format!("unsupported protocol version: {version}"));
    }
    let client_name = get_string(value, "client").unwrap_or_default();
    debug!(client_id, client_name, "hello handshake (authenticated)");
    ctx.authenticated = true;
    format!(
        "(:type :hello :id {} :version {} :server \"handcalc\")",
        msg_id, PROTOCOL_VERSION
    )
}

fn handle_frame(ctx: &mut ClientCtx, msg_id: i64, value: &Value) -> String {
    let frame = match decode_frame(value) {
        Ok(f) => f,
        Err(reason) => return error_response(msg_id, &reason),
    };
    ctx.last_time_s = frame.time_s;

    let outcome = ctx.session.process_frame(&frame);
    let confirmed = outcome
        .confirmed
        .map(|e| format!(" :confirmed \"{}\"", e.as_str()))
        .unwrap_or_default();
    format!(
        "(:type :response :id {} :status :ok :expression \"{}\" :result \"{}\"{} :exit {})",
        msg_id,
        escape_string(&outcome.expression),
        escape_string(&outcome.result),
        confirmed,
        if outcome.exit { "t" } else { "nil" },
    )
}

fn state_response(ctx: &ClientCtx, msg_id: i64) -> String {
    format!(
        "(:type :response :id {} :status :ok :expression \"{}\" :result \"{}\")",
        msg_id,
        escape_string(ctx.session.expression()),
        escape_string(ctx.session.result()),
    )
}

fn handle_reset(ctx: &mut ClientCtx, msg_id: i64) -> String {
    ctx.session.reset(ctx.last_time_s);
    ok_response(msg_id)
}

fn handle_config(ctx: &mut ClientCtx, msg_id: i64, value: &Value) -> String {
    if let Some(cooldown) = get_float(value, "cooldown-s") {
        if cooldown < 0.0 {
            return error_response(msg_id, "cooldown-s must be non-negative");
        }
        ctx.session.config_mut().cooldown_s = cooldown;
    }
    if let Some(threshold) = get_float(value, "movement-threshold") {
        if threshold < 0.0 {
            return error_response(msg_id, "movement-threshold must be non-negative");
        }
        ctx.session.config_mut().movement_threshold = threshold as f32;
    }
    let config = ctx.session.config();
    format!(
        "(:type :response :id {} :status :ok :buffer-size {} :cooldown-s {:.2} :movement-threshold {:.3})",
        msg_id, config.buffer_size, config.cooldown_s, config.movement_threshold,
    )
}

// ── Frame decoding ─────────────────────────────────────────

/// Decode a `:frame` message into core input.  Accepts 21 landmarks per
/// hand as either (x y z) triplets or (x y) pairs.
pub fn decode_frame(value: &Value) -> Result<FrameInput, String> {
    let time_s = get_float(value, "time").ok_or("frame missing :time")?;

    let mut hands = Vec::new();
    if let Some(hands_value) = get_value(value, "hands") {
        let items = list_items(hands_value);
        if items.len() > 2 {
            return Err(format!("too many hands: {}", items.len()));
        }
        for item in items {
            hands.push(decode_hand(item)?);
        }
    }

    Ok(FrameInput { time_s, hands })
}

fn decode_hand(value: &Value) -> Result<HandObservation, String> {
    let label = get_keyword(value, "handedness").ok_or("hand missing :handedness")?;
    let handedness =
        Handedness::parse(&label).ok_or_else(|| format!("bad handedness: {label}"))?;

    let landmarks_value = get_value(value, "landmarks").ok_or("hand missing :landmarks")?;
    let numbers: Vec<f64> = flatten_list(landmarks_value)
        .into_iter()
        .map(|v| leaf_f64(v).ok_or("non-numeric landmark"))
        .collect::<Result<_, _>>()?;

    let stride = match numbers.len() {
        n if n == LANDMARK_COUNT * 3 => 3,
        n if n == LANDMARK_COUNT * 2 => 2,
        n => {
            return Err(format!(
                "expected {} landmarks, got {} values",
                LANDMARK_COUNT, n
            ))
        }
    };
    let points: Vec<LandmarkPoint> = numbers
        .chunks(stride)
        .map(|c| {
            LandmarkPoint::new(
                c[0] as f32,
                c[1] as f32,
                if stride == 3 { c[2] as f32 } else { 0.0 },
            )
        })
        .collect();

    HandObservation::from_points(&points, handedness).ok_or_else(|| "bad landmark count".into())
}

// ── Helpers ────────────────────────────────────────────────

fn ok_response(id: i64) -> String {
    format!("(:type :response :id {} :status :ok)", id)
}

fn error_response(id: i64, reason: &str) -> String {
    format!(
        "(:type :response :id {} :status :error :reason \"{}\")",
        id,
        escape_string(reason)
    )
}

/// Escape a string for s-expression output.
fn escape_string(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Find the value following `:key` in an s-expression plist.  Handles
/// both `Value::Keyword("key")` (elisp parser) and `Value::Symbol(":key")`
/// (default parser) forms.
fn get_value<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let prefixed = format!(":{}", key);
    let mut current = value;
    while let Value::Cons(pair) = current {
        let is_key = match pair.car() {
            Value::Keyword(k) => k.as_ref() == key,
            Value::Symbol(s) => s.as_ref() == prefixed,
            _ => false,
        };
        if is_key {
            if let Value::Cons(next) = pair.cdr() {
                return Some(next.car());
            }
            return None;
        }
        current = pair.cdr();
    }
    None
}

/// Extract a keyword/string/number value from a plist as a string.
fn get_keyword(value: &Value, key: &str) -> Option<String> {
    get_value(value, key).map(|val| match val {
        Value::Keyword(v) => v.to_string(),
        Value::Symbol(v) => {
            let s = v.to_string();
            s.strip_prefix(':').unwrap_or(&s).to_string()
        }
        Value::String(v) => v.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => if *b { "t" } else { "nil" }.to_string(),
        Value::Null => "nil".to_string(),
        other => other.to_string(),
    })
}

/// Extract an integer value from a plist.
fn get_int(value: &Value, key: &str) -> Option<i64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Extract a string value from a plist.
fn get_string(value: &Value, key: &str) -> Option<String> {
    get_keyword(value, key)
}

/// Extract a floating-point value from a plist.
fn get_float(value: &Value, key: &str) -> Option<f64> {
    get_keyword(value, key).and_then(|s| s.parse().ok())
}

/// Top-level items of a proper list.
fn list_items(value: &Value) -> Vec<&Value> {
    let mut out = Vec::new();
    let mut current = value;
    while let Value::Cons(pair) = current {
        out.push(pair.car());
        current = pair.cdr();
    }
    out
}

/// Flatten a possibly nested list/cons structure into its leaf values.
fn flatten_list(value: &Value) -> Vec<&Value> {
    fn walk<'a>(v: &'a Value, out: &mut Vec<&'a Value>) {
        match v {
            Value::Cons(pair) => {
                walk(pair.car(), out);
                walk(pair.cdr(), out);
            }
            Value::Null => {}
            other => out.push(other),
        }
    }
    let mut result = Vec::new();
    walk(value, &mut result);
    result
}

fn leaf_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        _ => None,
    }
}

// ── Tests ──────────────────────────────────────────────────
