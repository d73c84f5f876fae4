//! IPC boundary — the external hand tracker connects over a Unix socket
//! and streams per-frame observations; responses carry the calculator
//! state back for rendering.

pub mod dispatch;
pub mod server;
