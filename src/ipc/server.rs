//! IPC server: Unix socket listener + per-client message framing.
//!
//! One thread and one `CalcSession` per client connection — a tracker
//! client only ever sees its own calculator state.  Messages are framed
//! with a big-endian u32 length prefix.

use std::io::{self, Read, Write};
use std::os::unix::io::AsRawFd;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use super::dispatch::{handle_message, ClientCtx};
use crate::debounce::DebounceConfig;
use crate::session::CalcSession;
use crate::speech::SpeechHandle;

/// Maximum message payload size (1 MiB).
const MAX_MESSAGE_SIZE: u32 = 1_048_576;

/// Read peer credentials from a Unix socket using SO_PEERCRED (Linux)
/// or return None on unsupported platforms.
fn get_peer_uid(stream: &UnixStream) -> Option<u32> {
    #[cfg(target_os = "linux")]
    {
        let fd = stream.as_raw_fd();
        let mut cred: libc::ucred = unsafe { std::mem::zeroed() };
        let mut len = std::mem::size_of::<libc::ucred>() as libc::socklen_t;
        let ret = unsafe {
            libc::getsockopt(
                fd,
                libc::SOL_SOCKET,
                libc::SO_PEERCRED,
                &mut cred as *mut _ as *mut libc::c_void,
                &mut len,
            )
        };
        if ret == 0 {
            Some(cred.uid)
        } else {
            None
        }
    }
    #[cfg(not(target_os = "linux"))]
    {
        let _ = stream;
        None
    }
}

/// Compute the default socket path.
pub fn default_socket_path() -> PathBuf {
    let runtime_dir = std::env::var("XDG_RUNTIME_DIR")
        .unwrap_or_else(|_| format!("/tmp/handcalc-{}", unsafe { libc::getuid() }));
    PathBuf::from(runtime_dir).join("handcalc.sock")
}

/// Framed connection wrapper around a client stream.
struct Framed {
    stream: UnixStream,
    read_buf: Vec<u8>,
}

impl Framed {
    fn new(stream: UnixStream) -> Self {
        Self {
            stream,
            read_buf: Vec::with_capacity(4096),
        }
    }

    /// Read until one complete framed message is available.  Returns None
    /// on clean EOF.
    fn read_message(&mut self) -> io::Result<Option<String>> {
        loop {
            if let Some(msg) = self.try_extract()? {
                return Ok(Some(msg));
            }
            let mut buf = [0u8; 4096];
            match self.stream.read(&mut buf)? {
                0 => return Ok(None),
                n => self.read_buf.extend_from_slice(&buf[..n]),
            }
        }
    }

    /// Try to extract one complete framed message from the read buffer.
    fn try_extract(&mut self) -> io::Result<Option<String>> {
        if self.read_buf.len() < 4 {
            return Ok(None);
        }
        let len = u32::from_be_bytes([
            self.read_buf[0],
            self.read_buf[1],
            self.read_buf[2],
            self.read_buf[3],
        ]);
        if len > MAX_MESSAGE_SIZE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("message of {len} bytes exceeds maximum"),
            ));
        }
        let total = 4 + len as usize;
        if self.read_buf.len() < total {
            return Ok(None);
        }
        let payload = String::from_utf8_lossy(&self.read_buf[4..total]).to_string();
        self.read_buf.drain(..total);
        Ok(Some(payload))
    }

    /// Write one framed message (length prefix + payload).
    fn write_message(&mut self, payload: &str) -> io::Result<()> {
        let bytes = payload.as_bytes();
        self.stream.write_all(&(bytes.len() as u32).to_be_bytes())?;
        self.stream.write_all(bytes)
    }
}

/// Server-wide settings shared by all client threads.
#[derive(Clone)]
pub struct ServerOptions {
    pub config: DebounceConfig,
    pub speech: SpeechHandle,
    /// Log every request/response payload.
    pub trace: bool,
}

/// Bind the listener socket and serve clients until the process exits.
pub fn run(socket_path: &Path, options: ServerOptions) -> anyhow::Result<()> {
    // Remove stale socket
    if socket_path.exists() {
        std::fs::remove_file(socket_path)?;
    }

    let listener = UnixListener::bind(socket_path)?;

    // Set socket permissions to 0700
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o700))?;
    }

    info!(?socket_path, "IPC server listening");

    let mut next_client_id: u64 = 1;
    for stream in listener.incoming() {
        let stream = match stream {
            Ok(s) => s,
            Err(e) => {
                error!("accept error: {}", e);
                continue;
            }
        };

        // SO_PEERCRED: only same-user clients may drive a session.
        let our_uid = unsafe { libc::getuid() };
        if let Some(peer_uid) = get_peer_uid(&stream) {
            if peer_uid != our_uid {
                warn!(peer_uid, our_uid, "rejecting client: UID mismatch");
                continue;
            }
        }

        let client_id = next_client_id;
        next_client_id += 1;
        info!(client_id, "IPC client connected");

        let options = options.clone();
        std::thread::spawn(move || {
            serve_client(stream, client_id, options);
            info!(client_id, "IPC client disconnected");
        });
    }

    Ok(())
}

/// Per-client loop: one session, framed request/response until EOF.
fn serve_client(stream: UnixStream, client_id: u64, options: ServerOptions) {
    let session = CalcSession::new(options.config, options.speech);
    let mut ctx = ClientCtx::new(session);
    let mut framed = Framed::new(stream);

    loop {
        let request = match framed.read_message() {
            Ok(Some(msg)) => msg,
            Ok(None) => break,
            Err(e) => {
                debug!(client_id, "read error: {}", e);
                break;
            }
        };
        if options.trace {
            info!(client_id, "<< {}", request);
        }

        let response = handle_message(&mut ctx, client_id, &request);
        if options.trace {
            info!(client_id, ">> {}", response);
        }
        if let Err(e) = framed.write_message(&response) {
            debug!(client_id, "write error: {}", e);
            break;
        }
    }
}

// ── Tests ──────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn framed_pair() -> (Framed, Framed) {
        let (a, b) = UnixStream::pair().unwrap();
        (Framed::new(a), Framed::new(b))
    }

    #[test]
    fn test_frame_round_trip() {
        let (mut a, mut b) = framed_pair();
        a.write_message("(:type :ping :id 1)").unwrap();
        let got = b.read_message().unwrap().unwrap();
        assert_eq!(got, "(:type :ping :id 1)");
    }

    #[test]
    fn test_multiple_messages_in_one_buffer() {
        let (mut a, mut b) = framed_pair();
        a.write_message("first").unwrap();
        a.write_message("second").unwrap();
        assert_eq!(b.read_message().unwrap().unwrap(), "first");
        assert_eq!(b.read_message().unwrap().unwrap(), "second");
    }

    #[test]
    fn test_oversized_message_rejected() {
        let (mut a, mut b) = framed_pair();
        let huge = (MAX_MESSAGE_SIZE + 1).to_be_bytes();
        a.stream.write_all(&huge).unwrap();
        a.stream.write_all(b"xxxx").unwrap();
        assert!(b.read_message().is_err());
    }

    #[test]
    fn test_eof_is_clean_none() {
        let (a, mut b) = framed_pair();
        drop(a);
        assert!(b.read_message().unwrap().is_none());
    }

    #[test]
    fn test_serve_client_end_to_end() {
        use crate::speech::{NullSink, SpeechHandle};

        let (client, server) = UnixStream::pair().unwrap();
        let options = ServerOptions {
            config: DebounceConfig::default(),
            speech: SpeechHandle::spawn(NullSink),
            trace: false,
        };
        let handle = std::thread::spawn(move || serve_client(server, 1, options));

        let mut framed = Framed::new(client);
        framed
            .write_message("(:type :hello :id 1 :version 1)")
            .unwrap();
        let resp = framed.read_message().unwrap().unwrap();
        assert!(resp.contains(":type :hello"));

        framed.write_message("(:type :state :id 2)").unwrap();
        let resp = framed.read_message().unwrap().unwrap();
        assert!(resp.contains(":expression \"\""));

        drop(framed);
        handle.join().unwrap();
    }
}
