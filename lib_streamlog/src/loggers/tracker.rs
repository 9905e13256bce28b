//! # Tracker Transports
//!
//! Sinks for the `TRACKER` destination. [`TcpTracker`] ships each message to a
//! tracker process as one length-prefixed frame; [`LocalTracker`] echoes
//! messages on stdout when no tracker is configured.
//!
//! Frame layout: a `u32` little-endian byte count followed by that many bytes
//! of UTF-8 text.

use std::io::{self, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;

use super::destination::Destination;
use super::sinks::{write_line, LogSink};

/// Largest message body a tracker frame may carry.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Connect and write timeout used when none is configured.
pub const DEFAULT_TRACKER_TIMEOUT: Duration = Duration::from_millis(2000);

/// Errors raised while delivering a frame to the tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// The tracker address resolved to nothing usable.
    #[error("tracker address {0} did not resolve to any socket address")]
    NoAddress(String),

    /// Socket level failure while connecting or writing.
    #[error("tracker I/O error: {0}")]
    Io(#[from] io::Error),

    /// The message exceeds [`MAX_FRAME_LEN`].
    #[error("message of {0} bytes exceeds the tracker frame limit")]
    FrameTooLarge(usize),
}

/// Builds the wire frame for one message.
pub fn encode_frame(message: &str) -> Result<Vec<u8>, TrackerError> {
    let body = message.as_bytes();
    if body.len() > MAX_FRAME_LEN {
        return Err(TrackerError::FrameTooLarge(body.len()));
    }
    let mut frame = Vec::with_capacity(4 + body.len());
    frame.extend_from_slice(&(body.len() as u32).to_le_bytes());
    frame.extend_from_slice(body);
    Ok(frame)
}

/// # TCP Tracker
///
/// Holds at most one connection to the tracker, opened on first use. A write
/// on a stale connection drops it and tries one fresh connection; if that also
/// fails the message is dropped with a warning on the `log` facade.
#[derive(Debug)]
pub struct TcpTracker {
    addr: String,
    timeout: Duration,
    stream: Mutex<Option<TcpStream>>,
}

impl TcpTracker {
    /// Creates a tracker sink. No connection is made until the first message.
    ///
    /// # Arguments
    /// * `addr` - `host:port` of the tracker process.
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            timeout: DEFAULT_TRACKER_TIMEOUT,
            stream: Mutex::new(None),
        }
    }

    /// Sets the connect and write timeout (default [`DEFAULT_TRACKER_TIMEOUT`]).
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The tracker address as configured.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Sends one message, reconnecting once if the cached connection is broken.
    pub fn send(&self, message: &str) -> Result<(), TrackerError> {
        let frame = encode_frame(message)?;
        let mut guard = self
            .stream
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(stream) = guard.as_mut() {
            if stream.write_all(&frame).is_ok() {
                return Ok(());
            }
            log::debug!(target: "streamlog::tracker", "dropping stale connection to {}", self.addr);
            *guard = None;
        }

        let mut stream = self.connect()?;
        stream.write_all(&frame)?;
        *guard = Some(stream);
        Ok(())
    }

    fn connect(&self) -> Result<TcpStream, TrackerError> {
        let addrs: Vec<SocketAddr> = self.addr.to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(TrackerError::NoAddress(self.addr.clone()));
        }

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, self.timeout) {
                Ok(stream) => {
                    stream.set_write_timeout(Some(self.timeout))?;
                    stream.set_nodelay(true)?;
                    log::debug!(target: "streamlog::tracker", "connected to tracker at {}", addr);
                    return Ok(stream);
                }
                Err(e) => last_error = Some(e),
            }
        }
        match last_error {
            Some(e) => Err(TrackerError::Io(e)),
            None => Err(TrackerError::NoAddress(self.addr.clone())),
        }
    }
}

impl LogSink for TcpTracker {
    fn deliver(&self, _destination: Destination, message: &str) {
        if let Err(e) = self.send(message) {
            log::warn!(target: "streamlog::tracker", "tracker message to {} dropped: {}", self.addr, e);
        }
    }
}

/// Tracker stand-in for processes started without a tracker: prints each
/// message as a line on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalTracker;

impl LocalTracker {
    /// Writes `message` as one line to `out`.
    ///
    /// # Arguments
    /// * `out` - Where the line goes; stdout when used as a sink.
    /// * `message` - Tracker text, already prefixed.
    pub fn echo_to<W: Write>(&self, out: &mut W, message: &str) -> io::Result<()> {
        write_line(out, message)
    }
}

impl LogSink for LocalTracker {
    fn deliver(&self, _destination: Destination, message: &str) {
        let _ = self.echo_to(&mut io::stdout().lock(), message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;

    fn read_frame(stream: &mut TcpStream) -> String {
        let mut len = [0u8; 4];
        stream.read_exact(&mut len).unwrap();
        let mut body = vec![0u8; u32::from_le_bytes(len) as usize];
        stream.read_exact(&mut body).unwrap();
        String::from_utf8(body).unwrap()
    }

    #[test]
    fn test_encode_frame_layout() {
        let frame = encode_frame("ping").unwrap();
        assert_eq!(&frame[..4], &4u32.to_le_bytes());
        assert_eq!(&frame[4..], b"ping");
        assert_eq!(encode_frame("").unwrap(), vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_encode_frame_rejects_oversized() {
        let big = "x".repeat(MAX_FRAME_LEN + 1);
        assert!(matches!(encode_frame(&big), Err(TrackerError::FrameTooLarge(_))));
    }

    #[test]
    fn test_tcp_tracker_delivers_frames_over_one_connection() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap().to_string();

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            vec![read_frame(&mut stream), read_frame(&mut stream)]
        });

        let tracker = TcpTracker::new(addr);
        tracker.deliver(Destination::Tracker, "[12:00:00] ping");
        tracker.deliver(Destination::Tracker, "multi\nline");

        let received = handle.join().unwrap();
        assert_eq!(received, vec!["[12:00:00] ping".to_string(), "multi\nline".to_string()]);
    }

    #[test]
    fn test_tcp_tracker_unreachable_reports_error() {
        // Bind then drop to obtain a port nobody listens on.
        let port = TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let tracker = TcpTracker::new(format!("127.0.0.1:{}", port))
            .with_timeout(Duration::from_millis(200));

        assert!(tracker.send("lost").is_err());
        // The sink swallows the failure.
        tracker.deliver(Destination::Tracker, "lost again");
    }

    #[test]
    fn test_local_tracker_echoes_one_line() {
        let mut out: Vec<u8> = Vec::new();
        LocalTracker.echo_to(&mut out, "[12:00:00] ping").unwrap();
        LocalTracker.echo_to(&mut out, "multi\nline").unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            format!("[12:00:00] ping{le}multi\nline{le}", le = crate::loggers::sinks::LINE_ENDING)
        );
        // The stdout path must not panic either.
        LocalTracker.deliver(Destination::Tracker, "local echo");
    }

    #[test]
    fn test_tcp_tracker_bad_address() {
        let tracker = TcpTracker::new("not an address");
        assert!(tracker.send("x").is_err());
        assert_eq!(tracker.addr(), "not an address");
    }
}
