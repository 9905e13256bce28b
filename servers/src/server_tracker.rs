//! # Tracker Server
//!
//! The process on the receiving end of `log_at!(TRACKER)`. Workers connect
//! over TCP and send one frame per message (a `u32` little-endian length
//! followed by UTF-8 text); every message is printed on stdout prefixed with
//! the worker's address.
//!
//! ## Functionality:
//! - **TCP Listener**: Binds to `--bind` / `STREAMLOG_TRACKER_BIND`.
//! - **Frame Decoding**: Rejects frames above the library's frame limit and
//!   replaces invalid UTF-8 instead of dropping the message.
//! - **Logging**: Uses `tracing` on stderr for connection events so stdout
//!   carries only worker output.
//! - **Graceful Shutdown**: `tokio-graceful` stops accepting and drains
//!   clients on Ctrl-C/SIGTERM.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use colored::*;
use static_init::dynamic;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::task;
use tokio_graceful::{Shutdown, ShutdownGuard};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use lib_streamlog::loggers::tracker::MAX_FRAME_LEN;

// load .env files before anything else
#[dynamic]
static DOTENV_INIT: () = {
    let dotenv_os: &str = if cfg!(target_os = "windows") {
        ".env.windows"
    } else {
        ".env.linux"
    };
    dotenvy::dotenv().ok();
    dotenvy::from_filename(dotenv_os).ok();
};

#[derive(Parser, Debug, Clone)]
#[clap(about = "Receives TRACKER messages from workers and prints them", version)]
struct Args {
    #[clap(long, env = "STREAMLOG_TRACKER_BIND", default_value = "0.0.0.0:9091", help = "Address to listen on for workers.")]
    bind: String,

    #[clap(long, env = "STREAMLOG_TRACKER_SHUTDOWN_SECS", default_value_t = 10, help = "Seconds to wait for clients on shutdown.")]
    shutdown_limit_secs: u64,
}

/// Configures `tracing` on stderr, filtered by `RUST_LOG` (default `info`).
fn setup_logging() -> Result<()> {
    let env_filter: EnvFilter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let console_layer = fmt::layer()
        .with_target(true)
        .with_ansi(true)
        .with_writer(io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .try_init()?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = &*DOTENV_INIT;
    let args = Args::parse();
    setup_logging()?;

    let listener: TcpListener = TcpListener::bind(&args.bind).await?;
    info!("tracker listening on {}", listener.local_addr()?);

    let shutdown: Shutdown = Shutdown::default();
    shutdown.spawn_task_fn(move |guard| accept_loop(listener, guard));

    match shutdown
        .shutdown_with_limit(Duration::from_secs(args.shutdown_limit_secs))
        .await
    {
        Ok(elapsed) => {
            info!(
                "shutdown: gracefully {}s after shutdown signal received",
                elapsed.as_secs_f64()
            );
        }
        Err(e) => {
            warn!("shutdown: forcefully due to timeout: {}", e);
        }
    }

    info!("Bye!");
    Ok(())
}

async fn accept_loop(listener: TcpListener, shutdown_guard: ShutdownGuard) {
    loop {
        let shutdown_guard: ShutdownGuard = shutdown_guard.clone();
        tokio::select! {
            _ = shutdown_guard.cancelled() => {
                info!("Signal received: initiate graceful shutdown");
                break;
            }
            result = listener.accept() => {
                match result {
                    Ok((socket, peer)) => {
                        task::spawn(async move {
                            info!("worker {} connected", peer);
                            if let Err(e) = handle_client(socket, peer, shutdown_guard).await {
                                error!("worker {} failed: {}", peer, e);
                            }
                            info!("worker {} disconnected", peer);
                        });
                    }
                    Err(e) => {
                        warn!("accept error: {:?}", e);
                    }
                }
            }
        }
    }
}

/// Reads one frame. `Ok(None)` means the worker closed the connection
/// between frames; a close inside a frame is an error.
async fn read_frame<R: AsyncRead + Unpin>(socket: &mut R) -> Result<Option<Vec<u8>>> {
    let len = match socket.read_u32_le().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > MAX_FRAME_LEN {
        anyhow::bail!("frame of {} bytes exceeds limit of {}", len, MAX_FRAME_LEN);
    }
    let mut body = vec![0u8; len];
    socket.read_exact(&mut body).await?;
    Ok(Some(body))
}

/// Frame body as text. Invalid UTF-8 sequences are replaced with U+FFFD;
/// the flag reports whether that happened.
fn decode_text(body: Vec<u8>) -> (String, bool) {
    match String::from_utf8(body) {
        Ok(text) => (text, false),
        Err(e) => (String::from_utf8_lossy(e.as_bytes()).into_owned(), true),
    }
}

async fn handle_client(mut socket: TcpStream, peer: SocketAddr, shutdown_guard: ShutdownGuard) -> Result<()> {
    let tag = format!("[{}]", peer).truecolor(128, 128, 128);
    loop {
        let frame = tokio::select! {
            _ = shutdown_guard.cancelled() => break,
            frame = read_frame(&mut socket) => frame?,
        };
        let Some(body) = frame else { break };

        let (text, replaced) = decode_text(body);
        if replaced {
            warn!("worker {} sent invalid UTF-8; replacing bad bytes", peer);
        }
        debug!("{} bytes from {}", text.len(), peer);

        if text.is_empty() {
            println!("{}", tag);
            continue;
        }
        for line in text.lines() {
            println!("{} {}", tag, line);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_streamlog::loggers::tracker::encode_frame;
    use tokio::io::{AsyncWriteExt, duplex};

    #[tokio::test]
    async fn test_read_frame_roundtrip() {
        let (mut worker, mut server) = duplex(256);
        worker.write_all(&encode_frame("[12:00:00] ping").unwrap()).await.unwrap();
        worker.write_all(&encode_frame("").unwrap()).await.unwrap();
        drop(worker);

        assert_eq!(read_frame(&mut server).await.unwrap(), Some(b"[12:00:00] ping".to_vec()));
        assert_eq!(read_frame(&mut server).await.unwrap(), Some(Vec::new()));
        assert_eq!(read_frame(&mut server).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_read_frame_eof_between_frames() {
        let (worker, mut server) = duplex(16);
        drop(worker);
        assert!(read_frame(&mut server).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_read_frame_eof_inside_frame_is_error() {
        let (mut worker, mut server) = duplex(16);
        worker.write_all(&10u32.to_le_bytes()).await.unwrap();
        worker.write_all(b"abc").await.unwrap();
        drop(worker);
        assert!(read_frame(&mut server).await.is_err());
    }

    #[tokio::test]
    async fn test_read_frame_rejects_oversized_length() {
        let (mut worker, mut server) = duplex(16);
        let len = (MAX_FRAME_LEN + 1) as u32;
        worker.write_all(&len.to_le_bytes()).await.unwrap();

        let err = read_frame(&mut server).await.unwrap_err();
        assert!(err.to_string().contains("exceeds limit"));
    }

    #[test]
    fn test_decode_text_valid() {
        assert_eq!(decode_text(b"train-error:0.5".to_vec()), ("train-error:0.5".to_string(), false));
    }

    #[test]
    fn test_decode_text_replaces_invalid_utf8() {
        let (text, replaced) = decode_text(vec![b'o', b'k', 0xff, b'!']);
        assert!(replaced);
        assert_eq!(text, "ok\u{FFFD}!");
    }
}
