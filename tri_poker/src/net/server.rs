//! TCP line transport.
//!
//! Every accepted socket is split into a reader task and a writer task. The
//! reader turns text lines into the connection's inbound channel, the writer
//! renders outbound [`ServerMessage`]s as text. The first line a client sends
//! is its username; only then is the connection handed to the host as a
//! [`PendingJoin`].

use log::{debug, error, info, warn};
use std::net::SocketAddr;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader},
    net::{TcpListener, TcpStream},
    sync::mpsc,
};

use super::{
    connection::{Connection, PendingJoin, Remote},
    errors::{NetError, Result},
    messages::ServerMessage,
};
use crate::game::entities::Username;

/// Longest line accepted from a participant, in bytes.
pub const MAX_LINE_LENGTH: usize = 1024;

/// Prompt written after announcements, matching an interactive console.
pub const PROMPT: &str = "> ";

/// Read a single line, without its terminator. `Ok(None)` means EOF.
pub async fn read_line<R>(reader: &mut R) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = String::new();
    let limit = MAX_LINE_LENGTH as u64 + 1;
    let n = reader.take(limit).read_line(&mut buf).await?;
    if n == 0 {
        return Ok(None);
    }
    if n > MAX_LINE_LENGTH && !buf.ends_with('\n') {
        return Err(NetError::LineTooLong {
            actual: n,
            max: MAX_LINE_LENGTH,
        });
    }
    Ok(Some(buf.trim_end_matches(['\r', '\n']).to_string()))
}

/// Write a message the way the console client expects it: the rendered
/// text, a newline, and a prompt after announcements.
pub async fn write_message<W>(writer: &mut W, msg: &ServerMessage) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = msg.to_string();
    buf.push('\n');
    if msg.prompts() {
        buf.push_str(PROMPT);
    }
    // One write per message so a reader never sees half an announcement.
    writer.write_all(buf.as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}

/// Accept participants until the host stops taking joins.
///
/// # Errors
///
/// Returns an error only if the listener itself fails.
pub async fn accept_loop(listener: TcpListener, joins: mpsc::Sender<PendingJoin>) -> Result<()> {
    info!("Accepting players on {}", listener.local_addr()?);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, addr) = match accepted {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        error!("Failed to accept connection: {e}");
                        continue;
                    }
                };
                let joins = joins.clone();
                tokio::spawn(async move {
                    if let Err(e) = handshake(stream, addr, joins).await {
                        warn!("Dropping connection from {addr}: {e}");
                    }
                });
            }
            () = joins.closed() => {
                info!("Lobby closed, no longer accepting players");
                return Ok(());
            }
        }
    }
}

/// Read the username, wire up the reader/writer tasks, and hand the
/// connection to the host.
async fn handshake(
    stream: TcpStream,
    addr: SocketAddr,
    joins: mpsc::Sender<PendingJoin>,
) -> Result<()> {
    let (read_half, write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let username = match read_line(&mut reader).await? {
        Some(line) if line.trim().is_empty() => return Err(NetError::EmptyUsername),
        Some(line) => Username::new(&line),
        None => return Err(NetError::ClosedBeforeUsername),
    };
    debug!("{addr} identified as {username}");

    let (connection, remote) = Connection::pair();
    let Remote { to_host, from_host } = remote;
    tokio::spawn(pump_inbound(reader, to_host, addr));
    tokio::spawn(pump_outbound(write_half, from_host, addr));

    joins
        .send(PendingJoin::new(username, connection))
        .await
        .map_err(|_| NetError::HostClosed)
}

async fn pump_inbound<R>(mut reader: R, to_host: mpsc::Sender<String>, addr: SocketAddr)
where
    R: AsyncBufRead + Unpin,
{
    loop {
        match read_line(&mut reader).await {
            Ok(Some(line)) => {
                if to_host.send(line).await.is_err() {
                    break;
                }
            }
            Ok(None) => {
                debug!("{addr} closed the connection");
                break;
            }
            Err(e) => {
                warn!("Read from {addr} failed: {e}");
                break;
            }
        }
    }
}

async fn pump_outbound<W>(
    mut writer: W,
    mut from_host: mpsc::UnboundedReceiver<ServerMessage>,
    addr: SocketAddr,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(msg) = from_host.recv().await {
        if let Err(e) = write_message(&mut writer, &msg).await {
            warn!("Write to {addr} failed: {e}");
            return;
        }
    }
    // The host dropped the outbox, so the participant's channel is closed.
    let _ = writer.shutdown().await;
}
