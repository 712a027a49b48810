//! A low-level TCP client for the line protocol.
//!
//! Used by the integration tests and handy for scripting a game from a
//! terminal; it is not meant to be a polished front end.

use anyhow::{Error, bail};
use std::{net::SocketAddr, time::Duration};
use tokio::{
    io::{AsyncWriteExt, BufReader},
    net::{
        TcpStream,
        tcp::{OwnedReadHalf, OwnedWriteHalf},
    },
    time::{sleep, timeout},
};

use super::server::{PROMPT, read_line};
use crate::game::entities::Username;

/// Default timeout for reading from the server.
pub const READ_TIMEOUT: Duration = Duration::from_secs(10);

/// An async TCP client speaking the participant side of the protocol.
pub struct Client {
    /// The username sent on connect.
    pub username: Username,
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl Client {
    /// Connect to a host and announce the username.
    ///
    /// This method attempts to connect with backoff, trying three times
    /// with increasing delays (100ms, 500ms, 1s).
    ///
    /// # Errors
    ///
    /// Returns an error if unable to connect or send the username.
    pub async fn connect(username: &str, addr: &SocketAddr) -> Result<Self, Error> {
        let mut delays = vec![
            Duration::from_secs(1),
            Duration::from_millis(500),
            Duration::from_millis(100),
        ];
        loop {
            match TcpStream::connect(addr).await {
                Ok(stream) => {
                    let (read_half, write_half) = stream.into_split();
                    let mut client = Self {
                        username: Username::new(username),
                        reader: BufReader::new(read_half),
                        writer: write_half,
                    };
                    client.send_line(username).await?;
                    return Ok(client);
                }
                Err(e) => match delays.pop() {
                    Some(delay) => sleep(delay).await,
                    None => bail!("couldn't connect to {addr}: {e}"),
                },
            }
        }
    }

    /// Send a raw line.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket write fails.
    pub async fn send_line(&mut self, line: &str) -> Result<(), Error> {
        self.writer.write_all(format!("{line}\n").as_bytes()).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Choose menu option 1.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket write fails.
    pub async fn continue_round(&mut self) -> Result<(), Error> {
        self.send_line("1").await
    }

    /// Choose menu option 2.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket write fails.
    pub async fn fold(&mut self) -> Result<(), Error> {
        self.send_line("2").await
    }

    /// Next non-empty line from the host with prompts stripped, or `None`
    /// once the host closed the connection.
    ///
    /// # Errors
    ///
    /// Returns an error on a read failure or after [`READ_TIMEOUT`].
    pub async fn recv_line(&mut self) -> Result<Option<String>, Error> {
        loop {
            let Some(line) = timeout(READ_TIMEOUT, read_line(&mut self.reader)).await?? else {
                return Ok(None);
            };
            let mut line = line.as_str();
            while let Some(rest) = line.strip_prefix(PROMPT) {
                line = rest;
            }
            let line = line.trim_end();
            if !line.is_empty() && line != PROMPT.trim_end() {
                return Ok(Some(line.to_string()));
            }
        }
    }

    /// Read lines until one contains `needle` and return it.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection closes first or a read times out.
    pub async fn recv_until(&mut self, needle: &str) -> Result<String, Error> {
        while let Some(line) = self.recv_line().await? {
            if line.contains(needle) {
                return Ok(line);
            }
        }
        bail!("connection closed before {needle:?} arrived")
    }

    /// Read every remaining line until the host closes the connection.
    ///
    /// # Errors
    ///
    /// Returns an error on a read failure or timeout.
    pub async fn recv_all(&mut self) -> Result<Vec<String>, Error> {
        let mut lines = Vec::new();
        while let Some(line) = self.recv_line().await? {
            lines.push(line);
        }
        Ok(lines)
    }
}
