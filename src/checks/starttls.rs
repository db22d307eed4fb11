//! STARTTLS negotiation
//!
//! Plaintext upgrade dialogues run on a freshly opened connection before the
//! TLS handshake begins.

use crate::utils::{ConfigError, ConnectionError};
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::debug;

/// Protocols with a supported STARTTLS dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StarttlsProtocol {
    Smtp,
    Imap,
}

/// Expected greeting, upgrade command and expected go-ahead
struct Dialogue {
    greeting: &'static str,
    command: &'static str,
    ready: &'static str,
}

impl StarttlsProtocol {
    pub const SUPPORTED: [StarttlsProtocol; 2] = [StarttlsProtocol::Smtp, StarttlsProtocol::Imap];

    pub fn as_str(&self) -> &'static str {
        match self {
            StarttlsProtocol::Smtp => "smtp",
            StarttlsProtocol::Imap => "imap",
        }
    }

    fn dialogue(&self) -> Dialogue {
        match self {
            StarttlsProtocol::Smtp => Dialogue {
                greeting: "220 ",
                command: "STARTTLS",
                ready: "220 ",
            },
            StarttlsProtocol::Imap => Dialogue {
                greeting: "* OK ",
                command: "a001 STARTTLS",
                ready: "a001 OK Begin TLS negotiation now",
            },
        }
    }

    /// Run the upgrade dialogue on `stream`, connected to `target`.
    ///
    /// Any unexpected line fails with the offending response; the TLS
    /// handshake must not be attempted afterwards.
    pub async fn negotiate<S>(&self, stream: &mut S, target: &str) -> Result<(), ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let dialogue = self.dialogue();
        let mut reader = BufReader::new(stream);

        self.expect_line(&mut reader, dialogue.greeting, target).await?;

        debug!(protocol = self.as_str(), command = dialogue.command, "sending STARTTLS");
        let command = format!("{}\r\n", dialogue.command);
        let stream = reader.get_mut();
        stream
            .write_all(command.as_bytes())
            .await
            .map_err(|e| ConnectionError::from_io(target, e))?;
        stream
            .flush()
            .await
            .map_err(|e| ConnectionError::from_io(target, e))?;

        self.expect_line(&mut reader, dialogue.ready, target).await
    }

    async fn expect_line<S>(
        &self,
        reader: &mut BufReader<&mut S>,
        prefix: &str,
        target: &str,
    ) -> Result<(), ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut line = String::new();
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|e| ConnectionError::from_io(target, e))?;

        let response = line.trim_end_matches(&['\r', '\n'][..]).to_string();
        debug!(protocol = self.as_str(), %response, "received");

        if read == 0 || !response.starts_with(prefix) {
            return Err(ConnectionError::StartTlsNegotiationFailed {
                protocol: self.as_str().to_string(),
                response,
            });
        }
        Ok(())
    }
}

impl FromStr for StarttlsProtocol {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::SUPPORTED
            .iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| ConfigError::UnsupportedProtocol {
                protocol: s.to_string(),
            })
    }
}

impl std::fmt::Display for StarttlsProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
