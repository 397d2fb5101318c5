use std::io::{ErrorKind, Read};
use std::net::TcpStream;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use ssh2::{Channel, Session};

use super::{RemoteConnector, RemoteOutput, RemoteSession};
use crate::config::Settings;

const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Password-authenticated SSH connection factory for the IBM i host.
#[derive(Debug, Clone)]
pub struct SshConnector {
    settings: Settings,
}

impl SshConnector {
    #[must_use]
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }
}

impl RemoteConnector for SshConnector {
    type Session = SshSession;

    fn connect(&self) -> Result<SshSession> {
        let address = (self.settings.host.as_str(), self.settings.port);
        let tcp = TcpStream::connect(address).with_context(|| {
            format!(
                "failed to reach {}:{}",
                self.settings.host, self.settings.port
            )
        })?;

        let mut session = Session::new().context("failed to create ssh session")?;
        session.set_tcp_stream(tcp);
        session.handshake().context("ssh handshake failed")?;
        session
            .userauth_password(&self.settings.user, &self.settings.password)
            .with_context(|| format!("ssh authentication failed for {}", self.settings.user))?;
        if !session.authenticated() {
            bail!("ssh authentication failed for {}", self.settings.user);
        }

        tracing::debug!(
            host = %self.settings.host,
            port = self.settings.port,
            "ssh session opened"
        );
        Ok(SshSession {
            session: Some(session),
        })
    }
}

pub struct SshSession {
    session: Option<Session>,
}

impl RemoteSession for SshSession {
    fn exec(&mut self, script: &str) -> Result<RemoteOutput> {
        let Some(session) = self.session.as_ref() else {
            bail!("ssh session is already closed");
        };

        let mut channel = session
            .channel_session()
            .context("failed to open ssh channel")?;
        channel
            .exec(script)
            .context("failed to start remote script")?;

        session.set_blocking(false);
        let drained = drain_streams(&mut channel);
        session.set_blocking(true);
        let (stdout, stderr) = drained?;

        channel
            .wait_close()
            .context("failed to close ssh channel")?;

        Ok(RemoteOutput::from_bytes(&stdout, &stderr))
    }

    fn close(&mut self) -> Result<()> {
        if let Some(session) = self.session.take() {
            session
                .disconnect(None, "askdb2 request complete", None)
                .context("ssh disconnect failed")?;
        }
        Ok(())
    }
}

/// Reads stdout and stderr in turns until the remote side sends EOF, so a
/// full stderr window can never stall the stdout read. Expects the session
/// to be in non-blocking mode.
fn drain_streams(channel: &mut Channel) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();
    let mut buffer = [0_u8; 8192];
    loop {
        let at_eof = channel.eof();
        let read_stdout = read_available(&mut *channel, &mut stdout, &mut buffer)
            .context("failed to read remote stdout")?;
        let read_stderr = read_available(&mut channel.stderr(), &mut stderr, &mut buffer)
            .context("failed to read remote stderr")?;
        if read_stdout + read_stderr == 0 {
            if at_eof {
                break;
            }
            thread::sleep(DRAIN_POLL_INTERVAL);
        }
    }
    Ok((stdout, stderr))
}

/// Appends whatever `stream` has ready and returns the byte count. A
/// would-block or end-of-stream read ends the turn.
fn read_available<R: Read>(
    stream: &mut R,
    sink: &mut Vec<u8>,
    buffer: &mut [u8],
) -> std::io::Result<usize> {
    let mut total = 0;
    loop {
        match stream.read(buffer) {
            Ok(0) => return Ok(total),
            Ok(read) => {
                sink.extend_from_slice(&buffer[..read]);
                total += read;
            }
            Err(error) if error.kind() == ErrorKind::WouldBlock => return Ok(total),
            Err(error) if error.kind() == ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
}
