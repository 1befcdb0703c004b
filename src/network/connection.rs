//! Per-client session
//!
//! One thread per admitted client. Commands are answered strictly in order;
//! the session ends when the client hangs up or goes idle past the read
//! timeout.

use std::io::{self, BufReader, BufWriter, ErrorKind};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::engine::Engine;
use crate::error::{Result, StoreError};
use crate::protocol::{read_command, write_response, Command, Response};

/// A client socket bound to the engine
pub struct Connection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    engine: Arc<Engine>,
    peer: String,
}

impl Connection {
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        let peer = match stream.peer_addr() {
            Ok(addr) => addr.to_string(),
            Err(_) => String::from("<unknown peer>"),
        };

        // Responses are small; send them without coalescing
        stream.set_nodelay(true)?;

        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
            engine,
            peer,
        })
    }

    /// Apply socket timeouts; 0 leaves that direction without a timeout
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let socket = self.writer.get_ref();
        socket.set_read_timeout(as_timeout(read_ms))?;
        socket.set_write_timeout(as_timeout(write_ms))?;
        Ok(())
    }

    /// Serve requests until the client leaves
    ///
    /// A clean hang-up or an idle timeout returns `Ok`. A malformed frame is
    /// answered with ERROR and ends the session with the decode error.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("{}: session started", self.peer);

        while let Some(command) = self.next_command()? {
            tracing::trace!("{}: {:?}", self.peer, command.command_type());

            let response = self.engine.execute(command);
            match write_response(&mut self.writer, &response) {
                Ok(()) => {}
                Err(StoreError::Io(e)) if is_disconnect(&e) => {
                    tracing::debug!("{}: gone before the response was sent", self.peer);
                    break;
                }
                Err(e) => {
                    tracing::warn!("{}: write failed: {}", self.peer, e);
                    return Err(e);
                }
            }
        }

        tracing::debug!("{}: session ended", self.peer);
        Ok(())
    }

    pub fn peer_addr(&self) -> &str {
        &self.peer
    }

    /// Next command, or `None` once the client has hung up or gone idle
    fn next_command(&mut self) -> Result<Option<Command>> {
        match read_command(&mut self.reader) {
            Ok(command) => Ok(Some(command)),
            Err(StoreError::Io(e)) if is_disconnect(&e) => Ok(None),
            // Unix reports an expired read timeout as WouldBlock, Windows as TimedOut
            Err(StoreError::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                tracing::debug!("{}: idle timeout", self.peer);
                Ok(None)
            }
            Err(e) => {
                tracing::warn!("{}: bad request frame: {}", self.peer, e);
                let _ = write_response(&mut self.writer, &Response::error(&e.to_string()));
                Err(e)
            }
        }
    }
}

fn as_timeout(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

fn is_disconnect(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::UnexpectedEof
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}
