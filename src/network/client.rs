//! Blocking client
//!
//! Speaks the wire protocol to a running server. Performs no validation of
//! identifiers or names; the server rejects bad input with BAD_REQUEST.

use std::io::{BufReader, BufWriter};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::error::{Result, StoreError};
use crate::protocol::{read_response, write_command, Command, MonitorReport, Response, Status};

/// Client connection to an authstore server
pub struct Client {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl Client {
    /// Connect, applying `timeout` to reads and writes when given
    pub fn connect(addr: impl ToSocketAddrs, timeout: Option<Duration>) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;

        Ok(Self {
            reader: BufReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
        })
    }

    /// Name stored for `id`, `None` if the server has no such user
    pub fn get(&mut self, id: &str) -> Result<Option<String>> {
        let response = self.request(Command::Get { id: id.to_string() })?;
        match response.status {
            Status::Ok => Ok(Some(response.text())),
            Status::NotFound => Ok(None),
            _ => Err(rejected(response)),
        }
    }

    pub fn set(&mut self, id: &str, name: &str) -> Result<()> {
        self.expect_ok(Command::Set {
            id: id.to_string(),
            name: name.to_string(),
        })
    }

    pub fn delete(&mut self, id: &str) -> Result<()> {
        self.expect_ok(Command::Delete { id: id.to_string() })
    }

    pub fn ping(&mut self) -> Result<()> {
        self.expect_ok(Command::Ping)
    }

    pub fn monitor(&mut self) -> Result<MonitorReport> {
        let response = self.request(Command::Monitor)?;
        if response.status != Status::Ok {
            return Err(rejected(response));
        }

        let payload = response.payload.unwrap_or_default();
        serde_json::from_slice(&payload).map_err(|e| StoreError::Decode(e.to_string()))
    }

    /// Send one command and wait for its response
    pub fn request(&mut self, command: Command) -> Result<Response> {
        tracing::trace!("client: sending {:?}", command.command_type());
        write_command(&mut self.writer, &command)?;
        read_response(&mut self.reader)
    }

    fn expect_ok(&mut self, command: Command) -> Result<()> {
        let response = self.request(command)?;
        match response.status {
            Status::Ok => Ok(()),
            _ => Err(rejected(response)),
        }
    }
}

fn rejected(response: Response) -> StoreError {
    StoreError::Rejected {
        status: response.status,
        message: response.text(),
    }
}
