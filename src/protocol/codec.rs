//! Frame codec
//!
//! Every message, in both directions, is one frame:
//!
//! ```text
//! tag (1) | payload length (4, big-endian) | payload
//! ```
//!
//! The tag is the command type for requests and the status for responses.
//! Identifiers inside a payload carry their own 4-byte length so a SET can
//! put the name directly after the id. All text is UTF-8.

use std::io::{self, ErrorKind, Read, Write};

use crate::error::{Result, StoreError};

use super::{Command, CommandType, Response, Status};

/// Bytes before the payload: tag + length
pub const HEADER_SIZE: usize = 5;

/// Largest payload accepted from the wire (16 MiB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Commands
// =============================================================================

pub fn encode_command(command: &Command) -> Vec<u8> {
    let mut payload = Vec::new();
    match command {
        Command::Get { id } | Command::Delete { id } => put_id(&mut payload, id),
        Command::Set { id, name } => {
            put_id(&mut payload, id);
            payload.extend_from_slice(name.as_bytes());
        }
        Command::Ping | Command::Monitor => {}
    }

    frame(command.command_type() as u8, &payload)
}

/// Parse one complete request frame
///
/// GET, DEL, PING and MONITOR must not carry bytes beyond their fields.
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (tag, payload) = split_frame(bytes)?;
    let kind = command_type(tag)?;

    let command = match kind {
        CommandType::Get => Command::Get {
            id: only_id(payload, "GET")?,
        },
        CommandType::Delete => Command::Delete {
            id: only_id(payload, "DEL")?,
        },
        CommandType::Set => {
            let (id, name) = take_id(payload, "SET")?;
            Command::Set {
                id,
                name: text(name, "SET name")?,
            }
        }
        CommandType::Ping | CommandType::Monitor => {
            if !payload.is_empty() {
                return Err(StoreError::Protocol(format!(
                    "{:?} takes no payload, got {} bytes",
                    kind,
                    payload.len()
                )));
            }
            if kind == CommandType::Ping {
                Command::Ping
            } else {
                Command::Monitor
            }
        }
    };

    Ok(command)
}

fn command_type(tag: u8) -> Result<CommandType> {
    Ok(match tag {
        0x01 => CommandType::Get,
        0x02 => CommandType::Set,
        0x03 => CommandType::Delete,
        0x04 => CommandType::Ping,
        0x05 => CommandType::Monitor,
        other => {
            return Err(StoreError::Protocol(format!(
                "unknown command tag 0x{:02x}",
                other
            )))
        }
    })
}

fn put_id(payload: &mut Vec<u8>, id: &str) {
    payload.extend_from_slice(&(id.len() as u32).to_be_bytes());
    payload.extend_from_slice(id.as_bytes());
}

/// Split `len (4) | id` off the front of `payload`, returning the id and the rest
fn take_id<'a>(payload: &'a [u8], what: &str) -> Result<(String, &'a [u8])> {
    if payload.len() < 4 {
        return Err(StoreError::Protocol(format!("{}: id length missing", what)));
    }
    let (len, rest) = payload.split_at(4);
    let len = u32::from_be_bytes([len[0], len[1], len[2], len[3]]) as usize;

    if rest.len() < len {
        return Err(StoreError::Protocol(format!(
            "{}: id of {} bytes but only {} remain",
            what,
            len,
            rest.len()
        )));
    }

    let (id, rest) = rest.split_at(len);
    Ok((text(id, what)?, rest))
}

fn only_id(payload: &[u8], what: &str) -> Result<String> {
    let (id, rest) = take_id(payload, what)?;
    if !rest.is_empty() {
        return Err(StoreError::Protocol(format!(
            "{}: {} stray bytes after id",
            what,
            rest.len()
        )));
    }
    Ok(id)
}

fn text(bytes: &[u8], what: &str) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| StoreError::Protocol(format!("{}: not UTF-8 ({})", what, e)))
}

// =============================================================================
// Responses
// =============================================================================

pub fn encode_response(response: &Response) -> Vec<u8> {
    frame(
        response.status as u8,
        response.payload.as_deref().unwrap_or_default(),
    )
}

/// Parse one complete response frame; an empty payload becomes `None`
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (tag, payload) = split_frame(bytes)?;

    let status = match tag {
        0x00 => Status::Ok,
        0x01 => Status::NotFound,
        0x02 => Status::Error,
        0x03 => Status::BadRequest,
        0x04 => Status::Busy,
        other => {
            return Err(StoreError::Protocol(format!(
                "unknown status tag 0x{:02x}",
                other
            )))
        }
    };

    Ok(Response {
        status,
        payload: (!payload.is_empty()).then(|| payload.to_vec()),
    })
}

// =============================================================================
// Framing
// =============================================================================

fn frame(tag: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_SIZE + payload.len());
    out.push(tag);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(payload);
    out
}

/// Length field of a header, rejected if over `MAX_PAYLOAD_SIZE`
fn declared_len(header: &[u8]) -> Result<usize> {
    let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]);
    if len > MAX_PAYLOAD_SIZE {
        return Err(StoreError::Protocol(format!(
            "frame of {} bytes exceeds the {} byte limit",
            len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(len as usize)
}

/// (tag, payload) of the frame at the start of `bytes`
fn split_frame(bytes: &[u8]) -> Result<(u8, &[u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(StoreError::Protocol(format!(
            "short frame: {} of {} header bytes",
            bytes.len(),
            HEADER_SIZE
        )));
    }
    let (header, body) = bytes.split_at(HEADER_SIZE);

    let len = declared_len(header)?;
    if body.len() < len {
        return Err(StoreError::Protocol(format!(
            "short frame: payload has {} of {} bytes",
            body.len(),
            len
        )));
    }

    Ok((header[0], &body[..len]))
}

// =============================================================================
// Streams
// =============================================================================

/// Block until one whole frame has been read
///
/// The buffer grows with the bytes that actually arrive, so a header that
/// declares a large payload costs nothing until the payload is sent.
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;
    let len = declared_len(&header)?;

    let mut frame = header.to_vec();
    let got = reader.take(len as u64).read_to_end(&mut frame)?;
    if got < len {
        return Err(io::Error::new(
            ErrorKind::UnexpectedEof,
            format!("frame payload ended after {} of {} bytes", got, len),
        )
        .into());
    }
    Ok(frame)
}

fn write_frame<W: Write>(writer: &mut W, frame: &[u8]) -> Result<()> {
    writer.write_all(frame)?;
    writer.flush()?;
    Ok(())
}

pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader)?)
}

pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    write_frame(writer, &encode_command(command))
}

pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader)?)
}

pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    write_frame(writer, &encode_response(response))
}
