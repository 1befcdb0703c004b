//! Command definitions
//!
//! Represents commands from clients.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Set = 0x02,
    Delete = 0x03,
    Ping = 0x04,
    Monitor = 0x05,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Look up the name for an identifier
    Get { id: String },

    /// Store a name under an identifier
    Set { id: String, name: String },

    /// Remove an identifier
    Delete { id: String },

    /// Ping (health check)
    Ping,

    /// Request statistics
    Monitor,
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Set { .. } => CommandType::Set,
            Command::Delete { .. } => CommandType::Delete,
            Command::Ping => CommandType::Ping,
            Command::Monitor => CommandType::Monitor,
        }
    }
}
