//! Controller wire protocol
//!
//! Controllers speak plain text: a three letter opcode followed by
//! space-delimited fields. Outbound messages separate their fields with a
//! literal double backslash.

use std::fmt;

/// Separator between outbound fields
pub const FIELD_SEPARATOR: &str = "\\\\";

/// Registration payload of a `NEW` message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub hat_id: u32,
    pub character_id: u32,
    pub name: String,
}

/// Messages sent from a controller to the server
#[derive(Debug, Clone, PartialEq)]
pub enum ClientCommand {
    /// `NEW <hatId> <charId> <name...>`
    Register(Registration),
    /// `BTN GREEN`
    Jump,
    /// `BAL <signedFloat> [...]`
    Balance(f32),
    /// `BTN RED`
    ArmBomb,
    /// `RSP <index>`
    TriviaResponse(String),
}

impl ClientCommand {
    /// Decode one inbound text message
    pub fn parse(message: &str) -> Result<Self, ProtocolError> {
        let message = message.trim();
        let mut fields = message.split(' ').filter(|f| !f.is_empty());
        let opcode = fields.next().ok_or(ProtocolError::Empty)?;

        match opcode {
            "NEW" => {
                let hat_id = parse_id(fields.next(), "hat id")?;
                let character_id = parse_id(fields.next(), "character id")?;
                let name = fields.collect::<Vec<_>>().join(" ");
                if name.is_empty() {
                    return Err(ProtocolError::MissingField("name"));
                }
                Ok(Self::Register(Registration {
                    hat_id,
                    character_id,
                    name,
                }))
            }
            "BTN" => match fields.next() {
                Some("GREEN") => Ok(Self::Jump),
                Some("RED") => Ok(Self::ArmBomb),
                Some(other) => Err(ProtocolError::UnknownButton(other.to_string())),
                None => Err(ProtocolError::MissingField("button")),
            },
            "BAL" => {
                let raw = fields.next().ok_or(ProtocolError::MissingField("balance"))?;
                let value: f32 = raw.parse().map_err(|_| ProtocolError::InvalidNumber {
                    field: "balance",
                    value: raw.to_string(),
                })?;
                if !value.is_finite() {
                    return Err(ProtocolError::InvalidNumber {
                        field: "balance",
                        value: raw.to_string(),
                    });
                }
                Ok(Self::Balance(value))
            }
            "RSP" => {
                let answer = message[opcode.len()..].trim();
                if answer.is_empty() {
                    return Err(ProtocolError::MissingField("answer"));
                }
                Ok(Self::TriviaResponse(answer.to_string()))
            }
            other => Err(ProtocolError::UnknownOpcode(other.to_string())),
        }
    }
}

fn parse_id(field: Option<&str>, name: &'static str) -> Result<u32, ProtocolError> {
    let raw = field.ok_or(ProtocolError::MissingField(name))?;
    raw.parse().map_err(|_| ProtocolError::InvalidNumber {
        field: name,
        value: raw.to_string(),
    })
}

/// Messages pushed from the server to every controller
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMsg {
    /// Periodic bomb count for one player
    Bombs { name: String, bombs_left: u32 },
    /// Periodic health for one player
    Health { name: String, health: f32 },
    /// New trivia question with its three choices
    Question { prompt: String, choices: [String; 3] },
}

impl fmt::Display for ServerMsg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sep = FIELD_SEPARATOR;
        match self {
            Self::Bombs { name, bombs_left } => write!(f, "BOM{sep}{name}{sep}{bombs_left}"),
            Self::Health { name, health } => write!(f, "HEL{sep}{name}{sep}{health:.1}"),
            Self::Question { prompt, choices } => write!(
                f,
                "QUE{sep}{prompt}{sep}{}{sep}{}{sep}{}",
                choices[0], choices[1], choices[2]
            ),
        }
    }
}

/// Control message decoding errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty message")]
    Empty,

    #[error("unknown opcode {0:?}")]
    UnknownOpcode(String),

    #[error("unknown button {0:?}")]
    UnknownButton(String),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("invalid number for {field}: {value:?}")]
    InvalidNumber { field: &'static str, value: String },
}
