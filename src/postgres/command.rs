//! Parses a `CommandComplete` tag string (e.g. `"INSERT 0 3"`) into a
//! structured [`CommandResult`].
use super::ProtocolError;
use crate::common::ByteStr;

/// The parsed outcome of a completed SQL command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandResult {
    InsertCompleted { oid: u32, rows: u64 },
    DeleteCompleted { rows: u64 },
    UpdateCompleted { rows: u64 },
    SelectCompleted { rows: u64 },
    MoveCompleted { rows: u64 },
    FetchCompleted { rows: u64 },
    CopyCompleted { rows: u64 },
    /// Any command tag this parser does not special-case (e.g. `"VACUUM"`,
    /// `"CREATE TABLE"`, `"SET"`).
    CommandOk,
}

pub fn parse(tag: &ByteStr) -> Result<CommandResult, ProtocolError> {
    let mut parts = tag.as_str().split(' ');
    let malformed = || ProtocolError::MalformedCommandTag(tag.clone());

    let Some(command) = parts.next() else {
        return Ok(CommandResult::CommandOk);
    };

    let parse_u64 = |s: Option<&str>| s.and_then(|s| s.parse().ok()).ok_or_else(malformed);

    match command {
        "INSERT" => {
            let oid: u32 = parse_u64(parts.next())?.try_into().map_err(|_| malformed())?;
            let rows = parse_u64(parts.next())?;
            Ok(CommandResult::InsertCompleted { oid, rows })
        }
        "DELETE" => Ok(CommandResult::DeleteCompleted { rows: parse_u64(parts.next())? }),
        "UPDATE" => Ok(CommandResult::UpdateCompleted { rows: parse_u64(parts.next())? }),
        "SELECT" => Ok(CommandResult::SelectCompleted { rows: parse_u64(parts.next())? }),
        "MOVE" => Ok(CommandResult::MoveCompleted { rows: parse_u64(parts.next())? }),
        "FETCH" => Ok(CommandResult::FetchCompleted { rows: parse_u64(parts.next())? }),
        "COPY" => Ok(CommandResult::CopyCompleted { rows: parse_u64(parts.next())? }),
        _ => Ok(CommandResult::CommandOk),
    }
}
