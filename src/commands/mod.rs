//! Chat commands: `.ping`, `!help`, ... answered instantly from process state.

mod calc;
mod status;

#[cfg(test)]
mod tests;

use edison_core::state::Phase;
use std::time::Duration;

/// Characters that mark a message as a command.
pub const PREFIXES: [char; 2] = ['.', '!'];

/// What a command may read while building its reply.
pub struct CommandContext<'a> {
    pub phase: Phase,
    pub remote_identity: Option<&'a str>,
    pub uptime: Duration,
    pub memory_bytes: Option<u64>,
}

/// Known bot commands, with their argument string where one is used.
#[derive(Debug, PartialEq)]
pub enum Command {
    Ping,
    Help,
    Time,
    Status,
    Echo(String),
    Calc(String),
    Unknown(String),
}

impl Command {
    /// Parse a command from message text. Returns `None` when the text does not
    /// start with a command prefix.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.strip_prefix(PREFIXES)?;
        let (name, args) = match rest.find(char::is_whitespace) {
            Some(i) => {
                let sep = rest[i..].chars().next().map_or(1, char::len_utf8);
                (&rest[..i], &rest[i + sep..])
            }
            None => (rest, ""),
        };
        let name = name.to_lowercase();
        Some(match name.as_str() {
            "ping" => Self::Ping,
            "help" => Self::Help,
            "time" => Self::Time,
            "status" => Self::Status,
            "echo" => Self::Echo(args.to_string()),
            "calc" => Self::Calc(args.to_string()),
            _ => Self::Unknown(name),
        })
    }

    /// Lower-cased command name as typed.
    pub fn name(&self) -> &str {
        match self {
            Self::Ping => "ping",
            Self::Help => "help",
            Self::Time => "time",
            Self::Status => "status",
            Self::Echo(_) => "echo",
            Self::Calc(_) => "calc",
            Self::Unknown(name) => name,
        }
    }
}

/// Build the reply for a parsed command.
pub fn handle(cmd: &Command, ctx: &CommandContext<'_>) -> String {
    match cmd {
        Command::Ping => status::handle_ping(ctx),
        Command::Help => status::handle_help(),
        Command::Time => status::handle_time(),
        Command::Status => status::handle_status(ctx),
        Command::Echo(args) => handle_echo(args),
        Command::Calc(args) => handle_calc(args),
        Command::Unknown(name) => {
            format!("❓ Unknown command: {name}\nType .help for available commands.")
        }
    }
}

fn handle_echo(args: &str) -> String {
    if args.trim().is_empty() {
        "Usage: .echo [text]".to_string()
    } else {
        args.to_string()
    }
}

fn handle_calc(args: &str) -> String {
    let expr = args.trim();
    match calc::evaluate(expr) {
        Ok(result) => format!("{expr} = {result}"),
        Err(calc::CalcError::InvalidCharacters) => {
            "Invalid expression. Only numbers and + - * / ( ) allowed.".to_string()
        }
        Err(_) => "Calculation error. Please check your expression.".to_string(),
    }
}
