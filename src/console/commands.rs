use crate::models::session::SessionId;
use crate::models::user::{Principal, RoleChoice};
use crate::validation::session_form::SessionForm;
use std::path::PathBuf;
use thiserror::Error;

pub const HELP: &str = "\
commands:
  goto <path>                       open a page, one of
                                    /, /scan, /history, /delivery, /admin/sessions, /admin/overview
  menu                              dashboard entries for the caller
  scan <image-path>                 read the QR code in a photo and check in
  checkin <code>                    submit a typed code
  retry                             clear the last check-in result
  history                           your check-ins
  register <student|teacher> <name> first-login registration
  sessions                          all sessions with their codes (admin)
  create <name> <YYYY-MM-DD> <HH:MM> <YYYY-MM-DD> <HH:MM>
                                    new session (admin)
  overview <session-id>             attendance of one session (admin)
  inspect <principal>               profile and check-ins of a user (admin)
  logout
  quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Goto(String),
    Menu,
    CheckIn(String),
    ScanImage(PathBuf),
    Retry,
    History,
    Register { choice: RoleChoice, name: String },
    Sessions,
    Create(SessionForm),
    Overview(SessionId),
    Inspect(Principal),
    Logout,
    Help,
    Quit,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unknown command '{0}', try 'help'")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),
}

/// Parse one input line; blank lines yield `None`
pub fn parse(line: &str) -> Result<Option<Command>, ParseError> {
    let line = line.trim();
    let Some((word, rest)) = split_word(line) else {
        return Ok(None);
    };

    let command = match word.to_ascii_lowercase().as_str() {
        "goto" | "go" => Command::Goto(required(rest, "goto <path>")?.to_string()),
        "menu" | "dashboard" => Command::Menu,
        "checkin" => Command::CheckIn(required(rest, "checkin <code>")?.to_string()),
        "scan" => Command::ScanImage(PathBuf::from(required(rest, "scan <image-path>")?)),
        "retry" => Command::Retry,
        "history" => Command::History,
        "register" => parse_register(rest)?,
        "sessions" => Command::Sessions,
        "create" => parse_create(rest)?,
        "overview" => {
            let id = required(rest, "overview <session-id>")?
                .parse()
                .map_err(|_| ParseError::Usage("overview <session-id>"))?;
            Command::Overview(id)
        }
        "inspect" => Command::Inspect(Principal::new(required(rest, "inspect <principal>")?)),
        "logout" => Command::Logout,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(ParseError::Unknown(other.to_string())),
    };

    Ok(Some(command))
}

fn split_word(line: &str) -> Option<(&str, &str)> {
    if line.is_empty() {
        return None;
    }
    match line.split_once(char::is_whitespace) {
        Some((word, rest)) => Some((word, rest.trim())),
        None => Some((line, "")),
    }
}

fn required<'a>(rest: &'a str, usage: &'static str) -> Result<&'a str, ParseError> {
    if rest.is_empty() {
        Err(ParseError::Usage(usage))
    } else {
        Ok(rest)
    }
}

fn parse_register(rest: &str) -> Result<Command, ParseError> {
    const USAGE: &str = "register <student|teacher> <name>";
    let (role, name) = split_word(rest).ok_or(ParseError::Usage(USAGE))?;
    let choice = RoleChoice::parse(role).ok_or(ParseError::Usage(USAGE))?;

    // Blank names are left to registration so the user sees its message
    Ok(Command::Register {
        choice,
        name: name.to_string(),
    })
}

fn parse_create(rest: &str) -> Result<Command, ParseError> {
    const USAGE: &str = "create <name> <YYYY-MM-DD> <HH:MM> <YYYY-MM-DD> <HH:MM>";
    let words: Vec<&str> = rest.split_whitespace().collect();
    if words.len() < 5 {
        return Err(ParseError::Usage(USAGE));
    }

    let (name, when) = words.split_at(words.len() - 4);
    Ok(Command::Create(SessionForm {
        name: name.join(" "),
        start_date: when[0].to_string(),
        start_time: when[1].to_string(),
        end_date: when[2].to_string(),
        end_time: when[3].to_string(),
    }))
}
