//! Operator console commands.
//!
//! Each stdin line is either a console keyword or a knock. Only the exact
//! knock tokens (`l`, `r`, `1`, `2`, `left`, `right`, any case) knock; the
//! peripheral's looser prefix matching is not used here, so a mistyped
//! command such as `restart` is reported instead of entering the window.

use doorknock_core::Zone;

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    /// Clear the knock window.
    Reset,
    Status,
    /// Host went to the background.
    Hide,
    /// Host came back to the foreground.
    Show,
    /// Send raw text to the peripheral.
    Send(String),
    /// Inject a line as if the peripheral sent it (demo transport only).
    Peer(String),
    Help,
    Quit,
    Knock(Zone),
    Empty,
    Unknown(String),
}

impl Command {
    /// Parse one console line.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Command::Empty;
        }

        let (keyword, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((keyword, rest)) => (keyword, rest.trim()),
            None => (trimmed, ""),
        };

        match keyword.to_ascii_lowercase().as_str() {
            "connect" => Command::Connect,
            "disconnect" => Command::Disconnect,
            "reset" => Command::Reset,
            "status" => Command::Status,
            "hide" | "background" => Command::Hide,
            "show" | "foreground" => Command::Show,
            "send" if !rest.is_empty() => Command::Send(rest.to_string()),
            "peer" if !rest.is_empty() => Command::Peer(rest.to_string()),
            "help" | "?" => Command::Help,
            "quit" | "exit" => Command::Quit,
            "l" | "1" | "left" if rest.is_empty() => Command::Knock(Zone::Left),
            "r" | "2" | "right" if rest.is_empty() => Command::Knock(Zone::Right),
            _ => Command::Unknown(trimmed.to_string()),
        }
    }
}

pub const HELP: &str = "\
commands:
  L | R | 1 | 2 | left | right   simulated knock
  connect | disconnect            link lifecycle
  hide | show                     host visibility (hide disconnects)
  reset                           clear the knock window
  send <text>                     write <text> + delimiter to the peripheral
  peer <line>                     inject a peripheral line (--demo only)
  status | help | quit";
