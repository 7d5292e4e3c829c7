//! Terminal presentation and command parsing

use crate::application::ports::outbound::PresentationPort;

/// Prints dialogue lines to standard output
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsolePresenter;

impl PresentationPort for ConsolePresenter {
    fn show_dialogue(&self, speaker: &str, text: &str) {
        println!("{}", format_line(speaker, text));
    }
}

pub fn format_line(speaker: &str, text: &str) -> String {
    format!("[{}] {}", speaker, text)
}

/// A line of player input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    /// Plain text; empty asks the current character to continue
    Say(String),
    Go(String),
    Cancel,
    Regenerate,
    Memory,
    Emotions,
    Plot(Option<usize>),
    Relationship,
    System(String),
    History,
    Help,
    Quit,
    Unknown(String),
}

pub const HELP_TEXT: &str = "\
Type to talk. An empty line lets the current character continue.
  /go <location>     travel (say goodbye first if someone is here)
  /cancel            stay where you are
  /regen             regenerate the last reply
  /memory            summarize the scene from the character's view
  /emotions          analyze everyone's emotional state
  /plot [n]          summarize the plot, optionally the last n messages
  /relationship      describe the current relationship
  /system <text>     send a custom system instruction
  /history           show the conversation
  /quit              leave";

pub fn parse_command(line: &str) -> ConsoleCommand {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return ConsoleCommand::Say(line.to_string());
    };

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };

    match name.to_ascii_lowercase().as_str() {
        "go" if !arg.is_empty() => ConsoleCommand::Go(arg.to_string()),
        "cancel" => ConsoleCommand::Cancel,
        "regen" => ConsoleCommand::Regenerate,
        "memory" => ConsoleCommand::Memory,
        "emotions" => ConsoleCommand::Emotions,
        "plot" => ConsoleCommand::Plot(arg.parse().ok()),
        "relationship" => ConsoleCommand::Relationship,
        "system" if !arg.is_empty() => ConsoleCommand::System(arg.to_string()),
        "history" => ConsoleCommand::History,
        "help" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        _ => ConsoleCommand::Unknown(line.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_line() {
        assert_eq!(format_line("SYSTEM", "Hello."), "[SYSTEM] Hello.");
    }

    #[test]
    fn test_plain_text_and_empty_lines() {
        assert_eq!(parse_command("  hi there "), ConsoleCommand::Say("hi there".into()));
        assert_eq!(parse_command(""), ConsoleCommand::Say(String::new()));
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(parse_command("/go Old Mill"), ConsoleCommand::Go("Old Mill".into()));
        assert_eq!(parse_command("/plot 6"), ConsoleCommand::Plot(Some(6)));
        assert_eq!(parse_command("/plot"), ConsoleCommand::Plot(None));
        assert_eq!(
            parse_command("/system Describe the weather."),
            ConsoleCommand::System("Describe the weather.".into())
        );
    }

    #[test]
    fn test_missing_arguments_are_unknown() {
        assert_eq!(parse_command("/go"), ConsoleCommand::Unknown("/go".into()));
        assert_eq!(parse_command("/system  "), ConsoleCommand::Unknown("/system".into()));
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse_command("/REGEN"), ConsoleCommand::Regenerate);
        assert_eq!(parse_command("/quit"), ConsoleCommand::Quit);
        assert_eq!(parse_command("/history"), ConsoleCommand::History);
        assert_eq!(parse_command("/dance"), ConsoleCommand::Unknown("/dance".into()));
    }
}
