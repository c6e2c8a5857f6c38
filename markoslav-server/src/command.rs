//! Slash-command parsing for chat messages.

use std::fmt;

/// A bot command, as typed by a chat member
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    Start,
    Help,
    /// Begin suggesting a caption
    Suggest,
    /// Begin reviewing pending captions (admins only)
    Approve,
    /// Abort whatever workflow is in progress
    Cancel,
    /// Any other `/word`. Never routed to a workflow, but still never
    /// mistaken for caption text.
    Other(String),
}

/// Result of parsing a message for a bot command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    /// The message does not start with `/`
    NotACommand,
    /// A command was found
    Command(BotCommand),
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BotCommand::Start => write!(f, "/start"),
            BotCommand::Help => write!(f, "/help"),
            BotCommand::Suggest => write!(f, "/suggest"),
            BotCommand::Approve => write!(f, "/approve"),
            BotCommand::Cancel => write!(f, "/cancel"),
            BotCommand::Other(name) => write!(f, "/{}", name),
        }
    }
}

/// Parse a message text for a bot command
///
/// # Command Format
///
/// `/name[@botname] [arguments...]`
///
/// Only the first whitespace-separated token is inspected. Names are
/// case-insensitive. A `@botname` suffix is stripped regardless of which bot
/// it names; group chats with several bots are not disambiguated.
///
/// Arguments are ignored: none of the commands take any.
///
/// - `/suggest` returns `Command(Suggest)`
/// - `/Approve@markoslav_bot` returns `Command(Approve)`
/// - `/foo` returns `Command(Other("foo"))`
/// - `/` alone returns `Command(Other(""))`
/// - `hello /cancel` returns `NotACommand`
pub fn parse_command(text: &str) -> ParseResult {
    let trimmed = text.trim_start();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return ParseResult::NotACommand;
    };

    let token = rest.split_whitespace().next().unwrap_or("");
    let name = match token.split_once('@') {
        Some((name, _bot)) => name,
        None => token,
    };

    let command = if name.eq_ignore_ascii_case("start") {
        BotCommand::Start
    } else if name.eq_ignore_ascii_case("help") {
        BotCommand::Help
    } else if name.eq_ignore_ascii_case("suggest") {
        BotCommand::Suggest
    } else if name.eq_ignore_ascii_case("approve") {
        BotCommand::Approve
    } else if name.eq_ignore_ascii_case("cancel") {
        BotCommand::Cancel
    } else {
        BotCommand::Other(name.to_lowercase())
    };

    ParseResult::Command(command)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn command(cmd: BotCommand) -> ParseResult {
        ParseResult::Command(cmd)
    }

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(parse_command("/start"), command(BotCommand::Start));
        assert_eq!(parse_command("/help"), command(BotCommand::Help));
        assert_eq!(parse_command("/suggest"), command(BotCommand::Suggest));
        assert_eq!(parse_command("/approve"), command(BotCommand::Approve));
        assert_eq!(parse_command("/cancel"), command(BotCommand::Cancel));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!(parse_command("/Suggest"), command(BotCommand::Suggest));
        assert_eq!(parse_command("/CANCEL"), command(BotCommand::Cancel));
    }

    #[test]
    fn test_parse_strips_bot_name() {
        assert_eq!(
            parse_command("/approve@markoslav_bot"),
            command(BotCommand::Approve)
        );
        assert_eq!(
            parse_command("/help@SomeOtherBot"),
            command(BotCommand::Help)
        );
    }

    #[test]
    fn test_parse_ignores_arguments() {
        assert_eq!(
            parse_command("/suggest some text"),
            command(BotCommand::Suggest)
        );
        assert_eq!(parse_command("  /cancel now"), command(BotCommand::Cancel));
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            parse_command("/Foo"),
            command(BotCommand::Other("foo".to_string()))
        );
        assert_eq!(
            parse_command("/"),
            command(BotCommand::Other(String::new()))
        );
    }

    #[test]
    fn test_not_a_command() {
        assert_eq!(parse_command("марк"), ParseResult::NotACommand);
        assert_eq!(parse_command("hello /cancel"), ParseResult::NotACommand);
        assert_eq!(parse_command(""), ParseResult::NotACommand);
    }

    #[test]
    fn test_display_round_trips_known_commands() {
        for cmd in [
            BotCommand::Start,
            BotCommand::Help,
            BotCommand::Suggest,
            BotCommand::Approve,
            BotCommand::Cancel,
        ] {
            assert_eq!(parse_command(&cmd.to_string()), command(cmd));
        }
    }

    proptest! {
        /// Property: parsing never panics, and anything starting with '/' is a command.
        #[test]
        fn parse_never_panics(text in "\\PC*") {
            let result = parse_command(&text);
            if text.trim_start().starts_with('/') {
                prop_assert!(matches!(result, ParseResult::Command(_)));
            } else {
                prop_assert_eq!(result, ParseResult::NotACommand);
            }
        }
    }
}
