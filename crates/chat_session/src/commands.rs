use generation_provider::{ChatMode, ConversationId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    New,
    Open(ConversationId),
    Mode(ChatMode),
    Reset,
    List,
    Quit,
    /// Known command with a missing or malformed argument.
    Usage(&'static str),
    Unknown(String),
}

pub const HELP_TEXT: &str =
    "Commands: /help, /new, /open <id>, /mode <search|fast|fast-code|coding>, /reset, /list, /quit";

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let mut words = trimmed.split_whitespace();
    let command = words.next().unwrap_or(trimmed).to_string();
    let argument = words.next();

    let parsed = match command.as_str() {
        "/help" => SlashCommand::Help,
        "/new" => SlashCommand::New,
        "/open" => match argument.and_then(|value| value.parse().ok()) {
            Some(id) => SlashCommand::Open(id),
            None => SlashCommand::Usage("Usage: /open <id>"),
        },
        "/mode" => match argument.and_then(|value| value.parse().ok()) {
            Some(mode) => SlashCommand::Mode(mode),
            None => SlashCommand::Usage("Usage: /mode <search|fast|fast-code|coding>"),
        },
        "/reset" => SlashCommand::Reset,
        "/list" => SlashCommand::List,
        "/quit" => SlashCommand::Quit,
        _ => SlashCommand::Unknown(command),
    };

    Some(parsed)
}
