use super::command_registry::{
    find_kind, CommandKind, NO_ARG_COMMANDS, PATH_COMMANDS, RAW_ARG_COMMANDS,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Noop,
    Help,
    Upload { path: String },
    Generate,
    Reset,
    Connect,
    KeyStatus,
    /// `None` copies every section.
    Copy { section: Option<String> },
    Show,
    Model { name: Option<String> },
    Models,
    Quit,
    Unknown { command: String, arg: String },
}

fn parse_path_args(arg: &str) -> Vec<String> {
    if arg.trim().is_empty() {
        return Vec::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect(),
        Err(_) => arg
            .split_whitespace()
            .map(str::to_string)
            .filter(|value| !value.is_empty())
            .collect(),
    }
}

// Unquoted paths with spaces arrive as several words; join them back.
fn parse_single_path_arg(arg: &str) -> String {
    let parts = parse_path_args(arg);
    match parts.len() {
        0 => String::new(),
        1 => parts[0].clone(),
        _ => parts.join(" "),
    }
}

fn optional_arg(arg: &str) -> Option<String> {
    let trimmed = arg.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn command_for_kind(kind: CommandKind, arg: &str) -> SessionCommand {
    match kind {
        CommandKind::Help => SessionCommand::Help,
        CommandKind::Upload => SessionCommand::Upload {
            path: parse_single_path_arg(arg),
        },
        CommandKind::Generate => SessionCommand::Generate,
        CommandKind::Reset => SessionCommand::Reset,
        CommandKind::Connect => SessionCommand::Connect,
        CommandKind::KeyStatus => SessionCommand::KeyStatus,
        CommandKind::Copy => SessionCommand::Copy {
            section: optional_arg(arg).filter(|value| !value.eq_ignore_ascii_case("all")),
        },
        CommandKind::Show => SessionCommand::Show,
        CommandKind::Model => SessionCommand::Model {
            name: optional_arg(arg),
        },
        CommandKind::Models => SessionCommand::Models,
        CommandKind::Quit => SessionCommand::Quit,
    }
}

/// Parses one line typed into the interactive session.
///
/// Slash commands are matched case-insensitively; any other non-empty line is taken as a
/// path to upload, so dragging a file into the terminal selects it.
pub fn parse_command(text: &str) -> SessionCommand {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return SessionCommand::Noop;
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        let remainder = &slash_tail[command_len..];
        let looks_like_path = remainder.starts_with(['/', '.', '\\']);
        if command_len > 0 && !looks_like_path {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = remainder.trim();

            if let Some(kind) = find_kind(&command, NO_ARG_COMMANDS) {
                return command_for_kind(kind, "");
            }
            if let Some(kind) = find_kind(&command, PATH_COMMANDS) {
                return command_for_kind(kind, arg);
            }
            if let Some(kind) = find_kind(&command, RAW_ARG_COMMANDS) {
                return command_for_kind(kind, arg);
            }

            return SessionCommand::Unknown {
                command,
                arg: arg.to_string(),
            };
        }
    }

    SessionCommand::Upload {
        path: parse_single_path_arg(raw_trimmed),
    }
}
