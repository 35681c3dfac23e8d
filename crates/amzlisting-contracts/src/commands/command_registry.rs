#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum CommandKind {
    Help,
    Upload,
    Generate,
    Reset,
    Connect,
    KeyStatus,
    Copy,
    Show,
    Model,
    Models,
    Quit,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub kind: CommandKind,
}

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "help",
        kind: CommandKind::Help,
    },
    CommandSpec {
        command: "generate",
        kind: CommandKind::Generate,
    },
    CommandSpec {
        command: "reset",
        kind: CommandKind::Reset,
    },
    CommandSpec {
        command: "start_over",
        kind: CommandKind::Reset,
    },
    CommandSpec {
        command: "connect",
        kind: CommandKind::Connect,
    },
    CommandSpec {
        command: "key",
        kind: CommandKind::KeyStatus,
    },
    CommandSpec {
        command: "show",
        kind: CommandKind::Show,
    },
    CommandSpec {
        command: "models",
        kind: CommandKind::Models,
    },
    CommandSpec {
        command: "quit",
        kind: CommandKind::Quit,
    },
    CommandSpec {
        command: "exit",
        kind: CommandKind::Quit,
    },
];

pub(crate) const PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "upload",
        kind: CommandKind::Upload,
    },
    CommandSpec {
        command: "open",
        kind: CommandKind::Upload,
    },
];

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "copy",
        kind: CommandKind::Copy,
    },
    CommandSpec {
        command: "model",
        kind: CommandKind::Model,
    },
];

pub(crate) fn find_kind(command: &str, specs: &[CommandSpec]) -> Option<CommandKind> {
    specs
        .iter()
        .find(|spec| spec.command == command)
        .map(|spec| spec.kind)
}

/// `(usage, summary)` rows printed by `/help`.
pub const SESSION_HELP: &[(&str, &str)] = &[
    ("/upload <path>", "select a product mockup (PNG, JPG or WEBP)"),
    ("/generate", "generate the optimized listing for the selected image"),
    ("/show", "print the current image, listing and error"),
    (
        "/copy <title|bullets|description|search_terms|all>",
        "copy a listing section to the clipboard",
    ),
    ("/reset", "start over (alias /start_over)"),
    ("/connect", "connect an API key for this session"),
    ("/key", "show the API key status"),
    ("/model [name]", "show or change the generation model"),
    ("/models", "list models that can produce listings"),
    ("/quit", "leave the session"),
];
