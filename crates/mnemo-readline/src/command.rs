//! Slash command parsing for the REPL.

/// Every command name, used for completion and hints.
pub const COMMAND_NAMES: &[&str] = &[
    "/new",
    "/list",
    "/switch",
    "/delete",
    "/delete-all",
    "/memory",
    "/prioritized",
    "/fast",
    "/learning",
    "/insights",
    "/summary",
    "/settings",
    "/help",
    "/quit",
];

pub const HELP: &str = "\
/new                 start a new session
/list                list sessions, most recent first
/switch <id>         switch to a session (an id prefix is enough)
/delete [id]         delete a session (default: the active one)
/delete-all          delete every session
/memory              toggle conversation memory
/prioritized         toggle relevance-based context selection
/fast                toggle fast mode (no context)
/learning            toggle insight learning
/insights            show learned insights
/summary             summarize the active session
/settings [key val]  show or change generation settings
/help                show this help
/quit                exit";

/// Per-session toggles reachable from the REPL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Memory,
    Prioritized,
    Fast,
    Learning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    New,
    List,
    Switch(String),
    Delete(Option<String>),
    DeleteAll,
    Toggle(Toggle),
    Insights,
    Summary,
    ShowSettings,
    SetSetting { key: String, value: String },
    Help,
    Quit,
}

/// What a line of input means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Empty,
    Prompt(String),
    Command(Command),
    Invalid(String),
}

pub fn parse(line: &str) -> Input {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Input::Empty;
    }
    if trimmed == "quit" || trimmed == "exit" {
        return Input::Command(Command::Quit);
    }
    if !trimmed.starts_with('/') {
        return Input::Prompt(trimmed.to_string());
    }

    let mut parts = trimmed.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    let command = match (name, args.as_slice()) {
        ("/new", []) => Command::New,
        ("/list", []) => Command::List,
        ("/switch", [id]) => Command::Switch(id.to_string()),
        ("/switch", _) => return Input::Invalid("usage: /switch <id>".to_string()),
        ("/delete", []) => Command::Delete(None),
        ("/delete", [id]) => Command::Delete(Some(id.to_string())),
        ("/delete-all", []) => Command::DeleteAll,
        ("/memory", []) => Command::Toggle(Toggle::Memory),
        ("/prioritized", []) => Command::Toggle(Toggle::Prioritized),
        ("/fast", []) => Command::Toggle(Toggle::Fast),
        ("/learning", []) => Command::Toggle(Toggle::Learning),
        ("/insights", []) => Command::Insights,
        ("/summary", []) => Command::Summary,
        ("/settings", []) => Command::ShowSettings,
        ("/settings", [key, value]) => Command::SetSetting {
            key: key.to_string(),
            value: value.to_string(),
        },
        ("/settings", _) => return Input::Invalid("usage: /settings [key value]".to_string()),
        ("/help", []) => Command::Help,
        ("/quit", []) | ("/exit", []) => Command::Quit,
        _ if COMMAND_NAMES.contains(&name) => {
            return Input::Invalid(format!("{} takes different arguments, see /help", name));
        }
        _ => return Input::Invalid(format!("Unknown command: {}", name)),
    };
    Input::Command(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_a_prompt() {
        assert_eq!(parse("  hello there "), Input::Prompt("hello there".to_string()));
        assert_eq!(parse("   "), Input::Empty);
        assert_eq!(parse("quit"), Input::Command(Command::Quit));
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(
            parse("/switch 1a2b"),
            Input::Command(Command::Switch("1a2b".to_string()))
        );
        assert_eq!(parse("/delete"), Input::Command(Command::Delete(None)));
        assert_eq!(
            parse("/settings temperature 0.2"),
            Input::Command(Command::SetSetting {
                key: "temperature".to_string(),
                value: "0.2".to_string(),
            })
        );
        assert_eq!(parse("/fast"), Input::Command(Command::Toggle(Toggle::Fast)));
    }

    #[test]
    fn test_bad_commands_are_reported() {
        assert!(matches!(parse("/switch"), Input::Invalid(_)));
        assert!(matches!(parse("/settings temperature"), Input::Invalid(_)));
        assert!(matches!(parse("/memory on"), Input::Invalid(_)));
        assert_eq!(
            parse("/frobnicate"),
            Input::Invalid("Unknown command: /frobnicate".to_string())
        );
    }
}
