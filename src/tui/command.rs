//! Command line parser
//!
//! Text-bearing actions are typed after `:`. Each line maps to exactly one
//! [`Action`]; parse errors are shown under the command line.
//!
//! | Command | Action |
//! |---------|--------|
//! | `set <field> <value>` | edit the start form |
//! | `new` | fresh script in the editor |
//! | `load <name>` / `delete <name>` | strategy CRUD |
//! | `save <name> [tag, tag]` | save the editor buffer |
//! | `import <path>` / `export <path>` | editor buffer to/from disk |
//! | `run` | start the editor script as the custom strategy |
//! | `journal <title> \| <content> [\| tags]` | new journal entry |
//! | `unjournal <id>` | delete journal entry |
//! | `ask <prompt>` | analyse trading history |
//! | `generate [dbot\|script] [model=<m>] <prompt>` | generate a script |
//! | `setup <token> [mongo_uri]` | first-run setup |
//! | `settings <token\|mongo\|ai_key\|ai_model> <value>` | save one setting |
//! | `filter [strategy\|all]` | telemetry filter |
//! | `guide` | show the guide again |
//! | `export-trades [path]` / `download-logs [path]` | server exports |

use std::path::PathBuf;

use crate::core::{parse_tags, Action, DBOT_MODE};

/// Generation mode when none is given
pub const DEFAULT_GENERATE_MODE: &str = "script";

pub const DEFAULT_TRADES_EXPORT: &str = "trades.csv";
pub const DEFAULT_LOGS_DOWNLOAD: &str = "bot-logs.txt";

pub fn parse(line: &str) -> Result<Action, String> {
    let line = line.trim();
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    match verb {
        "" => Err("empty command".into()),
        "start" => Ok(Action::Start),
        "stop" => Ok(Action::Stop),
        "refresh" => Ok(Action::Refresh),
        "clear" => Ok(Action::ClearLog),
        "theme" => Ok(Action::ToggleTheme),
        "set" => {
            let (field, value) = rest
                .split_once(char::is_whitespace)
                .ok_or("usage: set <field> <value>")?;
            Ok(Action::SetField {
                field: field.to_string(),
                value: value.trim().to_string(),
            })
        }

        "new" => Ok(Action::NewScript),
        "load" => required(rest, "usage: load <name>").map(Action::LoadStrategy),
        "delete" => required(rest, "usage: delete <name>").map(Action::DeleteStrategy),
        "save" => {
            let (name, tags) = match rest.split_once(char::is_whitespace) {
                Some((name, tags)) => (name, parse_tags(tags)),
                None => (rest, Vec::new()),
            };
            let name = required(name, "usage: save <name> [tag, tag]")?;
            Ok(Action::SaveStrategy { name, tags })
        }
        "import" => required(rest, "usage: import <path>").map(|p| Action::ImportScript(PathBuf::from(p))),
        "export" => required(rest, "usage: export <path>").map(|p| Action::ExportScript(PathBuf::from(p))),
        "run" => Ok(Action::RunScript),

        "journal" => {
            let mut parts = rest.splitn(3, '|').map(str::trim);
            let title = parts.next().unwrap_or_default();
            let content = parts.next().unwrap_or_default();
            if title.is_empty() || content.is_empty() {
                return Err("usage: journal <title> | <content> [| tags]".into());
            }
            Ok(Action::CreateJournal {
                title: title.to_string(),
                content: content.to_string(),
                tags: parts.next().map(parse_tags).unwrap_or_default(),
            })
        }
        "unjournal" => required(rest, "usage: unjournal <id>").map(Action::DeleteJournal),

        "analytics" => Ok(Action::LoadAnalytics),
        "ask" => required(rest, "usage: ask <prompt>").map(Action::Analyze),
        "generate" => parse_generate(rest),
        "export-trades" => Ok(Action::ExportTrades(path_or(rest, DEFAULT_TRADES_EXPORT))),
        "download-logs" => Ok(Action::DownloadLogs(path_or(rest, DEFAULT_LOGS_DOWNLOAD))),

        "setup" => {
            let mut words = rest.split_whitespace();
            let token = words.next().ok_or("usage: setup <token> [mongo_uri]")?;
            Ok(Action::CompleteSetup {
                token: token.to_string(),
                mongo_uri: words.next().unwrap_or_default().to_string(),
            })
        }
        "settings" => {
            let (key, value) = rest
                .split_once(char::is_whitespace)
                .ok_or("usage: settings <token|mongo|ai_key|ai_model> <value>")?;
            Ok(Action::SaveSetting {
                key: key.to_string(),
                value: value.trim().to_string(),
            })
        }
        "filter" => Ok(Action::SetFilter(match rest {
            "" | "all" => None,
            strategy => Some(strategy.to_string()),
        })),
        "guide" => Ok(Action::ShowGuide),

        other => Err(format!("unknown command '{}'", other)),
    }
}

fn required(value: &str, usage: &str) -> Result<String, String> {
    if value.is_empty() {
        Err(usage.to_string())
    } else {
        Ok(value.to_string())
    }
}

fn path_or(value: &str, default: &str) -> PathBuf {
    PathBuf::from(if value.is_empty() { default } else { value })
}

fn parse_generate(rest: &str) -> Result<Action, String> {
    let mut mode = DEFAULT_GENERATE_MODE.to_string();
    let mut model = None;
    let mut words = rest.split_whitespace().peekable();

    while let Some(word) = words.peek() {
        if *word == DBOT_MODE || *word == DEFAULT_GENERATE_MODE {
            mode = word.to_string();
        } else if let Some(name) = word.strip_prefix("model=") {
            model = Some(name.to_string());
        } else {
            break;
        }
        words.next();
    }

    let prompt = words.collect::<Vec<_>>().join(" ");
    if prompt.is_empty() {
        return Err("usage: generate [dbot|script] [model=<m>] <prompt>".into());
    }
    Ok(Action::Generate {
        prompt,
        mode,
        model,
    })
}
