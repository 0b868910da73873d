use std::path::PathBuf;

use crate::contact::{ContactDraft, SortField};
use crate::store::StoreMode;

const HELP: &str = r#"Available commands:
- help: Show this help message
- list: Show the visible contacts
- mode local|remote: Switch the backing store
- search [text]: Filter contacts (empty text clears the filter)
- sort name|phone|email|notes|created: Sort, repeating a field flips direction
- add <name>; <phone>; [email]; [notes]: Create a contact
- edit <id> <name>; <phone>; [email]; [notes]: Replace a contact's fields
- delete <id>: Delete a contact
- clear: Delete every contact in the active store
- import <path>: Import contacts from a JSON file
- export [path]: Export loaded contacts as JSON (stdout without a path)
- health: Check the remote API
- quit: Leave the shell
"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    Help(String),
    List,
    Mode(StoreMode),
    Search(String),
    Sort(SortField),
    Add(ContactDraft),
    Edit(String, ContactDraft),
    Delete(String),
    Clear,
    Import(PathBuf),
    Export(Option<PathBuf>),
    Health,
    Quit,
    Error(String),
}

/// Parses shell input lines into [`CommandResult`]s.
#[derive(Clone, Default)]
pub struct CommandProcessor;

impl CommandProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Splits a line into a lower-cased command word and the raw remainder.
    pub fn parse_command(&self, text: &str) -> Option<(String, String)> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        let (command, rest) = match text.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (text, ""),
        };
        Some((command.to_lowercase(), rest.to_string()))
    }

    pub fn process(&self, command: &str, args: &str) -> CommandResult {
        match command {
            "help" | "h" | "?" => CommandResult::Help(HELP.to_string()),
            "list" | "ls" => CommandResult::List,
            "mode" => self.cmd_mode(args),
            "search" | "find" => CommandResult::Search(args.to_string()),
            "sort" => self.cmd_sort(args),
            "add" => match parse_draft(args) {
                Ok(draft) => CommandResult::Add(draft),
                Err(e) => CommandResult::Error(e),
            },
            "edit" => self.cmd_edit(args),
            "delete" | "rm" => {
                if args.is_empty() {
                    CommandResult::Error("Usage: delete <id>".to_string())
                } else {
                    CommandResult::Delete(args.to_string())
                }
            }
            "clear" => CommandResult::Clear,
            "import" => {
                if args.is_empty() {
                    CommandResult::Error("Usage: import <path>".to_string())
                } else {
                    CommandResult::Import(PathBuf::from(args))
                }
            }
            "export" => CommandResult::Export((!args.is_empty()).then(|| PathBuf::from(args))),
            "health" | "ping" => CommandResult::Health,
            "quit" | "exit" | "q" => CommandResult::Quit,
            _ => CommandResult::Error(format!("Unknown command: {}", command)),
        }
    }

    /// Convenience for callers that hold a whole line.
    pub fn parse_line(&self, line: &str) -> Option<CommandResult> {
        self.parse_command(line)
            .map(|(command, args)| self.process(&command, &args))
    }

    fn cmd_mode(&self, args: &str) -> CommandResult {
        match args.parse::<StoreMode>() {
            Ok(mode) => CommandResult::Mode(mode),
            Err(_) => CommandResult::Error("Usage: mode local|remote".to_string()),
        }
    }

    fn cmd_sort(&self, args: &str) -> CommandResult {
        match args.parse::<SortField>() {
            Ok(field) => CommandResult::Sort(field),
            Err(_) => {
                CommandResult::Error("Usage: sort name|phone|email|notes|created".to_string())
            }
        }
    }

    fn cmd_edit(&self, args: &str) -> CommandResult {
        let usage = || {
            CommandResult::Error("Usage: edit <id> <name>; <phone>; [email]; [notes]".to_string())
        };
        let Some((id, fields)) = args.split_once(char::is_whitespace) else {
            return usage();
        };
        match parse_draft(fields) {
            Ok(draft) => CommandResult::Edit(id.to_string(), draft),
            Err(_) => usage(),
        }
    }
}

/// Parses `name; phone; [email]; [notes]`. Validation is left to the caller.
pub fn parse_draft(args: &str) -> Result<ContactDraft, String> {
    // notes are the last field and may themselves contain ';'
    let mut parts = args.splitn(4, ';').map(str::trim);
    let (Some(name), Some(phone)) = (parts.next(), parts.next()) else {
        return Err("Usage: add <name>; <phone>; [email]; [notes]".to_string());
    };
    let optional = |s: Option<&str>| s.filter(|s| !s.is_empty()).map(str::to_string);
    let email = optional(parts.next());
    let notes = optional(parts.next());
    Ok(ContactDraft {
        name: name.to_string(),
        phone: phone.to_string(),
        email,
        notes,
    })
}
