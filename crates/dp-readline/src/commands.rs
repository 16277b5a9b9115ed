//! REPL command parsing.

use anyhow::{Result, anyhow, bail};
use std::path::PathBuf;

/// Slash commands offered for completion.
pub const SLASH_COMMANDS: &[&str] = &[
    "/sessions",
    "/new",
    "/select",
    "/files",
    "/upload",
    "/file",
    "/profile",
    "/refresh",
    "/versions",
    "/rollback",
    "/compare",
    "/status",
    "/close",
    "/help",
];

/// One line of user input.
///
/// List indices are 1-based, as printed by the listing commands.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Projects,
    NewProject(String),
    Open(String),
    Close,
    Sessions,
    NewSession(Option<String>),
    SelectSession(usize),
    Files,
    Upload(PathBuf),
    SelectFile(usize),
    Profile,
    RefreshProfile,
    Versions,
    Rollback(usize),
    Compare(usize, usize),
    Status,
    Help,
    Quit,
    Chat(String),
}

fn index(arg: Option<&str>, usage: &str) -> Result<usize> {
    let raw = arg.ok_or_else(|| anyhow!("usage: {}", usage))?;
    match raw.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => bail!("expected a list number, got '{}'", raw),
    }
}

fn rest(arg: &str) -> Option<String> {
    let arg = arg.trim();
    (!arg.is_empty()).then(|| arg.to_string())
}

impl Command {
    /// Parses a trimmed, non-empty line.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        let (head, tail) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let mut args = tail.split_whitespace();

        let command = match head {
            "quit" | "exit" => Self::Quit,
            "projects" => Self::Projects,
            "new-project" => Self::NewProject(
                rest(tail).ok_or_else(|| anyhow!("usage: new-project <name>"))?,
            ),
            "open" => Self::Open(
                args.next()
                    .ok_or_else(|| anyhow!("usage: open <project id>"))?
                    .to_string(),
            ),
            "/close" => Self::Close,
            "/sessions" => Self::Sessions,
            "/new" => Self::NewSession(rest(tail)),
            "/select" => Self::SelectSession(index(args.next(), "/select <n>")?),
            "/files" => Self::Files,
            "/upload" => Self::Upload(PathBuf::from(
                rest(tail).ok_or_else(|| anyhow!("usage: /upload <path>"))?,
            )),
            "/file" => Self::SelectFile(index(args.next(), "/file <n>")?),
            "/profile" => Self::Profile,
            "/refresh" => Self::RefreshProfile,
            "/versions" => Self::Versions,
            "/rollback" => Self::Rollback(index(args.next(), "/rollback <n>")?),
            "/compare" => {
                let left = index(args.next(), "/compare <n> <m>")?;
                let right = index(args.next(), "/compare <n> <m>")?;
                Self::Compare(left, right)
            }
            "/status" => Self::Status,
            "/help" | "help" => Self::Help,
            other if other.starts_with('/') => bail!("unknown command: {}", other),
            _ => Self::Chat(line.to_string()),
        };
        Ok(command)
    }

    /// Whether the command needs an open project.
    pub fn needs_project(&self) -> bool {
        !matches!(
            self,
            Self::Projects | Self::NewProject(_) | Self::Open(_) | Self::Help | Self::Quit
        )
    }
}

pub const HELP: &str = "\
projects              list projects
new-project <name>    create a project
open <id>             open a project
/sessions             list sessions
/new [title]          start a session
/select <n>           switch to session n
/files                list files
/upload <path>        upload a csv, tsv, xlsx, xls or parquet file
/file <n>             select file n and show its profile
/profile              show the selected file's profile
/refresh              reload the selected file's profile
/versions             list versions
/rollback <n>         roll back to version n
/compare <n> <m>      compare two versions
/status               show workspace state
/close                close the project
quit                  exit
Anything else is sent to the agent.";
