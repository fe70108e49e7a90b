//! REPL-only commands, written with a leading `:`.
//!
//! These manage threads and messages directly. Anything starting with `/`
//! belongs to the backend and never reaches this parser.

/// A parsed `:command`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalCommand {
    Help,
    Quit,
    Threads,
    Open(String),
    New(Option<String>),
    Rename(String),
    Archive(bool),
    Delete,
    Messages,
    /// 1-based message index, bookmarked or not.
    Bookmark(usize, bool),
    /// 1-based message index; later messages go with it.
    Forget(usize),
    Agent { id: String, name: Option<String> },
    Refresh,
    Dismiss,
}

pub const HELP: &str = "\
:threads                 list threads of the current agent
:open <id>               switch to a thread
:new [title]             start a new thread
:rename <title>          rename the active thread
:archive | :unarchive    archive or restore the active thread
:delete                  delete the active thread
:messages                show the active thread
:bookmark <n>            bookmark message n (:unbookmark to clear)
:forget <n>              delete message n and everything after it
:agent <id> [name]       switch agent
:refresh                 reload the thread list
:dismiss                 clear the error banner
:quit                    leave";

/// Parses a line starting with `:`.
///
/// Returns `None` for lines that are not local commands and an error
/// string for malformed ones.
pub fn parse(line: &str) -> Option<Result<LocalCommand, String>> {
    let body = line.trim().strip_prefix(':')?;
    let (name, rest) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };
    let rest_opt = (!rest.is_empty()).then(|| rest.to_string());

    let index = |usage: &str| -> Result<usize, String> {
        rest.parse::<usize>()
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| format!("usage: {}", usage))
    };

    Some(match name {
        "help" | "h" => Ok(LocalCommand::Help),
        "quit" | "q" | "exit" => Ok(LocalCommand::Quit),
        "threads" | "t" => Ok(LocalCommand::Threads),
        "open" => rest_opt
            .map(LocalCommand::Open)
            .ok_or_else(|| "usage: :open <id>".to_string()),
        "new" => Ok(LocalCommand::New(rest_opt)),
        "rename" => rest_opt
            .map(LocalCommand::Rename)
            .ok_or_else(|| "usage: :rename <title>".to_string()),
        "archive" => Ok(LocalCommand::Archive(true)),
        "unarchive" => Ok(LocalCommand::Archive(false)),
        "delete" => Ok(LocalCommand::Delete),
        "messages" | "m" => Ok(LocalCommand::Messages),
        "bookmark" => index(":bookmark <n>").map(|n| LocalCommand::Bookmark(n, true)),
        "unbookmark" => index(":unbookmark <n>").map(|n| LocalCommand::Bookmark(n, false)),
        "forget" => index(":forget <n>").map(LocalCommand::Forget),
        "agent" => {
            let mut parts = rest.splitn(2, char::is_whitespace);
            match parts.next().filter(|id| !id.is_empty()) {
                Some(id) => Ok(LocalCommand::Agent {
                    id: id.to_string(),
                    name: parts
                        .next()
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_string),
                }),
                None => Err("usage: :agent <id> [name]".to_string()),
            }
        }
        "refresh" => Ok(LocalCommand::Refresh),
        "dismiss" => Ok(LocalCommand::Dismiss),
        other => Err(format!("unknown command :{} (try :help)", other)),
    })
}
