//! Shell command handlers
//!
//! Runs a parsed command against the content service and renders the reply.

use serde::Serialize;

use crate::error::ContentsError;
use crate::error::handlers::{handle_error, status_code};
use crate::model::SaveModel;
use crate::service::ContentService;
use crate::shell::commands::Command;
use crate::storage::FilesystemAdapter;

const HELP: &str = "\
GET <path>            metadata of an entry
CAT <path>            entry with content
LS [path]             directory listing
MKDIR <path>          create a directory
PUT <path> <text>     save a text file
PUTB <path> <base64>  save a binary file
RM <path>             delete an entry
MV <old> <new>        rename an entry
INFO                  serving directory
QUIT                  leave the shell";

/// Outcome of one shell command.
pub struct CommandResult {
    pub message: String,
    pub close: bool,
}

impl CommandResult {
    fn reply(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            close: false,
        }
    }
}

/// Dispatches a parsed command to the content service.
pub async fn handle_command<B>(service: &ContentService<B>, command: Command) -> CommandResult
where
    B: FilesystemAdapter + 'static,
{
    let outcome = match command {
        Command::Get(path) => render(service.get(path, false, None, None).await),
        Command::Cat(path) => render(service.get(path, true, None, None).await),
        Command::Ls(path) => render(service.get(path, true, None, None).await),
        Command::Mkdir(path) => render(service.save(SaveModel::directory(), path).await),
        Command::Put(path, text) => render(service.save(SaveModel::text(text), path).await),
        Command::PutBase64(path, data) => {
            render(service.save(SaveModel::base64(data), path).await)
        }
        Command::Rm(path) => service.delete(path).await.map(|_| "OK".to_string()),
        Command::Mv(old, new) => service.rename(old, new).await.map(|_| "OK".to_string()),
        Command::Info => Ok(service.store().info_string()),
        Command::Help => Ok(HELP.to_string()),
        Command::Quit => {
            return CommandResult {
                message: "Goodbye".into(),
                close: true,
            };
        }
        Command::Unknown(raw) => Ok(format!("Unknown command: {:?} (try HELP)", raw)),
    };

    match outcome {
        Ok(message) => CommandResult::reply(message),
        Err(err) => {
            handle_error(&err);
            CommandResult::reply(format_error(&err))
        }
    }
}

/// One-line error reply: status, stable kind and message.
pub fn format_error(err: &ContentsError) -> String {
    format!("ERR {} {}: {}", status_code(err), err.kind().as_str(), err)
}

fn render<T: Serialize>(result: Result<T, ContentsError>) -> Result<String, ContentsError> {
    let value = result?;
    serde_json::to_string_pretty(&value).map_err(|e| ContentsError::Internal(e.to_string()))
}
