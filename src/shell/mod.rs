//! Admin shell
//!
//! A line-oriented terminal over the content service, read from stdin.

pub mod commands;
pub mod handlers;

use log::{error, info, warn};
use tokio::io::{self, AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};

use crate::error::ContentsError;
use crate::error::handlers::handle_error;
use crate::service::ContentService;
use crate::storage::FilesystemAdapter;
use crate::utils::logging::log_command;

pub use commands::{Command, parse_command};
pub use handlers::{CommandResult, format_error, handle_command};

/// Reads commands from stdin until QUIT or end of input.
pub async fn run<B>(service: ContentService<B>) -> Result<(), std::io::Error>
where
    B: FilesystemAdapter + 'static,
{
    let mut stdout = io::stdout();
    stdout.write_all(b"contents-store ready, type HELP\n").await?;
    stdout.flush().await?;

    serve(&service, BufReader::new(io::stdin()), stdout).await
}

/// Command loop over any line source and sink. A line that is not valid
/// UTF-8 gets an error reply and the loop carries on.
pub async fn serve<B, R, W>(
    service: &ContentService<B>,
    mut reader: R,
    mut writer: W,
) -> Result<(), std::io::Error>
where
    B: FilesystemAdapter + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let n = reader.read_until(b'\n', &mut buf).await?;
        if n == 0 {
            info!("Input closed, leaving shell");
            return Ok(());
        }

        let result = match String::from_utf8(std::mem::take(&mut buf)) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => {
                log_command(&line);
                handle_command(service, parse_command(&line)).await
            }
            Err(e) => {
                warn!("Discarding command that is not valid UTF-8");
                let err = ContentsError::BadRequest(format!("command is not valid UTF-8: {}", e));
                handle_error(&err);
                CommandResult {
                    message: format_error(&err),
                    close: false,
                }
            }
        };

        if let Err(e) = writer.write_all(format!("{}\n", result.message).as_bytes()).await {
            error!("Failed to write reply: {}", e);
            return Err(e);
        }
        writer.flush().await?;

        if result.close {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contents::ContentStore;
    use crate::paths::PathMapper;
    use crate::storage::MemoryFs;

    #[tokio::test]
    async fn test_invalid_utf8_line_keeps_shell_alive() {
        let store = ContentStore::new(MemoryFs::new(), PathMapper::new("/home/nb", "/srv/shared"));
        store.ensure_root_directories().unwrap();
        let service = ContentService::new(store);

        let input: &[u8] = b"INFO\nPUT a.txt \xff\xfe\n\nINFO\nQUIT\nINFO\n";
        let mut output = Vec::new();
        serve(&service, input, &mut output).await.unwrap();

        let output = String::from_utf8(output).unwrap();
        let lines: Vec<_> = output.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[0], "Serving notebooks from directory: /home/nb");
        assert!(lines[1].starts_with("ERR 400 bad_request: command is not valid UTF-8"));
        assert_eq!(lines[2], lines[0]);
        assert_eq!(lines[3], "Goodbye");
        assert!(!service.store().exists("a.txt").unwrap());
    }
}
