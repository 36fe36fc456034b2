//! Shell command parsing
//!
//! Turns one input line into a [`Command`].

/// A command typed at the admin shell.
///
/// Commands that need arguments store them as `String`s.
#[derive(Debug, PartialEq)]
pub enum Command {
    Get(String),
    Cat(String),
    Ls(String),
    Mkdir(String),
    Put(String, String),
    PutBase64(String, String),
    Rm(String),
    Mv(String, String),
    Info,
    Help,
    Quit,
    Unknown(String),
}

/// Parses a raw line into a [`Command`].
///
/// Returns `Unknown` for unrecognised commands and for known commands missing
/// a required argument.
pub fn parse_command(raw: &str) -> Command {
    let trimmed = raw.trim();
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let cmd = parts.next().unwrap_or("").to_ascii_uppercase();
    let arg = parts.next().unwrap_or("").trim();

    let (first, rest) = match arg.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim_start()),
        None => (arg, ""),
    };

    match cmd.as_str() {
        "GET" => Command::Get(arg.to_string()),
        "CAT" if !arg.is_empty() => Command::Cat(arg.to_string()),
        "LS" => Command::Ls(arg.to_string()),
        "MKDIR" if !arg.is_empty() => Command::Mkdir(arg.to_string()),
        "PUT" if !first.is_empty() => Command::Put(first.to_string(), rest.to_string()),
        "PUTB" if !first.is_empty() => Command::PutBase64(first.to_string(), rest.to_string()),
        "RM" if !arg.is_empty() => Command::Rm(arg.to_string()),
        "MV" if !first.is_empty() && !rest.is_empty() => {
            Command::Mv(first.to_string(), rest.to_string())
        }
        "INFO" => Command::Info,
        "HELP" | "?" => Command::Help,
        "QUIT" | "Q" | "EXIT" => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_commands() {
        assert_eq!(parse_command("QUIT"), Command::Quit);
        assert_eq!(parse_command("q"), Command::Quit);
        assert_eq!(parse_command("info"), Command::Info);
        assert_eq!(parse_command("LS"), Command::Ls(String::new()));
        assert_eq!(parse_command("GET"), Command::Get(String::new()));
    }

    #[test]
    fn test_parse_commands_with_args() {
        assert_eq!(parse_command("CAT proj/x.txt"), Command::Cat("proj/x.txt".into()));
        assert_eq!(parse_command("mkdir /proj"), Command::Mkdir("/proj".into()));
        assert_eq!(
            parse_command("PUT proj/x.txt hello  world"),
            Command::Put("proj/x.txt".into(), "hello  world".into())
        );
        assert_eq!(
            parse_command("PUTB blob.bin aGk="),
            Command::PutBase64("blob.bin".into(), "aGk=".into())
        );
        assert_eq!(parse_command("PUT empty.txt"), Command::Put("empty.txt".into(), String::new()));
        assert_eq!(parse_command("MV a b"), Command::Mv("a".into(), "b".into()));
    }

    #[test]
    fn test_missing_arguments_are_unknown() {
        assert_eq!(parse_command("RM"), Command::Unknown("RM".into()));
        assert_eq!(parse_command("MV a"), Command::Unknown("MV a".into()));
        assert_eq!(parse_command("FOO bar"), Command::Unknown("FOO bar".into()));
        assert_eq!(parse_command(""), Command::Unknown(String::new()));
    }
}
