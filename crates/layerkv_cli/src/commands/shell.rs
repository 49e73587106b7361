//! Interactive shell over a single store session.
//!
//! Each line is one command. Transactions opened with `BEGIN` live until
//! `COMMIT`/`ROLLBACK` or the end of the session, which discards them.

use super::json;
use crate::error::{CliError, CliResult};
use layerkv_core::Store;
use std::io::{BufRead, Write};

/// A parsed shell line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `BEGIN`
    Begin,
    /// `COMMIT`
    Commit,
    /// `ROLLBACK`
    Rollback,
    /// `GET <key>`
    Get(String),
    /// `SET <key> <json>`
    Set(String, String),
    /// `DELETE <key>`
    Delete(String),
    /// `STATUS`
    Status,
    /// `KEYS`
    Keys,
    /// `HELP`
    Help,
    /// `EXIT` or `QUIT`
    Exit,
}

const HELP: &str = "\
BEGIN                 open a nested transaction
COMMIT                commit the innermost transaction
ROLLBACK              discard the innermost transaction
GET <key>             print a value as JSON
SET <key> <json>      set a key
DELETE <key>          delete a key
STATUS                show open transactions
KEYS                  list visible keys
EXIT                  end the session, discarding open transactions";

/// Parses one line. Blank lines and `#` comments yield `None`.
pub fn parse(line: &str) -> CliResult<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(w, r)| (w, r.trim()));

    let command = match word.to_ascii_uppercase().as_str() {
        "BEGIN" => no_args(Command::Begin, rest)?,
        "COMMIT" => no_args(Command::Commit, rest)?,
        "ROLLBACK" => no_args(Command::Rollback, rest)?,
        "STATUS" => no_args(Command::Status, rest)?,
        "KEYS" => no_args(Command::Keys, rest)?,
        "HELP" => Command::Help,
        "EXIT" | "QUIT" => Command::Exit,
        "GET" => Command::Get(single_key(word, rest)?),
        "DELETE" => Command::Delete(single_key(word, rest)?),
        "SET" => {
            let (key, value) = rest
                .split_once(char::is_whitespace)
                .ok_or_else(|| CliError::usage("usage: SET <key> <json>"))?;
            Command::Set(key.to_string(), value.trim().to_string())
        }
        other => return Err(CliError::usage(format!("unknown command {other:?}, try HELP"))),
    };
    Ok(Some(command))
}

fn no_args(command: Command, rest: &str) -> CliResult<Command> {
    if rest.is_empty() {
        Ok(command)
    } else {
        Err(CliError::usage(format!("{command:?} takes no arguments")))
    }
}

fn single_key(word: &str, rest: &str) -> CliResult<String> {
    if rest.is_empty() || rest.contains(char::is_whitespace) {
        return Err(CliError::usage(format!(
            "usage: {} <key>",
            word.to_ascii_uppercase()
        )));
    }
    Ok(rest.to_string())
}

/// Executes one command. Returns `false` once the session should end.
pub fn execute(store: &mut Store, command: Command, out: &mut impl Write) -> CliResult<bool> {
    match command {
        Command::Begin => {
            let info = store.begin();
            writeln!(out, "BEGIN {} (depth {})", info.id, info.depth)?;
        }
        Command::Commit => {
            store.commit()?;
            writeln!(out, "OK (depth {})", store.depth())?;
        }
        Command::Rollback => {
            store.rollback()?;
            writeln!(out, "OK (depth {})", store.depth())?;
        }
        Command::Get(key) => {
            let value = store.get(&key)?;
            writeln!(out, "{}", json::render(&value))?;
        }
        Command::Set(key, value) => {
            let value = json::parse_value(&value)?;
            store.set(key, value)?;
            writeln!(out, "OK")?;
        }
        Command::Delete(key) => {
            store.delete(&key)?;
            writeln!(out, "OK")?;
        }
        Command::Status => {
            let status = store.status();
            writeln!(out, "depth {}", status.depth)?;
            for level in &status.levels {
                writeln!(
                    out,
                    "  [{}] {} {}, {} pending",
                    level.depth, level.id, level.state, level.pending_writes
                )?;
            }
        }
        Command::Keys => {
            for key in store.keys() {
                writeln!(out, "{key}")?;
            }
        }
        Command::Help => writeln!(out, "{HELP}")?,
        Command::Exit => return Ok(false),
    }
    Ok(true)
}

/// Runs a session until `EXIT` or end of input.
///
/// Command errors are printed and the session continues; only I/O errors
/// on `input` or `out` end it early.
pub fn run(
    store: &mut Store,
    input: impl BufRead,
    out: &mut impl Write,
    prompt: Option<&str>,
) -> CliResult<()> {
    let mut lines = input.lines();
    loop {
        if let Some(prompt) = prompt {
            write!(out, "{prompt}")?;
            out.flush()?;
        }
        let Some(line) = lines.next() else {
            break;
        };
        let line = line?;

        let result = parse(&line).and_then(|command| match command {
            Some(command) => execute(store, command, out),
            None => Ok(true),
        });
        match result {
            Ok(true) => {}
            Ok(false) => break,
            Err(CliError::Io(e)) => return Err(CliError::Io(e)),
            Err(e) => writeln!(out, "ERROR: {e}")?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(script: &str) -> (Store, String) {
        let mut store = Store::in_memory().unwrap();
        let mut out = Vec::new();
        run(&mut store, script.as_bytes(), &mut out, None).unwrap();
        (store, String::from_utf8(out).unwrap())
    }

    #[test]
    fn parse_commands() {
        assert_eq!(parse("  begin ").unwrap(), Some(Command::Begin));
        assert_eq!(parse("# note").unwrap(), None);
        assert_eq!(parse("").unwrap(), None);
        assert_eq!(
            parse("SET user {\"name\": \"Alice\"}").unwrap(),
            Some(Command::Set("user".into(), "{\"name\": \"Alice\"}".into()))
        );
        assert_eq!(parse("get a").unwrap(), Some(Command::Get("a".into())));
    }

    #[test]
    fn parse_rejects_bad_lines() {
        assert!(parse("FROB").is_err());
        assert!(parse("GET").is_err());
        assert!(parse("GET a b").is_err());
        assert!(parse("SET a").is_err());
        assert!(parse("COMMIT now").is_err());
    }

    #[test]
    fn nested_session() {
        let (store, out) = session(
            "SET a 1\n\
             BEGIN\n\
             SET a 2\n\
             BEGIN\n\
             DELETE a\n\
             GET a\n\
             ROLLBACK\n\
             GET a\n\
             COMMIT\n\
             GET a\n",
        );

        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "OK");
        assert!(lines[1].starts_with("BEGIN txn:"));
        assert!(lines[5].starts_with("ERROR: key not found"));
        assert_eq!(lines[6], "OK (depth 1)");
        assert_eq!(lines[7], "2");
        assert_eq!(lines[9], "2");
        assert_eq!(store.committed().get("a"), Some(&layerkv_core::Value::Integer(2)));
    }

    #[test]
    fn errors_do_not_end_the_session() {
        let (store, out) = session("COMMIT\nSET k nope\nSET k true\nKEYS\n");

        assert!(out.contains("ERROR: no active transaction"));
        assert!(out.contains("ERROR: invalid JSON"));
        assert!(out.ends_with("OK\nk\n"));
        assert_eq!(store.keys(), vec!["k"]);
    }

    #[test]
    fn exit_stops_reading() {
        let (store, _) = session("BEGIN\nSET a 1\nEXIT\nCOMMIT\n");
        assert_eq!(store.depth(), 1);
        assert!(store.committed().is_empty());
    }

    #[test]
    fn status_lists_levels() {
        let (_, out) = session("BEGIN\nSET a 1\nBEGIN\nSTATUS\n");
        assert!(out.contains("depth 2\n"));
        assert!(out.contains("active, 1 pending"));
        assert!(out.contains("active, 0 pending"));
    }
}
