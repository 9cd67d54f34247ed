use std::fmt;
use std::process::Command;

use super::Error;

/// A program plus leading arguments, e.g. `"condor_q -name schedd01"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    /// Split `line` on whitespace. `what` names the command in error messages.
    pub fn parse(line: &str, what: &'static str) -> Result<Self, Error> {
        let mut words = line.split_whitespace().map(str::to_owned);
        let program = words.next().ok_or(Error::EmptyCommand(what))?;
        Ok(Self {
            program,
            args: words.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// A fresh `Command` with the program and leading args filled in.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Trim and shorten subprocess output for use in an error message.
pub(crate) fn summarize(bytes: &[u8]) -> String {
    const MAX_LEN: usize = 200;
    let text = String::from_utf8_lossy(bytes);
    let text = text.trim();
    match text.char_indices().nth(MAX_LEN) {
        Some((i, _)) => format!("{}...", &text[..i]),
        None => text.to_owned(),
    }
}
