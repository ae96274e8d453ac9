use std::fmt;

/// Prefix marking a comment line in the command script.
pub const COMMENT_PREFIX: &str = "::";

/// One line of the command script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Annotation echoed to the console when the script runs.
    Comment(String),
    /// Shell-invocable command.
    Exec(String),
}

impl Command {
    pub fn comment(text: impl Into<String>) -> Self {
        Command::Comment(text.into())
    }

    pub fn exec(line: impl Into<String>) -> Self {
        Command::Exec(line.into())
    }

    /// Line as it appears in the written script.
    pub fn to_script_line(&self) -> String {
        match self {
            Command::Comment(text) => format!("echo {COMMENT_PREFIX} {text}"),
            Command::Exec(line) => line.clone(),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Comment(text) => write!(f, "{COMMENT_PREFIX} {text}"),
            Command::Exec(line) => write!(f, "{line}"),
        }
    }
}

/// Renders the full script. The first line turns off command echo.
pub fn render_script(commands: &[Command]) -> String {
    let mut lines = Vec::with_capacity(commands.len() + 1);
    lines.push("@echo off".to_string());
    lines.extend(commands.iter().map(Command::to_script_line));
    let mut script = lines.join("\n");
    script.push('\n');
    script
}
