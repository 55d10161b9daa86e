//! External process invocation and operator-facing status tags.

use std::path::Path;
use std::process::Command;

use colored::Colorize;

use crate::error::{Error, Result};

/// Render a command line for logs and error reports.
#[must_use]
pub fn command_line(program: &Path, args: &[String]) -> String {
    let mut line = program.display().to_string();
    for arg in args {
        line.push(' ');
        line.push_str(arg);
    }
    line
}

/// Run an external program to completion, capturing combined stdout/stderr.
///
/// A non-zero exit status (or a failure to spawn at all) becomes
/// [`Error::ToolInvocation`] carrying the full command line and the captured
/// output. The callers decide whether that is fatal.
pub fn run(program: &Path, args: &[String]) -> Result<String> {
    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| Error::ToolInvocation {
            command: command_line(program, args),
            output: e.to_string(),
        })?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        return Err(Error::ToolInvocation {
            command: command_line(program, args),
            output: combined,
        });
    }
    Ok(combined)
}

/// Print a green progress tag, e.g. `[ENCODING] outputs/hevc/...`.
pub fn progress(tag: &str, message: impl std::fmt::Display) {
    println!("{} {message}", format!("[{tag}]").green().bold());
}

/// Print a red `[ERROR]` tag.
pub fn failure(message: impl std::fmt::Display) {
    println!("{} {message}", "[ERROR]".red().bold());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn command_line_rendering() {
        let line = command_line(
            &PathBuf::from("/tools/HDRConvert"),
            &["-f".to_string(), "a.cfg".to_string()],
        );
        assert_eq!(line, "/tools/HDRConvert -f a.cfg");
    }

    #[test]
    #[cfg(unix)]
    fn nonzero_exit_is_tool_invocation() {
        let err = run(&PathBuf::from("false"), &[]).unwrap_err();
        match err {
            Error::ToolInvocation { command, .. } => assert_eq!(command, "false"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    #[cfg(unix)]
    fn captures_output() {
        let out = run(&PathBuf::from("echo"), &["hello".to_string()]).unwrap();
        assert_eq!(out.trim(), "hello");
    }
}
