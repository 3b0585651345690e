//! Interactive input
//!
//! Message bodies, replies and notes can be composed in $EDITOR when not
//! given on the command line. Destructive commands confirm on a TTY.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::process::Command;

use anyhow::{bail, Context, Result};

/// Lines starting with this marker are stripped from editor output
const COMMENT_MARKER: &str = "#";

/// Compose text in the user's editor
///
/// `hint` is shown as comment lines above the initial content. Returns the
/// trimmed text with comment lines removed.
pub fn compose(hint: &str, initial: &str) -> Result<String> {
    let editor = find_editor()?;

    let mut file = tempfile::Builder::new()
        .prefix("courtline_")
        .suffix(".txt")
        .tempfile()
        .context("Failed to create temp file")?;
    for line in hint.lines() {
        writeln!(file, "{} {}", COMMENT_MARKER, line)?;
    }
    write!(file, "{}", initial)?;
    file.flush()?;

    let status = Command::new(&editor)
        .arg(file.path())
        .status()
        .with_context(|| format!("Failed to run editor: {}", editor))?;
    if !status.success() {
        bail!(
            "Editor '{}' exited with non-zero status. Check that your editor is configured correctly.",
            editor
        );
    }

    let content = fs::read_to_string(file.path())
        .with_context(|| format!("Failed to read edited file: {:?}", file.path()))?;
    Ok(strip_comments(&content))
}

/// Use `given` when present, otherwise open the editor. Empty text is an error.
pub fn text_or_compose(given: Option<String>, hint: &str) -> Result<String> {
    let text = match given {
        Some(text) => text.trim().to_string(),
        None => compose(hint, "")?,
    };
    if text.is_empty() {
        bail!("Aborted: empty text");
    }
    Ok(text)
}

fn strip_comments(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.starts_with(COMMENT_MARKER))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

/// $EDITOR, then $VISUAL, then the first common editor on PATH
fn find_editor() -> Result<String> {
    for var in ["EDITOR", "VISUAL"] {
        if let Ok(editor) = env::var(var) {
            if !editor.is_empty() {
                return Ok(editor);
            }
        }
    }

    ["nano", "vim", "vi", "notepad"]
        .into_iter()
        .find(|e| command_exists(e))
        .map(str::to_string)
        .context("No editor found. Set $EDITOR or pass the text on the command line.")
}

fn command_exists(cmd: &str) -> bool {
    Command::new("which")
        .arg(cmd)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// Prompt for confirmation
///
/// Returns true if the user confirms. Without a TTY on stdin, returns false.
pub fn confirm(prompt: &str) -> Result<bool> {
    if !atty::is(atty::Stream::Stdin) {
        return Ok(false);
    }

    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_comments() {
        let content = "# Write the reply\n# below\nSee you Monday.\n\nThanks\n";
        assert_eq!(strip_comments(content), "See you Monday.\n\nThanks");
        assert_eq!(strip_comments("# only a hint\n"), "");
    }

    #[test]
    fn test_text_given_skips_editor() {
        assert_eq!(
            text_or_compose(Some("  hello ".to_string()), "hint").unwrap(),
            "hello"
        );
        assert!(text_or_compose(Some("   ".to_string()), "hint").is_err());
    }

    #[test]
    fn test_command_exists() {
        #[cfg(unix)]
        assert!(command_exists("ls"));

        assert!(!command_exists("definitely_not_a_real_command_12345"));
    }
}
