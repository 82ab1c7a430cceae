//! The argument-file expander (spec §4.2).
//!
//! Pre-expands `@file` tokens into inline argv before tokenizing. Expansion
//! is not recursive: tokens produced by an expansion are spliced into the
//! stream as-is and are never themselves re-scanned for `@`.

use crate::error::ParseError;
use crate::platform::Platform;

/// Expands every `@path` token in `argv` using `platform` to read files,
/// returning the expanded token stream. `prefix` is the configured
/// `argumentFilePrefix`; passing `None` disables expansion entirely and
/// `@`-tokens pass through untouched.
pub fn expand_argument_files(
    argv: &[String],
    prefix: Option<char>,
    platform: &dyn Platform,
) -> Result<Vec<String>, ParseError> {
    let Some(prefix) = prefix else {
        return Ok(argv.to_vec());
    };

    let mut out = Vec::with_capacity(argv.len());
    for token in argv {
        let mut chars = token.chars();
        if chars.next() == Some(prefix) {
            let path = chars.as_str();
            let contents = platform.read_file(path).ok_or_else(|| ParseError::ArgFileUnreadable {
                path: path.to_string(),
                reason: "file not found or not readable UTF-8".to_string(),
            })?;
            out.extend(tokenize_file_contents(&contents));
        } else {
            out.push(token.clone());
        }
    }
    Ok(out)
}

/// Splits file contents on whitespace, discarding blank lines and lines
/// whose first non-whitespace character is `#`.
fn tokenize_file_contents(contents: &str) -> Vec<String> {
    contents
        .lines()
        .filter(|line| {
            let trimmed = line.trim_start();
            !trimmed.is_empty() && !trimmed.starts_with('#')
        })
        .flat_map(str::split_whitespace)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::StdPlatform;
    use std::io::Write;

    #[test]
    fn expands_inline_and_skips_comments_and_blanks() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# a comment").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "--name Alice").unwrap();
        writeln!(file, "-t 3").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let argv = vec![format!("@{path}"), "input.txt".to_string()];
        let expanded = expand_argument_files(&argv, Some('@'), &StdPlatform).unwrap();
        assert_eq!(expanded, vec!["--name", "Alice", "-t", "3", "input.txt"]);
    }

    #[test]
    fn disabled_prefix_passes_tokens_through() {
        let argv = vec!["@nope".to_string()];
        let expanded = expand_argument_files(&argv, None, &StdPlatform).unwrap();
        assert_eq!(expanded, argv);
    }

    #[test]
    fn unreadable_file_is_a_distinct_error() {
        let argv = vec!["@/no/such/path/at/all".to_string()];
        let result = expand_argument_files(&argv, Some('@'), &StdPlatform);
        assert!(matches!(result, Err(ParseError::ArgFileUnreadable { .. })));
    }

    #[test]
    fn expansion_is_not_recursive() {
        let mut outer = tempfile::NamedTempFile::new().unwrap();
        let mut inner = tempfile::NamedTempFile::new().unwrap();
        writeln!(inner, "--inner-value").unwrap();
        writeln!(outer, "@{}", inner.path().to_str().unwrap()).unwrap();

        let argv = vec![format!("@{}", outer.path().to_str().unwrap())];
        let expanded = expand_argument_files(&argv, Some('@'), &StdPlatform).unwrap();
        assert_eq!(expanded, vec![format!("@{}", inner.path().to_str().unwrap())]);
    }
}
