//! Turning file contents into logical lines with comments removed.
//!
//! Physical lines ending in a backslash are joined with the following line,
//! `\r\n` is normalized to `\n` and a leading byte-order mark is dropped.
//! Block comments are tracked with a counter that goes up on every `/*` and
//! down on every `*/`, clamped at zero, so `/* /* */ */` needs both closers.

use crate::core::AddonError;

/// One logical line of a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogicalLine {
    /// Joined text, without the line terminator
    pub text: String,
    /// Physical line number of the last line that was joined in
    pub line: usize,
}

/// Splits `content` into logical lines.
#[must_use]
pub fn logical_lines(content: &str) -> Vec<LogicalLine> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut physical: Vec<&str> = content.split('\n').collect();
    if physical.last() == Some(&"") {
        physical.pop();
    }

    let mut lines = Vec::new();
    let mut pending = String::new();
    for (index, raw) in physical.iter().enumerate() {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(continued) = raw.strip_suffix('\\') {
            pending.push_str(continued);
            continue;
        }
        pending.push_str(raw);
        lines.push(LogicalLine {
            text: std::mem::take(&mut pending),
            line: index + 1,
        });
    }

    if !pending.is_empty() {
        lines.push(LogicalLine {
            text: pending,
            line: physical.len(),
        });
    }

    lines
}

/// Removes comments line by line, carrying block comment state across lines.
#[derive(Debug, Default)]
pub struct CommentStripper {
    depth: usize,
    opened_at: usize,
}

impl CommentStripper {
    /// Creates a stripper outside of any comment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a block comment is open after the lines seen so far.
    #[must_use]
    pub fn in_comment(&self) -> bool {
        self.depth > 0
    }

    /// Returns `text` with comment characters replaced by spaces and
    /// everything from a `//` onward dropped.
    ///
    /// Comment markers inside single or double quoted strings are ignored.
    /// A string ends at the end of its logical line.
    pub fn strip(&mut self, text: &str, line: usize) -> String {
        let mut chars: Vec<char> = text.chars().collect();
        let mut in_string: Option<char> = None;
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let prev = if i > 0 { chars[i - 1] } else { '\0' };
            let next = chars.get(i + 1).copied().unwrap_or('\0');

            if let Some(quote) = in_string {
                if c == quote && prev != '\\' {
                    in_string = None;
                }
                i += 1;
                continue;
            }
            if self.depth == 0 && (c == '"' || c == '\'') && prev != '\\' {
                in_string = Some(c);
                i += 1;
                continue;
            }

            if c == '/' && next == '/' && self.depth == 0 {
                chars.truncate(i);
                break;
            }
            if c == '/' && next == '*' {
                if self.depth == 0 {
                    self.opened_at = line;
                }
                self.depth += 1;
                chars[i] = ' ';
                chars[i + 1] = ' ';
                i += 2;
                continue;
            }
            if c == '*' && next == '/' {
                self.depth = self.depth.saturating_sub(1);
                chars[i] = ' ';
                chars[i + 1] = ' ';
                i += 2;
                continue;
            }

            if self.depth > 0 {
                chars[i] = ' ';
            }
            i += 1;
        }

        chars.into_iter().collect()
    }

    /// Fails if a block comment is still open at end of file.
    pub fn finish(&self, file: &str) -> Result<(), AddonError> {
        if self.in_comment() {
            return Err(AddonError::UnterminatedComment {
                file: file.to_string(),
                line: self.opened_at,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(content: &str) -> Vec<(String, usize)> {
        logical_lines(content)
            .into_iter()
            .map(|l| (l.text, l.line))
            .collect()
    }

    #[test]
    fn test_logical_lines_join_continuations() {
        let lines = texts("a \\\r\n  b\r\nc\n");
        assert_eq!(
            lines,
            vec![("a   b".to_string(), 2), ("c".to_string(), 3)]
        );
    }

    #[test]
    fn test_logical_lines_strip_bom_and_keep_blank_lines() {
        let lines = texts("\u{feff}x\n\ny");
        assert_eq!(
            lines,
            vec![
                ("x".to_string(), 1),
                (String::new(), 2),
                ("y".to_string(), 3)
            ]
        );
    }

    #[test]
    fn test_line_comment_truncates() {
        let mut stripper = CommentStripper::new();
        assert_eq!(stripper.strip("x = 1; // note", 1), "x = 1; ");
    }

    #[test]
    fn test_comment_markers_inside_strings_are_inert() {
        let mut stripper = CommentStripper::new();
        assert_eq!(
            stripper.strip("url = \"http://a/*b*/\"; // c", 1),
            "url = \"http://a/*b*/\"; "
        );
        assert_eq!(stripper.strip("s = 'a//b';", 2), "s = 'a//b';");
        assert!(!stripper.in_comment());
    }

    #[test]
    fn test_block_comment_spans_lines() {
        let mut stripper = CommentStripper::new();
        assert_eq!(stripper.strip("a /* b", 1), "a     ");
        assert!(stripper.in_comment());
        assert_eq!(stripper.strip("c // d", 2), "      ");
        assert_eq!(stripper.strip("e */ f", 3), "     f");
        assert!(stripper.finish("x.hpp").is_ok());
    }

    #[test]
    fn test_block_comment_counter_needs_every_closer() {
        let mut stripper = CommentStripper::new();
        let out = stripper.strip("/* /* */ still */ x", 1);
        assert_eq!(out.trim(), "x");

        let mut stripper = CommentStripper::new();
        let out = stripper.strip("/* /* */ y", 1);
        assert_eq!(out.trim(), "");
        assert!(stripper.in_comment());
    }

    #[test]
    fn test_stray_closer_is_blanked() {
        let mut stripper = CommentStripper::new();
        assert_eq!(stripper.strip("a */ b", 1), "a    b");
        assert!(!stripper.in_comment());
    }

    #[test]
    fn test_unterminated_comment_reported_at_opening_line() {
        let mut stripper = CommentStripper::new();
        stripper.strip("ok", 1);
        stripper.strip("/* never closed", 2);
        stripper.strip("still inside", 3);
        let err = stripper.finish("x.hpp").unwrap_err();
        assert_eq!(
            err,
            AddonError::UnterminatedComment {
                file: "x.hpp".to_string(),
                line: 2
            }
        );
    }
}
