//! Indenting text buffer for generated source.

use std::fmt;

const INDENT: &str = "    ";

/// Line-oriented writer that tracks indentation and pending blank lines.
#[derive(Debug, Default)]
pub struct CodeWriter {
    text: String,
    indent_count: usize,
    need_blank_line: bool,
    at_line_start: bool,
}

impl CodeWriter {
    pub fn new() -> Self {
        Self {
            at_line_start: true,
            ..Self::default()
        }
    }

    /// Empty writer starting at the same indentation level.
    pub fn child(&self) -> Self {
        Self {
            indent_count: self.indent_count,
            ..Self::new()
        }
    }

    pub fn line(&mut self, s: impl AsRef<str>) {
        self.push(s.as_ref());
        self.push("\n");
    }

    pub fn lines<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for line in lines {
            self.line(line);
        }
    }

    pub fn open_brace(&mut self) {
        self.line("{");
        self.indent_count += 1;
        self.need_blank_line = false;
    }

    pub fn close_brace(&mut self) {
        self.indent_count = self.indent_count.saturating_sub(1);
        self.need_blank_line = false;
        self.line("}");
    }

    pub fn push_indent(&mut self) {
        self.indent_count += 1;
    }

    pub fn pop_indent(&mut self) {
        self.indent_count = self.indent_count.saturating_sub(1);
    }

    /// Request a blank line before the next written line.
    pub fn need_blank_line(&mut self) {
        self.need_blank_line = true;
    }

    /// Append a child's output, honouring a pending blank line.
    pub fn splice(&mut self, child: CodeWriter) {
        if child.text.is_empty() {
            return;
        }
        if self.need_blank_line && !self.text.is_empty() {
            self.text.push('\n');
        }
        self.need_blank_line = false;
        self.text.push_str(&child.text);
        self.at_line_start = child.at_line_start;
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn into_string(self) -> String {
        self.text
    }

    fn push(&mut self, s: &str) {
        for (i, piece) in s.split('\n').enumerate() {
            if i > 0 {
                self.text.push('\n');
                self.at_line_start = true;
            }
            if piece.is_empty() {
                continue;
            }
            if self.at_line_start {
                if self.need_blank_line && !self.text.is_empty() {
                    self.text.push('\n');
                }
                self.need_blank_line = false;
                self.text.push_str(&INDENT.repeat(self.indent_count));
                self.at_line_start = false;
            }
            self.text.push_str(piece);
        }
    }
}

impl fmt::Write for CodeWriter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.push(s);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn test_braces_and_indentation() {
        let mut w = CodeWriter::new();
        w.line("class A");
        w.open_brace();
        w.line("int x;");
        w.need_blank_line();
        w.line("int y;");
        w.close_brace();
        assert_eq!(w.as_str(), "class A\n{\n    int x;\n\n    int y;\n}\n");
    }

    #[test]
    fn test_pending_blank_line_dropped_at_brace() {
        let mut w = CodeWriter::new();
        w.line("{");
        w.push_indent();
        w.need_blank_line();
        w.close_brace();
        assert_eq!(w.as_str(), "{\n}\n");
    }

    #[test]
    fn test_child_splice_and_fmt_write() {
        let mut w = CodeWriter::new();
        w.push_indent();
        let mut child = w.child();
        writeln!(child, "return {};", 42).unwrap();
        w.line("first();");
        w.need_blank_line();
        w.splice(child);
        assert_eq!(w.as_str(), "    first();\n\n    return 42;\n");
    }

    #[test]
    fn test_empty_child_is_ignored() {
        let mut w = CodeWriter::new();
        w.line("a");
        w.need_blank_line();
        w.splice(w.child());
        w.line("b");
        assert_eq!(w.as_str(), "a\n\nb\n");
    }
}
