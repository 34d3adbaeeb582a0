//! Indenting text writer for generated code

use std::fmt::Write;

const INDENT: &str = "  ";

#[derive(Debug, Default)]
pub struct Emitter {
    buffer: String,
    level: usize,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write one line at the current indentation. Embedded newlines are
    /// split so every line is indented.
    pub fn write_line(&mut self, text: &str) {
        for line in text.lines() {
            if line.is_empty() {
                self.buffer.push('\n');
                continue;
            }
            for _ in 0..self.level {
                self.buffer.push_str(INDENT);
            }
            self.buffer.push_str(line);
            self.buffer.push('\n');
        }
    }

    /// Write `text` and indent what follows.
    pub fn enter(&mut self, text: &str) {
        self.write_line(text);
        self.indent();
    }

    /// Outdent, then write `text`.
    pub fn leave(&mut self, text: &str) {
        self.outdent();
        self.write_line(text);
    }

    /// Outdent, write `text`, indent again: `} else {`.
    pub fn leave_and_enter(&mut self, text: &str) {
        self.outdent();
        self.enter(text);
    }

    pub fn indent(&mut self) {
        self.level += 1;
    }

    pub fn outdent(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn finish(self) -> String {
        self.buffer
    }
}

/// Double-quoted string literal for generated code.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\u{2028}' | '\u{2029}' => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c if u32::from(c) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}
