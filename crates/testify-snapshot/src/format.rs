//! Indenting formatter for compact JSON.
//!
//! A single pass over the characters with a small quote-aware state machine.
//! It does not parse JSON: structural characters are only recognised outside
//! string literals, and unbalanced input yields odd indentation instead of an
//! error.

const INDENT: &str = "  ";
const NEW_LINE: char = '\n';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Between,
    InSingleQuote,
    InDoubleQuote,
    EscapeInSingle,
    EscapeInDouble,
}

struct FormatterState {
    output: String,
    mode: Mode,
    depth: usize,
}

impl FormatterState {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            output: String::with_capacity(capacity),
            mode: Mode::Between,
            depth: 0,
        }
    }

    fn push_indent(&mut self) {
        for _ in 0..self.depth {
            self.output.push_str(INDENT);
        }
    }

    fn between(&mut self, current: char) {
        match current {
            '{' | '[' => {
                self.output.push(current);
                self.output.push(NEW_LINE);
                self.depth += 1;
                self.push_indent();
            }
            '}' | ']' => {
                self.output.push(NEW_LINE);
                self.depth = self.depth.saturating_sub(1);
                self.push_indent();
                self.output.push(current);
            }
            ',' => {
                self.output.push(current);
                self.output.push(NEW_LINE);
                self.push_indent();
            }
            ':' => self.output.push_str(" : "),
            '\'' => {
                self.output.push(current);
                self.mode = Mode::InSingleQuote;
            }
            '"' => {
                self.output.push(current);
                self.mode = Mode::InDoubleQuote;
            }
            ' ' => {}
            other => self.output.push(other),
        }
    }

    fn quoted(&mut self, current: char, quote: char, escape: Mode) {
        self.output.push(current);
        if current == quote {
            self.mode = Mode::Between;
        } else if current == '\\' {
            self.mode = escape;
        }
    }

    fn feed(&mut self, current: char) {
        match self.mode {
            Mode::Between => self.between(current),
            Mode::InSingleQuote => self.quoted(current, '\'', Mode::EscapeInSingle),
            Mode::InDoubleQuote => self.quoted(current, '"', Mode::EscapeInDouble),
            Mode::EscapeInSingle => {
                self.output.push(current);
                self.mode = Mode::InSingleQuote;
            }
            Mode::EscapeInDouble => {
                self.output.push(current);
                self.mode = Mode::InDoubleQuote;
            }
        }
    }
}

/// Reformat compact JSON with two-space indentation and `\n` line endings.
///
/// Literal `\r` and `\n` characters are removed first, so feeding the output
/// back in yields the same text.
#[must_use]
pub fn pretty_print(compact: &str) -> String {
    let mut state = FormatterState::with_capacity(compact.len() * 2);
    for current in compact.chars().filter(|current| !matches!(current, '\r' | '\n')) {
        state.feed(current);
    }
    state.output
}
