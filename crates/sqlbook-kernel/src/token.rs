//! Input sanitizing and tokenizing.
//!
//! One notebook cell arrives as a raw string. For command classification it
//! is first sanitized (control characters stripped, whitespace collapsed)
//! and then split into a token sequence. Quoted substrings stay atomic so a
//! SQL string literal is never split on its internal spaces. The raw string
//! itself is preserved by the orchestrator for the plain-SQL path.

/// Strip disallowed control characters and normalize all whitespace runs to
/// a single space. Leading/trailing whitespace is dropped.
#[must_use]
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_space = false;
    for ch in raw.chars() {
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
        } else if !ch.is_control() {
            if pending_space {
                out.push(' ');
                pending_space = false;
            }
            out.push(ch);
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    SingleQuote,
    DoubleQuote,
}

/// Split sanitized input on whitespace, keeping quoted substrings atomic.
///
/// Quote characters stay part of their token. A doubled quote inside a
/// literal (`''` / `""`) is the SQL escape and does not close it. An
/// unterminated literal runs to the end of the input. Empty input yields an
/// empty sequence.
#[must_use]
pub fn tokenize(sanitized: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut state = ScanState::Normal;

    let mut chars = sanitized.chars().peekable();
    while let Some(ch) = chars.next() {
        match state {
            ScanState::Normal => match ch {
                c if c.is_whitespace() => {
                    if !current.is_empty() {
                        tokens.push(std::mem::take(&mut current));
                    }
                }
                '\'' => {
                    state = ScanState::SingleQuote;
                    current.push(ch);
                }
                '"' => {
                    state = ScanState::DoubleQuote;
                    current.push(ch);
                }
                _ => current.push(ch),
            },
            ScanState::SingleQuote => {
                current.push(ch);
                if ch == '\'' {
                    if chars.peek() == Some(&'\'') {
                        current.push('\'');
                        chars.next();
                    } else {
                        state = ScanState::Normal;
                    }
                }
            }
            ScanState::DoubleQuote => {
                current.push(ch);
                if ch == '"' {
                    if chars.peek() == Some(&'"') {
                        current.push('"');
                        chars.next();
                    } else {
                        state = ScanState::Normal;
                    }
                }
            }
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
