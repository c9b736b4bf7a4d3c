// Copyright (c) 2025 Zensical and contributors

// SPDX-License-Identifier: MIT
// Third-party contributions licensed under DCO

// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to
// deal in the Software without restriction, including without limitation the
// rights to use, copy, modify, merge, publish, distribute, sublicense, and/or
// sell copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:

// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.

// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NON-INFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
// FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS
// IN THE SOFTWARE.

// ----------------------------------------------------------------------------

//! Built-in minifiers.

use crate::executor::Minifier;

// ----------------------------------------------------------------------------
// Enums
// ----------------------------------------------------------------------------

/// Built-in minifier.
///
/// The built-in minifiers are conservative: they remove comments, trailing
/// whitespace and blank lines, but never rewrite code. Comments starting
/// with `/*!` are retained, as they usually carry license notices. String
/// literals are left untouched.
///
/// # Examples
///
/// ```
/// use trellis::executor::Minifier;
/// use trellis::node::assets::minify::Builtin;
///
/// // Minify style sheet
/// let minifier = Builtin::for_extension("css").unwrap();
/// let css = minifier.minify("/* reset */\nbody {\n\n  margin: 0;\n}\n");
/// assert_eq!(css, "body {\n  margin: 0;\n}\n");
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    /// Scripts, with line and block comments.
    Script,
    /// Style sheets, with block comments.
    Style,
}

/// Lexical state.
#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    /// Code.
    Code,
    /// String literal, with its delimiter.
    Literal(char),
    /// Line comment.
    Line,
    /// Block comment.
    Block,
}

// ----------------------------------------------------------------------------
// Implementations
// ----------------------------------------------------------------------------

impl Builtin {
    /// Returns the built-in minifier for the given extension.
    #[must_use]
    pub fn for_extension(ext: &str) -> Option<Self> {
        match ext {
            "js" | "mjs" => Some(Builtin::Script),
            "css" => Some(Builtin::Style),
            _ => None,
        }
    }

    /// Returns whether the given delimiter starts a string literal.
    fn is_delimiter(self, c: char) -> bool {
        match self {
            Builtin::Script => matches!(c, '"' | '\'' | '`'),
            Builtin::Style => matches!(c, '"' | '\''),
        }
    }

    /// Removes comments from the given source.
    fn strip(self, source: &str) -> String {
        let mut output = String::with_capacity(source.len());
        let mut state = State::Code;
        let mut chars = source.chars().peekable();
        let mut prev = '\n';
        while let Some(c) = chars.next() {
            let next = chars.peek().copied();
            match state {
                State::Code => match (c, next) {
                    ('/', Some('*')) if !is_notice(chars.clone()) => {
                        chars.next();
                        state = State::Block;
                    }
                    ('/', Some('/'))
                        if self == Builtin::Script && prev != ':' =>
                    {
                        state = State::Line;
                    }
                    _ => {
                        if self.is_delimiter(c) {
                            state = State::Literal(c);
                        }
                        output.push(c);
                    }
                },
                State::Literal(delimiter) => {
                    output.push(c);
                    if c == '\\' {
                        if let Some(next) = chars.next() {
                            output.push(next);
                        }
                    } else if c == delimiter {
                        state = State::Code;
                    }
                }
                State::Line => {
                    if c == '\n' {
                        output.push(c);
                        state = State::Code;
                    }
                }
                State::Block => {
                    if c == '*' && next == Some('/') {
                        chars.next();
                        state = State::Code;
                    }
                }
            }
            prev = c;
        }
        output
    }
}

// ----------------------------------------------------------------------------
// Trait implementations
// ----------------------------------------------------------------------------

impl Minifier for Builtin {
    fn minify(&self, source: &str) -> String {
        let stripped = self.strip(source);
        let mut output = String::with_capacity(stripped.len());
        for line in stripped.lines().map(str::trim_end) {
            if !line.trim_start().is_empty() {
                output.push_str(line);
                output.push('\n');
            }
        }
        output
    }
}

// ----------------------------------------------------------------------------
// Functions
// ----------------------------------------------------------------------------

/// Returns whether the block comment ahead is a notice, i.e. `/*!`.
fn is_notice<I>(mut chars: I) -> bool
where
    I: Iterator<Item = char>,
{
    chars.next();
    chars.next() == Some('!')
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_script_comments() {
        let source = "/*! MIT */\n// setup\nvar a = 1; // one\n\n\
                      /* block\n comment */var b = \"// not a comment\";\n\
                      var c = 'http://example.com';\n";
        assert_eq!(
            Builtin::Script.minify(source),
            "/*! MIT */\nvar a = 1;\nvar b = \"// not a comment\";\n\
             var c = 'http://example.com';\n"
        );
    }

    #[test]
    fn keeps_line_comments_in_style_sheets() {
        let source = "a { background: url(//cdn/x.png); } /* x */\n";
        assert_eq!(
            Builtin::Style.minify(source),
            "a { background: url(//cdn/x.png); }\n"
        );
    }

    #[test]
    fn handles_escaped_delimiters() {
        let source = "var s = 'it\\'s // fine';\n";
        assert_eq!(Builtin::Script.minify(source), source);
    }

    #[test]
    fn selects_by_extension() {
        assert_eq!(Builtin::for_extension("js"), Some(Builtin::Script));
        assert_eq!(Builtin::for_extension("css"), Some(Builtin::Style));
        assert_eq!(Builtin::for_extension("html"), None);
    }
}
