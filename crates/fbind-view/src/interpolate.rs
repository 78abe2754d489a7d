#![forbid(unsafe_code)]

//! Text interpolation: split `Hello, {{ user.name }}!` into literal and path
//! segments.
//!
//! A placeholder is `open`, optional whitespace, one token without internal
//! whitespace, optional whitespace, `close`. Anything else between the
//! delimiters (empty, or several words) is kept as literal text, as is an
//! unclosed `open`. Scanning resumes right after a rejected `open`, so
//! `{{ {{ a }}` still binds `a`.

use std::fmt;

/// One piece of an interpolated text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Literal(String),
    Path(String),
}

/// A parsed text template.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Scan `text` for placeholders delimited by `open` / `close`.
    #[must_use]
    pub fn parse(text: &str, open: &str, close: &str) -> Self {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut rest = text;

        if open.is_empty() || close.is_empty() {
            return Self::literal(text);
        }

        while let Some(start) = rest.find(open) {
            literal.push_str(&rest[..start]);
            let after_open = &rest[start + open.len()..];
            let Some(end) = after_open.find(close) else {
                // Unclosed: the remainder is literal.
                literal.push_str(&rest[start..]);
                rest = "";
                break;
            };

            let token = after_open[..end].trim();
            if !is_path_token(token) {
                // Only the opener is literal; a later opener may still match.
                literal.push_str(open);
                rest = after_open;
                continue;
            }
            if !literal.is_empty() {
                segments.push(Segment::Literal(std::mem::take(&mut literal)));
            }
            segments.push(Segment::Path(token.to_string()));
            rest = &after_open[end + close.len()..];
        }

        literal.push_str(rest);
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Self { segments }
    }

    fn literal(text: &str) -> Self {
        let segments = if text.is_empty() {
            Vec::new()
        } else {
            vec![Segment::Literal(text.to_string())]
        };
        Self { segments }
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Paths in order of appearance, repeats included.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Path(path) => Some(path.as_str()),
            Segment::Literal(_) => None,
        })
    }

    #[must_use]
    pub fn has_placeholders(&self) -> bool {
        self.paths().next().is_some()
    }

    /// Substitute `values[i]` for the i-th path segment. Missing values
    /// render as empty text.
    #[must_use]
    pub fn render<S: AsRef<str>>(&self, values: &[S]) -> String {
        let mut out = String::new();
        let mut next = values.iter();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Path(_) => {
                    if let Some(value) = next.next() {
                        out.push_str(value.as_ref());
                    }
                }
            }
        }
        out
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Path(path) => write!(f, "{{{{ {path} }}}}")?,
            }
        }
        Ok(())
    }
}

fn is_path_token(token: &str) -> bool {
    !token.is_empty() && !token.chars().any(char::is_whitespace)
}
