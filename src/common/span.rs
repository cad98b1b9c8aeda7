use std::{
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
    rc::Rc,
};

use crate::common::source::Source;

/// A `Span` refers to a section of a source,
/// much like a `&str`, but with a reference to a `Source` rather than a `String`.
/// Every node of the expression tree carries one, so that
/// a failed compilation can point at the offending occurrence,
/// and so the type checker can attach inferred types to occurrences.
#[derive(Clone, Eq, PartialEq)]
pub struct Span {
    source: Rc<Source>,
    offset: usize,
    length: usize,
}

impl Span {
    /// Create a new `Span` from an offset with a length.
    pub fn new(source: &Rc<Source>, offset: usize, length: usize) -> Span {
        Span {
            source: Rc::clone(source),
            offset,
            length,
        }
    }

    /// A `Span` that points at a specific point in the source.
    /// Has a length of `0`.
    pub fn point(source: &Rc<Source>, offset: usize) -> Span {
        Span::new(source, offset, 0)
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Return the index of the end of the `Span`.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the contents of a `Span`.
    /// Spans that fall outside of their source (as built by hand
    /// for trees that never went through the parser) have no contents.
    pub fn contents(&self) -> String {
        self.source
            .contents
            .get(self.offset..self.end())
            .unwrap_or("")
            .to_string()
    }

    pub fn path(&self) -> String {
        self.source.path.to_string_lossy().to_string()
    }

    fn clamp(&self, index: usize) -> usize {
        index.min(self.source.contents.len())
    }

    pub fn lines(&self) -> Vec<String> {
        let lines: Vec<_> = self.source.contents.split('\n').collect();
        let start_line = self.line(self.offset);
        let end_line = self.line(self.end()).min(lines.len().saturating_sub(1));
        lines[start_line..=end_line.max(start_line)]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    pub fn line(&self, index: usize) -> usize {
        let index = self.clamp(index);
        let lines = self.source.contents[..index].split_inclusive('\n').count();
        lines.saturating_sub(1)
    }

    pub fn col(&self, index: usize) -> usize {
        let index = self.clamp(index);
        self.source.contents[..index]
            .split_inclusive('\n')
            .last()
            .unwrap_or("")
            .chars()
            .count()
    }

    pub fn format(&self) -> FormattedSpan {
        FormattedSpan {
            path: self.path(),
            start: self.line(self.offset),
            lines: self.lines(),
            start_col: self.col(self.offset),
            end_col: self.col(self.end()),
        }
    }
}

// Two occurrences are the same key when they cover the same text of the same file;
// this is what the inferred-type map is keyed on.
impl Hash for Span {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.path.hash(state);
        self.offset.hash(state);
        self.length.hash(state);
    }
}

impl Debug for Span {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Span")
            .field("contents", &self.contents())
            .field("start", &self.offset)
            .field("end", &self.end())
            .finish()
    }
}

impl Display for Span {
    /// Given a `Span`, `fmt` will print out where the `Span` occurs in its source.
    /// ```plain
    /// 12 | let x = undefined in x
    ///    |         ^^^^^^^^^
    /// ```
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

/// Represents a formatted span, ready to be displayed.
pub struct FormattedSpan {
    pub path: String,
    pub start: usize,
    pub lines: Vec<String>,
    pub start_col: usize,
    pub end_col: usize,
}

impl FormattedSpan {
    pub fn is_multiline(&self) -> bool {
        self.lines.len() != 1
    }

    pub fn gutter_padding(&self) -> usize {
        (self.start + 1).to_string().len()
    }

    /// If a single line span, returns the number of carrots between cols.
    pub fn carrots(&self) -> Option<usize> {
        if self.lines.len() == 1 {
            Some(self.end_col.saturating_sub(self.start_col))
        } else {
            None
        }
    }
}

impl Display for FormattedSpan {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "In {}:{}:{}",
            self.path,
            self.start + 1,
            self.start_col + 1
        )?;
        writeln!(f, "{} |", " ".repeat(self.gutter_padding()))?;

        match self.carrots() {
            Some(carrots) => {
                writeln!(f, "{} | {}", self.start + 1, self.lines[0])?;
                writeln!(
                    f,
                    "{} | {}{}",
                    " ".repeat(self.gutter_padding()),
                    " ".repeat(self.start_col),
                    "^".repeat(carrots.max(1)),
                )?;
            },
            None => {
                for (index, line) in self.lines.iter().enumerate() {
                    let line_no = (self.start + index + 1).to_string();
                    let padding = " ".repeat(self.gutter_padding().saturating_sub(line_no.len()));
                    writeln!(f, "{}{} > {}", line_no, padding, line)?;
                }
            },
        }

        Ok(())
    }
}

/// A wrapper for spanning types.
/// Every `ExpressionNode` is a `Spanned<Expr>`,
/// every pattern a `Spanned<Pattern>`.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<T> {
    pub item: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Takes a generic item, and wraps in in a `Span` to make it `Spanned`.
    pub fn new(item: T, span: Span) -> Spanned<T> {
        Spanned { item, span }
    }

    /// Applies a function a `Spanned`'s item.
    pub fn map<B, E>(self, f: fn(T) -> Result<B, E>) -> Result<Spanned<B>, E> {
        Ok(Spanned::new(f(self.item)?, self.span))
    }
}
