//! Source listing formatting.

use crate::client::Breakpoint;
use std::borrow::Cow;
use std::collections::HashMap;
use std::io::{self, BufRead};

/// Tab stops are every 8 columns.
const TAB_WIDTH: usize = 8;
/// Minimal width of a listing line label.
const MIN_LABEL_WIDTH: usize = 3;

/// Replace tabs with spaces up to the next tab stop.
pub fn expand_tabs(input: &str) -> Cow<'_, str> {
    if !input.contains('\t') {
        return Cow::Borrowed(input);
    }

    let mut out = String::with_capacity(input.len() + TAB_WIDTH);
    let mut column = 0;
    for c in input.chars() {
        match c {
            '\t' => {
                let pad = TAB_WIDTH - column % TAB_WIDTH;
                out.extend(std::iter::repeat(' ').take(pad));
                column = 0;
            }
            '\n' => {
                out.push('\n');
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    Cow::Owned(out)
}

/// Number of decimal digits needed to print `n`.
pub fn digits(n: usize) -> usize {
    if n == 0 {
        return 1;
    }
    n.ilog10() as usize + 1
}

/// Number of hexadecimal digits needed to print `n`.
pub fn hexdigits(n: u64) -> usize {
    if n == 0 {
        return 1;
    }
    (n.ilog2() / 4) as usize + 1
}

/// Width of the index label column for a listing of `line_count` lines.
pub fn label_width(line_count: usize) -> usize {
    digits(line_count).max(MIN_LABEL_WIDTH)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListingLine {
    /// Right aligned line number, all labels in a listing have the same width.
    pub idx: String,
    pub lineno: usize,
    pub text: String,
    /// Line of the current debugee location.
    pub current: bool,
    pub breakpoint: Option<Breakpoint>,
}

/// Source code of the file containing the current location.
#[derive(Debug, Default, Clone)]
pub struct Listing {
    pub file: String,
    pub lines: Vec<ListingLine>,
    /// Set when the view should scroll to the current line again.
    pub recenter: bool,
}

impl Listing {
    pub fn clear(&mut self) {
        self.lines.clear();
        self.recenter = true;
    }

    pub fn current_line(&self) -> Option<usize> {
        self.lines.iter().position(|l| l.current)
    }
}

/// Index breakpoints set in `file` by their line number.
pub fn breakpoints_by_line(breakpoints: &[Breakpoint], file: &str) -> HashMap<usize, Breakpoint> {
    breakpoints
        .iter()
        .filter(|bp| bp.file == file)
        .map(|bp| (bp.line, bp.clone()))
        .collect()
}

/// Read source lines from `reader`, marking `current_line` and lines holding a breakpoint.
pub fn build_listing(
    reader: impl BufRead,
    current_line: usize,
    breakpoints: &HashMap<usize, Breakpoint>,
) -> io::Result<Vec<ListingLine>> {
    let mut lines = vec![];
    for (i, raw) in reader.split(b'\n').enumerate() {
        let raw = raw?;
        let lineno = i + 1;
        let text = String::from_utf8_lossy(&raw);
        let text = text.strip_suffix('\r').unwrap_or(&text);
        lines.push(ListingLine {
            idx: String::new(),
            lineno,
            text: expand_tabs(text).into_owned(),
            current: lineno == current_line,
            breakpoint: breakpoints.get(&lineno).cloned(),
        });
    }

    let width = label_width(lines.len());
    for (i, line) in lines.iter_mut().enumerate() {
        line.idx = format!("{:>width$}", i + 1);
    }
    Ok(lines)
}
