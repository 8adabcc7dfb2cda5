//! Code fence detection shared by the importer and the outline extractor.
//!
//! Custom tags, headings and list markers inside a fenced block are literal
//! code, so every line-oriented scan runs lines through a [`FenceTracker`]
//! first.

/// An opening fence line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceOpen<'a> {
    /// Fence marker character (backtick or tilde).
    pub marker: char,
    /// Number of marker characters.
    pub length: usize,
    /// Columns of indentation before the marker.
    pub indent: usize,
    /// Info string after the marker, trimmed.
    pub info: &'a str,
}

/// Parses an opening fence: 0-3 columns of indent, then 3+ backticks or tildes.
pub fn parse_fence_open(line: &str) -> Option<FenceOpen<'_>> {
    let (indent, offset) = leading_whitespace_info(line);
    if indent > 3 {
        return None;
    }
    let after_indent = &line[offset..];
    let marker = after_indent.chars().next()?;
    if marker != '`' && marker != '~' {
        return None;
    }
    let length = after_indent.chars().take_while(|c| *c == marker).count();
    if length < 3 {
        return None;
    }
    let info = after_indent[length..].trim();
    if marker == '`' && info.contains('`') {
        return None;
    }
    Some(FenceOpen {
        marker,
        length,
        indent,
        info,
    })
}

/// True when `line` closes a fence opened with `marker` x `length`: at most 3
/// columns of indent, at least as many markers, nothing else but whitespace.
pub fn closes_fence(line: &str, marker: char, length: usize) -> bool {
    let (indent, offset) = leading_whitespace_info(line);
    if indent > 3 {
        return false;
    }
    let after_indent = &line[offset..];
    let run = after_indent.chars().take_while(|c| *c == marker).count();
    run >= length && after_indent[run * marker.len_utf8()..].trim().is_empty()
}

/// Line-by-line fence state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FenceTracker {
    open: Option<(char, usize)>,
}

impl FenceTracker {
    /// Fresh tracker, outside any fence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one line. Returns true when the line is fence content or a
    /// fence marker, i.e. must not be interpreted as markup.
    pub fn advance(&mut self, line: &str) -> bool {
        match self.open {
            Some((marker, length)) => {
                if closes_fence(line, marker, length) {
                    self.open = None;
                }
                true
            }
            None => match parse_fence_open(line) {
                Some(open) => {
                    self.open = Some((open.marker, open.length));
                    true
                }
                None => false,
            },
        }
    }

    /// True while inside a fence.
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }
}

/// Language and title parsed from an info string such as `ts title="app.ts"`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CodeInfo {
    /// First word unless it is a `key=value` pair.
    pub language: String,
    /// Value of `title="..."`.
    pub title: Option<String>,
}

/// Splits a fence info string into language and title.
pub fn parse_info_string(info: &str) -> CodeInfo {
    let info = info.trim();
    let mut result = CodeInfo::default();
    let rest = match info.split_once(char::is_whitespace) {
        Some((first, rest)) if !first.contains('=') => {
            result.language = first.to_string();
            rest
        }
        None if !info.contains('=') => {
            result.language = info.to_string();
            ""
        }
        _ => info,
    };

    if let Some(start) = rest.find("title=") {
        let value = &rest[start + "title=".len()..];
        result.title = match value.chars().next() {
            Some(quote @ ('"' | '\'')) => value[1..].find(quote).map(|end| value[1..1 + end].to_string()),
            Some(_) => value.split_whitespace().next().map(str::to_string),
            None => None,
        };
    }
    result
}

/// Returns (visual_columns, byte_offset) for leading whitespace.
/// Visual columns expand tabs to 4-column boundaries per CommonMark.
pub(crate) fn leading_whitespace_info(line: &str) -> (usize, usize) {
    let mut col = 0;
    let mut bytes = 0;
    for b in line.bytes() {
        match b {
            b' ' => {
                col += 1;
                bytes += 1;
            }
            b'\t' => {
                col += 4 - (col % 4);
                bytes += 1;
            }
            _ => break,
        }
    }
    (col, bytes)
}
