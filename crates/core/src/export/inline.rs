//! Inline rendering: mark delimiters, escaping, code spans, links and images.

use crate::node::{Attrs, Mark, Node};
use std::cmp::Reverse;

/// Where inline content ends up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Paragraph text: newlines are kept and line starts are protected
    /// against block syntax.
    Block,
    /// Headings, trigger labels and table cells: everything on one line.
    SingleLine,
}

/// Characters the inline parser would interpret anywhere in a line.
const SPECIAL: &[char] = &['\\', '`', '*', '~', '[', ']', '<', '>', '{', '}', '|'];

/// Renders text runs, hard breaks and images.
pub(crate) fn render_inlines(nodes: &[Node], flow: Flow) -> String {
    let mut writer = InlineWriter {
        out: String::new(),
        open: Vec::new(),
        flow,
    };
    for (index, node) in nodes.iter().enumerate() {
        match &node.attrs {
            Attrs::Text { text, marks } => writer.text(text, marks, &nodes[index + 1..]),
            Attrs::HardBreak => writer.hard_break(),
            Attrs::Image { src, alt } => writer.image(src, alt),
            _ => log::debug!("skipping {} inside inline content", node.kind()),
        }
    }
    writer.close_all();
    writer.out
}

/// `href` as written inside `(...)`; angle brackets when it would not parse bare.
pub(crate) fn destination(href: &str) -> String {
    let mut depth = 0i32;
    let mut balanced = true;
    for c in href.chars() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                balanced &= depth >= 0;
            }
            _ => {}
        }
    }
    let needs_angle = href.contains(|c: char| c.is_ascii_whitespace() || c == '<' || c == '>')
        || !balanced
        || depth != 0;
    if needs_angle {
        format!("<{href}>")
    } else {
        href.to_string()
    }
}

fn delimiter(mark: &Mark) -> &'static str {
    match mark {
        Mark::Bold => "**",
        Mark::Italic => "*",
        Mark::Strike => "~~",
        Mark::Link { .. } | Mark::Code => "",
    }
}

/// Number of upcoming text runs, starting with the current one, that keep
/// `mark`. Images and hard breaks neither end nor extend a run.
fn persistence(mark: &Mark, following: &[Node]) -> usize {
    1 + following
        .iter()
        .filter_map(|node| match &node.attrs {
            Attrs::Text { marks, .. } => Some(marks),
            _ => None,
        })
        .take_while(|marks| marks.contains(mark))
        .count()
}

struct InlineWriter {
    out: String,
    /// Open marks, outermost first. Code is never kept open.
    open: Vec<Mark>,
    flow: Flow,
}

impl InlineWriter {
    fn push_raw(&mut self, raw: &str) {
        self.out.push_str(raw);
    }

    fn at_line_start(&self) -> bool {
        self.flow == Flow::Block && (self.out.is_empty() || self.out.ends_with('\n'))
    }

    /// Writes literal text, escaping whatever the importer would read as markup.
    fn push_text(&mut self, text: &str) {
        let mut marker_at = None;
        for (i, c) in text.char_indices() {
            if c == '\n' {
                self.out.push(match self.flow {
                    Flow::Block => '\n',
                    Flow::SingleLine => ' ',
                });
                continue;
            }
            if self.at_line_start() {
                if matches!(c, '#' | '-' | '+' | '_') {
                    self.out.push('\\');
                } else if c.is_ascii_digit() {
                    let digits = text[i..].bytes().take_while(u8::is_ascii_digit).count();
                    if matches!(text.as_bytes().get(i + digits), Some(b'.' | b')')) {
                        marker_at = Some(i + digits);
                    }
                }
            }
            if marker_at == Some(i) || SPECIAL.contains(&c) {
                self.out.push('\\');
            }
            self.out.push(c);
        }
    }

    fn text(&mut self, text: &str, marks: &[Mark], following: &[Node]) {
        let wanted: Vec<&Mark> = marks.iter().filter(|m| **m != Mark::Code).collect();

        // Everything above the lowest mark that ends here has to close too.
        if let Some(stale) = self.open.iter().position(|m| !wanted.contains(&m)) {
            while self.open.len() > stale {
                self.close_top();
            }
        }

        let mut opening: Vec<Mark> = wanted
            .into_iter()
            .filter(|m| !self.open.contains(*m))
            .cloned()
            .collect();
        opening.sort_by_key(|m| (Reverse(persistence(m, following)), m.rank()));
        for mark in opening {
            self.open_mark(mark);
        }

        if marks.contains(&Mark::Code) {
            self.code_span(text);
        } else {
            self.push_text(text);
        }
    }

    fn open_mark(&mut self, mark: Mark) {
        if let Mark::Link { .. } = mark {
            // `![` would start an image.
            if self.out.ends_with('!') {
                self.out.pop();
                self.push_raw("\\!");
            }
            self.push_raw("[");
        } else {
            self.push_raw(delimiter(&mark));
        }
        self.open.push(mark);
    }

    fn close_top(&mut self) {
        match self.open.pop() {
            Some(Mark::Link { href }) => {
                let dest = destination(&href);
                self.push_raw(&format!("]({dest})"));
            }
            Some(mark) => self.push_raw(delimiter(&mark)),
            None => {}
        }
    }

    fn close_all(&mut self) {
        while !self.open.is_empty() {
            self.close_top();
        }
    }

    fn code_span(&mut self, code: &str) {
        let code = code.replace('\n', " ");
        let longest = longest_run(&code, '`');
        let fence = "`".repeat(longest + 1);
        let pad = code.starts_with('`')
            || code.ends_with('`')
            || (code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty());
        let space = if pad { " " } else { "" };
        self.push_raw(&format!("{fence}{space}{code}{space}{fence}"));
    }

    fn hard_break(&mut self) {
        match self.flow {
            Flow::Block => self.push_raw("\\\n"),
            Flow::SingleLine => self.push_raw(" "),
        }
    }

    fn image(&mut self, src: &str, alt: &str) {
        let flow = std::mem::replace(&mut self.flow, Flow::SingleLine);
        self.push_raw("![");
        self.push_text(alt);
        self.flow = flow;
        let dest = destination(src);
        self.push_raw(&format!("]({dest})"));
    }
}

/// Longest run of `ch` in `text`.
pub(crate) fn longest_run(text: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}
