//! Inline recognition inside a paragraph, heading, cell or trigger label.
//!
//! Order matters: backslash escapes and code spans are resolved while
//! tokenizing, so their contents never reach the emphasis pass; images are
//! tried before links because `![` shares the `[` opener. Emphasis runs are
//! matched afterwards with a delimiter stack, which is how `**` (bold) is
//! claimed before `*` (italic) for runs such as `***x***`.

use crate::node::{Attrs, Mark, Node, normalize_marks};

/// Parses inline markup into text runs, images and hard breaks.
pub(crate) fn parse_inlines(text: &str) -> Vec<Node> {
    let mut pieces = tokenize(text);
    process_emphasis(&mut pieces);
    flatten(pieces)
}

#[derive(Debug, Clone, Copy)]
struct Delim {
    ch: u8,
    count: usize,
    orig: usize,
    can_open: bool,
    can_close: bool,
}

#[derive(Debug)]
enum Piece {
    Inline(Node),
    Delim(Delim),
}

struct Tokens {
    pieces: Vec<Piece>,
    literal: String,
}

impl Tokens {
    fn flush(&mut self) {
        if !self.literal.is_empty() {
            let text = std::mem::take(&mut self.literal);
            self.pieces.push(Piece::Inline(Node::text(text)));
        }
    }

    fn push(&mut self, piece: Piece) {
        self.flush();
        self.pieces.push(piece);
    }
}

const SPECIAL: &[u8] = b"\\`*~![";

fn tokenize(s: &str) -> Vec<Piece> {
    let bytes = s.as_bytes();
    let mut tokens = Tokens {
        pieces: Vec::new(),
        literal: String::new(),
    };
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => match bytes.get(i + 1) {
                Some(b'\n') => {
                    tokens.push(Piece::Inline(Node::leaf(Attrs::HardBreak)));
                    i += 2;
                }
                Some(next) if next.is_ascii_punctuation() => {
                    tokens.literal.push(*next as char);
                    i += 2;
                }
                _ => {
                    tokens.literal.push('\\');
                    i += 1;
                }
            },
            b'`' => {
                let run = run_length(bytes, i, b'`');
                match find_code_close(bytes, i + run, run) {
                    Some(close) => {
                        // Line endings inside a span read as spaces.
                        let code = s[i + run..close].replace('\n', " ");
                        let code = strip_code_padding(&code);
                        tokens.push(Piece::Inline(Node::marked_text(code, vec![Mark::Code])));
                        i = close + run;
                    }
                    None => {
                        tokens.literal.push_str(&s[i..i + run]);
                        i += run;
                    }
                }
            }
            ch @ (b'*' | b'~') => {
                let run = run_length(bytes, i, ch);
                if ch == b'~' && run != 2 {
                    tokens.literal.push_str(&s[i..i + run]);
                } else {
                    let prev = s[..i].chars().next_back();
                    let next = s[i + run..].chars().next();
                    let (can_open, can_close) = flanking(prev, next);
                    tokens.push(Piece::Delim(Delim {
                        ch,
                        count: run,
                        orig: run,
                        can_open,
                        can_close,
                    }));
                }
                i += run;
            }
            b'!' if bytes.get(i + 1) == Some(&b'[') => match parse_link(s, i + 1) {
                Some(link) => {
                    let alt = flatten_text(&parse_inlines(link.label));
                    tokens.push(Piece::Inline(Node::leaf(Attrs::Image {
                        src: link.destination,
                        alt,
                    })));
                    i = link.end;
                }
                None => {
                    tokens.literal.push('!');
                    i += 1;
                }
            },
            b'[' => match parse_link(s, i) {
                Some(link) => {
                    tokens.flush();
                    for mut node in parse_inlines(link.label) {
                        add_mark(
                            &mut node,
                            Mark::Link {
                                href: link.destination.clone(),
                            },
                        );
                        tokens.pieces.push(Piece::Inline(node));
                    }
                    i = link.end;
                }
                None => {
                    tokens.literal.push('[');
                    i += 1;
                }
            },
            _ => {
                let end = bytes[i + 1..]
                    .iter()
                    .position(|b| SPECIAL.contains(b))
                    .map_or(bytes.len(), |p| i + 1 + p);
                tokens.literal.push_str(&s[i..end]);
                i = end;
            }
        }
    }

    tokens.flush();
    tokens.pieces
}

pub(crate) fn run_length(bytes: &[u8], start: usize, ch: u8) -> usize {
    bytes[start..].iter().take_while(|b| **b == ch).count()
}

/// Start of a backtick run of exactly `len` at or after `from`.
pub(crate) fn find_code_close(bytes: &[u8], from: usize, len: usize) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let run = run_length(bytes, i, b'`');
            if run == len {
                return Some(i);
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}

fn strip_code_padding(code: &str) -> &str {
    if code.len() >= 2 && code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty() {
        &code[1..code.len() - 1]
    } else {
        code
    }
}

fn is_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || (!c.is_alphanumeric() && !c.is_whitespace())
}

/// (left-flanking, right-flanking) for a delimiter run between `prev` and `next`.
fn flanking(prev: Option<char>, next: Option<char>) -> (bool, bool) {
    let space = |c: Option<char>| c.is_none_or(char::is_whitespace);
    let punct = |c: Option<char>| c.is_some_and(is_punctuation);
    let left = !space(next) && (!punct(next) || space(prev) || punct(prev));
    let right = !space(prev) && (!punct(prev) || space(next) || punct(next));
    (left, right)
}

struct Link<'a> {
    label: &'a str,
    destination: String,
    end: usize,
}

/// Parses `[label](destination "title")` starting at the `[` at `open`.
fn parse_link(s: &str, open: usize) -> Option<Link<'_>> {
    let bytes = s.as_bytes();
    let close = find_label_end(bytes, open + 1)?;
    if bytes.get(close + 1) != Some(&b'(') {
        return None;
    }

    let mut i = skip_spaces(bytes, close + 2);
    let destination = if bytes.get(i) == Some(&b'<') {
        let len = s[i + 1..].find(['>', '\n'])?;
        if bytes[i + 1 + len] != b'>' {
            return None;
        }
        let dest = &s[i + 1..i + 1 + len];
        i += len + 2;
        dest
    } else {
        let start = i;
        let mut depth = 0usize;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' if i + 1 < bytes.len() => i += 1,
                b'(' => depth += 1,
                b')' if depth == 0 => break,
                b')' => depth -= 1,
                b if b.is_ascii_whitespace() => break,
                _ => {}
            }
            i += 1;
        }
        &s[start..i]
    };

    i = skip_spaces(bytes, i);
    if let Some(&quote @ (b'"' | b'\'')) = bytes.get(i) {
        let len = s[i + 1..].find(quote as char)?;
        i = skip_spaces(bytes, i + len + 2);
    }
    if bytes.get(i) != Some(&b')') {
        return None;
    }

    Some(Link {
        label: &s[open + 1..close],
        destination: destination.to_string(),
        end: i + 1,
    })
}

fn find_label_end(bytes: &[u8], from: usize) -> Option<usize> {
    let mut depth = 1usize;
    let mut i = from;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 1,
            b'`' => {
                let run = run_length(bytes, i, b'`');
                i = find_code_close(bytes, i + run, run).map_or(i + run, |c| c + run);
                continue;
            }
            b'[' => depth += 1,
            b']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

fn skip_spaces(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).is_some_and(|b| *b == b' ' || *b == b'\t') {
        i += 1;
    }
    i
}

fn add_mark(node: &mut Node, mark: Mark) {
    if let Attrs::Text { marks, .. } = &mut node.attrs {
        marks.push(mark);
    }
}

fn rule_of_three(opener: &Delim, closer: &Delim) -> bool {
    opener.ch == b'*'
        && (opener.can_close || closer.can_open)
        && (opener.orig + closer.orig) % 3 == 0
        && !(opener.orig % 3 == 0 && closer.orig % 3 == 0)
}

fn process_emphasis(pieces: &mut [Piece]) {
    let mut closer_index = 0;
    while closer_index < pieces.len() {
        let closer = match &pieces[closer_index] {
            Piece::Delim(d) if d.can_close && d.count > 0 => *d,
            _ => {
                closer_index += 1;
                continue;
            }
        };

        let opener_index = (0..closer_index).rev().find(|&i| match &pieces[i] {
            Piece::Delim(o) => {
                o.ch == closer.ch
                    && o.can_open
                    && o.count > 0
                    && (o.ch != b'~' || o.count == closer.count)
                    && !rule_of_three(o, &closer)
            }
            Piece::Inline(_) => false,
        });
        let Some(opener_index) = opener_index else {
            closer_index += 1;
            continue;
        };
        let Piece::Delim(opener) = &pieces[opener_index] else {
            closer_index += 1;
            continue;
        };
        let opener = *opener;

        let (used, mark) = if closer.ch == b'~' {
            (2, Mark::Strike)
        } else if opener.count >= 2 && closer.count >= 2 {
            (2, Mark::Bold)
        } else {
            (1, Mark::Italic)
        };

        for piece in &mut pieces[opener_index + 1..closer_index] {
            if let Piece::Delim(inner) = *piece {
                let literal = (inner.ch as char).to_string().repeat(inner.count);
                *piece = Piece::Inline(Node::text(literal));
            }
            if let Piece::Inline(node) = piece {
                add_mark(node, mark.clone());
            }
        }

        if let Piece::Delim(o) = &mut pieces[opener_index] {
            o.count -= used;
        }
        if let Piece::Delim(c) = &mut pieces[closer_index] {
            c.count -= used;
            if c.count == 0 {
                closer_index += 1;
            }
        }
    }
}

fn flatten(pieces: Vec<Piece>) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::with_capacity(pieces.len());
    for piece in pieces {
        let mut node = match piece {
            Piece::Inline(node) => node,
            Piece::Delim(d) if d.count == 0 => continue,
            Piece::Delim(d) => Node::text((d.ch as char).to_string().repeat(d.count)),
        };
        if let Attrs::Text { text, marks } = &mut node.attrs {
            if text.is_empty() {
                continue;
            }
            *marks = normalize_marks(std::mem::take(marks));
        }
        push_merged(&mut out, node);
    }
    out
}

/// Appends `node`, merging it into the previous text run when the marks match.
pub(crate) fn push_merged(out: &mut Vec<Node>, node: Node) {
    if let Attrs::Text { text, marks } = &node.attrs
        && let Some(Node {
            attrs:
                Attrs::Text {
                    text: prev_text,
                    marks: prev_marks,
                },
            ..
        }) = out.last_mut()
        && *prev_marks == *marks
    {
        prev_text.push_str(text);
        return;
    }
    out.push(node);
}

fn flatten_text(nodes: &[Node]) -> String {
    nodes.iter().map(Node::text_content).collect()
}
