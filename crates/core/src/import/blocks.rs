//! Line-oriented block recognizers: headings, tables, fenced code, thematic
//! breaks, lists and paragraphs.

use super::inline::parse_inlines;
use super::{BlockRecognizer, ImportContext, ImportPipeline, Recognized, is_blank, line_at, tags};
use crate::code_fence::{
    closes_fence, leading_whitespace_info, parse_fence_open, parse_info_string,
};
use crate::error::ImportWarning;
use crate::node::{Attrs, Node, NodeKind};
use crate::slug::extract_custom_id;

/// An ATX heading line, shared with the outline extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HeadingLine<'a> {
    pub level: u8,
    /// Raw inline source, closing hashes and `{#id}` removed.
    pub text: &'a str,
    pub id: Option<&'a str>,
}

/// Matches `#` to `####` followed by a space or the end of the line.
pub(crate) fn heading_line(line: &str) -> Option<HeadingLine<'_>> {
    let (indent, offset) = leading_whitespace_info(line);
    if indent > 3 {
        return None;
    }
    let rest = &line[offset..];
    let level = rest.bytes().take_while(|b| *b == b'#').count();
    if level == 0 || level > 4 {
        return None;
    }
    let after = &rest[level..];
    if !after.is_empty() && !after.starts_with([' ', '\t']) {
        return None;
    }

    let (text, id) = extract_custom_id(strip_closing_hashes(after.trim()));
    Some(HeadingLine {
        level: level as u8,
        text: text.trim(),
        id,
    })
}

// A closing `#` run only counts when a space separates it from the text.
fn strip_closing_hashes(text: &str) -> &str {
    let without = text.trim_end_matches('#');
    if without.len() == text.len() {
        text
    } else if without.is_empty() {
        ""
    } else if without.ends_with([' ', '\t']) {
        without.trim_end()
    } else {
        text
    }
}

pub(crate) fn is_thematic_break(line: &str) -> bool {
    let (indent, offset) = leading_whitespace_info(line);
    if indent > 3 {
        return false;
    }
    let mut marker = None;
    let mut count = 0;
    for c in line[offset..].chars() {
        match c {
            ' ' | '\t' => {}
            '*' | '-' | '_' if marker.is_none_or(|m| m == c) => {
                marker = Some(c);
                count += 1;
            }
            _ => return false,
        }
    }
    count >= 3
}

/// A list item marker (`-`, `*`, `+`, `1.` or `1)`) at the start of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ListMarker {
    pub ordered: bool,
    /// Byte offset of the item's first-line content.
    pub content_start: usize,
    /// Column continuation lines must reach to belong to the item.
    pub content_col: usize,
}

pub(crate) fn list_marker(line: &str) -> Option<ListMarker> {
    let (indent, offset) = leading_whitespace_info(line);
    if indent > 3 {
        return None;
    }
    let rest = &line[offset..];
    let bytes = rest.as_bytes();
    let (ordered, marker_len) = match bytes.first()? {
        b'-' | b'*' | b'+' => (false, 1),
        b'0'..=b'9' => {
            let digits = bytes.iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 9 || !matches!(bytes.get(digits), Some(b'.' | b')')) {
                return None;
            }
            (true, digits + 1)
        }
        _ => return None,
    };

    let after = &rest[marker_len..];
    let spaces = after.bytes().take_while(|b| *b == b' ').count();
    if !after.is_empty() && spaces == 0 {
        return None;
    }
    // Empty items and items opening with indented code use a single space.
    let padding = if after.trim().is_empty() || spaces > 4 {
        1
    } else {
        spaces
    };

    Some(ListMarker {
        ordered,
        content_start: offset + marker_len + padding.min(after.len()),
        content_col: indent + marker_len + padding,
    })
}

/// True when `line` starts a block that ends an open paragraph.
pub(crate) fn interrupts_paragraph(line: &str) -> bool {
    heading_line(line).is_some()
        || parse_fence_open(line).is_some()
        || is_thematic_break(line)
        || list_marker(line).is_some()
        || tags::opens_block_tag(line)
}

/// Removes up to `cols` columns of leading indentation.
pub(crate) fn strip_columns(line: &str, cols: usize) -> &str {
    let mut col = 0;
    for (i, b) in line.bytes().enumerate() {
        if col >= cols {
            return &line[i..];
        }
        match b {
            b' ' => col += 1,
            b'\t' => col += 4 - col % 4,
            _ => return &line[i..],
        }
    }
    ""
}

pub(crate) struct Headings;

impl BlockRecognizer for Headings {
    fn name(&self) -> &'static str {
        "heading"
    }

    fn recognize(
        &self,
        _pipeline: &ImportPipeline,
        _cx: &mut ImportContext<'_>,
        input: &str,
        _offset: usize,
    ) -> Option<Recognized> {
        let (line, next) = line_at(input, 0);
        let heading = heading_line(line)?;
        let node = Node::new(
            Attrs::Heading {
                level: heading.level,
                id: heading.id.map(str::to_string),
            },
            parse_inlines(heading.text),
        );
        Some(Recognized::one(node, next))
    }
}

pub(crate) struct Tables;

impl BlockRecognizer for Tables {
    fn name(&self) -> &'static str {
        "table"
    }

    fn recognize(
        &self,
        _pipeline: &ImportPipeline,
        cx: &mut ImportContext<'_>,
        input: &str,
        offset: usize,
    ) -> Option<Recognized> {
        let (header_line, separator_start) = line_at(input, 0);
        if separator_start >= input.len() || !has_cell_separator(header_line) {
            return None;
        }
        let (separator, mut pos) = line_at(input, separator_start);
        let header = split_row(header_line);
        if !is_separator_row(separator, header.len()) {
            return None;
        }

        let width = header.len();
        let mut rows = vec![table_row(&header, &Attrs::TableHeader)];
        while pos < input.len() {
            let (line, next) = line_at(input, pos);
            if is_blank(line) || !has_cell_separator(line) || interrupts_paragraph(line) {
                break;
            }
            let cells = split_row(line);
            if cells.len() != width {
                cx.warn(ImportWarning::TableShapeMismatch {
                    location: cx.locate(offset + pos),
                    expected: width,
                    found: cells.len(),
                });
            }
            rows.push(table_row(&fit_row(&cells, width), &Attrs::TableCell));
            pos = next;
        }

        Some(Recognized::one(Node::new(Attrs::Table, rows), pos))
    }
}

fn table_row<S: AsRef<str>>(cells: &[S], cell: &Attrs) -> Node {
    let cells = cells
        .iter()
        .map(|text| {
            Node::new(
                cell.clone(),
                vec![Node::paragraph(parse_inlines(text.as_ref()))],
            )
        })
        .collect();
    Node::new(Attrs::TableRow, cells)
}

/// Pads short rows with empty cells and folds overflow cells into the last one.
fn fit_row(cells: &[&str], width: usize) -> Vec<String> {
    let mut fitted: Vec<String> = cells.iter().take(width).map(|c| c.to_string()).collect();
    if cells.len() > width {
        fitted[width - 1] = cells[width - 1..].join(" | ");
    }
    fitted.resize(width, String::new());
    fitted
}

fn is_escaped(bytes: &[u8], index: usize) -> bool {
    bytes[..index]
        .iter()
        .rev()
        .take_while(|b| **b == b'\\')
        .count()
        % 2
        == 1
}

fn has_cell_separator(line: &str) -> bool {
    let bytes = line.as_bytes();
    bytes
        .iter()
        .enumerate()
        .any(|(i, b)| *b == b'|' && !is_escaped(bytes, i))
}

/// Splits a pipe-table row on unescaped `|`, dropping the outer pipes.
fn split_row(line: &str) -> Vec<&str> {
    let mut row = line.trim();
    if let Some(rest) = row.strip_prefix('|') {
        row = rest;
    }
    if row.ends_with('|') && !is_escaped(row.as_bytes(), row.len() - 1) {
        row = &row[..row.len() - 1];
    }

    let bytes = row.as_bytes();
    let mut cells = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'|' => {
                cells.push(row[start..i].trim());
                start = i + 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    cells.push(row[start..].trim());
    cells
}

fn is_separator_row(line: &str, width: usize) -> bool {
    if !has_cell_separator(line) {
        return false;
    }
    let cells = split_row(line);
    cells.len() == width
        && cells.iter().all(|cell| {
            let dashes = cell.trim_start_matches(':').trim_end_matches(':');
            !dashes.is_empty() && dashes.bytes().all(|b| b == b'-')
        })
}

pub(crate) struct FencedCode;

impl BlockRecognizer for FencedCode {
    fn name(&self) -> &'static str {
        "fenced-code"
    }

    fn recognize(
        &self,
        _pipeline: &ImportPipeline,
        cx: &mut ImportContext<'_>,
        input: &str,
        offset: usize,
    ) -> Option<Recognized> {
        let (first, mut pos) = line_at(input, 0);
        let open = parse_fence_open(first)?;
        let info = parse_info_string(open.info);

        let mut lines = Vec::new();
        let mut closed = false;
        while pos < input.len() {
            let (line, next) = line_at(input, pos);
            pos = next;
            if closes_fence(line, open.marker, open.length) {
                closed = true;
                break;
            }
            lines.push(strip_columns(line, open.indent));
        }
        if !closed {
            cx.warn(ImportWarning::UnclosedCodeFence {
                location: cx.locate(offset),
                marker: open.marker,
            });
        }

        let code = lines.join("\n");
        let children = if code.is_empty() {
            Vec::new()
        } else {
            vec![Node::text(code)]
        };
        let node = Node::new(
            Attrs::CodeBlock {
                language: info.language,
                title: info.title,
            },
            children,
        );
        Some(Recognized::one(node, pos))
    }
}

pub(crate) struct ThematicBreaks;

impl BlockRecognizer for ThematicBreaks {
    fn name(&self) -> &'static str {
        "thematic-break"
    }

    fn recognize(
        &self,
        _pipeline: &ImportPipeline,
        _cx: &mut ImportContext<'_>,
        input: &str,
        _offset: usize,
    ) -> Option<Recognized> {
        let (line, next) = line_at(input, 0);
        is_thematic_break(line).then(|| Recognized::one(Node::leaf(Attrs::HorizontalRule), next))
    }
}

pub(crate) struct Lists;

impl BlockRecognizer for Lists {
    fn name(&self) -> &'static str {
        "list"
    }

    fn recognize(
        &self,
        pipeline: &ImportPipeline,
        cx: &mut ImportContext<'_>,
        input: &str,
        offset: usize,
    ) -> Option<Recognized> {
        let ordered = list_marker(line_at(input, 0).0)?.ordered;
        let mut items = Vec::new();
        let mut pos = 0;

        loop {
            let (line, next) = line_at(input, pos);
            let Some(marker) = list_marker(line).filter(|m| m.ordered == ordered) else {
                break;
            };

            let mut content = line[marker.content_start..].to_string();
            let mut end = next;
            let mut cursor = next;
            let mut blanks = 0;
            while cursor < input.len() {
                let (line, next) = line_at(input, cursor);
                if is_blank(line) {
                    blanks += 1;
                    cursor = next;
                    continue;
                }
                let (cols, _) = leading_whitespace_info(line);
                if cols >= marker.content_col {
                    content.push_str(&"\n".repeat(blanks + 1));
                    content.push_str(strip_columns(line, marker.content_col));
                } else if blanks == 0 && !interrupts_paragraph(line) {
                    // Lazy continuation of the item's paragraph.
                    content.push('\n');
                    content.push_str(line.trim_start());
                } else {
                    break;
                }
                blanks = 0;
                end = next;
                cursor = next;
            }

            items.push(list_item(
                pipeline,
                cx,
                &content,
                offset + pos + marker.content_start,
            ));
            pos = end;

            let mut probe = pos;
            while probe < input.len() && is_blank(line_at(input, probe).0) {
                probe = line_at(input, probe).1;
            }
            let continues = probe < input.len()
                && list_marker(line_at(input, probe).0).is_some_and(|m| m.ordered == ordered);
            if !continues {
                break;
            }
            pos = probe;
        }

        let attrs = if ordered {
            Attrs::OrderedList
        } else {
            Attrs::BulletList
        };
        Some(Recognized::one(Node::new(attrs, items), pos))
    }
}

fn list_item(
    pipeline: &ImportPipeline,
    cx: &mut ImportContext<'_>,
    content: &str,
    offset: usize,
) -> Node {
    let mut nested = cx.nested(content);
    let mut blocks = pipeline.parse_blocks(&mut nested, content, 0);
    let origin = cx.locate(offset);
    cx.diagnostics.absorb(nested.diagnostics, origin);

    if blocks.first().map(Node::kind) != Some(NodeKind::Paragraph) {
        blocks.insert(0, Node::paragraph(Vec::new()));
    }
    Node::new(Attrs::ListItem, blocks)
}

pub(crate) struct Paragraphs;

impl BlockRecognizer for Paragraphs {
    fn name(&self) -> &'static str {
        "paragraph"
    }

    fn recognize(
        &self,
        _pipeline: &ImportPipeline,
        _cx: &mut ImportContext<'_>,
        input: &str,
        _offset: usize,
    ) -> Option<Recognized> {
        let (first, mut pos) = line_at(input, 0);
        let mut lines = vec![first.trim()];
        while pos < input.len() {
            let (line, next) = line_at(input, pos);
            if is_blank(line) || interrupts_paragraph(line) {
                break;
            }
            lines.push(line.trim());
            pos = next;
        }
        let node = Node::paragraph(parse_inlines(&lines.join("\n")));
        Some(Recognized::one(node, pos))
    }
}

#[cfg(test)]
mod tests {
    use super::super::{import, import_with_options};
    use super::*;
    use crate::node::Mark;
    use crate::options::ImportOptions;
    use pretty_assertions::assert_eq;

    fn cell(attrs: Attrs, text: &str) -> Node {
        Node::new(attrs, vec![Node::paragraph_text(text)])
    }

    #[test]
    fn heading_line_rules() {
        let h = heading_line("## Title ##").unwrap();
        assert_eq!((h.level, h.text, h.id), (2, "Title", None));
        assert_eq!(heading_line("# C#").unwrap().text, "C#");
        assert_eq!(heading_line("#### Four").unwrap().level, 4);
        assert!(heading_line("##### Five").is_none());
        assert!(heading_line("#hashtag").is_none());
        assert!(heading_line("    # indented").is_none());
        assert_eq!(heading_line("##").unwrap().text, "");

        let custom = heading_line("### Setup {#install}").unwrap();
        assert_eq!((custom.text, custom.id), ("Setup", Some("install")));
    }

    #[test]
    fn heading_keeps_escaped_trailing_hash() {
        let doc = import("## Issue \\#");
        assert_eq!(
            doc.children[0],
            Node::heading(2, vec![Node::text("Issue #")])
        );
    }

    #[test]
    fn list_markers() {
        let bullet = list_marker("- item").unwrap();
        assert!(!bullet.ordered);
        assert_eq!((bullet.content_start, bullet.content_col), (2, 2));

        let ordered = list_marker("10. item").unwrap();
        assert!(ordered.ordered);
        assert_eq!(ordered.content_col, 4);

        assert_eq!(list_marker("-").unwrap().content_start, 1);
        assert!(list_marker("-item").is_none());
        assert!(list_marker("1.5 apples").is_none());
    }

    #[test]
    fn thematic_breaks() {
        assert!(is_thematic_break("***"));
        assert!(is_thematic_break(" - - -"));
        assert!(!is_thematic_break("*-*"));
        assert!(!is_thematic_break("--"));
    }

    #[test]
    fn table_with_header_and_rows() {
        let doc = import("| A | B |\n| --- | :-: |\n| 1 | 2 |\n| 3 | 4 |\n");
        let table = &doc.children[0];
        assert_eq!(table.kind(), NodeKind::Table);
        assert_eq!(
            table.children[0],
            Node::new(
                Attrs::TableRow,
                vec![cell(Attrs::TableHeader, "A"), cell(Attrs::TableHeader, "B")]
            )
        );
        assert_eq!(table.children.len(), 3);
        assert_eq!(
            table.children[2].children[1],
            cell(Attrs::TableCell, "4")
        );
    }

    #[test]
    fn ragged_rows_are_padded_or_folded() {
        let outcome = import_with_options(
            "| A | B |\n| --- | --- |\n| 1 |\n| 2 | 3 | 4 |\n",
            &ImportOptions::default(),
        );
        let table = &outcome.doc.children[0];
        assert_eq!(table.children[1].children[1], cell(Attrs::TableCell, ""));
        assert_eq!(
            table.children[2].children[1],
            cell(Attrs::TableCell, "3 | 4")
        );
        let found: Vec<_> = outcome
            .diagnostics
            .iter()
            .map(|w| match w {
                ImportWarning::TableShapeMismatch { found, .. } => *found,
                other => panic!("unexpected warning {other:?}"),
            })
            .collect();
        assert_eq!(found, vec![1, 3]);
    }

    #[test]
    fn escaped_pipes_stay_in_cell() {
        let doc = import("| a \\| b |\n| --- |\n");
        assert_eq!(
            doc.children[0].children[0].children[0],
            cell(Attrs::TableHeader, "a | b")
        );
    }

    #[test]
    fn fenced_code_with_title() {
        let doc = import("```ts title=\"app.ts\"\nconst a = 1;\n\n# not a heading\n```\n");
        assert_eq!(
            doc.children,
            vec![Node::new(
                Attrs::CodeBlock {
                    language: "ts".into(),
                    title: Some("app.ts".into())
                },
                vec![Node::text("const a = 1;\n\n# not a heading")]
            )]
        );
    }

    #[test]
    fn unclosed_fence_runs_to_end() {
        let outcome = import_with_options("```\nlet x;\n", &ImportOptions::default());
        assert_eq!(outcome.doc.children[0].text_content(), "let x;");
        assert!(matches!(
            outcome.diagnostics.warnings[0],
            ImportWarning::UnclosedCodeFence { marker: '`', .. }
        ));
    }

    #[test]
    fn nested_lists_by_indentation() {
        let doc = import("- one\n  - nested\n- two\n\n1. first\n2. second\n");
        assert_eq!(doc.children.len(), 2);
        let bullets = &doc.children[0];
        assert_eq!(bullets.kind(), NodeKind::BulletList);
        assert_eq!(bullets.children.len(), 2);
        let first = &bullets.children[0];
        assert_eq!(first.children[0], Node::paragraph_text("one"));
        assert_eq!(first.children[1].kind(), NodeKind::BulletList);
        assert_eq!(doc.children[1].kind(), NodeKind::OrderedList);
        assert_eq!(doc.children[1].children.len(), 2);
    }

    #[test]
    fn list_item_without_leading_paragraph_gets_one() {
        let doc = import("- ## Heading\n");
        let item = &doc.children[0].children[0];
        assert_eq!(item.children[0], Node::paragraph(vec![]));
        assert_eq!(item.children[1].kind(), NodeKind::Heading);
    }

    #[test]
    fn loose_items_stay_in_one_list() {
        let doc = import("- a\n\n  more a\n\n- b\n");
        let list = &doc.children[0];
        assert_eq!(list.children.len(), 2);
        assert_eq!(list.children[0].children[1], Node::paragraph_text("more a"));
    }

    #[test]
    fn paragraphs_join_lines_and_stop_at_blocks() {
        let doc = import("first line\nsecond *line*\n# Heading\n");
        assert_eq!(
            doc.children[0],
            Node::paragraph(vec![
                Node::text("first line\nsecond "),
                Node::marked_text("line", vec![Mark::Italic]),
            ])
        );
        assert_eq!(doc.children[1].kind(), NodeKind::Heading);
    }

    #[test]
    fn strip_columns_handles_tabs() {
        assert_eq!(strip_columns("    code", 2), "  code");
        assert_eq!(strip_columns("\tcode", 4), "code");
        assert_eq!(strip_columns("  ", 4), "");
    }
}
