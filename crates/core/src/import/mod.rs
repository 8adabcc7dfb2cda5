//! Text Importer: extended-Markdown text to a typed document tree.
//!
//! Import is an explicit [`ImportPipeline`] owning an ordered list of block
//! recognizers. At every block start each recognizer is offered the
//! remaining text in priority order; the first one that claims a span turns
//! it into nodes and reports how many bytes it consumed:
//!
//! 1. custom block tags (`<Callout>`, `<Tabs>`, `<Accordions>`, `<Cards>`,
//!    `<PDFViewer />`, `<VideoViewer />`), matched as whole open/close spans
//!    before their contents are imported recursively
//! 2. ATX headings
//! 3. pipe tables
//! 4. fenced code
//! 5. thematic breaks
//! 6. bullet and ordered lists
//! 7. paragraphs, which accept any line and so always terminate the loop
//!
//! Inline markup inside paragraphs, headings, cells and labels is handled by
//! a separate pass (see `inline.rs`). Import never fails: anything that
//! cannot be recognized is kept verbatim in a paragraph and reported as an
//! [`ImportWarning::ImportFallback`].

mod blocks;
mod inline;
mod tags;

use crate::error::{Diagnostics, ImportWarning, SourceLocation};
use crate::frontmatter::{Frontmatter, extract_frontmatter};
use crate::node::{Attrs, Node};
use crate::options::ImportOptions;

pub(crate) use blocks::{heading_line, list_marker};
pub(crate) use inline::parse_inlines;

/// Result of importing one document.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportOutcome {
    /// The `doc` root.
    pub doc: Node,
    /// Metadata parked from the leading `---` block.
    pub frontmatter: Frontmatter,
    /// Recoverable problems found along the way.
    pub diagnostics: Diagnostics,
}

/// Imports `text` with default options and returns the `doc` node.
pub fn import(text: &str) -> Node {
    import_with_options(text, &ImportOptions::default()).doc
}

/// Imports `text`, returning the tree together with frontmatter and warnings.
pub fn import_with_options(text: &str, options: &ImportOptions) -> ImportOutcome {
    ImportPipeline::new(*options).import(text)
}

/// Span claimed by a recognizer.
pub(crate) struct Recognized {
    pub nodes: Vec<Node>,
    pub consumed: usize,
}

impl Recognized {
    pub fn one(node: Node, consumed: usize) -> Self {
        Self {
            nodes: vec![node],
            consumed,
        }
    }
}

/// One block-level rule.
///
/// `input` starts at a line start and runs to the end of the enclosing
/// region; `offset` is its byte position in the context's source, used only
/// for diagnostics. Returning `None` passes the span to the next recognizer.
pub(crate) trait BlockRecognizer {
    fn name(&self) -> &'static str;

    fn recognize(
        &self,
        pipeline: &ImportPipeline,
        cx: &mut ImportContext<'_>,
        input: &str,
        offset: usize,
    ) -> Option<Recognized>;
}

/// Per-call state threaded through the recognizers.
pub(crate) struct ImportContext<'s> {
    source: &'s str,
    pub options: ImportOptions,
    /// Number of enclosing custom tags.
    pub depth: usize,
    pub diagnostics: Diagnostics,
}

impl<'s> ImportContext<'s> {
    fn new(source: &'s str, options: ImportOptions) -> Self {
        Self {
            source,
            options,
            depth: 0,
            diagnostics: Diagnostics::new(),
        }
    }

    /// Context for text that is not a slice of this context's source, such
    /// as dedented list item content.
    pub fn nested<'t>(&self, source: &'t str) -> ImportContext<'t> {
        ImportContext {
            source,
            options: self.options,
            depth: self.depth,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn locate(&self, offset: usize) -> SourceLocation {
        SourceLocation::from_offset(self.source, offset)
    }

    pub fn warn(&mut self, warning: ImportWarning) {
        self.diagnostics.push(warning);
    }

    /// Records an `ImportFallback` and returns `raw` as a verbatim paragraph.
    pub fn fallback(&mut self, offset: usize, raw: &str, reason: impl Into<String>) -> Node {
        let reason = reason.into();
        log::debug!("keeping {} bytes verbatim: {reason}", raw.len());
        self.warn(ImportWarning::ImportFallback {
            location: self.locate(offset),
            reason,
        });
        verbatim_paragraph(raw)
    }
}

/// A paragraph that reproduces `raw` line by line as unmarked text.
///
/// Lines are joined with hard breaks rather than soft newlines, so blank
/// lines inside the span do not split the paragraph once exported. Leading
/// whitespace is dropped: continuation lines are trimmed on re-import.
pub(crate) fn verbatim_paragraph(raw: &str) -> Node {
    let mut children = Vec::new();
    for (index, line) in raw.trim_end().lines().enumerate() {
        if index > 0 {
            children.push(Node::leaf(Attrs::HardBreak));
        }
        let line = line.trim();
        if !line.is_empty() {
            children.push(Node::text(line));
        }
    }
    Node::paragraph(children)
}

/// Ordered recognizer list, scoped to one import.
pub struct ImportPipeline {
    options: ImportOptions,
    recognizers: Vec<Box<dyn BlockRecognizer>>,
}

impl ImportPipeline {
    /// Pipeline with the standard recognizer order.
    pub fn new(options: ImportOptions) -> Self {
        Self {
            options,
            recognizers: vec![
                Box::new(tags::CustomTags),
                Box::new(blocks::Headings),
                Box::new(blocks::Tables),
                Box::new(blocks::FencedCode),
                Box::new(blocks::ThematicBreaks),
                Box::new(blocks::Lists),
                Box::new(blocks::Paragraphs),
            ],
        }
    }

    /// Names of the block recognizers in the order they are tried.
    pub fn recognizer_names(&self) -> Vec<&'static str> {
        self.recognizers.iter().map(|r| r.name()).collect()
    }

    /// Imports one document.
    pub fn import(&self, text: &str) -> ImportOutcome {
        let mut cx = ImportContext::new(text, self.options);

        let (frontmatter, body_start) = if self.options.parse_frontmatter {
            match extract_frontmatter(text) {
                Ok(extraction) => (extraction.frontmatter, extraction.body_start),
                Err(err) => {
                    cx.warn(ImportWarning::Frontmatter {
                        location: SourceLocation::new(1, 1),
                        message: err.to_string(),
                    });
                    (Frontmatter::default(), 0)
                }
            }
        } else {
            (Frontmatter::default(), 0)
        };

        let children = self.parse_blocks(&mut cx, &text[body_start..], body_start);
        log::debug!(
            "imported {} top-level blocks with {} warnings",
            children.len(),
            cx.diagnostics.len()
        );

        ImportOutcome {
            doc: Node::doc(children),
            frontmatter,
            diagnostics: cx.diagnostics,
        }
    }

    /// Runs the recognizers over one region until it is exhausted.
    pub(crate) fn parse_blocks(
        &self,
        cx: &mut ImportContext<'_>,
        input: &str,
        offset: usize,
    ) -> Vec<Node> {
        let mut blocks = Vec::new();
        let mut pos = 0;

        while pos < input.len() {
            let (line, next) = line_at(input, pos);
            if is_blank(line) {
                pos = next;
                continue;
            }

            let rest = &input[pos..];
            let recognized = self.recognizers.iter().find_map(|recognizer| {
                let hit = recognizer.recognize(self, cx, rest, offset + pos)?;
                log::trace!("{} claimed {} bytes at {}", recognizer.name(), hit.consumed, offset + pos);
                Some(hit)
            });

            match recognized {
                Some(hit) if hit.consumed > 0 => {
                    blocks.extend(hit.nodes);
                    pos += hit.consumed;
                }
                _ => {
                    blocks.push(cx.fallback(offset + pos, line, "no block rule matched"));
                    pos = next;
                }
            }
        }

        blocks
    }
}

impl Default for ImportPipeline {
    fn default() -> Self {
        Self::new(ImportOptions::default())
    }
}

/// The line starting at `start` (without its line ending) and the offset of
/// the following line.
pub(crate) fn line_at(input: &str, start: usize) -> (&str, usize) {
    let rest = &input[start..];
    match rest.find('\n') {
        Some(pos) => (rest[..pos].trim_end_matches('\r'), start + pos + 1),
        None => (rest.trim_end_matches('\r'), input.len()),
    }
}

pub(crate) fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{CalloutType, Mark, NodeKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn recognizer_order_is_fixed() {
        assert_eq!(
            ImportPipeline::default().recognizer_names(),
            vec![
                "custom-tag",
                "heading",
                "table",
                "fenced-code",
                "thematic-break",
                "list",
                "paragraph"
            ]
        );
    }

    #[test]
    fn empty_input_gives_empty_doc() {
        assert_eq!(import(""), Node::doc(vec![]));
        assert_eq!(import("\n  \n"), Node::doc(vec![]));
    }

    #[test]
    fn frontmatter_is_parked() {
        let outcome = import_with_options(
            "---\ntitle: Intro\n---\n\n# Hello\n",
            &ImportOptions::default(),
        );
        assert_eq!(outcome.frontmatter.title.as_deref(), Some("Intro"));
        assert_eq!(
            outcome.doc,
            Node::doc(vec![Node::heading(1, vec![Node::text("Hello")])])
        );
        assert!(outcome.diagnostics.is_empty());
    }

    #[test]
    fn broken_frontmatter_becomes_body() {
        let outcome = import_with_options("---\ntitle: x\n", &ImportOptions::default());
        assert!(matches!(
            outcome.diagnostics.warnings[0],
            ImportWarning::Frontmatter { .. }
        ));
        assert_eq!(outcome.doc.children[0].kind(), NodeKind::HorizontalRule);
    }

    #[test]
    fn frontmatter_parsing_can_be_disabled() {
        let options = ImportOptions {
            parse_frontmatter: false,
            ..ImportOptions::default()
        };
        let outcome = import_with_options("---\ntitle: x\n---\n", &options);
        assert!(outcome.frontmatter.is_empty());
        assert_eq!(outcome.doc.children[0].kind(), NodeKind::HorizontalRule);
    }

    #[test]
    fn mixed_document() {
        let doc = import(
            "# Guide\n\nSome **bold** text.\n\n<Callout type=\"info\">Note</Callout>\n\n- one\n- two\n",
        );
        let kinds: Vec<_> = doc.children.iter().map(Node::kind).collect();
        assert_eq!(
            kinds,
            vec![
                NodeKind::Heading,
                NodeKind::Paragraph,
                NodeKind::Callout,
                NodeKind::BulletList
            ]
        );
        assert_eq!(
            doc.children[1].children[1],
            Node::marked_text("bold", vec![Mark::Bold])
        );
        assert_eq!(
            doc.children[2],
            Node::callout(CalloutType::Info, vec![Node::paragraph_text("Note")])
        );
    }

    #[test]
    fn verbatim_paragraph_drops_line_indentation() {
        let raw = "<Cards>\n    loose text\n\t more\n</Cards>\n";
        let outcome = import_with_options(raw, &ImportOptions::default());
        let expected = Node::paragraph(vec![
            Node::text("<Cards>"),
            Node::leaf(Attrs::HardBreak),
            Node::text("loose text"),
            Node::leaf(Attrs::HardBreak),
            Node::text("more"),
            Node::leaf(Attrs::HardBreak),
            Node::text("</Cards>"),
        ]);
        assert_eq!(outcome.doc.children, vec![expected]);
        assert_eq!(crate::import(&crate::export(&outcome.doc)), outcome.doc);
    }

    #[test]
    fn verbatim_paragraph_keeps_blank_lines_inside() {
        let node = verbatim_paragraph("<Tabs>\n\n  oops\n");
        assert_eq!(
            node,
            Node::paragraph(vec![
                Node::text("<Tabs>"),
                Node::leaf(Attrs::HardBreak),
                Node::leaf(Attrs::HardBreak),
                Node::text("oops"),
            ])
        );
    }
}
