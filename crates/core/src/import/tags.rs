//! Custom block tags.
//!
//! A tag is matched as a whole `<Name ...>` .. `</Name>` span first (counting
//! nested same-name tags, skipping fenced code and code spans), and only then
//! turned into nodes. Anything that cannot be built into a valid subtree is
//! kept verbatim instead.

use super::inline::{find_code_close, parse_inlines, run_length};
use super::{BlockRecognizer, ImportContext, ImportPipeline, Recognized, is_blank, line_at};
use crate::code_fence::{FenceTracker, leading_whitespace_info};
use crate::error::{ImportWarning, Violation};
use crate::node::{
    AccordionType, Attrs, CalloutType, DEFAULT_CARD_HREF, DEFAULT_OBJECT_FIT, DEFAULT_PDF_HEIGHT,
    DEFAULT_VIDEO_HEIGHT, DEFAULT_VIEWER_WIDTH, Node,
};
use crate::registry::{is_orphaned, validate_tree};
use thiserror::Error;

/// Tags that open a custom block at the start of a line.
pub(crate) const BLOCK_TAGS: &[&str] = &[
    "Callout",
    "Tabs",
    "Accordions",
    "Cards",
    "PDFViewer",
    "VideoViewer",
];

const DEFAULT_ACCORDION_TITLE: &str = "Accordion Title";
const DEFAULT_CARD_TITLE: &str = "Card Title";

/// Why a tag span could not be imported structurally.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub(crate) enum TagError {
    #[error("malformed open tag: {0}")]
    Malformed(&'static str),
    #[error("<{0}> is never closed")]
    Unclosed(String),
    #[error("{0}")]
    Structure(String),
    #[error(transparent)]
    Invalid(#[from] Violation),
}

/// A parsed `<Name key="value" ...>` or `<Name ... />`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpenTag<'a> {
    pub name: &'a str,
    pub attrs: Vec<(&'a str, String)>,
    pub self_closing: bool,
    /// Byte length of the open tag.
    pub end: usize,
}

impl OpenTag<'_> {
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    fn required(&self, key: &str) -> Result<&str, TagError> {
        self.attr(key).ok_or_else(|| {
            TagError::Structure(format!("<{}> requires a {key} attribute", self.name))
        })
    }
}

fn skip_whitespace(bytes: &[u8], mut i: usize) -> usize {
    while bytes.get(i).is_some_and(u8::is_ascii_whitespace) {
        i += 1;
    }
    i
}

/// Parses the open tag at the start of `s`.
pub(crate) fn parse_open_tag(s: &str) -> Result<OpenTag<'_>, TagError> {
    let bytes = s.as_bytes();
    if bytes.first() != Some(&b'<') {
        return Err(TagError::Malformed("expected '<'"));
    }
    let name_end = 1 + bytes[1..]
        .iter()
        .take_while(|b| b.is_ascii_alphanumeric())
        .count();
    let name = &s[1..name_end];
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return Err(TagError::Malformed("expected a tag name"));
    }

    let mut attrs = Vec::new();
    let mut i = name_end;
    loop {
        i = skip_whitespace(bytes, i);
        match bytes.get(i) {
            None => return Err(TagError::Malformed("open tag is not terminated")),
            Some(b'>') => {
                return Ok(OpenTag {
                    name,
                    attrs,
                    self_closing: false,
                    end: i + 1,
                });
            }
            Some(b'/') if bytes.get(i + 1) == Some(&b'>') => {
                return Ok(OpenTag {
                    name,
                    attrs,
                    self_closing: true,
                    end: i + 2,
                });
            }
            Some(b) if b.is_ascii_alphabetic() || *b == b'_' => {
                let key_end = i + bytes[i..]
                    .iter()
                    .take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':'))
                    .count();
                let key = &s[i..key_end];
                i = skip_whitespace(bytes, key_end);
                if bytes.get(i) == Some(&b'=') {
                    let (value, next) = attr_value(s, skip_whitespace(bytes, i + 1))?;
                    attrs.push((key, value));
                    i = next;
                } else {
                    attrs.push((key, String::new()));
                }
            }
            Some(_) => return Err(TagError::Malformed("unexpected character in open tag")),
        }
    }
}

/// Reads a `"..."`, `'...'`, `{...}` or bare attribute value at `start`.
fn attr_value(s: &str, start: usize) -> Result<(String, usize), TagError> {
    let bytes = s.as_bytes();
    match bytes.get(start) {
        Some(quote @ (b'"' | b'\'')) => {
            let len = s[start + 1..]
                .find(*quote as char)
                .ok_or(TagError::Malformed("unterminated attribute value"))?;
            let raw = &s[start + 1..start + 1 + len];
            Ok((
                html_escape::decode_html_entities(raw).into_owned(),
                start + len + 2,
            ))
        }
        Some(b'{') => {
            let mut depth = 0;
            for (offset, b) in bytes[start..].iter().enumerate() {
                match b {
                    b'{' => depth += 1,
                    b'}' => {
                        depth -= 1;
                        if depth == 0 {
                            let expr = s[start + 1..start + offset].trim();
                            return Ok((unquote(expr).to_string(), start + offset + 1));
                        }
                    }
                    _ => {}
                }
            }
            Err(TagError::Malformed("unterminated attribute expression"))
        }
        Some(_) => {
            let mut end = start
                + bytes[start..]
                    .iter()
                    .take_while(|b| !b.is_ascii_whitespace() && **b != b'>')
                    .count();
            if end > start && bytes[end - 1] == b'/' && bytes.get(end) == Some(&b'>') {
                end -= 1;
            }
            if end == start {
                return Err(TagError::Malformed("missing attribute value"));
            }
            Ok((s[start..end].to_string(), end))
        }
        None => Err(TagError::Malformed("missing attribute value")),
    }
}

// `{"tab1"}` and `{'tab1'}` carry the plain string.
fn unquote(expr: &str) -> &str {
    for quote in ['"', '\'', '`'] {
        if let Some(inner) = expr
            .strip_prefix(quote)
            .and_then(|rest| rest.strip_suffix(quote))
        {
            return inner;
        }
    }
    expr
}

/// True when `s` starts with `<name` followed by whitespace, `>` or `/`.
fn opens_tag_named(s: &str, name: &str) -> bool {
    s.strip_prefix('<')
        .and_then(|rest| rest.strip_prefix(name))
        .is_some_and(|rest| rest.starts_with(|c: char| c.is_whitespace() || c == '>' || c == '/'))
}

/// Length of a `</name>` close tag at the start of `s`.
fn close_tag_len(s: &str, name: &str) -> Option<usize> {
    let rest = s.strip_prefix("</")?.strip_prefix(name)?;
    let trimmed = rest.trim_start();
    trimmed
        .starts_with('>')
        .then(|| s.len() - trimmed.len() + 1)
}

/// Indentation byte offset and name of a block tag opening `line`.
fn block_tag_at(line: &str) -> Option<(usize, &'static str)> {
    let (indent, offset) = leading_whitespace_info(line);
    if indent > 3 {
        return None;
    }
    let rest = &line[offset..];
    BLOCK_TAGS
        .iter()
        .find(|name| opens_tag_named(rest, name))
        .map(|name| (offset, *name))
}

pub(crate) fn opens_block_tag(line: &str) -> bool {
    block_tag_at(line).is_some()
}

/// An open tag together with its content and the end of its close tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TagSpan<'a> {
    pub open: OpenTag<'a>,
    pub inner: &'a str,
    /// Offset of `inner` within the scanned text.
    pub inner_start: usize,
    /// Offset just past the close tag.
    pub end: usize,
}

/// Matches the tag opening at the start of `s` with its close tag.
pub(crate) fn find_tag_span(s: &str) -> Result<TagSpan<'_>, TagError> {
    let open = parse_open_tag(s)?;
    if open.self_closing {
        return Ok(TagSpan {
            inner: "",
            inner_start: open.end,
            end: open.end,
            open,
        });
    }

    let name = open.name;
    let bytes = s.as_bytes();
    let mut fence = FenceTracker::new();
    let mut depth = 1;
    let mut at_line_start = false;
    let mut i = open.end;

    while i < bytes.len() {
        if at_line_start {
            let (line, next) = line_at(s, i);
            if fence.advance(line) {
                i = next;
                continue;
            }
            at_line_start = false;
        }
        match bytes[i] {
            b'\n' => {
                at_line_start = true;
                i += 1;
            }
            b'\\' => i += if bytes.get(i + 1) == Some(&b'\n') { 1 } else { 2 },
            b'`' => {
                let run = run_length(bytes, i, b'`');
                let paragraph_end = s[i..].find("\n\n").map_or(bytes.len(), |p| i + p);
                i = match find_code_close(&bytes[..paragraph_end], i + run, run) {
                    Some(close) => close + run,
                    None => i + run,
                };
            }
            b'<' => {
                if let Some(len) = close_tag_len(&s[i..], name) {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(TagSpan {
                            inner: &s[open.end..i],
                            inner_start: open.end,
                            end: i + len,
                            open,
                        });
                    }
                    i += len;
                } else if opens_tag_named(&s[i..], name) {
                    match parse_open_tag(&s[i..]) {
                        Ok(nested) => {
                            if !nested.self_closing {
                                depth += 1;
                            }
                            i += nested.end;
                        }
                        Err(_) => i += 1,
                    }
                } else {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }

    Err(TagError::Unclosed(name.to_string()))
}

/// A child tag found inside a structural container.
struct ChildTag<'a> {
    span: TagSpan<'a>,
    /// Source offset of the child's `<`.
    start: usize,
    /// Source offset of the child's content.
    inner_offset: usize,
}

impl ChildTag<'_> {
    fn require_name(&self, name: &str, parent: &str) -> Result<(), TagError> {
        if self.span.open.name == name {
            Ok(())
        } else {
            Err(TagError::Structure(format!(
                "<{}> is not allowed inside <{parent}>",
                self.span.open.name
            )))
        }
    }
}

/// Splits container content into child tags. Only whitespace and `{/* */}`
/// comments may sit between them.
fn children_tags<'a>(
    inner: &'a str,
    base: usize,
    parent: &str,
) -> Result<Vec<ChildTag<'a>>, TagError> {
    let mut children = Vec::new();
    let mut i = 0;
    loop {
        i = skip_whitespace(inner.as_bytes(), i);
        let rest = &inner[i..];
        if rest.is_empty() {
            return Ok(children);
        }
        if rest.starts_with("{/*") {
            let close = rest
                .find("*/}")
                .ok_or_else(|| TagError::Structure(format!("unterminated comment inside <{parent}>")))?;
            i += close + 3;
            continue;
        }
        if !rest.starts_with('<') {
            return Err(TagError::Structure(format!(
                "unexpected text inside <{parent}>"
            )));
        }
        let span = find_tag_span(rest)?;
        let end = i + span.end;
        children.push(ChildTag {
            start: base + i,
            inner_offset: base + i + span.inner_start,
            span,
        });
        i = end;
    }
}

pub(crate) struct CustomTags;

impl BlockRecognizer for CustomTags {
    fn name(&self) -> &'static str {
        "custom-tag"
    }

    fn recognize(
        &self,
        pipeline: &ImportPipeline,
        cx: &mut ImportContext<'_>,
        input: &str,
        offset: usize,
    ) -> Option<Recognized> {
        let (first_line, first_next) = line_at(input, 0);
        let (indent, name) = block_tag_at(first_line)?;

        let span = match find_tag_span(&input[indent..]) {
            Ok(span) => span,
            Err(err) => {
                let node = cx.fallback(offset, first_line, err.to_string());
                return Some(Recognized::one(node, first_next));
            }
        };

        let (tail, consumed) = line_at(input, indent + span.end);
        let raw = &input[..consumed];
        if !is_blank(tail) {
            let node = cx.fallback(offset, raw, format!("unexpected text after </{name}>"));
            return Some(Recognized::one(node, consumed));
        }
        if cx.depth >= cx.options.max_nesting_depth {
            let reason = format!(
                "<{name}> nested deeper than {} levels",
                cx.options.max_nesting_depth
            );
            let node = cx.fallback(offset, raw, reason);
            return Some(Recognized::one(node, consumed));
        }

        // Warnings from a span that ends up verbatim are dropped with it.
        let outer = std::mem::take(&mut cx.diagnostics);
        let built = build_tag(pipeline, cx, &span, offset + indent).and_then(|node| {
            validate_tree(&node)?;
            Ok(node)
        });
        let inner = std::mem::replace(&mut cx.diagnostics, outer);

        let node = match built {
            Ok(node) => {
                cx.diagnostics.warnings.extend(inner.warnings);
                node
            }
            Err(err) => cx.fallback(offset, raw, err.to_string()),
        };
        Some(Recognized::one(node, consumed))
    }
}

fn build_tag(
    pipeline: &ImportPipeline,
    cx: &mut ImportContext<'_>,
    span: &TagSpan<'_>,
    start: usize,
) -> Result<Node, TagError> {
    let inner_offset = start + span.inner_start;
    let open = &span.open;
    match open.name {
        "Callout" => {
            let callout_type = match open.attr("type") {
                None => CalloutType::Info,
                Some(value) => match CalloutType::parse(value) {
                    Some(parsed) => parsed,
                    None => {
                        cx.warn(ImportWarning::UnknownCalloutType {
                            location: cx.locate(start),
                            value: value.to_string(),
                        });
                        CalloutType::Info
                    }
                },
            };
            let children = block_children(pipeline, cx, span.inner, inner_offset);
            Ok(Node::callout(callout_type, children))
        }
        "Tabs" => build_tabs(pipeline, cx, span, inner_offset),
        "Accordions" => {
            let accordion_type = match open.attr("type") {
                None => AccordionType::Single,
                Some(value) => AccordionType::parse(value).unwrap_or_else(|| {
                    log::debug!("unknown accordion type {value:?}, using single");
                    AccordionType::Single
                }),
            };
            let mut items = Vec::new();
            for child in children_tags(span.inner, inner_offset, "Accordions")? {
                child.require_name("Accordion", "Accordions")?;
                let title = child
                    .span
                    .open
                    .attr("title")
                    .unwrap_or(DEFAULT_ACCORDION_TITLE)
                    .to_string();
                let blocks = block_children(pipeline, cx, child.span.inner, child.inner_offset);
                items.push(Node::new(Attrs::AccordionItem { title }, blocks));
            }
            Ok(Node::new(
                Attrs::AccordionContainer { accordion_type },
                items,
            ))
        }
        "Cards" => {
            let mut cards = Vec::new();
            for child in children_tags(span.inner, inner_offset, "Cards")? {
                child.require_name("Card", "Cards")?;
                let card = &child.span.open;
                let attrs = Attrs::Card {
                    title: card.attr("title").unwrap_or(DEFAULT_CARD_TITLE).to_string(),
                    href: card.attr("href").unwrap_or(DEFAULT_CARD_HREF).to_string(),
                };
                let blocks = block_children(pipeline, cx, child.span.inner, child.inner_offset);
                cards.push(Node::new(attrs, blocks));
            }
            Ok(Node::new(Attrs::Cards, cards))
        }
        "PDFViewer" | "VideoViewer" => {
            if !is_blank(span.inner) {
                return Err(TagError::Structure(format!(
                    "<{}> does not take content",
                    open.name
                )));
            }
            let src = open.attr("src").unwrap_or_default().to_string();
            let width = open.attr("width").unwrap_or(DEFAULT_VIEWER_WIDTH).to_string();
            let attrs = if open.name == "PDFViewer" {
                Attrs::PdfViewer {
                    src,
                    width,
                    height: open.attr("height").unwrap_or(DEFAULT_PDF_HEIGHT).to_string(),
                }
            } else {
                Attrs::VideoViewer {
                    src,
                    width,
                    height: open.attr("height").unwrap_or(DEFAULT_VIDEO_HEIGHT).to_string(),
                    object_fit: open.attr("objectFit").unwrap_or(DEFAULT_OBJECT_FIT).to_string(),
                }
            };
            Ok(Node::leaf(attrs))
        }
        other => Err(TagError::Structure(format!("<{other}> is not a block tag"))),
    }
}

fn build_tabs(
    pipeline: &ImportPipeline,
    cx: &mut ImportContext<'_>,
    span: &TagSpan<'_>,
    inner_offset: usize,
) -> Result<Node, TagError> {
    let mut children = children_tags(span.inner, inner_offset, "Tabs")?.into_iter();
    let list = children
        .next()
        .filter(|child| child.span.open.name == "TabsList")
        .ok_or_else(|| TagError::Structure("<Tabs> must open with <TabsList>".to_string()))?;

    let mut triggers = Vec::new();
    for trigger in children_tags(list.span.inner, list.inner_offset, "TabsList")? {
        trigger.require_name("TabsTrigger", "TabsList")?;
        let value = trigger.span.open.required("value")?.to_string();
        let label = trigger
            .span
            .inner
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        triggers.push(Node::new(
            Attrs::TabsTrigger { value },
            parse_inlines(&label),
        ));
    }

    let default_value = match span.open.attr("defaultValue") {
        Some(value) => value.to_string(),
        None => triggers
            .first()
            .and_then(|trigger| match &trigger.attrs {
                Attrs::TabsTrigger { value } => Some(value.clone()),
                _ => None,
            })
            .unwrap_or_default(),
    };

    let mut nodes = vec![Node::new(Attrs::TabsList, triggers)];
    let mut starts = Vec::new();
    for content in children {
        content.require_name("TabsContent", "Tabs")?;
        let value = content.span.open.required("value")?.to_string();
        let blocks = block_children(pipeline, cx, content.span.inner, content.inner_offset);
        nodes.push(Node::tabs_content(value, blocks));
        starts.push(content.start);
    }
    let tabs = Node::new(Attrs::TabsContainer { default_value }, nodes);

    for (panel, start) in tabs.children[1..].iter().zip(starts) {
        if let Attrs::TabsContent { value } = &panel.attrs
            && is_orphaned(&tabs, panel)
        {
            cx.warn(ImportWarning::OrphanedReference {
                location: cx.locate(start),
                value: value.clone(),
            });
        }
    }
    Ok(tabs)
}

/// Imports container content as blocks, one nesting level deeper.
fn block_children(
    pipeline: &ImportPipeline,
    cx: &mut ImportContext<'_>,
    inner: &str,
    offset: usize,
) -> Vec<Node> {
    cx.depth += 1;
    let mut blocks = pipeline.parse_blocks(cx, inner, offset);
    cx.depth -= 1;
    if blocks.is_empty() {
        blocks.push(Node::paragraph(Vec::new()));
    }
    blocks
}
