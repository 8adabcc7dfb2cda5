//! Typed document model.
//!
//! Every block and inline element is a [`Node`]: a closed [`Attrs`] variant
//! that carries the kind-specific attributes, plus an ordered list of
//! children. The kind is never stored as a string; [`Node::kind`] derives it
//! from the attribute variant, so every dispatch over nodes is an exhaustive
//! `match`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminator for every node variant in a document tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// Document root.
    Doc,
    /// Paragraph of inline content.
    Paragraph,
    /// ATX heading, levels 1 through 4.
    Heading,
    /// Run of text with a mark set.
    Text,
    /// `<Callout>` block.
    Callout,
    /// `<Tabs>` block.
    TabsContainer,
    /// `<TabsList>` inside a tabs container.
    TabsList,
    /// `<TabsTrigger>` inside a tabs list.
    TabsTrigger,
    /// `<TabsContent>` panel inside a tabs container.
    TabsContent,
    /// `<Accordions>` block.
    AccordionContainer,
    /// `<Accordion>` item.
    AccordionItem,
    /// `<Cards>` grid.
    Cards,
    /// `<Card>` inside a card grid.
    Card,
    /// Pipe table.
    Table,
    /// Table row.
    TableRow,
    /// Body cell.
    TableCell,
    /// Header-row cell.
    TableHeader,
    /// Fenced code block.
    CodeBlock,
    /// `-` list.
    BulletList,
    /// `1.` list.
    OrderedList,
    /// Item of either list kind.
    ListItem,
    /// `![alt](src)` image.
    Image,
    /// Self-closing `<PDFViewer />`.
    PdfViewer,
    /// Self-closing `<VideoViewer />`.
    VideoViewer,
    /// Thematic break.
    HorizontalRule,
    /// Hard line break inside inline content.
    HardBreak,
}

impl NodeKind {
    /// Kebab-case name used in diagnostics and serialized trees.
    pub const fn as_str(self) -> &'static str {
        match self {
            NodeKind::Doc => "doc",
            NodeKind::Paragraph => "paragraph",
            NodeKind::Heading => "heading",
            NodeKind::Text => "text",
            NodeKind::Callout => "callout",
            NodeKind::TabsContainer => "tabs-container",
            NodeKind::TabsList => "tabs-list",
            NodeKind::TabsTrigger => "tabs-trigger",
            NodeKind::TabsContent => "tabs-content",
            NodeKind::AccordionContainer => "accordion-container",
            NodeKind::AccordionItem => "accordion-item",
            NodeKind::Cards => "cards",
            NodeKind::Card => "card",
            NodeKind::Table => "table",
            NodeKind::TableRow => "table-row",
            NodeKind::TableCell => "table-cell",
            NodeKind::TableHeader => "table-header",
            NodeKind::CodeBlock => "code-block",
            NodeKind::BulletList => "bullet-list",
            NodeKind::OrderedList => "ordered-list",
            NodeKind::ListItem => "list-item",
            NodeKind::Image => "image",
            NodeKind::PdfViewer => "pdf-viewer",
            NodeKind::VideoViewer => "video-viewer",
            NodeKind::HorizontalRule => "horizontal-rule",
            NodeKind::HardBreak => "hard-break",
        }
    }

    /// Kinds that may appear directly inside `doc` and other block containers.
    pub const fn is_block(self) -> bool {
        matches!(
            self,
            NodeKind::Paragraph
                | NodeKind::Heading
                | NodeKind::Callout
                | NodeKind::TabsContainer
                | NodeKind::AccordionContainer
                | NodeKind::Cards
                | NodeKind::Table
                | NodeKind::CodeBlock
                | NodeKind::BulletList
                | NodeKind::OrderedList
                | NodeKind::HorizontalRule
                | NodeKind::PdfViewer
                | NodeKind::VideoViewer
        )
    }

    /// Kinds that may appear inside paragraphs, headings and triggers.
    pub const fn is_inline(self) -> bool {
        matches!(self, NodeKind::Text | NodeKind::HardBreak | NodeKind::Image)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Callout flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CalloutType {
    /// Neutral information (the fallback for unknown values).
    #[default]
    Info,
    /// Short warning form.
    Warn,
    /// Long warning form, kept distinct so it survives a round trip.
    Warning,
    /// Error.
    Error,
    /// Success.
    Success,
}

impl CalloutType {
    /// Parses a `type` attribute value. Unknown values return `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "info" => Some(CalloutType::Info),
            "warn" => Some(CalloutType::Warn),
            "warning" => Some(CalloutType::Warning),
            "error" => Some(CalloutType::Error),
            "success" => Some(CalloutType::Success),
            _ => None,
        }
    }

    /// Attribute value written by the exporter.
    pub const fn as_str(self) -> &'static str {
        match self {
            CalloutType::Info => "info",
            CalloutType::Warn => "warn",
            CalloutType::Warning => "warning",
            CalloutType::Error => "error",
            CalloutType::Success => "success",
        }
    }
}

/// Whether an accordion lets one or many items be open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccordionType {
    /// One item open at a time.
    #[default]
    Single,
    /// Any number of items open.
    Multiple,
}

impl AccordionType {
    /// Parses a `type` attribute value.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "single" => Some(AccordionType::Single),
            "multiple" => Some(AccordionType::Multiple),
            _ => None,
        }
    }

    /// Attribute value written by the exporter.
    pub const fn as_str(self) -> &'static str {
        match self {
            AccordionType::Single => "single",
            AccordionType::Multiple => "multiple",
        }
    }
}

/// Inline formatting applied to a text run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Mark {
    /// `[text](href)`.
    Link {
        /// Link target, stored verbatim.
        href: String,
    },
    /// `**text**`.
    Bold,
    /// `*text*`.
    Italic,
    /// `~~text~~`.
    Strike,
    /// `` `text` ``.
    Code,
}

impl Mark {
    /// Canonical nesting rank; lower ranks wrap higher ones.
    pub const fn rank(&self) -> u8 {
        match self {
            Mark::Link { .. } => 0,
            Mark::Bold => 1,
            Mark::Italic => 2,
            Mark::Strike => 3,
            Mark::Code => 4,
        }
    }

    /// True when both marks are the same variant (ignoring link targets).
    pub fn same_type(&self, other: &Mark) -> bool {
        self.rank() == other.rank()
    }
}

/// Sorts marks by rank and keeps one mark per type (the innermost link wins).
pub fn normalize_marks(mut marks: Vec<Mark>) -> Vec<Mark> {
    marks.reverse();
    let mut seen: Vec<Mark> = Vec::with_capacity(marks.len());
    for mark in marks {
        if !seen.iter().any(|m| m.same_type(&mark)) {
            seen.push(mark);
        }
    }
    seen.sort_by_key(Mark::rank);
    seen
}

/// Kind-specific attributes. The variant is the node's kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Attrs {
    /// Document root.
    Doc,
    /// Paragraph.
    Paragraph,
    /// Heading.
    Heading {
        /// 1..=4.
        level: u8,
        /// Explicit anchor written as a `{#id}` suffix.
        id: Option<String>,
    },
    /// Text run.
    Text {
        /// Literal characters, never escaped.
        text: String,
        /// Marks in canonical order.
        marks: Vec<Mark>,
    },
    /// Callout.
    Callout {
        /// Callout flavour.
        #[serde(rename = "type")]
        callout_type: CalloutType,
    },
    /// Tabs container.
    #[serde(rename_all = "camelCase")]
    TabsContainer {
        /// Trigger value selected on first render.
        default_value: String,
    },
    /// Tabs list.
    TabsList,
    /// Tab trigger.
    TabsTrigger {
        /// Unique, non-empty key shared with the matching content panel.
        value: String,
    },
    /// Tab content panel.
    TabsContent {
        /// Key of the trigger that shows this panel.
        value: String,
    },
    /// Accordion group.
    AccordionContainer {
        /// Single or multiple open items.
        #[serde(rename = "type")]
        accordion_type: AccordionType,
    },
    /// Accordion item.
    AccordionItem {
        /// Non-empty header text.
        title: String,
    },
    /// Card grid.
    Cards,
    /// Card.
    Card {
        /// Card heading.
        title: String,
        /// Link target, `"#"` when absent.
        href: String,
    },
    /// Table.
    Table,
    /// Table row.
    TableRow,
    /// Body cell.
    TableCell,
    /// Header cell.
    TableHeader,
    /// Fenced code block.
    CodeBlock {
        /// Info-string language, empty when absent.
        language: String,
        /// Optional `title="..."` from the info string.
        title: Option<String>,
    },
    /// Bullet list.
    BulletList,
    /// Ordered list.
    OrderedList,
    /// List item.
    ListItem,
    /// Image.
    Image {
        /// Image URL.
        src: String,
        /// Alternative text.
        alt: String,
    },
    /// PDF viewer.
    PdfViewer {
        /// Document URL.
        src: String,
        /// CSS width.
        width: String,
        /// CSS height.
        height: String,
    },
    /// Video viewer.
    #[serde(rename_all = "camelCase")]
    VideoViewer {
        /// Video URL.
        src: String,
        /// CSS width.
        width: String,
        /// CSS height.
        height: String,
        /// CSS `object-fit`.
        object_fit: String,
    },
    /// Horizontal rule.
    HorizontalRule,
    /// Hard break.
    HardBreak,
}

/// Default width for PDF and video viewers.
pub const DEFAULT_VIEWER_WIDTH: &str = "100%";
/// Default PDF viewer height.
pub const DEFAULT_PDF_HEIGHT: &str = "500px";
/// Default video viewer height.
pub const DEFAULT_VIDEO_HEIGHT: &str = "400px";
/// Default video `object-fit`.
pub const DEFAULT_OBJECT_FIT: &str = "contain";
/// Default card link target.
pub const DEFAULT_CARD_HREF: &str = "#";

impl Attrs {
    /// Kind discriminator for this attribute record.
    pub const fn kind(&self) -> NodeKind {
        match self {
            Attrs::Doc => NodeKind::Doc,
            Attrs::Paragraph => NodeKind::Paragraph,
            Attrs::Heading { .. } => NodeKind::Heading,
            Attrs::Text { .. } => NodeKind::Text,
            Attrs::Callout { .. } => NodeKind::Callout,
            Attrs::TabsContainer { .. } => NodeKind::TabsContainer,
            Attrs::TabsList => NodeKind::TabsList,
            Attrs::TabsTrigger { .. } => NodeKind::TabsTrigger,
            Attrs::TabsContent { .. } => NodeKind::TabsContent,
            Attrs::AccordionContainer { .. } => NodeKind::AccordionContainer,
            Attrs::AccordionItem { .. } => NodeKind::AccordionItem,
            Attrs::Cards => NodeKind::Cards,
            Attrs::Card { .. } => NodeKind::Card,
            Attrs::Table => NodeKind::Table,
            Attrs::TableRow => NodeKind::TableRow,
            Attrs::TableCell => NodeKind::TableCell,
            Attrs::TableHeader => NodeKind::TableHeader,
            Attrs::CodeBlock { .. } => NodeKind::CodeBlock,
            Attrs::BulletList => NodeKind::BulletList,
            Attrs::OrderedList => NodeKind::OrderedList,
            Attrs::ListItem => NodeKind::ListItem,
            Attrs::Image { .. } => NodeKind::Image,
            Attrs::PdfViewer { .. } => NodeKind::PdfViewer,
            Attrs::VideoViewer { .. } => NodeKind::VideoViewer,
            Attrs::HorizontalRule => NodeKind::HorizontalRule,
            Attrs::HardBreak => NodeKind::HardBreak,
        }
    }

    /// PDF viewer attributes with default dimensions.
    pub fn pdf_viewer(src: impl Into<String>) -> Self {
        Attrs::PdfViewer {
            src: src.into(),
            width: DEFAULT_VIEWER_WIDTH.to_string(),
            height: DEFAULT_PDF_HEIGHT.to_string(),
        }
    }

    /// Video viewer attributes with default dimensions.
    pub fn video_viewer(src: impl Into<String>) -> Self {
        Attrs::VideoViewer {
            src: src.into(),
            width: DEFAULT_VIEWER_WIDTH.to_string(),
            height: DEFAULT_VIDEO_HEIGHT.to_string(),
            object_fit: DEFAULT_OBJECT_FIT.to_string(),
        }
    }
}

/// One element of a document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Kind and attributes.
    pub attrs: Attrs,
    /// Ordered children; empty for leaves.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    /// Builds a node from attributes and children.
    pub fn new(attrs: Attrs, children: Vec<Node>) -> Self {
        Self { attrs, children }
    }

    /// Builds a node without children.
    pub fn leaf(attrs: Attrs) -> Self {
        Self::new(attrs, Vec::new())
    }

    /// Document root.
    pub fn doc(children: Vec<Node>) -> Self {
        Self::new(Attrs::Doc, children)
    }

    /// Paragraph.
    pub fn paragraph(children: Vec<Node>) -> Self {
        Self::new(Attrs::Paragraph, children)
    }

    /// Paragraph holding a single unmarked text run (or nothing for `""`).
    pub fn paragraph_text(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            Self::paragraph(Vec::new())
        } else {
            Self::paragraph(vec![Self::text(text)])
        }
    }

    /// Heading of `level` without an explicit anchor.
    pub fn heading(level: u8, children: Vec<Node>) -> Self {
        Self::new(Attrs::Heading { level, id: None }, children)
    }

    /// Unmarked text run.
    pub fn text(text: impl Into<String>) -> Self {
        Self::marked_text(text, Vec::new())
    }

    /// Text run with marks (normalized to canonical order).
    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self::leaf(Attrs::Text {
            text: text.into(),
            marks: normalize_marks(marks),
        })
    }

    /// Callout.
    pub fn callout(callout_type: CalloutType, children: Vec<Node>) -> Self {
        Self::new(Attrs::Callout { callout_type }, children)
    }

    /// Tab trigger with a plain-text label.
    pub fn tabs_trigger(value: impl Into<String>, label: impl Into<String>) -> Self {
        let label = label.into();
        let children = if label.is_empty() {
            Vec::new()
        } else {
            vec![Self::text(label)]
        };
        Self::new(
            Attrs::TabsTrigger {
                value: value.into(),
            },
            children,
        )
    }

    /// Tab content panel.
    pub fn tabs_content(value: impl Into<String>, children: Vec<Node>) -> Self {
        Self::new(
            Attrs::TabsContent {
                value: value.into(),
            },
            children,
        )
    }

    /// Node kind.
    pub const fn kind(&self) -> NodeKind {
        self.attrs.kind()
    }

    /// Concatenated text of all descendant text runs.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Attrs::Text { text, .. } = &self.attrs {
            out.push_str(text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Node at `path`, relative to `self`.
    pub fn get(&self, path: &NodePath) -> Option<&Node> {
        path.0
            .iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    /// Mutable node at `path`, relative to `self`.
    pub fn get_mut(&mut self, path: &NodePath) -> Option<&mut Node> {
        path.0
            .iter()
            .try_fold(self, |node, &index| node.children.get_mut(index))
    }

    /// Pre-order traversal calling `visit` with each node and its path.
    pub fn walk<F>(&self, visit: &mut F)
    where
        F: FnMut(&Node, &NodePath),
    {
        self.walk_at(&mut NodePath::root(), visit);
    }

    fn walk_at<F>(&self, path: &mut NodePath, visit: &mut F)
    where
        F: FnMut(&Node, &NodePath),
    {
        visit(self, path);
        for (index, child) in self.children.iter().enumerate() {
            path.0.push(index);
            child.walk_at(path, visit);
            path.0.pop();
        }
    }
}

/// Child-index path from the document root to a node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct NodePath(pub Vec<usize>);

impl NodePath {
    /// The root path.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path of this node's `index`-th child.
    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    /// Parent path and this node's index within it. `None` for the root.
    pub fn split_last(&self) -> Option<(NodePath, usize)> {
        let (last, rest) = self.0.split_last()?;
        Some((NodePath(rest.to_vec()), *last))
    }

    /// True for the root path.
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<usize>> for NodePath {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("/");
        }
        for index in &self.0 {
            write!(f, "/{index}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_attrs_variant() {
        let node = Node::callout(CalloutType::Warning, vec![Node::paragraph_text("x")]);
        assert_eq!(node.kind(), NodeKind::Callout);
        assert_eq!(node.kind().to_string(), "callout");
        assert_eq!(NodeKind::PdfViewer.as_str(), "pdf-viewer");
    }

    #[test]
    fn marks_are_sorted_and_deduplicated() {
        let marks = normalize_marks(vec![
            Mark::Code,
            Mark::Bold,
            Mark::Link {
                href: "a".to_string(),
            },
            Mark::Bold,
            Mark::Link {
                href: "b".to_string(),
            },
        ]);
        assert_eq!(
            marks,
            vec![
                Mark::Link {
                    href: "b".to_string()
                },
                Mark::Bold,
                Mark::Code
            ]
        );
    }

    #[test]
    fn attrs_serialize_with_kebab_kind_and_camel_keys() {
        let attrs = Attrs::video_viewer("/v.mp4");
        let json = serde_json::to_value(&attrs).unwrap();
        assert_eq!(json["kind"], "video-viewer");
        assert_eq!(json["objectFit"], "contain");

        let tabs = Attrs::TabsContainer {
            default_value: "tab1".to_string(),
        };
        let json = serde_json::to_value(&tabs).unwrap();
        assert_eq!(json["defaultValue"], "tab1");

        let back: Attrs = serde_json::from_value(json).unwrap();
        assert_eq!(back, tabs);
    }

    #[test]
    fn path_navigation() {
        let doc = Node::doc(vec![
            Node::paragraph_text("a"),
            Node::callout(CalloutType::Info, vec![Node::paragraph_text("b")]),
        ]);
        let path = NodePath::from(vec![1, 0]);
        assert_eq!(doc.get(&path).unwrap().text_content(), "b");
        assert!(doc.get(&NodePath::from(vec![3])).is_none());
        assert_eq!(path.to_string(), "/1/0");
        let (parent, index) = path.split_last().unwrap();
        assert_eq!(parent, NodePath::from(vec![1]));
        assert_eq!(index, 0);
    }

    #[test]
    fn walk_visits_in_document_order() {
        let doc = Node::doc(vec![
            Node::heading(1, vec![Node::text("T")]),
            Node::paragraph_text("p"),
        ]);
        let mut kinds = Vec::new();
        doc.walk(&mut |node, _| kinds.push(node.kind()));
        assert_eq!(
            kinds,
            vec![
                NodeKind::Doc,
                NodeKind::Heading,
                NodeKind::Text,
                NodeKind::Paragraph,
                NodeKind::Text
            ]
        );
    }
}
