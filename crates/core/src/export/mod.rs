//! Text Exporter: typed document tree back to canonical extended-Markdown.
//!
//! One rule per node kind, selected by an exhaustive `match` on [`Attrs`].
//! Blocks are separated by a blank line; custom tags write their attributes
//! in a fixed order, double-quoted and attribute-escaped. The output is what
//! [`crate::import`] reads back into an equal tree.

mod inline;

use crate::frontmatter::{Frontmatter, render_frontmatter};
use crate::node::{Attrs, Node, NodeKind};
use crate::options::ExportOptions;
use crate::registry::is_orphaned;
use inline::{Flow, longest_run, render_inlines};

/// Exports a tree with default options and no frontmatter.
pub fn export(root: &Node) -> String {
    export_document(root, &Frontmatter::default(), &ExportOptions::default())
}

/// Exports a tree together with its frontmatter.
pub fn export_document(root: &Node, frontmatter: &Frontmatter, options: &ExportOptions) -> String {
    let mut out = String::new();
    if options.include_frontmatter {
        out.push_str(&render_frontmatter(frontmatter));
    }

    let exporter = Exporter { options: *options };
    let body = match root.kind() {
        NodeKind::Doc => exporter.blocks(&root.children),
        _ => exporter.block(root),
    };
    if !body.is_empty() {
        out.push_str(&body);
        out.push('\n');
    }
    log::debug!("exported {} bytes", out.len());
    out
}

struct Exporter {
    options: ExportOptions,
}

impl Exporter {
    fn blocks(&self, nodes: &[Node]) -> String {
        nodes
            .iter()
            .map(|node| self.block(node))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn block(&self, node: &Node) -> String {
        match &node.attrs {
            Attrs::Doc => self.blocks(&node.children),
            Attrs::Paragraph => render_inlines(&node.children, Flow::Block),
            Attrs::Heading { level, id } => heading(*level, id.as_deref(), &node.children),
            Attrs::Text { .. } | Attrs::HardBreak | Attrs::Image { .. } => {
                render_inlines(std::slice::from_ref(node), Flow::Block)
            }
            Attrs::Callout { callout_type } => {
                self.container("Callout", &[("type", callout_type.as_str())], &node.children)
            }
            Attrs::TabsContainer { default_value } => self.tabs(node, default_value),
            Attrs::TabsList => tabs_list(&node.children),
            Attrs::TabsTrigger { value } => trigger(value, &node.children),
            Attrs::TabsContent { value } => {
                self.container("TabsContent", &[("value", value.as_str())], &node.children)
            }
            Attrs::AccordionContainer { accordion_type } => {
                let items: Vec<String> = node.children.iter().map(|item| self.block(item)).collect();
                wrap("Accordions", &[("type", accordion_type.as_str())], &items)
            }
            Attrs::AccordionItem { title } => {
                self.container("Accordion", &[("title", title.as_str())], &node.children)
            }
            Attrs::Cards => {
                let cards: Vec<String> = node.children.iter().map(|card| self.block(card)).collect();
                wrap("Cards", &[], &cards)
            }
            Attrs::Card { title, href } => {
                self.container(
                    "Card",
                    &[("title", title.as_str()), ("href", href.as_str())],
                    &node.children,
                )
            }
            Attrs::Table => self.table(&node.children),
            Attrs::TableRow => self.table_row(&node.children, node.children.len()),
            Attrs::TableCell | Attrs::TableHeader => self.cell(&node.children),
            Attrs::CodeBlock { language, title } => {
                code_block(language, title.as_deref(), &node.text_content())
            }
            Attrs::BulletList => self.list(&node.children, false),
            Attrs::OrderedList => self.list(&node.children, true),
            Attrs::ListItem => self.list_item(&node.children, "- "),
            Attrs::PdfViewer { src, width, height } => self_closing(
                "PDFViewer",
                &[
                    ("src", src.as_str()),
                    ("width", width.as_str()),
                    ("height", height.as_str()),
                ],
            ),
            Attrs::VideoViewer {
                src,
                width,
                height,
                object_fit,
            } => self_closing(
                "VideoViewer",
                &[
                    ("src", src.as_str()),
                    ("width", width.as_str()),
                    ("height", height.as_str()),
                    ("objectFit", object_fit.as_str()),
                ],
            ),
            Attrs::HorizontalRule => "***".to_string(),
        }
    }

    /// A tag holding block content. A single one-line paragraph is written
    /// inline with the tags.
    fn container(&self, name: &str, attrs: &[(&str, &str)], children: &[Node]) -> String {
        let open = open_tag(name, attrs);
        if let [only] = children
            && only.kind() == NodeKind::Paragraph
        {
            let text = render_inlines(&only.children, Flow::Block);
            if !text.is_empty() && !text.contains('\n') {
                return format!("{open}{text}</{name}>");
            }
        }
        format!("{open}\n{}\n</{name}>", self.blocks(children))
    }

    fn tabs(&self, tabs: &Node, default_value: &str) -> String {
        let mut parts = Vec::with_capacity(tabs.children.len());
        for child in &tabs.children {
            if self.options.orphan_markers
                && is_orphaned(tabs, child)
                && let Attrs::TabsContent { value } = &child.attrs
            {
                log::debug!("marking orphaned tab content {value:?}");
                parts.push(orphan_marker(value));
            }
            parts.push(self.block(child));
        }
        wrap("Tabs", &[("defaultValue", default_value)], &parts)
    }

    fn table(&self, rows: &[Node]) -> String {
        let width = rows.first().map_or(0, |header| header.children.len());
        let mut lines = Vec::with_capacity(rows.len() + 1);
        for (index, row) in rows.iter().enumerate() {
            lines.push(self.table_row(&row.children, width));
            if index == 0 {
                lines.push(format!("| {} |", vec!["---"; width].join(" | ")));
            }
        }
        lines.join("\n")
    }

    fn table_row(&self, cells: &[Node], width: usize) -> String {
        let mut rendered: Vec<String> = cells.iter().map(|cell| self.cell(&cell.children)).collect();
        if rendered.len() < width {
            rendered.resize(width, String::new());
        }
        format!("| {} |", rendered.join(" | "))
    }

    /// Cell content on one line.
    fn cell(&self, blocks: &[Node]) -> String {
        blocks
            .iter()
            .map(|block| match block.kind() {
                NodeKind::Paragraph => render_inlines(&block.children, Flow::SingleLine),
                _ => self.block(block).replace('\n', " "),
            })
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn list(&self, items: &[Node], ordered: bool) -> String {
        items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let marker = if ordered {
                    format!("{}. ", index + 1)
                } else {
                    "- ".to_string()
                };
                self.list_item(&item.children, &marker)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Item content after `marker`, continuation lines indented to the
    /// marker's width.
    fn list_item(&self, blocks: &[Node], marker: &str) -> String {
        let mut body = String::new();
        for (index, block) in blocks.iter().enumerate() {
            if index > 0 {
                let nested_list = matches!(block.kind(), NodeKind::BulletList | NodeKind::OrderedList);
                body.push_str(if nested_list { "\n" } else { "\n\n" });
            }
            body.push_str(&self.block(block));
        }

        let indent = " ".repeat(marker.len());
        let mut out = String::new();
        for (index, line) in body.split('\n').enumerate() {
            if index == 0 {
                out.push_str(marker);
                out.push_str(line);
                continue;
            }
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&indent);
                out.push_str(line);
            }
        }
        match out.find('\n') {
            Some(end) if out[..end].trim_end() == marker.trim_end() => {
                format!("{}{}", marker.trim_end(), &out[end..])
            }
            None if body.is_empty() => marker.trim_end().to_string(),
            _ => out,
        }
    }
}

fn heading(level: u8, id: Option<&str>, children: &[Node]) -> String {
    let mut text = render_inlines(children, Flow::SingleLine);
    // A trailing `#` would read as a closing sequence.
    if text.ends_with('#') {
        text.pop();
        text.push_str("\\#");
    }
    let mut out = "#".repeat(usize::from(level));
    if !text.is_empty() {
        out.push(' ');
        out.push_str(&text);
    }
    if let Some(id) = id {
        out.push_str(&format!(" {{#{id}}}"));
    }
    out
}

fn trigger(value: &str, label: &[Node]) -> String {
    format!(
        "{}{}</TabsTrigger>",
        open_tag("TabsTrigger", &[("value", value)]),
        render_inlines(label, Flow::SingleLine)
    )
}

fn tabs_list(triggers: &[Node]) -> String {
    let lines: Vec<String> = triggers
        .iter()
        .map(|node| match &node.attrs {
            Attrs::TabsTrigger { value } => trigger(value, &node.children),
            _ => render_inlines(std::slice::from_ref(node), Flow::SingleLine),
        })
        .collect();
    wrap("TabsList", &[], &lines)
}

/// Backtick fence unless the info string holds a backtick, which only a
/// tilde fence can carry.
fn code_block(language: &str, title: Option<&str>, code: &str) -> String {
    let mut info = language.to_string();
    if let Some(title) = title {
        if !info.is_empty() {
            info.push(' ');
        }
        info.push_str(&format!("title=\"{title}\""));
    }
    let marker = if info.contains('`') { '~' } else { '`' };
    let fence = marker.to_string().repeat(longest_run(code, marker).max(2) + 1);
    if code.is_empty() {
        format!("{fence}{info}\n{fence}")
    } else {
        format!("{fence}{info}\n{code}\n{fence}")
    }
}

/// JSX comment naming an orphaned panel. The value is escaped so that it
/// cannot end the comment.
fn orphan_marker(value: &str) -> String {
    let value = html_escape::encode_double_quoted_attribute(value).replace("*/", "*&#x2F;");
    format!("{{/* orphaned: no TabsTrigger with value \"{value}\" */}}")
}

fn attributes(attrs: &[(&str, &str)]) -> String {
    attrs
        .iter()
        .map(|(key, value)| {
            format!(
                " {key}=\"{}\"",
                html_escape::encode_double_quoted_attribute(value)
            )
        })
        .collect()
}

fn open_tag(name: &str, attrs: &[(&str, &str)]) -> String {
    format!("<{name}{}>", attributes(attrs))
}

fn self_closing(name: &str, attrs: &[(&str, &str)]) -> String {
    format!("<{name}{} />", attributes(attrs))
}

/// Open tag, one part per line, close tag.
fn wrap(name: &str, attrs: &[(&str, &str)], parts: &[String]) -> String {
    let mut out = open_tag(name, attrs);
    for part in parts {
        out.push('\n');
        out.push_str(part);
    }
    out.push_str(&format!("\n</{name}>"));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{AccordionType, CalloutType, Mark};
    use insta::assert_snapshot;
    use pretty_assertions::assert_eq;

    fn doc(children: Vec<Node>) -> Node {
        Node::doc(children)
    }

    #[test]
    fn empty_document_is_empty_text() {
        assert_eq!(export(&doc(vec![])), "");
    }

    #[test]
    fn callout_inline_form() {
        let tree = doc(vec![Node::callout(
            CalloutType::Warning,
            vec![Node::paragraph_text("Be careful")],
        )]);
        assert_eq!(
            export(&tree),
            "<Callout type=\"warning\">Be careful</Callout>\n"
        );
    }

    #[test]
    fn callout_block_form() {
        let tree = doc(vec![Node::callout(
            CalloutType::Error,
            vec![
                Node::paragraph_text("First"),
                Node::heading(2, vec![Node::text("Inside")]),
            ],
        )]);
        assert_snapshot!(export(&tree), @r#"
        <Callout type="error">
        First

        ## Inside
        </Callout>
        "#);
    }

    #[test]
    fn tabs_with_orphan_marker() {
        let tree = doc(vec![Node::new(
            Attrs::TabsContainer {
                default_value: "tab1".into(),
            },
            vec![
                Node::new(
                    Attrs::TabsList,
                    vec![
                        Node::tabs_trigger("tab1", "First"),
                        Node::tabs_trigger("tab2", "Second"),
                    ],
                ),
                Node::tabs_content("tab1", vec![Node::paragraph_text("One")]),
                Node::tabs_content("tab3", vec![Node::paragraph_text("Three")]),
            ],
        )]);
        assert_snapshot!(export(&tree), @r#"
        <Tabs defaultValue="tab1">
        <TabsList>
        <TabsTrigger value="tab1">First</TabsTrigger>
        <TabsTrigger value="tab2">Second</TabsTrigger>
        </TabsList>
        <TabsContent value="tab1">One</TabsContent>
        {/* orphaned: no TabsTrigger with value "tab3" */}
        <TabsContent value="tab3">Three</TabsContent>
        </Tabs>
        "#);

        let quiet = ExportOptions {
            orphan_markers: false,
            ..ExportOptions::default()
        };
        let text = export_document(&tree, &Frontmatter::default(), &quiet);
        assert!(!text.contains("orphaned"));
    }

    #[test]
    fn accordions_cards_and_viewers() {
        let tree = doc(vec![
            Node::new(
                Attrs::AccordionContainer {
                    accordion_type: AccordionType::Single,
                },
                vec![Node::new(
                    Attrs::AccordionItem {
                        title: "Q & A".into(),
                    },
                    vec![Node::paragraph_text("Answer")],
                )],
            ),
            Node::new(
                Attrs::Cards,
                vec![Node::new(
                    Attrs::Card {
                        title: "Docs".into(),
                        href: "#".into(),
                    },
                    vec![Node::paragraph_text("Read")],
                )],
            ),
            Node::leaf(Attrs::video_viewer("/intro.mp4")),
        ]);
        assert_snapshot!(export(&tree), @r##"
        <Accordions type="single">
        <Accordion title="Q &amp; A">Answer</Accordion>
        </Accordions>

        <Cards>
        <Card title="Docs" href="#">Read</Card>
        </Cards>

        <VideoViewer src="/intro.mp4" width="100%" height="400px" objectFit="contain" />
        "##);
    }

    #[test]
    fn table_pads_short_rows() {
        let cell = |attrs: Attrs, text: &str| Node::new(attrs, vec![Node::paragraph_text(text)]);
        let tree = doc(vec![Node::new(
            Attrs::Table,
            vec![
                Node::new(
                    Attrs::TableRow,
                    vec![cell(Attrs::TableHeader, "A"), cell(Attrs::TableHeader, "B")],
                ),
                Node::new(Attrs::TableRow, vec![cell(Attrs::TableCell, "a|1")]),
            ],
        )]);
        assert_snapshot!(export(&tree), @r"
        | A | B |
        | --- | --- |
        | a\|1 |  |
        ");
    }

    #[test]
    fn code_block_fence_outgrows_content() {
        let tree = doc(vec![Node::new(
            Attrs::CodeBlock {
                language: "md".into(),
                title: Some("demo.md".into()),
            },
            vec![Node::text("```\ninner\n```")],
        )]);
        assert_snapshot!(export(&tree), @r#"
        ````md title="demo.md"
        ```
        inner
        ```
        ````
        "#);
    }

    #[test]
    fn orphan_marker_cannot_close_early() {
        assert_eq!(
            orphan_marker("b*/}\"x"),
            "{/* orphaned: no TabsTrigger with value \"b*&#x2F;}&quot;x\" */}"
        );

        let tree = doc(vec![Node::new(
            Attrs::TabsContainer {
                default_value: "a".into(),
            },
            vec![
                Node::new(Attrs::TabsList, vec![Node::tabs_trigger("a", "A")]),
                Node::tabs_content("a", vec![Node::paragraph_text("Alpha")]),
                Node::tabs_content("b*/}", vec![Node::paragraph_text("Beta")]),
            ],
        )]);
        assert_eq!(crate::import(&export(&tree)), tree);
    }

    #[test]
    fn backtick_in_info_uses_tilde_fence() {
        let tree = doc(vec![Node::new(
            Attrs::CodeBlock {
                language: "js`x".into(),
                title: None,
            },
            vec![Node::text("let a;\n~~~~")],
        )]);
        let text = export(&tree);
        assert_eq!(text, "~~~~~js`x\nlet a;\n~~~~\n~~~~~\n");
        assert_eq!(crate::import(&text), tree);
    }

    #[test]
    fn nested_lists_indent_to_marker() {
        let item = |text: &str, extra: Vec<Node>| {
            let mut children = vec![Node::paragraph_text(text)];
            children.extend(extra);
            Node::new(Attrs::ListItem, children)
        };
        let nested = Node::new(Attrs::OrderedList, vec![item("inner", vec![])]);
        let tree = doc(vec![Node::new(
            Attrs::BulletList,
            vec![item("one", vec![nested]), item("two\nlines", vec![])],
        )]);
        assert_snapshot!(export(&tree), @r"
        - one
          1. inner
        - two
          lines
        ");
    }

    #[test]
    fn empty_first_paragraph_leaves_bare_marker() {
        let tree = doc(vec![Node::new(
            Attrs::BulletList,
            vec![Node::new(
                Attrs::ListItem,
                vec![
                    Node::paragraph(vec![]),
                    Node::heading(3, vec![Node::text("Title")]),
                ],
            )],
        )]);
        assert_eq!(export(&tree), "-\n\n  ### Title\n");
    }

    #[test]
    fn heading_with_id_and_trailing_hash() {
        let tree = doc(vec![
            Node::new(
                Attrs::Heading {
                    level: 2,
                    id: Some("setup".into()),
                },
                vec![Node::text("Set "), Node::marked_text("up", vec![Mark::Italic])],
            ),
            Node::heading(1, vec![Node::text("Learn C #")]),
        ]);
        assert_eq!(export(&tree), "## Set *up* {#setup}\n\n# Learn C \\#\n");
    }

    #[test]
    fn frontmatter_leads_the_document() {
        let frontmatter = Frontmatter {
            title: Some("Intro".into()),
            description: Some(String::new()),
            ..Frontmatter::default()
        };
        let text = export_document(
            &doc(vec![Node::leaf(Attrs::HorizontalRule)]),
            &frontmatter,
            &ExportOptions::default(),
        );
        assert_eq!(text, "---\ntitle: \"Intro\"\ndescription: \"\"\n---\n\n***\n");
    }
}
