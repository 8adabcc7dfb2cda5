//! Table-of-contents extraction.
//!
//! [`outline`] reads raw text line by line with the importer's heading rule;
//! [`outline_of`] walks an imported tree. Both assign anchors the same way.

use crate::code_fence::FenceTracker;
use crate::frontmatter::extract_frontmatter;
use crate::import::{heading_line, list_marker, parse_inlines};
use crate::node::{Attrs, Node};
use crate::slug::Slugger;
use serde::Serialize;

/// One heading in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutlineEntry {
    /// Heading text with inline markup stripped.
    pub title: String,
    /// Explicit `{#id}` or a generated slug, unique within the document.
    pub anchor: String,
    /// Heading level, 1-4.
    pub depth: u8,
}

struct Found {
    title: String,
    id: Option<String>,
    depth: u8,
}

/// Outline of raw extended-Markdown text.
///
/// Fenced code and frontmatter are skipped. Lines belonging to a list are
/// skipped too, so headings nested in list items only show up in
/// [`outline_of`].
pub fn outline(text: &str) -> Vec<OutlineEntry> {
    let body = match extract_frontmatter(text) {
        Ok(extraction) => &text[extraction.body_start..],
        Err(err) => {
            log::debug!("outlining whole text, frontmatter unreadable: {err}");
            text
        }
    };

    let mut fences = FenceTracker::new();
    let mut in_list = false;
    let mut found = Vec::new();
    for line in body.lines() {
        if fences.advance(line) {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        if list_marker(line).is_some() {
            in_list = true;
            continue;
        }
        if in_list && line.starts_with([' ', '\t']) {
            continue;
        }
        in_list = false;

        if let Some(heading) = heading_line(line) {
            found.push(Found {
                title: Node::paragraph(parse_inlines(heading.text)).text_content(),
                id: heading.id.map(str::to_string),
                depth: heading.level,
            });
        }
    }
    assign_anchors(found)
}

/// Outline of a document tree, in document order.
pub fn outline_of(root: &Node) -> Vec<OutlineEntry> {
    let mut found = Vec::new();
    root.walk(&mut |node, _| {
        if let Attrs::Heading { level, id } = &node.attrs {
            found.push(Found {
                title: node.text_content(),
                id: id.clone(),
                depth: *level,
            });
        }
    });
    assign_anchors(found)
}

fn assign_anchors(found: Vec<Found>) -> Vec<OutlineEntry> {
    let mut slugger = Slugger::new();
    for id in found.iter().filter_map(|f| f.id.as_deref()) {
        slugger.reserve(id);
    }
    found
        .into_iter()
        .map(|f| OutlineEntry {
            anchor: f.id.unwrap_or_else(|| slugger.next_slug(&f.title)),
            title: f.title,
            depth: f.depth,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::import::import;
    use pretty_assertions::assert_eq;

    fn entry(title: &str, anchor: &str, depth: u8) -> OutlineEntry {
        OutlineEntry {
            title: title.to_string(),
            anchor: anchor.to_string(),
            depth,
        }
    }

    #[test]
    fn strips_markup_and_suffixes_duplicates() {
        let text = "# Getting **started**\n\n## Setup\n\ntext\n\n## Setup\n\n### Setup {#setup-1}\n";
        assert_eq!(
            outline(text),
            vec![
                entry("Getting started", "getting-started", 1),
                entry("Setup", "setup", 2),
                entry("Setup", "setup-2", 2),
                entry("Setup", "setup-1", 3),
            ]
        );
    }

    #[test]
    fn skips_frontmatter_and_fenced_code() {
        let text = "---\ntitle: \"# Not\"\n---\n\n```md\n# Also not\n```\n\n## Real\n";
        assert_eq!(outline(text), vec![entry("Real", "real", 2)]);
    }

    #[test]
    fn text_and_tree_agree_for_block_level_headings() {
        let text = "# Intro\n\n<Callout type=\"info\">\n## Inside *callout*\n</Callout>\n\n## Intro\n";
        let from_text = outline(text);
        assert_eq!(from_text, outline_of(&import(text)));
        assert_eq!(
            from_text,
            vec![
                entry("Intro", "intro", 1),
                entry("Inside callout", "inside-callout", 2),
                entry("Intro", "intro-1", 2),
            ]
        );
    }

    #[test]
    fn list_item_headings_only_in_tree_outline() {
        let text = "- item\n\n  ### Nested\n\n# Top\n";
        assert_eq!(outline(text), vec![entry("Top", "top", 1)]);
        assert_eq!(
            outline_of(&import(text)),
            vec![entry("Nested", "nested", 3), entry("Top", "top", 1)]
        );
    }

    #[test]
    fn outline_serializes_for_navigation() {
        let json = serde_json::to_string(&outline("## A b")).unwrap();
        assert_eq!(json, r#"[{"title":"A b","anchor":"a-b","depth":2}]"#);
    }
}
