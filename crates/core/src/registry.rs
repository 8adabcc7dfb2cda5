//! Node Type Registry: the content model of every node kind.
//!
//! [`validate`] is the single gate every tree mutation and every imported
//! custom block passes through. It is pure and inspects only the proposed
//! attributes and the direct children; [`validate_tree`] applies it to a
//! whole subtree.

use crate::error::{Rule, Violation};
use crate::node::{Attrs, Node, NodeKind};
use std::collections::HashSet;

/// Which children a kind accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildGroup {
    /// No children at all.
    Leaf,
    /// Block-level nodes.
    Block,
    /// Text, hard breaks and images.
    Inline,
    /// Unmarked text only.
    PlainText,
    /// One specific kind.
    Only(NodeKind),
    /// One tabs list followed by tabs content panels.
    TabsPanels,
    /// Header or body cells.
    Cells,
}

/// Declarative content model for one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentModel {
    /// Accepted children.
    pub children: ChildGroup,
    /// Minimum number of children.
    pub min_children: usize,
}

impl ContentModel {
    const fn new(children: ChildGroup, min_children: usize) -> Self {
        Self {
            children,
            min_children,
        }
    }

    /// True when an empty paragraph keeps this kind valid once its last child
    /// is removed.
    pub const fn fills_with_paragraph(&self) -> bool {
        matches!(self.children, ChildGroup::Block) && self.min_children > 0
    }
}

/// Content model for `kind`.
pub const fn content_model(kind: NodeKind) -> ContentModel {
    use ChildGroup::*;
    match kind {
        NodeKind::Doc => ContentModel::new(Block, 0),
        NodeKind::Paragraph | NodeKind::Heading | NodeKind::TabsTrigger => {
            ContentModel::new(Inline, 0)
        }
        NodeKind::Text
        | NodeKind::Image
        | NodeKind::PdfViewer
        | NodeKind::VideoViewer
        | NodeKind::HorizontalRule
        | NodeKind::HardBreak => ContentModel::new(Leaf, 0),
        NodeKind::Callout
        | NodeKind::TabsContent
        | NodeKind::AccordionItem
        | NodeKind::Card
        | NodeKind::TableCell
        | NodeKind::TableHeader
        | NodeKind::ListItem => ContentModel::new(Block, 1),
        NodeKind::TabsContainer => ContentModel::new(TabsPanels, 2),
        NodeKind::TabsList => ContentModel::new(Only(NodeKind::TabsTrigger), 1),
        NodeKind::AccordionContainer => ContentModel::new(Only(NodeKind::AccordionItem), 1),
        NodeKind::Cards => ContentModel::new(Only(NodeKind::Card), 1),
        NodeKind::Table => ContentModel::new(Only(NodeKind::TableRow), 1),
        NodeKind::TableRow => ContentModel::new(Cells, 1),
        NodeKind::BulletList | NodeKind::OrderedList => {
            ContentModel::new(Only(NodeKind::ListItem), 1)
        }
        NodeKind::CodeBlock => ContentModel::new(PlainText, 0),
    }
}

/// Checks a proposed node against its kind's content model.
pub fn validate(kind: NodeKind, children: &[Node], attrs: &Attrs) -> Result<(), Violation> {
    let fail = |rule| Err(Violation::new(kind, rule));

    if attrs.kind() != kind {
        return fail(Rule::AttrsKindMismatch {
            found: attrs.kind(),
        });
    }

    match attrs {
        Attrs::Heading { level, .. } if !(1..=4).contains(level) => {
            return fail(Rule::HeadingLevel(*level));
        }
        Attrs::Text { text, .. } if text.is_empty() => return fail(Rule::EmptyText),
        Attrs::TabsTrigger { value } if value.is_empty() => {
            return fail(Rule::EmptyTriggerValue);
        }
        Attrs::AccordionItem { title } if title.trim().is_empty() => {
            return fail(Rule::EmptyTitle);
        }
        _ => {}
    }

    let model = content_model(kind);
    if matches!(model.children, ChildGroup::Leaf) {
        return if children.is_empty() {
            Ok(())
        } else {
            fail(Rule::LeafWithChildren)
        };
    }
    if children.len() < model.min_children {
        if kind == NodeKind::TabsContainer {
            return fail(Rule::TabsListFirst);
        }
        return fail(Rule::TooFewChildren {
            min: model.min_children,
        });
    }

    for (index, child) in children.iter().enumerate() {
        let child_kind = child.kind();
        let allowed = match model.children {
            ChildGroup::Leaf => false,
            ChildGroup::Block => child_kind.is_block(),
            ChildGroup::Inline => child_kind.is_inline(),
            ChildGroup::PlainText => child_kind == NodeKind::Text,
            ChildGroup::Only(only) => child_kind == only,
            ChildGroup::Cells => {
                matches!(child_kind, NodeKind::TableCell | NodeKind::TableHeader)
            }
            ChildGroup::TabsPanels => {
                let expected = if index == 0 {
                    NodeKind::TabsList
                } else {
                    NodeKind::TabsContent
                };
                if child_kind != expected {
                    return fail(Rule::TabsListFirst);
                }
                true
            }
        };
        if !allowed {
            return fail(Rule::DisallowedChild {
                child: child_kind,
                index,
            });
        }
    }

    match kind {
        NodeKind::TabsList => check_trigger_values(children).map_err(|rule| Violation::new(kind, rule)),
        NodeKind::ListItem if children[0].kind() != NodeKind::Paragraph => {
            fail(Rule::ListItemParagraphFirst)
        }
        NodeKind::CodeBlock => {
            let marked = children
                .iter()
                .any(|c| matches!(&c.attrs, Attrs::Text { marks, .. } if !marks.is_empty()));
            if marked { fail(Rule::MarkedCode) } else { Ok(()) }
        }
        NodeKind::Table => check_table_shape(children).map_err(|rule| Violation::new(kind, rule)),
        _ => Ok(()),
    }
}

fn check_trigger_values(triggers: &[Node]) -> Result<(), Rule> {
    let mut seen = HashSet::new();
    for trigger in triggers {
        if let Attrs::TabsTrigger { value } = &trigger.attrs
            && !seen.insert(value.as_str())
        {
            return Err(Rule::DuplicateTriggerValue(value.clone()));
        }
    }
    Ok(())
}

fn check_table_shape(rows: &[Node]) -> Result<(), Rule> {
    let expected = rows[0].children.len();
    for (row, node) in rows.iter().enumerate() {
        let wanted = if row == 0 {
            NodeKind::TableHeader
        } else {
            NodeKind::TableCell
        };
        if node.children.iter().any(|cell| cell.kind() != wanted) {
            return Err(Rule::HeaderCellPlacement { row });
        }
        if node.children.len() != expected {
            return Err(Rule::RowWidth {
                row,
                expected,
                found: node.children.len(),
            });
        }
    }
    Ok(())
}

/// Validates `node` and all of its descendants, reporting the first failure
/// in document order.
pub fn validate_tree(node: &Node) -> Result<(), Violation> {
    validate(node.kind(), &node.children, &node.attrs)?;
    node.children.iter().try_for_each(validate_tree)
}

/// Trigger values declared by a tabs container's list, in order.
pub fn trigger_values(tabs: &Node) -> Vec<&str> {
    tabs.children
        .iter()
        .filter(|c| c.kind() == NodeKind::TabsList)
        .flat_map(|list| list.children.iter())
        .filter_map(|trigger| match &trigger.attrs {
            Attrs::TabsTrigger { value } => Some(value.as_str()),
            _ => None,
        })
        .collect()
}

/// True when a tabs content panel's value has no trigger in `tabs`.
pub fn is_orphaned(tabs: &Node, content: &Node) -> bool {
    match &content.attrs {
        Attrs::TabsContent { value } => !trigger_values(tabs).contains(&value.as_str()),
        _ => false,
    }
}
