use crate::node::NodeKind;
use std::fmt;

/// Source location information for import diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// Line number (1-indexed)
    pub line: usize,
    /// Column number (1-indexed)
    pub column: usize,
}

impl SourceLocation {
    /// Create a new source location
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Location of byte `offset` inside `source`.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = &source[..offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;
        Self { line, column }
    }

    /// Shift a location found in a nested span by the span's own location.
    pub(crate) fn relative_to(self, origin: SourceLocation) -> Self {
        if self.line == 1 {
            Self::new(origin.line, origin.column + self.column - 1)
        } else {
            Self::new(origin.line + self.line - 1, self.column)
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Non-fatal conditions reported while importing text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportWarning {
    /// A span matched no rule and was kept verbatim inside a paragraph.
    ImportFallback {
        /// Where the span starts.
        location: SourceLocation,
        /// Why the span could not be recognized.
        reason: String,
    },
    /// A table row had a different cell count than the header row.
    TableShapeMismatch {
        /// Where the row starts.
        location: SourceLocation,
        /// Header cell count.
        expected: usize,
        /// Cell count found in the source row.
        found: usize,
    },
    /// A `TabsContent` value matches no sibling trigger.
    OrphanedReference {
        /// Where the content tag starts.
        location: SourceLocation,
        /// The unmatched value.
        value: String,
    },
    /// A `Callout` type outside the known set; imported as `info`.
    UnknownCalloutType {
        /// Where the callout starts.
        location: SourceLocation,
        /// The value found in the source.
        value: String,
    },
    /// Code fence opened but never closed
    UnclosedCodeFence {
        /// Source location where the fence started
        location: SourceLocation,
        /// Fence marker character (backtick or tilde)
        marker: char,
    },
    /// The frontmatter block could not be used and was kept as body text.
    Frontmatter {
        /// Always the first line.
        location: SourceLocation,
        /// Underlying frontmatter error.
        message: String,
    },
}

impl ImportWarning {
    /// Get the location of this warning
    pub fn location(&self) -> SourceLocation {
        match self {
            ImportWarning::ImportFallback { location, .. }
            | ImportWarning::TableShapeMismatch { location, .. }
            | ImportWarning::OrphanedReference { location, .. }
            | ImportWarning::UnknownCalloutType { location, .. }
            | ImportWarning::UnclosedCodeFence { location, .. }
            | ImportWarning::Frontmatter { location, .. } => *location,
        }
    }

    pub(crate) fn with_location(mut self, new_location: SourceLocation) -> Self {
        match &mut self {
            ImportWarning::ImportFallback { location, .. }
            | ImportWarning::TableShapeMismatch { location, .. }
            | ImportWarning::OrphanedReference { location, .. }
            | ImportWarning::UnknownCalloutType { location, .. }
            | ImportWarning::UnclosedCodeFence { location, .. }
            | ImportWarning::Frontmatter { location, .. } => *location = new_location,
        }
        self
    }
}

impl fmt::Display for ImportWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportWarning::ImportFallback { location, reason } => {
                write!(f, "{location}: kept verbatim: {reason}")
            }
            ImportWarning::TableShapeMismatch {
                location,
                expected,
                found,
            } => write!(
                f,
                "{location}: table row has {found} cells, header has {expected}"
            ),
            ImportWarning::OrphanedReference { location, value } => {
                write!(f, "{location}: no TabsTrigger with value \"{value}\"")
            }
            ImportWarning::UnknownCalloutType { location, value } => {
                write!(f, "{location}: unknown callout type \"{value}\", using info")
            }
            ImportWarning::UnclosedCodeFence { location, marker } => {
                write!(f, "{location}: unclosed code fence ({marker})")
            }
            ImportWarning::Frontmatter { location, message } => {
                write!(f, "{location}: frontmatter ignored: {message}")
            }
        }
    }
}

/// Warnings collected during one import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    /// Warnings in the order they were found.
    pub warnings: Vec<ImportWarning>,
}

impl Diagnostics {
    /// Create a new empty diagnostics collection
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a warning and forward it to the `log` facade.
    pub fn push(&mut self, warning: ImportWarning) {
        log::warn!("{warning}");
        self.warnings.push(warning);
    }

    /// Check if there are any warnings
    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Number of warnings.
    pub fn len(&self) -> usize {
        self.warnings.len()
    }

    /// Iterate over warnings.
    pub fn iter(&self) -> std::slice::Iter<'_, ImportWarning> {
        self.warnings.iter()
    }

    /// Move warnings from a nested import, rebasing their locations.
    pub(crate) fn absorb(&mut self, nested: Diagnostics, origin: SourceLocation) {
        for warning in nested.warnings {
            let location = warning.location().relative_to(origin);
            self.warnings.push(warning.with_location(location));
        }
    }
}

/// The content-model rule a proposed node breaks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rule {
    /// The attribute record belongs to another kind.
    #[error("attributes describe a {found} node")]
    AttrsKindMismatch {
        /// Kind the attributes belong to.
        found: NodeKind,
    },
    /// A child kind is not allowed here.
    #[error("{child} is not allowed at child index {index}")]
    DisallowedChild {
        /// Offending child kind.
        child: NodeKind,
        /// Its position.
        index: usize,
    },
    /// Fewer children than the content model requires.
    #[error("requires at least {min} child node(s)")]
    TooFewChildren {
        /// Required minimum.
        min: usize,
    },
    /// A leaf kind was given children.
    #[error("leaf nodes cannot have children")]
    LeafWithChildren,
    /// A tabs container must start with exactly one tabs list.
    #[error("must contain one tabs-list followed by tabs-content panels")]
    TabsListFirst,
    /// Two triggers share a value.
    #[error("duplicate trigger value \"{0}\"")]
    DuplicateTriggerValue(String),
    /// A trigger value is empty.
    #[error("trigger value must not be empty")]
    EmptyTriggerValue,
    /// An accordion item title is empty.
    #[error("accordion title must not be empty")]
    EmptyTitle,
    /// Heading level outside 1..=4.
    #[error("heading level {0} is outside 1..=4")]
    HeadingLevel(u8),
    /// A table row's width differs from the header row.
    #[error("row {row} has {found} cells, header has {expected}")]
    RowWidth {
        /// Row index.
        row: usize,
        /// Header width.
        expected: usize,
        /// Row width.
        found: usize,
    },
    /// Header cells outside row 0, or body cells inside it.
    #[error("row {row} mixes header and body cells")]
    HeaderCellPlacement {
        /// Row index.
        row: usize,
    },
    /// A list item must open with a paragraph.
    #[error("list items must start with a paragraph")]
    ListItemParagraphFirst,
    /// Code block text carries marks.
    #[error("code block text cannot carry marks")]
    MarkedCode,
    /// A text run is empty.
    #[error("text nodes must not be empty")]
    EmptyText,
}

/// A rejected structure: which kind, and which rule failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: {rule}")]
pub struct Violation {
    /// Kind whose content model was checked.
    pub kind: NodeKind,
    /// Failed rule.
    pub rule: Rule,
}

impl Violation {
    /// Build a violation.
    pub fn new(kind: NodeKind, rule: Rule) -> Self {
        Self { kind, rule }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn location_from_offset_counts_lines_and_chars() {
        let src = "ab\ncdé\nfg";
        assert_eq!(SourceLocation::from_offset(src, 0), SourceLocation::new(1, 1));
        assert_eq!(SourceLocation::from_offset(src, 3), SourceLocation::new(2, 1));
        let g = src.find('g').unwrap();
        assert_eq!(SourceLocation::from_offset(src, g), SourceLocation::new(3, 2));
    }

    #[test]
    fn nested_locations_are_rebased() {
        let origin = SourceLocation::new(4, 10);
        assert_eq!(
            SourceLocation::new(1, 3).relative_to(origin),
            SourceLocation::new(4, 12)
        );
        assert_eq!(
            SourceLocation::new(2, 3).relative_to(origin),
            SourceLocation::new(5, 3)
        );
    }

    #[test]
    fn violation_display_names_kind_and_rule() {
        let v = Violation::new(
            NodeKind::TabsList,
            Rule::DuplicateTriggerValue("tab1".into()),
        );
        assert_eq!(
            v.to_string(),
            "invalid tabs-list: duplicate trigger value \"tab1\""
        );
    }
}
