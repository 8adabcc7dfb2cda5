#![deny(missing_docs)]
//! mdxwiki core: the extended-Markdown transcoding engine behind the wiki
//! editor.
//!
//! Text is imported into a typed [`Node`] tree, edited through [`Document`]
//! under the rules of the node type registry, and exported back to canonical
//! text. Importing the exported text yields an equal tree.
//!
//! ```
//! use mdxwiki_core::{export, import};
//!
//! let doc = import("<Callout type=\"warning\">Be careful</Callout>\n");
//! assert_eq!(export(&doc), "<Callout type=\"warning\">Be careful</Callout>\n");
//! ```

/// Code fence detection utilities.
pub mod code_fence;
/// Import diagnostics and registry violations.
pub mod error;
/// Text Exporter.
pub mod export;
/// YAML frontmatter extraction and rendering.
pub mod frontmatter;
/// Text Importer.
pub mod import;
/// Node kinds, attributes, marks and paths.
pub mod node;
/// Engine configuration.
pub mod options;
/// Node type registry and structural validation.
pub mod registry;
/// Slug generation utilities.
pub mod slug;
/// Table-of-contents extraction.
pub mod toc;
/// Mutable document tree.
pub mod tree;

pub use error::{Diagnostics, ImportWarning, Rule, SourceLocation, Violation};
pub use export::{export, export_document};
pub use frontmatter::{
    Frontmatter, FrontmatterError, FrontmatterExtraction, extract_frontmatter, render_frontmatter,
};
pub use import::{ImportOutcome, ImportPipeline, import, import_with_options};
pub use node::{AccordionType, Attrs, CalloutType, Mark, Node, NodeKind, NodePath};
pub use options::{ConfigError, EngineConfig, ExportOptions, ImportOptions};
pub use registry::{ChildGroup, ContentModel, content_model, validate, validate_tree};
pub use slug::{Slugger, extract_custom_id, slugify};
pub use toc::{OutlineEntry, outline, outline_of};
pub use tree::{Document, TreeError};
