//! One editor session: load, import, mutate, export, save.

use crate::{DocumentStore, StoreError};
use mdxwiki_core::{
    Diagnostics, Document, EngineConfig, Frontmatter, OutlineEntry, export_document,
    import_with_options, outline_of,
};
use relative_path::{RelativePath, RelativePathBuf};

const DEFAULT_TITLE: &str = "Untitled";

/// The single writer of one document's tree.
#[derive(Debug)]
pub struct EditingSession<'s, S: DocumentStore + ?Sized> {
    store: &'s S,
    path: RelativePathBuf,
    config: EngineConfig,
    document: Document,
    frontmatter: Frontmatter,
    diagnostics: Diagnostics,
}

impl<'s, S: DocumentStore + ?Sized> EditingSession<'s, S> {
    /// Loads and imports the document at `path`.
    pub fn open(store: &'s S, path: &RelativePath) -> Result<Self, StoreError> {
        Self::open_with_config(store, path, EngineConfig::default())
    }

    /// Like [`EditingSession::open`] with explicit engine settings.
    pub fn open_with_config(
        store: &'s S,
        path: &RelativePath,
        config: EngineConfig,
    ) -> Result<Self, StoreError> {
        let text = store.load(path)?;
        let outcome = import_with_options(&text, &config.import);
        if !outcome.diagnostics.is_empty() {
            log::info!("{path}: {} import warning(s)", outcome.diagnostics.len());
        }
        Ok(Self {
            store,
            path: path.to_relative_path_buf(),
            config,
            document: Document::from(outcome.doc),
            frontmatter: outcome.frontmatter,
            diagnostics: outcome.diagnostics,
        })
    }

    /// Starts an empty document that will be saved to `path`.
    pub fn new_document(store: &'s S, path: &RelativePath) -> Self {
        Self {
            store,
            path: path.to_relative_path_buf(),
            config: EngineConfig::default(),
            document: Document::new(),
            frontmatter: Frontmatter::default(),
            diagnostics: Diagnostics::new(),
        }
    }

    /// Logical path the session saves to.
    pub fn path(&self) -> &RelativePath {
        &self.path
    }

    /// The tree.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// The tree, for mutation.
    pub fn document_mut(&mut self) -> &mut Document {
        &mut self.document
    }

    /// Metadata parked from the frontmatter block.
    pub fn frontmatter(&self) -> &Frontmatter {
        &self.frontmatter
    }

    /// Metadata, for editing.
    pub fn frontmatter_mut(&mut self) -> &mut Frontmatter {
        &mut self.frontmatter
    }

    /// Warnings raised when the document was opened.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Navigation outline of the current tree.
    pub fn outline(&self) -> Vec<OutlineEntry> {
        outline_of(self.document.root())
    }

    /// Current text, with the frontmatter as edited.
    pub fn export(&self) -> String {
        export_document(self.document.root(), &self.frontmatter, &self.config.export)
    }

    /// Exports with a `title` and `description` always present, then hands
    /// the text to the store.
    pub fn save(&self) -> Result<(), StoreError> {
        let mut frontmatter = self.frontmatter.clone();
        if frontmatter.title.as_deref().is_none_or(str::is_empty) {
            frontmatter.title = Some(DEFAULT_TITLE.to_string());
        }
        frontmatter.description.get_or_insert_with(String::new);

        let text = export_document(self.document.root(), &frontmatter, &self.config.export);
        self.store.save(&self.path, &text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FsStore, MemoryStore};
    use mdxwiki_core::{CalloutType, Node, NodePath};
    use pretty_assertions::assert_eq;

    #[test]
    fn open_edit_save_reload() {
        let store = MemoryStore::with_documents([(
            "guide",
            "---\ntitle: \"Guide\"\n---\n\n# Guide\n\nIntro.\n",
        )])
        .unwrap();

        let mut session = EditingSession::open(&store, RelativePath::new("guide")).unwrap();
        assert_eq!(session.frontmatter().title.as_deref(), Some("Guide"));
        session
            .document_mut()
            .insert_child(
                &NodePath::root(),
                2,
                Node::callout(CalloutType::Info, vec![Node::paragraph_text("Added")]),
            )
            .unwrap();
        session.save().unwrap();

        let saved = store.load(RelativePath::new("guide")).unwrap();
        assert_eq!(
            saved,
            "---\ntitle: \"Guide\"\ndescription: \"\"\n---\n\n# Guide\n\nIntro.\n\n<Callout type=\"info\">Added</Callout>\n"
        );

        let reopened = EditingSession::open(&store, RelativePath::new("guide")).unwrap();
        assert_eq!(reopened.document(), session.document());
        assert_eq!(reopened.outline()[0].anchor, "guide");
    }

    #[test]
    fn new_document_saves_default_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStore::new(dir.path());
        let mut session = EditingSession::new_document(&store, RelativePath::new("docs/new"));
        session
            .document_mut()
            .insert_child(&NodePath::root(), 0, Node::paragraph_text("Hello"))
            .unwrap();
        assert_eq!(session.export(), "Hello\n");

        session.save().unwrap();
        let written = std::fs::read_to_string(dir.path().join("docs/new.mdx")).unwrap();
        assert_eq!(written, "---\ntitle: \"Untitled\"\ndescription: \"\"\n---\n\nHello\n");
    }

    #[test]
    fn store_errors_pass_through() {
        let store = MemoryStore::new();
        assert!(matches!(
            EditingSession::open(&store, RelativePath::new("missing")),
            Err(StoreError::NotFound(_))
        ));

        let session = EditingSession::new_document(&store, RelativePath::new("../outside"));
        assert!(matches!(session.save(), Err(StoreError::OutsideRoot(_))));
    }
}
