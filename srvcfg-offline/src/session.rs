use std::path::Path;

use anyhow::{Context, Result};
use srvcfg_core::TransformFailed;

use crate::{
    document::{Document, Element},
    file::ConfigFile,
    params::Parameters,
    subtree::Subtree,
    template::TransformRegistry,
};

/// One configuration document being edited offline.
///
/// Transforms are all-or-nothing: a template edits a copy of the selected
/// element and the copy replaces the original only if the template succeeds.
pub struct OfflineSession {
    file: Option<ConfigFile>,
    document: Document,
    registry: TransformRegistry,
    /// Applied to subsystem selectors that do not name a profile.
    profile: Option<String>,
}

impl OfflineSession {
    pub fn open<P: AsRef<Path>>(path: P, registry: TransformRegistry) -> Result<OfflineSession> {
        Self::from_file(ConfigFile::open(path)?, registry)
    }

    /// Opens a file for reading only, under a shared lock. Transforms still
    /// edit the in-memory document; [`OfflineSession::save`] fails.
    pub fn open_read_only<P: AsRef<Path>>(
        path: P,
        registry: TransformRegistry,
    ) -> Result<OfflineSession> {
        Self::from_file(ConfigFile::open_read_only(path)?, registry)
    }

    fn from_file(file: ConfigFile, registry: TransformRegistry) -> Result<OfflineSession> {
        let document = Document::parse(file.contents())
            .with_context(|| format!("Could not parse {}", file.path().display()))?;
        Ok(OfflineSession {
            file: Some(file),
            document,
            registry,
            profile: None,
        })
    }

    /// A session that is not backed by a file; [`OfflineSession::save`]
    /// fails.
    pub fn from_document(document: Document, registry: TransformRegistry) -> OfflineSession {
        OfflineSession {
            file: None,
            document,
            registry,
            profile: None,
        }
    }

    /// Selects the profile whose subsystems are edited, for documents with
    /// several profiles.
    pub fn set_profile(&mut self, profile: Option<&str>) {
        self.profile = profile.map(str::to_string);
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    fn scoped(&self, subtree: &Subtree) -> Subtree {
        subtree.clone().in_profile(self.profile.as_deref())
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn registry(&self) -> &TransformRegistry {
        &self.registry
    }

    /// The element selected by `subtree`.
    pub fn read(&self, subtree: &Subtree) -> Result<&Element> {
        let subtree = self.scoped(subtree);
        let path = subtree.locate(&self.document)?;
        self.document
            .element_at(&path)
            .with_context(|| format!("{} moved while reading it", subtree))
    }

    pub fn transform(&mut self, subtree: &Subtree, template: &str, params: &Parameters) -> Result<()> {
        let subtree = self.scoped(subtree);
        let transform = self.registry.get(template)?;
        let path = subtree.locate(&self.document)?;
        let mut edited = self
            .document
            .element_at(&path)
            .with_context(|| format!("{} moved while editing it", subtree))?
            .clone();
        tracing::debug!(%subtree, template, "applying transform");
        transform.apply(&mut edited, params).map_err(|mut e| {
            if let Some(failed) = e.downcast_mut::<TransformFailed>() {
                failed.subtree = subtree.to_string();
            }
            e
        })?;
        if let Some(selected) = self.document.element_at_mut(&path) {
            *selected = edited;
        }
        Ok(())
    }

    /// Writes the document back to the file it was opened from.
    pub fn save(&mut self) -> Result<()> {
        let contents = self.document.to_xml_string();
        match &mut self.file {
            Some(file) => file.write(&contents),
            None => anyhow::bail!("This session is not backed by a file"),
        }
    }
}
