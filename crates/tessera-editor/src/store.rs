//! Versioned document store.
//!
//! A single writer applies commands; readers take cheap `Arc` snapshots of
//! whichever version was current. Each successful edit installs a whole new
//! document and bumps the version, so any derived view can be cached on
//! `(frame, version)` and is never observed half-updated.
//!
//! Undo/redo is snapshot-based: the stack holds previous document versions,
//! and because rows are shared between versions the cost per step is one
//! table of pointers.

use crate::commands::{CommandError, DocumentCommand, Outcome, apply_command};
use crate::ids::{IdGenerator, SequentialIds};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tessera_core::{Document, ExpandConfig, ExpandedScene, NodeId, expand_with};

/// Configuration for `DocumentStore`.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Maximum number of cached expanded scenes.
    pub cache_capacity: usize,
    /// Maximum undo depth.
    pub history_depth: usize,
    /// Passed through to the expansion engine.
    pub expand: ExpandConfig,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 32,
            history_depth: 100,
            expand: ExpandConfig::default(),
        }
    }
}

/// One undoable step: the document before and after a command.
#[derive(Debug, Clone)]
struct HistoryEntry {
    before: Arc<Document>,
    after: Arc<Document>,
    description: &'static str,
}

pub struct DocumentStore {
    doc: Arc<Document>,
    version: u64,
    config: StoreConfig,
    ids: Box<dyn IdGenerator + Send>,
    /// Scenes for the current version, oldest first in `cache_order`.
    cache: HashMap<(NodeId, u64), Arc<ExpandedScene>>,
    cache_order: VecDeque<(NodeId, u64)>,
    undo_stack: VecDeque<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
}

impl DocumentStore {
    pub fn new(doc: Document) -> Self {
        Self::with_config(doc, StoreConfig::default())
    }

    pub fn with_config(doc: Document, config: StoreConfig) -> Self {
        Self::with_ids(doc, config, Box::new(SequentialIds::new()))
    }

    pub fn with_ids(doc: Document, config: StoreConfig, ids: Box<dyn IdGenerator + Send>) -> Self {
        Self {
            doc: Arc::new(doc),
            version: 0,
            config,
            ids,
            cache: HashMap::new(),
            cache_order: VecDeque::new(),
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// The current document. Stays valid however the store moves on.
    pub fn snapshot(&self) -> Arc<Document> {
        Arc::clone(&self.doc)
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Apply a command and make its result the new version.
    pub fn apply(&mut self, command: DocumentCommand) -> Result<Outcome, CommandError> {
        let applied = match apply_command(&self.doc, &command, self.ids.as_mut()) {
            Ok(applied) => applied,
            Err(e) => {
                log::warn!("{} rejected: {e}", command.description());
                return Err(e);
            }
        };
        log::debug!(
            "{} (v{} → v{}), {} node(s) removed",
            command.description(),
            self.version,
            self.version + 1,
            applied.outcome.removed.len()
        );

        let before = std::mem::replace(&mut self.doc, Arc::new(applied.document));
        self.push_undo(HistoryEntry {
            before,
            after: Arc::clone(&self.doc),
            description: command.description(),
        });
        self.bump();
        Ok(applied.outcome)
    }

    /// Install a whole document (e.g. after a load or a remote sync).
    /// Undoable like any command.
    pub fn replace(&mut self, doc: Document) {
        let before = std::mem::replace(&mut self.doc, Arc::new(doc));
        self.push_undo(HistoryEntry {
            before,
            after: Arc::clone(&self.doc),
            description: "replace document",
        });
        self.bump();
    }

    /// Restore the version before the last edit. Returns its description.
    pub fn undo(&mut self) -> Option<&'static str> {
        let entry = self.undo_stack.pop_back()?;
        self.doc = Arc::clone(&entry.before);
        let description = entry.description;
        self.redo_stack.push(entry);
        self.bump();
        Some(description)
    }

    pub fn redo(&mut self) -> Option<&'static str> {
        let entry = self.redo_stack.pop()?;
        self.doc = Arc::clone(&entry.after);
        let description = entry.description;
        self.undo_stack.push_back(entry);
        self.bump();
        Some(description)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// The expanded scene of `frame` at the current version, computed at
    /// most once per version. `None` if the frame does not exist.
    pub fn expanded(&mut self, frame: NodeId) -> Option<Arc<ExpandedScene>> {
        let key = (frame, self.version);
        if let Some(scene) = self.cache.get(&key) {
            return Some(Arc::clone(scene));
        }

        let scene = Arc::new(expand_with(frame, &self.doc, &self.config.expand)?);
        if self.config.cache_capacity > 0 {
            while self.cache.len() >= self.config.cache_capacity {
                let Some(oldest) = self.cache_order.pop_front() else {
                    break;
                };
                self.cache.remove(&oldest);
            }
            self.cache.insert(key, Arc::clone(&scene));
            self.cache_order.push_back(key);
        }
        Some(scene)
    }

    /// Number of scenes currently cached.
    pub fn cached_scenes(&self) -> usize {
        self.cache.len()
    }

    fn push_undo(&mut self, entry: HistoryEntry) {
        self.undo_stack.push_back(entry);
        while self.undo_stack.len() > self.config.history_depth {
            self.undo_stack.pop_front();
        }
        self.redo_stack.clear();
    }

    /// Advance the version and drop scenes of older versions.
    fn bump(&mut self) {
        self.version += 1;
        let version = self.version;
        self.cache.retain(|(_, v), _| *v == version);
        self.cache_order.retain(|(_, v)| *v == version);
    }
}
