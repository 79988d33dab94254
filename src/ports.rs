//! Contracts to the engine services this crate depends on but does not own:
//! resource loading, trigger-shorthand expansion, and script callback
//! invocation. The world core only ever talks to these traits; how documents
//! are fetched or handlers executed is the embedder's business.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{error, info};
use serde_json::Value;

/// Synchronous loader for structured (JSON-like) documents, used for entity
/// descriptors. Failures are logged by the implementation; callers only see
/// `None`.
pub trait ResourceLoader {
    fn load_json(&self, path: &str) -> Option<Value>;
}

/// Filesystem-backed loader resolving paths relative to a data root.
pub struct FsResources {
    root: PathBuf,
}

impl FsResources {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }
}

impl ResourceLoader for FsResources {
    fn load_json(&self, path: &str) -> Option<Value> {
        let full = self.root.join(path);
        let text = match std::fs::read_to_string(&full) {
            Ok(t) => t,
            Err(e) => {
                error!("resource: could not read {}: {}", full.display(), e);
                return None;
            }
        };
        match serde_json::from_str(&text) {
            Ok(v) => Some(v),
            Err(e) => {
                error!("resource: could not parse {}: {}", full.display(), e);
                None
            }
        }
    }
}

/// In-memory loader, for tests and for embedders that pre-stage documents.
#[derive(Default)]
pub struct MemoryResources {
    documents: HashMap<String, Value>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, path: impl Into<String>, document: Value) {
        self.documents.insert(path.into(), document);
    }
}

impl ResourceLoader for MemoryResources {
    fn load_json(&self, path: &str) -> Option<Value> {
        self.documents.get(path).cloned()
    }
}

/// Expands map-author trigger shorthands into their canonical
/// `event -> handler` form during the overlay-merge pass.
pub trait TriggerExpander {
    /// Is this property key a registered shorthand?
    fn is_custom_trigger(&self, key: &str) -> bool;

    /// Expand a shorthand key/value into `(event_name, handler_descriptor)`.
    /// Returns None if the key is not a registered shorthand.
    fn expand(&self, key: &str, value: &str) -> Option<(String, String)>;
}

/// Expander with no registered shorthands.
pub struct NoTriggers;

impl TriggerExpander for NoTriggers {
    fn is_custom_trigger(&self, _key: &str) -> bool {
        false
    }

    fn expand(&self, _key: &str, _value: &str) -> Option<(String, String)> {
        None
    }
}

/// A `module,function` handler reference from an entity descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptHook {
    pub module: String,
    pub function: String,
}

impl ScriptHook {
    /// Parse a `"module,function"` string. Returns None for anything else.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(',');
        let module = parts.next()?.trim();
        let function = parts.next()?.trim();
        if module.is_empty() || function.is_empty() || parts.next().is_some() {
            return None;
        }
        Some(Self {
            module: module.to_string(),
            function: function.to_string(),
        })
    }
}

/// Fire-and-forget invocation of game-logic callbacks (on-insert, on-kill,
/// spawn triggers). The entity involved is identified by id; the embedder's
/// script layer resolves it back through the manager if it needs state.
pub trait ScriptPort {
    fn call(&mut self, module: &str, function: &str, eid: u64);
}

/// Script port that logs calls and discards them. Useful headless.
pub struct NullScript;

impl ScriptPort for NullScript {
    fn call(&mut self, module: &str, function: &str, eid: u64) {
        info!("script: {}:{}() for entity {} (no script layer)", module, function, eid);
    }
}
