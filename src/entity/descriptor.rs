//! Entity descriptors: the JSON documents that define what gets inserted.
//!
//! Validation is typed deserialization plus semantic checks, replacing a
//! schema-document pass: a descriptor that deserializes and whose hook
//! strings parse is valid.

use serde::Deserialize;
use serde_json::Value;

use crate::ports::ScriptHook;

/// How an entity moves and tracks tile occupancy. Chosen once from the
/// descriptor; tile mode snaps between cells, pixel mode moves sub-tile
/// and can straddle neighboring cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementMode {
    Tile,
    Pixel,
}

/// Error type for descriptor validation.
#[derive(Debug)]
pub enum DescriptorError {
    /// The document does not deserialize into the descriptor shape.
    Schema(String),
    /// A hook string is not `"module,function"`.
    Hook(&'static str, String),
}

impl std::fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DescriptorError::Schema(msg) => write!(f, "schema error: {}", msg),
            DescriptorError::Hook(field, value) => {
                write!(f, "{} must be \"module,function\", got \"{}\"", field, value)
            }
        }
    }
}

impl std::error::Error for DescriptorError {}

/// `init` section of an entity descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct InitSection {
    pub mode: MovementMode,
    /// Called with the new entity right after insertion.
    #[serde(default)]
    pub on_insert: Option<String>,
    /// Called with the entity just before it is killed.
    #[serde(default)]
    pub on_kill: Option<String>,
    /// Pixel size; defaults to the map's tile size when absent.
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
}

/// A validated entity descriptor.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityDescriptor {
    pub init: InitSection,
}

impl EntityDescriptor {
    /// Validate a loaded document into a descriptor.
    pub fn from_document(document: &Value) -> Result<Self, DescriptorError> {
        let descriptor: EntityDescriptor = serde_json::from_value(document.clone())
            .map_err(|e| DescriptorError::Schema(e.to_string()))?;
        descriptor.validate()?;
        Ok(descriptor)
    }

    fn validate(&self) -> Result<(), DescriptorError> {
        if let Some(raw) = &self.init.on_insert {
            if ScriptHook::parse(raw).is_none() {
                return Err(DescriptorError::Hook("init.on_insert", raw.clone()));
            }
        }
        if let Some(raw) = &self.init.on_kill {
            if ScriptHook::parse(raw).is_none() {
                return Err(DescriptorError::Hook("init.on_kill", raw.clone()));
            }
        }
        Ok(())
    }

    pub fn on_insert_hook(&self) -> Option<ScriptHook> {
        self.init.on_insert.as_deref().and_then(ScriptHook::parse)
    }

    pub fn on_kill_hook(&self) -> Option<ScriptHook> {
        self.init.on_kill.as_deref().and_then(ScriptHook::parse)
    }
}
