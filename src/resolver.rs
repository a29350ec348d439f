//! Stage naming: tags and type names supplied by the host.

use crate::types::StageId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Type name reported for stages the resolver knows nothing about.
pub const UNKNOWN_TYPE: &str = "Object";

/// Pure lookups from a stage to its display names.
///
/// Implementations must not call back into the spy.
pub trait StageResolver: Send + Sync {
    /// User-assigned label, if any.
    fn resolve_tag(&self, stage: StageId) -> Option<String>;

    /// Runtime type name of the stage.
    fn resolve_type(&self, stage: StageId) -> String;
}

#[derive(Clone, Debug)]
struct StageInfo {
    type_name: String,
    tag: Option<String>,
}

/// In-memory resolver for hosts that register stages as they build them.
#[derive(Debug, Default)]
pub struct StageTable {
    stages: RwLock<HashMap<StageId, StageInfo>>,
}

impl StageTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or re-register) a stage.
    pub fn register(&self, stage: StageId, type_name: impl Into<String>, tag: Option<&str>) {
        self.stages.write().insert(
            stage,
            StageInfo {
                type_name: type_name.into(),
                tag: tag.map(str::to_string),
            },
        );
    }

    /// Set the tag of a registered stage. Returns false if the stage is unknown.
    pub fn set_tag(&self, stage: StageId, tag: impl Into<String>) -> bool {
        match self.stages.write().get_mut(&stage) {
            Some(info) => {
                info.tag = Some(tag.into());
                true
            }
            None => false,
        }
    }

    /// Drop a stage that will not be subscribed to again.
    pub fn forget(&self, stage: StageId) {
        self.stages.write().remove(&stage);
    }

    pub fn len(&self) -> usize {
        self.stages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.read().is_empty()
    }
}

impl StageResolver for StageTable {
    fn resolve_tag(&self, stage: StageId) -> Option<String> {
        self.stages.read().get(&stage).and_then(|s| s.tag.clone())
    }

    fn resolve_type(&self, stage: StageId) -> String {
        self.stages
            .read()
            .get(&stage)
            .map(|s| s.type_name.clone())
            .unwrap_or_else(|| UNKNOWN_TYPE.to_string())
    }
}
