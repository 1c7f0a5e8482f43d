use std::error::Error;
use std::fmt;

use jitscope_types::{CompilationId, Script};
use jitscope_wire::RawJson;

/// One recorded compilation, as held by the control side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub id: CompilationId,
    pub scripts: Vec<Script>,
    /// The graph exactly as the runtime serialized it.
    pub graph: RawJson,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Slot {
    Live(Snapshot),
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No compilation was ever recorded under this id.
    NotFound { id: CompilationId },
    /// The compilation was recorded, then removed.
    Removed { id: CompilationId },
}

impl StoreError {
    pub fn id(&self) -> CompilationId {
        match self {
            Self::NotFound { id } | Self::Removed { id } => *id,
        }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound { id } => write!(f, "compilation {id} not found"),
            Self::Removed { id } => write!(f, "compilation {id} was removed"),
        }
    }
}

impl Error for StoreError {}

/// Session-scoped list of recorded compilations.
///
/// Slot `i` always belongs to compilation `i`; removal leaves a tombstone so
/// ids are never reused or shifted.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    slots: Vec<Slot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, scripts: Vec<Script>, graph: RawJson) -> CompilationId {
        let id = CompilationId::new(self.slots.len() as u64);
        self.slots.push(Slot::Live(Snapshot { id, scripts, graph }));
        id
    }

    pub fn get(&self, id: CompilationId) -> Result<&Snapshot, StoreError> {
        match self.slot(id)? {
            Slot::Live(snapshot) => Ok(snapshot),
            Slot::Removed => Err(StoreError::Removed { id }),
        }
    }

    /// Tombstones `id`. Removing an already removed compilation succeeds.
    pub fn remove(&mut self, id: CompilationId) -> Result<(), StoreError> {
        self.slot(id)?;
        if let Some(slot) = id.index().and_then(|i| self.slots.get_mut(i)) {
            *slot = Slot::Removed;
        }
        Ok(())
    }

    /// Forgets everything; the next id is 0 again.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Live snapshots in id order.
    pub fn live(&self) -> impl Iterator<Item = &Snapshot> {
        self.slots.iter().filter_map(|slot| match slot {
            Slot::Live(snapshot) => Some(snapshot),
            Slot::Removed => None,
        })
    }

    /// The next id to assign, which is also the number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn slot(&self, id: CompilationId) -> Result<&Slot, StoreError> {
        id.index()
            .and_then(|i| self.slots.get(i))
            .ok_or(StoreError::NotFound { id })
    }
}
