use facet::Facet;
use std::fmt;

/// Identifier assigned to a recorded compilation by the snapshot store.
///
/// Ids start at zero, increase by one per recorded compilation, and are never
/// reused within a session, even after the compilation is removed.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[facet(transparent)]
pub struct CompilationId(u64);

impl CompilationId {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn get(self) -> u64 {
        self.0
    }

    /// Position of this compilation in the store's backing sequence.
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Display for CompilationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compilation_id_serializes_as_bare_number() {
        let json = facet_json::to_string(&CompilationId::new(42)).expect("id must serialize");
        assert_eq!(json, "42");
        let back: CompilationId = facet_json::from_str("7").expect("id must deserialize");
        assert_eq!(back.get(), 7);
        assert_eq!(back.index(), Some(7));
    }
}
