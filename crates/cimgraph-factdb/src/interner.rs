//! Term interning: every distinct term is stored once and referenced by a
//! compact `TermId`.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::Term;

/// Interned term ID (4 bytes instead of a full term)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct TermId(u32);

impl TermId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Term interner: maps terms to compact IDs and back.
#[derive(Debug, Default)]
pub struct TermInterner {
    ids: AHashMap<Term, TermId>,
    terms: Vec<Term>,
}

impl TermInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Intern a term, returning its ID
    pub fn intern(&mut self, term: &Term) -> TermId {
        if let Some(id) = self.ids.get(term) {
            return *id;
        }
        let id = TermId(self.terms.len() as u32);
        self.ids.insert(term.clone(), id);
        self.terms.push(term.clone());
        id
    }

    /// Look up an existing ID without inserting.
    pub fn id_of(&self, term: &Term) -> Option<TermId> {
        self.ids.get(term).copied()
    }

    pub fn lookup(&self, id: TermId) -> Option<&Term> {
        self.terms.get(id.0 as usize)
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_term_same_id() {
        let mut interner = TermInterner::new();
        let a = interner.intern(&Term::iri("http://x/a"));
        let b = interner.intern(&Term::literal("http://x/a"));
        let a2 = interner.intern(&Term::iri("http://x/a"));
        assert_eq!(a, a2);
        assert_ne!(a, b);
        assert_eq!(interner.lookup(b), Some(&Term::literal("http://x/a")));
        assert_eq!(interner.len(), 2);
    }
}
