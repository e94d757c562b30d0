//! Hierarchical name scopes used by the parser and evaluator.
//!
//! Identifiers are interned once into a `Symbol`, and scopes map
//! `Symbol -> EntityHandle` with a parent chain for qualified/unqualified
//! lookup. Interning keeps
//! name comparisons and hashing cheap across the whole compile.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::entity::EntityHandle;

static NEXT_SYMBOL: AtomicU32 = AtomicU32::new(0);

/// An interned identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Symbol(u32);

/// Interns identifier strings into [`Symbol`]s for cheap comparison.
#[derive(Debug, Default)]
pub struct SymbolTable {
    strings: Vec<String>,
    lookup: HashMap<String, Symbol>,
}

impl SymbolTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `text`, returning its (possibly newly allocated) symbol.
    pub fn intern(&mut self, text: &str) -> Symbol {
        if let Some(sym) = self.lookup.get(text) {
            return *sym;
        }
        let id = NEXT_SYMBOL.fetch_add(1, Ordering::Relaxed);
        let sym = Symbol(id);
        self.strings.push(text.to_string());
        self.lookup.insert(text.to_string(), sym);
        sym
    }

    /// Resolves a symbol back to its string, if it was interned by this table.
    pub fn resolve(&self, sym: Symbol) -> Option<&str> {
        self.strings.iter().find(|s| self.lookup.get(s.as_str()) == Some(&sym)).map(|s| s.as_str())
    }

    /// Number of distinct interned strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// True if nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// One level of lexical nesting (module, interface, struct, etc.).
#[derive(Debug, Default)]
pub struct ScopeLevel {
    bindings: HashMap<Symbol, EntityHandle>,
}

/// A stack of nested scopes, innermost last.
#[derive(Debug, Default)]
pub struct ScopeStack {
    levels: Vec<ScopeLevel>,
}

impl ScopeStack {
    /// Creates a stack with a single (global) level.
    pub fn new() -> Self {
        Self {
            levels: vec![ScopeLevel::default()],
        }
    }

    /// Pushes a new, empty nested scope.
    pub fn push(&mut self) {
        self.levels.push(ScopeLevel::default());
    }

    /// Pops the innermost scope.
    ///
    /// # Panics
    /// Panics if called when only the global scope remains.
    pub fn pop(&mut self) {
        assert!(self.levels.len() > 1, "cannot pop the global scope");
        self.levels.pop();
    }

    /// Binds `sym` to `handle` in the innermost scope.
    pub fn bind(&mut self, sym: Symbol, handle: EntityHandle) {
        self.levels.last_mut().expect("global scope always present").bindings.insert(sym, handle);
    }

    /// Looks up `sym` starting at the innermost scope and walking outward.
    pub fn lookup(&self, sym: Symbol) -> Option<EntityHandle> {
        self.levels.iter().rev().find_map(|level| level.bindings.get(&sym).copied())
    }

    /// Looks up `sym` in the innermost scope only (no outward search); used
    /// to detect redeclaration within the same container.
    pub fn lookup_local(&self, sym: Symbol) -> Option<EntityHandle> {
        self.levels.last().and_then(|level| level.bindings.get(&sym).copied())
    }

    /// Current nesting depth (1 = global scope only).
    pub fn depth(&self) -> usize {
        self.levels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntityHandle;

    #[test]
    fn interning_the_same_text_twice_yields_the_same_symbol() {
        let mut table = SymbolTable::new();
        let a = table.intern("Foo");
        let b = table.intern("Foo");
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn interning_distinct_text_yields_distinct_symbols() {
        let mut table = SymbolTable::new();
        let a = table.intern("Foo");
        let b = table.intern("Bar");
        assert_ne!(a, b);
    }

    #[test]
    fn nested_scope_shadows_then_restores_on_pop() {
        let mut table = SymbolTable::new();
        let sym = table.intern("x");
        let mut scopes = ScopeStack::new();
        scopes.bind(sym, EntityHandle::from_raw(1));
        scopes.push();
        scopes.bind(sym, EntityHandle::from_raw(2));
        assert_eq!(scopes.lookup(sym), Some(EntityHandle::from_raw(2)));
        scopes.pop();
        assert_eq!(scopes.lookup(sym), Some(EntityHandle::from_raw(1)));
    }

    #[test]
    fn lookup_local_does_not_see_outer_bindings() {
        let mut table = SymbolTable::new();
        let sym = table.intern("x");
        let mut scopes = ScopeStack::new();
        scopes.bind(sym, EntityHandle::from_raw(1));
        scopes.push();
        assert_eq!(scopes.lookup_local(sym), None);
        assert_eq!(scopes.lookup(sym), Some(EntityHandle::from_raw(1)));
    }
}
