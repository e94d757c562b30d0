//! The entity graph (component E): an arena of declarations/definitions
//! referred to by stable handles.
//!
//! Grounded on `examples/original_source/sdv_executables/sdv_idl_compiler/entities/*.h`
//! and the arena design note in `spec.md` §9: rather than modeling parent/
//! child/forward-declaration links with `Rc<RefCell<_>>`, every entity
//! lives in one `Vec` owned by an [`EntityArena`] and is referred to by a
//! `Copy` `EntityHandle(u32)`. Forward-declaration collapsing
//! ([`EntityArena::merge_forward`]) overwrites the forward slot's payload in
//! place, so every handle that already points at that slot transparently
//! observes the completed entity: no indirection table needed.

use std::collections::HashMap;

use crate::scope::Symbol;
use crate::token::Span;
use crate::value::ValueNode;
use crate::variant::ConstVariant;

/// A stable reference to an entity stored in an [`EntityArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityHandle(u32);

impl EntityHandle {
    /// Constructs a handle from a raw index. Exposed for tests and for
    /// generator code that must round-trip handles through serialization.
    pub fn from_raw(idx: u32) -> Self {
        EntityHandle(idx)
    }

    /// The raw arena index this handle refers to.
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Visibility/definition-completeness state of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Completeness {
    /// Declared (forward reference) but not yet defined.
    Forward,
    /// Fully defined.
    Complete,
}

/// One case label of a `union switch`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnionCase {
    /// `case` labels sharing this member (empty for `default`).
    pub labels: Vec<ConstVariant>,
    /// True if this is the `default:` arm.
    pub is_default: bool,
    /// Member name.
    pub member: Symbol,
    /// Member's declared type.
    pub member_type: EntityHandle,
    /// Array dimensions on the member, outermost first.
    pub array_dims: Vec<ValueNode>,
}

/// How a union's discriminant is declared.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SwitchKind {
    /// `union U switch (long) { ... }`: an anonymous inline discriminant,
    /// conventionally named `switch_value` in generated code.
    TypeBased { discriminant_type: EntityHandle },
    /// `union U switch (x) { ... }` where `x` names a sibling declaration
    /// in the nearest container shared by the union and `x`.
    VariableBased { variable: EntityHandle },
}

/// One `struct`/`exception` member, per `decl_item := identifier { '['
/// expr ']' } [ '=' initializer ]`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StructMember {
    pub name: Symbol,
    pub member_type: EntityHandle,
    /// Array dimensions on the member, outermost first.
    pub array_dims: Vec<ValueNode>,
    /// `= initializer`, if given.
    pub initializer: Option<ValueNode>,
}

/// A passed-through preprocessor directive: `#include`, `#define`, or
/// `#undef`. Carried as an entity (rather than discarded at parse time)
/// so G1 can re-emit it in the definition header in its rewritten or
/// original form.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PreprocessorDirective {
    /// `#include "file"`.
    IncludeLocal(String),
    /// `#include <file>`.
    IncludeSystem(String),
    /// `#define NAME [value]`, kept verbatim.
    Define(String),
    /// `#undef NAME`, kept verbatim.
    Undef(String),
}

/// Payload specific to each kind of entity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EntityKind {
    Module { members: Vec<EntityHandle> },
    Struct { members: Vec<StructMember> },
    Exception { members: Vec<StructMember>, description: String },
    Enum { enumerators: Vec<Symbol> },
    Union { switch: SwitchKind, cases: Vec<UnionCase> },
    Interface { local: bool, bases: Vec<EntityHandle>, members: Vec<EntityHandle> },
    Typedef { target: EntityHandle, array_dims: Vec<ValueNode> },
    ConstDecl { const_type: EntityHandle, value: ConstVariant },
    Attribute { attr_type: EntityHandle, readonly: bool },
    Operation { return_type: EntityHandle, params: Vec<Param>, raises: Vec<EntityHandle> },
    /// A built-in primitive (`long`, `string`, `boolean`, ...), interned once
    /// so typedefs and members can reference it by handle like any other type.
    Primitive(PrimitiveKind),
    Sequence { element: EntityHandle, bound: Option<ConstVariant> },
    /// A `%{ ... %}` verbatim passthrough block, copied through to the
    /// definition file untouched (re-indented to the emission column).
    Verbatim(String),
    /// A passed-through `#include`/`#define`/`#undef` directive.
    Preprocessor(PreprocessorDirective),
}

/// Parameter direction, per IDL `in`/`out`/`inout`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    In,
    Out,
    Inout,
}

/// An operation parameter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Param {
    pub name: Symbol,
    pub direction: Direction,
    pub param_type: EntityHandle,
}

/// The IDL built-in scalar categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimitiveKind {
    Boolean,
    Octet,
    Char,
    Char16,
    Char32,
    Wchar,
    Short,
    Long,
    LongLong,
    UShort,
    ULong,
    ULongLong,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Float,
    Double,
    LongDouble,
    Fixed,
    String,
    U8string,
    U16string,
    U32string,
    Wstring,
    Any,
    Void,
}

/// One node in the entity graph.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EntityData {
    pub name: Symbol,
    pub scoped_name: Vec<Symbol>,
    pub span: Span,
    pub parent: Option<EntityHandle>,
    pub completeness: Completeness,
    pub leading_comment: Option<String>,
    pub kind: EntityKind,
}

/// Errors raised while mutating the entity graph.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EntityError {
    #[error("entity is already completely defined and cannot be redeclared")]
    AlreadyComplete,
    #[error("forward declaration kind does not match its definition")]
    KindMismatch,
}

/// Owns every entity created while compiling one set of translation units.
#[derive(Debug, Default)]
pub struct EntityArena {
    entities: Vec<EntityData>,
    primitives: HashMap<PrimitiveKind, EntityHandle>,
}

impl EntityArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new entity, returning its handle.
    pub fn insert(&mut self, data: EntityData) -> EntityHandle {
        let handle = EntityHandle(self.entities.len() as u32);
        self.entities.push(data);
        handle
    }

    /// Returns the handle for a primitive type, interning it on first use.
    pub fn primitive(&mut self, kind: PrimitiveKind, name: Symbol, span: Span) -> EntityHandle {
        if let Some(handle) = self.primitives.get(&kind) {
            return *handle;
        }
        let handle = self.insert(EntityData {
            name,
            scoped_name: vec![name],
            span,
            parent: None,
            completeness: Completeness::Complete,
            leading_comment: None,
            kind: EntityKind::Primitive(kind),
        });
        self.primitives.insert(kind, handle);
        handle
    }

    /// Read-only access to an entity.
    pub fn get(&self, handle: EntityHandle) -> &EntityData {
        &self.entities[handle.0 as usize]
    }

    /// Mutable access to an entity.
    pub fn get_mut(&mut self, handle: EntityHandle) -> &mut EntityData {
        &mut self.entities[handle.0 as usize]
    }

    /// Number of entities currently stored.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True if no entities have been inserted.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Collapses a forward declaration into its full definition in place.
    ///
    /// Every existing [`EntityHandle`] that pointed at `forward` is just a
    /// `u32` index, so overwriting the arena slot's contents makes the
    /// completed definition visible to all of them without rewriting a
    /// single handle.
    pub fn merge_forward(&mut self, forward: EntityHandle, completed: EntityData) -> Result<(), EntityError> {
        let slot = &mut self.entities[forward.0 as usize];
        if slot.completeness == Completeness::Complete {
            return Err(EntityError::AlreadyComplete);
        }
        if std::mem::discriminant(&slot.kind) != std::mem::discriminant(&completed.kind) {
            return Err(EntityError::KindMismatch);
        }
        *slot = completed;
        slot.completeness = Completeness::Complete;
        Ok(())
    }

    /// Walks the given entity's ancestor chain (self then parents), useful
    /// for finding the innermost container shared with another entity,
    /// needed to validate variable-based union switch variables.
    pub fn ancestors(&self, mut handle: EntityHandle) -> Vec<EntityHandle> {
        let mut chain = vec![handle];
        while let Some(parent) = self.get(handle).parent {
            chain.push(parent);
            handle = parent;
        }
        chain
    }

    /// The nearest common ancestor of two entities, if any.
    pub fn common_ancestor(&self, a: EntityHandle, b: EntityHandle) -> Option<EntityHandle> {
        let ancestors_a = self.ancestors(a);
        let ancestors_b = self.ancestors(b);
        ancestors_a.into_iter().find(|h| ancestors_b.contains(h))
    }
}

/// Which kinds of member a container entity may hold, per
/// `original_source/entities/interface_entity.cpp`'s `Supports()` table.
pub fn supports(container: &EntityKind, member: &EntityKind) -> bool {
    match container {
        EntityKind::Interface { .. } => matches!(
            member,
            EntityKind::ConstDecl { .. }
                | EntityKind::Typedef { .. }
                | EntityKind::Struct { .. }
                | EntityKind::Union { .. }
                | EntityKind::Enum { .. }
                | EntityKind::Attribute { .. }
                | EntityKind::Operation { .. }
        ),
        EntityKind::Module { .. } => true,
        EntityKind::Struct { .. } | EntityKind::Exception { .. } => {
            matches!(member, EntityKind::Typedef { .. } | EntityKind::Struct { .. } | EntityKind::Union { .. } | EntityKind::Enum { .. })
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dummy_span() -> Span {
        Span::synthetic()
    }

    fn make_symbol(n: u32) -> Symbol {
        let mut table = crate::scope::SymbolTable::new();
        table.intern(&format!("s{n}"))
    }

    #[test]
    fn merge_forward_replaces_slot_in_place_and_existing_handles_see_it() {
        let mut arena = EntityArena::new();
        let name = make_symbol(1);
        let fwd = arena.insert(EntityData {
            name,
            scoped_name: vec![name],
            span: dummy_span(),
            parent: None,
            completeness: Completeness::Forward,
            leading_comment: None,
            kind: EntityKind::Struct { members: vec![] },
        });
        let alias = fwd; // simulate a second copy of the handle taken earlier
        arena
            .merge_forward(
                fwd,
                EntityData {
                    name,
                    scoped_name: vec![name],
                    span: dummy_span(),
                    parent: None,
                    completeness: Completeness::Complete,
                    leading_comment: None,
                    kind: EntityKind::Struct {
                        members: vec![StructMember {
                            name,
                            member_type: fwd,
                            array_dims: Vec::new(),
                            initializer: None,
                        }],
                    },
                },
            )
            .unwrap();
        assert_eq!(arena.get(alias).completeness, Completeness::Complete);
        match &arena.get(alias).kind {
            EntityKind::Struct { members } => assert_eq!(members.len(), 1),
            other => panic!("expected struct, got {other:?}"),
        }
    }

    #[test]
    fn merge_forward_rejects_kind_mismatch() {
        let mut arena = EntityArena::new();
        let name = make_symbol(1);
        let fwd = arena.insert(EntityData {
            name,
            scoped_name: vec![name],
            span: dummy_span(),
            parent: None,
            completeness: Completeness::Forward,
            leading_comment: None,
            kind: EntityKind::Struct { members: vec![] },
        });
        let err = arena
            .merge_forward(
                fwd,
                EntityData {
                    name,
                    scoped_name: vec![name],
                    span: dummy_span(),
                    parent: None,
                    completeness: Completeness::Complete,
                    leading_comment: None,
                    kind: EntityKind::Enum { enumerators: vec![] },
                },
            )
            .unwrap_err();
        assert_eq!(err, EntityError::KindMismatch);
    }

    #[test]
    fn primitive_interning_is_idempotent() {
        let mut arena = EntityArena::new();
        let name = make_symbol(1);
        let a = arena.primitive(PrimitiveKind::Long, name, dummy_span());
        let b = arena.primitive(PrimitiveKind::Long, name, dummy_span());
        assert_eq!(a, b);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn common_ancestor_finds_shared_container() {
        let mut arena = EntityArena::new();
        let name = make_symbol(1);
        let root = arena.insert(EntityData {
            name,
            scoped_name: vec![name],
            span: dummy_span(),
            parent: None,
            completeness: Completeness::Complete,
            leading_comment: None,
            kind: EntityKind::Module { members: Vec::new() },
        });
        let child_a = arena.insert(EntityData {
            name,
            scoped_name: vec![name],
            span: dummy_span(),
            parent: Some(root),
            completeness: Completeness::Complete,
            leading_comment: None,
            kind: EntityKind::Struct { members: vec![] },
        });
        let child_b = arena.insert(EntityData {
            name,
            scoped_name: vec![name],
            span: dummy_span(),
            parent: Some(root),
            completeness: Completeness::Complete,
            leading_comment: None,
            kind: EntityKind::Enum { enumerators: vec![] },
        });
        assert_eq!(arena.common_ancestor(child_a, child_b), Some(root));
    }
}
