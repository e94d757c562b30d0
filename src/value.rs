//! Value-node trees: the initializer form attached to const declarations,
//! array bounds, and union case labels.
//!
//! Grounded on `examples/original_source/.../entities/entity_value.h`:
//! `CSimpleTypeValueNode`, `CArrayValueNode`, `CCompoundTypeValueNode`,
//! `CInterfaceValueNode`, `CEnumValueNode`. Per the Design Notes in
//! `spec.md` §9, the original's `CSimpleTypeValueNode::IsDynamic()` returns
//! `m_eValueDef != EValueDef::dynamic`: inverted. This implementation
//! does not reproduce that bug: [`ScalarValue::is_dynamic`] is `true`
//! exactly when the value is actually dynamic.

use crate::entity::EntityHandle;
use crate::variant::ConstVariant;

/// Whether a value has been assigned, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueState {
    /// No initializer has been parsed yet.
    Undefined,
    /// Initializer evaluated to a compile-time constant.
    Fixed,
    /// Initializer's expression depends on a non-const identifier (e.g. an
    /// `in` parameter in a default-value position) and can only be
    /// evaluated at the point of use, not at parse time.
    Dynamic,
}

/// A scalar (primitive-typed) value: an integer, float, bool, char, or
/// string constant, or a not-yet-resolved dynamic expression.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScalarValue {
    pub state: ValueState,
    pub fixed: Option<ConstVariant>,
    /// Source text of the initializer expression, retained so a dynamic
    /// value can be re-emitted verbatim by the generator.
    pub dynamic_expr: Option<String>,
}

impl ScalarValue {
    /// An as-yet-unassigned scalar value.
    pub fn undefined() -> Self {
        Self {
            state: ValueState::Undefined,
            fixed: None,
            dynamic_expr: None,
        }
    }

    /// A value fixed to a known constant.
    pub fn fixed(value: ConstVariant) -> Self {
        Self {
            state: ValueState::Fixed,
            fixed: Some(value),
            dynamic_expr: None,
        }
    }

    /// A value whose initializer could not be folded to a constant.
    pub fn dynamic(expr: impl Into<String>) -> Self {
        Self {
            state: ValueState::Dynamic,
            fixed: None,
            dynamic_expr: Some(expr.into()),
        }
    }

    /// True exactly when this value's initializer is non-constant.
    ///
    /// This intentionally corrects the original's inverted boolean (see
    /// module docs) rather than reproducing it.
    pub fn is_dynamic(&self) -> bool {
        self.state == ValueState::Dynamic
    }

    /// True once an initializer (fixed or dynamic) has been assigned.
    pub fn is_defined(&self) -> bool {
        self.state != ValueState::Undefined
    }
}

/// How an array's size was specified.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ArraySize {
    /// No size given yet.
    Undefined,
    /// A compile-time constant bound.
    Fixed(u64),
    /// A size that depends on a non-const expression (only legal for
    /// `sequence<T>` bounds, not plain arrays).
    Dynamic(String),
    /// `[]`: fixed but unbounded (a trailing flexible array member).
    FixedUnbound,
}

/// An array-typed value: a size plus per-element values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ArrayValue {
    pub size: ArraySize,
    pub elements: Vec<ValueNode>,
}

impl ArrayValue {
    /// An array with no size and no elements assigned yet.
    pub fn undefined() -> Self {
        Self {
            size: ArraySize::Undefined,
            elements: Vec::new(),
        }
    }

    /// Indexes into the element list, as the original's `operator[]` does.
    pub fn get(&self, index: usize) -> Option<&ValueNode> {
        self.elements.get(index)
    }
}

/// A struct/union/exception-typed value: named member values.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CompoundValue {
    pub members: Vec<(String, ValueNode)>,
}

impl CompoundValue {
    /// Looks up a member's value by name.
    pub fn member(&self, name: &str) -> Option<&ValueNode> {
        self.members.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// An enum-typed value: a reference to one enumerator entity.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnumValue {
    pub enumerator: EntityHandle,
    pub enumerator_name: String,
}

/// An interface-typed value. Per the original, interface references are
/// always dynamic (they can't be compile-time constants); the only
/// permitted *literal* spelling is a null reference (`"null"`/`0`).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InterfaceValue {
    pub is_null_literal: bool,
}

impl InterfaceValue {
    /// Interface values are always dynamic, matching
    /// `CInterfaceValueNode::IsDynamic() { return true; }`.
    pub fn is_dynamic(&self) -> bool {
        true
    }
}

/// The initializer tree attached to a declaration.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueNode {
    Scalar(ScalarValue),
    Array(ArrayValue),
    Compound(CompoundValue),
    Enum(EnumValue),
    Interface(InterfaceValue),
}

impl ValueNode {
    /// True if evaluating this value requires information only available
    /// at the call site (a non-const dependency), recursing into
    /// aggregates.
    pub fn is_dynamic(&self) -> bool {
        match self {
            ValueNode::Scalar(s) => s.is_dynamic(),
            ValueNode::Array(a) => a.elements.iter().any(ValueNode::is_dynamic),
            ValueNode::Compound(c) => c.members.iter().any(|(_, v)| v.is_dynamic()),
            ValueNode::Enum(_) => false,
            ValueNode::Interface(i) => i.is_dynamic(),
        }
    }

    /// True if this value has children (array elements or compound members).
    pub fn has_children(&self) -> bool {
        match self {
            ValueNode::Array(a) => !a.elements.is_empty(),
            ValueNode::Compound(c) => !c.members.is_empty(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_scalar_is_not_dynamic() {
        let v = ScalarValue::fixed(ConstVariant::I64(3));
        assert!(!v.is_dynamic());
        assert!(v.is_defined());
    }

    #[test]
    fn dynamic_scalar_is_dynamic() {
        let v = ScalarValue::dynamic("some_param + 1");
        assert!(v.is_dynamic());
    }

    #[test]
    fn undefined_scalar_is_neither_defined_nor_dynamic() {
        let v = ScalarValue::undefined();
        assert!(!v.is_defined());
        assert!(!v.is_dynamic());
    }

    #[test]
    fn interface_value_is_always_dynamic() {
        let v = InterfaceValue { is_null_literal: true };
        assert!(v.is_dynamic());
    }

    #[test]
    fn array_value_is_dynamic_if_any_element_is() {
        let arr = ArrayValue {
            size: ArraySize::Fixed(2),
            elements: vec![
                ValueNode::Scalar(ScalarValue::fixed(ConstVariant::I64(1))),
                ValueNode::Scalar(ScalarValue::dynamic("x")),
            ],
        };
        assert!(ValueNode::Array(arr).is_dynamic());
    }

    #[test]
    fn compound_member_lookup_by_name() {
        let c = CompoundValue {
            members: vec![("a".into(), ValueNode::Scalar(ScalarValue::fixed(ConstVariant::I64(1))))],
        };
        assert!(c.member("a").is_some());
        assert!(c.member("b").is_none());
    }
}
