//! Guard expressions: structured condition trees and legacy string
//! expressions, unified as one sum type evaluated by one engine.

use serde::{Deserialize, Serialize};

use crate::action::Params;
use crate::ids::{AttributeId, CharacterId, ClueId, ItemId};
use crate::value::{CompareOp, Value};

/// One side of a comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operand {
    /// A literal value. A string literal prefixed with `$` resolves as an
    /// attribute key at evaluation time.
    Literal {
        /// The literal value.
        value: Value,
    },
    /// The current value of an attribute, by id.
    Attribute {
        /// The attribute to read.
        id: AttributeId,
    },
    /// The current value of an attribute, by key.
    AttributeKey {
        /// The attribute key to resolve.
        key: String,
    },
    /// The current inventory count of an item.
    ItemCount {
        /// The item to count.
        item: ItemId,
    },
    /// A boolean flag read from the attribute namespace.
    Flag {
        /// The flag key.
        key: String,
    },
}

impl Operand {
    /// Shorthand for a literal operand.
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    /// Shorthand for an attribute-key operand.
    pub fn key(key: impl Into<String>) -> Self {
        Self::AttributeKey { key: key.into() }
    }
}

/// A node in a condition tree: a kind plus an optional final negation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionNode {
    /// What to evaluate.
    #[serde(flatten)]
    pub kind: ConditionKind,
    /// Flip the result after evaluation.
    #[serde(default)]
    pub negate: bool,
}

/// The kinds of condition a tree can contain. Logic kinds carry children;
/// leaf kinds resolve against the variable store; `Custom` dispatches
/// through the runtime's condition registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConditionKind {
    /// True iff all children are true. Vacuously true for zero children.
    AllOf {
        /// The child conditions.
        children: Vec<ConditionNode>,
    },
    /// True iff any child is true. Vacuously false for zero children.
    AnyOf {
        /// The child conditions.
        children: Vec<ConditionNode>,
    },
    /// Negates its single child.
    Not {
        /// The child condition.
        child: Box<ConditionNode>,
    },
    /// Resolve both operands, then apply the operator.
    Compare {
        /// Left operand.
        left: Operand,
        /// The comparison operator.
        op: CompareOp,
        /// Right operand.
        right: Operand,
    },
    /// True iff the inventory holds at least one of the item.
    HasItem {
        /// The item to check for.
        item: ItemId,
    },
    /// True iff the clue is revealed and, when a character is given, owned
    /// by that character.
    HasClue {
        /// The clue to check.
        clue: ClueId,
        /// Restrict the check to one character's ownership.
        character: Option<CharacterId>,
    },
    /// Boolean-coerced attribute compare against an expected value.
    CheckFlag {
        /// The flag key (attribute key).
        key: String,
        /// The expected truthiness. Defaults to `true`.
        expected: bool,
    },
    /// A plugin-defined condition resolved from the condition registry.
    Custom {
        /// Registry key of the handler.
        kind: String,
        /// Handler parameters.
        params: Params,
    },
}

impl ConditionNode {
    /// Wrap a kind with no negation.
    pub fn new(kind: ConditionKind) -> Self {
        Self {
            kind,
            negate: false,
        }
    }

    /// A conjunction of children.
    pub fn all(children: Vec<ConditionNode>) -> Self {
        Self::new(ConditionKind::AllOf { children })
    }

    /// A disjunction of children.
    pub fn any(children: Vec<ConditionNode>) -> Self {
        Self::new(ConditionKind::AnyOf { children })
    }

    /// A negated child.
    pub fn not(child: ConditionNode) -> Self {
        Self::new(ConditionKind::Not {
            child: Box::new(child),
        })
    }

    /// A comparison between two operands.
    pub fn compare(left: Operand, op: CompareOp, right: Operand) -> Self {
        Self::new(ConditionKind::Compare { left, op, right })
    }

    /// An inventory check.
    pub fn has_item(item: ItemId) -> Self {
        Self::new(ConditionKind::HasItem { item })
    }

    /// A clue check.
    pub fn has_clue(clue: ClueId, character: Option<CharacterId>) -> Self {
        Self::new(ConditionKind::HasClue { clue, character })
    }

    /// A flag check.
    pub fn check_flag(key: impl Into<String>, expected: bool) -> Self {
        Self::new(ConditionKind::CheckFlag {
            key: key.into(),
            expected,
        })
    }

    /// Flip the result of this node (builder style).
    pub fn negated(mut self) -> Self {
        self.negate = !self.negate;
        self
    }
}

/// A guard on an edge or node event: either a structured condition tree or
/// a legacy `"identifier operator value"` expression. Both variants are
/// evaluated by the same engine with the same coercion semantics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Guard {
    /// A structured condition tree.
    Tree(ConditionNode),
    /// A legacy string expression, e.g. `"hp >= 50"`.
    Legacy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_compose() {
        let node = ConditionNode::all(vec![
            ConditionNode::check_flag("met_innkeeper", true),
            ConditionNode::compare(
                Operand::key("hp"),
                CompareOp::Ge,
                Operand::literal(50.0),
            )
            .negated(),
        ]);

        match &node.kind {
            ConditionKind::AllOf { children } => {
                assert_eq!(children.len(), 2);
                assert!(children[1].negate);
            }
            other => panic!("expected AllOf, got {other:?}"),
        }
    }

    #[test]
    fn serde_round_trip() {
        let guard = Guard::Tree(ConditionNode::has_item(ItemId::new()));
        let json = serde_json::to_string(&guard).unwrap();
        let back: Guard = serde_json::from_str(&json).unwrap();
        assert_eq!(guard, back);
    }
}
