//! Legacy string-expression guards.
//!
//! Older documents guard edges with `"identifier operator value"` strings.
//! Rather than keeping a second evaluator around, the parser desugars an
//! expression into the same [`ConditionNode`] the structured evaluator
//! consumes, so coercion and loose equality are shared by construction. An
//! unparseable expression becomes a single boolean-flag lookup.

use faden_core::{CompareOp, ConditionNode, Operand, Value};

/// Desugar a legacy expression into a condition tree.
pub fn parse_legacy(expr: &str) -> ConditionNode {
    let tokens: Vec<&str> = expr.split_whitespace().collect();
    if let [identifier, operator, rest @ ..] = tokens.as_slice() {
        if let Some(op) = CompareOp::parse(operator) {
            if !rest.is_empty() {
                let literal = Value::parse_literal(&rest.join(" "));
                return ConditionNode::compare(
                    Operand::key(*identifier),
                    op,
                    Operand::Literal { value: literal },
                );
            }
        }
    }
    ConditionNode::check_flag(expr.trim(), true)
}
