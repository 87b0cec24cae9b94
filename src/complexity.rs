//! Cyclomatic complexity computation, shared across language back-ends.
//!
//! McCabe's formula: complexity = 1 + number of independent decision points
//! in a function body. A decision point is any branch, loop, early exit, or
//! short-circuiting boolean operator a reader would count when asking "how
//! many paths does execution take through here?" File-level complexity is
//! the max taken over that file's functions and methods, per the hotspot
//! and risk analyzers' convention.

use std::collections::HashSet;
use tree_sitter::Node;

/// Node kinds (tree-sitter grammar-specific) that each contribute one unit
/// of complexity, plus the binary-operator texts ("&&", "||") that do too.
pub struct BranchKinds {
    pub kinds: HashSet<&'static str>,
    pub binary_expression_kind: &'static str,
    pub short_circuit_operators: HashSet<&'static str>,
}

impl BranchKinds {
    pub fn rust() -> Self {
        Self {
            kinds: [
                "if_expression",
                "if_let_expression",
                "while_expression",
                "while_let_expression",
                "loop_expression",
                "for_expression",
                "match_arm",
                "try_expression",
                "question_mark_expression",
            ]
            .into_iter()
            .collect(),
            binary_expression_kind: "binary_expression",
            short_circuit_operators: ["&&", "||"].into_iter().collect(),
        }
    }

    pub fn typescript() -> Self {
        Self {
            kinds: [
                "if_statement",
                "for_statement",
                "for_in_statement",
                "while_statement",
                "do_statement",
                "switch_case",
                "catch_clause",
                "conditional_expression",
                "ternary_expression",
            ]
            .into_iter()
            .collect(),
            binary_expression_kind: "binary_expression",
            short_circuit_operators: ["&&", "||", "??"].into_iter().collect(),
        }
    }
}

/// Computes McCabe cyclomatic complexity for the subtree rooted at `node`
/// (normally a function/method body).
pub fn cyclomatic_complexity(node: Node, bytes: &[u8], branches: &BranchKinds) -> u32 {
    let mut complexity = 1u32;
    walk(node, bytes, branches, &mut complexity);
    complexity
}

fn walk(node: Node, bytes: &[u8], branches: &BranchKinds, complexity: &mut u32) {
    let kind = node.kind();
    if branches.kinds.contains(kind) {
        *complexity += 1;
    } else if kind == branches.binary_expression_kind {
        if let Some(op) = node.child_by_field_name("operator") {
            if let Ok(text) = std::str::from_utf8(&bytes[op.start_byte()..op.end_byte()]) {
                if branches.short_circuit_operators.contains(text) {
                    *complexity += 1;
                }
            }
        }
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        walk(child, bytes, branches, complexity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tree_sitter::Parser;

    #[test]
    fn straight_line_function_has_complexity_one() {
        let source = "fn f() { let x = 1; let y = 2; x + y; }";
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_rust::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let root = tree.root_node();
        let fn_node = root.child(0).unwrap();
        let body = fn_node.child_by_field_name("body").unwrap();
        assert_eq!(
            cyclomatic_complexity(body, source.as_bytes(), &BranchKinds::rust()),
            1
        );
    }

    #[test]
    fn branches_and_short_circuit_operators_each_add_one() {
        let source = r#"
fn f(a: i32, b: i32) -> i32 {
    if a > 0 && b > 0 {
        return a;
    }
    for i in 0..a {
        if i == b {
            return i;
        }
    }
    0
}
"#;
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_rust::LANGUAGE.into()).unwrap();
        let tree = parser.parse(source, None).unwrap();
        let root = tree.root_node();
        let fn_node = root.child(0).unwrap();
        let body = fn_node.child_by_field_name("body").unwrap();
        // base 1 + if + && + for + nested if = 5
        assert_eq!(
            cyclomatic_complexity(body, source.as_bytes(), &BranchKinds::rust()),
            5
        );
    }
}
