//! Python syntax check backed by tree-sitter.
//!
//! The output is parsed with the tree-sitter Python grammar. tree-sitter
//! recovers from errors by inserting `ERROR` and `MISSING` nodes, so a
//! program is accepted only when the tree contains neither; the first such
//! node in document order supplies the reported line.

use tree_sitter::{Node, Parser};

use super::ValidationOutcome;

/// Check that `output` parses as a Python program.
pub fn validate_python_syntax(output: &str) -> ValidationOutcome {
    if output.trim().is_empty() {
        return ValidationOutcome::fail("Empty output cannot be valid Python syntax");
    }

    let mut parser = Parser::new();
    if let Err(e) = parser.set_language(&tree_sitter_python::LANGUAGE.into()) {
        return ValidationOutcome::fail(format!("Python parser unavailable: {e}"));
    }

    let Some(tree) = parser.parse(output, None) else {
        return ValidationOutcome::fail("Python syntax error: parser produced no syntax tree");
    };

    let root = tree.root_node();
    if !root.has_error() {
        return ValidationOutcome::pass();
    }

    match first_error_node(root) {
        Some(node) => {
            let line = node.start_position().row + 1;
            let detail = if node.is_missing() {
                format!("expected '{}'", node.kind())
            } else {
                "invalid syntax".to_string()
            };
            ValidationOutcome::fail(format!("Python syntax error (line {line}): {detail}"))
        }
        None => ValidationOutcome::fail("Python syntax error: invalid syntax"),
    }
}

/// Pre-order search for the first `ERROR` or `MISSING` node.
fn first_error_node(root: Node<'_>) -> Option<Node<'_>> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'_>> = node
            .children(&mut cursor)
            .filter(|c| c.has_error() || c.is_missing())
            .collect();
        // Reverse so the leftmost child is popped first.
        stack.extend(children.into_iter().rev());
    }
    None
}
