use std::fmt::Write as _;

use super::TreeIndex;

const INDENT: &str = "  ";

impl TreeIndex {
    /// Renders the tree fully expanded, one entry per line, folders marked
    /// with a trailing `/`. Empty when the root is absent.
    pub fn render(&self) -> String {
        let mut output = String::new();
        let Some(root) = self.root() else {
            return output;
        };

        let mut stack = vec![(root, 0usize)];
        while let Some((node, level)) = stack.pop() {
            let marker = if node.is_folder() { "/" } else { "" };
            let _ = writeln!(output, "{}{}{}", INDENT.repeat(level), node.name(), marker);

            if let Some(children) = self.children(node.path()) {
                let children: Vec<_> = children.collect();
                stack.extend(children.into_iter().rev().map(|child| (child, level + 1)));
            }
        }
        output
    }
}
