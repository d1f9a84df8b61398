use std::cell::RefCell;
use std::io::{self, Stdout, Write};

use colored::Colorize;
use tracing::warn;

use crate::engine::{ChangeNotifier, SharedTree};
use crate::reconcile::ChangeSet;

/// Prints one line per top-level change, followed by the tracked path count.
pub struct ConsoleNotifier<W> {
    out: RefCell<W>,
    tree: SharedTree,
    colors: bool,
}

impl ConsoleNotifier<Stdout> {
    pub fn stdout(tree: SharedTree) -> Self {
        let colors = supports_color::on(supports_color::Stream::Stdout).is_some();
        Self::new(io::stdout(), tree, colors)
    }
}

impl<W: Write> ConsoleNotifier<W> {
    pub fn new(out: W, tree: SharedTree, colors: bool) -> Self {
        Self {
            out: RefCell::new(out),
            tree,
            colors,
        }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out.into_inner()
    }

    fn write_changes(&self, changes: &ChangeSet) -> io::Result<()> {
        let tree = self.tree.borrow();
        let mut out = self.out.borrow_mut();

        for path in changes.top_level_removed() {
            let marker = if self.colors { "-".red().bold().to_string() } else { "-".to_string() };
            writeln!(out, "{marker} {path}")?;
        }
        for path in changes.top_level_added() {
            let suffix = match tree.lookup(path) {
                Some(node) if node.is_folder() => "/",
                _ => "",
            };
            let marker = if self.colors { "+".green().bold().to_string() } else { "+".to_string() };
            writeln!(out, "{marker} {path}{suffix}")?;
        }

        let summary = format!("{} paths tracked", tree.len());
        if self.colors {
            writeln!(out, "{}", summary.dimmed())?;
        } else {
            writeln!(out, "{summary}")?;
        }
        out.flush()
    }
}

impl<W: Write> ChangeNotifier for ConsoleNotifier<W> {
    fn on_changed(&self, changes: &ChangeSet) {
        if let Err(e) = self.write_changes(changes) {
            warn!("Failed to print changes: {}", e);
        }
    }
}
