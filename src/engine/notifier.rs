use crate::reconcile::ChangeSet;

/// Receives the paths committed by a pass so a presentation layer can redraw
/// them. Called at most once per pass, after the tree mutation is complete,
/// and never during teardown.
pub trait ChangeNotifier {
    fn on_changed(&self, changes: &ChangeSet);
}

impl<F> ChangeNotifier for F
where
    F: Fn(&ChangeSet),
{
    fn on_changed(&self, changes: &ChangeSet) {
        self(changes)
    }
}
