use std::sync::Arc;

use parking_lot::Mutex;

use crate::device::GlDevice;

use super::{same_painter, SharedPainter};

/// Ordered painter list with snapshot iteration.
///
/// Mutation copies the list when a snapshot is outstanding, so a frame that
/// is iterating never observes an add or remove; the change shows up on the
/// next [`snapshot`](Self::snapshot). Insertion order is draw order.
pub struct PainterList<D: GlDevice> {
    painters: Mutex<Arc<Vec<SharedPainter<D>>>>,
}

impl<D: GlDevice> PainterList<D> {
    pub fn new() -> Self {
        Self {
            painters: Mutex::new(Arc::new(Vec::new())),
        }
    }

    pub fn add(&self, painter: SharedPainter<D>) {
        let mut painters = self.painters.lock();
        Arc::make_mut(&mut painters).push(painter);
    }

    /// Removes the first occurrence of `painter` (by identity).
    ///
    /// Returns `false` if it was not in the list.
    pub fn remove(&self, painter: &SharedPainter<D>) -> bool {
        let mut painters = self.painters.lock();
        let Some(index) = painters.iter().position(|p| same_painter(p, painter)) else {
            return false;
        };
        Arc::make_mut(&mut painters).remove(index);
        true
    }

    pub fn clear(&self) {
        *self.painters.lock() = Arc::new(Vec::new());
    }

    /// Immutable view of the current painters.
    pub fn snapshot(&self) -> Arc<Vec<SharedPainter<D>>> {
        Arc::clone(&self.painters.lock())
    }

    pub fn len(&self) -> usize {
        self.painters.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.painters.lock().is_empty()
    }
}

impl<D: GlDevice> Default for PainterList<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::painter::shared;
    use crate::testing::{PaintLog, RecordingDevice, RecordingPainter};

    fn painter(log: &PaintLog, name: &'static str) -> SharedPainter<RecordingDevice> {
        shared(RecordingPainter::new(name, log.clone()))
    }

    #[test]
    fn snapshot_ignores_later_mutation() {
        let log = PaintLog::default();
        let list = PainterList::new();
        let a = painter(&log, "a");
        let b = painter(&log, "b");
        list.add(a.clone());

        let snap = list.snapshot();
        list.add(b.clone());
        list.remove(&a);

        assert_eq!(snap.len(), 1);
        assert!(same_painter(&snap[0], &a));
        assert_eq!(list.len(), 1);
        assert!(same_painter(&list.snapshot()[0], &b));
    }

    #[test]
    fn insertion_order_is_preserved() {
        let log = PaintLog::default();
        let list = PainterList::new();
        let names = ["a", "b", "c"];
        let painters: Vec<_> = names.iter().map(|n| painter(&log, *n)).collect();
        for p in &painters {
            list.add(p.clone());
        }

        let snap = list.snapshot();
        for (got, want) in snap.iter().zip(&painters) {
            assert!(same_painter(got, want));
        }
    }

    #[test]
    fn remove_unknown_painter_is_false() {
        let log = PaintLog::default();
        let list = PainterList::new();
        list.add(painter(&log, "a"));
        assert!(!list.remove(&painter(&log, "a")));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn clear_empties_the_list() {
        let log = PaintLog::default();
        let list = PainterList::new();
        list.add(painter(&log, "a"));
        list.clear();
        assert!(list.is_empty());
    }
}
