use crate::device::GlDevice;

use super::{GlimpseContext, PainterList, SharedPainter};

/// Painters that are disposed together.
///
/// Disposing the group disposes every member that is not disposed yet, in
/// insertion order; members added afterwards are unaffected until the next
/// dispose.
pub struct DisposableGroup<D: GlDevice> {
    members: PainterList<D>,
}

impl<D: GlDevice> DisposableGroup<D> {
    pub fn new() -> Self {
        Self { members: PainterList::new() }
    }

    /// Adds `member` and hands it back for convenient chaining.
    pub fn add(&self, member: SharedPainter<D>) -> SharedPainter<D> {
        self.members.add(member.clone());
        member
    }

    pub fn remove(&self, member: &SharedPainter<D>) -> bool {
        self.members.remove(member)
    }

    pub fn clear(&self) {
        self.members.clear();
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn dispose(&self, ctx: &mut GlimpseContext<'_, D>) {
        for member in self.members.snapshot().iter() {
            let mut member = member.lock();
            if !member.is_disposed() {
                member.dispose(ctx);
            }
        }
    }
}

impl<D: GlDevice> Default for DisposableGroup<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::TrackedContext;
    use crate::painter::shared;
    use crate::testing::{PaintLog, RecordingDevice, RecordingPainter};

    #[test]
    fn dispose_reaches_every_member_once() {
        let log = PaintLog::default();
        let group = DisposableGroup::new();
        group.add(shared(RecordingPainter::new("a", log.clone())));
        group.add(shared(RecordingPainter::new("b", log.clone())));

        let mut dev = RecordingDevice::new();
        let gl = TrackedContext::new();
        let mut ctx = GlimpseContext::new(&mut dev, &gl);
        group.dispose(&mut ctx);
        group.dispose(&mut ctx);

        assert_eq!(log.disposed(), vec!["a", "b"]);
    }

    #[test]
    fn removed_member_is_not_disposed() {
        let log = PaintLog::default();
        let group = DisposableGroup::new();
        let a = group.add(shared(RecordingPainter::new("a", log.clone())));
        group.remove(&a);

        let mut dev = RecordingDevice::new();
        let gl = TrackedContext::new();
        group.dispose(&mut GlimpseContext::new(&mut dev, &gl));

        assert!(log.disposed().is_empty());
        assert!(group.is_empty());
    }
}
