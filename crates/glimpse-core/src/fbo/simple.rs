use std::cell::RefCell;

use parking_lot::ReentrantMutex;

use crate::coords::Bounds;
use crate::device::{
    with_current, with_offscreen, Attachment, GlContext, GlDevice, RenderbufferFormat,
};
use crate::error::{Error, Result};

/// Which auxiliary buffers to attach next to the color texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FboConfig {
    pub use_depth: bool,
    pub use_stencil: bool,
}

impl Default for FboConfig {
    fn default() -> Self {
        Self {
            use_depth: true,
            use_stencil: false,
        }
    }
}

/// Callback attached to a [`SimpleFrameBuffer`].
///
/// `draw` runs on every [`SimpleFrameBuffer::draw`] with the target bound;
/// `dispose` runs once when the target is disposed.
pub trait FboListener<D: GlDevice>: Send {
    fn draw(&mut self, device: &mut D, bounds: Bounds) -> Result<()>;

    fn dispose(&mut self, device: &mut D);
}

/// Handle returned by [`SimpleFrameBuffer::add_listener`].
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct ListenerId(u64);

#[derive(Debug)]
struct Objects<D: GlDevice> {
    framebuffer: D::Framebuffer,
    texture: D::Texture,
    renderbuffers: Vec<D::Renderbuffer>,
}

impl<D: GlDevice> Objects<D> {
    fn delete(self, device: &mut D) {
        device.delete_framebuffer(self.framebuffer);
        device.delete_texture(self.texture);
        for rb in self.renderbuffers {
            device.delete_renderbuffer(rb);
        }
    }
}

#[derive(Debug)]
enum Lifecycle<D: GlDevice> {
    Uninitialized,
    /// `stale` is set by a resize; the objects are rebuilt on the next bind.
    Ready { objects: Objects<D>, stale: bool },
    Disposed,
}

struct Inner<D: GlDevice> {
    width: u32,
    height: u32,
    state: Lifecycle<D>,
    listeners: Vec<(ListenerId, Box<dyn FboListener<D>>)>,
    next_listener: u64,
}

impl<D: GlDevice> Inner<D> {
    fn bind(&mut self, device: &mut D, config: FboConfig) -> Result<()> {
        match std::mem::replace(&mut self.state, Lifecycle::Uninitialized) {
            Lifecycle::Disposed => {
                self.state = Lifecycle::Disposed;
                return Err(Error::Disposed);
            }
            Lifecycle::Ready { objects, stale: false } => {
                device.bind_framebuffer(Some(objects.framebuffer));
                self.state = Lifecycle::Ready { objects, stale: false };
                return Ok(());
            }
            Lifecycle::Ready { objects, stale: true } => objects.delete(device),
            Lifecycle::Uninitialized => {}
        }

        let objects = self.create(device, config);
        self.state = Lifecycle::Ready { objects, stale: false };
        Ok(())
    }

    /// Builds and binds a fresh framebuffer of the current size.
    fn create(&self, device: &mut D, config: FboConfig) -> Objects<D> {
        let (width, height) = (self.width, self.height);

        let max = device.max_texture_size();
        if width > max || height > max {
            log::warn!(
                "offscreen target {width}x{height} exceeds the maximum texture size {max}; \
                 rendering may be clipped or fail"
            );
        }

        log::debug!("creating offscreen target {width}x{height}");

        let texture = device.create_texture(width, height);
        let framebuffer = device.create_framebuffer();
        device.bind_framebuffer(Some(framebuffer));
        device.attach_texture(framebuffer, Attachment::Color0, texture);

        let mut renderbuffers = Vec::new();
        let mut attach = |device: &mut D, format: RenderbufferFormat, attachment: Attachment| {
            let rb = device.create_renderbuffer(format, width, height);
            device.attach_renderbuffer(framebuffer, attachment, rb);
            renderbuffers.push(rb);
        };

        match (config.use_depth, config.use_stencil) {
            (true, true) => attach(device, RenderbufferFormat::DepthStencil, Attachment::DepthStencil),
            (true, false) => attach(device, RenderbufferFormat::Depth, Attachment::Depth),
            (false, true) => attach(device, RenderbufferFormat::Stencil, Attachment::Stencil),
            (false, false) => {}
        }

        let status = device.framebuffer_status(framebuffer);
        if !status.is_complete() {
            log::warn!("offscreen target {width}x{height} is incomplete: {status}");
        }

        Objects {
            framebuffer,
            texture,
            renderbuffers,
        }
    }
}

/// Texture-backed offscreen render target with its own rendering context.
///
/// Objects are created lazily on the first [`bind`](Self::bind) and rebuilt
/// on the first bind after a [`resize`](Self::resize). A reentrant lock
/// serializes the bind, render, unbind sequence, so a body running inside
/// [`with_bound`](Self::with_bound) may still query the target.
pub struct SimpleFrameBuffer<D: GlDevice> {
    config: FboConfig,
    context: Box<dyn GlContext>,
    inner: ReentrantMutex<RefCell<Inner<D>>>,
}

impl<D: GlDevice> SimpleFrameBuffer<D> {
    /// Target of `width` x `height` pixels; zero dimensions are raised to 1.
    pub fn new(context: Box<dyn GlContext>, width: u32, height: u32, config: FboConfig) -> Self {
        Self {
            config,
            context,
            inner: ReentrantMutex::new(RefCell::new(Inner {
                width: width.max(1),
                height: height.max(1),
                state: Lifecycle::Uninitialized,
                listeners: Vec::new(),
                next_listener: 0,
            })),
        }
    }

    #[inline]
    pub fn config(&self) -> FboConfig {
        self.config
    }

    /// Context the target renders with.
    pub fn context(&self) -> &dyn GlContext {
        self.context.as_ref()
    }

    pub fn size(&self) -> (u32, u32) {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        (inner.width, inner.height)
    }

    /// Whole-target pixel bounds.
    pub fn bounds(&self) -> Bounds {
        let (w, h) = self.size();
        Bounds::sized(w, h)
    }

    /// Color texture, once created and until disposed.
    pub fn texture(&self) -> Option<D::Texture> {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        match &inner.state {
            Lifecycle::Ready { objects, .. } => Some(objects.texture),
            _ => None,
        }
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.inner.lock().borrow().state, Lifecycle::Ready { .. })
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self.inner.lock().borrow().state, Lifecycle::Disposed)
    }

    // ── lifecycle ─────────────────────────────────────────────────────────

    /// Makes the target current for drawing, creating its objects if needed.
    pub fn bind(&self, device: &mut D) -> Result<()> {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        inner.bind(device, self.config)
    }

    /// Restores the default target and refreshes the texture's mipmaps.
    pub fn unbind(&self, device: &mut D) {
        let guard = self.inner.lock();
        let inner = guard.borrow();
        device.bind_framebuffer(None);
        if let Lifecycle::Ready { objects, .. } = &inner.state {
            device.generate_mipmaps(objects.texture);
        }
    }

    /// Changes the size. Storage is replaced on the next bind.
    pub fn resize(&self, width: u32, height: u32) {
        let (width, height) = (width.max(1), height.max(1));
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        if (inner.width, inner.height) == (width, height) {
            return;
        }
        inner.width = width;
        inner.height = height;
        if let Lifecycle::Ready { stale, .. } = &mut inner.state {
            *stale = true;
        }
    }

    /// Notifies listeners and deletes every device object. Idempotent.
    pub fn dispose(&self, device: &mut D) {
        let guard = self.inner.lock();

        let (state, mut listeners) = {
            let mut inner = guard.borrow_mut();
            if matches!(inner.state, Lifecycle::Disposed) {
                return;
            }
            let state = std::mem::replace(&mut inner.state, Lifecycle::Disposed);
            (state, std::mem::take(&mut inner.listeners))
        };

        for (_, listener) in &mut listeners {
            listener.dispose(device);
        }

        if let Lifecycle::Ready { objects, .. } = state {
            objects.delete(device);
        }
    }

    // ── listeners ─────────────────────────────────────────────────────────

    pub fn add_listener(&self, listener: Box<dyn FboListener<D>>) -> ListenerId {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        let id = ListenerId(inner.next_listener);
        inner.next_listener += 1;
        inner.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> Option<Box<dyn FboListener<D>>> {
        let guard = self.inner.lock();
        let mut inner = guard.borrow_mut();
        let index = inner.listeners.iter().position(|(l, _)| *l == id)?;
        Some(inner.listeners.remove(index).1)
    }

    // ── rendering ─────────────────────────────────────────────────────────

    /// Runs `body` with the target bound, then flushes and unbinds.
    ///
    /// The body receives the target's pixel bounds. It is not run if binding
    /// fails; unbinding happens whether or not the body succeeds.
    pub fn with_bound<T>(
        &self,
        device: &mut D,
        body: impl FnOnce(&mut D, Bounds) -> Result<T>,
    ) -> Result<T> {
        let _guard = self.inner.lock();
        self.bind(device)?;
        let result = body(device, self.bounds());
        device.flush();
        self.unbind(device);
        result
    }

    /// Like [`with_bound`](Self::with_bound), with the target's own context
    /// current for the duration.
    ///
    /// When `onscreen` is given it is released first and restored afterwards.
    pub fn sync_exec<T>(
        &self,
        device: &mut D,
        onscreen: Option<&dyn GlContext>,
        body: impl FnOnce(&mut D, Bounds) -> Result<T>,
    ) -> Result<T> {
        let offscreen = self.context.as_ref();
        let run = || self.with_bound(device, body);
        match onscreen {
            Some(onscreen) => with_offscreen(onscreen, offscreen, run),
            None => with_current(offscreen, run),
        }
    }

    /// Renders every listener into the target.
    pub fn draw(&self, device: &mut D, onscreen: Option<&dyn GlContext>) -> Result<()> {
        let guard = self.inner.lock();

        // Listeners run without the cell borrowed so they may query the target.
        let mut listeners = std::mem::take(&mut guard.borrow_mut().listeners);

        let result = self.sync_exec(device, onscreen, |device, bounds| {
            for (_, listener) in &mut listeners {
                listener.draw(device, bounds)?;
            }
            Ok(())
        });

        let mut inner = guard.borrow_mut();
        if matches!(inner.state, Lifecycle::Disposed) {
            // Disposed from inside a listener; the taken listeners were never notified.
            drop(inner);
            for (_, listener) in &mut listeners {
                listener.dispose(device);
            }
        } else {
            listeners.append(&mut inner.listeners);
            inner.listeners = listeners;
        }

        result
    }
}

impl<D: GlDevice> std::fmt::Debug for SimpleFrameBuffer<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (width, height) = self.size();
        f.debug_struct("SimpleFrameBuffer")
            .field("width", &width)
            .field("height", &height)
            .field("context", &self.context.id())
            .field("initialized", &self.is_initialized())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use parking_lot::Mutex;

    use super::*;
    use crate::device::{current, FramebufferStatus, TrackedContext};
    use crate::testing::{DeviceCall, RecordingDevice};

    fn fbo(w: u32, h: u32, config: FboConfig) -> SimpleFrameBuffer<RecordingDevice> {
        SimpleFrameBuffer::new(Box::new(TrackedContext::new()), w, h, config)
    }

    fn creates(dev: &RecordingDevice) -> usize {
        dev.count(|c| matches!(c, DeviceCall::CreateFramebuffer(_)))
    }

    #[derive(Default, Clone)]
    struct Events(Arc<Mutex<Vec<String>>>);

    struct Listener {
        name: &'static str,
        events: Events,
    }

    impl FboListener<RecordingDevice> for Listener {
        fn draw(&mut self, device: &mut RecordingDevice, bounds: Bounds) -> Result<()> {
            let bound = device.bound().is_some();
            self.events
                .0
                .lock()
                .push(format!("{} draw {}x{} bound={bound}", self.name, bounds.width, bounds.height));
            Ok(())
        }

        fn dispose(&mut self, _device: &mut RecordingDevice) {
            self.events.0.lock().push(format!("{} dispose", self.name));
        }
    }

    // ── bind / resize ─────────────────────────────────────────────────────

    #[test]
    fn first_bind_creates_later_binds_activate() {
        let mut dev = RecordingDevice::new();
        let target = fbo(64, 32, FboConfig::default());
        assert!(!target.is_initialized());

        target.bind(&mut dev).unwrap();
        target.bind(&mut dev).unwrap();

        assert_eq!(creates(&dev), 1);
        assert_eq!(dev.count(|c| matches!(c, DeviceCall::BindFramebuffer(Some(_)))), 2);
        assert!(target.is_initialized());
        assert!(dev.calls().contains(&DeviceCall::CreateTexture {
            texture: target.texture().unwrap(),
            width: 64,
            height: 32,
        }));
    }

    #[test]
    fn resize_rebuilds_once_on_next_bind() {
        let mut dev = RecordingDevice::new();
        let target = fbo(64, 32, FboConfig::default());
        target.bind(&mut dev).unwrap();
        let old = target.texture().unwrap();

        target.resize(128, 16);
        assert_eq!(creates(&dev), 1);
        assert_eq!(target.size(), (128, 16));

        target.bind(&mut dev).unwrap();
        target.bind(&mut dev).unwrap();

        assert_eq!(creates(&dev), 2);
        assert!(dev.calls().contains(&DeviceCall::DeleteTexture(old)));
        assert_ne!(target.texture(), Some(old));
    }

    #[test]
    fn resize_to_same_size_keeps_objects() {
        let mut dev = RecordingDevice::new();
        let target = fbo(64, 32, FboConfig::default());
        target.bind(&mut dev).unwrap();
        target.resize(64, 32);
        target.bind(&mut dev).unwrap();
        assert_eq!(creates(&dev), 1);
    }

    #[test]
    fn zero_size_is_raised_to_one() {
        let target = fbo(0, 10, FboConfig::default());
        assert_eq!(target.size(), (1, 10));
        target.resize(5, 0);
        assert_eq!(target.size(), (5, 1));
    }

    // ── attachments ───────────────────────────────────────────────────────

    fn renderbuffer_formats(dev: &RecordingDevice) -> Vec<RenderbufferFormat> {
        dev.calls()
            .iter()
            .filter_map(|c| match c {
                DeviceCall::CreateRenderbuffer { format, .. } => Some(*format),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn default_config_attaches_depth_only() {
        let mut dev = RecordingDevice::new();
        fbo(8, 8, FboConfig::default()).bind(&mut dev).unwrap();
        assert_eq!(renderbuffer_formats(&dev), vec![RenderbufferFormat::Depth]);
    }

    #[test]
    fn depth_and_stencil_share_one_renderbuffer() {
        let mut dev = RecordingDevice::new();
        let config = FboConfig { use_depth: true, use_stencil: true };
        fbo(8, 8, config).bind(&mut dev).unwrap();
        assert_eq!(renderbuffer_formats(&dev), vec![RenderbufferFormat::DepthStencil]);
        assert_eq!(
            dev.count(|c| matches!(
                c,
                DeviceCall::AttachRenderbuffer { attachment: Attachment::DepthStencil, .. }
            )),
            1
        );
    }

    #[test]
    fn color_only_target_has_no_renderbuffers() {
        let mut dev = RecordingDevice::new();
        let config = FboConfig { use_depth: false, use_stencil: false };
        fbo(8, 8, config).bind(&mut dev).unwrap();
        assert!(renderbuffer_formats(&dev).is_empty());
    }

    // ── device shortfalls ─────────────────────────────────────────────────

    #[test]
    fn oversize_target_is_still_created() {
        let mut dev = RecordingDevice::new();
        dev.max_texture_size = 256;
        let target = fbo(512, 16, FboConfig::default());
        target.bind(&mut dev).unwrap();
        assert!(target.is_initialized());
        assert_eq!(creates(&dev), 1);
    }

    #[test]
    fn incomplete_target_is_still_usable() {
        let mut dev = RecordingDevice::new();
        dev.forced_status = Some(FramebufferStatus::Unsupported);
        let target = fbo(16, 16, FboConfig::default());
        let value = target.with_bound(&mut dev, |_, _| Ok(3)).unwrap();
        assert_eq!(value, 3);
        assert!(target.is_initialized());
    }

    // ── with_bound / sync_exec ────────────────────────────────────────────

    #[test]
    fn with_bound_flushes_then_unbinds() {
        let mut dev = RecordingDevice::new();
        let target = fbo(16, 8, FboConfig::default());

        let seen = target
            .with_bound(&mut dev, |dev, bounds| Ok((dev.bound(), bounds)))
            .unwrap();

        assert!(seen.0.is_some());
        assert_eq!(seen.1, Bounds::sized(16, 8));
        assert_eq!(dev.bound(), None);

        let tail: Vec<_> = dev.calls().iter().rev().take(3).cloned().collect();
        assert_eq!(
            tail,
            vec![
                DeviceCall::GenerateMipmaps(target.texture().unwrap()),
                DeviceCall::BindFramebuffer(None),
                DeviceCall::Flush,
            ]
        );
    }

    #[test]
    fn with_bound_unbinds_after_body_error() {
        let mut dev = RecordingDevice::new();
        let target = fbo(16, 8, FboConfig::default());
        let result: Result<()> = target.with_bound(&mut dev, |_, _| Err(Error::NotMapped));
        assert!(matches!(result, Err(Error::NotMapped)));
        assert_eq!(dev.bound(), None);
    }

    #[test]
    fn body_may_query_the_target() {
        let mut dev = RecordingDevice::new();
        let target = fbo(16, 8, FboConfig::default());
        let size = target.with_bound(&mut dev, |_, _| Ok(target.size())).unwrap();
        assert_eq!(size, (16, 8));
    }

    #[test]
    fn sync_exec_switches_to_own_context() {
        let mut dev = RecordingDevice::new();
        let onscreen = TrackedContext::new();
        let target = fbo(4, 4, FboConfig::default());
        onscreen.make_current().unwrap();

        let inside = target
            .sync_exec(&mut dev, Some(&onscreen), |_, _| Ok(current()))
            .unwrap();

        assert_eq!(inside, Some(target.context().id()));
        assert_eq!(current(), Some(onscreen.id()));
        onscreen.release().unwrap();
    }

    #[test]
    fn sync_exec_without_onscreen_leaves_thread_idle() {
        let mut dev = RecordingDevice::new();
        let target = fbo(4, 4, FboConfig::default());
        target.sync_exec(&mut dev, None, |_, _| Ok(())).unwrap();
        assert_eq!(current(), None);
    }

    // ── listeners / dispose ───────────────────────────────────────────────

    #[test]
    fn draw_invokes_listeners_in_order() {
        let mut dev = RecordingDevice::new();
        let events = Events::default();
        let target = fbo(10, 20, FboConfig::default());
        target.add_listener(Box::new(Listener { name: "a", events: events.clone() }));
        target.add_listener(Box::new(Listener { name: "b", events: events.clone() }));

        target.draw(&mut dev, None).unwrap();
        target.draw(&mut dev, None).unwrap();

        assert_eq!(
            *events.0.lock(),
            vec![
                "a draw 10x20 bound=true",
                "b draw 10x20 bound=true",
                "a draw 10x20 bound=true",
                "b draw 10x20 bound=true",
            ]
        );
    }

    #[test]
    fn removed_listener_is_not_drawn() {
        let mut dev = RecordingDevice::new();
        let events = Events::default();
        let target = fbo(1, 1, FboConfig::default());
        let id = target.add_listener(Box::new(Listener { name: "a", events: events.clone() }));

        assert!(target.remove_listener(id).is_some());
        assert!(target.remove_listener(id).is_none());
        target.draw(&mut dev, None).unwrap();
        assert!(events.0.lock().is_empty());
    }

    #[test]
    fn dispose_is_idempotent() {
        let mut dev = RecordingDevice::new();
        let events = Events::default();
        let target = fbo(8, 8, FboConfig::default());
        target.add_listener(Box::new(Listener { name: "a", events: events.clone() }));
        target.bind(&mut dev).unwrap();
        target.unbind(&mut dev);

        target.dispose(&mut dev);
        target.dispose(&mut dev);

        assert_eq!(*events.0.lock(), vec!["a dispose"]);
        assert_eq!(dev.count(|c| matches!(c, DeviceCall::DeleteFramebuffer(_))), 1);
        assert_eq!(dev.count(|c| matches!(c, DeviceCall::DeleteTexture(_))), 1);
        assert_eq!(dev.count(|c| matches!(c, DeviceCall::DeleteRenderbuffer(_))), 1);
        assert!(target.is_disposed());
        assert_eq!(target.texture(), None);
    }

    #[test]
    fn dispose_before_bind_deletes_nothing() {
        let mut dev = RecordingDevice::new();
        let target = fbo(8, 8, FboConfig::default());
        target.dispose(&mut dev);
        assert!(dev.calls().is_empty());
    }

    #[test]
    fn bind_after_dispose_fails() {
        let mut dev = RecordingDevice::new();
        let target = fbo(8, 8, FboConfig::default());
        target.dispose(&mut dev);
        assert!(matches!(target.bind(&mut dev), Err(Error::Disposed)));
        assert!(matches!(target.with_bound(&mut dev, |_, _| Ok(())), Err(Error::Disposed)));
    }
}
