/// Integer pixel rectangle inside a render target.
///
/// This is what painters receive: the region of the bound target they are
/// allowed to draw into.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Bounds covering a whole `width` x `height` target.
    #[inline]
    pub const fn sized(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }
}
