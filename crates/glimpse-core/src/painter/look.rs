/// Shared style values handed down a painter tree.
#[derive(Debug, Clone, PartialEq)]
pub struct LookAndFeel {
    /// Straight RGBA.
    pub background: [f32; 4],
    /// Straight RGBA.
    pub line_color: [f32; 4],
    /// Line width in device pixels.
    pub line_width: f32,
}

impl Default for LookAndFeel {
    fn default() -> Self {
        Self {
            background: [1.0, 1.0, 1.0, 1.0],
            line_color: [0.0, 0.0, 0.0, 1.0],
            line_width: 1.0,
        }
    }
}
