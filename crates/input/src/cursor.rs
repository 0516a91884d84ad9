use glam::Vec2;

/// How the window treats the cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CursorMode {
    /// Visible and free to leave the window.
    #[default]
    Normal,
    /// Hidden and confined to the window while mouse-look is active.
    Captured,
}

/// Cursor side effects requested by input consumers.
pub trait CursorControl {
    fn set_mode(&mut self, mode: CursorMode);

    /// Move the cursor to `position` in window pixels.
    fn warp(&mut self, position: Vec2);
}

/// A cursor with no window behind it. Remembers what was requested.
#[derive(Debug, Clone, Default)]
pub struct VirtualCursor {
    pub mode: CursorMode,
    pub warps: Vec<Vec2>,
}

impl VirtualCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_warp(&self) -> Option<Vec2> {
        self.warps.last().copied()
    }
}

impl CursorControl for VirtualCursor {
    fn set_mode(&mut self, mode: CursorMode) {
        self.mode = mode;
    }

    fn warp(&mut self, position: Vec2) {
        self.warps.push(position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn virtual_cursor_records_requests() {
        let mut cursor = VirtualCursor::new();
        cursor.set_mode(CursorMode::Captured);
        cursor.warp(Vec2::new(400.0, 300.0));
        assert_eq!(cursor.mode, CursorMode::Captured);
        assert_eq!(cursor.last_warp(), Some(Vec2::new(400.0, 300.0)));
    }
}
