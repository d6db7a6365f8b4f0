use crate::gallery::EntryId;
use crate::types::ViewerSize;

/// Display state of the full-size image window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullSizeViewer {
    entry: EntryId,
    original: (u32, u32),
    size: (u32, u32),
}

impl FullSizeViewer {
    /// Opens at the image's natural size.
    pub fn new(entry: EntryId, width: u32, height: u32) -> Self {
        Self {
            entry,
            original: (width, height),
            size: (width, height),
        }
    }

    pub fn entry(&self) -> EntryId {
        self.entry
    }

    pub fn size(&self) -> ViewerSize {
        ViewerSize {
            width: self.size.0,
            height: self.size.1,
        }
    }

    /// Zooms by 10% of the original size per wheel event. Each axis stops
    /// shrinking once another step would take it to zero.
    pub fn wheel(&mut self, delta: i32) -> ViewerSize {
        let grow = match delta.signum() {
            1 => true,
            -1 => false,
            _ => return self.size(),
        };

        self.size = (
            step(self.size.0, self.original.0 / 10, grow),
            step(self.size.1, self.original.1 / 10, grow),
        );
        self.size()
    }
}

fn step(current: u32, increment: u32, grow: bool) -> u32 {
    if grow {
        current.saturating_add(increment)
    } else if current > increment {
        current - increment
    } else {
        current
    }
}
