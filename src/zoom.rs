/// Zoom levels in percent: 10% - 100% in 10% steps, then 200% - 1000% in 100% steps.
pub const ZOOM_LEVELS: [u32; 19] = [
    10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 200, 300, 400, 500, 600, 700, 800, 900, 1000,
];

const DEFAULT_INDEX: usize = 9;

/// Index into [`ZOOM_LEVELS`]. Always within bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ZoomLevel(usize);

impl ZoomLevel {
    pub const MIN: ZoomLevel = ZoomLevel(0);
    pub const MAX: ZoomLevel = ZoomLevel(ZOOM_LEVELS.len() - 1);

    /// Returns `None` when `index` is outside the table.
    pub fn from_index(index: usize) -> Option<Self> {
        (index < ZOOM_LEVELS.len()).then_some(Self(index))
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn percent(self) -> u32 {
        ZOOM_LEVELS[self.0]
    }

    /// One step per wheel event, whatever the magnitude of `delta`.
    pub fn stepped(self, delta: i32) -> Self {
        if delta > 0 && self < Self::MAX {
            Self(self.0 + 1)
        } else if delta < 0 && self > Self::MIN {
            Self(self.0 - 1)
        } else {
            self
        }
    }
}

impl Default for ZoomLevel {
    fn default() -> Self {
        Self(DEFAULT_INDEX)
    }
}

impl PartialOrd for ZoomLevel {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ZoomLevel {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.cmp(&other.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_one_hundred_percent() {
        assert_eq!(ZoomLevel::default().percent(), 100);
        assert_eq!(ZoomLevel::default().index(), 9);
    }

    #[test]
    fn table_is_strictly_increasing() {
        assert!(ZOOM_LEVELS.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ZoomLevel::MAX.percent(), 1000);
        assert_eq!(ZoomLevel::MIN.percent(), 10);
    }

    #[test]
    fn rejects_out_of_range_index() {
        assert!(ZoomLevel::from_index(18).is_some());
        assert!(ZoomLevel::from_index(19).is_none());
    }

    #[test]
    fn wheel_moves_a_single_step_and_clamps() {
        let zoom = ZoomLevel::default();
        assert_eq!(zoom.stepped(120).percent(), 200);
        assert_eq!(zoom.stepped(-480).percent(), 90);
        assert_eq!(zoom.stepped(0), zoom);
        assert_eq!(ZoomLevel::MAX.stepped(1), ZoomLevel::MAX);
        assert_eq!(ZoomLevel::MIN.stepped(-1), ZoomLevel::MIN);
    }
}
