use std::time::{Duration, Instant};

use image::RgbaImage;
use log::{debug, info};
use thiserror::Error;

/// Minimum interval between two accepted captures. The platform sometimes
/// fires several notifications for one copy; nobody takes screenshots faster.
pub const CLIPBOARD_COOLDOWN: Duration = Duration::from_millis(200);

/// Fetch attempts per accepted notification.
pub const MAX_FETCH_ATTEMPTS: usize = 3;

#[derive(Debug, Error)]
pub enum ClipboardError {
    #[error("clipboard could not be opened: {0}")]
    Unavailable(String),

    #[error("clipboard image format unknown: {0}")]
    FormatUnknown(String),

    #[error("clipboard holds no image")]
    Empty,

    #[error("clipboard image has invalid size {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
}

/// Access to the system clipboard.
pub trait ClipboardSource {
    fn has_image(&mut self) -> bool;

    /// Platform change counter. Bumped whenever the clipboard contents change.
    fn sequence(&mut self) -> u64;

    fn get_image(&mut self) -> Result<RgbaImage, ClipboardError>;
}

/// Turns noisy clipboard-changed notifications into new images.
#[derive(Debug)]
pub struct ClipboardWatcher {
    last_sequence: u64,
    last_accepted: Option<Instant>,
}

impl ClipboardWatcher {
    /// `initial_sequence` is the counter at startup, so whatever is already
    /// on the clipboard is not captured.
    pub fn new(initial_sequence: u64) -> Self {
        Self {
            last_sequence: initial_sequence,
            last_accepted: None,
        }
    }

    #[cfg(test)]
    pub fn last_sequence(&self) -> u64 {
        self.last_sequence
    }

    /// Handles one clipboard-changed notification received at `now`.
    /// Returns the image to add to the gallery, if any.
    pub fn on_clipboard_update<S>(&mut self, source: &mut S, now: Instant) -> Option<RgbaImage>
    where
        S: ClipboardSource + ?Sized,
    {
        if !source.has_image() {
            return None;
        }

        let sequence = source.sequence();
        if sequence == self.last_sequence {
            debug!("Clipboard sequence {} unchanged, ignoring notification", sequence);
            return None;
        }
        self.last_sequence = sequence;

        if let Some(last) = self.last_accepted {
            if now.saturating_duration_since(last) < CLIPBOARD_COOLDOWN {
                debug!(
                    "Within cooldown window ({}ms), ignoring sequence {}",
                    CLIPBOARD_COOLDOWN.as_millis(),
                    sequence
                );
                return None;
            }
        }
        self.last_accepted = Some(now);

        let image = Self::fetch_with_retry(source)?;
        info!(
            "New clipboard image (sequence {}): {}x{}",
            sequence,
            image.width(),
            image.height()
        );
        Some(image)
    }

    fn fetch_with_retry<S>(source: &mut S) -> Option<RgbaImage>
    where
        S: ClipboardSource + ?Sized,
    {
        let mut attempt = 0;
        while attempt < MAX_FETCH_ATTEMPTS {
            attempt += 1;
            match source.get_image() {
                Ok(image) if image.width() > 0 && image.height() > 0 => return Some(image),
                Ok(image) => debug!(
                    "Attempt {}: {}",
                    attempt,
                    ClipboardError::InvalidDimensions {
                        width: image.width(),
                        height: image.height(),
                    }
                ),
                Err(e) => debug!("Attempt {}: {}", attempt, e),
            }
        }

        debug!(
            "Giving up on clipboard image after {} attempts",
            MAX_FETCH_ATTEMPTS
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::Gallery;
    use std::collections::VecDeque;

    /// Clipboard whose contents and failures are scripted by the test.
    #[derive(Default)]
    struct ScriptedClipboard {
        image: Option<RgbaImage>,
        sequence: u64,
        failures: VecDeque<ClipboardError>,
        fetches: usize,
    }

    impl ScriptedClipboard {
        fn copy(&mut self, image: RgbaImage) {
            self.image = Some(image);
            self.sequence += 1;
        }
    }

    impl ClipboardSource for ScriptedClipboard {
        fn has_image(&mut self) -> bool {
            self.image.is_some()
        }

        fn sequence(&mut self) -> u64 {
            self.sequence
        }

        fn get_image(&mut self) -> Result<RgbaImage, ClipboardError> {
            self.fetches += 1;
            if let Some(err) = self.failures.pop_front() {
                return Err(err);
            }
            self.image.clone().ok_or(ClipboardError::Empty)
        }
    }

    fn image(width: u32, height: u32) -> RgbaImage {
        RgbaImage::new(width, height)
    }

    fn ms(base: Instant, millis: u64) -> Instant {
        base + Duration::from_millis(millis)
    }

    #[test]
    fn ignores_clipboard_without_image() {
        let mut clipboard = ScriptedClipboard {
            sequence: 5,
            ..Default::default()
        };
        let mut watcher = ClipboardWatcher::new(0);

        assert!(watcher.on_clipboard_update(&mut clipboard, Instant::now()).is_none());
        assert_eq!(clipboard.fetches, 0);
        assert_eq!(watcher.last_sequence(), 0);
    }

    #[test]
    fn ignores_repeated_sequence() {
        let base = Instant::now();
        let mut clipboard = ScriptedClipboard::default();
        let mut watcher = ClipboardWatcher::new(0);

        clipboard.copy(image(4, 4));
        assert!(watcher.on_clipboard_update(&mut clipboard, base).is_some());

        assert!(watcher
            .on_clipboard_update(&mut clipboard, ms(base, 1000))
            .is_none());
        assert_eq!(clipboard.fetches, 1);
    }

    #[test]
    fn startup_contents_are_not_captured() {
        let mut clipboard = ScriptedClipboard::default();
        clipboard.copy(image(2, 2));
        let mut watcher = ClipboardWatcher::new(clipboard.sequence);

        assert!(watcher.on_clipboard_update(&mut clipboard, Instant::now()).is_none());
    }

    #[test]
    fn cooldown_records_sequence_but_drops_image() {
        let base = Instant::now();
        let mut clipboard = ScriptedClipboard::default();
        let mut watcher = ClipboardWatcher::new(0);

        clipboard.copy(image(1, 1));
        assert!(watcher.on_clipboard_update(&mut clipboard, base).is_some());

        clipboard.copy(image(2, 2));
        assert!(watcher.on_clipboard_update(&mut clipboard, ms(base, 199)).is_none());
        assert_eq!(watcher.last_sequence(), 2);

        // Same sequence again after the cooldown: still a duplicate.
        assert!(watcher.on_clipboard_update(&mut clipboard, ms(base, 500)).is_none());
    }

    #[test]
    fn cooldown_is_measured_from_last_accepted_capture() {
        let base = Instant::now();
        let mut clipboard = ScriptedClipboard::default();
        let mut watcher = ClipboardWatcher::new(0);

        clipboard.copy(image(1, 1));
        assert!(watcher.on_clipboard_update(&mut clipboard, base).is_some());
        clipboard.copy(image(1, 1));
        assert!(watcher.on_clipboard_update(&mut clipboard, ms(base, 150)).is_none());
        clipboard.copy(image(1, 1));
        assert!(watcher.on_clipboard_update(&mut clipboard, ms(base, 200)).is_some());
    }

    #[test]
    fn retries_transient_failures() {
        let mut clipboard = ScriptedClipboard::default();
        clipboard.copy(image(3, 2));
        clipboard.failures.extend([
            ClipboardError::FormatUnknown("DIB".into()),
            ClipboardError::FormatUnknown("DIB".into()),
        ]);
        let mut watcher = ClipboardWatcher::new(0);

        let captured = watcher.on_clipboard_update(&mut clipboard, Instant::now());
        assert_eq!(captured.map(|i| i.dimensions()), Some((3, 2)));
        assert_eq!(clipboard.fetches, 3);
    }

    #[test]
    fn gives_up_after_three_attempts() {
        let mut clipboard = ScriptedClipboard::default();
        clipboard.copy(image(8, 8));
        clipboard.failures.extend([
            ClipboardError::FormatUnknown("DIB".into()),
            ClipboardError::Unavailable("busy".into()),
            ClipboardError::FormatUnknown("DIB".into()),
        ]);
        let mut watcher = ClipboardWatcher::new(0);

        assert!(watcher.on_clipboard_update(&mut clipboard, Instant::now()).is_none());
        assert_eq!(clipboard.fetches, 3);
    }

    #[test]
    fn zero_sized_image_counts_as_failed_attempt() {
        let mut clipboard = ScriptedClipboard::default();
        clipboard.copy(image(0, 0));
        let mut watcher = ClipboardWatcher::new(0);

        assert!(watcher.on_clipboard_update(&mut clipboard, Instant::now()).is_none());
        assert_eq!(clipboard.fetches, MAX_FETCH_ATTEMPTS);
    }

    #[test]
    fn spaced_notifications_fill_gallery_newest_first() {
        let base = Instant::now();
        let mut clipboard = ScriptedClipboard::default();
        let mut watcher = ClipboardWatcher::new(0);
        let mut gallery = Gallery::new();

        for (i, at) in [0u64, 200, 450, 1000].into_iter().enumerate() {
            clipboard.copy(image(i as u32 + 1, 1));
            if let Some(img) = watcher.on_clipboard_update(&mut clipboard, ms(base, at)) {
                gallery.insert(img);
            }
        }

        let widths: Vec<u32> = gallery.entries().map(|e| e.width()).collect();
        assert_eq!(widths, vec![4, 3, 2, 1]);
    }

    #[test]
    fn burst_within_cooldown_keeps_first_and_later_images() {
        let base = Instant::now();
        let mut clipboard = ScriptedClipboard::default();
        let mut watcher = ClipboardWatcher::new(0);
        let mut gallery = Gallery::new();

        for (width, at) in [(10, 0), (20, 50), (30, 300)] {
            clipboard.copy(image(width, 5));
            if let Some(img) = watcher.on_clipboard_update(&mut clipboard, ms(base, at)) {
                gallery.insert(img);
            }
        }

        let widths: Vec<u32> = gallery.entries().map(|e| e.width()).collect();
        assert_eq!(widths, vec![30, 10]);
    }
}
