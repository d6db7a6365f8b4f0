use std::collections::VecDeque;
use std::io::Cursor;

use chrono::{DateTime, Local};
use image::{ImageFormat, RgbaImage};
use log::debug;
use thiserror::Error;

use crate::zoom::ZoomLevel;

pub type EntryId = u64;

/// Thumbnails never get narrower than this, whatever the zoom.
pub const MIN_IMAGE_WIDTH: u32 = 10;

/// Share of the viewport width handed to thumbnails. The flow layout wraps
/// early if we use all of it.
const USABLE_WIDTH_PERCENT: u64 = 96;

#[derive(Debug, Error)]
pub enum GalleryError {
    #[error("no thumbnail with id {0}")]
    UnknownEntry(EntryId),

    #[error("zoom index {0} out of range")]
    InvalidZoom(usize),
}

pub type Result<T> = std::result::Result<T, GalleryError>;

/// One captured clipboard image and its display state.
#[derive(Debug)]
pub struct ThumbnailEntry {
    id: EntryId,
    image: RgbaImage,
    captured_at: DateTime<Local>,
    visible: bool,
    hovered: bool,
    display_size: Option<(u32, u32)>,
}

impl ThumbnailEntry {
    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    #[cfg(test)]
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    /// Bounding box from the last layout pass, `None` until one ran.
    pub fn display_size(&self) -> Option<(u32, u32)> {
        self.display_size
    }

    /// Full-size PNG encoding for the frontend.
    pub fn to_png(&self) -> image::ImageResult<Vec<u8>> {
        let mut output = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
        Ok(output)
    }
}

/// Size of a `width` x `height` image at `zoom` inside a viewport of
/// `viewport_width` pixels. Always derived from the original size.
pub fn fit_size(width: u32, height: u32, zoom: ZoomLevel, viewport_width: u32) -> (u32, u32) {
    if width == 0 {
        return (0, 0);
    }

    let (width, height) = (u64::from(width), u64::from(height));
    let zoomed = ((width * u64::from(zoom.percent()) + 50) / 100).max(u64::from(MIN_IMAGE_WIDTH));
    let usable = u64::from(viewport_width) * USABLE_WIDTH_PERCENT / 100;
    let target_width = zoomed.min(usable);
    let target_height = (target_width * height + width / 2) / width;

    (
        u32::try_from(target_width).unwrap_or(u32::MAX),
        u32::try_from(target_height).unwrap_or(u32::MAX),
    )
}

/// Ordered thumbnail collection, newest first.
#[derive(Debug, Default)]
pub struct Gallery {
    entries: VecDeque<ThumbnailEntry>,
    next_id: EntryId,
    zoom: ZoomLevel,
    viewport_width: u32,
}

impl Gallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, image: RgbaImage) -> EntryId {
        let id = self.next_id;
        self.next_id += 1;

        self.entries.push_front(ThumbnailEntry {
            id,
            image,
            captured_at: Local::now(),
            visible: true,
            hovered: false,
            display_size: None,
        });
        self.recompute_layout();
        id
    }

    pub fn zoom(&self) -> ZoomLevel {
        self.zoom
    }

    /// Returns whether the zoom changed.
    pub fn set_zoom(&mut self, zoom: ZoomLevel) -> bool {
        if zoom == self.zoom {
            return false;
        }
        self.zoom = zoom;
        self.recompute_layout();
        true
    }

    pub fn set_zoom_index(&mut self, index: usize) -> Result<bool> {
        let zoom = ZoomLevel::from_index(index).ok_or(GalleryError::InvalidZoom(index))?;
        Ok(self.set_zoom(zoom))
    }

    /// Records the viewport's client width and re-flows if it changed.
    pub fn resize(&mut self, viewport_width: u32) -> bool {
        if viewport_width == self.viewport_width {
            return false;
        }
        self.viewport_width = viewport_width;
        self.recompute_layout();
        true
    }

    /// Sizes every visible entry for the current zoom and viewport. Does
    /// nothing until the viewport has a width.
    pub fn recompute_layout(&mut self) {
        if self.viewport_width == 0 {
            debug!("Viewport not realized yet, deferring layout");
            return;
        }

        let (zoom, viewport_width) = (self.zoom, self.viewport_width);
        for entry in self.entries.iter_mut().filter(|e| e.visible) {
            entry.display_size = Some(fit_size(
                entry.width(),
                entry.height(),
                zoom,
                viewport_width,
            ));
        }
    }

    pub fn set_visible(&mut self, id: EntryId, visible: bool) -> Result<()> {
        let entry = self.entry_mut(id)?;
        if entry.visible == visible {
            return Ok(());
        }
        entry.visible = visible;
        if visible {
            self.recompute_layout();
        }
        Ok(())
    }

    pub fn set_all_visible(&mut self, visible: bool) {
        for entry in self.entries.iter_mut() {
            entry.visible = visible;
        }
        if visible {
            self.recompute_layout();
        }
    }

    pub fn set_hover(&mut self, id: EntryId, hovered: bool) -> Result<()> {
        self.entry_mut(id)?.hovered = hovered;
        Ok(())
    }

    pub fn remove_all(&mut self) {
        debug!("Removing {} thumbnails", self.entries.len());
        self.entries.clear();
    }

    pub fn get(&self, id: EntryId) -> Option<&ThumbnailEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    /// Entries in display order.
    pub fn entries(&self) -> impl Iterator<Item = &ThumbnailEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    fn entry_mut(&mut self, id: EntryId) -> Result<&mut ThumbnailEntry> {
        self.entries
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or(GalleryError::UnknownEntry(id))
    }
}
