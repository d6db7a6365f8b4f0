use serde::{Deserialize, Serialize};

use crate::gallery::{EntryId, Gallery, ThumbnailEntry};
use crate::zoom::ZoomLevel;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThumbnailView {
    pub id: EntryId,
    pub width: u32,
    pub height: u32,
    pub display_width: Option<u32>,
    pub display_height: Option<u32>,
    pub visible: bool,
    pub hovered: bool,
    pub captured_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GalleryView {
    pub zoom_index: usize,
    pub zoom_percent: u32,
    pub zoom_max: usize,
    pub entries: Vec<ThumbnailView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewerSize {
    pub width: u32,
    pub height: u32,
}

impl From<&ThumbnailEntry> for ThumbnailView {
    fn from(entry: &ThumbnailEntry) -> Self {
        let display = entry.display_size();
        Self {
            id: entry.id(),
            width: entry.width(),
            height: entry.height(),
            display_width: display.map(|(w, _)| w),
            display_height: display.map(|(_, h)| h),
            visible: entry.is_visible(),
            hovered: entry.is_hovered(),
            captured_at: entry.captured_at().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl From<&Gallery> for GalleryView {
    fn from(gallery: &Gallery) -> Self {
        Self {
            zoom_index: gallery.zoom().index(),
            zoom_percent: gallery.zoom().percent(),
            zoom_max: ZoomLevel::MAX.index(),
            entries: gallery.entries().map(ThumbnailView::from).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbaImage;

    #[test]
    fn gallery_view_lists_entries_in_display_order() {
        let mut gallery = Gallery::new();
        gallery.resize(800);
        let old = gallery.insert(RgbaImage::new(1000, 500));
        let new = gallery.insert(RgbaImage::new(10, 10));
        gallery.set_visible(old, false).unwrap();

        let view = GalleryView::from(&gallery);
        assert_eq!(view.zoom_percent, 100);
        assert_eq!(view.zoom_max, 18);

        let ids: Vec<EntryId> = view.entries.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![new, old]);
        assert!(!view.entries[1].visible);
        assert_eq!(view.entries[1].display_width, Some(768));
        assert_eq!(view.entries[1].display_height, Some(384));

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["entries"][0]["display_width"], 10);
    }
}
