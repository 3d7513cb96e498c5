//! In-memory list of captured photos.

use std::sync::Arc;

use image::RgbaImage;
use log::debug;

/// Upright photo as produced by [`crate::rotation::normalize`]. Never mutated
/// after capture.
pub type CapturedImage = Arc<RgbaImage>;

type Observer = Box<dyn FnMut(&[CapturedImage])>;

/// Append-only, observable list of photos in capture order.
///
/// Every append publishes a fresh snapshot; snapshots handed out earlier keep
/// their contents.
#[derive(Default)]
pub struct PhotoGallery {
    photos: Arc<Vec<CapturedImage>>,
    observers: Vec<Observer>,
}

impl PhotoGallery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_take_photo(&mut self, image: CapturedImage) {
        let mut next = Vec::with_capacity(self.photos.len() + 1);
        next.extend(self.photos.iter().cloned());
        next.push(image);
        self.photos = Arc::new(next);
        debug!("gallery now holds {} photos", self.photos.len());

        for observer in self.observers.iter_mut() {
            observer(&self.photos);
        }
    }

    pub fn snapshot(&self) -> Arc<Vec<CapturedImage>> {
        Arc::clone(&self.photos)
    }

    /// Called synchronously with the new snapshot after each append.
    pub fn subscribe(&mut self, observer: impl FnMut(&[CapturedImage]) + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use std::{cell::RefCell, rc::Rc};

    fn photo(shade: u8) -> CapturedImage {
        Arc::new(RgbaImage::from_pixel(2, 2, Rgba([shade, shade, shade, 255])))
    }

    #[test]
    fn keeps_capture_order_without_dedupe() {
        let mut gallery = PhotoGallery::new();
        let shots = [photo(10), photo(20), photo(10), photo(30)];
        for shot in &shots {
            gallery.on_take_photo(Arc::clone(shot));
        }

        let snapshot = gallery.snapshot();
        assert_eq!(snapshot.len(), shots.len());
        for (stored, taken) in snapshot.iter().zip(&shots) {
            assert!(Arc::ptr_eq(stored, taken));
        }
    }

    #[test]
    fn old_snapshots_are_unchanged() {
        let mut gallery = PhotoGallery::new();
        gallery.on_take_photo(photo(1));
        let before = gallery.snapshot();
        gallery.on_take_photo(photo(2));

        assert_eq!(before.len(), 1);
        assert_eq!(gallery.len(), 2);
    }

    #[test]
    fn observers_see_every_snapshot() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut gallery = PhotoGallery::new();
        gallery.subscribe({
            let seen = Rc::clone(&seen);
            move |photos| seen.borrow_mut().push(photos.len())
        });

        assert!(gallery.is_empty());
        for shade in 0..3 {
            gallery.on_take_photo(photo(shade));
        }
        assert_eq!(*seen.borrow(), vec![1, 2, 3]);
    }
}
