//! Photo list shared between the capture side of a photo booth and the compositor host.
//!
//! A single owner mutates the session through `&mut`; readers borrow it. The order of the list
//! is the order in which photos fill the frame's windows.

use crate::assets::Bitmap;
use crate::assets::loader::ImageSource;

/// Photos a booth session accepts before refusing new shots.
pub const DEFAULT_MAX_PHOTOS: usize = 4;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("session is full ({max} photos)")]
    Full { max: usize },

    #[error("photo index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no photo with id {0}")]
    UnknownId(u64),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Photo {
    /// Stable identity, unique within the session.
    pub id: u64,
    pub image: Bitmap,
}

#[derive(Clone, Debug)]
pub struct PhotoSession {
    photos: Vec<Photo>,
    max_photos: usize,
    next_id: u64,
}

impl Default for PhotoSession {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PHOTOS)
    }
}

impl PhotoSession {
    /// `max_photos == 0` means unlimited.
    pub fn new(max_photos: usize) -> Self {
        Self {
            photos: Vec::new(),
            max_photos,
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.max_photos != 0 && self.photos.len() >= self.max_photos
    }

    pub fn max_photos(&self) -> usize {
        self.max_photos
    }

    pub fn photos(&self) -> &[Photo] {
        &self.photos
    }

    /// Append a shot and return its id.
    pub fn add(&mut self, image: Bitmap) -> Result<u64, SessionError> {
        if self.is_full() {
            return Err(SessionError::Full {
                max: self.max_photos,
            });
        }
        let id = self.next_id;
        self.next_id += 1;
        self.photos.push(Photo { id, image });
        Ok(id)
    }

    pub fn remove(&mut self, index: usize) -> Result<Photo, SessionError> {
        self.check_index(index)?;
        Ok(self.photos.remove(index))
    }

    pub fn remove_by_id(&mut self, id: u64) -> Result<Photo, SessionError> {
        let index = self
            .photos
            .iter()
            .position(|p| p.id == id)
            .ok_or(SessionError::UnknownId(id))?;
        Ok(self.photos.remove(index))
    }

    /// Move the photo at `from` so it ends up at `to`, shifting the ones in between.
    pub fn move_photo(&mut self, from: usize, to: usize) -> Result<(), SessionError> {
        self.check_index(from)?;
        self.check_index(to)?;
        let photo = self.photos.remove(from);
        self.photos.insert(to, photo);
        Ok(())
    }

    pub fn clear(&mut self) {
        self.photos.clear();
    }

    /// Sources for [`crate::FrameCompositor::set_content_images`], in session order.
    pub fn sources(&self) -> Vec<ImageSource> {
        self.photos
            .iter()
            .map(|p| ImageSource::Bitmap(p.image.clone()))
            .collect()
    }

    fn check_index(&self, index: usize) -> Result<(), SessionError> {
        if index >= self.photos.len() {
            return Err(SessionError::IndexOutOfRange {
                index,
                len: self.photos.len(),
            });
        }
        Ok(())
    }
}
