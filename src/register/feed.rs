use std::sync::{Mutex, MutexGuard};

use log::debug;

use super::PhotoRecord;

#[derive(Debug, Default)]
struct FeedState {
    photos: Option<Vec<PhotoRecord>>,
    generation: u64,
}

/// Cached listing of photos shared with whatever displays them
///
/// The listing is `None` until first fetched and again after every
/// invalidation. The generation counter moves on every change so readers can
/// tell their copy is out of date.
#[derive(Debug, Default)]
pub struct PhotoFeed {
    state: Mutex<FeedState>,
}

impl PhotoFeed {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FeedState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> Option<Vec<PhotoRecord>> {
        self.lock().photos.clone()
    }

    pub fn replace(&self, photos: Vec<PhotoRecord>) {
        let mut state = self.lock();
        debug!("Photo feed replaced with {} photos", photos.len());
        state.photos = Some(photos);
        state.generation += 1;
    }

    pub fn invalidate(&self) {
        let mut state = self.lock();
        debug!("Photo feed invalidated");
        state.photos = None;
        state.generation += 1;
    }

    pub fn is_stale(&self) -> bool {
        self.lock().photos.is_none()
    }

    pub fn generation(&self) -> u64 {
        self.lock().generation
    }
}
