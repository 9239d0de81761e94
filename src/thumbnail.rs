use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::client::{RemoteClient, Thumbnail};

#[derive(Debug, Default)]
pub struct ThumbnailBank {
    entries: Mutex<HashMap<i64, Arc<Thumbnail>>>,
}

impl ThumbnailBank {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, image_id: i64) -> Option<Arc<Thumbnail>> {
        self.entries
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .get(&image_id)
            .cloned()
    }

    pub fn insert(&self, thumbnail: Thumbnail) -> Arc<Thumbnail> {
        let thumbnail = Arc::new(thumbnail);
        self.entries
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .insert(thumbnail.image_id, Arc::clone(&thumbnail));
        thumbnail
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|err| err.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn load_thumbnail<C: RemoteClient + ?Sized>(
    client: &C,
    bank: &ThumbnailBank,
    image_id: i64,
    size: u32,
) -> Option<Arc<Thumbnail>> {
    match client.thumbnail(image_id, size) {
        Ok(thumbnail) => Some(bank.insert(thumbnail)),
        Err(err) => {
            tracing::error!(image_id, size, error = ?err, "thumbnail request failed");
            None
        }
    }
}
