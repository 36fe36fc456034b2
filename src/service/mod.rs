//! Async content service
//!
//! Runs blocking store calls on tokio's blocking pool so a request layer can
//! keep many calls in flight at once.

use std::sync::Arc;

use crate::contents::ContentStore;
use crate::error::ContentsError;
use crate::model::{ContentModel, ContentType, Format, SaveModel};
use crate::storage::FilesystemAdapter;

pub struct ContentService<B> {
    store: Arc<ContentStore<B>>,
}

impl<B> Clone for ContentService<B> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<B: FilesystemAdapter + 'static> ContentService<B> {
    pub fn new(store: ContentStore<B>) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    pub fn store(&self) -> &ContentStore<B> {
        &self.store
    }

    pub async fn get(
        &self,
        path: impl Into<String>,
        content: bool,
        content_type: Option<ContentType>,
        format: Option<Format>,
    ) -> Result<ContentModel, ContentsError> {
        let path = path.into();
        self.run(move |store| store.get(&path, content, content_type, format))
            .await
    }

    pub async fn save(
        &self,
        model: SaveModel,
        path: impl Into<String>,
    ) -> Result<ContentModel, ContentsError> {
        let path = path.into();
        self.run(move |store| store.save(&model, &path)).await
    }

    pub async fn delete(&self, path: impl Into<String>) -> Result<(), ContentsError> {
        let path = path.into();
        self.run(move |store| store.delete(&path)).await
    }

    pub async fn rename(
        &self,
        old_path: impl Into<String>,
        new_path: impl Into<String>,
    ) -> Result<(), ContentsError> {
        let (old_path, new_path) = (old_path.into(), new_path.into());
        self.run(move |store| store.rename(&old_path, &new_path))
            .await
    }

    async fn run<T, F>(&self, op: F) -> Result<T, ContentsError>
    where
        T: Send + 'static,
        F: FnOnce(&ContentStore<B>) -> Result<T, ContentsError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(&store))
            .await
            .map_err(|e| ContentsError::Internal(format!("store worker failed: {}", e)))?
    }
}
