//! Mock metadata and quality-profile stores for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::matching::{EntityRef, MetadataError, MetadataStore, SceneRecord, Subscription};
use crate::selection::{ProfileError, QualityProfile, QualityProfileStore};

/// Mock implementation of the MetadataStore trait.
pub struct MockMetadataStore {
    subscriptions: Arc<RwLock<HashMap<EntityRef, Subscription>>>,
    scenes: Arc<RwLock<HashMap<EntityRef, Vec<SceneRecord>>>>,
}

impl Default for MockMetadataStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMetadataStore {
    pub fn new() -> Self {
        Self {
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
            scenes: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn set_subscription(&self, subscription: Subscription) {
        self.subscriptions
            .write()
            .await
            .insert(subscription.entity, subscription);
    }

    pub async fn set_candidate_scenes(&self, entity: EntityRef, scenes: Vec<SceneRecord>) {
        self.scenes.write().await.insert(entity, scenes);
    }
}

#[async_trait]
impl MetadataStore for MockMetadataStore {
    async fn find_subscription(
        &self,
        entity: EntityRef,
    ) -> Result<Option<Subscription>, MetadataError> {
        Ok(self.subscriptions.read().await.get(&entity).cloned())
    }

    async fn find_candidate_scenes(
        &self,
        entity: EntityRef,
        limit: usize,
    ) -> Result<Vec<SceneRecord>, MetadataError> {
        let mut scenes = self
            .scenes
            .read()
            .await
            .get(&entity)
            .cloned()
            .unwrap_or_default();
        scenes.truncate(limit);
        Ok(scenes)
    }
}

/// Mock implementation of the QualityProfileStore trait.
pub struct MockProfileStore {
    profiles: Arc<RwLock<HashMap<i64, QualityProfile>>>,
}

impl Default for MockProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProfileStore {
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn set_profile(&self, profile: QualityProfile) {
        self.profiles.write().await.insert(profile.id, profile);
    }
}

#[async_trait]
impl QualityProfileStore for MockProfileStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<QualityProfile>, ProfileError> {
        Ok(self.profiles.read().await.get(&id).cloned())
    }
}
