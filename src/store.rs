use std::collections::HashMap;
use std::sync::RwLock;

use uuid::Uuid;

use crate::error::{CoreError, Result};
use crate::models::{ClusterConfig, ClusterInfo};

/// The persistent-store boundary. The distilled spec's "two persistent
/// tables" (`ClusterConfig`/`ClusterInfo`) are satisfied by any implementor
/// of this trait; the default is in-process, but a caller embedding this
/// crate behind a real database needs only to implement it.
pub trait ClusterStore: Send + Sync {
    fn insert(&self, config: ClusterConfig, info: ClusterInfo) -> Result<()>;
    fn list(&self) -> Result<Vec<ClusterInfo>>;
    fn get_info(&self, id: Uuid) -> Result<Option<ClusterInfo>>;
    fn get_config(&self, id: Uuid) -> Result<Option<ClusterConfig>>;
    fn update_info(&self, info: ClusterInfo) -> Result<()>;
    fn delete(&self, id: Uuid) -> Result<()>;
    fn all_configs(&self) -> Result<Vec<ClusterConfig>>;
}

/// Default in-process implementation. Read-mostly; one lock per table is
/// enough given the expected scale (a handful to a few hundred clusters).
#[derive(Default)]
pub struct InMemoryClusterStore {
    configs: RwLock<HashMap<Uuid, ClusterConfig>>,
    infos: RwLock<HashMap<Uuid, ClusterInfo>>,
}

impl InMemoryClusterStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_poisoned() -> CoreError {
        CoreError::InternalError("cluster store lock poisoned".to_string())
    }
}

impl ClusterStore for InMemoryClusterStore {
    fn insert(&self, config: ClusterConfig, info: ClusterInfo) -> Result<()> {
        let id = config.id;
        self.configs
            .write()
            .map_err(|_| Self::lock_poisoned())?
            .insert(id, config);
        self.infos
            .write()
            .map_err(|_| Self::lock_poisoned())?
            .insert(id, info);
        Ok(())
    }

    fn list(&self) -> Result<Vec<ClusterInfo>> {
        Ok(self
            .infos
            .read()
            .map_err(|_| Self::lock_poisoned())?
            .values()
            .cloned()
            .collect())
    }

    fn get_info(&self, id: Uuid) -> Result<Option<ClusterInfo>> {
        Ok(self
            .infos
            .read()
            .map_err(|_| Self::lock_poisoned())?
            .get(&id)
            .cloned())
    }

    fn get_config(&self, id: Uuid) -> Result<Option<ClusterConfig>> {
        Ok(self
            .configs
            .read()
            .map_err(|_| Self::lock_poisoned())?
            .get(&id)
            .cloned())
    }

    fn update_info(&self, info: ClusterInfo) -> Result<()> {
        self.infos
            .write()
            .map_err(|_| Self::lock_poisoned())?
            .insert(info.id, info);
        Ok(())
    }

    fn delete(&self, id: Uuid) -> Result<()> {
        self.configs
            .write()
            .map_err(|_| Self::lock_poisoned())?
            .remove(&id);
        self.infos
            .write()
            .map_err(|_| Self::lock_poisoned())?
            .remove(&id);
        Ok(())
    }

    fn all_configs(&self) -> Result<Vec<ClusterConfig>> {
        Ok(self
            .configs
            .read()
            .map_err(|_| Self::lock_poisoned())?
            .values()
            .cloned()
            .collect())
    }
}
