//! Object directory of a logical device

use async_trait::async_trait;
use dlms_core::{DlmsError, DlmsResult, ObisCode};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tokio::sync::RwLock;

use crate::{CosemObject, ObjectResolver};

type ObjectMap = HashMap<ObisCode, Arc<dyn CosemObject>>;

/// Registered COSEM objects, indexed by OBIS code
///
/// Cloning shares the underlying map.
#[derive(Clone, Default)]
pub struct ObjectDirectory {
    objects: Arc<RwLock<ObjectMap>>,
}

impl ObjectDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object
    ///
    /// # Errors
    /// Returns error if an object with the same OBIS code is already registered
    pub async fn insert(&self, object: Arc<dyn CosemObject>) -> DlmsResult<()> {
        let mut objects = self.objects.write().await;
        let obis = object.obis_code();

        if objects.contains_key(&obis) {
            return Err(DlmsError::InvalidData(format!(
                "Object with OBIS code {} is already registered",
                obis
            )));
        }

        objects.insert(obis, object);
        Ok(())
    }

    pub async fn remove(&self, obis_code: &ObisCode) -> Option<Arc<dyn CosemObject>> {
        self.objects.write().await.remove(obis_code)
    }

    pub async fn get(&self, obis_code: &ObisCode) -> Option<Arc<dyn CosemObject>> {
        self.objects.read().await.get(obis_code).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Resolver that does not keep the directory alive
    ///
    /// Profiles registered in this directory hold the resolver, so a strong
    /// reference here would form a cycle.
    pub fn resolver(&self) -> Arc<dyn ObjectResolver> {
        Arc::new(DirectoryResolver {
            objects: Arc::downgrade(&self.objects),
        })
    }
}

struct DirectoryResolver {
    objects: Weak<RwLock<ObjectMap>>,
}

#[async_trait]
impl ObjectResolver for DirectoryResolver {
    async fn resolve(&self, logical_name: &ObisCode) -> Option<Arc<dyn CosemObject>> {
        let objects = self.objects.upgrade()?;
        let objects = objects.read().await;
        objects.get(logical_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Data;
    use dlms_core::DataObject;

    #[tokio::test]
    async fn test_directory_rejects_duplicates() {
        let directory = ObjectDirectory::new();
        let obis = ObisCode::new(1, 0, 1, 8, 0, 255);

        directory
            .insert(Arc::new(Data::new(obis, DataObject::Unsigned32(1))))
            .await
            .unwrap();
        let result = directory
            .insert(Arc::new(Data::new(obis, DataObject::Unsigned32(2))))
            .await;

        assert!(result.is_err());
        assert_eq!(directory.len().await, 1);
    }

    #[tokio::test]
    async fn test_resolver_sees_later_registrations() {
        let directory = ObjectDirectory::new();
        let resolver = directory.resolver();
        let obis = ObisCode::new(1, 0, 1, 8, 0, 255);

        assert!(resolver.resolve(&obis).await.is_none());

        directory
            .insert(Arc::new(Data::new(obis, DataObject::Unsigned32(7))))
            .await
            .unwrap();
        let object = resolver.resolve(&obis).await.unwrap();
        assert_eq!(object.class_id(), Data::CLASS_ID);
    }

    #[tokio::test]
    async fn test_resolver_does_not_outlive_directory() {
        let directory = ObjectDirectory::new();
        let obis = ObisCode::new(1, 0, 1, 8, 0, 255);
        directory
            .insert(Arc::new(Data::new(obis, DataObject::Null)))
            .await
            .unwrap();

        let resolver = directory.resolver();
        drop(directory);

        assert!(resolver.resolve(&obis).await.is_none());
    }
}
