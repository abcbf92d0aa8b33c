//! Data interface class (Class ID: 1)
//!
//! The Data interface class is the simplest COSEM interface class.
//! It represents a single data value that can be read and optionally written,
//! and is the usual capture object of a load profile.
//!
//! # Attributes
//!
//! - Attribute 1: logical_name (OBIS code) - The logical name of the object
//! - Attribute 2: value (DataObject) - The data value
//!
//! # Usage
//!
//! ```rust,no_run
//! use dlms_interface::data::Data;
//! use dlms_core::{ObisCode, DataObject};
//!
//! # async fn demo() {
//! let obis = ObisCode::new(1, 0, 1, 8, 0, 255);
//! let data = Data::new(obis, DataObject::Unsigned32(12345));
//!
//! let current_value = data.value().await;
//! # }
//! ```

use async_trait::async_trait;
use dlms_core::{DataObject, DlmsError, DlmsResult, ObisCode};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::CosemObject;

/// Data interface class (Class ID: 1)
#[derive(Debug, Clone)]
pub struct Data {
    logical_name: ObisCode,
    value: Arc<RwLock<DataObject>>,
}

impl Data {
    pub const CLASS_ID: u16 = 1;

    pub const ATTR_LOGICAL_NAME: u8 = 1;
    pub const ATTR_VALUE: u8 = 2;

    pub fn new(logical_name: ObisCode, value: DataObject) -> Self {
        Self {
            logical_name,
            value: Arc::new(RwLock::new(value)),
        }
    }

    /// Get a copy of the current value
    pub async fn value(&self) -> DataObject {
        self.value.read().await.clone()
    }

    pub async fn set_value(&self, new_value: DataObject) {
        *self.value.write().await = new_value;
    }

    pub fn logical_name(&self) -> ObisCode {
        self.logical_name
    }
}

#[async_trait]
impl CosemObject for Data {
    fn class_id(&self) -> u16 {
        Self::CLASS_ID
    }

    fn obis_code(&self) -> ObisCode {
        self.logical_name
    }

    async fn get_attribute(&self, attribute_id: u8) -> DlmsResult<DataObject> {
        match attribute_id {
            Self::ATTR_LOGICAL_NAME => {
                Ok(DataObject::OctetString(self.logical_name.to_bytes().to_vec()))
            }
            Self::ATTR_VALUE => Ok(self.value().await),
            _ => Err(DlmsError::InvalidData(format!(
                "Data interface class has no attribute {}",
                attribute_id
            ))),
        }
    }

    async fn set_attribute(&self, attribute_id: u8, value: DataObject) -> DlmsResult<()> {
        match attribute_id {
            Self::ATTR_LOGICAL_NAME => Err(DlmsError::AccessDenied(
                "Attribute 1 (logical_name) is read-only".to_string(),
            )),
            Self::ATTR_VALUE => {
                self.set_value(value).await;
                Ok(())
            }
            _ => Err(DlmsError::InvalidData(format!(
                "Data interface class has no attribute {}",
                attribute_id
            ))),
        }
    }

    async fn invoke_method(
        &self,
        method_id: u8,
        _parameters: Option<DataObject>,
    ) -> DlmsResult<Option<DataObject>> {
        Err(DlmsError::InvalidData(format!(
            "Data interface class has no method {}",
            method_id
        )))
    }
}
