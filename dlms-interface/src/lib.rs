//! COSEM interface classes module for DLMS/COSEM protocol
//!
//! This crate provides the object contract shared by every COSEM interface
//! class, the capture contract the background scheduler drives, and the
//! interface classes that take part in profile capture:
//!
//! - [`Data`](data::Data) (Class ID: 1)
//! - [`ProfileGeneric`](profile_generic::ProfileGeneric) (Class ID: 7)

pub mod data;
pub mod descriptor;
pub mod directory;
pub mod profile_generic;

use async_trait::async_trait;
use dlms_core::{DataObject, DlmsResult, ObisCode};
use std::sync::Arc;

pub use data::Data;
pub use descriptor::CaptureObjectDefinition;
pub use directory::ObjectDirectory;
pub use profile_generic::{GenericProfileEntry, ProfileBufferStatus, ProfileGeneric, ProfileSortMethod};

/// Interface implemented by every COSEM object held by a logical device
///
/// Attribute 1 of every interface class is the logical name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CosemObject: Send + Sync {
    /// Interface class ID
    fn class_id(&self) -> u16;

    /// Logical name of this instance
    fn obis_code(&self) -> ObisCode;

    /// Read an attribute value
    async fn get_attribute(&self, attribute_id: u8) -> DlmsResult<DataObject>;

    /// Write an attribute value
    async fn set_attribute(&self, attribute_id: u8, value: DataObject) -> DlmsResult<()>;

    /// Invoke a method, returning its optional return parameters
    async fn invoke_method(
        &self,
        method_id: u8,
        parameters: Option<DataObject>,
    ) -> DlmsResult<Option<DataObject>>;
}

/// A data source that a capture scheduler drives periodically
///
/// Both methods are called from the scheduler's background task, never from
/// the host task that started it.
#[async_trait]
pub trait CaptureTarget: Send + Sync {
    /// Identity of the target; at most one scheduler runs per logical name
    fn logical_name(&self) -> ObisCode;

    /// Take and record one snapshot
    async fn capture(&self) -> DlmsResult<()>;

    /// Current capture period in seconds, 0 meaning on demand only
    async fn capture_period(&self) -> u32;
}

/// Looks up COSEM objects by logical name
#[async_trait]
pub trait ObjectResolver: Send + Sync {
    async fn resolve(&self, logical_name: &ObisCode) -> Option<Arc<dyn CosemObject>>;
}
