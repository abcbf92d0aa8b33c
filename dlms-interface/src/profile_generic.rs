//! Profile Generic interface class (Class ID: 7)
//!
//! The Profile Generic interface class represents a log or buffer of data
//! stored in the meter, typically used for load profile, event log, or
//! historical data recording. Entries are appended by `capture()`, either on
//! demand or from a background capture scheduler honouring `capture_period`.
//!
//! # Attributes
//!
//! - Attribute 1: logical_name (OBIS code) - The logical name of the object
//! - Attribute 2: buffer - The profile buffer (array of data records)
//! - Attribute 3: capture_objects - List of objects to capture
//! - Attribute 4: capture_period - Period in seconds between captures (0 = on demand)
//! - Attribute 5: sort_method - Sort method for the buffer (FIFO/LIFO)
//! - Attribute 6: sort_object - Object used for sorting (unsupported, always null)
//! - Attribute 7: entries_in_use - Number of entries currently in use
//! - Attribute 8: profile_entries - Maximum number of entries retained
//!
//! # Methods
//!
//! - Method 1: reset() - Clear the buffer
//! - Method 2: capture() - Perform an immediate capture

use async_trait::async_trait;
use dlms_core::{DataObject, DlmsError, DlmsResult, ObisCode};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

use crate::{CaptureObjectDefinition, CaptureTarget, CosemObject, ObjectResolver};

/// Sort method for the profile buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileSortMethod {
    /// First In First Out
    Fifo = 1,
    /// Last In First Out
    Lifo = 2,
}

impl ProfileSortMethod {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(ProfileSortMethod::Fifo),
            2 => Some(ProfileSortMethod::Lifo),
            _ => None,
        }
    }

    pub fn to_u8(self) -> u8 {
        self as u8
    }
}

/// Profile buffer status flags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileBufferStatus {
    /// At least one capture has been recorded
    CaptureActive = 0x01,
    /// Buffer holds `profile_entries` entries
    BufferFull = 0x02,
    /// The last capture attempt failed
    DataNotAvailable = 0x04,
}

/// A single entry in the profile buffer
#[derive(Debug, Clone, PartialEq)]
pub struct GenericProfileEntry {
    /// Wall-clock time of the capture
    pub captured_at: SystemTime,
    /// One value per capture object, in capture object order
    pub values: Vec<DataObject>,
}

impl GenericProfileEntry {
    pub fn new(captured_at: SystemTime, values: Vec<DataObject>) -> Self {
        Self { captured_at, values }
    }

    /// Encode as a structure whose first field is the capture time in
    /// seconds since the Unix epoch
    pub fn encode(&self) -> DataObject {
        let seconds = self
            .captured_at
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);

        let mut fields = Vec::with_capacity(self.values.len() + 1);
        fields.push(DataObject::Unsigned64(seconds));
        fields.extend(self.values.iter().cloned());
        DataObject::Structure(fields)
    }
}

/// Profile Generic interface class (Class ID: 7)
///
/// Default OBIS: 1-0:99.1.0.255 (load profile 1)
///
/// Capture objects are looked up by logical name through an
/// [`ObjectResolver`] each time a capture runs.
#[derive(Clone)]
pub struct ProfileGeneric {
    logical_name: ObisCode,
    buffer: Arc<RwLock<VecDeque<GenericProfileEntry>>>,
    capture_objects: Arc<RwLock<Vec<CaptureObjectDefinition>>>,
    /// Seconds between captures, 0 = on demand only
    capture_period: Arc<RwLock<u32>>,
    sort_method: Arc<RwLock<ProfileSortMethod>>,
    profile_entries: Arc<RwLock<u32>>,
    buffer_status: Arc<RwLock<u8>>,
    /// Bumped under the buffer lock whenever the entry layout changes
    layout_generation: Arc<AtomicU64>,
    resolver: Option<Arc<dyn ObjectResolver>>,
}

impl ProfileGeneric {
    pub const CLASS_ID: u16 = 7;

    /// Default OBIS code for Profile Generic (1-0:99.1.0.255)
    pub fn default_obis() -> ObisCode {
        ObisCode::new(1, 0, 99, 1, 0, 255)
    }

    pub const ATTR_LOGICAL_NAME: u8 = 1;
    pub const ATTR_BUFFER: u8 = 2;
    pub const ATTR_CAPTURE_OBJECTS: u8 = 3;
    pub const ATTR_CAPTURE_PERIOD: u8 = 4;
    pub const ATTR_SORT_METHOD: u8 = 5;
    pub const ATTR_SORT_OBJECT: u8 = 6;
    pub const ATTR_ENTRIES_IN_USE: u8 = 7;
    pub const ATTR_PROFILE_ENTRIES: u8 = 8;

    pub const METHOD_RESET: u8 = 1;
    pub const METHOD_CAPTURE: u8 = 2;

    /// Create a new Profile Generic object
    ///
    /// # Arguments
    /// * `logical_name` - OBIS code identifying this object
    /// * `profile_entries` - Maximum number of entries in the buffer (at least 1)
    /// * `capture_period` - Period in seconds between captures (0 = on demand)
    /// * `sort_method` - Sort method (FIFO or LIFO)
    pub fn new(
        logical_name: ObisCode,
        profile_entries: u32,
        capture_period: u32,
        sort_method: ProfileSortMethod,
    ) -> Self {
        let profile_entries = profile_entries.max(1);
        Self {
            logical_name,
            buffer: Arc::new(RwLock::new(VecDeque::with_capacity(profile_entries as usize))),
            capture_objects: Arc::new(RwLock::new(Vec::new())),
            capture_period: Arc::new(RwLock::new(capture_period)),
            sort_method: Arc::new(RwLock::new(sort_method)),
            profile_entries: Arc::new(RwLock::new(profile_entries)),
            buffer_status: Arc::new(RwLock::new(0)),
            layout_generation: Arc::new(AtomicU64::new(0)),
            resolver: None,
        }
    }

    /// Create with default OBIS code and a 15 minute period
    pub fn with_default_obis(profile_entries: u32) -> Self {
        Self::new(
            Self::default_obis(),
            profile_entries,
            900,
            ProfileSortMethod::Fifo,
        )
    }

    /// Attach the resolver used to find capture objects
    pub fn with_resolver(mut self, resolver: Arc<dyn ObjectResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn logical_name(&self) -> ObisCode {
        self.logical_name
    }

    /// Get the buffer entries in buffer order
    pub async fn buffer(&self) -> Vec<GenericProfileEntry> {
        self.buffer.read().await.iter().cloned().collect()
    }

    pub async fn entries_in_use(&self) -> u32 {
        self.buffer.read().await.len() as u32
    }

    pub async fn profile_entries(&self) -> u32 {
        *self.profile_entries.read().await
    }

    /// Change the maximum number of entries, dropping the oldest entries
    /// that no longer fit
    pub async fn set_profile_entries(&self, entries: u32) -> DlmsResult<()> {
        if entries == 0 {
            return Err(DlmsError::InvalidData(
                "profile_entries must be at least 1".to_string(),
            ));
        }
        let mut buffer = self.buffer.write().await;
        let sort_method = *self.sort_method.read().await;
        while buffer.len() > entries as usize {
            evict_oldest(&mut buffer, sort_method);
        }
        *self.profile_entries.write().await = entries;
        self.update_full_flag(buffer.len(), entries).await;
        Ok(())
    }

    pub async fn capture_objects(&self) -> Vec<CaptureObjectDefinition> {
        self.capture_objects.read().await.clone()
    }

    /// Replace the capture objects; the buffer is cleared since existing
    /// entries no longer match the new layout
    pub async fn set_capture_objects(&self, objects: Vec<CaptureObjectDefinition>) {
        let mut current = self.capture_objects.write().await;
        *current = objects;
        self.clear_buffer(true).await;
    }

    pub async fn add_capture_object(&self, object: CaptureObjectDefinition) {
        let mut current = self.capture_objects.write().await;
        current.push(object);
        self.clear_buffer(true).await;
    }

    pub async fn capture_period(&self) -> u32 {
        *self.capture_period.read().await
    }

    pub async fn set_capture_period(&self, period: u32) {
        *self.capture_period.write().await = period;
    }

    pub async fn sort_method(&self) -> ProfileSortMethod {
        *self.sort_method.read().await
    }

    /// Change the sort method; the buffer is cleared
    pub async fn set_sort_method(&self, method: ProfileSortMethod) {
        *self.sort_method.write().await = method;
        self.clear_buffer(true).await;
    }

    pub async fn buffer_status(&self) -> u8 {
        *self.buffer_status.read().await
    }

    /// Clear the buffer (reset)
    pub async fn reset(&self) -> DlmsResult<()> {
        self.clear_buffer(false).await;
        Ok(())
    }

    async fn clear_buffer(&self, layout_changed: bool) {
        let mut buffer = self.buffer.write().await;
        if layout_changed {
            self.layout_generation.fetch_add(1, Ordering::SeqCst);
        }
        buffer.clear();
        let mut status = self.buffer_status.write().await;
        *status &= !(ProfileBufferStatus::BufferFull as u8);
    }

    /// Perform an immediate capture of all capture objects
    ///
    /// Fails without touching the buffer if any capture object cannot be
    /// read, and flags the buffer as `DataNotAvailable` until a later
    /// capture succeeds. An entry read while the capture objects or sort
    /// method were being rewritten is discarded with a `Capture` error.
    pub async fn capture(&self) -> DlmsResult<()> {
        let (definitions, generation) = {
            let objects = self.capture_objects.read().await;
            (objects.clone(), self.layout_generation.load(Ordering::SeqCst))
        };
        match self.collect_values(&definitions).await {
            Ok(values) => {
                let mut buffer = self.buffer.write().await;
                if self.layout_generation.load(Ordering::SeqCst) != generation {
                    return Err(DlmsError::Capture {
                        obis: self.logical_name,
                        reason: "profile layout changed during capture".to_string(),
                    });
                }
                let entry = GenericProfileEntry::new(SystemTime::now(), values);
                self.push_entry(&mut buffer, entry).await;
                Ok(())
            }
            Err(e) => {
                *self.buffer_status.write().await |= ProfileBufferStatus::DataNotAvailable as u8;
                Err(DlmsError::Capture {
                    obis: self.logical_name,
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn collect_values(
        &self,
        definitions: &[CaptureObjectDefinition],
    ) -> DlmsResult<Vec<DataObject>> {
        if definitions.is_empty() {
            return Ok(Vec::new());
        }
        let resolver = self.resolver.as_ref().ok_or_else(|| {
            DlmsError::InvalidData("No object resolver attached to profile".to_string())
        })?;

        let mut values = Vec::with_capacity(definitions.len());
        for definition in definitions {
            let object = resolver
                .resolve(&definition.logical_name)
                .await
                .ok_or_else(|| {
                    DlmsError::InvalidData(format!(
                        "Capture object {} not found",
                        definition.logical_name
                    ))
                })?;
            if object.class_id() != definition.class_id {
                return Err(DlmsError::InvalidData(format!(
                    "Capture object {} has class {}, expected {}",
                    definition.logical_name,
                    object.class_id(),
                    definition.class_id
                )));
            }
            let attribute_id = u8::try_from(definition.attribute_index)
                .ok()
                .filter(|id| *id > 0)
                .ok_or_else(|| {
                    DlmsError::InvalidData(format!(
                        "Unsupported attribute index {} for {}",
                        definition.attribute_index, definition.logical_name
                    ))
                })?;
            let value = object.get_attribute(attribute_id).await?;
            values.push(definition.select(value)?);
        }
        Ok(values)
    }

    /// Record an entry with a specific capture time
    pub async fn capture_with_timestamp(&self, captured_at: SystemTime, values: Vec<DataObject>) {
        let entry = GenericProfileEntry::new(captured_at, values);
        let mut buffer = self.buffer.write().await;
        self.push_entry(&mut buffer, entry).await;
    }

    async fn push_entry(
        &self,
        buffer: &mut VecDeque<GenericProfileEntry>,
        entry: GenericProfileEntry,
    ) {
        let sort_method = *self.sort_method.read().await;
        let profile_entries = *self.profile_entries.read().await;

        while buffer.len() >= profile_entries as usize {
            evict_oldest(buffer, sort_method);
        }
        match sort_method {
            ProfileSortMethod::Fifo => buffer.push_back(entry),
            ProfileSortMethod::Lifo => buffer.push_front(entry),
        }

        {
            let mut status = self.buffer_status.write().await;
            *status |= ProfileBufferStatus::CaptureActive as u8;
            *status &= !(ProfileBufferStatus::DataNotAvailable as u8);
        }
        self.update_full_flag(buffer.len(), profile_entries).await;
    }

    async fn update_full_flag(&self, len: usize, profile_entries: u32) {
        let mut status = self.buffer_status.write().await;
        if len >= profile_entries as usize {
            *status |= ProfileBufferStatus::BufferFull as u8;
        } else {
            *status &= !(ProfileBufferStatus::BufferFull as u8);
        }
    }

    async fn encode_buffer(&self) -> DataObject {
        let buffer = self.buffer.read().await;
        DataObject::Array(buffer.iter().map(GenericProfileEntry::encode).collect())
    }

    async fn encode_capture_objects(&self) -> DataObject {
        let objects = self.capture_objects.read().await;
        DataObject::Array(objects.iter().map(CaptureObjectDefinition::to_data_object).collect())
    }
}

/// FIFO keeps the oldest entry at the front, LIFO at the back
fn evict_oldest(buffer: &mut VecDeque<GenericProfileEntry>, sort_method: ProfileSortMethod) {
    match sort_method {
        ProfileSortMethod::Fifo => buffer.pop_front(),
        ProfileSortMethod::Lifo => buffer.pop_back(),
    };
}

#[async_trait]
impl CosemObject for ProfileGeneric {
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
            Self::ATTR_BUFFER => Ok(self.encode_buffer().await),
            Self::ATTR_CAPTURE_OBJECTS => Ok(self.encode_capture_objects().await),
            Self::ATTR_CAPTURE_PERIOD => Ok(DataObject::Unsigned32(self.capture_period().await)),
            Self::ATTR_SORT_METHOD => Ok(DataObject::Enumerate(self.sort_method().await.to_u8())),
            // Sorting by object is not supported
            Self::ATTR_SORT_OBJECT => Ok(DataObject::Null),
            Self::ATTR_ENTRIES_IN_USE => Ok(DataObject::Unsigned32(self.entries_in_use().await)),
            Self::ATTR_PROFILE_ENTRIES => Ok(DataObject::Unsigned32(self.profile_entries().await)),
            _ => Err(DlmsError::InvalidData(format!(
                "Profile Generic has no attribute {}",
                attribute_id
            ))),
        }
    }

    async fn set_attribute(&self, attribute_id: u8, value: DataObject) -> DlmsResult<()> {
        match attribute_id {
            Self::ATTR_CAPTURE_OBJECTS => {
                let objects = value
                    .as_array()?
                    .iter()
                    .map(CaptureObjectDefinition::from_data_object)
                    .collect::<DlmsResult<Vec<_>>>()?;
                self.set_capture_objects(objects).await;
                Ok(())
            }
            Self::ATTR_CAPTURE_PERIOD => {
                self.set_capture_period(value.as_unsigned32()?).await;
                Ok(())
            }
            Self::ATTR_SORT_METHOD => {
                let raw = match value {
                    DataObject::Enumerate(raw) => raw,
                    other => {
                        return Err(DlmsError::InvalidData(format!(
                            "Expected Enumerate for sort_method, got {:?}",
                            other.get_type()
                        )))
                    }
                };
                let method = ProfileSortMethod::from_u8(raw).ok_or_else(|| {
                    DlmsError::InvalidData(format!("Unsupported sort method {}", raw))
                })?;
                self.set_sort_method(method).await;
                Ok(())
            }
            Self::ATTR_PROFILE_ENTRIES => self.set_profile_entries(value.as_unsigned32()?).await,
            Self::ATTR_LOGICAL_NAME
            | Self::ATTR_BUFFER
            | Self::ATTR_SORT_OBJECT
            | Self::ATTR_ENTRIES_IN_USE => Err(DlmsError::AccessDenied(format!(
                "Attribute {} of Profile Generic is read-only",
                attribute_id
            ))),
            _ => Err(DlmsError::InvalidData(format!(
                "Profile Generic has no attribute {}",
                attribute_id
            ))),
        }
    }

    async fn invoke_method(
        &self,
        method_id: u8,
        _parameters: Option<DataObject>,
    ) -> DlmsResult<Option<DataObject>> {
        match method_id {
            Self::METHOD_RESET => {
                self.reset().await?;
                Ok(None)
            }
            Self::METHOD_CAPTURE => {
                ProfileGeneric::capture(self).await?;
                Ok(None)
            }
            _ => Err(DlmsError::InvalidData(format!(
                "Profile Generic has no method {}",
                method_id
            ))),
        }
    }
}

#[async_trait]
impl CaptureTarget for ProfileGeneric {
    fn logical_name(&self) -> ObisCode {
        self.logical_name
    }

    async fn capture(&self) -> DlmsResult<()> {
        ProfileGeneric::capture(self).await
    }

    async fn capture_period(&self) -> u32 {
        ProfileGeneric::capture_period(self).await
    }
}
