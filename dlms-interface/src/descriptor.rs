//! Capture object definitions used by Profile Generic

use dlms_core::{DataObject, DlmsError, DlmsResult, ObisCode};
use std::fmt;

/// One element of the `capture_objects` attribute of a profile
///
/// Identifies which attribute of which object is recorded into each
/// buffer entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureObjectDefinition {
    /// Class ID of the captured object
    pub class_id: u16,
    /// Logical name of the captured object
    pub logical_name: ObisCode,
    /// Attribute to capture
    pub attribute_index: i8,
    /// 1-based element of an array/structure attribute, 0 for the whole value
    pub data_index: u16,
}

impl CaptureObjectDefinition {
    pub fn new(class_id: u16, logical_name: ObisCode, attribute_index: i8) -> Self {
        Self {
            class_id,
            logical_name,
            attribute_index,
            data_index: 0,
        }
    }

    pub fn with_data_index(mut self, data_index: u16) -> Self {
        self.data_index = data_index;
        self
    }

    /// Encode as the DLMS `capture_object_definition` structure
    pub fn to_data_object(&self) -> DataObject {
        DataObject::Structure(vec![
            DataObject::Unsigned16(self.class_id),
            DataObject::OctetString(self.logical_name.to_bytes().to_vec()),
            DataObject::Integer8(self.attribute_index),
            DataObject::Unsigned16(self.data_index),
        ])
    }

    /// Decode from the DLMS `capture_object_definition` structure
    pub fn from_data_object(data: &DataObject) -> DlmsResult<Self> {
        let fields = data.as_structure()?;
        if fields.len() != 4 {
            return Err(DlmsError::InvalidData(format!(
                "capture_object_definition has 4 fields, got {}",
                fields.len()
            )));
        }

        Ok(Self {
            class_id: fields[0].as_unsigned16()?,
            logical_name: ObisCode::from_bytes(fields[1].as_octet_string()?)?,
            attribute_index: fields[2].as_integer8()?,
            data_index: fields[3].as_unsigned16()?,
        })
    }

    /// Pick the configured element out of a captured attribute value
    pub fn select(&self, value: DataObject) -> DlmsResult<DataObject> {
        if self.data_index == 0 {
            return Ok(value);
        }
        match value {
            DataObject::Array(items) | DataObject::Structure(items) => items
                .into_iter()
                .nth(usize::from(self.data_index) - 1)
                .ok_or_else(|| {
                    DlmsError::InvalidData(format!(
                        "data_index {} out of range for {}",
                        self.data_index, self.logical_name
                    ))
                }),
            other => Err(DlmsError::InvalidData(format!(
                "data_index {} requires an array or structure, got {:?}",
                self.data_index,
                other.get_type()
            ))),
        }
    }
}

impl fmt::Display for CaptureObjectDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CaptureObject(class_id={}, obis={}, attr={}, data_index={})",
            self.class_id, self.logical_name, self.attribute_index, self.data_index
        )
    }
}
