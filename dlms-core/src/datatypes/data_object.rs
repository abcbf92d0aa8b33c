//! Data object types for DLMS/COSEM protocol

use crate::error::{DlmsError, DlmsResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Container for attribute values held by COSEM objects
///
/// Captured profile entries are built from these values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DataObject {
    Null,
    Boolean(bool),
    Integer8(i8),
    Integer16(i16),
    Integer32(i32),
    Integer64(i64),
    Unsigned8(u8),
    Unsigned16(u16),
    Unsigned32(u32),
    Unsigned64(u64),
    Float32(f32),
    Float64(f64),
    Enumerate(u8),
    OctetString(Vec<u8>),
    VisibleString(Vec<u8>),
    /// Array of DataObjects of a single type
    Array(Vec<DataObject>),
    /// Ordered list of DataObjects
    Structure(Vec<DataObject>),
}

/// Type enumeration for DataObject, named after the A-XDR data tags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataObjectType {
    NullData,
    Array,
    Structure,
    Boolean,
    DoubleLong,
    DoubleLongUnsigned,
    OctetString,
    VisibleString,
    Integer,
    LongInteger,
    Unsigned,
    LongUnsigned,
    Long64,
    Long64Unsigned,
    Enumerate,
    Float32,
    Float64,
}

impl DataObjectType {
    /// Check if this type is a number type
    pub fn is_number(&self) -> bool {
        matches!(
            self,
            DataObjectType::DoubleLong
                | DataObjectType::DoubleLongUnsigned
                | DataObjectType::Integer
                | DataObjectType::LongInteger
                | DataObjectType::Unsigned
                | DataObjectType::LongUnsigned
                | DataObjectType::Long64
                | DataObjectType::Long64Unsigned
                | DataObjectType::Enumerate
                | DataObjectType::Float32
                | DataObjectType::Float64
        )
    }
}

impl DataObject {
    /// Get the type of this DataObject
    pub fn get_type(&self) -> DataObjectType {
        match self {
            DataObject::Null => DataObjectType::NullData,
            DataObject::Boolean(_) => DataObjectType::Boolean,
            DataObject::Integer8(_) => DataObjectType::Integer,
            DataObject::Integer16(_) => DataObjectType::LongInteger,
            DataObject::Integer32(_) => DataObjectType::DoubleLong,
            DataObject::Integer64(_) => DataObjectType::Long64,
            DataObject::Unsigned8(_) => DataObjectType::Unsigned,
            DataObject::Unsigned16(_) => DataObjectType::LongUnsigned,
            DataObject::Unsigned32(_) => DataObjectType::DoubleLongUnsigned,
            DataObject::Unsigned64(_) => DataObjectType::Long64Unsigned,
            DataObject::Float32(_) => DataObjectType::Float32,
            DataObject::Float64(_) => DataObjectType::Float64,
            DataObject::Enumerate(_) => DataObjectType::Enumerate,
            DataObject::OctetString(_) => DataObjectType::OctetString,
            DataObject::VisibleString(_) => DataObjectType::VisibleString,
            DataObject::Array(_) => DataObjectType::Array,
            DataObject::Structure(_) => DataObjectType::Structure,
        }
    }

    /// Constructs an array data
    ///
    /// # Errors
    ///
    /// Returns an error if array elements have different types
    pub fn new_array(array: Vec<DataObject>) -> DlmsResult<Self> {
        if let Some(first) = array.first() {
            let array_type = first.get_type();
            for (index, sub) in array.iter().enumerate() {
                if sub.get_type() != array_type {
                    return Err(DlmsError::InvalidData(format!(
                        "Array is of type {:?}, but element at {} is of type {:?}",
                        array_type,
                        index,
                        sub.get_type()
                    )));
                }
            }
        }
        Ok(DataObject::Array(array))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, DataObject::Null)
    }

    pub fn is_number(&self) -> bool {
        self.get_type().is_number()
    }

    fn mismatch(&self, expected: &str) -> DlmsError {
        DlmsError::InvalidData(format!("Expected {}, got {:?}", expected, self.get_type()))
    }

    pub fn as_bool(&self) -> DlmsResult<bool> {
        match self {
            DataObject::Boolean(b) => Ok(*b),
            _ => Err(self.mismatch("Boolean")),
        }
    }

    pub fn as_unsigned8(&self) -> DlmsResult<u8> {
        match self {
            DataObject::Unsigned8(u) => Ok(*u),
            _ => Err(self.mismatch("Unsigned8")),
        }
    }

    pub fn as_unsigned16(&self) -> DlmsResult<u16> {
        match self {
            DataObject::Unsigned16(u) => Ok(*u),
            _ => Err(self.mismatch("Unsigned16")),
        }
    }

    pub fn as_unsigned32(&self) -> DlmsResult<u32> {
        match self {
            DataObject::Unsigned32(u) => Ok(*u),
            _ => Err(self.mismatch("Unsigned32")),
        }
    }

    pub fn as_integer8(&self) -> DlmsResult<i8> {
        match self {
            DataObject::Integer8(i) => Ok(*i),
            _ => Err(self.mismatch("Integer8")),
        }
    }

    pub fn as_octet_string(&self) -> DlmsResult<&[u8]> {
        match self {
            DataObject::OctetString(s) => Ok(s.as_slice()),
            _ => Err(self.mismatch("OctetString")),
        }
    }

    pub fn as_array(&self) -> DlmsResult<&[DataObject]> {
        match self {
            DataObject::Array(a) => Ok(a.as_slice()),
            _ => Err(self.mismatch("Array")),
        }
    }

    pub fn as_structure(&self) -> DlmsResult<&[DataObject]> {
        match self {
            DataObject::Structure(s) => Ok(s.as_slice()),
            _ => Err(self.mismatch("Structure")),
        }
    }
}

impl fmt::Display for DataObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataObject::Null => write!(f, "NULL_DATA"),
            DataObject::Boolean(b) => write!(f, "BOOLEAN: {}", b),
            DataObject::Integer8(i) => write!(f, "INTEGER: {}", i),
            DataObject::Integer16(i) => write!(f, "LONG_INTEGER: {}", i),
            DataObject::Integer32(i) => write!(f, "DOUBLE_LONG: {}", i),
            DataObject::Integer64(i) => write!(f, "LONG64: {}", i),
            DataObject::Unsigned8(u) => write!(f, "UNSIGNED: {}", u),
            DataObject::Unsigned16(u) => write!(f, "LONG_UNSIGNED: {}", u),
            DataObject::Unsigned32(u) => write!(f, "DOUBLE_LONG_UNSIGNED: {}", u),
            DataObject::Unsigned64(u) => write!(f, "LONG64_UNSIGNED: {}", u),
            DataObject::Float32(fl) => write!(f, "FLOAT32: {}", fl),
            DataObject::Float64(fl) => write!(f, "FLOAT64: {}", fl),
            DataObject::Enumerate(e) => write!(f, "ENUMERATE: {}", e),
            DataObject::OctetString(s) => {
                write!(f, "OCTET_STRING:")?;
                for byte in s {
                    write!(f, " {:02X}", byte)?;
                }
                Ok(())
            }
            DataObject::VisibleString(s) => {
                write!(f, "VISIBLE_STRING: {}", String::from_utf8_lossy(s))
            }
            DataObject::Array(items) | DataObject::Structure(items) => {
                let label = if matches!(self, DataObject::Array(_)) {
                    "ARRAY"
                } else {
                    "STRUCTURE"
                };
                write!(f, "{}: {} element(s)", label, items.len())?;
                for (i, elem) in items.iter().enumerate() {
                    write!(f, "\n  [{}]: {}", i, elem)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_object_null() {
        let obj = DataObject::Null;
        assert!(obj.is_null());
        assert_eq!(obj.get_type(), DataObjectType::NullData);
    }

    #[test]
    fn test_data_object_accessor_mismatch() {
        let obj = DataObject::Unsigned32(900);
        assert_eq!(obj.as_unsigned32().unwrap(), 900);
        assert!(obj.as_unsigned16().is_err());
        assert!(obj.is_number());
    }

    #[test]
    fn test_data_object_array() {
        let obj = DataObject::new_array(vec![
            DataObject::Integer32(1),
            DataObject::Integer32(2),
            DataObject::Integer32(3),
        ])
        .unwrap();
        assert_eq!(obj.as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_data_object_array_mixed_types() {
        let arr = vec![DataObject::Integer32(1), DataObject::Boolean(true)];
        assert!(DataObject::new_array(arr).is_err());
    }

    #[test]
    fn test_data_object_display() {
        let obj = DataObject::OctetString(vec![0x01, 0xFF]);
        assert_eq!(obj.to_string(), "OCTET_STRING: 01 FF");
    }
}
