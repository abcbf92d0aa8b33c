use crate::error::{DlmsError, DlmsResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static REDUCED_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,3})-(\d{1,3}):(\d{1,3})\.(\d{1,3})\.(\d{1,3})(?:\*(\d{1,3}))?$")
        .expect("reduced OBIS pattern is valid")
});

/// OBIS (Object Identification System) code for identifying COSEM objects
///
/// OBIS codes are 6-byte identifiers used in DLMS/COSEM to uniquely identify
/// objects in a logical device. The scheduler keys its registry on them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObisCode {
    bytes: [u8; 6],
}

impl ObisCode {
    /// Create a new OBIS code from individual bytes
    ///
    /// # Arguments
    ///
    /// * `a` - First byte (A value, media)
    /// * `b` - Second byte (B value, channel)
    /// * `c` - Third byte (C value, quantity)
    /// * `d` - Fourth byte (D value, processing)
    /// * `e` - Fifth byte (E value, classification)
    /// * `f` - Sixth byte (F value, historical storage)
    pub const fn new(a: u8, b: u8, c: u8, d: u8, e: u8, f: u8) -> Self {
        Self {
            bytes: [a, b, c, d, e, f],
        }
    }

    /// Build an OBIS code from a 6-byte logical name
    ///
    /// # Arguments
    ///
    /// * `bytes` - Logical name as carried in an octet-string attribute
    ///
    /// # Returns
    ///
    /// Returns `Err(DlmsError::InvalidData)` unless exactly 6 bytes are given
    pub fn from_bytes(bytes: &[u8]) -> DlmsResult<Self> {
        let bytes: [u8; 6] = bytes.try_into().map_err(|_| {
            DlmsError::InvalidData(format!(
                "Logical name must be 6 bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    /// Parse an OBIS code from string format
    ///
    /// Supports formats like:
    /// - "1.0.99.1.0.255"
    /// - "1-0:99.1.0*255" (the `*F` group is optional and defaults to 255)
    ///
    /// # Arguments
    ///
    /// * `s` - String representation of OBIS code
    ///
    /// # Returns
    ///
    /// Returns `Ok(ObisCode)` if parsing succeeds, `Err(DlmsError)` otherwise
    pub fn from_string(s: &str) -> DlmsResult<Self> {
        let s = s.trim();
        // Simple format: "1.0.99.1.0.255"
        if let Ok(code) = Self::parse_dot_format(s) {
            return Ok(code);
        }

        // Reduced ID format: "1-0:99.1.0*255"
        if let Ok(code) = Self::parse_reduced_format(s) {
            return Ok(code);
        }
        Err(DlmsError::InvalidData(format!("Invalid OBIS code format: {}", s)))
    }

    fn parse_dot_format(s: &str) -> DlmsResult<Self> {
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 6 {
            return Err(DlmsError::InvalidData("Expected 6 dot-separated values".to_string()));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = parse_group(part)?;
        }
        Ok(Self { bytes })
    }

    fn parse_reduced_format(s: &str) -> DlmsResult<Self> {
        let caps = REDUCED_ID
            .captures(s)
            .ok_or_else(|| DlmsError::InvalidData(format!("Not a reduced OBIS code: {}", s)))?;

        let mut bytes = [255u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            if let Some(group) = caps.get(i + 1) {
                *byte = parse_group(group.as_str())?;
            }
        }
        Ok(Self { bytes })
    }

    /// Get the OBIS code as a byte array
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.bytes
    }

    /// Get the OBIS code as a copied byte array
    pub fn to_bytes(&self) -> [u8; 6] {
        self.bytes
    }

    /// Get the A value (first byte)
    pub fn a(&self) -> u8 {
        self.bytes[0]
    }

    /// Get the B value (second byte)
    pub fn b(&self) -> u8 {
        self.bytes[1]
    }

    /// Get the C value (third byte)
    pub fn c(&self) -> u8 {
        self.bytes[2]
    }

    /// Get the D value (fourth byte)
    pub fn d(&self) -> u8 {
        self.bytes[3]
    }

    /// Get the E value (fifth byte)
    pub fn e(&self) -> u8 {
        self.bytes[4]
    }

    /// Get the F value (sixth byte)
    pub fn f(&self) -> u8 {
        self.bytes[5]
    }
}

fn parse_group(part: &str) -> DlmsResult<u8> {
    part.parse::<u8>()
        .map_err(|_| DlmsError::InvalidData(format!("Invalid byte value: {}", part)))
}

impl FromStr for ObisCode {
    type Err = DlmsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_string(s)
    }
}

impl fmt::Display for ObisCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}.{}",
            self.bytes[0], self.bytes[1], self.bytes[2],
            self.bytes[3], self.bytes[4], self.bytes[5]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obis_code_new() {
        let code = ObisCode::new(1, 0, 99, 1, 0, 255);
        assert_eq!(code.a(), 1);
        assert_eq!(code.c(), 99);
        assert_eq!(code.f(), 255);
    }

    #[test]
    fn test_obis_code_from_string() {
        let code = ObisCode::from_string("1.0.99.1.0.255").unwrap();
        assert_eq!(code, ObisCode::new(1, 0, 99, 1, 0, 255));
    }

    #[test]
    fn test_obis_code_reduced_format() {
        let code: ObisCode = "1-0:99.1.0*255".parse().unwrap();
        assert_eq!(code, ObisCode::new(1, 0, 99, 1, 0, 255));

        let code: ObisCode = "0-0:1.0.0".parse().unwrap();
        assert_eq!(code, ObisCode::new(0, 0, 1, 0, 0, 255));
    }

    #[test]
    fn test_obis_code_rejects_garbage() {
        assert!(ObisCode::from_string("1.0.99.1.0").is_err());
        assert!(ObisCode::from_string("1.0.99.1.0.256").is_err());
        assert!(ObisCode::from_string("1-0:99.1").is_err());
        assert!(ObisCode::from_bytes(&[1, 0, 99]).is_err());
    }

    #[test]
    fn test_obis_code_display() {
        let code = ObisCode::new(1, 1, 1, 8, 0, 255);
        assert_eq!(format!("{}", code), "1.1.1.8.0.255");
    }
}
