//! MATL codec error types

use thiserror::Error;

use crate::chunk::Region;
use crate::schema::EntityKind;

/// Errors produced while reading or writing a material library
#[derive(Debug, Error)]
pub enum MatlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with `MATL`
    #[error("invalid magic: expected \"MATL\", found {found:?}")]
    InvalidMagic { found: [u8; 4] },

    /// An enum-typed field holds a value outside its known set
    #[error("value {value} is not defined for type {enum_name}")]
    UnexpectedValue { enum_name: &'static str, value: u32 },

    /// A write moved past the end of a fixed-size region
    #[error("{region} region overflow: needed {needed} more bytes")]
    Bounds { region: Region, needed: u32 },

    /// An entity header did not occupy its documented size
    #[error("{kind} header size mismatch: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        kind: EntityKind,
        expected: u32,
        actual: u32,
    },

    /// A region was not filled exactly to its planned size
    #[error("{region} region planned for {planned} bytes but {written} were written")]
    LayoutMismatch {
        region: Region,
        planned: u32,
        written: u32,
    },

    #[error("unexpected end of data at offset {offset:#x} (need {need} bytes, have {have})")]
    UnexpectedEof { offset: u32, need: u32, have: u32 },

    /// A stored pointer resolves outside the file
    #[error("{what} pointer resolves to {address:#x}, outside the file ({len} bytes)")]
    PointerOutOfRange {
        what: &'static str,
        address: i64,
        len: u32,
    },

    /// Strings are stored one byte per character
    #[error("string {0:?} contains characters that do not fit in one byte")]
    UnencodableString(String),

    #[error("{what} has {len} entries, more than a 32-bit count can hold")]
    CountOverflow { what: &'static str, len: usize },

    /// A field was populated that the target format version has no room for
    #[error("{field} is not stored by format version {version}")]
    UnsupportedField { field: &'static str, version: u32 },

    #[error("write attempted with no active region")]
    NoActiveRegion,

    #[error("invalid codec options: {0}")]
    Config(#[from] toml::de::Error),

    #[error("failed to serialize codec options: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
}

pub type Result<T> = std::result::Result<T, MatlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            MatlError::InvalidMagic { found: *b"XXXX" }.to_string(),
            "invalid magic: expected \"MATL\", found [88, 88, 88, 88]"
        );
        assert_eq!(
            MatlError::UnexpectedValue {
                enum_name: "UIPropertyType",
                value: 9
            }
            .to_string(),
            "value 9 is not defined for type UIPropertyType"
        );
        assert_eq!(
            MatlError::Bounds {
                region: Region::Strings,
                needed: 3
            }
            .to_string(),
            "Strings region overflow: needed 3 more bytes"
        );
        assert_eq!(
            MatlError::SizeMismatch {
                kind: EntityKind::Pass,
                expected: 176,
                actual: 172
            }
            .to_string(),
            "Pass header size mismatch: expected 176 bytes, got 172"
        );
    }
}
