//! Material library data structures
//!
//! The tree is exclusively owned: a [`Library`] owns its templates, each
//! template owns its techniques and so on down to the UI properties. Fields
//! whose meaning is unknown are kept verbatim so files round-trip.

use std::fmt;

use crate::version::FormatVersion;

/// Fixed-size block of bytes kept verbatim
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Opaque<const N: usize>(pub [u8; N]);

impl<const N: usize> Opaque<N> {
    pub fn is_zeroed(&self) -> bool {
        self.0.iter().all(|&b| b == 0)
    }
}

impl<const N: usize> Default for Opaque<N> {
    fn default() -> Self {
        Self([0u8; N])
    }
}

impl<const N: usize> fmt::Debug for Opaque<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zeroed() {
            return write!(f, "Opaque<{}>(zeroed)", N);
        }
        write!(f, "Opaque<{}>(", N)?;
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        write!(f, ")")
    }
}

/// Root of a MATL file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Library {
    pub version: FormatVersion,
    /// Extra reserved header bytes, only stored by version 2
    pub header_extra: [u8; 4],
    pub templates: Vec<Template>,
}

impl Library {
    pub fn new(version: FormatVersion) -> Self {
        Self {
            version,
            ..Default::default()
        }
    }

    /// Find a template by name
    pub fn template(&self, name: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.name == name)
    }
}

/// A named material template
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub name: String,
    pub checksum: u32,
    pub flags: u32,
    /// First header word, zero in every known file
    pub leading: u32,
    pub reserved: [u32; 2],
    pub techniques: Vec<Technique>,
    pub ui_properties: Vec<UiProperty>,
}

impl Default for Template {
    fn default() -> Self {
        Self {
            name: String::new(),
            checksum: 0,
            flags: 4,
            leading: 0,
            reserved: [0; 2],
            techniques: Vec::new(),
            ui_properties: Vec::new(),
        }
    }
}

/// A rendering technique: a list of passes plus five shader stage pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Technique {
    pub name: String,
    pub checksum: u32,
    pub reserved: u32,
    pub passes: Vec<Pass>,
    pub flags: Vec<u32>,
    pub constant: u32,
    pub reserved_words: [u32; 12],
    pub sub_objects: [SubObject; 5],
    /// Trailing block, version 4 and later
    pub trailer: Opaque<8>,
}

/// `(count, offset)` pair whose target is not interpreted
///
/// The offset is kept exactly as stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Descriptor {
    pub count: u32,
    pub offset: u32,
}

impl Descriptor {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// A vertex/pixel shader pair with its binding descriptors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubObject {
    /// Leading block, version 4 and later
    pub prefix: Opaque<88>,
    pub vertex_code: Vec<u8>,
    pub vertex_constant_tag: u32,
    pub vertex_memory_offset: u32,
    pub pixel_code: Vec<u8>,
    pub pixel_constant_tag: u32,
    pub pixel_memory_offset: u32,
    pub a: Descriptor,
    pub b: Descriptor,
    pub c: Descriptor,
    pub sampler: Descriptor,
    pub reserved: [u32; 2],
}

/// A single render pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pass {
    pub name: String,
    pub render_states: Vec<RenderState>,
    /// Only stored before version 4
    pub unknown_children: Vec<UnknownChild>,
    pub vs_property_count: u32,
    pub ps_property_count: u32,
    pub vs_property_count_copy: u32,
    pub ps_property_count_copy: u32,
    pub sample_count: u32,
    pub reserved_a: u32,
    /// Expected empty
    pub vs_constants: Descriptor,
    /// Expected empty
    pub ps_constants: Descriptor,
    pub reserved_b: u32,
    pub shader_properties: Vec<ShaderProperty>,
    pub global_properties: Vec<ShaderProperty>,
    pub structure_a: Opaque<20>,
    /// Expected empty in every known file
    pub strange: Descriptor,
    pub structure_b: Opaque<20>,
    pub ui_properties: Vec<UiProperty>,
    /// 40 bytes before version 4, only the first 32 are stored after
    pub structure_c: Opaque<40>,
}

/// Opaque render state pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderState {
    pub word0: u32,
    pub word1: u32,
}

/// 26-byte pass child of unknown layout (before version 4)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UnknownChild {
    pub data: Opaque<26>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ShaderPropertyType {
    #[default]
    Value,
    Sample,
    Type2,
    Type3,
    Type4,
    Matrix,
}

/// A shader constant or sampler binding
#[derive(Debug, Clone, PartialEq)]
pub struct ShaderProperty {
    pub name: String,
    /// Only stored for [`ShaderPropertyType::Sample`]
    pub sample_name: String,
    pub checksum: u32,
    pub property_type: ShaderPropertyType,
    pub uv_index: u8,
    pub reserved_bytes: [u8; 2],
    /// Word after the name pointer, usually zero
    pub reserved: u32,
    pub reserved_indices: [u32; 3],
    pub skin_matrix_index: u32,
    pub defaults: Vec<f32>,
    pub ui_properties: Vec<UiProperty>,
}

impl Default for ShaderProperty {
    fn default() -> Self {
        Self {
            name: String::new(),
            sample_name: String::new(),
            checksum: 0,
            property_type: ShaderPropertyType::Value,
            uv_index: 0,
            reserved_bytes: [0; 2],
            reserved: 0,
            reserved_indices: [0; 3],
            skin_matrix_index: 0,
            defaults: Vec::new(),
            ui_properties: Vec::new(),
        }
    }
}

impl ShaderProperty {
    pub fn has_sample_name(&self) -> bool {
        self.property_type == ShaderPropertyType::Sample
    }
}

/// Value type tag of a UI property
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UiPropertyType {
    Float,
    Integer,
    Reserved2,
    Reserved3,
    #[default]
    Normal,
}

/// Value of a UI property, typed by its tag
#[derive(Debug, Clone, PartialEq)]
pub enum UiValue {
    Float(f32),
    Integer(u32),
    /// Tag 2, stored as a raw word
    Reserved2(u32),
    /// Tag 3, stored as a raw word
    Reserved3(u32),
    /// Tag 4 (NORMAL), a null-terminated string
    Text(String),
}

impl Default for UiValue {
    fn default() -> Self {
        UiValue::Text(String::new())
    }
}

impl UiValue {
    pub fn kind(&self) -> UiPropertyType {
        match self {
            UiValue::Float(_) => UiPropertyType::Float,
            UiValue::Integer(_) => UiPropertyType::Integer,
            UiValue::Reserved2(_) => UiPropertyType::Reserved2,
            UiValue::Reserved3(_) => UiPropertyType::Reserved3,
            UiValue::Text(_) => UiPropertyType::Normal,
        }
    }

    /// Length recorded in the header's value-length field
    pub fn stored_len(&self) -> u32 {
        match self {
            UiValue::Text(s) => s.chars().count() as u32,
            _ => 4,
        }
    }

    /// Bytes occupied in the property value region
    pub fn encoded_len(&self) -> u32 {
        match self {
            UiValue::Text(s) => crate::io::cstring_len(s),
            _ => 4,
        }
    }
}

/// A property exposed to material editors
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UiProperty {
    pub name: String,
    pub checksum: u32,
    /// Stored length field, kept as read
    pub value_length: u32,
    pub value: UiValue,
}

impl UiProperty {
    pub fn new(name: impl Into<String>, checksum: u32, value: UiValue) -> Self {
        Self {
            name: name.into(),
            checksum,
            value_length: value.stored_len(),
            value,
        }
    }

    pub fn kind(&self) -> UiPropertyType {
        self.value.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_defaults() {
        let template = Template::default();
        assert_eq!(template.flags, 4);
        assert!(template.techniques.is_empty());
    }

    #[test]
    fn test_ui_value_lengths() {
        assert_eq!(UiValue::Float(1.5).encoded_len(), 4);
        assert_eq!(UiValue::Reserved3(7).stored_len(), 4);
        assert_eq!(UiValue::Text("abc".into()).stored_len(), 3);
        assert_eq!(UiValue::Text("abc".into()).encoded_len(), 4);
    }

    #[test]
    fn test_ui_property_new() {
        let prop = UiProperty::new("Tint", 0xDEAD, UiValue::Text("red".into()));
        assert_eq!(prop.value_length, 3);
        assert_eq!(prop.kind(), UiPropertyType::Normal);

        let prop = UiProperty::new("Gloss", 1, UiValue::Float(0.25));
        assert_eq!(prop.value_length, 4);
        assert_eq!(prop.kind(), UiPropertyType::Float);
    }

    #[test]
    fn test_opaque_debug() {
        assert_eq!(format!("{:?}", Opaque::<4>::default()), "Opaque<4>(zeroed)");
        assert_eq!(format!("{:?}", Opaque([0xAB, 0x01])), "Opaque<2>(ab01)");
    }

    #[test]
    fn test_library_lookup() {
        let mut library = Library::new(FormatVersion::V3);
        library.templates.push(Template {
            name: "Skin".into(),
            ..Default::default()
        });
        assert!(library.template("Skin").is_some());
        assert!(library.template("Hair").is_none());
        assert_eq!(library.version, FormatVersion::V3);
    }
}
