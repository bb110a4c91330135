//! Field layouts of every entity kind
//!
//! Each entity lists its fields once, in wire order, in a `walk` routine.
//! The same walk drives decoding, encoding and layout planning, so the three
//! can never disagree about field order or size. A walker sees scalar fields
//! as plain reads/writes and pointer fields as requests to visit another
//! region (strings, child lists, microcode, property values).

use std::fmt;

use crate::chunk::Region;
use crate::error::{MatlError, Result};
use crate::io::Endian;
use crate::model::{
    Descriptor, Pass, RenderState, ShaderProperty, ShaderPropertyType, SubObject, Technique,
    Template, UiProperty, UiPropertyType, UiValue, UnknownChild,
};
use crate::version::{FormatVersion, VersionPolicy};

/// Entity kinds with a fixed header size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Template,
    Technique,
    SubObject,
    Pass,
    ShaderProperty,
    UiProperty,
    RenderState,
    UnknownChild,
}

impl EntityKind {
    pub fn name(self) -> &'static str {
        match self {
            EntityKind::Template => "Template",
            EntityKind::Technique => "Technique",
            EntityKind::SubObject => "SubObject",
            EntityKind::Pass => "Pass",
            EntityKind::ShaderProperty => "ShaderProperty",
            EntityKind::UiProperty => "UIProperty",
            EntityKind::RenderState => "RenderState",
            EntityKind::UnknownChild => "UnknownChild",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Enum stored as a raw integer tag
pub(crate) trait WireEnum: Copy {
    const NAME: &'static str;

    fn from_raw(raw: u32) -> Option<Self>;
    fn to_raw(self) -> u32;
}

impl WireEnum for ShaderPropertyType {
    const NAME: &'static str = "ShaderPropertyType";

    fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => ShaderPropertyType::Value,
            1 => ShaderPropertyType::Sample,
            2 => ShaderPropertyType::Type2,
            3 => ShaderPropertyType::Type3,
            4 => ShaderPropertyType::Type4,
            5 => ShaderPropertyType::Matrix,
            _ => return None,
        })
    }

    fn to_raw(self) -> u32 {
        match self {
            ShaderPropertyType::Value => 0,
            ShaderPropertyType::Sample => 1,
            ShaderPropertyType::Type2 => 2,
            ShaderPropertyType::Type3 => 3,
            ShaderPropertyType::Type4 => 4,
            ShaderPropertyType::Matrix => 5,
        }
    }
}

impl WireEnum for UiPropertyType {
    const NAME: &'static str = "UIPropertyType";

    fn from_raw(raw: u32) -> Option<Self> {
        Some(match raw {
            0 => UiPropertyType::Float,
            1 => UiPropertyType::Integer,
            2 => UiPropertyType::Reserved2,
            3 => UiPropertyType::Reserved3,
            4 => UiPropertyType::Normal,
            _ => return None,
        })
    }

    fn to_raw(self) -> u32 {
        match self {
            UiPropertyType::Float => 0,
            UiPropertyType::Integer => 1,
            UiPropertyType::Reserved2 => 2,
            UiPropertyType::Reserved3 => 3,
            UiPropertyType::Normal => 4,
        }
    }
}

/// Deferred string pointer, resolved after later fields are known
#[derive(Debug, Clone, Copy)]
pub(crate) struct StringSlot(pub u32);

/// One direction of traversal over entity fields
pub(crate) trait Walker {
    fn policy(&self) -> VersionPolicy;
    fn version(&self) -> FormatVersion;

    fn u8(&mut self, value: &mut u8) -> Result<()>;
    fn u32(&mut self, value: &mut u32, order: Endian) -> Result<()>;
    /// Opaque bytes, stored verbatim
    fn bytes(&mut self, value: &mut [u8]) -> Result<()>;

    /// Pointer into the string region
    fn string(&mut self, value: &mut String) -> Result<()>;
    /// String pointer whose presence is decided by a later field
    fn string_slot(&mut self, value: &str, present: bool) -> Result<StringSlot>;
    fn fill_string(&mut self, slot: StringSlot, present: bool, value: &mut String) -> Result<()>;

    /// `(count, pointer)` pair followed by the records it points at
    fn list<T: Record>(&mut self, items: &mut Vec<T>, region: Region, order: Endian) -> Result<()>;
    /// `(count, pointer)` pair over big-endian words
    fn words(&mut self, values: &mut Vec<u32>, region: Region) -> Result<()>;
    /// `(count, pointer)` pair over floats stored in `order`
    fn floats(&mut self, values: &mut Vec<f32>, region: Region, order: Endian) -> Result<()>;

    /// A record's fixed header, checked against its documented size
    fn record<T: Record>(&mut self, item: &mut T) -> Result<()>;

    /// Microcode-relative pointer to a blob of `len` bytes
    fn microcode(&mut self, len: u32, code: &mut Vec<u8>) -> Result<()>;
    /// Pointer to a property value interpreted according to `kind`
    fn ui_value(&mut self, kind: UiPropertyType, value: &mut UiValue) -> Result<()>;

    fn word(&mut self, value: &mut u32) -> Result<()> {
        self.u32(value, Endian::Big)
    }

    fn tag_u8<E: WireEnum>(&mut self, value: &mut E) -> Result<()> {
        let mut raw = value.to_raw() as u8;
        self.u8(&mut raw)?;
        *value = E::from_raw(u32::from(raw)).ok_or(MatlError::UnexpectedValue {
            enum_name: E::NAME,
            value: u32::from(raw),
        })?;
        Ok(())
    }

    fn tag_u32<E: WireEnum>(&mut self, value: &mut E) -> Result<()> {
        let mut raw = value.to_raw();
        self.word(&mut raw)?;
        *value = E::from_raw(raw).ok_or(MatlError::UnexpectedValue {
            enum_name: E::NAME,
            value: raw,
        })?;
        Ok(())
    }

    fn descriptor(&mut self, value: &mut Descriptor) -> Result<()> {
        self.word(&mut value.count)?;
        self.word(&mut value.offset)
    }
}

/// An entity with a fixed-size header
pub(crate) trait Record: Default {
    const KIND: EntityKind;

    fn walk<W: Walker>(&mut self, w: &mut W) -> Result<()>;

    /// Report tolerated anomalies after decoding
    fn inspect(&self) {}
}

/// Error for a populated field the walker's version has no room for
fn unstored<W: Walker>(field: &'static str, w: &W) -> MatlError {
    MatlError::UnsupportedField {
        field,
        version: w.version().0,
    }
}

/// Length of an in-memory collection as a stored count
pub(crate) fn count_of(len: usize, what: &'static str) -> Result<u32> {
    u32::try_from(len).map_err(|_| MatlError::CountOverflow { what, len })
}

impl Record for Template {
    const KIND: EntityKind = EntityKind::Template;

    fn walk<W: Walker>(&mut self, w: &mut W) -> Result<()> {
        w.word(&mut self.leading)?;
        w.string(&mut self.name)?;
        w.word(&mut self.checksum)?;
        w.word(&mut self.flags)?;
        for word in &mut self.reserved {
            w.word(word)?;
        }
        w.list(&mut self.techniques, Region::Techniques, Endian::Big)?;
        w.list(&mut self.ui_properties, Region::UiProperties, Endian::Big)
    }

    fn inspect(&self) {
        if self.reserved[1] != 0 {
            tracing::debug!(
                "Template \"{}\": reserved word expected to be 0 but was {:#x}",
                self.name,
                self.reserved[1]
            );
        }
    }
}

impl Record for Technique {
    const KIND: EntityKind = EntityKind::Technique;

    fn walk<W: Walker>(&mut self, w: &mut W) -> Result<()> {
        w.string(&mut self.name)?;
        w.word(&mut self.checksum)?;
        w.word(&mut self.reserved)?;
        w.list(&mut self.passes, Region::Passes, Endian::Big)?;
        // Flag words share the UI property region
        w.words(&mut self.flags, Region::UiProperties)?;
        w.word(&mut self.constant)?;
        for word in &mut self.reserved_words {
            w.word(word)?;
        }
        for sub_object in &mut self.sub_objects {
            w.record(sub_object)?;
        }
        if w.policy().technique_trailer {
            w.bytes(&mut self.trailer.0)?;
        } else if !self.trailer.is_zeroed() {
            return Err(unstored("Technique.trailer", w));
        }
        Ok(())
    }
}

impl Record for SubObject {
    const KIND: EntityKind = EntityKind::SubObject;

    fn walk<W: Walker>(&mut self, w: &mut W) -> Result<()> {
        if w.policy().sub_object_prefix {
            w.bytes(&mut self.prefix.0)?;
        } else if !self.prefix.is_zeroed() {
            return Err(unstored("SubObject.prefix", w));
        }

        let mut vertex_len = count_of(self.vertex_code.len(), "vertex microcode")?;
        w.word(&mut vertex_len)?;
        w.word(&mut self.vertex_constant_tag)?;
        w.microcode(vertex_len, &mut self.vertex_code)?;
        w.word(&mut self.vertex_memory_offset)?;

        let mut pixel_len = count_of(self.pixel_code.len(), "pixel microcode")?;
        w.word(&mut pixel_len)?;
        w.word(&mut self.pixel_constant_tag)?;
        w.microcode(pixel_len, &mut self.pixel_code)?;
        w.word(&mut self.pixel_memory_offset)?;

        w.descriptor(&mut self.a)?;
        w.descriptor(&mut self.b)?;
        w.descriptor(&mut self.c)?;
        w.descriptor(&mut self.sampler)?;

        for word in &mut self.reserved {
            w.word(word)?;
        }
        Ok(())
    }
}

impl Record for Pass {
    const KIND: EntityKind = EntityKind::Pass;

    fn walk<W: Walker>(&mut self, w: &mut W) -> Result<()> {
        let policy = w.policy();

        w.string(&mut self.name)?;
        w.list(&mut self.render_states, Region::RenderStates, Endian::Big)?;
        if policy.pass_unknown_children {
            w.list(&mut self.unknown_children, Region::UnknownChildren, Endian::Big)?;
        } else if !self.unknown_children.is_empty() {
            return Err(unstored("Pass.unknown_children", w));
        }

        w.word(&mut self.vs_property_count)?;
        w.word(&mut self.ps_property_count)?;
        w.word(&mut self.vs_property_count_copy)?;
        w.word(&mut self.ps_property_count_copy)?;
        w.word(&mut self.sample_count)?;

        w.word(&mut self.reserved_a)?;
        w.descriptor(&mut self.vs_constants)?;
        w.descriptor(&mut self.ps_constants)?;
        w.word(&mut self.reserved_b)?;

        w.list(&mut self.shader_properties, Region::ShaderProperties, Endian::Big)?;
        // Count and pointer of the global list are little-endian
        w.list(
            &mut self.global_properties,
            Region::ShaderProperties,
            Endian::Little,
        )?;

        w.bytes(&mut self.structure_a.0)?;
        w.descriptor(&mut self.strange)?;
        w.bytes(&mut self.structure_b.0)?;

        w.list(&mut self.ui_properties, Region::UiProperties, Endian::Big)?;

        let (stored, dropped) = self.structure_c.0.split_at_mut(policy.pass_tail_len);
        if dropped.iter().any(|&b| b != 0) {
            return Err(unstored("Pass.structure_c", w));
        }
        w.bytes(stored)
    }

    fn inspect(&self) {
        if !self.vs_constants.is_empty() || !self.ps_constants.is_empty() {
            tracing::warn!(
                "Pass \"{}\": shader constant descriptors expected empty (vs {}, ps {})",
                self.name,
                self.vs_constants.count,
                self.ps_constants.count
            );
        }
        if !self.strange.is_empty() {
            tracing::warn!(
                "Pass \"{}\": reserved descriptor expected empty but has count {} at offset {:#x}",
                self.name,
                self.strange.count,
                self.strange.offset
            );
        }
        if self.vs_property_count != self.vs_property_count_copy
            || self.ps_property_count != self.ps_property_count_copy
        {
            tracing::warn!(
                "Pass \"{}\": property counts disagree with their copies (vs {}/{}, ps {}/{})",
                self.name,
                self.vs_property_count,
                self.vs_property_count_copy,
                self.ps_property_count,
                self.ps_property_count_copy
            );
        }
    }
}

impl Record for ShaderProperty {
    const KIND: EntityKind = EntityKind::ShaderProperty;

    fn walk<W: Walker>(&mut self, w: &mut W) -> Result<()> {
        w.string(&mut self.name)?;
        w.word(&mut self.reserved)?;
        let sample = w.string_slot(&self.sample_name, self.has_sample_name())?;
        w.word(&mut self.checksum)?;

        w.tag_u8(&mut self.property_type)?;
        w.u8(&mut self.uv_index)?;
        w.u8(&mut self.reserved_bytes[0])?;
        w.u8(&mut self.reserved_bytes[1])?;

        w.word(&mut self.reserved_indices[0])?;
        w.word(&mut self.reserved_indices[1])?;
        w.word(&mut self.skin_matrix_index)?;
        w.word(&mut self.reserved_indices[2])?;

        // Default values are little-endian
        w.floats(&mut self.defaults, Region::Defaults, Endian::Little)?;
        w.list(&mut self.ui_properties, Region::UiProperties, Endian::Big)?;

        let present = self.has_sample_name();
        w.fill_string(sample, present, &mut self.sample_name)
    }
}

impl Record for UiProperty {
    const KIND: EntityKind = EntityKind::UiProperty;

    fn walk<W: Walker>(&mut self, w: &mut W) -> Result<()> {
        w.string(&mut self.name)?;
        w.word(&mut self.checksum)?;
        let mut kind = self.value.kind();
        w.tag_u32(&mut kind)?;
        w.word(&mut self.value_length)?;
        w.ui_value(kind, &mut self.value)
    }
}

impl Record for RenderState {
    const KIND: EntityKind = EntityKind::RenderState;

    fn walk<W: Walker>(&mut self, w: &mut W) -> Result<()> {
        w.word(&mut self.word0)?;
        w.word(&mut self.word1)
    }
}

impl Record for UnknownChild {
    const KIND: EntityKind = EntityKind::UnknownChild;

    fn walk<W: Walker>(&mut self, w: &mut W) -> Result<()> {
        w.bytes(&mut self.data.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shader_property_type_tags() {
        for raw in 0..6 {
            let ty = ShaderPropertyType::from_raw(raw).unwrap();
            assert_eq!(ty.to_raw(), raw);
        }
        assert!(ShaderPropertyType::from_raw(6).is_none());
        assert_eq!(
            ShaderPropertyType::from_raw(1),
            Some(ShaderPropertyType::Sample)
        );
    }

    #[test]
    fn test_ui_property_type_tags() {
        assert_eq!(UiPropertyType::from_raw(0), Some(UiPropertyType::Float));
        assert_eq!(UiPropertyType::from_raw(4), Some(UiPropertyType::Normal));
        assert!(UiPropertyType::from_raw(5).is_none());
        assert_eq!(UiPropertyType::NAME, "UIPropertyType");
    }

    #[test]
    fn test_count_of() {
        assert_eq!(count_of(3, "flags").unwrap(), 3);
    }

    #[test]
    fn test_entity_kind_display() {
        assert_eq!(EntityKind::UiProperty.to_string(), "UIProperty");
        assert_eq!(EntityKind::Technique.to_string(), "Technique");
    }
}
