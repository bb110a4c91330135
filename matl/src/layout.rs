//! Layout planning
//!
//! Before anything is written the whole tree is walked once to count every
//! entity kind and the bytes of variable-length data. From those counts each
//! region gets an exact size and a base address; regions are laid out
//! back-to-back in file order with the growable microcode region last.

use crate::address::{AddressSpace, PointerBase};
use crate::chunk::{Chunk, Region};
use crate::error::{MatlError, Result};
use crate::io::{Endian, cstring_len};
use crate::model::{Library, UiPropertyType, UiValue};
use crate::schema::{EntityKind, Record, StringSlot, Walker, count_of};
use crate::version::{FormatVersion, VersionPolicy};

/// Totals gathered by a single pre-pass over a library
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityCounts {
    pub templates: u32,
    pub techniques: u32,
    pub passes: u32,
    /// Pass shader properties plus pass global properties
    pub shader_properties: u32,
    /// Default float values
    pub defaults: u32,
    pub render_states: u32,
    pub unknown_children: u32,
    pub ui_properties: u32,
    /// Technique flag words
    pub flags: u32,
    /// Bytes of UI property values, string terminators included
    pub value_bytes: u32,
    /// Bytes of non-empty strings, terminators included
    pub string_bytes: u32,
}

impl EntityCounts {
    /// Count everything in `library`
    pub fn tally(library: &mut Library) -> Result<Self> {
        let mut tally = Tally {
            version: library.version,
            policy: library.version.policy(),
            counts: EntityCounts {
                templates: count_of(library.templates.len(), "template table")?,
                ..Default::default()
            },
        };
        for template in &mut library.templates {
            tally.record(template)?;
        }
        Ok(tally.counts)
    }

    fn add(&mut self, kind: EntityKind, count: u32) {
        let slot = match kind {
            EntityKind::Template => &mut self.templates,
            EntityKind::Technique => &mut self.techniques,
            EntityKind::Pass => &mut self.passes,
            EntityKind::ShaderProperty => &mut self.shader_properties,
            EntityKind::UiProperty => &mut self.ui_properties,
            EntityKind::RenderState => &mut self.render_states,
            EntityKind::UnknownChild => &mut self.unknown_children,
            // Inline in their technique
            EntityKind::SubObject => return,
        };
        *slot = slot.saturating_add(count);
    }
}

impl Library {
    /// Per-kind totals as the layout planner sees them
    pub fn counts(&self) -> Result<EntityCounts> {
        EntityCounts::tally(&mut self.clone())
    }
}

/// Walker that only counts
struct Tally {
    version: FormatVersion,
    policy: VersionPolicy,
    counts: EntityCounts,
}

impl Tally {
    fn add_string(&mut self, value: &str) {
        if !value.is_empty() {
            self.counts.string_bytes = self.counts.string_bytes.saturating_add(cstring_len(value));
        }
    }
}

impl Walker for Tally {
    fn policy(&self) -> VersionPolicy {
        self.policy
    }

    fn version(&self) -> FormatVersion {
        self.version
    }

    fn u8(&mut self, _value: &mut u8) -> Result<()> {
        Ok(())
    }

    fn u32(&mut self, _value: &mut u32, _order: Endian) -> Result<()> {
        Ok(())
    }

    fn bytes(&mut self, _value: &mut [u8]) -> Result<()> {
        Ok(())
    }

    fn string(&mut self, value: &mut String) -> Result<()> {
        self.add_string(value);
        Ok(())
    }

    fn string_slot(&mut self, value: &str, present: bool) -> Result<StringSlot> {
        if present {
            self.add_string(value);
        }
        Ok(StringSlot(0))
    }

    fn fill_string(
        &mut self,
        _slot: StringSlot,
        _present: bool,
        _value: &mut String,
    ) -> Result<()> {
        Ok(())
    }

    fn list<T: Record>(
        &mut self,
        items: &mut Vec<T>,
        _region: Region,
        _order: Endian,
    ) -> Result<()> {
        self.counts.add(T::KIND, count_of(items.len(), T::KIND.name())?);
        for item in items {
            self.record(item)?;
        }
        Ok(())
    }

    fn words(&mut self, values: &mut Vec<u32>, _region: Region) -> Result<()> {
        let count = count_of(values.len(), "technique flags")?;
        self.counts.flags = self.counts.flags.saturating_add(count);
        Ok(())
    }

    fn floats(&mut self, values: &mut Vec<f32>, _region: Region, _order: Endian) -> Result<()> {
        let count = count_of(values.len(), "default values")?;
        self.counts.defaults = self.counts.defaults.saturating_add(count);
        Ok(())
    }

    fn record<T: Record>(&mut self, item: &mut T) -> Result<()> {
        item.walk(self)
    }

    fn microcode(&mut self, _len: u32, _code: &mut Vec<u8>) -> Result<()> {
        Ok(())
    }

    fn ui_value(&mut self, _kind: UiPropertyType, value: &mut UiValue) -> Result<()> {
        self.counts.value_bytes = self.counts.value_bytes.saturating_add(value.encoded_len());
        Ok(())
    }
}

/// Base and size of every region of one output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionTable {
    version: FormatVersion,
    counts: EntityCounts,
    chunks: Vec<Chunk>,
}

impl RegionTable {
    /// Lay out regions for the given version and totals
    pub fn plan(version: FormatVersion, counts: &EntityCounts) -> Result<Self> {
        let policy = version.policy();
        let size = |kind| policy.record_size(kind);

        let sizes = [
            (Region::Header, policy.header_size),
            (Region::TemplateTable, span(counts.templates.saturating_add(1), 4)?),
            (Region::Templates, span(counts.templates, size(EntityKind::Template))?),
            (Region::Techniques, span(counts.techniques, size(EntityKind::Technique))?),
            (Region::Passes, span(counts.passes, size(EntityKind::Pass))?),
            (
                Region::ShaderProperties,
                span(counts.shader_properties, size(EntityKind::ShaderProperty))?,
            ),
            (Region::Defaults, span(counts.defaults, 4)?),
            (Region::RenderStates, span(counts.render_states, size(EntityKind::RenderState))?),
            (
                Region::UnknownChildren,
                span(counts.unknown_children, size(EntityKind::UnknownChild))?,
            ),
            (
                Region::UiProperties,
                span(counts.ui_properties, size(EntityKind::UiProperty))?
                    .checked_add(span(counts.flags, 4)?)
                    .ok_or(MatlError::CountOverflow {
                        what: "UI property region",
                        len: usize::MAX,
                    })?,
            ),
            (Region::PropertyValues, counts.value_bytes),
            (Region::Strings, counts.string_bytes),
        ];

        let mut chunks = Vec::with_capacity(Region::COUNT);
        let mut base = 0u32;
        for (region, size) in sizes {
            chunks.push(Chunk::new(region, base, size));
            base = base.checked_add(size).ok_or(MatlError::CountOverflow {
                what: region.name(),
                len: size as usize,
            })?;
        }
        chunks.push(Chunk::growable(Region::Microcode, base));

        let table = Self {
            version,
            counts: *counts,
            chunks,
        };
        tracing::debug!("Planned MATL v{} layout:\n{}", version, table);
        Ok(table)
    }

    pub fn version(&self) -> FormatVersion {
        self.version
    }

    pub fn counts(&self) -> &EntityCounts {
        &self.counts
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, region: Region) -> &Chunk {
        &self.chunks[region.index()]
    }

    pub(crate) fn chunk_mut(&mut self, region: Region) -> &mut Chunk {
        &mut self.chunks[region.index()]
    }

    /// Base of template-relative pointers
    pub fn template_base(&self) -> u32 {
        self.chunk(Region::Templates).base()
    }

    /// Base of microcode-relative pointers
    pub fn microcode_base(&self) -> u32 {
        self.chunk(Region::Microcode).base()
    }

    pub fn address_space(&self) -> AddressSpace {
        AddressSpace::new(self.template_base(), self.microcode_base())
    }

    /// Stored pointer to the start of `region`
    pub fn offset_of(&self, region: Region) -> u32 {
        self.address_space()
            .relativize(PointerBase::Template, self.chunk(region).base())
    }
}

impl std::fmt::Display for RegionTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for chunk in &self.chunks {
            writeln!(
                f,
                "  {:<16} {:#08x} +{:#x}{}",
                chunk.region().name(),
                chunk.base(),
                chunk.size(),
                if chunk.is_growable() { " (growable)" } else { "" }
            )?;
        }
        Ok(())
    }
}

fn span(count: u32, size: u32) -> Result<u32> {
    count.checked_mul(size).ok_or(MatlError::CountOverflow {
        what: "region",
        len: count as usize,
    })
}

/// Compute the region layout `encode` would use for `library`
pub fn plan(library: &Library) -> Result<RegionTable> {
    let mut tree = library.clone();
    plan_tree(&mut tree)
}

pub(crate) fn plan_tree(library: &mut Library) -> Result<RegionTable> {
    let counts = EntityCounts::tally(library)?;
    RegionTable::plan(library.version, &counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        Pass, RenderState, ShaderProperty, ShaderPropertyType, Technique, Template, UiProperty,
    };

    fn sample_library() -> Library {
        let pass = Pass {
            name: "P0".into(),
            render_states: vec![RenderState::default(); 3],
            shader_properties: vec![ShaderProperty {
                name: "Diffuse".into(),
                sample_name: "DiffuseSampler".into(),
                property_type: ShaderPropertyType::Sample,
                defaults: vec![1.0, 0.5],
                ..Default::default()
            }],
            global_properties: vec![ShaderProperty {
                name: "World".into(),
                // Not a sampler, so this name is never stored
                sample_name: "ignored".into(),
                ..Default::default()
            }],
            ui_properties: vec![UiProperty::new("Tint", 1, UiValue::Text("red".into()))],
            ..Default::default()
        };
        let technique = Technique {
            name: "T0".into(),
            passes: vec![pass],
            flags: vec![1, 2],
            ..Default::default()
        };
        let mut library = Library::new(FormatVersion::V4);
        library.templates.push(Template {
            name: "Skin".into(),
            techniques: vec![technique],
            ui_properties: vec![UiProperty::new("Gloss", 2, UiValue::Float(0.5))],
            ..Default::default()
        });
        library
    }

    #[test]
    fn test_tally_counts() {
        let mut library = sample_library();
        let counts = EntityCounts::tally(&mut library).unwrap();
        assert_eq!(counts.templates, 1);
        assert_eq!(counts.techniques, 1);
        assert_eq!(counts.passes, 1);
        assert_eq!(counts.shader_properties, 2);
        assert_eq!(counts.defaults, 2);
        assert_eq!(counts.render_states, 3);
        assert_eq!(counts.ui_properties, 2);
        assert_eq!(counts.flags, 2);
        // "red\0" + 4-byte float
        assert_eq!(counts.value_bytes, 8);
        // Skin T0 P0 Diffuse DiffuseSampler World Tint Gloss
        assert_eq!(counts.string_bytes, 5 + 3 + 3 + 8 + 15 + 6 + 5 + 6);
    }

    #[test]
    fn test_regions_are_contiguous() {
        let table = plan(&sample_library()).unwrap();
        let chunks = table.chunks();
        assert_eq!(chunks.len(), Region::COUNT);
        assert_eq!(chunks[0].base(), 0);
        for pair in chunks.windows(2) {
            assert_eq!(pair[0].end(), pair[1].base());
            assert!(pair[0].region() < pair[1].region());
        }
        let last = chunks.last().unwrap();
        assert_eq!(last.region(), Region::Microcode);
        assert!(last.is_growable());
        assert!(chunks[..chunks.len() - 1].iter().all(|c| !c.is_growable()));
    }

    #[test]
    fn test_region_sizes() {
        let table = plan(&sample_library()).unwrap();
        assert_eq!(table.chunk(Region::Header).size(), 16);
        assert_eq!(table.chunk(Region::TemplateTable).size(), 8);
        assert_eq!(table.template_base(), 24);
        assert_eq!(table.chunk(Region::Techniques).size(), 888);
        assert_eq!(table.chunk(Region::Passes).size(), 160);
        assert_eq!(table.chunk(Region::ShaderProperties).size(), 2 * 0x34);
        assert_eq!(table.chunk(Region::UiProperties).size(), 2 * 20 + 2 * 4);
        assert_eq!(table.offset_of(Region::Templates), 0);
    }

    #[test]
    fn test_empty_library_plan() {
        let table = plan(&Library::new(FormatVersion::V2)).unwrap();
        assert_eq!(table.chunk(Region::Header).size(), 20);
        assert_eq!(table.chunk(Region::TemplateTable).size(), 4);
        assert_eq!(table.microcode_base(), 24);
        assert_eq!(table.microcode_base(), table.template_base());
    }
}
