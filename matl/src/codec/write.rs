//! MATL encoding
//!
//! The layout is planned up front, so every pointer can be written as soon as
//! its field is reached: it is the current cursor of the target region,
//! relative to the template base, taken just before the target is written.

use tracing::warn;

use crate::MATL_MAGIC;
use crate::address::{AddressSpace, NULL_OFFSET, PointerBase};
use crate::chunk::Region;
use crate::error::{MatlError, Result};
use crate::io::{Endian, cstring_bytes};
use crate::layout::plan_tree;
use crate::model::{Library, UiPropertyType, UiValue};
use crate::mux::{Anchor, Origin, RegionWriter};
use crate::options::{CodecOptions, SizeCheck};
use crate::schema::{EntityKind, Record, StringSlot, Walker, count_of};
use crate::version::{FormatVersion, VersionPolicy};

/// Encode a library with default options
pub fn encode(library: &Library) -> Result<Vec<u8>> {
    encode_with(library, &CodecOptions::default())
}

/// Encode a library to bytes
pub fn encode_with(library: &Library, options: &CodecOptions) -> Result<Vec<u8>> {
    // Walks take the tree mutably so one field list serves both directions
    let mut tree = library.clone();
    let out = RegionWriter::new(plan_tree(&mut tree)?);
    let space = out.table().address_space();

    let mut encoder = Encoder {
        out,
        version: tree.version,
        policy: tree.version.policy(),
        space,
        options,
    };

    encoder.header(&tree)?;
    encoder.template_table(tree.templates.len())?;

    encoder.out.enter(Region::Templates);
    for template in &mut tree.templates {
        encoder.record(template)?;
    }
    encoder.out.leave();

    encoder.out.finish()
}

struct Encoder<'a> {
    out: RegionWriter,
    version: FormatVersion,
    policy: VersionPolicy,
    space: AddressSpace,
    options: &'a CodecOptions,
}

impl Encoder<'_> {
    fn header(&mut self, library: &Library) -> Result<()> {
        self.out.enter(Region::Header);
        self.out.write_bytes(&MATL_MAGIC)?;
        self.out.write_u32(self.version.0, Endian::Big)?;
        let count = count_of(library.templates.len(), "template table")?;
        self.out.write_u32(count, Endian::Big)?;
        self.out.patch(Region::Microcode, Anchor::Start, Origin::Templates)?;
        if self.policy.header_extra {
            self.out.write_bytes(&library.header_extra)?;
        }
        self.out.leave();
        Ok(())
    }

    fn template_table(&mut self, count: usize) -> Result<()> {
        let size = self.policy.record_size(EntityKind::Template);
        self.out.enter(Region::TemplateTable);
        for index in 0..count_of(count, "template table")? {
            self.out.write_u32(index * size, Endian::Big)?;
        }
        // Distance from the terminal entry to the end of the file
        self.out.patch(Region::Microcode, Anchor::End, Origin::Field)?;
        self.out.leave();
        Ok(())
    }

    /// Stored template-relative pointer to the next write in `region`
    fn pointer_to(&self, region: Region) -> u32 {
        self.space
            .relativize(PointerBase::Template, self.out.cursor(region))
    }

    /// Write `bytes` into `region`, returning the stored pointer to them
    fn put(&mut self, region: Region, bytes: &[u8]) -> Result<u32> {
        let pointer = self.pointer_to(region);
        self.out.enter(region);
        self.out.write_bytes(bytes)?;
        self.out.leave();
        Ok(pointer)
    }

    fn put_string(&mut self, value: &str) -> Result<()> {
        let pointer = if value.is_empty() {
            NULL_OFFSET
        } else {
            let bytes = cstring_bytes(value)?;
            self.put(Region::Strings, &bytes)?
        };
        self.out.write_u32(pointer, Endian::Big)
    }
}

impl Walker for Encoder<'_> {
    fn policy(&self) -> VersionPolicy {
        self.policy
    }

    fn version(&self) -> FormatVersion {
        self.version
    }

    fn u8(&mut self, value: &mut u8) -> Result<()> {
        self.out.write_bytes(&[*value])
    }

    fn u32(&mut self, value: &mut u32, order: Endian) -> Result<()> {
        self.out.write_u32(*value, order)
    }

    fn bytes(&mut self, value: &mut [u8]) -> Result<()> {
        self.out.write_bytes(value)
    }

    fn string(&mut self, value: &mut String) -> Result<()> {
        self.put_string(value)
    }

    fn string_slot(&mut self, value: &str, present: bool) -> Result<StringSlot> {
        if present {
            self.put_string(value)?;
        } else {
            self.out.write_u32(NULL_OFFSET, Endian::Big)?;
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

    fn list<T: Record>(&mut self, items: &mut Vec<T>, region: Region, order: Endian) -> Result<()> {
        let count = count_of(items.len(), T::KIND.name())?;
        let pointer = self.pointer_to(region);
        self.out.write_u32(count, order)?;
        self.out.write_u32(pointer, order)?;
        self.out.enter(region);
        for item in items.iter_mut() {
            self.record(item)?;
        }
        self.out.leave();
        Ok(())
    }

    fn words(&mut self, values: &mut Vec<u32>, region: Region) -> Result<()> {
        let count = count_of(values.len(), "technique flags")?;
        let pointer = self.pointer_to(region);
        self.out.write_u32(count, Endian::Big)?;
        self.out.write_u32(pointer, Endian::Big)?;
        self.out.enter(region);
        for value in values.iter() {
            self.out.write_u32(*value, Endian::Big)?;
        }
        self.out.leave();
        Ok(())
    }

    fn floats(&mut self, values: &mut Vec<f32>, region: Region, order: Endian) -> Result<()> {
        let count = count_of(values.len(), "default values")?;
        let pointer = self.pointer_to(region);
        self.out.write_u32(count, Endian::Big)?;
        self.out.write_u32(pointer, Endian::Big)?;
        self.out.enter(region);
        for value in values.iter() {
            self.out.write_f32(*value, order)?;
        }
        self.out.leave();
        Ok(())
    }

    fn record<T: Record>(&mut self, item: &mut T) -> Result<()> {
        let start = self.out.position()?;
        item.walk(self)?;

        let expected = self.policy.record_size(T::KIND);
        let actual = self.out.position()? - start;
        if actual != expected {
            match self.options.size_check {
                SizeCheck::Strict => {
                    return Err(MatlError::SizeMismatch {
                        kind: T::KIND,
                        expected,
                        actual,
                    });
                }
                SizeCheck::Warn => warn!(
                    "{} at {:#x}: wrote {} header bytes, expected {}",
                    T::KIND,
                    start,
                    actual,
                    expected
                ),
            }
        }
        Ok(())
    }

    fn microcode(&mut self, _len: u32, code: &mut Vec<u8>) -> Result<()> {
        let address = self.out.cursor(Region::Microcode);
        self.out.enter(Region::Microcode);
        self.out.write_bytes(code)?;
        self.out.leave();
        let pointer = self.space.relativize(PointerBase::Microcode, address);
        self.out.write_u32(pointer, Endian::Big)
    }

    fn ui_value(&mut self, _kind: UiPropertyType, value: &mut UiValue) -> Result<()> {
        let pointer = match value {
            UiValue::Float(v) => self.put(Region::PropertyValues, &v.to_be_bytes())?,
            UiValue::Integer(v) | UiValue::Reserved2(v) | UiValue::Reserved3(v) => {
                self.put(Region::PropertyValues, &v.to_be_bytes())?
            }
            UiValue::Text(s) => {
                let bytes = cstring_bytes(s)?;
                self.put(Region::PropertyValues, &bytes)?
            }
        };
        self.out.write_u32(pointer, Endian::Big)
    }
}
