//! MATL decoding
//!
//! Pointers are followed as soon as they are read: the reader jumps to the
//! target, decodes it, and seeks back to continue the parent.

use tracing::{debug, trace, warn};

use crate::MATL_MAGIC;
use crate::address::{AddressSpace, NULL_OFFSET, PointerBase};
use crate::chunk::Region;
use crate::error::{MatlError, Result};
use crate::io::{BinaryReader, Endian};
use crate::model::{Library, Template, UiPropertyType, UiValue};
use crate::options::{CodecOptions, SizeCheck};
use crate::schema::{EntityKind, Record, StringSlot, Walker};
use crate::version::{FormatVersion, VersionPolicy};

/// Decode a library from bytes with default options
pub fn decode(data: &[u8]) -> Result<Library> {
    decode_with(data, &CodecOptions::default())
}

/// Decode a library from bytes
pub fn decode_with(data: &[u8], options: &CodecOptions) -> Result<Library> {
    let mut io = BinaryReader::new(data);

    let magic = io.read_magic()?;
    if magic != MATL_MAGIC {
        return Err(MatlError::InvalidMagic { found: magic });
    }

    let version = FormatVersion(io.read_u32(Endian::Big)?);
    let policy = version.policy();
    let template_count = io.read_u32(Endian::Big)?;
    let microcode_offset = io.read_u32(Endian::Big)?;

    let mut header_extra = [0u8; 4];
    if policy.header_extra {
        io.read_exact(&mut header_extra)?;
    }

    if template_count > io.remaining() / 4 {
        return Err(MatlError::UnexpectedEof {
            offset: io.position(),
            need: template_count.saturating_mul(4),
            have: io.remaining(),
        });
    }
    let mut offsets = Vec::with_capacity(template_count as usize);
    for _ in 0..template_count {
        offsets.push(io.read_u32(Endian::Big)?);
    }
    // Files without templates may omit the terminal entry
    if io.remaining() >= 4 {
        let terminal = io.read_u32(Endian::Big)?;
        trace!("template table terminal {:#x}", terminal);
    }

    let template_base = policy.header_size + (template_count + 1) * 4;
    let space = AddressSpace::new(
        template_base,
        template_base.saturating_add(microcode_offset),
    );
    debug!(
        "MATL v{}: {} template(s), template base {:#x}, microcode base {:#x}",
        version, template_count, space.template, space.microcode
    );

    let mut decoder = Decoder {
        io,
        version,
        policy,
        space,
        options,
    };

    let mut templates = Vec::with_capacity(offsets.len());
    let size = policy.record_size(EntityKind::Template);
    for offset in offsets {
        let address = decoder.locate("template", PointerBase::Template, offset, size.into())?;
        decoder.io.seek(address)?;
        let mut template = Template::default();
        decoder.record(&mut template)?;
        templates.push(template);
    }

    Ok(Library {
        version,
        header_extra,
        templates,
    })
}

struct Decoder<'a> {
    io: BinaryReader<'a>,
    version: FormatVersion,
    policy: VersionPolicy,
    space: AddressSpace,
    options: &'a CodecOptions,
}

impl Decoder<'_> {
    /// Resolve a stored pointer and check `span` bytes fit at the target
    fn locate(&self, what: &'static str, base: PointerBase, stored: u32, span: u64) -> Result<u32> {
        let address = self.space.resolve(base, stored);
        let len = self.io.len();
        if address < 0 || address as u64 + span > u64::from(len) {
            return Err(MatlError::PointerOutOfRange { what, address, len });
        }
        Ok(address as u32)
    }

    /// Run `f` at `address`, then return to the current position
    fn visit<T>(&mut self, address: u32, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let resume = self.io.position();
        self.io.seek(address)?;
        let value = f(self)?;
        self.io.seek(resume)?;
        Ok(value)
    }

    fn string_at(&mut self, stored: u32) -> Result<String> {
        if stored == NULL_OFFSET {
            return Ok(String::new());
        }
        let address = self.locate("string", PointerBase::Template, stored, 1)?;
        self.visit(address, |d| d.io.read_cstring())
    }

    /// Read a `(count, pointer)` pair and locate `count` items of `size` bytes
    fn collection(
        &mut self,
        what: &'static str,
        size: u32,
        order: Endian,
    ) -> Result<Option<(u32, u32)>> {
        let count = self.io.read_u32(order)?;
        let stored = self.io.read_u32(order)?;
        if count == 0 {
            return Ok(None);
        }
        let span = u64::from(count) * u64::from(size);
        let address = self.locate(what, PointerBase::Template, stored, span)?;
        trace!("{} x{} at {:#x}", what, count, address);
        Ok(Some((count, address)))
    }
}

impl Walker for Decoder<'_> {
    fn policy(&self) -> VersionPolicy {
        self.policy
    }

    fn version(&self) -> FormatVersion {
        self.version
    }

    fn u8(&mut self, value: &mut u8) -> Result<()> {
        *value = self.io.read_u8()?;
        Ok(())
    }

    fn u32(&mut self, value: &mut u32, order: Endian) -> Result<()> {
        *value = self.io.read_u32(order)?;
        Ok(())
    }

    fn bytes(&mut self, value: &mut [u8]) -> Result<()> {
        self.io.read_exact(value)
    }

    fn string(&mut self, value: &mut String) -> Result<()> {
        let stored = self.io.read_u32(Endian::Big)?;
        *value = self.string_at(stored)?;
        Ok(())
    }

    fn string_slot(&mut self, _value: &str, _present: bool) -> Result<StringSlot> {
        Ok(StringSlot(self.io.read_u32(Endian::Big)?))
    }

    fn fill_string(&mut self, slot: StringSlot, present: bool, value: &mut String) -> Result<()> {
        *value = if present {
            self.string_at(slot.0)?
        } else {
            String::new()
        };
        Ok(())
    }

    fn list<T: Record>(
        &mut self,
        items: &mut Vec<T>,
        _region: Region,
        order: Endian,
    ) -> Result<()> {
        items.clear();
        let size = self.policy.record_size(T::KIND);
        let Some((count, address)) = self.collection(T::KIND.name(), size, order)? else {
            return Ok(());
        };
        items.reserve(count as usize);
        self.visit(address, |d| {
            for _ in 0..count {
                let mut item = T::default();
                d.record(&mut item)?;
                items.push(item);
            }
            Ok(())
        })
    }

    fn words(&mut self, values: &mut Vec<u32>, _region: Region) -> Result<()> {
        values.clear();
        let Some((count, address)) = self.collection("flags", 4, Endian::Big)? else {
            return Ok(());
        };
        self.visit(address, |d| {
            for _ in 0..count {
                values.push(d.io.read_u32(Endian::Big)?);
            }
            Ok(())
        })
    }

    fn floats(&mut self, values: &mut Vec<f32>, _region: Region, order: Endian) -> Result<()> {
        values.clear();
        let Some((count, address)) = self.collection("defaults", 4, Endian::Big)? else {
            return Ok(());
        };
        self.visit(address, |d| {
            for _ in 0..count {
                values.push(d.io.read_f32(order)?);
            }
            Ok(())
        })
    }

    fn record<T: Record>(&mut self, item: &mut T) -> Result<()> {
        let start = self.io.position();
        item.walk(self)?;

        let expected = self.policy.record_size(T::KIND);
        let actual = self.io.position() - start;
        if actual != expected {
            match self.options.size_check {
                SizeCheck::Strict => {
                    return Err(MatlError::SizeMismatch {
                        kind: T::KIND,
                        expected,
                        actual,
                    });
                }
                SizeCheck::Warn => {
                    warn!(
                        "{} at {:#x}: header size expected {} bytes, got {}",
                        T::KIND,
                        start,
                        expected,
                        actual
                    );
                    self.io.seek(start + expected)?;
                }
            }
        }

        if self.options.report_anomalies {
            item.inspect();
        }
        Ok(())
    }

    fn microcode(&mut self, len: u32, code: &mut Vec<u8>) -> Result<()> {
        let stored = self.io.read_u32(Endian::Big)?;
        code.clear();
        if len == 0 {
            return Ok(());
        }
        let address = self.locate("microcode", PointerBase::Microcode, stored, len.into())?;
        code.resize(len as usize, 0);
        self.visit(address, |d| d.io.read_exact(code))
    }

    fn ui_value(&mut self, kind: UiPropertyType, value: &mut UiValue) -> Result<()> {
        let stored = self.io.read_u32(Endian::Big)?;
        let span = if kind == UiPropertyType::Normal { 1 } else { 4 };
        let address = self.locate("property value", PointerBase::Template, stored, span)?;
        *value = self.visit(address, |d| {
            Ok(match kind {
                UiPropertyType::Float => UiValue::Float(d.io.read_f32(Endian::Big)?),
                UiPropertyType::Integer => UiValue::Integer(d.io.read_u32(Endian::Big)?),
                UiPropertyType::Reserved2 => UiValue::Reserved2(d.io.read_u32(Endian::Big)?),
                UiPropertyType::Reserved3 => UiValue::Reserved3(d.io.read_u32(Endian::Big)?),
                UiPropertyType::Normal => UiValue::Text(d.io.read_cstring()?),
            })
        })?;
        Ok(())
    }
}
