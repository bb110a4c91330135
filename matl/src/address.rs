//! Relative pointer resolution
//!
//! Stored pointers are offsets from one of two agreed bases: the start of the
//! template region (almost everything) or the start of the microcode region
//! (shader bytecode). Template-relative offsets are signed.

/// Which base a stored offset is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerBase {
    Template,
    Microcode,
}

/// Stored offset used for empty strings; never dereferenced
pub const NULL_OFFSET: u32 = u32::MAX;

/// Absolute addresses of the two pointer bases of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddressSpace {
    pub template: u32,
    pub microcode: u32,
}

impl AddressSpace {
    pub fn new(template: u32, microcode: u32) -> Self {
        Self {
            template,
            microcode,
        }
    }

    pub fn base(&self, base: PointerBase) -> u32 {
        match base {
            PointerBase::Template => self.template,
            PointerBase::Microcode => self.microcode,
        }
    }

    /// Absolute address of a stored offset; may be negative or past the
    /// end of the file, so callers bounds-check before dereferencing
    pub fn resolve(&self, base: PointerBase, stored: u32) -> i64 {
        let offset = match base {
            PointerBase::Template => i64::from(stored as i32),
            PointerBase::Microcode => i64::from(stored),
        };
        i64::from(self.base(base)) + offset
    }

    /// Stored offset for an object placed at `address`
    pub fn relativize(&self, base: PointerBase, address: u32) -> u32 {
        address.wrapping_sub(self.base(base))
    }
}
