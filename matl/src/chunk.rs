//! Output regions and their write cursors

use std::fmt;

use crate::error::{MatlError, Result};

/// A named region of a MATL file, in file order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Region {
    Header,
    TemplateTable,
    Templates,
    Techniques,
    Passes,
    ShaderProperties,
    Defaults,
    RenderStates,
    UnknownChildren,
    /// UI properties, followed by technique flag words
    UiProperties,
    PropertyValues,
    Strings,
    /// Shader bytecode; the only growable region, always last
    Microcode,
}

impl Region {
    pub const COUNT: usize = 13;

    /// Every region in declaration (file) order
    pub const ALL: [Region; Self::COUNT] = [
        Region::Header,
        Region::TemplateTable,
        Region::Templates,
        Region::Techniques,
        Region::Passes,
        Region::ShaderProperties,
        Region::Defaults,
        Region::RenderStates,
        Region::UnknownChildren,
        Region::UiProperties,
        Region::PropertyValues,
        Region::Strings,
        Region::Microcode,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Region::Header => "Header",
            Region::TemplateTable => "TemplateTable",
            Region::Templates => "Templates",
            Region::Techniques => "Techniques",
            Region::Passes => "Passes",
            Region::ShaderProperties => "ShaderProperties",
            Region::Defaults => "Defaults",
            Region::RenderStates => "RenderStates",
            Region::UnknownChildren => "UnknownChildren",
            Region::UiProperties => "UiProperties",
            Region::PropertyValues => "PropertyValues",
            Region::Strings => "Strings",
            Region::Microcode => "Microcode",
        }
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A byte range of the output file with its own write cursor
///
/// The cursor always stays within `[base, base + size]`. Moving it past the
/// end fails unless the chunk is growable, in which case the chunk grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    region: Region,
    base: u32,
    size: u32,
    cursor: u32,
    growable: bool,
}

impl Chunk {
    pub fn new(region: Region, base: u32, size: u32) -> Self {
        Self {
            region,
            base,
            size,
            cursor: base,
            growable: false,
        }
    }

    pub fn growable(region: Region, base: u32) -> Self {
        Self {
            region,
            base,
            size: 0,
            cursor: base,
            growable: true,
        }
    }

    pub fn region(&self) -> Region {
        self.region
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// One past the last byte of the chunk
    pub fn end(&self) -> u32 {
        self.base + self.size
    }

    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub fn is_growable(&self) -> bool {
        self.growable
    }

    /// Bytes written so far, relative to the base
    pub fn written(&self) -> u32 {
        self.cursor - self.base
    }

    /// Move the cursor to an absolute address
    pub fn set_cursor(&mut self, address: u32) -> Result<()> {
        if address > self.end() {
            if !self.growable {
                return Err(MatlError::Bounds {
                    region: self.region,
                    needed: address - self.end(),
                });
            }
            self.size = address - self.base;
        }
        self.cursor = address.clamp(self.base, self.end());
        Ok(())
    }

    /// Advance the cursor by `len` bytes
    pub fn advance(&mut self, len: u32) -> Result<()> {
        self.set_cursor(self.cursor + len)
    }
}
