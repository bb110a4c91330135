//! Multi-region output stream
//!
//! The encoder writes into several regions at once: a technique header goes
//! to one region while its passes go to another and its name to a third.
//! [`RegionWriter`] keeps one buffer and cursor per region plus a stack of
//! active regions; every write goes to the top of the stack. Re-entering a
//! region resumes at that region's own cursor.

use crate::address::PointerBase;
use crate::chunk::Region;
use crate::error::{MatlError, Result};
use crate::io::{Endian, f32_bytes, u32_bytes};
use crate::layout::RegionTable;

/// Which end of a region a patch refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Anchor {
    Start,
    End,
}

/// Where a patched value is measured from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Origin {
    /// The template base, like every other stored pointer
    Templates,
    /// The address of the patched word itself
    Field,
}

/// A big-endian pointer word filled in once every region is final
#[derive(Debug, Clone, Copy)]
struct Patch {
    region: Region,
    offset: u32,
    target: Region,
    anchor: Anchor,
    origin: Origin,
}

pub(crate) struct RegionWriter {
    table: RegionTable,
    buffers: Vec<Vec<u8>>,
    active: Vec<Region>,
    patches: Vec<Patch>,
}

impl RegionWriter {
    pub fn new(table: RegionTable) -> Self {
        let buffers = table
            .chunks()
            .iter()
            .map(|chunk| vec![0u8; chunk.size() as usize])
            .collect();
        Self {
            table,
            buffers,
            active: Vec::new(),
            patches: Vec::new(),
        }
    }

    pub fn table(&self) -> &RegionTable {
        &self.table
    }

    pub fn enter(&mut self, region: Region) {
        self.active.push(region);
    }

    /// Return to the previously active region
    pub fn leave(&mut self) {
        if self.active.pop().is_none() {
            tracing::warn!("leave() called with no active region");
        }
    }

    pub fn active(&self) -> Result<Region> {
        self.active.last().copied().ok_or(MatlError::NoActiveRegion)
    }

    /// Absolute write position of `region`
    pub fn cursor(&self, region: Region) -> u32 {
        self.table.chunk(region).cursor()
    }

    /// Absolute write position of the active region
    pub fn position(&self) -> Result<u32> {
        Ok(self.cursor(self.active()?))
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        let region = self.active()?;
        let chunk = self.table.chunk_mut(region);
        let start = chunk.written() as usize;
        chunk.advance(bytes.len() as u32)?;

        let end = start + bytes.len();
        let buffer = &mut self.buffers[region.index()];
        if buffer.len() < end {
            buffer.resize(end, 0);
        }
        buffer[start..end].copy_from_slice(bytes);
        Ok(())
    }

    pub fn write_u32(&mut self, value: u32, order: Endian) -> Result<()> {
        self.write_bytes(&u32_bytes(value, order))
    }

    pub fn write_f32(&mut self, value: f32, order: Endian) -> Result<()> {
        self.write_bytes(&f32_bytes(value, order))
    }

    /// Reserve a pointer word to `target`, resolved by [`finish`](Self::finish)
    pub fn patch(&mut self, target: Region, anchor: Anchor, origin: Origin) -> Result<()> {
        let region = self.active()?;
        let offset = self.table.chunk(region).written();
        self.patches.push(Patch {
            region,
            offset,
            target,
            anchor,
            origin,
        });
        self.write_u32(0, Endian::Big)
    }

    /// Check every fixed region is full, then assemble the file
    pub fn finish(self) -> Result<Vec<u8>> {
        if !self.active.is_empty() {
            tracing::warn!(
                "finishing with {} region(s) still active",
                self.active.len()
            );
        }

        for chunk in self.table.chunks() {
            if !chunk.is_growable() && chunk.written() != chunk.size() {
                return Err(MatlError::LayoutMismatch {
                    region: chunk.region(),
                    planned: chunk.size(),
                    written: chunk.written(),
                });
            }
        }

        let total = self.table.chunk(Region::Microcode).end() as usize;
        let mut out = Vec::with_capacity(total);
        for (chunk, buffer) in self.table.chunks().iter().zip(&self.buffers) {
            out.extend_from_slice(&buffer[..chunk.written() as usize]);
        }

        let space = self.table.address_space();
        for patch in &self.patches {
            let target = self.table.chunk(patch.target);
            let address = match patch.anchor {
                Anchor::Start => target.base(),
                Anchor::End => target.end(),
            };
            let at = self.table.chunk(patch.region).base() + patch.offset;
            let value = match patch.origin {
                Origin::Templates => space.relativize(PointerBase::Template, address),
                Origin::Field => address.wrapping_sub(at),
            };
            let at = at as usize;
            out[at..at + 4].copy_from_slice(&u32_bytes(value, Endian::Big));
        }

        tracing::debug!(
            "Assembled {} bytes ({} microcode)",
            out.len(),
            self.table.chunk(Region::Microcode).size()
        );
        Ok(out)
    }
}
