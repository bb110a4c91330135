//! Reading and writing MATL files

mod read;
mod write;


use std::path::Path;

use crate::error::Result;
use crate::model::Library;
use crate::options::CodecOptions;

pub use read::{decode, decode_with};
pub use write::{encode, encode_with};

/// Read a library from a file with default options
pub fn read(path: impl AsRef<Path>) -> Result<Library> {
    read_with(path, &CodecOptions::default())
}

pub fn read_with(path: impl AsRef<Path>, options: &CodecOptions) -> Result<Library> {
    let data = std::fs::read(path.as_ref())?;
    tracing::debug!("Reading {} ({} bytes)", path.as_ref().display(), data.len());
    decode_with(&data, options)
}

/// Write a library to a file with default options
pub fn write(library: &Library, path: impl AsRef<Path>) -> Result<()> {
    write_with(library, path, &CodecOptions::default())
}

/// Write a library to a file
///
/// The file is only created once encoding has succeeded.
pub fn write_with(library: &Library, path: impl AsRef<Path>, options: &CodecOptions) -> Result<()> {
    let bytes = encode_with(library, options)?;
    std::fs::write(path.as_ref(), &bytes)?;
    tracing::debug!("Wrote {} ({} bytes)", path.as_ref().display(), bytes.len());
    Ok(())
}
