//! MATL: reader and writer for binary material library files
//!
//! A material library is a tree of templates, each holding techniques, each
//! holding passes with shader properties, UI properties, render states and
//! embedded shader microcode. The file is pointer-based: every collection is
//! stored as a `(count, offset)` pair and entity headers of each kind are
//! packed together in their own region, so reading means chasing offsets and
//! writing means planning every region up front.
//!
//! # File Layout
//!
//! ```text
//! Header | TemplateTable | Templates | Techniques | Passes | ShaderProperties
//!        | Defaults | RenderStates | UnknownChildren | UiProperties (+ flags)
//!        | PropertyValues | Strings | Microcode
//! ```
//!
//! - Everything is big-endian except pass global-property count/pointer and
//!   shader-property default values, which are little-endian
//! - Pointers are signed offsets from the start of the template region;
//!   shader microcode pointers are unsigned offsets from the microcode region
//! - An empty string is stored as the pointer `0xFFFFFFFF`
//! - Header sizes depend on the format version (see [`VersionPolicy`])
//!
//! # Usage
//!
//! ```ignore
//! use matl::{read, write, UiProperty, UiValue};
//!
//! let mut library = read("materials.matl")?;
//! for template in &library.templates {
//!     println!("{}: {} technique(s)", template.name, template.techniques.len());
//! }
//!
//! library.templates[0]
//!     .ui_properties
//!     .push(UiProperty::new("Gloss", 0x1234, UiValue::Float(0.5)));
//! write(&library, "materials.out.matl")?;
//! ```

mod address;
mod chunk;
mod codec;
mod error;
mod io;
mod layout;
mod model;
mod mux;
mod options;
mod schema;
mod version;

pub use address::{AddressSpace, NULL_OFFSET, PointerBase};
pub use chunk::{Chunk, Region};
pub use codec::{decode, decode_with, encode, encode_with, read, read_with, write, write_with};
pub use error::{MatlError, Result};
pub use io::Endian;
pub use layout::{EntityCounts, RegionTable, plan};
pub use model::{
    Descriptor, Library, Opaque, Pass, RenderState, ShaderProperty, ShaderPropertyType, SubObject,
    Technique, Template, UiProperty, UiPropertyType, UiValue, UnknownChild,
};
pub use options::{CodecOptions, SizeCheck};
pub use schema::EntityKind;
pub use version::{FormatVersion, VersionPolicy};

/// File magic
pub const MATL_MAGIC: [u8; 4] = *b"MATL";
