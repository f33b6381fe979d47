#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
//! Extract the VBA macro source code embedded in zip based Excel files (`.xlsm`, `.xlsb`)

pub mod consts;
pub mod decoder;
pub mod error;
pub mod extract;
pub mod ovba;
pub mod render;

pub use decoder::{DecodedModule, MacroDecoder, ModuleKind, OpenDecoder, OvbaOpener};
pub use error::ExtractError;
pub use extract::{extract_macros, Extraction, Extractor, MacroRecord};
