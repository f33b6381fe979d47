//! Readers for the pieces of an MS-OVBA VBA project
pub mod algorithms;
pub mod code_page;
pub mod records;
