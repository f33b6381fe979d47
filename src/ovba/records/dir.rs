#![allow(clippy::doc_markdown)]
//! The dir stream, which lists the modules of a VBA project and where to find their source
//!
//! Once decompressed the stream is a flat run of records, each of which is
//!
//! Record = Id (2 bytes, LE)
//!          Size (4 bytes, LE)
//!          Data (Size bytes)
//!
//! The one exception is PROJECTVERSION (0x0009), which declares a Size of 4 but carries 6 bytes
//! of data. Records are read generically and then interpreted in order, which means unknown or
//! optional records (references, doc strings, help contexts and the like) are stepped over
//! without needing to understand them.
//!
//! Specification is section 2.3.4.2 of MS-OVBA

use crate::{
    error,
    ovba::{
        algorithms::compression,
        code_page::{decode_utf16, CodePage},
    },
};
use nom::Finish;

mod ids {
    pub const PROJECT_CODE_PAGE: u16 = 0x0003;
    pub const PROJECT_NAME: u16 = 0x0004;
    pub const PROJECT_VERSION: u16 = 0x0009;
    pub const PROJECT_MODULES: u16 = 0x000f;
    pub const TERMINATOR: u16 = 0x0010;
    pub const MODULE_NAME: u16 = 0x0019;
    pub const MODULE_STREAM_NAME: u16 = 0x001a;
    pub const MODULE_TYPE_PROCEDURAL: u16 = 0x0021;
    pub const MODULE_TYPE_OTHER: u16 = 0x0022;
    pub const MODULE_READ_ONLY: u16 = 0x0025;
    pub const MODULE_PRIVATE: u16 = 0x0028;
    pub const MODULE_TERMINATOR: u16 = 0x002b;
    pub const MODULE_OFFSET: u16 = 0x0031;
    pub const MODULE_STREAM_NAME_UNICODE: u16 = 0x0032;
    pub const MODULE_NAME_UNICODE: u16 = 0x0047;
}

#[derive(Debug)]
pub struct DirStream {
    code_page: CodePage,
    project_name: String,
    modules: Vec<Module>,
}

/// One entry of the PROJECTMODULES list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    pub name: String,
    pub stream_name: String,
    pub text_offset: u32,
    pub procedural: bool,
    pub read_only: bool,
    pub private: bool,
}

#[derive(Debug, Clone, Copy)]
struct Record<'a> {
    id: u16,
    data: &'a [u8],
}

#[derive(Default)]
struct PartialModule<'a> {
    name: &'a [u8],
    name_unicode: Option<&'a [u8]>,
    stream_name: Option<&'a [u8]>,
    stream_name_unicode: Option<&'a [u8]>,
    text_offset: Option<u32>,
    procedural: bool,
    read_only: bool,
    private: bool,
}

impl<'a> PartialModule<'a> {
    fn apply(&mut self, record: Record<'a>, offset: usize) -> Result<(), error::DirStream> {
        match record.id {
            ids::MODULE_NAME_UNICODE => self.name_unicode = Some(record.data),
            ids::MODULE_STREAM_NAME => self.stream_name = Some(record.data),
            ids::MODULE_STREAM_NAME_UNICODE => self.stream_name_unicode = Some(record.data),
            ids::MODULE_OFFSET => {
                self.text_offset = Some(
                    nom_parse::u32_value(record.data)
                        .ok_or(error::DirStream::Truncated(offset))?,
                );
            }
            ids::MODULE_TYPE_PROCEDURAL => self.procedural = true,
            ids::MODULE_TYPE_OTHER => self.procedural = false,
            ids::MODULE_READ_ONLY => self.read_only = true,
            ids::MODULE_PRIVATE => self.private = true,
            _ => (),
        }
        Ok(())
    }

    fn finish(self, code_page: CodePage) -> Result<Module, error::DirStream> {
        let name = self
            .name_unicode
            .map_or_else(|| code_page.decode(self.name), decode_utf16);
        let stream_name = match (self.stream_name_unicode, self.stream_name) {
            (Some(unicode), _) => decode_utf16(unicode),
            (None, Some(mbcs)) => code_page.decode(mbcs),
            (None, None) => return Err(error::DirStream::IncompleteModule(name)),
        };
        let Some(text_offset) = self.text_offset else {
            return Err(error::DirStream::IncompleteModule(name));
        };
        Ok(Module {
            name,
            stream_name,
            text_offset,
            procedural: self.procedural,
            read_only: self.read_only,
            private: self.private,
        })
    }
}

impl DirStream {
    /// Decompress and then parse the raw bytes of the dir stream
    ///
    /// # Error
    /// Fails if the stream will not decompress, see [`DirStream::parse`] for the rest
    pub fn from_compressed(compressed: &[u8]) -> Result<Self, error::DirStream> {
        let data = compression::decompress(compressed)?;
        Self::parse(&data)
    }

    /// Parse an already decompressed dir stream
    ///
    /// # Error
    /// Will generate an error if:
    /// - a record claims more data than is left in the stream
    /// - a module record turns up before the PROJECTCODEPAGE record
    /// - a module has no stream name or no text offset
    pub fn parse(data: &[u8]) -> Result<Self, error::DirStream> {
        let mut code_page: Option<CodePage> = None;
        let mut project_name: &[u8] = &[];
        let mut declared_modules = None;
        let mut modules = Vec::new();
        let mut current: Option<PartialModule> = None;

        let mut input = data;
        while !input.is_empty() {
            let offset = data.len() - input.len();
            let (rest, record) = nom_parse::record(input)
                .finish()
                .map_err(|_| error::DirStream::Truncated(offset))?;
            input = rest;

            match record.id {
                ids::TERMINATOR => break,
                ids::PROJECT_CODE_PAGE => {
                    let number = nom_parse::u16_value(record.data)
                        .ok_or(error::DirStream::Truncated(offset))?;
                    code_page = Some(CodePage::new(number));
                }
                ids::PROJECT_NAME => project_name = record.data,
                ids::PROJECT_MODULES => declared_modules = nom_parse::u16_value(record.data),
                ids::MODULE_NAME => {
                    let code_page = code_page.ok_or(error::DirStream::MissingCodePage)?;
                    // A module that never saw its terminator is still usable
                    if let Some(m) = current.take() {
                        modules.push(m.finish(code_page)?);
                    }
                    current = Some(PartialModule {
                        name: record.data,
                        ..PartialModule::default()
                    });
                }
                ids::MODULE_TERMINATOR => {
                    if let (Some(m), Some(cp)) = (current.take(), code_page) {
                        modules.push(m.finish(cp)?);
                    }
                }
                _ => {
                    if let Some(m) = current.as_mut() {
                        m.apply(record, offset)?;
                    }
                }
            }
        }

        let code_page = code_page.unwrap_or_default();
        if let Some(m) = current.take() {
            modules.push(m.finish(code_page)?);
        }
        match declared_modules {
            Some(n) if usize::from(n) != modules.len() => log::warn!(
                "dir stream declares {n} modules but {} were found",
                modules.len()
            ),
            _ => (),
        }

        Ok(Self {
            code_page,
            project_name: code_page.decode(project_name),
            modules,
        })
    }

    pub const fn code_page(&self) -> CodePage {
        self.code_page
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }
}

mod nom_parse {
    use super::{ids, Record};
    use nom::{
        branch::alt,
        bytes::complete::{tag, take},
        combinator::{flat_map, map},
        number::complete::{le_u16, le_u32},
        sequence::{pair, preceded},
        IResult,
    };

    pub(super) fn record(input: &[u8]) -> IResult<&[u8], Record<'_>> {
        alt((version, sized))(input)
    }

    // The Size field of PROJECTVERSION is reserved and does not count the 6 bytes that follow
    fn version(input: &[u8]) -> IResult<&[u8], Record<'_>> {
        map(
            preceded(pair(tag(ids::PROJECT_VERSION.to_le_bytes()), le_u32), take(6_usize)),
            |data| Record {
                id: ids::PROJECT_VERSION,
                data,
            },
        )(input)
    }

    // Size is bounded by what is left, a record that overruns the stream is an error not a wait
    fn sized(input: &[u8]) -> IResult<&[u8], Record<'_>> {
        map(pair(le_u16, flat_map(le_u32, take)), |(id, data)| Record {
            id,
            data,
        })(input)
    }

    pub(super) fn u16_value(data: &[u8]) -> Option<u16> {
        le_u16::<_, nom::error::Error<_>>(data).ok().map(|(_, v)| v)
    }

    pub(super) fn u32_value(data: &[u8]) -> Option<u32> {
        le_u32::<_, nom::error::Error<_>>(data).ok().map(|(_, v)| v)
    }
}
