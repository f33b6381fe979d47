#![allow(clippy::doc_markdown)]
//! Module items from the PROJECT stream
//!
//! The PROJECT stream is a text stream of `Key=Value` lines. Only the ProjectItem lines are of
//! interest here, as they are the only place the kind of each module is recorded:
//!
//! ProjectModule   = ProjectDocModule / ProjectStdModule / ProjectClassModule / ProjectDesignerModule
//! ProjectDocModule      = "Document=" ModuleIdentifier %x2f DocTlibVer
//! ProjectStdModule      = "Module=" ModuleIdentifier
//! ProjectClassModule    = "Class=" ModuleIdentifier
//! ProjectDesignerModule = "BaseClass=" ModuleIdentifier
//!
//! Everything else (the project id, name, protection state, host extenders and window
//! positions) is skipped.
//!
//! Specification can be found [here](https://learn.microsoft.com/en-us/openspecs/office_file_formats/ms-ovba/d88cb9d8-a475-423d-b370-cc0caaf78628)

use crate::ovba::code_page::CodePage;
use std::fmt::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModuleKind {
    /// A standard module, e.g. `Module1`
    Standard,
    Class,
    /// A user form
    Designer,
    /// `ThisWorkbook` and the sheet modules
    Document,
}

impl ModuleKind {
    /// File extension the VBA editor uses when exporting this kind of module
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Standard => "bas",
            Self::Class | Self::Document => "cls",
            Self::Designer => "frm",
        }
    }
}

impl Display for ModuleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard => write!(f, "standard module"),
            Self::Class => write!(f, "class module"),
            Self::Designer => write!(f, "user form"),
            Self::Document => write!(f, "document module"),
        }
    }
}

#[derive(Debug, Default)]
pub struct ProjectModules {
    items: Vec<(String, ModuleKind)>,
}

impl ProjectModules {
    /// Read the module items out of the raw PROJECT stream
    ///
    /// Lines that are not module items are skipped, and reading stops at the first `[Section]`
    /// header, so this never fails. Module names are decoded with the project code page.
    pub fn parse(stream: &[u8], code_page: CodePage) -> Self {
        let items = stream
            .split(|&b| b == b'\n')
            .map(|line| line.strip_suffix(b"\r").unwrap_or(line))
            .take_while(|line| !line.starts_with(b"["))
            .filter_map(|line| nom_parse::item(line).ok())
            .map(|(_, (kind, name))| (code_page.decode(name), kind))
            .collect();
        Self { items }
    }

    /// VBA identifiers are case insensitive, so the lookup is too
    pub fn kind_of(&self, module: &str) -> Option<ModuleKind> {
        self.items
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(module))
            .map(|&(_, kind)| kind)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

mod nom_parse {
    use super::ModuleKind;
    use nom::{
        branch::alt,
        bytes::complete::{tag, take_till1},
        combinator::{map, rest, verify},
        sequence::{preceded, terminated},
        IResult,
    };

    pub(super) fn item(input: &[u8]) -> IResult<&[u8], (ModuleKind, &[u8])> {
        alt((document_module, std_module, class_module, designer_module))(input)
    }

    fn document_module(input: &[u8]) -> IResult<&[u8], (ModuleKind, &[u8])> {
        map(
            preceded(
                tag("Document="),
                terminated(take_till1(|c| c == 0x2f), tag([0x2f])),
            ),
            |name| (ModuleKind::Document, name),
        )(input)
    }

    fn std_module(input: &[u8]) -> IResult<&[u8], (ModuleKind, &[u8])> {
        map(preceded(tag("Module="), identifier), |name| {
            (ModuleKind::Standard, name)
        })(input)
    }

    fn class_module(input: &[u8]) -> IResult<&[u8], (ModuleKind, &[u8])> {
        map(preceded(tag("Class="), identifier), |name| {
            (ModuleKind::Class, name)
        })(input)
    }

    fn designer_module(input: &[u8]) -> IResult<&[u8], (ModuleKind, &[u8])> {
        map(preceded(tag("BaseClass="), identifier), |name| {
            (ModuleKind::Designer, name)
        })(input)
    }

    fn identifier(input: &[u8]) -> IResult<&[u8], &[u8]> {
        verify(rest, |s: &[u8]| !s.is_empty())(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROJECT: &[u8] = b"ID=\"{5DD90D76-4904-47A2-AF0D-D69B4673604E}\"\r\n\
Document=ThisWorkbook/&H00000000\r\n\
Document=Sheet1/&H00000000\r\n\
Package={AC9F2F90-E877-11CE-9F68-00AA00574A4F}\r\n\
BaseClass=UserForm1\r\n\
Module=Module1\r\n\
Class=Class1\r\n\
Name=\"VBAProject\"\r\n\
HelpContextID=\"0\"\r\n\
VersionCompatible32=\"393222000\"\r\n\
CMG=\"C9CBB1A2B5A2B5A2B5A2B5\"\r\n\
DPB=\"8B8935B4A8B5A8B5A8\"\r\n\
GC=\"0002AC43AD43AD3C\"\r\n\
\r\n\
[Host Extender Info]\r\n\
&H00000001={3832D640-CF90-11CF-8E43-00A0C911005A};VBE;&H00000000\r\n\
\r\n\
[Workspace]\r\n\
ThisWorkbook=0, 0, 0, 0, C\r\n\
Module1=26, 26, 1062, 609, Z\r\n";

    #[test]
    fn all_module_kinds() {
        let p = ProjectModules::parse(PROJECT, CodePage::default());
        assert_eq!(p.len(), 5);
        assert_eq!(p.kind_of("ThisWorkbook"), Some(ModuleKind::Document));
        assert_eq!(p.kind_of("Sheet1"), Some(ModuleKind::Document));
        assert_eq!(p.kind_of("UserForm1"), Some(ModuleKind::Designer));
        assert_eq!(p.kind_of("Module1"), Some(ModuleKind::Standard));
        assert_eq!(p.kind_of("Class1"), Some(ModuleKind::Class));
    }

    #[test]
    fn case_insensitive_lookup() {
        let p = ProjectModules::parse(PROJECT, CodePage::default());
        assert_eq!(p.kind_of("MODULE1"), Some(ModuleKind::Standard));
        assert_eq!(p.kind_of("Module2"), None);
    }

    #[test]
    fn workspace_is_ignored() {
        let p = ProjectModules::parse(b"[Workspace]\r\nModule=Module1\r\n", CodePage::default());
        assert!(p.is_empty());
    }

    #[test]
    fn bare_newlines_and_mbcs() {
        let p = ProjectModules::parse(b"Module=Modul\xe9\nClass=\n", CodePage::new(1252));
        assert_eq!(p.len(), 1);
        assert_eq!(p.kind_of("Modulé"), Some(ModuleKind::Standard));
    }

    #[test]
    fn extensions() {
        assert_eq!(ModuleKind::Standard.extension(), "bas");
        assert_eq!(ModuleKind::Class.extension(), "cls");
        assert_eq!(ModuleKind::Document.extension(), "cls");
        assert_eq!(ModuleKind::Designer.extension(), "frm");
    }
}
