#![allow(dead_code)]
//! Build Excel files with VBA projects in them, so the tests don't depend on binary fixtures

use cfb::CompoundFile;
use extract_vba::{ovba::algorithms::compression::compress, ModuleKind};
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::{write::FileOptions, ZipWriter};

// Stand in for the p-code that sits in front of the source text in a real module stream
const PERFORMANCE_CACHE: [u8; 12] = [0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 0, 0x01, 0x02, 0x03, 0x04];

pub struct Module<'a> {
    pub name: &'a str,
    pub kind: ModuleKind,
    pub source: &'a str,
}

impl<'a> Module<'a> {
    pub const fn new(name: &'a str, kind: ModuleKind, source: &'a str) -> Self {
        Self { name, kind, source }
    }
}

fn record(id: u16, data: &[u8]) -> Vec<u8> {
    let mut out = id.to_le_bytes().to_vec();
    out.extend_from_slice(&u32::try_from(data.len()).unwrap().to_le_bytes());
    out.extend_from_slice(data);
    out
}

fn utf16(s: &str) -> Vec<u8> {
    s.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

/// An uncompressed dir stream listing `modules`
pub fn dir_stream(modules: &[Module]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend(record(0x0001, &1_u32.to_le_bytes()));
    out.extend(record(0x0002, &0x0409_u32.to_le_bytes()));
    out.extend(record(0x0014, &0x0409_u32.to_le_bytes()));
    out.extend(record(0x0003, &1252_u16.to_le_bytes()));
    out.extend(record(0x0004, b"VBAProject"));
    out.extend(record(0x0005, b""));
    out.extend(record(0x0040, b""));
    out.extend(record(0x0006, b""));
    out.extend(record(0x003d, b""));
    out.extend(record(0x0007, &0_u32.to_le_bytes()));
    out.extend(record(0x0008, &0_u32.to_le_bytes()));
    out.extend([0x09, 0x00, 0x04, 0x00, 0x00, 0x00, 0x5e, 0x1a, 0x00, 0x00, 0x02, 0x00]);
    out.extend(record(0x000c, b""));
    out.extend(record(0x003c, b""));
    out.extend(record(
        0x000f,
        &u16::try_from(modules.len()).unwrap().to_le_bytes(),
    ));
    out.extend(record(0x0013, &0xffff_u16.to_le_bytes()));
    for m in modules {
        out.extend(record(0x0019, m.name.as_bytes()));
        out.extend(record(0x0047, &utf16(m.name)));
        out.extend(record(0x001a, m.name.as_bytes()));
        out.extend(record(0x0032, &utf16(m.name)));
        out.extend(record(0x001c, b""));
        out.extend(record(0x0048, b""));
        let offset = u32::try_from(PERFORMANCE_CACHE.len()).unwrap();
        out.extend(record(0x0031, &offset.to_le_bytes()));
        out.extend(record(0x001e, &0_u32.to_le_bytes()));
        out.extend(record(0x002c, &0xffff_u16.to_le_bytes()));
        let module_type = if m.kind == ModuleKind::Standard {
            0x0021
        } else {
            0x0022
        };
        out.extend(record(module_type, b""));
        out.extend(record(0x002b, b""));
    }
    out.extend(record(0x0010, b""));
    out
}

pub fn project_stream(modules: &[Module]) -> Vec<u8> {
    let mut text = String::from("ID=\"{5DD90D76-4904-47A2-AF0D-D69B4673604E}\"\r\n");
    for m in modules {
        let line = match m.kind {
            ModuleKind::Document => format!("Document={}/&H00000000", m.name),
            ModuleKind::Standard => format!("Module={}", m.name),
            ModuleKind::Class => format!("Class={}", m.name),
            ModuleKind::Designer => format!("BaseClass={}", m.name),
        };
        text.push_str(&line);
        text.push_str("\r\n");
    }
    text.push_str("Name=\"VBAProject\"\r\nHelpContextID=\"0\"\r\n\r\n[Host Extender Info]\r\n");
    text.into_bytes()
}

fn add_stream<F: std::io::Read + Write + std::io::Seek>(
    comp: &mut CompoundFile<F>,
    path: &str,
    data: &[u8],
) {
    let mut stream = comp.create_stream(path).unwrap();
    stream.write_all(data).unwrap();
    stream.flush().unwrap();
}

/// A vbaProject.bin compound file holding `modules`
pub fn vba_project(modules: &[Module]) -> Vec<u8> {
    vba_project_with(modules, &compress(dir_stream(modules)), module_stream)
}

/// The bytes a well formed module stream holds: p-code, then the compressed source
pub fn module_stream(m: &Module) -> Vec<u8> {
    let mut data = PERFORMANCE_CACHE.to_vec();
    data.extend(compress(m.source));
    data
}

/// A vbaProject.bin with the given raw dir stream, and each module stream built by `module`
pub fn vba_project_with(
    modules: &[Module],
    dir: &[u8],
    module: impl Fn(&Module) -> Vec<u8>,
) -> Vec<u8> {
    let mut comp = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    add_stream(&mut comp, "/PROJECT", &project_stream(modules));
    comp.create_storage("/VBA").unwrap();
    add_stream(&mut comp, "/VBA/_VBA_PROJECT", &[0xcc, 0x61, 0xff, 0xff, 0x00, 0x00, 0x00]);
    add_stream(&mut comp, "/VBA/dir", dir);
    for m in modules {
        add_stream(&mut comp, &format!("/VBA/{}", m.name), &module(m));
    }
    comp.flush().unwrap();
    comp.into_inner().into_inner()
}

/// Overwrite the size held in the directory entry of the stream called `name`
///
/// Directory entries are 128 bytes on 128 byte boundaries: the UTF-16 name first, its byte
/// length (terminator included) at 64 and the stream size at 120.
pub fn set_stream_size(vba: &mut [u8], name: &str, size: u64) {
    let mut wanted = name.encode_utf16().flat_map(u16::to_le_bytes).collect::<Vec<u8>>();
    wanted.extend([0, 0]);
    let name_len = u16::try_from(wanted.len()).unwrap().to_le_bytes();
    let entry = vba
        .chunks_exact_mut(128)
        .skip(4)
        .find(|e| e.starts_with(&wanted) && e[64..66] == name_len)
        .unwrap();
    entry[120..128].copy_from_slice(&size.to_le_bytes());
}

/// A compound file with no VBA storage in it
pub fn empty_compound_file() -> Vec<u8> {
    let mut comp = CompoundFile::create(Cursor::new(Vec::new())).unwrap();
    add_stream(&mut comp, "/SummaryInformation", b"nothing to see here");
    comp.flush().unwrap();
    comp.into_inner().into_inner()
}

/// A minimal workbook archive, with `vba` stored as xl/vbaProject.bin if given
pub fn xlsm(vba: Option<&[u8]>) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default();
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types/>"#)
        .unwrap();
    zip.start_file("xl/workbook.xml", options).unwrap();
    zip.write_all(br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook/>"#)
        .unwrap();
    if let Some(vba) = vba {
        zip.start_file("xl/vbaProject.bin", options).unwrap();
        zip.write_all(vba).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).unwrap();
    path
}

/// The scenario from the docs: one standard module with a two line sub
pub fn with_macro(dir: &Path) -> PathBuf {
    let vba = vba_project(&[Module::new(
        "Module1",
        ModuleKind::Standard,
        "Sub Test()\nEnd Sub",
    )]);
    write_file(dir, "with_macro.xlsm", &xlsm(Some(&vba)))
}

pub fn no_macros(dir: &Path) -> PathBuf {
    write_file(dir, "no_macros.xlsm", &xlsm(None))
}

pub fn not_a_zip(dir: &Path) -> PathBuf {
    write_file(
        dir,
        "not_a_zip.xlsm",
        b"This is plain text pretending to be a spreadsheet\n",
    )
}

pub fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir).unwrap().next().is_none()
}
