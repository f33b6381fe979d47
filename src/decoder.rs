//! Turning an extracted `vbaProject.bin` into module source code
//!
//! The extractor only talks to a decoder through [`OpenDecoder`] and [`MacroDecoder`], so it
//! neither knows nor cares how the binary format is read. [`OvbaOpener`] is the decoder used by
//! the command line tool: it walks the compound file with `cfb` and decodes the streams itself.
use crate::{
    consts,
    error::{DecodeError, DecodeResult},
    ovba::{
        algorithms::compression,
        records::{dir::DirStream, project::ProjectModules},
    },
};
use cfb::CompoundFile;
use std::{
    fs::File,
    io::{Read, Seek},
    path::{Component, Path, PathBuf},
};

pub use crate::ovba::records::project::ModuleKind;

/// One module as reported by a decoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedModule {
    /// The binary file the module was read from
    pub container_file: PathBuf,
    /// Path of the module's stream inside the compound file, e.g. `VBA/Module1`
    pub stream_path: String,
    pub module_name: String,
    pub source_text: String,
    pub kind: ModuleKind,
}

impl DecodedModule {
    /// Name the VBA editor would export this module as, e.g. `Module1.bas`
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.module_name, self.kind.extension())
    }
}

/// Something that can open a decoder on a `vbaProject.bin` file
pub trait OpenDecoder {
    type Decoder: MacroDecoder;

    /// # Errors
    /// Fails if the file cannot be read as a VBA project container
    fn open(&self, vba_project: &Path) -> DecodeResult<Self::Decoder>;
}

pub trait MacroDecoder {
    /// Whether the file holds a VBA project at all
    ///
    /// # Errors
    /// Fails if the decoder has been closed or the file cannot be read
    fn detect_macros(&mut self) -> DecodeResult<bool>;

    /// Every module in the project, in the order the project lists them
    ///
    /// # Errors
    /// Fails if the decoder has been closed or any part of the project is malformed
    fn extract_macros(&mut self) -> DecodeResult<Vec<DecodedModule>>;

    /// Release the underlying file. Safe to call more than once
    fn close(&mut self);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct OvbaOpener;

impl OpenDecoder for OvbaOpener {
    type Decoder = OvbaDecoder<File>;

    fn open(&self, vba_project: &Path) -> DecodeResult<Self::Decoder> {
        let file = File::open(vba_project).map_err(DecodeError::CfbOpen)?;
        OvbaDecoder::from_reader(vba_project, file)
    }
}

/// Reads VBA projects out of a compound file
pub struct OvbaDecoder<F> {
    path: PathBuf,
    cfb: Option<CompoundFile<F>>,
}

impl<F: Read + Seek> OvbaDecoder<F> {
    /// # Errors
    /// Fails if `reader` is not a compound file
    pub fn from_reader<P: AsRef<Path>>(path: P, reader: F) -> DecodeResult<Self> {
        let cfb = CompoundFile::open(reader).map_err(DecodeError::CfbOpen)?;
        Ok(Self {
            path: path.as_ref().to_path_buf(),
            cfb: Some(cfb),
        })
    }

    fn cfb(&mut self) -> DecodeResult<&mut CompoundFile<F>> {
        self.cfb.as_mut().ok_or(DecodeError::Closed)
    }

    /// Storages holding both a dir and a _VBA_PROJECT stream, in directory order
    fn project_storages(&mut self) -> DecodeResult<Vec<PathBuf>> {
        let cfb = self.cfb()?;
        let candidates: Vec<PathBuf> = cfb
            .walk()
            .filter(|e| e.is_stream() && e.name().eq_ignore_ascii_case(consts::DIR_STREAM))
            .filter_map(|e| e.path().parent().map(Path::to_path_buf))
            .collect();
        Ok(candidates
            .into_iter()
            .filter(|storage| cfb.is_stream(storage.join(consts::VBA_PROJECT_STREAM)))
            .collect())
    }

    fn extract_storage(&mut self, storage: &Path) -> DecodeResult<Vec<DecodedModule>> {
        let container_file = self.path.clone();
        let cfb = self.cfb()?;

        let dir = DirStream::from_compressed(&read_stream(cfb, &storage.join(consts::DIR_STREAM))?)?;
        let code_page = dir.code_page();
        log::debug!(
            "Project {} in {} uses code page {}",
            dir.project_name(),
            stream_name(storage),
            code_page.number()
        );

        let project = match storage.parent().map(|p| p.join(consts::PROJECT_STREAM)) {
            Some(p) if cfb.is_stream(&p) => {
                let project = ProjectModules::parse(&read_stream(cfb, &p)?, code_page);
                if project.is_empty() && !dir.modules().is_empty() {
                    log::warn!(
                        "PROJECT stream lists none of the {} modules, module kinds are taken from the dir stream",
                        dir.modules().len()
                    );
                } else {
                    log::debug!("PROJECT stream lists {} modules", project.len());
                }
                project
            }
            _ => {
                log::warn!(
                    "No PROJECT stream alongside {}, module kinds are taken from the dir stream",
                    stream_name(storage)
                );
                ProjectModules::default()
            }
        };

        let mut modules = Vec::with_capacity(dir.modules().len());
        for module in dir.modules() {
            let path = storage.join(&module.stream_name);
            let stream_path = stream_name(&path);
            let data = read_stream(cfb, &path)?;

            let offset = usize::try_from(module.text_offset).unwrap_or(usize::MAX);
            let Some(compressed) = data.get(offset..) else {
                return Err(DecodeError::TextOffset {
                    stream: stream_path,
                    offset: module.text_offset,
                    length: data.len(),
                });
            };
            let source = compression::decompress(compressed)
                .map_err(|e| DecodeError::Decompression(stream_path.clone(), e))?;

            if module.read_only || module.private {
                log::debug!(
                    "{stream_path} is{}{}",
                    if module.read_only { " read only" } else { "" },
                    if module.private { " private" } else { "" }
                );
            }

            let kind = project.kind_of(&module.name).unwrap_or_else(|| {
                if module.procedural {
                    ModuleKind::Standard
                } else {
                    ModuleKind::Class
                }
            });

            modules.push(DecodedModule {
                container_file: container_file.clone(),
                stream_path,
                module_name: module.name.clone(),
                source_text: code_page.decode(&source),
                kind,
            });
        }
        Ok(modules)
    }
}

impl<F: Read + Seek> MacroDecoder for OvbaDecoder<F> {
    fn detect_macros(&mut self) -> DecodeResult<bool> {
        Ok(!self.project_storages()?.is_empty())
    }

    fn extract_macros(&mut self) -> DecodeResult<Vec<DecodedModule>> {
        let mut modules = Vec::new();
        for storage in self.project_storages()? {
            modules.extend(self.extract_storage(&storage)?);
        }
        Ok(modules)
    }

    fn close(&mut self) {
        if self.cfb.take().is_some() {
            log::debug!("Closed {}", self.path.display());
        }
    }
}

fn read_stream<F: Read + Seek>(cfb: &mut CompoundFile<F>, path: &Path) -> DecodeResult<Vec<u8>> {
    let wrap = |e| DecodeError::Stream(stream_name(path), e);
    let mut stream = cfb.open_stream(path).map_err(wrap)?;
    // The length comes from the file's own directory entry, so let the reads size the buffer
    let mut buf = Vec::new();
    stream.read_to_end(&mut buf).map_err(wrap)?;
    Ok(buf)
}

/// Compound file paths are rooted, report them the way olevba and friends do: `VBA/Module1`
fn stream_name(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
