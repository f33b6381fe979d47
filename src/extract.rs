//! Pull the VBA macros out of a zip based Excel file
//!
//! The whole job is a straight line with early exits:
//! 1. check the file exists
//! 2. open it as a zip archive
//! 3. look for `xl/vbaProject.bin`
//! 4. unpack that entry into a temporary directory owned by this call
//! 5. hand it to a decoder and collect the modules it reports
//!
//! Whichever way it ends, the caller gets an [`Extraction`] back rather than an error. Anything
//! that stopped the macros being read is recorded as its condition.
use crate::{
    consts,
    decoder::{DecodedModule, MacroDecoder, ModuleKind, OpenDecoder, OvbaOpener},
    error::{ExtractError, ExtractResult},
};
use std::{
    fs::File,
    io::{self, Read, Seek},
    ops::{Deref, DerefMut},
    path::{Path, PathBuf},
};
use tempfile::TempDir;
use zip::{result::ZipError, ZipArchive};

/// A single macro module found in the file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroRecord {
    stream_path: String,
    module_stream: String,
    module_name: String,
    source_text: String,
    kind: ModuleKind,
}

impl MacroRecord {
    fn from_decoded(entry: &str, module: DecodedModule) -> Self {
        log::debug!(
            "{} read from {} in {}",
            module.module_name,
            module.stream_path,
            module.container_file.display()
        );
        Self {
            stream_path: entry.to_owned(),
            module_stream: module.stream_path,
            module_name: module.module_name,
            source_text: module.source_text,
            kind: module.kind,
        }
    }

    /// The archive entry the macro was found in, `xl/vbaProject.bin`
    pub fn stream_path(&self) -> &str {
        &self.stream_path
    }

    /// The stream inside `vbaProject.bin` holding the module, e.g. `VBA/Module1`
    pub fn module_stream(&self) -> &str {
        &self.module_stream
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub const fn kind(&self) -> ModuleKind {
        self.kind
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.module_name, self.kind.extension())
    }
}

/// Outcome of one extraction: the macros found plus, if it stopped early, why
#[derive(Debug)]
pub struct Extraction {
    macros: Vec<MacroRecord>,
    condition: Option<ExtractError>,
}

impl Extraction {
    pub fn macros(&self) -> &[MacroRecord] {
        &self.macros
    }

    pub fn into_macros(self) -> Vec<MacroRecord> {
        self.macros
    }

    pub const fn condition(&self) -> Option<&ExtractError> {
        self.condition.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.macros.is_empty()
    }

    /// True unless the file could not be read at all
    pub fn is_ok(&self) -> bool {
        self.condition.as_ref().map_or(true, ExtractError::is_informational)
    }
}

/// Extract the macros from `file` using the built in decoder
pub fn extract_macros(file: &Path) -> Extraction {
    Extractor::new().extract(file)
}

pub struct Extractor<O = OvbaOpener> {
    opener: O,
    temp_root: Option<PathBuf>,
}

impl Extractor {
    pub const fn new() -> Self {
        Self {
            opener: OvbaOpener,
            temp_root: None,
        }
    }
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: OpenDecoder> Extractor<O> {
    pub const fn with_decoder(opener: O) -> Self {
        Self {
            opener,
            temp_root: None,
        }
    }

    /// Create the scratch directory under `dir` rather than the system temp directory
    #[must_use]
    pub fn temp_root<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.temp_root = Some(dir.into());
        self
    }

    pub fn extract(&self, file: &Path) -> Extraction {
        match self.run(file) {
            Ok(macros) => {
                log::debug!("Extracted {} modules from {}", macros.len(), file.display());
                Extraction {
                    macros,
                    condition: None,
                }
            }
            Err(e) => {
                if e.is_informational() {
                    log::info!("{}: {e}", file.display());
                } else {
                    log::debug!("{}: {e}", file.display());
                }
                Extraction {
                    macros: Vec::new(),
                    condition: Some(e),
                }
            }
        }
    }

    fn run(&self, file: &Path) -> ExtractResult<Vec<MacroRecord>> {
        if !file.is_file() {
            return Err(ExtractError::NotFound(file.to_path_buf()));
        }

        let mut archive = match ZipArchive::new(File::open(file)?) {
            Ok(archive) => archive,
            Err(ZipError::Io(e)) => return Err(e.into()),
            Err(e) => return Err(ExtractError::InvalidContainer(e)),
        };

        if !archive.file_names().any(|name| name == consts::ZIP_VBA_PATH) {
            return Err(ExtractError::NoMacroProject);
        }

        // Declared before the decoder so it is removed only after the decoder lets go of the file
        let temp_dir = self.temp_dir()?;
        let vba_path = unpack_vba(&mut archive, temp_dir.path())?;
        log::debug!("Unpacked {} to {}", consts::ZIP_VBA_PATH, vba_path.display());

        let mut decoder = Opened(self.opener.open(&vba_path)?);
        if !decoder.detect_macros()? {
            return Err(ExtractError::DecoderReportsNone);
        }
        log::debug!("VBA macros found, extracting");

        Ok(decoder
            .extract_macros()?
            .into_iter()
            .map(|m| MacroRecord::from_decoded(consts::ZIP_VBA_PATH, m))
            .collect())
    }

    fn temp_dir(&self) -> io::Result<TempDir> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(consts::TEMP_DIR_PREFIX);
        match &self.temp_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
    }
}

/// Copy the vbaProject.bin entry out of the archive into `dir`, keeping its relative path
fn unpack_vba<R: Read + Seek>(archive: &mut ZipArchive<R>, dir: &Path) -> ExtractResult<PathBuf> {
    let mut vba_file = archive.by_name(consts::ZIP_VBA_PATH)?;

    let target = dir.join(consts::ZIP_VBA_PATH);
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut out = File::create(&target)?;
    io::copy(&mut vba_file, &mut out)?;
    Ok(target)
}

/// Closes the decoder when it goes out of scope, however the extraction ends
struct Opened<D: MacroDecoder>(D);

impl<D: MacroDecoder> Deref for Opened<D> {
    type Target = D;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<D: MacroDecoder> DerefMut for Opened<D> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<D: MacroDecoder> Drop for Opened<D> {
    fn drop(&mut self) {
        self.0.close();
    }
}
