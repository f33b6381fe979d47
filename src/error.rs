use std::{
    fmt::{Debug, Display},
    io,
    path::PathBuf,
};

pub type ExtractResult<T> = Result<T, ExtractError>;
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Every way an extraction can end without producing macros
///
/// Two of the variants are informational rather than failures, see
/// [`ExtractError::is_informational`]
#[allow(clippy::module_name_repetitions)]
pub enum ExtractError {
    NotFound(PathBuf),
    InvalidContainer(zip::result::ZipError),
    NoMacroProject,
    DecoderReportsNone,
    Unexpected(Unexpected),
}

impl ExtractError {
    /// The file was read fine, it just has no macros in it
    pub const fn is_informational(&self) -> bool {
        matches!(self, Self::NoMacroProject | Self::DecoderReportsNone)
    }
}

impl From<io::Error> for ExtractError {
    fn from(value: io::Error) -> Self {
        Self::Unexpected(Unexpected::Io(value))
    }
}

impl From<zip::result::ZipError> for ExtractError {
    fn from(value: zip::result::ZipError) -> Self {
        Self::Unexpected(Unexpected::Zip(value))
    }
}

impl From<DecodeError> for ExtractError {
    fn from(value: DecodeError) -> Self {
        Self::Unexpected(Unexpected::Decode(value))
    }
}

impl Display for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(file) => write!(f, "File not found at {}", file.display()),
            Self::InvalidContainer(e) => write!(
                f,
                "The file is not a valid zip file (or .xlsm file): {e}"
            ),
            Self::NoMacroProject => write!(
                f,
                "No vbaProject.bin found in the archive. It may be macro-free"
            ),
            Self::DecoderReportsNone => write!(f, "No VBA macros were detected by the parser"),
            Self::Unexpected(e) => write!(f, "An unexpected error occurred: {e}"),
        }
    }
}

impl Debug for ExtractError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

pub enum Unexpected {
    Io(io::Error),
    Zip(zip::result::ZipError),
    Decode(DecodeError),
}

impl Display for Unexpected {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "{e}"),
            Self::Zip(e) => write!(f, "Problem reading the zip archive: {e}"),
            Self::Decode(e) => write!(f, "{e}"),
        }
    }
}

pub enum DecodeError {
    CfbOpen(io::Error),
    Stream(String, io::Error),
    Closed,
    Decompression(String, Decompression),
    Dir(DirStream),
    TextOffset {
        stream: String,
        offset: u32,
        length: usize,
    },
}

impl From<DirStream> for DecodeError {
    fn from(value: DirStream) -> Self {
        Self::Dir(value)
    }
}

impl Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CfbOpen(e) => write!(
                f,
                "There was a problem reading the CFB format vbaProject.bin file: {e}"
            ),
            Self::Stream(path, e) => write!(f, "Could not read the stream {path}: {e}"),
            Self::Closed => write!(f, "The VBA project has already been closed"),
            Self::Decompression(path, e) => write!(f, "Could not decompress {path}: {e}"),
            Self::Dir(e) => write!(f, "{e}"),
            Self::TextOffset {
                stream,
                offset,
                length,
            } => write!(
                f,
                "The source text of {stream} starts at offset {offset} but the stream is only {length} bytes long"
            ),
        }
    }
}

impl Debug for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum Decompression {
    Empty,
    Signature(u8),
    ChunkSignature { position: usize, signature: u8 },
    Truncated { position: usize },
    CopyBeforeStart { position: usize, offset: usize },
}

impl Display for Decompression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "A compressed container MUST have at least a signature byte"),
            Self::Signature(b) => write!(
                f,
                "The compressed container signature MUST be 0x01, not 0x{b:02x}"
            ),
            Self::ChunkSignature {
                position,
                signature,
            } => write!(
                f,
                "The chunk signature at byte {position} MUST be 0b011, not 0b{signature:03b}"
            ),
            Self::Truncated { position } => {
                write!(f, "The compressed data ends part way through a token at byte {position}")
            }
            Self::CopyBeforeStart { position, offset } => write!(
                f,
                "The copy token at byte {position} points {offset} bytes back, before the start of its chunk"
            ),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum DirStream {
    Decompression(Decompression),
    Truncated(usize),
    MissingCodePage,
    IncompleteModule(String),
}

impl Display for DirStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Decompression(e) => write!(f, "Could not decompress the dir stream: {e}"),
            Self::Truncated(offset) => write!(
                f,
                "The dir stream has a malformed record at byte {offset}"
            ),
            Self::MissingCodePage => write!(
                f,
                "The dir stream MUST declare a code page before any module records"
            ),
            Self::IncompleteModule(name) => write!(
                f,
                "The module {name} in the dir stream is missing its stream name or text offset"
            ),
        }
    }
}

impl From<Decompression> for DirStream {
    fn from(value: Decompression) -> Self {
        Self::Decompression(value)
    }
}
