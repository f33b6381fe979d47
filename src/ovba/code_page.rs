//! Map the Windows code page a VBA project is saved in onto a text decoder
//!
//! Module names and source text are stored as MBCS bytes in the code page given by the
//! PROJECTCODEPAGE record of the dir stream.
use encoding_rs::{
    Encoding, BIG5, EUC_KR, GBK, IBM866, ISO_8859_10, ISO_8859_13, ISO_8859_14, ISO_8859_15,
    ISO_8859_16, ISO_8859_2, ISO_8859_3, ISO_8859_4, ISO_8859_5, ISO_8859_6, ISO_8859_7,
    ISO_8859_8, KOI8_R, KOI8_U, MACINTOSH, SHIFT_JIS, UTF_16LE, UTF_8, WINDOWS_1250,
    WINDOWS_1251, WINDOWS_1252, WINDOWS_1253, WINDOWS_1254, WINDOWS_1255, WINDOWS_1256,
    WINDOWS_1257, WINDOWS_1258, WINDOWS_874,
};

/// Code page Excel uses when nothing else is specified
pub const DEFAULT_CODE_PAGE: u16 = 1252;

pub fn encoding(code_page: u16) -> Option<&'static Encoding> {
    let encoding = match code_page {
        874 => WINDOWS_874,
        866 => IBM866,
        932 => SHIFT_JIS,
        936 => GBK,
        949 => EUC_KR,
        950 => BIG5,
        1200 => UTF_16LE,
        1250 => WINDOWS_1250,
        1251 => WINDOWS_1251,
        1252 | 28591 => WINDOWS_1252,
        1253 => WINDOWS_1253,
        1254 | 28599 => WINDOWS_1254,
        1255 => WINDOWS_1255,
        1256 => WINDOWS_1256,
        1257 => WINDOWS_1257,
        1258 => WINDOWS_1258,
        10000 => MACINTOSH,
        20866 => KOI8_R,
        21866 => KOI8_U,
        28592 => ISO_8859_2,
        28593 => ISO_8859_3,
        28594 => ISO_8859_4,
        28595 => ISO_8859_5,
        28596 => ISO_8859_6,
        28597 => ISO_8859_7,
        28598 => ISO_8859_8,
        28600 => ISO_8859_10,
        28603 => ISO_8859_13,
        28604 => ISO_8859_14,
        28605 => ISO_8859_15,
        28606 => ISO_8859_16,
        65001 => UTF_8,
        _ => return None,
    };
    Some(encoding)
}

/// A decoder for a project's text, falling back to windows-1252 for code pages we don't know
#[derive(Debug, Clone, Copy)]
pub struct CodePage {
    number: u16,
    encoding: &'static Encoding,
}

impl CodePage {
    pub fn new(number: u16) -> Self {
        let encoding = encoding(number).unwrap_or_else(|| {
            log::warn!("Unknown code page {number}, decoding VBA text as windows-1252");
            WINDOWS_1252
        });
        Self { number, encoding }
    }

    pub const fn number(&self) -> u16 {
        self.number
    }

    /// Lossy decode, invalid sequences come out as U+FFFD
    pub fn decode(&self, bytes: &[u8]) -> String {
        let (text, _, had_errors) = self.encoding.decode(bytes);
        if had_errors {
            log::debug!(
                "Replaced invalid characters decoding with code page {}",
                self.number
            );
        }
        text.into_owned()
    }
}

impl Default for CodePage {
    fn default() -> Self {
        Self::new(DEFAULT_CODE_PAGE)
    }
}

/// Decode the UTF-16LE text held in the unicode variants of dir stream records
pub fn decode_utf16(bytes: &[u8]) -> String {
    let (text, _) = UTF_16LE.decode_without_bom_handling(bytes);
    text.into_owned()
}
