use crate::config::ParseFlags;
use crate::event::CharEncoding;
use crate::{DomError, Result};

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Character set of raw input, sniffed from a byte order mark or from the
/// zero bytes ASCII text has in UTF-16.
pub(crate) fn detect(bytes: &[u8]) -> CharEncoding {
    match bytes {
        [0xFE, 0xFF, ..] => CharEncoding::Utf16Be,
        [0xFF, 0xFE, ..] => CharEncoding::Utf16Le,
        [0, b, ..] if *b != 0 => CharEncoding::Utf16Be,
        [a, 0, ..] if *a != 0 => CharEncoding::Utf16Le,
        _ => CharEncoding::Utf8,
    }
}

/// Turns raw input into checked UTF-8 text. A UTF-8 byte order mark is only
/// accepted with `LEADING_BOM`; UTF-16 marks are always consumed.
pub(crate) fn decode(bytes: Vec<u8>, flags: ParseFlags) -> Result<String> {
    match detect(&bytes) {
        CharEncoding::Utf8 => {
            let mut bytes = bytes;
            if bytes.starts_with(UTF8_BOM) {
                if !flags.contains(ParseFlags::LEADING_BOM) {
                    return Err(DomError::malformed(0, "byte order mark is not allowed"));
                }
                bytes.drain(..UTF8_BOM.len());
            }
            String::from_utf8(bytes).map_err(|err| {
                let at = err.utf8_error().valid_up_to();
                DomError::malformed(at, "invalid utf-8 sequence")
            })
        }
        encoding => {
            if bytes.len() % 2 != 0 {
                return Err(DomError::malformed(
                    bytes.len() - 1,
                    "odd number of bytes in utf-16 input",
                ));
            }
            let units = bytes.chunks_exact(2).map(|pair| match encoding {
                CharEncoding::Utf16Be => u16::from_be_bytes([pair[0], pair[1]]),
                _ => u16::from_le_bytes([pair[0], pair[1]]),
            });
            let mut text = String::new();
            text.try_reserve(bytes.len() / 2)
                .map_err(|_| DomError::OutOfMemory("transcoding buffer".into()))?;
            for (i, unit) in char::decode_utf16(units).enumerate() {
                let ch = unit
                    .map_err(|_| DomError::malformed(i * 2, "unpaired utf-16 surrogate"))?;
                if i == 0 && ch == '\u{FEFF}' {
                    continue;
                }
                text.push(ch);
            }
            Ok(text)
        }
    }
}
