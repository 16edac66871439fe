//! Codecs between the three textual/binary representations of a ReTI word
//! stream: raw little-endian binary, the `{address:08x} {data:08x}` hex
//! listing, and (via [`disassemble`]) assembler text.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};

use reti::isa;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HexError {
    pub line: u32,
    pub reason: String,
}

impl fmt::Display for HexError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "line {}: {}", self.line, self.reason)
    }
}

impl std::error::Error for HexError {}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinError {
    pub word_offset: usize,
    pub trailing_bytes: usize,
}

impl fmt::Display for BinError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "partial trailing word at offset {} ({} leftover bytes)",
            self.word_offset, self.trailing_bytes
        )
    }
}

impl std::error::Error for BinError {}

/// Serializes `words` as a flat little-endian byte stream.
pub fn words_to_binary(words: &[u32]) -> Vec<u8> {
    let mut bytes = vec![0u8; words.len() * 4];
    LittleEndian::write_u32_into(words, &mut bytes);
    bytes
}

/// Parses a flat little-endian byte stream into words. A byte length that is
/// not a multiple of 4 is a parse error (§6): the caller is `decbin`, which
/// does not tolerate a partial trailing group the way the emulator's loader
/// silently truncates it.
pub fn binary_to_words(bytes: &[u8]) -> Result<Vec<u32>, BinError> {
    let whole_words = bytes.len() / 4;
    let trailing = bytes.len() % 4;
    if trailing != 0 {
        return Err(BinError {
            word_offset: whole_words,
            trailing_bytes: trailing,
        });
    }
    let mut words = vec![0u32; whole_words];
    LittleEndian::read_u32_into(&bytes[..whole_words * 4], &mut words);
    Ok(words)
}

/// Like [`binary_to_words`], but silently drops a partial trailing group
/// instead of erroring, matching the emulator's loader (`fread` unit count).
pub fn binary_to_words_truncating(bytes: &[u8]) -> Vec<u32> {
    let whole_words = bytes.len() / 4;
    let mut words = vec![0u32; whole_words];
    LittleEndian::read_u32_into(&bytes[..whole_words * 4], &mut words);
    words
}

/// Renders a dense word array as `enchex`'s hex listing, one
/// `{address:08x} {data:08x}` line per word, address counting in words from 0.
pub fn words_to_hex(words: &[u32]) -> String {
    let mut out = String::new();
    for (address, &word) in words.iter().enumerate() {
        out.push_str(&format!("{:08x} {:08x}\n", address, word));
    }
    out
}

/// Parses an `enchex`/`decbin` hex listing into a dense word array.
///
/// Addresses must be monotonically nondecreasing; a gap between two listed
/// addresses is filled with zero words so the result is always dense from 0.
pub fn hex_to_words(text: &str) -> Result<Vec<u32>, HexError> {
    let mut words: Vec<u32> = Vec::new();
    let mut last_address: Option<u32> = None;

    for (line_idx, raw_line) in text.lines().enumerate() {
        let line_no = (line_idx + 1) as u32;
        let line = match raw_line.split(';').next() {
            Some(before_comment) => before_comment.trim(),
            None => raw_line.trim(),
        };
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split_whitespace();
        let address_str = parts.next().ok_or_else(|| HexError {
            line: line_no,
            reason: "missing address field".to_string(),
        })?;
        let data_str = parts.next().ok_or_else(|| HexError {
            line: line_no,
            reason: "missing data field".to_string(),
        })?;
        if parts.next().is_some() {
            return Err(HexError {
                line: line_no,
                reason: "unexpected extra field".to_string(),
            });
        }

        let address = u32::from_str_radix(address_str, 16).map_err(|_| HexError {
            line: line_no,
            reason: "invalid hex address".to_string(),
        })?;
        let data = u32::from_str_radix(data_str, 16).map_err(|_| HexError {
            line: line_no,
            reason: "invalid hex data".to_string(),
        })?;

        if let Some(prev) = last_address {
            if address < prev {
                return Err(HexError {
                    line: line_no,
                    reason: "addresses must be nondecreasing".to_string(),
                });
            }
        }
        last_address = Some(address);

        if (address as usize) >= words.len() {
            words.resize(address as usize + 1, 0);
        }
        words[address as usize] = data;
    }

    Ok(words)
}

/// Disassembles a word stream into one assembler-text line per word,
/// `ILLEGAL` for words that don't decode to a legal instruction.
pub fn disassemble(words: &[u32]) -> String {
    let mut out = String::new();
    for &word in words {
        out.push_str(&isa::decode(word).to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_round_trip() {
        let words = vec![0x1234_5678, 0xDEAD_BEEF];
        let bytes = words_to_binary(&words);
        assert_eq!(bytes, vec![0x78, 0x56, 0x34, 0x12, 0xEF, 0xBE, 0xAD, 0xDE]);
        assert_eq!(binary_to_words(&bytes).unwrap(), words);
    }

    #[test]
    fn binary_rejects_partial_trailing_group() {
        let bytes = vec![0x01, 0x02, 0x03, 0x04, 0xFF];
        let err = binary_to_words(&bytes).unwrap_err();
        assert_eq!(err.word_offset, 1);
        assert_eq!(err.trailing_bytes, 1);
    }

    #[test]
    fn hex_round_trip_is_dense() {
        let words = vec![1, 2, 3];
        let hex = words_to_hex(&words);
        assert_eq!(hex, "00000000 00000001\n00000001 00000002\n00000002 00000003\n");
        assert_eq!(hex_to_words(&hex).unwrap(), words);
    }

    #[test]
    fn hex_fills_gaps_with_zero() {
        let text = "00000000 0000002a\n00000002 000000ff\n";
        assert_eq!(hex_to_words(text).unwrap(), vec![0x2a, 0, 0xff]);
    }

    #[test]
    fn hex_rejects_decreasing_addresses() {
        let text = "00000002 00000001\n00000000 00000002\n";
        let err = hex_to_words(text).unwrap_err();
        assert_eq!(err.line, 2);
    }

    #[test]
    fn hex_allows_comments_and_blank_lines() {
        let text = "; leading comment\n\n00000000 0000002a ; trailing comment\n";
        assert_eq!(hex_to_words(text).unwrap(), vec![0x2a]);
    }

    #[test]
    fn disassemble_illegal_word() {
        let out = disassemble(&[0]);
        assert_eq!(out, "ILLEGAL\n");
    }
}
