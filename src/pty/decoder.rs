/// Stateful UTF-8 decoder that handles split multi-byte sequences.
///
/// When reading from a PTY in 4096-byte chunks, a multi-byte UTF-8 character
/// (e.g., emoji, Nerd Font icon, CJK character) can be split across chunk
/// boundaries. Using `String::from_utf8_lossy` replaces incomplete sequences
/// with U+FFFD (�), causing garbled output.
///
/// This decoder buffers incomplete trailing sequences and prepends them to
/// the next chunk, ensuring correct UTF-8 decoding across read boundaries.
pub struct Utf8Decoder {
    /// Buffer for incomplete UTF-8 sequence (max 4 bytes for any code point).
    incomplete: Vec<u8>,
}

impl Default for Utf8Decoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Utf8Decoder {
    /// Creates a new decoder with an empty buffer.
    pub fn new() -> Self {
        Self {
            incomplete: Vec::with_capacity(4),
        }
    }

    /// Decodes bytes, buffering incomplete trailing sequences.
    ///
    /// Returns a valid UTF-8 string. Any bytes that form an incomplete
    /// sequence at the end of `input` are buffered for the next call.
    pub fn decode(&mut self, input: &[u8]) -> String {
        let mut data = std::mem::take(&mut self.incomplete);
        data.extend_from_slice(input);

        let valid_up_to = Self::find_valid_boundary(&data);

        if valid_up_to < data.len() {
            self.incomplete = data[valid_up_to..].to_vec();
        }

        String::from_utf8(data[..valid_up_to].to_vec())
            .unwrap_or_else(|_| String::from_utf8_lossy(&data[..valid_up_to]).into_owned())
    }

    /// Finds the byte index up to which the data is valid UTF-8.
    fn find_valid_boundary(data: &[u8]) -> usize {
        match std::str::from_utf8(data) {
            Ok(_) => data.len(),
            Err(e) => {
                let valid = e.valid_up_to();
                if e.error_len().is_none() {
                    valid // Incomplete sequence - buffer it
                } else {
                    valid + e.error_len().unwrap_or(1)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_multibyte_char_split_across_chunks() {
        let bytes = "a→b".as_bytes().to_vec(); // '→' is 3 bytes: E2 86 92
        let mut decoder = Utf8Decoder::new();
        let mut out = String::new();
        out.push_str(&decoder.decode(&bytes[..2])); // splits inside '→'
        out.push_str(&decoder.decode(&bytes[2..]));
        assert_eq!(out, "a→b");
    }

    #[test]
    fn invalid_byte_is_skipped_not_buffered_forever() {
        let mut decoder = Utf8Decoder::new();
        let out = decoder.decode(&[0xFF, b'x']);
        assert!(out.ends_with('x'));
    }
}
