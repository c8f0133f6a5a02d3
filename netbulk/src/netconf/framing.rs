//! NETCONF message framing (RFC 6242).
//!
//! Two framings exist on the wire:
//!
//! ```text
//! base:1.0   <rpc>...</rpc>]]>]]>
//! base:1.1   \n#16\n<rpc>...</rpc>\n##\n
//! ```
//!
//! Hellos always use end-of-message framing; chunked framing is switched
//! on afterwards when both peers advertise base:1.1.

use bytes::BytesMut;
use memchr::memmem;

use crate::error::NetconfError;

/// End-of-message delimiter for base:1.0 framing.
pub const END_OF_MESSAGE: &[u8] = b"]]>]]>";

/// Largest chunk size RFC 6242 allows.
const MAX_CHUNK_SIZE: usize = 4_294_967_295;

/// Longest chunk-size header we accept before giving up on it.
const MAX_HEADER_DIGITS: usize = 10;

/// Which framing the session is currently using.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framing {
    /// base:1.0 `]]>]]>` delimiter.
    EndOfMessage,

    /// base:1.1 chunked framing.
    Chunked,
}

/// Frame a message for the wire.
pub fn encode(framing: Framing, message: &str) -> Vec<u8> {
    match framing {
        Framing::EndOfMessage => {
            let mut out = Vec::with_capacity(message.len() + END_OF_MESSAGE.len());
            out.extend_from_slice(message.as_bytes());
            out.extend_from_slice(END_OF_MESSAGE);
            out
        }
        Framing::Chunked => {
            let header = format!("\n#{}\n", message.len());
            let mut out = Vec::with_capacity(header.len() + message.len() + 4);
            out.extend_from_slice(header.as_bytes());
            out.extend_from_slice(message.as_bytes());
            out.extend_from_slice(b"\n##\n");
            out
        }
    }
}

/// Incremental decoder for NETCONF messages.
#[derive(Debug)]
pub struct FrameDecoder {
    framing: Framing,
    buffer: BytesMut,
}

impl FrameDecoder {
    /// Create a decoder starting with the given framing.
    pub fn new(framing: Framing) -> Self {
        Self {
            framing,
            buffer: BytesMut::with_capacity(8192),
        }
    }

    /// Current framing.
    pub fn framing(&self) -> Framing {
        self.framing
    }

    /// Switch framing. Buffered bytes are decoded with the new framing.
    pub fn set_framing(&mut self, framing: Framing) {
        self.framing = framing;
    }

    /// Append received bytes.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Pop the next complete message, if one is buffered.
    pub fn decode(&mut self) -> Result<Option<String>, NetconfError> {
        match self.framing {
            Framing::EndOfMessage => Ok(self.decode_end_of_message()),
            Framing::Chunked => self.decode_chunked(),
        }
    }

    fn decode_end_of_message(&mut self) -> Option<String> {
        let end = memmem::find(&self.buffer, END_OF_MESSAGE)?;
        let frame = self.buffer.split_to(end + END_OF_MESSAGE.len());
        let message = String::from_utf8_lossy(&frame[..end]);
        Some(message.trim().to_string())
    }

    fn decode_chunked(&mut self) -> Result<Option<String>, NetconfError> {
        let buf = &self.buffer[..];
        let mut pos = 0;
        let mut message = Vec::new();

        // Tolerate whitespace left over from a previous frame.
        while pos < buf.len() && buf[pos] != b'\n' && buf[pos].is_ascii_whitespace() {
            pos += 1;
        }

        loop {
            if buf.len() < pos + 4 {
                return Ok(None);
            }
            if buf[pos] != b'\n' || buf[pos + 1] != b'#' {
                return Err(NetconfError::Framing(format!(
                    "expected chunk header at byte {pos}"
                )));
            }

            if buf[pos + 2] == b'#' {
                if buf[pos + 3] != b'\n' {
                    return Err(NetconfError::Framing("malformed end-of-chunks".into()));
                }
                let consumed = pos + 4;
                let _ = self.buffer.split_to(consumed);
                return Ok(Some(String::from_utf8_lossy(&message).into_owned()));
            }

            let digits_start = pos + 2;
            let Some(newline) = memchr::memchr(b'\n', &buf[digits_start..]) else {
                if buf.len() - digits_start > MAX_HEADER_DIGITS {
                    return Err(NetconfError::Framing("chunk size too long".into()));
                }
                return Ok(None);
            };

            let digits = &buf[digits_start..digits_start + newline];
            let size = std::str::from_utf8(digits)
                .ok()
                .filter(|d| !d.starts_with('0'))
                .and_then(|d| d.parse::<usize>().ok())
                .filter(|size| (1..=MAX_CHUNK_SIZE).contains(size))
                .ok_or_else(|| {
                    NetconfError::Framing(format!(
                        "invalid chunk size {:?}",
                        String::from_utf8_lossy(digits)
                    ))
                })?;

            let data_start = digits_start + newline + 1;
            if buf.len() < data_start + size {
                return Ok(None);
            }
            message.extend_from_slice(&buf[data_start..data_start + size]);
            pos = data_start + size;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_of_message_split_across_reads() {
        let mut decoder = FrameDecoder::new(Framing::EndOfMessage);
        decoder.extend(b"<hello/>]]>");
        assert_eq!(decoder.decode().unwrap(), None);

        decoder.extend(b"]]>\n<rpc-reply/>]]>]]>");
        assert_eq!(decoder.decode().unwrap().as_deref(), Some("<hello/>"));
        assert_eq!(decoder.decode().unwrap().as_deref(), Some("<rpc-reply/>"));
        assert_eq!(decoder.decode().unwrap(), None);
    }

    #[test]
    fn test_chunked_multiple_chunks() {
        let mut decoder = FrameDecoder::new(Framing::Chunked);
        decoder.extend(b"\n#4\n<rpc");
        assert_eq!(decoder.decode().unwrap(), None);

        decoder.extend(b"\n#17\n message-id=\"1\"/>\n##\n");
        assert_eq!(
            decoder.decode().unwrap().as_deref(),
            Some("<rpc message-id=\"1\"/>")
        );
    }

    #[test]
    fn test_chunked_encode_decode() {
        let framed = encode(Framing::Chunked, "<ok/>");
        assert_eq!(framed, b"\n#5\n<ok/>\n##\n");

        let mut decoder = FrameDecoder::new(Framing::Chunked);
        decoder.extend(&framed);
        assert_eq!(decoder.decode().unwrap().as_deref(), Some("<ok/>"));
    }

    #[test]
    fn test_chunked_rejects_garbage() {
        let mut decoder = FrameDecoder::new(Framing::Chunked);
        decoder.extend(b"<rpc-reply/>");
        assert!(matches!(decoder.decode(), Err(NetconfError::Framing(_))));

        let mut decoder = FrameDecoder::new(Framing::Chunked);
        decoder.extend(b"\n#0\n\n##\n");
        assert!(matches!(decoder.decode(), Err(NetconfError::Framing(_))));
    }

    #[test]
    fn test_switch_framing_keeps_buffer() {
        let mut decoder = FrameDecoder::new(Framing::EndOfMessage);
        decoder.extend(b"<hello/>]]>]]>\n#5\n<ok/>\n##\n");

        assert_eq!(decoder.decode().unwrap().as_deref(), Some("<hello/>"));
        decoder.set_framing(Framing::Chunked);
        assert_eq!(decoder.framing(), Framing::Chunked);
        assert_eq!(decoder.decode().unwrap().as_deref(), Some("<ok/>"));
    }
}
