//! Streaming parser for RESP requests.
//!
//! Only arrays of bulk strings are accepted:
//!
//! ```text
//! *<argc>\r\n
//! $<len>\r\n<len bytes>\r\n      (argc times)
//! ```
//!
//! The parser never copies argument bytes. A successful parse records the
//! byte range of every argument inside the caller's buffer; the caller borrows
//! them through [`RespParser::args`] and then calls [`RespParser::consume`] to
//! drop the command from the front of the buffer.

use bytes::{Buf, BytesMut};
use std::ops::Range;
use thiserror::Error;

const ARRAY_PREFIX: u8 = b'*';
const BULK_PREFIX: u8 = b'$';

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("expected '{expected}' but found byte {found:#04x}")]
    UnexpectedPrefix { expected: char, found: u8 },

    #[error("invalid byte {0:#04x} in length field")]
    InvalidLength(u8),

    #[error("length field overflows")]
    LengthOverflow,

    #[error("missing CRLF after bulk data")]
    MissingTerminator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// A whole command is available through `args`.
    Complete,
    /// More bytes are needed. Nothing was consumed.
    Incomplete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserState {
    Ready,
    /// Sticky: every later `parse` returns this error without scanning.
    Fatal(ProtocolError),
}

#[derive(Debug)]
pub struct RespParser {
    state: ParserState,
    args: Vec<Range<usize>>,
    consumed: usize,
}

impl Default for RespParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RespParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::Ready,
            args: Vec::new(),
            consumed: 0,
        }
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.state, ParserState::Fatal(_))
    }

    /// Tries to parse exactly one command starting at `buffer[0]`.
    pub fn parse(&mut self, buffer: &[u8]) -> Result<ParseStatus, ProtocolError> {
        self.args.clear();
        self.consumed = 0;

        if let ParserState::Fatal(err) = &self.state {
            return Err(err.clone());
        }

        match Self::parse_command(buffer, &mut self.args) {
            Ok(Some(consumed)) => {
                self.consumed = consumed;
                Ok(ParseStatus::Complete)
            }
            Ok(None) => {
                self.args.clear();
                Ok(ParseStatus::Incomplete)
            }
            Err(err) => {
                self.args.clear();
                self.state = ParserState::Fatal(err.clone());
                Err(err)
            }
        }
    }

    /// Arguments of the last complete command, borrowed from `buffer`.
    ///
    /// `buffer` must be the same bytes that were handed to `parse`.
    pub fn args<'b>(&self, buffer: &'b [u8]) -> Vec<&'b [u8]> {
        self.args
            .iter()
            .map(|range| &buffer[range.clone()])
            .collect()
    }

    /// Byte length of the last complete command, 0 if there is none.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Drops the last complete command from the front of `buffer`.
    pub fn consume(&mut self, buffer: &mut BytesMut) {
        if self.consumed == 0 || self.consumed > buffer.len() {
            return;
        }
        buffer.advance(self.consumed);
        self.consumed = 0;
        self.args.clear();
    }

    pub fn reset(&mut self) {
        self.state = ParserState::Ready;
        self.args.clear();
        self.consumed = 0;
    }

    // Ok(Some(n)): complete command of n bytes. Ok(None): incomplete.
    fn parse_command(
        buffer: &[u8],
        args: &mut Vec<Range<usize>>,
    ) -> Result<Option<usize>, ProtocolError> {
        let Some((argc, mut pos)) = Self::parse_header(buffer, 0, ARRAY_PREFIX)? else {
            return Ok(None);
        };

        for _ in 0..argc {
            let Some((len, data_start)) = Self::parse_header(buffer, pos, BULK_PREFIX)? else {
                return Ok(None);
            };

            let data_end = data_start
                .checked_add(len)
                .ok_or(ProtocolError::LengthOverflow)?;
            let frame_end = data_end
                .checked_add(2)
                .ok_or(ProtocolError::LengthOverflow)?;
            if frame_end > buffer.len() {
                return Ok(None);
            }
            if &buffer[data_end..frame_end] != b"\r\n" {
                return Err(ProtocolError::MissingTerminator);
            }

            args.push(data_start..data_end);
            pos = frame_end;
        }

        Ok(Some(pos))
    }

    // Parses `<prefix><digits>\r\n` at `pos`, returning the value and the
    // offset just past the terminator.
    fn parse_header(
        buffer: &[u8],
        pos: usize,
        prefix: u8,
    ) -> Result<Option<(usize, usize)>, ProtocolError> {
        let Some(&found) = buffer.get(pos) else {
            return Ok(None);
        };
        if found != prefix {
            return Err(ProtocolError::UnexpectedPrefix {
                expected: prefix as char,
                found,
            });
        }
        Self::parse_length(buffer, pos + 1)
    }

    /// Reads an unsigned decimal terminated by CRLF.
    ///
    /// Running out of bytes anywhere (in the digits or between `\r` and `\n`)
    /// is incomplete. A non-digit first byte, a stray byte before `\r`, or a
    /// `\r` not followed by `\n` is malformed.
    fn parse_length(buffer: &[u8], start: usize) -> Result<Option<(usize, usize)>, ProtocolError> {
        let mut value: usize = 0;
        let mut pos = start;

        loop {
            let Some(&byte) = buffer.get(pos) else {
                return Ok(None);
            };
            match byte {
                b'0'..=b'9' => {
                    value = value
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(usize::from(byte - b'0')))
                        .ok_or(ProtocolError::LengthOverflow)?;
                    pos += 1;
                }
                b'\r' if pos > start => break,
                other => return Err(ProtocolError::InvalidLength(other)),
            }
        }

        match buffer.get(pos + 1) {
            None => Ok(None),
            Some(b'\n') => Ok(Some((value, pos + 2))),
            Some(&other) => Err(ProtocolError::InvalidLength(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<A: AsRef<[u8]>>(args: &[A]) -> Vec<u8> {
        let mut out = format!("*{}\r\n", args.len()).into_bytes();
        for arg in args {
            let arg = arg.as_ref();
            out.extend_from_slice(format!("${}\r\n", arg.len()).as_bytes());
            out.extend_from_slice(arg);
            out.extend_from_slice(b"\r\n");
        }
        out
    }

    // Drives the parser the way a connection does: parse, copy out, consume.
    fn drain(parser: &mut RespParser, buffer: &mut BytesMut) -> Vec<Vec<Vec<u8>>> {
        let mut commands = Vec::new();
        while let Ok(ParseStatus::Complete) = parser.parse(&buffer[..]) {
            commands.push(parser.args(&buffer[..]).iter().map(|a| a.to_vec()).collect());
            parser.consume(buffer);
        }
        commands
    }

    #[test]
    fn test_parse_single_command() {
        let mut parser = RespParser::new();
        let buffer = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
        assert_eq!(parser.parse(buffer), Ok(ParseStatus::Complete));
        assert_eq!(parser.args(buffer), vec![&b"GET"[..], &b"name"[..]]);
        assert_eq!(parser.consumed(), buffer.len());
    }

    #[test]
    fn test_parse_binary_and_empty_arguments() {
        let mut parser = RespParser::new();
        let buffer = encode(&[&b"SET"[..], &b"\r\n\x00"[..], &b""[..]]);
        assert_eq!(parser.parse(&buffer), Ok(ParseStatus::Complete));
        assert_eq!(
            parser.args(&buffer),
            vec![&b"SET"[..], &b"\r\n\x00"[..], &b""[..]]
        );
    }

    #[test]
    fn test_parse_empty_array() {
        let mut parser = RespParser::new();
        assert_eq!(parser.parse(b"*0\r\n"), Ok(ParseStatus::Complete));
        assert!(parser.args(b"*0\r\n").is_empty());
        assert_eq!(parser.consumed(), 4);
    }

    #[test]
    fn test_empty_buffer_is_incomplete() {
        let mut parser = RespParser::new();
        assert_eq!(parser.parse(b""), Ok(ParseStatus::Incomplete));
        assert!(!parser.is_failed());
    }

    #[test]
    fn test_every_prefix_is_incomplete() {
        let full = encode(&["SET", "key", "value"]);
        let mut parser = RespParser::new();
        for cut in 0..full.len() {
            assert_eq!(
                parser.parse(&full[..cut]),
                Ok(ParseStatus::Incomplete),
                "prefix of {} bytes",
                cut
            );
            assert_eq!(parser.consumed(), 0);
        }
        assert_eq!(parser.parse(&full), Ok(ParseStatus::Complete));
    }

    #[test]
    fn test_fragmentation_invariance() {
        let commands: Vec<Vec<&str>> = vec![
            vec!["SET", "k", "v"],
            vec!["PING"],
            vec!["ECHO", "hello world"],
            vec!["DEL", "a", "b", "c"],
        ];
        let mut stream = Vec::new();
        for command in &commands {
            stream.extend(encode(command));
        }

        let mut parser = RespParser::new();
        let mut whole = BytesMut::from(&stream[..]);
        let expected = drain(&mut parser, &mut whole);
        assert_eq!(expected.len(), commands.len());
        assert!(whole.is_empty());

        for chunk_size in [1, 2, 3, 5, 7, 16] {
            let mut parser = RespParser::new();
            let mut buffer = BytesMut::new();
            let mut seen = Vec::new();
            for chunk in stream.chunks(chunk_size) {
                buffer.extend_from_slice(chunk);
                seen.extend(drain(&mut parser, &mut buffer));
            }
            assert_eq!(seen, expected, "chunk size {}", chunk_size);
            assert!(buffer.is_empty());
        }
    }

    #[test]
    fn test_bulk_longer_than_buffer_waits_for_data() {
        let mut parser = RespParser::new();
        let mut buffer = BytesMut::from(&b"*2\r\n$4\r\nECHO\r\n$10\r\nhello"[..]);
        assert_eq!(parser.parse(&buffer), Ok(ParseStatus::Incomplete));
        assert_eq!(buffer.len(), 24);

        buffer.extend_from_slice(b"world\r\n");
        assert_eq!(parser.parse(&buffer), Ok(ParseStatus::Complete));
        assert_eq!(parser.args(&buffer)[1], &b"helloworld"[..]);
        parser.consume(&mut buffer);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_consume_keeps_following_command() {
        let mut parser = RespParser::new();
        let mut stream = encode(&["PING"]);
        stream.extend(b"*1\r\n$4\r\nPI");
        let mut buffer = BytesMut::from(&stream[..]);

        assert_eq!(parser.parse(&buffer), Ok(ParseStatus::Complete));
        parser.consume(&mut buffer);
        assert_eq!(&buffer[..], b"*1\r\n$4\r\nPI");
        assert_eq!(parser.parse(&buffer), Ok(ParseStatus::Incomplete));
    }

    #[test]
    fn test_consume_without_parse_is_noop() {
        let mut parser = RespParser::new();
        let mut buffer = BytesMut::from(&b"*1\r\n"[..]);
        parser.consume(&mut buffer);
        assert_eq!(buffer.len(), 4);
    }

    #[test]
    fn test_letter_in_length_is_sticky() {
        let mut parser = RespParser::new();
        let err = parser.parse(b"*1\r\n$3x\r\nGET\r\n").unwrap_err();
        assert_eq!(err, ProtocolError::InvalidLength(b'x'));
        assert!(parser.is_failed());

        // Valid bytes no longer help.
        assert_eq!(parser.parse(b"*1\r\n$4\r\nPING\r\n"), Err(err.clone()));
        assert_eq!(parser.state(), &ParserState::Fatal(err));
    }

    #[test]
    fn test_wrong_array_prefix() {
        let mut parser = RespParser::new();
        assert_eq!(
            parser.parse(b"PING\r\n"),
            Err(ProtocolError::UnexpectedPrefix {
                expected: '*',
                found: b'P'
            })
        );
    }

    #[test]
    fn test_wrong_bulk_prefix() {
        let mut parser = RespParser::new();
        assert_eq!(
            parser.parse(b"*1\r\n+PING\r\n"),
            Err(ProtocolError::UnexpectedPrefix {
                expected: '$',
                found: b'+'
            })
        );
    }

    #[test]
    fn test_signed_lengths_are_rejected() {
        let mut parser = RespParser::new();
        assert_eq!(
            parser.parse(b"*-1\r\n"),
            Err(ProtocolError::InvalidLength(b'-'))
        );
        let mut parser = RespParser::new();
        assert_eq!(
            parser.parse(b"*+1\r\n"),
            Err(ProtocolError::InvalidLength(b'+'))
        );
    }

    #[test]
    fn test_empty_length_is_malformed() {
        let mut parser = RespParser::new();
        assert_eq!(
            parser.parse(b"*\r\n"),
            Err(ProtocolError::InvalidLength(b'\r'))
        );
    }

    #[test]
    fn test_cr_without_lf_is_malformed() {
        let mut parser = RespParser::new();
        assert_eq!(
            parser.parse(b"*1\rX"),
            Err(ProtocolError::InvalidLength(b'X'))
        );
    }

    #[test]
    fn test_truncated_at_terminator_is_incomplete() {
        let mut parser = RespParser::new();
        assert_eq!(parser.parse(b"*12\r"), Ok(ParseStatus::Incomplete));
        assert_eq!(parser.parse(b"*1\r\n$3\r"), Ok(ParseStatus::Incomplete));
    }

    #[test]
    fn test_length_overflow() {
        let mut parser = RespParser::new();
        let buffer = format!("*1\r\n${}0\r\n", usize::MAX);
        assert_eq!(
            parser.parse(buffer.as_bytes()),
            Err(ProtocolError::LengthOverflow)
        );
    }

    #[test]
    fn test_missing_bulk_terminator() {
        let mut parser = RespParser::new();
        assert_eq!(
            parser.parse(b"*1\r\n$4\r\nPINGxx"),
            Err(ProtocolError::MissingTerminator)
        );
    }

    #[test]
    fn test_huge_array_count_is_incomplete_not_allocated() {
        let mut parser = RespParser::new();
        assert_eq!(
            parser.parse(b"*99999999999\r\n$4\r\nPING\r\n"),
            Ok(ParseStatus::Incomplete)
        );
    }

    #[test]
    fn test_reset_clears_fatal_state() {
        let mut parser = RespParser::new();
        assert!(parser.parse(b"?").is_err());
        parser.reset();
        assert_eq!(parser.parse(b"*1\r\n$4\r\nPING\r\n"), Ok(ParseStatus::Complete));
    }
}
