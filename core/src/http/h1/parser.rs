/*
 * parser.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Lifeline, a lifecycle-instrumented HTTPS client library.
 *
 * Lifeline is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Lifeline is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Lifeline.  If not, see <http://www.gnu.org/licenses/>.
 */

//! HTTP/1.1 response push parser: status line, headers, then a body framed by
//! Content-Length, chunked transfer-encoding, or connection close.

use bytes::Buf;
use bytes::BytesMut;
use std::io;

/// Events produced while parsing one response. The executor's driver implements this.
pub trait H1Events {
    fn status(&mut self, code: u16, reason: Option<&str>);
    fn header(&mut self, name: &str, value: &str);
    fn body_chunk(&mut self, data: &[u8]);
    fn trailer(&mut self, name: &str, value: &str);
    fn end_body(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    StatusLine,
    Headers,
    /// Head parsed; the caller must pick a framing with `set_body_mode` before feeding more.
    HeadersComplete,
    /// Fixed-length body; `remaining` bytes still expected.
    Body { remaining: u64 },
    /// Body delimited by connection close.
    UntilClose,
    ChunkSize,
    ChunkData { remaining: u64 },
    ChunkDataEnd,
    ChunkTrailer,
    Done,
}

/// Upper bound on the bytes of status line plus header lines, interim heads included. Trailers
/// and each chunk-size line are held to the same bound.
pub const MAX_HEAD_BYTES: usize = 64 * 1024;

/// Push parser for a single HTTP/1.1 response.
pub struct ResponseParser {
    state: ParseState,
    head_bytes: usize,
    /// Bytes of `buf` already searched for CRLF without success.
    scanned: usize,
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::StatusLine,
            head_bytes: 0,
            scanned: 0,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    /// After an interim (1xx) head: parse the next status line on the same stream.
    pub fn expect_final_response(&mut self) {
        if self.state == ParseState::HeadersComplete {
            self.state = ParseState::StatusLine;
        }
    }

    /// Split off one CRLF-terminated line (without the CRLF), or None when incomplete.
    /// `head` lines count toward `MAX_HEAD_BYTES` cumulatively; others are bounded singly.
    fn take_line(
        &mut self,
        buf: &mut BytesMut,
        what: &'static str,
        head: bool,
    ) -> io::Result<Option<String>> {
        let budget = if head {
            MAX_HEAD_BYTES.saturating_sub(self.head_bytes)
        } else {
            MAX_HEAD_BYTES
        };
        let from = self.scanned.saturating_sub(1).min(buf.len());
        let end = match buf[from..].windows(2).position(|w| w == b"\r\n") {
            Some(n) => from + n,
            None => {
                if buf.len() > budget {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("{}: exceeds {} bytes", what, MAX_HEAD_BYTES),
                    ));
                }
                self.scanned = buf.len();
                return Ok(None);
            }
        };
        if end + 2 > budget {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("{}: exceeds {} bytes", what, MAX_HEAD_BYTES),
            ));
        }
        self.scanned = 0;
        if head {
            self.head_bytes += end + 2;
        }
        let line = buf.split_to(end + 2);
        let text = std::str::from_utf8(&line[..end])
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, what))?;
        Ok(Some(text.to_string()))
    }

    fn split_field(line: &str) -> Option<(&str, &str)> {
        let colon = line.find(':')?;
        Some((line[..colon].trim(), line[colon + 1..].trim()))
    }

    /// Consume as much of `buf` as can be parsed. Incomplete input stays in `buf`.
    pub fn receive<H: H1Events>(&mut self, buf: &mut BytesMut, events: &mut H) -> io::Result<()> {
        while !buf.is_empty() {
            match self.state {
                ParseState::StatusLine => {
                    let line = match self.take_line(buf, "invalid status line", true)? {
                        Some(l) => l,
                        None => return Ok(()),
                    };
                    // HTTP/1.1 200 OK, or HTTP/1.1 200
                    let mut parts = line.splitn(3, ' ');
                    let version = parts.next().unwrap_or("");
                    if !version.starts_with("HTTP/") {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("malformed status line: {}", line),
                        ));
                    }
                    let code = parts
                        .next()
                        .and_then(|s| s.parse::<u16>().ok())
                        .ok_or_else(|| {
                            io::Error::new(io::ErrorKind::InvalidData, "missing status code")
                        })?;
                    events.status(code, parts.next());
                    self.state = ParseState::Headers;
                }
                ParseState::Headers => {
                    let line = match self.take_line(buf, "invalid header", true)? {
                        Some(l) => l,
                        None => return Ok(()),
                    };
                    if line.is_empty() {
                        self.state = ParseState::HeadersComplete;
                        return Ok(());
                    }
                    if let Some((name, value)) = Self::split_field(&line) {
                        events.header(name, value);
                    }
                }
                ParseState::HeadersComplete | ParseState::Done => return Ok(()),
                ParseState::Body { remaining } => {
                    let n = (remaining.min(buf.len() as u64)) as usize;
                    let chunk = buf.split_to(n);
                    events.body_chunk(&chunk);
                    let remaining = remaining - n as u64;
                    if remaining == 0 {
                        events.end_body();
                        self.state = ParseState::Done;
                    } else {
                        self.state = ParseState::Body { remaining };
                    }
                }
                ParseState::UntilClose => {
                    let chunk = buf.split();
                    events.body_chunk(&chunk);
                }
                ParseState::ChunkSize => {
                    let line = match self.take_line(buf, "invalid chunk size", false)? {
                        Some(l) => l,
                        None => return Ok(()),
                    };
                    let hex = line.split(';').next().unwrap_or("").trim();
                    let size = u64::from_str_radix(hex, 16).map_err(|_| {
                        io::Error::new(
                            io::ErrorKind::InvalidData,
                            format!("bad chunk size: {}", hex),
                        )
                    })?;
                    self.state = if size == 0 {
                        ParseState::ChunkTrailer
                    } else {
                        ParseState::ChunkData { remaining: size }
                    };
                }
                ParseState::ChunkData { remaining } => {
                    let n = (remaining.min(buf.len() as u64)) as usize;
                    let chunk = buf.split_to(n);
                    events.body_chunk(&chunk);
                    let remaining = remaining - n as u64;
                    self.state = if remaining == 0 {
                        ParseState::ChunkDataEnd
                    } else {
                        ParseState::ChunkData { remaining }
                    };
                }
                ParseState::ChunkDataEnd => {
                    if buf.len() < 2 {
                        return Ok(());
                    }
                    if &buf[..2] != b"\r\n" {
                        return Err(io::Error::new(
                            io::ErrorKind::InvalidData,
                            "chunk not terminated by CRLF",
                        ));
                    }
                    buf.advance(2);
                    self.state = ParseState::ChunkSize;
                }
                ParseState::ChunkTrailer => {
                    let line = match self.take_line(buf, "invalid trailer", true)? {
                        Some(l) => l,
                        None => return Ok(()),
                    };
                    if line.is_empty() {
                        events.end_body();
                        self.state = ParseState::Done;
                    } else if let Some((name, value)) = Self::split_field(&line) {
                        events.trailer(name, value);
                    }
                }
            }
        }
        Ok(())
    }

    /// Choose body framing once the head is parsed. `content_length == Some(0)` completes immediately.
    pub fn set_body_mode<H: H1Events>(
        &mut self,
        content_length: Option<u64>,
        chunked: bool,
        events: &mut H,
    ) {
        if self.state != ParseState::HeadersComplete {
            return;
        }
        self.state = if chunked {
            ParseState::ChunkSize
        } else {
            match content_length {
                Some(0) => {
                    events.end_body();
                    ParseState::Done
                }
                Some(n) => ParseState::Body { remaining: n },
                None => ParseState::UntilClose,
            }
        };
    }

    /// The peer closed the connection. Completes a close-delimited body; anything else is truncation.
    pub fn finish<H: H1Events>(&mut self, events: &mut H) -> io::Result<()> {
        match self.state {
            ParseState::Done => Ok(()),
            ParseState::UntilClose => {
                events.end_body();
                self.state = ParseState::Done;
                Ok(())
            }
            state => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("connection closed mid-response ({:?})", state),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        status: Option<(u16, Option<String>)>,
        headers: Vec<(String, String)>,
        trailers: Vec<(String, String)>,
        body: Vec<u8>,
        ended: bool,
    }

    impl H1Events for Recorder {
        fn status(&mut self, code: u16, reason: Option<&str>) {
            self.status = Some((code, reason.map(str::to_string)));
        }
        fn header(&mut self, name: &str, value: &str) {
            self.headers.push((name.to_string(), value.to_string()));
        }
        fn body_chunk(&mut self, data: &[u8]) {
            self.body.extend_from_slice(data);
        }
        fn trailer(&mut self, name: &str, value: &str) {
            self.trailers.push((name.to_string(), value.to_string()));
        }
        fn end_body(&mut self) {
            self.ended = true;
        }
    }

    #[test]
    fn content_length_body_split_across_reads() {
        let mut parser = ResponseParser::new();
        let mut rec = Recorder::default();
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 5\r\n\r\nhe"[..]);
        parser.receive(&mut buf, &mut rec).unwrap();
        assert_eq!(parser.state(), ParseState::HeadersComplete);
        assert_eq!(rec.status, Some((200, Some("OK".to_string()))));
        parser.set_body_mode(Some(5), false, &mut rec);
        parser.receive(&mut buf, &mut rec).unwrap();
        assert!(!rec.ended);
        buf.extend_from_slice(b"llo");
        parser.receive(&mut buf, &mut rec).unwrap();
        assert!(parser.is_done());
        assert_eq!(rec.body, b"hello");
        assert!(rec.ended);
    }

    #[test]
    fn chunked_body_with_trailer() {
        let mut parser = ResponseParser::new();
        let mut rec = Recorder::default();
        let mut buf = BytesMut::from(&b"HTTP/1.1 404 Not Found\r\nTransfer-Encoding: chunked\r\n\r\n"[..]);
        parser.receive(&mut buf, &mut rec).unwrap();
        parser.set_body_mode(None, true, &mut rec);
        buf.extend_from_slice(b"3;ext=1\r\nabc\r\n2\r\nde\r\n0\r\nX-Sum: 5\r\n\r\n");
        parser.receive(&mut buf, &mut rec).unwrap();
        assert!(parser.is_done());
        assert_eq!(rec.status.as_ref().map(|s| s.0), Some(404));
        assert_eq!(rec.body, b"abcde");
        assert_eq!(rec.trailers, vec![("X-Sum".to_string(), "5".to_string())]);
    }

    #[test]
    fn close_delimited_body_ends_on_finish() {
        let mut parser = ResponseParser::new();
        let mut rec = Recorder::default();
        let mut buf = BytesMut::from(&b"HTTP/1.0 200\r\nX-A: b\r\n\r\nsome"[..]);
        parser.receive(&mut buf, &mut rec).unwrap();
        assert_eq!(rec.status, Some((200, None)));
        parser.set_body_mode(None, false, &mut rec);
        parser.receive(&mut buf, &mut rec).unwrap();
        buf.extend_from_slice(b" more");
        parser.receive(&mut buf, &mut rec).unwrap();
        parser.finish(&mut rec).unwrap();
        assert_eq!(rec.body, b"some more");
        assert_eq!(rec.headers, vec![("X-A".to_string(), "b".to_string())]);
        assert!(rec.ended);
    }

    #[test]
    fn truncated_fixed_length_body_is_an_error() {
        let mut parser = ResponseParser::new();
        let mut rec = Recorder::default();
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\nabc"[..]);
        parser.receive(&mut buf, &mut rec).unwrap();
        parser.set_body_mode(Some(10), false, &mut rec);
        parser.receive(&mut buf, &mut rec).unwrap();
        let err = parser.finish(&mut rec).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn interim_head_then_final_head() {
        let mut parser = ResponseParser::new();
        let mut rec = Recorder::default();
        let mut buf = BytesMut::from(&b"HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 200 OK\r\n"[..]);
        parser.receive(&mut buf, &mut rec).unwrap();
        assert_eq!(parser.state(), ParseState::HeadersComplete);
        assert_eq!(rec.status.as_ref().map(|s| s.0), Some(100));
        parser.expect_final_response();
        parser.receive(&mut buf, &mut rec).unwrap();
        assert_eq!(parser.state(), ParseState::Headers);
        assert_eq!(rec.status.as_ref().map(|s| s.0), Some(200));
    }

    #[test]
    fn line_split_across_many_reads() {
        let mut parser = ResponseParser::new();
        let mut rec = Recorder::default();
        let mut buf = BytesMut::new();
        for piece in [&b"HTTP/1.1 2"[..], b"00 OK\r", b"\nX-A: 1\r", b"\n\r\n"] {
            buf.extend_from_slice(piece);
            parser.receive(&mut buf, &mut rec).unwrap();
        }
        assert_eq!(parser.state(), ParseState::HeadersComplete);
        assert_eq!(rec.status, Some((200, Some("OK".to_string()))));
        assert_eq!(rec.headers, vec![("X-A".to_string(), "1".to_string())]);
    }

    #[test]
    fn oversized_unterminated_line_rejected() {
        let mut parser = ResponseParser::new();
        let mut rec = Recorder::default();
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\nX-Big: "[..]);
        parser.receive(&mut buf, &mut rec).unwrap();
        buf.extend_from_slice(&vec![b'a'; MAX_HEAD_BYTES]);
        let err = parser.receive(&mut buf, &mut rec).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn many_header_lines_share_one_limit() {
        let mut parser = ResponseParser::new();
        let mut rec = Recorder::default();
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\n"[..]);
        let header = format!("X-Pad: {}\r\n", "p".repeat(1000));
        let mut result = Ok(());
        for _ in 0..(MAX_HEAD_BYTES / header.len() + 1) {
            buf.extend_from_slice(header.as_bytes());
            result = parser.receive(&mut buf, &mut rec);
            if result.is_err() {
                break;
            }
        }
        assert_eq!(result.unwrap_err().kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn garbage_status_line_rejected() {
        let mut parser = ResponseParser::new();
        let mut rec = Recorder::default();
        let mut buf = BytesMut::from(&b"SSH-2.0-OpenSSH\r\n"[..]);
        let err = parser.receive(&mut buf, &mut rec).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
