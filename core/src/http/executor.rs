/*
 * executor.rs
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

//! Request executor: one HTTPS exchange per call, with lifecycle hooks fired in order.
//!
//! Per execution: `Idle → Validating → Connecting → (Sending) → Reading → Done`, or `Failed`
//! from any of them. Nothing is retried. The response body is read line by line and the lines
//! are concatenated without separators; that text is the return value whatever the status code.
//!
//! An executor runs one request at a time (`execute` takes `&mut self`). Use one executor per
//! concurrent request.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::time::timeout;
use url::{Host, Url};

use crate::http::error::{Error, ErrorCode, Result};
use crate::http::h1::{H1Events, ParseState, ResponseParser};
use crate::http::lines::LineSplitter;
use crate::http::listener::ResponseListener;
use crate::http::request::{Method, RequestHead};
use crate::net::{self, TlsConfig};
use crate::query::QueryBuilder;

const READ_CHUNK: usize = 8192;

/// Construction parameters. Everything is optional; a missing URL is reported at execution.
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    pub url: Option<String>,
    /// Request body for POST/PUT/DELETE. GET callers compose the query into the URL.
    pub query: Option<String>,
    /// Request headers, sent in this order.
    pub properties: Vec<(String, String)>,
    /// Bound on TCP connect plus TLS handshake. None waits indefinitely.
    pub connect_timeout: Option<Duration>,
    /// Bound on each socket read. None waits indefinitely.
    pub read_timeout: Option<Duration>,
}

impl ExecutorConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.push((name.into(), value.into()));
        self
    }

    pub fn with_connect_timeout(mut self, limit: Duration) -> Self {
        self.connect_timeout = Some(limit);
        self
    }

    pub fn with_read_timeout(mut self, limit: Duration) -> Self {
        self.read_timeout = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionState {
    Idle,
    Validating,
    Connecting,
    Sending,
    Reading,
    Done,
    Failed,
}

pub struct RequestExecutor<L: ResponseListener> {
    url: Option<String>,
    query: Option<String>,
    properties: Vec<(String, String)>,
    query_builder: Option<QueryBuilder>,
    http_response: Option<String>,
    connect_timeout: Option<Duration>,
    read_timeout: Option<Duration>,
    tls: Arc<dyn TlsConfig>,
    listener: L,
    state: ExecutionState,
}

impl<L: ResponseListener> RequestExecutor<L> {
    /// Fires `on_set_query` then `on_set_url` with the configured values.
    pub fn new(config: ExecutorConfig, tls: Arc<dyn TlsConfig>, listener: L) -> Self {
        let mut executor = Self {
            url: None,
            query: None,
            properties: config.properties,
            query_builder: None,
            http_response: None,
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
            tls,
            listener,
            state: ExecutionState::Idle,
        };
        executor.set_query(config.query);
        executor.assign_url(config.url);
        executor
    }

    /// URL is the builder's base URL and the query is its accumulated query string.
    pub fn from_query_builder(
        builder: QueryBuilder,
        properties: Vec<(String, String)>,
        tls: Arc<dyn TlsConfig>,
        listener: L,
    ) -> Self {
        let config = ExecutorConfig {
            url: Some(builder.base_url().to_string()),
            query: builder.query().map(str::to_string),
            properties,
            ..ExecutorConfig::default()
        };
        let mut executor = Self::new(config, tls, listener);
        executor.query_builder = Some(builder);
        executor
    }

    fn assign_url(&mut self, url: Option<String>) {
        self.url = url;
        self.listener.on_set_url(self.url.as_deref());
    }

    pub fn set_url(&mut self, url: impl Into<String>) {
        self.assign_url(Some(url.into()));
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn set_query(&mut self, query: Option<String>) {
        self.query = query;
        self.listener.on_set_query(self.query.as_deref());
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Same as `query()`.
    pub fn params(&self) -> Option<&str> {
        self.query()
    }

    /// Same as `query()`.
    pub fn sent_query(&self) -> Option<&str> {
        self.query()
    }

    pub fn set_request_properties(&mut self, properties: Vec<(String, String)>) {
        self.properties = properties;
    }

    /// Set one header. An existing entry with the same name (ignoring case) is replaced in place.
    pub fn set_request_property(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .properties
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            Some(entry) => *entry = (name, value),
            None => self.properties.push((name, value)),
        }
    }

    pub fn request_properties(&self) -> &[(String, String)] {
        &self.properties
    }

    pub fn query_builder(&self) -> Option<&QueryBuilder> {
        self.query_builder.as_ref()
    }

    /// Text returned by the last successful execution.
    pub fn http_response(&self) -> Option<&str> {
        self.http_response.as_deref()
    }

    pub fn set_http_response(&mut self, response: Option<String>) {
        self.http_response = response;
    }

    pub fn set_tls_config(&mut self, tls: Arc<dyn TlsConfig>) {
        self.tls = tls;
    }

    pub fn state(&self) -> ExecutionState {
        self.state
    }

    pub fn listener(&self) -> &L {
        &self.listener
    }

    pub fn listener_mut(&mut self) -> &mut L {
        &mut self.listener
    }

    pub fn into_listener(self) -> L {
        self.listener
    }

    fn transition(&mut self, next: ExecutionState) {
        log::debug!("[http] {:?} -> {:?}", self.state, next);
        self.state = next;
        self.listener.on_state_change(next);
    }

    pub async fn get(&mut self) -> Result<String> {
        self.execute(Method::Get.as_str()).await
    }

    pub async fn post(&mut self) -> Result<String> {
        self.execute(Method::Post.as_str()).await
    }

    pub async fn put(&mut self) -> Result<String> {
        self.execute(Method::Put.as_str()).await
    }

    pub async fn delete(&mut self) -> Result<String> {
        self.execute(Method::Delete.as_str()).await
    }

    /// Run one exchange with `method` (GET, POST, PUT or DELETE, any case) and return the
    /// concatenated response lines.
    pub async fn execute(&mut self, method: &str) -> Result<String> {
        self.transition(ExecutionState::Validating);
        let url = match self.url.clone().filter(|u| !u.is_empty()) {
            Some(u) => u,
            None => return Err(self.reject(ErrorCode::EmptyUrl, Error::EmptyUrl)),
        };
        if !self.listener.is_valid_url(&url) {
            return Err(self.reject(ErrorCode::InvalidUrl, Error::InvalidUrl(url)));
        }

        self.listener.on_start();

        match self.exchange(method, &url).await {
            Ok(text) => {
                self.http_response = Some(text.clone());
                self.listener.on_finished_reading_response(&text);
                self.listener.on_finish();
                self.transition(ExecutionState::Done);
                Ok(text)
            }
            Err(e) => {
                log::debug!("[http] {} {} failed: {}", method, url, e);
                self.transition(ExecutionState::Failed);
                Err(e)
            }
        }
    }

    fn reject(&mut self, code: ErrorCode, error: Error) -> Error {
        log::warn!("[http] rejected before connect: {}", error);
        self.listener.on_connection_error(code);
        self.transition(ExecutionState::Failed);
        error
    }

    async fn exchange(&mut self, method: &str, url: &str) -> Result<String> {
        let method: Method = method.parse()?;
        self.transition(ExecutionState::Connecting);

        let target = Target::parse(url)?;
        let body = self.query.clone().filter(|_| method.sends_body());
        let head = RequestHead {
            method,
            target: &target.request_target,
            host: &target.authority_host,
            port: target.port,
            properties: &self.properties,
            content_length: method
                .sends_body()
                .then(|| body.as_ref().map_or(0, String::len)),
        }
        .encode()?;

        let config = net::client_config(self.tls.as_ref())?;
        let mut stream =
            net::connect_tls(&target.host, target.port, config, self.connect_timeout).await?;
        log::debug!("[http] connected to {}:{}", target.host, target.port);
        stream.write_all(head.as_bytes()).await?;

        if method.sends_body() {
            self.transition(ExecutionState::Sending);
            if let Some(body) = body {
                stream.write_all(body.as_bytes()).await?;
                stream.flush().await?;
                self.listener.on_send_query();
            }
        }
        stream.flush().await?;

        self.transition(ExecutionState::Reading);
        let text = read_response(&mut stream, &mut self.listener, self.read_timeout).await?;
        log::debug!("[http] {} {} read {} bytes of text", method, url, text.len());
        Ok(text)
    }
}

/// Host, port and request-target of an https URL.
#[derive(Debug)]
struct Target {
    /// Host to connect to and verify; IPv6 without brackets.
    host: String,
    /// Host as written in the URL, for the Host header.
    authority_host: String,
    port: u16,
    request_target: String,
}

impl Target {
    fn parse(url: &str) -> io::Result<Self> {
        let parsed = Url::parse(url).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("malformed URL {}: {}", url, e),
            )
        })?;
        if parsed.scheme() != "https" {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("unsupported scheme {} (https only)", parsed.scheme()),
            ));
        }
        let host = match parsed.host() {
            Some(Host::Domain(d)) => d.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("URL has no host: {}", url),
                ))
            }
        };
        let mut request_target = parsed.path().to_string();
        if let Some(q) = parsed.query() {
            request_target.push('?');
            request_target.push_str(q);
        }
        let authority_host = parsed.host_str().unwrap_or(&host).to_string();
        Ok(Self {
            host,
            authority_host,
            port: parsed.port_or_known_default().unwrap_or(443),
            request_target,
        })
    }
}

/// Bridges parser events to the listener: status and headers are collected, body bytes are
/// split into lines and accumulated.
struct Driver<'a, L: ResponseListener> {
    listener: &'a mut L,
    status: Option<u16>,
    headers: Vec<(String, String)>,
    lines: LineSplitter,
    accumulated: String,
}

impl<L: ResponseListener> Driver<'_, L> {
    fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

impl<L: ResponseListener> H1Events for Driver<'_, L> {
    fn status(&mut self, code: u16, _reason: Option<&str>) {
        self.status = Some(code);
    }

    fn header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }

    fn body_chunk(&mut self, data: &[u8]) {
        let Self {
            listener,
            lines,
            accumulated,
            ..
        } = self;
        lines.push(data, |line| {
            log::trace!("[http] line: {}", line);
            listener.on_read_response(&line);
            accumulated.push_str(&line);
            listener.on_append_response(accumulated.as_str());
        });
    }

    fn trailer(&mut self, name: &str, value: &str) {
        log::trace!("[http] trailer {}: {}", name, value);
    }

    fn end_body(&mut self) {
        let Self {
            listener,
            lines,
            accumulated,
            ..
        } = self;
        lines.finish(|line| {
            listener.on_read_response(&line);
            accumulated.push_str(&line);
            listener.on_append_response(accumulated.as_str());
        });
    }
}

async fn read_some<S: AsyncRead + Unpin>(
    stream: &mut S,
    buf: &mut [u8],
    limit: Option<Duration>,
) -> io::Result<usize> {
    match limit {
        Some(limit) => timeout(limit, stream.read(buf))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "read timed out"))?,
        None => stream.read(buf).await,
    }
}

/// Read one response: `on_connect(status)` and `on_receive_response()` once the final head is
/// parsed, then one `on_read_response` / `on_append_response` pair per body line. Interim 1xx
/// responses (other than 101) fire nothing.
async fn read_response<S, L>(
    stream: &mut S,
    listener: &mut L,
    read_timeout: Option<Duration>,
) -> io::Result<String>
where
    S: AsyncRead + Unpin,
    L: ResponseListener,
{
    let mut parser = ResponseParser::new();
    let mut buf = BytesMut::with_capacity(READ_CHUNK);
    let mut tmp = [0u8; READ_CHUNK];
    let mut driver = Driver {
        listener,
        status: None,
        headers: Vec::new(),
        lines: LineSplitter::new(),
        accumulated: String::new(),
    };

    loop {
        let n = match read_some(stream, &mut tmp, read_timeout).await {
            Ok(n) => n,
            // Peer closed without close_notify; acceptable only for a close-delimited body.
            Err(e)
                if e.kind() == io::ErrorKind::UnexpectedEof
                    && parser.state() == ParseState::UntilClose =>
            {
                0
            }
            Err(e) => return Err(e),
        };
        if n == 0 {
            parser.finish(&mut driver)?;
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
        parser.receive(&mut buf, &mut driver)?;

        while parser.state() == ParseState::HeadersComplete {
            let status = driver.status.unwrap_or(0);
            // Interim 1xx heads are skipped; the final response follows on the same stream.
            if (100..200).contains(&status) && status != 101 {
                log::debug!("[http] interim status {}", status);
                driver.status = None;
                driver.headers.clear();
                parser.expect_final_response();
                parser.receive(&mut buf, &mut driver)?;
                continue;
            }
            let chunked = driver
                .header_value("Transfer-Encoding")
                .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"));
            let content_length = if status == 204 || status == 304 {
                Some(0)
            } else {
                driver
                    .header_value("Content-Length")
                    .and_then(|v| v.trim().parse::<u64>().ok())
            };
            log::debug!(
                "[http] status {} (content-length {:?}, chunked {})",
                status,
                content_length,
                chunked
            );
            driver.listener.on_connect(status);
            driver.listener.on_receive_response();
            parser.set_body_mode(content_length, chunked, &mut driver);
            parser.receive(&mut buf, &mut driver)?;
        }

        if parser.is_done() {
            break;
        }
    }
    Ok(driver.accumulated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Events(Vec<String>);

    impl ResponseListener for Events {
        fn on_connect(&mut self, status_code: u16) {
            self.0.push(format!("connect {}", status_code));
        }
        fn on_receive_response(&mut self) {
            self.0.push("receive".to_string());
        }
        fn on_read_response(&mut self, line: &str) {
            self.0.push(format!("read {}", line));
        }
        fn on_append_response(&mut self, accumulated: &str) {
            self.0.push(format!("append {}", accumulated));
        }
    }

    async fn read_bytes(wire: &[u8]) -> (io::Result<String>, Vec<String>) {
        let mut events = Events::default();
        let mut stream = wire;
        let result = read_response(&mut stream, &mut events, None).await;
        (result, events.0)
    }

    #[tokio::test]
    async fn lines_are_concatenated_without_separators() {
        let (text, events) =
            read_bytes(b"HTTP/1.1 200 OK\r\nContent-Length: 6\r\n\r\na\nb\r\nc").await;
        assert_eq!(text.unwrap(), "abc");
        assert_eq!(
            events,
            vec![
                "connect 200",
                "receive",
                "read a",
                "append a",
                "read b",
                "append ab",
                "read c",
                "append abc",
            ]
        );
    }

    #[tokio::test]
    async fn error_status_body_is_still_returned() {
        let (text, events) = read_bytes(
            b"HTTP/1.1 500 Internal Server Error\r\nTransfer-Encoding: chunked\r\n\r\n4\r\nboom\r\n0\r\n\r\n",
        )
        .await;
        assert_eq!(text.unwrap(), "boom");
        assert_eq!(events[0], "connect 500");
    }

    #[tokio::test]
    async fn no_content_has_no_lines() {
        let (text, events) = read_bytes(b"HTTP/1.1 204 No Content\r\n\r\n").await;
        assert_eq!(text.unwrap(), "");
        assert_eq!(events, vec!["connect 204", "receive"]);
    }

    #[tokio::test]
    async fn close_delimited_body() {
        let (text, _) = read_bytes(b"HTTP/1.0 200 OK\r\n\r\nline one\nline two").await;
        assert_eq!(text.unwrap(), "line oneline two");
    }

    #[tokio::test]
    async fn truncated_response_is_transport_error() {
        let (text, _) = read_bytes(b"HTTP/1.1 200 OK\r\nContent-Length: 50\r\n\r\nshort").await;
        assert_eq!(text.unwrap_err().kind(), io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn interim_responses_are_skipped() {
        let (text, events) = read_bytes(
            b"HTTP/1.1 100 Continue\r\n\r\nHTTP/1.1 103 Early Hints\r\nLink: </a.css>\r\n\r\nHTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok",
        )
        .await;
        assert_eq!(text.unwrap(), "ok");
        assert_eq!(events, vec!["connect 200", "receive", "read ok", "append ok"]);
    }

    #[tokio::test]
    async fn stream_ending_after_interim_response_is_truncation() {
        let (text, events) = read_bytes(b"HTTP/1.1 100 Continue\r\n\r\n").await;
        assert_eq!(text.unwrap_err().kind(), io::ErrorKind::UnexpectedEof);
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn unterminated_head_is_rejected() {
        let mut wire = b"HTTP/1.1 200 OK\r\nX-Big: ".to_vec();
        wire.resize(wire.len() + 2 * crate::http::h1::MAX_HEAD_BYTES, b'a');
        let (text, events) = read_bytes(&wire).await;
        assert_eq!(text.unwrap_err().kind(), io::ErrorKind::InvalidData);
        assert!(events.is_empty());
    }

    #[test]
    fn target_parsing() {
        let t = Target::parse("https://example.com/a/b?x=1&y=2").unwrap();
        assert_eq!(t.host, "example.com");
        assert_eq!(t.port, 443);
        assert_eq!(t.request_target, "/a/b?x=1&y=2");

        let t = Target::parse("https://[::1]:8443").unwrap();
        assert_eq!(t.host, "::1");
        assert_eq!(t.authority_host, "[::1]");
        assert_eq!(t.port, 8443);
        assert_eq!(t.request_target, "/");

        let err = Target::parse("http://example.com").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        assert!(Target::parse("::not a url::").is_err());
    }
}
