/*
 * request.rs
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

//! HTTP request method and the HTTP/1.1 request head written to the wire.

use std::fmt;
use std::io;
use std::str::FromStr;

use crate::http::error::Error;

/// Request methods the executor accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        }
    }

    /// POST, PUT and DELETE write a request body.
    pub fn sends_body(&self) -> bool {
        !matches!(self, Method::Get)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive.
impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        [Method::Get, Method::Post, Method::Put, Method::Delete]
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnsupportedMethod(s.to_string()))
    }
}

/// Request line and headers for one exchange.
pub(crate) struct RequestHead<'a> {
    pub method: Method,
    /// Path plus query, e.g. `/search?q=x`.
    pub target: &'a str,
    pub host: &'a str,
    pub port: u16,
    pub properties: &'a [(String, String)],
    /// Body length for methods that send one.
    pub content_length: Option<usize>,
}

impl RequestHead<'_> {
    fn has_property(&self, name: &str) -> bool {
        self.properties
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Serialize the head. Caller-supplied properties go out in insertion order and
    /// take precedence over the defaults for Host and Content-Length. A property whose name is
    /// not an HTTP token, or whose value contains CR, LF or NUL, is `InvalidInput`.
    pub fn encode(&self) -> io::Result<String> {
        let mut req = format!("{} {} HTTP/1.1\r\n", self.method.as_str(), self.target);
        if !self.has_property("Host") {
            if self.port == 443 {
                req.push_str(&format!("Host: {}\r\n", self.host));
            } else {
                req.push_str(&format!("Host: {}:{}\r\n", self.host, self.port));
            }
        }
        for (k, v) in self.properties {
            check_property(k, v)?;
            req.push_str(k);
            req.push_str(": ");
            req.push_str(v);
            req.push_str("\r\n");
        }
        if let Some(len) = self.content_length {
            if !self.has_property("Content-Length") {
                req.push_str(&format!("Content-Length: {}\r\n", len));
            }
        }
        req.push_str("Connection: close\r\n\r\n");
        Ok(req)
    }
}

fn is_token_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b)
}

fn check_property(name: &str, value: &str) -> io::Result<()> {
    if name.is_empty() || !name.bytes().all(is_token_byte) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid request property name {:?}", name),
        ));
    }
    if value.bytes().any(|b| matches!(b, b'\r' | b'\n' | 0)) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("invalid value for request property {}", name),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_parse_ignores_case() {
        assert_eq!("get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("Post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("PUT".parse::<Method>().unwrap(), Method::Put);
        assert_eq!("delete".parse::<Method>().unwrap(), Method::Delete);
        match "PATCH".parse::<Method>() {
            Err(Error::UnsupportedMethod(m)) => assert_eq!(m, "PATCH"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn get_head_keeps_property_order() {
        let props = vec![
            ("X-B".to_string(), "2".to_string()),
            ("X-A".to_string(), "1".to_string()),
        ];
        let head = RequestHead {
            method: Method::Get,
            target: "/p?x=1",
            host: "example.com",
            port: 443,
            properties: &props,
            content_length: None,
        };
        assert_eq!(
            head.encode().unwrap(),
            "GET /p?x=1 HTTP/1.1\r\nHost: example.com\r\nX-B: 2\r\nX-A: 1\r\nConnection: close\r\n\r\n"
        );
    }

    #[test]
    fn post_head_has_length_and_port() {
        let props = vec![("Content-Type".to_string(), "text/plain".to_string())];
        let head = RequestHead {
            method: Method::Post,
            target: "/",
            host: "localhost",
            port: 8443,
            properties: &props,
            content_length: Some(0),
        };
        let encoded = head.encode().unwrap();
        assert!(encoded.starts_with("POST / HTTP/1.1\r\nHost: localhost:8443\r\n"));
        assert!(encoded.contains("Content-Length: 0\r\n"));
    }

    #[test]
    fn explicit_host_property_wins() {
        let props = vec![("host".to_string(), "virtual.example".to_string())];
        let head = RequestHead {
            method: Method::Delete,
            target: "/x",
            host: "10.0.0.1",
            port: 443,
            properties: &props,
            content_length: Some(3),
        };
        let encoded = head.encode().unwrap();
        assert_eq!(encoded.matches("ost: ").count(), 1);
        assert!(encoded.contains("host: virtual.example\r\n"));
    }

    fn get_head(props: &[(String, String)]) -> io::Result<String> {
        RequestHead {
            method: Method::Get,
            target: "/",
            host: "h",
            port: 443,
            properties: props,
            content_length: None,
        }
        .encode()
    }

    #[test]
    fn line_breaks_in_values_are_rejected() {
        for value in ["1\r\nX-Injected: evil", "1\nX", "1\rX", "a\0b"] {
            let props = vec![("X-A".to_string(), value.to_string())];
            let err = get_head(&props).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::InvalidInput, "{:?}", value);
        }
    }

    #[test]
    fn names_must_be_tokens() {
        for name in ["", "X A", "X:A", "X\r\nY", "Caf\u{e9}"] {
            let props = vec![(name.to_string(), "v".to_string())];
            assert!(get_head(&props).is_err(), "{:?}", name);
        }
        let props = vec![("X-Custom_1.a".to_string(), "tab\tand spaces ok".to_string())];
        assert!(get_head(&props).is_ok());
    }
}
