/*
 * query.rs
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

//! Query string builder: ordered key=value pairs joined with `&`, appended to a base URL.
//!
//! `append` concatenates key and value verbatim; `append_encoded` percent-encodes them first.
//! Duplicate keys are kept in order.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Encode everything except RFC 3986 unreserved characters.
const QUERY_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryBuilder {
    base_url: String,
    query: Option<String>,
}

impl QueryBuilder {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            query: None,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Accumulated query, or None before the first append.
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Append `key=value` as given.
    pub fn append(&mut self, key: &str, value: &str) -> &mut Self {
        match &mut self.query {
            Some(q) => {
                q.push('&');
                q.push_str(key);
                q.push('=');
                q.push_str(value);
            }
            None => self.query = Some(format!("{}={}", key, value)),
        }
        self
    }

    /// Append with key and value percent-encoded.
    pub fn append_encoded(&mut self, key: &str, value: &str) -> &mut Self {
        let key = utf8_percent_encode(key, QUERY_COMPONENT).to_string();
        let value = utf8_percent_encode(value, QUERY_COMPONENT).to_string();
        self.append(&key, &value)
    }

    /// Finish a chain of appends.
    pub fn build(&mut self) -> &mut Self {
        self
    }

    /// `base_url?query`. With nothing appended the query part is empty.
    pub fn compose(&self) -> String {
        format!("{}?{}", self.base_url, self.query.as_deref().unwrap_or(""))
    }
}

/// The query string alone.
impl fmt::Display for QueryBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.query.as_deref().unwrap_or(""))
    }
}
