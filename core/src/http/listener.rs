/*
 * listener.rs
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

//! Lifecycle hooks fired by `RequestExecutor`.
//!
//! Order for a successful exchange:
//! 1. `on_start()`
//! 2. `on_send_query()` (POST/PUT/DELETE with a body only)
//! 3. `on_connect(status)`
//! 4. `on_receive_response()`
//! 5. `on_read_response(line)` then `on_append_response(accumulated)`, once per line
//! 6. `on_finished_reading_response(text)`
//! 7. `on_finish()`
//!
//! `on_set_url` / `on_set_query` fire whenever the executor's URL or query is assigned.
//! `on_connection_error` fires for precondition failures (empty or rejected URL).
//! `on_state_change` fires on every `ExecutionState` transition during an execution.
//! The three `on_http_results_*` hooks are never called by the executor; they are there for the
//! caller to drive from its own status classification.

use url::Url;

use crate::http::error::ErrorCode;
use crate::http::executor::ExecutionState;

/// Opaque correlation identifiers a caller passes along with a classified result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultContext {
    pub client: String,
    pub action: String,
    pub intent: String,
    pub build: String,
}

impl ResultContext {
    pub fn new(
        client: impl Into<String>,
        action: impl Into<String>,
        intent: impl Into<String>,
        build: impl Into<String>,
    ) -> Self {
        Self {
            client: client.into(),
            action: action.into(),
            intent: intent.into(),
            build: build.into(),
        }
    }
}

/// Receiver of request lifecycle events. All hooks default to doing nothing.
#[allow(unused_variables)]
pub trait ResponseListener {
    /// URL policy checked before each execution. Any non-empty URL passes by default.
    fn is_valid_url(&self, url: &str) -> bool {
        true
    }

    fn on_set_url(&mut self, url: Option<&str>) {}

    fn on_set_query(&mut self, query: Option<&str>) {}

    fn on_start(&mut self) {}

    /// Response head received.
    fn on_connect(&mut self, status_code: u16) {}

    /// Body bytes written and flushed.
    fn on_send_query(&mut self) {}

    fn on_receive_response(&mut self) {}

    fn on_read_response(&mut self, line: &str) {}

    /// Running concatenation of every line read so far, without separators.
    fn on_append_response(&mut self, accumulated: &str) {}

    fn on_finished_reading_response(&mut self, response: &str) {}

    fn on_finish(&mut self) {}

    fn on_connection_error(&mut self, code: ErrorCode) {}

    fn on_state_change(&mut self, state: ExecutionState) {}

    fn on_http_results_failed(&mut self, result_text: &str, context: &ResultContext) {}

    fn on_http_results_successful(&mut self, result_text: &str, context: &ResultContext) {}

    fn on_http_results_ambiguous(&mut self, result_text: &str, context: &ResultContext) {}
}

impl<L: ResponseListener + ?Sized> ResponseListener for &mut L {
    fn is_valid_url(&self, url: &str) -> bool {
        (**self).is_valid_url(url)
    }
    fn on_set_url(&mut self, url: Option<&str>) {
        (**self).on_set_url(url)
    }
    fn on_set_query(&mut self, query: Option<&str>) {
        (**self).on_set_query(query)
    }
    fn on_start(&mut self) {
        (**self).on_start()
    }
    fn on_connect(&mut self, status_code: u16) {
        (**self).on_connect(status_code)
    }
    fn on_send_query(&mut self) {
        (**self).on_send_query()
    }
    fn on_receive_response(&mut self) {
        (**self).on_receive_response()
    }
    fn on_read_response(&mut self, line: &str) {
        (**self).on_read_response(line)
    }
    fn on_append_response(&mut self, accumulated: &str) {
        (**self).on_append_response(accumulated)
    }
    fn on_finished_reading_response(&mut self, response: &str) {
        (**self).on_finished_reading_response(response)
    }
    fn on_finish(&mut self) {
        (**self).on_finish()
    }
    fn on_connection_error(&mut self, code: ErrorCode) {
        (**self).on_connection_error(code)
    }
    fn on_state_change(&mut self, state: ExecutionState) {
        (**self).on_state_change(state)
    }
    fn on_http_results_failed(&mut self, result_text: &str, context: &ResultContext) {
        (**self).on_http_results_failed(result_text, context)
    }
    fn on_http_results_successful(&mut self, result_text: &str, context: &ResultContext) {
        (**self).on_http_results_successful(result_text, context)
    }
    fn on_http_results_ambiguous(&mut self, result_text: &str, context: &ResultContext) {
        (**self).on_http_results_ambiguous(result_text, context)
    }
}

/// Listener that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopListener;

impl ResponseListener for NoopListener {}

/// Stricter URL check for `is_valid_url` overrides: absolute `https` URL with a host.
pub fn is_https_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(u) => u.scheme() == "https" && u.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}
