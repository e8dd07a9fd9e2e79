/*
 * lib.rs
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

//! Lifeline core: lifecycle-instrumented HTTPS requests.
//!
//! Build a `RequestExecutor` from an `ExecutorConfig` (or a `QueryBuilder`), a `TlsConfig`
//! and a `ResponseListener`, then call `get`, `post`, `put` or `delete`. The listener sees every
//! step of the exchange; the call returns the response body lines joined without separators.

pub mod http;
pub mod net;
pub mod query;

pub use http::{
    Error, ErrorCode, ExecutionState, ExecutorConfig, Method, RequestExecutor, ResponseListener,
    ResultContext,
};
pub use net::{CertificateTrust, DefaultTlsConfig, HostnameVerification, HostnameVerifier, TlsConfig};
pub use query::QueryBuilder;
