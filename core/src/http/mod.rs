/*
 * mod.rs
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

//! HTTPS request executor with lifecycle hooks.
//!
//! - `RequestExecutor` performs one GET/POST/PUT/DELETE exchange per call over rustls and
//!   reports progress to a `ResponseListener`.
//! - HTTP/1.1 only, one connection per request (`Connection: close`), no redirects.
//! - The response body is pushed through `h1::ResponseParser`, split into lines, and the lines
//!   concatenated without separators.

mod error;
mod executor;
mod lines;
mod listener;
mod request;

pub mod h1;

pub use error::{Error, ErrorCode, Result};
pub use executor::{ExecutionState, ExecutorConfig, RequestExecutor};
pub use lines::LineSplitter;
pub use listener::{is_https_url, NoopListener, ResponseListener, ResultContext};
pub use request::Method;
