/*
 * error.rs
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

//! Error taxonomy for request execution.
//!
//! `Error` is what `RequestExecutor::execute` returns. `ErrorCode` is the numeric code reported
//! through `ResponseListener::on_connection_error`; the executor itself only ever reports
//! `EmptyUrl` and `InvalidUrl`, the rest are for listeners to use.

use std::fmt;
use std::io;

/// Result of an execution.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No URL was set, or it was the empty string.
    #[error("URL cannot be empty")]
    EmptyUrl,

    /// The listener's `is_valid_url` policy rejected the URL.
    #[error("invalid URL [{0}]")]
    InvalidUrl(String),

    /// Method other than GET, POST, PUT or DELETE.
    #[error("unknown request method {0}")]
    UnsupportedMethod(String),

    /// Malformed URL, TLS, connect, write or read failure. Passed through unmodified.
    #[error(transparent)]
    Transport(#[from] io::Error),
}

impl Error {
    /// True for failures detected before any network activity.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::EmptyUrl | Error::InvalidUrl(_))
    }

    /// The code a listener would report for this failure.
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::EmptyUrl => ErrorCode::EmptyUrl,
            Error::InvalidUrl(_) => ErrorCode::InvalidUrl,
            Error::UnsupportedMethod(_) => ErrorCode::HttpError,
            Error::Transport(_) => ErrorCode::NetworkError,
        }
    }
}

/// Connection error codes with stable numeric values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum ErrorCode {
    HttpError = 1,
    EmptyUrl = 2,
    InvalidUrl = 3,
    NetworkError = 4,
    EmptyQuery = 5,
}

impl ErrorCode {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl TryFrom<i32> for ErrorCode {
    type Error = i32;

    fn try_from(value: i32) -> std::result::Result<Self, i32> {
        match value {
            1 => Ok(ErrorCode::HttpError),
            2 => Ok(ErrorCode::EmptyUrl),
            3 => Ok(ErrorCode::InvalidUrl),
            4 => Ok(ErrorCode::NetworkError),
            5 => Ok(ErrorCode::EmptyQuery),
            other => Err(other),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCode::HttpError => "HTTP_ERROR",
            ErrorCode::EmptyUrl => "EMPTY_URL",
            ErrorCode::InvalidUrl => "INVALID_URL",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::EmptyQuery => "EMPTY_QUERY",
        };
        write!(f, "{}({})", name, self.code())
    }
}
