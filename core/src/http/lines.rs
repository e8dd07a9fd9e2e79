/*
 * lines.rs
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

//! Splits a response body into text lines as it streams in.
//!
//! A line ends at LF, CR, or CRLF (a CRLF pair split across two chunks counts once).
//! Terminators are dropped. Trailing bytes with no terminator form a final line at end of body;
//! an empty remainder produces no line. Lines are decoded as UTF-8, invalid sequences replaced.

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    /// Last byte seen was CR; a following LF belongs to the same terminator.
    SawCr,
}

pub struct LineSplitter {
    state: State,
    pending: Vec<u8>,
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self {
            state: State::Normal,
            pending: Vec::new(),
        }
    }
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit<F>(&mut self, out: &mut F)
    where
        F: FnMut(String),
    {
        let line = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        out(line);
    }

    /// Feed a chunk of body bytes; `out` is called once per completed line.
    pub fn push<F>(&mut self, chunk: &[u8], mut out: F)
    where
        F: FnMut(String),
    {
        for &b in chunk {
            if self.state == State::SawCr {
                self.state = State::Normal;
                if b == b'\n' {
                    continue;
                }
            }
            match b {
                b'\n' => self.emit(&mut out),
                b'\r' => {
                    self.emit(&mut out);
                    self.state = State::SawCr;
                }
                _ => self.pending.push(b),
            }
        }
    }

    /// End of body: flush an unterminated final line.
    pub fn finish<F>(&mut self, mut out: F)
    where
        F: FnMut(String),
    {
        if !self.pending.is_empty() {
            self.emit(&mut out);
        }
        self.state = State::Normal;
    }
}
