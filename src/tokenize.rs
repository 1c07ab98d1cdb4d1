//! Input filtering that runs ahead of the `csv` tokenizer
//!
//! The `csv` crate has no option to skip spaces at the start of a field, and
//! trimming its output afterwards is too late: a quote that follows the spaces is
//! not at the start of the field any more, so the tokenizer reads it literally and
//! splits on any separator inside it. [`SpaceSkipper`] instead drops those spaces
//! from the byte stream, tracking just enough of the CSV grammar to know where a
//! field starts.
use std::io::{self, Read};

use crate::serde_common::CsvSettings;

#[derive(Debug, Clone, Copy, PartialEq)]
enum State {
    /// At the start of a field, where spaces are dropped
    FieldStart,
    /// Inside an unquoted field
    Unquoted,
    /// Inside a quoted field
    Quoted,
    /// Just after the escape character inside a quoted field
    Escaped,
    /// Just after a quote inside a quoted field; either the closing quote or the first half of a doubled one
    QuoteInQuoted,
}

/// A reader that removes spaces at the start of every field, outside of quotes
pub(crate) struct SpaceSkipper<R> {
    inner: R,
    enabled: bool,
    separator: u8,
    quote: Option<u8>,
    escape: Option<u8>,
    terminator: u8,
    state: State,
}

impl<R: Read> SpaceSkipper<R> {
    /// Wrap `inner`. Bytes pass through untouched unless `settings` skips initial spaces.
    pub(crate) fn new(inner: R, settings: &CsvSettings) -> Self {
        Self {
            inner,
            enabled: settings.skip_initial_space,
            separator: settings.separator,
            quote: settings.quote,
            escape: settings.escape.filter(|&e| settings.quote != Some(e)),
            terminator: settings.terminator,
            state: State::FieldStart,
        }
    }

    fn ends_row(&self, b: u8) -> bool {
        if self.terminator == b'\n' || self.terminator == b'\r' {
            b == b'\n' || b == b'\r'
        } else {
            b == self.terminator
        }
    }

    /// Advance the state machine over `b` and say whether to keep it.
    fn keep(&mut self, b: u8) -> bool {
        let is_quote = self.quote == Some(b);
        let next = match self.state {
            State::FieldStart if b == b' ' => return false,
            State::FieldStart if is_quote => State::Quoted,
            State::FieldStart | State::Unquoted | State::QuoteInQuoted => {
                if b == self.separator || self.ends_row(b) {
                    State::FieldStart
                } else if self.state == State::QuoteInQuoted && is_quote {
                    State::Quoted
                } else {
                    State::Unquoted
                }
            },
            State::Quoted if is_quote => State::QuoteInQuoted,
            State::Quoted if self.escape == Some(b) => State::Escaped,
            State::Quoted => State::Quoted,
            State::Escaped => State::Quoted,
        };
        self.state = next;
        true
    }
}

impl<R: Read> Read for SpaceSkipper<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.inner.read(buf)?;
            if !self.enabled || n == 0 {
                return Ok(n);
            }

            let mut kept = 0;
            for i in 0..n {
                let b = buf[i];
                if self.keep(b) {
                    buf[kept] = b;
                    kept += 1;
                }
            }

            // returning 0 would signal the end of the input
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}
