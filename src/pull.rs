// SPDX-License-Identifier: Apache-2.0

//! Single-token (event) parsing: one token per call, no token array.
//!
//! The caller owns the super stack: on [`SaxEvent::SaveSuper`] it pushes
//! the current `last_super` value, on [`SaxEvent::RestoreSuper`] it pops
//! and writes the restored value back. The parser re-reads the byte at
//! `last_super` to recover the enclosing container's kind, which is why
//! the input must not change between calls.

use crate::error::ParseError;
use crate::index::TokenIndex;
use crate::parser::{scan_number_run, Parser, State, IS_WHITESPACE, NUMBER_CHARS};
use crate::token::{Token, TokenKind};

/// Structural outcome of one [`Parser::parse_one`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaxEvent {
    /// A leaf token (primitive, string or key) was produced.
    OneTokenFound,
    /// A container was just opened; push the previous `last_super` on the
    /// caller-owned stack.
    SaveSuper,
    /// A container was just closed; pop the stack and write the restored
    /// value back into `last_super`.
    RestoreSuper,
    /// The outermost value is fully consumed.
    Finished,
}

/// Lifecycle tag carried in the token's `parent` slot during single-token
/// parsing.
#[repr(i8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaxState {
    Unknown = -1,
    EnteringObject = 0,
    LeavingObject = 1,
    EnteringArray = 2,
    LeavingArray = 3,
    HadKey = 4,
    HadValue = 5,
    DoneParsing = 6,
}

impl SaxState {
    /// Encodes the state into an index-typed `parent` slot.
    pub fn to_index<I: TokenIndex>(self) -> I {
        match self {
            SaxState::Unknown => I::INVALID,
            s => I::from_usize(s as i8 as usize),
        }
    }

    /// Decodes a `parent` slot written by `parse_one`.
    pub fn from_index<I: TokenIndex>(index: I) -> Self {
        if index.is_invalid() {
            return SaxState::Unknown;
        }
        match index.into_usize() {
            0 => SaxState::EnteringObject,
            1 => SaxState::LeavingObject,
            2 => SaxState::EnteringArray,
            3 => SaxState::LeavingArray,
            4 => SaxState::HadKey,
            5 => SaxState::HadValue,
            6 => SaxState::DoneParsing,
            _ => SaxState::Unknown,
        }
    }
}

impl<T: Token> Parser<T> {
    /// Parses a single token from the input, filling `token` and reporting
    /// the structural transition.
    ///
    /// `last_super` must be the invalid sentinel when starting; the parser
    /// keeps it pointing at the open container's brace byte, and the caller
    /// maintains the save/restore stack:
    ///
    /// ```
    /// use jsontok::{PackedToken, Parser, SaxEvent, TokenIndex};
    ///
    /// let input = b"{\"k\":[1,2]}";
    /// let mut parser = Parser::<PackedToken>::new();
    /// let mut token = PackedToken::default();
    /// let mut last_super = <i16 as TokenIndex>::INVALID;
    /// let mut stack = Vec::new();
    /// loop {
    ///     match parser.parse_one(input, &mut token, &mut last_super).unwrap() {
    ///         SaxEvent::SaveSuper => stack.push(last_super),
    ///         SaxEvent::RestoreSuper => {
    ///             stack.pop();
    ///             last_super = stack.last().copied().unwrap_or(-1);
    ///         }
    ///         SaxEvent::OneTokenFound => { /* use token */ }
    ///         SaxEvent::Finished => break,
    ///     }
    /// }
    /// ```
    ///
    /// In this mode the token's `parent` slot carries a [`SaxState`], the
    /// element count is never filled in, and container ids are written but
    /// not meaningful for aggregation. Bytes after the completed root value
    /// are ignored; the call after the last token reports
    /// [`SaxEvent::Finished`].
    pub fn parse_one(
        &mut self,
        input: &[u8],
        token: &mut T,
        last_super: &mut T::Index,
    ) -> Result<SaxEvent, ParseError> {
        if input.len() > T::Index::max_usize() {
            return self.remember(Err(ParseError::Invalid));
        }
        let len = input.len();
        loop {
            if self.state == State::Done {
                token.set_parent(SaxState::DoneParsing.to_index());
                return Ok(SaxEvent::Finished);
            }
            if self.state == State::ExpectComma && last_super.is_invalid() {
                // the root container closed on the previous call and the
                // caller's stack ran empty
                self.state = State::Done;
                continue;
            }
            let pos = self.pos.into_usize();
            if pos >= len {
                return self.remember(Err(ParseError::Starving));
            }
            let c = input[pos];
            if IS_WHITESPACE[c as usize] {
                self.pos = T::Index::from_usize(pos + 1);
                continue;
            }
            match c {
                b'{' | b'[' => {
                    if self.state != State::ExpectValue {
                        return self.sax_fail(pos);
                    }
                    let (kind, sax, next_state) = if c == b'{' {
                        (TokenKind::Object, SaxState::EnteringObject, State::ExpectKey)
                    } else {
                        (TokenKind::Array, SaxState::EnteringArray, State::ExpectValue)
                    };
                    let id = self.next_container_id();
                    token.init(
                        kind,
                        sax.to_index(),
                        T::Index::from_usize(pos),
                        T::Index::INVALID,
                        id,
                    );
                    *last_super = T::Index::from_usize(pos);
                    // member counter for the new container
                    self.next = T::Index::from_usize(0);
                    self.state = next_state;
                    self.pos = T::Index::from_usize(pos + 1);
                    return Ok(SaxEvent::SaveSuper);
                }
                b'}' | b']' => {
                    let open = match opening_brace(input, *last_super) {
                        Some(b) => b,
                        None => return self.sax_fail(pos),
                    };
                    let empty = self.next.into_usize() == 0;
                    let matches_kind =
                        (c == b'}' && open == b'{') || (c == b']' && open == b'[');
                    let closable = match self.state {
                        State::ExpectComma => true,
                        State::ExpectKey => c == b'}' && empty,
                        State::ExpectValue => c == b']' && empty,
                        _ => false,
                    };
                    if !matches_kind || !closable {
                        return self.sax_fail(pos);
                    }
                    let (kind, sax) = if c == b'}' {
                        (TokenKind::Object, SaxState::LeavingObject)
                    } else {
                        (TokenKind::Array, SaxState::LeavingArray)
                    };
                    token.init(kind, sax.to_index(), *last_super, T::Index::from_usize(pos + 1), 0);
                    self.pos = T::Index::from_usize(pos + 1);
                    // the enclosing container, whichever it is, now has at
                    // least the member we just closed
                    self.next = T::Index::from_usize(1);
                    self.state = State::ExpectComma;
                    return Ok(SaxEvent::RestoreSuper);
                }
                b',' => {
                    let open = match opening_brace(input, *last_super) {
                        Some(b) => b,
                        None => return self.sax_fail(pos),
                    };
                    if self.state != State::ExpectComma {
                        return self.sax_fail(pos);
                    }
                    self.state = if open == b'{' {
                        State::ExpectKey
                    } else {
                        State::ExpectValue
                    };
                    self.pos = T::Index::from_usize(pos + 1);
                }
                b':' => {
                    if self.state != State::ExpectColon {
                        return self.sax_fail(pos);
                    }
                    self.state = State::ExpectValue;
                    self.pos = T::Index::from_usize(pos + 1);
                }
                b'"' => {
                    let is_key = match self.state {
                        State::ExpectKey => true,
                        State::ExpectValue => false,
                        _ => return self.sax_fail(pos),
                    };
                    let scanned = self.scan_string(input, pos);
                    let (start, end) = match scanned {
                        Ok(range) => range,
                        Err(e) => return self.remember(Err(e)),
                    };
                    let (kind, sax) = if is_key {
                        (TokenKind::Key, SaxState::HadKey)
                    } else {
                        (TokenKind::String, SaxState::HadValue)
                    };
                    token.init(
                        kind,
                        sax.to_index(),
                        T::Index::from_usize(start),
                        T::Index::from_usize(end),
                        0,
                    );
                    self.count_member();
                    self.pos = T::Index::from_usize(end + 1);
                    if is_key {
                        self.state = State::ExpectColon;
                    } else {
                        self.finish_sax_value(*last_super);
                    }
                    return Ok(SaxEvent::OneTokenFound);
                }
                b't' | b'f' | b'n' => {
                    if self.state != State::ExpectValue {
                        return self.sax_fail(pos);
                    }
                    let (kind, literal): (TokenKind, &[u8]) = match c {
                        b't' => (TokenKind::True, b"true"),
                        b'f' => (TokenKind::False, b"false"),
                        _ => (TokenKind::Null, b"null"),
                    };
                    if let Err(e) = self.match_literal(input, pos, literal) {
                        return self.remember(Err(e));
                    }
                    token.init(
                        kind,
                        SaxState::HadValue.to_index(),
                        T::Index::from_usize(pos),
                        T::Index::from_usize(pos + literal.len()),
                        0,
                    );
                    self.count_member();
                    self.pos = T::Index::from_usize(pos + literal.len());
                    self.finish_sax_value(*last_super);
                    return Ok(SaxEvent::OneTokenFound);
                }
                _ if NUMBER_CHARS[c as usize] => {
                    if self.state != State::ExpectValue {
                        return self.sax_fail(pos);
                    }
                    let end = scan_number_run(input, pos);
                    if end == len && !last_super.is_invalid() {
                        return self.remember(Err(ParseError::Starving));
                    }
                    token.init(
                        TokenKind::Number,
                        SaxState::HadValue.to_index(),
                        T::Index::from_usize(pos),
                        T::Index::from_usize(end),
                        0,
                    );
                    self.count_member();
                    self.pos = T::Index::from_usize(end);
                    self.finish_sax_value(*last_super);
                    return Ok(SaxEvent::OneTokenFound);
                }
                _ => return self.sax_fail(pos),
            }
        }
    }

    fn sax_fail(&mut self, pos: usize) -> Result<SaxEvent, ParseError> {
        let e = self.invalid_at(pos);
        self.remember(Err(e))
    }

    fn count_member(&mut self) {
        self.next = T::Index::from_usize(self.next.into_usize() + 1);
    }

    /// As `finish_value`, but root detection goes through the caller-held
    /// super position instead of a token index.
    fn finish_sax_value(&mut self, last_super: T::Index) {
        self.state = if last_super.is_invalid() {
            State::Done
        } else {
            State::ExpectComma
        };
    }
}

/// The brace byte the caller's `last_super` refers to, if it is valid.
fn opening_brace<I: TokenIndex>(input: &[u8], last_super: I) -> Option<u8> {
    if last_super.is_invalid() {
        return None;
    }
    input.get(last_super.into_usize()).copied()
}
