// SPDX-License-Identifier: Apache-2.0

//! The shared lexical/syntactic engine driving all three parsing modes.
//!
//! One state machine serves bulk parsing (`parse`), single-token parsing
//! (`parse_one`) and partial resumption (`parse_partial`): the parser keeps
//! only a handful of integer fields between calls, and every call is a
//! finite CPU step with no allocation, no recursion and no panics.

use crate::error::ParseError;
use crate::index::TokenIndex;
use crate::token::{PackedToken, Token, TokenKind};

// Character classification tables for the lexer hot path.
pub(crate) const IS_WHITESPACE: [bool; 256] = {
    let mut table = [false; 256];
    table[b' ' as usize] = true;
    table[b'\t' as usize] = true;
    table[b'\n' as usize] = true;
    table[b'\r' as usize] = true;
    table
};

// The lenient number alphabet: digits, signs, decimal point, exponent
// markers and hex digits (0x... literals pass through undigested). Runs
// over this set are emitted as one Number token without semantic
// validation; converting the literal is the caller's job.
pub(crate) const NUMBER_CHARS: [bool; 256] = {
    let mut table = [false; 256];
    let mut i = b'0';
    while i <= b'9' {
        table[i as usize] = true;
        i += 1;
    }
    let mut i = b'a';
    while i <= b'f' {
        table[i as usize] = true;
        i += 1;
    }
    let mut i = b'A';
    while i <= b'F' {
        table[i as usize] = true;
        i += 1;
    }
    table[b'+' as usize] = true;
    table[b'-' as usize] = true;
    table[b'.' as usize] = true;
    table[b'x' as usize] = true;
    table[b'X' as usize] = true;
    table
};

/// What the parser expects at the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum State {
    ExpectValue,
    ExpectKey,
    ExpectColon,
    ExpectComma,
    Done,
}

/// Last negative outcome, consulted by `parse_partial` to decide how to
/// resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PartialState {
    NotUsed,
    NeedFixing(ParseError),
    NeedRefill,
}

/// A resumable JSON token parser over caller-supplied storage.
///
/// The parser owns nothing: input bytes and token records live in buffers
/// the caller provides, and the parser itself is a few integer fields that
/// can be dropped at any point. Two parsers over disjoint buffers are fully
/// independent.
pub struct Parser<T: Token = PackedToken> {
    /// Next byte offset to consume.
    pub(crate) pos: T::Index,
    /// Next free slot in the token array. In single-token mode, where no
    /// token array exists, this slot counts the open container's members.
    pub(crate) next: T::Index,
    /// Index of the innermost open container, invalid at root.
    pub(crate) super_idx: T::Index,
    /// The next container id.
    pub(crate) last_id: u16,
    pub(crate) state: State,
    pub(crate) partial: PartialState,
    /// Number of leading tokens the caller has already consumed through
    /// `parse_partial` deliveries.
    pub(crate) seen: T::Index,
}

impl<T: Token> Parser<T> {
    /// Creates a parser in pristine state.
    pub fn new() -> Self {
        Parser {
            pos: T::Index::from_usize(0),
            next: T::Index::from_usize(0),
            super_idx: T::Index::INVALID,
            last_id: 0,
            state: State::ExpectValue,
            partial: PartialState::NotUsed,
            seen: T::Index::from_usize(0),
        }
    }

    /// Returns the parser to its initial state. Required after an
    /// [`Invalid`](ParseError::Invalid) outcome before the parser is
    /// reused.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// The next byte offset to consume. After an Invalid outcome this is
    /// the offset of the offending byte; after Starving, the last safe
    /// resumption point.
    pub fn pos(&self) -> T::Index {
        self.pos
    }

    /// Index of the innermost open container token, or the invalid
    /// sentinel at root.
    pub fn open_container(&self) -> T::Index {
        self.super_idx
    }

    /// Whether the outermost value has been fully consumed.
    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Parses `input` into the caller-supplied token array.
    ///
    /// Consumes bytes from the current position until the outermost value
    /// completes, returning the number of tokens written. Bytes after the
    /// first complete root value are left unread (`pos` marks them), not
    /// reported as an error.
    ///
    /// On [`Starving`](ParseError::Starving) the call can be repeated once
    /// the caller has appended more bytes to the same input, or the
    /// document can be drained incrementally with
    /// [`parse_partial`](Parser::parse_partial).
    pub fn parse(&mut self, input: &[u8], tokens: &mut [T]) -> Result<T::Index, ParseError> {
        if input.len() > T::Index::max_usize() {
            return self.remember(Err(ParseError::Invalid));
        }
        if self.state == State::Done {
            return Ok(self.next);
        }
        let r = self.advance(input, tokens).map(|()| self.next);
        self.remember(r)
    }

    /// Counts the immediate children of a just-entered container without
    /// consuming any parser state.
    ///
    /// Only meaningful when the parser sits directly after the container's
    /// opening brace (the position `parse_one` leaves it in when it
    /// reports [`SaveSuper`](crate::SaxEvent::SaveSuper)); in any other
    /// phase, or for a non-container token, the count is 0. Keys and
    /// values each count as one child, matching the `element_count` the
    /// token will carry once the container is fully parsed.
    ///
    /// This scans forward to the closing brace, so it is O(n) in the
    /// container's byte length; starves if the container does not close
    /// within the input.
    pub fn current_container_count(
        &self,
        input: &[u8],
        token: &T,
    ) -> Result<T::Index, ParseError> {
        if !token.kind().is_container() || token.start().is_invalid() {
            return Ok(T::Index::from_usize(0));
        }
        if self.pos.into_usize() != token.start().into_usize() + 1 {
            return Ok(T::Index::from_usize(0));
        }
        let len = input.len().min(T::Index::max_usize());
        let mut depth = 1usize;
        let mut count = 0usize;
        let mut i = self.pos.into_usize();
        while i < len {
            let c = input[i];
            if IS_WHITESPACE[c as usize] || c == b',' || c == b':' {
                i += 1;
            } else if c == b'{' || c == b'[' {
                if depth == 1 {
                    count += 1;
                }
                depth += 1;
                i += 1;
            } else if c == b'}' || c == b']' {
                depth -= 1;
                if depth == 0 {
                    return Ok(T::Index::from_usize(count));
                }
                i += 1;
            } else if c == b'"' {
                if depth == 1 {
                    count += 1;
                }
                i += 1;
                let mut closed = false;
                while i < len {
                    match input[i] {
                        b'"' => {
                            i += 1;
                            closed = true;
                            break;
                        }
                        b'\\' => i += 2,
                        _ => i += 1,
                    }
                }
                if !closed {
                    return Err(ParseError::Starving);
                }
            } else {
                if depth == 1 {
                    count += 1;
                }
                while i < len
                    && !IS_WHITESPACE[input[i] as usize]
                    && !matches!(input[i], b'{' | b'[' | b'}' | b']' | b',' | b':' | b'"')
                {
                    i += 1;
                }
            }
        }
        Err(ParseError::Starving)
    }

    /// Runs the state machine until Done, exhaustion or an error. `pos`
    /// only moves past a token once the whole token has been emitted, so
    /// a Starving return always leaves a safe resumption point.
    pub(crate) fn advance(&mut self, input: &[u8], tokens: &mut [T]) -> Result<(), ParseError> {
        let len = input.len();
        let cap = tokens.len().min(T::Index::max_usize());
        loop {
            if self.state == State::Done {
                return Ok(());
            }
            let pos = self.pos.into_usize();
            if pos >= len {
                return Err(ParseError::Starving);
            }
            let c = input[pos];
            if IS_WHITESPACE[c as usize] {
                self.pos = T::Index::from_usize(pos + 1);
                continue;
            }
            match c {
                b'{' | b'[' => {
                    if self.state != State::ExpectValue {
                        return Err(self.invalid_at(pos));
                    }
                    let slot = self.alloc_token(cap)?;
                    let kind = if c == b'{' {
                        TokenKind::Object
                    } else {
                        TokenKind::Array
                    };
                    let id = self.next_container_id();
                    tokens[slot].init(
                        kind,
                        self.super_idx,
                        T::Index::from_usize(pos),
                        T::Index::from_usize(0),
                        id,
                    );
                    self.note_child(tokens);
                    self.super_idx = T::Index::from_usize(slot);
                    self.state = if c == b'{' {
                        State::ExpectKey
                    } else {
                        State::ExpectValue
                    };
                    self.pos = T::Index::from_usize(pos + 1);
                }
                b'}' | b']' => {
                    if self.super_idx.is_invalid() {
                        return Err(self.invalid_at(pos));
                    }
                    let sup = self.super_idx.into_usize();
                    let kind = tokens[sup].kind();
                    let empty = tokens[sup].element_count().into_usize() == 0;
                    let matches_kind = (c == b'}' && kind == TokenKind::Object)
                        || (c == b']' && kind == TokenKind::Array);
                    let closable = match self.state {
                        State::ExpectComma => true,
                        // an empty container; after a comma the count is
                        // nonzero, so trailing commas land here and fail
                        State::ExpectKey => c == b'}' && empty,
                        State::ExpectValue => c == b']' && empty,
                        _ => false,
                    };
                    if !matches_kind || !closable {
                        return Err(self.invalid_at(pos));
                    }
                    self.super_idx = tokens[sup].parent();
                    self.pos = T::Index::from_usize(pos + 1);
                    self.state = if self.super_idx.is_invalid() {
                        State::Done
                    } else {
                        State::ExpectComma
                    };
                }
                b',' => {
                    if self.state != State::ExpectComma || self.super_idx.is_invalid() {
                        return Err(self.invalid_at(pos));
                    }
                    let kind = tokens[self.super_idx.into_usize()].kind();
                    self.state = if kind == TokenKind::Object {
                        State::ExpectKey
                    } else {
                        State::ExpectValue
                    };
                    self.pos = T::Index::from_usize(pos + 1);
                }
                b':' => {
                    if self.state != State::ExpectColon {
                        return Err(self.invalid_at(pos));
                    }
                    self.state = State::ExpectValue;
                    self.pos = T::Index::from_usize(pos + 1);
                }
                b'"' => {
                    let is_key = match self.state {
                        State::ExpectKey => true,
                        State::ExpectValue => false,
                        _ => return Err(self.invalid_at(pos)),
                    };
                    let (start, end) = self.scan_string(input, pos)?;
                    let slot = self.alloc_token(cap)?;
                    tokens[slot].init(
                        if is_key { TokenKind::Key } else { TokenKind::String },
                        self.super_idx,
                        T::Index::from_usize(start),
                        T::Index::from_usize(end),
                        0,
                    );
                    self.note_child(tokens);
                    self.pos = T::Index::from_usize(end + 1);
                    if is_key {
                        self.state = State::ExpectColon;
                    } else {
                        self.finish_value();
                    }
                }
                b't' | b'f' | b'n' => {
                    if self.state != State::ExpectValue {
                        return Err(self.invalid_at(pos));
                    }
                    let (kind, literal): (TokenKind, &[u8]) = match c {
                        b't' => (TokenKind::True, b"true"),
                        b'f' => (TokenKind::False, b"false"),
                        _ => (TokenKind::Null, b"null"),
                    };
                    self.match_literal(input, pos, literal)?;
                    let slot = self.alloc_token(cap)?;
                    tokens[slot].init(
                        kind,
                        self.super_idx,
                        T::Index::from_usize(pos),
                        T::Index::from_usize(pos + literal.len()),
                        0,
                    );
                    self.note_child(tokens);
                    self.pos = T::Index::from_usize(pos + literal.len());
                    self.finish_value();
                }
                _ if NUMBER_CHARS[c as usize] => {
                    if self.state != State::ExpectValue {
                        return Err(self.invalid_at(pos));
                    }
                    let end = scan_number_run(input, pos);
                    if end == len && !self.super_idx.is_invalid() {
                        // the run may continue in the next chunk
                        return Err(ParseError::Starving);
                    }
                    let slot = self.alloc_token(cap)?;
                    tokens[slot].init(
                        TokenKind::Number,
                        self.super_idx,
                        T::Index::from_usize(pos),
                        T::Index::from_usize(end),
                        0,
                    );
                    self.note_child(tokens);
                    self.pos = T::Index::from_usize(end);
                    self.finish_value();
                }
                _ => return Err(self.invalid_at(pos)),
            }
        }
    }

    /// A value just completed: back to expecting a comma inside a
    /// container, or Done at root.
    fn finish_value(&mut self) {
        self.state = if self.super_idx.is_invalid() {
            State::Done
        } else {
            State::ExpectComma
        };
    }

    /// Scans a string opened at `quote`, returning the content byte range
    /// exclusive of the quotes. A backslash consumes the following byte
    /// unconditionally, so `\uXXXX` passes through as six ordinary bytes.
    /// Starving leaves `pos` untouched at the opening quote.
    pub(crate) fn scan_string(
        &mut self,
        input: &[u8],
        quote: usize,
    ) -> Result<(usize, usize), ParseError> {
        let len = input.len();
        let mut i = quote + 1;
        while i < len {
            match input[i] {
                b'"' => return Ok((quote + 1, i)),
                b'\\' => {
                    if i + 1 >= len {
                        return Err(ParseError::Starving);
                    }
                    i += 2;
                }
                0x00..=0x1f => return Err(self.invalid_at(i)),
                _ => i += 1,
            }
        }
        Err(ParseError::Starving)
    }

    /// Matches the exact bytes of `true`, `false` or `null` at `pos`.
    pub(crate) fn match_literal(
        &mut self,
        input: &[u8],
        pos: usize,
        literal: &[u8],
    ) -> Result<(), ParseError> {
        let avail = (input.len() - pos).min(literal.len());
        for i in 0..avail {
            if input[pos + i] != literal[i] {
                return Err(self.invalid_at(pos + i));
            }
        }
        if avail < literal.len() {
            return Err(ParseError::Starving);
        }
        Ok(())
    }

    /// Records the offending byte for the caller and reports Invalid.
    pub(crate) fn invalid_at(&mut self, pos: usize) -> ParseError {
        self.pos = T::Index::from_usize(pos);
        ParseError::Invalid
    }

    pub(crate) fn alloc_token(&mut self, cap: usize) -> Result<usize, ParseError> {
        let n = self.next.into_usize();
        if n >= cap {
            return Err(ParseError::NotEnoughTokens);
        }
        self.next = T::Index::from_usize(n + 1);
        Ok(n)
    }

    /// Counts a freshly emitted token into its enclosing container.
    fn note_child(&mut self, tokens: &mut [T]) {
        if self.super_idx.is_invalid() {
            return;
        }
        let t = &mut tokens[self.super_idx.into_usize()];
        let n = t.element_count().into_usize();
        t.set_end(T::Index::from_usize(n + 1));
    }

    pub(crate) fn next_container_id(&mut self) -> u16 {
        let id = self.last_id;
        self.last_id = self.last_id.wrapping_add(1) & T::ID_MASK;
        id
    }

    pub(crate) fn remember<R>(
        &mut self,
        r: Result<R, ParseError>,
    ) -> Result<R, ParseError> {
        self.partial = match &r {
            Ok(_) => PartialState::NotUsed,
            Err(e) => PartialState::NeedFixing(*e),
        };
        r
    }
}

impl<T: Token> Default for Parser<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// First index at or after `start` whose byte falls outside the lenient
/// number alphabet.
pub(crate) fn scan_number_run(input: &[u8], start: usize) -> usize {
    let mut i = start;
    while i < input.len() && NUMBER_CHARS[input[i] as usize] {
        i += 1;
    }
    i
}
