// SPDX-License-Identifier: Apache-2.0

//! Partial parsing: drain delivered tokens, compact the in-progress
//! prefix, and resume once more bytes arrive.
//!
//! The caller owns a fixed input buffer it cannot grow. After a bulk parse
//! starves, `parse_partial` first hands over every token that will not
//! survive compaction, then rewrites the token array so only the chain of
//! still-open containers (plus the dangling key, when parsing stopped
//! between a key and its value) remains, slides the bytes still needed to
//! the front of the buffer, and tells the caller where to append fresh
//! data. Compaction is computation-heavy, so accumulate as many bytes as
//! possible between calls instead of refilling byte by byte.

use crate::error::ParseError;
use crate::index::TokenIndex;
use crate::parser::{Parser, PartialState, State};
use crate::token::{Token, TokenKind};

impl<T: Token> Parser<T> {
    /// Resumes parsing over a caller-owned buffer that is refilled in
    /// place.
    ///
    /// `len` is in/out: on entry the number of valid bytes in `buf`, on a
    /// [`NeedRefill`](ParseError::NeedRefill) return the offset at which
    /// to append fresh bytes (pass the grown total back in on the next
    /// call). Return values:
    ///
    /// - `Ok(n)` with `n > 0`: tokens `[first_new, n)` are ready; consume
    ///   them before the next call, compaction will reuse their slots.
    /// - `Ok(0)`: the document is finished (all tokens were handed over in
    ///   earlier calls).
    /// - `Err(NeedRefill)`: a compaction pass ran; append bytes at the
    ///   reported offset and call again.
    /// - `Err(Starving)`: the appended bytes completed no new token;
    ///   append more.
    /// - Other errors as in [`parse`](Parser::parse).
    ///
    /// Across compactions the kept containers keep their `id`, which is
    /// how consumers correlate later children with a container whose token
    /// was handed over earlier. A kept container whose opening brace byte
    /// was dropped from the buffer reports an invalid `start`. The dangling
    /// key of an interrupted key/value pair is re-delivered in front of its
    /// value, so object consumers always see a key before the value it
    /// belongs to.
    ///
    /// ```
    /// use jsontok::{PackedToken, ParseError, Parser, Token, TokenKind};
    ///
    /// let mut buf = [0u8; 16];
    /// buf[..1].copy_from_slice(b"{");
    /// let mut len = 1usize;
    /// let mut tokens = [PackedToken::default(); 8];
    /// let mut parser = Parser::<PackedToken>::new();
    ///
    /// assert_eq!(parser.parse(&buf[..len], &mut tokens), Err(ParseError::Starving));
    ///
    /// let mut first_new = 0i16;
    /// assert_eq!(
    ///     parser.parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new),
    ///     Err(ParseError::NeedRefill)
    /// );
    /// buf[len..len + 7].copy_from_slice(b"\"k\":\"v\"");
    /// len += 7;
    /// buf[len] = b'}';
    /// len += 1;
    ///
    /// let used = parser
    ///     .parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new)
    ///     .unwrap();
    /// assert_eq!((first_new, used), (0, 3));
    /// assert_eq!(tokens[0].kind(), TokenKind::Object);
    /// assert_eq!(tokens[0].element_count(), 2);
    /// ```
    pub fn parse_partial(
        &mut self,
        buf: &mut [u8],
        len: &mut usize,
        tokens: &mut [T],
        first_new: &mut T::Index,
    ) -> Result<T::Index, ParseError> {
        if *len > buf.len() || *len > T::Index::max_usize() {
            return self.remember(Err(ParseError::Invalid));
        }
        if let PartialState::NeedFixing(reason) = self.partial {
            match reason {
                ParseError::Starving | ParseError::NotEnoughTokens => {
                    if self.undelivered_would_be_lost(tokens) {
                        return Ok(self.deliver(first_new));
                    }
                    self.compact(buf, len, tokens);
                    if reason == ParseError::Starving {
                        self.partial = PartialState::NeedRefill;
                        return Err(ParseError::NeedRefill);
                    }
                    // the token array was the bottleneck; its slots are
                    // free again, keep going on the bytes already here
                    self.partial = PartialState::NotUsed;
                }
                // a structural error does not go away by refilling
                ParseError::Invalid => return Err(ParseError::Invalid),
                ParseError::NeedRefill => self.partial = PartialState::NotUsed,
            }
        }
        self.resume(buf, len, tokens, first_new)
    }

    fn resume(
        &mut self,
        buf: &mut [u8],
        len: &mut usize,
        tokens: &mut [T],
        first_new: &mut T::Index,
    ) -> Result<T::Index, ParseError> {
        if self.state == State::Done {
            self.partial = PartialState::NotUsed;
            return if self.next > self.seen {
                Ok(self.deliver(first_new))
            } else {
                Ok(T::Index::from_usize(0))
            };
        }
        match self.advance(&buf[..*len], tokens) {
            Ok(()) => {
                self.partial = PartialState::NotUsed;
                if self.next > self.seen {
                    Ok(self.deliver(first_new))
                } else {
                    Ok(T::Index::from_usize(0))
                }
            }
            Err(e @ (ParseError::Starving | ParseError::NotEnoughTokens)) => {
                self.partial = PartialState::NeedFixing(e);
                if self.next > self.seen {
                    Ok(self.deliver(first_new))
                } else {
                    Err(e)
                }
            }
            Err(e) => {
                self.partial = PartialState::NeedFixing(e);
                Err(e)
            }
        }
    }

    /// Hands the undelivered tail to the caller and advances the delivery
    /// cursor.
    fn deliver(&mut self, first_new: &mut T::Index) -> T::Index {
        *first_new = self.seen;
        self.seen = self.next;
        self.next
    }

    /// Whether any undelivered token sits outside the set compaction would
    /// keep. Such tokens must reach the caller before their slots are
    /// reused.
    fn undelivered_would_be_lost(&self, tokens: &[T]) -> bool {
        let seen = self.seen.into_usize();
        let total = self.next.into_usize().saturating_sub(seen);
        if total == 0 {
            return false;
        }
        let mut kept_in_window = 0usize;
        let mut cur = self.super_idx;
        while !cur.is_invalid() {
            if cur.into_usize() >= seen {
                kept_in_window += 1;
            }
            cur = tokens[cur.into_usize()].parent();
        }
        if let Some(k) = self.dangling_key(tokens) {
            if k >= seen {
                kept_in_window += 1;
            }
        }
        total > kept_in_window
    }

    /// The key of an interrupted key/value pair, when parsing stopped
    /// after a key but before its value completed.
    fn dangling_key(&self, tokens: &[T]) -> Option<usize> {
        if self.super_idx.is_invalid() {
            return None;
        }
        if tokens[self.super_idx.into_usize()].kind() != TokenKind::Object {
            return None;
        }
        if !matches!(self.state, State::ExpectColon | State::ExpectValue) {
            return None;
        }
        let n = self.next.into_usize();
        if n == 0 {
            return None;
        }
        (tokens[n - 1].kind() == TokenKind::Key).then_some(n - 1)
    }

    /// Rewrites tokens and buffer so parsing can continue at the front.
    ///
    /// Keeps the open-ancestor chain (outermost first) plus the dangling
    /// key, reindexes their parent links, rebases their element counts to
    /// the children actually present in the kept prefix, and slides the
    /// bytes still needed to the start of the buffer with a single move.
    fn compact(&mut self, buf: &mut [u8], len: &mut usize, tokens: &mut [T]) {
        let mut depth = 0usize;
        let mut cur = self.super_idx;
        while !cur.is_invalid() {
            depth += 1;
            cur = tokens[cur.into_usize()].parent();
        }
        let key = self.dangling_key(tokens);

        // First byte that must survive: the dangling key's text, the brace
        // of a container nothing has been flushed from yet, or the
        // resumption point itself.
        let last_start = if let Some(k) = key {
            tokens[k].start().into_usize()
        } else if !self.super_idx.is_invalid() {
            let sup = &tokens[self.super_idx.into_usize()];
            if !sup.start().is_invalid() && sup.element_count().into_usize() == 0 {
                sup.start().into_usize()
            } else {
                self.pos.into_usize()
            }
        } else {
            self.pos.into_usize()
        };

        // Move the chain to the front, outermost first. Chain slot j's
        // source index is never below j, so the moves run ascending
        // without clobbering a pending source. Each target is found by
        // walking up from the current super; the walk only touches chain
        // slots that have not been rewritten yet.
        for j in 0..depth {
            let mut idx = self.super_idx.into_usize();
            for _ in 0..(depth - 1 - j) {
                idx = tokens[idx].parent().into_usize();
            }
            let mut t = tokens[idx];
            t.set_parent(if j == 0 {
                T::Index::INVALID
            } else {
                T::Index::from_usize(j - 1)
            });
            // delivered children are gone; count only what stays
            let kept_children = if j + 1 < depth || key.is_some() { 1 } else { 0 };
            t.set_end(T::Index::from_usize(kept_children));
            let s = t.start();
            if s.is_invalid() || s.into_usize() < last_start {
                // the opening brace byte is being dropped from the buffer
                t.set_start(T::Index::INVALID);
            } else {
                t.set_start(T::Index::from_usize(s.into_usize() - last_start));
            }
            tokens[j] = t;
        }
        let mut kept = depth;
        if let Some(k) = key {
            let mut t = tokens[k];
            t.set_parent(T::Index::from_usize(depth - 1));
            t.set_start(T::Index::from_usize(t.start().into_usize() - last_start));
            t.set_end(T::Index::from_usize(t.end().into_usize() - last_start));
            tokens[depth] = t;
            kept += 1;
        }

        self.super_idx = if depth == 0 {
            T::Index::INVALID
        } else {
            T::Index::from_usize(depth - 1)
        };
        self.next = T::Index::from_usize(kept);
        // the ancestors were handed over the first time anything was; the
        // dangling key alone is delivered again with its value
        self.seen = if self.seen.into_usize() == 0 {
            T::Index::from_usize(0)
        } else {
            T::Index::from_usize(depth)
        };
        self.pos = T::Index::from_usize(self.pos.into_usize() - last_start);
        buf.copy_within(last_start..*len, 0);
        *len -= last_start;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PackedToken;

    fn starve(parser: &mut Parser<PackedToken>, buf: &[u8], len: usize, tokens: &mut [PackedToken]) {
        assert_eq!(parser.parse(&buf[..len], tokens), Err(ParseError::Starving));
    }

    #[test]
    fn open_object_survives_compaction_with_id_and_start() {
        let mut buf = [0u8; 16];
        buf[0] = b'{';
        let mut len = 1usize;
        let mut tokens = [PackedToken::default(); 8];
        let mut parser = Parser::<PackedToken>::new();
        starve(&mut parser, &buf, len, &mut tokens);
        assert_eq!(parser.open_container(), 0);
        assert_eq!(tokens[0].start(), 0);

        let mut first_new = 0i16;
        assert_eq!(
            parser.parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new),
            Err(ParseError::NeedRefill)
        );
        // nothing was flushed from the fresh object; its brace byte stays
        assert_eq!(len, 1);
        assert_eq!(tokens[0].start(), 0);
        assert_eq!(tokens[0].id(), 0);

        buf[1..8].copy_from_slice(b"\"k\":\"v\"");
        buf[8] = b'}';
        len = 9;
        let used = parser
            .parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new)
            .unwrap();
        assert_eq!(first_new, 0);
        assert_eq!(used, 3);
        assert_eq!(tokens[0].kind(), TokenKind::Object);
        assert_eq!(tokens[0].element_count(), 2);
        assert_eq!(tokens[0].id(), 0);
        assert_eq!(tokens[1].kind(), TokenKind::Key);
        assert_eq!(tokens[2].kind(), TokenKind::String);

        // the document is finished; the next call reports completion
        assert_eq!(
            parser.parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new),
            Ok(0)
        );
    }

    #[test]
    fn completed_pairs_are_delivered_before_compaction() {
        let doc = b"{\"a\":1,\"b\":2}";
        let mut buf = [0u8; 32];
        buf[..7].copy_from_slice(&doc[..7]); // {"a":1,
        let mut len = 7usize;
        let mut tokens = [PackedToken::default(); 8];
        let mut parser = Parser::<PackedToken>::new();
        starve(&mut parser, &buf, len, &mut tokens);

        let mut first_new = 0i16;
        // first call hands over the object and the completed pair
        let used = parser
            .parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new)
            .unwrap();
        assert_eq!((first_new, used), (0, 3));
        assert_eq!(tokens[1].slice(&buf), b"a");
        assert_eq!(tokens[2].slice(&buf), b"1");

        // second call compacts and asks for bytes
        assert_eq!(
            parser.parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new),
            Err(ParseError::NeedRefill)
        );
        buf[len..len + 6].copy_from_slice(&doc[7..]);
        len += 6;

        let used = parser
            .parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new)
            .unwrap();
        // the object itself was already handed over; only the new pair is
        assert_eq!(first_new, 1);
        assert_eq!(used, 3);
        assert_eq!(tokens[1].kind(), TokenKind::Key);
        assert_eq!(tokens[1].slice(&buf), b"b");
        assert_eq!(tokens[2].slice(&buf), b"2");
        // the rebased count covers the children present in the array
        assert_eq!(tokens[0].element_count(), 2);
        assert_eq!(
            parser.parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new),
            Ok(0)
        );
    }

    #[test]
    fn dangling_key_is_kept_and_redelivered() {
        let mut buf = [0u8; 32];
        buf[..12].copy_from_slice(b"{\"a\":1,\"bb\":");
        let mut len = 12usize;
        let mut tokens = [PackedToken::default(); 8];
        let mut parser = Parser::<PackedToken>::new();
        starve(&mut parser, &buf, len, &mut tokens);

        let mut first_new = 0i16;
        let used = parser
            .parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new)
            .unwrap();
        assert_eq!((first_new, used), (0, 4));

        assert_eq!(
            parser.parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new),
            Err(ParseError::NeedRefill)
        );
        // buffer was rebased to the dangling key's text
        assert_eq!(tokens[0].kind(), TokenKind::Object);
        assert!(tokens[0].start().is_invalid());
        assert_eq!(tokens[1].kind(), TokenKind::Key);
        assert_eq!(tokens[1].slice(&buf[..len]), b"bb");

        buf[len..len + 2].copy_from_slice(b"2}");
        len += 2;
        let used = parser
            .parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new)
            .unwrap();
        // the key comes again, right before its value
        assert_eq!(first_new, 1);
        assert_eq!(used, 3);
        assert_eq!(tokens[1].kind(), TokenKind::Key);
        assert_eq!(tokens[1].slice(&buf), b"bb");
        assert_eq!(tokens[2].kind(), TokenKind::Number);
        assert_eq!(tokens[2].slice(&buf), b"2");
    }

    #[test]
    fn starving_refill_with_no_progress_reports_starving() {
        let mut buf = [0u8; 16];
        buf[..2].copy_from_slice(b"[\"");
        let mut len = 2usize;
        let mut tokens = [PackedToken::default(); 8];
        let mut parser = Parser::<PackedToken>::new();
        starve(&mut parser, &buf, len, &mut tokens);

        let mut first_new = 0i16;
        // the array is exactly the kept set, so the first call compacts
        assert_eq!(
            parser.parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new),
            Err(ParseError::NeedRefill)
        );
        // append string bytes that still do not close the string; the
        // fruitless round still hands over the pending array token
        buf[len..len + 2].copy_from_slice(b"ab");
        len += 2;
        let used = parser
            .parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new)
            .unwrap();
        assert_eq!((first_new, used), (0, 1));
        assert_eq!(tokens[0].kind(), TokenKind::Array);
        assert_eq!(
            parser.parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new),
            Err(ParseError::NeedRefill)
        );
        // a second refill that completes nothing: now the caller sees
        // Starving rather than an empty delivery
        buf[len..len + 2].copy_from_slice(b"cd");
        len += 2;
        assert_eq!(
            parser.parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new),
            Err(ParseError::Starving)
        );
        assert_eq!(
            parser.parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new),
            Err(ParseError::NeedRefill)
        );
        buf[len..len + 2].copy_from_slice(b"\"]");
        len += 2;
        let used = parser
            .parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new)
            .unwrap();
        assert_eq!((first_new, used), (1, 2));
        assert_eq!(tokens[1].kind(), TokenKind::String);
        assert_eq!(tokens[1].slice(&buf), b"abcd");
    }

    #[test]
    fn token_exhaustion_drains_and_continues_without_refill() {
        let doc = b"[1,2,3,4,5]";
        let mut buf = [0u8; 16];
        buf[..doc.len()].copy_from_slice(doc);
        let mut len = doc.len();
        // room for the array and two numbers at a time
        let mut tokens = [PackedToken::default(); 3];
        let mut parser = Parser::<PackedToken>::new();
        assert_eq!(
            parser.parse(&buf[..len], &mut tokens),
            Err(ParseError::NotEnoughTokens)
        );

        let mut first_new = 0i16;
        let mut values = Vec::new();
        loop {
            match parser.parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new) {
                Ok(0) => break,
                Ok(used) => {
                    for t in &tokens[first_new as usize..used as usize] {
                        if t.kind() == TokenKind::Number {
                            values.push(t.slice(&buf).to_vec());
                        }
                    }
                }
                Err(e) => panic!("unexpected outcome: {e:?}"),
            }
        }
        let flat: Vec<&[u8]> = values.iter().map(|v| v.as_slice()).collect();
        assert_eq!(flat, [&b"1"[..], b"2", b"3", b"4", b"5"]);
    }

    #[test]
    fn invalid_document_stays_invalid_across_partial_calls() {
        let mut buf = [0u8; 16];
        buf[..4].copy_from_slice(b"[1,]");
        let mut len = 4usize;
        let mut tokens = [PackedToken::default(); 8];
        let mut parser = Parser::<PackedToken>::new();
        assert_eq!(
            parser.parse(&buf[..len], &mut tokens),
            Err(ParseError::Invalid)
        );
        let mut first_new = 0i16;
        assert_eq!(
            parser.parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new),
            Err(ParseError::Invalid)
        );
    }

    #[test]
    fn deeply_nested_chain_is_reindexed() {
        let mut buf = [0u8; 32];
        buf[..9].copy_from_slice(b"{\"a\":[[1,");
        let mut len = 9usize;
        let mut tokens = [PackedToken::default(); 8];
        let mut parser = Parser::<PackedToken>::new();
        starve(&mut parser, &buf, len, &mut tokens);

        let mut first_new = 0i16;
        // object, key, two arrays and the number must all come out
        let used = parser
            .parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new)
            .unwrap();
        assert_eq!((first_new, used), (0, 5));
        let outer_id = tokens[0].id();
        let mid_id = tokens[2].id();
        let inner_id = tokens[3].id();

        assert_eq!(
            parser.parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new),
            Err(ParseError::NeedRefill)
        );
        // chain of three containers at the front, outermost first
        assert_eq!(tokens[0].kind(), TokenKind::Object);
        assert_eq!(tokens[0].id(), outer_id);
        assert!(tokens[0].parent().is_invalid());
        assert_eq!(tokens[1].kind(), TokenKind::Array);
        assert_eq!(tokens[1].id(), mid_id);
        assert_eq!(tokens[1].parent(), 0);
        assert_eq!(tokens[2].kind(), TokenKind::Array);
        assert_eq!(tokens[2].id(), inner_id);
        assert_eq!(tokens[2].parent(), 1);
        assert_eq!(parser.open_container(), 2);

        buf[len..len + 4].copy_from_slice(b"2]]}");
        len += 4;
        let used = parser
            .parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new)
            .unwrap();
        assert_eq!(first_new, 3);
        assert_eq!(used, 4);
        assert_eq!(tokens[3].kind(), TokenKind::Number);
        assert_eq!(tokens[3].slice(&buf), b"2");
        assert_eq!(
            parser.parse_partial(&mut buf, &mut len, &mut tokens, &mut first_new),
            Ok(0)
        );
    }
}
