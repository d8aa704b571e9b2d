// SPDX-License-Identifier: Apache-2.0

use crate::index::TokenIndex;

/// The kind of lexical element a token describes.
///
/// The numbering is fixed: it is what the narrow profile stores in its
/// 4-bit kind field.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenKind {
    /// Free slot: allocated but not yet filled on rollback paths.
    #[default]
    Undefined = 0,
    Object = 1,
    Array = 2,
    Key = 3,
    String = 4,
    Null = 5,
    True = 6,
    False = 7,
    Number = 8,
}

impl TokenKind {
    pub(crate) const fn from_bits(bits: u16) -> Self {
        match bits {
            1 => TokenKind::Object,
            2 => TokenKind::Array,
            3 => TokenKind::Key,
            4 => TokenKind::String,
            5 => TokenKind::Null,
            6 => TokenKind::True,
            7 => TokenKind::False,
            8 => TokenKind::Number,
            _ => TokenKind::Undefined,
        }
    }

    /// Objects and arrays are the only kinds that have children and carry
    /// an id.
    pub const fn is_container(self) -> bool {
        matches!(self, TokenKind::Object | TokenKind::Array)
    }
}

/// A fixed-layout descriptor of one lexical element.
///
/// The `end`/`element_count` accessor pair reads the same slot: primitives
/// and strings store the byte offset one past their last significant byte,
/// containers store their number of direct children. Which interpretation
/// applies is determined by [`kind`](Token::kind). Likewise `parent` holds
/// the enclosing container's token index in stream mode and a
/// [`SaxState`](crate::SaxState) discriminant in single-token mode.
pub trait Token: Copy + Default + PartialEq + core::fmt::Debug {
    /// The signed index width this token addresses input and slots with.
    type Index: TokenIndex;

    /// Container ids wrap around after this mask.
    const ID_MASK: u16;

    /// Fills every field at once.
    fn init(
        &mut self,
        kind: TokenKind,
        parent: Self::Index,
        start: Self::Index,
        end: Self::Index,
        id: u16,
    );

    fn kind(&self) -> TokenKind;
    fn set_kind(&mut self, kind: TokenKind);

    /// Container identifier; stable for a single parse, survives partial
    /// compaction. Meaningless for non-container tokens.
    fn id(&self) -> u16;

    fn parent(&self) -> Self::Index;
    fn set_parent(&mut self, parent: Self::Index);

    /// Byte offset of the first significant byte: the first literal byte
    /// for primitives, the byte after the opening quote for strings and
    /// keys, the opening brace for containers. Invalid after a compaction
    /// evicted the byte from the buffer.
    fn start(&self) -> Self::Index;
    fn set_start(&mut self, start: Self::Index);

    fn end(&self) -> Self::Index;
    fn set_end(&mut self, end: Self::Index);

    /// Number of direct children of a container (keys and values each
    /// count one). Shares storage with [`end`](Token::end).
    #[inline]
    fn element_count(&self) -> Self::Index {
        self.end()
    }

    /// Byte range `[start, end)` of a primitive, string or key within the
    /// input it was parsed from.
    fn slice<'a>(&self, input: &'a [u8]) -> &'a [u8] {
        if self.kind().is_container() || self.start().is_invalid() {
            return &[];
        }
        let (start, end) = (self.start().into_usize(), self.end().into_usize());
        input.get(start..end).unwrap_or(&[])
    }

    /// Decodes the standard JSON escapes of a String or Key token in place
    /// and returns the decoded view. See [`crate::unescape`] for the exact
    /// contract.
    #[cfg(feature = "unescape")]
    fn unescape<'a>(&self, input: &'a mut [u8]) -> &'a [u8] {
        if !matches!(self.kind(), TokenKind::String | TokenKind::Key) || self.start().is_invalid()
        {
            return &[];
        }
        crate::unescape::unescape_in_place(
            input,
            self.start().into_usize(),
            self.end().into_usize(),
        )
    }
}

/// Token of the narrow profile: 8 bytes, inputs up to 32 767 bytes, ids
/// wrap after 4 095.
///
/// Layout (native byte order, 8-byte array stride): `id` in bits 0..=11 and
/// the kind in bits 12..=15 of the leading word, then `parent`, `start`,
/// `end` as `i16`.
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct PackedToken {
    tag: u16,
    parent: i16,
    start: i16,
    end: i16,
}

impl Token for PackedToken {
    type Index = i16;

    const ID_MASK: u16 = 0x0fff;

    #[inline]
    fn init(&mut self, kind: TokenKind, parent: i16, start: i16, end: i16, id: u16) {
        self.tag = (id & Self::ID_MASK) | ((kind as u16) << 12);
        self.parent = parent;
        self.start = start;
        self.end = end;
    }

    #[inline]
    fn kind(&self) -> TokenKind {
        TokenKind::from_bits(self.tag >> 12)
    }

    #[inline]
    fn set_kind(&mut self, kind: TokenKind) {
        self.tag = (self.tag & Self::ID_MASK) | ((kind as u16) << 12);
    }

    #[inline]
    fn id(&self) -> u16 {
        self.tag & Self::ID_MASK
    }

    #[inline]
    fn parent(&self) -> i16 {
        self.parent
    }

    #[inline]
    fn set_parent(&mut self, parent: i16) {
        self.parent = parent;
    }

    #[inline]
    fn start(&self) -> i16 {
        self.start
    }

    #[inline]
    fn set_start(&mut self, start: i16) {
        self.start = start;
    }

    #[inline]
    fn end(&self) -> i16 {
        self.end
    }

    #[inline]
    fn set_end(&mut self, end: i16) {
        self.end = end;
    }
}

impl core::fmt::Debug for PackedToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PackedToken")
            .field("kind", &self.kind())
            .field("id", &self.id())
            .field("parent", &self.parent)
            .field("start", &self.start)
            .field("end", &self.end)
            .finish()
    }
}

/// Token of the wide profile: unpacked fields over any [`TokenIndex`],
/// defaulting to `i32`. Ids wrap after 65 535.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WideToken<I: TokenIndex = i32> {
    id: u16,
    kind: TokenKind,
    parent: I,
    start: I,
    end: I,
}

impl<I: TokenIndex> Token for WideToken<I> {
    type Index = I;

    const ID_MASK: u16 = 0xffff;

    #[inline]
    fn init(&mut self, kind: TokenKind, parent: I, start: I, end: I, id: u16) {
        self.id = id;
        self.kind = kind;
        self.parent = parent;
        self.start = start;
        self.end = end;
    }

    #[inline]
    fn kind(&self) -> TokenKind {
        self.kind
    }

    #[inline]
    fn set_kind(&mut self, kind: TokenKind) {
        self.kind = kind;
    }

    #[inline]
    fn id(&self) -> u16 {
        self.id
    }

    #[inline]
    fn parent(&self) -> I {
        self.parent
    }

    #[inline]
    fn set_parent(&mut self, parent: I) {
        self.parent = parent;
    }

    #[inline]
    fn start(&self) -> I {
        self.start
    }

    #[inline]
    fn set_start(&mut self, start: I) {
        self.start = start;
    }

    #[inline]
    fn end(&self) -> I {
        self.end
    }

    #[inline]
    fn set_end(&mut self, end: I) {
        self.end = end;
    }
}
