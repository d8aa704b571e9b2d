// SPDX-License-Identifier: Apache-2.0

/// Errors returned by the parsing entry points.
///
/// Every failure is surfaced to the caller as a value; the parser never
/// panics and recovers nothing on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// The caller-supplied token array is full. Re-parse with a larger
    /// array, or drain completed subtrees with
    /// [`parse_partial`](crate::Parser::parse_partial).
    NotEnoughTokens,
    /// Syntax violation or disallowed byte; [`Parser::pos`](crate::Parser::pos)
    /// points at the offending byte. Fatal for the current document;
    /// `reset()` before reuse.
    Invalid,
    /// Input ran out mid-token or mid-structure; `pos` marks the last safe
    /// resumption point. Append more bytes and call again, or switch to
    /// `parse_partial`.
    Starving,
    /// Emitted only by `parse_partial` after a compaction pass: append more
    /// bytes at the reported write offset before the next call.
    NeedRefill,
}

impl ParseError {
    /// The numeric code of this outcome, kept bit-for-bit compatible with
    /// callers that log or switch on the raw value.
    pub const fn code(self) -> i8 {
        match self {
            ParseError::NotEnoughTokens => -1,
            ParseError::Invalid => -2,
            ParseError::Starving => -3,
            ParseError::NeedRefill => -4,
        }
    }
}

impl core::fmt::Display for ParseError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ParseError::NotEnoughTokens => write!(f, "not enough tokens provided"),
            ParseError::Invalid => write!(f, "invalid input"),
            ParseError::Starving => write!(f, "not enough data, feed more and retry"),
            ParseError::NeedRefill => write!(f, "refill the input buffer and retry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_wire_values() {
        assert_eq!(ParseError::NotEnoughTokens.code(), -1);
        assert_eq!(ParseError::Invalid.code(), -2);
        assert_eq!(ParseError::Starving.code(), -3);
        assert_eq!(ParseError::NeedRefill.code(), -4);
    }

    #[test]
    fn display_is_nonempty() {
        let all = [
            ParseError::NotEnoughTokens,
            ParseError::Invalid,
            ParseError::Starving,
            ParseError::NeedRefill,
        ];
        for e in all {
            assert!(!format!("{e}").is_empty());
        }
    }
}
