//! A zero-allocation, resumable JSON token parser for memory-constrained
//! environments.
//!
//! `jsontok` splits a JSON document into fixed-size tokens written to a
//! caller-supplied array, without heap allocation, recursion or panics.
//! It targets small microcontrollers: the parser state is a handful of
//! integers, the narrow-profile token is 8 bytes, and parsing can stop and
//! resume at any point when input arrives in pieces over a stream.
//!
//! ## Main Types
//!
//! - [`Parser`] - The state machine behind all three parsing modes
//! - [`PackedToken`] - 8-byte token for inputs up to 32 KiB
//! - [`WideToken`] - unpacked token for larger inputs
//!
//! ## Quick Start
//!
//! ```rust
//! use jsontok::{PackedToken, Parser, Token, TokenKind};
//!
//! let json = b"{\"a\":1,\"b\":[true,null]}";
//! let mut tokens = [PackedToken::default(); 16];
//! let mut parser = Parser::<PackedToken>::new();
//!
//! let used = parser.parse(json, &mut tokens).expect("valid JSON");
//! assert_eq!(used, 7);
//! assert_eq!(tokens[0].kind(), TokenKind::Object);
//! assert_eq!(tokens[0].element_count(), 4);
//! assert_eq!(tokens[1].kind(), TokenKind::Key);
//! assert_eq!(tokens[1].slice(json), b"a");
//! ```
//!
//! ## Parsing Modes
//!
//! Bulk mode ([`Parser::parse`]) fills the token array in document order.
//! Single-token mode ([`Parser::parse_one`]) emits one token per call with
//! a caller-owned container stack and no token array at all. Partial mode
//! ([`Parser::parse_partial`], feature `partial`) compacts
//! already-delivered tokens out of the array and slides unfinished bytes to
//! the front of the input buffer, so a fixed buffer can drain documents
//! larger than itself.
//!
//! ## What It Does Not Do
//!
//! Numbers are emitted as raw byte ranges and never converted; the number
//! scanner is deliberately lenient, so `123.E2+-4` comes back as a single
//! Number token for downstream code to judge. `\uXXXX` escapes pass
//! through undecoded. Strings are only unescaped on request, in place,
//! via [`Token::unescape`] (feature `unescape`). There is no writer, no
//! DOM and no schema validation.

// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), no_std)]

mod error;
pub use error::ParseError;

mod index;
pub use index::TokenIndex;

mod token;
pub use token::{PackedToken, Token, TokenKind, WideToken};

mod parser;
pub use parser::Parser;

mod pull;
pub use pull::{SaxEvent, SaxState};

#[cfg(feature = "partial")]
mod partial;

#[cfg(feature = "unescape")]
mod unescape;
