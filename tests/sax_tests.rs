// SPDX-License-Identifier: Apache-2.0

//! Single-token mode driven the way a client would: a caller-owned super
//! stack, one token per call.

use jsontok::{PackedToken, Parser, SaxEvent, SaxState, Token, TokenIndex, TokenKind};

struct Walked {
    kind: TokenKind,
    state: SaxState,
    text: Vec<u8>,
}

fn walk(input: &[u8]) -> Vec<Walked> {
    let mut parser = Parser::<PackedToken>::new();
    let mut token = PackedToken::default();
    let mut last_super = <i16 as TokenIndex>::INVALID;
    let mut stack: Vec<i16> = Vec::new();
    let mut out = Vec::new();
    loop {
        let ev = parser
            .parse_one(input, &mut token, &mut last_super)
            .expect("parse_one failed");
        match ev {
            SaxEvent::SaveSuper => stack.push(last_super),
            SaxEvent::RestoreSuper => {
                stack.pop();
                last_super = stack.last().copied().unwrap_or(-1);
            }
            SaxEvent::OneTokenFound => {}
            SaxEvent::Finished => break,
        }
        out.push(Walked {
            kind: token.kind(),
            state: SaxState::from_index(token.parent()),
            text: token.slice(input).to_vec(),
        });
    }
    assert!(stack.is_empty(), "unbalanced containers");
    out
}

#[test]
fn walk_reports_structure_and_values() {
    let input = b"{\"a\":1,\"b\":[true,{\"c\":\"x\"}]}";
    let walked = walk(input);
    let summary: Vec<(TokenKind, SaxState)> =
        walked.iter().map(|w| (w.kind, w.state)).collect();
    assert_eq!(
        summary,
        [
            (TokenKind::Object, SaxState::EnteringObject),
            (TokenKind::Key, SaxState::HadKey),
            (TokenKind::Number, SaxState::HadValue),
            (TokenKind::Key, SaxState::HadKey),
            (TokenKind::Array, SaxState::EnteringArray),
            (TokenKind::True, SaxState::HadValue),
            (TokenKind::Object, SaxState::EnteringObject),
            (TokenKind::Key, SaxState::HadKey),
            (TokenKind::String, SaxState::HadValue),
            (TokenKind::Object, SaxState::LeavingObject),
            (TokenKind::Array, SaxState::LeavingArray),
            (TokenKind::Object, SaxState::LeavingObject),
        ]
    );
    let texts: Vec<&[u8]> = walked.iter().map(|w| w.text.as_slice()).collect();
    assert_eq!(texts[1], b"a");
    assert_eq!(texts[2], b"1");
    assert_eq!(texts[8], b"x");
}

#[test]
fn leaf_values_match_bulk_mode() {
    let input = br#"[-1,"two",true,null,{"k":3.5}]"#;
    // bulk reference
    let mut tokens = [PackedToken::default(); 16];
    let mut bulk = Parser::<PackedToken>::new();
    let used = bulk.parse(input, &mut tokens).unwrap() as usize;
    let expected: Vec<(TokenKind, Vec<u8>)> = tokens[..used]
        .iter()
        .filter(|t| !t.kind().is_container())
        .map(|t| (t.kind(), t.slice(input).to_vec()))
        .collect();

    let walked = walk(input);
    let got: Vec<(TokenKind, Vec<u8>)> = walked
        .iter()
        .filter(|w| !w.kind.is_container())
        .map(|w| (w.kind, w.text.clone()))
        .collect();
    assert_eq!(got, expected);
}

#[test]
fn container_count_agrees_with_final_element_count() {
    let input = br#"{"a":1,"b":[true,null,[1,2],{}],"c":{"d":[false]}}"#;

    // bulk parse: element counts by container id
    let mut tokens = [PackedToken::default(); 32];
    let mut bulk = Parser::<PackedToken>::new();
    let used = bulk.parse(input, &mut tokens).unwrap() as usize;
    let mut final_counts = std::collections::BTreeMap::new();
    for t in &tokens[..used] {
        if t.kind().is_container() {
            final_counts.insert(t.id(), t.element_count());
        }
    }

    // event walk: the lookahead count at entry must match the count the
    // container ends up with
    let mut parser = Parser::<PackedToken>::new();
    let mut token = PackedToken::default();
    let mut last_super = <i16 as TokenIndex>::INVALID;
    let mut stack: Vec<i16> = Vec::new();
    let mut checked = 0;
    loop {
        match parser.parse_one(input, &mut token, &mut last_super).unwrap() {
            SaxEvent::SaveSuper => {
                let count = parser.current_container_count(input, &token).unwrap();
                assert_eq!(
                    count, final_counts[&token.id()],
                    "container id {}",
                    token.id()
                );
                checked += 1;
                stack.push(last_super);
            }
            SaxEvent::RestoreSuper => {
                stack.pop();
                last_super = stack.last().copied().unwrap_or(-1);
            }
            SaxEvent::OneTokenFound => {}
            SaxEvent::Finished => break,
        }
    }
    assert_eq!(checked, final_counts.len());
}

#[test]
fn lookahead_count_leaves_parsing_unaffected() {
    let input = b"[1,2,3]";
    let mut parser = Parser::<PackedToken>::new();
    let mut token = PackedToken::default();
    let mut last_super = <i16 as TokenIndex>::INVALID;
    assert_eq!(
        parser.parse_one(input, &mut token, &mut last_super),
        Ok(SaxEvent::SaveSuper)
    );
    let before = parser.pos();
    assert_eq!(parser.current_container_count(input, &token), Ok(3));
    assert_eq!(parser.pos(), before);
    // parsing continues exactly where it left off
    assert_eq!(
        parser.parse_one(input, &mut token, &mut last_super),
        Ok(SaxEvent::OneTokenFound)
    );
    assert_eq!(token.slice(input), b"1");
}
