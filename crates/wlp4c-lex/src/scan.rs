//! Simplified maximal munch.
//!
//! The scanner drives the DFA over each input line: as long as a transition
//! exists it consumes the byte and extends the current lexeme; when none
//! does, the current state must be accepting, its token is emitted (unless
//! hidden), and the byte is reprocessed from the start state. A sentinel
//! space is appended to every line to flush the final token.

use crate::dfa::Dfa;
use crate::rules::LexRules;
use crate::token::Token;
use thiserror::Error;

/// Lexical error: an unrecognized byte sequence, or a post-processing
/// range/keyword check failure.
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("unrecognized input near '{0}'")]
    Stuck(String),

    #[error("invalid register number: {0}")]
    RegisterRange(String),

    #[error("DECINT must be within -2147483648 and 4294967295: {0}")]
    DecRange(String),

    #[error("HEXINT must be at most 0xFFFFFFFF: {0}")]
    HexRange(String),

    #[error("NUM must be at most 2147483647: {0}")]
    NumRange(String),

    #[error("invalid numeric constant: {0}")]
    BadNumber(String),
}

/// A raw token straight out of the DFA: the accepting state it stopped in
/// plus its lexeme. Hidden tokens are still present at this level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawToken {
    pub state: u16,
    pub lexeme: String,
}

/// Munches one line into raw tokens, hidden ones included.
pub fn munch_line(dfa: &Dfa, line: &str) -> Result<Vec<RawToken>, ScanError> {
    let mut out = Vec::new();
    let mut state = dfa.start();
    let mut lex = String::new();

    let bytes = line.as_bytes();
    let mut i = 0;
    // One past the end stands for the sentinel space.
    while i <= bytes.len() {
        let byte = if i < bytes.len() { bytes[i] } else { b' ' };
        match dfa.step(state, byte) {
            Some(next) => {
                state = next;
                lex.push(byte as char);
                i += 1;
            }
            None => {
                // The sentinel has nothing left to flush.
                if i == bytes.len() && state == dfa.start() {
                    break;
                }
                if !dfa.is_accepting(state) {
                    lex.push(byte as char);
                    return Err(ScanError::Stuck(lex));
                }
                out.push(RawToken {
                    state,
                    lexeme: std::mem::take(&mut lex),
                });
                state = dfa.start();
                // The byte is reprocessed, not consumed.
            }
        }
    }
    // Flush whatever the sentinel left pending (trailing whitespace or a
    // comment run; both accept).
    if !lex.is_empty() {
        if !dfa.is_accepting(state) {
            return Err(ScanError::Stuck(lex));
        }
        out.push(RawToken { state, lexeme: lex });
    }
    Ok(out)
}

/// Scans the whole input, applying the tool's lexical rules to every
/// emitted token. When the rules ask for it, a synthetic `NEWLINE` token is
/// inserted between lines that produced tokens.
pub fn tokenize<R: LexRules>(dfa: &Dfa, input: &str, rules: &R) -> Result<Vec<Token>, ScanError> {
    let mut tokens = Vec::new();
    for line in input.lines() {
        let raw = munch_line(dfa, line)?;
        let mut line_tokens = Vec::new();
        for tok in raw {
            if dfa.is_hidden(tok.state) {
                continue;
            }
            line_tokens.push(rules.refine(dfa.state_name(tok.state), tok.lexeme)?);
        }
        if line_tokens.is_empty() {
            continue;
        }
        if R::NEWLINE_SEPARATED && !tokens.is_empty() {
            tokens.push(Token::new("NEWLINE", ""));
        }
        tokens.append(&mut line_tokens);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{MipsRules, Wlp4Rules};
    use proptest::prelude::*;

    fn wlp4_dfa() -> Dfa {
        Dfa::parse(crate::WLP4_DFA).unwrap()
    }

    fn mips_dfa() -> Dfa {
        Dfa::parse(crate::MIPS_DFA).unwrap()
    }

    fn kinds(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.kind.as_str()).collect()
    }

    #[test]
    fn munch_prefers_longest_match() {
        let dfa = wlp4_dfa();
        let tokens = tokenize(&dfa, "<= == = <", &Wlp4Rules).unwrap();
        assert_eq!(kinds(&tokens), ["LE", "EQ", "BECOMES", "LT"]);
    }

    #[test]
    fn munch_splits_adjacent_tokens() {
        let dfa = wlp4_dfa();
        let tokens = tokenize(&dfa, "a+b", &Wlp4Rules).unwrap();
        assert_eq!(kinds(&tokens), ["ID", "PLUS", "ID"]);
        assert_eq!(tokens[0].lexeme, "a");
    }

    #[test]
    fn comments_and_whitespace_are_hidden() {
        let dfa = wlp4_dfa();
        let tokens = tokenize(&dfa, "x // trailing comment\ny", &Wlp4Rules).unwrap();
        assert_eq!(kinds(&tokens), ["ID", "ID"]);
    }

    #[test]
    fn wlp4_scanner_emits_no_newlines() {
        let dfa = wlp4_dfa();
        let tokens = tokenize(&dfa, "a\nb\n", &Wlp4Rules).unwrap();
        assert_eq!(kinds(&tokens), ["ID", "ID"]);
    }

    #[test]
    fn leading_zero_number_is_stuck() {
        let dfa = wlp4_dfa();
        let err = tokenize(&dfa, "01", &Wlp4Rules).unwrap_err();
        assert!(matches!(err, ScanError::Stuck(_)));
    }

    #[test]
    fn unknown_character_is_stuck() {
        let dfa = wlp4_dfa();
        assert!(tokenize(&dfa, "a # b", &Wlp4Rules).is_err());
    }

    #[test]
    fn keywords_are_reclassified() {
        let dfa = wlp4_dfa();
        let tokens = tokenize(&dfa, "int wain while whiler NULL Null", &Wlp4Rules).unwrap();
        assert_eq!(kinds(&tokens), ["INT", "WAIN", "WHILE", "ID", "NULL", "ID"]);
    }

    #[test]
    fn num_boundaries() {
        let dfa = wlp4_dfa();
        let tokens = tokenize(&dfa, "2147483647", &Wlp4Rules).unwrap();
        assert_eq!(kinds(&tokens), ["NUM"]);
        assert!(tokenize(&dfa, "2147483648", &Wlp4Rules).is_err());
    }

    #[test]
    fn zero_becomes_num() {
        let dfa = wlp4_dfa();
        let tokens = tokenize(&dfa, "0", &Wlp4Rules).unwrap();
        assert_eq!(kinds(&tokens), ["NUM"]);
        assert_eq!(tokens[0].lexeme, "0");
    }

    #[test]
    fn mips_newline_between_token_lines_only() {
        let dfa = mips_dfa();
        let tokens = tokenize(&dfa, "jr $31\n\n; only a comment\nadd $1, $2, $3\n", &MipsRules)
            .unwrap();
        assert_eq!(
            kinds(&tokens),
            [
                "ID", "REGISTER", "NEWLINE", "ID", "REGISTER", "COMMA", "REGISTER", "COMMA",
                "REGISTER"
            ]
        );
    }

    #[test]
    fn mips_register_boundaries() {
        let dfa = mips_dfa();
        assert!(tokenize(&dfa, "jr $31", &MipsRules).is_ok());
        let err = tokenize(&dfa, "jr $32", &MipsRules).unwrap_err();
        assert!(matches!(err, ScanError::RegisterRange(_)));
    }

    #[test]
    fn mips_decint_boundaries() {
        let dfa = mips_dfa();
        let tokens = tokenize(&dfa, ".word -2147483648", &MipsRules).unwrap();
        assert_eq!(kinds(&tokens), ["DOTID", "DECINT"]);
        assert!(tokenize(&dfa, ".word 4294967295", &MipsRules).is_ok());
        assert!(tokenize(&dfa, ".word 4294967296", &MipsRules).is_err());
        assert!(tokenize(&dfa, ".word -2147483649", &MipsRules).is_err());
    }

    #[test]
    fn mips_hexint_boundaries() {
        let dfa = mips_dfa();
        let tokens = tokenize(&dfa, ".word 0xFFFFFFFF", &MipsRules).unwrap();
        assert_eq!(kinds(&tokens), ["DOTID", "HEXINT"]);
        assert!(tokenize(&dfa, ".word 0x100000000", &MipsRules).is_err());
    }

    #[test]
    fn mips_zero_becomes_decint() {
        let dfa = mips_dfa();
        let tokens = tokenize(&dfa, ".word 0", &MipsRules).unwrap();
        assert_eq!(kinds(&tokens), ["DOTID", "DECINT"]);
    }

    #[test]
    fn labeldef_keeps_colon_in_lexeme() {
        let dfa = mips_dfa();
        let tokens = tokenize(&dfa, "loop: jr $31", &MipsRules).unwrap();
        assert_eq!(tokens[0].kind, "LABELDEF");
        assert_eq!(tokens[0].lexeme, "loop:");
    }

    proptest! {
        /// Scanner concatenation invariant: the lexemes of all raw tokens,
        /// hidden ones included, reconstruct the line plus the sentinel
        /// space used to flush the final token.
        #[test]
        fn concatenation_reconstructs_line(line in "[a-z +\\-*()=<>,&;{}]{0,40}") {
            // `;` is SEMI in WLP4, so the whole alphabet always scans.
            let dfa = wlp4_dfa();
            let raw = munch_line(&dfa, &line).unwrap();
            let concat: String = raw.iter().map(|t| t.lexeme.as_str()).collect();
            prop_assert_eq!(concat, format!("{} ", line));
        }
    }
}
