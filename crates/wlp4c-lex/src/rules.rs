//! Per-tool token refinement.
//!
//! The DFA knows nothing about keywords or value ranges; those checks are
//! applied at token-emit time by each tool's rule set.

use crate::scan::ScanError;
use crate::token::Token;

/// Lexical rules a tool layers over the shared scanner.
pub trait LexRules {
    /// Whether a synthetic `NEWLINE` token separates token-bearing lines.
    const NEWLINE_SEPARATED: bool;

    /// Reclassifies a raw token and enforces its value constraints.
    fn refine(&self, kind: &str, lexeme: String) -> Result<Token, ScanError>;
}

/// Rules for WLP4 source: `ZERO` folds into `NUM`, reserved words are
/// carved out of `ID`, and `NUM` must fit a signed 32-bit value.
pub struct Wlp4Rules;

impl LexRules for Wlp4Rules {
    const NEWLINE_SEPARATED: bool = false;

    fn refine(&self, kind: &str, lexeme: String) -> Result<Token, ScanError> {
        match kind {
            "NUM" | "ZERO" => {
                let value: i64 = lexeme
                    .parse()
                    .map_err(|_| ScanError::BadNumber(lexeme.clone()))?;
                if value > 2_147_483_647 {
                    return Err(ScanError::NumRange(lexeme));
                }
                Ok(Token::new("NUM", lexeme))
            }
            "ID" => Ok(Token::new(keyword_kind(&lexeme), lexeme)),
            _ => Ok(Token::new(kind, lexeme)),
        }
    }
}

fn keyword_kind(lexeme: &str) -> &'static str {
    match lexeme {
        "int" => "INT",
        "wain" => "WAIN",
        "if" => "IF",
        "else" => "ELSE",
        "while" => "WHILE",
        "println" => "PRINTLN",
        "return" => "RETURN",
        "new" => "NEW",
        "delete" => "DELETE",
        "NULL" => "NULL",
        _ => "ID",
    }
}

/// Rules for MIPS assembly: `ZERO` folds into `DECINT`, registers must name
/// `$0`..`$31`, and numeric literals must fit in a machine word.
pub struct MipsRules;

impl LexRules for MipsRules {
    const NEWLINE_SEPARATED: bool = true;

    fn refine(&self, kind: &str, lexeme: String) -> Result<Token, ScanError> {
        match kind {
            "DECINT" | "ZERO" => {
                let value: i64 = lexeme
                    .parse()
                    .map_err(|_| ScanError::BadNumber(lexeme.clone()))?;
                if !(-2_147_483_648..=4_294_967_295).contains(&value) {
                    return Err(ScanError::DecRange(lexeme));
                }
                Ok(Token::new("DECINT", lexeme))
            }
            "HEXINT" => {
                let digits = lexeme.get(2..).unwrap_or("");
                let value = u64::from_str_radix(digits, 16)
                    .map_err(|_| ScanError::BadNumber(lexeme.clone()))?;
                if value > 0xFFFF_FFFF {
                    return Err(ScanError::HexRange(lexeme));
                }
                Ok(Token::new("HEXINT", lexeme))
            }
            "REGISTER" => {
                let number = lexeme.get(1..).unwrap_or("");
                let value: u64 = number
                    .parse()
                    .map_err(|_| ScanError::BadNumber(lexeme.clone()))?;
                if value > 31 {
                    return Err(ScanError::RegisterRange(lexeme));
                }
                Ok(Token::new("REGISTER", lexeme))
            }
            _ => Ok(Token::new(kind, lexeme)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_reserved_word_reclassifies() {
        let words = [
            ("int", "INT"),
            ("wain", "WAIN"),
            ("if", "IF"),
            ("else", "ELSE"),
            ("while", "WHILE"),
            ("println", "PRINTLN"),
            ("return", "RETURN"),
            ("new", "NEW"),
            ("delete", "DELETE"),
            ("NULL", "NULL"),
        ];
        for (word, kind) in words {
            let tok = Wlp4Rules.refine("ID", word.to_owned()).unwrap();
            assert_eq!(tok.kind, kind, "{word}");
        }
    }

    #[test]
    fn near_keywords_stay_ids() {
        for word in ["Int", "wains", "nul", "NULLS", "If"] {
            let tok = Wlp4Rules.refine("ID", word.to_owned()).unwrap();
            assert_eq!(tok.kind, "ID", "{word}");
        }
    }

    #[test]
    fn overlong_number_is_a_hard_error() {
        // Far past what i64 parses; must error rather than silently wrap.
        let err = Wlp4Rules.refine("NUM", "9".repeat(30)).unwrap_err();
        assert!(matches!(err, ScanError::BadNumber(_)));
        let err = MipsRules.refine("DECINT", "9".repeat(30)).unwrap_err();
        assert!(matches!(err, ScanError::BadNumber(_)));
    }

    #[test]
    fn register_bounds() {
        assert!(MipsRules.refine("REGISTER", "$0".into()).is_ok());
        assert!(MipsRules.refine("REGISTER", "$31".into()).is_ok());
        assert!(MipsRules.refine("REGISTER", "$32".into()).is_err());
    }
}
