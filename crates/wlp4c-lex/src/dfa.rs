//! DFA description loader.
//!
//! Parses the textual format with three headed sections, in order:
//! `.STATES`, `.TRANSITIONS`, `.INPUT` (the third is ignored). State names
//! carrying a trailing `!` are accepting; names beginning with `?` are
//! hidden: accepting, but their tokens are suppressed (whitespace,
//! comments). Transition lines read `from c1 c2 ... cN to`, where each `ci`
//! is an escaped single character or a three-character range `a-b`.
//!
//! State names are interned to indices here, once; the scanner's per-byte
//! lookup is then a dense `(state, byte)` table.

use thiserror::Error;
use wlp4c_util::Interner;

const STATES_HEADER: &str = ".STATES";
const TRANSITIONS_HEADER: &str = ".TRANSITIONS";
const INPUT_HEADER: &str = ".INPUT";

/// Sentinel for "no transition" in the dense table.
const NO_STATE: u16 = u16::MAX;

/// Error loading a DFA description resource. Fatal at startup.
#[derive(Debug, Error)]
pub enum DfaError {
    #[error("expected {0} header, found end of input")]
    MissingHeader(&'static str),

    #[error("expected {expected} header, found: {found}")]
    UnexpectedLine { expected: &'static str, found: String },

    #[error("incomplete transition line: {0}")]
    IncompleteTransition(String),

    #[error("invalid escape sequence \\{0}")]
    BadEscape(String),

    #[error("character {0} is outside ASCII range (0x00 to 0x7F)")]
    NonAscii(String),

    #[error("expected character or range, but found {0}")]
    BadCharOrRange(String),

    #[error("transition mentions unknown state {0}")]
    UnknownState(String),

    #[error("state set is empty")]
    NoStates,
}

/// A loaded DFA: interned state names, accepting/hidden flags, and a dense
/// transition table over ASCII.
#[derive(Debug)]
pub struct Dfa {
    names: Vec<String>,
    accepting: Vec<bool>,
    hidden: Vec<bool>,
    next: Vec<[u16; 128]>,
    start: u16,
}

impl Dfa {
    /// Parses a DFA description. The first listed state is the start state.
    pub fn parse(text: &str) -> Result<Self, DfaError> {
        let mut lines = text.lines();

        // Skip blank lines until the .STATES header.
        loop {
            let line = lines.next().ok_or(DfaError::MissingHeader(STATES_HEADER))?;
            let squished = squish(line);
            if squished == STATES_HEADER {
                break;
            }
            if !squished.is_empty() {
                return Err(DfaError::UnexpectedLine {
                    expected: STATES_HEADER,
                    found: squished,
                });
            }
        }

        // State set: whitespace-separated names until the .TRANSITIONS header.
        let mut interner = Interner::new();
        let mut names = Vec::new();
        let mut accepting = Vec::new();
        let mut hidden = Vec::new();
        'states: loop {
            let line = lines
                .next()
                .ok_or(DfaError::MissingHeader(TRANSITIONS_HEADER))?;
            for word in line.split_whitespace() {
                if word == TRANSITIONS_HEADER {
                    break 'states;
                }
                let (name, accepts) = match word.strip_suffix('!') {
                    Some(stem) if !stem.is_empty() => (stem, true),
                    _ => (word, false),
                };
                interner.intern(name);
                names.push(name.to_owned());
                accepting.push(accepts);
                hidden.push(name.starts_with('?'));
            }
        }
        if names.is_empty() {
            return Err(DfaError::NoStates);
        }

        let mut next = vec![[NO_STATE; 128]; names.len()];

        // Transition lines until .INPUT or end of input.
        for line in lines {
            let squished = squish(line);
            if squished == INPUT_HEADER {
                break;
            }
            let words: Vec<&str> = squished.split_whitespace().collect();
            if words.is_empty() {
                continue;
            }
            if words.len() < 3 {
                return Err(DfaError::IncompleteTransition(squished));
            }
            let from = resolve(&interner, words[0])?;
            let to = resolve(&interner, words[words.len() - 1])?;
            for spec in &words[1..words.len() - 1] {
                let chars = escape(spec)?;
                for byte in expand(&chars)? {
                    next[from as usize][byte as usize] = to;
                }
            }
        }

        Ok(Dfa {
            names,
            accepting,
            hidden,
            next,
            start: 0,
        })
    }

    #[inline]
    pub fn start(&self) -> u16 {
        self.start
    }

    /// The transition function, partial over ASCII.
    #[inline]
    pub fn step(&self, state: u16, byte: u8) -> Option<u16> {
        if byte >= 128 {
            return None;
        }
        match self.next[state as usize][byte as usize] {
            NO_STATE => None,
            s => Some(s),
        }
    }

    #[inline]
    pub fn is_accepting(&self, state: u16) -> bool {
        self.accepting[state as usize]
    }

    #[inline]
    pub fn is_hidden(&self, state: u16) -> bool {
        self.hidden[state as usize]
    }

    pub fn state_name(&self, state: u16) -> &str {
        &self.names[state as usize]
    }
}

fn resolve(interner: &Interner, name: &str) -> Result<u16, DfaError> {
    interner
        .get(name)
        .map(|s| s.0 as u16)
        .ok_or_else(|| DfaError::UnknownState(name.to_owned()))
}

/// Expands an escaped spec into the bytes it denotes: either a single
/// character or an inclusive range `a-b`.
fn expand(chars: &[u8]) -> Result<Vec<u8>, DfaError> {
    match chars {
        [c] => Ok(vec![*c]),
        [lo, b'-', hi] => Ok((*lo..=*hi).collect()),
        _ => Err(DfaError::BadCharOrRange(unescape(chars))),
    }
}

/// Replaces escape sequences with the bytes they denote. Recognized:
/// `\s \n \r \t`, `\xHH` with HH at most 7F, and `\<graph>` yielding
/// `<graph>` (which covers `\\`). Anything else after a backslash is
/// malformed.
fn escape(spec: &str) -> Result<Vec<u8>, DfaError> {
    let mut out = Vec::new();
    let bytes = spec.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b >= 128 {
            return Err(DfaError::NonAscii(unescape(&spec.as_bytes()[i..=i])));
        }
        if b != b'\\' {
            out.push(b);
            i += 1;
            continue;
        }
        let Some(&c) = bytes.get(i + 1) else {
            return Err(DfaError::BadEscape(String::new()));
        };
        i += 2;
        match c {
            b's' => out.push(b' '),
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'x' => {
                let hi = bytes.get(i).copied().and_then(hex_digit);
                let lo = bytes.get(i + 1).copied().and_then(hex_digit);
                let (Some(hi), Some(lo)) = (hi, lo) else {
                    let rest = &bytes[i..bytes.len().min(i + 2)];
                    return Err(DfaError::BadEscape(format!(
                        "x{}",
                        String::from_utf8_lossy(rest)
                    )));
                };
                let code = hi * 16 + lo;
                if code > 0x7F {
                    return Err(DfaError::NonAscii(format!("\\x{:02X}", code)));
                }
                out.push(code);
                i += 2;
            }
            _ if c.is_ascii_graphic() => out.push(c),
            _ => return Err(DfaError::BadEscape((c as char).to_string())),
        }
    }
    Ok(out)
}

/// Converts non-printing bytes back into escape sequences, for diagnostics.
fn unescape(bytes: &[u8]) -> String {
    let mut out = String::new();
    for &b in bytes {
        match b {
            b' ' => out.push_str("\\s"),
            b'\n' => out.push_str("\\n"),
            b'\r' => out.push_str("\\r"),
            b'\t' => out.push_str("\\t"),
            _ if b.is_ascii_graphic() => out.push(b as char),
            _ => out.push_str(&format!("\\x{:02X}", b)),
        }
    }
    out
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(10 + b - b'a'),
        b'A'..=b'F' => Some(10 + b - b'A'),
        _ => None,
    }
}

/// Trims and collapses internal whitespace runs to single spaces.
fn squish(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY: &str = "\
.STATES
start
word!
?ws!
.TRANSITIONS
start a-z word
word a-z word
start \\s \\t ?ws
?ws \\s \\t ?ws
.INPUT
ignored
";

    #[test]
    fn parses_states_and_flags() {
        let dfa = Dfa::parse(TINY).unwrap();
        assert_eq!(dfa.state_name(0), "start");
        assert!(!dfa.is_accepting(0));
        assert!(dfa.is_accepting(1));
        assert!(dfa.is_hidden(2));
        assert!(!dfa.is_hidden(1));
    }

    #[test]
    fn range_transitions_cover_every_byte() {
        let dfa = Dfa::parse(TINY).unwrap();
        for b in b'a'..=b'z' {
            assert_eq!(dfa.step(0, b), Some(1), "byte {}", b as char);
        }
        assert_eq!(dfa.step(0, b'A'), None);
        assert_eq!(dfa.step(0, b' '), Some(2));
    }

    #[test]
    fn input_section_is_ignored() {
        // The `ignored` line after .INPUT must not be parsed as a transition.
        assert!(Dfa::parse(TINY).is_ok());
    }

    #[test]
    fn missing_states_header_fails() {
        let err = Dfa::parse("bogus\n.STATES\n").unwrap_err();
        assert!(matches!(err, DfaError::UnexpectedLine { .. }));
        let err = Dfa::parse("\n\n").unwrap_err();
        assert!(matches!(err, DfaError::MissingHeader(".STATES")));
    }

    #[test]
    fn missing_transitions_header_fails() {
        let err = Dfa::parse(".STATES\nstart a!\n").unwrap_err();
        assert!(matches!(err, DfaError::MissingHeader(".TRANSITIONS")));
    }

    #[test]
    fn short_transition_line_fails() {
        let text = ".STATES\nstart a!\n.TRANSITIONS\nstart a\n";
        let err = Dfa::parse(text).unwrap_err();
        assert!(matches!(err, DfaError::IncompleteTransition(_)));
    }

    #[test]
    fn hex_escape_above_ascii_fails() {
        let text = ".STATES\nstart a!\n.TRANSITIONS\nstart \\x80 a\n";
        let err = Dfa::parse(text).unwrap_err();
        assert!(matches!(err, DfaError::NonAscii(_)));
    }

    #[test]
    fn malformed_hex_escape_fails() {
        let text = ".STATES\nstart a!\n.TRANSITIONS\nstart \\xZ a\n";
        let err = Dfa::parse(text).unwrap_err();
        assert!(matches!(err, DfaError::BadEscape(_)));
    }

    #[test]
    fn hex_escape_range_expands() {
        let text = ".STATES\nstart c!\n.TRANSITIONS\nstart \\x00-\\x09 c\n";
        let dfa = Dfa::parse(text).unwrap();
        for b in 0u8..=9 {
            assert_eq!(dfa.step(0, b), Some(1));
        }
        assert_eq!(dfa.step(0, 10), None);
    }

    #[test]
    fn escaped_graphic_yields_itself() {
        let text = ".STATES\nstart bs!\n.TRANSITIONS\nstart \\\\ bs\n";
        let dfa = Dfa::parse(text).unwrap();
        assert_eq!(dfa.step(0, b'\\'), Some(1));
    }

    #[test]
    fn bundled_wlp4_dfa_loads() {
        let dfa = Dfa::parse(crate::WLP4_DFA).unwrap();
        assert_eq!(dfa.state_name(dfa.start()), "start");
        // `0` starts ZERO, not NUM.
        let zero = dfa.step(dfa.start(), b'0').unwrap();
        assert_eq!(dfa.state_name(zero), "ZERO");
        // `01` is NOTNUM, which must not accept.
        let notnum = dfa.step(zero, b'1').unwrap();
        assert!(!dfa.is_accepting(notnum));
    }

    #[test]
    fn bundled_mips_dfa_loads() {
        let dfa = Dfa::parse(crate::MIPS_DFA).unwrap();
        let mut state = dfa.start();
        for b in b"foo:" {
            state = dfa.step(state, *b).unwrap();
        }
        assert_eq!(dfa.state_name(state), "LABELDEF");
        assert!(dfa.is_accepting(state));
    }
}
