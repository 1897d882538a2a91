//! Regular-expression abstract syntax, as handed over by the front end.
//!
//! The AST arrives already validated and with macro bodies already expanded
//! in the macro table; rule expressions may still *reference* macros by name,
//! so the structural queries here resolve through [`Macros`]. No parsing or
//! validation happens in this crate.

use std::collections::{BTreeSet, HashMap};

use crate::charset::IntCharSet;

/// A regular expression over character codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Regex {
    /// A single literal character.
    Char(u32),
    /// A single literal character, matched case-insensitively.
    CharIgnoreCase(u32),
    /// A character class `[...]`.
    Class(IntCharSet),
    /// A negated character class `[^...]`.
    NotClass(IntCharSet),
    /// A literal string (sequence of character codes).
    Str(Vec<u32>),
    Concat(Vec<Regex>),
    Alt(Vec<Regex>),
    Star(Box<Regex>),
    Plus(Box<Regex>),
    Question(Box<Regex>),
    /// Language complement `!r`.
    Not(Box<Regex>),
    /// Reference to a named macro.
    Macro(String),
}

/// The macro table: names mapped to already-expanded regex bodies.
#[derive(Debug, Clone, Default)]
pub struct Macros {
    map: HashMap<String, Regex>,
}

impl Macros {
    pub fn new() -> Self {
        Macros { map: HashMap::new() }
    }

    pub fn insert(&mut self, name: &str, body: Regex) {
        self.map.insert(name.to_string(), body);
    }

    /// Resolve a macro reference. The front end validates all references, so
    /// a missing name is an internal invariant violation.
    pub fn get(&self, name: &str) -> &Regex {
        self.map
            .get(name)
            .unwrap_or_else(|| panic!("unresolved macro reference `{name}`"))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Regex)> {
        self.map.iter()
    }
}

/// The number of characters every match of `regex` consumes, if that number
/// is the same for all matches.
pub fn fixed_length(regex: &Regex, macros: &Macros) -> Option<usize> {
    match regex {
        Regex::Char(_) | Regex::CharIgnoreCase(_) | Regex::Class(_) | Regex::NotClass(_) => Some(1),
        Regex::Str(codes) => Some(codes.len()),
        Regex::Concat(parts) => parts
            .iter()
            .map(|p| fixed_length(p, macros))
            .try_fold(0usize, |acc, len| len.map(|l| acc + l)),
        Regex::Alt(parts) => {
            let mut lengths = parts.iter().map(|p| fixed_length(p, macros));
            let first = lengths.next()??;
            for len in lengths {
                if len? != first {
                    return None;
                }
            }
            Some(first)
        }
        Regex::Star(_) | Regex::Plus(_) | Regex::Question(_) | Regex::Not(_) => None,
        Regex::Macro(name) => fixed_length(macros.get(name), macros),
    }
}

/// If `regex` is a finite union whose alternatives all have fixed length,
/// the set of those lengths. Used to classify `r1 / r2` lookahead where `r2`
/// is not itself fixed-length but each alternative is.
pub fn finite_choice_lengths(regex: &Regex, macros: &Macros) -> Option<BTreeSet<usize>> {
    match regex {
        Regex::Alt(parts) => {
            let mut lengths = BTreeSet::new();
            for part in parts {
                match fixed_length(part, macros) {
                    Some(len) => {
                        lengths.insert(len);
                    }
                    None => match finite_choice_lengths(part, macros) {
                        Some(nested) => lengths.extend(nested),
                        None => return None,
                    },
                }
            }
            Some(lengths)
        }
        Regex::Macro(name) => finite_choice_lengths(macros.get(name), macros),
        _ => fixed_length(regex, macros).map(|len| BTreeSet::from([len])),
    }
}

/// The alternatives of a top-level union whose matches consume exactly `len`
/// characters. Companion to [`finite_choice_lengths`]: the caller builds one
/// marked automaton tail per distinct length.
pub fn alternatives_of_length(regex: &Regex, len: usize, macros: &Macros) -> Vec<Regex> {
    match regex {
        Regex::Alt(parts) => parts
            .iter()
            .flat_map(|p| alternatives_of_length(p, len, macros))
            .collect(),
        Regex::Macro(name) => alternatives_of_length(macros.get(name), len, macros),
        other => {
            if fixed_length(other, macros) == Some(len) {
                vec![other.clone()]
            } else {
                Vec::new()
            }
        }
    }
}

/// Structural reversal: the returned expression matches exactly the reversed
/// strings of `regex`'s language. Macro references are inlined since the
/// reversed body has no name.
pub fn reverse(regex: &Regex, macros: &Macros) -> Regex {
    match regex {
        Regex::Char(_) | Regex::CharIgnoreCase(_) | Regex::Class(_) | Regex::NotClass(_) => {
            regex.clone()
        }
        Regex::Str(codes) => Regex::Str(codes.iter().rev().copied().collect()),
        Regex::Concat(parts) => {
            Regex::Concat(parts.iter().rev().map(|p| reverse(p, macros)).collect())
        }
        Regex::Alt(parts) => Regex::Alt(parts.iter().map(|p| reverse(p, macros)).collect()),
        Regex::Star(inner) => Regex::Star(Box::new(reverse(inner, macros))),
        Regex::Plus(inner) => Regex::Plus(Box::new(reverse(inner, macros))),
        Regex::Question(inner) => Regex::Question(Box::new(reverse(inner, macros))),
        // reverse(complement(L)) = complement(reverse(L))
        Regex::Not(inner) => Regex::Not(Box::new(reverse(inner, macros))),
        Regex::Macro(name) => reverse(macros.get(name), macros),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chr(c: char) -> Regex {
        Regex::Char(c as u32)
    }

    #[test]
    fn test_fixed_length_concat() {
        let macros = Macros::new();
        let re = Regex::Concat(vec![chr('a'), Regex::Str(vec![b'b' as u32, b'c' as u32])]);
        assert_eq!(fixed_length(&re, &macros), Some(3));
    }

    #[test]
    fn test_fixed_length_alt_mismatch() {
        let macros = Macros::new();
        let equal = Regex::Alt(vec![chr('a'), chr('b')]);
        assert_eq!(fixed_length(&equal, &macros), Some(1));

        let unequal = Regex::Alt(vec![chr('a'), Regex::Str(vec![1, 2])]);
        assert_eq!(fixed_length(&unequal, &macros), None);
    }

    #[test]
    fn test_fixed_length_star_is_variable() {
        let macros = Macros::new();
        assert_eq!(fixed_length(&Regex::Star(Box::new(chr('a'))), &macros), None);
    }

    #[test]
    fn test_fixed_length_through_macro() {
        let mut macros = Macros::new();
        macros.insert("DIGIT", Regex::Class(IntCharSet::range(b'0' as u32, b'9' as u32)));
        let re = Regex::Concat(vec![Regex::Macro("DIGIT".into()), Regex::Macro("DIGIT".into())]);
        assert_eq!(fixed_length(&re, &macros), Some(2));
    }

    #[test]
    fn test_finite_choice_lengths() {
        let macros = Macros::new();
        let re = Regex::Alt(vec![
            chr('x'),
            Regex::Str(vec![1, 2, 3]),
            Regex::Alt(vec![Regex::Str(vec![4, 5]), chr('y')]),
        ]);
        let lengths = finite_choice_lengths(&re, &macros).expect("all alternatives fixed");
        assert_eq!(lengths.into_iter().collect::<Vec<_>>(), vec![1, 2, 3]);

        let open = Regex::Alt(vec![chr('x'), Regex::Star(Box::new(chr('y')))]);
        assert_eq!(finite_choice_lengths(&open, &macros), None);
    }

    #[test]
    fn test_alternatives_of_length() {
        let macros = Macros::new();
        let re = Regex::Alt(vec![chr('x'), Regex::Str(vec![1, 2]), chr('y')]);
        let ones = alternatives_of_length(&re, 1, &macros);
        assert_eq!(ones, vec![chr('x'), chr('y')]);
        let twos = alternatives_of_length(&re, 2, &macros);
        assert_eq!(twos, vec![Regex::Str(vec![1, 2])]);
    }

    #[test]
    fn test_reverse() {
        let macros = Macros::new();
        let re = Regex::Concat(vec![chr('a'), chr('b'), Regex::Star(Box::new(chr('c')))]);
        let rev = reverse(&re, &macros);
        assert_eq!(
            rev,
            Regex::Concat(vec![Regex::Star(Box::new(chr('c'))), chr('b'), chr('a')])
        );
    }

    #[test]
    fn test_reverse_str() {
        let macros = Macros::new();
        let rev = reverse(&Regex::Str(vec![1, 2, 3]), &macros);
        assert_eq!(rev, Regex::Str(vec![3, 2, 1]));
    }
}
