//! The generation run: all stages wired left to right.
//!
//! ```text
//! RuleTable + Macros
//!      │
//!      ▼
//! CharClassPartition ──▶ NfaBuilder ──▶ subset ──▶ minimize ──▶ compress
//!                                                     │
//!                                                     ▼
//!                                          never-matched diagnostics
//! ```
//!
//! Single-threaded and synchronous throughout; the only outputs are the
//! [`CompiledScanner`] value and the warnings it carries.

use crate::action::{GenContext, LookaheadKind};
use crate::charset::IntCharSet;
use crate::classes::CharClassPartition;
use crate::compress::{compress_dfa, CompressedTables};
use crate::dfa::Dfa;
use crate::minimize::minimize;
use crate::nfa::NfaBuilder;
use crate::regex::{Macros, Regex};
use crate::subset::nfa_to_dfa;
use crate::{CharDomain, GenError, RuleTable};

/// Per-run configuration.
#[derive(Debug, Clone)]
pub struct GenOptions {
    pub domain: CharDomain,
    /// Minimization can be switched off when the exact unminimized table is
    /// wanted for debugging; skipping it is a configuration, not an error.
    pub minimize: bool,
}

impl Default for GenOptions {
    fn default() -> Self {
        GenOptions {
            domain: CharDomain::Unicode16,
            minimize: true,
        }
    }
}

/// Non-fatal findings, collected and returned rather than logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A rule whose action survived into no reachable accepting state; an
    /// earlier rule subsumes its entire language. Best-effort and empirical:
    /// survival through minimization is the test, not a containment proof.
    NeverMatched { line: usize, content: String },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::NeverMatched { line, content } => {
                write!(f, "rule at line {line} can never be matched: {content:?}")
            }
        }
    }
}

/// Everything the emitter consumes.
#[derive(Debug, Clone)]
pub struct CompiledScanner {
    /// The final (by default minimized) DFA.
    pub dfa: Dfa,
    /// char → class code over the full configured domain.
    pub char_map: Vec<usize>,
    pub num_classes: usize,
    pub tables: CompressedTables,
    pub warnings: Vec<Warning>,
}

/// Run the whole compilation pipeline over a validated rule table.
pub fn compile(
    rules: &RuleTable,
    macros: &Macros,
    options: &GenOptions,
) -> Result<CompiledScanner, GenError> {
    if rules.num_lex_states == 0 {
        return Err(GenError::NoLexicalStates);
    }

    let max_char = options.domain.max_char();
    let mut classes = CharClassPartition::new(max_char);
    for rule in &rules.rules {
        collect_classes(&rule.regex, macros, &mut classes);
        if let Some(look) = &rule.look {
            collect_classes(look, macros, &mut classes);
        }
    }

    let num_look_pairs = rules
        .rules
        .iter()
        .filter(|r| NfaBuilder::needs_look_pair(r, macros))
        .count();

    let mut ctx = GenContext::new();
    let mut builder = NfaBuilder::new(&classes, macros, rules.num_lex_states, num_look_pairs);
    for (priority, rule) in rules.rules.iter().enumerate() {
        builder.insert_rule(rule, priority, &mut ctx);
    }
    let nfa = builder.finish();

    let mut dfa = nfa_to_dfa(&nfa)?;
    if options.minimize {
        minimize(&mut dfa);
    }

    let char_map = classes.char_map();
    let tables = compress_dfa(&dfa, &char_map);
    let warnings = never_matched(&dfa, &ctx);

    Ok(CompiledScanner {
        dfa,
        char_map,
        num_classes: classes.len(),
        tables,
        warnings,
    })
}

/// Pre-pass over every rule expression: each character set appearing anywhere
/// refines the partition, so NFA construction can work purely in class codes.
fn collect_classes(regex: &Regex, macros: &Macros, classes: &mut CharClassPartition) {
    match regex {
        Regex::Char(c) => classes.make_class(&IntCharSet::single(*c), false),
        Regex::CharIgnoreCase(c) => classes.make_class(&IntCharSet::single(*c), true),
        Regex::Class(set) | Regex::NotClass(set) => classes.make_class(set, false),
        Regex::Str(codes) => {
            for &c in codes {
                classes.make_class(&IntCharSet::single(c), false);
            }
        }
        Regex::Concat(parts) | Regex::Alt(parts) => {
            for part in parts {
                collect_classes(part, macros, classes);
            }
        }
        Regex::Star(inner) | Regex::Plus(inner) | Regex::Question(inner) | Regex::Not(inner) => {
            collect_classes(inner, macros, classes);
        }
        Regex::Macro(name) => collect_classes(macros.get(name), macros, classes),
    }
}

/// Used actions with no equivalent survivor among the DFA's accepting states.
///
/// Forward/backward pass markers are bookkeeping copies of their rule and are
/// skipped; EOF actions never pass through the NFA builder, so they are never
/// registered and need no exclusion here. One warning per (line, content)
/// even when a rule produced several action copies.
fn never_matched(dfa: &Dfa, ctx: &GenContext) -> Vec<Warning> {
    let survivors: Vec<_> = dfa.action.iter().flatten().collect();
    let mut warnings: Vec<Warning> = Vec::new();

    for used in ctx.used_actions() {
        if matches!(
            used.kind,
            LookaheadKind::ForwardPass | LookaheadKind::BackwardPass
        ) {
            continue;
        }
        // A rule is live if any of its action copies survived, under any
        // lookahead tagging of the same source rule.
        let rule_survived = survivors
            .iter()
            .any(|a| a.line == used.line && a.content == used.content);
        if rule_survived {
            continue;
        }
        let warning = Warning::NeverMatched {
            line: used.line,
            content: used.content.clone(),
        };
        if !warnings.contains(&warning) {
            warnings.push(warning);
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Rule, RuleTable};

    fn rule(line: usize, regex: Regex, content: &str) -> Rule {
        Rule {
            line,
            states: vec![0],
            bol: false,
            regex,
            look: None,
            content: content.to_string(),
        }
    }

    fn table(rules: Vec<Rule>) -> RuleTable {
        RuleTable {
            rules,
            num_lex_states: 1,
            inclusive: vec![true],
            eof_actions: vec![None],
            default_eof: None,
        }
    }

    fn ascii() -> GenOptions {
        GenOptions {
            domain: CharDomain::Ascii7,
            minimize: true,
        }
    }

    #[test]
    fn test_compile_small_ruleset() {
        let rules = table(vec![
            rule(1, Regex::Str(vec![b'i' as u32, b'f' as u32]), "kw_if"),
            rule(
                2,
                Regex::Plus(Box::new(Regex::Class(IntCharSet::range(
                    b'a' as u32,
                    b'z' as u32,
                )))),
                "ident",
            ),
        ]);
        let compiled = compile(&rules, &Macros::new(), &ascii()).unwrap();
        assert!(compiled.warnings.is_empty());
        assert_eq!(compiled.char_map.len(), 0x80);
        assert!(compiled.dfa.len() >= 3);
        assert_eq!(compiled.num_classes, compiled.dfa.num_classes);
    }

    #[test]
    fn test_zero_lexical_states_is_an_error() {
        let rules = RuleTable {
            rules: Vec::new(),
            num_lex_states: 0,
            inclusive: Vec::new(),
            eof_actions: Vec::new(),
            default_eof: None,
        };
        assert!(matches!(
            compile(&rules, &Macros::new(), &ascii()),
            Err(GenError::NoLexicalStates)
        ));
    }

    #[test]
    fn test_subsumed_rule_is_reported() {
        // [a-z]+ before "if": the keyword rule's language is fully covered
        // by the earlier, higher-priority identifier rule.
        let rules = table(vec![
            rule(
                1,
                Regex::Plus(Box::new(Regex::Class(IntCharSet::range(
                    b'a' as u32,
                    b'z' as u32,
                )))),
                "ident",
            ),
            rule(2, Regex::Str(vec![b'i' as u32, b'f' as u32]), "kw_if"),
        ]);
        let compiled = compile(&rules, &Macros::new(), &ascii()).unwrap();
        assert_eq!(
            compiled.warnings,
            vec![Warning::NeverMatched {
                line: 2,
                content: "kw_if".into()
            }]
        );
    }

    #[test]
    fn test_minimization_can_be_skipped() {
        let rules = table(vec![rule(
            1,
            Regex::Alt(vec![
                Regex::Str(vec![b'a' as u32, b'c' as u32]),
                Regex::Str(vec![b'b' as u32, b'c' as u32]),
            ]),
            "emit",
        )]);
        let full = compile(
            &rules,
            &Macros::new(),
            &GenOptions {
                domain: CharDomain::Ascii7,
                minimize: false,
            },
        )
        .unwrap();
        let minimized = compile(&rules, &Macros::new(), &ascii()).unwrap();
        assert!(minimized.dfa.len() < full.dfa.len());
    }
}
