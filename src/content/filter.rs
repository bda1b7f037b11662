//! Scope-tracking watermark filter
//!
//! A single left-to-right pass over a content stream's tokens. Watermark
//! graphics states and XObject invocations are dropped together with their
//! operands, and text shown while a watermark graphics state is active in the
//! current scope is dropped as well. Scope delimiters always pass through, so
//! the rewritten stream nests exactly like the original.

use std::collections::BTreeSet;

use super::token::Token;

/// Resource names identified as watermark artifacts on one page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CandidateSet {
    names: BTreeSet<Vec<u8>>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<Vec<u8>>) -> bool {
        self.names.insert(name.into())
    }

    pub fn contains(&self, name: &[u8]) -> bool {
        self.names.contains(name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.names.iter().map(Vec::as_slice)
    }

    /// Names rendered for display, e.g. in logs and scan reports
    pub fn display_names(&self) -> Vec<String> {
        self.iter()
            .map(|name| String::from_utf8_lossy(name).into_owned())
            .collect()
    }
}

impl<N: Into<Vec<u8>>> FromIterator<N> for CandidateSet {
    fn from_iter<I: IntoIterator<Item = N>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// Counts of what a filter pass removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// `gs` operations naming a watermark graphics state
    pub graphics_states: usize,
    /// `Do` operations invoking a watermark XObject
    pub xobjects: usize,
    /// `Tj`/`TJ` operations shown under a watermark graphics state
    pub text_shows: usize,
}

impl FilterStats {
    pub fn total(&self) -> usize {
        self.graphics_states + self.xobjects + self.text_shows
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn absorb(&mut self, other: FilterStats) {
        self.graphics_states += other.graphics_states;
        self.xobjects += other.xobjects;
        self.text_shows += other.text_shows;
    }
}

/// Output of one filter pass
#[derive(Debug, Clone, PartialEq)]
pub struct Filtered {
    pub tokens: Vec<Token>,
    pub stats: FilterStats,
}

/// How the filter treats an operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperatorClass {
    ScopeOpen,
    ScopeClose,
    ApplyGraphicsState,
    InvokeXObject,
    ShowText,
    Other,
}

fn classify(operator: &str) -> OperatorClass {
    match operator {
        "q" | "BT" | "BDC" | "BMC" => OperatorClass::ScopeOpen,
        "Q" | "ET" | "EMC" => OperatorClass::ScopeClose,
        "gs" => OperatorClass::ApplyGraphicsState,
        "Do" => OperatorClass::InvokeXObject,
        "Tj" | "TJ" => OperatorClass::ShowText,
        _ => OperatorClass::Other,
    }
}

/// Text suppression state with one saved flag per open scope.
///
/// Opening a scope saves the current flag; closing one restores whatever was
/// saved. A watermark `gs` also overwrites the innermost saved flag, so its
/// suppression outlives the scope it was applied in and only ends at the next
/// named graphics state. An unbalanced close on an empty stack leaves the
/// filter not suppressing.
#[derive(Debug, Clone)]
struct ScopeStack {
    current: bool,
    saved: Vec<bool>,
}

impl ScopeStack {
    fn new() -> Self {
        Self {
            current: false,
            saved: vec![false],
        }
    }

    fn suppressing(&self) -> bool {
        self.current
    }

    fn open(&mut self) {
        self.saved.push(self.current);
    }

    fn close(&mut self) {
        self.current = self.saved.pop().unwrap_or(false);
    }

    fn set_suppressing(&mut self, value: bool) {
        self.current = value;
        match self.saved.last_mut() {
            Some(top) => *top = value,
            None => self.saved.push(value),
        }
    }
}

/// Remove watermark operations from a token sequence.
///
/// Matching only ever inspects the token immediately preceding `gs`/`Do`;
/// anything other than a candidate name is kept as is. This never fails:
/// malformed nesting degrades to "not suppressing".
pub fn filter_tokens(tokens: Vec<Token>, candidates: &CandidateSet) -> Filtered {
    let mut out: Vec<Token> = Vec::with_capacity(tokens.len());
    let mut scopes = ScopeStack::new();
    let mut stats = FilterStats::default();
    // Operands pushed to `out` since the last operator
    let mut pending = 0usize;

    for token in tokens {
        let operator = match token.as_operator() {
            Some(operator) => operator,
            None => {
                out.push(token);
                pending += 1;
                continue;
            }
        };

        let preceding_name = if pending > 0 {
            out.last().and_then(Token::as_name)
        } else {
            None
        };

        let drop_operation = match classify(operator) {
            OperatorClass::ScopeOpen => {
                scopes.open();
                false
            }
            OperatorClass::ScopeClose => {
                scopes.close();
                false
            }
            OperatorClass::ApplyGraphicsState => match preceding_name {
                Some(name) if candidates.contains(name) => {
                    scopes.set_suppressing(true);
                    stats.graphics_states += 1;
                    true
                }
                Some(_) => {
                    // Inherited behaviour: any other named state re-enables text
                    if scopes.suppressing() {
                        scopes.set_suppressing(false);
                    }
                    false
                }
                None => false,
            },
            OperatorClass::InvokeXObject => match preceding_name {
                Some(name) if candidates.contains(name) => {
                    stats.xobjects += 1;
                    true
                }
                _ => false,
            },
            OperatorClass::ShowText => {
                if scopes.suppressing() {
                    stats.text_shows += 1;
                    true
                } else {
                    false
                }
            }
            OperatorClass::Other => false,
        };

        if drop_operation {
            out.truncate(out.len() - pending);
        } else {
            out.push(token);
        }
        pending = 0;
    }

    Filtered { tokens: out, stats }
}
