// src/freevars.rs

use indexmap::IndexSet;

use crate::ast::{grow_stack, Term, TermKind};

impl Term {
    /// Free variables of the term, in order of first appearance.
    ///
    /// Every visited node gets its closed flag recomputed from the result. This
    /// is the only place closedness is derived from scratch; substitution and
    /// reduction only maintain it.
    pub fn free_variables(&mut self) -> IndexSet<String> {
        grow_stack(|| self.scan_free_variables())
    }

    fn scan_free_variables(&mut self) -> IndexSet<String> {
        let vars = match &mut self.kind {
            TermKind::Var(name) => IndexSet::from([name.clone()]),
            TermKind::Alias(_) => IndexSet::new(),
            TermKind::Abs(param, body) => {
                let mut vars = body.free_variables();
                vars.shift_remove(param.as_str());
                vars
            }
            TermKind::App { left, right, .. } => {
                let mut vars = left.free_variables();
                vars.extend(right.free_variables());
                vars
            }
        };
        self.closed = vars.is_empty();
        vars
    }

    pub fn set_closed_flag(&mut self) {
        self.free_variables();
    }

    /// Whether `name` occurs free. Closed subterms are skipped without inspection.
    pub fn is_free_var(&self, name: &str) -> bool {
        if self.closed {
            return false;
        }
        grow_stack(|| match &self.kind {
            TermKind::Var(var) => var == name,
            TermKind::Alias(_) => false,
            TermKind::Abs(param, body) => param != name && body.is_free_var(name),
            TermKind::App { left, right, .. } => left.is_free_var(name) || right.is_free_var(name),
        })
    }

    /// Number of free occurrences of `name`, skipping closed subterms.
    pub fn free_occurrences(&self, name: &str) -> usize {
        if self.closed {
            return 0;
        }
        grow_stack(|| match &self.kind {
            TermKind::Var(var) => usize::from(var == name),
            TermKind::Alias(_) => 0,
            TermKind::Abs(param, body) => {
                if param == name {
                    0
                } else {
                    body.free_occurrences(name)
                }
            }
            TermKind::App { left, right, .. } => left.free_occurrences(name) + right.free_occurrences(name),
        })
    }

    /// Distinct alias names referenced anywhere in the term.
    pub fn alias_references(&self) -> IndexSet<String> {
        let mut names = IndexSet::new();
        self.collect_aliases(&mut names);
        names
    }

    fn collect_aliases(&self, names: &mut IndexSet<String>) {
        grow_stack(|| match &self.kind {
            TermKind::Var(_) => {}
            TermKind::Alias(name) => {
                if !names.contains(name.as_str()) {
                    names.insert(name.clone());
                }
            }
            TermKind::Abs(_, body) => body.collect_aliases(names),
            TermKind::App { left, right, .. } => {
                left.collect_aliases(names);
                right.collect_aliases(names);
            }
        })
    }

    /// Whether `name` appears anywhere in the term, free or as a binder.
    pub fn mentions_variable(&self, name: &str) -> bool {
        grow_stack(|| match &self.kind {
            TermKind::Var(var) => var == name,
            TermKind::Alias(_) => false,
            TermKind::Abs(param, body) => param == name || body.mentions_variable(name),
            TermKind::App { left, right, .. } => left.mentions_variable(name) || right.mentions_variable(name),
        })
    }
}

/// Candidate variable names in order: `a`..`z`, `aa`, `ab`, ..., `zz`, `aaa`, ...
pub fn variable_names() -> impl Iterator<Item = String> {
    (0usize..).map(|mut index| {
        let mut name = Vec::new();
        loop {
            name.push(b'a' + (index % 26) as u8);
            if index < 26 {
                break;
            }
            index = index / 26 - 1;
        }
        name.reverse();
        String::from_utf8_lossy(&name).into_owned()
    })
}

/// First name from [`variable_names`] that is free in neither term.
pub fn fresh_variable(first: &Term, second: &Term) -> String {
    variable_names()
        .find(|name| !first.is_free_var(name) && !second.is_free_var(name))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    // \x.x y
    fn open_term() -> Term {
        Term::abs("x", Term::app(Term::var("x"), Term::var("y")))
    }

    #[test]
    fn test_free_variables_and_closed_flags() {
        let mut term = open_term();
        let vars = term.free_variables();
        assert_eq!(vars.into_iter().collect::<Vec<_>>(), vec!["y".to_string()]);
        assert!(!term.closed);

        let mut identity = Term::abs("x", Term::var("x"));
        assert!(identity.free_variables().is_empty());
        assert!(identity.closed);
        if let TermKind::Abs(_, body) = &identity.kind {
            assert!(!body.closed);
        }
    }

    #[test]
    fn test_aliases_contribute_no_free_variables() {
        let mut term = Term::app(Term::alias("F"), Term::abs("z", Term::var("z")));
        assert!(term.free_variables().is_empty());
        assert!(term.closed);
    }

    #[test]
    fn test_is_free_var_respects_binders() {
        let mut term = open_term();
        term.set_closed_flag();
        assert!(term.is_free_var("y"));
        assert!(!term.is_free_var("x"));
        assert!(!term.is_free_var("z"));
    }

    #[test]
    fn test_closed_flag_short_circuits_search() {
        // A flag of `true` is trusted even when the subtree would say otherwise.
        let mut term = Term::var("x");
        term.closed = true;
        assert!(!term.is_free_var("x"));
        assert_eq!(term.free_occurrences("x"), 0);
    }

    #[test]
    fn test_free_occurrences() {
        let mut term = Term::app(
            Term::app(Term::var("x"), Term::var("x")),
            Term::abs("x", Term::var("x")),
        );
        term.set_closed_flag();
        assert_eq!(term.free_occurrences("x"), 2);
        assert_eq!(term.free_occurrences("y"), 0);
    }

    #[test]
    fn test_alias_references_are_unique() {
        let term = Term::app(
            Term::app(Term::alias("A"), Term::abs("x", Term::alias("B"))),
            Term::alias("A"),
        );
        let refs: Vec<String> = term.alias_references().into_iter().collect();
        assert_eq!(refs, vec!["A".to_string(), "B".to_string()]);
    }

    #[test]
    fn test_variable_name_sequence() {
        let names: Vec<String> = variable_names().take(29).collect();
        assert_eq!(names[0], "a");
        assert_eq!(names[25], "z");
        assert_eq!(names[26], "aa");
        assert_eq!(names[27], "ab");
        assert_eq!(variable_names().nth(26 + 26 * 26).as_deref(), Some("aaa"));
    }

    #[test]
    fn test_fresh_variable_skips_free_names() {
        let mut first = Term::app(Term::var("a"), Term::var("b"));
        let mut second = Term::var("c");
        first.set_closed_flag();
        second.set_closed_flag();
        assert_eq!(fresh_variable(&first, &second), "d");
    }
}
