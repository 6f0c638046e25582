// tests/cycle_tests.rs


use lambda_rewrite::{
    cycles::FIXED_POINT_COMBINATOR, eliminate_cycle, find_largest_cycle, readable, Declarations, EvalError, Outcome,
    Term, TermPool,
};
use test_utils::*;

// \x. x R1 R2 ...
fn referencing(refs: &[&str]) -> Term {
    let body = refs.iter().fold(Term::var("x"), |acc, r| Term::app(acc, Term::alias(*r)));
    Term::abs("x", body)
}

#[cfg(test)]
mod cycle_tests {
    use super::*;

    #[test]
    fn test_even_odd_mutual_recursion() {
        let mut session = prelude_session();
        session.execute("Even = \\n. IsZero n TRUE (Odd (Pred n))").unwrap();
        session.execute("Odd = \\n. IsZero n FALSE (Even (Pred n))").unwrap();

        assert_eq!(find_largest_cycle(session.declarations()), None);
        for (input, expected) in [("Even 0", true), ("Even 3", false), ("Odd 3", true), ("Even 4", true)] {
            let (term, _) = session.evaluate(input).unwrap();
            assert_eq!(readable::boolean(&term), Some(expected), "{}", input);
        }
    }

    #[test]
    fn test_three_way_cycle_is_tupled_once() {
        let mut session = prelude_session();
        session.execute("Zero3 = \\n. IsZero n TRUE (Two3 (Pred n))").unwrap();
        session.execute("One3 = \\n. IsZero n FALSE (Zero3 (Pred n))").unwrap();
        let outcome = session.execute("Two3 = \\n. IsZero n FALSE (One3 (Pred n))").unwrap();

        assert_eq!(
            outcome,
            Outcome::Defined { name: "Two3".to_string(), recursive: vec!["Zero3Two3One3".to_string()] }
        );
        assert_eq!(normalize_in(&mut session, "Zero3 6"), Some(true));
        assert_eq!(normalize_in(&mut session, "Zero3 4"), Some(false));
        assert_eq!(normalize_in(&mut session, "Two3 5"), Some(true));
    }

    fn normalize_in(session: &mut lambda_rewrite::Session, input: &str) -> Option<bool> {
        session.evaluate(input).ok().and_then(|(term, _)| readable::boolean(&term))
    }

    #[test]
    fn test_self_recursive_factorial() {
        let mut session = prelude_session();
        let outcome = session.execute("Fact = \\n. IsZero n 1 (n * Fact (Pred n))").unwrap();
        assert_eq!(outcome, Outcome::Defined { name: "Fact".to_string(), recursive: vec!["Fact".to_string()] });

        // no tuple for a single declaration
        assert_eq!(session.declarations().len(), prelude_session().declarations().len() + 1);
        let (term, _) = session.evaluate("Fact 3").unwrap();
        assert_eq!(readable::natural(&term), Some(6));
    }

    #[test]
    fn test_recursion_without_fixed_point_combinator() {
        let mut session = bare_session();
        let error = session.execute("Loop = \\x. Loop x").unwrap_err();
        assert_eq!(error, EvalError::UndeclaredAlias(FIXED_POINT_COMBINATOR.to_string()));

        // the failed definition is not kept, so later definitions are unaffected
        assert!(!session.declarations().contains("Loop"));
        assert_eq!(find_largest_cycle(session.declarations()), None);
        let outcome = session.execute("I = \\x.x").unwrap();
        assert_eq!(outcome, Outcome::Defined { name: "I".to_string(), recursive: Vec::new() });
        assert!(session.declarations().contains("I"));
    }

    #[test]
    fn test_self_recursive_member_joins_mutual_cycle() {
        // F is closed on its own first, since G does not exist yet
        let mut nested = prelude_session();
        let outcome = nested.execute("F = \\n. IsZero n 0 (Succ ((\\d. G (Pred n)) F))").unwrap();
        assert_eq!(outcome, Outcome::Defined { name: "F".to_string(), recursive: vec!["F".to_string()] });
        let outcome = nested.execute("G = \\n. IsZero n 0 (Succ (F (Pred n)))").unwrap();
        assert_eq!(outcome, Outcome::Defined { name: "G".to_string(), recursive: vec!["FG".to_string()] });
        assert_eq!(find_largest_cycle(nested.declarations()), None);

        // the same functions written without the inner self-reference
        let mut flat = prelude_session();
        flat.execute("F = \\n. IsZero n 0 (Succ (G (Pred n)))").unwrap();
        flat.execute("G = \\n. IsZero n 0 (Succ (F (Pred n)))").unwrap();

        for input in ["F 4", "G 3", "F 1"] {
            let expected = flat.evaluate(input).map(|(term, _)| readable::natural(&term)).unwrap();
            let actual = nested.evaluate(input).map(|(term, _)| readable::natural(&term)).unwrap();
            assert_eq!(actual, expected, "{}", input);
        }
        assert_eq!(nested.evaluate("F 4").map(|(term, _)| readable::natural(&term)), Ok(Some(4)));
    }

    #[test]
    fn test_largest_cycle_eliminated_first() {
        let mut pool = TermPool::new();
        let mut decls = Declarations::new();
        decls.define(FIXED_POINT_COMBINATOR, Term::abs("f", Term::var("f")), &mut pool);
        decls.define("A", referencing(&["B"]), &mut pool);
        decls.define("B", referencing(&["A"]), &mut pool);
        decls.define("C", referencing(&["D"]), &mut pool);
        decls.define("D", referencing(&["E"]), &mut pool);
        decls.define("E", referencing(&["C"]), &mut pool);

        let mut eliminated = Vec::new();
        while let Some(cycle) = find_largest_cycle(&decls) {
            eliminated.push(eliminate_cycle(&mut decls, &cycle, &mut pool).unwrap());
        }
        assert_eq!(eliminated, vec!["CDE".to_string(), "AB".to_string()]);

        for name in ["A", "B", "C", "D", "E"] {
            let decl = decls.lookup(name).unwrap();
            assert!(decl.term.closed, "{} is not closed", name);
            assert_eq!(decl.aliases.len(), 1, "{} should only reference its tuple", name);
        }
    }

    #[test]
    fn test_cycle_through_acyclic_entry() {
        let mut pool = TermPool::new();
        let mut decls = Declarations::new();
        // Entry -> P -> Q -> P
        decls.define("Entry", referencing(&["P"]), &mut pool);
        decls.define("P", referencing(&["Q"]), &mut pool);
        decls.define("Q", referencing(&["P"]), &mut pool);
        assert_eq!(find_largest_cycle(&decls), Some(vec!["P".to_string(), "Q".to_string()]));
    }
}
