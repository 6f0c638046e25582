// tests/property_tests.rs


use lambda_rewrite::{readable, EvalError, Term, TermKind, TermPool};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use test_utils::*;

const FREE_NAMES: [&str; 3] = ["x", "y", "z"];
const BINDER_NAMES: [&str; 5] = ["x", "y", "z", "a", "b"];

// Random term over a small alphabet so that binders clash often.
fn random_term(rng: &mut StdRng, depth: usize, bound: &mut Vec<String>) -> Term {
    let choice = if depth == 0 { 0 } else { rng.gen_range(0..3) };
    match choice {
        0 => {
            if !bound.is_empty() && rng.gen_bool(0.6) {
                Term::var(bound[rng.gen_range(0..bound.len())].clone())
            } else {
                Term::var(FREE_NAMES[rng.gen_range(0..FREE_NAMES.len())])
            }
        }
        1 => {
            let param = BINDER_NAMES[rng.gen_range(0..BINDER_NAMES.len())];
            bound.push(param.to_string());
            let body = random_term(rng, depth - 1, bound);
            bound.pop();
            Term::abs(param, body)
        }
        _ => {
            let left = random_term(rng, depth - 1, bound);
            let right = random_term(rng, depth - 1, bound);
            Term::app(left, right)
        }
    }
}

fn scanned(mut term: Term) -> Term {
    term.set_closed_flag();
    term
}

// Every node flagged closed really has no free variables.
fn closed_flags_sound(term: &Term) -> bool {
    if term.closed && !term.clone().free_variables().is_empty() {
        return false;
    }
    match &term.kind {
        TermKind::Var(_) | TermKind::Alias(_) => true,
        TermKind::Abs(_, body) => closed_flags_sound(body),
        TermKind::App { left, right, .. } => closed_flags_sound(left) && closed_flags_sound(right),
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;

    #[test]
    fn test_free_variables_idempotent() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let mut term = random_term(&mut rng, 6, &mut Vec::new());
            let first = term.free_variables();
            let second = term.free_variables();
            assert_eq!(first, second);
            assert_eq!(term.closed, first.is_empty());
            for name in BINDER_NAMES {
                if !first.contains(name) {
                    assert!(!term.is_free_var(name), "{} reported free in {}", name, term);
                }
            }
        }
    }

    #[test]
    fn test_substitution_into_closed_term_is_noop() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut pool = TermPool::new();
        for _ in 0..200 {
            let body = random_term(&mut rng, 5, &mut Vec::new());
            // binding every free name closes the term
            let mut term = scanned(Term::abs("x", Term::abs("y", Term::abs("z", body))));
            assert!(term.closed);

            let before = term.clone();
            let replacement = scanned(random_term(&mut rng, 3, &mut Vec::new()));
            assert_eq!(term.substitute("x", &replacement, &mut pool), Ok(false));
            assert_eq!(term, before);
        }
    }

    #[test]
    fn test_owned_and_shared_substitution_agree() {
        let mut rng = StdRng::seed_from_u64(23);
        let mut pool = TermPool::new();
        for _ in 0..300 {
            let target = scanned(random_term(&mut rng, 6, &mut Vec::new()));
            let replacement = scanned(random_term(&mut rng, 3, &mut Vec::new()));

            let mut shared = target.clone();
            let mut owned = target.clone();
            let found_shared = shared.substitute("x", &replacement, &mut pool).unwrap();
            let found_owned = owned.substitute_owned("x", replacement.clone(), &mut pool).unwrap();

            assert_eq!(found_shared, found_owned);
            assert_eq!(shared, owned, "substituting {} into {}", replacement, target);
            assert!(closed_flags_sound(&shared));
        }
    }

    #[test]
    fn test_normalization_keeps_closed_flags_sound() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut session = bare_session();
        session.config_mut().step_limit = Some(200);
        for _ in 0..100 {
            let term = random_term(&mut rng, 6, &mut Vec::new());
            match session.normalize(term) {
                Ok((normal, _)) => assert!(closed_flags_sound(&normal), "unsound flags in {}", normal),
                Err(EvalError::StepLimit(_)) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
    }

    #[test]
    fn test_beta_with_identity_returns_argument() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut session = bare_session();
        for _ in 0..100 {
            let body = random_term(&mut rng, 4, &mut Vec::new());
            let argument = scanned(Term::abs("x", Term::abs("y", Term::abs("z", body))));
            let mut redex = Term::app(Term::abs("v", Term::var("v")), argument.clone());
            redex.set_closed_flag();

            let mut pool = TermPool::new();
            let declarations = lambda_rewrite::Declarations::new();
            redex.reduce_step(&declarations, &mut pool).unwrap();
            assert_eq!(redex, argument);
        }
        // the session driver agrees on a fixed case
        let (term, steps) = session.evaluate("(\\v.v) (\\a.\\b.a)").unwrap();
        assert_eq!((term, steps), (Term::abs("a", Term::abs("b", Term::var("a"))), 1));
    }

    #[test]
    fn test_church_numeral_round_trip() {
        for n in [0, 1, 17] {
            assert_eq!(readable::natural(&Term::church_numeral(n)), Some(n));
        }
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..20 {
            let n = rng.gen_range(0..300);
            assert_eq!(readable::natural(&Term::church_numeral(n)), Some(n));
        }
        assert_eq!(readable::boolean(&Term::church_numeral(2)), None);
    }

    #[test]
    fn test_addition_matches_usize() {
        let mut rng = StdRng::seed_from_u64(13);
        let mut session = prelude_session();
        for _ in 0..10 {
            let a: usize = rng.gen_range(1..6);
            let b: usize = rng.gen_range(1..6);
            let (sum, _) = session.evaluate(&format!("{} + {}", a, b)).unwrap();
            assert_eq!(readable::natural(&sum), Some(a + b));
        }
    }
}
