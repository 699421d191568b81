//! Property tests for the lexer, parser and pattern printer.
//!
//! Arbitrary input must never panic, and generated well-formed patterns must
//! compile, compile the same way twice, and survive a print/re-parse cycle.

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use crate::compiler::compile_pattern;
    use crate::lexer::tokenize;

    /// Completely random strings
    fn arbitrary_string() -> impl Strategy<Value = String> {
        prop::collection::vec(any::<char>(), 0..256).prop_map(|chars| chars.into_iter().collect())
    }

    /// Token soup drawn from the pattern alphabet
    fn pattern_like_string() -> impl Strategy<Value = String> {
        let piece = prop_oneof![
            "[A-Z]{1,3}".prop_map(String::from),
            "[0-9]{1,2}".prop_map(String::from),
            Just("__".to_string()),
            Just("/^N/".to_string()),
            Just("<".to_string()),
            Just("<<".to_string()),
            Just("$++".to_string()),
            Just("<+".to_string()),
            Just("<-".to_string()),
            Just("=x".to_string()),
            Just("~x".to_string()),
            Just("#1".to_string()),
            Just("(".to_string()),
            Just(")".to_string()),
            Just("[".to_string()),
            Just("]".to_string()),
            Just("!".to_string()),
            Just("?".to_string()),
            Just("@".to_string()),
            Just("|".to_string()),
            Just("&".to_string()),
            Just(";".to_string()),
            Just(" ".to_string()),
        ];
        prop::collection::vec(piece, 0..60).prop_map(|parts| parts.join(""))
    }

    fn label() -> impl Strategy<Value = String> {
        prop_oneof![
            "[A-Z]{1,3}".prop_map(String::from),
            Just("__".to_string()),
            "/\\^[A-Z]{1,2}/".prop_map(String::from),
            "@?[A-Z]{2}".prop_map(String::from),
            "![A-Z]{2}".prop_map(String::from),
        ]
    }

    fn relation() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec![
            "<", "<<", ">", ">>", "<:", "<,", "<-", "<<,", "<<-", "<<:", "$", "$++", "$--", "$+",
            "$-", "$..", "$,", "..", ",,", ".", ",", "<#", ">>#", "<2", "<-1", ">3", "<=", "==",
            "<+(VP)", ".+(!@NP)",
        ])
    }

    fn modifier() -> impl Strategy<Value = &'static str> {
        prop::sample::select(vec!["", "", "!", "?"])
    }

    /// One (possibly modified) child constraint, with nested children and
    /// bracketed disjunctions
    fn child() -> impl Strategy<Value = String> {
        let leaf = (modifier(), relation(), label())
            .prop_map(|(m, r, l)| format!("{}{} {}", m, r, l));
        leaf.prop_recursive(3, 24, 3, |inner| {
            prop_oneof![
                (
                    modifier(),
                    relation(),
                    label(),
                    prop::collection::vec(inner.clone(), 1..3)
                )
                    .prop_map(|(m, r, l, kids)| format!("{}{} ({} {})", m, r, l, kids.join(" "))),
                (
                    modifier(),
                    prop::collection::vec(inner.clone(), 1..3),
                    prop::collection::vec(inner, 1..3)
                )
                    .prop_map(|(m, a, b)| format!("{}[{} | {}]", m, a.join(" "), b.join(" & "))),
            ]
        })
    }

    fn well_formed_pattern() -> impl Strategy<Value = String> {
        (label(), prop::collection::vec(child(), 0..4))
            .prop_map(|(root, kids)| format!("{} {};", root, kids.join(" ")))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(500))]

        #[test]
        fn test_arbitrary_input_never_panics(input in arbitrary_string()) {
            let _ = tokenize(&input);
            let _ = compile_pattern(&input);
        }

        #[test]
        fn test_pattern_like_input_never_panics(input in pattern_like_string()) {
            let _ = compile_pattern(&input);
        }

        #[test]
        fn test_well_formed_patterns_compile(input in well_formed_pattern()) {
            let result = compile_pattern(&input);
            prop_assert!(result.is_ok(), "{:?} failed: {:?}", input, result.err());
        }

        #[test]
        fn test_compilation_is_repeatable(input in well_formed_pattern()) {
            let first = compile_pattern(&input);
            let second = compile_pattern(&input);
            match (first, second) {
                (Ok(a), Ok(b)) => prop_assert_eq!(a.root(), b.root()),
                (Err(a), Err(b)) => prop_assert_eq!(a, b),
                _ => prop_assert!(false, "{:?} compiled only once", input),
            }
        }

        #[test]
        fn test_display_round_trip(input in well_formed_pattern()) {
            if let Ok(pattern) = compile_pattern(&input) {
                let printed = pattern.to_string();
                let reparsed = compile_pattern(&printed);
                prop_assert!(reparsed.is_ok(), "{:?} printed as {:?}", input, printed);
                if let Ok(reparsed) = reparsed {
                    prop_assert_eq!(pattern.root(), reparsed.root());
                    prop_assert_eq!(reparsed.to_string(), printed);
                }
            }
        }
    }
}
