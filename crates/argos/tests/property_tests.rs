//! Property-based tests for the quantified invariants in spec §8.
//!
//! These exercise the public `ArgsBuilder`/`Args` surface the same way
//! `tests/integration.rs` does, but over generated inputs rather than
//! hand-picked argv, to check invariants hold for the whole input space
//! rather than a handful of examples.

#![allow(clippy::pedantic)]

use proptest::prelude::*;

use argos::{domain, flag, list, option, positional_list, ArgsBuilder, ParserConfig};

/// Alphanumeric tokens only: avoids accidentally generating something that
/// looks like a switch (`-`/`--` prefixed) or a separator (`=`/`:`), which
/// would change which pipeline stage a token lands in rather than exercise
/// the property under test.
fn token() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9]{0,9}"
}

proptest! {
    /// Provenance priority (spec §8 invariant 2): a user-supplied argv value
    /// always wins over env or default, no matter what the competing values
    /// are.
    #[test]
    fn argv_value_outranks_env_and_default(argv_val in token(), default_val in token()) {
        let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
        b.register(option::<String>("greeting").switch("--greeting").default(default_val.clone()).build()).unwrap();
        let mut args = b.build().unwrap();

        args.parse(&["--greeting", argv_val.as_str()]).unwrap();
        prop_assert_eq!(args.get_single::<String>("greeting"), Some(&argv_val));
        prop_assert_eq!(args.value_source("greeting"), Some(argos::ValueSource::User));
    }

    /// Collection determinism (spec §8 invariant 3): a repeated list option
    /// stores values in the exact order they were supplied, duplicates
    /// included.
    #[test]
    fn list_preserves_supplied_order(values in prop::collection::vec(token(), 0..8)) {
        let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
        b.register(list::<String>("tags").switch("--tag").build()).unwrap();
        let mut args = b.build().unwrap();

        let mut argv = Vec::new();
        for v in &values {
            argv.push("--tag".to_string());
            argv.push(v.clone());
        }
        args.parse(&argv).unwrap();

        if values.is_empty() {
            prop_assert_eq!(args.get_list::<String>("tags"), None);
        } else {
            prop_assert_eq!(args.get_list::<String>("tags"), Some(&values));
        }
    }

    /// Negation round-trip (spec §8 invariant 5): a negatable flag's
    /// synthesized `--no-<name>` alias always inverts the plain switch,
    /// regardless of the flag's declared default.
    #[test]
    fn negation_alias_always_inverts(default_val in prop::bool::ANY) {
        let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
        b.register(flag("confirm").switch("--confirm").negatable("no-").default(default_val).build()).unwrap();
        let mut args = b.build().unwrap();

        args.parse(&["--confirm"]).unwrap();
        prop_assert_eq!(args.get_single::<bool>("confirm"), Some(&true));

        args.parse(&["--no-confirm"]).unwrap();
        prop_assert_eq!(args.get_single::<bool>("confirm"), Some(&false));
    }

    /// Positional tail (spec §8 invariant 8): once every `Single` positional
    /// slot is filled, every remaining bare token lands in the trailing
    /// repeatable positional, in order.
    #[test]
    fn trailing_positionals_collect_in_order(first in token(), rest in prop::collection::vec(token(), 0..6)) {
        let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
        b.register(argos::positional::<String>("file").build()).unwrap();
        b.register(positional_list::<String>("extras").build()).unwrap();
        let mut args = b.build().unwrap();

        let mut argv = vec![first.clone()];
        argv.extend(rest.iter().cloned());
        args.parse(&argv).unwrap();

        prop_assert_eq!(args.get_single::<String>("file"), Some(&first));
        if rest.is_empty() {
            prop_assert_eq!(args.get_list::<String>("extras"), None);
        } else {
            prop_assert_eq!(args.get_list::<String>("extras"), Some(&rest));
        }
    }

    /// Domain scoping (spec §8 invariant 6): an option declared for a subset
    /// of domains is only ever present without error in a domain from that
    /// subset.
    #[test]
    fn domain_scoped_option_only_admitted_in_its_domain(pick_other in any::<bool>()) {
        let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
        b.register_domain(domain("build").build()).unwrap();
        b.register_domain(domain("deploy").build()).unwrap();
        b.register(flag("prod-only").switch("--prod-only").domains(["deploy"]).build()).unwrap();
        let mut args = b.build().unwrap();

        if pick_other {
            let result = args.parse(&["build", "--prod-only"]);
            prop_assert!(result.is_err());
        } else {
            let result = args.parse(&["deploy", "--prod-only"]);
            prop_assert!(result.is_ok());
            prop_assert!(args.is_present("prod-only"));
        }
    }

    /// Idempotence of snapshot (spec §8 invariant 9): calling `snapshot()`
    /// twice in a row without an intervening `parse` always yields equal
    /// snapshots, for any prior parse outcome (success or failure).
    #[test]
    fn snapshot_is_idempotent_after_any_parse(value in token(), should_fail in any::<bool>()) {
        let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
        b.register(option::<String>("token").switch("--token").required().build()).unwrap();
        let mut args = b.build().unwrap();

        if should_fail {
            let _ = args.parse::<&str>(&[]);
        } else {
            let _ = args.parse(&["--token", value.as_str()]);
        }

        let first = args.snapshot();
        let second = args.snapshot();
        prop_assert_eq!(first, second);
    }
}
