//! End-to-end scenarios driven through the public builder/`Args` surface,
//! mirroring the literal input/output scenarios in spec §8. Scenarios
//! already covered at the tokenizer level (`src/tokenizer.rs`'s own
//! `#[cfg(test)]` module) are exercised here one layer up, through
//! `ArgsBuilder`/`Args`, rather than duplicated verbatim.

use argos::{domain, flag, list, option, positional, positional_list, ArgsBuilder, GroupKind, ParserConfig};

fn demo_builder() -> ArgsBuilder {
    let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
    b.register_domain(domain("alpha").build()).unwrap();
    b.register(option::<String>("name").switches(["--name", "-n"]).build()).unwrap();
    b.register(option::<i64>("tries").switches(["--tries", "-t"]).build()).unwrap();
    b.register(flag("verbose").switches(["--verbose", "-v"]).build()).unwrap();
    b.register(option::<String>("mode").switch("--mode").build()).unwrap();
    b.register(positional::<String>("file").build()).unwrap();
    b.register(positional_list::<i64>("extras").build()).unwrap();
    b
}

#[test]
fn basic_parse_with_domain_selection() {
    let mut args = demo_builder().build().unwrap();
    args.parse(&["alpha", "--name", "Alice", "-t", "3", "input.txt", "1", "2"]).unwrap();

    assert_eq!(args.selected_domain(), Some("alpha"));
    assert_eq!(args.get_single::<String>("name"), Some(&"Alice".to_string()));
    assert_eq!(args.get_single::<i64>("tries"), Some(&3));
    assert_eq!(args.get_single::<String>("file"), Some(&"input.txt".to_string()));
    assert_eq!(args.get_list::<i64>("extras"), Some(&vec![1, 2]));
    assert!(!args.is_present("verbose"));
}

#[test]
fn cluster_with_trailing_value() {
    let mut args = demo_builder().build().unwrap();
    args.parse(&["alpha", "-v", "-t3", "file", "7"]).unwrap();

    assert!(args.is_present("verbose"));
    assert_eq!(args.get_single::<i64>("tries"), Some(&3));
    assert_eq!(args.get_single::<String>("file"), Some(&"file".to_string()));
    assert_eq!(args.get_list::<i64>("extras"), Some(&vec![7]));
}

#[test]
fn equals_value_and_double_dash_disables_option_parsing() {
    let mut args = demo_builder().build().unwrap();
    args.parse(&["alpha", "--tries=4", "--", "-3", "5"]).unwrap();

    assert_eq!(args.get_single::<i64>("tries"), Some(&4));
    assert_eq!(args.get_single::<String>("file"), Some(&"-3".to_string()));
    assert_eq!(args.get_list::<i64>("extras"), Some(&vec![5]));
}

#[test]
fn unknown_option_suggests_closest_switch() {
    let mut args = demo_builder().build().unwrap();
    let err = args.parse(&["alpha", "--mdoe"]).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("Unknown option"), "{rendered}");
    assert!(rendered.contains("did you mean"), "{rendered}");
    assert!(rendered.contains("--mode"), "{rendered}");
}

#[test]
fn exactly_one_group_violation_and_satisfaction() {
    let mut b = demo_builder();
    b.register(flag("e1").switch("--e1").build()).unwrap();
    b.register(flag("e2").switch("--e2").build()).unwrap();
    b.group(GroupKind::ExactlyOne, ["e1", "e2"]).unwrap();
    let mut args = b.build().unwrap();

    let err = args.parse(&["alpha", "--e1", "--e2", "f"]).unwrap_err();
    assert!(err.to_string().contains("Exactly one"), "{err}");

    args.parse(&["alpha", "--e1", "f"]).unwrap();
    assert!(args.is_present("e1"));
}

#[test]
fn conditional_required_by_value_predicate() {
    let mut b = demo_builder();
    let pred_need = b.register(option::<String>("pred-need").switch("--pred-need").build()).unwrap();
    b.require_if_value::<String>(&pred_need, "mode", |m| m == "fast").unwrap();
    let mut args = b.build().unwrap();

    let err = args.parse(&["alpha", "--mode", "fast", "f"]).unwrap_err();
    assert!(err.to_string().contains("pred-need"), "{err}");

    args.parse(&["alpha", "--mode", "slow", "f"]).unwrap();
    assert_eq!(args.get_single::<String>("mode"), Some(&"slow".to_string()));
}

#[test]
fn negatable_flag_round_trips() {
    let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
    b.register(flag("confirm").switch("--confirm").negatable("no-").default(true).build()).unwrap();
    let mut args = b.build().unwrap();

    args.parse(&["--no-confirm"]).unwrap();
    assert_eq!(args.get_single::<bool>("confirm"), Some(&false));

    args.parse::<&str>(&[]).unwrap();
    assert_eq!(args.get_single::<bool>("confirm"), Some(&true));
}

#[test]
fn domain_restricted_option_rejected_outside_its_domain() {
    let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
    b.register_domain(domain("build").build()).unwrap();
    b.register_domain(domain("deploy").build()).unwrap();
    b.register(flag("prod-flag").switch("--prod-flag").domains(["deploy"]).build()).unwrap();
    let mut args = b.build().unwrap();

    let err = args.parse(&["build", "--prod-flag"]).unwrap_err();
    assert!(err.to_string().contains("prod-flag"), "{err}");

    args.parse(&["deploy", "--prod-flag"]).unwrap();
    assert!(args.is_present("prod-flag"));
}

#[test]
fn list_option_preserves_occurrence_order_including_repeats() {
    let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
    b.register(list::<String>("tags").switch("--tag").build()).unwrap();
    let mut args = b.build().unwrap();
    args.parse(&["--tag", "a", "--tag", "b", "--tag", "a"]).unwrap();
    assert_eq!(
        args.get_list::<String>("tags"),
        Some(&vec!["a".to_string(), "b".to_string(), "a".to_string()])
    );
}

#[test]
fn aggregate_errors_reports_every_failure_when_enabled() {
    let mut b = ArgsBuilder::new(ParserConfig::new("demo").with_aggregate_errors(true, 10));
    b.register(option::<String>("a").switch("--a").required().build()).unwrap();
    b.register(option::<String>("b").switch("--b").required().build()).unwrap();
    let mut args = b.build().unwrap();

    let err = args.parse::<&str>(&[]).unwrap_err();
    let rendered = err.render_capped(10);
    assert!(rendered.contains('a'), "{rendered}");
    assert!(rendered.contains('b'), "{rendered}");
}

#[test]
fn fail_fast_reports_only_the_first_error() {
    let mut b = ArgsBuilder::new(ParserConfig::new("demo").with_aggregate_errors(false, 10));
    b.register(option::<String>("a").switch("--a").required().build()).unwrap();
    b.register(option::<String>("b").switch("--b").required().build()).unwrap();
    let mut args = b.build().unwrap();

    let err = args.parse::<&str>(&[]).unwrap_err();
    assert!(!matches!(err, argos::ParseError::Aggregate(_)));
}

#[test]
fn snapshot_reflects_declared_switches_and_is_idempotent() {
    let args = demo_builder().build().unwrap();
    let snapshot = args.snapshot();
    let name = snapshot.options.iter().find(|o| o.owner == "name").unwrap();
    assert_eq!(name.switches, vec!["--name".to_string(), "-n".to_string()]);
    assert_eq!(snapshot, args.snapshot());
}
