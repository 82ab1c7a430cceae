//! Error message quality tests: error text must be actionable without a
//! Renderer in front of it (spec §7 keeps message wording close to
//! [`argos::ParseError`]'s own `Display`, since many consumers will print
//! it directly in a terminal-less context like a CI log).

#![allow(clippy::pedantic)]

use argos::{flag, option, ArgsBuilder, GroupKind, ParserConfig};

#[test]
fn missing_required_option_names_the_option() {
    let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
    b.register(option::<String>("api-token").switch("--api-token").required().build()).unwrap();
    let mut args = b.build().unwrap();

    let err = args.parse::<&str>(&[]).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("api-token"), "{rendered}");
    assert!(rendered.contains("required"), "{rendered}");
}

#[test]
fn invalid_value_names_option_value_and_expected_kind() {
    let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
    b.register(option::<i64>("port").switch("--port").build()).unwrap();
    let mut args = b.build().unwrap();

    let err = args.parse(&["--port", "not-a-number"]).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("not-a-number"), "{rendered}");
    assert!(rendered.contains("port"), "{rendered}");
    assert!(rendered.contains("integer"), "{rendered}");
}

#[test]
fn one_of_rejection_lists_the_allowed_values() {
    let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
    b.register(option::<String>("mode").switch("--mode").one_of(["fast", "slow"]).build()).unwrap();
    let mut args = b.build().unwrap();

    let err = args.parse(&["--mode", "medium"]).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("medium") || rendered.contains("mode"), "{rendered}");
}

#[test]
fn duplicate_single_valued_option_is_reported() {
    let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
    b.register(option::<String>("name").switch("--name").build()).unwrap();
    let mut args = b.build().unwrap();

    let err = args.parse(&["--name", "a", "--name", "b"]).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("name"), "{rendered}");
    assert!(rendered.contains("multiple"), "{rendered}");
}

#[test]
fn conflicting_options_are_named_together() {
    let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
    b.register(flag("a").switch("--a").build()).unwrap();
    b.register(flag("b").switch("--b").build()).unwrap();
    b.conflicts(["a", "b"]).unwrap();
    let mut args = b.build().unwrap();

    let err = args.parse(&["--a", "--b"]).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains('a') && rendered.contains('b'), "{rendered}");
    assert!(rendered.contains("Conflicting"), "{rendered}");
}

#[test]
fn at_most_one_group_violation_names_the_group() {
    let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
    b.register(flag("x").switch("--x").build()).unwrap();
    b.register(flag("y").switch("--y").build()).unwrap();
    b.group(GroupKind::AtMostOne, ["x", "y"]).unwrap();
    let mut args = b.build().unwrap();

    let err = args.parse(&["--x", "--y"]).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("At most one"), "{rendered}");
}

#[test]
fn aggregate_render_capped_truncates_with_a_count_marker() {
    let mut b = ArgsBuilder::new(ParserConfig::new("demo").with_aggregate_errors(true, 10));
    for name in ["one", "two", "three"] {
        b.register(option::<String>(name).switch(format!("--{name}")).required().build()).unwrap();
    }
    let mut args = b.build().unwrap();

    let err = args.parse::<&str>(&[]).unwrap_err();
    let capped = err.render_capped(1);
    assert!(capped.contains("more"), "{capped}");
    assert_eq!(capped.lines().count(), 2);
}

#[test]
fn unknown_option_without_did_you_mean_still_names_the_token() {
    let mut b = ArgsBuilder::new(ParserConfig::new("demo").with_did_you_mean(false, 3));
    b.register(option::<String>("mode").switch("--mode").build()).unwrap();
    let mut args = b.build().unwrap();

    let err = args.parse(&["--mdoe"]).unwrap_err();
    let rendered = err.to_string();
    assert!(rendered.contains("--mdoe"), "{rendered}");
    assert!(!rendered.contains("did you mean"), "{rendered}");
}
