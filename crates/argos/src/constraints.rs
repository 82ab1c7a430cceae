//! Constraint solver (spec §4.9).
//!
//! Runs after default application and validator checks have already filled
//! `errors`. All six phases run unconditionally and in order, every
//! violation is pushed onto `errors` — the aggregator (spec §4.10) decides
//! afterwards whether that means "fail fast" or "report everything".

use std::collections::HashMap;

use crate::error::ParseError;
use crate::platform::Platform;
use crate::source::PresenceTracker;
use crate::spec::{ConditionalKind, GroupKind, InputConfig, Registry, ValueKind};
use crate::value::{Raw, StoredValue, ValueSource};

#[allow(clippy::too_many_arguments)]
pub fn solve_constraints(
    registry: &Registry,
    values: &mut HashMap<String, StoredValue>,
    presence: &PresenceTracker,
    selected_domain: Option<&str>,
    platform: &dyn Platform,
    errors: &mut Vec<ParseError>,
) {
    domain_restriction(registry, presence, selected_domain, errors);
    duplicate_check(registry, presence, errors);
    required_min(registry, values, selected_domain, platform, errors);
    conditionals(registry, values, presence, selected_domain, errors);
    conflicts(registry, presence, selected_domain, errors);
    groups(registry, presence, selected_domain, errors);
}

fn scope_admits(scope: &Option<Vec<String>>, selected_domain: Option<&str>) -> bool {
    match scope {
        None => true,
        Some(domains) => selected_domain.is_some_and(|d| domains.iter().any(|x| x == d)),
    }
}

fn domain_restriction(
    registry: &Registry,
    presence: &PresenceTracker,
    selected_domain: Option<&str>,
    errors: &mut Vec<ParseError>,
) {
    for spec in &registry.options {
        let Some(domains) = &spec.declared_domains else { continue };
        if !presence.is_present(&spec.owner) {
            continue;
        }
        let admitted = selected_domain.is_some_and(|d| domains.iter().any(|x| x == d));
        if !admitted {
            errors.push(ParseError::OptionNotInDomain {
                option: spec.owner.clone(),
                domains: domains.clone(),
            });
        }
    }
}

fn duplicate_check(registry: &Registry, presence: &PresenceTracker, errors: &mut Vec<ParseError>) {
    for spec in &registry.options {
        if spec.is_positional() || spec.repeatable {
            continue;
        }
        if presence.occurrence_count(&spec.owner) > 1 {
            errors.push(ParseError::DuplicateOption { option: spec.owner.clone() });
        }
    }
}

fn required_min(
    registry: &Registry,
    values: &mut HashMap<String, StoredValue>,
    selected_domain: Option<&str>,
    platform: &dyn Platform,
    errors: &mut Vec<ParseError>,
) {
    let mut eff_min: HashMap<&str, usize> = HashMap::new();
    for rule in &registry.required_min {
        if !scope_admits(&rule.scope, selected_domain) {
            continue;
        }
        let slot = eff_min.entry(rule.owner.as_str()).or_insert(0);
        *slot = (*slot).max(rule.min);
    }

    for (owner, min) in eff_min {
        let count = values.get(owner).map_or(0, StoredValue::count);
        if count >= min {
            continue;
        }

        if count == 0
            && let Some(spec) = registry.option(owner)
            && let Some(input) = &spec.input_config
            && let Some(text) = prompt_for_value(input, platform)
        {
            let stored = spec.converter.accumulate_single(
                owner,
                None,
                &Raw::synthetic(text),
                ValueSource::User,
                ValueKind::Single,
            );
            if let Ok(Some(stored)) = stored {
                values.insert(owner.to_string(), stored);
                continue;
            }
        }

        if min == 1 {
            errors.push(ParseError::RequiredMissing { option: owner.to_string() });
        } else {
            errors.push(ParseError::RequiresAtLeast { option: owner.to_string(), min, got: count });
        }
    }
}

/// A line read from the prompt flow. Hidden-echo input is held in a
/// `secrecy::SecretString` (feature `secrecy`) rather than a plain `String`
/// so the entered value never lingers unprotected in memory between the
/// read and the final conversion hand-off.
enum PromptedValue {
    Plain(String),
    #[cfg(feature = "secrecy")]
    Hidden(secrecy::SecretString),
}

impl PromptedValue {
    fn reveal(&self) -> &str {
        match self {
            PromptedValue::Plain(s) => s,
            #[cfg(feature = "secrecy")]
            PromptedValue::Hidden(s) => secrecy::ExposeSecret::expose_secret(s),
        }
    }

    fn into_string(self) -> String {
        match self {
            PromptedValue::Plain(s) => s,
            #[cfg(feature = "secrecy")]
            PromptedValue::Hidden(s) => secrecy::ExposeSecret::expose_secret(&s).to_string(),
        }
    }
}

fn read_prompted(input: &InputConfig, platform: &dyn Platform) -> Option<PromptedValue> {
    if input.hidden_echo {
        let chars: String = platform.read_password()?.into_iter().collect();
        #[cfg(feature = "secrecy")]
        {
            Some(PromptedValue::Hidden(secrecy::SecretString::from(chars)))
        }
        #[cfg(not(feature = "secrecy"))]
        {
            Some(PromptedValue::Plain(chars))
        }
    } else {
        platform.read_line().map(PromptedValue::Plain)
    }
}

/// Drives the Platform prompt-for-input flow (spec §4.9 item 3): reads one
/// line (or password, if `hidden_echo`), optionally re-prompts for
/// confirmation, retrying up to `max_retries` times on mismatch. Returns
/// `None` on EOF or retry exhaustion, leaving the required-min error intact.
fn prompt_for_value(input: &InputConfig, platform: &dyn Platform) -> Option<String> {
    for attempt in 0..=input.max_retries {
        platform.eprint(&input.prompt);
        platform.eflush();
        let first = read_prompted(input, platform)?;

        if !input.confirm {
            return Some(first.into_string());
        }

        platform.eprint(&input.prompt);
        platform.eflush();
        let second = read_prompted(input, platform)?;

        if first.reveal() == second.reveal() {
            return Some(first.into_string());
        }

        if attempt < input.max_retries {
            platform.eprintln(&input.mismatch_message);
        }
    }
    None
}

fn conditionals(
    registry: &Registry,
    values: &HashMap<String, StoredValue>,
    presence: &PresenceTracker,
    selected_domain: Option<&str>,
    errors: &mut Vec<ParseError>,
) {
    for rule in &registry.conditionals {
        if !scope_admits(&rule.scope, selected_domain) {
            continue;
        }

        match rule.kind {
            ConditionalKind::AllowOnlyIfValuePredicate => {
                if !presence.is_present(&rule.target) {
                    continue;
                }
                let Some(reference) = &rule.predicate_ref else { continue };
                let Some(predicate) = &rule.predicate else { continue };
                let Some(reference_value) = values.get(reference) else { continue };
                if !predicate(reference_value.as_any()) {
                    errors.push(ParseError::NotAllowedBecauseValue {
                        option: rule.target.clone(),
                        reference: reference.clone(),
                    });
                }
            }
            other => {
                let triggered = match other {
                    ConditionalKind::AnyPresent => rule.refs.iter().any(|r| presence.is_present(r)),
                    ConditionalKind::AllPresent => rule.refs.iter().all(|r| presence.is_present(r)),
                    ConditionalKind::AnyAbsent => rule.refs.iter().any(|r| !presence.is_present(r)),
                    ConditionalKind::AllAbsent => rule.refs.iter().all(|r| !presence.is_present(r)),
                    ConditionalKind::ValuePredicate => rule
                        .predicate_ref
                        .as_ref()
                        .and_then(|r| values.get(r))
                        .zip(rule.predicate.as_ref())
                        .is_some_and(|(v, p)| p(v.as_any())),
                    ConditionalKind::AllowOnlyIfValuePredicate => unreachable!(),
                };

                if triggered && !presence.is_present(&rule.target) {
                    errors.push(ParseError::ConditionalRequired {
                        option: rule.target.clone(),
                        refs: rule.refs.clone(),
                    });
                }
            }
        }
    }
}

fn conflicts(
    registry: &Registry,
    presence: &PresenceTracker,
    selected_domain: Option<&str>,
    errors: &mut Vec<ParseError>,
) {
    for rule in &registry.conflicts {
        if !scope_admits(&rule.scope, selected_domain) {
            continue;
        }
        let present_count = rule.owners.iter().filter(|o| presence.is_present(o)).count();
        if present_count > 1 {
            errors.push(ParseError::Conflicting(rule.owners.clone()));
        }
    }
}

fn groups(
    registry: &Registry,
    presence: &PresenceTracker,
    selected_domain: Option<&str>,
    errors: &mut Vec<ParseError>,
) {
    for rule in &registry.groups {
        if !scope_admits(&rule.scope, selected_domain) {
            continue;
        }
        let present_count = rule.owners.iter().filter(|o| presence.is_present(o)).count();
        let violated = match rule.kind {
            GroupKind::ExactlyOne => present_count != 1,
            GroupKind::AtMostOne => present_count > 1,
            GroupKind::AtLeastOne => present_count < 1,
        };
        if !violated {
            continue;
        }
        errors.push(match rule.kind {
            GroupKind::ExactlyOne => ParseError::ExactlyOneOf(rule.owners.clone()),
            GroupKind::AtMostOne => ParseError::AtMostOneOf(rule.owners.clone()),
            GroupKind::AtLeastOne => ParseError::AtLeastOneOf(rule.owners.clone()),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::StdPlatform;
    use crate::spec::{ConditionalRule, ConflictsRule, GroupRule, OptionSpec, PositionalKind};
    use crate::value::{ConverterFn, Probe, SingleResult};
    use std::sync::Arc;

    fn string_option(owner: &str, repeatable: bool) -> OptionSpec {
        let converter = Arc::new(ConverterFn::new(
            "string",
            |raw: &Raw| match &raw.value {
                Some(s) => SingleResult::Value(s.clone()),
                None => SingleResult::Missing,
            },
            |_: &str| Probe::Definite,
        ));
        OptionSpec {
            owner: owner.to_string(),
            switches: vec![format!("--{owner}")],
            base_switch: format!("--{owner}"),
            value_kind: ValueKind::Single,
            arity: 1,
            boolean_flag: false,
            negation_prefix: None,
            requires_value: true,
            repeatable,
            positional_kind: PositionalKind::None,
            positional_seq: None,
            env_var: None,
            expected_desc: "string".to_string(),
            eager: false,
            hidden: false,
            default_value: None,
            declared_domains: None,
            converter,
            element_validators: Vec::new(),
            collection_validators: Vec::new(),
            input_config: None,
            help: None,
        }
    }

    #[test]
    fn duplicate_occurrence_without_repeatable_errors() {
        let mut r = Registry::new();
        r.register_option(string_option("name", false)).unwrap();
        r.freeze().unwrap();

        let mut presence = PresenceTracker::new();
        presence.record("name", 0);
        presence.record("name", 2);

        let mut values = HashMap::new();
        let mut errors = Vec::new();
        solve_constraints(&r, &mut values, &presence, None, &StdPlatform, &mut errors);
        assert!(matches!(errors[0], ParseError::DuplicateOption { .. }));
    }

    #[test]
    fn required_min_reports_missing_when_absent() {
        let mut r = Registry::new();
        r.register_option(string_option("token", true)).unwrap();
        r.add_required_min("token", 1, None).unwrap();
        r.freeze().unwrap();

        let mut values = HashMap::new();
        let presence = PresenceTracker::new();
        let mut errors = Vec::new();
        solve_constraints(&r, &mut values, &presence, None, &StdPlatform, &mut errors);
        assert!(matches!(errors[0], ParseError::RequiredMissing { .. }));
    }

    #[test]
    fn required_min_satisfied_by_stored_value_emits_nothing() {
        let mut r = Registry::new();
        r.register_option(string_option("token", true)).unwrap();
        r.add_required_min("token", 1, None).unwrap();
        r.freeze().unwrap();

        let mut values = HashMap::new();
        values.insert("token".to_string(), StoredValue::single("abc".to_string(), ValueSource::User));
        let presence = PresenceTracker::new();
        let mut errors = Vec::new();
        solve_constraints(&r, &mut values, &presence, None, &StdPlatform, &mut errors);
        assert!(errors.is_empty());
    }

    #[test]
    fn conditional_all_present_requires_target() {
        let mut r = Registry::new();
        r.register_option(string_option("user", true)).unwrap();
        r.register_option(string_option("password", true)).unwrap();
        r.add_conditional(ConditionalRule {
            target: "password".to_string(),
            kind: ConditionalKind::AnyPresent,
            refs: vec!["user".to_string()],
            predicate_ref: None,
            predicate: None,
            scope: None,
        })
        .unwrap();
        r.freeze().unwrap();

        let mut presence = PresenceTracker::new();
        presence.record("user", 0);
        let mut values = HashMap::new();
        let mut errors = Vec::new();
        solve_constraints(&r, &mut values, &presence, None, &StdPlatform, &mut errors);
        assert!(matches!(errors[0], ParseError::ConditionalRequired { .. }));
    }

    #[test]
    fn conflicting_options_reported_when_both_present() {
        let mut r = Registry::new();
        r.register_option(string_option("quiet", true)).unwrap();
        r.register_option(string_option("verbose", true)).unwrap();
        r.add_conflicts(ConflictsRule { owners: vec!["quiet".to_string(), "verbose".to_string()], scope: None })
            .unwrap();
        r.freeze().unwrap();

        let mut presence = PresenceTracker::new();
        presence.record("quiet", 0);
        presence.record("verbose", 1);
        let mut values = HashMap::new();
        let mut errors = Vec::new();
        solve_constraints(&r, &mut values, &presence, None, &StdPlatform, &mut errors);
        assert!(matches!(errors[0], ParseError::Conflicting(_)));
    }

    #[test]
    fn exactly_one_group_violated_when_none_present() {
        let mut r = Registry::new();
        r.register_option(string_option("json", true)).unwrap();
        r.register_option(string_option("yaml", true)).unwrap();
        r.add_group(GroupRule {
            kind: GroupKind::ExactlyOne,
            owners: vec!["json".to_string(), "yaml".to_string()],
            scope: None,
        })
        .unwrap();
        r.freeze().unwrap();

        let presence = PresenceTracker::new();
        let mut values = HashMap::new();
        let mut errors = Vec::new();
        solve_constraints(&r, &mut values, &presence, None, &StdPlatform, &mut errors);
        assert!(matches!(errors[0], ParseError::ExactlyOneOf(_)));
    }

    #[test]
    fn out_of_domain_owner_reports_restriction() {
        let mut r = Registry::new();
        let mut spec = string_option("prod-flag", true);
        spec.declared_domains = Some(vec!["deploy".to_string()]);
        r.register_option(spec).unwrap();
        r.freeze().unwrap();

        let mut presence = PresenceTracker::new();
        presence.record("prod-flag", 0);
        let mut values = HashMap::new();
        let mut errors = Vec::new();
        solve_constraints(&r, &mut values, &presence, Some("build"), &StdPlatform, &mut errors);
        assert!(matches!(errors[0], ParseError::OptionNotInDomain { .. }));
    }
}
