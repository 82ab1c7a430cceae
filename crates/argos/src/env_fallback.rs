//! Environment fallback (spec §4.6).
//!
//! Runs once, after the tokenizer/matcher has consumed all of argv: for
//! every `Single`-valued owner still missing a value whose spec names an
//! `envVar`, consult [`Platform::getenv`] and, if present, feed it through
//! the same converter the tokenizer uses, tagging the result
//! [`ValueSource::Environment`].

use std::collections::HashMap;

use crate::platform::Platform;
use crate::spec::{Registry, ValueKind};
use crate::value::{Raw, StoredValue, ValueSource};

/// Fills in environment-sourced values for every eligible, still-missing
/// owner. Mutates `values` in place.
pub fn apply_env_fallback(registry: &Registry, values: &mut HashMap<String, StoredValue>, platform: &dyn Platform) {
    for spec in &registry.options {
        if spec.value_kind != ValueKind::Single || values.contains_key(&spec.owner) {
            continue;
        }
        let Some(env_name) = &spec.env_var else { continue };
        let Some(text) = platform.getenv(env_name) else { continue };

        // An empty environment value behaves like an unattached switch for
        // boolean specs (flag mode), otherwise the string is the value.
        let raw = if spec.boolean_flag && text.is_empty() {
            Raw { present: true, value: None, argv_index: None, negated: false }
        } else {
            Raw::synthetic(text)
        };

        match spec.converter.accumulate_single(&spec.owner, None, &raw, ValueSource::Environment, spec.value_kind) {
            Ok(Some(stored)) => {
                values.insert(spec.owner.clone(), stored);
            }
            Ok(None) => {}
            Err(_) => {
                // An unparsable environment value is treated the same as an
                // absent one: default application gets a chance next, and
                // the constraint solver's required-min check reports the
                // owner as missing rather than surfacing a parse error for
                // a value the user never typed on argv.
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{OptionSpec, PositionalKind};
    use crate::value::{ConverterFn, Probe, SingleResult};
    use serial_test::serial;
    use std::sync::Arc;

    fn env_backed_option(owner: &str, env_var: &str) -> OptionSpec {
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
            repeatable: false,
            positional_kind: PositionalKind::None,
            positional_seq: None,
            env_var: Some(env_var.to_string()),
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
    #[serial]
    fn fills_missing_single_from_env() {
        // SAFETY: serialized via `serial_test` against other env-reading tests.
        unsafe { std::env::set_var("ARGOS_ENV_FALLBACK_TEST", "from-env") };
        let mut r = Registry::new();
        r.register_option(env_backed_option("token", "ARGOS_ENV_FALLBACK_TEST")).unwrap();
        r.freeze().unwrap();

        let mut values = HashMap::new();
        apply_env_fallback(&r, &mut values, &crate::platform::StdPlatform);
        assert_eq!(values.get("token").unwrap().as_single::<String>().unwrap(), "from-env");

        unsafe { std::env::remove_var("ARGOS_ENV_FALLBACK_TEST") };
    }

    #[test]
    #[serial]
    fn does_not_override_already_present_value() {
        let mut r = Registry::new();
        r.register_option(env_backed_option("token", "ARGOS_ENV_FALLBACK_UNUSED")).unwrap();
        r.freeze().unwrap();

        let mut values = HashMap::new();
        values.insert("token".to_string(), StoredValue::single("user-value".to_string(), ValueSource::User));
        apply_env_fallback(&r, &mut values, &crate::platform::StdPlatform);
        assert_eq!(values.get("token").unwrap().as_single::<String>().unwrap(), "user-value");
    }
}
