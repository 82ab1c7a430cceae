//! Default application (spec §4.7).
//!
//! Runs after environment fallback, for every owner still without a stored
//! value:
//! - `Single`: run the converter against an absent [`Raw`]; a converter
//!   built with a default wired in yields `Value(d)`, stored as
//!   [`ValueSource::Default`].
//! - `List`/`Set` without arity: initialize an empty collection so callers
//!   never have to distinguish "never declared" from "declared but empty".
//! - `List`/`Set` with `arity > 1` and no default: stay absent (nullable).

use std::collections::HashMap;

use crate::spec::{PositionalKind, Registry, ValueKind};
use crate::value::{Raw, StoredValue, ValueSource};

pub fn apply_defaults(registry: &Registry, values: &mut HashMap<String, StoredValue>) {
    for spec in &registry.options {
        if values.contains_key(&spec.owner) {
            continue;
        }

        match spec.value_kind {
            ValueKind::Single => {
                if let Ok(Some(stored)) =
                    spec.converter.accumulate_single(&spec.owner, None, &Raw::absent(), ValueSource::Default, ValueKind::Single)
                {
                    values.insert(spec.owner.clone(), stored);
                }
            }
            ValueKind::List if !spec.is_arity_group() => {
                values.insert(spec.owner.clone(), spec.converter.empty_collection(ValueKind::List));
            }
            ValueKind::Set if !spec.is_arity_group() => {
                values.insert(spec.owner.clone(), spec.converter.empty_collection(ValueKind::Set));
            }
            // Arity-bearing List/Set owners without an explicit occurrence
            // remain nullable (spec §4.7 last bullet).
            ValueKind::List | ValueKind::Set => {}
        }
    }
}

/// Whether `owner`'s positional declaration is repeatable, used by the
/// tokenizer's tail-assignment and exposed here for symmetry with the
/// snapshot's `repeatable` field.
pub fn is_repeatable_positional(kind: PositionalKind) -> bool {
    matches!(kind, PositionalKind::List | PositionalKind::Set)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::{OptionSpec, PositionalKind};
    use crate::value::{ConverterFn, Probe, SingleResult};
    use std::sync::Arc;

    fn option_with_default(owner: &str, kind: ValueKind, default: Option<&'static str>) -> OptionSpec {
        let converter = Arc::new(ConverterFn::new(
            "string",
            move |raw: &Raw| match (&raw.value, raw.present, default) {
                (Some(s), _, _) => SingleResult::Value(s.clone()),
                (None, false, Some(d)) => SingleResult::Value(d.to_string()),
                (None, false, None) => SingleResult::Missing,
                (None, true, _) => SingleResult::Missing,
            },
            |_: &str| Probe::Definite,
        ));
        OptionSpec {
            owner: owner.to_string(),
            switches: vec![format!("--{owner}")],
            base_switch: format!("--{owner}"),
            value_kind: kind,
            arity: 1,
            boolean_flag: false,
            negation_prefix: None,
            requires_value: true,
            repeatable: true,
            positional_kind: PositionalKind::None,
            positional_seq: None,
            env_var: None,
            expected_desc: "string".to_string(),
            eager: false,
            hidden: false,
            default_value: default.map(str::to_string),
            declared_domains: None,
            converter,
            element_validators: Vec::new(),
            collection_validators: Vec::new(),
            input_config: None,
            help: None,
        }
    }

    #[test]
    fn single_owner_gets_declared_default() {
        let mut r = Registry::new();
        r.register_option(option_with_default("greeting", ValueKind::Single, Some("hello"))).unwrap();
        r.freeze().unwrap();

        let mut values = HashMap::new();
        apply_defaults(&r, &mut values);
        let stored = values.get("greeting").unwrap();
        assert_eq!(stored.as_single::<String>().unwrap(), "hello");
        assert_eq!(stored.source, ValueSource::Default);
    }

    #[test]
    fn single_owner_without_default_stays_missing() {
        let mut r = Registry::new();
        r.register_option(option_with_default("name", ValueKind::Single, None)).unwrap();
        r.freeze().unwrap();

        let mut values = HashMap::new();
        apply_defaults(&r, &mut values);
        assert!(!values.contains_key("name"));
    }

    #[test]
    fn list_owner_without_arity_gets_empty_collection() {
        let mut r = Registry::new();
        r.register_option(option_with_default("tags", ValueKind::List, None)).unwrap();
        r.freeze().unwrap();

        let mut values = HashMap::new();
        apply_defaults(&r, &mut values);
        assert_eq!(values.get("tags").unwrap().as_list::<String>(), Some(&Vec::new()));
    }
}
