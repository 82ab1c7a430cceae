//! Top-level orchestration (spec §2 data flow) and the frozen-instance
//! facade ([`Args`]) produced by [`crate::builder::ArgsBuilder::build`].
//!
//! `parse()` runs the pipeline spec §2 lays out in order: argument-file
//! expansion (§4.2) → tokenize/match (§4.3/§4.4) → environment fallback
//! (§4.6) → default application (§4.7) → validator run (§4.8) → constraint
//! solve (§4.9) → error aggregation (§4.10). This plays the role the
//! teacher's `ConfigLoader::load()` plays before the transform
//! (`crates/procenv/src/loader.rs`): one method that walks every configured
//! source in a fixed order and folds the results into one map.

use std::collections::HashMap;

use crate::argfile::expand_argument_files;
use crate::config::ParserConfig;
use crate::defaults::apply_defaults;
use crate::env_fallback::apply_env_fallback;
use crate::error::ParseError;
use crate::platform::Platform;
use crate::source::PresenceTracker;
use crate::spec::{DomainSpec, Registry};
use crate::suggest::Suggester;
use crate::tokenizer::tokenize;
use crate::value::{StoredValue, ValueSource};

/// A frozen, ready-to-parse instance. Not `Sync`-safe to drive concurrently
/// (spec Non-goal "concurrent parsing of one `Args` instance"): `parse`
/// takes `&mut self` and clears all prior state up front, so nothing is
/// preserved across calls except the frozen [`Registry`] itself (spec §5
/// "Shared-resource policy").
pub struct Args {
    registry: Registry,
    cfg: ParserConfig,
    platform: Box<dyn Platform>,
    suggester: Box<dyn Suggester>,
    values: HashMap<String, StoredValue>,
    presence: PresenceTracker,
    selected_domain: Option<String>,
    eager_triggered: bool,
    eager_owner: Option<String>,
    last_errors: Vec<String>,
}

impl Args {
    pub(crate) fn new(
        registry: Registry,
        cfg: ParserConfig,
        platform: Box<dyn Platform>,
        suggester: Box<dyn Suggester>,
    ) -> Self {
        Args {
            registry,
            cfg,
            platform,
            suggester,
            values: HashMap::new(),
            presence: PresenceTracker::new(),
            selected_domain: None,
            eager_triggered: false,
            eager_owner: None,
            last_errors: Vec::new(),
        }
    }

    /// Runs the full pipeline over `argv` (not including the program name).
    /// Clears any state left over from a previous `parse` call before
    /// starting (spec §5: re-parsing the same instance discards prior
    /// values, provenance, and errors; the registry stays frozen).
    pub fn parse<S: AsRef<str>>(&mut self, argv: &[S]) -> Result<(), ParseError> {
        self.values.clear();
        self.presence.clear();
        self.selected_domain = None;
        self.eager_triggered = false;
        self.eager_owner = None;
        self.last_errors.clear();

        let argv: Vec<String> = argv.iter().map(|s| s.as_ref().to_string()).collect();
        let expanded = match expand_argument_files(&argv, self.cfg.argument_file_prefix, &*self.platform) {
            Ok(expanded) => expanded,
            Err(e) => {
                self.last_errors.push(e.to_string());
                return Err(e);
            }
        };

        let outcome = tokenize(&expanded, &self.registry, &self.cfg, &*self.suggester);
        self.values = outcome.values;
        self.presence = outcome.presence;
        self.selected_domain = outcome.selected_domain;
        self.eager_triggered = outcome.eager_triggered;
        self.eager_owner = outcome.eager_owner;
        let mut errors = outcome.errors;

        if self.eager_triggered {
            // An eager flag (e.g. `--help`) short-circuits the remaining
            // pipeline entirely: no env fallback, no validators, no
            // constraint solving, and whatever errors the partial scan
            // produced are discarded in favor of success (spec §4.4 "Eager
            // short-circuit").
            apply_defaults(&self.registry, &mut self.values);
            return Ok(());
        }

        apply_env_fallback(&self.registry, &mut self.values, &*self.platform);
        apply_defaults(&self.registry, &mut self.values);

        for spec in &self.registry.options {
            if let Some(stored) = self.values.get(&spec.owner) {
                spec.converter.run_validators(
                    &spec.owner,
                    stored,
                    &spec.element_validators,
                    &spec.collection_validators,
                    &mut errors,
                );
            }
        }

        crate::constraints::solve_constraints(
            &self.registry,
            &mut self.values,
            &self.presence,
            self.selected_domain.as_deref(),
            &*self.platform,
            &mut errors,
        );

        self.finalize(errors)
    }

    fn finalize(&mut self, errors: Vec<ParseError>) -> Result<(), ParseError> {
        if errors.is_empty() {
            return Ok(());
        }
        self.last_errors = errors.iter().map(ToString::to_string).collect();
        if self.cfg.aggregate_errors {
            Err(ParseError::aggregate(errors).expect("non-empty errors checked above"))
        } else {
            Err(errors.into_iter().next().expect("non-empty errors checked above"))
        }
    }

    pub fn get_single<T: 'static>(&self, owner: &str) -> Option<&T> {
        self.values.get(owner).and_then(StoredValue::as_single)
    }

    pub fn get_list<T: 'static>(&self, owner: &str) -> Option<&Vec<T>> {
        self.values.get(owner).and_then(StoredValue::as_list)
    }

    pub fn get_group_list<T: 'static>(&self, owner: &str) -> Option<&Vec<Vec<T>>> {
        self.values.get(owner).and_then(StoredValue::as_group_list)
    }

    pub fn value_source(&self, owner: &str) -> Option<ValueSource> {
        self.values.get(owner).map(|v| v.source)
    }

    /// True iff the user (not environment/default) supplied `owner` at
    /// least once in the most recent parse (spec §4.9's notion of
    /// "present").
    pub fn is_present(&self, owner: &str) -> bool {
        self.presence.is_present(owner)
    }

    /// The argv indices `owner` was observed at, in occurrence order. A
    /// caller that wants `onValue`-style callbacks drives them from this
    /// after `parse` returns, rather than the tokenizer invoking them
    /// mid-scan (see [`crate::source::PresenceTracker::indices`]).
    pub fn occurrences(&self, owner: &str) -> &[usize] {
        self.presence.indices(owner)
    }

    pub fn selected_domain(&self) -> Option<&str> {
        self.selected_domain.as_deref()
    }

    /// True iff the most recent parse short-circuited on an eager flag
    /// (spec §4.4), and which owner triggered it.
    pub fn eager_owner(&self) -> Option<&str> {
        self.eager_owner.as_deref()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn config(&self) -> &ParserConfig {
        &self.cfg
    }

    /// A renderable, serializable view of the frozen declaration plus the
    /// most recent parse's outcome (spec §6), handed to an out-of-process
    /// Renderer/Translator collaborator. Pure: calling it twice in a row
    /// without an intervening `parse` yields equal snapshots.
    pub fn snapshot(&self) -> Snapshot {
        let min_required_global = |owner: &str| {
            self.registry
                .required_min
                .iter()
                .filter(|r| r.owner == owner && r.scope.is_none())
                .map(|r| r.min)
                .max()
        };
        Snapshot {
            app_name: self.cfg.app_name.clone(),
            app_description: self.cfg.app_description.clone(),
            settings: SettingsSnapshot::from(&self.cfg),
            domains: self.registry.domains.iter().map(DomainSnapshot::from).collect(),
            options: self
                .registry
                .options
                .iter()
                .filter(|spec| !spec.is_positional())
                .map(|spec| OptionSnapshot {
                    owner: spec.owner.clone(),
                    switches: spec.switches.clone(),
                    expected_desc: spec.expected_desc.clone(),
                    positional: spec.is_positional(),
                    boolean_flag: spec.boolean_flag,
                    negation_prefix: spec.negation_prefix.clone(),
                    requires_value: spec.requires_value,
                    repeatable: spec.repeatable,
                    hidden: spec.hidden,
                    help: spec.help.clone(),
                    env_var: spec.env_var.clone(),
                    default_value: spec.default_value.clone(),
                    declared_domains: spec.declared_domains.clone(),
                    min_required_global: min_required_global(&spec.owner),
                })
                .collect(),
            positionals: self
                .registry
                .options
                .iter()
                .filter(|spec| spec.is_positional())
                .map(|spec| PositionalSnapshot {
                    owner: spec.owner.clone(),
                    kind: spec.positional_kind,
                    seq: spec.positional_seq,
                    expected_desc: spec.expected_desc.clone(),
                    repeatable: spec.repeatable,
                    help: spec.help.clone(),
                    declared_domains: spec.declared_domains.clone(),
                    min_required_global: min_required_global(&spec.owner),
                })
                .collect(),
            constraints: ConstraintsSnapshot::from(&self.registry),
            selected_domain: self.selected_domain.clone(),
            errors: self.last_errors.clone(),
        }
    }
}

/// One domain/fragment, as exposed to an external renderer (spec §6).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DomainSnapshot {
    pub id: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    pub is_fragment: bool,
}

impl From<&DomainSpec> for DomainSnapshot {
    fn from(d: &DomainSpec) -> Self {
        DomainSnapshot {
            id: d.id.clone(),
            label: d.label.clone(),
            description: d.description.clone(),
            aliases: d.aliases.clone(),
            is_fragment: d.is_fragment,
        }
    }
}

/// One option (non-positional), as exposed to an external renderer (spec §6).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct OptionSnapshot {
    pub owner: String,
    pub switches: Vec<String>,
    pub expected_desc: String,
    pub positional: bool,
    pub boolean_flag: bool,
    pub negation_prefix: Option<String>,
    pub requires_value: bool,
    pub repeatable: bool,
    pub hidden: bool,
    pub help: Option<String>,
    pub env_var: Option<String>,
    pub default_value: Option<String>,
    pub declared_domains: Option<Vec<String>>,
    pub min_required_global: Option<usize>,
}

/// One positional, as exposed to an external renderer (spec §6). Kept
/// separate from [`OptionSnapshot`] since positionals have no switches,
/// `booleanFlag`, or `negationPrefix`, and carry a declaration order
/// (`seq`) an option never does.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct PositionalSnapshot {
    pub owner: String,
    pub kind: crate::spec::PositionalKind,
    pub seq: Option<usize>,
    pub expected_desc: String,
    pub repeatable: bool,
    pub help: Option<String>,
    pub declared_domains: Option<Vec<String>>,
    pub min_required_global: Option<usize>,
}

/// The subset of [`ParserConfig`] a renderer needs to describe the grammar
/// it's rendering (spec §6 "Settings").
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SettingsSnapshot {
    pub default_long_prefix: String,
    pub cluster_char: Option<char>,
    pub value_separators: Vec<char>,
    pub unknown_options_as_positionals: bool,
    pub argument_separator: String,
}

impl From<&ParserConfig> for SettingsSnapshot {
    fn from(cfg: &ParserConfig) -> Self {
        SettingsSnapshot {
            default_long_prefix: cfg.long_prefix.clone(),
            cluster_char: cfg.cluster_char,
            value_separators: cfg.value_separators.clone(),
            unknown_options_as_positionals: cfg.unknown_options_as_positionals,
            argument_separator: cfg.argument_separator.clone(),
        }
    }
}

/// One `ExactlyOne`/`AtMostOne`/`AtLeastOne` group rule (spec §3 `GroupRule`).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct GroupSnapshot {
    pub kind: crate::spec::GroupKind,
    pub owners: Vec<String>,
}

/// One mutual-exclusion rule (spec §3 `ConflictsRule`).
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConflictsSnapshot {
    pub owners: Vec<String>,
}

/// One conditional-requirement rule (spec §3 `ConditionalRule`). Carries
/// `predicate_ref` rather than the rule's actual closure — a renderer gets
/// the label a `ValuePredicate` was registered under, not the predicate
/// itself.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConditionalSnapshot {
    pub target: String,
    pub kind: crate::spec::ConditionalKind,
    pub refs: Vec<String>,
    pub predicate_ref: Option<String>,
}

/// The declared groups/conflicts/conditionals rules, as exposed to an
/// external renderer (spec §6 "Constraints").
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ConstraintsSnapshot {
    pub groups: Vec<GroupSnapshot>,
    pub conflicts: Vec<ConflictsSnapshot>,
    pub conditionals: Vec<ConditionalSnapshot>,
}

impl From<&Registry> for ConstraintsSnapshot {
    fn from(registry: &Registry) -> Self {
        ConstraintsSnapshot {
            groups: registry
                .groups
                .iter()
                .map(|g| GroupSnapshot { kind: g.kind, owners: g.owners.clone() })
                .collect(),
            conflicts: registry
                .conflicts
                .iter()
                .map(|c| ConflictsSnapshot { owners: c.owners.clone() })
                .collect(),
            conditionals: registry
                .conditionals
                .iter()
                .map(|c| ConditionalSnapshot {
                    target: c.target.clone(),
                    kind: c.kind,
                    refs: c.refs.clone(),
                    predicate_ref: c.predicate_ref.clone(),
                })
                .collect(),
        }
    }
}

/// The full renderable view handed to an out-of-process Renderer/Translator
/// (spec §1, §6). Deliberately carries no formatting or ANSI styling of its
/// own — those are the Renderer's job, out of scope for this crate.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Snapshot {
    pub app_name: String,
    pub app_description: Option<String>,
    pub settings: SettingsSnapshot,
    pub domains: Vec<DomainSnapshot>,
    pub options: Vec<OptionSnapshot>,
    pub positionals: Vec<PositionalSnapshot>,
    pub constraints: ConstraintsSnapshot,
    pub selected_domain: Option<String>,
    pub errors: Vec<String>,
}

#[cfg(test)]
mod tests {
    use crate::builder::{flag, option, positional_list, ArgsBuilder};
    use crate::config::ParserConfig;
    use crate::value::ValueSource;

    #[test]
    fn reparsing_clears_prior_state() {
        let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
        b.register(option::<String>("name").switch("--name").build()).unwrap();
        let mut args = b.build().unwrap();

        args.parse(&["--name", "Alice"]).unwrap();
        assert_eq!(args.get_single::<String>("name"), Some(&"Alice".to_string()));

        args.parse::<&str>(&[]).unwrap();
        assert_eq!(args.value_source("name"), None);
        assert!(!args.is_present("name"));
    }

    #[test]
    fn eager_flag_short_circuits_constraint_solving() {
        let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
        let required = b.register(option::<String>("token").switch("--token").required().build()).unwrap();
        b.register(flag("help").switch("--help").eager().build()).unwrap();
        let mut args = b.build().unwrap();

        // `token` is required and absent, but `--help` should still win.
        args.parse(&["--help"]).unwrap();
        assert_eq!(args.eager_owner(), Some("help"));
        let _ = required;
    }

    #[test]
    fn snapshot_is_idempotent() {
        let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
        b.register(positional_list::<String>("files").build()).unwrap();
        let mut args = b.build().unwrap();
        args.parse(&["a.txt", "b.txt"]).unwrap();

        let first = args.snapshot();
        let second = args.snapshot();
        assert_eq!(first, second);
    }

    #[test]
    fn env_fallback_runs_before_defaults() {
        let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
        b.register(option::<String>("greeting").switch("--greeting").default("hi".to_string()).build()).unwrap();
        let mut args = b.build().unwrap();
        args.parse::<&str>(&[]).unwrap();
        assert_eq!(args.get_single::<String>("greeting"), Some(&"hi".to_string()));
        assert_eq!(args.value_source("greeting"), Some(ValueSource::Default));
    }
}
