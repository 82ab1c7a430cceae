//! The fluent builder surface.
//!
//! Design Notes §9 ("Builder-family explosion → trait/interface + shared
//! state") asks for one internal draft record shared by every typed builder
//! variant, with fluent methods returning a refined `Self`. [`SpecDraft`] is
//! that shared record; [`OptionBuilder`], [`CollectionBuilder`],
//! [`FlagBuilder`] and [`PositionalBuilder`] are the thin typed wrappers
//! around it, the same way the teacher's `ConfigLoader`
//! (`crates/procenv/src/loader.rs`) is a single fluent struct threading a
//! shared set of settings through `with_env()`/`with_dotenv()`/... — here
//! the "settings" are per-option instead of per-loader, but the shape of
//! "consume self, return a refined self" is identical.
//!
//! Per Design Notes §9 ("Property delegation → explicit binder call") there
//! is deliberately no derive macro here: the user calls
//! [`ArgsBuilder::register`] once per option, explicitly, the same way the
//! teacher's non-macro call sites build a `ConfigLoader` by hand.

use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::ParserConfig;
use crate::error::ConfigError;
use crate::parser::Args;
use crate::platform::{Platform, StdPlatform};
use crate::spec::{
    ConditionalKind, ConditionalRule, ConflictsRule, DomainSpec, GroupKind, GroupRule,
    InputConfig, OptionSpec, PositionalKind, Registry, RequiredMinRule, ValueKind,
};
use crate::suggest::{LevenshteinSuggester, Suggester};
use crate::validate::{
    collection_validator, element_validator, ErasedCollectionValidator, ErasedElementValidator,
};
use crate::value::{ConverterFn, Probe, Raw, SingleResult};

/// A typed option value the builder surface knows how to convert from argv
/// text. Implemented for the handful of primitives the teacher's own
/// `ConfigValue::from_str_infer` (pre-transform `crates/procenv/src/value.rs`)
/// handled by hand; user types compose their own [`OptionBuilder::convert`]
/// override for anything richer (enums, newtypes, ...).
pub trait ArgValue: Clone + PartialEq + Send + Sync + std::fmt::Display + 'static {
    fn parse_str(s: &str) -> Option<Self>;
    fn expected() -> &'static str;
}

impl ArgValue for String {
    fn parse_str(s: &str) -> Option<Self> {
        Some(s.to_string())
    }
    fn expected() -> &'static str {
        "string"
    }
}

impl ArgValue for std::path::PathBuf {
    fn parse_str(s: &str) -> Option<Self> {
        Some(std::path::PathBuf::from(s))
    }
    fn expected() -> &'static str {
        "path"
    }
}

macro_rules! impl_arg_value_numeric {
    ($($t:ty => $desc:literal),* $(,)?) => {
        $(
            impl ArgValue for $t {
                fn parse_str(s: &str) -> Option<Self> {
                    s.parse().ok()
                }
                fn expected() -> &'static str {
                    $desc
                }
            }
        )*
    };
}

impl_arg_value_numeric!(
    i64 => "integer",
    i32 => "integer",
    u16 => "integer",
    u32 => "integer",
    u64 => "integer",
    f64 => "number",
);

/// The fields every builder variant shares, regardless of element type or
/// collection shape (spec §3 `OptionSpec`, minus `converter`/validators,
/// which stay typed in the wrapping builder until [`SpecDraft::finish`]).
struct SpecDraft {
    owner: String,
    switches: Vec<String>,
    value_kind: ValueKind,
    arity: usize,
    /// Set once `.arity(n)` is actually called, so [`SpecDraft::finish`] can
    /// tell an explicit `arity(1)` (invalid, spec §7 "arity < 2") apart from
    /// the untouched default of 1 (plain, non-grouped option).
    arity_explicit: bool,
    boolean_flag: bool,
    negation_prefix: Option<String>,
    requires_value: bool,
    repeatable: bool,
    positional_kind: PositionalKind,
    positional_seq: Option<usize>,
    env_var: Option<String>,
    eager: bool,
    hidden: bool,
    default_value: Option<String>,
    declared_domains: Option<Vec<String>>,
    input_config: Option<InputConfig>,
    required_min: Option<usize>,
    help: Option<String>,
}

impl SpecDraft {
    fn new(owner: impl Into<String>, value_kind: ValueKind, requires_value: bool) -> Self {
        let owner = owner.into();
        SpecDraft {
            owner,
            switches: Vec::new(),
            value_kind,
            arity: 1,
            arity_explicit: false,
            boolean_flag: false,
            negation_prefix: None,
            requires_value,
            repeatable: false,
            positional_kind: PositionalKind::None,
            positional_seq: None,
            env_var: None,
            eager: false,
            hidden: false,
            default_value: None,
            declared_domains: None,
            input_config: None,
            required_min: None,
            help: None,
        }
    }

    fn finish(
        self,
        expected_desc: String,
        converter: Arc<dyn crate::value::ErasedConverter>,
        element_validators: Vec<(String, Arc<dyn ErasedElementValidator>)>,
        collection_validators: Vec<(String, Arc<dyn ErasedCollectionValidator>)>,
    ) -> BuiltOption {
        let base_switch = self
            .switches
            .iter()
            .max_by_key(|s| s.chars().count())
            .cloned()
            .unwrap_or_else(|| format!("<{}>", self.owner));
        let repeatable = self.repeatable
            || matches!(self.positional_kind, PositionalKind::List | PositionalKind::Set);
        BuiltOption {
            spec: OptionSpec {
                owner: self.owner,
                switches: self.switches,
                base_switch,
                value_kind: self.value_kind,
                arity: self.arity,
                boolean_flag: self.boolean_flag,
                negation_prefix: self.negation_prefix,
                requires_value: self.requires_value,
                repeatable,
                positional_kind: self.positional_kind,
                positional_seq: self.positional_seq,
                env_var: self.env_var,
                expected_desc,
                eager: self.eager,
                hidden: self.hidden,
                default_value: self.default_value,
                declared_domains: self.declared_domains,
                converter,
                element_validators,
                collection_validators,
                input_config: self.input_config,
                help: self.help,
            },
            required_min: self.required_min,
            arity_explicit: self.arity_explicit,
        }
    }
}

/// The handoff between a typed builder and [`ArgsBuilder::register`]: a
/// finished [`OptionSpec`] plus the one piece of per-option state
/// ([`SpecDraft::required_min`]) that belongs to a constraint rule rather
/// than the spec record itself (spec §3 keeps "required" out of
/// `OptionSpec` entirely — it is a `RequiredMin` rule keyed by owner).
pub struct BuiltOption {
    spec: OptionSpec,
    required_min: Option<usize>,
    /// Set when `.arity(n)` was actually called, so [`ArgsBuilder::register`]
    /// can reject an explicit `arity < 2` (spec §7) without also rejecting
    /// every plain option's untouched default of 1.
    arity_explicit: bool,
}

/// Builds a single-valued, value-taking option.
pub struct OptionBuilder<T: ArgValue> {
    draft: SpecDraft,
    default: Option<T>,
    expected_override: Option<String>,
    element_validators: Vec<(String, Arc<dyn ErasedElementValidator>)>,
    collection_validators: Vec<(String, Arc<dyn ErasedCollectionValidator>)>,
    custom_convert: Option<Arc<dyn Fn(&str) -> Option<T> + Send + Sync>>,
    _marker: PhantomData<T>,
}

/// Starts building a `Single`-valued option named `owner`.
pub fn option<T: ArgValue>(owner: impl Into<String>) -> OptionBuilder<T> {
    OptionBuilder {
        draft: SpecDraft::new(owner, ValueKind::Single, true),
        default: None,
        expected_override: None,
        element_validators: Vec::new(),
        collection_validators: Vec::new(),
        custom_convert: None,
        _marker: PhantomData,
    }
}

impl<T: ArgValue> OptionBuilder<T> {
    #[must_use]
    pub fn switch(mut self, switch: impl Into<String>) -> Self {
        self.draft.switches.push(switch.into());
        self
    }

    #[must_use]
    pub fn switches<I, S>(mut self, switches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.draft.switches.extend(switches.into_iter().map(Into::into));
        self
    }

    /// Marks this option's value as optional-lookahead rather than
    /// mandatory-next-token (spec §4.4 item 5 "optional-lookahead").
    #[must_use]
    pub fn optional_value(mut self) -> Self {
        self.draft.requires_value = false;
        self
    }

    #[must_use]
    pub fn default(mut self, value: T) -> Self {
        self.draft.default_value = Some(value.to_string());
        self.default = Some(value);
        self
    }

    #[must_use]
    pub fn env(mut self, var: impl Into<String>) -> Self {
        self.draft.env_var = Some(var.into());
        self
    }

    /// Declares this option required (spec §4.9 item 3 `RequiredMin(owner, 1)`).
    #[must_use]
    pub fn required(mut self) -> Self {
        self.draft.required_min = Some(1);
        self
    }

    /// Declares this option must occur at least `min` times (arity-grouped
    /// or repeated single-valued occurrences both count, per spec §4.9
    /// item 3's counting rule).
    #[must_use]
    pub fn required_min(mut self, min: usize) -> Self {
        self.draft.required_min = Some(min);
        self
    }

    #[must_use]
    pub fn repeatable(mut self) -> Self {
        self.draft.repeatable = true;
        self
    }

    /// Groups `arity` consecutive argv tokens into one invocation (spec §3
    /// `arity`, invariant 9).
    #[must_use]
    pub fn arity(mut self, arity: usize) -> Self {
        self.draft.arity = arity;
        self.draft.arity_explicit = true;
        self
    }

    #[must_use]
    pub fn domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.draft.declared_domains = Some(domains.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.draft.hidden = true;
        self
    }

    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.draft.help = Some(help.into());
        self
    }

    /// Overrides `expectedDesc` for error messages, e.g. to describe an
    /// enum's literal set (spec §3 `expectedDesc`).
    #[must_use]
    pub fn expected(mut self, desc: impl Into<String>) -> Self {
        self.expected_override = Some(desc.into());
        self
    }

    /// Restricts accepted text to `choices`, updating `expectedDesc` to list
    /// them. Only meaningful for `T = String`.
    #[must_use]
    pub fn one_of<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices: Vec<String> = choices.into_iter().map(Into::into).collect();
        self.expected_override = Some(format!("one of: {}", choices.join(", ")));
        self.element_validators.push((
            "{value} is not one of the allowed values for {option}".to_string(),
            element_validator::<T, _>(move |v: &T| {
                choices.iter().any(|c| T::parse_str(c).as_ref() == Some(v))
            }),
        ));
        self
    }

    /// Overrides the default `T::parse_str` conversion, for types that need
    /// context beyond `FromStr`-style parsing (still reporting
    /// `ArgValue::expected()` unless [`Self::expected`] is also set).
    #[must_use]
    pub fn convert(mut self, f: impl Fn(&str) -> Option<T> + Send + Sync + 'static) -> Self {
        self.custom_convert = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn validate(
        mut self,
        message: impl Into<String>,
        f: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.element_validators.push((message.into(), element_validator::<T, _>(f)));
        self
    }

    /// Builds the finished [`BuiltOption`] for [`ArgsBuilder::register`].
    pub fn build(self) -> BuiltOption {
        let default = self.default;
        let custom = self.custom_convert.clone();
        let parse = move |s: &str| -> Option<T> {
            match &custom {
                Some(f) => f(s),
                None => T::parse_str(s),
            }
        };
        let parse_for_convert = parse.clone();
        let parse_for_probe = parse.clone();
        let converter = ConverterFn::new(
            self.expected_override.clone().unwrap_or_else(|| T::expected().to_string()),
            move |raw: &Raw| match &raw.value {
                Some(s) => parse_for_convert(s)
                    .map(SingleResult::Value)
                    .unwrap_or_else(|| SingleResult::Invalid(s.clone())),
                None if raw.present => SingleResult::Missing,
                None => match &default {
                    Some(d) => SingleResult::Value(d.clone()),
                    None => SingleResult::Missing,
                },
            },
            move |s: &str| {
                if parse_for_probe(s).is_some() { Probe::Definite } else { Probe::Indeterminate }
            },
        );
        self.draft.finish(
            self.expected_override.unwrap_or_else(|| T::expected().to_string()),
            Arc::new(converter),
            self.element_validators,
            self.collection_validators,
        )
    }
}

/// Builds a `List`/`Set`-valued option.
pub struct CollectionBuilder<T: ArgValue> {
    draft: SpecDraft,
    expected_override: Option<String>,
    element_validators: Vec<(String, Arc<dyn ErasedElementValidator>)>,
    collection_validators: Vec<(String, Arc<dyn ErasedCollectionValidator>)>,
    custom_convert: Option<Arc<dyn Fn(&str) -> Option<T> + Send + Sync>>,
    _marker: PhantomData<T>,
}

/// Starts building a `List`-valued option named `owner`.
pub fn list<T: ArgValue>(owner: impl Into<String>) -> CollectionBuilder<T> {
    CollectionBuilder {
        draft: SpecDraft::new(owner, ValueKind::List, true),
        expected_override: None,
        element_validators: Vec::new(),
        collection_validators: Vec::new(),
        custom_convert: None,
        _marker: PhantomData,
    }
}

/// Starts building a `Set`-valued option (first-insertion-wins dedup, spec
/// §3 `valueKind = Set`).
pub fn set<T: ArgValue>(owner: impl Into<String>) -> CollectionBuilder<T> {
    CollectionBuilder {
        draft: SpecDraft::new(owner, ValueKind::Set, true),
        expected_override: None,
        element_validators: Vec::new(),
        collection_validators: Vec::new(),
        custom_convert: None,
        _marker: PhantomData,
    }
}

impl<T: ArgValue> CollectionBuilder<T> {
    #[must_use]
    pub fn switch(mut self, switch: impl Into<String>) -> Self {
        self.draft.switches.push(switch.into());
        self
    }

    #[must_use]
    pub fn switches<I, S>(mut self, switches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.draft.switches.extend(switches.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn arity(mut self, arity: usize) -> Self {
        self.draft.arity = arity;
        self.draft.arity_explicit = true;
        self
    }

    #[must_use]
    pub fn required_min(mut self, min: usize) -> Self {
        self.draft.required_min = Some(min);
        self
    }

    #[must_use]
    pub fn domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.draft.declared_domains = Some(domains.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.draft.hidden = true;
        self
    }

    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.draft.help = Some(help.into());
        self
    }

    #[must_use]
    pub fn expected(mut self, desc: impl Into<String>) -> Self {
        self.expected_override = Some(desc.into());
        self
    }

    #[must_use]
    pub fn convert(mut self, f: impl Fn(&str) -> Option<T> + Send + Sync + 'static) -> Self {
        self.custom_convert = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn validate_element(
        mut self,
        message: impl Into<String>,
        f: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.element_validators.push((message.into(), element_validator::<T, _>(f)));
        self
    }

    #[must_use]
    pub fn validate_collection(
        mut self,
        message: impl Into<String>,
        f: impl Fn(&Vec<T>) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.collection_validators.push((message.into(), collection_validator::<T, _>(f)));
        self
    }

    pub fn build(self) -> BuiltOption {
        let custom = self.custom_convert.clone();
        let parse = move |s: &str| -> Option<T> {
            match &custom {
                Some(f) => f(s),
                None => T::parse_str(s),
            }
        };
        let parse_for_convert = parse.clone();
        let parse_for_probe = parse.clone();
        let converter = ConverterFn::new(
            self.expected_override.clone().unwrap_or_else(|| T::expected().to_string()),
            move |raw: &Raw| match &raw.value {
                Some(s) => parse_for_convert(s)
                    .map(SingleResult::Value)
                    .unwrap_or_else(|| SingleResult::Invalid(s.clone())),
                None => SingleResult::Missing,
            },
            move |s: &str| {
                if parse_for_probe(s).is_some() { Probe::Definite } else { Probe::Indeterminate }
            },
        );
        self.draft.finish(
            self.expected_override.unwrap_or_else(|| T::expected().to_string()),
            Arc::new(converter),
            self.element_validators,
            self.collection_validators,
        )
    }
}

/// Builds a boolean flag, optionally negatable, optionally eager (spec §3
/// `booleanFlag`, `negationPrefix`, `eager`).
pub struct FlagBuilder {
    draft: SpecDraft,
    default: Option<bool>,
}

pub fn flag(owner: impl Into<String>) -> FlagBuilder {
    let mut draft = SpecDraft::new(owner, ValueKind::Single, false);
    draft.boolean_flag = true;
    FlagBuilder { draft, default: None }
}

impl FlagBuilder {
    #[must_use]
    pub fn switch(mut self, switch: impl Into<String>) -> Self {
        self.draft.switches.push(switch.into());
        self
    }

    #[must_use]
    pub fn switches<I, S>(mut self, switches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.draft.switches.extend(switches.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn default(mut self, value: bool) -> Self {
        self.draft.default_value = Some(value.to_string());
        self.default = Some(value);
        self
    }

    /// Synthesizes a `--<prefix><name>` negation alias for every `--name`
    /// long switch (spec §3 `negationPrefix`).
    #[must_use]
    pub fn negatable(mut self, prefix: impl Into<String>) -> Self {
        self.draft.negation_prefix = Some(prefix.into());
        self
    }

    /// Marks this flag eager: once truthy, short-circuits the remaining
    /// parse (spec §4.4 "Eager short-circuit"; used to model `--help`).
    #[must_use]
    pub fn eager(mut self) -> Self {
        self.draft.eager = true;
        self
    }

    #[must_use]
    pub fn env(mut self, var: impl Into<String>) -> Self {
        self.draft.env_var = Some(var.into());
        self
    }

    #[must_use]
    pub fn domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.draft.declared_domains = Some(domains.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.draft.hidden = true;
        self
    }

    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.draft.help = Some(help.into());
        self
    }

    pub fn build(self) -> BuiltOption {
        let default = self.default;
        let converter = ConverterFn::new(
            "boolean",
            move |raw: &Raw| match &raw.value {
                Some(s) => crate::value::parse_bool_literal(s)
                    .map(SingleResult::Value)
                    .unwrap_or_else(|| SingleResult::Invalid(s.clone())),
                None if raw.present => SingleResult::Value(!raw.negated),
                None => match default {
                    Some(d) => SingleResult::Value(d),
                    None => SingleResult::Missing,
                },
            },
            |s: &str| {
                if crate::value::parse_bool_literal(s).is_some() {
                    Probe::Definite
                } else {
                    Probe::Indeterminate
                }
            },
        )
        .boolean();
        self.draft.finish("boolean".to_string(), Arc::new(converter), Vec::new(), Vec::new())
    }
}

/// Builds a positional argument (spec §3 `positionalKind`, `positionalSeq`).
pub struct PositionalBuilder<T: ArgValue> {
    draft: SpecDraft,
    expected_override: Option<String>,
    element_validators: Vec<(String, Arc<dyn ErasedElementValidator>)>,
    collection_validators: Vec<(String, Arc<dyn ErasedCollectionValidator>)>,
    _marker: PhantomData<T>,
}

/// Starts building a single positional value.
pub fn positional<T: ArgValue>(owner: impl Into<String>) -> PositionalBuilder<T> {
    let mut draft = SpecDraft::new(owner, ValueKind::Single, true);
    draft.positional_kind = PositionalKind::Single;
    PositionalBuilder {
        draft,
        expected_override: None,
        element_validators: Vec::new(),
        collection_validators: Vec::new(),
        _marker: PhantomData,
    }
}

/// Starts building the trailing, repeatable positional (spec invariant 4:
/// at most one per domain, declared last).
pub fn positional_list<T: ArgValue>(owner: impl Into<String>) -> PositionalBuilder<T> {
    let mut draft = SpecDraft::new(owner, ValueKind::List, true);
    draft.positional_kind = PositionalKind::List;
    PositionalBuilder {
        draft,
        expected_override: None,
        element_validators: Vec::new(),
        collection_validators: Vec::new(),
        _marker: PhantomData,
    }
}

impl<T: ArgValue> PositionalBuilder<T> {
    #[must_use]
    pub fn required_min(mut self, min: usize) -> Self {
        self.draft.required_min = Some(min);
        self
    }

    #[must_use]
    pub fn domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.draft.declared_domains = Some(domains.into_iter().map(Into::into).collect());
        self
    }

    #[must_use]
    pub fn expected(mut self, desc: impl Into<String>) -> Self {
        self.expected_override = Some(desc.into());
        self
    }

    #[must_use]
    pub fn help(mut self, help: impl Into<String>) -> Self {
        self.draft.help = Some(help.into());
        self
    }

    #[must_use]
    pub fn validate(
        mut self,
        message: impl Into<String>,
        f: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.element_validators.push((message.into(), element_validator::<T, _>(f)));
        self
    }

    pub fn build(self) -> BuiltOption {
        let converter = ConverterFn::new(
            self.expected_override.clone().unwrap_or_else(|| T::expected().to_string()),
            |raw: &Raw| match &raw.value {
                Some(s) => {
                    T::parse_str(s).map(SingleResult::Value).unwrap_or_else(|| SingleResult::Invalid(s.clone()))
                }
                None => SingleResult::Missing,
            },
            |s: &str| if T::parse_str(s).is_some() { Probe::Definite } else { Probe::Indeterminate },
        );
        self.draft.finish(
            self.expected_override.unwrap_or_else(|| T::expected().to_string()),
            Arc::new(converter),
            self.element_validators,
            self.collection_validators,
        )
    }
}

/// Builds one domain or fragment (spec §3 `DomainSpec`).
pub struct DomainBuilder {
    spec: DomainSpec,
}

pub fn domain(id: impl Into<String>) -> DomainBuilder {
    DomainBuilder {
        spec: DomainSpec {
            id: id.into(),
            label: None,
            description: None,
            aliases: Vec::new(),
            is_fragment: false,
            inherits: Vec::new(),
        },
    }
}

/// Builds a fragment: a non-selectable domain whose rules are inherited by
/// concrete domains that list it in [`DomainBuilder::inherits`] (spec §3,
/// glossary "Fragment").
pub fn fragment(id: impl Into<String>) -> DomainBuilder {
    let mut b = domain(id);
    b.spec.is_fragment = true;
    b
}

impl DomainBuilder {
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.spec.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.spec.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.spec.aliases.push(alias.into());
        self
    }

    #[must_use]
    pub fn inherits(mut self, id: impl Into<String>) -> Self {
        self.spec.inherits.push(id.into());
        self
    }

    pub fn build(self) -> DomainSpec {
        self.spec
    }
}

/// Assembles a [`Registry`] through the typed builders above and produces a
/// frozen [`Args`] (spec §4.1 "Registry freezes at the start of parse" —
/// here frozen explicitly at [`ArgsBuilder::build`] instead, since the
/// builder has no implicit first-parse moment to hook).
pub struct ArgsBuilder {
    registry: Registry,
    cfg: ParserConfig,
    platform: Box<dyn Platform>,
    suggester: Box<dyn Suggester>,
}

impl ArgsBuilder {
    pub fn new(cfg: ParserConfig) -> Self {
        ArgsBuilder {
            registry: Registry::new(),
            cfg,
            platform: Box::new(StdPlatform),
            suggester: Box::new(LevenshteinSuggester),
        }
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Box<dyn Platform>) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn with_suggester(mut self, suggester: Box<dyn Suggester>) -> Self {
        self.suggester = suggester;
        self
    }

    /// Registers one option (or positional) and, if it was marked
    /// `.required()`/`.required_min(n)`, its companion `RequiredMin` rule.
    /// Returns the owner name for use in later constraint registration.
    pub fn register(&mut self, built: BuiltOption) -> Result<String, ConfigError> {
        if built.arity_explicit && built.spec.arity < 2 {
            return Err(ConfigError::ArityTooSmall { owner: built.spec.owner.clone(), arity: built.spec.arity });
        }
        let owner = built.spec.owner.clone();
        if built.spec.is_positional() {
            let next_seq = self
                .registry
                .options
                .iter()
                .filter(|o| o.is_positional())
                .filter_map(|o| o.positional_seq)
                .max()
                .map_or(0, |s| s + 1);
            let mut spec = built.spec;
            spec.positional_seq = Some(next_seq);
            self.registry.register_option(spec)?;
        } else {
            self.registry.register_option(built.spec)?;
        }
        if let Some(min) = built.required_min {
            self.registry.add_required_min(&owner, min, None)?;
        }
        Ok(owner)
    }

    pub fn register_domain(&mut self, spec: DomainSpec) -> Result<(), ConfigError> {
        self.registry.register_domain(spec)
    }

    pub fn conflicts<I, S>(&mut self, owners: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry.add_conflicts(ConflictsRule {
            owners: owners.into_iter().map(Into::into).collect(),
            scope: None,
        })
    }

    pub fn group<I, S>(&mut self, kind: GroupKind, owners: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry.add_group(GroupRule {
            kind,
            owners: owners.into_iter().map(Into::into).collect(),
            scope: None,
        })
    }

    /// Requires `target` whenever any of `refs` is user-present (spec §4.9
    /// item 4 `AnyPresent`).
    pub fn require_if_any_present<I, S>(&mut self, target: &str, refs: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditional(target, ConditionalKind::AnyPresent, refs, None, None)
    }

    pub fn require_if_all_present<I, S>(&mut self, target: &str, refs: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditional(target, ConditionalKind::AllPresent, refs, None, None)
    }

    pub fn require_if_any_absent<I, S>(&mut self, target: &str, refs: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditional(target, ConditionalKind::AnyAbsent, refs, None, None)
    }

    pub fn require_if_all_absent<I, S>(&mut self, target: &str, refs: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditional(target, ConditionalKind::AllAbsent, refs, None, None)
    }

    /// Requires `target` whenever `predicate(values[reference])` holds
    /// (spec §4.9 item 4 `ValuePredicate`).
    pub fn require_if_value<T: ArgValue>(
        &mut self,
        target: &str,
        reference: &str,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Result<(), ConfigError> {
        let erased = erase_predicate(predicate);
        self.registry.add_conditional(ConditionalRule {
            target: target.to_string(),
            kind: ConditionalKind::ValuePredicate,
            refs: Vec::new(),
            predicate_ref: Some(reference.to_string()),
            predicate: Some(erased),
            scope: None,
        })
    }

    /// Rejects `target` when present unless `predicate(values[reference])`
    /// holds (spec §4.9 item 4 `AllowOnlyIfValuePredicate`).
    pub fn allow_only_if_value<T: ArgValue>(
        &mut self,
        target: &str,
        reference: &str,
        predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
    ) -> Result<(), ConfigError> {
        let erased = erase_predicate(predicate);
        self.registry.add_conditional(ConditionalRule {
            target: target.to_string(),
            kind: ConditionalKind::AllowOnlyIfValuePredicate,
            refs: Vec::new(),
            predicate_ref: Some(reference.to_string()),
            predicate: Some(erased),
            scope: None,
        })
    }

    fn conditional<I, S>(
        &mut self,
        target: &str,
        kind: ConditionalKind,
        refs: I,
        predicate_ref: Option<String>,
        predicate: Option<Arc<dyn Fn(&dyn Any) -> bool + Send + Sync>>,
    ) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.registry.add_conditional(ConditionalRule {
            target: target.to_string(),
            kind,
            refs: refs.into_iter().map(Into::into).collect(),
            predicate_ref,
            predicate,
            scope: None,
        })
    }

    /// Freezes the registry (spec §3 invariant 6) and produces the
    /// ready-to-parse [`Args`].
    pub fn build(mut self) -> Result<Args, ConfigError> {
        self.registry.freeze()?;
        Ok(Args::new(self.registry, self.cfg, self.platform, self.suggester))
    }
}

fn erase_predicate<T: ArgValue>(
    predicate: impl Fn(&T) -> bool + Send + Sync + 'static,
) -> Arc<dyn Fn(&dyn Any) -> bool + Send + Sync> {
    Arc::new(move |any: &dyn Any| any.downcast_ref::<T>().is_some_and(|v| predicate(v)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueSource;

    #[test]
    fn option_builder_applies_declared_default() {
        let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
        let owner = b.register(option::<i64>("port").switch("--port").default(8080).build()).unwrap();
        let mut args = b.build().unwrap();
        args.parse::<&str>(&[]).unwrap();
        assert_eq!(args.get_single::<i64>(&owner), Some(&8080));
        assert_eq!(args.value_source(&owner), Some(ValueSource::Default));
    }

    #[test]
    fn required_option_missing_reports_error() {
        let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
        b.register(option::<String>("token").switch("--token").required().build()).unwrap();
        let mut args = b.build().unwrap();
        assert!(args.parse::<&str>(&[]).is_err());
    }

    #[test]
    fn one_of_rejects_values_outside_the_set() {
        let mut b = ArgsBuilder::new(ParserConfig::new("demo"));
        b.register(
            option::<String>("mode")
                .switch("--mode")
                .one_of(["fast", "slow"])
                .build(),
        )
        .unwrap();
        let mut args = b.build().unwrap();
        let result = args.parse(&["--mode".to_string(), "medium".to_string()]);
        assert!(result.is_err());
    }
}
