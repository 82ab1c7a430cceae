//! The typed value pipeline (spec §4.5) and its supporting data model (§3).
//!
//! Each declared option carries a `converter` closure from `Raw -> SingleResult<T>`.
//! Because a single [`crate::spec::Registry`] holds options of many different
//! `T`, the converter is stored behind the [`ErasedConverter`] trait object
//! the same way the teacher erases heterogeneous config values into
//! `ConfigValue` (`crates/procenv/src/value.rs` in the pre-transform tree) —
//! except here the erasure wraps a real `Box<dyn Any>` per owner instead of a
//! fixed set of primitive variants, since arguments must round-trip through
//! arbitrary user types.
//!
//! Accumulation and validator dispatch also live behind [`ErasedConverter`]:
//! it is the only place `T` is in scope once an option has been registered,
//! so every operation that needs to downcast (combining a new occurrence
//! into the owner's [`StoredValue`], running element/collection validators)
//! is implemented once, generically, in [`ConverterFn`] and reached through
//! the trait object rather than threaded through the caller as a type
//! parameter.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::ParseError;
use crate::spec::ValueKind;
use crate::validate::{run_validators_erased, ErasedCollectionValidator, ErasedElementValidator};

/// Where a stored value's provenance traces back to (spec §3 `ValueSource`,
/// invariant 10).
#[derive(Clone, Copy, Debug, Eq, PartialEq, PartialOrd, Ord)]
pub enum ValueSource {
    /// Not set by anything (nullable owner, nothing supplied).
    Missing = 0,
    /// Supplied by the declared default.
    Default = 1,
    /// Supplied by the declared environment variable.
    Environment = 2,
    /// Supplied by the user on argv.
    User = 3,
}

impl ValueSource {
    /// Last-writer-wins by priority: `User > Environment > Default > Missing`.
    pub fn highest(self, other: ValueSource) -> ValueSource {
        if self as u8 >= other as u8 { self } else { other }
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueSource::User => "user",
            ValueSource::Environment => "environment",
            ValueSource::Default => "default",
            ValueSource::Missing => "missing",
        };
        f.write_str(s)
    }
}

/// The tokenizer's immediate record of one observed occurrence (spec §3).
#[derive(Clone, Debug, Default)]
pub struct Raw {
    pub present: bool,
    pub value: Option<String>,
    pub argv_index: Option<usize>,
    pub negated: bool,
}

impl Raw {
    pub fn absent() -> Self {
        Raw { present: false, value: None, argv_index: None, negated: false }
    }

    pub fn present_with(value: impl Into<String>, argv_index: usize, negated: bool) -> Self {
        Raw { present: true, value: Some(value.into()), argv_index: Some(argv_index), negated }
    }

    /// A flag occurrence that carries no textual value (bare `--verbose`).
    pub fn flag(argv_index: usize, negated: bool) -> Self {
        Raw { present: true, value: None, argv_index: Some(argv_index), negated }
    }

    /// A synthetic occurrence standing in for an environment or default
    /// value, carrying no `argv_index` (spec §4.6/§4.7).
    pub fn synthetic(value: impl Into<String>) -> Self {
        Raw { present: true, value: Some(value.into()), argv_index: None, negated: false }
    }
}

/// The result of converting one [`Raw`] through an option's converter. Carries
/// no [`ValueSource`]: the same conversion function runs for user occurrences,
/// environment fallback, and default application alike, so the call site
/// (`crate::tokenizer`, `crate::env_fallback`, `crate::defaults`) is what
/// knows which source applies.
pub enum SingleResult<T> {
    /// Nothing to convert (no occurrence, no default, no env value).
    Missing,
    /// Successful conversion.
    Value(T),
    /// The raw text could not be converted; carries the original text for
    /// the "Invalid value '{value}'" error message.
    Invalid(String),
}

/// The result of a converter's optional-lookahead probe (spec §4.4, and
/// Design Notes §9 "Lookahead decision for optional-value options").
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Probe {
    /// The token is definitely a valid value for this converter.
    Definite,
    /// The token is ambiguous/not a valid value; the matcher should leave
    /// it for positional/next-option handling instead of consuming it.
    Indeterminate,
}

/// Erased counterpart of [`SingleResult`].
pub enum ErasedSingleResult {
    Missing,
    Value(Box<dyn Any + Send + Sync>),
    Invalid(String),
}

/// A type-erased converter, so a single [`crate::spec::Registry`] can hold
/// options of heterogeneous result types behind one `Vec`. Also the seam
/// through which accumulation and validator dispatch reach the concrete `T`
/// (see module docs).
pub trait ErasedConverter: Send + Sync {
    /// Convert one occurrence, boxing the typed result behind `Any`.
    fn convert_erased(&self, raw: &Raw) -> ErasedSingleResult;

    /// Type-aware peek used by optional-lookahead options (spec §4.4 item 5,
    /// "Else (optional-lookahead)").
    fn probe(&self, text: &str) -> Probe;

    /// Whether the empty string is an acceptable value for this converter
    /// (controls the "empty-string or null" branch of §4.4 item 5).
    fn accepts_empty(&self) -> bool {
        false
    }

    /// Human description of the expected type/enum, for error messages
    /// (`expectedDesc` in spec §3).
    fn expected_desc(&self) -> String;

    /// True for boolean converters; changes probe semantics to the literal
    /// set `true|false|yes|no|on|off|1|0` (case-insensitive), per §4.4.
    fn is_boolean(&self) -> bool {
        false
    }

    /// Converts one occurrence and folds it into `existing` according to
    /// `kind` (Single overwrites, List appends, Set dedups by `PartialEq`).
    /// Returns `Ok(None)` when `raw` carried no value to convert.
    fn accumulate_single(
        &self,
        owner: &str,
        existing: Option<StoredValue>,
        raw: &Raw,
        source: ValueSource,
        kind: ValueKind,
    ) -> Result<Option<StoredValue>, ParseError>;

    /// Converts exactly `raws.len()` occurrences as one arity group (spec
    /// §4.5/invariant 9) and folds the resulting `Vec<T>` into `existing`:
    /// Single/List both append groups in order (their difference is purely
    /// in how a caller reads the result back), Set dedups whole groups.
    fn accumulate_group(
        &self,
        owner: &str,
        existing: Option<StoredValue>,
        raws: &[Raw],
        source: ValueSource,
        kind: ValueKind,
    ) -> Result<Option<StoredValue>, ParseError>;

    /// True iff `stored`'s single value downcasts to `bool` and is `true` —
    /// the eager short-circuit check (spec §4.4), expressed without the
    /// caller needing to know `T` (only boolean-flagged options are ever
    /// asked this, but the check is safe for any `T`).
    fn is_truthy(&self, stored: &StoredValue) -> bool;

    /// Builds an empty `List`/`Set` placeholder of this converter's element
    /// type, so an option never declared on argv still downcasts cleanly
    /// (spec §4.7: "declared but empty" rather than absent).
    fn empty_collection(&self, kind: ValueKind) -> StoredValue;

    /// Runs this owner's element/collection validators against its stored
    /// value, appending a [`ParseError::ValidatorFailed`] per failing
    /// predicate (spec §4.8).
    fn run_validators(
        &self,
        owner: &str,
        stored: &StoredValue,
        element_validators: &[(String, Arc<dyn ErasedElementValidator>)],
        collection_validators: &[(String, Arc<dyn ErasedCollectionValidator>)],
        errors: &mut Vec<ParseError>,
    );
}

/// Adapts a typed `Fn(&Raw) -> SingleResult<T>` plus a typed probe function
/// into an [`ErasedConverter`]. This is the "lift transformations as free
/// functions" tactic from Design Notes §9.
pub struct ConverterFn<T, F, P> {
    pub convert: F,
    pub probe_fn: P,
    pub expected: String,
    pub boolean: bool,
    pub empty_ok: bool,
    _marker: std::marker::PhantomData<fn() -> T>,
}

impl<T, F, P> ConverterFn<T, F, P>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(&Raw) -> SingleResult<T> + Send + Sync,
    P: Fn(&str) -> Probe + Send + Sync,
{
    pub fn new(expected: impl Into<String>, convert: F, probe_fn: P) -> Self {
        ConverterFn {
            convert,
            probe_fn,
            expected: expected.into(),
            boolean: false,
            empty_ok: false,
            _marker: std::marker::PhantomData,
        }
    }

    pub fn boolean(mut self) -> Self {
        self.boolean = true;
        self
    }

    pub fn empty_ok(mut self) -> Self {
        self.empty_ok = true;
        self
    }
}

impl<T, F, P> ErasedConverter for ConverterFn<T, F, P>
where
    T: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(&Raw) -> SingleResult<T> + Send + Sync,
    P: Fn(&str) -> Probe + Send + Sync,
{
    fn convert_erased(&self, raw: &Raw) -> ErasedSingleResult {
        match (self.convert)(raw) {
            SingleResult::Missing => ErasedSingleResult::Missing,
            SingleResult::Value(v) => ErasedSingleResult::Value(Box::new(v)),
            SingleResult::Invalid(s) => ErasedSingleResult::Invalid(s),
        }
    }

    fn probe(&self, text: &str) -> Probe {
        (self.probe_fn)(text)
    }

    fn accepts_empty(&self) -> bool {
        self.empty_ok
    }

    fn expected_desc(&self) -> String {
        self.expected.clone()
    }

    fn is_boolean(&self) -> bool {
        self.boolean
    }

    fn accumulate_single(
        &self,
        owner: &str,
        existing: Option<StoredValue>,
        raw: &Raw,
        source: ValueSource,
        kind: ValueKind,
    ) -> Result<Option<StoredValue>, ParseError> {
        let value = match (self.convert)(raw) {
            SingleResult::Missing => return Ok(existing),
            SingleResult::Value(v) => v,
            SingleResult::Invalid(text) => {
                return Err(ParseError::InvalidValue {
                    option: owner.to_string(),
                    value: text,
                    position: raw.argv_index,
                    expected: Some(self.expected.clone()),
                });
            }
        };

        let merged = match (kind, existing) {
            (ValueKind::Single, existing) => {
                let prior_source = existing.map(|e| e.source).unwrap_or(ValueSource::Missing);
                StoredValue::single(value, prior_source.highest(source))
            }
            (ValueKind::List, Some(mut e)) => {
                let source = e.source.highest(source);
                let mut values = e.take_list::<T>();
                values.push(value);
                e.replace_list(values, source);
                e
            }
            (ValueKind::List, None) => StoredValue::list(vec![value], source),
            (ValueKind::Set, Some(mut e)) => {
                let merged_source = e.source.highest(source);
                let mut values = e.take_list::<T>();
                set_insert(&mut values, value);
                e.replace_list(values, merged_source);
                e
            }
            (ValueKind::Set, None) => StoredValue::set(vec![value], source),
        };
        Ok(Some(merged))
    }

    fn accumulate_group(
        &self,
        owner: &str,
        existing: Option<StoredValue>,
        raws: &[Raw],
        source: ValueSource,
        kind: ValueKind,
    ) -> Result<Option<StoredValue>, ParseError> {
        let mut group = Vec::with_capacity(raws.len());
        for raw in raws {
            match (self.convert)(raw) {
                SingleResult::Missing => {
                    return Err(ParseError::PartialArityGroup {
                        option: owner.to_string(),
                        expected: raws.len(),
                        got: group.len(),
                    });
                }
                SingleResult::Value(v) => group.push(v),
                SingleResult::Invalid(text) => {
                    return Err(ParseError::InvalidValue {
                        option: owner.to_string(),
                        value: text,
                        position: raw.argv_index,
                        expected: Some(self.expected.clone()),
                    });
                }
            }
        }

        let merged = match (kind, existing) {
            (ValueKind::Set, Some(mut e)) => {
                let merged_source = e.source.highest(source);
                let mut groups = e.take_group_list::<T>();
                if !groups.contains(&group) {
                    groups.push(group);
                }
                e.replace_group_list(groups, merged_source, true);
                e
            }
            (ValueKind::Set, None) => StoredValue::set_of_lists(vec![group], source),
            (_, Some(mut e)) => {
                let merged_source = e.source.highest(source);
                let mut groups = e.take_group_list::<T>();
                groups.push(group);
                e.replace_group_list(groups, merged_source, false);
                e
            }
            (_, None) => StoredValue::list_of_lists(vec![group], source),
        };
        Ok(Some(merged))
    }

    fn is_truthy(&self, stored: &StoredValue) -> bool {
        stored
            .as_single::<T>()
            .and_then(|v| (v as &dyn Any).downcast_ref::<bool>())
            .copied()
            .unwrap_or(false)
    }

    fn empty_collection(&self, kind: ValueKind) -> StoredValue {
        match kind {
            ValueKind::Set => StoredValue::set::<T>(Vec::new(), ValueSource::Missing),
            _ => StoredValue::list::<T>(Vec::new(), ValueSource::Missing),
        }
    }

    fn run_validators(
        &self,
        owner: &str,
        stored: &StoredValue,
        element_validators: &[(String, Arc<dyn ErasedElementValidator>)],
        collection_validators: &[(String, Arc<dyn ErasedCollectionValidator>)],
        errors: &mut Vec<ParseError>,
    ) {
        run_validators_erased::<T>(owner, stored, element_validators, collection_validators, errors);
    }
}

/// Parses the boolean literal set required by spec §4.4:
/// `true|false|yes|no|on|off|1|0`, case-insensitive.
pub fn parse_bool_literal(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

/// The shape of a stored value, i.e. which [`crate::spec::OptionSpec::value_kind`]
/// / arity combination produced it. Mirrors Design Notes §9's
/// `StoredValue = Single(T) | ListOf(T) | SetOf(T) | ListOfLists(T) | SetOfLists(T)`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueShape {
    Single,
    List,
    Set,
    ListOfLists,
    SetOfLists,
}

/// Type-erased storage for one owner's accumulated value plus its
/// provenance. Typed accessors (`as_single`, `as_list`, ...) downcast.
pub struct StoredValue {
    pub shape: ValueShape,
    pub source: ValueSource,
    pub occurrences: usize,
    data: Box<dyn Any + Send + Sync>,
}

impl StoredValue {
    pub fn single<T: Send + Sync + 'static>(value: T, source: ValueSource) -> Self {
        StoredValue { shape: ValueShape::Single, source, occurrences: 1, data: Box::new(value) }
    }

    pub fn list<T: Send + Sync + 'static>(values: Vec<T>, source: ValueSource) -> Self {
        StoredValue { shape: ValueShape::List, source, occurrences: values.len(), data: Box::new(values) }
    }

    pub fn set<T: Send + Sync + 'static>(values: Vec<T>, source: ValueSource) -> Self {
        StoredValue { shape: ValueShape::Set, source, occurrences: values.len(), data: Box::new(values) }
    }

    pub fn list_of_lists<T: Send + Sync + 'static>(groups: Vec<Vec<T>>, source: ValueSource) -> Self {
        let occurrences = groups.len();
        StoredValue { shape: ValueShape::ListOfLists, source, occurrences, data: Box::new(groups) }
    }

    pub fn set_of_lists<T: Send + Sync + 'static>(groups: Vec<Vec<T>>, source: ValueSource) -> Self {
        let occurrences = groups.len();
        StoredValue { shape: ValueShape::SetOfLists, source, occurrences, data: Box::new(groups) }
    }

    pub fn as_single<T: 'static>(&self) -> Option<&T> {
        self.data.downcast_ref::<T>()
    }

    /// Exposes the stored payload as `&dyn Any`, for callers that only hold
    /// a `predicate: Arc<dyn Fn(&dyn Any) -> bool>` and never recover `T`
    /// themselves — the constraint solver's `ValuePredicate`/
    /// `AllowOnlyIfValuePredicate` rules (spec §4.9 item 4).
    pub fn as_any(&self) -> &dyn Any {
        &*self.data
    }

    pub fn as_list<T: 'static>(&self) -> Option<&Vec<T>> {
        self.data.downcast_ref::<Vec<T>>()
    }

    pub fn as_group_list<T: 'static>(&self) -> Option<&Vec<Vec<T>>> {
        self.data.downcast_ref::<Vec<Vec<T>>>()
    }

    /// The last invocation's group, for a `Single` owner declared with
    /// `arity > 1` (spec §3: "the last accepted typed value (or a `List<T>`
    /// when arity > 1)").
    pub fn as_last_group<T: 'static + Clone>(&self) -> Option<Vec<T>> {
        self.as_group_list::<T>().and_then(|groups| groups.last().cloned())
    }

    /// Element/group count used by the constraint solver's required-min
    /// counting rule (spec §4.9 item 3).
    pub fn count(&self) -> usize {
        self.occurrences
    }

    fn take_list<T: Clone + Send + Sync + 'static>(&mut self) -> Vec<T> {
        self.data.downcast_mut::<Vec<T>>().map(std::mem::take).unwrap_or_default()
    }

    fn replace_list<T: Send + Sync + 'static>(&mut self, values: Vec<T>, source: ValueSource) {
        self.occurrences = values.len();
        self.source = source;
        self.data = Box::new(values);
    }

    fn take_group_list<T: Clone + Send + Sync + 'static>(&mut self) -> Vec<Vec<T>> {
        self.data.downcast_mut::<Vec<Vec<T>>>().map(std::mem::take).unwrap_or_default()
    }

    fn replace_group_list<T: Send + Sync + 'static>(&mut self, groups: Vec<Vec<T>>, source: ValueSource, is_set: bool) {
        self.shape = if is_set { ValueShape::SetOfLists } else { ValueShape::ListOfLists };
        self.occurrences = groups.len();
        self.source = source;
        self.data = Box::new(groups);
    }
}

/// A set element whose equality (and therefore dedup identity) is defined
/// by `key` alone — "first wins by key" (spec §3, `KeyValue`).
#[derive(Clone, Debug)]
pub struct KeyValue<K, V> {
    pub key: K,
    pub value: V,
}

impl<K: PartialEq, V> PartialEq for KeyValue<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}
impl<K: Eq, V> Eq for KeyValue<K, V> {}

/// Inserts `value` into `set` preserving first-insertion order and dropping
/// later duplicates — the Set accumulation rule of spec §3/§4.5, and the
/// "Collection determinism" property of spec §8.
pub fn set_insert<T: PartialEq>(set: &mut Vec<T>, value: T) {
    if !set.contains(&value) {
        set.push(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_source_priority_order() {
        assert_eq!(ValueSource::User.highest(ValueSource::Default), ValueSource::User);
        assert_eq!(ValueSource::Environment.highest(ValueSource::User), ValueSource::User);
        assert_eq!(ValueSource::Missing.highest(ValueSource::Default), ValueSource::Default);
    }

    #[test]
    fn bool_literal_parsing_is_case_insensitive() {
        for lit in ["true", "YES", "On", "1"] {
            assert_eq!(parse_bool_literal(lit), Some(true), "{lit}");
        }
        for lit in ["false", "NO", "Off", "0"] {
            assert_eq!(parse_bool_literal(lit), Some(false), "{lit}");
        }
        assert_eq!(parse_bool_literal("maybe"), None);
    }

    #[test]
    fn set_insert_dedups_first_wins() {
        let mut set = Vec::new();
        set_insert(&mut set, 1);
        set_insert(&mut set, 2);
        set_insert(&mut set, 1);
        assert_eq!(set, vec![1, 2]);
    }

    #[test]
    fn key_value_equality_ignores_value() {
        let a = KeyValue { key: "x", value: 1 };
        let b = KeyValue { key: "x", value: 2 };
        assert_eq!(a, b);
    }

    #[test]
    fn stored_value_roundtrips_typed_access() {
        let sv = StoredValue::list(vec![1i64, 2, 3], ValueSource::User);
        assert_eq!(sv.as_list::<i64>(), Some(&vec![1, 2, 3]));
        assert_eq!(sv.count(), 3);
    }

    #[test]
    fn converter_fn_accumulates_set_with_dedup() {
        let converter = ConverterFn::new(
            "int",
            |raw: &Raw| match &raw.value {
                Some(s) => s.parse::<i64>().map(SingleResult::Value).unwrap_or(SingleResult::Invalid(s.clone())),
                None => SingleResult::Missing,
            },
            |_: &str| Probe::Definite,
        );
        let first = converter
            .accumulate_single("n", None, &Raw::synthetic("1"), ValueSource::User, ValueKind::Set)
            .unwrap();
        let second = converter
            .accumulate_single("n", first, &Raw::synthetic("1"), ValueSource::User, ValueKind::Set)
            .unwrap()
            .unwrap();
        assert_eq!(second.as_list::<i64>(), Some(&vec![1]));
    }
}
