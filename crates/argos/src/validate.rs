//! The validator runner (spec §4.8).
//!
//! Element and collection validators are plain predicates keyed by a
//! message template, the same shape as the teacher's
//! `ValidationFieldError` (`crates/procenv/src/validation.rs` before the
//! transform) minus the `validator` crate's attribute-derived rules — this
//! spec's validators are arbitrary closures the caller supplies through the
//! builder, not a fixed attribute vocabulary, so there is nothing for a
//! derive-based validation crate to attach to.

use std::any::Any;
use std::sync::Arc;

use crate::error::ParseError;
use crate::value::StoredValue;

/// A type-erased per-element predicate (`T -> bool`).
pub trait ErasedElementValidator: Send + Sync {
    fn check(&self, value: &dyn Any) -> bool;
}

/// A type-erased per-collection predicate (`Vec<T> -> bool`).
pub trait ErasedCollectionValidator: Send + Sync {
    fn check(&self, collection: &dyn Any) -> bool;
}

struct ElementValidatorFn<T, F> {
    f: F,
    _marker: std::marker::PhantomData<fn(&T)>,
}

impl<T, F> ErasedElementValidator for ElementValidatorFn<T, F>
where
    T: 'static,
    F: Fn(&T) -> bool + Send + Sync,
{
    fn check(&self, value: &dyn Any) -> bool {
        value.downcast_ref::<T>().is_some_and(|v| (self.f)(v))
    }
}

struct CollectionValidatorFn<T, F> {
    f: F,
    _marker: std::marker::PhantomData<fn(&Vec<T>)>,
}

impl<T, F> ErasedCollectionValidator for CollectionValidatorFn<T, F>
where
    T: 'static,
    F: Fn(&Vec<T>) -> bool + Send + Sync,
{
    fn check(&self, collection: &dyn Any) -> bool {
        collection.downcast_ref::<Vec<T>>().is_some_and(|v| (self.f)(v))
    }
}

/// Wraps a typed element predicate as an [`ErasedElementValidator`].
pub fn element_validator<T, F>(f: F) -> Arc<dyn ErasedElementValidator>
where
    T: 'static,
    F: Fn(&T) -> bool + Send + Sync + 'static,
{
    Arc::new(ElementValidatorFn { f, _marker: std::marker::PhantomData })
}

/// Wraps a typed collection predicate as an [`ErasedCollectionValidator`].
pub fn collection_validator<T, F>(f: F) -> Arc<dyn ErasedCollectionValidator>
where
    T: 'static,
    F: Fn(&Vec<T>) -> bool + Send + Sync + 'static,
{
    Arc::new(CollectionValidatorFn { f, _marker: std::marker::PhantomData })
}

/// Runs `element_validators`/`collection_validators` against one owner's
/// stored value, pushing templated `ValidatorFailed` errors into `errors`
/// for each predicate that returns `false` (spec §4.8). Downcast targets
/// are tried for every primitive shape the [`StoredValue`] might hold
/// (single value, list/set element, or arity group element).
pub fn run_validators_erased<T: 'static>(
    owner: &str,
    stored: &StoredValue,
    element_validators: &[(String, Arc<dyn ErasedElementValidator>)],
    collection_validators: &[(String, Arc<dyn ErasedCollectionValidator>)],
    errors: &mut Vec<ParseError>,
) {
    if let Some(value) = stored.as_single::<T>() {
        for (template, validator) in element_validators {
            if !validator.check(value) {
                errors.push(templated_failure(owner, template));
            }
        }
        return;
    }

    if let Some(list) = stored.as_list::<T>() {
        for value in list {
            for (template, validator) in element_validators {
                if !validator.check(value) {
                    errors.push(templated_failure(owner, template));
                }
            }
        }
        for (template, validator) in collection_validators {
            if !validator.check(list) {
                errors.push(templated_failure(owner, template));
            }
        }
        return;
    }

    if let Some(groups) = stored.as_group_list::<T>() {
        for group in groups {
            for value in group {
                for (template, validator) in element_validators {
                    if !validator.check(value) {
                        errors.push(templated_failure(owner, template));
                    }
                }
            }
            for (template, validator) in collection_validators {
                if !validator.check(group) {
                    errors.push(templated_failure(owner, template));
                }
            }
        }
    }
}

/// Passes the validator's message template through untouched (spec §4.8:
/// "the core passes the untranslated message template to the error
/// aggregator"). `{option}`, `{value}`, and `{count}` stay as literal
/// placeholders for the Renderer collaborator to substitute — it has the
/// styled value/count context this layer's type-erased validators don't.
fn templated_failure(owner: &str, template: &str) -> ParseError {
    ParseError::ValidatorFailed { option: owner.to_string(), message: template.to_string() }
}
