//! The spec registry (spec §3 data model, §4.1 component).
//!
//! Holds the frozen declaration: options (including positionals), domains,
//! and constraint rules. Registration order determines declaration order
//! (positional sequence, invariant 4). The registry freezes at the start of
//! the first parse; any later mutation is a [`ConfigError::MutationAfterFreeze`].
//!
//! This plays the role the teacher's field-classification machinery
//! (`procenv_macro::field`) played before the transform, minus the derive
//! macro: per Design Notes §9 ("Property delegation → explicit binder
//! call"), registration here is an explicit `Registry::register_option`
//! call rather than generated from struct-field attributes.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::ConfigError;
use crate::value::ErasedConverter;
use crate::validate::{ErasedCollectionValidator, ErasedElementValidator};

/// The shape of an option's accumulated value (spec §3 `valueKind`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueKind {
    Single,
    List,
    Set,
}

/// Whether (and how) an option also serves as a positional (spec §3
/// `positionalKind`).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum PositionalKind {
    None,
    Single,
    List,
    Set,
}

/// Configuration for the interactive-prompt flow of spec §4.9 item 3.
#[derive(Clone, Debug)]
pub struct InputConfig {
    pub prompt: String,
    pub hidden_echo: bool,
    pub confirm: bool,
    pub mismatch_message: String,
    pub max_retries: u32,
}

/// One declared option (or positional) — spec §3 `OptionSpec`.
pub struct OptionSpec {
    pub owner: String,
    pub switches: Vec<String>,
    pub base_switch: String,
    pub value_kind: ValueKind,
    pub arity: usize,
    pub boolean_flag: bool,
    pub negation_prefix: Option<String>,
    pub requires_value: bool,
    pub repeatable: bool,
    pub positional_kind: PositionalKind,
    pub positional_seq: Option<usize>,
    pub env_var: Option<String>,
    pub expected_desc: String,
    pub eager: bool,
    pub hidden: bool,
    pub default_value: Option<String>,
    pub declared_domains: Option<Vec<String>>,
    pub converter: Arc<dyn ErasedConverter>,
    pub element_validators: Vec<(String, Arc<dyn ErasedElementValidator>)>,
    pub collection_validators: Vec<(String, Arc<dyn ErasedCollectionValidator>)>,
    pub input_config: Option<InputConfig>,
    pub help: Option<String>,
}

impl OptionSpec {
    pub fn is_positional(&self) -> bool {
        self.positional_kind != PositionalKind::None
    }

    /// A declared `arity > 1` invocation, per spec §3 invariant 9.
    pub fn is_arity_group(&self) -> bool {
        self.arity > 1
    }
}

/// One declared domain/fragment — spec §3 `DomainSpec`.
#[derive(Clone, Debug)]
pub struct DomainSpec {
    pub id: String,
    pub label: Option<String>,
    pub description: Option<String>,
    pub aliases: Vec<String>,
    pub is_fragment: bool,
    pub inherits: Vec<String>,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ConditionalKind {
    AnyPresent,
    AllPresent,
    AnyAbsent,
    AllAbsent,
    ValuePredicate,
    AllowOnlyIfValuePredicate,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum GroupKind {
    ExactlyOne,
    AtMostOne,
    AtLeastOne,
}

pub struct RequiredMinRule {
    pub owner: String,
    pub min: usize,
    pub scope: Option<Vec<String>>,
}

pub struct ConditionalRule {
    pub target: String,
    pub kind: ConditionalKind,
    pub refs: Vec<String>,
    pub predicate_ref: Option<String>,
    pub predicate: Option<Arc<dyn Fn(&dyn std::any::Any) -> bool + Send + Sync>>,
    pub scope: Option<Vec<String>>,
}

pub struct GroupRule {
    pub kind: GroupKind,
    pub owners: Vec<String>,
    pub scope: Option<Vec<String>>,
}

pub struct ConflictsRule {
    pub owners: Vec<String>,
    pub scope: Option<Vec<String>>,
}

/// The canonical structural identity of a rule — kind + normalized owner
/// set + normalized scope — used to reject duplicate registrations
/// (spec §3 `RuleKey`, invariant 5).
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct RuleKey {
    pub kind: &'static str,
    pub owners: Vec<String>,
    pub scope: Vec<String>,
}

impl RuleKey {
    pub fn new(kind: &'static str, owners: &[String], scope: Option<&[String]>) -> Self {
        let mut owners: Vec<String> = owners.to_vec();
        owners.sort();
        let mut scope: Vec<String> = scope.map(<[String]>::to_vec).unwrap_or_default();
        scope.sort();
        RuleKey { kind, owners, scope }
    }
}

impl std::fmt::Display for RuleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind, self.owners.join(","))?;
        if !self.scope.is_empty() {
            write!(f, "@[{}]", self.scope.join(","))?;
        }
        Ok(())
    }
}

/// The frozen declaration: options, domains, rules, and the derived
/// switch→owner lookup table.
#[derive(Default)]
pub struct Registry {
    pub options: Vec<OptionSpec>,
    pub domains: Vec<DomainSpec>,
    pub required_min: Vec<RequiredMinRule>,
    pub conditionals: Vec<ConditionalRule>,
    pub groups: Vec<GroupRule>,
    pub conflicts: Vec<ConflictsRule>,
    switch_owners: HashMap<String, String>,
    owner_index: HashMap<String, usize>,
    rule_keys: HashSet<RuleKey>,
    frozen: bool,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    fn guard_mutable(&self) -> Result<(), ConfigError> {
        if self.frozen {
            Err(ConfigError::MutationAfterFreeze)
        } else {
            Ok(())
        }
    }

    fn validate_prefix(token: &str) -> Result<(), ConfigError> {
        if token == "--" {
            return Err(ConfigError::ReservedDoubleDashSwitch);
        }
        let prefix_len = token.chars().take_while(|c| !c.is_alphanumeric()).count();
        if prefix_len == 0 || prefix_len > 2 || prefix_len >= token.chars().count() {
            return Err(ConfigError::InvalidPrefix(token.to_string()));
        }
        Ok(())
    }

    /// Registers one option (spec §4.1 `registerOption`). Rejects invalid
    /// input with a [`ConfigError`]; never aggregated.
    pub fn register_option(&mut self, spec: OptionSpec) -> Result<(), ConfigError> {
        self.guard_mutable()?;

        if spec.arity > 1 {
            if !spec.requires_value {
                return Err(ConfigError::ArityRequiresMandatoryValue(spec.owner.clone()));
            }
            if spec.env_var.is_some() {
                return Err(ConfigError::ArityIncompatibleWithEnv(spec.owner.clone()));
            }
            if spec.switches.iter().any(|s| is_clusterable_short(s)) {
                return Err(ConfigError::ArityOptionClustered(spec.owner.clone()));
            }
        }

        if spec.negation_prefix.is_some() && !spec.boolean_flag {
            return Err(ConfigError::NegationOnNonBoolean(spec.owner.clone()));
        }

        for switch in &spec.switches {
            Self::validate_prefix(switch)?;
            if self.switch_owners.contains_key(switch) {
                return Err(ConfigError::DuplicateSwitch(switch.clone()));
            }
        }

        if let Some(prefix) = &spec.negation_prefix {
            for switch in &spec.switches {
                if let Some(stripped) = switch.strip_prefix("--") {
                    let negated = format!("--{prefix}{stripped}");
                    if self.switch_owners.contains_key(&negated) {
                        return Err(ConfigError::DuplicateSwitch(negated));
                    }
                }
            }
        }

        if spec.is_positional() {
            if matches!(spec.positional_kind, PositionalKind::List | PositionalKind::Set) {
                let already_repeatable = self.options.iter().any(|o| {
                    o.is_positional()
                        && matches!(o.positional_kind, PositionalKind::List | PositionalKind::Set)
                });
                if already_repeatable {
                    return Err(ConfigError::MultipleRepeatablePositionals);
                }
            }
        }

        let index = self.options.len();
        for switch in &spec.switches {
            self.switch_owners.insert(switch.clone(), spec.owner.clone());
        }
        if let Some(prefix) = &spec.negation_prefix {
            for switch in &spec.switches {
                if let Some(stripped) = switch.strip_prefix("--") {
                    self.switch_owners
                        .insert(format!("--{prefix}{stripped}"), spec.owner.clone());
                }
            }
        }
        self.owner_index.insert(spec.owner.clone(), index);
        self.options.push(spec);
        Ok(())
    }

    /// Registers a domain or fragment (spec §4.1 `registerDomainBuilder`).
    pub fn register_domain(&mut self, domain: DomainSpec) -> Result<(), ConfigError> {
        self.guard_mutable()?;

        if domain.is_fragment
            && (domain.label.is_some() || domain.description.is_some() || !domain.aliases.is_empty())
        {
            return Err(ConfigError::FragmentHasSurfaceMetadata(domain.id.clone()));
        }

        if self.domains.iter().any(|d| d.id == domain.id) {
            return Err(ConfigError::DuplicateDomainId(domain.id.clone()));
        }
        for alias in &domain.aliases {
            let collides = self
                .domains
                .iter()
                .any(|d| d.id == *alias || d.aliases.contains(alias));
            if collides {
                return Err(ConfigError::DomainAliasCollision(alias.clone()));
            }
        }

        self.domains.push(domain);
        Ok(())
    }

    pub fn add_required_min(
        &mut self,
        owner: impl Into<String>,
        min: usize,
        scope: Option<Vec<String>>,
    ) -> Result<(), ConfigError> {
        self.guard_mutable()?;
        let owner = owner.into();
        if min < 1 {
            return Err(ConfigError::AtLeastMinBelowOne(owner));
        }
        let key = RuleKey::new("required_min", std::slice::from_ref(&owner), scope.as_deref());
        if !self.rule_keys.insert(key.clone()) {
            return Err(ConfigError::DuplicateRule(key.to_string()));
        }
        self.required_min.push(RequiredMinRule { owner, min, scope });
        Ok(())
    }

    pub fn add_conditional(&mut self, rule: ConditionalRule) -> Result<(), ConfigError> {
        self.guard_mutable()?;
        if rule.refs.iter().any(|r| *r == rule.target) {
            return Err(ConfigError::ConditionalSelfReference(rule.target.clone()));
        }
        let mut owners = rule.refs.clone();
        owners.push(rule.target.clone());
        let key = RuleKey::new("conditional", &owners, rule.scope.as_deref());
        if !self.rule_keys.insert(key.clone()) {
            return Err(ConfigError::DuplicateRule(key.to_string()));
        }
        self.conditionals.push(rule);
        Ok(())
    }

    pub fn add_group(&mut self, rule: GroupRule) -> Result<(), ConfigError> {
        self.guard_mutable()?;
        let key = RuleKey::new("group", &rule.owners, rule.scope.as_deref());
        if !self.rule_keys.insert(key.clone()) {
            return Err(ConfigError::DuplicateRule(key.to_string()));
        }
        self.groups.push(rule);
        Ok(())
    }

    pub fn add_conflicts(&mut self, rule: ConflictsRule) -> Result<(), ConfigError> {
        self.guard_mutable()?;
        let key = RuleKey::new("conflicts", &rule.owners, rule.scope.as_deref());
        if !self.rule_keys.insert(key.clone()) {
            return Err(ConfigError::DuplicateRule(key.to_string()));
        }
        self.conflicts.push(rule);
        Ok(())
    }

    /// Owner registered for `switch`, if any.
    pub fn owner_for_switch(&self, switch: &str) -> Option<&str> {
        self.switch_owners.get(switch).map(String::as_str)
    }

    /// Every registered switch (including synthesized negation aliases),
    /// for the "did you mean" suggester's candidate list.
    pub fn all_switches(&self) -> Vec<String> {
        self.switch_owners.keys().cloned().collect()
    }

    pub fn option(&self, owner: &str) -> Option<&OptionSpec> {
        self.owner_index.get(owner).map(|&i| &self.options[i])
    }

    pub fn domain(&self, id: &str) -> Option<&DomainSpec> {
        self.domains.iter().find(|d| !d.is_fragment && (d.id == id || d.aliases.iter().any(|a| a == id)))
    }

    /// Concrete (non-fragment) domains that transitively inherit `fragment_or_domain_id`
    /// (including itself, if it is already concrete) — used to expand a
    /// fragment name found in a rule/option scope into the set of domains
    /// it actually applies to (spec §4.1 "Domain resolution").
    fn concrete_inheritors(&self, id: &str) -> Vec<String> {
        if let Some(d) = self.domains.iter().find(|d| d.id == id) {
            if !d.is_fragment {
                return vec![d.id.clone()];
            }
        } else {
            return vec![id.to_string()];
        }

        let mut out = Vec::new();
        for d in &self.domains {
            if d.is_fragment {
                continue;
            }
            if Self::inherits_transitively(&self.domains, d, id) {
                out.push(d.id.clone());
            }
        }
        out
    }

    fn inherits_transitively(domains: &[DomainSpec], domain: &DomainSpec, target: &str) -> bool {
        let mut stack: Vec<&str> = domain.inherits.iter().map(String::as_str).collect();
        let mut seen = HashSet::new();
        while let Some(name) = stack.pop() {
            if name == target {
                return true;
            }
            if !seen.insert(name) {
                continue;
            }
            if let Some(parent) = domains.iter().find(|d| d.id == name) {
                stack.extend(parent.inherits.iter().map(String::as_str));
            }
        }
        false
    }

    fn expand_scope(&self, scope: &[String]) -> Vec<String> {
        let mut out: Vec<String> = scope.iter().flat_map(|s| self.concrete_inheritors(s)).collect();
        out.sort();
        out.dedup();
        out
    }

    /// Freezes the registry: validates cross-cutting invariants (repeatable
    /// positional ordering, inherited-domain existence) and expands any
    /// fragment reference found in a rule's or option's scope into the set
    /// of concrete domains that inherit it (spec §4.1 "Domain resolution").
    /// Idempotent: a second call is a no-op, preserving invariant 6.
    pub fn freeze(&mut self) -> Result<(), ConfigError> {
        if self.frozen {
            return Ok(());
        }

        for d in &self.domains {
            for parent in &d.inherits {
                if !self.domains.iter().any(|p| p.id == *parent) {
                    return Err(ConfigError::InheritedDomainNotFound(parent.clone()));
                }
            }
        }

        let mut repeatable_positions: Vec<usize> = self
            .options
            .iter()
            .filter(|o| matches!(o.positional_kind, PositionalKind::List | PositionalKind::Set))
            .filter_map(|o| o.positional_seq)
            .collect();
        repeatable_positions.sort_unstable();

        let max_positional_seq = self
            .options
            .iter()
            .filter(|o| o.is_positional())
            .filter_map(|o| o.positional_seq)
            .max();

        if let (Some(&last_repeatable), Some(max_seq)) =
            (repeatable_positions.last(), max_positional_seq)
            && last_repeatable != max_seq
        {
            let owner = self
                .options
                .iter()
                .find(|o| o.positional_seq == Some(last_repeatable))
                .map(|o| o.owner.clone())
                .unwrap_or_default();
            return Err(ConfigError::RepeatableNotLast(owner));
        }

        for opt in &mut self.options {
            if let Some(domains) = opt.declared_domains.take() {
                opt.declared_domains = Some(Self::expand_scope_static(&self.domains, &domains));
            }
        }
        for rule in &mut self.required_min {
            if let Some(scope) = rule.scope.take() {
                rule.scope = Some(Self::expand_scope_static(&self.domains, &scope));
            }
        }
        for rule in &mut self.conditionals {
            if let Some(scope) = rule.scope.take() {
                rule.scope = Some(Self::expand_scope_static(&self.domains, &scope));
            }
        }
        for rule in &mut self.groups {
            if let Some(scope) = rule.scope.take() {
                rule.scope = Some(Self::expand_scope_static(&self.domains, &scope));
            }
        }
        for rule in &mut self.conflicts {
            if let Some(scope) = rule.scope.take() {
                rule.scope = Some(Self::expand_scope_static(&self.domains, &scope));
            }
        }

        self.frozen = true;
        Ok(())
    }

    // `expand_scope` borrows `&self.domains` immutably while `freeze` needs
    // `&mut self.options`/`&mut self.required_min` etc. simultaneously; this
    // free-function variant takes the slice directly to sidestep the borrow.
    fn expand_scope_static(domains: &[DomainSpec], scope: &[String]) -> Vec<String> {
        let registry_view = Registry {
            domains: domains.to_vec(),
            ..Registry::default()
        };
        registry_view.expand_scope(scope)
    }
}

fn is_clusterable_short(switch: &str) -> bool {
    switch.starts_with('-') && !switch.starts_with("--") && switch.chars().count() == 2
}
