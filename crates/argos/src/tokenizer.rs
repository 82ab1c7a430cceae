//! The tokenizer / matcher main loop (spec §4.4) — the central component
//! the rest of the pipeline builds on.
//!
//! [`classify`](crate::classify::classify) only decides a token's *shape*;
//! everything about resolution order (exact switch, attached long, attached
//! short, cluster, unknown) and about consuming following argv tokens as
//! values lives here, in [`Matcher`]. This mirrors the teacher's split
//! between a cheap classification pass and a stateful main-loop consumer
//! (`crates/procenv/src/loader.rs`'s `load()` before the transform).

use std::collections::HashMap;

use crate::classify::{self, TokenShape};
use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::source::PresenceTracker;
use crate::spec::{OptionSpec, Registry, ValueKind};
use crate::suggest::{suggestion_bound, Suggester};
use crate::value::{Raw, StoredValue, ValueSource};

/// Everything the tokenizer produced for one parse, before environment
/// fallback / default application / validation / constraint solving run.
pub struct MatchOutcome {
    pub values: HashMap<String, StoredValue>,
    pub presence: PresenceTracker,
    pub selected_domain: Option<String>,
    pub eager_triggered: bool,
    pub eager_owner: Option<String>,
    pub errors: Vec<ParseError>,
}

/// Runs the main parse loop over `argv` (already argument-file-expanded).
pub fn tokenize(
    argv: &[String],
    registry: &Registry,
    cfg: &ParserConfig,
    suggester: &dyn Suggester,
) -> MatchOutcome {
    let mut m = Matcher {
        argv,
        registry,
        cfg,
        suggester,
        i: 0,
        after_double_dash: false,
        values: HashMap::new(),
        presence: PresenceTracker::new(),
        positional_queue: Vec::new(),
        eager_triggered: false,
        eager_owner: None,
        selected_domain: None,
        errors: Vec::new(),
    };
    m.run();
    MatchOutcome {
        values: m.values,
        presence: m.presence,
        selected_domain: m.selected_domain,
        eager_triggered: m.eager_triggered,
        eager_owner: m.eager_owner,
        errors: m.errors,
    }
}

struct Matcher<'a> {
    argv: &'a [String],
    registry: &'a Registry,
    cfg: &'a ParserConfig,
    suggester: &'a dyn Suggester,
    i: usize,
    after_double_dash: bool,
    values: HashMap<String, StoredValue>,
    presence: PresenceTracker,
    positional_queue: Vec<(String, usize)>,
    eager_triggered: bool,
    eager_owner: Option<String>,
    selected_domain: Option<String>,
    errors: Vec<ParseError>,
}

impl<'a> Matcher<'a> {
    fn run(&mut self) {
        while self.i < self.argv.len() {
            if self.eager_triggered {
                break;
            }
            let idx = self.i;
            let token = self.argv[idx].clone();

            if self.after_double_dash {
                self.handle_bare(&token, idx);
                self.i += 1;
                continue;
            }
            if token == "--" {
                self.after_double_dash = true;
                self.i += 1;
                continue;
            }

            match classify::classify(&token, self.cfg, self.registry) {
                TokenShape::DoubleDash => {
                    self.after_double_dash = true;
                    self.i += 1;
                }
                TokenShape::NegativeNumber | TokenShape::Bare => {
                    self.handle_bare(&token, idx);
                    self.i += 1;
                }
                TokenShape::Option => self.handle_option_token(&token, idx),
            }
        }

        self.resolve_domain_requirement();

        // Positional assignment runs once, after the whole token stream
        // (including anything spliced from argument files) has been walked.
        self.assign_positionals();
    }

    /// When at least one concrete domain is declared, selecting one is
    /// mandatory (spec §7 "A domain is required / unknown domain at
    /// position"). If the first queued bare token didn't resolve to a
    /// domain id/alias in [`Self::handle_bare`], it was a bad attempt at
    /// one, reported as [`ParseError::UnknownDomain`]; with no bare tokens
    /// at all, nothing was even attempted, reported as
    /// [`ParseError::DomainRequired`]. Skipped after an eager short-circuit,
    /// same as every other post-scan check.
    fn resolve_domain_requirement(&mut self) {
        if self.eager_triggered || self.selected_domain.is_some() {
            return;
        }
        if !self.registry.domains.iter().any(|d| !d.is_fragment) {
            return;
        }
        if self.positional_queue.is_empty() {
            self.errors.push(ParseError::DomainRequired);
        } else {
            let (token, _) = self.positional_queue.remove(0);
            self.errors.push(ParseError::UnknownDomain(token));
        }
    }

    fn looks_like_option(&self, token: &str) -> bool {
        matches!(classify::classify(token, self.cfg, self.registry), TokenShape::Option)
    }

    fn handle_bare(&mut self, token: &str, idx: usize) {
        if self.selected_domain.is_none() && !self.registry.domains.is_empty() && self.registry.domain(token).is_some()
        {
            self.selected_domain = Some(self.registry.domain(token).unwrap().id.clone());
            return;
        }
        self.positional_queue.push((token.to_string(), idx));
    }

    fn handle_option_token(&mut self, token: &str, idx: usize) {
        if let Some(owner) = self.registry.owner_for_switch(token) {
            let owner = owner.to_string();
            self.match_exact(&owner, token, idx);
            return;
        }

        // A token shaped like the (longer) long-option prefix is never
        // reconsidered as a short-attached or cluster token — otherwise a
        // typo'd long option (`--mdoe`) would be misread as a cluster of
        // single-character short options sharing the same prefix char.
        let long_shaped = token.starts_with(&self.cfg.long_prefix)
            && self.cfg.long_prefix.chars().count() > self.cfg.short_prefix.chars().count();

        if let Some((switch, value)) = classify::split_long_attached(token, self.cfg)
            && let Some(owner) = self.registry.owner_for_switch(&switch)
        {
            let owner = owner.to_string();
            self.match_attached(&owner, &switch, value, idx);
            return;
        }

        if long_shaped {
            self.unknown_option(token, idx);
            return;
        }

        if let Some((switch, value)) = classify::split_short_attached(token, self.cfg)
            && let Some(owner) = self.registry.owner_for_switch(&switch)
        {
            let owner = owner.to_string();
            self.match_attached(&owner, &switch, value, idx);
            return;
        }

        if let Some(body) = classify::is_cluster_candidate(token, self.cfg) {
            let body = body.to_string();
            if self.match_cluster(&body, idx) {
                return;
            }
        }

        self.unknown_option(token, idx);
    }

    fn match_exact(&mut self, owner: &str, token: &str, idx: usize) {
        let spec = self.registry.option(owner).expect("owner_for_switch points at a registered option");
        let negated = is_negation_form(token, spec);

        if spec.is_arity_group() && spec.requires_value {
            self.consume_arity_group(owner, idx, negated);
        } else if spec.requires_value {
            self.consume_mandatory_value(owner, idx, negated, token);
        } else {
            self.consume_optional_lookahead(owner, idx, negated);
        }
    }

    fn match_attached(&mut self, owner: &str, switch: &str, value: String, idx: usize) {
        let spec = self.registry.option(owner).expect("owner_for_switch points at a registered option");
        if spec.is_arity_group() {
            self.errors.push(ParseError::AttachedArityMismatch(owner.to_string()));
            self.i += 1;
            return;
        }
        let negated = is_negation_form(switch, spec);
        self.presence.record(owner, idx);
        let raw = Raw::present_with(value, idx, negated);
        self.accumulate(owner, &raw, ValueSource::User);
        self.i += 1;
    }

    fn consume_arity_group(&mut self, owner: &str, idx: usize, negated: bool) {
        let spec = self.registry.option(owner).expect("registered");
        let arity = spec.arity;
        let mut raws = Vec::with_capacity(arity);
        let mut cursor = idx + 1;
        for _ in 0..arity {
            match self.argv.get(cursor) {
                Some(text) if !self.looks_like_option(text) => {
                    raws.push(Raw::present_with(text.clone(), cursor, negated));
                    cursor += 1;
                }
                _ => {
                    self.errors.push(ParseError::MissingValueAt { option: owner.to_string(), position: cursor });
                    self.i = cursor;
                    return;
                }
            }
        }
        self.presence.record(owner, idx);
        let existing = self.values.remove(owner);
        let kind = spec.value_kind;
        match spec.converter.accumulate_group(owner, existing, &raws, ValueSource::User, kind) {
            Ok(Some(stored)) => {
                self.values.insert(owner.to_string(), stored);
            }
            Ok(None) => {}
            Err(e) => self.errors.push(e),
        }
        self.i = cursor;
    }

    fn consume_mandatory_value(&mut self, owner: &str, idx: usize, negated: bool, _token: &str) {
        match self.argv.get(idx + 1) {
            Some(text) if !self.looks_like_option(text) => {
                self.presence.record(owner, idx);
                let raw = Raw::present_with(text.clone(), idx + 1, negated);
                self.accumulate(owner, &raw, ValueSource::User);
                self.i = idx + 2;
            }
            _ => {
                self.errors.push(ParseError::MissingValue { option: owner.to_string() });
                self.i = idx + 1;
            }
        }
    }

    fn consume_optional_lookahead(&mut self, owner: &str, idx: usize, negated: bool) {
        let spec = self.registry.option(owner).expect("registered");
        let next = self.argv.get(idx + 1).cloned();

        let consumable = match &next {
            Some(text) if !self.looks_like_option(text) => {
                if spec.boolean_flag {
                    crate::value::parse_bool_literal(text).is_some()
                } else {
                    spec.converter.probe(text) == crate::value::Probe::Definite
                }
            }
            _ => false,
        };

        self.presence.record(owner, idx);
        if consumable {
            let text = next.unwrap();
            let raw = Raw::present_with(text, idx + 1, negated);
            self.accumulate(owner, &raw, ValueSource::User);
            self.i = idx + 2;
        } else {
            let raw = Raw::flag(idx, negated);
            self.accumulate(owner, &raw, ValueSource::User);
            self.i = idx + 1;
        }
    }

    fn match_cluster(&mut self, body: &str, idx: usize) -> bool {
        let chars: Vec<char> = body.chars().collect();
        let last = chars.len() - 1;

        // Validate every intermediate character before committing any
        // mutation, so an unknown-cluster fallback can still replay the
        // whole token as bare.
        for &ch in &chars[..last] {
            let switch = format!("{}{}", self.cfg.short_prefix, ch);
            match self.registry.owner_for_switch(&switch) {
                None => {
                    if self.cfg.unknown_options_as_positionals {
                        self.handle_bare(&format!("{}{}", self.cfg.cluster_char.unwrap(), body), idx);
                        self.i += 1;
                        return true;
                    }
                    self.errors.push(ParseError::ClusterUnknownOption { cluster: body.to_string(), ch });
                    self.i += 1;
                    return true;
                }
                Some(owner) => {
                    let spec = self.registry.option(owner).expect("registered");
                    if spec.requires_value {
                        self.errors.push(ParseError::ClusterValueNotLast { cluster: body.to_string(), ch });
                        self.i += 1;
                        return true;
                    }
                }
            }
        }

        let last_ch = chars[last];
        let last_switch = format!("{}{}", self.cfg.short_prefix, last_ch);
        let Some(owner) = self.registry.owner_for_switch(&last_switch) else {
            if self.cfg.unknown_options_as_positionals {
                self.handle_bare(&format!("{}{}", self.cfg.cluster_char.unwrap(), body), idx);
                self.i += 1;
                return true;
            }
            self.errors.push(ParseError::ClusterUnknownOption { cluster: body.to_string(), ch: last_ch });
            self.i += 1;
            return true;
        };
        let owner = owner.to_string();

        for &ch in &chars[..last] {
            let switch = format!("{}{}", self.cfg.short_prefix, ch);
            let flag_owner = self.registry.owner_for_switch(&switch).unwrap().to_string();
            self.presence.record(&flag_owner, idx);
            let raw = Raw::flag(idx, false);
            self.accumulate(&flag_owner, &raw, ValueSource::User);
        }

        let spec = self.registry.option(&owner).expect("registered");
        if !spec.requires_value {
            self.presence.record(&owner, idx);
            let raw = Raw::flag(idx, false);
            self.accumulate(&owner, &raw, ValueSource::User);
            self.i += 1;
            return true;
        }

        let body_byte_offset: usize = chars[..last].iter().map(|c| c.len_utf8()).sum();
        let remainder = &body[body_byte_offset + last_ch.len_utf8()..];
        self.presence.record(&owner, idx);
        if !remainder.is_empty() {
            let raw = Raw::present_with(remainder.to_string(), idx, false);
            self.accumulate(&owner, &raw, ValueSource::User);
            self.i += 1;
        } else {
            match self.argv.get(idx + 1) {
                Some(text) if !self.looks_like_option(text) => {
                    let raw = Raw::present_with(text.clone(), idx + 1, false);
                    self.accumulate(&owner, &raw, ValueSource::User);
                    self.i = idx + 2;
                }
                _ => {
                    self.errors.push(ParseError::MissingValue { option: owner.clone() });
                    self.i = idx + 1;
                }
            }
        }
        true
    }

    fn unknown_option(&mut self, token: &str, idx: usize) {
        if self.cfg.unknown_options_as_positionals {
            self.handle_bare(token, idx);
            self.i += 1;
            return;
        }

        let suggestion = if self.cfg.did_you_mean {
            let candidates = self.registry.all_switches();
            let bound = suggestion_bound(token, self.cfg.did_you_mean_max);
            self.suggester.suggest(token, &candidates, bound)
        } else {
            None
        };
        self.errors.push(ParseError::UnknownOption { token: token.to_string(), suggestion });
        self.i += 1;
    }

    fn accumulate(&mut self, owner: &str, raw: &Raw, source: ValueSource) {
        let spec = self.registry.option(owner).expect("registered");
        let existing = self.values.remove(owner);
        let kind = spec.value_kind;
        match spec.converter.accumulate_single(owner, existing, raw, source, kind) {
            Ok(Some(stored)) => {
                let triggers_eager = spec.eager && spec.boolean_flag && spec.converter.is_truthy(&stored);
                self.values.insert(owner.to_string(), stored);
                if triggers_eager {
                    self.eager_triggered = true;
                    self.eager_owner = Some(owner.to_string());
                }
            }
            Ok(None) => {}
            Err(e) => self.errors.push(e),
        }
    }

    /// Assigns queued bare tokens to Single positional slots in declaration
    /// order, then the remainder to the trailing repeatable positional, if
    /// any (spec §4.4 "Positional assignment after options").
    fn assign_positionals(&mut self) {
        if self.positional_queue.is_empty() {
            return;
        }

        let mut positionals: Vec<&OptionSpec> = self
            .registry
            .options
            .iter()
            .filter(|o| o.is_positional())
            .filter(|o| domain_admits(o, &self.selected_domain))
            .collect();
        positionals.sort_by_key(|o| o.positional_seq.unwrap_or(usize::MAX));

        let repeatable_owner = positionals
            .iter()
            .find(|o| matches!(o.positional_kind, crate::spec::PositionalKind::List | crate::spec::PositionalKind::Set))
            .map(|o| o.owner.clone());

        let singles: Vec<&OptionSpec> = positionals
            .iter()
            .filter(|o| matches!(o.positional_kind, crate::spec::PositionalKind::Single))
            .copied()
            .collect();

        let queue = std::mem::take(&mut self.positional_queue);
        let mut it = queue.into_iter();

        for spec in singles {
            match it.next() {
                Some((text, pos)) => {
                    let raw = Raw::present_with(text, pos, false);
                    self.presence.record(&spec.owner, pos);
                    self.accumulate(&spec.owner, &raw, ValueSource::User);
                }
                None => continue,
            }
        }

        let remaining: Vec<(String, usize)> = it.collect();
        if remaining.is_empty() {
            return;
        }

        match repeatable_owner {
            Some(owner) => {
                for (text, pos) in remaining {
                    let raw = Raw::present_with(text, pos, false);
                    self.presence.record(&owner, pos);
                    self.accumulate(&owner, &raw, ValueSource::User);
                }
            }
            None => {
                let tokens: Vec<String> = remaining.into_iter().map(|(t, _)| t).collect();
                if tokens.len() == 1 {
                    self.errors.push(ParseError::UnexpectedPositional(tokens.into_iter().next().unwrap()));
                } else {
                    self.errors.push(ParseError::UnexpectedPositionals(tokens));
                }
            }
        }
    }
}

fn domain_admits(spec: &OptionSpec, selected: &Option<String>) -> bool {
    match (&spec.declared_domains, selected) {
        (None, _) => true,
        (Some(domains), Some(selected)) => domains.iter().any(|d| d == selected),
        (Some(_), None) => false,
    }
}

/// True iff `token` is the synthesized negation alias of one of `spec`'s
/// long switches (spec §3 `negationPrefix`).
fn is_negation_form(token: &str, spec: &OptionSpec) -> bool {
    let Some(prefix) = &spec.negation_prefix else { return false };
    spec.switches.iter().any(|switch| {
        switch
            .strip_prefix("--")
            .map(|stripped| token == format!("--{prefix}{stripped}"))
            .unwrap_or(false)
    })
}
