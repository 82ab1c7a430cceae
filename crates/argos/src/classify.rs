//! The token classifier (spec §4.3).
//!
//! Classifies one argv token given the current prefix/separator/cluster
//! settings. The classifier only decides the *shape* of a token (double-dash,
//! negative number, bare, or option-like); the detailed resolution order for
//! option-like tokens (exact switch, attached long, attached short, cluster,
//! unknown) is spec'd as part of the matcher's main loop (§4.4) and lives in
//! [`crate::tokenizer`], which calls back into the split helpers here.

use crate::config::ParserConfig;
use crate::spec::Registry;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TokenShape {
    /// The literal `--` end-of-options marker.
    DoubleDash,
    /// `-` followed by a digit, where `-<digit>` is not a registered short
    /// switch: treated as a negative number and passed through as bare.
    NegativeNumber,
    /// Neither a recognized option prefix nor `--`.
    Bare,
    /// Begins with a registered prefix; detailed resolution happens in
    /// `crate::tokenizer`.
    Option,
}

pub fn classify(token: &str, cfg: &ParserConfig, registry: &Registry) -> TokenShape {
    if token == "--" {
        return TokenShape::DoubleDash;
    }

    if token.starts_with(&cfg.short_prefix) && token.len() > cfg.short_prefix.len() {
        let body = &token[cfg.short_prefix.len()..];
        if let Some(first) = body.chars().next()
            && first.is_ascii_digit()
        {
            let digit_switch = format!("{}{}", cfg.short_prefix, first);
            let is_multichar_number = body.chars().count() > 1
                && body.chars().skip(1).all(|c| c.is_ascii_digit() || c == '.');
            if registry.owner_for_switch(&digit_switch).is_none() || is_multichar_number {
                return TokenShape::NegativeNumber;
            }
        }
    }

    if token.starts_with(&cfg.long_prefix) && token.len() > cfg.long_prefix.len() {
        return TokenShape::Option;
    }
    if token.starts_with(&cfg.short_prefix) && token.len() > cfg.short_prefix.len() {
        return TokenShape::Option;
    }

    TokenShape::Bare
}

/// Splits `--name=value` / `--name:value` into `(switch, value)` on the
/// first configured separator character.
pub fn split_long_attached(token: &str, cfg: &ParserConfig) -> Option<(String, String)> {
    let rest = token.strip_prefix(&cfg.long_prefix)?;
    for &sep in &cfg.value_separators {
        if let Some(pos) = rest.find(sep) {
            let switch = format!("{}{}", cfg.long_prefix, &rest[..pos]);
            let value = rest[pos + sep.len_utf8()..].to_string();
            return Some((switch, value));
        }
    }
    None
}

/// Splits `-nvalue` / `-n=value` into `(switch, value)`. Only valid for
/// single-character short prefixes (spec §4.3).
pub fn split_short_attached(token: &str, cfg: &ParserConfig) -> Option<(String, String)> {
    if cfg.short_prefix.chars().count() != 1 {
        return None;
    }
    let rest = token.strip_prefix(&cfg.short_prefix)?;
    let mut chars = rest.chars();
    let ch = chars.next()?;
    let remainder: String = chars.collect();
    if remainder.is_empty() {
        return None;
    }
    let switch = format!("{}{}", cfg.short_prefix, ch);
    let value = if let Some(&sep) = cfg.value_separators.iter().find(|&&c| remainder.starts_with(c)) {
        remainder[sep.len_utf8()..].to_string()
    } else {
        remainder
    };
    Some((switch, value))
}

/// True if `token` is eligible to be treated as a cluster: it begins with
/// the configured cluster character and has a body of more than one
/// character (spec §4.3/§4.4). Membership validity is checked by the
/// matcher, not here.
pub fn is_cluster_candidate(token: &str, cfg: &ParserConfig) -> Option<&str> {
    let cluster_char = cfg.cluster_char?;
    let mut chars = token.chars();
    if chars.next()? != cluster_char {
        return None;
    }
    let body = &token[cluster_char.len_utf8()..];
    if body.chars().count() > 1 { Some(body) } else { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> ParserConfig {
        ParserConfig::default()
    }

    #[test]
    fn double_dash_is_classified() {
        let registry = Registry::new();
        assert_eq!(classify("--", &cfg(), &registry), TokenShape::DoubleDash);
    }

    #[test]
    fn negative_number_passes_through_when_digit_switch_unregistered() {
        let registry = Registry::new();
        assert_eq!(classify("-3", &cfg(), &registry), TokenShape::NegativeNumber);
    }

    #[test]
    fn long_option_is_classified_as_option() {
        let registry = Registry::new();
        assert_eq!(classify("--name", &cfg(), &registry), TokenShape::Option);
    }

    #[test]
    fn split_long_attached_splits_on_equals() {
        let (switch, value) = split_long_attached("--name=Alice", &cfg()).unwrap();
        assert_eq!(switch, "--name");
        assert_eq!(value, "Alice");
    }

    #[test]
    fn split_short_attached_handles_bare_concatenation() {
        let (switch, value) = split_short_attached("-t3", &cfg()).unwrap();
        assert_eq!(switch, "-t");
        assert_eq!(value, "3");
    }

    #[test]
    fn cluster_candidate_requires_body_longer_than_one() {
        assert!(is_cluster_candidate("-vt3", &cfg()).is_some());
        assert!(is_cluster_candidate("-v", &cfg()).is_none());
    }
}
