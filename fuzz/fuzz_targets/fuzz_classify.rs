#![no_main]

use argos::classify::{classify, is_cluster_candidate, split_long_attached, split_short_attached};
use argos::config::ParserConfig;
use argos::spec::Registry;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|token: String| {
    // The classifier only inspects a token's leading characters against the
    // configured prefixes/separators; it must never panic regardless of
    // Unicode content, empty strings, or prefix-only tokens.
    let cfg = ParserConfig::default();
    let registry = Registry::new();
    let _ = classify(&token, &cfg, &registry);
    let _ = split_long_attached(&token, &cfg);
    let _ = split_short_attached(&token, &cfg);
    let _ = is_cluster_candidate(&token, &cfg);
});
