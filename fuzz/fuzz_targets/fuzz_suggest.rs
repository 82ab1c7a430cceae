#![no_main]

use argos::suggest::{suggestion_bound, LevenshteinSuggester, Suggester};
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

#[derive(Arbitrary, Debug)]
struct Input {
    unknown: String,
    candidates: Vec<String>,
    max_distance: u8,
}

fuzz_target!(|input: Input| {
    // Levenshtein distance and the suggestion bound must never panic,
    // regardless of string length or Unicode content (spec §4.4's "did you
    // mean" lookup runs on every unrecognized switch, including adversarial
    // ones).
    let max_distance = input.max_distance as usize;
    let _ = LevenshteinSuggester.suggest(&input.unknown, &input.candidates, max_distance);
    let _ = suggestion_bound(&input.unknown, max_distance);
});
