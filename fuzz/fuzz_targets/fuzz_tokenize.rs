#![no_main]

use argos::builder::{flag, list, option, positional, positional_list, ArgsBuilder};
use argos::config::ParserConfig;
use argos::suggest::LevenshteinSuggester;
use argos::tokenizer::tokenize;
use libfuzzer_sys::fuzz_target;

/// A representative registry covering every resolution path the matcher's
/// main loop walks (exact switch, attached value, cluster, arity group,
/// positionals, negation) so the fuzzer has live targets to hit.
fn build_args() -> argos::Args {
    let mut b = ArgsBuilder::new(ParserConfig::new("fuzz"));
    b.register(option::<String>("name").switches(["--name", "-n"]).build()).unwrap();
    b.register(option::<i64>("tries").switches(["--tries", "-t"]).build()).unwrap();
    b.register(flag("verbose").switches(["--verbose", "-v"]).negatable("no-").build()).unwrap();
    b.register(option::<i64>("range").switch("--range").arity(2).build()).unwrap();
    b.register(list::<String>("tag").switch("--tag").build()).unwrap();
    b.register(positional::<String>("file").build()).unwrap();
    b.register(positional_list::<i64>("extras").build()).unwrap();
    b.build().unwrap()
}

fuzz_target!(|tokens: Vec<String>| {
    // Tokenizing arbitrary argv must never panic, regardless of how
    // malformed the input is (spec §4.4's main loop has no unchecked
    // assumption about token shape beyond what `classify` already decided).
    let args = build_args();
    let outcome = tokenize(&tokens, args.registry(), args.config(), &LevenshteinSuggester);
    let _ = outcome.errors.len();
    let _ = outcome.selected_domain;
});
