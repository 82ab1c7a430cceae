//! Parser-wide configuration (spec §6 "Recognized configuration options").
//!
//! Built fluently, the same way the teacher's `ConfigLoader` is built
//! fluently (`with_env()`, `with_dotenv()`, ...; `crates/procenv/src/
//! loader.rs` before the transform) — here `with_cluster_char`,
//! `with_arg_file_prefix`, and so on.

#[derive(Clone, Debug)]
pub struct ParserConfig {
    pub app_name: String,
    pub app_description: Option<String>,
    pub unknown_options_as_positionals: bool,
    pub long_prefix: String,
    pub short_prefix: String,
    pub cluster_char: Option<char>,
    pub value_separators: Vec<char>,
    pub negation_prefix: String,
    pub did_you_mean: bool,
    pub did_you_mean_max: usize,
    pub aggregate_errors: bool,
    pub max_aggregated_errors: usize,
    pub argument_file_prefix: Option<char>,
    pub argument_separator: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            app_name: env!("CARGO_PKG_NAME").to_string(),
            app_description: None,
            unknown_options_as_positionals: false,
            long_prefix: "--".to_string(),
            short_prefix: "-".to_string(),
            cluster_char: Some('-'),
            value_separators: vec!['=', ':'],
            negation_prefix: "no-".to_string(),
            did_you_mean: true,
            did_you_mean_max: 3,
            aggregate_errors: true,
            max_aggregated_errors: 10,
            argument_file_prefix: Some('@'),
            argument_separator: ", ".to_string(),
        }
    }
}

impl ParserConfig {
    pub fn new(app_name: impl Into<String>) -> Self {
        ParserConfig { app_name: app_name.into(), ..ParserConfig::default() }
    }

    #[must_use]
    pub fn with_app_description(mut self, description: impl Into<String>) -> Self {
        self.app_description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_unknown_options_as_positionals(mut self, enabled: bool) -> Self {
        self.unknown_options_as_positionals = enabled;
        self
    }

    #[must_use]
    pub fn with_long_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.long_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn with_cluster_char(mut self, ch: Option<char>) -> Self {
        self.cluster_char = ch;
        self
    }

    #[must_use]
    pub fn with_value_separators(mut self, separators: Vec<char>) -> Self {
        self.value_separators = separators;
        self
    }

    #[must_use]
    pub fn with_did_you_mean(mut self, enabled: bool, max_distance: usize) -> Self {
        self.did_you_mean = enabled;
        self.did_you_mean_max = max_distance;
        self
    }

    #[must_use]
    pub fn with_aggregate_errors(mut self, enabled: bool, max: usize) -> Self {
        self.aggregate_errors = enabled;
        self.max_aggregated_errors = max;
        self
    }

    #[must_use]
    pub fn with_argument_file_prefix(mut self, prefix: Option<char>) -> Self {
        self.argument_file_prefix = prefix;
        self
    }

    #[must_use]
    pub fn with_argument_separator(mut self, separator: impl Into<String>) -> Self {
        self.argument_separator = separator.into();
        self
    }
}
