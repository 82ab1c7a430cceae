//! Argos: a declarative, type-safe command-line argument parser core.
//!
//! The crate is organized as a pipeline, each stage its own module:
//! argument-file expansion ([`argfile`]) → token classification
//! ([`classify`]) → the tokenizer/matcher main loop ([`tokenizer`]) →
//! environment fallback ([`env_fallback`]) → default application
//! ([`defaults`]) → validator run ([`validate`]) → constraint solving
//! ([`constraints`]). [`spec`] and [`value`] hold the shared data model the
//! pipeline stages read and write; [`builder`] and [`parser`] are the public
//! surface assembled on top of it.
//!
//! This crate renders nothing: usage text, colorized diagnostics, and
//! localization are an out-of-process Renderer/Translator's job, fed by
//! [`parser::Args::snapshot`]. The crate also never owns a terminal directly
//! — all OS-bound effects go through [`platform::Platform`].

pub mod argfile;
pub mod builder;
pub mod classify;
pub mod config;
pub mod constraints;
pub mod defaults;
pub mod env_fallback;
pub mod error;
pub mod parser;
pub mod platform;
pub mod source;
pub mod spec;
pub mod suggest;
pub mod tokenizer;
pub mod validate;
pub mod value;

pub use builder::{
    domain, flag, fragment, list, option, positional, positional_list, set, ArgValue,
    ArgsBuilder, BuiltOption, CollectionBuilder, DomainBuilder, FlagBuilder, OptionBuilder,
    PositionalBuilder,
};
pub use config::ParserConfig;
pub use error::{ConfigError, ParseError};
pub use parser::{
    Args, ConditionalSnapshot, ConflictsSnapshot, ConstraintsSnapshot, DomainSnapshot,
    GroupSnapshot, OptionSnapshot, PositionalSnapshot, SettingsSnapshot, Snapshot,
};
pub use platform::{Platform, StdPlatform};
pub use spec::{ConditionalKind, DomainSpec, GroupKind, OptionSpec, PositionalKind, ValueKind};
pub use suggest::{LevenshteinSuggester, Suggester};
pub use value::ValueSource;
