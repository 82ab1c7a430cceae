//! A small file-transfer CLI ("ferry") exercising the public `argos` API:
//! domains, typed options, environment fallback, a negatable flag, a
//! positional tail, and a value-predicate conditional.
//!
//! Run it with e.g.:
//!   cargo run -p argos-demo -- push --dest backup.example.com --mode fast --token abc a.txt b.txt
//!   cargo run -p argos-demo -- pull --dest backup.example.com

use std::path::PathBuf;

use argos::{domain, flag, option, positional_list, ArgsBuilder, ParserConfig};

fn build() -> Result<argos::Args, argos::ConfigError> {
    let cfg = ParserConfig::new("ferry")
        .with_aggregate_errors(true, 10)
        .with_did_you_mean(true, 2)
        .with_argument_file_prefix(Some('@'));
    let mut builder = ArgsBuilder::new(cfg);

    builder.register_domain(domain("push").label("Push files to a remote").build())?;
    builder.register_domain(domain("pull").label("Pull files from a remote").build())?;

    builder.register(
        option::<String>("dest")
            .switches(["--dest", "-d"])
            .required()
            .build(),
    )?;
    builder.register(
        option::<String>("token")
            .switch("--token")
            .env("FERRY_TOKEN")
            .hidden()
            .build(),
    )?;
    builder.register(
        option::<String>("mode")
            .switch("--mode")
            .one_of(["fast", "safe"])
            .default("safe".to_string())
            .build(),
    )?;
    builder.register(
        flag("verbose")
            .switches(["--verbose", "-v"])
            .negatable("no-")
            .build(),
    )?;
    builder.register(positional_list::<PathBuf>("files").build())?;

    // "fast" mode skips the usual checksum pass, so it requires a token
    // even on a same-host push where `--token` would otherwise be optional.
    builder.require_if_value::<String>("token", "mode", |mode| mode == "fast")?;

    builder.build()
}

fn main() -> miette::Result<()> {
    let mut args = build().map_err(|e| miette::miette!("{e}"))?;

    let argv: Vec<String> = std::env::args().skip(1).collect();
    if let Err(err) = args.parse(&argv) {
        eprintln!("{}", err.render_capped(10));
        std::process::exit(1);
    }

    let domain = args.selected_domain().unwrap_or("(none)");
    let dest = args.get_single::<String>("dest");
    let mode = args.get_single::<String>("mode");
    let verbose = args.is_present("verbose");
    let files = args.get_list::<PathBuf>("files").map_or(&[][..], Vec::as_slice);

    println!("domain:  {domain}");
    println!("dest:    {}", dest.map_or("<unset>", String::as_str));
    println!("mode:    {}", mode.map_or("<unset>", String::as_str));
    println!("verbose: {verbose}");
    println!("files:   {files:?}");

    Ok(())
}
