#![no_main]

use argos::argfile::expand_argument_files;
use argos::platform::Platform;
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

/// Serves `contents` for every path read, so the fuzzer drives
/// `tokenize_file_contents`'s whitespace/comment splitting directly rather
/// than needing real files on disk.
struct FixedFilePlatform {
    contents: String,
}

impl Platform for FixedFilePlatform {
    fn getenv(&self, _name: &str) -> Option<String> {
        None
    }
    fn term_width(&self) -> usize {
        80
    }
    fn supports_ansi(&self) -> bool {
        false
    }
    fn eprint(&self, _s: &str) {}
    fn eprintln(&self, _s: &str) {}
    fn flush(&self) {}
    fn eflush(&self) {}
    fn read_password(&self) -> Option<Vec<char>> {
        None
    }
    fn read_line(&self) -> Option<String> {
        None
    }
    fn read_file(&self, _path: &str) -> Option<String> {
        Some(self.contents.clone())
    }
    fn exit(&self, _code: i32) -> ! {
        std::process::exit(0)
    }
}

#[derive(Arbitrary, Debug)]
struct Input {
    argv: Vec<String>,
    file_contents: String,
}

fuzz_target!(|input: Input| {
    // Argument-file expansion must never panic on arbitrary file contents
    // (comment/blank-line filtering, whitespace splitting) or argv shapes
    // (spec §4.2: expansion is not recursive, so nesting depth is bounded by
    // construction, not by anything this function checks at runtime).
    let platform = FixedFilePlatform { contents: input.file_contents };
    let _ = expand_argument_files(&input.argv, Some('@'), &platform);
});
