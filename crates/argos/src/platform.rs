//! The `Platform` interface (spec §6).
//!
//! All OS-bound primitives — environment variables, file reads, terminal
//! queries, interactive prompts, process exit — are pushed behind this
//! trait. The core never touches `std::env`/`std::io` directly outside of
//! [`StdPlatform`], the default implementation; test code and embedders
//! supply their own `Platform` to make parses hermetic (see
//! `crate::env_fallback`'s tests, which use `serial_test` specifically
//! because `StdPlatform::getenv` really does read the process environment).

use std::io::Write as _;

/// The narrow set of OS-bound operations the core needs. Everything else
/// (help/usage rendering, ANSI styling, translation) is a collaborator
/// living outside this crate per spec §1.
pub trait Platform: Send + Sync {
    fn getenv(&self, name: &str) -> Option<String>;
    fn term_width(&self) -> usize;
    fn supports_ansi(&self) -> bool;
    fn eprint(&self, s: &str);
    fn eprintln(&self, s: &str);
    fn flush(&self);
    fn eflush(&self);
    fn term_newline(&self) -> &'static str {
        "\n"
    }
    /// Reads a password with echo suppressed where the implementation is
    /// able to suppress it. Returns `None` on EOF.
    fn read_password(&self) -> Option<Vec<char>>;
    /// Returns `None` on EOF.
    fn read_line(&self) -> Option<String>;
    /// Returns `None` if the file does not exist or is not valid UTF-8.
    fn read_file(&self, path: &str) -> Option<String>;
    fn exit(&self, code: i32) -> !;
}

/// The default, OS-backed [`Platform`].
#[derive(Clone, Copy, Debug, Default)]
pub struct StdPlatform;

impl Platform for StdPlatform {
    fn getenv(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }

    fn term_width(&self) -> usize {
        std::env::var("COLUMNS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(80)
    }

    fn supports_ansi(&self) -> bool {
        std::env::var("NO_COLOR").is_err() && std::env::var("TERM").is_ok_and(|t| t != "dumb")
    }

    fn eprint(&self, s: &str) {
        eprint!("{s}");
    }

    fn eprintln(&self, s: &str) {
        eprintln!("{s}");
    }

    fn flush(&self) {
        let _ = std::io::stdout().flush();
    }

    fn eflush(&self) {
        let _ = std::io::stderr().flush();
    }

    fn read_password(&self) -> Option<Vec<char>> {
        // The default implementation has no terminal-raw-mode dependency
        // (Platform is an out-of-scope collaborator per spec §1); it falls
        // back to a visible read. Embedders wanting real echo suppression
        // supply their own `Platform`.
        self.read_line().map(|line| line.chars().collect())
    }

    fn read_line(&self) -> Option<String> {
        let mut buf = String::new();
        match std::io::stdin().read_line(&mut buf) {
            Ok(0) => None,
            Ok(_) => Some(buf.trim_end_matches(['\n', '\r']).to_string()),
            Err(_) => None,
        }
    }

    fn read_file(&self, path: &str) -> Option<String> {
        std::fs::read_to_string(path).ok()
    }

    fn exit(&self, code: i32) -> ! {
        std::process::exit(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn std_platform_reads_env() {
        // SAFETY: test-only, single-threaded within this test.
        unsafe { std::env::set_var("ARGOS_PLATFORM_TEST", "1") };
        assert_eq!(StdPlatform.getenv("ARGOS_PLATFORM_TEST").as_deref(), Some("1"));
        unsafe { std::env::remove_var("ARGOS_PLATFORM_TEST") };
    }

    #[test]
    fn unreadable_path_returns_none() {
        assert_eq!(StdPlatform.read_file("/no/such/path"), None);
    }
}
