//! User-facing progress and summary text.

use camino::Utf8Path;
use std::fmt::Display;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort progress output; ignore write failures.
    }
}

/// Format the message printed after the runtime libraries are staged.
#[must_use]
pub fn staged_message(library_count: usize, staging_dir: &Utf8Path) -> String {
    let plural = if library_count == 1 {
        "library"
    } else {
        "libraries"
    };
    format!("Staged {library_count} runtime {plural} to {staging_dir}")
}

/// Format the message printed after the package is linked.
#[must_use]
pub fn success_message(package: &Utf8Path) -> String {
    format!("Successfully built {package}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::single(1, "Staged 1 runtime library to out")]
    #[case::several(3, "Staged 3 runtime libraries to out")]
    #[case::none(0, "Staged 0 runtime libraries to out")]
    fn staged_message_pluralises(#[case] count: usize, #[case] expected: &str) {
        assert_eq!(staged_message(count, Utf8Path::new("out")), expected);
    }

    #[test]
    fn success_message_names_package() {
        assert!(success_message(Utf8Path::new("app.msi")).contains("app.msi"));
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "Building...");
        assert_eq!(buffer, b"Building...\n");
    }
}
