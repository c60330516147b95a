//! Installer component identifiers derived from library filenames.
//!
//! WiX identifiers must match `[A-Za-z_][A-Za-z0-9_.]*`. Library names such
//! as `libstdc++-6.dll` do not, so each name is rewritten: the `.dll`
//! extension is dropped, hyphens become underscores, plus signs vanish, and
//! anything else outside the grammar becomes an underscore.

use crate::closure::{DependencyClosure, DependencyRecord};
use crate::error::{PackagerError, Result};
use std::collections::HashMap;
use std::fmt;

/// Extension removed from library names before sanitizing.
pub const LIBRARY_EXTENSION: &str = ".dll";

/// A syntactically valid installer component identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(String);

impl ComponentId {
    /// Get the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ComponentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ComponentId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Derive the component identifier for a library filename.
///
/// # Examples
///
/// ```
/// use relpack::identifier::sanitize;
///
/// assert_eq!(sanitize("foo-bar.dll").as_str(), "foo_bar");
/// assert_eq!(sanitize("c++runtime.dll").as_str(), "cruntime");
/// ```
#[must_use]
pub fn sanitize(library_file_name: &str) -> ComponentId {
    let stem = strip_library_extension(library_file_name);

    let mut id: String = stem
        .chars()
        .filter(|&c| c != '+')
        .map(|c| match c {
            '-' => '_',
            c if c.is_ascii_alphanumeric() || c == '_' || c == '.' => c,
            _ => '_',
        })
        .collect();

    if !id.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        id.insert(0, '_');
    }

    ComponentId(id)
}

fn strip_library_extension(name: &str) -> &str {
    let split = name.len().saturating_sub(LIBRARY_EXTENSION.len());
    match (name.get(..split), name.get(split..)) {
        (Some(stem), Some(ext)) if ext.eq_ignore_ascii_case(LIBRARY_EXTENSION) => stem,
        _ => name,
    }
}

/// Assign an identifier to every closure member, in closure order.
///
/// # Errors
///
/// Returns [`PackagerError::IdentifierCollision`] when two libraries map to
/// the same identifier.
pub fn assign_identifiers(
    closure: &DependencyClosure,
) -> Result<Vec<(ComponentId, &DependencyRecord)>> {
    let mut claimed: HashMap<ComponentId, &str> = HashMap::with_capacity(closure.len());
    let mut assigned = Vec::with_capacity(closure.len());

    for record in closure {
        let id = sanitize(record.library_file_name());
        if let Some(first) = claimed.get(&id) {
            return Err(PackagerError::IdentifierCollision {
                identifier: id,
                first: (*first).to_owned(),
                second: record.library_file_name().to_owned(),
            });
        }
        claimed.insert(id.clone(), record.library_file_name());
        assigned.push((id, record));
    }

    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::hyphen("foo-bar.dll", "foo_bar")]
    #[case::plus("c++runtime.dll", "cruntime")]
    #[case::gcc("libgcc_s_dw2-1.dll", "libgcc_s_dw2_1")]
    #[case::stdcxx("libstdc++-6.dll", "libstdc_6")]
    #[case::upper_extension("ZLIB1.DLL", "ZLIB1")]
    #[case::inner_dots("libgtk-3.0.dll", "libgtk_3.0")]
    #[case::leading_digit("7z.dll", "_7z")]
    #[case::other_illegal("lib@x.dll", "lib_x")]
    #[case::no_extension("libfoo", "libfoo")]
    fn sanitize_cases(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(sanitize(name).as_str(), expected);
    }

    #[test]
    fn output_matches_identifier_grammar() {
        for name in ["a-b+c.dll", "9lives.dll", "x y.dll", "ünï.dll", ".dll"] {
            let id = sanitize(name);
            let mut chars = id.as_str().chars();
            let first = chars.next().expect("identifier is non-empty");
            assert!(first.is_ascii_alphabetic() || first == '_', "{id}");
            assert!(
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
                "{id}"
            );
        }
    }

    fn closure_of(names: &[&str]) -> DependencyClosure {
        names
            .iter()
            .map(|n| DependencyRecord::new(format!("C:/msys64/mingw32/bin/{n}"), *n))
            .collect()
    }

    #[test]
    fn distinct_identifiers_are_assigned_in_closure_order() {
        let closure = closure_of(&["libz.dll", "foo-bar.dll"]);
        let assigned = assign_identifiers(&closure).expect("no collision");
        let ids: Vec<_> = assigned.iter().map(|(id, _)| id.as_str()).collect();
        assert_eq!(ids, vec!["foo_bar", "libz"]);
    }

    #[test]
    fn collision_is_detected() {
        let closure = closure_of(&["a-b.dll", "a_b.dll"]);
        let err = assign_identifiers(&closure).expect_err("collision expected");
        match err {
            PackagerError::IdentifierCollision {
                identifier,
                first,
                second,
            } => {
                assert_eq!(identifier.as_str(), "a_b");
                assert_eq!(first, "a-b.dll");
                assert_eq!(second, "a_b.dll");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
