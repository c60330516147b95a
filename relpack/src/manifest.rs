//! WiX include-file generation for staged runtime libraries.
//!
//! The manifest is an `<Include>` fragment that the package definition pulls
//! into its component group. It is regenerated from scratch on every run:
//!
//! ```xml
//! <!-- Generated by relpack; manual edits will be lost on the next run -->
//! <Include>
//!     <File Id='libgcc_s_dw2_1' Name='libgcc_s_dw2-1.dll' DiskId='1' Source='out/libgcc_s_dw2-1.dll' />
//! </Include>
//! ```

use crate::closure::DependencyClosure;
use crate::error::{PackagerError, Result};
use crate::identifier::{ComponentId, assign_identifiers};
use camino::Utf8Path;
use std::fmt::Write as _;

/// First line of every generated manifest.
pub const GENERATED_COMMENT: &str =
    "<!-- Generated by relpack; manual edits will be lost on the next run -->";

/// Values shared by every manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestSettings {
    /// Media identifier for the package's single source disk.
    pub disk_id: String,
    /// Directory, relative to the package definition, holding staged files.
    pub staging_dir_name: String,
}

impl Default for ManifestSettings {
    fn default() -> Self {
        Self {
            disk_id: "1".to_owned(),
            staging_dir_name: "out".to_owned(),
        }
    }
}

/// One `<File>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Sanitized component identifier.
    pub id: ComponentId,
    /// Library base filename.
    pub name: String,
    /// Source location relative to the package definition.
    pub source: String,
}

/// The full include file, ready to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    disk_id: String,
    entries: Vec<ManifestEntry>,
}

impl Manifest {
    /// Build the manifest for `closure`, one entry per library.
    ///
    /// # Errors
    ///
    /// Returns [`PackagerError::IdentifierCollision`] when two libraries share
    /// a sanitized identifier.
    pub fn from_closure(closure: &DependencyClosure, settings: &ManifestSettings) -> Result<Self> {
        let entries = assign_identifiers(closure)?
            .into_iter()
            .map(|(id, record)| ManifestEntry {
                id,
                name: record.library_file_name().to_owned(),
                source: format!(
                    "{}/{}",
                    settings.staging_dir_name,
                    record.library_file_name()
                ),
            })
            .collect();

        Ok(Self {
            disk_id: settings.disk_id.clone(),
            entries,
        })
    }

    /// Entries in emission order.
    #[must_use]
    pub fn entries(&self) -> &[ManifestEntry] {
        &self.entries
    }

    /// Render the include file text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(GENERATED_COMMENT);
        out.push('\n');
        out.push_str("<Include>\n");
        for entry in &self.entries {
            // Writing to a String cannot fail.
            let _ = writeln!(
                out,
                "    <File Id='{}' Name='{}' DiskId='{}' Source='{}' />",
                escape_attr(entry.id.as_str()),
                escape_attr(&entry.name),
                escape_attr(&self.disk_id),
                escape_attr(&entry.source),
            );
        }
        out.push_str("</Include>\n");
        out
    }
}

/// Escape a value for a single-quoted XML attribute.
fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&apos;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Build the manifest for `closure` and write it to `path`, replacing any
/// previous file.
///
/// Identifier validation happens before the file is touched, so a collision
/// leaves the previous manifest in place.
///
/// # Errors
///
/// Returns [`PackagerError::IdentifierCollision`] or
/// [`PackagerError::ManifestWrite`].
pub fn emit(
    closure: &DependencyClosure,
    path: &Utf8Path,
    settings: &ManifestSettings,
) -> Result<Manifest> {
    let manifest = Manifest::from_closure(closure, settings)?;

    std::fs::write(path, manifest.render()).map_err(|source| PackagerError::ManifestWrite {
        path: path.to_owned(),
        source,
    })?;
    log::info!("wrote {} with {} entries", path, manifest.entries().len());

    Ok(manifest)
}
