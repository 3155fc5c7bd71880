//! Disk path ↔ artifact identity translation.
//!
//! One direction parses a path from a source tree (or a server-reported
//! file list) into an [`ArtifactDescriptor`]; the other expands a
//! descriptor into the complete set of archive entries a deployment needs.
//! The expansion matters: the server requires every logical artifact to be
//! backed by its `-meta.xml` companions, and a missing companion produces a
//! silently incomplete deployment rather than an error.

use crate::error::{Error, ErrorKind, Result};
use crate::registry;

/// Path segments recognized as source roots; anything up to and including
/// the first match is stripped before parsing.
pub const SOURCE_ROOTS: &[&str] = &["src", "unpackaged"];

/// The identity of one artifact as derived from a disk path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDescriptor {
    /// Disk folder name of the type, e.g. `classes`.
    pub type_dir: String,
    /// Containing folder, for folder-grouped types only.
    pub folder: Option<String>,
    /// Artifact base name. Never empty.
    pub name: String,
    /// File extension including the leading dot, e.g. `.cls`. Empty for
    /// free-form types and folder-level entries.
    pub extension: String,
}

/// Parse a relative path into an artifact descriptor.
///
/// Handles source-root prefixes, `-meta.xml` companions, folder grouping,
/// and the `:` for `.` substitution the server applies in deletion lists.
///
/// # Example
///
/// ```rust
/// use forcepack_manifest::parse_path;
///
/// let desc = parse_path("src/email/Alerts/Welcome.email-meta.xml").unwrap();
/// assert_eq!(desc.type_dir, "email");
/// assert_eq!(desc.folder.as_deref(), Some("Alerts"));
/// assert_eq!(desc.name, "Welcome");
/// assert_eq!(desc.extension, ".email");
/// ```
pub fn parse_path(path: &str) -> Result<ArtifactDescriptor> {
    // Server lists and diff output sometimes carry CR/LF artifacts.
    let cleaned = path.trim().trim_end_matches('\r');

    let mut segments: Vec<&str> = cleaned.split('/').filter(|s| !s.is_empty()).collect();
    if let Some(pos) = segments.iter().position(|s| SOURCE_ROOTS.contains(s)) {
        segments.drain(..=pos);
    }

    let type_dir = *segments
        .first()
        .ok_or_else(|| Error::new(ErrorKind::MalformedPath(path.to_string())))?;
    let ty = registry::by_dir_name(type_dir)
        .ok_or_else(|| Error::new(ErrorKind::UnknownType(type_dir.to_string())))?;

    if segments.len() < 2 {
        return Err(Error::new(ErrorKind::MissingName(path.to_string())));
    }

    let folder = (ty.in_folder && segments.len() >= 3).then(|| segments[1].to_string());
    let leaf = segments[segments.len() - 1];

    let (name, extension) = match ty.suffix {
        // Free-form types keep their own extension as part of the member
        // name. Deletion lists report `a:b` where the member is `a.b`.
        None => {
            let base = leaf.strip_suffix("-meta.xml").unwrap_or(leaf);
            (base.replace(':', "."), String::new())
        }
        Some(suffix) => {
            let dotted = format!(".{suffix}");
            let trimmed = leaf.strip_suffix("-meta.xml").unwrap_or(leaf);
            match trimmed.strip_suffix(dotted.as_str()) {
                Some(base) => (base.to_string(), dotted),
                // A bare `<name>-meta.xml` names a folder, not a file.
                None if leaf.ends_with("-meta.xml") => (trimmed.to_string(), String::new()),
                None => return Err(Error::new(ErrorKind::MissingName(path.to_string()))),
            }
        }
    };

    if name.is_empty() {
        return Err(Error::new(ErrorKind::MissingName(path.to_string())));
    }

    Ok(ArtifactDescriptor {
        type_dir: type_dir.to_string(),
        folder,
        name,
        extension,
    })
}

/// Expand a descriptor into every archive entry needed to deploy it.
///
/// For types with a `-meta.xml` companion both the primary file and the
/// companion are emitted; for folder-grouped artifacts the folder's own
/// `-meta.xml` is emitted as well. A descriptor that names a folder itself
/// expands to just the folder-level meta entry.
pub fn archive_entries(descriptor: &ArtifactDescriptor) -> Result<Vec<String>> {
    let ty = registry::by_dir_name(&descriptor.type_dir)
        .ok_or_else(|| Error::new(ErrorKind::UnknownType(descriptor.type_dir.clone())))?;
    let dir = &descriptor.type_dir;

    // Folder entry: only the folder-level meta file exists on disk.
    if ty.in_folder && descriptor.folder.is_none() && descriptor.extension.is_empty() {
        return Ok(vec![format!("{dir}/{}-meta.xml", descriptor.name)]);
    }

    let primary = match &descriptor.folder {
        Some(folder) => format!("{dir}/{folder}/{}{}", descriptor.name, descriptor.extension),
        None => format!("{dir}/{}{}", descriptor.name, descriptor.extension),
    };

    let mut entries = vec![primary.clone()];
    if ty.has_meta_file {
        entries.push(format!("{primary}-meta.xml"));
    }
    if let Some(folder) = &descriptor.folder {
        entries.push(format!("{dir}/{folder}-meta.xml"));
    }
    Ok(entries)
}
