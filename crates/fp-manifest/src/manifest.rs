//! The package manifest model.
//!
//! A [`Manifest`] maps canonical metadata type names to ordered,
//! deduplicated member lists. It can be merged from other manifests, raw
//! type→members maps (as returned by `listMetadata`), or disk paths, and it
//! serializes deterministically: identical logical content always produces
//! byte-identical `package.xml` output, regardless of merge order.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use forcepack_client::xml;

use crate::error::{Error, ErrorKind, Result};
use crate::path::{archive_entries, parse_path, ArtifactDescriptor};
use crate::registry;

/// XML namespace of the `package.xml` format.
pub const PACKAGE_XMLNS: &str = "http://soap.sforce.com/2006/04/metadata";

/// A package manifest: canonical type name → sorted member names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    types: BTreeMap<String, Vec<String>>,
    deletion: bool,
    api_version: String,
    source_dir: Option<PathBuf>,
}

impl Manifest {
    /// Create an empty manifest for the given API version.
    pub fn new(api_version: impl Into<String>) -> Self {
        Self {
            api_version: api_version.into(),
            ..Self::default()
        }
    }

    /// Create an empty deletion manifest (`destructiveChanges.xml`).
    ///
    /// Deletion manifests omit folder members when absorbing paths: a
    /// deletion of `email/Alerts/Welcome.email` must not delete the
    /// `Alerts` folder itself.
    pub fn deletion(api_version: impl Into<String>) -> Self {
        Self {
            deletion: true,
            ..Self::new(api_version)
        }
    }

    /// Record the source tree this manifest describes.
    pub fn with_source_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source_dir = Some(dir.into());
        self
    }

    pub fn is_deletion(&self) -> bool {
        self.deletion
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn source_dir(&self) -> Option<&Path> {
        self.source_dir.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.types.values().all(|members| members.is_empty())
    }

    /// Iterate types and their members in serialization order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.types
            .iter()
            .map(|(name, members)| (name.as_str(), members.as_slice()))
    }

    /// Members recorded for one type.
    pub fn members(&self, type_name: &str) -> Option<&[String]> {
        self.types.get(type_name).map(Vec::as_slice)
    }

    /// Append members for a canonical type name, re-sorting and
    /// deduplicating the affected key.
    pub fn add_members<I, S>(&mut self, type_name: impl Into<String>, members: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = self.types.entry(type_name.into()).or_default();
        list.extend(members.into_iter().map(Into::into));
        list.sort();
        list.dedup();
    }

    /// Merge another manifest into this one.
    ///
    /// Idempotent and commutative on content: the resulting member sets do
    /// not depend on merge order or repetition.
    pub fn add(&mut self, other: &Manifest) {
        for (type_name, members) in other.entries() {
            self.add_members(type_name, members.iter().cloned());
        }
    }

    /// Merge a raw type→members map, e.g. a `listMetadata` result.
    pub fn add_map(&mut self, map: &BTreeMap<String, Vec<String>>) {
        for (type_name, members) in map {
            self.add_members(type_name.clone(), members.iter().cloned());
        }
    }

    /// Absorb disk paths, resolving each to its canonical type and member.
    ///
    /// Folder-grouped artifacts contribute their folder as an additional
    /// member, unless this is a deletion manifest.
    pub fn add_from_paths<'a, I>(&mut self, paths: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for path in paths {
            let descriptor = parse_path(path)?;
            let ty = registry::by_dir_name(&descriptor.type_dir)
                .ok_or_else(|| Error::new(ErrorKind::UnknownType(descriptor.type_dir.clone())))?;

            let mut members = Vec::new();
            match &descriptor.folder {
                Some(folder) => {
                    if !self.deletion {
                        members.push(folder.clone());
                    }
                    members.push(format!("{folder}/{}", descriptor.name));
                }
                None => members.push(descriptor.name.clone()),
            }
            self.add_members(ty.api_name, members);
        }
        Ok(())
    }

    /// Parse the `package.xml` format.
    pub fn from_package_xml(content: &str) -> Result<Self> {
        let version = xml::extract_tag(content, "version").ok_or_else(|| {
            Error::new(ErrorKind::Parse("missing <version> element".to_string()))
        })?;

        let mut manifest = Manifest::new(version);
        for block in xml::extract_blocks(content, "types") {
            let name = xml::extract_tag(block, "name").ok_or_else(|| {
                Error::new(ErrorKind::Parse(
                    "<types> block without a <name> element".to_string(),
                ))
            })?;
            manifest.add_members(name, xml::extract_all_tags(block, "members"));
        }
        Ok(manifest)
    }

    /// Read and parse a manifest file.
    pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_package_xml(&content)
    }

    /// The `<types>`/`<version>` fragment shared by `package.xml` and the
    /// retrieve request body. Types ascend lexically, members ascend within
    /// each type, version comes last.
    pub fn types_xml(&self) -> String {
        let mut parts = Vec::new();
        for (name, members) in self.entries() {
            if members.is_empty() {
                continue;
            }
            let members_xml: String = members
                .iter()
                .map(|member| format!("<members>{}</members>", xml::escape(member)))
                .collect();
            parts.push(format!(
                "<types><name>{}</name>{}</types>",
                xml::escape(name),
                members_xml
            ));
        }
        parts.push(format!(
            "<version>{}</version>",
            xml::escape(&self.api_version)
        ));
        parts.concat()
    }

    /// Serialize to the full `package.xml` document.
    ///
    /// Output is deterministic for identical logical content, so generated
    /// manifests are diff-stable across runs.
    pub fn to_package_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        out.push_str(&format!("<Package xmlns=\"{PACKAGE_XMLNS}\">\n"));
        for (name, members) in self.entries() {
            if members.is_empty() {
                continue;
            }
            out.push_str("    <types>\n");
            out.push_str(&format!("        <name>{}</name>\n", xml::escape(name)));
            for member in members {
                out.push_str(&format!(
                    "        <members>{}</members>\n",
                    xml::escape(member)
                ));
            }
            out.push_str("    </types>\n");
        }
        out.push_str(&format!(
            "    <version>{}</version>\n",
            xml::escape(&self.api_version)
        ));
        out.push_str("</Package>\n");
        out
    }

    /// Write the `package.xml` document to disk.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path, self.to_package_xml())?;
        Ok(())
    }

    /// Expand every member into the concrete archive entries backing it.
    ///
    /// Subcomponent members have no file representation and contribute
    /// nothing; a folder-grouped member without a `/` names a folder and
    /// contributes only the folder-level meta entry. The result is sorted
    /// and deduplicated.
    pub fn archive_file_list(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        for (type_name, members) in self.entries() {
            let ty = registry::by_api_name(type_name)
                .ok_or_else(|| Error::new(ErrorKind::UnknownType(type_name.to_string())))?;
            if ty.subcomponent {
                continue;
            }
            let dir = ty
                .dir_name
                .ok_or_else(|| Error::new(ErrorKind::UnknownType(type_name.to_string())))?;

            for member in members {
                let (folder, name) = match member.split_once('/') {
                    Some((folder, name)) => (Some(folder.to_string()), name.to_string()),
                    None if ty.in_folder => {
                        // The member names a folder itself.
                        files.push(format!("{dir}/{member}-meta.xml"));
                        continue;
                    }
                    None => (None, member.clone()),
                };
                let descriptor = ArtifactDescriptor {
                    type_dir: dir.to_string(),
                    folder,
                    name,
                    extension: ty.suffix.map(|s| format!(".{s}")).unwrap_or_default(),
                };
                files.extend(archive_entries(&descriptor)?);
            }
        }
        files.sort();
        files.dedup();
        Ok(files)
    }
}
