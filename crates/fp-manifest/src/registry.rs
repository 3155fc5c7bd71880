//! Artifact type registry.
//!
//! Maps between the on-disk folder convention (`classes/`, `objects/`, ...)
//! and the canonical metadata type names the server speaks (`ApexClass`,
//! `CustomObject`, ...), and records the per-type packaging rules: file
//! suffix, whether a `-meta.xml` companion accompanies each file, and
//! whether artifacts are grouped into named folders.
//!
//! Folder names form a bijection with type names. Subcomponent types have
//! no folder of their own; they exist only nested inside a parent
//! artifact's file and therefore carry `dir_name: None`.

/// Registry entry for one metadata type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtifactType {
    /// Canonical API name, e.g. `ApexClass`.
    pub api_name: &'static str,
    /// Disk folder name, e.g. `classes`. `None` for subcomponents.
    pub dir_name: Option<&'static str>,
    /// File suffix without the dot, e.g. `cls`. `None` for free-form types
    /// (documents keep whatever extension the file has).
    pub suffix: Option<&'static str>,
    /// Whether each file is accompanied by a `<file>-meta.xml` companion.
    pub has_meta_file: bool,
    /// Whether artifacts are grouped into named folders (reports, email
    /// templates, ...).
    pub in_folder: bool,
    /// Whether the type has no standalone file and exists only inside a
    /// parent artifact.
    pub subcomponent: bool,
}

const fn file_type(
    api_name: &'static str,
    dir_name: &'static str,
    suffix: &'static str,
    has_meta_file: bool,
) -> ArtifactType {
    ArtifactType {
        api_name,
        dir_name: Some(dir_name),
        suffix: Some(suffix),
        has_meta_file,
        in_folder: false,
        subcomponent: false,
    }
}

const fn folder_type(
    api_name: &'static str,
    dir_name: &'static str,
    suffix: Option<&'static str>,
    has_meta_file: bool,
) -> ArtifactType {
    ArtifactType {
        api_name,
        dir_name: Some(dir_name),
        suffix,
        has_meta_file,
        in_folder: true,
        subcomponent: false,
    }
}

const fn subcomponent(api_name: &'static str) -> ArtifactType {
    ArtifactType {
        api_name,
        dir_name: None,
        suffix: None,
        has_meta_file: false,
        in_folder: false,
        subcomponent: true,
    }
}

/// The full type table.
pub static TYPES: &[ArtifactType] = &[
    file_type("CustomApplication", "applications", "app", false),
    file_type("ApexClass", "classes", "cls", true),
    file_type("ApexComponent", "components", "component", true),
    folder_type("Dashboard", "dashboards", Some("dashboard"), false),
    file_type("DataCategoryGroup", "datacategorygroups", "datacategorygroup", false),
    folder_type("Document", "documents", None, true),
    folder_type("EmailTemplate", "email", Some("email"), true),
    file_type("Flow", "flows", "flow", false),
    file_type("Group", "groups", "group", false),
    file_type("HomePageComponent", "homePageComponents", "homePageComponent", false),
    file_type("HomePageLayout", "homePageLayouts", "homePageLayout", false),
    file_type("CustomLabels", "labels", "labels", false),
    file_type("Layout", "layouts", "layout", false),
    file_type("Letterhead", "letterhead", "letter", false),
    file_type("CustomObject", "objects", "object", false),
    file_type("CustomObjectTranslation", "objectTranslations", "objectTranslation", false),
    file_type("ApexPage", "pages", "page", true),
    file_type("PermissionSet", "permissionsets", "permissionset", false),
    file_type("Profile", "profiles", "profile", false),
    file_type("Queue", "queues", "queue", false),
    file_type("QuickAction", "quickActions", "quickAction", false),
    file_type("RemoteSiteSetting", "remoteSiteSettings", "remoteSite", false),
    folder_type("Report", "reports", Some("report"), false),
    file_type("ReportType", "reportTypes", "reportType", false),
    file_type("Role", "roles", "role", false),
    file_type("Settings", "settings", "settings", false),
    file_type("SharingRules", "sharingRules", "sharingRules", false),
    file_type("StaticResource", "staticresources", "resource", true),
    file_type("CustomTab", "tabs", "tab", false),
    file_type("ApexTrigger", "triggers", "trigger", true),
    file_type("Translations", "translations", "translation", false),
    file_type("CustomPageWebLink", "weblinks", "weblink", false),
    file_type("Workflow", "workflows", "workflow", false),
    // Subcomponents: addressable in manifests and deletion lists, but
    // nested inside their parent's file on disk.
    subcomponent("BusinessProcess"),
    subcomponent("CompactLayout"),
    subcomponent("CustomField"),
    subcomponent("CustomLabel"),
    subcomponent("FieldSet"),
    subcomponent("ListView"),
    subcomponent("RecordType"),
    subcomponent("SharingReason"),
    subcomponent("ValidationRule"),
    subcomponent("WebLink"),
    subcomponent("WorkflowAlert"),
    subcomponent("WorkflowFieldUpdate"),
    subcomponent("WorkflowOutboundMessage"),
    subcomponent("WorkflowRule"),
    subcomponent("WorkflowTask"),
];

/// Look up a type by its disk folder name.
#[must_use]
pub fn by_dir_name(dir: &str) -> Option<&'static ArtifactType> {
    TYPES.iter().find(|t| t.dir_name == Some(dir))
}

/// Look up a type by its canonical API name.
#[must_use]
pub fn by_api_name(name: &str) -> Option<&'static ArtifactType> {
    TYPES.iter().find(|t| t.api_name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_lookup_both_directions() {
        let classes = by_dir_name("classes").unwrap();
        assert_eq!(classes.api_name, "ApexClass");
        assert_eq!(classes.suffix, Some("cls"));
        assert!(classes.has_meta_file);

        let apex = by_api_name("ApexClass").unwrap();
        assert_eq!(apex.dir_name, Some("classes"));
    }

    #[test]
    fn test_unknown_names_return_none() {
        assert!(by_dir_name("widgets").is_none());
        assert!(by_api_name("CustomWidget").is_none());
    }

    #[test]
    fn test_dir_names_are_a_bijection() {
        let mut dirs = HashSet::new();
        let mut apis = HashSet::new();
        for ty in TYPES {
            assert!(apis.insert(ty.api_name), "duplicate api name {}", ty.api_name);
            if let Some(dir) = ty.dir_name {
                assert!(dirs.insert(dir), "duplicate dir name {dir}");
            }
        }
    }

    #[test]
    fn test_folder_types() {
        for dir in ["email", "documents", "reports", "dashboards"] {
            assert!(by_dir_name(dir).unwrap().in_folder, "{dir} should be in_folder");
        }
        assert!(!by_dir_name("classes").unwrap().in_folder);
    }

    #[test]
    fn test_subcomponents_have_no_dir() {
        let field = by_api_name("CustomField").unwrap();
        assert!(field.subcomponent);
        assert_eq!(field.dir_name, None);
        assert_eq!(field.suffix, None);
    }

    #[test]
    fn test_documents_are_free_form() {
        let documents = by_dir_name("documents").unwrap();
        assert_eq!(documents.suffix, None);
        assert!(documents.has_meta_file);
    }
}
