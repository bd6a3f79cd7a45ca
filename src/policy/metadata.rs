//! Metadata Extractor
//!
//! Turns the comment annotations of a Rego document into a [`PolicyMetadata`]
//! record and derives the policy's canonical name. Extraction never fails:
//! whatever it cannot recognize is ignored.

use crate::policy::types::{PolicyDocument, PolicyMetadata, PolicyRecord};

/// Single-line comment marker of the policy language
const COMMENT_MARKER: &str = "#";

/// Package declaration keyword, including its trailing space
const PACKAGE_KEYWORD: &str = "package ";

/// Annotation keys recognized inside comment lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Annotation {
    Title,
    Description,
    Tags,
    Version,
    Author,
}

impl Annotation {
    /// Checked in this order; the first marker present on a line wins.
    const ALL: [Annotation; 5] = [
        Annotation::Title,
        Annotation::Description,
        Annotation::Tags,
        Annotation::Version,
        Annotation::Author,
    ];

    fn marker(self) -> &'static str {
        match self {
            Annotation::Title => "TITLE:",
            Annotation::Description => "DESCRIPTION:",
            Annotation::Tags => "TAGS:",
            Annotation::Version => "VERSION:",
            Annotation::Author => "AUTHOR:",
        }
    }

    /// Find the first recognized annotation on a comment line and its value
    fn scan(line: &str) -> Option<(Annotation, &str)> {
        Self::ALL.iter().find_map(|annotation| {
            line.split_once(annotation.marker())
                .map(|(_, value)| (*annotation, value.trim()))
        })
    }

    fn apply(self, value: &str, metadata: &mut PolicyMetadata) {
        match self {
            Annotation::Title => metadata.title = Some(value.to_string()),
            Annotation::Description => metadata.description = Some(value.to_string()),
            Annotation::Tags => {
                metadata.tags = Some(value.split(',').map(|t| t.trim().to_string()).collect())
            }
            Annotation::Version => metadata.policy_version = Some(value.to_string()),
            Annotation::Author => metadata.author = Some(value.to_string()),
        }
    }
}

/// Extract annotations and the package declaration from policy text.
pub fn extract_metadata(content: &str) -> PolicyMetadata {
    let mut metadata = PolicyMetadata::default();

    for line in content.lines().map(str::trim) {
        if !line.starts_with(COMMENT_MARKER) {
            continue;
        }
        if let Some((annotation, value)) = Annotation::scan(line) {
            annotation.apply(value, &mut metadata);
        }
    }

    metadata.package = package_declaration(content).map(str::to_string);
    metadata
}

/// The first `package` declaration in the document, comment lines included.
pub fn package_declaration(content: &str) -> Option<&str> {
    content
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(PACKAGE_KEYWORD).map(str::trim_start))
}

/// Canonical name: the package with dots replaced by underscores, else the file stem.
pub fn canonical_name(package: Option<&str>, stem: &str) -> String {
    match package {
        Some(package) => package.replace('.', "_"),
        None => stem.to_string(),
    }
}

/// Build the store candidate for a collected document.
pub fn to_record(document: PolicyDocument) -> PolicyRecord {
    let metadata = extract_metadata(&document.content);
    let name = canonical_name(metadata.package.as_deref(), &document.stem);

    PolicyRecord {
        name,
        path: document.path,
        content: document.content,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ANNOTATED: &str = r#"# TITLE: Require team label
# DESCRIPTION: Every deployment must carry a team label
# TAGS: kubernetes, labels ,governance
# VERSION: 1.2.0
# AUTHOR: platform-team
package kubernetes.admission.labels

deny[msg] {
    not input.request.object.metadata.labels.team
    msg := "missing team label"
}
"#;

    fn document(stem: &str, content: &str) -> PolicyDocument {
        PolicyDocument {
            path: format!("{}.rego", stem),
            stem: stem.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_extracts_all_annotations() {
        let metadata = extract_metadata(ANNOTATED);

        assert_eq!(
            metadata,
            PolicyMetadata {
                title: Some("Require team label".to_string()),
                description: Some("Every deployment must carry a team label".to_string()),
                tags: Some(vec![
                    "kubernetes".to_string(),
                    "labels".to_string(),
                    "governance".to_string(),
                ]),
                policy_version: Some("1.2.0".to_string()),
                author: Some("platform-team".to_string()),
                package: Some("kubernetes.admission.labels".to_string()),
            }
        );
    }

    #[test]
    fn test_tags_are_trimmed_and_ordered() {
        let metadata = extract_metadata("# TAGS: a, b ,c");
        assert_eq!(
            metadata.tags,
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
    }

    #[test]
    fn test_tags_keep_duplicates_and_empty_entries() {
        let metadata = extract_metadata("# TAGS: a,,a, ");
        assert_eq!(
            metadata.tags,
            Some(vec![
                "a".to_string(),
                String::new(),
                "a".to_string(),
                String::new(),
            ])
        );
    }

    #[test]
    fn test_annotations_outside_comments_are_ignored() {
        let metadata = extract_metadata("title := \"TITLE: not a comment\"\n");
        assert_eq!(metadata.title, None);
    }

    #[test]
    fn test_indented_comment_is_an_annotation() {
        let metadata = extract_metadata("    #   AUTHOR:   someone  \n");
        assert_eq!(metadata.author, Some("someone".to_string()));
    }

    #[test]
    fn test_markers_are_case_sensitive() {
        let metadata = extract_metadata("# title: lower case\n# Tags: x");
        assert!(metadata.is_empty());
    }

    #[test]
    fn test_first_marker_on_a_line_wins() {
        let metadata = extract_metadata("# TITLE: Version check VERSION: 2");
        assert_eq!(metadata.title, Some("Version check VERSION: 2".to_string()));
        assert_eq!(metadata.policy_version, None);
    }

    #[test]
    fn test_unknown_keys_and_garbage_are_ignored() {
        let metadata = extract_metadata("# OWNER: nobody\n#\n\u{0}\n###\nallow { true }");
        assert!(metadata.is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(extract_metadata("").is_empty());
    }

    #[test]
    fn test_only_first_package_is_honored() {
        let content = "package first.pkg\n\npackage second.pkg\n";
        assert_eq!(package_declaration(content), Some("first.pkg"));
    }

    #[test]
    fn test_package_extra_spaces_are_trimmed() {
        assert_eq!(package_declaration("package    spaced.pkg\n"), Some("spaced.pkg"));
        assert_eq!(to_record(document("f", "package   a.b")).name, "a_b");
    }

    #[test]
    fn test_package_keyword_requires_space() {
        assert_eq!(package_declaration("packages.foo\npackage_x\n"), None);
    }

    #[test]
    fn test_name_from_package() {
        let record = to_record(document("labels", ANNOTATED));
        assert_eq!(record.name, "kubernetes_admission_labels");
        assert_eq!(record.path, "labels.rego");
    }

    #[test]
    fn test_name_from_package_regardless_of_annotations() {
        for content in ["package a.b.c", "# TITLE: x\npackage a.b.c\n# TAGS: y"] {
            assert_eq!(to_record(document("ignored", content)).name, "a_b_c");
        }
    }

    #[test]
    fn test_name_from_stem_without_package() {
        let content = "# TITLE: No privileged pods\nallow { true }";
        let record = to_record(document("deny_privileged", content));
        assert_eq!(record.name, "deny_privileged");
        assert_eq!(record.metadata.package, None);
    }

    #[test]
    fn test_canonical_name() {
        assert_eq!(canonical_name(Some("authz"), "file"), "authz");
        assert_eq!(canonical_name(Some("x.y"), "file"), "x_y");
        assert_eq!(canonical_name(None, "file"), "file");
    }
}
