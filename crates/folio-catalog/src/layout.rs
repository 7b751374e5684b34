//! Where things live in the durable tree.
//!
//! ```text
//! <root>/
//!   project7/
//!     .placeholder
//!     1/index.html
//!     2/index.html
//! ```

use folio_types::{ProjectNumber, TreePath, VersionNumber};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// Names used when writing into the durable tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeLayout {
    /// Prefix of project directory names; `project` gives `project7`.
    pub project_prefix: String,
    /// Blob name holding a version's content.
    pub content_file: String,
    /// Empty blob that materializes a freshly created project.
    pub placeholder_file: String,
}

impl Default for TreeLayout {
    fn default() -> Self {
        Self {
            project_prefix: "project".into(),
            content_file: "index.html".into(),
            placeholder_file: ".placeholder".into(),
        }
    }
}

impl TreeLayout {
    /// Check that every configured name is usable as a path segment and
    /// that project directories will be recognized by the scanner.
    pub fn validate(&self) -> CatalogResult<()> {
        let sample = ProjectNumber::new(1).map_err(|e| CatalogError::Config(e.to_string()))?;
        self.content_path(sample, VersionNumber::new(1))?;
        self.placeholder_path(sample)?;
        let dir = format!("{}{}", self.project_prefix, sample);
        if parse_project_dir(&dir) != Some(sample) {
            return Err(CatalogError::Config(format!(
                "project prefix {:?} must be non-empty and contain no digits",
                self.project_prefix
            )));
        }
        Ok(())
    }

    /// `project{N}`
    pub fn project_dir(&self, project: ProjectNumber) -> CatalogResult<TreePath> {
        join(&TreePath::root(), format!("{}{}", self.project_prefix, project))
    }

    /// `project{N}/{V}`
    pub fn version_dir(
        &self,
        project: ProjectNumber,
        version: VersionNumber,
    ) -> CatalogResult<TreePath> {
        join(&self.project_dir(project)?, version.to_string())
    }

    /// `project{N}/{V}/index.html`
    pub fn content_path(
        &self,
        project: ProjectNumber,
        version: VersionNumber,
    ) -> CatalogResult<TreePath> {
        join(&self.version_dir(project, version)?, self.content_file.clone())
    }

    /// `project{N}/.placeholder`
    pub fn placeholder_path(&self, project: ProjectNumber) -> CatalogResult<TreePath> {
        join(&self.project_dir(project)?, self.placeholder_file.clone())
    }
}

fn join(base: &TreePath, segment: String) -> CatalogResult<TreePath> {
    base.join(segment)
        .map_err(|e| CatalogError::Config(e.to_string()))
}

/// Recognize a project directory name: a non-empty prefix without digits
/// followed by only digits. `project12` gives 12; `12`, `project`,
/// `project1a` and `project0` are not projects.
pub fn parse_project_dir(name: &str) -> Option<ProjectNumber> {
    let split = name.find(|c: char| c.is_ascii_digit())?;
    let (prefix, digits) = name.split_at(split);
    if prefix.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(n: u64) -> ProjectNumber {
        ProjectNumber::new(n).unwrap()
    }

    #[test]
    fn default_paths() {
        let layout = TreeLayout::default();
        assert_eq!(layout.project_dir(p(7)).unwrap().to_string(), "project7");
        assert_eq!(
            layout.content_path(p(7), VersionNumber::new(3)).unwrap().to_string(),
            "project7/3/index.html"
        );
        assert_eq!(
            layout.placeholder_path(p(7)).unwrap().to_string(),
            "project7/.placeholder"
        );
        layout.validate().unwrap();
    }

    #[test]
    fn recognizes_project_dirs() {
        assert_eq!(parse_project_dir("project12"), Some(p(12)));
        assert_eq!(parse_project_dir("proj3"), Some(p(3)));
        assert_eq!(parse_project_dir("project007"), Some(p(7)));
        assert_eq!(parse_project_dir("project"), None);
        assert_eq!(parse_project_dir("12"), None);
        assert_eq!(parse_project_dir("project1a"), None);
        assert_eq!(parse_project_dir("project0"), None);
        assert_eq!(parse_project_dir(""), None);
    }

    #[test]
    fn rejects_bad_layouts() {
        let digits = TreeLayout {
            project_prefix: "p2_".into(),
            ..TreeLayout::default()
        };
        assert!(matches!(digits.validate(), Err(CatalogError::Config(_))));

        let slash = TreeLayout {
            content_file: "a/b".into(),
            ..TreeLayout::default()
        };
        assert!(slash.validate().is_err());

        let empty = TreeLayout {
            project_prefix: String::new(),
            ..TreeLayout::default()
        };
        assert!(empty.validate().is_err());
    }

    proptest::proptest! {
        #[test]
        fn project_dir_round_trips(prefix in "[a-zA-Z_.-]{1,12}", n in 1u64..1_000_000) {
            let layout = TreeLayout {
                project_prefix: prefix,
                ..TreeLayout::default()
            };
            let dir = layout.project_dir(p(n)).unwrap().to_string();
            proptest::prop_assert_eq!(parse_project_dir(&dir), Some(p(n)));
        }
    }
}
