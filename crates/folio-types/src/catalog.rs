//! The denormalized project/version catalog.
//!
//! A [`Catalog`] is kept ordered at all times: projects descending by number,
//! each project's versions ascending without duplicates. Every constructor
//! and mutator preserves that order, and decoding normalizes whatever was
//! stored, so callers never observe an unordered catalog.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::ids::{ProjectNumber, VersionNumber};

/// A project and the versions appended to it so far.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub number: ProjectNumber,
    /// Ascending, no duplicates.
    pub versions: Vec<VersionNumber>,
}

impl Project {
    /// A project with no versions.
    pub fn new(number: ProjectNumber) -> Self {
        Self {
            number,
            versions: Vec::new(),
        }
    }

    /// A project with the given versions, sorted and deduplicated.
    pub fn with_versions(
        number: ProjectNumber,
        versions: impl IntoIterator<Item = VersionNumber>,
    ) -> Self {
        let mut versions: Vec<VersionNumber> = versions.into_iter().collect();
        versions.sort_unstable();
        versions.dedup();
        Self { number, versions }
    }

    /// Insert a version in order. Returns `false` if it was already present.
    pub fn insert_version(&mut self, version: VersionNumber) -> bool {
        match self.versions.binary_search(&version) {
            Ok(_) => false,
            Err(pos) => {
                self.versions.insert(pos, version);
                true
            }
        }
    }

    pub fn contains_version(&self, version: VersionNumber) -> bool {
        self.versions.binary_search(&version).is_ok()
    }

    /// The highest version, if any.
    pub fn latest_version(&self) -> Option<VersionNumber> {
        self.versions.last().copied()
    }
}

/// Ordered sequence of projects, descending by project number.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Project>", into = "Vec<Project>")]
pub struct Catalog {
    projects: Vec<Project>,
}

impl Catalog {
    /// An empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a catalog from projects in any order.
    ///
    /// Entries sharing a project number are merged into one entry holding
    /// the union of their versions.
    pub fn from_projects(projects: impl IntoIterator<Item = Project>) -> Self {
        let mut merged: BTreeMap<ProjectNumber, Vec<VersionNumber>> = BTreeMap::new();
        for project in projects {
            merged
                .entry(project.number)
                .or_default()
                .extend(project.versions);
        }
        let projects = merged
            .into_iter()
            .rev()
            .map(|(number, versions)| Project::with_versions(number, versions))
            .collect();
        Self { projects }
    }

    /// Decode a catalog from its stored JSON form.
    pub fn from_json(bytes: &[u8]) -> Result<Self, TypeError> {
        serde_json::from_slice(bytes).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Encode the catalog to its stored JSON form.
    pub fn to_json(&self) -> Result<Vec<u8>, TypeError> {
        serde_json::to_vec(&self.projects).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn into_projects(self) -> Vec<Project> {
        self.projects
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Project> {
        self.projects.iter()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    pub fn get(&self, number: ProjectNumber) -> Option<&Project> {
        self.position(number).ok().map(|i| &self.projects[i])
    }

    pub fn contains(&self, number: ProjectNumber) -> bool {
        self.position(number).is_ok()
    }

    /// The largest project number in the catalog.
    pub fn highest_project(&self) -> Option<ProjectNumber> {
        self.projects.first().map(|p| p.number)
    }

    /// Insert an empty project if absent and return the stored entry.
    pub fn insert_project(&mut self, number: ProjectNumber) -> &Project {
        let index = match self.position(number) {
            Ok(i) => i,
            Err(i) => {
                self.projects.insert(i, Project::new(number));
                i
            }
        };
        &self.projects[index]
    }

    /// Record `version` under `number`.
    ///
    /// Returns `None` when the project is not in the catalog; the catalog is
    /// left untouched in that case.
    pub fn record_version(
        &mut self,
        number: ProjectNumber,
        version: VersionNumber,
    ) -> Option<&Project> {
        let index = self.position(number).ok()?;
        self.projects[index].insert_version(version);
        Some(&self.projects[index])
    }

    /// Fold `other` into this catalog. Nothing is removed; projects present
    /// in both end up with the union of their versions.
    pub fn merge(&mut self, other: &Catalog) {
        let mine = std::mem::take(&mut self.projects);
        *self = Self::from_projects(mine.into_iter().chain(other.projects.iter().cloned()));
    }

    // Descending order: an entry sorts before `number` when its number is larger.
    fn position(&self, number: ProjectNumber) -> Result<usize, usize> {
        self.projects.binary_search_by(|p| number.cmp(&p.number))
    }
}

impl From<Vec<Project>> for Catalog {
    fn from(projects: Vec<Project>) -> Self {
        Self::from_projects(projects)
    }
}

impl From<Catalog> for Vec<Project> {
    fn from(catalog: Catalog) -> Self {
        catalog.projects
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a Project;
    type IntoIter = std::slice::Iter<'a, Project>;

    fn into_iter(self) -> Self::IntoIter {
        self.projects.iter()
    }
}
