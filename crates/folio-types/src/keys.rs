//! The fast-store key space.
//!
//! | key                                   | value                          |
//! |---------------------------------------|--------------------------------|
//! | `catalog`                             | JSON [`Catalog`](crate::Catalog) |
//! | `highest_project_number`              | decimal integer                |
//! | `project:{N}:version_counter`         | decimal integer                |
//! | `project:{N}:{V}:content`             | raw content bytes              |
//! | `project:{N}:{V}:author`              | UTF-8 author name              |
//! | `project:{N}:{V}:created_at`          | Unix seconds                   |
//! | `project:{N}:metadata`                | JSON [`Project`](crate::Project), best effort |

use crate::ids::{ProjectNumber, VersionNumber};

pub const CATALOG: &str = "catalog";

pub const HIGHEST_PROJECT_NUMBER: &str = "highest_project_number";

pub fn version_counter(project: ProjectNumber) -> String {
    format!("project:{project}:version_counter")
}

pub fn metadata(project: ProjectNumber) -> String {
    format!("project:{project}:metadata")
}

pub fn content(project: ProjectNumber, version: VersionNumber) -> String {
    format!("project:{project}:{version}:content")
}

pub fn author(project: ProjectNumber, version: VersionNumber) -> String {
    format!("project:{project}:{version}:author")
}

pub fn created_at(project: ProjectNumber, version: VersionNumber) -> String {
    format!("project:{project}:{version}:created_at")
}
