use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Json, Response};
use folio_catalog::{CatalogError, ProjectCatalog};
use folio_store::DurableTree;
use folio_types::{Catalog, ProjectNumber, TreePath, VersionNumber};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{ServerError, ServerResult};

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Info handler.
pub async fn info_handler() -> Json<Value> {
    Json(json!({
        "name": "folio-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// `GET /fast/projects`
pub async fn list_projects(State(catalog): State<ProjectCatalog>) -> ServerResult<Json<Catalog>> {
    Ok(Json(catalog.get_catalog().await?))
}

/// The newest version of the highest-numbered project.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentVersion {
    pub project: Option<ProjectNumber>,
    pub version: Option<VersionNumber>,
    /// Tree path of the version's content blob.
    pub path: Option<String>,
}

/// `GET /fast/current`
pub async fn current_version(
    State(catalog): State<ProjectCatalog>,
) -> ServerResult<Json<CurrentVersion>> {
    let listed = catalog.get_catalog().await?;
    let Some(project) = listed.projects().first() else {
        return Ok(Json(CurrentVersion {
            project: None,
            version: None,
            path: None,
        }));
    };
    let version = project.latest_version();
    let path = match version {
        Some(v) => Some(catalog.layout().content_path(project.number, v)?.to_string()),
        None => None,
    };
    Ok(Json(CurrentVersion {
        project: Some(project.number),
        version,
        path,
    }))
}

/// Body of `POST /fast`.
///
/// `{"action": "create_project", "project_number": 3}` creates a project.
/// Anything else submits `value` as a new version authored by `key`, to
/// `project_number` if given and to the highest project otherwise.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct FastRequest {
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
    /// A JSON number or a numeric string.
    #[serde(default)]
    pub project_number: Option<Value>,
}

impl FastRequest {
    fn project_number(&self) -> Result<Option<ProjectNumber>, CatalogError> {
        match &self.project_number {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
            Some(Value::String(s)) => s
                .parse::<ProjectNumber>()
                .map(Some)
                .map_err(|_| CatalogError::InvalidProjectNumber(s.clone())),
            Some(Value::Number(n)) => n
                .as_u64()
                .and_then(|n| ProjectNumber::new(n).ok())
                .map(Some)
                .ok_or_else(|| CatalogError::InvalidProjectNumber(n.to_string())),
            Some(other) => Err(CatalogError::InvalidProjectNumber(other.to_string())),
        }
    }
}

/// `POST /fast`
pub async fn submit(
    State(catalog): State<ProjectCatalog>,
    Json(request): Json<FastRequest>,
) -> ServerResult<Json<Value>> {
    let project_number = request.project_number()?;

    if request.action.as_deref() == Some("create_project") {
        let number = project_number
            .ok_or_else(|| CatalogError::InvalidProjectNumber("missing".into()))?;
        let project = catalog.create_project(number).await?;
        return Ok(Json(json!({ "status": "created", "project": project.number })));
    }

    let content = request.value.unwrap_or_default();
    if content.is_empty() {
        return Ok(Json(json!({ "status": "no content" })));
    }
    let author = request.key.unwrap_or_else(|| "default".to_string());

    let record = match project_number {
        Some(number) => catalog.append_version(number, content, &author).await?,
        None => catalog.append_to_latest(content, &author).await?,
    };
    Ok(Json(json!({
        "status": "saved",
        "project": record.project,
        "version": record.version,
        "redis_key": record.content_key(),
    })))
}

/// `GET /projects/*path`: raw blob from the durable tree.
pub async fn project_file(
    State(catalog): State<ProjectCatalog>,
    Path(path): Path<String>,
) -> ServerResult<Response> {
    let tree_path: TreePath = path
        .parse()
        .map_err(|_| ServerError::BadRequest(format!("invalid path {path:?}")))?;
    let content = catalog
        .durable_tree()
        .read(&tree_path)
        .await?
        .ok_or_else(|| ServerError::NotFound(tree_path.to_string()))?;
    Ok(([(header::CONTENT_TYPE, content_type(&tree_path))], content).into_response())
}

fn content_type(path: &TreePath) -> &'static str {
    let extension = path
        .file_name()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("txt") => "text/plain; charset=utf-8",
        Some("json") => "application/json",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(project_number: Value) -> FastRequest {
        FastRequest {
            project_number: Some(project_number),
            ..FastRequest::default()
        }
    }

    #[test]
    fn project_number_forms() {
        assert_eq!(request(json!(7)).project_number().unwrap().unwrap().get(), 7);
        assert_eq!(request(json!("12")).project_number().unwrap().unwrap().get(), 12);
        assert_eq!(request(json!(" 3 ")).project_number().unwrap().unwrap().get(), 3);
        assert!(request(json!(null)).project_number().unwrap().is_none());
        assert!(request(json!("")).project_number().unwrap().is_none());
        assert!(FastRequest::default().project_number().unwrap().is_none());
    }

    #[test]
    fn bad_project_numbers() {
        for bad in [json!(0), json!(-1), json!(1.5), json!("abc"), json!([1])] {
            assert!(matches!(
                request(bad).project_number().unwrap_err(),
                CatalogError::InvalidProjectNumber(_)
            ));
        }
    }

    #[test]
    fn content_types() {
        let ct = |p: &str| content_type(&p.parse().unwrap());
        assert_eq!(ct("project1/1/index.html"), "text/html; charset=utf-8");
        assert_eq!(ct("project1/.placeholder"), "application/octet-stream");
        assert_eq!(ct("a/NOTES.TXT"), "text/plain; charset=utf-8");
    }
}
