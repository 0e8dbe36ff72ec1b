use std::{collections::HashMap, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header::CONTENT_TYPE, HeaderMap, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const RATE_LIMIT: u32 = 300;
pub const MAX_RANDOM: usize = 100;
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpeg", "bmp", "gif", "webp", "svg", "svgz", "rgb"];
const CDN: &str = "https://cdn.modrinth.com/data";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct License {
    pub id: String,
    pub name: String,
    pub url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub description: String,
    pub categories: Vec<String>,
    pub client_side: String,
    pub server_side: String,
    pub body: String,
    pub status: String,
    pub project_type: String,
    pub downloads: u64,
    pub followers: u64,
    pub team: String,
    pub published: String,
    pub updated: String,
    pub game_versions: Vec<String>,
    pub loaders: Vec<String>,
    pub license: License,
    pub icon_url: Option<String>,
    pub requested_status: Option<String>,
    pub gallery: Vec<GalleryImage>,
    /// Ids of the projects this one depends on.
    #[serde(skip)]
    pub dependencies: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GalleryImage {
    pub url: String,
    pub featured: bool,
    pub title: Option<String>,
    pub description: Option<String>,
    pub created: String,
    pub ordering: i64,
}

impl Project {
    /// A project with a fresh 8-character id.
    pub fn new(slug: &str, project_type: &str, categories: &[&str], game_versions: &[&str]) -> Self {
        let id = Uuid::new_v4().simple().to_string()[..8].to_string();
        Self {
            id,
            slug: slug.to_string(),
            title: slug.to_string(),
            description: format!("The {slug} {project_type}"),
            categories: categories.iter().map(|c| c.to_string()).collect(),
            client_side: "required".to_string(),
            server_side: "optional".to_string(),
            body: String::new(),
            status: "approved".to_string(),
            project_type: project_type.to_string(),
            downloads: 0,
            followers: 0,
            team: "team0001".to_string(),
            published: "2023-03-14T12:00:00Z".to_string(),
            updated: "2023-06-01T08:30:00Z".to_string(),
            game_versions: game_versions.iter().map(|v| v.to_string()).collect(),
            loaders: categories.iter().map(|c| c.to_string()).collect(),
            license: License {
                id: "MIT".to_string(),
                name: "MIT License".to_string(),
                url: None,
            },
            icon_url: None,
            requested_status: None,
            gallery: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn downloads(mut self, downloads: u64) -> Self {
        self.downloads = downloads;
        self
    }

    pub fn depends_on(mut self, projects: &[&Project]) -> Self {
        self.dependencies = projects.iter().map(|p| p.id.clone()).collect();
        self
    }

    fn to_hit(&self) -> SearchHit {
        SearchHit {
            project_id: self.id.clone(),
            project_type: self.project_type.clone(),
            slug: self.slug.clone(),
            author: "mock".to_string(),
            title: self.title.clone(),
            description: self.description.clone(),
            categories: self.categories.clone(),
            display_categories: self.categories.clone(),
            versions: self.game_versions.clone(),
            downloads: self.downloads,
            follows: self.followers,
            date_created: self.published.clone(),
            date_modified: self.updated.clone(),
            license: self.license.id.clone(),
            client_side: self.client_side.clone(),
            server_side: self.server_side.clone(),
        }
    }

    /// Values the facet `key` compares against.
    fn facet_values(&self, key: &str) -> Vec<String> {
        match key {
            "project_type" => vec![self.project_type.clone()],
            "categories" => self.categories.clone(),
            "versions" => self.game_versions.clone(),
            "client_side" => vec![self.client_side.clone()],
            "server_side" => vec![self.server_side.clone()],
            "license" => vec![self.license.id.clone()],
            "downloads" => vec![self.downloads.to_string()],
            "follows" => vec![self.followers.to_string()],
            _ => Vec::new(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchHit {
    pub project_id: String,
    pub project_type: String,
    pub slug: String,
    pub author: String,
    pub title: String,
    pub description: String,
    pub categories: Vec<String>,
    pub display_categories: Vec<String>,
    pub versions: Vec<String>,
    pub downloads: u64,
    pub follows: u64,
    pub date_created: String,
    pub date_modified: String,
    pub license: String,
    pub client_side: String,
    pub server_side: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchResult {
    pub hits: Vec<SearchHit>,
    pub offset: usize,
    pub limit: usize,
    pub total_hits: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub description: String,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub facets: Option<String>,
    pub index: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

#[derive(Deserialize)]
pub struct IdsQuery {
    pub ids: String,
}

#[derive(Deserialize)]
pub struct RandomQuery {
    pub count: usize,
}

#[derive(Deserialize)]
pub struct IconQuery {
    pub ext: String,
}

#[derive(Deserialize)]
pub struct GalleryQuery {
    pub ext: String,
    pub featured: bool,
    pub title: Option<String>,
    pub description: Option<String>,
    pub ordering: Option<i64>,
}

#[derive(Deserialize)]
pub struct EditGalleryQuery {
    pub url: String,
    pub featured: Option<bool>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub ordering: Option<i64>,
}

#[derive(Deserialize)]
pub struct GalleryUrlQuery {
    pub url: String,
}

#[derive(Deserialize)]
pub struct EditProjects {
    pub categories: Option<Vec<String>>,
    pub add_categories: Option<Vec<String>>,
    pub remove_categories: Option<Vec<String>>,
}

#[derive(Deserialize)]
pub struct ScheduleProject {
    pub time: String,
    pub requested_status: String,
}

#[derive(Serialize, Deserialize)]
pub struct Dependencies {
    pub projects: Vec<Project>,
    pub versions: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
pub struct EditProject {
    pub title: Option<String>,
    pub description: Option<String>,
    pub categories: Option<Vec<String>>,
    pub client_side: Option<String>,
    pub server_side: Option<String>,
}

pub type Db = Arc<RwLock<HashMap<String, Project>>>;

/// Error response in the API's `{"error", "description"}` shape.
#[derive(Debug)]
pub struct ApiFailure(StatusCode, ErrorBody);

impl ApiFailure {
    fn new(status: StatusCode, error: &str, description: impl Into<String>) -> Self {
        Self(
            status,
            ErrorBody {
                error: error.to_string(),
                description: description.into(),
            },
        )
    }

    fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", "the requested route does not exist")
    }

    fn invalid(description: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_input", description)
    }
}

impl IntoResponse for ApiFailure {
    fn into_response(self) -> Response {
        (self.0, Json(self.1)).into_response()
    }
}

/// Projects every fresh app starts with.
pub fn seed() -> Vec<Project> {
    let sodium =
        Project::new("sodium", "mod", &["fabric", "quilt", "optimization"], &["1.19.4", "1.20.1"])
            .downloads(5_000_000);
    let lithium =
        Project::new("lithium", "mod", &["fabric", "optimization"], &["1.20.1"]).downloads(2_000_000);
    let create = Project::new("create", "mod", &["forge", "technology"], &["1.19.2", "1.20.1"])
        .downloads(3_000_000);
    let modpack =
        Project::new("fabulously-optimized", "modpack", &["fabric", "optimization"], &["1.19.4"])
            .downloads(900_000)
            .depends_on(&[&sodium, &lithium]);
    vec![sodium, lithium, create, modpack]
}

pub fn app() -> Router {
    app_with(seed())
}

pub fn app_with(projects: Vec<Project>) -> Router {
    let db: Db = Arc::new(RwLock::new(
        projects.into_iter().map(|p| (p.id.clone(), p)).collect(),
    ));
    Router::new()
        .route("/search", get(search))
        .route("/projects", get(get_projects).patch(edit_projects))
        .route("/projects_random", get(random_projects))
        .route(
            "/project/{id}",
            get(get_project).patch(edit_project).delete(delete_project),
        )
        .route("/project/{id}/check", get(check_project))
        .route("/project/{id}/icon", patch(change_icon).delete(delete_icon))
        .route(
            "/project/{id}/gallery",
            post(add_gallery_image)
                .patch(edit_gallery_image)
                .delete(delete_gallery_image),
        )
        .route("/project/{id}/dependencies", get(get_dependencies))
        .route("/project/{id}/follow", post(follow).delete(unfollow))
        .route("/project/{id}/schedule", post(schedule))
        .layer(middleware::map_response(add_rate_headers))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn add_rate_headers(mut response: Response) -> Response {
    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(RATE_LIMIT));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(RATE_LIMIT - 1));
    headers.insert("x-ratelimit-reset", HeaderValue::from(60u32));
    response
}

fn require_auth(headers: &HeaderMap) -> Result<(), ApiFailure> {
    if headers.contains_key("authorization") {
        Ok(())
    } else {
        Err(ApiFailure::new(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "authentication is required for this route",
        ))
    }
}

fn find<'a>(projects: &'a HashMap<String, Project>, id: &str) -> Option<&'a Project> {
    projects.get(id).or_else(|| projects.values().find(|p| p.slug == id))
}

fn find_id(projects: &HashMap<String, Project>, id: &str) -> Result<String, ApiFailure> {
    find(projects, id)
        .map(|p| p.id.clone())
        .ok_or_else(ApiFailure::not_found)
}

fn find_mut<'a>(
    projects: &'a mut HashMap<String, Project>,
    id: &str,
) -> Result<&'a mut Project, ApiFailure> {
    let id = find_id(projects, id)?;
    projects.get_mut(&id).ok_or_else(ApiFailure::not_found)
}

fn parse_ids(raw: &str) -> Result<Vec<String>, ApiFailure> {
    serde_json::from_str(raw).map_err(|e| ApiFailure::invalid(format!("Invalid ids: {e}")))
}

/// Check an uploaded image: supported extension, `image/*` content type, non-empty body.
fn check_image(ext: &str, headers: &HeaderMap, data: &Bytes) -> Result<(), ApiFailure> {
    if !IMAGE_EXTENSIONS.contains(&ext) {
        return Err(ApiFailure::invalid(format!("Invalid format for image: {ext}")));
    }
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if content_type != format!("image/{ext}") {
        return Err(ApiFailure::invalid(format!(
            "Content type {content_type:?} does not match extension {ext}"
        )));
    }
    if data.is_empty() {
        return Err(ApiFailure::invalid("Image body is empty"));
    }
    Ok(())
}

/// Parse a facet clause such as `categories!=forge` into key, operator and value.
pub fn parse_clause(clause: &str) -> Option<(&str, &str, &str)> {
    let at = clause.find(['!', '<', '>', '='])?;
    let (key, rest) = clause.split_at(at);
    let op_len = if rest.starts_with("!=") || rest.starts_with("<=") || rest.starts_with(">=") {
        2
    } else if rest.starts_with('!') {
        return None;
    } else {
        1
    };
    let (op, value) = rest.split_at(op_len);
    Some((key, op, value))
}

fn clause_matches(project: &Project, key: &str, op: &str, value: &str) -> bool {
    let values = project.facet_values(key);
    let compare = |candidate: &String| match (candidate.parse::<f64>(), value.parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b),
        _ => Some(candidate.as_str().cmp(value)),
    };
    match op {
        "=" => values.iter().any(|v| v == value),
        "!=" => values.iter().all(|v| v != value),
        "<" => values.iter().any(|v| compare(v).is_some_and(|o| o.is_lt())),
        "<=" => values.iter().any(|v| compare(v).is_some_and(|o| o.is_le())),
        ">" => values.iter().any(|v| compare(v).is_some_and(|o| o.is_gt())),
        ">=" => values.iter().any(|v| compare(v).is_some_and(|o| o.is_ge())),
        _ => false,
    }
}

/// AND over groups, OR within a group.
fn facets_match(project: &Project, groups: &[Vec<(String, String, String)>]) -> bool {
    groups.iter().all(|group| {
        group
            .iter()
            .any(|(key, op, value)| clause_matches(project, key, op, value))
    })
}

fn parse_facets(raw: &str) -> Result<Vec<Vec<(String, String, String)>>, ApiFailure> {
    let groups: Vec<Vec<String>> = serde_json::from_str(raw)
        .map_err(|e| ApiFailure::invalid(format!("Error while parsing facets: {e}")))?;
    groups
        .iter()
        .map(|group| {
            group
                .iter()
                .map(|clause| {
                    parse_clause(clause)
                        .map(|(k, o, v)| (k.to_string(), o.to_string(), v.to_string()))
                        .ok_or_else(|| ApiFailure::invalid(format!("Invalid facet clause: {clause}")))
                })
                .collect()
        })
        .collect()
}

async fn search(
    State(db): State<Db>,
    Query(params): Query<SearchQuery>,
) -> Result<Json<SearchResult>, ApiFailure> {
    let groups = match params.facets.as_deref() {
        Some(raw) => parse_facets(raw)?,
        None => Vec::new(),
    };
    let needle = params.query.unwrap_or_default().to_lowercase();

    let projects = db.read().await;
    let mut hits: Vec<&Project> = projects
        .values()
        .filter(|p| needle.is_empty() || p.title.to_lowercase().contains(&needle))
        .filter(|p| facets_match(p, &groups))
        .collect();
    match params.index.as_deref() {
        Some("follows") => hits.sort_by(|a, b| b.followers.cmp(&a.followers)),
        Some("newest") => hits.sort_by(|a, b| b.published.cmp(&a.published)),
        Some("updated") => hits.sort_by(|a, b| b.updated.cmp(&a.updated)),
        _ => hits.sort_by(|a, b| b.downloads.cmp(&a.downloads)),
    }

    let offset = params.offset.unwrap_or(0);
    let limit = params.limit.unwrap_or(10);
    let total_hits = hits.len();
    let hits = hits
        .into_iter()
        .skip(offset)
        .take(limit)
        .map(Project::to_hit)
        .collect();
    Ok(Json(SearchResult {
        hits,
        offset,
        limit,
        total_hits,
    }))
}

async fn get_projects(
    State(db): State<Db>,
    Query(params): Query<IdsQuery>,
) -> Result<Json<Vec<Project>>, ApiFailure> {
    let ids = parse_ids(&params.ids)?;
    let projects = db.read().await;
    Ok(Json(
        ids.iter()
            .filter_map(|id| find(&projects, id).cloned())
            .collect(),
    ))
}

async fn edit_projects(
    State(db): State<Db>,
    Query(params): Query<IdsQuery>,
    headers: HeaderMap,
    Json(input): Json<EditProjects>,
) -> Result<StatusCode, ApiFailure> {
    require_auth(&headers)?;
    let ids = parse_ids(&params.ids)?;
    let mut projects = db.write().await;
    for id in &ids {
        let project = find_mut(&mut projects, id)?;
        if let Some(categories) = &input.categories {
            project.categories = categories.clone();
        }
        for category in input.add_categories.iter().flatten() {
            if !project.categories.contains(category) {
                project.categories.push(category.clone());
            }
        }
        if let Some(remove) = &input.remove_categories {
            project.categories.retain(|c| !remove.contains(c));
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn random_projects(
    State(db): State<Db>,
    Query(params): Query<RandomQuery>,
) -> Result<Json<Vec<Project>>, ApiFailure> {
    if params.count > MAX_RANDOM {
        return Err(ApiFailure::invalid(format!(
            "count must be at most {MAX_RANDOM}"
        )));
    }
    let projects = db.read().await;
    Ok(Json(projects.values().take(params.count).cloned().collect()))
}

async fn get_project(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Project>, ApiFailure> {
    let projects = db.read().await;
    find(&projects, &id)
        .cloned()
        .map(Json)
        .ok_or_else(ApiFailure::not_found)
}

async fn check_project(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ApiFailure> {
    let projects = db.read().await;
    let id = find_id(&projects, &id)?;
    Ok(Json(serde_json::json!({ "id": id })))
}

async fn edit_project(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<EditProject>,
) -> Result<StatusCode, ApiFailure> {
    require_auth(&headers)?;
    let mut projects = db.write().await;
    let id = find_id(&projects, &id)?;
    let project = projects.get_mut(&id).ok_or_else(ApiFailure::not_found)?;
    if let Some(title) = input.title {
        project.title = title;
    }
    if let Some(description) = input.description {
        project.description = description;
    }
    if let Some(categories) = input.categories {
        project.categories = categories;
    }
    if let Some(side) = input.client_side {
        project.client_side = side;
    }
    if let Some(side) = input.server_side {
        project.server_side = side;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_project(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiFailure> {
    require_auth(&headers)?;
    let mut projects = db.write().await;
    let id = find_id(&projects, &id)?;
    projects.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

async fn change_icon(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(params): Query<IconQuery>,
    headers: HeaderMap,
    data: Bytes,
) -> Result<StatusCode, ApiFailure> {
    require_auth(&headers)?;
    check_image(&params.ext, &headers, &data)?;
    let mut projects = db.write().await;
    let project = find_mut(&mut projects, &id)?;
    project.icon_url = Some(format!("{CDN}/{}/icon.{}", project.id, params.ext));
    tracing::debug!(id = %project.id, bytes = data.len(), "icon replaced");
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_icon(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiFailure> {
    require_auth(&headers)?;
    let mut projects = db.write().await;
    find_mut(&mut projects, &id)?.icon_url = None;
    Ok(StatusCode::NO_CONTENT)
}

async fn add_gallery_image(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(params): Query<GalleryQuery>,
    headers: HeaderMap,
    data: Bytes,
) -> Result<StatusCode, ApiFailure> {
    require_auth(&headers)?;
    check_image(&params.ext, &headers, &data)?;
    let mut projects = db.write().await;
    let project = find_mut(&mut projects, &id)?;
    let name = Uuid::new_v4().simple().to_string();
    let url = format!("{CDN}/{}/images/{}.{}", project.id, &name[..8], params.ext);
    if params.featured {
        for image in &mut project.gallery {
            image.featured = false;
        }
    }
    project.gallery.push(GalleryImage {
        url,
        featured: params.featured,
        title: params.title,
        description: params.description,
        created: "2023-06-01T08:30:00Z".to_string(),
        ordering: params.ordering.unwrap_or(0),
    });
    Ok(StatusCode::NO_CONTENT)
}

async fn edit_gallery_image(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(params): Query<EditGalleryQuery>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiFailure> {
    require_auth(&headers)?;
    let mut projects = db.write().await;
    let project = find_mut(&mut projects, &id)?;
    let image = project
        .gallery
        .iter_mut()
        .find(|image| image.url == params.url)
        .ok_or_else(ApiFailure::not_found)?;
    if let Some(featured) = params.featured {
        image.featured = featured;
    }
    if let Some(title) = params.title {
        image.title = Some(title);
    }
    if let Some(description) = params.description {
        image.description = Some(description);
    }
    if let Some(ordering) = params.ordering {
        image.ordering = ordering;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_gallery_image(
    State(db): State<Db>,
    Path(id): Path<String>,
    Query(params): Query<GalleryUrlQuery>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiFailure> {
    require_auth(&headers)?;
    let mut projects = db.write().await;
    let project = find_mut(&mut projects, &id)?;
    let before = project.gallery.len();
    project.gallery.retain(|image| image.url != params.url);
    if project.gallery.len() == before {
        return Err(ApiFailure::not_found());
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn get_dependencies(
    State(db): State<Db>,
    Path(id): Path<String>,
) -> Result<Json<Dependencies>, ApiFailure> {
    let projects = db.read().await;
    let project = find(&projects, &id).ok_or_else(ApiFailure::not_found)?;
    let dependencies = project
        .dependencies
        .iter()
        .filter_map(|id| projects.get(id).cloned())
        .collect();
    Ok(Json(Dependencies {
        projects: dependencies,
        versions: Vec::new(),
    }))
}

async fn follow(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiFailure> {
    require_auth(&headers)?;
    let mut projects = db.write().await;
    let id = find_id(&projects, &id)?;
    if let Some(project) = projects.get_mut(&id) {
        project.followers += 1;
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn unfollow(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiFailure> {
    require_auth(&headers)?;
    let mut projects = db.write().await;
    let id = find_id(&projects, &id)?;
    if let Some(project) = projects.get_mut(&id) {
        project.followers = project.followers.saturating_sub(1);
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn schedule(
    State(db): State<Db>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(input): Json<ScheduleProject>,
) -> Result<StatusCode, ApiFailure> {
    require_auth(&headers)?;
    const REQUESTABLE: [&str; 5] = ["approved", "archived", "unlisted", "private", "draft"];
    if !REQUESTABLE.contains(&input.requested_status.as_str()) {
        return Err(ApiFailure::invalid(format!(
            "Cannot schedule status {}",
            input.requested_status
        )));
    }
    let mut projects = db.write().await;
    let project = find_mut(&mut projects, &id)?;
    tracing::debug!(id = %project.id, time = %input.time, "status change scheduled");
    project.status = "scheduled".to_string();
    project.requested_status = Some(input.requested_status);
    Ok(StatusCode::NO_CONTENT)
}
