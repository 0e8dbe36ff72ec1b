//! Project and search endpoints.

use crate::client::{decode, segment, LabrinthClient, Query};
use crate::error::ApiError;
use crate::facets::Facets;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::types::{
    EditGalleryImage, EditProject, EditProjects, GalleryImageParams, Project,
    ProjectDependencies, ScheduleProject, SearchIndex, SearchResult, ValidityResponse,
};

/// Upper bound the API accepts for `GET /projects_random`.
pub const MAX_RANDOM_PROJECTS: u32 = 100;

/// Image file extensions accepted for icons and gallery images.
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "bmp", "gif", "webp", "svg", "svgz", "rgb",
];

/// Parameters of `GET /search`. Unset fields are left out of the query
/// string and take the server's defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchParams {
    /// Free-text search.
    pub query: Option<String>,
    /// Filter expression, sent as the `facets` parameter.
    pub facets: Option<Facets>,
    /// Sort order. The server default is relevance.
    pub index: Option<SearchIndex>,
    /// Number of results to skip. The server default is 0.
    pub offset: Option<u32>,
    /// Number of results to return. The server default is 10.
    pub limit: Option<u32>,
}

impl SearchParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn facets(mut self, facets: Facets) -> Self {
        self.facets = Some(facets);
        self
    }

    pub fn index(mut self, index: SearchIndex) -> Self {
        self.index = Some(index);
        self
    }

    pub fn offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    fn to_query(&self) -> Query {
        let mut query = Query::new();
        query
            .push_opt("query", self.query.as_deref())
            .push_opt("facets", self.facets.as_ref())
            .push_opt("index", self.index.map(SearchIndex::as_str))
            .push_opt("offset", self.offset)
            .push_opt("limit", self.limit);
        query
    }
}

impl LabrinthClient {
    pub fn build_search(&self, params: &SearchParams) -> HttpRequest {
        self.request(HttpMethod::Get, "/search", &params.to_query())
    }

    pub fn parse_search(&self, response: HttpResponse) -> Result<SearchResult, ApiError> {
        decode(response)
    }

    pub fn build_get_project(&self, id_or_slug: &str) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            &format!("/project/{}", segment(id_or_slug)),
            &Query::new(),
        )
    }

    pub fn parse_get_project(&self, response: HttpResponse) -> Result<Project, ApiError> {
        decode(response)
    }

    pub fn build_get_projects(&self, ids_or_slugs: &[&str]) -> Result<HttpRequest, ApiError> {
        let query = ids_query(ids_or_slugs)?;
        Ok(self.request(HttpMethod::Get, "/projects", &query))
    }

    pub fn parse_get_projects(&self, response: HttpResponse) -> Result<Vec<Project>, ApiError> {
        decode(response)
    }

    /// `count` is capped at [`MAX_RANDOM_PROJECTS`].
    pub fn build_random_projects(&self, count: u32) -> HttpRequest {
        let mut query = Query::new();
        query.push("count", count.min(MAX_RANDOM_PROJECTS));
        self.request(HttpMethod::Get, "/projects_random", &query)
    }

    pub fn parse_random_projects(&self, response: HttpResponse) -> Result<Vec<Project>, ApiError> {
        decode(response)
    }

    /// Check whether an id or slug is taken; resolves to the project id.
    pub fn build_check_project(&self, id_or_slug: &str) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            &format!("/project/{}/check", segment(id_or_slug)),
            &Query::new(),
        )
    }

    pub fn parse_check_project(&self, response: HttpResponse) -> Result<ValidityResponse, ApiError> {
        decode(response)
    }

    /// Parse the reply with [`LabrinthClient::parse_empty`].
    pub fn build_edit_project(
        &self,
        id_or_slug: &str,
        edit: &EditProject,
    ) -> Result<HttpRequest, ApiError> {
        self.json_request(
            HttpMethod::Patch,
            &format!("/project/{}", segment(id_or_slug)),
            &Query::new(),
            edit,
        )
    }

    /// Apply the same edit to every listed project.
    pub fn build_edit_projects(
        &self,
        ids_or_slugs: &[&str],
        edit: &EditProjects,
    ) -> Result<HttpRequest, ApiError> {
        let query = ids_query(ids_or_slugs)?;
        self.json_request(HttpMethod::Patch, "/projects", &query, edit)
    }

    pub fn build_delete_project(&self, id_or_slug: &str) -> HttpRequest {
        self.request(
            HttpMethod::Delete,
            &format!("/project/{}", segment(id_or_slug)),
            &Query::new(),
        )
    }

    /// Upload `data` as the project icon. `ext` must be one of
    /// [`SUPPORTED_IMAGE_EXTENSIONS`].
    pub fn build_change_icon(
        &self,
        id_or_slug: &str,
        ext: &str,
        data: Vec<u8>,
    ) -> Result<HttpRequest, ApiError> {
        let ext = image_extension(ext)?;
        let mut query = Query::new();
        query.push("ext", ext);
        Ok(self.upload_request(
            HttpMethod::Patch,
            &format!("/project/{}/icon", segment(id_or_slug)),
            &query,
            &format!("image/{ext}"),
            data,
        ))
    }

    pub fn build_delete_icon(&self, id_or_slug: &str) -> HttpRequest {
        self.request(
            HttpMethod::Delete,
            &format!("/project/{}/icon", segment(id_or_slug)),
            &Query::new(),
        )
    }

    pub fn build_add_gallery_image(
        &self,
        id_or_slug: &str,
        params: &GalleryImageParams,
        data: Vec<u8>,
    ) -> Result<HttpRequest, ApiError> {
        let ext = image_extension(&params.ext)?;
        let mut query = Query::new();
        query
            .push("ext", ext)
            .push("featured", params.featured)
            .push_opt("title", params.title.as_deref())
            .push_opt("description", params.description.as_deref())
            .push_opt("ordering", params.ordering);
        Ok(self.upload_request(
            HttpMethod::Post,
            &format!("/project/{}/gallery", segment(id_or_slug)),
            &query,
            &format!("image/{ext}"),
            data,
        ))
    }

    pub fn build_edit_gallery_image(&self, id_or_slug: &str, edit: &EditGalleryImage) -> HttpRequest {
        let mut query = Query::new();
        query
            .push("url", &edit.url)
            .push_opt("featured", edit.featured)
            .push_opt("title", edit.title.as_deref())
            .push_opt("description", edit.description.as_deref())
            .push_opt("ordering", edit.ordering);
        self.request(
            HttpMethod::Patch,
            &format!("/project/{}/gallery", segment(id_or_slug)),
            &query,
        )
    }

    pub fn build_delete_gallery_image(&self, id_or_slug: &str, url: &str) -> HttpRequest {
        let mut query = Query::new();
        query.push("url", url);
        self.request(
            HttpMethod::Delete,
            &format!("/project/{}/gallery", segment(id_or_slug)),
            &query,
        )
    }

    pub fn build_get_dependencies(&self, id_or_slug: &str) -> HttpRequest {
        self.request(
            HttpMethod::Get,
            &format!("/project/{}/dependencies", segment(id_or_slug)),
            &Query::new(),
        )
    }

    pub fn parse_get_dependencies(
        &self,
        response: HttpResponse,
    ) -> Result<ProjectDependencies, ApiError> {
        decode(response)
    }

    pub fn build_follow(&self, id_or_slug: &str) -> HttpRequest {
        self.request(
            HttpMethod::Post,
            &format!("/project/{}/follow", segment(id_or_slug)),
            &Query::new(),
        )
    }

    pub fn build_unfollow(&self, id_or_slug: &str) -> HttpRequest {
        self.request(
            HttpMethod::Delete,
            &format!("/project/{}/follow", segment(id_or_slug)),
            &Query::new(),
        )
    }

    /// Schedule a status change. Rejects statuses a project owner may not
    /// request.
    pub fn build_schedule(
        &self,
        id_or_slug: &str,
        schedule: &ScheduleProject,
    ) -> Result<HttpRequest, ApiError> {
        if !schedule.requested_status.is_requestable() {
            return Err(ApiError::StatusNotRequestable(schedule.requested_status));
        }
        self.json_request(
            HttpMethod::Post,
            &format!("/project/{}/schedule", segment(id_or_slug)),
            &Query::new(),
            schedule,
        )
    }
}

/// `ids=["a","b"]`, the array form the bulk endpoints expect.
fn ids_query(ids: &[&str]) -> Result<Query, ApiError> {
    let array = serde_json::to_string(ids).map_err(ApiError::Serialization)?;
    let mut query = Query::new();
    query.push("ids", array);
    Ok(query)
}

/// Validate an image extension; `jpg` is sent as `jpeg`.
fn image_extension(ext: &str) -> Result<&str, ApiError> {
    if !SUPPORTED_IMAGE_EXTENSIONS.contains(&ext) {
        return Err(ApiError::UnsupportedImage(ext.to_string()));
    }
    Ok(if ext == "jpg" { "jpeg" } else { ext })
}
