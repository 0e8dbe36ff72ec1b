use axum::{
    body::Body,
    http::{self, Request, StatusCode},
};
use http_body_util::BodyExt;
use mock_server::{app, app_with, Dependencies, ErrorBody, Project, SearchResult};
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn get(uri: &str) -> Request<String> {
    Request::builder().uri(uri).body(String::new()).unwrap()
}

fn authed(method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, "mrp_test")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(body.to_string())
        .unwrap()
}

fn upload(method: &str, uri: &str, content_type: &str, data: &'static [u8]) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, "mrp_test")
        .header(http::header::CONTENT_TYPE, content_type)
        .body(Body::from(data))
        .unwrap()
}

// --- search ---

#[tokio::test]
async fn search_returns_every_project_by_downloads() {
    let resp = app().oneshot(get("/search")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let result: SearchResult = body_json(resp).await;
    assert_eq!(result.total_hits, 4);
    assert_eq!(result.limit, 10);
    assert_eq!(result.hits[0].slug, "sodium");
}

#[tokio::test]
async fn search_applies_facets() {
    // [["categories=forge","categories=quilt"],["versions=1.20.1"]]
    let uri = "/search?facets=%5B%5B%22categories%3Dforge%22%2C%22categories%3Dquilt%22%5D%2C%5B%22versions%3D1.20.1%22%5D%5D";
    let resp = app().oneshot(get(uri)).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let result: SearchResult = body_json(resp).await;
    let slugs: Vec<_> = result.hits.iter().map(|h| h.slug.as_str()).collect();
    assert_eq!(slugs, ["sodium", "create"]);
}

#[tokio::test]
async fn search_rejects_malformed_facets() {
    let resp = app()
        .oneshot(get("/search?facets=%5B%5Bcategories%5D%5D"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: ErrorBody = body_json(resp).await;
    assert_eq!(error.error, "invalid_input");
}

#[tokio::test]
async fn search_paginates() {
    let resp = app()
        .oneshot(get("/search?offset=1&limit=2"))
        .await
        .unwrap();

    let result: SearchResult = body_json(resp).await;
    assert_eq!(result.total_hits, 4);
    assert_eq!(result.offset, 1);
    let slugs: Vec<_> = result.hits.iter().map(|h| h.slug.as_str()).collect();
    assert_eq!(slugs, ["create", "lithium"]);
}

#[tokio::test]
async fn responses_carry_rate_headers() {
    let resp = app().oneshot(get("/search")).await.unwrap();

    assert_eq!(resp.headers()["x-ratelimit-limit"], "300");
    assert_eq!(resp.headers()["x-ratelimit-remaining"], "299");
    assert_eq!(resp.headers()["x-ratelimit-reset"], "60");
}

// --- get ---

#[tokio::test]
async fn get_project_by_slug_and_id() {
    let project = Project::new("iris", "mod", &["fabric"], &["1.20.1"]);
    let id = project.id.clone();
    let app = app_with(vec![project]);

    let resp = app.clone().oneshot(get("/project/iris")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Project = body_json(resp).await;
    assert_eq!(fetched.id, id);

    let resp = app.oneshot(get(&format!("/project/{id}"))).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn get_project_not_found() {
    let resp = app().oneshot(get("/project/nope")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn get_projects_takes_json_ids() {
    let resp = app()
        .oneshot(get("/projects?ids=%5B%22lithium%22%2C%22missing%22%2C%22create%22%5D"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let projects: Vec<Project> = body_json(resp).await;
    let slugs: Vec<_> = projects.iter().map(|p| p.slug.as_str()).collect();
    assert_eq!(slugs, ["lithium", "create"]);
}

#[tokio::test]
async fn check_resolves_slug_to_id() {
    let project = Project::new("iris", "mod", &[], &[]);
    let id = project.id.clone();
    let resp = app_with(vec![project])
        .oneshot(get("/project/iris/check"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = body_json(resp).await;
    assert_eq!(body["id"], id.as_str());
}

// --- edit / delete ---

#[tokio::test]
async fn edit_requires_authorization() {
    let req = Request::builder()
        .method("PATCH")
        .uri("/project/sodium")
        .header(http::header::CONTENT_TYPE, "application/json")
        .body(r#"{"title":"Nope"}"#.to_string())
        .unwrap();
    let resp = app().oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let error: ErrorBody = body_json(resp).await;
    assert_eq!(error.error, "unauthorized");
}

#[tokio::test]
async fn edit_then_delete_lifecycle() {
    let app = app();

    let resp = app
        .clone()
        .oneshot(authed("PATCH", "/project/sodium", r#"{"title":"Sodium"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = app.clone().oneshot(get("/project/sodium")).await.unwrap();
    let fetched: Project = body_json(resp).await;
    assert_eq!(fetched.title, "Sodium");

    let resp = app
        .clone()
        .oneshot(authed("DELETE", "/project/sodium", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.oneshot(get("/project/sodium")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- follow ---

#[tokio::test]
async fn follow_and_unfollow_adjust_followers() {
    let app = app();

    let resp = app
        .clone()
        .oneshot(authed("POST", "/project/lithium/follow", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.clone().oneshot(get("/project/lithium")).await.unwrap();
    let fetched: Project = body_json(resp).await;
    assert_eq!(fetched.followers, 1);

    let resp = app
        .clone()
        .oneshot(authed("DELETE", "/project/lithium/follow", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.oneshot(get("/project/lithium")).await.unwrap();
    let fetched: Project = body_json(resp).await;
    assert_eq!(fetched.followers, 0);
}

// --- random / bulk edit ---

#[tokio::test]
async fn random_projects_respects_count() {
    let app = app();

    let resp = app.clone().oneshot(get("/projects_random?count=2")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let projects: Vec<Project> = body_json(resp).await;
    assert_eq!(projects.len(), 2);

    let resp = app.oneshot(get("/projects_random?count=101")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bulk_edit_adds_and_removes_categories() {
    let app = app();
    // ids=["sodium","lithium"]
    let uri = "/projects?ids=%5B%22sodium%22%2C%22lithium%22%5D";

    let body = r#"{"add_categories":["performance"],"remove_categories":["optimization"]}"#;
    let resp = app.clone().oneshot(authed("PATCH", uri, body)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.oneshot(get(uri)).await.unwrap();
    let projects: Vec<Project> = body_json(resp).await;
    for project in projects {
        assert!(project.categories.contains(&"performance".to_string()));
        assert!(!project.categories.contains(&"optimization".to_string()));
    }
}

// --- icon / gallery ---

#[tokio::test]
async fn icon_upload_and_delete() {
    let app = app();

    let resp = app
        .clone()
        .oneshot(upload("PATCH", "/project/sodium/icon?ext=png", "image/png", b"\x89PNG"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.clone().oneshot(get("/project/sodium")).await.unwrap();
    let fetched: Project = body_json(resp).await;
    let icon = fetched.icon_url.unwrap();
    assert!(icon.ends_with("/icon.png"), "{icon}");

    let resp = app
        .clone()
        .oneshot(authed("DELETE", "/project/sodium/icon", ""))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.oneshot(get("/project/sodium")).await.unwrap();
    let fetched: Project = body_json(resp).await;
    assert!(fetched.icon_url.is_none());
}

#[tokio::test]
async fn icon_upload_rejects_mismatched_content_type() {
    let resp = app()
        .oneshot(upload("PATCH", "/project/sodium/icon?ext=png", "image/gif", b"GIF89a"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let error: ErrorBody = body_json(resp).await;
    assert_eq!(error.error, "invalid_input");
}

#[tokio::test]
async fn gallery_lifecycle() {
    let app = app();

    let resp = app
        .clone()
        .oneshot(upload(
            "POST",
            "/project/lithium/gallery?ext=jpeg&featured=true&title=Before",
            "image/jpeg",
            b"\xff\xd8\xff",
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.clone().oneshot(get("/project/lithium")).await.unwrap();
    let fetched: Project = body_json(resp).await;
    assert_eq!(fetched.gallery.len(), 1);
    let image = &fetched.gallery[0];
    assert!(image.featured);
    assert_eq!(image.title.as_deref(), Some("Before"));
    let url = image.url.clone();

    let uri = format!("/project/lithium/gallery?url={url}&featured=false&title=After");
    let resp = app.clone().oneshot(authed("PATCH", &uri, "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.clone().oneshot(get("/project/lithium")).await.unwrap();
    let fetched: Project = body_json(resp).await;
    assert!(!fetched.gallery[0].featured);
    assert_eq!(fetched.gallery[0].title.as_deref(), Some("After"));

    let uri = format!("/project/lithium/gallery?url={url}");
    let resp = app.clone().oneshot(authed("DELETE", &uri, "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = app.oneshot(authed("DELETE", &uri, "")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// --- dependencies / schedule ---

#[tokio::test]
async fn modpack_lists_its_dependencies() {
    let resp = app()
        .oneshot(get("/project/fabulously-optimized/dependencies"))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let deps: Dependencies = body_json(resp).await;
    let slugs: Vec<_> = deps.projects.iter().map(|p| p.slug.as_str()).collect();
    assert_eq!(slugs, ["sodium", "lithium"]);
    assert!(deps.versions.is_empty());
}

#[tokio::test]
async fn schedule_sets_requested_status() {
    let app = app();

    let body = r#"{"time":"2030-01-01T00:00:00Z","requested_status":"archived"}"#;
    let resp = app
        .clone()
        .oneshot(authed("POST", "/project/create/schedule", body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = app.clone().oneshot(get("/project/create")).await.unwrap();
    let fetched: Project = body_json(resp).await;
    assert_eq!(fetched.status, "scheduled");
    assert_eq!(fetched.requested_status.as_deref(), Some("archived"));

    let body = r#"{"time":"2030-01-01T00:00:00Z","requested_status":"withheld"}"#;
    let resp = app
        .oneshot(authed("POST", "/project/create/schedule", body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
