//! Synchronous client core for the Modrinth labrinth v2 API.
//!
//! # Overview
//! Builds `HttpRequest` values and parses `HttpResponse` values without
//! touching the network (host-does-IO pattern). The caller executes the
//! actual HTTP round-trip, making the core fully deterministic and testable.
//!
//! # Design
//! - `LabrinthClient` is stateless: base URL, user agent, optional token.
//! - Each operation is split into `build_*` (produces request) and
//!   `parse_*` (consumes response), so the I/O boundary is explicit.
//! - `Facets` compiles typed property comparisons into the filter grammar
//!   the search endpoint takes as its `facets` parameter.
//! - Rate-limit headers are exposed through `HttpResponse::rate`.
//!
//! ```
//! use labrinth::{FacetProp, Facets, LabrinthClient, SearchParams};
//!
//! let facets = Facets::new()
//!     .and([FacetProp::project_type().equal(["mod"])])
//!     .and([FacetProp::versions().equal(["1.19.4"])]);
//! assert_eq!(facets.to_string(), r#"[["project_type=mod"],["versions=1.19.4"]]"#);
//!
//! let request = LabrinthClient::default().build_search(&SearchParams::new().facets(facets));
//! assert!(request.path.starts_with("https://api.modrinth.com/v2/search?facets="));
//! ```

pub mod client;
pub mod error;
pub mod facets;
pub mod http;
pub mod projects;
pub mod rate;
pub mod types;

pub use client::{LabrinthClient, API_BASE_URL};
pub use error::ApiError;
pub use facets::{FacetOp, FacetProp, Facets};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use projects::{SearchParams, MAX_RANDOM_PROJECTS, SUPPORTED_IMAGE_EXTENSIONS};
pub use rate::Rate;
pub use types::{
    DonationUrl, EditGalleryImage, EditProject, EditProjects, GalleryImage, GalleryImageParams,
    MonetizationStatus, Project, ProjectDependencies, ProjectLicense, ProjectSideSupport,
    ProjectStatus, ProjectType, ScheduleProject, SearchHit, SearchIndex, SearchResult,
    ValidityResponse, Version,
};
