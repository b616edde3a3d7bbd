//! HTTP handlers: the catalog search listing and the identify-from-photo
//! pipeline.

use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, instrument};

use crate::db::{self, BeerView, Pool};
use crate::vision::NameExtractor;

/// State shared by all routes: the catalog pool and the extraction client,
/// both safe for concurrent use and never mutated per request.
#[derive(Clone)]
pub struct AppState {
    pub pool: Pool,
    pub vision: Arc<dyn NameExtractor>,
}

/// JSON error body shared by all endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// A request failure mapped to the HTTP status and message the client sees.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub search: String,
}

/// GET /beers?search=<term>
#[instrument(skip_all)]
pub async fn list_beers(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<BeerView>>, ApiError> {
    let beers = db::search_beers(&state.pool, &params.search, db::SEARCH_LIMIT)
        .await
        .map_err(|err| {
            error!(?err, "beer search failed");
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to query database",
            )
        })?;
    Ok(Json(beers.into_iter().map(BeerView::from).collect()))
}

/// POST /identify-beer, multipart form field `image`.
///
/// Runs the upload through name extraction and then catalog resolution.
/// Every stage either advances or ends the request with its own outcome;
/// nothing is retried and no partial result is returned.
#[instrument(skip_all)]
pub async fn identify_beer(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<BeerView>, ApiError> {
    let (media_type, image) = read_image_field(&mut multipart).await?;
    debug!(media_type = %media_type, bytes = image.len(), "image received");

    // Extraction failures of any kind collapse into one outcome carrying
    // the underlying message; the catalog is never consulted on that path.
    let name = state
        .vision
        .extract_name(&media_type, &image)
        .await
        .map_err(|err| {
            error!(%err, "name extraction failed");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        })?;
    debug!(name = %name, "extracted beer name");

    let beer = db::find_beer(&state.pool, &name)
        .await
        .map_err(|err| {
            error!(?err, "catalog lookup failed");
            ApiError::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to query database",
            )
        })?
        .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, "Beer not found in the database"))?;

    Ok(Json(BeerView::from(beer)))
}

/// Pull the `image` field out of the form, returning its declared content
/// type and its bytes. The content type is forwarded as declared, with the
/// usual fallback for unlabeled parts; nothing checks that it names a real
/// image format.
async fn read_image_field(multipart: &mut Multipart) -> Result<(String, Vec<u8>), ApiError> {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            // Exhausted the form (or could not parse it) without an `image`
            // field: the client's request is incomplete.
            Ok(None) => {
                return Err(ApiError::new(StatusCode::BAD_REQUEST, "Image is required"))
            }
            Err(err) => {
                debug!(%err, "malformed multipart form");
                return Err(ApiError::new(StatusCode::BAD_REQUEST, "Image is required"));
            }
        };
        if field.name() != Some("image") {
            continue;
        }

        let media_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let image = field.bytes().await.map_err(|err| {
            error!(%err, "failed to read upload");
            ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, "Failed to read image")
        })?;
        return Ok((media_type, image.to_vec()));
    }
}
