pub mod health;

use axum::routing::post;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Path of the text-to-image endpoint, matching the image service's own.
pub const TXT2IMG_ROUTE: &str = "/sdapi/v1/txt2img";

/// Build the job-submission route tree.
pub fn api_routes() -> Router<AppState> {
    Router::new().route(TXT2IMG_ROUTE, post(handlers::txt2img::txt2img))
}
