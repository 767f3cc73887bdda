//! CORS middleware configuration.

use tower_http::cors::CorsLayer;

/// Create a CORS layer with permissive settings.
///
/// Browsers only ever reach the API with a bearer token, so origins are not
/// restricted here.
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::permissive()
}
