//! Response compression layer.

use tower_http::compression::CompressionLayer;

/// Gzip for every response the client accepts it for.
pub fn build_compression_layer() -> CompressionLayer {
    CompressionLayer::new().gzip(true)
}
