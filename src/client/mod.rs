//! Outbound HTTP: the authenticated backend client and the media-host
//! upload client.

mod api;
mod transform;
mod upload;

pub use api::{ApiClient, ApiRequest, Credential};
pub(crate) use api::to_body;
pub use transform::{AssetTransform, ImageDownscaler, TransformError};
pub use upload::{AssetBlob, AssetUploader, PublicUrl};

pub(crate) fn user_agent() -> &'static str {
    concat!("newsroom/", env!("CARGO_PKG_VERSION"))
}
