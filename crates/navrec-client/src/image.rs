use navrec_common::protocol::Result;
use serde::Deserialize;
use serde_json::json;

use crate::channel::RpcChannel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Rgb8,
    Greyscale8,
    DepthU16,
    #[serde(other)]
    Unknown,
}

/// One captured image from a robot camera source.
#[derive(Debug, Clone, Deserialize)]
pub struct ImageCapture {
    pub source: String,
    pub rows: u32,
    pub cols: u32,
    pub pixel_format: PixelFormat,
    #[serde(with = "navrec_common::b64")]
    pub data: Vec<u8>,
}

#[derive(Deserialize)]
struct GetImageResponse {
    images: Vec<ImageCapture>,
}

/// Client for the image service.
pub struct ImageClient<C> {
    channel: C,
}

impl<C: RpcChannel> ImageClient<C> {
    pub fn new(channel: C) -> Self {
        Self { channel }
    }

    /// Captures one image from each of the named sources, in order.
    pub fn get_image_from_sources(&self, sources: &[&str]) -> Result<Vec<ImageCapture>> {
        let value = self
            .channel
            .call("image.get_image_from_sources", json!({"sources": sources}))?;
        let response: GetImageResponse = serde_json::from_value(value)?;
        Ok(response.images)
    }
}
