//! # TV Placement Preview
//!
//! Sends the customer's wall photo to the OpenAI image edit endpoint with a
//! prompt describing the TV, and returns the edited image as base64.

use super::{IntegrationError, PlacementPreviewer, json_body, send, trim_base};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tvmount_core::{ImageFormat, Photo};

const SERVICE: &str = "OpenAI";

/// What to render and onto which photo.
#[derive(Debug, Clone)]
pub struct PreviewRequest {
    pub photo: Photo,
    pub size_inches: u16,
    /// Display name of the mount, e.g. "Full-motion mount".
    pub mount: Option<String>,
    /// Display name of the wall, e.g. "Brick".
    pub wall: Option<String>,
}

/// The rendered image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preview {
    pub image_base64: String,
    pub content_type: String,
    pub prompt: String,
}

/// The edit instruction sent with the photo.
pub fn placement_prompt(request: &PreviewRequest) -> String {
    let mut prompt = format!(
        "Add a realistic, wall-mounted {}-inch flat-screen TV to this photo, \
         centered on the main wall at a comfortable viewing height",
        request.size_inches
    );
    if let Some(mount) = &request.mount {
        let mount = mount.to_lowercase();
        let mount = mount.trim_end_matches(" mount");
        prompt.push_str(&format!(", on a {} mount", mount));
    }
    if let Some(wall) = &request.wall {
        prompt.push_str(&format!(", on a {} wall", wall.to_lowercase()));
    }
    prompt.push_str(
        ". The screen is off and black. Keep the room, lighting and perspective \
         unchanged, and keep the TV to scale with the furniture.",
    );
    prompt
}

#[derive(Deserialize)]
struct EditResponse {
    #[serde(default)]
    data: Vec<EditImage>,
}

#[derive(Deserialize)]
struct EditImage {
    b64_json: Option<String>,
}

pub struct OpenAiPreviewer {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    size: String,
}

impl OpenAiPreviewer {
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: &str,
        model: &str,
        size: &str,
    ) -> Self {
        Self {
            http,
            base_url: trim_base(base_url),
            api_key: api_key.to_string(),
            model: model.to_string(),
            size: size.to_string(),
        }
    }
}

#[async_trait]
impl PlacementPreviewer for OpenAiPreviewer {
    async fn preview(&self, request: &PreviewRequest) -> Result<Preview, IntegrationError> {
        let prompt = placement_prompt(request);
        let format = request.photo.format;

        let image = reqwest::multipart::Part::bytes(request.photo.bytes.clone())
            .file_name(format!("wall.{}", format.extension()))
            .mime_str(format.content_type())
            .map_err(|e| IntegrationError::InvalidRequest(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("model", self.model.clone())
            .text("prompt", prompt.clone())
            .text("size", self.size.clone())
            .text("n", "1")
            .part("image", image);

        tracing::info!(
            event = "preview_requested",
            photo = %request.photo.id.as_str(),
            size_inches = request.size_inches,
            "Requesting placement preview"
        );

        let req = self
            .http
            .post(format!("{}/v1/images/edits", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form);
        let resp = send(SERVICE, req).await?;
        let body: EditResponse = json_body(SERVICE, resp).await?;

        let image_base64 = body
            .data
            .into_iter()
            .find_map(|d| d.b64_json)
            .ok_or_else(|| IntegrationError::Parse {
                service: SERVICE,
                message: "response has no image".to_string(),
            })?;

        let bytes = STANDARD
            .decode(image_base64.as_bytes())
            .map_err(|e| IntegrationError::Parse {
                service: SERVICE,
                message: format!("invalid base64 image: {e}"),
            })?;
        let content_type = ImageFormat::detect(&bytes)
            .unwrap_or(ImageFormat::Png)
            .content_type()
            .to_string();

        Ok(Preview {
            image_base64,
            content_type,
            prompt,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mount: Option<&str>, wall: Option<&str>) -> PreviewRequest {
        let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        bytes.extend_from_slice(&[0u8; 16]);
        PreviewRequest {
            photo: Photo::from_bytes(bytes).expect("png"),
            size_inches: 65,
            mount: mount.map(str::to_string),
            wall: wall.map(str::to_string),
        }
    }

    #[test]
    fn prompt_mentions_size() {
        let prompt = placement_prompt(&request(None, None));
        assert!(prompt.contains("65-inch"));
        assert!(!prompt.contains("mount,"));
    }

    #[test]
    fn prompt_includes_mount_and_wall() {
        let prompt = placement_prompt(&request(Some("Full motion"), Some("Brick")));
        assert!(prompt.contains("on a full motion mount"));
        assert!(prompt.contains("on a brick wall"));
    }

    #[test]
    fn prompt_does_not_repeat_mount() {
        let prompt = placement_prompt(&request(Some("Tilting mount"), None));
        assert!(prompt.contains("on a tilting mount."));
        assert!(!prompt.contains("mount mount"));
    }
}
