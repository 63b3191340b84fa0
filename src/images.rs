use serde::Deserialize;

use crate::state::ImageHostConfig;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    data: UploadData,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    url: String,
}

/// Hands an uploaded avatar to the configured image host and returns the
/// public URL the host serves it under.
pub async fn upload_image(
    config: &ImageHostConfig,
    filename: &str,
    bytes: Vec<u8>,
) -> Result<String, reqwest::Error> {
    let part = reqwest::multipart::Part::bytes(bytes).file_name(filename.to_string());
    let form = reqwest::multipart::Form::new().part("image", part);

    let response = reqwest::Client::new()
        .post(&config.upload_url)
        .query(&[("key", config.api_key.as_str())])
        .multipart(form)
        .send()
        .await?
        .error_for_status()?;

    let parsed: UploadResponse = response.json().await?;
    Ok(parsed.data.url)
}
