//! Google Cloud Storage sampling via the JSON API.
//!
//! Listing and media download go over plain HTTPS against
//! `storage.googleapis.com`. Public buckets need no credentials; a bearer
//! token for private buckets can be supplied through `CLIPSCORE_GCS_TOKEN`.

use anyhow::{anyhow, Context, Result};
use rand::Rng;
use serde::Deserialize;
use std::io::Read;

use super::{has_image_extension, sample_without_replacement, NamedImage, SourceError};

const STORAGE_API: &str = "https://storage.googleapis.com/storage/v1";

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    items: Vec<ObjectEntry>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ObjectEntry {
    name: String,
}

/// A GCS bucket/prefix to sample generated images from
pub struct GcsImageSource {
    bucket: String,
    prefix: String,
    token: Option<String>,
}

impl GcsImageSource {
    pub fn new(bucket: &str, prefix: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            token: std::env::var("CLIPSCORE_GCS_TOKEN").ok(),
        }
    }

    /// Sample and decode up to `max_count` images under the prefix.
    ///
    /// Errors when the prefix holds no matching objects; otherwise returns
    /// `min(max_count, available)` images.
    pub fn load_random_images<R: Rng>(
        &self,
        max_count: usize,
        rng: &mut R,
    ) -> Result<Vec<NamedImage>> {
        let names: Vec<String> = self
            .list_object_names()?
            .into_iter()
            .filter(|name| has_image_extension(name))
            .collect();

        if names.is_empty() {
            return Err(SourceError::NoMatchingImages(format!(
                "gs://{}/{}",
                self.bucket, self.prefix
            ))
            .into());
        }

        let selected = sample_without_replacement(names, max_count, rng);
        tracing::info!(
            bucket = %self.bucket,
            prefix = %self.prefix,
            count = selected.len(),
            "Sampling images from GCS"
        );

        let mut images = Vec::with_capacity(selected.len());
        for name in selected {
            let bytes = self.download(&name)?;
            let image = image::load_from_memory(&bytes)
                .with_context(|| format!("Failed to decode {}", name))?;
            images.push(NamedImage { name, image });
        }

        Ok(images)
    }

    /// List object names under the prefix, following pagination
    fn list_object_names(&self) -> Result<Vec<String>> {
        let url = format!("{}/b/{}/o", STORAGE_API, self.bucket);
        let mut names = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = ureq::get(&url)
                .query("prefix", &self.prefix)
                .query("fields", "items(name),nextPageToken");
            if let Some(token) = &page_token {
                request = request.query("pageToken", token);
            }
            if let Some(bearer) = &self.token {
                request = request.set("Authorization", &format!("Bearer {}", bearer));
            }

            let response: ListResponse = request
                .call()
                .map_err(|e| {
                    anyhow!("Failed to list gs://{}/{}: {}", self.bucket, self.prefix, e)
                })?
                .into_json()
                .context("Malformed object listing")?;

            names.extend(response.items.into_iter().map(|entry| entry.name));

            match response.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(names)
    }

    /// Download one object's raw bytes
    fn download(&self, name: &str) -> Result<Vec<u8>> {
        let url = format!(
            "{}/b/{}/o/{}?alt=media",
            STORAGE_API,
            self.bucket,
            percent_encode(name)
        );

        let mut request = ureq::get(&url);
        if let Some(bearer) = &self.token {
            request = request.set("Authorization", &format!("Bearer {}", bearer));
        }

        let response = request
            .call()
            .map_err(|e| anyhow!("Failed to download {}: {}", name, e))?;

        let mut bytes = Vec::new();
        response.into_reader().read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

/// Percent-encode an object name for the `/o/{object}` path segment
fn percent_encode(name: &str) -> String {
    let mut encoded = String::with_capacity(name.len());
    for byte in name.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                encoded.push(byte as char);
            }
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_response_parsing() {
        let body = r#"{
            "items": [
                {"name": "checkpoints/512000/0001.png"},
                {"name": "checkpoints/512000/0002.jpg"}
            ],
            "nextPageToken": "CiQ"
        }"#;
        let parsed: ListResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.items.len(), 2);
        assert_eq!(parsed.items[0].name, "checkpoints/512000/0001.png");
        assert_eq!(parsed.next_page_token.as_deref(), Some("CiQ"));
    }

    #[test]
    fn test_list_response_final_page() {
        let parsed: ListResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.items.is_empty());
        assert!(parsed.next_page_token.is_none());
    }

    #[test]
    fn test_percent_encode_object_names() {
        assert_eq!(
            percent_encode("checkpoints/512000/img 1.png"),
            "checkpoints%2F512000%2Fimg%201.png"
        );
        assert_eq!(percent_encode("plain-name_1.jpg"), "plain-name_1.jpg");
    }
}
