//! Image hosting adapters.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use sha1::{Digest, Sha1};

use crate::adapters::random::record_id;
use crate::application::error::{ApplicationError, Result, ToInternal};
use crate::application::ports::ImageStore;

const CLOUDINARY_API: &str = "https://api.cloudinary.com/v1_1";

/// Strips the extension and anything that is not safe in a path or public id.
fn stem(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);
    let base = base.rsplit_once('.').map_or(base, |(stem, _)| stem);

    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();

    if cleaned.is_empty() {
        "image".to_owned()
    } else {
        cleaned
    }
}

fn extension(filename: &str) -> Option<&str> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
}

/// Stores images on the local disk, served from `public_url`.
pub struct LocalImageStore {
    directory: PathBuf,
    public_url: String,
}

impl LocalImageStore {
    pub fn new(directory: impl Into<PathBuf>, public_url: &str) -> Self {
        Self {
            directory: directory.into(),
            public_url: public_url.trim_end_matches('/').to_owned(),
        }
    }
}

#[async_trait]
impl ImageStore for LocalImageStore {
    async fn upload(&self, bytes: Vec<u8>, filename: &str, folder: &str) -> Result<String> {
        let name = match extension(filename) {
            Some(ext) => format!("{}-{}.{ext}", stem(filename), record_id()),
            None => format!("{}-{}", stem(filename), record_id()),
        };

        let target = self.directory.join(folder);
        tokio::fs::create_dir_all(&target).await.catch()?;
        tokio::fs::write(target.join(&name), bytes).await.catch()?;

        Ok(format!("{}/{folder}/{name}", self.public_url))
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
}

/// Signed uploads to Cloudinary.
pub struct CloudinaryImageStore {
    client: Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryImageStore {
    pub fn new(cloud_name: &str, api_key: &str, api_secret: &str) -> Self {
        Self {
            client: Client::new(),
            cloud_name: cloud_name.to_owned(),
            api_key: api_key.to_owned(),
            api_secret: api_secret.to_owned(),
        }
    }

    /// Parameters are signed in alphabetical order, followed by the secret.
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut params = params.to_vec();
        params.sort_by(|a, b| a.0.cmp(b.0));

        let payload = params
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join("&");

        hex::encode(Sha1::digest(format!("{payload}{}", self.api_secret)))
    }
}

#[async_trait]
impl ImageStore for CloudinaryImageStore {
    async fn upload(&self, bytes: Vec<u8>, filename: &str, folder: &str) -> Result<String> {
        let timestamp = Utc::now().timestamp().to_string();
        let public_id = format!("{}-{timestamp}-{}", stem(filename), record_id());
        let signature = self.sign(&[
            ("folder", folder),
            ("overwrite", "true"),
            ("public_id", &public_id),
            ("timestamp", &timestamp),
        ]);

        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(filename.to_owned()))
            .text("api_key", self.api_key.clone())
            .text("folder", folder.to_owned())
            .text("overwrite", "true")
            .text("public_id", public_id)
            .text("timestamp", timestamp)
            .text("signature", signature);

        let response = self
            .client
            .post(format!("{CLOUDINARY_API}/{}/image/upload", self.cloud_name))
            .multipart(form)
            .send()
            .await
            .catch()?;

        if !response.status().is_success() {
            tracing::error!(status = %response.status(), "image upload refused");
            return Err(ApplicationError::internal_message("Failed to upload image!"));
        }

        let body = response.json::<UploadResponse>().await.catch()?;
        Ok(body.secure_url)
    }
}

/// Store that only remembers what it was given.
#[cfg(test)]
#[derive(Default)]
pub struct RecordingImageStore {
    uploads: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl RecordingImageStore {
    /// `folder/filename` of every upload.
    pub fn uploads(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl ImageStore for RecordingImageStore {
    async fn upload(&self, _bytes: Vec<u8>, filename: &str, folder: &str) -> Result<String> {
        self.uploads
            .lock()
            .unwrap()
            .push(format!("{folder}/{filename}"));
        Ok(format!("https://images.test/{folder}/{filename}"))
    }
}
