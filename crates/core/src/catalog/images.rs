use crate::catalog::ImageResolver;
use crate::config::Settings;

/// Public objects in a Supabase storage bucket.
#[derive(Debug, Clone)]
pub struct PublicBucketImages {
    base_url: String,
    bucket: String,
}

impl PublicBucketImages {
    pub fn new(base_url: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            bucket: bucket.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Option<Self> {
        let base_url = settings.supabase_url.as_deref()?;
        Some(Self::new(base_url, settings.image_bucket.clone()))
    }
}

impl ImageResolver for PublicBucketImages {
    fn public_url(&self, image_path: Option<&str>) -> Option<String> {
        let path = image_path.map(str::trim).filter(|p| !p.is_empty())?;
        if path.starts_with("http://") || path.starts_with("https://") {
            return Some(path.to_string());
        }
        Some(format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url.trim_end_matches('/'),
            self.bucket,
            path.trim_start_matches('/')
        ))
    }
}

/// Used when no storage is configured; every racket falls back to the placeholder.
#[derive(Debug, Clone, Copy)]
pub struct NoImages;

impl ImageResolver for NoImages {
    fn public_url(&self, _image_path: Option<&str>) -> Option<String> {
        None
    }
}
