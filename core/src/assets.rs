use std::collections::HashMap;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AssetError {
    #[error("asset {path} not found")]
    NotFound { path: String },
    #[error("fetching {path} failed: {reason}")]
    Fetch { path: String, reason: String },
}

/// Read-only text assets: course manifests and illustrations.
#[allow(async_fn_in_trait)]
pub trait AssetSource {
    async fn fetch_text(&self, path: &str) -> Result<String, AssetError>;
}

pub fn manifest_path(manifest_dir: &str, course: &str) -> String {
    format!("{}/{course}.txt", manifest_dir.trim_end_matches('/'))
}

pub fn illustration_path(illustration_dir: &str, course: &str, file: &str) -> String {
    format!("{}/{course}/{file}", illustration_dir.trim_end_matches('/'))
}

/// One relative file name per line; blank lines and trailing whitespace
/// are dropped.
pub fn parse_manifest(text: &str) -> Vec<String> {
    text.trim_end()
        .split('\n')
        .map(|line| line.trim_end_matches('\r').trim_end())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Manifests fetched so far, by course.
#[derive(Clone, Debug, Default)]
pub struct ManifestCache {
    entries: HashMap<String, Vec<String>>,
}

impl ManifestCache {
    pub fn get(&self, course: &str) -> Option<&[String]> {
        self.entries.get(course).map(Vec::as_slice)
    }

    pub fn contains(&self, course: &str) -> bool {
        self.entries.contains_key(course)
    }

    /// Cached manifest of `course`, fetching it on first use.
    pub async fn load<S: AssetSource + ?Sized>(
        &mut self,
        source: &S,
        manifest_dir: &str,
        course: &str,
    ) -> Result<&[String], AssetError> {
        if !self.entries.contains_key(course) {
            let path = manifest_path(manifest_dir, course);
            let text = source.fetch_text(&path).await?;
            let files = parse_manifest(&text);
            tracing::debug!(course, files = files.len(), "manifest cached");
            self.entries.insert(course.to_string(), files);
        }
        Ok(self.get(course).unwrap_or_default())
    }
}
