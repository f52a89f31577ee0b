//! Static web assets.
//!
//! The dashboard, stylesheet and script are compiled into the binary. An
//! optional directory can shadow them, which allows editing the page on
//! the device without rebuilding.

use std::borrow::Cow;
use std::path::PathBuf;
use thiserror::Error;

/// Bundled assets, by name
const BUNDLED: &[(&str, &[u8])] = &[
    ("index.html", include_bytes!("../../assets/index.html")),
    ("style.css", include_bytes!("../../assets/style.css")),
    ("script.js", include_bytes!("../../assets/script.js")),
];

/// Asset errors
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Unknown asset: {0}")]
    Unknown(String),

    #[error("Failed to read asset {name}: {source}")]
    ReadError {
        name: String,
        source: std::io::Error,
    },
}

/// Source of HTML, CSS and JS bodies
#[derive(Debug, Clone, Default)]
pub struct AssetStore {
    override_dir: Option<PathBuf>,
}

impl AssetStore {
    /// Store serving only the bundled files
    #[allow(dead_code)]
    pub fn bundled() -> Self {
        Self { override_dir: None }
    }

    /// Store preferring files from `dir` over the bundled ones
    pub fn with_override_dir(dir: Option<PathBuf>) -> Self {
        Self { override_dir: dir }
    }

    /// Read a whole asset
    ///
    /// Only names of bundled assets are accepted, so a lookup can never leave
    /// the override directory.
    pub async fn read(&self, name: &str) -> Result<Cow<'static, [u8]>, AssetError> {
        let bundled = BUNDLED
            .iter()
            .find(|(asset, _)| *asset == name)
            .map(|(_, bytes)| *bytes)
            .ok_or_else(|| AssetError::Unknown(name.to_string()))?;

        let Some(dir) = &self.override_dir else {
            return Ok(Cow::Borrowed(bundled));
        };

        let path = dir.join(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Cow::Owned(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{} not in override dir, using bundled copy", name);
                Ok(Cow::Borrowed(bundled))
            }
            Err(source) => Err(AssetError::ReadError {
                name: name.to_string(),
                source,
            }),
        }
    }

    /// Read an asset as UTF-8 text
    pub async fn read_text(&self, name: &str) -> Result<String, AssetError> {
        let bytes = self.read(name).await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("helios-assets-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn bundled_assets_are_present() {
        let store = AssetStore::bundled();
        for name in ["index.html", "style.css", "script.js"] {
            assert!(!store.read(name).await.unwrap().is_empty(), "{name}");
        }
    }

    #[tokio::test]
    async fn unknown_name_is_rejected() {
        let store = AssetStore::bundled();
        assert!(matches!(
            store.read("../config.json").await,
            Err(AssetError::Unknown(_))
        ));
    }

    #[tokio::test]
    async fn override_dir_shadows_bundled_copy() {
        let dir = scratch_dir("override");
        std::fs::write(dir.join("style.css"), "body{color:red}").unwrap();

        let store = AssetStore::with_override_dir(Some(dir.clone()));
        assert_eq!(&*store.read("style.css").await.unwrap(), b"body{color:red}");
        // Files missing from the directory fall back to the bundle
        assert_eq!(
            store.read("script.js").await.unwrap(),
            AssetStore::bundled().read("script.js").await.unwrap()
        );

        std::fs::remove_dir_all(dir).unwrap();
    }
}
