use anyhow::Result;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Image types accepted on post creation. Anything else is rejected before a
/// post record is written.
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif"];

pub const ALLOWED_MIME_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Lowercased extension of `filename` if it is on the allow-list.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let ext = Path::new(filename)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// On-disk storage for uploaded post images.
///
/// Each image is a flat file at `{dir}/{name}`, served back under the
/// `/uploads/` static path recorded on the post.
pub struct Storage {
    dir: PathBuf,
}

impl Storage {
    pub async fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir).await?;
        info!("Upload directory: {}", dir.display());
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn image_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub async fn save_image(&self, name: &str, data: &[u8]) -> Result<()> {
        fs::write(self.image_path(name), data).await?;
        Ok(())
    }

    pub async fn delete_image(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.image_path(name)).await {
            Ok(()) => {
                info!("Deleted image {}", name);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Image {} already gone", name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Public URL an image is served under.
    pub fn public_url(name: &str) -> String {
        format!("/uploads/{name}")
    }

    /// The stored file name when `url` points at this server's upload path.
    /// Third-party image URLs return None and are never touched on delete.
    pub fn local_name(url: &str) -> Option<&str> {
        url.strip_prefix("/uploads/")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_allow_list() {
        assert_eq!(allowed_extension("cat.png"), Some("png".to_string()));
        assert_eq!(allowed_extension("CAT.JPG"), Some("jpg".to_string()));
        assert_eq!(allowed_extension("archive.tar.gif"), Some("gif".to_string()));
        assert_eq!(allowed_extension("notes.txt"), None);
        assert_eq!(allowed_extension("no-extension"), None);
        assert_eq!(allowed_extension("script.png.exe"), None);
    }

    #[test]
    fn local_names_only_for_own_uploads() {
        assert_eq!(Storage::local_name("/uploads/a.png"), Some("a.png"));
        assert_eq!(Storage::local_name("https://imgur.com/a.png"), None);
    }
}
