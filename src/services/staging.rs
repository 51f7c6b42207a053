use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A request's private copy of the input image. The directory and anything the
/// stages write into it are removed on drop.
pub struct StagedImage {
    _dir: TempDir,
    pub image: PathBuf,
}

/// Copies `source` into a fresh, randomly named directory under `root`.
pub async fn stage_image(root: &Path, source: &Path) -> std::io::Result<StagedImage> {
    tokio::fs::create_dir_all(root).await?;
    let dir = tempfile::Builder::new().prefix("horizon-").tempdir_in(root)?;
    let ext = source
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "img".to_string());
    let image = dir.path().join(format!("input.{ext}"));
    tokio::fs::copy(source, &image).await?;
    Ok(StagedImage { _dir: dir, image })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn concurrent_requests_get_distinct_directories() {
        let root = TempDir::new().expect("root");
        let src = root.path().join("photo.JPG");
        std::fs::write(&src, b"jpeg").expect("write source");

        let a = stage_image(root.path(), &src).await.expect("stage a");
        let b = stage_image(root.path(), &src).await.expect("stage b");
        assert_ne!(a.image.parent(), b.image.parent());
        assert_eq!(a.image.file_name().and_then(|n| n.to_str()), Some("input.jpg"));
        assert_eq!(std::fs::read(&b.image).expect("read copy"), b"jpeg");

        let dir = a.image.parent().expect("staging dir").to_path_buf();
        drop(a);
        assert!(!dir.exists());
    }

    #[tokio::test]
    async fn missing_source_is_an_error() {
        let root = TempDir::new().expect("root");
        assert!(stage_image(root.path(), &root.path().join("absent.jpg")).await.is_err());
    }
}
