use std::path::{Component, Path, PathBuf};

use axum::body::Bytes;
use uuid::Uuid;

use crate::core::{
    constants::{IMAGE_EXTENSIONS, UPLOADS_URL_PREFIX},
    enums::ImagePolicy,
    error::AppError,
};

/// 从 multipart 请求中读出的一个文件
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

/// 本地上传目录：`<root>/<folder>/<uuid>.<ext>`，数据库中保存为 `uploads/<folder>/<file>`。
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_size: usize,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>, max_size: usize) -> Self {
        Self {
            root: root.into(),
            max_size,
        }
    }

    /// 校验并写入文件，返回存入数据库的相对路径。
    pub async fn save(&self, folder: &str, file: &UploadedFile) -> Result<String, AppError> {
        let ext = self.validate(file)?;

        let dir = self.root.join(folder);
        tokio::fs::create_dir_all(&dir).await?;

        let file_name = format!("{}.{}", Uuid::new_v4(), ext);
        tokio::fs::write(dir.join(&file_name), &file.bytes).await?;

        let stored = format!("{}/{}/{}", UPLOADS_URL_PREFIX, folder, file_name);
        tracing::info!(
            original = %file.file_name,
            stored = %stored,
            size = file.bytes.len(),
            "📁 File uploaded"
        );
        Ok(stored)
    }

    /// 批量保存；中途失败时清理已写入的文件。
    pub async fn save_all(
        &self,
        folder: &str,
        files: &[UploadedFile],
    ) -> Result<Vec<String>, AppError> {
        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            match self.save(folder, file).await {
                Ok(path) => stored.push(path),
                Err(e) => {
                    self.remove_all(&stored).await;
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    /// 删除一个已存储的文件。文件不存在视为成功。
    pub async fn remove(&self, stored: &str) -> Result<(), AppError> {
        let path = self.resolve(stored)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!("🗑️ File removed: {}", stored);
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// 删除多个文件，失败只记录日志（文件删除与数据库写入本就不在同一事务中）。
    pub async fn remove_all(&self, stored: &[String]) {
        for path in stored {
            if let Err(e) = self.remove(path).await {
                tracing::warn!("⚠️ Failed to remove {}: {}", path, e);
            }
        }
    }

    fn validate(&self, file: &UploadedFile) -> Result<String, AppError> {
        if file.bytes.is_empty() {
            return Err(AppError::BadRequest(format!("Empty file: {}", file.file_name)));
        }
        if file.bytes.len() > self.max_size {
            return Err(AppError::BadRequest(format!(
                "File too large. Maximum size is {} bytes",
                self.max_size
            )));
        }

        let ext = Path::new(&file.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .ok_or_else(|| {
                AppError::BadRequest(format!("Invalid file extension for: {}", file.file_name))
            })?;

        if !IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return Err(AppError::BadRequest(format!(
                "Unsupported file format '{}'. Supported: {}",
                ext,
                IMAGE_EXTENSIONS.join(", ")
            )));
        }
        Ok(ext)
    }

    /// 相对路径映射为磁盘路径，拒绝跳出上传根目录的路径。
    fn resolve(&self, stored: &str) -> Result<PathBuf, AppError> {
        let relative = stored
            .strip_prefix(UPLOADS_URL_PREFIX)
            .and_then(|rest| rest.strip_prefix('/'))
            .ok_or_else(|| AppError::BadRequest(format!("Not an upload path: {}", stored)))?;

        let relative = Path::new(relative);
        if !relative.components().all(|c| matches!(c, Component::Normal(_))) {
            return Err(AppError::BadRequest(format!("Invalid upload path: {}", stored)));
        }
        Ok(self.root.join(relative))
    }
}

/// 编辑时新旧图片的对账结果
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageChanges {
    /// 持久化的新图片列表
    pub images: Vec<String>,
    /// 需要从磁盘删除的文件
    pub to_delete: Vec<String>,
}

/// 计算编辑后的图片列表：`to_delete = old - existing`，新上传文件追加在保留项之后。
///
/// - `existing` 为 `None` 表示客户端未提交该字段，旧图片全部保留；
/// - `existing` 中不属于旧列表的路径被忽略；
/// - `Single` 策略只保留最后一张，其余（包括多余的新上传）一并删除。
pub fn reconcile_images(
    old: &[String],
    existing: Option<&[String]>,
    uploaded: Vec<String>,
    policy: ImagePolicy,
) -> ImageChanges {
    let (mut images, mut to_delete): (Vec<String>, Vec<String>) = match existing {
        Some(keep) => old.iter().cloned().partition(|img| keep.contains(img)),
        None => (old.to_vec(), Vec::new()),
    };
    images.extend(uploaded);

    match policy {
        ImagePolicy::Multiple => {}
        ImagePolicy::Single if images.len() > 1 => {
            let newest = images.split_off(images.len() - 1);
            to_delete.append(&mut images);
            images = newest;
        }
        ImagePolicy::Single => {}
        ImagePolicy::None => to_delete.append(&mut images),
    }

    ImageChanges { images, to_delete }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn upload(file_name: &str, bytes: &'static [u8]) -> UploadedFile {
        UploadedFile { file_name: file_name.into(), bytes: Bytes::from_static(bytes) }
    }

    #[test]
    fn reconcile_drops_unlisted_and_appends_uploads() {
        let old = paths(&["A", "B", "C"]);
        let keep = paths(&["A", "C"]);
        let changes = reconcile_images(&old, Some(&keep), paths(&["D"]), ImagePolicy::Multiple);

        assert_eq!(changes.images, paths(&["A", "C", "D"]));
        assert_eq!(changes.to_delete, paths(&["B"]));
    }

    #[test]
    fn reconcile_without_existing_keeps_everything() {
        let old = paths(&["A", "B"]);
        let changes = reconcile_images(&old, None, paths(&["C"]), ImagePolicy::Multiple);
        assert_eq!(changes.images, paths(&["A", "B", "C"]));
        assert!(changes.to_delete.is_empty());
    }

    #[test]
    fn reconcile_ignores_foreign_paths() {
        let old = paths(&["A"]);
        let keep = paths(&["A", "uploads/other/x.jpg"]);
        let changes = reconcile_images(&old, Some(&keep), vec![], ImagePolicy::Multiple);
        assert_eq!(changes.images, paths(&["A"]));
    }

    #[test]
    fn single_policy_keeps_newest() {
        let old = paths(&["A"]);
        let changes = reconcile_images(&old, None, paths(&["B"]), ImagePolicy::Single);
        assert_eq!(changes.images, paths(&["B"]));
        assert_eq!(changes.to_delete, paths(&["A"]));
    }

    #[tokio::test]
    async fn save_and_remove_round_trip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 1024);
        let file = upload("Photo.JPG", b"fake-jpeg");

        let stored = store.save("products", &file).await.unwrap();
        assert!(stored.starts_with("uploads/products/"));
        assert!(stored.ends_with(".jpg"));

        let on_disk = dir.path().join(stored.trim_start_matches("uploads/"));
        assert!(on_disk.exists());

        store.remove(&stored).await.unwrap();
        assert!(!on_disk.exists());
        // 再次删除不存在的文件不报错
        store.remove(&stored).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_bad_uploads_and_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), 4);

        let too_big = upload("a.png", b"12345");
        assert!(matches!(store.save("x", &too_big).await, Err(AppError::BadRequest(_))));

        let wrong_ext = upload("a.exe", b"12");
        assert!(matches!(store.save("x", &wrong_ext).await, Err(AppError::BadRequest(_))));

        assert!(matches!(store.remove("uploads/../secret").await, Err(AppError::BadRequest(_))));
        assert!(matches!(store.remove("/etc/passwd").await, Err(AppError::BadRequest(_))));
    }
}
