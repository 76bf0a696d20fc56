use std::io;
use std::path::{Path, PathBuf};

use tokio::fs;

use crate::host::{BoxFuture, DirEntryInfo, FileSystem};

/// [`FileSystem`] backed by `tokio::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioFs;

impl FileSystem for TokioFs {
    fn read_dir(
        &self,
        path: &Path,
    ) -> BoxFuture<'static, io::Result<Vec<io::Result<DirEntryInfo>>>> {
        let path = path.to_path_buf();
        Box::pin(async move {
            let mut reader = fs::read_dir(&path).await?;
            let mut entries = Vec::new();
            loop {
                match reader.next_entry().await {
                    Ok(Some(entry)) => entries.push(describe(entry).await),
                    Ok(None) => break,
                    Err(err) => {
                        entries.push(Err(err));
                        break;
                    },
                }
            }
            Ok(entries)
        })
    }

    fn exists(&self, path: &Path) -> BoxFuture<'static, bool> {
        let path = path.to_path_buf();
        Box::pin(async move { fs::try_exists(&path).await.unwrap_or(false) })
    }

    fn remove(&self, path: &Path) -> BoxFuture<'static, io::Result<()>> {
        let path = path.to_path_buf();
        Box::pin(async move {
            if fs::symlink_metadata(&path).await?.is_dir() {
                fs::remove_dir_all(&path).await
            } else {
                fs::remove_file(&path).await
            }
        })
    }

    fn rename(
        &self,
        from: &Path,
        to: &Path,
    ) -> BoxFuture<'static, io::Result<()>> {
        let from = from.to_path_buf();
        let to = to.to_path_buf();
        Box::pin(async move { fs::rename(&from, &to).await })
    }

    fn copy(
        &self,
        from: &Path,
        to: &Path,
    ) -> BoxFuture<'static, io::Result<()>> {
        copy_recursive(from.to_path_buf(), to.to_path_buf())
    }
}

async fn describe(entry: fs::DirEntry) -> io::Result<DirEntryInfo> {
    let file_type = entry.file_type().await?;
    let path = entry.path();
    // Follows symlinks, so a link to a directory lists as a directory.
    let metadata = fs::metadata(&path).await?;

    Ok(DirEntryInfo {
        name: entry.file_name().to_string_lossy().to_string(),
        is_dir: metadata.is_dir(),
        is_symlink: file_type.is_symlink(),
        readonly: metadata.permissions().readonly(),
        executable: is_executable(&metadata),
        size: metadata.is_file().then(|| metadata.len()),
        path,
    })
}

#[cfg(unix)]
fn is_executable(metadata: &std::fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;

    metadata.is_file() && metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &std::fs::Metadata) -> bool {
    false
}

fn copy_recursive(
    from: PathBuf,
    to: PathBuf,
) -> BoxFuture<'static, io::Result<()>> {
    Box::pin(async move {
        if !fs::metadata(&from).await?.is_dir() {
            fs::copy(&from, &to).await?;
            return Ok(());
        }

        fs::create_dir_all(&to).await?;
        let mut reader = fs::read_dir(&from).await?;
        while let Some(entry) = reader.next_entry().await? {
            copy_recursive(entry.path(), to.join(entry.file_name())).await?;
        }
        Ok(())
    })
}
