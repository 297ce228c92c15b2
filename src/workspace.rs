use std::{io, path::Path, path::PathBuf};

use tokio::fs;

/// Lists the regular files directly inside `dir`, sorted by path.
///
/// Subdirectories are not descended into. A missing directory yields an
/// empty list.
pub async fn list_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => return Err(err),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        // follows symlinks, like a plain is-file check would
        if fs::metadata(entry.path()).await.is_ok_and(|meta| meta.is_file()) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn lists_only_top_level_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.txt"), "b").unwrap();
        std::fs::write(dir.path().join("a.md"), "a").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        std::fs::write(dir.path().join("nested").join("deep.txt"), "d").unwrap();

        let files = list_files(dir.path()).await.unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.md"), dir.path().join("b.txt")]
        );
    }

    #[tokio::test]
    async fn missing_directory_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let files = list_files(&dir.path().join("nope")).await.unwrap();
        assert!(files.is_empty());
    }
}
