use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use voxfill_core::error::AppError;
use voxfill_core::ports::MediaStore;

/// The collection's media folder.
///
/// Adding a file whose name is taken by identical content reuses the
/// existing file. Different content under the same name is stored with the
/// first 8 hex digits of its SHA-256 appended to the stem.
#[derive(Debug, Clone)]
pub struct DirMediaStore {
    dir: PathBuf,
}

impl DirMediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, AppError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn suffixed_name(name: &str, hash: &str) -> String {
    let path = Path::new(name);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    match path.extension() {
        Some(ext) => format!("{}-{}.{}", stem, &hash[..8], ext.to_string_lossy()),
        None => format!("{}-{}", stem, &hash[..8]),
    }
}

impl MediaStore for DirMediaStore {
    fn add_file(&self, path: &Path) -> Result<String, AppError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::Generic(format!("Not a file: {}", path.display())))?;

        let bytes = fs::read(path)?;
        let hash = sha256_hex(&bytes);

        for candidate in [name.clone(), suffixed_name(&name, &hash)] {
            let target = self.dir.join(&candidate);
            match fs::read(&target) {
                Ok(existing) if sha256_hex(&existing) == hash => {
                    tracing::debug!(file = %candidate, "Media file already present");
                    return Ok(candidate);
                }
                Ok(_) => continue,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    fs::write(&target, &bytes)?;
                    tracing::debug!(file = %candidate, "Added media file");
                    return Ok(candidate);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Generic(format!(
            "Media name collision for {} ({})",
            name, hash
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn source(dir: &TempDir, name: &str, bytes: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn test_add_new_file() {
        let media = TempDir::new().unwrap();
        let downloads = TempDir::new().unwrap();
        let store = DirMediaStore::new(media.path()).unwrap();

        let name = store
            .add_file(&source(&downloads, "pronunciation_de_Hund.mp3", b"wuff"))
            .unwrap();
        assert_eq!(name, "pronunciation_de_Hund.mp3");
        assert_eq!(fs::read(media.path().join(&name)).unwrap(), b"wuff");
    }

    #[test]
    fn test_identical_content_is_reused() {
        let media = TempDir::new().unwrap();
        let downloads = TempDir::new().unwrap();
        let store = DirMediaStore::new(media.path()).unwrap();
        let path = source(&downloads, "a.mp3", b"same");

        assert_eq!(store.add_file(&path).unwrap(), "a.mp3");
        assert_eq!(store.add_file(&path).unwrap(), "a.mp3");
        assert_eq!(fs::read_dir(media.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_different_content_gets_suffix() {
        let media = TempDir::new().unwrap();
        let downloads = TempDir::new().unwrap();
        let store = DirMediaStore::new(media.path()).unwrap();

        store.add_file(&source(&downloads, "a.mp3", b"one")).unwrap();
        let second = store.add_file(&source(&downloads, "a.mp3", b"two")).unwrap();

        let expected = format!("a-{}.mp3", &sha256_hex(b"two")[..8]);
        assert_eq!(second, expected);
        assert_eq!(fs::read(media.path().join(&second)).unwrap(), b"two");
        assert_eq!(fs::read(media.path().join("a.mp3")).unwrap(), b"one");
    }

    #[test]
    fn test_suffixed_name() {
        assert_eq!(suffixed_name("x.mp3", "0123456789abcdef"), "x-01234567.mp3");
        assert_eq!(suffixed_name("x", "0123456789abcdef"), "x-01234567");
    }

    #[test]
    fn test_missing_source() {
        let media = TempDir::new().unwrap();
        let store = DirMediaStore::new(media.path()).unwrap();
        let result = store.add_file(&media.path().join("missing.mp3"));
        assert!(matches!(result, Err(AppError::Io(_))));
    }
}
