//! Tar archives of changed files, handed to the container-mutation
//! capability for extraction at the container root.

use std::path::Path;

use crate::error::EngineResult;
use crate::paths::PathMapping;

/// An in-memory tar archive, entries named by container path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FileArchive {
    data: Vec<u8>,
}

impl FileArchive {
    /// Build an archive containing every to-archive mapping. Entry names
    /// are container paths relative to the container root, so extraction
    /// at `/` reproduces the mapped layout.
    pub fn for_mappings(to_archive: &[PathMapping]) -> EngineResult<Self> {
        let mut builder = tar::Builder::new(Vec::new());
        for mapping in to_archive {
            let name = relative_name(&mapping.container_path);
            builder.append_path_with_name(&mapping.local_path, name)?;
        }
        let data = builder.into_inner()?;
        Ok(Self { data })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

fn relative_name(container_path: &Path) -> &Path {
    container_path
        .strip_prefix("/")
        .unwrap_or(container_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_archive_entries_named_by_container_path() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("app.py");
        std::fs::write(&local, "print('hi')").unwrap();

        let archive = FileArchive::for_mappings(&[PathMapping {
            local_path: local,
            container_path: PathBuf::from("/app/app.py"),
        }])
        .unwrap();

        let mut reader = tar::Archive::new(archive.data());
        let names: Vec<String> = reader
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().display().to_string())
            .collect();
        assert_eq!(names, vec!["app/app.py".to_string()]);
    }

    #[test]
    fn test_missing_local_file_is_an_error() {
        let result = FileArchive::for_mappings(&[PathMapping {
            local_path: PathBuf::from("/definitely/not/here.py"),
            container_path: PathBuf::from("/app/here.py"),
        }]);
        assert!(result.is_err());
    }
}
