use std::collections::BTreeSet;
use std::io::Result;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use walkdir::WalkDir;

pub type Entries = BTreeSet<Entry>;

/// A file below some root. Ordering is by relative path first, which is also the order feed files
/// are processed in.
#[derive(Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Entry {
    pub file_name: PathBuf,
    pub len: u64,
    pub modified: SystemTime,
}

pub fn read_dir(path: &Path) -> Result<Entries> {
    let mut set = BTreeSet::new();
    for entry in WalkDir::new(path).min_depth(1).follow_links(true) {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_file() {
            set.insert(Entry {
                file_name: entry
                    .path()
                    .strip_prefix(path)
                    .unwrap_or_else(|_| entry.path())
                    .to_path_buf(),
                len: metadata.len(),
                modified: metadata.modified()?,
            });
        }
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::read_dir;
    use std::fs;
    use std::path::PathBuf;

    #[test]
    fn test_read_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::write(dir.path().join("b/002.json"), "{}").unwrap();
        fs::write(dir.path().join("a.json"), "[]\n").unwrap();
        fs::write(dir.path().join("b/001.json.gz"), "").unwrap();

        let entries = read_dir(dir.path()).unwrap();
        let names: Vec<PathBuf> = entries.iter().map(|e| e.file_name.clone()).collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.json"),
                PathBuf::from("b/001.json.gz"),
                PathBuf::from("b/002.json"),
            ]
        );
        assert_eq!(entries.iter().next().map(|e| e.len), Some(3));
    }
}
