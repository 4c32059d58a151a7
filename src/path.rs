use crate::error::{FsError, Result};

/// Splits a path into its components, discarding empty ones, so
/// `"/docs//a.txt"` and `"/docs/a.txt/"` both yield `["docs", "a.txt"]`.
/// The root itself has no components.
pub fn components(path: &str) -> Vec<&str> {
    path.split('/').filter(|part| !part.is_empty()).collect()
}

/// Splits a path into its parent's components and its final name.
///
/// The root has no final name, so paths that reduce to it are rejected:
/// entries are always created, removed, and renamed *inside* a directory.
pub fn split_parent(path: &str) -> Result<(Vec<&str>, &str)> {
    let mut parts = components(path);

    let name = parts
        .pop()
        .ok_or_else(|| FsError::InvalidPath(format!("no final component in {path:?}")))?;

    Ok((parts, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_components() {
        assert_eq!(components("/docs/a.txt"), vec!["docs", "a.txt"]);
        assert_eq!(components("//docs//a.txt/"), vec!["docs", "a.txt"]);
        assert_eq!(components("/"), Vec::<&str>::new());
        assert_eq!(components(""), Vec::<&str>::new());
    }

    #[test]
    fn test_split_parent() {
        let (parents, name) = split_parent("/docs/a.txt").unwrap();
        assert_eq!(parents, vec!["docs"]);
        assert_eq!(name, "a.txt");

        let (parents, name) = split_parent("/a.txt").unwrap();
        assert!(parents.is_empty());
        assert_eq!(name, "a.txt");
    }

    #[test]
    fn test_split_parent_rejects_root() {
        assert!(matches!(split_parent("/"), Err(FsError::InvalidPath(_))));
        assert!(matches!(split_parent(""), Err(FsError::InvalidPath(_))));
        assert!(matches!(split_parent("///"), Err(FsError::InvalidPath(_))));
    }
}
