//! Finding and reading stagefiles.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, StagehandError};

use super::schema::Stagefile;

/// File names looked for in each directory, in order.
pub const STAGEFILE_NAMES: [&str; 2] = ["stagehand.yml", "stagehand.yaml"];

/// Walk up from `start` to the first directory holding a stagefile.
pub fn find_stagefile(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        for name in STAGEFILE_NAMES {
            let candidate = current.join(name);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        if !current.pop() {
            return None;
        }
    }
}

/// The stagefile to use: `explicit` when given, otherwise the nearest one
/// above `start`.
///
/// # Errors
///
/// `StagefileNotFound` when `explicit` does not exist or nothing is found.
pub fn discover(explicit: Option<&Path>, start: &Path) -> Result<PathBuf> {
    match explicit {
        Some(path) if path.is_file() => Ok(path.to_path_buf()),
        Some(path) => Err(StagehandError::StagefileNotFound {
            path: path.to_path_buf(),
        }),
        None => find_stagefile(start).ok_or_else(|| StagehandError::StagefileNotFound {
            path: start.join(STAGEFILE_NAMES[0]),
        }),
    }
}

/// Read and parse a stagefile.
///
/// # Errors
///
/// Returns `StagefileNotFound` if the file doesn't exist.
/// Returns `StagefileParse` if the YAML is invalid.
pub fn load_stagefile(path: &Path) -> Result<Stagefile> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            StagehandError::StagefileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            StagehandError::Io(e)
        }
    })?;

    parse_stagefile(&content, path)
}

/// Parse YAML content; `source_path` is only used in errors.
pub fn parse_stagefile(content: &str, source_path: &Path) -> Result<Stagefile> {
    if content.trim().is_empty() {
        return Ok(Stagefile::default());
    }
    serde_yaml::from_str(content).map_err(|e| StagehandError::StagefileParse {
        path: source_path.to_path_buf(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn finds_stagefile_in_parent() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("stagehand.yml"), "tasks: {}").unwrap();
        let nested = temp.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(
            find_stagefile(&nested),
            Some(temp.path().join("stagehand.yml"))
        );
    }

    #[test]
    fn yaml_extension_is_accepted() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("stagehand.yaml"), "").unwrap();
        assert!(find_stagefile(temp.path()).is_some());
    }

    #[test]
    fn explicit_path_must_exist() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope.yml");
        let err = discover(Some(&missing), temp.path()).unwrap_err();
        assert!(matches!(err, StagehandError::StagefileNotFound { .. }));
    }

    #[test]
    fn explicit_path_wins() {
        let temp = TempDir::new().unwrap();
        let custom = temp.path().join("deploy.yml");
        fs::write(&custom, "").unwrap();
        fs::write(temp.path().join("stagehand.yml"), "").unwrap();
        assert_eq!(discover(Some(&custom), temp.path()).unwrap(), custom);
    }

    #[test]
    fn parse_error_names_the_file() {
        let err = parse_stagefile("tasks: [", Path::new("stagehand.yml")).unwrap_err();
        assert!(matches!(err, StagehandError::StagefileParse { .. }));
        assert!(err.to_string().contains("stagehand.yml"));
    }

    #[test]
    fn empty_file_is_empty_stagefile() {
        let file = parse_stagefile("\n", Path::new("stagehand.yml")).unwrap();
        assert!(file.tasks.is_empty());
    }

    #[test]
    fn load_reports_missing_file() {
        let err = load_stagefile(Path::new("/definitely/not/here.yml")).unwrap_err();
        assert!(matches!(err, StagehandError::StagefileNotFound { .. }));
    }
}
