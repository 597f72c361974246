//! File and object naming for the claim protocol.
//!
//! Downstream tooling watches for these exact names, so the transformations
//! are fixed:
//!
//! | backend | input      | claimed                      | processed          |
//! |---------|------------|------------------------------|--------------------|
//! | local   | `foo.jl`   | `foo_processed.jl.processing`| `foo_processed.jl` |
//! | object  | `a/foo.jl` | `a/foo.processing`           | `a/foo_processed.jl` |

use std::path::{Path, PathBuf};

pub const JL_SUFFIX: &str = ".jl";
pub const PROCESSED_SUFFIX: &str = "_processed.jl";
pub const CLAIM_SUFFIX: &str = ".processing";

/// Whether a file name or object key is an unprocessed, unclaimed JL item.
pub fn is_candidate(name: &str) -> bool {
    name.ends_with(JL_SUFFIX) && !name.ends_with(PROCESSED_SUFFIX) && !name.ends_with(CLAIM_SUFFIX)
}

fn replace_jl_suffix(name: &str, replacement: &str) -> Option<String> {
    name.strip_suffix(JL_SUFFIX)
        .map(|stem| format!("{stem}{replacement}"))
}

/// Terminal path of a local file: trailing `.jl` replaced by `_processed.jl`.
pub fn local_processed_path(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_str()?;
    let processed = replace_jl_suffix(name, PROCESSED_SUFFIX)?;
    Some(path.with_file_name(processed))
}

/// Claim path of a local file: the terminal path plus `.processing`.
pub fn local_claim_path(path: &Path) -> Option<PathBuf> {
    let processed = local_processed_path(path)?;
    let name = processed.file_name()?.to_str()?;
    Some(processed.with_file_name(format!("{name}{CLAIM_SUFFIX}")))
}

/// Claim key of an object: trailing `.jl` replaced by `.processing`.
pub fn object_claim_key(key: &str) -> Option<String> {
    replace_jl_suffix(key, CLAIM_SUFFIX)
}

/// Terminal key of an object: trailing `.jl` replaced by `_processed.jl`.
pub fn object_processed_key(key: &str) -> Option<String> {
    replace_jl_suffix(key, PROCESSED_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidates() {
        assert!(is_candidate("foo.jl"));
        assert!(is_candidate("exports/2025/foo.jl"));
        assert!(!is_candidate("foo_processed.jl"));
        assert!(!is_candidate("foo_processed.jl.processing"));
        assert!(!is_candidate("foo.processing"));
        assert!(!is_candidate("foo.json"));
        assert!(!is_candidate("foo.jlx"));
    }

    #[test]
    fn local_names() {
        let path = Path::new("/data/in/foo.jl");
        assert_eq!(
            local_processed_path(path).unwrap(),
            PathBuf::from("/data/in/foo_processed.jl")
        );
        assert_eq!(
            local_claim_path(path).unwrap(),
            PathBuf::from("/data/in/foo_processed.jl.processing")
        );
        assert!(local_claim_path(Path::new("/data/in/foo.json")).is_none());
    }

    #[test]
    fn only_the_trailing_suffix_is_replaced() {
        let path = Path::new("/data/a.jl.d/b.jl");
        assert_eq!(
            local_processed_path(path).unwrap(),
            PathBuf::from("/data/a.jl.d/b_processed.jl")
        );
        assert_eq!(
            object_claim_key("x.jl/y.jl").as_deref(),
            Some("x.jl/y.processing")
        );
    }

    #[test]
    fn object_keys() {
        assert_eq!(
            object_claim_key("reviews/foo.jl").as_deref(),
            Some("reviews/foo.processing")
        );
        assert_eq!(
            object_processed_key("reviews/foo.jl").as_deref(),
            Some("reviews/foo_processed.jl")
        );
        assert!(object_claim_key("reviews/foo.csv").is_none());
    }
}
