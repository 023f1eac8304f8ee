// Object file resolution

use std::path::{Path, PathBuf};

use tracing::trace;
use walkdir::WalkDir;

/// Locates the `.spin` file behind an `OBJ` reference.
#[derive(Debug, Clone, Default)]
pub struct FileResolver {
    library: PathBuf,
}

impl FileResolver {
    pub fn new(library: impl Into<PathBuf>) -> Self {
        Self {
            library: library.into(),
        }
    }

    fn has_library(&self) -> bool {
        !self.library.as_os_str().is_empty()
    }

    /// Resolve `reference` as seen from `current_file`.
    ///
    /// Tries, in order: the reference as given, the reference under the
    /// library, an exact case-insensitive name match in the directory of
    /// `current_file`, then the first library entry whose name contains the
    /// reference's file name. Returns the reference unchanged when nothing
    /// matches; callers check existence.
    pub fn resolve(&self, reference: &str, current_file: &Path) -> PathBuf {
        let given = PathBuf::from(reference);
        if given.is_file() {
            return given;
        }

        if self.has_library() {
            let in_library = self.library.join(reference);
            if in_library.is_file() {
                return in_library;
            }
        }

        let short = short_name(reference).to_lowercase();

        let current_dir = match current_file.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        if let Some(found) = find_entry(current_dir, |name| name == short) {
            trace!("Resolved {} next to {}", reference, current_file.display());
            return found;
        }

        if self.has_library() {
            if let Some(found) = find_entry(&self.library, |name| name.contains(&short)) {
                trace!("Resolved {} in library as {}", reference, found.display());
                return found;
            }
        }

        given
    }
}

/// File name part of a reference, accepting either separator.
pub fn short_name(reference: &str) -> &str {
    reference
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(reference)
}

/// First file directly inside `dir` whose lowercased name satisfies `matches`.
fn find_entry(dir: &Path, matches: impl Fn(&str) -> bool) -> Option<PathBuf> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .find(|e| matches(&e.file_name().to_string_lossy().to_lowercase()))
        .map(|e| e.into_path())
}
