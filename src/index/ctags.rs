// Exuberant-ctags emission over a parsed database

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use super::db::SymbolDatabase;
use super::Result;

const TAG_HEADER: &str = "\
!_TAG_FILE_FORMAT\t1\t/original ctags format/
!_TAG_FILE_SORTED\t1\t/0=unsorted, 1=sorted, 2=foldcase/
!_TAG_PROGRAM_AUTHOR\tDarren Hiebert\t/dhiebert@users.sourceforge.net/
!_TAG_PROGRAM_NAME\tExuberant Ctags\t//
!_TAG_PROGRAM_URL\thttp://ctags.sourceforge.net\t/official site/
!_TAG_PROGRAM_VERSION\t5.8\t//
";

/// Render the `tags` file contents. Lines are sorted by tag name so the
/// sorted flag in the header holds.
pub fn render_ctags(db: &SymbolDatabase) -> String {
    let mut lines: Vec<String> = db
        .iter()
        .map(|(_, tag)| format!("{}\t{}\t/^{}$/", tag.name, tag.file, tag.line))
        .collect();
    lines.sort();

    let mut out = String::from(TAG_HEADER);
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Location of the `tags` file for a root source file.
pub fn tags_path(root_file: &Path) -> PathBuf {
    match root_file.parent() {
        Some(dir) => dir.join("tags"),
        None => PathBuf::from("tags"),
    }
}

/// Write `tags` next to `root_file` and return its path.
pub fn write_ctags(db: &SymbolDatabase, root_file: &Path) -> Result<PathBuf> {
    let path = tags_path(root_file);
    let mut writer = BufWriter::new(File::create(&path)?);
    writer.write_all(render_ctags(db).as_bytes())?;
    writer.flush()?;

    info!("Wrote {} tags to {}", db.len(), path.display());
    Ok(path)
}
