//! Zip archives of build output.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::util::blocking;
use crate::{rig_debug, rig_trace, Error, Result};

/// Zip the contents of `source_dir` into `output`.
///
/// Entry names are relative to `source_dir` (the directory itself is not a
/// top-level entry) and use `/` separators. Compression is deflate at the
/// highest level. The parent of `output` is created if needed.
pub async fn zip_directory(source_dir: impl AsRef<Path>, output: impl AsRef<Path>) -> Result<()> {
    let source_dir = source_dir.as_ref().to_path_buf();
    let output = output.as_ref().to_path_buf();
    rig_debug!("zip_directory {} -> {}", source_dir.display(), output.display());

    blocking(move || write_archive(&source_dir, &output)).await
}

fn write_archive(source_dir: &Path, output: &Path) -> Result<()> {
    if !source_dir.is_dir() {
        return Err(Error::Validation(format!(
            "{} is not a directory",
            source_dir.display()
        )));
    }
    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut zip = ZipWriter::new(File::create(output)?);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(9));

    let mut pending = vec![PathBuf::new()];
    while let Some(rel_dir) = pending.pop() {
        let mut entries: Vec<_> = std::fs::read_dir(source_dir.join(&rel_dir))?
            .collect::<io::Result<Vec<_>>>()?;
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let rel = rel_dir.join(entry.file_name());
            let name = entry_name(&rel);
            // an archive written into its own source dir must not include itself
            if entry.path() == output {
                continue;
            }
            if entry.file_type()?.is_dir() {
                rig_trace!("zip dir {}", name);
                zip.add_directory(format!("{}/", name), options)?;
                pending.push(rel);
            } else {
                rig_trace!("zip file {}", name);
                zip.start_file(name, options)?;
                let mut file = File::open(entry.path())?;
                io::copy(&mut file, &mut zip)?;
            }
        }
    }

    zip.finish()?;
    Ok(())
}

fn entry_name(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
