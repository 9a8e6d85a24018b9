//! Async filesystem helpers for build steps.
//!
//! Destination parents are created on demand, so callers never need to
//! prepare output directories before copying or writing into them.

use std::path::{Path, PathBuf};

use futures::future::BoxFuture;
use futures::FutureExt;
use regex::Regex;
use tokio::fs;

use crate::{rig_debug, rig_trace, Error, Result};

async fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Copy a single file, creating the destination's parent directories.
pub async fn copy_file(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<()> {
    let (src, dest) = (src.as_ref(), dest.as_ref());
    rig_debug!("copy_file {} -> {}", src.display(), dest.display());
    ensure_parent_dir(dest).await?;
    fs::copy(src, dest).await?;
    Ok(())
}

/// Recursively copy a directory so that `dest` mirrors `src`.
pub async fn copy_dir(src: impl AsRef<Path>, dest: impl AsRef<Path>) -> Result<()> {
    let (src, dest) = (src.as_ref(), dest.as_ref());
    rig_debug!("copy_dir {} -> {}", src.display(), dest.display());
    if !fs::metadata(src).await?.is_dir() {
        return Err(Error::Validation(format!(
            "{} is not a directory",
            src.display()
        )));
    }
    copy_tree(src.to_path_buf(), dest.to_path_buf()).await
}

fn copy_tree(src: PathBuf, dest: PathBuf) -> BoxFuture<'static, Result<()>> {
    async move {
        fs::create_dir_all(&dest).await?;
        let mut entries = fs::read_dir(&src).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = dest.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                copy_tree(entry.path(), target).await?;
            } else {
                rig_trace!("copy {} -> {}", entry.path().display(), target.display());
                fs::copy(entry.path(), &target).await?;
            }
        }
        Ok(())
    }
    .boxed()
}

/// Read `src`, pass its bytes through `transform`, and write the result to
/// `dest`.
pub async fn transform_file<F>(src: impl AsRef<Path>, dest: impl AsRef<Path>, transform: F) -> Result<()>
where
    F: FnOnce(Vec<u8>) -> Vec<u8>,
{
    let (src, dest) = (src.as_ref(), dest.as_ref());
    rig_debug!("transform_file {} -> {}", src.display(), dest.display());
    let contents = fs::read(src).await?;
    let transformed = transform(contents);
    ensure_parent_dir(dest).await?;
    fs::write(dest, transformed).await?;
    Ok(())
}

/// Like [`transform_file`] for UTF-8 text. Non-UTF-8 input is an error.
pub async fn transform_text<F>(src: impl AsRef<Path>, dest: impl AsRef<Path>, transform: F) -> Result<()>
where
    F: FnOnce(String) -> String,
{
    let (src, dest) = (src.as_ref(), dest.as_ref());
    let text = String::from_utf8(fs::read(src).await?)
        .map_err(|_| Error::Validation(format!("{} is not valid UTF-8", src.display())))?;
    rig_debug!("transform_text {} -> {}", src.display(), dest.display());
    let transformed = transform(text);
    ensure_parent_dir(dest).await?;
    fs::write(dest, transformed).await?;
    Ok(())
}

/// Remove a file or directory tree. A missing path is not an error.
pub async fn rmrf(path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    rig_debug!("rmrf {}", path.display());
    match fs::symlink_metadata(path).await {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path).await?,
        Ok(_) => fs::remove_file(path).await?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}

/// A directory entry as seen by a match predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub is_dir: bool,
}

/// List entries under `dir` accepted by `is_match`.
///
/// The predicate also receives the names of the directories between `dir`
/// and the entry. Returned paths are relative to `dir`. Entries are visited
/// in name order; with `recurse`, each level's matches come before those of
/// its subdirectories.
pub async fn get_file_matches<F>(dir: impl AsRef<Path>, is_match: F, recurse: bool) -> Result<Vec<PathBuf>>
where
    F: Fn(&FileEntry, &[String]) -> bool + Sync,
{
    let mut found = Vec::new();
    collect_matches(dir.as_ref().to_path_buf(), &is_match, recurse, Vec::new(), &mut found).await?;
    Ok(found)
}

fn collect_matches<'a, F>(
    dir: PathBuf,
    is_match: &'a F,
    recurse: bool,
    parents: Vec<String>,
    found: &'a mut Vec<PathBuf>,
) -> BoxFuture<'a, Result<()>>
where
    F: Fn(&FileEntry, &[String]) -> bool + Sync,
{
    async move {
        let mut entries = Vec::new();
        let mut reader = fs::read_dir(&dir).await?;
        while let Some(entry) = reader.next_entry().await? {
            entries.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                is_dir: entry.file_type().await?.is_dir(),
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));

        for entry in &entries {
            if is_match(entry, &parents) {
                let mut rel: PathBuf = parents.iter().collect();
                rel.push(&entry.name);
                rig_trace!("match {}", rel.display());
                found.push(rel);
            }
        }

        if recurse {
            for entry in entries.into_iter().filter(|e| e.is_dir) {
                let mut child_parents = parents.clone();
                child_parents.push(entry.name.clone());
                collect_matches(dir.join(&entry.name), is_match, recurse, child_parents, found).await?;
            }
        }
        Ok(())
    }
    .boxed()
}

/// Files (not directories) under `dir`.
pub async fn get_files(dir: impl AsRef<Path>, recurse: bool) -> Result<Vec<PathBuf>> {
    get_file_matches(dir, |entry, _| !entry.is_dir, recurse).await
}

/// Directories under `dir`.
pub async fn get_dirs(dir: impl AsRef<Path>, recurse: bool) -> Result<Vec<PathBuf>> {
    get_file_matches(dir, |entry, _| entry.is_dir, recurse).await
}

/// Which extensions [`get_file_with_name`] accepts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extensions {
    /// Any extension.
    Any,
    /// One of these literal extensions.
    List(Vec<String>),
    /// A regular expression the extension must match in full.
    Pattern(String),
}

impl Default for Extensions {
    fn default() -> Self {
        Extensions::List(vec!["ts".to_string(), "js".to_string()])
    }
}

impl Extensions {
    fn name_regex(&self, name: &str) -> Result<Regex> {
        let name = regex::escape(name);
        let pattern = match self {
            Extensions::Any => format!(r"^{}\.", name),
            Extensions::List(exts) => {
                if exts.is_empty() {
                    return Err(Error::Validation("invalid extensions provided".to_string()));
                }
                let alternatives: Vec<String> = exts.iter().map(|e| regex::escape(e)).collect();
                format!(r"^{}\.({})$", name, alternatives.join("|"))
            }
            Extensions::Pattern(p) => format!(r"^{}\.(?:{})$", name, p),
        };
        Ok(Regex::new(&pattern)?)
    }
}

/// Find the single entry directly in `dir` named `name` with an accepted
/// extension, e.g. `index.ts` for `("index", Extensions::default())`.
pub async fn get_file_with_name(dir: impl AsRef<Path>, name: &str, extensions: &Extensions) -> Result<PathBuf> {
    let regex = extensions.name_regex(name)?;
    let mut matches = get_file_matches(dir, |entry, _| regex.is_match(&entry.name), false).await?;

    match matches.len() {
        0 => Err(Error::Validation(format!(
            "no matching file with name \"{}\" found",
            name
        ))),
        1 => Ok(matches.remove(0)),
        _ => Err(Error::Validation(format!(
            "multiple matching files with name \"{}\" found",
            name
        ))),
    }
}
