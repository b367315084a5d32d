//! Where compilation units and spliced target files come from.
//!
//! A program is a root unit, the units it includes with `Sisällytä
//! tiedosto` and the JavaScript files it splices with `Liitä tiedosto`.
//! The standard unit is compiled into the library and never touches a
//! provider.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::pass1_bundle::{STD_NAME, STD_SOURCE};

/// One unit of Tampio source ready for parsing.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    /// Name shown in diagnostics.
    pub name: String,
    /// Identity for include-cycle detection; `None` for units that cannot
    /// be included (the standard unit, text given directly).
    pub key: Option<PathBuf>,
    /// Directory relative includes and splices are resolved against.
    pub dir: PathBuf,
    pub text: String,
}

impl SourceUnit {
    pub fn standard() -> Self {
        SourceUnit {
            name: STD_NAME.to_owned(),
            key: None,
            dir: PathBuf::from("."),
            text: STD_SOURCE.to_owned(),
        }
    }

    /// Source text that does not live in a file.
    pub fn text(name: &str, text: &str) -> Self {
        SourceUnit {
            name: name.to_owned(),
            key: None,
            dir: PathBuf::from("."),
            text: text.to_owned(),
        }
    }
}

pub trait SourceProvider {
    /// Open the unit at `path`, relative to `dir` when not absolute.
    fn open_unit(&self, dir: &Path, path: &Path) -> io::Result<SourceUnit>;

    /// Read the target-language file named by `Liitä tiedosto`.
    fn read_splice(&self, dir: &Path, path: &str) -> io::Result<String>;
}

/// Reads from disk. Unit keys are canonical paths, so the same file
/// reached through different relative paths is included once.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileSystemProvider;

impl SourceProvider for FileSystemProvider {
    fn open_unit(&self, dir: &Path, path: &Path) -> io::Result<SourceUnit> {
        let canon = dir.join(path).canonicalize()?;
        let text = std::fs::read_to_string(&canon)?;
        Ok(SourceUnit {
            name: canon.display().to_string(),
            dir: canon.parent().map(Path::to_owned).unwrap_or_default(),
            key: Some(canon),
            text,
        })
    }

    fn read_splice(&self, dir: &Path, path: &str) -> io::Result<String> {
        std::fs::read_to_string(dir.join(path))
    }
}

/// Serves units from a path-to-text map, for tests and embedding.
/// Paths are compared lexically after folding `.` and `..`.
#[derive(Debug, Default, Clone)]
pub struct InMemoryProvider {
    files: HashMap<PathBuf, String>,
}

impl InMemoryProvider {
    /// Build a provider from `(path, text)` pairs.
    pub fn from_files<'f>(files: impl IntoIterator<Item = (&'f str, &'f str)>) -> Self {
        let mut provider = InMemoryProvider::default();
        for (path, text) in files {
            provider.insert(Path::new(path), text);
        }
        provider
    }

    pub fn insert(&mut self, path: &Path, text: &str) {
        self.files.insert(fold(path), text.to_owned());
    }

    fn get(&self, path: &Path) -> io::Result<(PathBuf, &str)> {
        let key = fold(path);
        match self.files.get(&key) {
            Some(text) => Ok((key, text.as_str())),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such unit: {}", key.display()),
            )),
        }
    }
}

impl SourceProvider for InMemoryProvider {
    fn open_unit(&self, dir: &Path, path: &Path) -> io::Result<SourceUnit> {
        let (key, text) = self.get(&dir.join(path))?;
        Ok(SourceUnit {
            name: key.display().to_string(),
            dir: key.parent().map(Path::to_owned).unwrap_or_default(),
            text: text.to_owned(),
            key: Some(key),
        })
    }

    fn read_splice(&self, dir: &Path, path: &str) -> io::Result<String> {
        self.get(&dir.join(path)).map(|(_, text)| text.to_owned())
    }
}

/// Drop `.` components and let `..` cancel the component before it.
fn fold(path: &Path) -> PathBuf {
    path.components().fold(PathBuf::new(), |mut acc, c| {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                acc.pop();
            }
            other => acc.push(other),
        }
        acc
    })
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
