//! Memory-mapped files with reentrant open/close.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::{Mmap, MmapMut};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::scope::Scope;

/// How a [`MappedFile`] maps its file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    ReadOnly,
    /// Read-write shared mapping. The file is created if missing, and when
    /// `fixed_size` is set it is truncated or zero-extended to exactly that many
    /// bytes before mapping.
    ReadWrite { fixed_size: Option<u64> },
}

enum View {
    Empty,
    ReadOnly(Mmap),
    ReadWrite(MmapMut),
}

struct Mapping {
    // Field order matters: the view is unmapped before the handle is closed.
    view: View,
    _file: File,
}

/// A file mapped into memory while its nesting depth is above zero.
pub struct MappedFile {
    path: PathBuf,
    access: Access,
    depth: usize,
    mapping: Option<Mapping>,
}

impl MappedFile {
    /// Creates a closed handle for `path`. Nothing is checked until [`Scope::open`].
    pub fn new(path: impl Into<PathBuf>, access: Access) -> Self {
        Self { path: path.into(), access, depth: 0, mapping: None }
    }

    /// Resolves `path` the way the data files are usually passed around: a
    /// directory is joined with `default_file_name`, and in read-only mode the
    /// resulting path must be an existing regular file.
    pub fn resolve(
        path: impl AsRef<Path>,
        default_file_name: Option<&str>,
        access: Access,
    ) -> Result<Self> {
        let mut path = path.as_ref().to_path_buf();

        if path.is_dir() {
            match default_file_name {
                Some(name) => path.push(name),
                None => {
                    return Err(Error::InvalidArgument(format!(
                        "'{}' is a directory and no default file name applies",
                        path.display()
                    )));
                }
            }
        }

        if access == Access::ReadOnly && !path.is_file() {
            let hint = default_file_name.map(|n| format!(" (should be {n})")).unwrap_or_default();
            return Err(Error::InvalidArgument(format!(
                "'{}' is not a data file{hint}",
                path.display()
            )));
        }

        Ok(Self::new(path, access))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn access(&self) -> Access {
        self.access
    }

    /// Current nesting depth; zero when closed.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// The mapped bytes. Fails with [`Error::NotOpen`] while closed.
    pub fn data(&self) -> Result<&[u8]> {
        match self.mapping.as_ref().map(|m| &m.view) {
            Some(View::Empty) => Ok(&[][..]),
            Some(View::ReadOnly(map)) => Ok(&map[..]),
            Some(View::ReadWrite(map)) => Ok(&map[..]),
            None => Err(Error::NotOpen { path: self.path.clone() }),
        }
    }

    /// The mapped bytes, writable. Fails with [`Error::PermissionDenied`] for a
    /// read-only mapping, whether or not it is open.
    pub fn data_mut(&mut self) -> Result<&mut [u8]> {
        if self.access == Access::ReadOnly {
            return Err(Error::PermissionDenied { path: self.path.clone() });
        }
        match self.mapping.as_mut().map(|m| &mut m.view) {
            Some(View::Empty) => Ok(&mut [][..]),
            Some(View::ReadWrite(map)) => Ok(&mut map[..]),
            Some(View::ReadOnly(_)) => Err(Error::PermissionDenied { path: self.path.clone() }),
            None => Err(Error::NotOpen { path: self.path.clone() }),
        }
    }

    fn map(&self) -> Result<Mapping> {
        let path = self.path.as_path();

        let (file, view) = match self.access {
            Access::ReadOnly => {
                let file = File::open(path).map_err(|e| Error::from_open(path, e))?;
                let len = file.metadata().map_err(|e| Error::io(path, e))?.len();
                let view = if len == 0 {
                    View::Empty
                } else {
                    // SAFETY: data files are immutable while queries are served; the
                    // population tool is the only writer and never runs alongside readers.
                    View::ReadOnly(unsafe { Mmap::map(&file) }.map_err(|e| Error::io(path, e))?)
                };
                (file, view)
            }
            Access::ReadWrite { fixed_size } => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(path)
                    .map_err(|e| Error::from_open(path, e))?;
                let mut len = file.metadata().map_err(|e| Error::io(path, e))?.len();
                if let Some(size) = fixed_size
                    && size != len
                {
                    file.set_len(size).map_err(|e| Error::io(path, e))?;
                    len = size;
                }
                let view = if len == 0 {
                    View::Empty
                } else {
                    // SAFETY: write mode is exclusive; no other handle maps this file.
                    View::ReadWrite(
                        unsafe { MmapMut::map_mut(&file) }.map_err(|e| Error::io(path, e))?,
                    )
                };
                (file, view)
            }
        };

        debug!(path = %path.display(), access = ?self.access, "mapped file");
        Ok(Mapping { view, _file: file })
    }

    fn unmap(&mut self) {
        let Some(mapping) = self.mapping.take() else {
            return;
        };
        if let View::ReadWrite(map) = &mapping.view
            && let Err(e) = map.flush()
        {
            warn!(path = %self.path.display(), error = %e, "failed to flush mapping on close");
        }
        drop(mapping);
        debug!(path = %self.path.display(), "unmapped file");
    }
}

impl Scope for MappedFile {
    fn open(&mut self) -> Result<()> {
        if self.depth == 0 {
            self.mapping = Some(self.map()?);
        }
        self.depth += 1;
        Ok(())
    }

    fn close(&mut self) {
        match self.depth {
            0 => {}
            1 => {
                self.unmap();
                self.depth = 0;
            }
            _ => self.depth -= 1,
        }
    }

    fn is_open(&self) -> bool {
        self.depth > 0
    }
}

impl Drop for MappedFile {
    fn drop(&mut self) {
        self.unmap();
    }
}
