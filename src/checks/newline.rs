//! `newline-at-eof`: every file must end with a newline.

use crate::core::error::{Error, Result};
use std::fs::{File, OpenOptions};
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Options for [`run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NewlineOptions {
    /// Append the missing newline instead of reporting it.
    pub fix: bool,
    /// Report empty files too.
    pub disallow_empty: bool,
}

/// What [`inspect`] found at the end of a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEnding {
    /// Last byte is `\n`.
    Newline,
    /// Last byte is something else.
    MissingNewline,
    /// Zero-length file.
    Empty,
    /// A directory, which has no ending.
    Directory,
}

/// Looks at the last byte of `path`.
pub fn inspect(path: &Path) -> Result<FileEnding> {
    if path.is_dir() {
        return Ok(FileEnding::Directory);
    }

    let mut file =
        File::open(path).map_err(|e| Error::io(format!("open {}", path.display()), e))?;
    match file.seek(SeekFrom::End(-1)) {
        Ok(_) => {},
        Err(e) if e.kind() == ErrorKind::InvalidInput => return Ok(FileEnding::Empty),
        Err(e) => return Err(Error::io(format!("seek {}", path.display()), e)),
    }

    let mut last = [0_u8; 1];
    file.read_exact(&mut last)
        .map_err(|e| Error::io(format!("read {}", path.display()), e))?;

    Ok(if last[0] == b'\n' {
        FileEnding::Newline
    } else {
        FileEnding::MissingNewline
    })
}

fn append_newline(path: &Path) -> Result<()> {
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(|e| Error::io(format!("open {}", path.display()), e))?;
    file.write_all(b"\n")
        .map_err(|e| Error::io(format!("write {}", path.display()), e))
}

/// Checks (or fixes) every path, printing offenders to `out` and notes to
/// `err`. Returns true if nothing is left to report.
pub fn run(
    paths: &[PathBuf],
    options: NewlineOptions,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<bool> {
    let write_err = |e| Error::io("write output", e);
    let mut passed = true;

    for path in paths {
        match inspect(path)? {
            FileEnding::Newline => {},
            FileEnding::Directory => {
                writeln!(err, "skipping directory: {}", path.display()).map_err(write_err)?;
            },
            FileEnding::Empty if !options.disallow_empty => {
                writeln!(err, "skipping empty file: {}", path.display()).map_err(write_err)?;
            },
            FileEnding::MissingNewline if options.fix => {
                append_newline(path)?;
                tracing::debug!(path = %path.display(), "Appended newline");
                writeln!(out, "fixed: {}", path.display()).map_err(write_err)?;
            },
            FileEnding::Empty | FileEnding::MissingNewline => {
                passed = false;
                writeln!(out, "{}", path.display()).map_err(write_err)?;
            },
        }
    }

    Ok(passed)
}
