//! Opening input files and creating output files.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use crate::error::{MatchError, Result};
use crate::pattern::Pattern;
use crate::session::NamedInput;

/// Buffer size for input readers and output writers
const IO_BUFFER_SIZE: usize = 1024 * 1024;

/// Check that `path` is a non-empty regular file.
pub fn check_input(path: &Path) -> Result<()> {
    let meta = fs::metadata(path).map_err(|source| MatchError::Open { path: path.to_path_buf(), source })?;
    if !meta.is_file() {
        return Err(MatchError::NotAFile { path: path.to_path_buf() });
    }
    if meta.len() == 0 {
        return Err(MatchError::EmptyInput { path: path.to_path_buf() });
    }
    Ok(())
}

/// Validate and open every input, named by its path as given.
pub fn open_inputs<P: AsRef<Path>>(paths: &[P]) -> Result<Vec<NamedInput<BufReader<File>>>> {
    if paths.is_empty() {
        return Err(MatchError::NoInputs);
    }
    for path in paths {
        check_input(path.as_ref())?;
    }
    paths
        .iter()
        .map(|path| {
            let path = path.as_ref();
            let file = File::open(path).map_err(|source| MatchError::Open { path: path.to_path_buf(), source })?;
            Ok(NamedInput::new(path.display().to_string(), BufReader::with_capacity(IO_BUFFER_SIZE, file)))
        })
        .collect()
}

/// Creates `<dir>/<label>` output files.
#[derive(Debug, Clone)]
pub struct OutputDir {
    dir: PathBuf,
}

impl OutputDir {
    /// Use `dir`, creating it if needed.
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| MatchError::Create { path: dir.clone(), source })?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Path of the output file for `pattern`.
    #[must_use]
    pub fn path_for(&self, pattern: Pattern) -> PathBuf {
        self.dir.join(pattern.label())
    }

    /// Create (truncating) the output file for `pattern`.
    pub fn open(&self, pattern: Pattern) -> Result<BufWriter<File>> {
        let path = self.path_for(pattern);
        let file = File::create(&path).map_err(|source| MatchError::Create { path, source })?;
        Ok(BufWriter::with_capacity(IO_BUFFER_SIZE, file))
    }
}
