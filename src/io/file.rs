//! Input/Output file handling with [`InputFile`] and [`OutputFile`].
//!
//! These types abstract over reading/writing both plaintext and gzip-compressed
//! input/output.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Check if a file is a gzipped by looking for the magic numbers
pub fn is_gzipped_file(file_path: impl AsRef<Path>) -> io::Result<bool> {
    let mut file = File::open(file_path.as_ref())?;
    let mut buffer = [0; 2];
    match file.read_exact(&mut buffer) {
        Ok(()) => Ok(buffer == [0x1f, 0x8b]),
        // files shorter than the magic number are not gzipped
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}

/// The file extension, ignoring a trailing `.gz` or `.bgz`.
pub fn base_extension(filepath: impl AsRef<Path>) -> Option<String> {
    let filepath = filepath.as_ref();
    let extension = filepath.extension()?.to_string_lossy().to_lowercase();
    if extension == "gz" || extension == "bgz" {
        let inner = filepath.file_stem().map(Path::new)?;
        return inner.extension().map(|e| e.to_string_lossy().to_lowercase());
    }
    Some(extension)
}

/// Represents an input file.
///
/// This abstracts how data is read in, allowing for both plaintext and gzip-compressed
/// input to be read through a common interface.
#[derive(Clone, Debug)]
pub struct InputFile {
    pub filepath: PathBuf,
}

impl InputFile {
    /// Constructs a new `InputFile`.
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
        }
    }

    /// Opens the file and returns a buffered reader.
    ///
    /// If the file is gzip-compressed (detected by its magic number, not its
    /// name), it is decompressed transparently.
    pub fn reader(&self) -> io::Result<BufReader<Box<dyn Read>>> {
        let file = File::open(&self.filepath)?;
        let reader: Box<dyn Read> = if is_gzipped_file(&self.filepath)? {
            Box::new(GzDecoder::new(file))
        } else {
            Box::new(file)
        };
        Ok(BufReader::new(reader))
    }

    /// Read the first line, without its line ending.
    pub fn first_line(&self) -> io::Result<String> {
        let mut line = String::new();
        self.reader()?.read_line(&mut line)?;
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }
}

/// Represents an output file.
///
/// This abstracts writing both plaintext and gzip-compressed files.
#[derive(Clone, Debug)]
pub struct OutputFile {
    pub filepath: PathBuf,
}

impl OutputFile {
    /// Constructs a new `OutputFile`. If the file extension is `.gz`, output
    /// is gzip-compressed.
    pub fn new(filepath: impl Into<PathBuf>) -> Self {
        Self {
            filepath: filepath.into(),
        }
    }

    /// Opens the file (creating parent directories) and returns a writer.
    pub fn writer(&self) -> io::Result<Box<dyn Write>> {
        let path = &self.filepath;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let is_gzip = path.extension().map_or(false, |ext| ext == "gz");
        let writer: Box<dyn Write> = if is_gzip {
            Box::new(BufWriter::new(GzEncoder::new(
                File::create(path)?,
                Compression::default(),
            )))
        } else {
            Box::new(BufWriter::new(File::create(path)?))
        };
        Ok(writer)
    }

    /// Write a whole string to the destination.
    pub fn write_string(&self, contents: &str) -> io::Result<()> {
        let mut writer = self.writer()?;
        writer.write_all(contents.as_bytes())?;
        writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_extension() {
        assert_eq!(base_extension("meta.tsv").as_deref(), Some("tsv"));
        assert_eq!(base_extension("meta.TSV.gz").as_deref(), Some("tsv"));
        assert_eq!(base_extension("meta.csv").as_deref(), Some("csv"));
        assert_eq!(base_extension("meta"), None);
    }

    #[test]
    fn test_gzip_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.txt.gz");
        OutputFile::new(&path).write_string("fn,cell\n").unwrap();

        assert!(is_gzipped_file(&path).unwrap());
        assert_eq!(InputFile::new(&path).first_line().unwrap(), "fn,cell");
    }

    #[test]
    fn test_plain_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.txt");
        OutputFile::new(&path).write_string("").unwrap();
        assert!(!is_gzipped_file(&path).unwrap());
        assert_eq!(InputFile::new(&path).first_line().unwrap(), "");
    }
}
