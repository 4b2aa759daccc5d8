use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read};
use std::path::Path;

use crate::error::Result;

/// Readable byte stream plus the base name it is registered under.
///
/// Registries never look at where the bytes come from.
pub struct ResourceSource {
    name: String,
    reader: Box<dyn Read + Send>,
}

impl ResourceSource {
    /// Opens a file; the registry name is the file name without directories.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        Ok(Self::from_reader(path.to_string_lossy(), BufReader::new(file)))
    }

    pub fn from_bytes(name: impl AsRef<str>, bytes: impl Into<Vec<u8>>) -> Self {
        Self::from_reader(name, Cursor::new(bytes.into()))
    }

    pub fn from_reader(name: impl AsRef<str>, reader: impl Read + Send + 'static) -> Self {
        Self {
            name: base_name(name.as_ref()),
            reader: Box::new(reader),
        }
    }

    /// Base name (no directories).
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        self.reader.read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

impl Read for ResourceSource {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

impl fmt::Debug for ResourceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceSource").field("name", &self.name).finish_non_exhaustive()
    }
}

fn base_name(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_drops_directories() {
        let src = ResourceSource::from_bytes("assets/textures/logo.png", vec![1, 2, 3]);
        assert_eq!(src.name(), "logo.png");
    }

    #[test]
    fn read_all_drains_stream() {
        let mut src = ResourceSource::from_bytes("blob", b"hello".to_vec());
        assert_eq!(src.read_all().unwrap(), b"hello");
        assert!(src.read_all().unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ResourceSource::from_path("/definitely/not/here.bin").unwrap_err();
        assert!(matches!(err, crate::Error::Io(_)));
    }
}
