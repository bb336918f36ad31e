use std::fs;
use std::path::Path;

const WASM_MAGIC: [u8; 4] = *b"\0asm";
const SUPPORTED_VERSIONS: &[[u8; 4]] = &[[0x01, 0x00, 0x00, 0x00]];

/// Magic plus version word; nothing shorter can be a module in either encoding.
const MIN_MODULE_SIZE: u64 = 8;

type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("path is not a file: {0}")]
    NotAFile(String),

    #[error("file at path {path} is too small: required min {min} but got {size}")]
    FileTooSmall { path: String, min: u64, size: u64 },

    #[error("not a WebAssembly module: no binary magic and not valid text")]
    BadMagic,

    #[error("unsupported binary version: {0:?}")]
    UnsupportedVersion([u8; 4]),

    #[error("IO error: {0}")]
    IO(#[from] std::io::Error),
}

/// Encoding of a module as detected on load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Binary `.wasm`: magic and version checked.
    Binary,
    /// Text `.wat`: anything UTF-8 without the binary magic. Whether the
    /// runtime accepts it is decided by [`crate::Config`].
    Text,
}

/// Raw module bytes, read fully into memory and pre-checked before the
/// engine ever sees them.
#[derive(Debug)]
pub struct Buffer {
    inner: Vec<u8>,
    encoding: Encoding,
}

impl Buffer {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        // early exit if minimal requirements are not met
        check_minimal_file_requirements(&path)?;
        let buf = fs::read(&path)?;
        Self::from_bytes(buf)
    }

    /// In-memory modules (embedded or test fixtures) skip the file checks
    /// but go through the same encoding detection.
    pub fn from_bytes<B: Into<Vec<u8>>>(bytes: B) -> Result<Self> {
        let buf = bytes.into();
        let encoding = detect_encoding(&buf)?;
        log::debug!("loaded {:?} module: {} bytes", encoding, buf.len());
        Ok(Self {
            inner: buf,
            encoding,
        })
    }

    pub fn encoding(&self) -> Encoding {
        self.encoding
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl AsRef<[u8]> for Buffer {
    fn as_ref(&self) -> &[u8] {
        &self.inner
    }
}

fn check_minimal_file_requirements<P: AsRef<Path>>(path: P) -> Result<()> {
    let file_meta = path
        .as_ref()
        .metadata()
        .map_err(|_| Error::NotAFile(path.as_ref().display().to_string()))?;

    if !file_meta.is_file() {
        return Err(Error::NotAFile(path.as_ref().display().to_string()));
    }

    if file_meta.len() < MIN_MODULE_SIZE {
        return Err(Error::FileTooSmall {
            path: path.as_ref().display().to_string(),
            min: MIN_MODULE_SIZE,
            size: file_meta.len(),
        });
    }

    Ok(())
}

fn detect_encoding(buf: &[u8]) -> Result<Encoding> {
    if buf.len() >= 8 && buf[..4] == WASM_MAGIC {
        let version: [u8; 4] = buf[4..8].try_into().unwrap();
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(Error::UnsupportedVersion(version));
        }
        return Ok(Encoding::Binary);
    }

    // No binary magic: only the text format is left. Real validation is the
    // engine's job, this just keeps arbitrary binary junk out early.
    if std::str::from_utf8(buf).is_ok() {
        return Ok(Encoding::Text);
    }

    Err(Error::BadMagic)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_binary_encoding() {
        let buf = Buffer::from_bytes(b"\0asm\x01\0\0\0".to_vec()).unwrap();
        assert_eq!(Encoding::Binary, buf.encoding());
        assert_eq!(8, buf.len());
    }

    #[test]
    fn detects_text_encoding() {
        let buf = Buffer::from_bytes(b"(module)".to_vec()).unwrap();
        assert_eq!(Encoding::Text, buf.encoding());
    }

    #[test]
    fn rejects_unsupported_version() {
        let err = Buffer::from_bytes(b"\0asm\x02\0\0\0".to_vec()).unwrap_err();
        assert!(matches!(
            err,
            Error::UnsupportedVersion([0x02, 0x00, 0x00, 0x00])
        ));
    }

    #[test]
    fn rejects_binary_junk() {
        let err = Buffer::from_bytes(vec![0xff, 0xfe, 0x00, 0x01]).unwrap_err();
        assert!(matches!(err, Error::BadMagic));
    }

    #[test]
    fn rejects_missing_path() {
        let err = Buffer::new("/definitely/not/here.wasm").unwrap_err();
        assert!(matches!(err, Error::NotAFile(_)));
    }

    #[test]
    fn rejects_truncated_file() {
        let path = std::env::temp_dir().join("wasmbox-truncated.wasm");
        fs::write(&path, b"\0as").unwrap();
        let err = Buffer::new(&path).unwrap_err();
        fs::remove_file(&path).ok();
        assert!(matches!(err, Error::FileTooSmall { min: 8, size: 3, .. }));
    }
}
