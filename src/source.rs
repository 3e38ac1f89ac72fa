//! Random access byte sources the demuxer reads from.
//!
//! The demuxer never assumes sequential access: every read names its offset. Sources take
//! `&self` so that a single source can back several independent demuxers (see
//! [`Mp3Demuxer::try_clone`](crate::Mp3Demuxer::try_clone)).

use std::io::{self, Read, Seek, SeekFrom};
use std::sync::{Arc, Mutex};

/// An offset addressed, possibly still growing, sequence of bytes.
pub trait ByteSource: Send + Sync {
    /// Reads up to `buf.len()` bytes starting at `offset`.
    ///
    /// Returns the number of bytes read. `0` means no data is available at `offset`
    /// (end of stream, or not downloaded yet). Short reads are allowed.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize>;

    /// Total length of the stream in bytes, `None` if unknown.
    fn len(&self) -> Option<u64>;

    /// Whether the stream is known to hold no bytes at all, `None` if the length is unknown.
    fn is_empty(&self) -> Option<bool> {
        self.len().map(|len| len == 0)
    }
}

impl ByteSource for [u8] {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let start = match usize::try_from(offset) {
            Ok(start) if start < <[u8]>::len(self) => start,
            _ => return Ok(0),
        };
        let available = &self[start..];
        let n = available.len().min(buf.len());
        buf[..n].copy_from_slice(&available[..n]);
        Ok(n)
    }

    #[inline]
    fn len(&self) -> Option<u64> {
        Some(<[u8]>::len(self) as u64)
    }
}

impl ByteSource for Vec<u8> {
    #[inline]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        self.as_slice().read_at(offset, buf)
    }

    #[inline]
    fn len(&self) -> Option<u64> {
        ByteSource::len(self.as_slice())
    }
}

impl<T: ByteSource + ?Sized> ByteSource for &T {
    #[inline]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }

    #[inline]
    fn len(&self) -> Option<u64> {
        (**self).len()
    }
}

impl<T: ByteSource + ?Sized> ByteSource for Arc<T> {
    #[inline]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }

    #[inline]
    fn len(&self) -> Option<u64> {
        (**self).len()
    }
}

impl<T: ByteSource + ?Sized> ByteSource for Box<T> {
    #[inline]
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        (**self).read_at(offset, buf)
    }

    #[inline]
    fn len(&self) -> Option<u64> {
        (**self).len()
    }
}

/// Adapts any `Read + Seek`er (a file, a cursor, ...) into a [`ByteSource`].
///
/// The reader is kept behind a mutex, every read seeks to the requested offset first.
pub struct ReadSeekSource<T: Read + Seek + Send> {
    inner: Mutex<T>,
    byte_len: Option<u64>,
}

impl<T: Read + Seek + Send> ReadSeekSource<T> {
    /// Instantiates a new `ReadSeekSource<T>` by taking ownership and wrapping the provided
    /// `Read + Seek`er.
    #[inline]
    pub fn new(inner: T, byte_len: Option<u64>) -> Self {
        ReadSeekSource {
            inner: Mutex::new(inner),
            byte_len,
        }
    }

    /// Wraps the reader and determines its length by seeking to the end.
    pub fn with_measured_len(mut inner: T) -> io::Result<Self> {
        let byte_len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;
        Ok(Self::new(inner, Some(byte_len)))
    }

    /// Unwraps the inner reader.
    pub fn into_inner(self) -> T {
        match self.inner.into_inner() {
            Ok(inner) => inner,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<T: Read + Seek + Send> ByteSource for ReadSeekSource<T> {
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<usize> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|_| io::Error::other("reader lock poisoned"))?;
        inner.seek(SeekFrom::Start(offset))?;
        loop {
            match inner.read(buf) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                res => return res,
            }
        }
    }

    #[inline]
    fn len(&self) -> Option<u64> {
        self.byte_len
    }
}
