use std::fs::File;
use std::hash::Hasher as _;
use std::io::{self, Read};
use std::path::Path;
use twox_hash::XxHash64;

const READ_BUFFER_SIZE: usize = 64 * 1024; // 64KB

/// Content fingerprint of a whole file: XxHash64 (seed 0) over every byte,
/// streamed so large files are never held in memory.
///
/// The fingerprint only buckets candidates. Equal fingerprints must be
/// confirmed with [`contents_equal`].
pub fn hash_file(file: &Path) -> io::Result<u64> {
    let mut reader = File::open(file)?;
    let mut hasher = XxHash64::with_seed(0);
    let mut buffer = vec![0; READ_BUFFER_SIZE];

    loop {
        let bytes_read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        hasher.write(&buffer[..bytes_read]);
    }

    Ok(hasher.finish())
}

/// A failed read during [`contents_equal`], tagged with the file it came from.
#[derive(Debug)]
pub enum CompareError {
    Left(io::Error),
    Right(io::Error),
}

/// Byte-for-byte comparison of two files.
pub fn contents_equal(a: &Path, b: &Path) -> Result<bool, CompareError> {
    let len_a = a.metadata().map_err(CompareError::Left)?.len();
    let len_b = b.metadata().map_err(CompareError::Right)?.len();
    if len_a != len_b {
        return Ok(false);
    }

    let mut reader_a = File::open(a).map_err(CompareError::Left)?;
    let mut reader_b = File::open(b).map_err(CompareError::Right)?;
    let mut buffer_a = vec![0; READ_BUFFER_SIZE];
    let mut buffer_b = vec![0; READ_BUFFER_SIZE];

    loop {
        let read_a = fill_buffer(&mut reader_a, &mut buffer_a).map_err(CompareError::Left)?;
        let read_b = fill_buffer(&mut reader_b, &mut buffer_b).map_err(CompareError::Right)?;

        if read_a != read_b || buffer_a[..read_a] != buffer_b[..read_b] {
            return Ok(false);
        }
        if read_a == 0 {
            return Ok(true);
        }
    }
}

/// Read until `buffer` is full or the reader is exhausted, so two readers
/// returning short reads at different offsets still line up.
fn fill_buffer(reader: &mut impl Read, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
