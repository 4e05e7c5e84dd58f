use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use chunkyard_protocol::DEFAULT_CHUNK_SIZE;

use crate::TransferError;

/// Suffix of a committed chunk file.
const CHUNK_EXT: &str = "chunk";

/// Suffix of a chunk that is still being written.
const TEMP_EXT: &str = "tmp";

/// Staging file the destination is assembled into before the final rename.
const ASSEMBLY_FILE: &str = "assembly.tmp";

/// A slice of a source file, addressed by its starting offset.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub offset: u64,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// ChunkStore
// ---------------------------------------------------------------------------

/// Durable, append-only chunk storage for one upload session.
///
/// Layout inside the session directory:
/// - `<offset>.chunk`: one file per accepted chunk
/// - `<offset>.tmp`: exists only while that chunk is being written
/// - `assembly.tmp`: exists only while a commit is copying chunks
#[derive(Debug)]
pub struct ChunkStore {
    dir: PathBuf,
}

impl ChunkStore {
    /// Creates the session directory. Fails if it already exists.
    pub fn create(dir: PathBuf) -> io::Result<Self> {
        fs::create_dir(&dir)?;
        Ok(Self { dir })
    }

    /// The directory holding this store's chunk files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Final path of the chunk starting at `offset`.
    pub fn chunk_path(&self, offset: u64) -> PathBuf {
        self.dir.join(format!("{offset}.{CHUNK_EXT}"))
    }

    fn temp_path(&self, offset: u64) -> PathBuf {
        self.dir.join(format!("{offset}.{TEMP_EXT}"))
    }

    /// Persists `data` as the chunk starting at `offset`.
    ///
    /// The bytes are written and synced to `<offset>.tmp`, then renamed to
    /// `<offset>.chunk`, so a chunk is never visible under its final name
    /// half-written. On failure the temp file is removed and nothing is
    /// left under the final name by this call.
    pub fn write_chunk(&self, offset: u64, data: &[u8]) -> Result<PathBuf, TransferError> {
        let tmp = self.temp_path(offset);
        let chunk = self.chunk_path(offset);

        if let Err(e) = write_synced(&tmp, data) {
            let _ = fs::remove_file(&tmp);
            return Err(TransferError::storage("write", &tmp, e));
        }
        if let Err(e) = fs::rename(&tmp, &chunk) {
            let _ = fs::remove_file(&tmp);
            return Err(TransferError::storage("rename", &chunk, e));
        }
        if let Err(e) = sync_dir(&self.dir) {
            let _ = fs::remove_file(&chunk);
            return Err(TransferError::storage("sync", &self.dir, e));
        }

        Ok(chunk)
    }

    /// Concatenates `chunks`, in order, into `destination`.
    ///
    /// The output is staged inside the session directory and renamed onto
    /// `destination` only after every chunk has been copied and synced; a
    /// failed assembly removes the staging file and leaves `destination`
    /// untouched. Returns the number of bytes written.
    pub fn assemble(&self, chunks: &[PathBuf], destination: &Path) -> Result<u64, TransferError> {
        let staging = self.dir.join(ASSEMBLY_FILE);

        let total = match copy_chunks(chunks, &staging) {
            Ok(total) => total,
            Err(e) => {
                let _ = fs::remove_file(&staging);
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&staging, destination) {
            let _ = fs::remove_file(&staging);
            return Err(TransferError::storage("rename", destination, e));
        }
        if let Some(parent) = destination.parent() {
            sync_dir(parent).map_err(|e| TransferError::storage("sync", parent, e))?;
        }

        Ok(total)
    }

    /// Removes the session directory and everything in it.
    ///
    /// A directory that is already gone is not an error.
    pub fn remove(&self) -> Result<(), TransferError> {
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TransferError::storage("remove", &self.dir, e)),
        }
    }
}

/// Writes `data` to a fresh file at `path` and syncs it. The handle is
/// closed on every exit path when it goes out of scope.
fn write_synced(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(data)?;
    file.sync_all()
}

fn copy_chunks(chunks: &[PathBuf], staging: &Path) -> Result<u64, TransferError> {
    let mut out = File::create(staging).map_err(|e| TransferError::storage("create", staging, e))?;
    let mut total = 0u64;

    for chunk in chunks {
        let mut input = File::open(chunk).map_err(|e| TransferError::storage("open", chunk, e))?;
        total += io::copy(&mut input, &mut out).map_err(|e| TransferError::storage("copy", chunk, e))?;
    }

    out.sync_all()
        .map_err(|e| TransferError::storage("sync", staging, e))?;
    Ok(total)
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// ChunkReader
// ---------------------------------------------------------------------------

/// Reads a file in fixed-size chunks (sender side).
pub struct ChunkReader {
    file: File,
    chunk_size: usize,
    offset: u64,
    file_size: u64,
}

impl ChunkReader {
    /// Opens `path` for chunked reading.
    ///
    /// If `chunk_size` is 0, [`DEFAULT_CHUNK_SIZE`] (1 MiB) is used.
    pub fn new(path: &Path, chunk_size: usize) -> Result<Self, TransferError> {
        let file = File::open(path).map_err(|e| TransferError::storage("open", path, e))?;
        let file_size = file
            .metadata()
            .map_err(|e| TransferError::storage("stat", path, e))?
            .len();
        let chunk_size = if chunk_size == 0 {
            DEFAULT_CHUNK_SIZE
        } else {
            chunk_size
        };
        Ok(Self {
            file,
            chunk_size,
            offset: 0,
            file_size,
        })
    }

    /// Seeks to the given byte offset, e.g. the offset a server reported
    /// after a conflict.
    pub fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.file.seek(SeekFrom::Start(offset))?;
        self.offset = offset;
        Ok(())
    }

    /// Reads the next chunk. Returns `None` at EOF.
    pub fn next_chunk(&mut self) -> io::Result<Option<Chunk>> {
        if self.offset >= self.file_size {
            return Ok(None);
        }

        let remaining = self.file_size - self.offset;
        let read_size = usize::try_from(remaining).map_or(self.chunk_size, |r| r.min(self.chunk_size));
        let mut data = vec![0u8; read_size];
        let mut filled = 0;
        while filled < read_size {
            let n = self.file.read(&mut data[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            return Ok(None);
        }
        data.truncate(filled);

        let chunk = Chunk {
            offset: self.offset,
            data,
        };
        self.offset += filled as u64;
        Ok(Some(chunk))
    }

    /// Current byte offset.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Total file size in bytes.
    pub fn file_size(&self) -> u64 {
        self.file_size
    }
}
