use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{error, warn};

use crate::model::StoreRecord;
use crate::repository::StoreError;

/// Largest payload written or accepted back on replay. A length prefix above
/// it is treated like any other corrupt tail.
pub const MAX_RECORD_BYTES: usize = 64 * 1024 * 1024;

/// Rows per record when compaction writes the snapshot.
pub const SNAPSHOT_ROWS_PER_RECORD: usize = 50_000;

/// Length prefix plus CRC trailer.
const FRAME_OVERHEAD: usize = 8;

/// The file under a [`Wal`]. Only `File` in production.
pub trait LogFile: Write + Send {
    fn sync(&mut self) -> io::Result<()>;
    fn truncate(&mut self, len: u64) -> io::Result<()>;
}

impl LogFile for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }

    fn truncate(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

/// Log of committed row images, one frame per commit:
/// `[u32 len][bincode StoreRecord][u32 crc32 of the payload]`.
///
/// `len` tracks the durable prefix. A failed append is cut back to it; if
/// the cut fails too the log is poisoned and refuses appends until reopened.
pub struct Wal<F: LogFile = File> {
    file: F,
    path: PathBuf,
    len: u64,
    appends_since_compact: u64,
    poisoned: bool,
}

impl Wal<File> {
    /// Replay the log at `path` (created if missing) and open it for
    /// appending. A torn or corrupt tail is cut off so later appends stay
    /// reachable. Replayed records count towards the next compaction.
    pub fn open(path: &Path) -> Result<(Self, Vec<StoreRecord>), StoreError> {
        let (records, intact) = match File::open(path) {
            Ok(file) => read_frames(file)?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => (Vec::new(), 0),
            Err(e) => return Err(e.into()),
        };
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let on_disk = file.metadata()?.len();
        if on_disk > intact {
            warn!(path = %path.display(), on_disk, intact, "cutting torn WAL tail");
            file.set_len(intact)?;
            file.sync_all()?;
        }
        let wal = Self {
            file,
            path: path.to_path_buf(),
            len: intact,
            appends_since_compact: records.len() as u64,
            poisoned: false,
        };
        Ok((wal, records))
    }

    /// Replace the log with `records`: write a temp file, fsync, rename over
    /// the log, reopen.
    pub fn compact(&mut self, records: &[StoreRecord]) -> Result<(), StoreError> {
        if self.poisoned {
            return Err(StoreError::LogPoisoned);
        }
        let tmp_path = self.path.with_extension("wal.tmp");
        let mut writer = BufWriter::new(File::create(&tmp_path)?);
        let mut len = 0u64;
        for record in records {
            let buf = frame(record)?;
            writer.write_all(&buf)?;
            len += buf.len() as u64;
        }
        let tmp = writer.into_inner().map_err(|e| e.into_error())?;
        tmp.sync_all()?;
        drop(tmp);
        fs::rename(&tmp_path, &self.path)?;

        // Past the rename the old handle points at an unlinked file.
        match OpenOptions::new().append(true).open(&self.path) {
            Ok(file) => self.file = file,
            Err(e) => {
                error!(path = %self.path.display(), "reopening compacted WAL failed: {e}");
                self.poisoned = true;
                return Err(e.into());
            }
        }
        self.len = len;
        self.appends_since_compact = 0;
        Ok(())
    }
}

impl<F: LogFile> Wal<F> {
    /// Append one record and fsync.
    pub fn append(&mut self, record: &StoreRecord) -> Result<(), StoreError> {
        if self.poisoned {
            return Err(StoreError::LogPoisoned);
        }
        let buf = frame(record)?;
        if let Err(e) = self.file.write_all(&buf).and_then(|()| self.file.sync()) {
            self.roll_back();
            return Err(e.into());
        }
        self.len += buf.len() as u64;
        self.appends_since_compact += 1;
        Ok(())
    }

    fn roll_back(&mut self) {
        match self.file.truncate(self.len).and_then(|()| self.file.sync()) {
            Ok(()) => warn!(len = self.len, "rolled back failed WAL append"),
            Err(e) => {
                error!(len = self.len, "WAL rollback failed, refusing further appends: {e}");
                self.poisoned = true;
            }
        }
    }

    pub fn appends_since_compact(&self) -> u64 {
        self.appends_since_compact
    }
}

fn frame(record: &StoreRecord) -> Result<Vec<u8>, StoreError> {
    let payload = bincode::serialize(record)?;
    if payload.len() > MAX_RECORD_BYTES {
        return Err(StoreError::RecordTooLarge(payload.len()));
    }
    let mut buf = Vec::with_capacity(payload.len() + FRAME_OVERHEAD);
    buf.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    buf.extend_from_slice(&payload);
    buf.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    Ok(buf)
}

/// Decode frames up to the first torn, oversized or corrupt one. Returns the
/// records and the byte length of the intact prefix.
fn read_frames(source: impl Read) -> io::Result<(Vec<StoreRecord>, u64)> {
    let mut reader = BufReader::new(source);
    let mut records = Vec::new();
    let mut intact = 0u64;
    loop {
        let mut len_buf = [0u8; 4];
        if !read_full(&mut reader, &mut len_buf)? {
            break;
        }
        let len = u32::from_le_bytes(len_buf) as usize;
        if len > MAX_RECORD_BYTES {
            break;
        }
        let mut payload = vec![0u8; len];
        let mut crc_buf = [0u8; 4];
        if !read_full(&mut reader, &mut payload)? || !read_full(&mut reader, &mut crc_buf)? {
            break;
        }
        if u32::from_le_bytes(crc_buf) != crc32fast::hash(&payload) {
            break;
        }
        match bincode::deserialize::<StoreRecord>(&payload) {
            Ok(record) => records.push(record),
            Err(_) => break,
        }
        intact += (len + FRAME_OVERHEAD) as u64;
    }
    Ok((records, intact))
}

/// `Ok(false)` when the input ends before `buf` is filled.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<bool> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(e),
    }
}
