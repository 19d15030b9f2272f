//! Packed notification records.
//!
//! A filled buffer holds a chain of variable-length records:
//!
//! ```text
//! +-------------------+--------+----------+------------------+
//! | next_entry_offset | action | name_len | name (UTF-8) ... |
//! |       u32 LE      | u32 LE |  u32 LE  |   padded to 4    |
//! +-------------------+--------+----------+------------------+
//! ```
//!
//! `next_entry_offset` is relative to the start of the record and is zero on
//! the last record of the chain.

use std::borrow::Cow;

/// Size of the fixed record header.
pub const RECORD_HEADER_LEN: usize = 12;

const ALIGN: usize = 4;

/// Action code carried by a notification record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Added,
    Removed,
    Modified,
    RenamedOldName,
    RenamedNewName,
    /// A code outside the known table.
    Other(u32),
}

impl Action {
    /// Wire code for this action.
    pub fn code(self) -> u32 {
        match self {
            Self::Added => 1,
            Self::Removed => 2,
            Self::Modified => 3,
            Self::RenamedOldName => 4,
            Self::RenamedNewName => 5,
            Self::Other(code) => code,
        }
    }
}

impl From<u32> for Action {
    fn from(code: u32) -> Self {
        match code {
            1 => Self::Added,
            2 => Self::Removed,
            3 => Self::Modified,
            4 => Self::RenamedOldName,
            5 => Self::RenamedNewName,
            other => Self::Other(other),
        }
    }
}

/// One decoded notification record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record<'a> {
    pub action: Action,
    /// Name relative to the watched root.
    pub name: Cow<'a, str>,
}

/// Encoded length of a record with a name of `name_len` bytes.
pub fn encoded_len(name_len: usize) -> usize {
    (RECORD_HEADER_LEN + name_len).next_multiple_of(ALIGN)
}

fn read_u32(buf: &[u8], at: usize) -> Option<u32> {
    let bytes = buf.get(at..at + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Iterator over the records of a filled buffer.
///
/// Stops at a zero `next_entry_offset`, at the end of the buffer, or at the
/// first record that does not fit inside the buffer.
pub struct Records<'a> {
    buf: &'a [u8],
    pos: Option<usize>,
}

/// Parse the filled portion of a notification buffer.
pub fn records(buf: &[u8]) -> Records<'_> {
    Records {
        buf,
        pos: if buf.is_empty() { None } else { Some(0) },
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Record<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let pos = self.pos.take()?;

        let next = read_u32(self.buf, pos)? as usize;
        let action = Action::from(read_u32(self.buf, pos + 4)?);
        let name_len = read_u32(self.buf, pos + 8)? as usize;
        let name_start = pos + RECORD_HEADER_LEN;
        let name = self.buf.get(name_start..name_start.checked_add(name_len)?)?;

        if next != 0 {
            if next < RECORD_HEADER_LEN {
                tracing::debug!("Malformed record chain at offset {pos}: next offset {next}");
            } else if pos + next < self.buf.len() {
                self.pos = Some(pos + next);
            }
        }

        Some(Record {
            action,
            name: String::from_utf8_lossy(name),
        })
    }
}

/// `next_entry_offset` linking the record at `prev` to the one at `at`.
fn chain_offset(prev: usize, at: usize) -> Option<u32> {
    u32::try_from(at.checked_sub(prev)?).ok()
}

/// Packs records into a caller-owned buffer.
pub struct RecordWriter<'a> {
    buf: &'a mut [u8],
    len: usize,
    last: Option<usize>,
}

impl<'a> RecordWriter<'a> {
    /// Start writing at the beginning of `buf`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            len: 0,
            last: None,
        }
    }

    /// Append a record. Returns `false`, leaving the buffer untouched, when
    /// the record does not fit.
    pub fn push(&mut self, action: Action, name: &str) -> bool {
        let Ok(name_len) = u32::try_from(name.len()) else {
            return false;
        };
        let size = encoded_len(name.len());
        if self.len + size > self.buf.len() {
            return false;
        }

        let at = self.len;
        let link = match self.last {
            Some(prev) => match chain_offset(prev, at) {
                Some(offset) => Some((prev, offset)),
                None => return false,
            },
            None => None,
        };

        let record = &mut self.buf[at..at + size];
        record.fill(0);
        record[4..8].copy_from_slice(&action.code().to_le_bytes());
        record[8..12].copy_from_slice(&name_len.to_le_bytes());
        record[RECORD_HEADER_LEN..RECORD_HEADER_LEN + name.len()].copy_from_slice(name.as_bytes());

        if let Some((prev, offset)) = link {
            self.buf[prev..prev + 4].copy_from_slice(&offset.to_le_bytes());
        }

        self.last = Some(at);
        self.len += size;
        true
    }

    /// Whether nothing has been written yet.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of bytes written so far.
    pub fn finish(self) -> usize {
        self.len
    }
}
