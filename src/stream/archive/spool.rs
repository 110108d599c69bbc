use std::{
    io::{Error, ErrorKind, Result, Seek, SeekFrom, Write},
    sync::{Arc, Mutex, MutexGuard},
};

use bytes::Bytes;

/// In-memory sink for the zip writer which hands finished bytes out as they become final.
///
/// Positions are logical offsets into the archive. Bytes below `base` have already been released
/// and can no longer be rewritten, so the writer may only seek back into the entry it is working
/// on.
#[derive(Debug, Default)]
struct Spool {
    base: u64,
    position: u64,
    buffer: Vec<u8>,
}

impl Spool {
    fn end(&self) -> u64 {
        self.base + self.buffer.len() as u64
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        if self.position < self.base {
            return Err(Error::new(
                ErrorKind::Unsupported,
                "cannot rewrite bytes that were already emitted",
            ));
        }

        let offset = (self.position - self.base) as usize;
        if offset > self.buffer.len() {
            self.buffer.resize(offset, 0);
        }

        let overlap = (self.buffer.len() - offset).min(buf.len());
        self.buffer[offset..offset + overlap].copy_from_slice(&buf[..overlap]);
        self.buffer.extend_from_slice(&buf[overlap..]);
        self.position += buf.len() as u64;

        Ok(buf.len())
    }

    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        let target = match pos {
            SeekFrom::Start(offset) => Some(offset),
            SeekFrom::End(delta) => self.end().checked_add_signed(delta),
            SeekFrom::Current(delta) => self.position.checked_add_signed(delta),
        };

        match target {
            Some(target) if target >= self.base => {
                self.position = target;
                Ok(target)
            }
            _ => Err(Error::new(
                ErrorKind::Unsupported,
                "cannot seek before bytes that were already emitted",
            )),
        }
    }

    fn release(&mut self, upto: u64) -> Bytes {
        let upto = upto.clamp(self.base, self.end());
        let len = (upto - self.base) as usize;
        self.base = upto;
        Bytes::from(self.buffer.drain(..len).collect::<Vec<_>>())
    }
}

/// Shared handle to a [`Spool`], one side owned by the zip writer and one by the archive stream.
#[derive(Clone, Debug, Default)]
pub(crate) struct SpoolWriter {
    spool: Arc<Mutex<Spool>>,
}

impl SpoolWriter {
    fn lock(&self) -> Result<MutexGuard<'_, Spool>> {
        self.spool
            .lock()
            .map_err(|_| Error::new(ErrorKind::Other, "archive spool poisoned"))
    }

    /// Logical length of everything written so far.
    pub(crate) fn end(&self) -> Result<u64> {
        Ok(self.lock()?.end())
    }

    /// Takes every byte before `upto` that has not been released yet.
    pub(crate) fn release(&self, upto: u64) -> Result<Bytes> {
        Ok(self.lock()?.release(upto))
    }
}

impl Write for SpoolWriter {
    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        self.lock()?.write(buf)
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl Seek for SpoolWriter {
    fn seek(&mut self, pos: SeekFrom) -> Result<u64> {
        self.lock()?.seek(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewrites_within_unreleased_bytes() {
        let mut writer = SpoolWriter::default();
        writer.write_all(b"header....body").unwrap();
        writer.seek(SeekFrom::Start(6)).unwrap();
        writer.write_all(b"1234").unwrap();
        writer.seek(SeekFrom::End(0)).unwrap();
        writer.write_all(b"!").unwrap();

        assert_eq!(&writer.release(6).unwrap()[..], b"header");
        assert_eq!(&writer.release(u64::MAX).unwrap()[..], b"1234body!");
        assert_eq!(writer.end().unwrap(), 15);
    }

    #[test]
    fn released_bytes_are_final() {
        let mut writer = SpoolWriter::default();
        writer.write_all(b"abcdef").unwrap();
        writer.release(4).unwrap();

        assert!(writer.seek(SeekFrom::Start(2)).is_err());
        assert_eq!(writer.seek(SeekFrom::Current(-2)).unwrap(), 4);
        writer.write_all(b"EF").unwrap();
        assert_eq!(&writer.release(6).unwrap()[..], b"EF");
    }
}
