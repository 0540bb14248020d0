use std::io::{self, Read, Seek, SeekFrom};

const DEFAULT_CHUNK_SIZE: usize = 4096;

/// Iterates the lines of a seekable source from last to first.
///
/// The source is read backwards in chunks and scanned byte by byte, so memory
/// use is bounded by the chunk size and the longest line. Carriage returns are
/// dropped and empty lines are skipped. A missing trailing newline is fine.
pub struct ReverseLines<R> {
    source: R,
    /// Offset in `source` where `chunk` starts.
    offset: u64,
    chunk: Vec<u8>,
    /// Bytes of `chunk` that have not been scanned yet.
    pending: usize,
    chunk_size: usize,
    done: bool,
}

impl<R: Read + Seek> ReverseLines<R> {
    pub fn new(source: R) -> io::Result<Self> {
        Self::with_chunk_size(source, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(mut source: R, chunk_size: usize) -> io::Result<Self> {
        let len = source.seek(SeekFrom::End(0))?;
        Ok(Self {
            source,
            offset: len,
            chunk: Vec::new(),
            pending: 0,
            chunk_size: chunk_size.max(1),
            done: false,
        })
    }

    fn prev_byte(&mut self) -> io::Result<Option<u8>> {
        if self.pending == 0 {
            if self.offset == 0 {
                return Ok(None);
            }
            let len = self.offset.min(self.chunk_size as u64);
            self.offset -= len;
            self.chunk.resize(len as usize, 0);
            self.source.seek(SeekFrom::Start(self.offset))?;
            self.source.read_exact(&mut self.chunk)?;
            self.pending = self.chunk.len();
        }
        self.pending -= 1;
        Ok(Some(self.chunk[self.pending]))
    }

    fn prev_line(&mut self) -> io::Result<Option<String>> {
        let mut line = Vec::new();
        loop {
            match self.prev_byte()? {
                None => break,
                Some(b'\n') if !line.is_empty() => break,
                Some(b'\n' | b'\r') => {}
                Some(byte) => line.push(byte),
            }
        }
        if line.is_empty() {
            return Ok(None);
        }
        line.reverse();
        Ok(Some(String::from_utf8_lossy(&line).into_owned()))
    }
}

impl<R: Read + Seek> Iterator for ReverseLines<R> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.prev_line() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
