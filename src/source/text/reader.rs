use crate::sanitize::filter_utf8;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom};

/// Anything a seekable log can be read from
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

enum Input {
    Seekable {
        reader: BufReader<Box<dyn ReadSeek>>,
        len: u64,
    },
    Stream(Box<dyn BufRead + Send>),
}

/// Line-oriented reader with a one-line look-back slot
///
/// Lines are returned without their terminator and with invalid UTF-8
/// replaced. Parsers that read one line too far hand it back through
/// [`LineReader::push_back`].
pub struct LineReader {
    input: Input,
    lastline: Option<String>,
    offset: u64,
    eof: bool,
    buf: Vec<u8>,
}

impl LineReader {
    /// Reader over random-access input
    pub fn seekable(mut reader: impl ReadSeek + 'static) -> io::Result<Self> {
        let len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        let boxed: Box<dyn ReadSeek> = Box::new(reader);
        Ok(Self::with_input(Input::Seekable {
            reader: BufReader::new(boxed),
            len,
        }))
    }

    /// Reader over forward-only input such as stdin
    pub fn stream(reader: impl BufRead + Send + 'static) -> Self {
        Self::with_input(Input::Stream(Box::new(reader)))
    }

    fn with_input(input: Input) -> Self {
        Self {
            input,
            lastline: None,
            offset: 0,
            eof: false,
            buf: Vec::new(),
        }
    }

    pub fn is_seekable(&self) -> bool {
        matches!(self.input, Input::Seekable { .. })
    }

    fn buf_read(&mut self) -> &mut dyn BufRead {
        match &mut self.input {
            Input::Seekable { reader, .. } => reader as &mut dyn BufRead,
            Input::Stream(reader) => reader.as_mut(),
        }
    }

    /// Next line, or `None` at end of input
    pub fn next_line(&mut self) -> Option<String> {
        if let Some(line) = self.lastline.take() {
            return Some(line);
        }
        if self.eof {
            return None;
        }

        let mut buf = std::mem::take(&mut self.buf);
        buf.clear();
        let read = self.buf_read().read_until(b'\n', &mut buf);
        let line = match read {
            Ok(0) => {
                self.eof = true;
                None
            }
            Ok(n) => {
                self.offset += n as u64;
                while matches!(buf.last(), Some(b'\n' | b'\r')) {
                    buf.pop();
                }
                Some(filter_utf8(&buf))
            }
            Err(e) => {
                tracing::warn!("Error reading log, treating as end of input: {}", e);
                self.eof = true;
                None
            }
        };
        self.buf = buf;
        line
    }

    /// Return `line` from the next call to [`LineReader::next_line`]
    pub fn push_back(&mut self, line: String) {
        self.lastline = Some(line);
    }

    /// First unread byte, without consuming it
    pub fn peek_byte(&mut self) -> Option<u8> {
        if let Some(line) = &self.lastline {
            return line.as_bytes().first().copied().or(Some(b'\n'));
        }
        match self.buf_read().fill_buf() {
            Ok(bytes) => bytes.first().copied(),
            Err(_) => None,
        }
    }

    /// Nothing left to read, including the look-back slot
    pub fn at_end(&mut self) -> bool {
        if self.lastline.is_some() {
            return false;
        }
        if !self.eof && self.peek_byte().is_none() {
            self.eof = true;
        }
        self.eof
    }

    /// Byte offset of the next unread line
    pub fn position(&self) -> u64 {
        self.offset
    }

    /// Progress through seekable input in `0.0..=1.0`; always `0.0` for streams
    pub fn percent(&self) -> f32 {
        match &self.input {
            Input::Seekable { len, .. } if *len > 0 => {
                (self.offset as f64 / *len as f64).min(1.0) as f32
            }
            _ => 0.0,
        }
    }

    /// Jump to `fraction` of the input and skip to the start of the next line.
    /// No-op on streams.
    pub fn seek_to(&mut self, fraction: f32) {
        let Input::Seekable { len, .. } = &self.input else {
            return;
        };
        let target = (*len as f64 * fraction.clamp(0.0, 1.0) as f64) as u64;
        if self.set_position(target).is_err() {
            return;
        }
        if target > 0 {
            // land mid-line: discard the partial line
            self.next_line();
        }
    }

    /// Move to an absolute byte offset, clearing the look-back slot
    pub fn set_position(&mut self, pos: u64) -> io::Result<()> {
        let Input::Seekable { reader, .. } = &mut self.input else {
            return Err(io::Error::new(
                io::ErrorKind::Unsupported,
                "stream is not seekable",
            ));
        };
        reader.seek(SeekFrom::Start(pos))?;
        self.offset = pos;
        self.lastline = None;
        self.eof = false;
        Ok(())
    }

    pub(crate) fn take_lastline(&mut self) -> Option<String> {
        self.lastline.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn seekable(text: &str) -> LineReader {
        LineReader::seekable(Cursor::new(text.as_bytes().to_vec())).unwrap()
    }

    #[test]
    fn test_reads_lines_without_terminators() {
        let mut reader = seekable("one\r\ntwo\nthree");
        assert_eq!(reader.next_line().as_deref(), Some("one"));
        assert_eq!(reader.next_line().as_deref(), Some("two"));
        assert_eq!(reader.next_line().as_deref(), Some("three"));
        assert_eq!(reader.next_line(), None);
        assert!(reader.at_end());
    }

    #[test]
    fn test_push_back_is_returned_first() {
        let mut reader = seekable("a\nb\n");
        let first = reader.next_line().unwrap();
        reader.push_back(first);
        assert!(!reader.at_end());
        assert_eq!(reader.next_line().as_deref(), Some("a"));
        assert_eq!(reader.next_line().as_deref(), Some("b"));
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let mut reader = LineReader::seekable(Cursor::new(b"ok\xff\n".to_vec())).unwrap();
        assert_eq!(reader.next_line().as_deref(), Some("ok?"));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut reader = LineReader::stream(Cursor::new(b"user:x\n".to_vec()));
        assert_eq!(reader.peek_byte(), Some(b'u'));
        assert_eq!(reader.next_line().as_deref(), Some("user:x"));
    }

    #[test]
    fn test_percent_tracks_offset() {
        let mut reader = seekable("aaa\nbbb\n");
        assert_eq!(reader.percent(), 0.0);
        reader.next_line();
        assert_eq!(reader.percent(), 0.5);
        reader.next_line();
        assert_eq!(reader.percent(), 1.0);
    }

    #[test]
    fn test_seek_skips_partial_line() {
        let mut reader = seekable("aaaa\nbbbb\ncccc\n");
        reader.seek_to(0.4);
        assert_eq!(reader.next_line().as_deref(), Some("cccc"));

        reader.seek_to(0.0);
        assert_eq!(reader.next_line().as_deref(), Some("aaaa"));
    }

    #[test]
    fn test_seek_clears_push_back() {
        let mut reader = seekable("aaaa\nbbbb\n");
        let line = reader.next_line().unwrap();
        reader.push_back(line);
        reader.seek_to(0.0);
        assert_eq!(reader.next_line().as_deref(), Some("aaaa"));
        assert_eq!(reader.next_line().as_deref(), Some("bbbb"));
    }

    #[test]
    fn test_stream_is_not_seekable() {
        let mut reader = LineReader::stream(Cursor::new(b"x\ny\n".to_vec()));
        assert!(!reader.is_seekable());
        reader.seek_to(0.5);
        assert_eq!(reader.next_line().as_deref(), Some("x"));
        assert_eq!(reader.percent(), 0.0);
        assert!(reader.set_position(0).is_err());
    }
}
