use crate::state::FileId;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Seek, SeekFrom};
use std::path::Path;

/// One complete line, with the byte offset of the first byte past its
/// terminator. Committing `end_offset` after delivering the line preserves
/// the tailing invariant exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub end_offset: u64,
}

/// Reads the complete lines between a resume offset and the length the file
/// had when it was opened.
///
/// The open-time length is a static snapshot boundary: bytes appended while
/// the run is in progress belong to the next invocation. A trailing line
/// with no terminator, or one whose terminator lands past the boundary, is
/// incomplete; it is not delivered and its bytes are not counted as
/// consumed, so the next run re-reads it from its first byte.
pub struct LineSource {
    reader: BufReader<File>,
    identity: FileId,
    snapshot_len: u64,
    offset: u64,
    done: bool,
}

impl LineSource {
    /// Open the target file and capture identity and length from the open
    /// handle, so the rotation decision and the read loop observe the same
    /// file even if the path is swapped underneath us.
    pub fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path)?;
        let metadata = file.metadata()?;
        let identity = FileId::from_metadata(&metadata);
        let snapshot_len = metadata.len();

        Ok(Self {
            reader: BufReader::new(file),
            identity,
            snapshot_len,
            offset: 0,
            done: false,
        })
    }

    pub fn identity(&self) -> FileId {
        self.identity
    }

    /// File length at open time; the exclusive upper bound for this run.
    pub fn snapshot_len(&self) -> u64 {
        self.snapshot_len
    }

    /// Byte offset of the next unread byte.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn seek_to(&mut self, offset: u64) -> io::Result<()> {
        self.reader.seek(SeekFrom::Start(offset))?;
        self.offset = offset;
        self.done = false;
        Ok(())
    }

    fn read_next(&mut self) -> io::Result<Option<Line>> {
        if self.done || self.offset >= self.snapshot_len {
            return Ok(None);
        }

        let mut buf = Vec::new();
        let n = self.reader.read_until(b'\n', &mut buf)?;
        if n == 0 {
            self.done = true;
            return Ok(None);
        }

        let end = self.offset + n as u64;
        if buf.last() != Some(&b'\n') || end > self.snapshot_len {
            // Unterminated trailing data, or a line completed only after the
            // snapshot was taken. Leave it unconsumed.
            self.done = true;
            return Ok(None);
        }

        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }

        self.offset = end;
        Ok(Some(Line {
            // Lossy conversion: a stray invalid byte must not abort the run.
            // Offsets stay byte-exact since they come from byte counts.
            text: String::from_utf8_lossy(&buf).into_owned(),
            end_offset: end,
        }))
    }
}

impl Iterator for LineSource {
    type Item = io::Result<Line>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_next() {
            Ok(Some(line)) => Some(Ok(line)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content).unwrap();
        file.flush().unwrap();
        file
    }

    fn collect(source: LineSource) -> Vec<Line> {
        source.map(|r| r.unwrap()).collect()
    }

    #[test]
    fn test_lines_with_offsets() {
        let file = write_file(b"alpha\nbeta\ngamma\n");
        let mut source = LineSource::open(file.path()).unwrap();
        source.seek_to(0).unwrap();

        let lines = collect(source);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], Line { text: "alpha".into(), end_offset: 6 });
        assert_eq!(lines[1], Line { text: "beta".into(), end_offset: 11 });
        assert_eq!(lines[2], Line { text: "gamma".into(), end_offset: 17 });
    }

    #[test]
    fn test_trailing_partial_line_excluded() {
        let file = write_file(b"done\nhalf");
        let mut source = LineSource::open(file.path()).unwrap();
        source.seek_to(0).unwrap();

        let lines = collect(source);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "done");
        assert_eq!(lines[0].end_offset, 5);
    }

    #[test]
    fn test_resume_from_offset() {
        let file = write_file(b"old line\nnew line\n");
        let mut source = LineSource::open(file.path()).unwrap();
        source.seek_to(9).unwrap();

        let lines = collect(source);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "new line");
        assert_eq!(lines[0].end_offset, 18);
    }

    #[test]
    fn test_resume_at_end_yields_nothing() {
        let file = write_file(b"only\n");
        let mut source = LineSource::open(file.path()).unwrap();
        source.seek_to(5).unwrap();

        assert!(collect(source).is_empty());
    }

    #[test]
    fn test_crlf_terminators() {
        let file = write_file(b"one\r\ntwo\r\n");
        let mut source = LineSource::open(file.path()).unwrap();
        source.seek_to(0).unwrap();

        let lines = collect(source);
        assert_eq!(lines[0], Line { text: "one".into(), end_offset: 5 });
        assert_eq!(lines[1], Line { text: "two".into(), end_offset: 10 });
    }

    #[test]
    fn test_empty_file() {
        let file = write_file(b"");
        let mut source = LineSource::open(file.path()).unwrap();
        source.seek_to(0).unwrap();

        assert!(collect(source).is_empty());
    }

    #[test]
    fn test_appends_after_open_are_not_seen() {
        let mut file = write_file(b"before\n");
        let mut source = LineSource::open(file.path()).unwrap();
        source.seek_to(0).unwrap();

        file.write_all(b"during\n").unwrap();
        file.flush().unwrap();

        let lines = collect(source);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "before");
        assert_eq!(lines[0].end_offset, 7);
    }

    #[test]
    fn test_invalid_utf8_is_lossy_but_offsets_exact() {
        let file = write_file(b"ok \xff\xfe line\nnext\n");
        let mut source = LineSource::open(file.path()).unwrap();
        source.seek_to(0).unwrap();

        let lines = collect(source);
        assert_eq!(lines.len(), 2);
        // 11 bytes including the two invalid ones and the newline.
        assert_eq!(lines[0].end_offset, 11);
        assert!(lines[0].text.contains('\u{FFFD}'));
        assert_eq!(lines[1].text, "next");
    }

    #[test]
    fn test_identity_and_len_from_open_handle() {
        let file = write_file(b"abc\n");
        let source = LineSource::open(file.path()).unwrap();

        let meta = std::fs::metadata(file.path()).unwrap();
        assert_eq!(source.identity(), FileId::from_metadata(&meta));
        assert_eq!(source.snapshot_len(), 4);
    }
}
