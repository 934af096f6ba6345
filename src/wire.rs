//! Line framing for the depot wire protocol.
//!
//! The protocol is newline-terminated ASCII with no other framing. Lines
//! longer than [`MAX_LINE`] bytes are truncated and the remainder up to the
//! newline is discarded.

use std::io;
use std::io::BufRead;

/// Maximum length of a protocol line, excluding the newline terminator.
pub const MAX_LINE: usize = 255;

/// Reads newline-terminated lines off a peer stream.
pub struct LineReader<R> {
    inner: R,
}

impl<R: BufRead> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Read the next line, stripped of its newline terminator.
    ///
    /// Returns `Ok(None)` once the stream hits EOF. An unterminated final
    /// line is returned as-is.
    pub fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut buf = Vec::new();

        if self.inner.read_until(b'\n', &mut buf)? == 0 {
            return Ok(None);
        }
        if buf.last() == Some(&b'\n') {
            buf.pop();
        }
        buf.truncate(MAX_LINE);

        Ok(Some(String::from_utf8_lossy(&buf).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufReader;

    fn reader(input: &str) -> LineReader<BufReader<&[u8]>> {
        LineReader::new(BufReader::new(input.as_bytes()))
    }

    #[test]
    fn test_lines_are_split_on_newline() {
        let mut r = reader("IM:9000:alpha\nDeliver:5:milk\n");

        assert_eq!(r.read_line().unwrap().as_deref(), Some("IM:9000:alpha"));
        assert_eq!(r.read_line().unwrap().as_deref(), Some("Deliver:5:milk"));
        assert_eq!(r.read_line().unwrap(), None);
    }

    #[test]
    fn test_long_lines_are_truncated() {
        let long = "x".repeat(MAX_LINE + 64);
        let input = format!("{long}\nDeliver:5:milk\n");
        let mut r = reader(&input);

        let line = r.read_line().unwrap().unwrap();
        assert_eq!(line.len(), MAX_LINE);
        // The remainder of the oversized line is gone, not re-framed.
        assert_eq!(r.read_line().unwrap().as_deref(), Some("Deliver:5:milk"));
    }

    #[test]
    fn test_unterminated_trailing_line() {
        let mut r = reader("Withdraw:1:coal");

        assert_eq!(r.read_line().unwrap().as_deref(), Some("Withdraw:1:coal"));
        assert_eq!(r.read_line().unwrap(), None);
    }

    #[test]
    fn test_empty_line() {
        let mut r = reader("\n");

        assert_eq!(r.read_line().unwrap().as_deref(), Some(""));
        assert_eq!(r.read_line().unwrap(), None);
    }
}
