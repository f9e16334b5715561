/// Splits streamed output into complete, prefixed lines.
///
/// Output from a child arrives in arbitrary byte chunks; a line is only
/// decoded and emitted once its newline has been seen, so a multi-byte
/// character split across reads stays intact. Invalid UTF-8 inside a line is
/// replaced with U+FFFD.
#[derive(Debug, Clone)]
pub struct LinePrefixer {
    prefix: String,
    pending: Vec<u8>,
}

impl LinePrefixer {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            pending: Vec::new(),
        }
    }

    /// Feed a chunk and collect every line it completes.
    pub fn prefix(&mut self, chunk: impl AsRef<[u8]>) -> Vec<String> {
        self.pending.extend_from_slice(chunk.as_ref());

        let mut lines = Vec::new();
        while let Some(newline) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=newline).collect();
            lines.push(self.format_line(&line));
        }
        lines
    }

    /// Emit the unterminated tail, if any.
    pub fn flush(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let tail = std::mem::take(&mut self.pending);
        Some(self.format_line(&tail))
    }

    pub fn prefix_str(&self) -> &str {
        &self.prefix
    }

    fn format_line(&self, line: &[u8]) -> String {
        let text = String::from_utf8_lossy(line);
        format!("{}{}", self.prefix, text.trim_end_matches(['\n', '\r']))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_lines_are_prefixed() {
        let mut prefixer = LinePrefixer::new("backend.stdout: ");
        assert_eq!(
            prefixer.prefix("one\ntwo\n"),
            vec!["backend.stdout: one", "backend.stdout: two"]
        );
        assert_eq!(prefixer.flush(), None);
    }

    #[test]
    fn partial_line_waits_for_newline() {
        let mut prefixer = LinePrefixer::new("p: ");
        assert!(prefixer.prefix("hel").is_empty());
        assert!(prefixer.prefix("lo wo").is_empty());
        assert_eq!(prefixer.prefix("rld\nnext"), vec!["p: hello world"]);
        assert_eq!(prefixer.flush(), Some("p: next".to_string()));
        assert_eq!(prefixer.flush(), None);
    }

    #[test]
    fn crlf_is_stripped() {
        let mut prefixer = LinePrefixer::new("e: ");
        assert_eq!(prefixer.prefix("warn\r\n"), vec!["e: warn"]);
    }

    #[test]
    fn multibyte_char_split_across_chunks() {
        let bytes = "naïve ✓\n".as_bytes();
        let split = bytes.iter().position(|&b| b == 0xe2).unwrap() + 1;
        let mut prefixer = LinePrefixer::new("o: ");
        assert!(prefixer.prefix(&bytes[..split]).is_empty());
        assert_eq!(prefixer.prefix(&bytes[split..]), vec!["o: naïve ✓"]);
    }

    #[test]
    fn invalid_utf8_is_replaced_per_line() {
        let mut prefixer = LinePrefixer::new("o: ");
        assert_eq!(prefixer.prefix(b"a\xffb\nok\n"), vec!["o: a\u{fffd}b", "o: ok"]);
    }

    #[test]
    fn empty_lines_are_kept() {
        let mut prefixer = LinePrefixer::new("x: ");
        assert_eq!(prefixer.prefix("\n\n"), vec!["x: ", "x: "]);
    }
}
