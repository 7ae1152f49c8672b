//! Display boundary that prints each update as one JSON object per line.

use std::io::Write;

use corrige_core::types::DisplayUpdate;
use corrige_typing::DisplayBoundary;

/// Writes `{"text": ..., "state": ...}` lines to `W`.
pub struct JsonLines<W> {
    writer: W,
}

impl JsonLines<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write> JsonLines<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    fn write_update(&mut self, update: &DisplayUpdate) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.writer, update)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()
    }
}

impl<W: Write + Send + 'static> DisplayBoundary for JsonLines<W> {
    fn present(&mut self, update: &DisplayUpdate) {
        if let Err(e) = self.write_update(update) {
            tracing::warn!(error = %e, "Failed to write display update");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corrige_core::types::DisplayStatus;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_one_json_object_per_line() {
        let buf = SharedBuf::default();
        let mut out = JsonLines::new(buf.clone());
        out.present(&DisplayUpdate::new("helo → hello", DisplayStatus::Suggestion));
        out.present(&DisplayUpdate::new("Waiting...", DisplayStatus::Waiting));

        let bytes = buf.0.lock().unwrap().clone();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["text"], "helo → hello");
        assert_eq!(first["state"], "suggestion");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["state"], "waiting");
    }
}
