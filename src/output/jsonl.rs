//! Newline-delimited JSON event output

use super::traits::{OutputHandler, OutputResult};
use crate::crawler::CrawlEvent;
use crate::state::CrawlState;
use std::io::Write;

/// Writes every event as one JSON object per line
///
/// Each line is flushed as soon as it is written so that a consumer piping
/// the output sees results while the crawl is still running.
pub struct JsonLinesWriter<W: Write> {
    out: W,
    lines: u64,
}

impl<W: Write> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, lines: 0 }
    }

    /// Number of events written so far
    pub fn lines_written(&self) -> u64 {
        self.lines
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> OutputHandler for JsonLinesWriter<W> {
    fn record_event(&mut self, event: &CrawlEvent) -> OutputResult<()> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        self.lines += 1;
        Ok(())
    }

    fn finalize(&mut self, _state: CrawlState) -> OutputResult<()> {
        self.out.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crawler::LogKind;

    #[test]
    fn test_one_line_per_event() {
        let mut writer = JsonLinesWriter::new(Vec::new());
        writer
            .record_event(&CrawlEvent::log(LogKind::Info, "starting"))
            .unwrap();
        writer
            .record_event(&CrawlEvent::Done {
                total_links: 0,
                visited: 1,
            })
            .unwrap();
        writer.finalize(CrawlState::Completed).unwrap();
        assert_eq!(writer.lines_written(), 2);

        let text = String::from_utf8(writer.into_inner()).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["event"], "log");
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["event"], "done");
        assert_eq!(second["visited"], 1);
    }
}
