use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::Result;

/// The file scalar events are appended to inside the output directory.
pub const EVENTS_FILE: &str = "events.jsonl";

/// A tagged scalar recorded at a training iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalarEvent {
    pub tag: String,
    pub value: f32,
    pub step: usize,
}

/// Receives scalar summaries from the training loop.
pub trait TelemetrySink {
    /// Records `value` under `tag` at iteration `step`.
    fn scalar(&mut self, tag: &str, value: f32, step: usize) -> Result<()>;

    /// Pushes buffered events to their destination.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: TelemetrySink + ?Sized> TelemetrySink for &mut S {
    fn scalar(&mut self, tag: &str, value: f32, step: usize) -> Result<()> {
        (**self).scalar(tag, value, step)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}

/// Writes one JSON object per line.
pub struct JsonlSink<W: Write> {
    writer: W,
}

impl JsonlSink<BufWriter<File>> {
    /// Creates `events.jsonl` inside `dir`, truncating any previous one.
    pub fn create(dir: &Path) -> Result<Self> {
        let file = File::create(dir.join(EVENTS_FILE))?;
        Ok(Self::new(BufWriter::new(file)))
    }
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> TelemetrySink for JsonlSink<W> {
    fn scalar(&mut self, tag: &str, value: f32, step: usize) -> Result<()> {
        let event = ScalarEvent {
            tag: tag.to_string(),
            value,
            step,
        };

        serde_json::to_writer(&mut self.writer, &event)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub events: Vec<ScalarEvent>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The events recorded under `tag`, as `(step, value)` pairs.
    pub fn series(&self, tag: &str) -> Vec<(usize, f32)> {
        self.events
            .iter()
            .filter(|e| e.tag == tag)
            .map(|e| (e.step, e.value))
            .collect()
    }
}

impl TelemetrySink for MemorySink {
    fn scalar(&mut self, tag: &str, value: f32, step: usize) -> Result<()> {
        self.events.push(ScalarEvent {
            tag: tag.to_string(),
            value,
            step,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jsonl_writes_one_event_per_line() {
        let mut sink = JsonlSink::new(Vec::new());

        sink.scalar("train_step_loss", 0.5, 0).unwrap();
        sink.scalar("train_step_acc", 1., 5).unwrap();
        sink.flush().unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let events: Vec<ScalarEvent> = out
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();

        assert_eq!(events.len(), 2);
        assert_eq!(events[1].tag, "train_step_acc");
        assert_eq!(events[1].step, 5);
    }

    #[test]
    fn memory_series_filters_by_tag() {
        let mut sink = MemorySink::new();
        sink.scalar("a", 1., 0).unwrap();
        sink.scalar("b", 2., 0).unwrap();
        sink.scalar("a", 3., 4).unwrap();

        assert_eq!(sink.series("a"), [(0, 1.), (4, 3.)]);
    }
}
