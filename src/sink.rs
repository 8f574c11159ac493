//! Record persistence
//!
//! [`CsvSink`] writes one line per accepted record:
//!
//! ```text
//! word,noun,adjective,verb,phrasal verb,adverb
//! run,1,0,1,0,0
//! ```
//!
//! Columns follow [`Attribute::ALL`]; header and rows are both derived from
//! it so they cannot drift apart.

use std::{fs::File, io::Write, path::Path};

use crate::config::DEFAULT_FLUSH_EVERY;
use crate::error::SinkError;
use crate::record::{Attribute, Record};

/// Consumer of deduplicated records
pub trait RecordSink: Send {
    /// Persist one accepted record
    fn accept(&mut self, record: &Record) -> Result<(), SinkError>;

    /// Flush anything buffered; called once when the crawl stops
    fn finish(&mut self) -> Result<(), SinkError>;
}

/// CSV writer with periodic flushing
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    flush_every: usize,
    written: usize,
}

impl CsvSink<File> {
    /// Create (or truncate) a CSV file and write the header
    pub fn create(path: impl AsRef<Path>) -> Result<Self, SinkError> {
        let file = File::create(path)?;
        Self::new(file)
    }
}

impl<W: Write> CsvSink<W> {
    /// Wrap a writer and emit the header immediately
    pub fn new(writer: W) -> Result<Self, SinkError> {
        let mut writer = csv::WriterBuilder::new().from_writer(writer);
        let mut header = vec!["word"];
        header.extend(Attribute::ALL.iter().map(|attr| attr.column()));
        writer.write_record(&header)?;

        Ok(Self {
            writer,
            flush_every: DEFAULT_FLUSH_EVERY,
            written: 0,
        })
    }

    /// Flush after every `n` records (default: 300, 0 disables periodic flushing)
    pub fn flush_every(mut self, n: usize) -> Self {
        self.flush_every = n;
        self
    }

    /// Number of records written so far
    pub fn written(&self) -> usize {
        self.written
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> Result<W, SinkError> {
        self.writer
            .into_inner()
            .map_err(|e| SinkError::Io(e.into_error()))
    }
}

impl<W: Write + Send> RecordSink for CsvSink<W> {
    fn accept(&mut self, record: &Record) -> Result<(), SinkError> {
        let mut row = Vec::with_capacity(Attribute::ALL.len() + 1);
        row.push(record.key.as_str());
        row.extend(Attribute::ALL.iter().map(|attr| {
            if record.attributes.contains(*attr) {
                "1"
            } else {
                "0"
            }
        }));
        self.writer.write_record(&row)?;
        self.written += 1;

        if self.flush_every > 0 && self.written % self.flush_every == 0 {
            self.writer.flush()?;
            tracing::debug!(written = self.written, "flushed sink");
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        tracing::debug!(written = self.written, "final sink flush");
        Ok(())
    }
}
