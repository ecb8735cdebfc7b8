//! Persistence seam.
//!
//! The engine hands finalized readings and learned words to a sink and never
//! waits on its success: failures are logged by the caller and dropped.

use crate::mood::MoodLabel;
use crate::reading::SentimentReading;

pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

pub trait ReadingSink: Send {
    /// Called once per finalized reading.
    fn record_reading(&mut self, reading: &SentimentReading) -> Result<(), SinkError>;

    /// Called once per learned word.
    fn record_pattern(&mut self, word: &str, mood: MoodLabel) -> Result<(), SinkError>;

    /// Readings after this call belong to a new conversation.
    fn begin_conversation(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Keeps everything in memory. Useful for tests and for running without a
/// database.
#[derive(Clone, Debug, Default)]
pub struct MemorySink {
    pub readings: Vec<SentimentReading>,
    pub patterns: Vec<(String, MoodLabel)>,
}

impl ReadingSink for MemorySink {
    fn record_reading(&mut self, reading: &SentimentReading) -> Result<(), SinkError> {
        self.readings.push(reading.clone());
        Ok(())
    }

    fn record_pattern(&mut self, word: &str, mood: MoodLabel) -> Result<(), SinkError> {
        self.patterns.push((word.to_string(), mood));
        Ok(())
    }
}
