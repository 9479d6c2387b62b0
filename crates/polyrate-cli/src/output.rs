//! JSON output formatting

use crate::pipeline::StreamStats;
use serde::Serialize;

/// Summary printed after a file has been processed
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub status: String,
    pub mode: String,
    pub input_file: String,
    pub output_file: String,
    pub input_rate: u32,
    pub output_rate: u32,
    pub channels: u16,
    pub frames_in: usize,
    pub frames_out: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ratio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_taps: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_samples: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tail_frames: Option<usize>,
    pub processing_time_seconds: f64,
}

impl RunReport {
    /// Fill the stream counters from a pipeline run
    pub fn with_stats(mut self, stats: &StreamStats) -> Self {
        self.frames_in = stats.frames_in;
        self.frames_out = stats.frames_out;
        self.chunks = Some(stats.chunks);
        self.tail_frames = Some(stats.tail_frames);
        self
    }
}

/// Print any serializable value as pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing result: {}", e),
    }
}
