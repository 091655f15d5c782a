use std::time::SystemTime;

/// Capture statistics
#[derive(Clone, Debug, Default)]
pub struct CaptureStats {
    pub captures: u64,
    pub skipped: u64,
    pub unchanged: u64,
    pub submissions: u64,
    /// Frames dropped because a job was already running
    pub dropped: u64,
    pub completed: u64,
    pub failures: u64,
    pub last_capture_time: Option<SystemTime>,
    pub current_message: String,
}

impl CaptureStats {
    /// One-line report for the log
    pub fn summary(&self) -> String {
        let last_capture = match self.last_capture_time.and_then(|t| t.elapsed().ok()) {
            Some(ago) => format!("{}s ago", ago.as_secs()),
            None => "never".to_string(),
        };
        let message = if self.current_message.is_empty() {
            "-"
        } else {
            self.current_message.as_str()
        };

        format!(
            "captures={} unchanged={} skipped={} submissions={} dropped={} completed={} \
             failures={} last_capture={} status={}",
            self.captures,
            self.unchanged,
            self.skipped,
            self.submissions,
            self.dropped,
            self.completed,
            self.failures,
            last_capture,
            message
        )
    }
}
