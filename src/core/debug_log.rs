use crate::config::DebugConfig;
use std::fmt::Write as _;
use std::path::PathBuf;

/// Plain-text transcript of one failed exchange.
///
/// Sections are appended as the request progresses and the whole record is
/// written only when the exchange fails.
#[derive(Debug, Clone, Default)]
pub struct ExchangeRecord {
    started: String,
    text: String,
}

impl ExchangeRecord {
    /// Start a record with the inbound body exactly as the client sent it.
    pub fn request(url: &str, method: &str, body: &str) -> Self {
        let mut record = Self {
            started: chrono::Local::now()
                .format("%Y-%m-%d-%H-%M-%S-%3f")
                .to_string(),
            text: String::new(),
        };
        let _ = write!(
            record.text,
            "[Request]\nUrl: {}\nMethod: {}\nBody: {}\n\n",
            url, method, body
        );
        record
    }

    pub fn response(&mut self, status: u16, body: &str) {
        let _ = write!(self.text, "[Response]\nStatus: {}\nBody: {}\n\n", status, body);
    }

    pub fn parse_failed(&mut self, content: &str) {
        let _ = write!(self.text, "[ParseFailed]\nParse failed : {}\n\n", content);
    }

    pub fn json_failed(&mut self, raw: &str, error: &str) {
        let _ = write!(self.text, "[JsonFailed]\nRaw:\n{}\nError:\n{}\n", raw, error);
    }

    pub fn file_name(&self) -> String {
        format!("{}.txt", self.started)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Writes exchange records into a directory when enabled.
#[derive(Debug, Clone)]
pub struct DebugLog {
    dir: Option<PathBuf>,
}

impl DebugLog {
    pub fn new(config: &DebugConfig) -> Self {
        Self {
            dir: config.enabled.then(|| config.dir.clone()),
        }
    }

    pub fn disabled() -> Self {
        Self { dir: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.dir.is_some()
    }

    /// Persist `record`. Failures are logged and otherwise ignored.
    pub async fn write(&self, record: &ExchangeRecord) {
        let Some(dir) = &self.dir else {
            return;
        };

        if let Err(e) = tokio::fs::create_dir_all(dir).await {
            tracing::warn!("Failed to create debug dir {}: {}", dir.display(), e);
            return;
        }

        let path = dir.join(record.file_name());
        match tokio::fs::write(&path, record.as_str()).await {
            Ok(()) => tracing::debug!("Wrote exchange dump {}", path.display()),
            Err(e) => tracing::warn!("Failed to write {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_sections() {
        let mut record = ExchangeRecord::request("/v1/messages", "POST", "{\"model\": \"m\"}");
        record.response(200, "{\"choices\":[]}");
        record.parse_failed("no tags here");

        let text = record.as_str();
        assert!(text.starts_with("[Request]\nUrl: /v1/messages\nMethod: POST\nBody: {\"model\": \"m\"}\n\n"));
        assert!(text.contains("[Response]\nStatus: 200\n"));
        assert!(text.ends_with("[ParseFailed]\nParse failed : no tags here\n\n"));
        assert!(record.file_name().ends_with(".txt"));
    }

    #[tokio::test]
    async fn test_enabled_log_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let log = DebugLog::new(&DebugConfig {
            enabled: true,
            dir: dir.path().join("errors"),
        });

        let mut record = ExchangeRecord::request("/v1/messages", "POST", "{}");
        record.json_failed("{bad", "expected value");
        log.write(&record).await;

        let written =
            std::fs::read_to_string(dir.path().join("errors").join(record.file_name())).unwrap();
        assert!(written.contains("[JsonFailed]\nRaw:\n{bad\nError:\nexpected value\n"));
    }

    #[tokio::test]
    async fn test_disabled_log_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let log = DebugLog::new(&DebugConfig {
            enabled: false,
            dir: dir.path().join("errors"),
        });
        assert!(!log.is_enabled());

        log.write(&ExchangeRecord::request("/", "POST", "{}")).await;
        assert!(!dir.path().join("errors").exists());
    }
}
