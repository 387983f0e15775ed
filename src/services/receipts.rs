use std::collections::HashMap;
use std::io::Write;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::body::Bytes;
use serde::{Deserialize, Serialize};
use tokio::{process::Command, sync::RwLock};
use uuid::Uuid;

use crate::{
    config::ParserCommand,
    error::{AppError, AppResult},
    models::ParsedReceipt,
};

const JOB_RETENTION: Duration = Duration::from_secs(60 * 60);

/// Opaque, possibly slow, possibly failing extraction of receipt fields.
/// Failures are `AppError::ExternalService` with a human-readable message that
/// is surfaced to the caller unchanged.
#[async_trait]
pub trait ReceiptParser: Send + Sync {
    async fn parse(&self, image: Bytes) -> AppResult<ParsedReceipt>;
}

pub struct UnconfiguredParser;

#[async_trait]
impl ReceiptParser for UnconfiguredParser {
    async fn parse(&self, _image: Bytes) -> AppResult<ParsedReceipt> {
        Err(AppError::ExternalService("Receipt parser is not configured".to_string()))
    }
}

/// Runs an external program with the image path appended to its arguments.
/// The program prints `{"success": true, "data": {...}}` or
/// `{"success": false, "error": "..."}` on stdout.
pub struct CommandParser {
    command: ParserCommand,
}

#[derive(Deserialize)]
struct ParserOutput {
    #[serde(default)]
    success: bool,
    data: Option<ParsedReceipt>,
    error: Option<String>,
}

impl CommandParser {
    pub fn new(command: ParserCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl ReceiptParser for CommandParser {
    async fn parse(&self, image: Bytes) -> AppResult<ParsedReceipt> {
        // Removed when `image_file` drops, whichever way this returns.
        let mut image_file = tempfile::Builder::new()
            .prefix("receipt-")
            .tempfile()
            .map_err(|e| AppError::ExternalService(format!("Failed to stage receipt image: {e}")))?;
        image_file
            .write_all(&image)
            .and_then(|_| image_file.flush())
            .map_err(|e| AppError::ExternalService(format!("Failed to stage receipt image: {e}")))?;

        let output = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(image_file.path())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| AppError::ExternalService(format!("Failed to start receipt parser: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            log::error!("Receipt parser exited with {}: {}", output.status, stderr.trim());
            return Err(AppError::ExternalService(format!(
                "Failed to parse receipt: {}",
                stderr.trim()
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let parsed: ParserOutput = serde_json::from_str(stdout.trim()).map_err(|e| {
            log::error!("Unreadable receipt parser output ({}): {}", e, stdout.trim());
            AppError::ExternalService("Invalid response from receipt parser".to_string())
        })?;

        match parsed {
            ParserOutput { success: true, data: Some(data), .. } => Ok(data),
            ParserOutput { error, .. } => Err(AppError::ExternalService(
                error.unwrap_or_else(|| "Failed to parse receipt".to_string()),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ParseJob {
    Pending,
    Succeeded { data: ParsedReceipt },
    Failed { error: String },
}

struct JobEntry {
    job: ParseJob,
    updated: Instant,
}

/// Receipt parse jobs running in the background, keyed by id.
#[derive(Clone, Default)]
pub struct ParseJobs {
    jobs: Arc<RwLock<HashMap<Uuid, JobEntry>>>,
}

impl ParseJobs {
    pub async fn submit(&self, parser: Arc<dyn ReceiptParser>, image: Bytes) -> Uuid {
        let id = Uuid::new_v4();
        {
            let mut jobs = self.jobs.write().await;
            jobs.retain(|_, entry| {
                entry.job == ParseJob::Pending || entry.updated.elapsed() < JOB_RETENTION
            });
            jobs.insert(id, JobEntry { job: ParseJob::Pending, updated: Instant::now() });
        }

        let jobs = self.clone();
        tokio::spawn(async move {
            let job = match parser.parse(image).await {
                Ok(data) => ParseJob::Succeeded { data },
                Err(e) => {
                    log::warn!("Receipt parse job {} failed: {}", id, e);
                    ParseJob::Failed { error: e.to_string() }
                }
            };
            jobs.jobs.write().await.insert(id, JobEntry { job, updated: Instant::now() });
        });

        id
    }

    pub async fn get(&self, id: Uuid) -> Option<ParseJob> {
        self.jobs.read().await.get(&id).map(|entry| entry.job.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    struct FixedParser(Result<ParsedReceipt, String>);

    #[async_trait]
    impl ReceiptParser for FixedParser {
        async fn parse(&self, _image: Bytes) -> AppResult<ParsedReceipt> {
            self.0.clone().map_err(AppError::ExternalService)
        }
    }

    async fn wait_for(jobs: &ParseJobs, id: Uuid) -> ParseJob {
        for _ in 0..100 {
            match jobs.get(id).await {
                Some(ParseJob::Pending) | None => tokio::time::sleep(Duration::from_millis(10)).await,
                Some(done) => return done,
            }
        }
        panic!("job {id} never finished");
    }

    #[tokio::test]
    async fn jobs_record_success_and_failure() {
        let jobs = ParseJobs::default();
        let receipt = ParsedReceipt {
            merchant_name: Some("Cafe".into()),
            total: Some(Decimal::new(1250, 2)),
            ..Default::default()
        };

        let ok = jobs
            .submit(Arc::new(FixedParser(Ok(receipt.clone()))), Bytes::from_static(b"img"))
            .await;
        let failed = jobs
            .submit(Arc::new(FixedParser(Err("quota exceeded".into()))), Bytes::from_static(b"img"))
            .await;

        assert_eq!(wait_for(&jobs, ok).await, ParseJob::Succeeded { data: receipt });
        assert_eq!(wait_for(&jobs, failed).await, ParseJob::Failed { error: "quota exceeded".into() });
        assert!(jobs.get(Uuid::new_v4()).await.is_none());
    }

    #[tokio::test]
    async fn unconfigured_parser_fails_verbatim() {
        let err = UnconfiguredParser.parse(Bytes::new()).await.unwrap_err();
        assert!(matches!(err, AppError::ExternalService(_)));
        assert_eq!(err.to_string(), "Receipt parser is not configured");
    }

    #[test]
    fn job_serializes_with_status_tag() {
        let json = serde_json::to_value(ParseJob::Failed { error: "boom".into() }).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "failed", "error": "boom" }));
    }

    #[cfg(unix)]
    fn shell(script: &str) -> CommandParser {
        CommandParser::new(ParserCommand {
            program: "sh".into(),
            args: vec!["-c".into(), script.into(), "parser".into()],
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_output_is_parsed() {
        let parser = shell(
            r#"test -s "$1" && echo '{"success": true, "data": {"merchant_name": "Cafe", "total": 12.5, "items": []}}'"#,
        );
        let receipt = parser.parse(Bytes::from_static(b"png-bytes")).await.unwrap();
        assert_eq!(receipt.merchant_name.as_deref(), Some("Cafe"));
        assert_eq!(receipt.total, Some(Decimal::new(125, 1)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn command_failures_are_reported() {
        let crashed = shell("echo boom >&2; exit 3").parse(Bytes::from_static(b"x")).await;
        assert_eq!(crashed.unwrap_err().to_string(), "Failed to parse receipt: boom");

        let garbage = shell("echo not json").parse(Bytes::from_static(b"x")).await;
        assert_eq!(garbage.unwrap_err().to_string(), "Invalid response from receipt parser");

        let refused = shell(r#"echo '{"success": false, "error": "GEMINI_API_KEY not found"}'"#)
            .parse(Bytes::from_static(b"x"))
            .await;
        assert_eq!(refused.unwrap_err().to_string(), "GEMINI_API_KEY not found");
    }
}
