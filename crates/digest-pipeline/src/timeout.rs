//! Per-call time limits for external collaborators.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use digest_insight::{GenerationRequest, InsightError, TextGenerator};
use digest_notify::{NotificationSink, NotifyError};

/// Await `call` for at most `limit`. A timeout is reported like any other
/// failure of the call.
pub async fn bounded<T, E, F>(limit: Duration, call: F) -> Result<T, String>
where
    E: std::fmt::Display,
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("timed out after {:?}", limit)),
    }
}

/// Text generator whose every call is bounded by `limit`.
pub struct TimeBoundGenerator {
    inner: Arc<dyn TextGenerator>,
    limit: Duration,
}

impl TimeBoundGenerator {
    pub fn new(inner: Arc<dyn TextGenerator>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl TextGenerator for TimeBoundGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, InsightError> {
        match tokio::time::timeout(self.limit, self.inner.generate(request)).await {
            Ok(result) => result,
            Err(_) => Err(InsightError::Upstream(format!(
                "timed out after {:?}",
                self.limit
            ))),
        }
    }
}

/// Notification sink whose every send is bounded by `limit`.
pub struct TimeBoundSink {
    inner: Arc<dyn NotificationSink>,
    limit: Duration,
}

impl TimeBoundSink {
    pub fn new(inner: Arc<dyn NotificationSink>, limit: Duration) -> Self {
        Self { inner, limit }
    }
}

#[async_trait]
impl NotificationSink for TimeBoundSink {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        match tokio::time::timeout(self.limit, self.inner.send(text)).await {
            Ok(result) => result,
            Err(_) => Err(NotifyError::Upstream(format!(
                "timed out after {:?}",
                self.limit
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use digest_insight::Purpose;

    struct Slow;

    #[async_trait]
    impl TextGenerator for Slow {
        async fn generate(&self, _request: &GenerationRequest) -> Result<String, InsightError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok("late".into())
        }
    }

    #[async_trait]
    impl NotificationSink for Slow {
        fn name(&self) -> &str {
            "slow"
        }

        async fn send(&self, _text: &str) -> Result<(), NotifyError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            purpose: Purpose::Label,
            instruction: "i".into(),
            content: "c".into(),
            max_tokens: 12,
            temperature: 0.0,
        }
    }

    #[tokio::test]
    async fn test_bounded() {
        let ok: Result<u8, String> =
            bounded(Duration::from_secs(1), async { Ok::<_, String>(1) }).await;
        assert_eq!(ok, Ok(1));

        let err: Result<u8, String> =
            bounded(Duration::from_secs(1), async { Err::<u8, _>("refused") }).await;
        assert_eq!(err, Err("refused".to_string()));

        let late: Result<u8, String> = bounded(Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, String>(1)
        })
        .await;
        assert!(late.unwrap_err().contains("timed out"));
    }

    #[tokio::test]
    async fn test_generator_timeout() {
        let gen = TimeBoundGenerator::new(Arc::new(Slow), Duration::from_millis(20));
        let err = gen.generate(&request()).await.unwrap_err();
        assert!(matches!(err, InsightError::Upstream(ref m) if m.contains("timed out")));
    }

    #[tokio::test]
    async fn test_sink_timeout() {
        let sink = TimeBoundSink::new(Arc::new(Slow), Duration::from_millis(20));
        assert_eq!(sink.name(), "slow");
        let err = sink.send("hello").await.unwrap_err();
        assert!(matches!(err, NotifyError::Upstream(ref m) if m.contains("timed out")));
    }
}
