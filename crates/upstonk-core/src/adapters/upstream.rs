use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::circuit_breaker::{CircuitBreaker, CircuitState};
use crate::data_source::SourceError;
use crate::http_client::{HttpClient, HttpRequest};
use crate::ProviderId;

pub(crate) const DEFAULT_HTTP_TIMEOUT_MS: u64 = 10_000;

/// Breaker-guarded JSON GET shared by the HTTP-backed providers.
pub(crate) struct Upstream {
    provider: ProviderId,
    http: Arc<dyn HttpClient>,
    breaker: CircuitBreaker,
    timeout_ms: u64,
}

impl Upstream {
    pub(crate) fn new(provider: ProviderId, http: Arc<dyn HttpClient>) -> Self {
        Self {
            provider,
            http,
            breaker: CircuitBreaker::default(),
            timeout_ms: DEFAULT_HTTP_TIMEOUT_MS,
        }
    }

    pub(crate) fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub(crate) fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<T, SourceError> {
        if !self.breaker.allow_request() {
            return Err(SourceError::unavailable(format!(
                "{} circuit breaker is open",
                self.provider
            )));
        }

        let mut request = HttpRequest::get(url).with_timeout_ms(self.timeout_ms);
        if let Some(referer) = referer {
            request = request.with_header("referer", referer);
        }

        let response = self.http.execute(request).await.map_err(|error| {
            self.breaker.record_failure();
            if error.is_timeout() {
                SourceError::timeout(self.provider, self.timeout_ms)
            } else {
                SourceError::unavailable(format!(
                    "{} transport error: {}",
                    self.provider,
                    error.message()
                ))
            }
        })?;

        if response.status == 429 {
            self.breaker.record_failure();
            return Err(SourceError::rate_limited(format!(
                "{} returned status 429",
                self.provider
            )));
        }
        if !response.is_success() {
            self.breaker.record_failure();
            return Err(SourceError::unavailable(format!(
                "{} returned status {}",
                self.provider, response.status
            )));
        }

        self.breaker.record_success();
        serde_json::from_str(&response.body).map_err(|e| {
            SourceError::internal(format!("failed to parse {} response: {e}", self.provider))
        })
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;
    use crate::data_source::SourceErrorKind;
    use crate::http_client::{HttpError, HttpResponse, ScriptedHttpClient};

    #[derive(Debug, Deserialize)]
    struct Payload {
        ok: bool,
    }

    #[tokio::test]
    async fn maps_status_and_transport_failures_to_source_errors() {
        let http = Arc::new(
            ScriptedHttpClient::new()
                .with_json("/ok", r#"{"ok":true}"#)
                .with_response("/busy", Ok(HttpResponse::with_status(429, "")))
                .with_response("/slow", Err(HttpError::timed_out("deadline")))
                .with_json("/garbled", "<html>"),
        );
        let upstream = Upstream::new(ProviderId::Yahoo, http);

        let payload: Payload = upstream
            .get_json("https://host/ok", None)
            .await
            .expect("healthy upstream parses");
        assert!(payload.ok);

        let busy = upstream
            .get_json::<Payload>("https://host/busy", None)
            .await
            .expect_err("429 is rate limited");
        assert_eq!(busy.kind(), SourceErrorKind::RateLimited);

        let slow = upstream
            .get_json::<Payload>("https://host/slow", None)
            .await
            .expect_err("transport timeout");
        assert_eq!(slow.kind(), SourceErrorKind::Timeout);

        let garbled = upstream
            .get_json::<Payload>("https://host/garbled", None)
            .await
            .expect_err("unparseable body");
        assert_eq!(garbled.kind(), SourceErrorKind::Internal);
    }

    #[tokio::test]
    async fn breaker_opens_after_repeated_failures_and_skips_upstream() {
        let http = Arc::new(ScriptedHttpClient::new());
        let upstream = Upstream::new(ProviderId::Jse, http.clone());

        for _ in 0..3 {
            let error = upstream
                .get_json::<Payload>("https://host/missing", None)
                .await
                .expect_err("404 fails");
            assert_eq!(error.kind(), SourceErrorKind::Unavailable);
        }
        assert_eq!(upstream.circuit_state(), CircuitState::Open);

        let error = upstream
            .get_json::<Payload>("https://host/missing", None)
            .await
            .expect_err("open breaker short-circuits");
        assert_eq!(error.message(), "jse circuit breaker is open");
        assert_eq!(http.request_count(), 3);
    }
}
