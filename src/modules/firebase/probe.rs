use std::time::Duration;

use rand::Rng;
use reqwest::header::USER_AGENT;
use reqwest::Client;

use crate::errors::FirescanError;

use super::model::Exposure;

/// Small fixed pool the probe rotates through. The rotation only avoids a
/// single static request signature; it is not an anonymity measure.
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/85.0.4183.102 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.0 Safari/605.1.15",
    "Mozilla/5.0 (Linux; Android 10; SM-G970F) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/85.0.4183.120 Mobile Safari/537.36",
];

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Issues the single exploratory request against a discovered database URL
/// and buckets the response into an exposure class.
#[derive(Debug, Clone)]
pub struct ExposureProber {
    client: Client,
    user_agents: Vec<String>,
}

impl ExposureProber {
    pub fn new() -> Result<Self, FirescanError> {
        Self::with_config(
            DEFAULT_TIMEOUT,
            DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
        )
    }

    /// Construct with an explicit timeout and user-agent pool. A
    /// single-element pool makes the selection deterministic for tests.
    pub fn with_config(
        timeout: Duration,
        user_agents: Vec<String>,
    ) -> Result<Self, FirescanError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FirescanError::NetworkError(e.to_string()))?;
        Ok(Self {
            client,
            user_agents,
        })
    }

    fn pick_user_agent(&self) -> &str {
        match self.user_agents.len() {
            0 => "firescan/0.1",
            1 => self.user_agents[0].as_str(),
            n => self.user_agents[rand::thread_rng().gen_range(0..n)].as_str(),
        }
    }

    /// One GET to `{database_url}/.json`. Transport-level failures become
    /// `ProbeFailed`; they never propagate past the job boundary.
    pub async fn probe(&self, database_url: &str) -> Exposure {
        let url = format!("{}/.json", database_url);
        let response = self
            .client
            .get(&url)
            .header(USER_AGENT, self.pick_user_agent())
            .send()
            .await;
        let response = match response {
            Ok(r) => r,
            Err(e) => {
                return Exposure::ProbeFailed {
                    reason: e.to_string(),
                }
            }
        };
        let status = response.status().as_u16();
        match response.text().await {
            Ok(body) => classify(status, &body),
            Err(e) => Exposure::ProbeFailed {
                reason: e.to_string(),
            },
        }
    }
}

/// Bucket a probe response. Checked in order, first match wins; the result
/// is a best-effort signal, never a confirmed verdict.
pub fn classify(status: u16, body: &str) -> Exposure {
    if status == 401 && body.contains("Permission denied") {
        Exposure::PermissionDenied
    } else if body.contains("has been deactivated") {
        Exposure::Deactivated
    } else if body == "null" {
        Exposure::OpenRead
    } else {
        Exposure::Indeterminate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warp::Filter;

    fn test_prober(user_agent: &str) -> ExposureProber {
        ExposureProber::with_config(Duration::from_secs(5), vec![user_agent.to_string()]).unwrap()
    }

    #[test]
    fn classify_permission_denied_requires_both_conditions() {
        assert_eq!(
            classify(401, r#"{"error": "Permission denied"}"#),
            Exposure::PermissionDenied
        );
        // Same body without the 401 is ambiguous, not a denial.
        assert_eq!(
            classify(200, r#"{"error": "Permission denied"}"#),
            Exposure::Indeterminate
        );
        assert_eq!(classify(401, "something else"), Exposure::Indeterminate);
    }

    #[test]
    fn classify_deactivated_instance() {
        assert_eq!(
            classify(200, "This database has been deactivated."),
            Exposure::Deactivated
        );
    }

    #[test]
    fn classify_null_body_is_open_read() {
        assert_eq!(classify(200, "null"), Exposure::OpenRead);
        // Only the exact literal counts.
        assert_eq!(classify(200, "null\n"), Exposure::Indeterminate);
        assert_eq!(classify(200, "{\"a\": null}"), Exposure::Indeterminate);
    }

    #[tokio::test]
    async fn probe_classifies_permission_denied_response() {
        let route = warp::any().map(|| {
            warp::reply::with_status(
                r#"{"error" : "Permission denied"}"#,
                warp::http::StatusCode::UNAUTHORIZED,
            )
        });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let prober = test_prober("firescan-test-agent");
        let outcome = prober.probe(&format!("http://{}", addr)).await;
        assert_eq!(outcome, Exposure::PermissionDenied);
    }

    #[tokio::test]
    async fn probe_classifies_null_body_as_open_read() {
        let route = warp::any().map(|| "null");
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let prober = test_prober("firescan-test-agent");
        let outcome = prober.probe(&format!("http://{}", addr)).await;
        assert_eq!(outcome, Exposure::OpenRead);
    }

    #[tokio::test]
    async fn probe_sends_user_agent_from_pool() {
        // The handler only answers "null" when our pool's agent shows up.
        let route = warp::header::<String>("user-agent").map(|ua: String| {
            if ua == "firescan-pool-agent" {
                "null".to_string()
            } else {
                "wrong agent".to_string()
            }
        });
        let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
        tokio::spawn(server);

        let prober = test_prober("firescan-pool-agent");
        let outcome = prober.probe(&format!("http://{}", addr)).await;
        assert_eq!(outcome, Exposure::OpenRead);
    }

    #[tokio::test]
    async fn probe_transport_failure_is_contained() {
        // Nothing listens here; the connection error must come back as a
        // classification, not an Err.
        let prober = test_prober("firescan-test-agent");
        let outcome = prober.probe("http://127.0.0.1:9").await;
        match outcome {
            Exposure::ProbeFailed { reason } => assert!(!reason.is_empty()),
            other => panic!("expected ProbeFailed, got {:?}", other),
        }
    }
}
