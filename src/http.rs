use std::thread;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub(crate) struct RetryPolicy {
    pub(crate) connect_timeout: Duration,
    pub(crate) read_timeout: Duration,
    pub(crate) attempts: usize,
    pub(crate) base_delay: Duration,
    pub(crate) max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(15),
            attempts: 3,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based): the base delay doubled
    /// for every earlier retry, never above `max_delay`.
    pub(crate) fn backoff_delay(&self, attempt: usize) -> Duration {
        let shift = attempt.saturating_sub(1).min(16) as u32;
        self.base_delay
            .checked_mul(1_u32 << shift)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }
}

fn should_retry_http_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

pub(crate) fn get_text_with_retries(url: &str, policy: &RetryPolicy) -> Result<String, String> {
    let attempts = policy.attempts.max(1);
    let agent = ureq::AgentBuilder::new()
        .timeout_connect(policy.connect_timeout)
        .timeout_read(policy.read_timeout)
        .timeout_write(policy.read_timeout)
        .build();

    for attempt in 1..=attempts {
        match agent.get(url).set("Accept", "application/json").call() {
            Ok(response) => {
                return response
                    .into_string()
                    .map_err(|err| format!("request failed: response decode failed: {err}"));
            }
            Err(ureq::Error::Status(status, response)) => {
                let response_body = response.into_string().ok().unwrap_or_default();
                let body = response_body.trim();
                let status_error = if body.is_empty() {
                    format!("HTTP status {status}")
                } else {
                    let truncated = body.chars().take(240).collect::<String>();
                    format!("HTTP status {status} ({truncated})")
                };

                if !should_retry_http_status(status) {
                    return Err(format!("request failed: {status_error}"));
                }
                if attempt < attempts {
                    let delay = policy.backoff_delay(attempt);
                    tracing::debug!(url, status, attempt, ?delay, "retrying request");
                    thread::sleep(delay);
                    continue;
                }
                return Err(format!(
                    "request failed after {attempts} attempt(s): {status_error}"
                ));
            }
            Err(ureq::Error::Transport(err)) => {
                let transport_error = format!("transport error: {err}");
                if attempt < attempts {
                    let delay = policy.backoff_delay(attempt);
                    tracing::debug!(url, attempt, ?delay, error = %err, "retrying request");
                    thread::sleep(delay);
                    continue;
                }
                return Err(format!(
                    "request failed after {attempts} attempt(s): {transport_error}"
                ));
            }
        }
    }

    Err("request failed: exhausted attempts without a concrete error".to_string())
}
