//! Endpoint selection, outcome reporting, and health probing.

use crate::endpoint::{EndpointConfig, EndpointStatus, FailureKind, SelectedEndpoint};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Consecutive failures before an endpoint is excluded from selection.
const FAILURE_THRESHOLD: u32 = 3;

/// Sliding window for the per-endpoint request budget.
const RATE_WINDOW: Duration = Duration::from_secs(1);

struct EndpointState {
    config: EndpointConfig,
    status: EndpointStatus,
    consecutive_failures: u32,
    last_success_at: Option<Instant>,
    rate_limit_until: Option<Instant>,
    last_latency: Option<Duration>,
    /// Timestamps of recent selections, pruned to the rate window.
    window: VecDeque<Instant>,
}

impl EndpointState {
    fn new(config: EndpointConfig) -> Self {
        Self {
            config,
            status: EndpointStatus::Healthy,
            consecutive_failures: 0,
            last_success_at: None,
            rate_limit_until: None,
            last_latency: None,
            window: VecDeque::new(),
        }
    }

    fn prune_window(&mut self, now: Instant) {
        while let Some(front) = self.window.front() {
            if now.duration_since(*front) >= RATE_WINDOW {
                self.window.pop_front();
            } else {
                break;
            }
        }
    }

    /// Clears an expired rate-limit parking. The endpoint comes back as
    /// degraded and heals fully on its next success.
    fn refresh_rate_limit(&mut self, now: Instant) {
        if let Some(until) = self.rate_limit_until {
            if now >= until {
                self.rate_limit_until = None;
                self.status = EndpointStatus::Degraded;
            }
        }
    }

    fn is_available(&mut self, now: Instant) -> bool {
        self.refresh_rate_limit(now);
        if self.status == EndpointStatus::Failed || self.rate_limit_until.is_some() {
            return false;
        }
        self.prune_window(now);
        self.window.len() < self.config.max_rps
    }
}

struct Inner {
    endpoints: Vec<EndpointState>,
    /// Index of the endpoint used by the previous selection.
    active: Option<usize>,
}

/// Shared endpoint registry.
///
/// All state sits behind one mutex; selection hands out owned
/// `SelectedEndpoint` values so the lock is never held across I/O.
pub struct EndpointRegistry {
    inner: Mutex<Inner>,
}

impl EndpointRegistry {
    pub fn new(configs: Vec<EndpointConfig>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                endpoints: configs.into_iter().map(EndpointState::new).collect(),
                active: None,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pick the endpoint for the next request and reserve one slot of
    /// its rate budget.
    ///
    /// Sticky: the previously used endpoint wins while it stays
    /// available. Otherwise the available endpoint with the lowest
    /// priority value is chosen. Returns None when every endpoint is
    /// failed, parked, or out of budget.
    pub fn select_best(&self, now: Instant) -> Option<SelectedEndpoint> {
        let mut inner = self.inner.lock();

        let previous = inner.active;
        let sticky_ok = previous
            .map(|i| inner.endpoints[i].is_available(now))
            .unwrap_or(false);

        let chosen = if sticky_ok {
            previous
        } else {
            let available: Vec<usize> = (0..inner.endpoints.len())
                .filter(|&i| inner.endpoints[i].is_available(now))
                .collect();
            let candidate = available
                .into_iter()
                .min_by_key(|&i| inner.endpoints[i].config.priority);
            if let (Some(next), Some(prev)) = (candidate, previous) {
                if next != prev {
                    info!(
                        from = %inner.endpoints[prev].config.name,
                        to = %inner.endpoints[next].config.name,
                        "failing over to alternate endpoint"
                    );
                }
            }
            candidate
        };

        let i = chosen?;
        inner.active = Some(i);
        let state = &mut inner.endpoints[i];
        state.window.push_back(now);
        Some(SelectedEndpoint {
            name: state.config.name.clone(),
            url: state.config.url.clone(),
            timeout: state.config.timeout(),
        })
    }

    /// Record a successful request. Resets the failure count and heals
    /// the endpoint back to healthy.
    pub fn report_success(&self, name: &str, latency: Duration) {
        let mut inner = self.inner.lock();
        let Some(state) = inner.endpoints.iter_mut().find(|e| e.config.name == name) else {
            warn!(endpoint = name, "success report for unknown endpoint");
            return;
        };
        state.consecutive_failures = 0;
        state.status = EndpointStatus::Healthy;
        state.last_success_at = Some(Instant::now());
        state.last_latency = Some(latency);
        state.rate_limit_until = None;
    }

    /// Record a failed request.
    ///
    /// Rate-limit failures park the endpoint until the reset deadline.
    /// Other failures count toward the consecutive-failure trip.
    pub fn report_failure(&self, name: &str, kind: FailureKind) {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        let Some(state) = inner.endpoints.iter_mut().find(|e| e.config.name == name) else {
            warn!(endpoint = name, "failure report for unknown endpoint");
            return;
        };
        match kind {
            FailureKind::RateLimited { retry_after } => {
                let park = retry_after
                    .unwrap_or_else(|| Duration::from_millis(state.config.retry_after_ms));
                state.status = EndpointStatus::RateLimited;
                state.rate_limit_until = Some(now + park);
                warn!(
                    endpoint = name,
                    park_ms = park.as_millis() as u64,
                    "endpoint rate limited"
                );
            }
            FailureKind::Transport => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= FAILURE_THRESHOLD {
                    if state.status != EndpointStatus::Failed {
                        warn!(
                            endpoint = name,
                            failures = state.consecutive_failures,
                            "endpoint marked failed"
                        );
                    }
                    state.status = EndpointStatus::Failed;
                } else {
                    state.status = EndpointStatus::Degraded;
                    debug!(
                        endpoint = name,
                        failures = state.consecutive_failures,
                        "endpoint degraded"
                    );
                }
            }
        }
    }

    /// Current status per endpoint, for startup logging and tests.
    pub fn statuses(&self) -> Vec<(String, EndpointStatus)> {
        let inner = self.inner.lock();
        inner
            .endpoints
            .iter()
            .map(|e| (e.config.name.clone(), e.status))
            .collect()
    }

    /// One health pass over every endpoint.
    ///
    /// Sends a lightweight GET to `{url}/health` and feeds the outcome
    /// back through the normal reporting path, which lets failed
    /// endpoints recover between ticks.
    pub async fn probe_all(&self, client: &reqwest::Client) {
        let targets: Vec<(String, String, Duration)> = {
            let inner = self.inner.lock();
            inner
                .endpoints
                .iter()
                .map(|e| {
                    (
                        e.config.name.clone(),
                        format!("{}/health", e.config.url.trim_end_matches('/')),
                        e.config.timeout(),
                    )
                })
                .collect()
        };

        for (name, url, timeout) in targets {
            let started = Instant::now();
            match client.get(&url).timeout(timeout).send().await {
                Ok(resp) if resp.status().is_success() => {
                    self.report_success(&name, started.elapsed());
                }
                Ok(resp) if resp.status().as_u16() == 429 => {
                    self.report_failure(&name, FailureKind::RateLimited { retry_after: None });
                }
                Ok(resp) => {
                    debug!(endpoint = %name, status = %resp.status(), "health probe rejected");
                    self.report_failure(&name, FailureKind::Transport);
                }
                Err(err) => {
                    debug!(endpoint = %name, error = %err, "health probe failed");
                    self.report_failure(&name, FailureKind::Transport);
                }
            }
        }
    }
}
