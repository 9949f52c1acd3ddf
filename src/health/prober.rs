// src/health/prober.rs
use crate::registry::Endpoint;
use crate::status::Status;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use tokio::time::{timeout, Duration};

/// What happened to a single probe request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The endpoint answered, with any status code.
    Responded(StatusCode),
    TimedOut,
    /// Connect, DNS, TLS or any other transport failure.
    Failed(String),
}

impl ProbeOutcome {
    pub fn status(&self) -> Status {
        classify(self)
    }
}

/// The only place deciding whether an endpoint counts as reachable.
///
/// Any completed response is `Ok`, including 4xx and 5xx: the goal is to
/// keep the target awake, not to judge its health payload.
pub fn classify(outcome: &ProbeOutcome) -> Status {
    match outcome {
        ProbeOutcome::Responded(_) => Status::Ok,
        ProbeOutcome::TimedOut | ProbeOutcome::Failed(_) => Status::Down,
    }
}

#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, endpoint: &Endpoint) -> ProbeOutcome;
}

pub struct HttpProber {
    client: Client,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(probe_timeout: Duration) -> reqwest::Result<Self> {
        // A 3xx is the target's own answer; never follow it.
        let client = Client::builder()
            .timeout(probe_timeout)
            .redirect(Policy::none())
            .build()?;

        Ok(Self {
            client,
            timeout: probe_timeout,
        })
    }
}

#[async_trait]
impl Probe for HttpProber {
    async fn probe(&self, endpoint: &Endpoint) -> ProbeOutcome {
        let result = timeout(self.timeout, self.client.get(endpoint.url.clone()).send()).await;

        match result {
            Ok(Ok(response)) => ProbeOutcome::Responded(response.status()),
            Ok(Err(e)) if e.is_timeout() => ProbeOutcome::TimedOut,
            Ok(Err(e)) => ProbeOutcome::Failed(e.to_string()),
            Err(_) => ProbeOutcome::TimedOut,
        }
    }
}
