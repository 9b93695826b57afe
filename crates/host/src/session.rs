//! Line-oriented host session.
//!
//! Runs install and activate once, then treats every input line as an
//! intercepted request (`[METHOD] LOCATOR`) and writes one JSON report per
//! line.

use futures_util::StreamExt;
use futures_util::stream::FuturesOrdered;
use serde::Serialize;
use shellcache_client::resolve_locator;
use shellcache_core::{ActivateReport, Dispatcher, Error, InstallReport, Request, Worker, WorkerState};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use url::Url;

use crate::error::HostError;

/// Upper bound on lines being resolved at once.
const MAX_IN_FLIGHT: usize = 16;

/// Outcome of the install and activate phases.
#[derive(Debug, Serialize)]
pub struct LifecycleReport {
    pub state: WorkerState,
    pub install: InstallReport,
    pub activate: ActivateReport,
}

/// Outcome of one input line.
#[derive(Debug, Default, Serialize)]
pub struct ResolveReport {
    pub input: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct Session<W> {
    dispatcher: Dispatcher<W>,
    root: Url,
}

impl<W: Worker> Session<W> {
    pub fn new(dispatcher: Dispatcher<W>, root: Url) -> Self {
        Self { dispatcher, root }
    }

    pub fn dispatcher(&self) -> &Dispatcher<W> {
        &self.dispatcher
    }

    /// Install then activate the worker generation.
    pub async fn start(&self) -> Result<LifecycleReport, Error> {
        let install = self.dispatcher.install().await?;
        let activate = self.dispatcher.activate().await?;
        Ok(LifecycleReport { state: self.dispatcher.state(), install, activate })
    }

    /// Parse `[METHOD] LOCATOR` into a request.
    pub fn parse_line(&self, line: &str) -> Result<Request, HostError> {
        let mut parts = line.split_whitespace();
        let (method, locator) = match (parts.next(), parts.next(), parts.next()) {
            (Some(locator), None, None) => ("GET", locator),
            (Some(method), Some(locator), None) => (method, locator),
            _ => return Err(HostError::InvalidInput(format!("expected [METHOD] LOCATOR, got {line:?}"))),
        };

        if !method.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(HostError::InvalidInput(format!("invalid method: {method}")));
        }

        let url = resolve_locator(&self.root, locator)?;
        Ok(Request::new(method, url))
    }

    pub async fn handle_line(&self, line: &str) -> ResolveReport {
        let mut report = ResolveReport { input: line.to_string(), ..Default::default() };

        let request = match self.parse_line(line) {
            Ok(request) => request,
            Err(e) => return report.failed(&e),
        };
        report.method = Some(request.method.clone());
        report.url = Some(request.url.to_string());

        match self.dispatcher.dispatch(request).await {
            Ok(response) => {
                report.ok = true;
                report.status = Some(response.status);
                report.response_type = Some(response.response_type.as_str());
                report.bytes = Some(response.body.len());
                report
            }
            Err(e) => report.failed(&HostError::from(e)),
        }
    }

    async fn handle_owned(&self, line: String) -> ResolveReport {
        self.handle_line(&line).await
    }

    /// Process every line from `input`, writing JSON reports to `output`.
    ///
    /// Up to 16 lines are resolved concurrently, so a slow fetch does not
    /// hold back later lines. Reports are written in input order. Blank
    /// lines and `#` comments are skipped. Background cache writes are
    /// awaited before returning. Returns the number of requests handled.
    pub async fn run<R, O>(&self, input: R, mut output: O) -> anyhow::Result<usize>
    where
        R: AsyncBufRead + Unpin,
        O: AsyncWrite + Unpin,
    {
        let mut lines = input.lines();
        let mut pending = FuturesOrdered::new();
        let mut input_open = true;
        let mut handled = 0;

        loop {
            tokio::select! {
                line = lines.next_line(), if input_open && pending.len() < MAX_IN_FLIGHT => {
                    let Some(line) = line? else {
                        input_open = false;
                        continue;
                    };
                    let line = line.trim();
                    if line.is_empty() || line.starts_with('#') {
                        continue;
                    }
                    pending.push_back(self.handle_owned(line.to_string()));
                }
                Some(report) = pending.next(), if !pending.is_empty() => {
                    let mut json = serde_json::to_vec(&report)?;
                    json.push(b'\n');
                    output.write_all(&json).await?;
                    output.flush().await?;
                    handled += 1;
                }
                else => break,
            }
        }

        self.dispatcher.settle().await;
        tracing::info!(handled, "input closed, background writes settled");

        Ok(handled)
    }
}

impl ResolveReport {
    fn failed(mut self, err: &HostError) -> Self {
        self.ok = false;
        self.code = Some(err.code());
        self.error = Some(err.to_string());
        self
    }
}
