use super::{Connector, LinkError, LinkState};
use crate::{event, info, log, warn};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::{Instant, sleep, timeout, timeout_at};

/// A line-delimited byte stream.
#[async_trait]
pub trait LineSource: Send {
    /// Reads the next line. `Ok(None)` means the peer closed the stream.
    async fn next_line(&mut self) -> Result<Option<String>, LinkError>;
}

/// Wraps one sensor link and reconnects transparently after failures.
///
/// The handle is owned by a single loop. Every [`read`](Self::read) returns within
/// `attempt_timeout`, connect time included.
pub struct ReconnectingLineReader<C>
where
    C: Connector,
    C::Link: LineSource,
{
    connector: C,
    link: Option<C::Link>,
    state: LinkState,
    attempt_timeout: Duration,
}

impl<C> ReconnectingLineReader<C>
where
    C: Connector,
    C::Link: LineSource,
{
    /// Creates a reader without connecting; the first [`read`](Self::read) opens the link.
    pub fn new(connector: C, attempt_timeout: Duration) -> Self {
        Self { connector, link: None, state: LinkState::Disconnected, attempt_timeout }
    }

    pub fn state(&self) -> LinkState { self.state }

    pub fn name(&self) -> &str { self.connector.name() }

    /// Makes one attempt at reading a line.
    ///
    /// Returns `None` if the link could not be (re)established, if no data arrived
    /// in time, if the line was blank, or if the read failed. Only the last case
    /// drops the link.
    pub async fn read(&mut self) -> Option<String> {
        let deadline = Instant::now() + self.attempt_timeout;

        if self.link.is_none() {
            self.state = LinkState::Connecting { attempt: 1 };
            let res = timeout_at(deadline, self.connector.connect())
                .await
                .unwrap_or(Err(LinkError::Timeout));
            match res {
                Ok(link) => {
                    info!("Connected to {}.", self.connector.name());
                    self.link = Some(link);
                    self.state = LinkState::Connected;
                }
                Err(e) => {
                    warn!("Failed to connect to {}: {e}. Retrying on next read.", self.name());
                    self.state = LinkState::Disconnected;
                    return None;
                }
            }
        }

        let link = self.link.as_mut()?;
        match timeout_at(deadline, link.next_line()).await {
            Err(_) => {
                log!("No {} data within {:?}.", self.connector.name(), self.attempt_timeout);
                None
            }
            Ok(Ok(Some(raw))) => {
                let line = raw.trim();
                if line.is_empty() {
                    warn!("Empty {} data received.", self.connector.name());
                    None
                } else {
                    event!("Raw {} data: {line}", self.connector.name());
                    Some(line.to_string())
                }
            }
            Ok(Ok(None)) => {
                self.mark_lost(&LinkError::Closed);
                None
            }
            Ok(Err(e)) => {
                self.mark_lost(&e);
                None
            }
        }
    }

    /// Polls [`read`](Self::read) until a line arrives or `overall` elapses.
    ///
    /// Returns an empty string on exhaustion, which callers treat as
    /// "no data this cycle".
    pub async fn poll_line(&mut self, overall: Duration, retry_delay: Duration) -> String {
        let attempts = async {
            loop {
                if let Some(line) = self.read().await {
                    return line;
                }
                sleep(retry_delay).await;
            }
        };
        let res = timeout(overall, attempts).await;
        res.unwrap_or_else(|_| {
            warn!("Timeout reading {} data.", self.connector.name());
            String::new()
        })
    }

    fn mark_lost(&mut self, err: &LinkError) {
        warn!("Error reading {} data: {err}. Dropping link.", self.connector.name());
        self.link = None;
        self.state = LinkState::Disconnected;
    }
}
