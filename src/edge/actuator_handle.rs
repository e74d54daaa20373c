use super::{ActuatorLink, Directive};
use crate::link::{Connector, LinkError, LinkState};
use crate::{info, log, warn};
use std::{fmt, time::Duration};
use tokio::time::{sleep, timeout};

/// Bounds for connect-with-retry on the actuator link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Connect attempts per sequence, at least one.
    pub max_attempts: u32,
    /// Pause between two failed attempts.
    pub backoff: Duration,
    /// Bound on a single attempt (waiting for the heartbeat included).
    pub attempt_timeout: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_ATTEMPTS: u32 = 5;
    pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);
    pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Longest time a full connect sequence can take.
    pub fn worst_case(&self) -> Duration {
        self.attempt_timeout
            .saturating_mul(self.max_attempts)
            .saturating_add(self.backoff.saturating_mul(self.max_attempts.saturating_sub(1)))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_ATTEMPTS,
            backoff: Self::DEFAULT_BACKOFF,
            attempt_timeout: Self::DEFAULT_ATTEMPT_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActuatorError {
    /// Every attempt of a connect sequence failed.
    ConnectExhausted { attempts: u32 },
    /// The link was up but the directive could not be written.
    Send(LinkError),
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectExhausted { attempts } => {
                write!(f, "unable to connect to the flight controller after {attempts} attempts")
            }
            Self::Send(e) => write!(f, "directive not delivered: {e}"),
        }
    }
}

impl std::error::Error for ActuatorError {}

/// Owns the actuator link and walks it through
/// `Disconnected → Connecting { attempt } → Connected`.
pub struct ActuatorHandle<C>
where
    C: Connector,
    C::Link: ActuatorLink,
{
    connector: C,
    link: Option<C::Link>,
    state: LinkState,
    policy: RetryPolicy,
}

impl<C> ActuatorHandle<C>
where
    C: Connector,
    C::Link: ActuatorLink,
{
    pub fn new(connector: C, policy: RetryPolicy) -> Self {
        Self { connector, link: None, state: LinkState::Disconnected, policy }
    }

    pub fn state(&self) -> LinkState { self.state }

    /// Sends one directive, connecting first if no link is open.
    ///
    /// A failed send drops the link so the next call starts a fresh connect sequence.
    ///
    /// # Errors
    /// See [`ActuatorError`].
    pub async fn send(&mut self, directive: &Directive) -> Result<(), ActuatorError> {
        let link = self.acquire().await?;
        let res = link.send(directive).await;
        if let Err(e) = res {
            self.release();
            return Err(ActuatorError::Send(e));
        }
        Ok(())
    }

    /// Closes the link, if any.
    pub fn release(&mut self) {
        self.link = None;
        self.state = LinkState::Disconnected;
    }

    async fn acquire(&mut self) -> Result<&mut C::Link, ActuatorError> {
        let link = match self.link.take() {
            Some(link) => link,
            None => self.connect_with_retry().await?,
        };
        Ok(self.link.insert(link))
    }

    async fn connect_with_retry(&mut self) -> Result<C::Link, ActuatorError> {
        let max = self.policy.max_attempts;
        for attempt in 1..=max {
            self.state = LinkState::Connecting { attempt };
            let res = timeout(self.policy.attempt_timeout, self.connector.connect())
                .await
                .unwrap_or(Err(LinkError::Timeout));
            match res {
                Ok(link) => {
                    info!("{} connected (attempt {attempt}/{max}).", self.connector.name());
                    self.state = LinkState::Connected;
                    return Ok(link);
                }
                Err(e) => {
                    warn!("{} connection attempt {attempt}/{max} failed: {e}.", self.connector.name());
                    if attempt < max {
                        log!("Retrying in {}s.", self.policy.backoff.as_secs_f32());
                        sleep(self.policy.backoff).await;
                    }
                }
            }
        }
        self.state = LinkState::Disconnected;
        Err(ActuatorError::ConnectExhausted { attempts: max })
    }
}
