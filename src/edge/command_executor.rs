use super::{ActuatorError, ActuatorHandle, ActuatorLink, Directive, RetryPolicy};
use crate::bus::MessageHandler;
use crate::link::{Connector, LinkState};
use crate::protocol::{CommandDefaults, CommandIntent, ProtocolError};
use crate::{error, info, warn};
use async_trait::async_trait;
use strum_macros::{Display, EnumString};

/// How long an actuator link lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ConnectionLifetime {
    /// Keep the link open across commands until a send fails.
    Persistent,
    /// Open a fresh link for every command and close it afterwards.
    PerCommand,
}

/// What became of one inbound command payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecOutcome {
    /// The directive was handed to the actuator link.
    Executed(CommandIntent),
    /// The payload was malformed or named an unknown action.
    Discarded(ProtocolError),
    /// The command was valid but the actuator could not be reached.
    Dropped(CommandIntent, ActuatorError),
}

/// Turns command payloads into actuator directives, one at a time and in delivery order.
pub struct CommandExecutor<C>
where
    C: Connector,
    C::Link: ActuatorLink,
{
    handle: ActuatorHandle<C>,
    lifetime: ConnectionLifetime,
    defaults: CommandDefaults,
}

impl<C> CommandExecutor<C>
where
    C: Connector,
    C::Link: ActuatorLink,
{
    pub fn new(
        connector: C,
        policy: RetryPolicy,
        lifetime: ConnectionLifetime,
        defaults: CommandDefaults,
    ) -> Self {
        Self { handle: ActuatorHandle::new(connector, policy), lifetime, defaults }
    }

    pub fn link_state(&self) -> LinkState { self.handle.state() }

    /// Decodes and executes one raw command payload.
    pub async fn execute_payload(&mut self, payload: &[u8]) -> ExecOutcome {
        match CommandIntent::parse(payload, &self.defaults) {
            Ok(command) => {
                info!("Received command: {command}.");
                self.execute(command).await
            }
            Err(e) => {
                warn!("Discarding command payload: {e}.");
                ExecOutcome::Discarded(e)
            }
        }
    }

    /// Dispatches a decoded command to the actuator.
    pub async fn execute(&mut self, command: CommandIntent) -> ExecOutcome {
        if self.lifetime == ConnectionLifetime::PerCommand {
            self.handle.release();
        }
        let directive = Directive::from(command);
        let res = self.handle.send(&directive).await;
        if self.lifetime == ConnectionLifetime::PerCommand {
            self.handle.release();
        }
        match res {
            Ok(()) => {
                info!("Directive '{directive}' sent for {command}.");
                ExecOutcome::Executed(command)
            }
            Err(e) => {
                error!("Dropping command {command}: {e}.");
                ExecOutcome::Dropped(command, e)
            }
        }
    }
}

#[async_trait]
impl<C> MessageHandler for CommandExecutor<C>
where
    C: Connector + 'static,
    C::Link: ActuatorLink + 'static,
{
    async fn handle(&mut self, payload: &[u8]) { self.execute_payload(payload).await; }
}
