//! Scripted link fakes for driving readers and loops without hardware.

use super::{Connector, LineSource, LinkError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{
    Arc,
    atomic::{AtomicU32, Ordering},
};

/// What a single read on a scripted link does.
#[derive(Debug, Clone)]
pub(crate) enum ReadStep {
    Line(&'static str),
    Error,
    Eof,
}

/// What a single connect call does.
#[derive(Debug, Clone)]
pub(crate) enum ConnectStep {
    Fail,
    /// Never completes.
    Hang,
    /// Opens a link that plays back the given reads and then goes silent.
    Open(Vec<ReadStep>),
}

/// A connector that follows a fixed script and hangs once the script is used up.
pub(crate) struct ScriptedConnector {
    name: &'static str,
    script: VecDeque<ConnectStep>,
    connects: Arc<AtomicU32>,
}

impl ScriptedConnector {
    pub(crate) fn new(name: &'static str, script: Vec<ConnectStep>) -> Self {
        Self { name, script: script.into(), connects: Arc::new(AtomicU32::new(0)) }
    }

    /// Shared counter of connect calls made so far.
    pub(crate) fn connects(&self) -> Arc<AtomicU32> { Arc::clone(&self.connects) }
}

#[async_trait]
impl Connector for ScriptedConnector {
    type Link = ScriptedSource;

    fn name(&self) -> &str { self.name }

    async fn connect(&mut self) -> Result<ScriptedSource, LinkError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match self.script.pop_front() {
            Some(ConnectStep::Fail) => Err(LinkError::Unavailable("no such device".to_string())),
            Some(ConnectStep::Open(reads)) => Ok(ScriptedSource { reads: reads.into() }),
            Some(ConnectStep::Hang) | None => std::future::pending().await,
        }
    }
}

pub(crate) struct ScriptedSource {
    reads: VecDeque<ReadStep>,
}

#[async_trait]
impl LineSource for ScriptedSource {
    async fn next_line(&mut self) -> Result<Option<String>, LinkError> {
        match self.reads.pop_front() {
            Some(ReadStep::Line(line)) => Ok(Some(line.to_string())),
            Some(ReadStep::Error) => Err(LinkError::Io("framing error".to_string())),
            Some(ReadStep::Eof) => Ok(None),
            None => std::future::pending().await,
        }
    }
}
