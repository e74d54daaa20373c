use super::{Connector, LineSource, LinkError};
use async_trait::async_trait;
use futures::StreamExt;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tokio_util::codec::{FramedRead, LinesCodec};

/// Longest accepted text frame; longer lines are treated as a link fault.
const MAX_FRAME_LEN: usize = 8192;

/// Opens a line-delimited serial sensor at a fixed port and baud rate.
#[derive(Debug, Clone)]
pub struct SerialConnector {
    name: String,
    port: String,
    baud_rate: u32,
}

impl SerialConnector {
    pub fn new(name: impl Into<String>, port: impl Into<String>, baud_rate: u32) -> Self {
        Self { name: name.into(), port: port.into(), baud_rate }
    }
}

#[async_trait]
impl Connector for SerialConnector {
    type Link = SerialLineSource;

    fn name(&self) -> &str { &self.name }

    async fn connect(&mut self) -> Result<SerialLineSource, LinkError> {
        let stream = tokio_serial::new(self.port.as_str(), self.baud_rate).open_native_async()?;
        Ok(SerialLineSource {
            frames: FramedRead::new(stream, LinesCodec::new_with_max_length(MAX_FRAME_LEN)),
        })
    }
}

/// An open serial port split into text lines. Non-UTF-8 input is a read error.
pub struct SerialLineSource {
    frames: FramedRead<SerialStream, LinesCodec>,
}

#[async_trait]
impl LineSource for SerialLineSource {
    async fn next_line(&mut self) -> Result<Option<String>, LinkError> {
        self.frames.next().await.transpose().map_err(LinkError::from)
    }
}
