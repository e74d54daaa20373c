use super::{BusError, BusPublisher, BusTransport, InboundMessage};
use crate::util::BrokerConfig;
use crate::{info, warn};
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS, SubscribeReasonCode};
use std::sync::Arc;
use tokio::time::timeout;

/// MQTT 3.1.1 transport backed by `rumqttc`.
pub struct MqttTransport {
    client: AsyncClient,
    eventloop: EventLoop,
    qos: QoS,
}

impl MqttTransport {
    /// Capacity of the outgoing request queue between the client and the event loop.
    const REQUEST_CAPACITY: usize = 64;

    /// Opens the session and waits for the broker's CONNACK.
    ///
    /// # Errors
    /// [`BusError::Connect`] if the broker is unreachable, refuses the session,
    /// or does not answer within the configured connect timeout.
    pub async fn connect(cfg: &BrokerConfig) -> Result<Self, BusError> {
        let mut options = MqttOptions::new(cfg.client_id.as_str(), cfg.host.as_str(), cfg.port);
        options.set_keep_alive(cfg.keep_alive);
        let (client, mut eventloop) = AsyncClient::new(options, Self::REQUEST_CAPACITY);

        let handshake = async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => return Ok(()),
                    Ok(_) => {}
                    Err(e) => return Err(BusError::Connect(e.to_string())),
                }
            }
        };
        timeout(cfg.connect_timeout, handshake).await.map_err(|_| {
            BusError::Connect(format!(
                "no answer from {}:{} within {:?}",
                cfg.host, cfg.port, cfg.connect_timeout
            ))
        })??;

        info!("Connected to broker at {}:{} as '{}'.", cfg.host, cfg.port, cfg.client_id);
        Ok(Self { client, eventloop, qos: QoS::AtMostOnce })
    }
}

#[async_trait]
impl BusTransport for MqttTransport {
    async fn subscribe(&mut self, topic: &str) -> Result<(), BusError> {
        self.client
            .subscribe(topic, self.qos)
            .await
            .map_err(|e| BusError::Subscribe(e.to_string()))
    }

    async fn next_message(&mut self) -> Result<InboundMessage, BusError> {
        loop {
            match self.eventloop.poll().await {
                Ok(Event::Incoming(Packet::Publish(publish))) => {
                    return Ok(InboundMessage {
                        topic: publish.topic,
                        payload: publish.payload.to_vec(),
                    });
                }
                Ok(Event::Incoming(Packet::SubAck(ack))) => {
                    if ack.return_codes.iter().any(|c| matches!(c, SubscribeReasonCode::Failure)) {
                        warn!("Broker rejected subscription request {}.", ack.pkid);
                    }
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    return Err(BusError::ConnectionLost("broker sent DISCONNECT".to_string()));
                }
                Ok(_) => {}
                Err(e) => return Err(BusError::ConnectionLost(e.to_string())),
            }
        }
    }

    fn publisher(&self) -> Arc<dyn BusPublisher> {
        Arc::new(MqttPublisher { client: self.client.clone(), qos: self.qos })
    }
}

/// Publishing half of an [`MqttTransport`]; requests are queued, never awaited.
struct MqttPublisher {
    client: AsyncClient,
    qos: QoS,
}

impl BusPublisher for MqttPublisher {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), BusError> {
        self.client
            .try_publish(topic, self.qos, false, payload)
            .map_err(|e| BusError::Publish(e.to_string()))
    }
}
