//! Request/response record transfer over CRC-framed packets.

use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info};
use vitalink_types::{CharacteristicMap, frame};

use super::{Session, SessionConfig, SessionState};
use crate::error::{Error, Result};
use crate::parsers::RecordParser;
use crate::parsers::verio;
use crate::transport::{
    Characteristic, DeviceId, GattTransport, NotificationStream, PeripheralHandle,
};

/// Request layout and count decoding for one framed meter family.
///
/// Every family shares the frame codec, the success byte and the ACK; they
/// differ in how the record count is asked for and decoded and in how a
/// record is requested by index.
#[derive(Debug, Clone, Copy)]
pub struct FramedProtocol {
    /// Name used in logs.
    pub name: &'static str,
    /// Request payload asking for the number of stored records.
    pub count_request: &'static [u8],
    /// Decode the count response payload, after the success byte.
    pub parse_count: fn(&[u8]) -> Option<u16>,
    /// Request payload reading the record at an index.
    pub record_request: fn(u16) -> Vec<u8>,
}

impl FramedProtocol {
    /// OneTouch Verio.
    pub const VERIO: FramedProtocol = FramedProtocol {
        name: "verio",
        count_request: &verio::READ_RECORD_COUNT,
        parse_count: verio::parse_verio_record_count,
        record_request: verio::read_record_request,
    };

    /// OneTouch Verio IQ.
    pub const VERIO_IQ: FramedProtocol = FramedProtocol {
        name: "verio-iq",
        count_request: &verio::IQ_READ_RECORD_COUNT,
        parse_count: verio::parse_verio_iq_record_count,
        record_request: verio::iq_read_record_request,
    };
}

/// Reads stored records from a OneTouch Verio family meter.
///
/// The meter answers one framed request at a time. Each step writes the
/// request, waits for the response notification, validates its CRC and
/// response code, and writes an acknowledgement before the next step
/// starts. A bad frame or response code fails the whole session; a record
/// payload the parser rejects is only dropped.
///
/// Every step is bounded by [`SessionConfig::step_timeout`] as well as by
/// the overall deadline.
pub struct FramedSession<S> {
    transport: Arc<dyn GattTransport>,
    map: CharacteristicMap,
    protocol: FramedProtocol,
    parser: RecordParser<S>,
    config: SessionConfig,
}

/// Characteristics and listener for one framed exchange.
struct Link<'a> {
    peripheral: &'a PeripheralHandle,
    write: &'a Characteristic,
    responses: &'a mut NotificationStream,
}

impl<S> FramedSession<S> {
    pub fn new(
        transport: Arc<dyn GattTransport>,
        map: CharacteristicMap,
        protocol: FramedProtocol,
        parser: RecordParser<S>,
    ) -> Self {
        Self {
            transport,
            map,
            protocol,
            parser,
            config: SessionConfig::default(),
        }
    }

    /// Replace the session config.
    #[must_use]
    pub fn with_config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Connect, discover both characteristics and enable notifications.
    #[tracing::instrument(level = "debug", skip(self), fields(service = %self.map.service))]
    pub async fn pair(&self, device: &DeviceId) -> Result<()> {
        self.config.validate()?;
        let mut session = Session::start(
            Arc::clone(&self.transport),
            device.clone(),
            self.config.clone(),
        );
        let result = async {
            let peripheral = session.connect().await?;
            let discovered = session.discover(&peripheral, &self.map).await?;
            session.transition(SessionState::Subscribing);
            session
                .enable_notifications(&peripheral, &[discovered.measurement])
                .await
        }
        .await;
        session.finish(result).await
    }

    /// Pair, read the record count, then read every record by index.
    #[tracing::instrument(skip(self), fields(protocol = self.protocol.name))]
    pub async fn read(&self, device: &DeviceId) -> Result<Vec<S>> {
        self.config.validate()?;
        let mut session = Session::start(
            Arc::clone(&self.transport),
            device.clone(),
            self.config.clone(),
        );
        let result = self.collect(&mut session).await;
        session.finish(result).await
    }

    async fn collect(&self, session: &mut Session) -> Result<Vec<S>> {
        let peripheral = session.connect().await?;
        let discovered = session.discover(&peripheral, &self.map).await?;
        let notify = discovered.measurement;
        let write = discovered.control.ok_or_else(|| {
            Error::invalid_config("a framed session needs a write characteristic")
        })?;

        session.transition(SessionState::Subscribing);
        let mut responses = session.listen(&peripheral, &notify).await?;
        session.enable_notifications(&peripheral, &[notify]).await?;

        session.transition(SessionState::Collecting);
        let mut link = Link {
            peripheral: &peripheral,
            write: &write,
            responses: &mut responses,
        };

        let protocol = self.protocol;
        let payload =
            exchange(session, &mut link, "read record count", protocol.count_request).await?;
        let count = (protocol.parse_count)(&payload).ok_or_else(|| {
            Error::unexpected("record count", format!("{} byte payload", payload.len()))
        })?;
        info!("Meter holds {} records", count);

        let mut samples = Vec::with_capacity(usize::from(count));
        for index in 0..count {
            let request = (protocol.record_request)(index);
            let payload = exchange(session, &mut link, "read record", &request).await?;
            session.accept(&notify, &payload, self.parser, &mut samples);
        }
        Ok(samples)
    }
}

/// One request, response, acknowledgement step. Returns the response
/// payload after the success byte.
async fn exchange(
    session: &mut Session,
    link: &mut Link<'_>,
    operation: &'static str,
    request: &[u8],
) -> Result<Vec<u8>> {
    let packet = frame::encode_request(request)?;
    let step_timeout = session.config().step_timeout;
    let transport = session.transport();
    debug!("{}: writing {:02X?}", operation, packet);

    let peripheral = link.peripheral;
    let write = link.write;
    let responses = &mut *link.responses;
    let response = session
        .step(operation, async {
            tokio::time::timeout(step_timeout, async {
                transport.write_value(peripheral, write, &packet).await?;
                responses.next().await.ok_or(Error::ConnectionLost)
            })
            .await
            .map_err(|_| Error::timeout(operation, step_timeout))?
        })
        .await?;

    let payload = frame::decode_response(&response)?;
    let rest = match payload.split_first() {
        Some((&frame::RESPONSE_OK, rest)) => rest.to_vec(),
        Some((code, _)) => {
            return Err(Error::unexpected(
                format!("response code 0x{:02X}", frame::RESPONSE_OK),
                format!("0x{:02X}", code),
            ));
        }
        None => return Err(Error::unexpected("response code", "empty payload")),
    };

    session
        .write(peripheral, write, &frame::ack_packet())
        .await?;
    Ok(rest)
}
