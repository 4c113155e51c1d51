//! Record transfer driven by a Record Access Control Point.

use std::sync::Arc;

use futures::{FutureExt, StreamExt};
use tracing::{debug, info};
use vitalink_types::{CharacteristicMap, RacpCommand, RacpResponse};

use super::{Session, SessionConfig, SessionState};
use crate::error::{Error, Result};
use crate::parsers::RecordParser;
use crate::transport::{DeviceId, GattTransport};

/// Reads every stored record from a device with a RACP.
///
/// `read` subscribes to the measurement and RACP characteristics, writes
/// "report all stored records" and collects measurement notifications until
/// the first RACP response. Success and "no records found" return the
/// samples; any other response fails with [`Error::Racp`] and discards them.
///
/// Both listeners are registered before notifications are enabled, so a
/// RACP response can never be missed. When it arrives, measurement
/// notifications already buffered are drained before the session ends.
pub struct RacpSession<S> {
    transport: Arc<dyn GattTransport>,
    map: CharacteristicMap,
    parser: RecordParser<S>,
    config: SessionConfig,
}

impl<S> RacpSession<S> {
    pub fn new(
        transport: Arc<dyn GattTransport>,
        map: CharacteristicMap,
        parser: RecordParser<S>,
    ) -> Self {
        Self {
            transport,
            map,
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

    /// Connect, discover both characteristics and enable notifications on
    /// them, without writing the command.
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
                .enable_notifications(&peripheral, &discovered.all())
                .await
        }
        .await;
        session.finish(result).await
    }

    /// Pair, then transfer every stored record.
    #[tracing::instrument(skip(self), fields(service = %self.map.service))]
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
        let measurement = discovered.measurement;
        let control = discovered.control.ok_or_else(|| {
            Error::invalid_config("a RACP session needs a control point characteristic")
        })?;

        session.transition(SessionState::Subscribing);
        let mut records = session.listen(&peripheral, &measurement).await?;
        let mut responses = session.listen(&peripheral, &control).await?;
        session
            .enable_notifications(&peripheral, &[measurement, control])
            .await?;

        session.transition(SessionState::Collecting);
        let command = RacpCommand::report_all_records();
        debug!("Writing RACP command {:02X?}", command.to_bytes());
        session
            .write(&peripheral, &control, &command.to_bytes())
            .await?;

        let overall = session.config().overall_timeout;
        let mut samples = Vec::new();
        loop {
            tokio::select! {
                biased;
                interrupt = session.interrupted() => {
                    return Err(interrupt.into_error("read records", overall));
                }
                value = responses.next() => {
                    let Some(value) = value else {
                        return Err(Error::ConnectionLost);
                    };
                    while let Some(Some(bytes)) = records.next().now_or_never() {
                        session.accept(&measurement, &bytes, self.parser, &mut samples);
                    }

                    let response = RacpResponse::classify(&value);
                    info!("RACP response: {} after {} samples", response, samples.len());
                    return if response.is_complete() {
                        Ok(samples)
                    } else {
                        Err(Error::Racp(response))
                    };
                }
                value = records.next() => {
                    let Some(bytes) = value else {
                        return Err(Error::ConnectionLost);
                    };
                    session.accept(&measurement, &bytes, self.parser, &mut samples);
                }
            }
        }
    }
}
