//! Record transfer for devices without a control point.

use std::sync::Arc;

use futures::StreamExt;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info};
use vitalink_types::CharacteristicMap;

use super::{Interrupt, Session, SessionConfig, SessionState};
use crate::error::Result;
use crate::parsers::RecordParser;
use crate::transport::{DeviceId, GattTransport};

/// Collects records that a device pushes on its own once notifications are
/// enabled.
///
/// These devices cannot say when they are done, so collection ends
/// successfully when no sample has arrived for
/// [`SessionConfig::inertia_timeout`], when the overall deadline passes, or
/// when the device closes the link. Before the first sample only the overall
/// deadline applies.
pub struct PassiveSession<S> {
    transport: Arc<dyn GattTransport>,
    map: CharacteristicMap,
    parser: RecordParser<S>,
    config: SessionConfig,
}

impl<S> PassiveSession<S> {
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

    /// Connect, discover the measurement characteristic and enable
    /// notifications on it, which makes the host bond with the device.
    ///
    /// Anything the device pushes during pairing is ignored; `read` enables
    /// notifications again on a fresh connection to start the transfer.
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

    /// Enable notifications and collect until the device goes quiet.
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

        session.transition(SessionState::Subscribing);
        let mut records = session.listen(&peripheral, &measurement).await?;
        session
            .enable_notifications(&peripheral, &[measurement])
            .await?;

        session.transition(SessionState::Collecting);
        let inertia = session.config().inertia_timeout;
        let overall = session.config().overall_timeout;
        let mut quiet_after: Option<Instant> = None;
        let mut samples = Vec::new();

        loop {
            let inertia_elapsed = async move {
                match quiet_after {
                    Some(at) => sleep_until(at).await,
                    None => std::future::pending().await,
                }
            };

            tokio::select! {
                biased;
                interrupt = session.interrupted() => match interrupt {
                    Interrupt::Deadline => {
                        info!("Overall deadline reached with {} samples", samples.len());
                        return Ok(samples);
                    }
                    Interrupt::LinkClosed => {
                        info!("Device closed the link after {} samples", samples.len());
                        return Ok(samples);
                    }
                    other => return Err(other.into_error("collect records", overall)),
                },
                value = records.next() => {
                    let Some(bytes) = value else {
                        debug!("Notification stream ended");
                        return Ok(samples);
                    };
                    if session.accept(&measurement, &bytes, self.parser, &mut samples) {
                        quiet_after = Some(Instant::now() + inertia);
                    }
                }
                _ = inertia_elapsed => {
                    debug!("No samples for {:?}, collection complete", inertia);
                    return Ok(samples);
                }
            }
        }
    }
}
