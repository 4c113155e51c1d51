//! Per-family readers and the registry that selects them.
//!
//! A reader pairs one session protocol with the parser for one device
//! family and exposes the uniform `pair`/`read` contract:
//!
//! | Kind | Session | Parser |
//! |------|---------|--------|
//! | [`DeviceKind::Glucose`] | [`RacpSession`] | [`parse_glucose_measurement`] |
//! | [`DeviceKind::BloodPressure`] | [`RacpSession`] | [`parse_blood_pressure_measurement`] |
//! | [`DeviceKind::BloodPressurePassive`] | [`PassiveSession`] | [`parse_blood_pressure_measurement`] |
//! | [`DeviceKind::OneTouchVerio`] | [`FramedSession`] | [`parse_verio_record`] |
//! | [`DeviceKind::OneTouchVerioIq`] | [`FramedSession`] | [`parse_verio_iq_record`] |
//!
//! [`DeviceReader`] is generic over the sample type. [`MeasurementReader`]
//! erases it to [`Measurement`] so readers for different families can sit
//! in one [`ReaderRegistry`].

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use vitalink_types::{BloodPressureSample, DeviceKind, GlucoseSample, Measurement};

use crate::error::{Error, Result};
use crate::parsers::{
    RecordParser, parse_blood_pressure_measurement, parse_glucose_measurement,
    parse_verio_iq_record, parse_verio_record,
};
use crate::session::{FramedProtocol, FramedSession, PassiveSession, RacpSession, SessionConfig};
use crate::transport::{DeviceId, GattTransport};

/// Pair with and read stored records from one device family.
///
/// # Example
///
/// ```ignore
/// use vitalink_core::{DeviceId, DeviceReader, GlucoseReader, Result};
///
/// async fn latest(reader: &GlucoseReader, device: &DeviceId) -> Result<Option<f64>> {
///     let samples = reader.read(device).await?;
///     Ok(samples.last().map(|s| s.value))
/// }
/// ```
#[async_trait]
pub trait DeviceReader: Send + Sync {
    type Sample: Send;

    /// The family this reader talks to.
    fn kind(&self) -> DeviceKind;

    /// Connect, discover and enable notifications, then disconnect.
    async fn pair(&self, device: &DeviceId) -> Result<()>;

    /// Transfer every stored record. Implies pairing.
    async fn read(&self, device: &DeviceId) -> Result<Vec<Self::Sample>>;
}

/// [`DeviceReader`] with the sample type erased to [`Measurement`].
#[async_trait]
pub trait MeasurementReader: Send + Sync {
    fn kind(&self) -> DeviceKind;

    async fn pair(&self, device: &DeviceId) -> Result<()>;

    async fn read_measurements(&self, device: &DeviceId) -> Result<Vec<Measurement>>;
}

#[async_trait]
impl<R> MeasurementReader for R
where
    R: DeviceReader,
    R::Sample: Into<Measurement>,
{
    fn kind(&self) -> DeviceKind {
        DeviceReader::kind(self)
    }

    async fn pair(&self, device: &DeviceId) -> Result<()> {
        DeviceReader::pair(self, device).await
    }

    async fn read_measurements(&self, device: &DeviceId) -> Result<Vec<Measurement>> {
        let samples = DeviceReader::read(self, device).await?;
        Ok(samples.into_iter().map(Into::into).collect())
    }
}

enum Protocol<S> {
    Racp(RacpSession<S>),
    Passive(PassiveSession<S>),
    Framed(FramedSession<S>),
}

/// Reader for one device family, built on the session its protocol needs.
pub struct ProfileReader<S> {
    kind: DeviceKind,
    protocol: Protocol<S>,
}

/// Reader yielding [`GlucoseSample`]s.
pub type GlucoseReader = ProfileReader<GlucoseSample>;

/// Reader yielding [`BloodPressureSample`]s.
pub type BloodPressureReader = ProfileReader<BloodPressureSample>;

impl<S> ProfileReader<S> {
    /// Pick the session for `kind`: RACP when the family has a control
    /// point, passive collection otherwise.
    fn standard(
        kind: DeviceKind,
        transport: Arc<dyn GattTransport>,
        config: SessionConfig,
        parser: RecordParser<S>,
    ) -> Self {
        let map = kind.characteristics();
        let protocol = if kind.supports_racp() {
            Protocol::Racp(RacpSession::new(transport, map, parser).with_config(config))
        } else {
            Protocol::Passive(PassiveSession::new(transport, map, parser).with_config(config))
        };
        Self { kind, protocol }
    }
}

impl GlucoseReader {
    /// Glucose meter implementing the 0x1808 profile.
    pub fn glucose(transport: Arc<dyn GattTransport>, config: SessionConfig) -> Self {
        Self::standard(
            DeviceKind::Glucose,
            transport,
            config,
            parse_glucose_measurement,
        )
    }

    /// OneTouch Verio meter.
    pub fn verio(transport: Arc<dyn GattTransport>, config: SessionConfig) -> Self {
        Self::framed(
            DeviceKind::OneTouchVerio,
            FramedProtocol::VERIO,
            transport,
            config,
            parse_verio_record,
        )
    }

    /// OneTouch Verio IQ meter.
    pub fn verio_iq(transport: Arc<dyn GattTransport>, config: SessionConfig) -> Self {
        Self::framed(
            DeviceKind::OneTouchVerioIq,
            FramedProtocol::VERIO_IQ,
            transport,
            config,
            parse_verio_iq_record,
        )
    }

    fn framed(
        kind: DeviceKind,
        framing: FramedProtocol,
        transport: Arc<dyn GattTransport>,
        config: SessionConfig,
        parser: RecordParser<GlucoseSample>,
    ) -> Self {
        let session = FramedSession::new(transport, kind.characteristics(), framing, parser);
        Self {
            kind,
            protocol: Protocol::Framed(session.with_config(config)),
        }
    }
}

impl BloodPressureReader {
    /// Blood-pressure monitor implementing the 0x1810 profile with RACP.
    pub fn blood_pressure(transport: Arc<dyn GattTransport>, config: SessionConfig) -> Self {
        Self::standard(
            DeviceKind::BloodPressure,
            transport,
            config,
            parse_blood_pressure_measurement,
        )
    }

    /// Blood-pressure monitor that pushes its records without RACP.
    pub fn passive_blood_pressure(
        transport: Arc<dyn GattTransport>,
        config: SessionConfig,
    ) -> Self {
        Self::standard(
            DeviceKind::BloodPressurePassive,
            transport,
            config,
            parse_blood_pressure_measurement,
        )
    }
}

#[async_trait]
impl<S: Send> DeviceReader for ProfileReader<S> {
    type Sample = S;

    fn kind(&self) -> DeviceKind {
        self.kind
    }

    async fn pair(&self, device: &DeviceId) -> Result<()> {
        debug!("Pairing {} as {}", device, self.kind);
        match &self.protocol {
            Protocol::Racp(session) => session.pair(device).await,
            Protocol::Passive(session) => session.pair(device).await,
            Protocol::Framed(session) => session.pair(device).await,
        }
    }

    async fn read(&self, device: &DeviceId) -> Result<Vec<S>> {
        debug!("Reading {} as {}", device, self.kind);
        match &self.protocol {
            Protocol::Racp(session) => session.read(device).await,
            Protocol::Passive(session) => session.read(device).await,
            Protocol::Framed(session) => session.read(device).await,
        }
    }
}

/// Build the reader for `kind`.
///
/// # Errors
///
/// [`Error::UnsupportedDevice`] for a kind this version cannot read.
pub fn reader_for(
    kind: DeviceKind,
    transport: Arc<dyn GattTransport>,
    config: SessionConfig,
) -> Result<Arc<dyn MeasurementReader>> {
    let reader: Arc<dyn MeasurementReader> = match kind {
        DeviceKind::Glucose => Arc::new(GlucoseReader::glucose(transport, config)),
        DeviceKind::OneTouchVerio => Arc::new(GlucoseReader::verio(transport, config)),
        DeviceKind::OneTouchVerioIq => Arc::new(GlucoseReader::verio_iq(transport, config)),
        DeviceKind::BloodPressure => {
            Arc::new(BloodPressureReader::blood_pressure(transport, config))
        }
        DeviceKind::BloodPressurePassive => {
            Arc::new(BloodPressureReader::passive_blood_pressure(transport, config))
        }
        other => return Err(Error::UnsupportedDevice(other)),
    };
    Ok(reader)
}

/// Readers keyed by device kind.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use vitalink_core::{ReaderRegistry, SessionConfig, mock::MockTransport};
/// use vitalink_types::DeviceKind;
///
/// let transport = Arc::new(MockTransport::new());
/// let registry = ReaderRegistry::with_defaults(transport, SessionConfig::default());
/// assert!(registry.get(DeviceKind::OneTouchVerio).is_ok());
/// assert_eq!(registry.kinds().len(), DeviceKind::ALL.len());
/// ```
#[derive(Default, Clone)]
pub struct ReaderRegistry {
    readers: BTreeMap<DeviceKind, Arc<dyn MeasurementReader>>,
}

impl std::fmt::Debug for ReaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReaderRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl ReaderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with a reader for every supported kind, all sharing one
    /// transport and config.
    pub fn with_defaults(transport: Arc<dyn GattTransport>, config: SessionConfig) -> Self {
        let mut registry = Self::new();
        for kind in DeviceKind::ALL {
            if let Ok(reader) = reader_for(kind, Arc::clone(&transport), config.clone()) {
                registry.register(reader);
            }
        }
        registry
    }

    /// Add a reader under its own kind, returning the one it replaces.
    pub fn register(
        &mut self,
        reader: Arc<dyn MeasurementReader>,
    ) -> Option<Arc<dyn MeasurementReader>> {
        self.readers.insert(reader.kind(), reader)
    }

    /// The reader for `kind`.
    ///
    /// # Errors
    ///
    /// [`Error::UnsupportedDevice`] when no reader is registered for it.
    pub fn get(&self, kind: DeviceKind) -> Result<Arc<dyn MeasurementReader>> {
        self.readers
            .get(&kind)
            .cloned()
            .ok_or(Error::UnsupportedDevice(kind))
    }

    /// Registered kinds, in declaration order.
    pub fn kinds(&self) -> Vec<DeviceKind> {
        self.readers.keys().copied().collect()
    }

    /// Pair with `device` using the reader for `kind`.
    pub async fn pair(&self, kind: DeviceKind, device: &DeviceId) -> Result<()> {
        self.get(kind)?.pair(device).await
    }

    /// Read every stored record from `device` using the reader for `kind`.
    pub async fn read(&self, kind: DeviceKind, device: &DeviceId) -> Result<Vec<Measurement>> {
        self.get(kind)?.read_measurements(device).await
    }
}
