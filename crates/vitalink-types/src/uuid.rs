//! Bluetooth UUIDs for the supported medical device profiles.

use uuid::{Uuid, uuid};

/// Bluetooth base UUID; 16-bit assigned numbers are placed in bits 96..112.
pub const BLUETOOTH_BASE: Uuid = uuid!("00000000-0000-1000-8000-00805f9b34fb");

/// Expand a 16-bit assigned number into a full 128-bit UUID.
#[must_use]
pub const fn from_short(short: u16) -> Uuid {
    Uuid::from_u128(BLUETOOTH_BASE.as_u128() | ((short as u128) << 96))
}

/// The 16-bit assigned number of a UUID built on the Bluetooth base, if any.
#[must_use]
pub fn to_short(uuid: &Uuid) -> Option<u16> {
    let value = uuid.as_u128();
    let mask: u128 = !(0xFFFF_u128 << 96);
    if value & mask == BLUETOOTH_BASE.as_u128() {
        Some((value >> 96) as u16)
    } else {
        None
    }
}

// --- Glucose profile ---

/// Glucose service.
pub const GLUCOSE_SERVICE: Uuid = uuid!("00001808-0000-1000-8000-00805f9b34fb");

/// Glucose measurement characteristic.
pub const GLUCOSE_MEASUREMENT: Uuid = uuid!("00002a18-0000-1000-8000-00805f9b34fb");

/// Record Access Control Point characteristic.
pub const RECORD_ACCESS_CONTROL_POINT: Uuid = uuid!("00002a52-0000-1000-8000-00805f9b34fb");

// --- Blood pressure profile ---

/// Blood pressure service.
pub const BLOOD_PRESSURE_SERVICE: Uuid = uuid!("00001810-0000-1000-8000-00805f9b34fb");

/// Blood pressure measurement characteristic.
pub const BLOOD_PRESSURE_MEASUREMENT: Uuid = uuid!("00002a35-0000-1000-8000-00805f9b34fb");

// --- OneTouch Verio ---

/// OneTouch Verio custom service.
pub const VERIO_SERVICE: Uuid = uuid!("af9df7a1-e595-11e3-96b4-0002a5d5c51b");

/// Characteristic the collector writes framed requests to.
pub const VERIO_WRITE: Uuid = uuid!("af9df7a2-e595-11e3-96b4-0002a5d5c51b");

/// Characteristic the meter notifies framed responses on.
pub const VERIO_NOTIFY: Uuid = uuid!("af9df7a3-e595-11e3-96b4-0002a5d5c51b");
