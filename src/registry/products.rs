//! Known Energenie MiHome product characteristics.
//!
//! The product id in a frame header determines how much control the engine
//! has over the device: monitor-only sensors, mains-powered switches that
//! listen continuously, and battery devices that only listen in a short
//! window after they transmit.

use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::HashMap;

/// How commands reach a device, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlClass {
    /// Transmit-only device; nothing to send to it
    Monitor,
    /// Mains-powered, always listening; commands go out immediately
    Switchable,
    /// Battery device with a short receive window; commands are cached and
    /// replayed when it wakes
    SmallWindow,
}

/// Static description of a product id.
#[derive(Debug, Clone, Copy)]
pub struct ProductInfo {
    pub name: &'static str,
    pub control: ControlClass,
}

impl ProductInfo {
    pub const fn new(name: &'static str, control: ControlClass) -> Self {
        ProductInfo { name, control }
    }
}

/// Database of known MiHome products keyed by product id.
pub static KNOWN_PRODUCTS: Lazy<HashMap<u8, ProductInfo>> = Lazy::new(|| {
    let mut map = HashMap::new();

    map.insert(
        0x01,
        ProductInfo::new("Monitor Plug", ControlClass::Monitor),
    );
    map.insert(
        0x02,
        ProductInfo::new("Smart Plug+", ControlClass::Switchable),
    );
    map.insert(
        0x03,
        ProductInfo::new("Radiator Valve", ControlClass::SmallWindow),
    );
    map.insert(
        0x05,
        ProductInfo::new("House Monitor", ControlClass::Monitor),
    );
    map.insert(
        0x0C,
        ProductInfo::new("Motion Sensor", ControlClass::Monitor),
    );
    map.insert(0x0D, ProductInfo::new("Open Sensor", ControlClass::Monitor));
    map.insert(
        0x12,
        ProductInfo::new("Thermostat", ControlClass::SmallWindow),
    );
    map.insert(0x13, ProductInfo::new("Click", ControlClass::Monitor));

    map
});

/// Fallback for product ids not in the database. Unrecognized products are
/// treated as switchable so a command attempt at least goes on the air.
const UNKNOWN_PRODUCT: ProductInfo = ProductInfo::new("Unknown", ControlClass::Switchable);

/// Look up a product id, falling back to the unknown entry.
pub fn product_info(product_id: u8) -> ProductInfo {
    KNOWN_PRODUCTS
        .get(&product_id)
        .copied()
        .unwrap_or(UNKNOWN_PRODUCT)
}
