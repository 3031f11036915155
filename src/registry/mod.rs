//! Device registry.
//!
//! Devices are learned passively: every frame that decodes registers its
//! sender, and caching a command for an unseen device can plant a
//! placeholder entry. Entries live for the engine's lifetime and carry the
//! per-product state that outlives a single frame: the cached-command slot
//! for small-window devices and the accumulated valve or thermostat state.

use serde::Serialize;

use crate::cache::CachedCommand;
use crate::constants::{MAX_DEVICES, PRODUCT_ETRV, PRODUCT_THERMOSTAT};
use crate::error::OpenThingsError;

pub mod products;
pub mod thermostat;
pub mod valve;

pub use products::{product_info, ControlClass, ProductInfo};
pub use thermostat::{ThermostatMode, ThermostatState};
pub use valve::{DiagnosticFlags, TrvState, ValveState};

/// Product-specific state carried by a device entry.
#[derive(Debug, Clone, Default)]
pub enum ProductState {
    #[default]
    None,
    Valve(TrvState),
    Thermostat(ThermostatState),
}

/// One known device.
#[derive(Debug, Clone)]
pub struct Device {
    pub device_id: u32,
    pub mfr_id: u8,
    pub product_id: u8,
    pub control: ControlClass,
    pub product_name: &'static str,
    /// Whether this device has join-handshaked with us
    pub joined: bool,
    /// Present iff the product takes cached commands
    pub cache: Option<CachedCommand>,
    pub state: ProductState,
}

impl Device {
    fn new(device_id: u32, mfr_id: u8, product_id: u8, joined: bool) -> Self {
        let info = product_info(product_id);
        let state = match product_id {
            PRODUCT_ETRV => ProductState::Valve(TrvState::default()),
            PRODUCT_THERMOSTAT => ProductState::Thermostat(ThermostatState::default()),
            _ => ProductState::None,
        };
        Device {
            device_id,
            mfr_id,
            product_id,
            control: info.control,
            product_name: info.name,
            joined,
            cache: (info.control == ControlClass::SmallWindow).then(CachedCommand::new),
            state,
        }
    }

    /// True when commands for this device are parked until it wakes.
    pub fn accepts_cached(&self) -> bool {
        self.control == ControlClass::SmallWindow
    }

    pub fn trv(&self) -> Option<&TrvState> {
        match &self.state {
            ProductState::Valve(trv) => Some(trv),
            _ => None,
        }
    }

    pub fn trv_mut(&mut self) -> Option<&mut TrvState> {
        match &mut self.state {
            ProductState::Valve(trv) => Some(trv),
            _ => None,
        }
    }

    pub fn thermostat(&self) -> Option<&ThermostatState> {
        match &self.state {
            ProductState::Thermostat(stat) => Some(stat),
            _ => None,
        }
    }

    pub fn thermostat_mut(&mut self) -> Option<&mut ThermostatState> {
        match &mut self.state {
            ProductState::Thermostat(stat) => Some(stat),
            _ => None,
        }
    }

    fn entry(&self) -> DeviceEntry {
        DeviceEntry {
            mfr_id: self.mfr_id,
            product_id: self.product_id,
            device_id: self.device_id,
            control: self.control,
            product: self.product_name.to_string(),
            joined: self.joined,
        }
    }
}

/// Serializable registry row returned by device-list queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceEntry {
    #[serde(rename = "mfrId")]
    pub mfr_id: u8,
    #[serde(rename = "productId")]
    pub product_id: u8,
    #[serde(rename = "deviceId")]
    pub device_id: u32,
    pub control: ControlClass,
    pub product: String,
    pub joined: bool,
}

/// All devices seen or commanded this session, bounded by capacity.
#[derive(Debug)]
pub struct DeviceRegistry {
    devices: Vec<Device>,
    capacity: usize,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        DeviceRegistry::with_capacity(MAX_DEVICES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        DeviceRegistry {
            devices: Vec::new(),
            capacity,
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn get(&self, device_id: u32) -> Option<&Device> {
        self.devices.iter().find(|d| d.device_id == device_id)
    }

    pub fn get_mut(&mut self, device_id: u32) -> Option<&mut Device> {
        self.devices.iter_mut().find(|d| d.device_id == device_id)
    }

    /// Register a sighting of a device, creating the entry on first sight.
    ///
    /// An existing entry keeps its identity fields; the only thing a later
    /// sighting can change is latching `joined` on. Creation fails once the
    /// registry is full.
    pub fn put(
        &mut self,
        device_id: u32,
        mfr_id: u8,
        product_id: u8,
        joined: bool,
    ) -> Result<&mut Device, OpenThingsError> {
        if let Some(pos) = self.devices.iter().position(|d| d.device_id == device_id) {
            let device = &mut self.devices[pos];
            if joined {
                device.joined = true;
            }
            return Ok(device);
        }

        if self.devices.len() >= self.capacity {
            return Err(OpenThingsError::CapacityExceeded(self.capacity));
        }

        let device = Device::new(device_id, mfr_id, product_id, joined);
        log::info!(
            "registered device {device_id} as {} (product 0x{product_id:02x})",
            device.product_name
        );
        self.devices.push(device);
        let last = self.devices.len() - 1;
        Ok(&mut self.devices[last])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    /// Snapshot of the registry as serializable rows.
    pub fn entries(&self) -> Vec<DeviceEntry> {
        self.devices.iter().map(Device::entry).collect()
    }
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        DeviceRegistry::new()
    }
}
