// Home automation device models
//
// `getdevicelistinfos` answers with an XML `devicelist`. The wire structs
// here mirror that document; `Device` is the flattened snapshot callers
// work with.

use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumIter, IntoEnumIterator, IntoStaticStr};

// ── Capabilities ─────────────────────────────────────────────────────

/// A single function bit of a device's `functionbitmask`.
///
/// Only the bits the control operations look at are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Capability {
    Alarm,
    Thermostat,
    EnergyMeter,
    TemperatureSensor,
    Socket,
    DectRepeater,
}

impl Capability {
    pub const fn bit(self) -> u32 {
        match self {
            Self::Alarm => 1 << 4,
            Self::Thermostat => 1 << 6,
            Self::EnergyMeter => 1 << 7,
            Self::TemperatureSensor => 1 << 8,
            Self::Socket => 1 << 9,
            Self::DectRepeater => 1 << 10,
        }
    }
}

/// Set of [`Capability`] tags over the raw bitmask.
///
/// Unnamed bits are kept in [`bits`](Self::bits) but never reported by
/// [`iter`](Self::iter).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities(u32);

impl Capabilities {
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, capability: Capability) -> bool {
        self.0 & capability.bit() != 0
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::iter().filter(move |c| self.contains(*c))
    }

    pub fn is_empty(self) -> bool {
        self.iter().next().is_none()
    }
}

impl FromIterator<Capability> for Capabilities {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().fold(0, |bits, c| bits | c.bit()))
    }
}

impl Serialize for Capabilities {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(None)?;
        for capability in self.iter() {
            seq.serialize_element(<&'static str>::from(capability))?;
        }
        seq.end()
    }
}

// ── Device ───────────────────────────────────────────────────────────

/// A device snapshot as reported by the gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Device {
    /// AIN as displayed by the gateway, possibly containing spaces.
    pub identifier: String,
    /// Gateway-internal numeric id.
    pub id: Option<String>,
    pub name: Option<String>,
    pub product_name: String,
    pub manufacturer: String,
    pub firmware: String,
    pub capabilities: Capabilities,
    pub connected: bool,
    pub locked: bool,
}

impl Device {
    /// The identifier with all whitespace removed, as commands expect it.
    pub fn ain(&self) -> String {
        clean_ain(&self.identifier)
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn is_socket(&self) -> bool {
        self.has(Capability::Socket)
    }

    pub fn is_thermostat(&self) -> bool {
        self.has(Capability::Thermostat)
    }

    pub fn is_alarm(&self) -> bool {
        self.has(Capability::Alarm)
    }

    pub fn has_energy_meter(&self) -> bool {
        self.has(Capability::EnergyMeter)
    }

    pub fn has_temperature_sensor(&self) -> bool {
        self.has(Capability::TemperatureSensor)
    }

    pub fn is_dect_repeater(&self) -> bool {
        self.has(Capability::DectRepeater)
    }
}

/// Strip all whitespace from an AIN.
///
/// The gateway displays AINs as `"08761 0000434"` but expects
/// `"087610000434"` in commands.
pub fn clean_ain(ain: &str) -> String {
    ain.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Parse a boolean token the way the gateway writes them (`1`/`0`, `true`…).
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

// ── Wire format ──────────────────────────────────────────────────────

/// `<devicelist version="1"><device …/>…</devicelist>`
#[derive(Debug, Default, Deserialize)]
#[serde(rename = "devicelist")]
pub(crate) struct DeviceList {
    #[serde(rename = "device", default)]
    pub devices: Vec<DeviceXml>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DeviceXml {
    #[serde(rename = "@identifier", default)]
    identifier: String,
    #[serde(rename = "@id", default)]
    id: Option<String>,
    #[serde(rename = "@functionbitmask", default)]
    function_bitmask: u32,
    #[serde(rename = "@fwversion", default)]
    firmware: String,
    #[serde(rename = "@manufacturer", default)]
    manufacturer: String,
    #[serde(rename = "@productname", default)]
    product_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    present: bool,
    #[serde(default)]
    switch: Option<SwitchXml>,
}

#[derive(Debug, Default, Deserialize)]
struct SwitchXml {
    /// Empty when the state is unknown.
    #[serde(default, deserialize_with = "flag")]
    lock: bool,
}

fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Ok(parse_bool(raw.trim()).unwrap_or(false))
}

impl From<DeviceXml> for Device {
    fn from(raw: DeviceXml) -> Self {
        Self {
            identifier: raw.identifier,
            id: raw.id,
            name: raw.name,
            product_name: raw.product_name,
            manufacturer: raw.manufacturer,
            firmware: raw.firmware,
            capabilities: Capabilities::from_bits(raw.function_bitmask),
            connected: raw.present,
            locked: raw.switch.is_some_and(|s| s.lock),
        }
    }
}
