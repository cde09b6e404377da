use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::error::SnapshotError;

/// The two device types the cloud models.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize)]
pub enum DeviceType {
    #[serde(rename = "HIGH_FREQUENCY_INVERTER")]
    Inverter,

    #[serde(rename = "LITHIUM_BATTERY_PACK")]
    BatteryPack,
}

impl DeviceType {
    pub const MANUFACTURER: &'static str = "Felicity Solar";

    pub fn from_vendor(raw: &str) -> Option<Self> {
        match raw {
            "HIGH_FREQUENCY_INVERTER" => Some(Self::Inverter),
            "LITHIUM_BATTERY_PACK" => Some(Self::BatteryPack),
            _ => None,
        }
    }

    pub const fn model(self) -> &'static str {
        match self {
            Self::Inverter => "High Frequency Inverter",
            Self::BatteryPack => "Lithium Battery Pack",
        }
    }
}

/// One row of the account's device listing.
///
/// The listing's type tag is advisory only. The snapshot's
/// `productTypeEnum` is the authoritative discriminator, so an unknown tag
/// here degrades to [`None`] instead of failing the whole listing.
#[derive(Clone, Debug, Deserialize)]
pub struct DeviceRecord {
    #[serde(rename = "deviceSn")]
    pub serial_number: String,

    #[serde(rename = "productTypeEnum", default, deserialize_with = "lenient_device_type")]
    pub device_type: Option<DeviceType>,
}

fn lenient_device_type<'de, D>(deserializer: D) -> Result<Option<DeviceType>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?
        .as_deref()
        .and_then(DeviceType::from_vendor))
}

/// A raw point-in-time telemetry read for one device. Transient: consumed
/// into a [`crate::core::reading::NormalizedReading`] right away.
pub struct Snapshot {
    pub device_type: DeviceType,
    pub fields: Map<String, Value>,
}

impl Snapshot {
    pub(crate) fn from_raw(fields: Map<String, Value>) -> Result<Self, SnapshotError> {
        let raw = fields
            .get("productTypeEnum")
            .and_then(Value::as_str)
            .ok_or(SnapshotError::MissingDeviceType)?;
        let device_type = DeviceType::from_vendor(raw)
            .ok_or_else(|| SnapshotError::UnknownDeviceType(raw.to_owned()))?;
        Ok(Self { device_type, fields })
    }
}
