//! Normalizes raw vendor snapshots into typed, fully populated readings.
//!
//! The host entity layer instantiates one sensor per descriptor, so the
//! schema is a static table per device type rather than per-field types.
//! Missing or unmapped source fields become `0` or `""`, never null.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;
use serde_json::Value;

use crate::api::shine::{DeviceType, Snapshot};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FieldKind {
    Float,
    Int,
    Text,
}

/// One typed data point of the normalized schema.
pub struct FieldDescriptor {
    /// Stable output key, the host-side sensor identity.
    pub key: &'static str,

    /// The vendor's field name in the raw snapshot.
    pub source: &'static str,

    pub kind: FieldKind,

    pub unit: Option<&'static str>,
}

const fn field(
    key: &'static str,
    source: &'static str,
    kind: FieldKind,
    unit: Option<&'static str>,
) -> FieldDescriptor {
    FieldDescriptor { key, source, kind, unit }
}

/// AC, PV and battery sub-metrics plus the cumulative energy counters.
pub static INVERTER_FIELDS: [FieldDescriptor; 23] = [
    field("acInputVoltage", "acRInVolt", FieldKind::Float, Some("V")),
    field("acInputFrequency", "acRInFreq", FieldKind::Float, Some("Hz")),
    field("acInputPower", "acRInPower", FieldKind::Float, Some("W")),
    field("acOutputVoltage", "acROutVolt", FieldKind::Float, Some("V")),
    field("acOutputCurrent", "acROutCurr", FieldKind::Float, Some("A")),
    field("acOutputFrequency", "acROutFreq", FieldKind::Float, Some("Hz")),
    field("acTotalOutputActivePower", "acTotalOutActPower", FieldKind::Float, Some("W")),
    field("loadPercentage", "loadPercent", FieldKind::Float, Some("%")),
    field("pvVoltage", "pvVolt", FieldKind::Float, Some("V")),
    field("pvInputCurrent", "pvInCurr", FieldKind::Float, Some("A")),
    field("pvPower", "pvPower", FieldKind::Float, Some("W")),
    field("pvTotalPower", "pvTotalPower", FieldKind::Float, Some("W")),
    field("batteryVoltage", "emsVoltage", FieldKind::Float, Some("V")),
    field("batteryCurrent", "emsCurrent", FieldKind::Float, Some("A")),
    field("batteryPower", "emsPower", FieldKind::Float, Some("W")),
    field("batterySoc", "emsSoc", FieldKind::Int, Some("%")),
    field("tempMax", "tempMax", FieldKind::Float, Some("°C")),
    field("devTempMax", "devTempMax", FieldKind::Float, Some("°C")),
    field("energyPvToday", "ePvToday", FieldKind::Float, Some("kWh")),
    field("energyPvTotal", "ePvTotal", FieldKind::Float, Some("kWh")),
    field("energyLoadToday", "eLoadToday", FieldKind::Float, Some("kWh")),
    field("energyLoadTotal", "eLoadTotal", FieldKind::Float, Some("kWh")),
    field("totalEnergy", "totalEnergy", FieldKind::Float, Some("kWh")),
];

/// Electrical state and health of a battery pack.
pub static BATTERY_FIELDS: [FieldDescriptor; 7] = [
    field("voltage", "battVolt", FieldKind::Float, Some("V")),
    field("current", "battCurr", FieldKind::Float, Some("A")),
    field("soc", "battSoc", FieldKind::Int, Some("%")),
    field("soh", "battSoh", FieldKind::Int, Some("%")),
    field("ratedEnergy", "ratedEnergy", FieldKind::Float, Some("kWh")),
    field("energyUnit", "energyUnit", FieldKind::Text, None),
    field("nameplateRatedPower", "nameplateRatedPower", FieldKind::Text, None),
];

pub fn descriptors(device_type: DeviceType) -> &'static [FieldDescriptor] {
    match device_type {
        DeviceType::Inverter => &INVERTER_FIELDS,
        DeviceType::BatteryPack => &BATTERY_FIELDS,
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Float(f64),
    Int(i64),
    Text(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(value) => write!(f, "{value}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl FieldKind {
    /// The cloud is loose about types and may serve numbers as strings, so
    /// both are accepted for the numeric kinds.
    fn convert(self, value: Option<&Value>) -> FieldValue {
        match self {
            Self::Float => FieldValue::Float(value.map_or(0.0, as_f64)),
            Self::Int => FieldValue::Int(value.map_or(0, as_i64)),
            Self::Text => FieldValue::Text(value.map_or_else(String::new, as_text)),
        }
    }
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Number(number) => number.as_f64().unwrap_or_default(),
        Value::String(string) => string.trim().parse().unwrap_or_default(),
        _ => 0.0,
    }
}

#[allow(clippy::cast_possible_truncation)]
fn as_i64(value: &Value) -> i64 {
    match value {
        Value::Number(number) => {
            number.as_i64().unwrap_or_else(|| number.as_f64().unwrap_or_default() as i64)
        }
        Value::String(string) => {
            let trimmed = string.trim();
            trimmed
                .parse()
                .unwrap_or_else(|_| trimmed.parse::<f64>().unwrap_or_default() as i64)
        }
        _ => 0,
    }
}

fn as_text(value: &Value) -> String {
    match value {
        Value::String(string) => string.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// The unit of output handed to the host layer: one per device per cycle,
/// keyed by serial number, with every schema field populated.
#[derive(Clone, Debug, Serialize)]
pub struct NormalizedReading {
    #[serde(rename = "type")]
    pub device_type: DeviceType,

    #[serde(rename = "serialNumber")]
    pub serial_number: String,

    pub data: BTreeMap<&'static str, FieldValue>,
}

impl NormalizedReading {
    pub fn from_snapshot(serial_number: String, snapshot: &Snapshot) -> Self {
        let data = descriptors(snapshot.device_type)
            .iter()
            .map(|descriptor| {
                (descriptor.key, descriptor.kind.convert(snapshot.fields.get(descriptor.source)))
            })
            .collect();
        Self { device_type: snapshot.device_type, serial_number, data }
    }
}
