//! 热成像资源 - 每个类别的强类型结果，在合并边界统一展开为映射

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

/// Flattened per-call output: output key -> value.
pub type Payload = IndexMap<String, Value>;

pub const IS_SUPPORTED: &str = "is_supported";

/// Resources the camera SDK exposes but this service does not read yet.
pub const UNSUPPORTED_RESOURCES: [&str; 9] = [
    "Measurements",
    "Alarms",
    "Isotherms",
    "Sensors",
    "Histogram",
    "TriggerData",
    "Fusion",
    "Pipeline",
    "Scale",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GpsInfo {
    pub is_valid: Option<bool>,
    pub altitude: Option<f64>,
    pub altitude_ref: Option<i32>,
    pub dop: Option<f64>,
    pub latitude: Option<f64>,
    pub latitude_ref: Option<String>,
    pub longitude: Option<f64>,
    pub longitude_ref: Option<String>,
    pub map_datum: Option<String>,
    pub satellites: Option<String>,
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CameraInfo {
    pub model: Option<String>,
    pub serial_number: Option<String>,
    pub lens: Option<String>,
    pub filter: Option<String>,
    pub fov: Option<f64>,
    pub range: Option<TemperatureRange>,
    pub fps: Option<f64>,
    pub average_payload: Option<f64>,
    pub frame_count: Option<u64>,
    pub frame_rate_index: Option<i32>,
    pub lost_images: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ThermalParameters {
    pub atmospheric_temperature: Option<f64>,
    pub distance: Option<f64>,
    pub emissivity: Option<f64>,
    pub external_optics_temperature: Option<f64>,
    pub external_optics_transmission: Option<f64>,
    pub reference_temperature: Option<f64>,
    pub reflected_temperature: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub transmission: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GasResult {
    pub flow: Option<f64>,
    pub concentration: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GasInput {
    pub is_valid: Option<bool>,
    pub ambient_temperature: Option<f64>,
    pub gas: Option<String>,
    pub leak_type: Option<String>,
    pub wind_speed: Option<f64>,
    pub distance: Option<f64>,
    pub threshold_delta_temperature: Option<f64>,
    pub emissive: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GasQuantification {
    pub result: GasResult,
    pub input: GasInput,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CompassInfo {
    pub degrees: Option<f64>,
    pub roll: Option<f64>,
    pub pitch: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ZoomInfo {
    pub factor: Option<f64>,
    pub pan_x: Option<f64>,
    pub pan_y: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SpotPoint {
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatisticsInfo {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub average: Option<f64>,
    pub standard_deviation: Option<f64>,
    pub cold_spot: Option<SpotPoint>,
    pub hot_spot: Option<SpotPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageMetadata {
    pub file_name: Option<String>,
    pub height: Option<u32>,
    pub width: Option<u32>,
    pub frame_count: Option<u64>,
    pub temperature_unit: Option<String>,
    pub distance_unit: Option<String>,
    pub color_distribution: Option<String>,
    pub description: Option<String>,
    pub date_time: Option<String>,
    pub date_taken: Option<String>,
    pub contains_ultra_max_data: Option<bool>,
    pub max_signal_value: Option<i64>,
    pub min_signal_value: Option<i64>,
    pub overflow_signal_value: Option<i64>,
    pub underflow_signal_value: Option<i64>,
    pub precision: Option<u32>,
    #[serde(rename = "isLiveStream")]
    pub is_live_stream: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CurrentPalette {
    pub name: Option<String>,
    pub is_inverted: Option<bool>,
    pub underflow_color: Option<String>,
    pub overflow_color: Option<String>,
    pub below_span_color: Option<String>,
    pub above_span_color: Option<String>,
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PaletteInfo {
    pub available_palettes: Vec<String>,
    pub current_palette: Option<CurrentPalette>,
}

/// One typed resource read off a thermal frame.
#[derive(Debug, Clone, PartialEq)]
pub enum ThermalResource {
    Gps(GpsInfo),
    Camera(CameraInfo),
    ThermalParameters(ThermalParameters),
    Gas(GasQuantification),
    Compass(CompassInfo),
    Zoom(ZoomInfo),
    Statistics(StatisticsInfo),
    Metadata(ImageMetadata),
    Palette(PaletteInfo),
}

impl ThermalResource {
    pub fn output_key(&self) -> &'static str {
        match self {
            ThermalResource::Gps(_) => "GpsInformation",
            ThermalResource::Camera(_) => "CameraInformation",
            ThermalResource::ThermalParameters(_) => "ThermalParameters",
            ThermalResource::Gas(_) => "GasQuantification",
            ThermalResource::Compass(_) => "CompassInformation",
            ThermalResource::Zoom(_) => "ZoomInformation",
            ThermalResource::Statistics(_) => "Statistics",
            ThermalResource::Metadata(_) => "ImageMetaData",
            ThermalResource::Palette(_) => "Palette",
        }
    }

    fn to_value(&self) -> Value {
        let serialized = match self {
            ThermalResource::Gps(r) => serde_json::to_value(r),
            ThermalResource::Camera(r) => serde_json::to_value(r),
            ThermalResource::ThermalParameters(r) => serde_json::to_value(r),
            ThermalResource::Gas(r) => serde_json::to_value(r),
            ThermalResource::Compass(r) => serde_json::to_value(r),
            ThermalResource::Zoom(r) => serde_json::to_value(r),
            ThermalResource::Statistics(r) => serde_json::to_value(r),
            ThermalResource::Metadata(r) => serde_json::to_value(r),
            ThermalResource::Palette(r) => serde_json::to_value(r),
        };
        match serialized {
            Ok(Value::Object(fields)) => with_support_status(fields),
            Ok(_) | Err(_) => {
                log::error!("Error serializing {}", self.output_key());
                unsupported()
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResourceSlot {
    Present(ThermalResource),
    /// Known resource the source cannot provide.
    Unsupported(String),
    /// Pre-built value from a custom extractor.
    Raw(String, Value),
}

impl ResourceSlot {
    pub fn key(&self) -> &str {
        match self {
            ResourceSlot::Present(r) => r.output_key(),
            ResourceSlot::Unsupported(key) | ResourceSlot::Raw(key, _) => key,
        }
    }
}

/// Result of one category extraction before flattening.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategoryData {
    slots: Vec<ResourceSlot>,
}

impl CategoryData {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(resource: ThermalResource) -> Self {
        Self {
            slots: vec![ResourceSlot::Present(resource)],
        }
    }

    pub fn with(mut self, slot: ResourceSlot) -> Self {
        self.slots.push(slot);
        self
    }

    pub fn push(&mut self, slot: ResourceSlot) {
        self.slots.push(slot);
    }

    pub fn push_raw(&mut self, key: impl Into<String>, value: Value) {
        self.slots.push(ResourceSlot::Raw(key.into(), value));
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[ResourceSlot] {
        &self.slots
    }

    pub fn into_payload(self) -> Payload {
        let mut payload = Payload::with_capacity(self.slots.len());
        for slot in self.slots {
            match slot {
                ResourceSlot::Present(resource) => {
                    let value = resource.to_value();
                    payload.insert(resource.output_key().to_string(), value);
                }
                ResourceSlot::Unsupported(key) => {
                    payload.insert(key, unsupported());
                }
                ResourceSlot::Raw(key, value) => {
                    payload.insert(key, value);
                }
            }
        }
        payload
    }
}

fn unsupported() -> Value {
    let mut fields = Map::new();
    fields.insert(IS_SUPPORTED.to_string(), Value::Bool(false));
    Value::Object(fields)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

fn with_support_status(mut fields: Map<String, Value>) -> Value {
    if fields.values().all(is_blank) {
        return unsupported();
    }
    fields.insert(IS_SUPPORTED.to_string(), Value::Bool(true));
    Value::Object(fields)
}
