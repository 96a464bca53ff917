use crate::core::extraction::category::COMPLETE;
use crate::core::extraction::resource::UNSUPPORTED_RESOURCES;
use crate::core::extraction::{
    CancellationToken, CategoryData, ExtractionError, ExtractorRegistry, ResourceSlot,
    ThermalResource,
};
use crate::core::thermal::frame::ThermalFrame;

type ReadFn = fn(&ThermalFrame) -> ResourceSlot;

const READERS: [(&str, ReadFn); 9] = [
    ("metadata", read_metadata),
    ("camera", read_camera),
    ("compass", read_compass),
    ("gas", read_gas),
    ("gps", read_gps),
    ("thermal_params", read_thermal_params),
    ("statistics", read_statistics),
    ("zoom", read_zoom),
    ("palette", read_palette),
];

fn slot(resource: Option<ThermalResource>, key: &str) -> ResourceSlot {
    match resource {
        Some(resource) => ResourceSlot::Present(resource),
        None => ResourceSlot::Unsupported(key.to_string()),
    }
}

fn read_metadata(frame: &ThermalFrame) -> ResourceSlot {
    let metadata = frame.metadata.clone().map(|mut m| {
        m.is_live_stream = frame.is_live_stream;
        ThermalResource::Metadata(m)
    });
    slot(metadata, "ImageMetaData")
}

fn read_camera(frame: &ThermalFrame) -> ResourceSlot {
    slot(frame.camera.clone().map(ThermalResource::Camera), "CameraInformation")
}

fn read_compass(frame: &ThermalFrame) -> ResourceSlot {
    slot(frame.compass.clone().map(ThermalResource::Compass), "CompassInformation")
}

fn read_gas(frame: &ThermalFrame) -> ResourceSlot {
    slot(frame.gas.clone().map(ThermalResource::Gas), "GasQuantification")
}

fn read_gps(frame: &ThermalFrame) -> ResourceSlot {
    slot(frame.gps.clone().map(ThermalResource::Gps), "GpsInformation")
}

fn read_thermal_params(frame: &ThermalFrame) -> ResourceSlot {
    slot(
        frame
            .thermal_parameters
            .clone()
            .map(ThermalResource::ThermalParameters),
        "ThermalParameters",
    )
}

fn read_statistics(frame: &ThermalFrame) -> ResourceSlot {
    slot(frame.statistics.clone().map(ThermalResource::Statistics), "Statistics")
}

fn read_zoom(frame: &ThermalFrame) -> ResourceSlot {
    slot(frame.zoom.clone().map(ThermalResource::Zoom), "ZoomInformation")
}

fn read_palette(frame: &ThermalFrame) -> ResourceSlot {
    slot(frame.palette.clone().map(ThermalResource::Palette), "Palette")
}

fn read_complete(
    frame: &ThermalFrame,
    cancel: &CancellationToken,
) -> Result<CategoryData, ExtractionError> {
    let mut data = CategoryData::new();
    for (_, read) in READERS {
        if cancel.is_cancelled() {
            return Err(ExtractionError::Cancelled);
        }
        data.push(read(frame));
    }
    for key in UNSUPPORTED_RESOURCES {
        data.push(ResourceSlot::Unsupported(key.to_string()));
    }
    Ok(data)
}

/// 默认注册表 - 覆盖目录中的全部类别
pub fn default_registry() -> ExtractorRegistry<ThermalFrame> {
    let mut registry = ExtractorRegistry::new();
    for (name, read) in READERS {
        registry.register(name, move |frame: &ThermalFrame, _: &CancellationToken| {
            Ok(CategoryData::new().with(read(frame)))
        });
    }
    registry.register(COMPLETE, read_complete);
    registry
}
