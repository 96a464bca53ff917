//! 热成像帧 - 一次采集中可读取的全部资源

use crate::core::extraction::resource::{
    CameraInfo, CompassInfo, GasQuantification, GpsInfo, ImageMetadata, PaletteInfo,
    StatisticsInfo, ThermalParameters, ZoomInfo,
};
use crate::core::extraction::RateSignal;

/// Snapshot of one thermal frame. `None` means the camera does not provide that resource.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThermalFrame {
    pub fps: Option<f64>,
    pub is_live_stream: bool,
    pub gps: Option<GpsInfo>,
    pub camera: Option<CameraInfo>,
    pub thermal_parameters: Option<ThermalParameters>,
    pub gas: Option<GasQuantification>,
    pub compass: Option<CompassInfo>,
    pub zoom: Option<ZoomInfo>,
    pub statistics: Option<StatisticsInfo>,
    pub metadata: Option<ImageMetadata>,
    pub palette: Option<PaletteInfo>,
}

impl ThermalFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live(fps: f64) -> Self {
        Self {
            fps: Some(fps),
            is_live_stream: true,
            ..Default::default()
        }
    }

    /// Frame rate actually usable for deadline math.
    pub fn effective_fps(&self) -> Option<f64> {
        self.fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .or_else(|| {
                self.camera
                    .as_ref()
                    .and_then(|c| c.fps)
                    .filter(|fps| fps.is_finite() && *fps > 0.0)
            })
    }
}

impl RateSignal for ThermalFrame {
    fn rate_hz(&self) -> Option<f64> {
        self.effective_fps()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_prefers_stream_fps() {
        let mut frame = ThermalFrame::live(30.0);
        frame.camera = Some(CameraInfo {
            fps: Some(9.0),
            ..Default::default()
        });
        assert_eq!(frame.rate_hz(), Some(30.0));

        frame.fps = Some(0.0);
        assert_eq!(frame.rate_hz(), Some(9.0));

        frame.camera = None;
        assert_eq!(frame.rate_hz(), None);
    }
}
