//! Recording map double for unit tests

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;

use crate::map::{
    Camera, CameraOptions, FitBoundsOptions, LayerSpec, LngLatBounds, MapError, MapHandle, Popup,
    StyleLoadCallback, StyleSpec,
};
use crate::story::Position;

#[derive(Debug, Clone, PartialEq)]
pub enum MapCall {
    FlyTo(CameraOptions),
    JumpTo(CameraOptions),
    FitBounds(LngLatBounds, FitBoundsOptions),
    SetStyle(StyleSpec),
    AddPopup(Popup),
    Remove,
}

#[derive(Default)]
pub struct RecordingMap {
    calls: Mutex<Vec<MapCall>>,
}

impl RecordingMap {
    /// The recorder and the same map as a handle
    pub fn shared() -> (Arc<RecordingMap>, Arc<dyn MapHandle>) {
        let recorder = Arc::new(RecordingMap::default());
        let handle: Arc<dyn MapHandle> = recorder.clone();
        (recorder, handle)
    }

    pub fn calls(&self) -> Vec<MapCall> {
        self.calls.lock().clone()
    }

    fn record(&self, call: MapCall) {
        self.calls.lock().push(call);
    }
}

impl MapHandle for RecordingMap {
    fn library_name(&self) -> &str {
        "recording"
    }

    fn camera(&self) -> Camera {
        Camera {
            center: Position::new(0.0, 0.0),
            zoom: 0.0,
            bearing: 0.0,
            pitch: 0.0,
        }
    }

    fn fly_to(&self, options: CameraOptions) {
        self.record(MapCall::FlyTo(options));
    }

    fn jump_to(&self, options: CameraOptions) {
        self.record(MapCall::JumpTo(options));
    }

    fn fit_bounds(&self, bounds: LngLatBounds, options: FitBoundsOptions) {
        self.record(MapCall::FitBounds(bounds, options));
    }

    fn set_style(&self, style: StyleSpec) {
        self.record(MapCall::SetStyle(style));
    }

    fn style(&self) -> Option<StyleSpec> {
        None
    }

    fn is_style_loaded(&self) -> bool {
        true
    }

    fn once_style_load(&self, callback: StyleLoadCallback) {
        callback();
    }

    fn add_source(&self, _id: &str, _source: Value) -> Result<(), MapError> {
        Ok(())
    }

    fn remove_source(&self, _id: &str) -> Result<(), MapError> {
        Ok(())
    }

    fn has_source(&self, _id: &str) -> bool {
        false
    }

    fn add_layer(&self, _layer: LayerSpec) -> Result<(), MapError> {
        Ok(())
    }

    fn remove_layer(&self, _id: &str) -> Result<(), MapError> {
        Ok(())
    }

    fn has_layer(&self, _id: &str) -> bool {
        false
    }

    fn add_popup(&self, popup: Popup) {
        self.record(MapCall::AddPopup(popup));
    }

    fn remove(&self) {
        self.record(MapCall::Remove);
    }

    fn is_removed(&self) -> bool {
        self.calls.lock().contains(&MapCall::Remove)
    }
}
