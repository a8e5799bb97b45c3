//! Built-in camera actions

use std::sync::Arc;

use super::MapAction;
use crate::map::{CameraOptions, FitBoundsOptions, MapHandle};
use crate::story::StoryStep;

/// Zoom used by camera moves when the step has no `zoom` property
pub const DEFAULT_FLY_ZOOM: f64 = 14.0;

/// Animation length used when the step has no `duration` property
pub const DEFAULT_DURATION_MS: u64 = 2000;

/// Padding used by `fitBounds` when the step has no `padding` property
pub const DEFAULT_PADDING: f64 = 40.0;

fn duration_ms(step: &StoryStep) -> Option<u64> {
    step.properties
        .number("duration")
        .filter(|d| d.is_finite() && *d >= 0.0)
        .map(|d| d as u64)
}

/// Camera target for a step: its anchor plus optional `zoom`, `bearing`
/// and `pitch` properties
fn camera_options(step: &StoryStep, default_duration: Option<u64>) -> Option<CameraOptions> {
    let center = step.geometry.anchor()?;
    Some(CameraOptions {
        center: Some(center),
        zoom: Some(step.properties.number("zoom").unwrap_or(DEFAULT_FLY_ZOOM)),
        bearing: step.properties.number("bearing"),
        pitch: step.properties.number("pitch"),
        duration_ms: duration_ms(step).or(default_duration),
    })
}

/// Animated move to the step anchor
pub struct FlyTo;

impl MapAction for FlyTo {
    fn execute(&self, map: &Arc<dyn MapHandle>, step: &StoryStep) {
        match camera_options(step, Some(DEFAULT_DURATION_MS)) {
            Some(options) => map.fly_to(options),
            None => tracing::warn!("flyTo: {} geometry has no anchor", step.geometry.kind()),
        }
    }
}

/// Instant move to the step anchor
pub struct JumpTo;

impl MapAction for JumpTo {
    fn execute(&self, map: &Arc<dyn MapHandle>, step: &StoryStep) {
        match camera_options(step, None) {
            Some(options) => map.jump_to(options),
            None => tracing::warn!("jumpTo: {} geometry has no anchor", step.geometry.kind()),
        }
    }
}

/// Frame the bounding box of the step geometry
pub struct FitBounds;

impl MapAction for FitBounds {
    fn execute(&self, map: &Arc<dyn MapHandle>, step: &StoryStep) {
        let Some(bounds) = step.geometry.bounds() else {
            tracing::warn!("fitBounds: {} geometry has no bounds", step.geometry.kind());
            return;
        };

        map.fit_bounds(
            bounds,
            FitBoundsOptions {
                padding: step.properties.number("padding").unwrap_or(DEFAULT_PADDING),
                max_zoom: step.properties.number("maxZoom"),
                duration_ms: duration_ms(step),
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::story::Position;
    use crate::test_map::{MapCall, RecordingMap};

    #[test]
    fn test_fly_to_reads_step_properties() {
        let (recorder, map) = RecordingMap::shared();
        let step = StoryStep::point(-122.4194, 37.7749)
            .with_property("zoom", 15)
            .with_property("pitch", 45);

        FlyTo.execute(&map, &step);

        let calls = recorder.calls();
        let [MapCall::FlyTo(options)] = calls.as_slice() else {
            panic!("expected a single flyTo, got {:?}", calls);
        };
        assert_eq!(options.center, Some(Position::new(-122.4194, 37.7749)));
        assert_eq!(options.zoom, Some(15.0));
        assert_eq!(options.pitch, Some(45.0));
        assert_eq!(options.duration_ms, Some(DEFAULT_DURATION_MS));
    }

    #[test]
    fn test_fly_to_uses_default_zoom() {
        let (recorder, map) = RecordingMap::shared();
        FlyTo.execute(&map, &StoryStep::point(0.0, 0.0));

        let calls = recorder.calls();
        let [MapCall::FlyTo(options)] = calls.as_slice() else {
            panic!("expected a single flyTo");
        };
        assert_eq!(options.zoom, Some(DEFAULT_FLY_ZOOM));
    }

    #[test]
    fn test_fit_bounds_frames_polygon() {
        let (recorder, map) = RecordingMap::shared();
        let step = StoryStep::polygon(vec![
            Position::new(-122.4353, 37.7749),
            Position::new(-122.4053, 37.7749),
            Position::new(-122.4053, 37.7949),
            Position::new(-122.4353, 37.7749),
        ])
        .with_property("padding", 10);

        FitBounds.execute(&map, &step);

        let calls = recorder.calls();
        let [MapCall::FitBounds(bounds, options)] = calls.as_slice() else {
            panic!("expected a single fitBounds");
        };
        assert_eq!(bounds.south_west, Position::new(-122.4353, 37.7749));
        assert_eq!(bounds.north_east, Position::new(-122.4053, 37.7949));
        assert_eq!(options.padding, 10.0);
    }
}
