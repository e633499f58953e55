//! Command routing.
//!
//! A command is a name plus a JSON payload. [`CommandDispatcher::dispatch`]
//! parses the payload into a typed struct, runs exactly one engine
//! operation and flushes pending changes to the surface.
//!
//! Only an unknown name is reported back ([`CommandResult::NotImplemented`]).
//! A payload that fails to parse is logged and treated as a no-op.

mod command;
mod payload;

pub use command::{CommandName, CommandResult, UnknownCommand};
pub use payload::{
    AnchorPayload, BouncePayload, BytesPayload, CameraPayload, EnabledPayload, HeatmapPayload,
    IconBytesPayload, IconPayload, IdPayload, MarkerFields, MarkerPatchPayload, MarkerPayload,
    PayloadError, PolylinePayload, PolylinePointsPayload, PulsePayload, TileOverlayPayload,
    WeightedPointPayload,
};

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use crate::engine::OverlayEngine;
use crate::surface::MapSurface;

/// Routes decoded commands to an [`OverlayEngine`].
pub struct CommandDispatcher<S: MapSurface> {
    engine: OverlayEngine<S>,
}

impl<S: MapSurface> CommandDispatcher<S> {
    pub fn new(engine: OverlayEngine<S>) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &OverlayEngine<S> {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut OverlayEngine<S> {
        &mut self.engine
    }

    pub fn into_engine(self) -> OverlayEngine<S> {
        self.engine
    }

    /// Runs one command.
    pub fn dispatch(&mut self, name: &str, payload: Value) -> CommandResult {
        let command = match name.parse::<CommandName>() {
            Ok(command) => command,
            Err(e) => {
                debug!(command = name, "{}", e);
                return CommandResult::NotImplemented;
            }
        };

        let result = match self.run(command, payload) {
            Ok(result) => result,
            Err(e) => {
                warn!(command = %command, error = %e, "Rejected command payload");
                CommandResult::Done
            }
        };
        self.engine.flush();
        result
    }

    fn run(&mut self, command: CommandName, payload: Value) -> Result<CommandResult, PayloadError> {
        let engine = &mut self.engine;
        let default_icon_size = engine.config().icons.default_size_points;

        match command {
            CommandName::MarkerUpsert => {
                let payload: MarkerPayload = parse(payload)?;
                engine.upsert_marker(payload.into_entity(default_icon_size));
            }
            CommandName::MarkerUpdate => {
                let payload: MarkerPatchPayload = parse(payload)?;
                let id = payload.id.clone();
                let patch = payload.into_patch(default_icon_size);
                if patch.is_empty() {
                    debug!(id = %id, "Empty marker update ignored");
                } else {
                    engine.update_marker(&id, patch);
                }
            }
            CommandName::MarkerRemove => {
                let id = parse::<IdPayload>(payload)?.into_id();
                engine.remove_marker(&id);
            }
            CommandName::MarkerClear => engine.clear_markers(),
            CommandName::MarkerSetIconBytes => {
                let payload: IconBytesPayload = parse(payload)?;
                let anchor = payload.anchor();
                let id = payload.id;
                engine.set_marker_icon_bytes(&id, payload.bytes.into_bytes()?, anchor);
            }
            CommandName::MarkerStartBounce => {
                let payload: BouncePayload = parse(payload)?;
                let params = payload.params(&engine.config().animation.bounce);
                engine.start_bounce(&payload.id, params);
            }
            CommandName::MarkerStopBounce => {
                let id = parse::<IdPayload>(payload)?.into_id();
                engine.stop_bounce(&id);
            }
            CommandName::MarkerStartPulse => {
                let payload: PulsePayload = parse(payload)?;
                let params = payload.params(&engine.config().animation.pulse);
                engine.start_pulse(&payload.id, params);
            }
            CommandName::MarkerStopPulse => {
                let id = parse::<IdPayload>(payload)?.into_id();
                engine.stop_pulse(&id);
            }
            CommandName::PolylineAdd => {
                let payload: PolylinePayload = parse(payload)?;
                engine.add_polyline(payload.into_entity());
            }
            CommandName::PolylineUpdatePoints => {
                let payload: PolylinePointsPayload = parse(payload)?;
                engine.update_polyline_points(&payload.id, payload.points);
            }
            CommandName::PolylineRemove => {
                let id = parse::<IdPayload>(payload)?.into_id();
                engine.remove_polyline(&id);
            }
            CommandName::PolylineClear => engine.clear_polylines(),
            CommandName::TileAdd => {
                let payload: TileOverlayPayload = parse(payload)?;
                engine.add_tile_overlay(payload.into_entity());
            }
            CommandName::TileRemove => {
                let id = parse::<IdPayload>(payload)?.into_id();
                engine.remove_tile_overlay(&id);
            }
            CommandName::TileClear => engine.clear_tile_overlays(),
            CommandName::HeatmapSet => {
                let payload: HeatmapPayload = parse(payload)?;
                engine.set_heatmap(payload.into_state());
            }
            CommandName::HeatmapClear => engine.clear_heatmap(),
            CommandName::MapSetClusteringEnabled => {
                let payload: EnabledPayload = parse(payload)?;
                engine.set_clustering_enabled(payload.enabled());
            }
            CommandName::MapTakeSnapshot => {
                return Ok(CommandResult::Snapshot(engine.take_snapshot()));
            }
            CommandName::MapMoveCamera | CommandName::MapAnimateCamera => {
                let payload: CameraPayload = if payload.is_null() {
                    CameraPayload::default()
                } else {
                    parse(payload)?
                };
                engine.move_camera(payload.target, payload.zoom);
            }
            CommandName::MapDispose => engine.dispose(),
        }
        Ok(CommandResult::Done)
    }
}

fn parse<T: DeserializeOwned>(payload: Value) -> Result<T, PayloadError> {
    Ok(serde_json::from_value(payload)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::EngineConfig;
    use crate::icon::{test_png, IconCache, IconCacheConfig, ReqwestFetcher};
    use crate::surface::RecordingSurface;
    use base64::Engine as _;
    use serde_json::json;
    use std::sync::Arc;
    use std::time::Duration;

    fn dispatcher() -> CommandDispatcher<RecordingSurface> {
        dispatcher_with(RecordingSurface::new())
    }

    fn dispatcher_with(surface: RecordingSurface) -> CommandDispatcher<RecordingSurface> {
        let config = EngineConfig::default().with_icons(IconCacheConfig::memory_only());
        let fetcher = ReqwestFetcher::new(Duration::from_secs(1)).unwrap();
        let icons = IconCache::with_fetcher(config.icons.clone(), Arc::new(fetcher));
        CommandDispatcher::new(OverlayEngine::with_icon_cache(config, surface, icons))
    }

    fn upsert(d: &mut CommandDispatcher<RecordingSurface>, id: &str, lat: f64, lng: f64) {
        let result = d.dispatch(
            "marker.upsert",
            json!({"id": id, "position": {"lat": lat, "lng": lng}}),
        );
        assert_eq!(result, CommandResult::Done);
    }

    #[test]
    fn test_unknown_command_not_implemented() {
        let mut d = dispatcher();
        assert_eq!(
            d.dispatch("map#setTrafficEnabled", json!(true)),
            CommandResult::NotImplemented
        );
    }

    #[test]
    fn test_malformed_payload_is_noop() {
        let mut d = dispatcher();
        assert_eq!(
            d.dispatch("marker.upsert", json!({"id": "m1"})),
            CommandResult::Done
        );
        assert_eq!(d.engine().marker_count(), 0);
    }

    #[test]
    fn test_upsert_update_remove() {
        let mut d = dispatcher();
        upsert(&mut d, "m1", 10.0, 20.0);
        assert_eq!(d.engine().surface().marker_count(), 1);

        d.dispatch(
            "marker.update",
            json!({"id": "m1", "position": {"lat": 11.0, "lng": 21.0}, "title": "Moved"}),
        );
        let marker = d.engine().surface().marker("m1").unwrap();
        assert_eq!(marker.entity.position, crate::geo::LatLng::new(11.0, 21.0));
        assert_eq!(marker.entity.title.as_deref(), Some("Moved"));

        d.dispatch("markers#remove", json!("m1"));
        assert_eq!(d.engine().surface().marker_count(), 0);
    }

    #[test]
    fn test_invalid_icon_still_upserts_marker() {
        let mut d = dispatcher();
        let result = d.dispatch(
            "marker.upsert",
            json!({
                "id": "m1",
                "position": {"lat": 10.0, "lng": 20.0},
                "iconUrl": "data:image/png;base64,@@@"
            }),
        );
        assert_eq!(result, CommandResult::Done);
        assert_eq!(d.engine().marker_count(), 1);

        let marker = d.engine().surface().marker("m1").unwrap();
        assert!(marker.icon.is_none());
        assert!(marker.entity.icon.is_none());
    }

    #[test]
    fn test_invalid_icon_still_applies_update() {
        let mut d = dispatcher();
        upsert(&mut d, "m1", 10.0, 20.0);
        d.dispatch(
            "marker.update",
            json!({
                "id": "m1",
                "position": {"lat": 11.0, "lng": 21.0},
                "title": "Moved",
                "icon": {"source": "data:;base64,!!"}
            }),
        );

        let marker = d.engine().surface().marker("m1").unwrap();
        assert_eq!(marker.entity.position, crate::geo::LatLng::new(11.0, 21.0));
        assert_eq!(marker.entity.title.as_deref(), Some("Moved"));
        assert!(marker.icon.is_none());
    }

    #[test]
    fn test_empty_update_touches_nothing() {
        let mut d = dispatcher();
        upsert(&mut d, "m1", 10.0, 20.0);
        d.engine_mut().surface_mut().clear_ops();

        assert_eq!(d.dispatch("marker.update", json!({"id": "m1"})), CommandResult::Done);
        assert!(d.engine().surface().ops().is_empty());
    }

    #[test]
    fn test_set_icon_bytes_base64() {
        let mut d = dispatcher();
        upsert(&mut d, "m1", 10.0, 20.0);
        let encoded = base64::engine::general_purpose::STANDARD.encode(test_png(96, 96));
        d.dispatch(
            "marker.setIconBytes",
            json!({"id": "m1", "bytes": encoded, "anchor": {"u": 0.5, "v": 0.5}}),
        );
        let marker = d.engine().surface().marker("m1").unwrap();
        assert_eq!(marker.icon.as_ref().unwrap().longest_side(), 48);
        assert_eq!(marker.entity.anchor.v(), 0.5);
    }

    #[test]
    fn test_tile_and_polyline_commands() {
        let mut d = dispatcher();
        d.dispatch(
            "tile.add",
            json!({"id": "t1", "urlTemplate": "https://x/{z}/{x}/{y}.png"}),
        );
        assert_eq!(
            d.engine().tile_url("t1", 1, 2, 3).as_deref(),
            Some("https://x/3/1/2.png")
        );

        d.dispatch(
            "polylines#add",
            json!({"id": "p1", "points": [{"lat": 0.0, "lng": 0.0}, {"lat": 1.0, "lng": 1.0}], "width": 6.0}),
        );
        d.dispatch(
            "polyline.updatePoints",
            json!({"id": "p1", "points": [{"lat": 2.0, "lng": 2.0}]}),
        );
        let polyline = d.engine().surface().polyline("p1").unwrap();
        assert_eq!(polyline.points.len(), 1);
        assert_eq!(polyline.width, 6.0);

        d.dispatch("polyline.clear", Value::Null);
        d.dispatch("tiles#clear", Value::Null);
        assert_eq!(d.engine().surface().polyline_count(), 0);
        assert_eq!(d.engine().surface().tile_overlay_count(), 0);
    }

    #[test]
    fn test_clustering_commands() {
        let mut d = dispatcher();
        upsert(&mut d, "a", 10.0, 20.0);
        upsert(&mut d, "b", 10.0001, 20.0001);
        upsert(&mut d, "c", 10.0002, 20.0002);
        d.dispatch("map.setClusteringEnabled", json!({"enabled": true}));
        assert_eq!(d.engine().surface().cluster_count(), 1);
        assert_eq!(d.engine().surface().marker_count(), 0);

        d.dispatch("marker.remove", json!({"id": "a"}));
        d.dispatch("marker.remove", json!({"id": "b"}));
        assert_eq!(d.engine().surface().cluster_count(), 0);
        assert_eq!(d.engine().surface().marker_count(), 1);

        d.dispatch("map#setClusteringEnabled", json!(false));
        assert_eq!(d.engine().registry().marker_count(), 1);
    }

    #[test]
    fn test_snapshot_results() {
        let mut d = dispatcher();
        match d.dispatch("map.takeSnapshot", Value::Null) {
            CommandResult::Snapshot(Some(bytes)) => assert!(!bytes.is_empty()),
            other => panic!("unexpected result {:?}", other),
        }

        let mut d = dispatcher_with(RecordingSurface::new().without_snapshots());
        assert_eq!(
            d.dispatch("map.takeSnapshot", Value::Null),
            CommandResult::Snapshot(None)
        );
    }

    #[test]
    fn test_pulse_command_uses_payload() {
        let mut d = dispatcher();
        upsert(&mut d, "m1", 10.0, 20.0);
        d.dispatch(
            "marker.startPulse",
            json!({"id": "m1", "durationMs": 100, "repeat": 2}),
        );
        assert!(d.engine().animations().is_pulsing("m1"));
        d.dispatch("marker.stopPulse", json!("m1"));
        assert!(!d.engine().animations().is_pulsing("m1"));
    }

    #[test]
    fn test_move_camera_and_dispose() {
        let mut d = dispatcher();
        upsert(&mut d, "m1", 10.0, 20.0);
        d.dispatch(
            "map#moveCamera",
            json!({"target": {"lat": 1.0, "lng": 2.0}, "zoom": 9.0}),
        );
        assert_eq!(d.engine().camera().zoom, 9.0);

        d.dispatch("map#animateCamera", json!({"zoom": 12.0}));
        assert_eq!(d.engine().camera().zoom, 12.0);
        assert_eq!(d.engine().camera().target, Some(crate::geo::LatLng::new(1.0, 2.0)));

        d.dispatch("map.dispose", Value::Null);
        assert_eq!(d.engine().marker_count(), 0);
        assert_eq!(d.engine().surface().marker_count(), 0);
    }
}
