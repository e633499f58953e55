//! Typed command payloads.
//!
//! Field names are camelCase to match what hosts send. Several commands
//! accept more than one shape for the same data; those are modelled as
//! untagged enums.

use base64::Engine as _;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

use crate::animation::{BounceParams, PulseParams, RepeatMode};
use crate::geo::{Anchor, Argb, LatLng, WeightedLatLng};
use crate::icon::{IconRef, IconSource};
use crate::registry::{
    HeatmapState, MarkerEntity, MarkerPatch, PolylineEntity, TileOverlayEntity,
};

/// Why a payload was rejected.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Malformed payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid base64 icon bytes: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// Either `"m1"` or `{"id": "m1"}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum IdPayload {
    Bare(String),
    Object { id: String },
}

impl IdPayload {
    pub fn into_id(self) -> String {
        match self {
            IdPayload::Bare(id) | IdPayload::Object { id } => id,
        }
    }
}

/// Either `true` or `{"enabled": true}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum EnabledPayload {
    Bare(bool),
    Object { enabled: bool },
}

impl EnabledPayload {
    pub fn enabled(&self) -> bool {
        match self {
            EnabledPayload::Bare(enabled) | EnabledPayload::Object { enabled } => *enabled,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnchorPayload {
    pub u: f32,
    pub v: f32,
}

#[derive(Debug, Deserialize)]
pub struct IconPayload {
    pub source: String,
    pub size: Option<u32>,
}

/// Shared optional marker fields of upsert and update.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerFields {
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub rotation: Option<f32>,
    pub draggable: Option<bool>,
    pub z_index: Option<f64>,
    pub anchor: Option<AnchorPayload>,
    pub anchor_u: Option<f32>,
    pub anchor_v: Option<f32>,
    pub icon: Option<IconPayload>,
    pub icon_url: Option<String>,
}

impl MarkerFields {
    fn anchor(&self) -> Option<Anchor> {
        anchor_from(self.anchor.as_ref(), self.anchor_u, self.anchor_v)
    }

    /// The requested icon. An empty `iconUrl` means no icon.
    ///
    /// An unparseable descriptor is logged and treated as no icon so the
    /// rest of the marker still applies.
    fn icon(&self, default_size: u32) -> Option<IconRef> {
        let (descriptor, size) = match (&self.icon, self.icon_url.as_deref().map(str::trim)) {
            (Some(icon), _) => (icon.source.as_str(), icon.size.unwrap_or(default_size)),
            (None, Some(url)) if !url.is_empty() => (url, default_size),
            _ => return None,
        };
        match IconSource::parse(descriptor) {
            Ok(source) => Some(IconRef::new(source, size)),
            Err(e) => {
                warn!(error = %e, "Ignoring invalid marker icon");
                None
            }
        }
    }
}

/// `marker.upsert`.
#[derive(Debug, Deserialize)]
pub struct MarkerPayload {
    pub id: String,
    pub position: LatLng,
    #[serde(flatten)]
    pub fields: MarkerFields,
}

impl MarkerPayload {
    pub fn into_entity(self, default_icon_size: u32) -> MarkerEntity {
        let mut entity = MarkerEntity::new(self.id, self.position);
        let patch = MarkerPatchPayload {
            id: String::new(),
            position: None,
            fields: self.fields,
        }
        .into_patch(default_icon_size);
        entity.apply(&patch);
        entity
    }
}

/// `marker.update`: every field optional except the id.
#[derive(Debug, Deserialize)]
pub struct MarkerPatchPayload {
    pub id: String,
    pub position: Option<LatLng>,
    #[serde(flatten)]
    pub fields: MarkerFields,
}

impl MarkerPatchPayload {
    pub fn into_patch(self, default_icon_size: u32) -> MarkerPatch {
        let icon = self.fields.icon(default_icon_size);
        let anchor = self.fields.anchor();
        let fields = self.fields;
        MarkerPatch {
            position: self.position,
            title: fields.title,
            snippet: fields.snippet,
            rotation: fields.rotation,
            draggable: fields.draggable,
            z_index: fields.z_index.map(|z| z as i32),
            anchor,
            icon,
        }
    }
}

/// Raw bytes as a JSON array or a base64 string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BytesPayload {
    Array(Vec<u8>),
    Base64(String),
}

impl BytesPayload {
    pub fn into_bytes(self) -> Result<Vec<u8>, PayloadError> {
        match self {
            BytesPayload::Array(bytes) => Ok(bytes),
            BytesPayload::Base64(text) => Ok(base64::engine::general_purpose::STANDARD
                .decode(text.trim())?),
        }
    }
}

/// `marker.setIconBytes`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IconBytesPayload {
    pub id: String,
    pub bytes: BytesPayload,
    pub anchor: Option<AnchorPayload>,
    pub anchor_u: Option<f32>,
    pub anchor_v: Option<f32>,
}

impl IconBytesPayload {
    pub fn anchor(&self) -> Option<Anchor> {
        anchor_from(self.anchor.as_ref(), self.anchor_u, self.anchor_v)
    }
}

/// `marker.startBounce`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BouncePayload {
    pub id: String,
    pub duration_ms: Option<u64>,
    pub height_points: Option<f32>,
    pub repeat: Option<u32>,
}

impl BouncePayload {
    pub fn params(&self, defaults: &BounceParams) -> BounceParams {
        BounceParams {
            duration: self
                .duration_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.duration),
            height_points: self.height_points.unwrap_or(defaults.height_points),
            repeat: self
                .repeat
                .map(RepeatMode::from_count)
                .unwrap_or(defaults.repeat),
        }
    }
}

/// `marker.startPulse`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PulsePayload {
    pub id: String,
    pub duration_ms: Option<u64>,
    pub max_radius_meters: Option<f64>,
    pub color: Option<i64>,
    pub repeat: Option<u32>,
}

impl PulsePayload {
    pub fn params(&self, defaults: &PulseParams) -> PulseParams {
        PulseParams {
            duration: self
                .duration_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.duration),
            max_radius_meters: self.max_radius_meters.unwrap_or(defaults.max_radius_meters),
            color: self.color.map(argb).unwrap_or(defaults.color),
            repeat: self
                .repeat
                .map(RepeatMode::from_count)
                .unwrap_or(defaults.repeat),
        }
    }
}

/// `polyline.add`.
#[derive(Debug, Deserialize)]
pub struct PolylinePayload {
    pub id: String,
    pub points: Vec<LatLng>,
    pub color: Option<i64>,
    pub width: Option<f32>,
    pub geodesic: Option<bool>,
    pub dotted: Option<bool>,
}

impl PolylinePayload {
    pub fn into_entity(self) -> PolylineEntity {
        let mut polyline = PolylineEntity::new(self.id, self.points);
        if let Some(color) = self.color {
            polyline.color = argb(color);
        }
        if let Some(width) = self.width.filter(|w| w.is_finite() && *w >= 0.0) {
            polyline.width = width;
        }
        polyline.geodesic = self.geodesic.unwrap_or(false);
        polyline.dotted = self.dotted.unwrap_or(false);
        polyline
    }
}

/// `polyline.updatePoints`.
#[derive(Debug, Deserialize)]
pub struct PolylinePointsPayload {
    pub id: String,
    pub points: Vec<LatLng>,
}

/// `tile.add`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileOverlayPayload {
    pub id: String,
    #[serde(alias = "template")]
    pub url_template: String,
    pub tile_size: Option<u32>,
    pub opacity: Option<f32>,
    pub z_index: Option<f64>,
}

impl TileOverlayPayload {
    pub fn into_entity(self) -> TileOverlayEntity {
        let mut overlay = TileOverlayEntity::new(self.id, self.url_template);
        if let Some(size) = self.tile_size.filter(|s| *s > 0) {
            overlay.tile_size = size;
        }
        if let Some(opacity) = self.opacity {
            overlay = overlay.with_opacity(opacity);
        }
        overlay.z_index = self.z_index.map(|z| z as i32).unwrap_or(0);
        overlay
    }
}

#[derive(Debug, Deserialize)]
pub struct WeightedPointPayload {
    pub lat: f64,
    pub lng: f64,
    pub intensity: Option<f64>,
}

/// `heatmap.set`.
#[derive(Debug, Deserialize)]
pub struct HeatmapPayload {
    pub points: Vec<WeightedPointPayload>,
    pub radius: Option<u32>,
    pub opacity: Option<f64>,
}

impl HeatmapPayload {
    pub fn into_state(self) -> HeatmapState {
        let points = self
            .points
            .into_iter()
            .map(|p| WeightedLatLng {
                position: LatLng::new(p.lat, p.lng),
                intensity: p.intensity.unwrap_or(1.0),
            })
            .collect();
        let mut heatmap = HeatmapState::new(points);
        if let Some(radius) = self.radius {
            heatmap = heatmap.with_radius(radius);
        }
        if let Some(opacity) = self.opacity {
            heatmap = heatmap.with_opacity(opacity);
        }
        heatmap
    }
}

/// `map.moveCamera` and `map.animateCamera`.
#[derive(Debug, Default, Deserialize)]
pub struct CameraPayload {
    pub target: Option<LatLng>,
    pub zoom: Option<f64>,
}

fn anchor_from(anchor: Option<&AnchorPayload>, u: Option<f32>, v: Option<f32>) -> Option<Anchor> {
    if let Some(anchor) = anchor {
        return Some(Anchor::new(anchor.u, anchor.v));
    }
    match (u, v) {
        (None, None) => None,
        (u, v) => Some(Anchor::new(
            u.unwrap_or(Anchor::DEFAULT.u()),
            v.unwrap_or(Anchor::DEFAULT.v()),
        )),
    }
}

/// Hosts send colors as signed 32-bit integers; keep the low 32 bits.
fn argb(value: i64) -> Argb {
    Argb(value as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_marker_payload_full() {
        let payload: MarkerPayload = serde_json::from_value(json!({
            "id": "m1",
            "position": {"lat": 10.0, "lng": 20.0},
            "title": "Home",
            "rotation": -90.0,
            "zIndex": 3.0,
            "anchorU": 0.25,
            "iconUrl": "https://example.com/pin.png"
        }))
        .unwrap();
        let entity = payload.into_entity(48);
        assert_eq!(entity.title.as_deref(), Some("Home"));
        assert_eq!(entity.rotation, 270.0);
        assert_eq!(entity.z_index, 3);
        assert_eq!(entity.anchor, Anchor::new(0.25, 1.0));
        let icon = entity.icon.unwrap();
        assert_eq!(icon.size_points, 48);
        assert!(icon.source.is_remote());
    }

    #[test]
    fn test_empty_icon_url_means_no_icon() {
        let payload: MarkerPayload = serde_json::from_value(json!({
            "id": "m1",
            "position": {"lat": 0.0, "lng": 0.0},
            "iconUrl": ""
        }))
        .unwrap();
        assert!(payload.into_entity(48).icon.is_none());
    }

    #[test]
    fn test_icon_object_with_size() {
        let payload: MarkerPatchPayload = serde_json::from_value(json!({
            "id": "m1",
            "icon": {"source": "asset://pins/red.png", "size": 32}
        }))
        .unwrap();
        let patch = payload.into_patch(48);
        assert!(patch.position.is_none());
        assert_eq!(patch.icon.unwrap().size_points, 32);
    }

    #[test]
    fn test_invalid_icon_keeps_other_fields() {
        let payload: MarkerPatchPayload = serde_json::from_value(json!({
            "id": "m1",
            "position": {"lat": 11.0, "lng": 21.0},
            "title": "Moved",
            "icon": {"source": "data:;base64,!!"}
        }))
        .unwrap();
        let patch = payload.into_patch(48);
        assert!(patch.icon.is_none());
        assert_eq!(patch.position, Some(LatLng::new(11.0, 21.0)));
        assert_eq!(patch.title.as_deref(), Some("Moved"));
    }

    #[test]
    fn test_missing_position_is_rejected() {
        let result: Result<MarkerPayload, _> = serde_json::from_value(json!({"id": "m1"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_id_shapes() {
        let bare: IdPayload = serde_json::from_value(json!("m1")).unwrap();
        let object: IdPayload = serde_json::from_value(json!({"id": "m1"})).unwrap();
        assert_eq!(bare.into_id(), "m1");
        assert_eq!(object.into_id(), "m1");
    }

    #[test]
    fn test_bytes_shapes() {
        let array: BytesPayload = serde_json::from_value(json!([1, 2, 3])).unwrap();
        let text: BytesPayload = serde_json::from_value(json!("AQID")).unwrap();
        assert_eq!(array.into_bytes().unwrap(), vec![1, 2, 3]);
        assert_eq!(text.into_bytes().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_bounce_defaults_and_repeat() {
        let payload: BouncePayload =
            serde_json::from_value(json!({"id": "m1", "repeat": 0})).unwrap();
        let params = payload.params(&BounceParams::default());
        assert_eq!(params.repeat, RepeatMode::Infinite);
        assert_eq!(params.duration, BounceParams::default().duration);
    }

    #[test]
    fn test_negative_color_keeps_low_bits() {
        let payload: PolylinePayload = serde_json::from_value(json!({
            "id": "p1",
            "points": [],
            "color": -16776961
        }))
        .unwrap();
        assert_eq!(payload.into_entity().color, Argb(0xFF00_00FF));
    }

    #[test]
    fn test_tile_template_alias() {
        let payload: TileOverlayPayload = serde_json::from_value(json!({
            "id": "t1",
            "template": "https://x/{z}/{x}/{y}.png",
            "opacity": 2.0
        }))
        .unwrap();
        let overlay = payload.into_entity();
        assert_eq!(overlay.url_template, "https://x/{z}/{x}/{y}.png");
        assert_eq!(overlay.opacity(), 1.0);
    }

    #[test]
    fn test_heatmap_intensity_default() {
        let payload: HeatmapPayload = serde_json::from_value(json!({
            "points": [{"lat": 1.0, "lng": 2.0}, {"lat": 3.0, "lng": 4.0, "intensity": 5.0}]
        }))
        .unwrap();
        let heatmap = payload.into_state();
        assert_eq!(heatmap.points[0].intensity, 1.0);
        assert_eq!(heatmap.points[1].intensity, 5.0);
        assert_eq!(heatmap.radius, 20);
    }
}
