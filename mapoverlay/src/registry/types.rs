//! Overlay entity types.

use crate::geo::{normalize_rotation, Anchor, Argb, LatLng, WeightedLatLng};
use crate::icon::{Bitmap, IconRef};

/// Default polyline stroke width in pixels.
pub const DEFAULT_POLYLINE_WIDTH: f32 = 4.0;

/// Default tile size in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Default heatmap kernel radius in pixels.
pub const DEFAULT_HEATMAP_RADIUS: u32 = 20;

/// Default heatmap layer opacity.
pub const DEFAULT_HEATMAP_OPACITY: f64 = 0.7;

/// A point marker as requested by the host.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerEntity {
    pub id: String,
    pub position: LatLng,
    pub title: Option<String>,
    pub snippet: Option<String>,
    /// Degrees in `[0, 360)`
    pub rotation: f32,
    pub draggable: bool,
    pub z_index: i32,
    pub anchor: Anchor,
    pub icon: Option<IconRef>,
}

impl MarkerEntity {
    pub fn new(id: impl Into<String>, position: LatLng) -> Self {
        Self {
            id: id.into(),
            position,
            title: None,
            snippet: None,
            rotation: 0.0,
            draggable: false,
            z_index: 0,
            anchor: Anchor::DEFAULT,
            icon: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_rotation(mut self, degrees: f32) -> Self {
        self.rotation = normalize_rotation(degrees);
        self
    }

    pub fn with_anchor(mut self, anchor: Anchor) -> Self {
        self.anchor = anchor;
        self
    }

    pub fn with_icon(mut self, icon: IconRef) -> Self {
        self.icon = Some(icon);
        self
    }

    /// Applies every field present in `patch`.
    pub fn apply(&mut self, patch: &MarkerPatch) {
        if let Some(position) = patch.position {
            self.position = position;
        }
        if let Some(title) = &patch.title {
            self.title = Some(title.clone());
        }
        if let Some(snippet) = &patch.snippet {
            self.snippet = Some(snippet.clone());
        }
        if let Some(rotation) = patch.rotation {
            self.rotation = normalize_rotation(rotation);
        }
        if let Some(draggable) = patch.draggable {
            self.draggable = draggable;
        }
        if let Some(z_index) = patch.z_index {
            self.z_index = z_index;
        }
        if let Some(anchor) = patch.anchor {
            self.anchor = anchor;
        }
        if let Some(icon) = &patch.icon {
            self.icon = Some(icon.clone());
        }
    }
}

/// Partial marker update. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerPatch {
    pub position: Option<LatLng>,
    pub title: Option<String>,
    pub snippet: Option<String>,
    pub rotation: Option<f32>,
    pub draggable: Option<bool>,
    pub z_index: Option<i32>,
    pub anchor: Option<Anchor>,
    pub icon: Option<IconRef>,
}

impl MarkerPatch {
    pub fn position(position: LatLng) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A marker plus its currently resolved icon.
///
/// `icon == None` means the surface shows its default marker appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerState {
    pub entity: MarkerEntity,
    pub icon: Option<Bitmap>,
}

impl MarkerState {
    pub fn new(entity: MarkerEntity) -> Self {
        Self { entity, icon: None }
    }

    pub fn id(&self) -> &str {
        &self.entity.id
    }
}

/// A connected line through ordered points.
#[derive(Debug, Clone, PartialEq)]
pub struct PolylineEntity {
    pub id: String,
    pub points: Vec<LatLng>,
    pub color: Argb,
    pub width: f32,
    pub geodesic: bool,
    pub dotted: bool,
}

impl PolylineEntity {
    pub fn new(id: impl Into<String>, points: Vec<LatLng>) -> Self {
        Self {
            id: id.into(),
            points,
            color: Argb::BLACK,
            width: DEFAULT_POLYLINE_WIDTH,
            geodesic: false,
            dotted: false,
        }
    }
}

/// A raster tile layer drawn from a URL template.
#[derive(Debug, Clone, PartialEq)]
pub struct TileOverlayEntity {
    pub id: String,
    /// URL with `{x}`, `{y}` and `{z}` placeholders
    pub url_template: String,
    pub tile_size: u32,
    opacity: f32,
    pub z_index: i32,
}

impl TileOverlayEntity {
    pub fn new(id: impl Into<String>, url_template: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            url_template: url_template.into(),
            tile_size: DEFAULT_TILE_SIZE,
            opacity: 1.0,
            z_index: 0,
        }
    }

    /// Sets the opacity, clamped to `[0, 1]`.
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = if opacity.is_nan() {
            1.0
        } else {
            opacity.clamp(0.0, 1.0)
        };
        self
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Substitutes tile coordinates into the template verbatim.
    pub fn tile_url(&self, x: u32, y: u32, z: u32) -> String {
        self.url_template
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
            .replace("{z}", &z.to_string())
    }
}

/// The single heatmap layer.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapState {
    pub points: Vec<WeightedLatLng>,
    pub radius: u32,
    opacity: f64,
}

impl HeatmapState {
    pub fn new(points: Vec<WeightedLatLng>) -> Self {
        Self {
            points,
            radius: DEFAULT_HEATMAP_RADIUS,
            opacity: DEFAULT_HEATMAP_OPACITY,
        }
    }

    pub fn with_radius(mut self, radius: u32) -> Self {
        self.radius = radius;
        self
    }

    /// Sets the opacity, clamped to `[0, 1]`.
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = if opacity.is_nan() {
            DEFAULT_HEATMAP_OPACITY
        } else {
            opacity.clamp(0.0, 1.0)
        };
        self
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }
}
