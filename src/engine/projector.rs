// Geo Projector
//
// Web-Mercator projection fitted so the (filtered) landmass set exactly fills
// the canvas: maximal uniform scale, centered on the spare axis.

use crate::geo::Landmass;
use crate::net::Geo;
use std::f64::consts::FRAC_PI_4;

/// Mercator diverges at the poles; clamp to the usual web-map limit
const MAX_LATITUDE: f64 = 85.051_128_78;

/// Fit box used when no landmass dataset is available (lon/lat corners)
const DEFAULT_WORLD_BOX: [(f64, f64); 2] = [(-180.0, -56.0), (180.0, 84.0)];

/// Unscaled Mercator with screen orientation (y grows downwards)
fn mercator(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = lon.to_radians();
    let y = -(FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// A fitted projection for one canvas size and landmass set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    scale: f64,
    translate: (f64, f64),
    width: f64,
    height: f64,
}

impl Projector {
    /// Fit the projection to `landmasses` on a `width` x `height` canvas
    ///
    /// The caller passes the already-filtered set, so excluded regions never
    /// influence the fit. An empty set falls back to a fixed world box.
    pub fn fit(landmasses: &[Landmass], width: f64, height: f64) -> Self {
        let mut bounds = Bounds::empty();
        for ring in landmasses.iter().flat_map(|l| l.rings.iter()) {
            for &(lon, lat) in ring {
                if lon.is_finite() && lat.is_finite() {
                    bounds.include(mercator(lon, lat));
                }
            }
        }
        if bounds.is_empty() {
            for &(lon, lat) in &DEFAULT_WORLD_BOX {
                bounds.include(mercator(lon, lat));
            }
        }

        let width = width.max(0.0);
        let height = height.max(0.0);
        let dx = bounds.max.0 - bounds.min.0;
        let dy = bounds.max.1 - bounds.min.1;

        let scale = match (dx > 0.0, dy > 0.0) {
            (true, true) => (width / dx).min(height / dy),
            (true, false) => width / dx,
            (false, true) => height / dy,
            (false, false) => 1.0,
        };
        let translate = (
            (width - scale * (bounds.min.0 + bounds.max.0)) / 2.0,
            (height - scale * (bounds.min.1 + bounds.max.1)) / 2.0,
        );

        Self {
            scale,
            translate,
            width,
            height,
        }
    }

    /// Project a (longitude, latitude) pair to canvas coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (f64, f64) {
        if !lon.is_finite() || !lat.is_finite() {
            return self.center();
        }
        let (x, y) = mercator(lon, lat);
        (
            self.scale * x + self.translate.0,
            self.scale * y + self.translate.1,
        )
    }

    /// Project a node's optional geo attribute; nodes without one sit at the center
    pub fn project_geo(&self, geo: Option<&Geo>) -> (f64, f64) {
        match geo {
            Some(g) => self.project(g.longitude, g.latitude),
            None => self.center(),
        }
    }

    pub fn center(&self) -> (f64, f64) {
        (self.width / 2.0, self.height / 2.0)
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min: (f64, f64),
    max: (f64, f64),
}

impl Bounds {
    fn empty() -> Self {
        Self {
            min: (f64::INFINITY, f64::INFINITY),
            max: (f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    fn is_empty(&self) -> bool {
        self.min.0 > self.max.0
    }

    fn include(&mut self, (x, y): (f64, f64)) {
        self.min.0 = self.min.0.min(x);
        self.min.1 = self.min.1.min(y);
        self.max.0 = self.max.0.max(x);
        self.max.1 = self.max.1.max(y);
    }
}
