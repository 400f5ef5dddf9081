// Rendering and animation core
//
// MapCore is the single owner of the last accepted snapshot, the pending
// channel events, the in-flight bolts, the projection and the zoom transform.
// It is driven entirely through synchronous step functions (accept_snapshot,
// on_tick, on_resize, on_wheel, on_trigger) so a test can play any sequence
// of polls, resizes and inputs with explicit timestamps.

pub mod differ;
pub mod projector;
pub mod scene;
pub mod scheduler;
pub mod viewport;

pub use differ::{ChannelEvent, TopologyDiffer};
pub use projector::Projector;
pub use scene::{DrawList, NodeMarker};
pub use scheduler::{BoltPath, EventScheduler, SchedulerConfig};
pub use viewport::{ViewportController, ViewportTransform};

use crate::geo::{filter_excluded, Landmass};
use crate::net::{ChannelStatus, Snapshot};
use rand::rngs::StdRng;
use rand::Rng;
use std::time::Instant;
use tracing::{debug, info};

/// Pick radius for hover, in screen pixels
const PICK_RADIUS: f64 = 4.0;

/// Core tunables
#[derive(Debug, Clone, PartialEq)]
pub struct CoreConfig {
    pub scheduler: SchedulerConfig,
    pub min_scale: f64,
    pub max_scale: f64,
    pub excluded_landmasses: Vec<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            scheduler: SchedulerConfig::default(),
            min_scale: 0.5,
            max_scale: 10.0,
            excluded_landmasses: vec!["Antarctica".to_string(), "ATA".to_string()],
        }
    }
}

/// What one admission step produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Admission {
    /// The snapshot only established the baseline
    pub baseline: bool,
    /// Events that made it into the pending collection
    pub events: Vec<ChannelEvent>,
    /// Events dropped by the differ's cap
    pub truncated: usize,
    /// The sound cue is due
    pub play_sound: bool,
}

pub struct MapCore {
    last_snapshot: Option<Snapshot>,
    differ: TopologyDiffer,
    scheduler: EventScheduler,
    landmasses: Vec<Landmass>,
    projector: Projector,
    viewport: ViewportController,
    scene: DrawList,
    trigger_seen: u64,
    rng: StdRng,
}

impl MapCore {
    /// Create the core with the session's landmass dataset and random source
    ///
    /// Excluded landmasses are filtered out once here, so they affect neither
    /// the projection fit nor what is drawn.
    pub fn new(config: CoreConfig, landmasses: &[Landmass], rng: StdRng) -> Self {
        let landmasses = filter_excluded(landmasses, &config.excluded_landmasses);
        let projector = Projector::fit(&landmasses, 0.0, 0.0);
        let scene = DrawList::build(None, &landmasses, &projector);

        Self {
            last_snapshot: None,
            differ: TopologyDiffer::new(config.scheduler.cap),
            scheduler: EventScheduler::new(config.scheduler),
            landmasses,
            projector,
            viewport: ViewportController::new(config.min_scale, config.max_scale),
            scene,
            trigger_seen: 0,
            rng,
        }
    }

    #[cfg(test)]
    pub fn snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    pub fn scene(&self) -> &DrawList {
        &self.scene
    }

    pub fn transform(&self) -> ViewportTransform {
        self.viewport.transform()
    }

    #[cfg(test)]
    pub fn canvas_size(&self) -> (f64, f64) {
        self.projector.size()
    }

    pub fn pending_len(&self) -> usize {
        self.scheduler.pending_len()
    }

    pub fn effects_len(&self) -> usize {
        self.scheduler.effects_len()
    }

    /// Accept a freshly polled snapshot
    ///
    /// The first snapshot only sets the baseline. Later ones are diffed
    /// against the previous snapshot, the events admitted and bolts launched,
    /// then the snapshot replaces the previous one and the scene is rebuilt.
    pub fn accept_snapshot(&mut self, snapshot: Snapshot, now: Instant) -> Admission {
        let Some(previous) = self.last_snapshot.take() else {
            info!(
                nodes = snapshot.nodes.len(),
                channels = snapshot.channels.len(),
                "Baseline snapshot accepted"
            );
            self.last_snapshot = Some(snapshot);
            self.rebuild_scene();
            return Admission {
                baseline: true,
                ..Admission::default()
            };
        };

        let diff = self
            .differ
            .diff(&previous.channel_ids(), &snapshot.channel_ids(), now);
        let outcome = self.scheduler.admit(diff.events, now);
        if outcome.dropped > 0 {
            debug!(dropped = outcome.dropped, "Pending events dropped by window or cap");
        }

        for event in &outcome.admitted {
            info!(
                channel = %event.channel_id,
                status = event.status.as_str(),
                "Channel event detected"
            );
            let endpoints = snapshot
                .endpoints(&event.channel_id)
                .or_else(|| previous.endpoints(&event.channel_id))
                .or_else(|| event.channel_id.split_once('-'))
                .map(|(s, t)| (s.to_string(), t.to_string()));
            match endpoints {
                Some((source, target)) => {
                    self.scheduler
                        .launch(event.clone(), &source, &target, now, &mut self.rng)
                }
                None => debug!(channel = %event.channel_id, "No endpoints for channel event"),
            }
        }

        self.last_snapshot = Some(snapshot);
        self.rebuild_scene();

        Admission {
            baseline: false,
            events: outcome.admitted,
            truncated: diff.truncated,
            play_sound: outcome.play_sound,
        }
    }

    /// Drop fully faded bolts; returns how many were removed
    pub fn on_tick(&mut self, now: Instant) -> usize {
        self.scheduler.expire(now)
    }

    /// React to a canvas size change; returns whether anything was redrawn
    pub fn on_resize(&mut self, width: f64, height: f64) -> bool {
        if self.projector.size() == (width.max(0.0), height.max(0.0)) {
            return false;
        }
        self.projector = Projector::fit(&self.landmasses, width, height);
        self.rebuild_scene();
        true
    }

    /// Scroll-wheel zoom around `anchor`; the scene itself is not rebuilt
    pub fn on_wheel(&mut self, delta_y: f64, anchor: (f64, f64)) {
        self.viewport.on_wheel(delta_y, anchor);
    }

    pub fn reset_zoom(&mut self) {
        self.viewport.reset();
    }

    /// Debug trigger: one ad-hoc bolt between two random distinct nodes
    ///
    /// Fires when `count` is positive and higher than the last value seen.
    /// Needs at least two nodes in the current snapshot.
    pub fn on_trigger(&mut self, count: u64, now: Instant) -> Admission {
        let fresh = count > 0 && count > self.trigger_seen;
        self.trigger_seen = count;
        if !fresh {
            return Admission::default();
        }

        let Some(snapshot) = self.last_snapshot.as_ref() else {
            debug!("Debug trigger ignored, no snapshot yet");
            return Admission::default();
        };
        let n = snapshot.nodes.len();
        if n < 2 {
            debug!(nodes = n, "Debug trigger ignored, need two nodes");
            return Admission::default();
        }

        let i = self.rng.gen_range(0..n);
        let mut j = self.rng.gen_range(0..n);
        if j == i {
            j = (j + 1) % n;
        }
        let source = snapshot.nodes[i].id.clone();
        let target = snapshot.nodes[j].id.clone();
        let status = if self.rng.gen_bool(0.5) {
            ChannelStatus::Open
        } else {
            ChannelStatus::Closed
        };
        let event = ChannelEvent::new(format!("{}-{}", source, target), status, now);

        info!(channel = %event.channel_id, status = status.as_str(), "Debug bolt triggered");
        let outcome = self.scheduler.admit(vec![event], now);
        for event in &outcome.admitted {
            self.scheduler
                .launch(event.clone(), &source, &target, now, &mut self.rng);
        }

        Admission {
            baseline: false,
            events: outcome.admitted,
            truncated: 0,
            play_sound: outcome.play_sound,
        }
    }

    /// Bolts in flight, resolved against current node positions
    pub fn effect_paths(&self, now: Instant) -> Vec<BoltPath> {
        self.scheduler.paths(now, &self.scene.positions())
    }

    /// Node marker under a screen point, accounting for the zoom transform
    pub fn hit_test(&self, screen: (f64, f64)) -> Option<&NodeMarker> {
        let transform = self.viewport.transform();
        let world = transform.invert(screen);
        self.scene.marker_at(world, PICK_RADIUS / transform.scale)
    }

    fn rebuild_scene(&mut self) {
        self.scene = DrawList::build(
            self.last_snapshot.as_ref(),
            &self.landmasses,
            &self.projector,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{Channel, Geo, Node};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use std::time::Duration;

    fn core() -> MapCore {
        let mut core = MapCore::new(CoreConfig::default(), &[], StdRng::seed_from_u64(11));
        core.on_resize(400.0, 200.0);
        core
    }

    fn node(id: &str, lat: f64, lon: f64) -> Node {
        Node {
            id: id.to_string(),
            geo: Some(Geo {
                latitude: lat,
                longitude: lon,
                country_code: None,
            }),
        }
    }

    fn snapshot(channels: &[(&str, &str)]) -> Snapshot {
        Snapshot {
            nodes: vec![
                node("n1", 40.7, -74.0),
                node("n2", 51.5, -0.1),
                node("n3", 1.3, 103.8),
            ],
            channels: channels.iter().map(|(s, t)| Channel::new(s, t)).collect(),
        }
    }

    #[test]
    fn test_first_snapshot_is_baseline_only() {
        let mut core = core();
        let now = Instant::now();
        let out = core.accept_snapshot(snapshot(&[("n1", "n2"), ("n2", "n3")]), now);
        assert!(out.baseline);
        assert!(out.events.is_empty());
        assert!(!out.play_sound);
        assert_eq!(core.pending_len(), 0);
        assert_eq!(core.effects_len(), 0);
        assert_eq!(core.scene().channels.len(), 2);
    }

    #[test]
    fn test_open_then_close_cycle() {
        let mut core = core();
        let t0 = Instant::now();
        core.accept_snapshot(snapshot(&[("n1", "n2")]), t0);

        let t1 = t0 + Duration::from_secs(10);
        let out = core.accept_snapshot(snapshot(&[("n1", "n2"), ("n2", "n3")]), t1);
        assert_eq!(out.events.len(), 1);
        assert_eq!(out.events[0].channel_id, "n2-n3");
        assert_eq!(out.events[0].status, ChannelStatus::Open);
        assert!(out.play_sound);
        assert_eq!(core.effects_len(), 1);

        let t2 = t1 + Duration::from_secs(10);
        let out = core.accept_snapshot(snapshot(&[]), t2);
        assert_eq!(out.events.len(), 2);
        assert!(out
            .events
            .iter()
            .all(|e| e.status == ChannelStatus::Closed));
        // Closed channels still resolve through the previous snapshot
        assert_eq!(core.effect_paths(t2).len(), 3);
        assert!(core.scene().channels.is_empty());
    }

    #[test]
    fn test_unchanged_snapshot_produces_nothing() {
        let mut core = core();
        let t0 = Instant::now();
        core.accept_snapshot(snapshot(&[("n1", "n2")]), t0);
        let out = core.accept_snapshot(snapshot(&[("n1", "n2")]), t0 + Duration::from_secs(10));
        assert!(out.events.is_empty());
        assert!(!out.play_sound);
    }

    #[test]
    fn test_bolts_fade_out_on_tick() {
        let mut core = core();
        let t0 = Instant::now();
        core.accept_snapshot(snapshot(&[]), t0);
        core.accept_snapshot(snapshot(&[("n1", "n3")]), t0);
        assert_eq!(core.effects_len(), 1);

        assert_eq!(core.on_tick(t0 + Duration::from_secs(30)), 0);
        assert_eq!(core.on_tick(t0 + Duration::from_secs(60)), 1);
        assert!(core.effect_paths(t0 + Duration::from_secs(61)).is_empty());
    }

    #[test]
    fn test_trigger_zero_or_unchanged_does_nothing() {
        let mut core = core();
        let now = Instant::now();
        core.accept_snapshot(snapshot(&[]), now);

        assert!(core.on_trigger(0, now).events.is_empty());
        assert_eq!(core.effects_len(), 0);

        assert_eq!(core.on_trigger(1, now).events.len(), 1);
        assert!(core.on_trigger(1, now).events.is_empty());
        assert_eq!(core.effects_len(), 1);
    }

    #[test]
    fn test_trigger_picks_distinct_nodes() {
        let mut core = core();
        let now = Instant::now();
        core.accept_snapshot(snapshot(&[]), now);
        for count in 1..=50 {
            let out = core.on_trigger(count, now);
            assert_eq!(out.events.len(), 1);
            let (a, b) = out.events[0].channel_id.split_once('-').unwrap();
            assert_ne!(a, b);
        }
    }

    #[test]
    fn test_trigger_needs_two_nodes() {
        let mut core = core();
        let now = Instant::now();
        assert!(core.on_trigger(1, now).events.is_empty());

        core.accept_snapshot(
            Snapshot {
                nodes: vec![node("solo", 0.0, 0.0)],
                channels: Vec::new(),
            },
            now,
        );
        assert!(core.on_trigger(2, now).events.is_empty());
    }

    #[test]
    fn test_trigger_shares_sound_cooldown() {
        let mut core = core();
        let t0 = Instant::now();
        core.accept_snapshot(snapshot(&[]), t0);
        assert!(core.on_trigger(1, t0).play_sound);
        let t1 = t0 + Duration::from_millis(300);
        let out = core.accept_snapshot(snapshot(&[("n1", "n2")]), t1);
        assert_eq!(out.events.len(), 1);
        assert!(!out.play_sound);
    }

    #[test]
    fn test_resize_reprojects_without_touching_zoom() {
        let mut core = core();
        core.accept_snapshot(snapshot(&[("n1", "n2")]), Instant::now());
        core.on_wheel(-300.0, (10.0, 10.0));
        let zoom = core.transform();
        let before = core.scene().markers[0].position;

        assert!(core.on_resize(800.0, 400.0));
        assert!(!core.on_resize(800.0, 400.0));
        assert_ne!(core.scene().markers[0].position, before);
        assert_eq!(core.transform(), zoom);
    }

    #[test]
    fn test_wheel_does_not_rebuild_scene() {
        let mut core = core();
        core.accept_snapshot(snapshot(&[("n1", "n2")]), Instant::now());
        let scene = core.scene().clone();
        core.on_wheel(-500.0, (100.0, 50.0));
        assert_eq!(core.scene(), &scene);
    }

    #[test]
    fn test_hit_test_follows_zoom() {
        let mut core = core();
        core.accept_snapshot(snapshot(&[]), Instant::now());
        let world = core.scene().markers[0].position;
        assert_eq!(core.hit_test(world).map(|m| m.id.as_str()), Some("n1"));

        core.on_wheel(-400.0, (0.0, 0.0));
        let screen = core.transform().apply(world);
        assert_eq!(core.hit_test(screen).map(|m| m.id.as_str()), Some("n1"));
    }

    #[test]
    fn test_excluded_landmass_never_drawn() {
        let land = vec![
            Landmass {
                name: Some("Antarctica".to_string()),
                id: None,
                rings: vec![vec![(-180.0, -90.0), (180.0, -90.0), (0.0, -60.0)]],
            },
            Landmass {
                name: Some("Iceland".to_string()),
                id: None,
                rings: vec![vec![(-24.0, 63.0), (-13.0, 63.0), (-18.0, 66.5)]],
            },
        ];
        let mut core = MapCore::new(CoreConfig::default(), &land, StdRng::seed_from_u64(1));
        core.on_resize(300.0, 150.0);
        assert_eq!(core.scene().landmasses.len(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_first_snapshot_emits_nothing(
            coords in proptest::collection::vec(
                proptest::option::of((-90.0f64..90.0, -180.0f64..180.0)),
                0..12,
            ),
            pairs in proptest::collection::vec((0usize..12, 0usize..12), 0..40),
            closed in proptest::collection::vec(any::<bool>(), 40),
        ) {
            let nodes: Vec<Node> = coords
                .iter()
                .enumerate()
                .map(|(i, c)| match c {
                    Some((lat, lon)) => node(&format!("n{}", i), *lat, *lon),
                    None => Node { id: format!("n{}", i), geo: None },
                })
                .collect();
            let channels = pairs
                .iter()
                .zip(&closed)
                .map(|((s, t), closed)| {
                    let mut channel = Channel::new(&format!("n{}", s), &format!("n{}", t));
                    if *closed {
                        channel.status = ChannelStatus::Closed;
                    }
                    channel
                })
                .collect();

            let mut core = core();
            let out = core.accept_snapshot(Snapshot { nodes, channels }, Instant::now());
            prop_assert!(out.baseline);
            prop_assert!(out.events.is_empty());
            prop_assert!(!out.play_sound);
            prop_assert_eq!(core.pending_len(), 0);
            prop_assert_eq!(core.effects_len(), 0);
        }
    }
}
