// Event Scheduler & Animator
//
// Owns the bounded collection of pending channel events, the in-flight
// lightning effects drawn for them, and the audio cooldown timestamp.
// All timing decisions use the `now` captured by the caller for the step.

use super::differ::ChannelEvent;
use crate::net::ChannelStatus;
use rand::Rng;
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Tunables for admission, fading and bolt geometry
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Sliding window for pending events
    pub window: Duration,
    /// Maximum pending events and maximum in-flight effects
    pub cap: usize,
    /// Time for an effect to fade to zero opacity
    pub fade: Duration,
    /// Minimum spacing between two sound cues
    pub sound_cooldown: Duration,
    /// Number of segments in a bolt polyline
    pub bolt_segments: usize,
    /// Maximum per-axis jitter of a bolt waypoint, in canvas pixels
    pub jitter: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(5000),
            cap: 30,
            fade: Duration::from_millis(60000),
            sound_cooldown: Duration::from_millis(1000),
            bolt_segments: 7,
            jitter: 9.0,
        }
    }
}

/// Outcome of one admission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmitOutcome {
    /// New events that survived window and cap truncation, in order
    pub admitted: Vec<ChannelEvent>,
    /// Events dropped from the pending collection (expired or over cap)
    pub dropped: usize,
    /// Whether the caller should play the sound cue now
    pub play_sound: bool,
}

/// One time-boxed lightning bolt
#[derive(Debug, Clone, PartialEq)]
pub struct Effect {
    pub event: ChannelEvent,
    pub source: String,
    pub target: String,
    pub started_at: Instant,
    /// Offsets of the interior waypoints, fixed at launch
    jitter: Vec<(f64, f64)>,
}

/// A resolved bolt ready for painting
#[derive(Debug, Clone, PartialEq)]
pub struct BoltPath {
    pub channel_id: String,
    pub status: ChannelStatus,
    pub points: Vec<(f64, f64)>,
    /// 1.0 at launch, 0.0 when fully faded
    pub opacity: f64,
}

#[derive(Debug)]
pub struct EventScheduler {
    config: SchedulerConfig,
    pending: VecDeque<ChannelEvent>,
    effects: VecDeque<Effect>,
    last_sound_at: Option<Instant>,
}

impl EventScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self {
            config,
            pending: VecDeque::new(),
            effects: VecDeque::new(),
            last_sound_at: None,
        }
    }

    #[cfg(test)]
    pub fn pending(&self) -> impl Iterator<Item = &ChannelEvent> {
        self.pending.iter()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn effects_len(&self) -> usize {
        self.effects.len()
    }

    /// Admit newly detected events
    ///
    /// 1. Drop pending events older than the sliding window.
    /// 2. Append the new events.
    /// 3. Keep only the most recent `cap` entries.
    ///
    /// A sound cue is granted when at least one event was admitted and the
    /// cooldown since the last cue has elapsed.
    pub fn admit(&mut self, new_events: Vec<ChannelEvent>, now: Instant) -> AdmitOutcome {
        let window = self.config.window;
        let before = self.pending.len();
        self.pending
            .retain(|e| now.saturating_duration_since(e.timestamp) <= window);
        let expired = before - self.pending.len();

        let incoming = new_events.len();
        self.pending.extend(new_events);

        let overflow = self.pending.len().saturating_sub(self.config.cap);
        self.pending.drain(..overflow);

        // New events sit at the tail, so the survivors are the last ones
        let survivors = incoming.min(self.pending.len());
        let admitted: Vec<ChannelEvent> = self
            .pending
            .iter()
            .skip(self.pending.len() - survivors)
            .cloned()
            .collect();

        let play_sound = !admitted.is_empty() && self.sound_ready(now);
        if play_sound {
            self.last_sound_at = Some(now);
        }

        AdmitOutcome {
            admitted,
            dropped: expired + overflow,
            play_sound,
        }
    }

    fn sound_ready(&self, now: Instant) -> bool {
        match self.last_sound_at {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.config.sound_cooldown,
        }
    }

    /// Start a bolt for an admitted event between two node ids
    ///
    /// Jitter is drawn from `rng` once, so a seeded generator yields the same
    /// bolt shape every time. The oldest effects are dropped beyond the cap.
    pub fn launch<R: Rng>(
        &mut self,
        event: ChannelEvent,
        source: &str,
        target: &str,
        now: Instant,
        rng: &mut R,
    ) {
        let interior = self.config.bolt_segments.saturating_sub(1);
        let j = self.config.jitter;
        let jitter = (0..interior)
            .map(|_| {
                if j > 0.0 {
                    (rng.gen_range(-j..=j), rng.gen_range(-j..=j))
                } else {
                    (0.0, 0.0)
                }
            })
            .collect();

        self.effects.push_back(Effect {
            event,
            source: source.to_string(),
            target: target.to_string(),
            started_at: now,
            jitter,
        });
        while self.effects.len() > self.config.cap {
            self.effects.pop_front();
        }
    }

    /// Remove fully faded effects, returning how many were removed
    pub fn expire(&mut self, now: Instant) -> usize {
        let fade = self.config.fade;
        let before = self.effects.len();
        self.effects
            .retain(|e| now.saturating_duration_since(e.started_at) < fade);
        before - self.effects.len()
    }

    /// Resolve in-flight effects into bolt polylines
    ///
    /// Effects whose endpoints are not in `positions` are skipped silently.
    pub fn paths(&self, now: Instant, positions: &HashMap<&str, (f64, f64)>) -> Vec<BoltPath> {
        let fade = self.config.fade.as_secs_f64();
        self.effects
            .iter()
            .filter_map(|effect| {
                let from = *positions.get(effect.source.as_str())?;
                let to = *positions.get(effect.target.as_str())?;
                let elapsed = now.saturating_duration_since(effect.started_at).as_secs_f64();
                let opacity = if fade > 0.0 {
                    (1.0 - elapsed / fade).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                if opacity <= 0.0 {
                    return None;
                }
                Some(BoltPath {
                    channel_id: effect.event.channel_id.clone(),
                    status: effect.event.status,
                    points: bolt_points(from, to, &effect.jitter),
                    opacity,
                })
            })
            .collect()
    }
}

/// Jagged polyline from `from` to `to`
///
/// Interior waypoints are evenly spaced along the straight line and displaced
/// by the matching `jitter` offset; the endpoints are never displaced.
pub fn bolt_points(from: (f64, f64), to: (f64, f64), jitter: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let segments = jitter.len() + 1;
    let mut points = Vec::with_capacity(segments + 1);
    points.push(from);
    for (i, (jx, jy)) in jitter.iter().enumerate() {
        let t = (i + 1) as f64 / segments as f64;
        points.push((
            from.0 + (to.0 - from.0) * t + jx,
            from.1 + (to.1 - from.1) * t + jy,
        ));
    }
    points.push(to);
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn event(id: &str, at: Instant) -> ChannelEvent {
        ChannelEvent::new(id, ChannelStatus::Open, at)
    }

    fn positions() -> HashMap<&'static str, (f64, f64)> {
        let mut map = HashMap::new();
        map.insert("a", (0.0, 0.0));
        map.insert("b", (70.0, 0.0));
        map
    }

    #[test]
    fn test_admit_appends_and_grants_sound() {
        let mut sched = EventScheduler::new(SchedulerConfig::default());
        let now = Instant::now();
        let out = sched.admit(vec![event("a-b", now)], now);
        assert_eq!(out.admitted.len(), 1);
        assert!(out.play_sound);
        assert_eq!(sched.pending_len(), 1);
    }

    #[test]
    fn test_empty_admission_never_plays_sound() {
        let mut sched = EventScheduler::new(SchedulerConfig::default());
        let out = sched.admit(Vec::new(), Instant::now());
        assert!(!out.play_sound);
    }

    #[test]
    fn test_window_drops_old_pending() {
        let mut sched = EventScheduler::new(SchedulerConfig::default());
        let t0 = Instant::now();
        sched.admit(vec![event("old-1", t0)], t0);

        let t1 = t0 + Duration::from_millis(6000);
        let out = sched.admit(vec![event("new-1", t1)], t1);
        assert_eq!(out.dropped, 1);
        let ids: Vec<_> = sched.pending().map(|e| e.channel_id.as_str()).collect();
        assert_eq!(ids, vec!["new-1"]);
    }

    #[test]
    fn test_event_inside_window_is_kept() {
        let mut sched = EventScheduler::new(SchedulerConfig::default());
        let t0 = Instant::now();
        sched.admit(vec![event("x-1", t0)], t0);
        let t1 = t0 + Duration::from_millis(4000);
        sched.admit(vec![event("x-2", t1)], t1);
        assert_eq!(sched.pending_len(), 2);
    }

    #[test]
    fn test_cap_keeps_most_recent() {
        let config = SchedulerConfig {
            cap: 3,
            ..SchedulerConfig::default()
        };
        let mut sched = EventScheduler::new(config);
        let now = Instant::now();
        let burst: Vec<_> = (0..5).map(|i| event(&format!("c-{}", i), now)).collect();
        let out = sched.admit(burst, now);

        assert_eq!(sched.pending_len(), 3);
        assert_eq!(out.dropped, 2);
        let ids: Vec<_> = out.admitted.iter().map(|e| e.channel_id.as_str()).collect();
        assert_eq!(ids, vec!["c-2", "c-3", "c-4"]);
    }

    #[test]
    fn test_sound_cooldown() {
        let mut sched = EventScheduler::new(SchedulerConfig::default());
        let t0 = Instant::now();
        assert!(sched.admit(vec![event("a-1", t0)], t0).play_sound);

        let t1 = t0 + Duration::from_millis(400);
        assert!(!sched.admit(vec![event("a-2", t1)], t1).play_sound);

        let t2 = t0 + Duration::from_millis(999);
        assert!(!sched.admit(vec![event("a-3", t2)], t2).play_sound);

        let t3 = t0 + Duration::from_millis(1000);
        assert!(sched.admit(vec![event("a-4", t3)], t3).play_sound);
    }

    #[test]
    fn test_bolt_points_endpoints_fixed() {
        let pts = bolt_points((0.0, 0.0), (80.0, 40.0), &[(1.0, -1.0); 7]);
        assert_eq!(pts.len(), 9);
        assert_eq!(pts[0], (0.0, 0.0));
        assert_eq!(pts[8], (80.0, 40.0));
        assert_eq!(pts[4], (40.0 + 1.0, 20.0 - 1.0));
    }

    #[test]
    fn test_launch_uses_segment_count() {
        let mut sched = EventScheduler::new(SchedulerConfig::default());
        let mut rng = StdRng::seed_from_u64(7);
        let now = Instant::now();
        sched.launch(event("a-b", now), "a", "b", now, &mut rng);

        let paths = sched.paths(now, &positions());
        assert_eq!(paths.len(), 1);
        // 7 segments: 2 endpoints + 6 interior waypoints
        assert_eq!(paths[0].points.len(), 8);
        assert_eq!(paths[0].opacity, 1.0);
        for (i, &(x, y)) in paths[0].points.iter().enumerate() {
            let straight_x = 10.0 * i as f64;
            assert!((x - straight_x).abs() <= 9.0);
            assert!(y.abs() <= 9.0);
        }
    }

    #[test]
    fn test_seeded_bolts_are_deterministic() {
        let now = Instant::now();
        let shape = |seed| {
            let mut sched = EventScheduler::new(SchedulerConfig::default());
            let mut rng = StdRng::seed_from_u64(seed);
            sched.launch(event("a-b", now), "a", "b", now, &mut rng);
            sched.paths(now, &positions())[0].points.clone()
        };
        assert_eq!(shape(42), shape(42));
        assert_ne!(shape(42), shape(43));
    }

    #[test]
    fn test_unresolved_effect_is_skipped() {
        let mut sched = EventScheduler::new(SchedulerConfig::default());
        let mut rng = StdRng::seed_from_u64(1);
        let now = Instant::now();
        sched.launch(event("a-z", now), "a", "z", now, &mut rng);
        assert!(sched.paths(now, &positions()).is_empty());
        assert_eq!(sched.effects_len(), 1);
    }

    #[test]
    fn test_fade_and_expiry() {
        let config = SchedulerConfig {
            fade: Duration::from_millis(1000),
            ..SchedulerConfig::default()
        };
        let mut sched = EventScheduler::new(config);
        let mut rng = StdRng::seed_from_u64(3);
        let t0 = Instant::now();
        sched.launch(event("a-b", t0), "a", "b", t0, &mut rng);

        let half = sched.paths(t0 + Duration::from_millis(500), &positions());
        assert!((half[0].opacity - 0.5).abs() < 1e-9);

        assert_eq!(sched.expire(t0 + Duration::from_millis(999)), 0);
        assert_eq!(sched.expire(t0 + Duration::from_millis(1000)), 1);
        assert_eq!(sched.effects_len(), 0);
    }

    #[test]
    fn test_effects_bounded_by_cap() {
        let config = SchedulerConfig {
            cap: 2,
            ..SchedulerConfig::default()
        };
        let mut sched = EventScheduler::new(config);
        let mut rng = StdRng::seed_from_u64(5);
        let now = Instant::now();
        for i in 0..5 {
            sched.launch(event(&format!("e-{}", i), now), "a", "b", now, &mut rng);
        }
        assert_eq!(sched.effects_len(), 2);
    }

    #[test]
    fn test_zero_jitter_gives_straight_line() {
        let config = SchedulerConfig {
            jitter: 0.0,
            ..SchedulerConfig::default()
        };
        let mut sched = EventScheduler::new(config);
        let mut rng = StdRng::seed_from_u64(9);
        let now = Instant::now();
        sched.launch(event("a-b", now), "a", "b", now, &mut rng);
        let path = &sched.paths(now, &positions())[0];
        assert!(path.points.iter().all(|&(_, y)| y == 0.0));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Pending size never exceeds the cap after admission
        #[test]
        fn prop_pending_never_exceeds_cap(
            cap in 1usize..40,
            batches in proptest::collection::vec(0usize..60, 1..8),
        ) {
            let config = SchedulerConfig { cap, ..SchedulerConfig::default() };
            let mut sched = EventScheduler::new(config);
            let now = Instant::now();
            for (b, size) in batches.into_iter().enumerate() {
                let events = (0..size).map(|i| event(&format!("{}-{}", b, i), now)).collect();
                sched.admit(events, now);
                prop_assert!(sched.pending_len() <= cap);
            }
        }

        /// A burst inside one cooldown window yields at most one cue
        #[test]
        fn prop_one_sound_per_cooldown(
            offsets in proptest::collection::vec(0u64..1000, 1..50),
        ) {
            let mut sched = EventScheduler::new(SchedulerConfig::default());
            let t0 = Instant::now();
            let mut offsets = offsets;
            offsets.sort_unstable();
            let mut cues = 0;
            for (i, ms) in offsets.into_iter().enumerate() {
                let at = t0 + Duration::from_millis(ms);
                if sched.admit(vec![event(&format!("s-{}", i), at)], at).play_sound {
                    cues += 1;
                }
            }
            prop_assert!(cues <= 1);
        }
    }
}
