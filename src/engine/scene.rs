// Render Surface
//
// Builds the declarative draw-list for the static layers: landmass rings,
// channel lines and node markers. Every rebuild replaces the previous list
// wholesale; the terminal painter only commits what it is given.

use super::projector::Projector;
use crate::geo::Landmass;
use crate::net::Snapshot;
use crate::theme::{channel_color, country_color};
use ratatui::style::Color;
use std::collections::HashMap;

/// A channel drawn between two projected nodes
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelLine {
    pub id: String,
    pub from: (f64, f64),
    pub to: (f64, f64),
    pub color: Color,
}

/// A node marker with its hover label
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMarker {
    pub id: String,
    pub label: String,
    pub position: (f64, f64),
    pub color: Color,
}

/// Static layers of one redraw, in canvas coordinates (pre-viewport)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DrawList {
    pub landmasses: Vec<Vec<(f64, f64)>>,
    pub channels: Vec<ChannelLine>,
    pub markers: Vec<NodeMarker>,
}

impl DrawList {
    /// Rebuild all static layers from the current snapshot
    ///
    /// Channels whose source or target is not a known node are skipped.
    pub fn build(snapshot: Option<&Snapshot>, landmasses: &[Landmass], projector: &Projector) -> Self {
        let landmasses = landmasses
            .iter()
            .flat_map(|l| l.rings.iter())
            .map(|ring| {
                ring.iter()
                    .map(|&(lon, lat)| projector.project(lon, lat))
                    .collect()
            })
            .collect();

        let Some(snapshot) = snapshot else {
            return Self {
                landmasses,
                ..Self::default()
            };
        };

        let markers: Vec<NodeMarker> = snapshot
            .nodes
            .iter()
            .map(|node| NodeMarker {
                id: node.id.clone(),
                label: node.label(),
                position: projector.project_geo(node.geo.as_ref()),
                color: country_color(
                    node.geo.as_ref().and_then(|g| g.country_code.as_deref()),
                ),
            })
            .collect();

        let positions: HashMap<&str, (f64, f64)> = markers
            .iter()
            .map(|m| (m.id.as_str(), m.position))
            .collect();

        let count = snapshot.channels.len();
        let channels = snapshot
            .channels
            .iter()
            .enumerate()
            .filter_map(|(index, channel)| {
                let from = *positions.get(channel.source.as_str())?;
                let to = *positions.get(channel.target.as_str())?;
                Some(ChannelLine {
                    id: channel.id.clone(),
                    from,
                    to,
                    color: channel_color(index, count),
                })
            })
            .collect();

        Self {
            landmasses,
            channels,
            markers,
        }
    }

    /// Projected position of every node, keyed by id
    pub fn positions(&self) -> HashMap<&str, (f64, f64)> {
        self.markers
            .iter()
            .map(|m| (m.id.as_str(), m.position))
            .collect()
    }

    /// Closest marker within `radius` of `point`, if any
    pub fn marker_at(&self, point: (f64, f64), radius: f64) -> Option<&NodeMarker> {
        self.markers
            .iter()
            .map(|m| {
                let dx = m.position.0 - point.0;
                let dy = m.position.1 - point.1;
                (m, dx * dx + dy * dy)
            })
            .filter(|(_, d2)| *d2 <= radius * radius)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(m, _)| m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::{Channel, Geo, Node};

    fn node(id: &str, geo: Option<(f64, f64, &str)>) -> Node {
        Node {
            id: id.to_string(),
            geo: geo.map(|(lat, lon, cc)| Geo {
                latitude: lat,
                longitude: lon,
                country_code: Some(cc.to_string()),
            }),
        }
    }

    fn snapshot() -> Snapshot {
        Snapshot {
            nodes: vec![
                node("n1", Some((48.8, 2.3, "FR"))),
                node("n2", Some((35.7, 139.7, "JP"))),
                node("n3", None),
            ],
            channels: vec![
                Channel::new("n1", "n2"),
                Channel::new("n2", "n3"),
                Channel::new("n1", "ghost"),
            ],
        }
    }

    #[test]
    fn test_unresolvable_channels_are_skipped() {
        let projector = Projector::fit(&[], 400.0, 200.0);
        let snap = snapshot();
        let list = DrawList::build(Some(&snap), &[], &projector);
        assert_eq!(list.markers.len(), 3);
        assert_eq!(list.channels.len(), 2);
        assert!(list.channels.iter().all(|c| c.id != "n1-ghost"));
    }

    #[test]
    fn test_node_without_geo_sits_at_center() {
        let projector = Projector::fit(&[], 400.0, 200.0);
        let snap = snapshot();
        let list = DrawList::build(Some(&snap), &[], &projector);
        let n3 = list.markers.iter().find(|m| m.id == "n3").unwrap();
        assert_eq!(n3.position, (200.0, 100.0));
        assert_eq!(n3.label, "n3");
        assert_eq!(n3.color, crate::theme::BONE_WHITE);
    }

    #[test]
    fn test_rebuild_is_full_replace() {
        let projector = Projector::fit(&[], 400.0, 200.0);
        let first = DrawList::build(Some(&snapshot()), &[], &projector);
        let again = DrawList::build(Some(&snapshot()), &[], &projector);
        assert_eq!(first, again);

        let empty = DrawList::build(Some(&Snapshot::default()), &[], &projector);
        assert!(empty.markers.is_empty());
        assert!(empty.channels.is_empty());
    }

    #[test]
    fn test_no_snapshot_draws_only_land() {
        let land = vec![Landmass {
            name: None,
            id: None,
            rings: vec![vec![(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]],
        }];
        let projector = Projector::fit(&land, 100.0, 100.0);
        let list = DrawList::build(None, &land, &projector);
        assert_eq!(list.landmasses.len(), 1);
        assert_eq!(list.landmasses[0].len(), 3);
        assert!(list.markers.is_empty());
    }

    #[test]
    fn test_marker_hit_test() {
        let projector = Projector::fit(&[], 400.0, 200.0);
        let list = DrawList::build(Some(&snapshot()), &[], &projector);
        let hit = list.marker_at((201.0, 99.0), 3.0).unwrap();
        assert_eq!(hit.id, "n3");
        assert!(list.marker_at((0.0, 0.0), 1.0).is_none());
    }
}
