//! Connectivity reconstruction.
//!
//! Nets are rebuilt from raw coordinates with a union-find over points:
//! wire endpoints join each other, anything lying on a wire joins that
//! wire, and labels with the same text join across the sheet. Each point
//! then contributes its semantic identifiers to the net it ended up in:
//!
//! - sheet pins as `"<Sheet>:<Pin>"`
//! - labels as `"label:<Text>"`
//! - component pins as `"<Ref>:<Number>"` (power symbols excluded)

pub mod expectations;
pub mod union_find;

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::analyzer::data::SchematicData;
use crate::geometry::Point;

pub use expectations::{check_netlist, ConnectionTable};
pub use union_find::UnionFind;

/// Net membership, one set of identifiers per net.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Netlist {
    nets: Vec<BTreeSet<String>>,
    #[serde(skip)]
    index: HashMap<String, Vec<usize>>,
}

impl Netlist {
    fn from_nets(mut nets: Vec<BTreeSet<String>>) -> Self {
        nets.sort();
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, members) in nets.iter().enumerate() {
            for id in members {
                index.entry(id.clone()).or_default().push(i);
            }
        }
        Self { nets, index }
    }

    /// An id drawn at several points (a duplicated reference) may sit in more
    /// than one net; sharing any of them counts.
    pub fn on_same_net(&self, a: &str, b: &str) -> bool {
        match (self.index.get(a), self.index.get(b)) {
            (Some(na), Some(nb)) => na.iter().any(|n| nb.contains(n)),
            _ => false,
        }
    }

    pub fn id_exists(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// First net containing `id`.
    pub fn net_of(&self, id: &str) -> Option<&BTreeSet<String>> {
        self.index
            .get(id)
            .and_then(|nets| nets.first())
            .map(|&i| &self.nets[i])
    }

    /// Nets in canonical (sorted) order.
    pub fn nets(&self) -> &[BTreeSet<String>] {
        &self.nets
    }

    pub fn len(&self) -> usize {
        self.nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }
}

pub struct NetBuilder;

impl NetBuilder {
    pub fn build(data: &SchematicData) -> Netlist {
        let mut uf: UnionFind<Point> = UnionFind::new();

        // rule 1: a wire joins its two endpoints
        for wire in &data.wires {
            uf.union(&wire.start, &wire.end);
        }

        let ids = Self::identifiers(data);

        let mut points: HashSet<Point> = data.wire_endpoints().collect();
        points.extend(ids.iter().map(|(p, _)| *p));
        points.extend(data.junctions.iter().copied());

        // rule 2: anything lying on a wire, ends included, joins the wire
        for p in &points {
            for wire in data.wires.iter().filter(|w| w.touches(p)) {
                uf.union(p, &wire.start);
            }
        }

        // rule 3: same label text is the same net within the sheet
        let mut by_text: HashMap<&str, Vec<Point>> = HashMap::new();
        for label in &data.labels {
            by_text.entry(label.text.as_str()).or_default().push(label.position);
        }
        for pts in by_text.values() {
            for p in &pts[1..] {
                uf.union(&pts[0], p);
            }
        }

        let mut nets: BTreeMap<Point, BTreeSet<String>> = BTreeMap::new();
        for (p, id) in ids {
            nets.entry(uf.find(&p)).or_default().insert(id);
        }

        let netlist = Netlist::from_nets(nets.into_values().collect());
        tracing::debug!("{}: {} net(s) with identifiers", data.filename, netlist.len());
        netlist
    }

    /// Every identifier with the point it sits on. Several identifiers may
    /// share one point; all are kept.
    fn identifiers(data: &SchematicData) -> Vec<(Point, String)> {
        let sheet_pins = data
            .sheet_pins
            .iter()
            .map(|sp| (sp.position, sp.id.clone()));
        let labels = data
            .labels
            .iter()
            .map(|l| (l.position, format!("label:{}", l.text)));
        let pins = data
            .pins
            .iter()
            .filter(|p| !p.reference.starts_with('#'))
            .map(|p| (p.position, p.id()));
        sheet_pins.chain(labels).chain(pins).collect()
    }
}
