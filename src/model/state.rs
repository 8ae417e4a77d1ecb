use std::collections::{BTreeMap, VecDeque};

/// Sentinel cost representing "unreachable" in the distance-vector table.
pub const INF: i64 = 1_000_000_000;

/// Distance-vector routing table: destination -> (cost, next_hop).
/// Invariant: `next_hop` is always a direct neighbor or `self`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DvTable {
    entries: BTreeMap<String, (i64, String)>,
}

impl DvTable {
    /// `{self: (0, self)} ∪ {n: (1, n) for n in neighbors}`.
    pub fn new(self_id: &str, neighbors: impl IntoIterator<Item = String>) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(self_id.to_string(), (0, self_id.to_string()));
        for neighbor in neighbors {
            entries.insert(neighbor.clone(), (1, neighbor));
        }
        Self { entries }
    }

    pub fn cost_to(&self, dest: &str) -> i64 {
        self.entries.get(dest).map(|(cost, _)| *cost).unwrap_or(INF)
    }

    pub fn next_hop(&self, dest: &str) -> Option<&str> {
        self.entries.get(dest).map(|(_, hop)| hop.as_str())
    }

    /// Applies a neighbor's advertised vector. Only candidates that
    /// strictly improve on the current entry are accepted. Returns
    /// whether any entry changed.
    pub fn apply_advertisement(&mut self, sender: &str, vector: &BTreeMap<String, i64>) -> bool {
        let cost_to_sender = self.cost_to(sender);
        if cost_to_sender >= INF {
            return false;
        }

        let mut changed = false;
        for (dest, advertised_cost) in vector {
            let candidate = cost_to_sender.saturating_add(*advertised_cost);
            if candidate < self.cost_to(dest) {
                self.entries
                    .insert(dest.clone(), (candidate, sender.to_string()));
                changed = true;
            }
        }
        changed
    }

    pub fn as_cost_vector(&self) -> BTreeMap<String, i64> {
        self.entries
            .iter()
            .map(|(dest, (cost, _))| (dest.clone(), *cost))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, i64, &str)> {
        self.entries
            .iter()
            .map(|(dest, (cost, hop))| (dest.as_str(), *cost, hop.as_str()))
    }
}

/// Link-state database: origin -> latest `(seq, neighbors)`. Only the
/// highest observed seq per origin is kept.
#[derive(Debug, Clone, Default)]
pub struct Lsdb {
    records: BTreeMap<String, (i64, Vec<String>)>,
}

impl Lsdb {
    /// Stores `(seq, neighbors)` for `origin` if `seq` is newer than
    /// what's known. Returns `true` if the LSDB changed.
    pub fn upsert(&mut self, origin: &str, seq: i64, neighbors: Vec<String>) -> bool {
        if let Some((known_seq, _)) = self.records.get(origin) {
            if seq <= *known_seq {
                return false;
            }
        }
        self.records.insert(origin.to_string(), (seq, neighbors));
        true
    }

    pub fn seq_of(&self, origin: &str) -> Option<i64> {
        self.records.get(origin).map(|(seq, _)| *seq)
    }

    pub fn records(&self) -> impl Iterator<Item = (&str, i64, &[String])> {
        self.records
            .iter()
            .map(|(origin, (seq, neighbors))| (origin.as_str(), *seq, neighbors.as_slice()))
    }
}

/// Bounded seen-set for flood dedup: `(from, ts)` pairs already processed.
/// LRU-evicts the oldest entry once `capacity` is exceeded. `capacity`
/// should be set well above the expected number of floods in flight at
/// once, or legitimate packets risk false "already seen" drops.
#[derive(Debug, Clone)]
pub struct SeenSet {
    capacity: usize,
    order: VecDeque<(String, i64)>,
    members: std::collections::BTreeSet<(String, i64)>,
}

impl SeenSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            order: VecDeque::new(),
            members: std::collections::BTreeSet::new(),
        }
    }

    /// Inserts `id` if not already present. Returns `true` if this is the
    /// first time `id` has been seen (i.e. the caller should process the
    /// packet); `false` if it's a duplicate to be dropped.
    pub fn insert(&mut self, id: (String, i64)) -> bool {
        if !self.members.insert(id.clone()) {
            return false;
        }
        self.order.push_back(id);
        while self.order.len() > self.capacity {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
