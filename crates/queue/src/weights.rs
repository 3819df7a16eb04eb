//! Weighted queue selection.
//!
//! A dispatcher serving several queues tries them in a weighted random
//! order on every claim: a queue with weight `w` comes first with
//! probability `w / Σw`. Lower-weight queues still get served whenever
//! the heavier ones are empty.

use std::str::FromStr;

use rand::Rng;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueWeightsError {
    #[error("queue list is empty")]
    Empty,

    #[error("invalid queue entry '{0}', expected name:weight")]
    Entry(String),

    #[error("queue '{0}' is listed twice")]
    Duplicate(String),
}

/// Named queues with positive weights.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueWeights {
    queues: Vec<(String, u32)>,
}

impl QueueWeights {
    pub fn new<I, S>(queues: I) -> Result<Self, QueueWeightsError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut out: Vec<(String, u32)> = Vec::new();
        for (name, weight) in queues {
            let name = name.into();
            if name.is_empty() || weight == 0 {
                return Err(QueueWeightsError::Entry(format!("{name}:{weight}")));
            }
            if out.iter().any(|(n, _)| *n == name) {
                return Err(QueueWeightsError::Duplicate(name));
            }
            out.push((name, weight));
        }
        if out.is_empty() {
            return Err(QueueWeightsError::Empty);
        }
        Ok(Self { queues: out })
    }

    /// A single queue with weight 1.
    pub fn single(name: impl Into<String>) -> Self {
        Self {
            queues: vec![(name.into(), 1)],
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.queues.iter().map(|(n, _)| n.as_str())
    }

    /// Weighted random permutation of the queue names.
    pub fn claim_order<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<&str> {
        let mut remaining: Vec<&(String, u32)> = self.queues.iter().collect();
        let mut order = Vec::with_capacity(remaining.len());
        while !remaining.is_empty() {
            let total: u64 = remaining.iter().map(|(_, w)| u64::from(*w)).sum();
            let mut pick = rng.random_range(0..total);
            let mut idx = remaining.len() - 1;
            for (i, (_, w)) in remaining.iter().enumerate() {
                let w = u64::from(*w);
                if pick < w {
                    idx = i;
                    break;
                }
                pick -= w;
            }
            order.push(remaining.remove(idx).0.as_str());
        }
        order
    }
}

impl FromStr for QueueWeights {
    type Err = QueueWeightsError;

    /// Parse `name:weight,name:weight`. A bare `name` has weight 1.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut entries = Vec::new();
        for entry in s.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (name, weight) = match entry.split_once(':') {
                Some((name, weight)) => {
                    let weight = weight
                        .trim()
                        .parse::<u32>()
                        .map_err(|_| QueueWeightsError::Entry(entry.to_string()))?;
                    (name.trim().to_string(), weight)
                }
                None => (entry.to_string(), 1),
            };
            entries.push((name, weight));
        }
        Self::new(entries)
    }
}
