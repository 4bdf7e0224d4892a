//! Random forest of Gini decision trees.
//!
//! Each tree is grown on a bootstrap sample and considers `ceil(sqrt(d))`
//! randomly chosen features per split. Leaves store the fraction of positive
//! samples, and the forest probability is the mean over trees.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

const MIN_SAMPLES_SPLIT: usize = 2;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "lowercase")]
enum Node {
    Leaf {
        p: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    trees: Vec<DecisionTree>,
}

struct Grower<'a> {
    rows: &'a [&'a [f64]],
    labels: &'a [u8],
    max_depth: usize,
    max_features: usize,
    rng: StdRng,
    nodes: Vec<Node>,
}

impl RandomForest {
    pub fn fit(
        rows: &[&[f64]],
        labels: &[u8],
        n_trees: usize,
        max_depth: usize,
        seed: u64,
    ) -> EngineResult<Self> {
        if rows.is_empty() || rows.len() != labels.len() {
            return Err(EngineError::Validation(
                "random forest needs matching, non-empty rows and labels".into(),
            ));
        }
        if n_trees == 0 {
            return Err(EngineError::Validation("random forest needs at least one tree".into()));
        }
        let n_features = rows[0].len();
        let max_features = ((n_features as f64).sqrt().ceil() as usize).clamp(1, n_features.max(1));
        let mut rng = StdRng::seed_from_u64(seed);

        let mut trees = Vec::with_capacity(n_trees);
        for _ in 0..n_trees {
            let sample: Vec<usize> = (0..rows.len())
                .map(|_| rng.random_range(0..rows.len()))
                .collect();
            let mut grower = Grower {
                rows,
                labels,
                max_depth,
                max_features,
                rng: StdRng::seed_from_u64(rng.random()),
                nodes: Vec::new(),
            };
            grower.grow(sample, 0);
            trees.push(DecisionTree {
                nodes: grower.nodes,
            });
        }

        Ok(Self { n_features, trees })
    }

    pub fn predict_proba(&self, x: &[f64]) -> EngineResult<f64> {
        if x.len() != self.n_features {
            return Err(EngineError::ModelFault(format!(
                "forest expects {} features, got {}",
                self.n_features,
                x.len()
            )));
        }
        if self.trees.is_empty() {
            return Err(EngineError::ModelFault("forest has no trees".into()));
        }
        let mut sum = 0.0;
        for tree in &self.trees {
            sum += tree.predict(x)?;
        }
        Ok(sum / self.trees.len() as f64)
    }
}

impl DecisionTree {
    fn predict(&self, x: &[f64]) -> EngineResult<f64> {
        let mut idx = 0;
        // Bounded walk: a well-formed tree never revisits a node.
        for _ in 0..=self.nodes.len() {
            match self.nodes.get(idx) {
                Some(Node::Leaf { p }) => return Ok(*p),
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let v = x
                        .get(*feature)
                        .ok_or_else(|| EngineError::ModelFault(format!("split on missing feature {feature}")))?;
                    idx = if *v <= *threshold { *left } else { *right };
                }
                None => break,
            }
        }
        Err(EngineError::ModelFault("malformed decision tree".into()))
    }
}

impl Grower<'_> {
    /// Grow a subtree over `idx` and return its node index.
    fn grow(&mut self, idx: Vec<usize>, depth: usize) -> usize {
        let positives = idx.iter().filter(|&&i| self.labels[i] == 1).count();
        let p = positives as f64 / idx.len().max(1) as f64;

        let pure = positives == 0 || positives == idx.len();
        if pure || depth >= self.max_depth || idx.len() < MIN_SAMPLES_SPLIT {
            return self.push(Node::Leaf { p });
        }
        let Some((feature, threshold)) = self.best_split(&idx, positives) else {
            return self.push(Node::Leaf { p });
        };

        let (l, r): (Vec<usize>, Vec<usize>) = idx
            .into_iter()
            .partition(|&i| self.rows[i][feature] <= threshold);

        // Reserve the split slot before children so the root stays at index 0.
        let at = self.push(Node::Leaf { p });
        let left = self.grow(l, depth + 1);
        let right = self.grow(r, depth + 1);
        self.nodes[at] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        at
    }

    fn push(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn best_split(&mut self, idx: &[usize], positives: usize) -> Option<(usize, f64)> {
        let n_features = self.rows[idx[0]].len();
        let mut candidates: Vec<usize> = (0..n_features).collect();
        candidates.shuffle(&mut self.rng);
        candidates.truncate(self.max_features);

        let n = idx.len() as f64;
        let parent = gini(positives as f64, n);
        let mut best: Option<(usize, f64, f64)> = None;

        let mut order = idx.to_vec();
        for &f in &candidates {
            order.sort_by(|&a, &b| self.rows[a][f].total_cmp(&self.rows[b][f]));
            let mut left_pos = 0.0;
            for k in 0..order.len() - 1 {
                left_pos += f64::from(self.labels[order[k]]);
                let here = self.rows[order[k]][f];
                let next = self.rows[order[k + 1]][f];
                if here == next {
                    continue;
                }
                let nl = (k + 1) as f64;
                let nr = n - nl;
                let right_pos = positives as f64 - left_pos;
                let weighted = (nl * gini(left_pos, nl) + nr * gini(right_pos, nr)) / n;
                let gain = parent - weighted;
                if gain > 1e-12 && best.map_or(true, |(_, _, g)| gain > g) {
                    best = Some((f, (here + next) / 2.0, gain));
                }
            }
        }
        best.map(|(f, t, _)| (f, t))
    }
}

fn gini(pos: f64, n: f64) -> f64 {
    if n <= 0.0 {
        return 0.0;
    }
    let p = pos / n;
    2.0 * p * (1.0 - p)
}
