//! CART regression tree.
//!
//! Supports four split criteria (squared error, Friedman's improvement score,
//! absolute error and half Poisson deviance), a `best` or `random` splitter,
//! and per-node feature subsampling. All randomness comes from a `ChaCha8Rng`
//! seeded with `random_state`, so a given seed and data order always grow the
//! same tree.

use std::cmp::Ordering;
use std::str::FromStr;

use ndarray::{Array1, ArrayView1, ArrayView2};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::models::params::{ParamSet, ParamValue};
use crate::models::regressor_trait::{check_fit_input, check_predict_input, Regressor};

pub const KIND: &str = "decision_tree";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    SquaredError,
    FriedmanMse,
    AbsoluteError,
    Poisson,
}

impl Criterion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::SquaredError => "squared_error",
            Criterion::FriedmanMse => "friedman_mse",
            Criterion::AbsoluteError => "absolute_error",
            Criterion::Poisson => "poisson",
        }
    }
}

impl FromStr for Criterion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "squared_error" => Ok(Criterion::SquaredError),
            "friedman_mse" => Ok(Criterion::FriedmanMse),
            "absolute_error" => Ok(Criterion::AbsoluteError),
            "poisson" => Ok(Criterion::Poisson),
            _ => Err(format!(
                "unknown criterion '{}', expected one of squared_error, friedman_mse, absolute_error, poisson",
                s
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Splitter {
    Best,
    Random,
}

impl Splitter {
    pub fn as_str(&self) -> &'static str {
        match self {
            Splitter::Best => "best",
            Splitter::Random => "random",
        }
    }
}

impl FromStr for Splitter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "best" => Ok(Splitter::Best),
            "random" => Ok(Splitter::Random),
            _ => Err(format!("unknown splitter '{}', expected best or random", s)),
        }
    }
}

/// Number of features examined when looking for a split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaxFeatures {
    All,
    Sqrt,
    Log2,
    Count(usize),
    Fraction(f64),
}

impl MaxFeatures {
    fn from_param(name: &str, value: &ParamValue) -> Result<Self, ModelError> {
        match value {
            ParamValue::Null => Ok(MaxFeatures::All),
            ParamValue::Str(s) => match s.to_lowercase().as_str() {
                "sqrt" => Ok(MaxFeatures::Sqrt),
                "log2" => Ok(MaxFeatures::Log2),
                other => Err(ModelError::invalid_param(
                    name,
                    format!("expected sqrt, log2, an integer, a fraction or null, got '{}'", other),
                )),
            },
            ParamValue::Int(k) if *k >= 1 => Ok(MaxFeatures::Count(*k as usize)),
            ParamValue::Float(f) if *f > 0.0 && *f <= 1.0 => Ok(MaxFeatures::Fraction(*f)),
            other => Err(ModelError::invalid_param(
                name,
                format!("unsupported value {}", other),
            )),
        }
    }

    fn to_param(&self) -> ParamValue {
        match self {
            MaxFeatures::All => ParamValue::Null,
            MaxFeatures::Sqrt => "sqrt".into(),
            MaxFeatures::Log2 => "log2".into(),
            MaxFeatures::Count(k) => ParamValue::Int(*k as i64),
            MaxFeatures::Fraction(f) => ParamValue::Float(*f),
        }
    }

    fn resolve(&self, n_features: usize) -> Result<usize, ModelError> {
        let n = n_features as f64;
        let k = match self {
            MaxFeatures::All => n_features,
            MaxFeatures::Sqrt => (n.sqrt().floor() as usize).max(1),
            MaxFeatures::Log2 => (n.log2().floor() as usize).max(1),
            MaxFeatures::Count(k) => {
                if *k > n_features {
                    return Err(ModelError::invalid_param(
                        "max_features",
                        format!("{} exceeds the number of features ({})", k, n_features),
                    ));
                }
                *k
            }
            MaxFeatures::Fraction(f) => ((f * n).floor() as usize).max(1),
        };
        Ok(k)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Node {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Regression tree with CART-style binary splits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTreeRegressor {
    pub criterion: Criterion,
    pub splitter: Splitter,
    pub max_features: MaxFeatures,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub random_state: u64,
    nodes: Vec<Node>,
    n_features: Option<usize>,
}

impl Default for DecisionTreeRegressor {
    fn default() -> Self {
        Self {
            criterion: Criterion::SquaredError,
            splitter: Splitter::Best,
            max_features: MaxFeatures::All,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            random_state: 0,
            nodes: Vec::new(),
            n_features: None,
        }
    }
}

impl DecisionTreeRegressor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        if self.nodes.is_empty() {
            0
        } else {
            walk(&self.nodes, 0)
        }
    }

    fn predict_row(&self, row: ArrayView1<f64>) -> f64 {
        let mut idx = 0usize;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value, .. } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }
}

impl Regressor for DecisionTreeRegressor {
    fn kind(&self) -> &'static str {
        KIND
    }

    fn set_param(&mut self, name: &str, value: &ParamValue) -> Result<(), ModelError> {
        match name {
            "criterion" => {
                self.criterion = Criterion::from_str(value.as_str(name)?)
                    .map_err(|e| ModelError::invalid_param(name, e))?
            }
            "splitter" => {
                self.splitter = Splitter::from_str(value.as_str(name)?)
                    .map_err(|e| ModelError::invalid_param(name, e))?
            }
            "max_features" => self.max_features = MaxFeatures::from_param(name, value)?,
            "max_depth" => {
                let depth = value.as_optional_usize(name)?;
                if depth == Some(0) {
                    return Err(ModelError::invalid_param(name, "must be at least 1"));
                }
                self.max_depth = depth;
            }
            "min_samples_split" => {
                let v = value.as_usize(name)?;
                if v < 2 {
                    return Err(ModelError::invalid_param(name, "must be at least 2"));
                }
                self.min_samples_split = v;
            }
            "min_samples_leaf" => {
                let v = value.as_usize(name)?;
                if v < 1 {
                    return Err(ModelError::invalid_param(name, "must be at least 1"));
                }
                self.min_samples_leaf = v;
            }
            "random_state" => self.random_state = value.as_usize(name)? as u64,
            _ => {
                return Err(ModelError::invalid_param(
                    name,
                    "not a DecisionTreeRegressor parameter",
                ))
            }
        }
        Ok(())
    }

    fn params(&self) -> ParamSet {
        let mut params = ParamSet::new();
        params.insert("criterion".to_string(), self.criterion.as_str().into());
        params.insert("splitter".to_string(), self.splitter.as_str().into());
        params.insert("max_features".to_string(), self.max_features.to_param());
        params.insert(
            "max_depth".to_string(),
            self.max_depth
                .map(|d| ParamValue::Int(d as i64))
                .unwrap_or(ParamValue::Null),
        );
        params.insert(
            "min_samples_split".to_string(),
            ParamValue::Int(self.min_samples_split as i64),
        );
        params.insert(
            "min_samples_leaf".to_string(),
            ParamValue::Int(self.min_samples_leaf as i64),
        );
        params.insert(
            "random_state".to_string(),
            ParamValue::Int(self.random_state as i64),
        );
        params
    }

    fn fit(&mut self, x: ArrayView2<f64>, y: ArrayView1<f64>) -> Result<(), ModelError> {
        check_fit_input(&x, &y)?;

        if self.criterion == Criterion::Poisson {
            if y.iter().any(|v| *v < 0.0) {
                return Err(ModelError::InvalidInput(
                    "poisson criterion requires non-negative targets".to_string(),
                ));
            }
            if y.sum() <= 0.0 {
                return Err(ModelError::InvalidInput(
                    "poisson criterion requires a positive sum of targets".to_string(),
                ));
            }
        }

        let mut builder = TreeBuilder {
            x: x.view(),
            y: y.view(),
            criterion: self.criterion,
            splitter: self.splitter,
            max_features: self.max_features.resolve(x.ncols())?,
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
            rng: ChaCha8Rng::seed_from_u64(self.random_state),
            nodes: Vec::new(),
        };

        let indices: Vec<usize> = (0..x.nrows()).collect();
        builder.build(indices, 0);

        self.nodes = builder.nodes;
        self.n_features = Some(x.ncols());

        log::trace!(
            "DecisionTreeRegressor fitted: {} nodes, {} leaves, depth {}",
            self.nodes.len(),
            self.n_leaves(),
            self.depth()
        );
        Ok(())
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>, ModelError> {
        let n_features = self.n_features.ok_or(ModelError::NotFitted)?;
        check_predict_input(&x, n_features)?;
        Ok(x.outer_iter().map(|row| self.predict_row(row)).collect())
    }

    fn fresh(&self) -> Box<dyn Regressor> {
        Box::new(DecisionTreeRegressor {
            nodes: Vec::new(),
            n_features: None,
            ..self.clone()
        })
    }

    fn state(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

struct SplitChoice {
    feature: usize,
    threshold: f64,
    improvement: f64,
}

struct TreeBuilder<'a> {
    x: ArrayView2<'a, f64>,
    y: ArrayView1<'a, f64>,
    criterion: Criterion,
    splitter: Splitter,
    max_features: usize,
    max_depth: Option<usize>,
    min_samples_split: usize,
    min_samples_leaf: usize,
    rng: ChaCha8Rng,
    nodes: Vec<Node>,
}

impl<'a> TreeBuilder<'a> {
    fn build(&mut self, indices: Vec<usize>, depth: usize) -> usize {
        let targets: Vec<f64> = indices.iter().map(|&i| self.y[i]).collect();
        let node_idx = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: leaf_value(self.criterion, &targets),
            n_samples: targets.len(),
        });

        let n = indices.len();
        let constant = targets
            .iter()
            .all(|v| (*v - targets[0]).abs() <= f64::EPSILON);
        let stop = n < self.min_samples_split
            || n < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || constant;
        if stop {
            return node_idx;
        }

        let choice = match self.find_split(&indices) {
            Some(choice) => choice,
            None => return node_idx,
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| self.x[[i, choice.feature]] <= choice.threshold);

        log::trace!(
            "depth {}: split feature {} at {} ({} | {}), improvement {}",
            depth,
            choice.feature,
            choice.threshold,
            left_idx.len(),
            right_idx.len(),
            choice.improvement
        );

        let left = self.build(left_idx, depth + 1);
        let right = self.build(right_idx, depth + 1);
        self.nodes[node_idx] = Node::Split {
            feature: choice.feature,
            threshold: choice.threshold,
            left,
            right,
        };
        node_idx
    }

    /// Visit features in a random order. At least `max_features` non-constant
    /// features are examined; the scan continues past that only until some
    /// valid split has been found.
    fn find_split(&mut self, indices: &[usize]) -> Option<SplitChoice> {
        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        features.shuffle(&mut self.rng);

        let mut best: Option<SplitChoice> = None;
        let mut visited = 0usize;

        for feature in features {
            if visited >= self.max_features && best.is_some() {
                break;
            }

            let mut pairs: Vec<(f64, f64)> = indices
                .iter()
                .map(|&i| (self.x[[i, feature]], self.y[i]))
                .collect();
            pairs.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(Ordering::Equal));

            let lo = pairs[0].0;
            let hi = pairs[pairs.len() - 1].0;
            if hi <= lo {
                continue;
            }
            visited += 1;

            let candidate = match self.splitter {
                Splitter::Best => self.best_threshold(&pairs),
                Splitter::Random => {
                    let u: f64 = self.rng.gen();
                    // convex combination, `hi - lo` may overflow
                    let mut threshold = lo * (1.0 - u) + hi * u;
                    if !(threshold >= lo && threshold < hi) {
                        threshold = lo;
                    }
                    self.evaluate_threshold(&pairs, threshold)
                        .map(|improvement| (threshold, improvement))
                }
            };

            if let Some((threshold, improvement)) = candidate {
                let better = best
                    .as_ref()
                    .map_or(true, |b| improvement > b.improvement);
                if better {
                    best = Some(SplitChoice {
                        feature,
                        threshold,
                        improvement,
                    });
                }
            }
        }

        best
    }

    /// Scan every boundary between distinct sorted values.
    fn best_threshold(&self, pairs: &[(f64, f64)]) -> Option<(f64, f64)> {
        let n = pairs.len();
        let targets: Vec<f64> = pairs.iter().map(|p| p.1).collect();
        let parent = NodeStats::from_slice(&targets);
        let parent_loss = self.loss(&parent, &sorted_copy(&targets));

        let mut left = NodeStats::default();
        let mut right = parent.clone();
        // sorted copies of child targets, only needed for absolute error
        let track_order = self.criterion == Criterion::AbsoluteError;
        let mut left_sorted: Vec<f64> = Vec::new();
        let mut right_sorted: Vec<f64> = if track_order {
            sorted_copy(&targets)
        } else {
            Vec::new()
        };

        let mut best: Option<(f64, f64)> = None;

        for k in 1..n {
            let moved = pairs[k - 1].1;
            left.push(moved);
            right.pop(moved);
            if track_order {
                let pos = left_sorted
                    .binary_search_by(|v| v.partial_cmp(&moved).unwrap_or(Ordering::Equal))
                    .unwrap_or_else(|p| p);
                left_sorted.insert(pos, moved);
                if let Ok(pos) = right_sorted
                    .binary_search_by(|v| v.partial_cmp(&moved).unwrap_or(Ordering::Equal))
                {
                    right_sorted.remove(pos);
                }
            }

            if k < self.min_samples_leaf || n - k < self.min_samples_leaf {
                continue;
            }
            if pairs[k - 1].0 >= pairs[k].0 {
                continue;
            }

            let improvement = match self.improvement(
                parent_loss,
                (&left, &left_sorted),
                (&right, &right_sorted),
            ) {
                Some(v) => v,
                None => continue,
            };

            if best.map_or(true, |(_, b)| improvement > b) {
                let mut threshold = 0.5 * pairs[k - 1].0 + 0.5 * pairs[k].0;
                if threshold >= pairs[k].0 {
                    threshold = pairs[k - 1].0;
                }
                best = Some((threshold, improvement));
            }
        }

        best
    }

    fn evaluate_threshold(&self, pairs: &[(f64, f64)], threshold: f64) -> Option<f64> {
        let targets: Vec<f64> = pairs.iter().map(|p| p.1).collect();
        let parent = NodeStats::from_slice(&targets);
        let parent_loss = self.loss(&parent, &sorted_copy(&targets));

        let mut left_values: Vec<f64> = Vec::new();
        let mut right_values: Vec<f64> = Vec::new();
        for &(v, t) in pairs {
            if v <= threshold {
                left_values.push(t);
            } else {
                right_values.push(t);
            }
        }
        if left_values.len() < self.min_samples_leaf || right_values.len() < self.min_samples_leaf {
            return None;
        }

        let left = NodeStats::from_slice(&left_values);
        let right = NodeStats::from_slice(&right_values);
        let (left_sorted, right_sorted) = (sorted_copy(&left_values), sorted_copy(&right_values));
        self.improvement(parent_loss, (&left, &left_sorted), (&right, &right_sorted))
    }

    /// Decrease in loss from splitting, `None` when the split is not allowed.
    fn improvement(
        &self,
        parent_loss: f64,
        left: (&NodeStats, &[f64]),
        right: (&NodeStats, &[f64]),
    ) -> Option<f64> {
        match self.criterion {
            Criterion::FriedmanMse => {
                let (l, r) = (left.0, right.0);
                let n = (l.count + r.count) as f64;
                let diff = l.mean() - r.mean();
                Some(l.count as f64 * r.count as f64 / n * diff * diff)
            }
            Criterion::Poisson => {
                if left.0.sum <= f64::EPSILON || right.0.sum <= f64::EPSILON {
                    return None;
                }
                Some(parent_loss - self.loss(left.0, left.1) - self.loss(right.0, right.1))
            }
            _ => Some(parent_loss - self.loss(left.0, left.1) - self.loss(right.0, right.1)),
        }
    }

    /// Total (not averaged) node loss under the configured criterion.
    /// `sorted` must hold the node targets in ascending order for absolute error.
    fn loss(&self, stats: &NodeStats, sorted: &[f64]) -> f64 {
        match self.criterion {
            Criterion::SquaredError | Criterion::FriedmanMse => stats.sum_sq_dev(),
            Criterion::Poisson => {
                if stats.sum <= 0.0 {
                    0.0
                } else {
                    stats.sum_y_ln_y - stats.sum * (stats.sum / stats.count as f64).ln()
                }
            }
            Criterion::AbsoluteError => {
                let m = median_of_sorted(sorted);
                sorted.iter().map(|v| (v - m).abs()).sum()
            }
        }
    }
}

/// Running sums for one side of a split.
#[derive(Debug, Clone, Default)]
struct NodeStats {
    count: usize,
    sum: f64,
    sum_sq: f64,
    sum_y_ln_y: f64,
}

impl NodeStats {
    fn from_slice(values: &[f64]) -> Self {
        let mut stats = NodeStats::default();
        for &v in values {
            stats.push(v);
        }
        stats
    }

    fn push(&mut self, v: f64) {
        self.count += 1;
        self.sum += v;
        self.sum_sq += v * v;
        self.sum_y_ln_y += y_ln_y(v);
    }

    fn pop(&mut self, v: f64) {
        self.count -= 1;
        self.sum -= v;
        self.sum_sq -= v * v;
        self.sum_y_ln_y -= y_ln_y(v);
    }

    fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / self.count as f64
        }
    }

    fn sum_sq_dev(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            (self.sum_sq - self.sum * self.sum / self.count as f64).max(0.0)
        }
    }
}

fn y_ln_y(v: f64) -> f64 {
    if v > 0.0 {
        v * v.ln()
    } else {
        0.0
    }
}

fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

fn median_of_sorted(sorted: &[f64]) -> f64 {
    let n = sorted.len();
    if n == 0 {
        0.0
    } else if n % 2 == 1 {
        sorted[n / 2]
    } else {
        0.5 * (sorted[n / 2 - 1] + sorted[n / 2])
    }
}

fn leaf_value(criterion: Criterion, targets: &[f64]) -> f64 {
    match criterion {
        Criterion::AbsoluteError => median_of_sorted(&sorted_copy(targets)),
        _ => NodeStats::from_slice(targets).mean(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn step_data() -> (Array2<f64>, Array1<f64>) {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|v| if *v < 10.0 { 1.0 } else { 5.0 }).collect();
        (
            Array2::from_shape_vec((20, 1), x).unwrap(),
            Array1::from_vec(y),
        )
    }

    #[test]
    fn fits_step_function_with_every_criterion() {
        let (x, y) = step_data();
        for criterion in ["squared_error", "friedman_mse", "absolute_error", "poisson"] {
            let mut tree = DecisionTreeRegressor::new();
            tree.set_param("criterion", &ParamValue::from(criterion)).unwrap();
            tree.fit(x.view(), y.view()).unwrap();
            let preds = tree.predict(x.view()).unwrap();
            for (p, t) in preds.iter().zip(y.iter()) {
                assert!((p - t).abs() < 1e-9, "{}: {} vs {}", criterion, p, t);
            }
        }
    }

    #[test]
    fn best_splitter_places_threshold_between_classes() {
        let (x, y) = step_data();
        let mut tree = DecisionTreeRegressor::new();
        tree.fit(x.view(), y.view()).unwrap();
        assert_eq!(tree.depth(), 1);
        assert_eq!(tree.n_leaves(), 2);
        match &tree.nodes[0] {
            Node::Split { threshold, .. } => assert!((threshold - 9.5).abs() < 1e-12),
            other => panic!("expected root split, got {:?}", other),
        }
    }

    #[test]
    fn random_splitter_is_seed_deterministic() {
        let x = Array2::from_shape_fn((40, 3), |(i, j)| ((i * 7 + j * 13) % 17) as f64);
        let y = Array1::from_shape_fn(40, |i| (i % 5) as f64 + 0.5);

        let mut a = DecisionTreeRegressor::new();
        a.set_param("splitter", &"random".into()).unwrap();
        a.set_param("max_features", &"sqrt".into()).unwrap();
        let mut b = a.fresh();

        a.fit(x.view(), y.view()).unwrap();
        b.fit(x.view(), y.view()).unwrap();
        assert_eq!(a.predict(x.view()).unwrap(), b.predict(x.view()).unwrap());
    }

    #[test]
    fn splitters_handle_extreme_feature_range() {
        let x = Array2::from_shape_vec((4, 1), vec![-1e308, -1e307, 1e307, 1e308]).unwrap();
        let y = Array1::from_vec(vec![0.0, 0.0, 1.0, 1.0]);
        for splitter in ["random", "best"] {
            let mut tree = DecisionTreeRegressor::new();
            tree.set_param("splitter", &splitter.into()).unwrap();
            tree.fit(x.view(), y.view()).unwrap();
            let preds = tree.predict(x.view()).unwrap();
            assert!(preds.iter().all(|p| p.is_finite()), "{}: {:?}", splitter, preds);
            assert!(tree.n_leaves() >= 2, "{} did not split", splitter);
        }

        let x = Array2::from_shape_vec((2, 1), vec![1.5e308, 1.6e308]).unwrap();
        let y = Array1::from_vec(vec![0.0, 1.0]);
        let mut tree = DecisionTreeRegressor::new();
        tree.fit(x.view(), y.view()).unwrap();
        assert_eq!(tree.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn max_depth_limits_growth() {
        let x = Array2::from_shape_fn((32, 1), |(i, _)| i as f64);
        let y = Array1::from_shape_fn(32, |i| (i * i) as f64);
        let mut tree = DecisionTreeRegressor::new();
        tree.set_param("max_depth", &ParamValue::Int(2)).unwrap();
        tree.fit(x.view(), y.view()).unwrap();
        assert!(tree.depth() <= 2);
        assert!(tree.n_leaves() <= 4);
    }

    #[test]
    fn absolute_error_leaf_is_median() {
        let x = Array2::from_shape_vec((3, 1), vec![1.0, 1.0, 1.0]).unwrap();
        let y = Array1::from_vec(vec![1.0, 2.0, 10.0]);
        let mut tree = DecisionTreeRegressor::new();
        tree.set_param("criterion", &"absolute_error".into()).unwrap();
        tree.fit(x.view(), y.view()).unwrap();
        assert_eq!(tree.predict(x.view()).unwrap()[0], 2.0);
    }

    #[test]
    fn poisson_rejects_negative_targets() {
        let x = Array2::from_shape_vec((3, 1), vec![1.0, 2.0, 3.0]).unwrap();
        let y = Array1::from_vec(vec![1.0, -2.0, 3.0]);
        let mut tree = DecisionTreeRegressor::new();
        tree.set_param("criterion", &"poisson".into()).unwrap();
        assert!(matches!(
            tree.fit(x.view(), y.view()),
            Err(ModelError::InvalidInput(_))
        ));
    }

    #[test]
    fn max_features_resolution() {
        assert_eq!(MaxFeatures::Sqrt.resolve(10).unwrap(), 3);
        assert_eq!(MaxFeatures::Log2.resolve(10).unwrap(), 3);
        assert_eq!(MaxFeatures::Log2.resolve(1).unwrap(), 1);
        assert_eq!(MaxFeatures::Fraction(0.5).resolve(5).unwrap(), 2);
        assert!(MaxFeatures::Count(4).resolve(3).is_err());
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        let mut tree = DecisionTreeRegressor::new();
        assert!(tree.set_param("criterion", &"gini".into()).is_err());
        assert!(tree.set_param("splitter", &ParamValue::Int(1)).is_err());
        assert!(tree.set_param("min_samples_split", &ParamValue::Int(1)).is_err());
        assert!(tree.set_param("n_estimators", &ParamValue::Int(10)).is_err());
    }

    #[test]
    fn state_round_trips() {
        let (x, y) = step_data();
        let mut tree = DecisionTreeRegressor::new();
        tree.fit(x.view(), y.view()).unwrap();
        let restored: DecisionTreeRegressor =
            serde_json::from_value(tree.state().unwrap()).unwrap();
        assert_eq!(
            tree.predict(x.view()).unwrap(),
            restored.predict(x.view()).unwrap()
        );
    }
}
