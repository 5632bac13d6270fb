//! Bagged decision-tree ensembles, trained fresh per request.
//!
//! Trees are grown CART-style: regression splits minimise within-node sum of
//! squares, classification splits minimise Gini impurity. Each tree trains
//! on a bootstrap sample drawn from a single seeded [`StdRng`], so a given
//! (data, params) pair always yields the same forest. Split scans run over
//! per-feature sorted orderings with running sums, O(n) per feature per
//! node.

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};

// ─── Parameters ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct ForestParams {
  pub trees:             usize,
  pub max_depth:         usize,
  pub min_samples_split: usize,
  pub min_samples_leaf:  usize,
  pub seed:              u64,
}

impl ForestParams {
  /// Fixed hyperparameters of the occupancy regressor.
  pub fn regression() -> Self {
    Self {
      trees:             100,
      max_depth:         15,
      min_samples_split: 5,
      min_samples_leaf:  2,
      seed:              42,
    }
  }

  /// Fixed hyperparameters of the next-location classifier.
  pub fn classification() -> Self {
    Self {
      trees:             50,
      max_depth:         32,
      min_samples_split: 2,
      min_samples_leaf:  1,
      seed:              42,
    }
  }
}

// ─── Tree ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Node {
  Leaf {
    value: f64,
  },
  Split {
    feature:   usize,
    threshold: f64,
    left:      usize,
    right:     usize,
  },
}

#[derive(Debug, Clone)]
struct Tree {
  nodes: Vec<Node>,
}

impl Tree {
  fn predict(&self, row: &[f64]) -> f64 {
    let mut at = 0;
    loop {
      match &self.nodes[at] {
        Node::Leaf { value } => return *value,
        Node::Split { feature, threshold, left, right } => {
          at = if row[*feature] <= *threshold { *left } else { *right };
        }
      }
    }
  }
}

/// The best split found for one node, if any.
struct SplitChoice {
  feature:   usize,
  threshold: f64,
  score:     f64,
}

// ─── Regression ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RegressionForest {
  trees: Vec<Tree>,
}

impl RegressionForest {
  /// Train on `x` (row-major feature matrix) against `y`.
  /// Panics in debug builds if `x` and `y` disagree in length; callers
  /// construct both from the same sample iteration.
  pub fn fit(x: &[Vec<f64>], y: &[f64], params: ForestParams) -> Self {
    debug_assert_eq!(x.len(), y.len());
    let mut rng = StdRng::seed_from_u64(params.seed);
    let n = x.len();

    let trees = (0..params.trees)
      .map(|_| {
        let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
        let mut nodes = Vec::new();
        grow_regression(x, y, sample, 0, &params, &mut nodes);
        Tree { nodes }
      })
      .collect();

    Self { trees }
  }

  /// Mean of the per-tree predictions.
  pub fn predict(&self, row: &[f64]) -> f64 {
    let sum: f64 = self.trees.iter().map(|t| t.predict(row)).sum();
    sum / self.trees.len() as f64
  }
}

fn grow_regression(
  x: &[Vec<f64>],
  y: &[f64],
  indices: Vec<usize>,
  depth: usize,
  params: &ForestParams,
  nodes: &mut Vec<Node>,
) -> usize {
  let n = indices.len();
  let mean = indices.iter().map(|&i| y[i]).sum::<f64>() / n as f64;

  let at_limit = depth >= params.max_depth || n < params.min_samples_split;
  let split = if at_limit {
    None
  } else {
    best_regression_split(x, y, &indices, params.min_samples_leaf)
  };

  match split {
    None => {
      nodes.push(Node::Leaf { value: mean });
      nodes.len() - 1
    }
    Some(choice) => {
      let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| x[i][choice.feature] <= choice.threshold);

      let left = grow_regression(x, y, left_idx, depth + 1, params, nodes);
      let right = grow_regression(x, y, right_idx, depth + 1, params, nodes);
      nodes.push(Node::Split {
        feature: choice.feature,
        threshold: choice.threshold,
        left,
        right,
      });
      nodes.len() - 1
    }
  }
}

/// Scan every feature for the threshold minimising within-node sum of
/// squares. Returns `None` when no threshold separates the samples with
/// both sides at least `min_leaf` large, or the node is already pure.
fn best_regression_split(
  x: &[Vec<f64>],
  y: &[f64],
  indices: &[usize],
  min_leaf: usize,
) -> Option<SplitChoice> {
  let n = indices.len();
  let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
  let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
  let base_sse = total_sq - total_sum * total_sum / n as f64;
  if base_sse <= f64::EPSILON {
    return None; // pure node
  }

  let n_features = x[indices[0]].len();
  let mut best: Option<SplitChoice> = None;

  for feature in 0..n_features {
    let mut order: Vec<usize> = indices.to_vec();
    order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

    let mut left_sum = 0.0;
    let mut left_sq = 0.0;
    for (k, &i) in order.iter().enumerate().take(n - 1) {
      left_sum += y[i];
      left_sq += y[i] * y[i];
      let left_n = k + 1;
      let right_n = n - left_n;

      // No threshold exists between equal feature values.
      let here = x[i][feature];
      let next = x[order[k + 1]][feature];
      if here == next || left_n < min_leaf || right_n < min_leaf {
        continue;
      }

      let right_sum = total_sum - left_sum;
      let right_sq = total_sq - left_sq;
      let sse = (left_sq - left_sum * left_sum / left_n as f64)
        + (right_sq - right_sum * right_sum / right_n as f64);

      if best.as_ref().is_none_or(|b| sse < b.score) {
        best = Some(SplitChoice {
          feature,
          threshold: (here + next) / 2.0,
          score: sse,
        });
      }
    }
  }

  best
}

// ─── Classification ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct ClassificationForest {
  trees:     Vec<Tree>,
  n_classes: usize,
}

impl ClassificationForest {
  /// Train on `x` against class labels `y` in `0..n_classes`. Each split
  /// considers a random sqrt-sized feature subset, per the usual bagged
  /// classifier construction.
  pub fn fit(x: &[Vec<f64>], y: &[usize], n_classes: usize, params: ForestParams) -> Self {
    debug_assert_eq!(x.len(), y.len());
    let mut rng = StdRng::seed_from_u64(params.seed);
    let n = x.len();

    let trees = (0..params.trees)
      .map(|_| {
        let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
        let mut nodes = Vec::new();
        grow_classification(x, y, n_classes, sample, 0, &params, &mut rng, &mut nodes);
        Tree { nodes }
      })
      .collect();

    Self { trees, n_classes }
  }

  /// Majority vote across trees; ties break to the lowest class index.
  pub fn predict(&self, row: &[f64]) -> usize {
    let mut votes = vec![0usize; self.n_classes];
    for tree in &self.trees {
      votes[tree.predict(row) as usize] += 1;
    }
    votes
      .iter()
      .enumerate()
      .max_by_key(|&(class, count)| (*count, std::cmp::Reverse(class)))
      .map(|(class, _)| class)
      .unwrap_or(0)
  }
}

#[allow(clippy::too_many_arguments)]
fn grow_classification(
  x: &[Vec<f64>],
  y: &[usize],
  n_classes: usize,
  indices: Vec<usize>,
  depth: usize,
  params: &ForestParams,
  rng: &mut StdRng,
  nodes: &mut Vec<Node>,
) -> usize {
  let n = indices.len();
  let mut counts = vec![0usize; n_classes];
  for &i in &indices {
    counts[y[i]] += 1;
  }
  let majority = counts
    .iter()
    .enumerate()
    .max_by_key(|&(class, count)| (*count, std::cmp::Reverse(class)))
    .map(|(class, _)| class)
    .unwrap_or(0);

  let pure = counts.iter().filter(|&&c| c > 0).count() <= 1;
  let at_limit = depth >= params.max_depth || n < params.min_samples_split || pure;

  let split = if at_limit {
    None
  } else {
    best_classification_split(x, y, n_classes, &indices, params.min_samples_leaf, rng)
  };

  match split {
    None => {
      nodes.push(Node::Leaf { value: majority as f64 });
      nodes.len() - 1
    }
    Some(choice) => {
      let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| x[i][choice.feature] <= choice.threshold);

      let left =
        grow_classification(x, y, n_classes, left_idx, depth + 1, params, rng, nodes);
      let right =
        grow_classification(x, y, n_classes, right_idx, depth + 1, params, rng, nodes);
      nodes.push(Node::Split {
        feature: choice.feature,
        threshold: choice.threshold,
        left,
        right,
      });
      nodes.len() - 1
    }
  }
}

fn best_classification_split(
  x: &[Vec<f64>],
  y: &[usize],
  n_classes: usize,
  indices: &[usize],
  min_leaf: usize,
  rng: &mut StdRng,
) -> Option<SplitChoice> {
  let n = indices.len();
  let n_features = x[indices[0]].len();

  // sqrt-sized random feature subset per split.
  let take = (n_features as f64).sqrt().ceil() as usize;
  let mut features: Vec<usize> = (0..n_features).collect();
  features.shuffle(rng);
  features.truncate(take.max(1));

  let gini = |counts: &[usize], total: usize| -> f64 {
    let t = total as f64;
    1.0
      - counts
        .iter()
        .map(|&c| {
          let p = c as f64 / t;
          p * p
        })
        .sum::<f64>()
  };

  let mut total_counts = vec![0usize; n_classes];
  for &i in indices {
    total_counts[y[i]] += 1;
  }

  let mut best: Option<SplitChoice> = None;

  for &feature in &features {
    let mut order: Vec<usize> = indices.to_vec();
    order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

    let mut left_counts = vec![0usize; n_classes];
    for (k, &i) in order.iter().enumerate().take(n - 1) {
      left_counts[y[i]] += 1;
      let left_n = k + 1;
      let right_n = n - left_n;

      let here = x[i][feature];
      let next = x[order[k + 1]][feature];
      if here == next || left_n < min_leaf || right_n < min_leaf {
        continue;
      }

      let right_counts: Vec<usize> = total_counts
        .iter()
        .zip(&left_counts)
        .map(|(t, l)| t - l)
        .collect();
      let weighted = (left_n as f64 * gini(&left_counts, left_n)
        + right_n as f64 * gini(&right_counts, right_n))
        / n as f64;

      if best.as_ref().is_none_or(|b| weighted < b.score) {
        best = Some(SplitChoice {
          feature,
          threshold: (here + next) / 2.0,
          score: weighted,
        });
      }
    }
  }

  best
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  fn grid(xs: &[f64]) -> Vec<Vec<f64>> { xs.iter().map(|&v| vec![v]).collect() }

  #[test]
  fn regression_constant_target_predicts_constant() {
    let x = grid(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    let y = vec![7.0; 6];
    let forest = RegressionForest::fit(&x, &y, ForestParams::regression());
    assert!((forest.predict(&[3.5]) - 7.0).abs() < 1e-9);
  }

  #[test]
  fn regression_learns_a_step_function() {
    let xs: Vec<f64> = (0..40).map(|i| i as f64).collect();
    let x = grid(&xs);
    let y: Vec<f64> = xs.iter().map(|&v| if v < 20.0 { 5.0 } else { 50.0 }).collect();
    let forest = RegressionForest::fit(&x, &y, ForestParams::regression());

    assert!(forest.predict(&[4.0]) < 20.0);
    assert!(forest.predict(&[36.0]) > 35.0);
  }

  #[test]
  fn regression_is_deterministic_for_a_fixed_seed() {
    let xs: Vec<f64> = (0..30).map(|i| i as f64).collect();
    let x = grid(&xs);
    let y: Vec<f64> = xs.iter().map(|&v| v * 2.0 + 1.0).collect();

    let a = RegressionForest::fit(&x, &y, ForestParams::regression()).predict(&[14.5]);
    let b = RegressionForest::fit(&x, &y, ForestParams::regression()).predict(&[14.5]);
    assert_eq!(a, b);
  }

  #[test]
  fn classification_separates_two_clusters() {
    let mut x = Vec::new();
    let mut y = Vec::new();
    for i in 0..20 {
      x.push(vec![i as f64, 0.0]);
      y.push(0);
      x.push(vec![100.0 + i as f64, 1.0]);
      y.push(1);
    }
    let forest = ClassificationForest::fit(&x, &y, 2, ForestParams::classification());

    assert_eq!(forest.predict(&[5.0, 0.0]), 0);
    assert_eq!(forest.predict(&[110.0, 1.0]), 1);
  }

  #[test]
  fn classification_is_deterministic_for_a_fixed_seed() {
    let x: Vec<Vec<f64>> = (0..30).map(|i| vec![i as f64, (i % 7) as f64]).collect();
    let y: Vec<usize> = (0..30).map(|i| usize::from(i >= 15)).collect();

    let a = ClassificationForest::fit(&x, &y, 2, ForestParams::classification());
    let b = ClassificationForest::fit(&x, &y, 2, ForestParams::classification());
    for probe in [[3.0, 1.0], [22.0, 5.0], [15.0, 0.0]] {
      assert_eq!(a.predict(&probe), b.predict(&probe));
    }
  }
}
