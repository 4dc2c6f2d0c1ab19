//! Configuration passed into the splitters.

/// How a mesh domain's split plane is placed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SplitStrategy {
  /// Midpoint of the domain bounds on the split axis.
  Middle,
  /// Centroid of the triangle at the target rank after sorting the domain's
  /// triangle centroids along the split axis. Balances load on meshes with
  /// non-uniform triangle density.
  #[default]
  Median,
}

impl SplitStrategy {
  /// Pick rule that pairs naturally with this strategy.
  pub fn default_pick(self) -> PickRule {
    match self {
      SplitStrategy::Middle => PickRule::LargestVolume,
      SplitStrategy::Median => PickRule::MostPrimitives,
    }
  }
}

/// Which pending domain is split next.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PickRule {
  /// Domain with the largest bounds volume.
  LargestVolume,
  /// Domain holding the most primitives.
  MostPrimitives,
}

/// Configuration for splitting a dataset into clusters.
#[derive(Clone, Debug, PartialEq)]
pub struct SplitConfig {
  /// Desired number of clusters (domains written to the file).
  pub num_clusters: usize,

  /// Split plane placement.
  pub strategy: SplitStrategy,

  /// Candidate selection rule.
  pub pick: PickRule,
}

impl Default for SplitConfig {
  fn default() -> Self {
    let strategy = SplitStrategy::default();
    Self {
      num_clusters: 1,
      strategy,
      pick: strategy.default_pick(),
    }
  }
}

impl SplitConfig {
  pub fn new(num_clusters: usize) -> Self {
    Self {
      num_clusters,
      ..Self::default()
    }
  }

  pub fn with_num_clusters(mut self, num_clusters: usize) -> Self {
    self.num_clusters = num_clusters;
    self
  }

  /// Set the strategy and its matching pick rule.
  pub fn with_strategy(mut self, strategy: SplitStrategy) -> Self {
    self.strategy = strategy;
    self.pick = strategy.default_pick();
    self
  }

  /// Override the pick rule (call after [`with_strategy`](Self::with_strategy)).
  pub fn with_pick(mut self, pick: PickRule) -> Self {
    self.pick = pick;
    self
  }
}
