// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use super::centroid::Centroid;
use super::value::Value;
use super::value::Weight;

/// Read-only view over a fully merged, non-empty centroid list.
///
/// Each centroid's weight is centered on its mean: half lies below, half above. The outermost
/// half-weights stretch to the observed `min` and `max`, where a single observation sits
/// exactly. Singleton centroids are point masses.
pub(super) struct DigestView<'a, V, W> {
    pub(super) min: f64,
    pub(super) max: f64,
    pub(super) centroids: &'a [Centroid<V, W>],
    pub(super) total_weight: f64,
}

impl<V: Value, W: Weight> DigestView<'_, V, W> {
    /// Fraction of the total weight at or below `value`, in `[0, 1]`.
    pub(super) fn rank(&self, value: f64) -> f64 {
        debug_assert!(!self.centroids.is_empty(), "view must not be empty");
        debug_assert!(!value.is_nan(), "value must not be NaN");

        if value < self.min {
            return 0.0;
        }
        if value > self.max {
            return 1.0;
        }

        let total_weight = self.total_weight;
        let num_centroids = self.centroids.len();

        // left tail
        let first = &self.centroids[0];
        let first_mean = first.mean_f64();
        if value < first_mean {
            if value == self.min {
                return 0.5 / total_weight;
            }
            let fraction = (value - self.min) / (first_mean - self.min);
            return tail_weight(first.weight_f64(), fraction) / total_weight;
        }

        // right tail
        let last = &self.centroids[num_centroids - 1];
        let last_mean = last.mean_f64();
        if value > last_mean {
            if value == self.max {
                return 1.0 - 0.5 / total_weight;
            }
            let fraction = (self.max - value) / (self.max - last_mean);
            return 1.0 - tail_weight(last.weight_f64(), fraction) / total_weight;
        }

        // first_mean <= value <= last_mean; runs of equal means collapse into one span
        let lower_bound = self.centroids.partition_point(|c| c.mean_f64() < value);
        let upper_bound = self.centroids.partition_point(|c| c.mean_f64() <= value);
        let lower = if lower_bound < num_centroids
            && self.centroids[lower_bound].mean_f64() == value
        {
            lower_bound
        } else {
            lower_bound - 1
        };
        let upper = if upper_bound == num_centroids
            || self.centroids[upper_bound - 1].mean_f64() == value
        {
            upper_bound - 1
        } else {
            upper_bound
        };

        let weight_before: f64 = self.centroids[..lower].iter().map(Centroid::weight_f64).sum();
        let weight_below = weight_before + self.centroids[lower].weight_f64() / 2.0;
        let weight_delta = self.centroids[lower..upper]
            .iter()
            .map(Centroid::weight_f64)
            .sum::<f64>()
            - self.centroids[lower].weight_f64() / 2.0
            + self.centroids[upper].weight_f64() / 2.0;

        let lower_mean = self.centroids[lower].mean_f64();
        let upper_mean = self.centroids[upper].mean_f64();
        let rank = if upper_mean - lower_mean > 0.0 {
            (weight_below + weight_delta * (value - lower_mean) / (upper_mean - lower_mean))
                / total_weight
        } else {
            (weight_below + weight_delta / 2.0) / total_weight
        };
        rank.clamp(0.0, 1.0)
    }

    /// Estimated value at normalized rank `rank` in `[0, 1]`.
    pub(super) fn quantile(&self, rank: f64) -> f64 {
        debug_assert!(!self.centroids.is_empty(), "view must not be empty");
        debug_assert!((0.0..=1.0).contains(&rank), "rank must be in [0.0, 1.0]");

        let total_weight = self.total_weight;
        let num_centroids = self.centroids.len();
        let weight = rank * total_weight;

        // the first and last unit of weight are the observed extremes
        if weight < 1.0 {
            return self.min;
        }
        if weight > total_weight - 1.0 {
            return self.max;
        }

        let first = &self.centroids[0];
        let first_weight = first.weight_f64();
        if first_weight > 2.0 && weight < first_weight / 2.0 {
            let fraction = (weight - 1.0) / (first_weight / 2.0 - 1.0);
            return self.min + fraction * (first.mean_f64() - self.min);
        }
        let last = &self.centroids[num_centroids - 1];
        let last_weight = last.weight_f64();
        if last_weight > 2.0 && total_weight - weight <= last_weight / 2.0 {
            let fraction = (total_weight - weight - 1.0) / (last_weight / 2.0 - 1.0);
            return self.max - fraction * (self.max - last.mean_f64());
        }

        // walk the half-weight midpoints of adjacent centroids
        let mut weight_so_far = first_weight / 2.0;
        for pair in self.centroids.windows(2) {
            let (left, right) = (&pair[0], &pair[1]);
            let dw = (left.weight_f64() + right.weight_f64()) / 2.0;
            if weight_so_far + dw > weight {
                let mut left_weight = 0.0;
                if left.is_singleton() {
                    if weight - weight_so_far < 0.5 {
                        return left.mean_f64();
                    }
                    left_weight = 0.5;
                }
                let mut right_weight = 0.0;
                if right.is_singleton() {
                    if weight_so_far + dw - weight <= 0.5 {
                        return right.mean_f64();
                    }
                    right_weight = 0.5;
                }
                // each mean is weighted by the distance to the other one
                let to_left = weight - weight_so_far - left_weight;
                let to_right = weight_so_far + dw - weight - right_weight;
                let estimate =
                    weighted_average(left.mean_f64(), to_right, right.mean_f64(), to_left);
                return estimate.clamp(self.min, self.max);
            }
            weight_so_far += dw;
        }

        // only reachable at the midpoint of a last centroid too light for a tail segment
        last.mean_f64()
    }
}

/// Weight between an observed extreme and a point `fraction` of the way to the outermost mean.
///
/// Past the extreme observation the tail holds at least one unit of weight, capped by the half
/// of the outer centroid that lies on the extreme's side. A singleton merged away from the
/// extreme therefore contributes a flat half unit, matching its value at its own mean.
fn tail_weight(outer_weight: f64, fraction: f64) -> f64 {
    let half = outer_weight / 2.0;
    let anchor = half.min(1.0);
    anchor + fraction * (half - anchor)
}

fn weighted_average(x1: f64, w1: f64, x2: f64, w2: f64) -> f64 {
    (x1 * w1 + x2 * w2) / (w1 + w2)
}
