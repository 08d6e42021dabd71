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

use std::cmp::Ordering;

use super::value::Value;
use super::value::Weight;

/// A merged representative point standing in for `weight` observations averaging `mean`.
///
/// Centroids are only formed by a merge and are never modified afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centroid<V, W> {
    mean: V,
    weight: W,
}

impl<V: Value, W: Weight> Centroid<V, W> {
    /// Callers guarantee `weight >= 1` and a finite `mean`.
    pub(super) fn new(mean: V, weight: W) -> Self {
        debug_assert!(!weight.is_zero(), "centroid weight must be at least 1");
        debug_assert!(mean.is_finite(), "centroid mean must be finite");
        Centroid { mean, weight }
    }

    /// Mean of the observations represented by this centroid.
    pub fn mean(&self) -> V {
        self.mean
    }

    /// Number of observations represented by this centroid.
    pub fn weight(&self) -> W {
        self.weight
    }

    pub(super) fn mean_f64(&self) -> f64 {
        self.mean.as_f64()
    }

    pub(super) fn weight_f64(&self) -> f64 {
        self.weight.as_f64()
    }

    pub(super) fn is_singleton(&self) -> bool {
        self.weight.is_one()
    }
}

impl<V, W> From<Centroid<V, W>> for (V, W) {
    fn from(centroid: Centroid<V, W>) -> Self {
        (centroid.mean, centroid.weight)
    }
}

pub(super) fn centroid_cmp<V: Value, W: Weight>(
    a: &Centroid<V, W>,
    b: &Centroid<V, W>,
) -> Ordering {
    match a.mean.partial_cmp(&b.mean) {
        Some(order) => order,
        None => unreachable!("non-finite values are never buffered"),
    }
}

/// A cluster being grown during a merge sweep.
///
/// The running mean is kept in `f64` regardless of the value domain so that integer domains do
/// not accumulate rounding error while many points are absorbed; it is converted back only
/// when the cluster closes.
#[derive(Debug)]
pub(super) struct Cluster<W> {
    mean: f64,
    weight: W,
}

impl<W: Weight> Cluster<W> {
    pub(super) fn open<V: Value>(point: Centroid<V, W>) -> Self {
        Cluster {
            mean: point.mean_f64(),
            weight: point.weight,
        }
    }

    pub(super) fn weight_f64(&self) -> f64 {
        self.weight.as_f64()
    }

    pub(super) fn absorb<V: Value>(&mut self, point: Centroid<V, W>) {
        let (self_weight, other_weight) = (self.weight_f64(), point.weight_f64());
        let total_weight = self_weight + other_weight;
        self.weight = self
            .weight
            .checked_add(&point.weight)
            .expect("weight overflow");

        let (self_mean, other_mean) = (self.mean, point.mean_f64());
        let ratio_other = other_weight / total_weight;
        let delta = other_mean - self_mean;
        self.mean = if delta.is_finite() {
            delta.mul_add(ratio_other, self_mean)
        } else {
            let ratio_self = self_weight / total_weight;
            self_mean.mul_add(ratio_self, other_mean * ratio_other)
        };
    }

    pub(super) fn close<V: Value>(self) -> Centroid<V, W> {
        Centroid::new(V::from_estimate(self.mean), self.weight)
    }
}
