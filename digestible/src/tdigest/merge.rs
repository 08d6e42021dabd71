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
use super::centroid::Cluster;
use super::centroid::centroid_cmp;
use super::scale;
use super::value::Value;
use super::value::Weight;

/// Re-clusters `points` (existing centroids plus buffered values, in any order) into a new
/// ascending centroid list.
///
/// The sweep walks the points in mean order, growing one cluster at a time. A point joins the
/// open cluster while the quantile the cluster would then reach stays within one unit of the
/// scale function from where the cluster started; otherwise the cluster is closed and the
/// point opens the next one. With `reverse` the sweep starts from the largest mean, which is
/// the same rule measured from the other end since the scale function is symmetric.
///
/// # Contract
///
/// * Means are finite.
/// * The output conserves total weight exactly and is sorted ascending by mean.
pub(super) fn merge_points<V: Value, W: Weight>(
    mut points: Vec<Centroid<V, W>>,
    compression: f64,
    reverse: bool,
) -> Vec<Centroid<V, W>> {
    // stable, so ties keep their input order
    points.sort_by(centroid_cmp);
    if reverse {
        points.reverse();
    }

    let total_weight: f64 = points.iter().map(Centroid::weight_f64).sum();
    let mut merged = Vec::with_capacity(estimated_capacity(compression, points.len()));

    let mut points = points.into_iter();
    let Some(first) = points.next() else {
        return merged;
    };

    let mut weight_so_far = 0.0;
    let mut cluster = Cluster::open(first);
    let mut q_limit = scale::cluster_limit(0.0, compression);
    for point in points {
        let weight_candidate = weight_so_far + cluster.weight_f64() + point.weight_f64();
        let q_candidate = weight_candidate / total_weight;
        if q_candidate <= q_limit {
            cluster.absorb(point);
        } else {
            weight_so_far += cluster.weight_f64();
            merged.push(cluster.close());
            cluster = Cluster::open(point);
            q_limit = scale::cluster_limit(weight_so_far / total_weight, compression);
        }
    }
    merged.push(cluster.close());

    if reverse {
        merged.reverse();
    }
    merged
}

/// The arcsine scale spans `δ/2` units of `k`, so a full sweep emits about that many clusters.
fn estimated_capacity(compression: f64, num_points: usize) -> usize {
    let clusters = (compression / 2.0).ceil() as usize + 2;
    clusters.min(num_points)
}
