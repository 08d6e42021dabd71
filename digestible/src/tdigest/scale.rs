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

//! The arcsine scale function, `K_1` in the t-digest paper.
//!
//! `k(q) = δ / 2π · asin(2q − 1)` maps the quantile range `[0, 1]` onto `[−δ/4, δ/4]`. A
//! cluster may span at most one unit of `k`, which makes clusters small near both tails and
//! large around the median.

use std::f64::consts::PI;

/// Maps a quantile `q` to the scale `k`. `q` is clamped to `[0, 1]`.
pub(super) fn k(q: f64, compression: f64) -> f64 {
    let x = (2.0 * q - 1.0).clamp(-1.0, 1.0);
    compression / (2.0 * PI) * x.asin()
}

/// Inverse of [`k`]. `k` is clamped to `[−δ/4, δ/4]`.
pub(super) fn q(k: f64, compression: f64) -> f64 {
    let bound = compression / 4.0;
    let k = k.clamp(-bound, bound);
    ((2.0 * PI * k / compression).sin() + 1.0) / 2.0
}

/// The furthest quantile a cluster opened at `q_start` may extend to.
pub(super) fn cluster_limit(q_start: f64, compression: f64) -> f64 {
    let k_limit = k(q_start, compression) + 1.0;
    if k_limit >= compression / 4.0 {
        return 1.0;
    }
    q(k_limit, compression)
}
