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

//! Mergeable t-digest for estimating quantiles and cumulative distributions.
//!
//! The implementation is the merging digest described in
//! [Computing Extremely Accurate Quantiles Using t-Digests][paper] by Ted Dunning and Otmar Ertl,
//! using the arcsine scale function `K_1`:
//!
//! * Values are appended to an insert buffer in amortized O(1).
//! * A merge sorts the buffer together with the existing centroids and re-clusters them in one
//!   sweep, bounding every cluster to one unit of the scale function. Clusters are small near
//!   both tails and large around the median, so extreme quantiles are the most accurate.
//! * Successive merges sweep in alternating directions.
//! * Queries merge pending values first, then interpolate between centroid midpoints. The
//!   observed minimum and maximum anchor both tails, and singleton centroids answer exactly.
//!
//! The digest is generic over the value domain `V` (any primitive integer or float, see
//! [`Value`]) and the weight counter `W` (any primitive unsigned integer, see [`Weight`]).
//! Arithmetic happens in `f64`; integral domains round their estimates to the nearest integer.
//!
//! Like every t-digest, the error is empirical: there is no formal bound, but for common
//! distributions the estimates are within a fraction of a percent near the tails.
//!
//! # Examples
//!
//! ```
//! use digestible::tdigest::Digest;
//!
//! let mut digest = Digest::<u32>::new(100.0);
//! for value in 1..=1000 {
//!     digest.insert(value);
//! }
//! let median = digest.quantile(50.0).unwrap();
//! assert!((490..=510).contains(&median));
//! assert_eq!(digest.quantile(100.0).unwrap(), 1000);
//! ```
//!
//! [paper]: https://arxiv.org/abs/1902.04023

mod builder;
mod centroid;
mod merge;
mod query;
mod scale;
mod serialization;
mod sketch;
mod value;

pub use self::builder::DigestBuilder;
pub use self::centroid::Centroid;
pub use self::sketch::DEFAULT_COMPRESSION;
pub use self::sketch::Digest;
pub use self::value::Value;
pub use self::value::Weight;
