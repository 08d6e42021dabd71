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

use crate::codec::family::Family;

pub(super) const PREAMBLE_LONGS_EMPTY_OR_SINGLE: u8 = Family::TDIGEST.min_pre_longs;
pub(super) const PREAMBLE_LONGS_MULTIPLE: u8 = Family::TDIGEST.max_pre_longs;
pub(super) const SERIAL_VERSION: u8 = 1;
pub(super) const FLAGS_IS_EMPTY: u8 = 1 << 0;
pub(super) const FLAGS_IS_SINGLE_VALUE: u8 = 1 << 1;
pub(super) const FLAGS_IS_INTEGRAL: u8 = 1 << 2;
/// Bytes of a `(f64 mean, u64 weight)` centroid record.
pub(super) const CENTROID_SIZE_BYTES: usize = size_of::<f64>() + size_of::<u64>();
