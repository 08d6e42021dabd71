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

use super::Digest;
use super::sketch::DEFAULT_COMPRESSION;
use super::value::Value;
use super::value::Weight;
use crate::error::Error;

/// Builder for creating [`Digest`] instances.
///
/// Besides the compression, the builder can set an auto-merge limit: once the insert buffer
/// holds that many points, the next insert merges it. Without a limit the buffer only drains
/// on an explicit [`Digest::merge`] or a query.
#[derive(Debug, Clone)]
pub struct DigestBuilder {
    compression: f64,
    auto_merge: Option<usize>,
}

impl Default for DigestBuilder {
    fn default() -> Self {
        DigestBuilder::new(DEFAULT_COMPRESSION)
    }
}

impl DigestBuilder {
    /// Creates a builder for digests with the given compression.
    ///
    /// The compression is validated by [`build`](Self::build) and
    /// [`try_build`](Self::try_build).
    ///
    /// # Examples
    ///
    /// ```
    /// # use digestible::tdigest::DigestBuilder;
    /// let digest = DigestBuilder::new(50.0).build::<f64, u64>();
    /// assert_eq!(digest.compression(), 50.0);
    /// ```
    pub fn new(compression: f64) -> Self {
        DigestBuilder {
            compression,
            auto_merge: None,
        }
    }

    /// Merges automatically once `limit` points are buffered (default: never).
    ///
    /// # Examples
    ///
    /// ```
    /// # use digestible::tdigest::DigestBuilder;
    /// let mut digest = DigestBuilder::new(100.0)
    ///     .auto_merge(4)
    ///     .build::<u32, u32>();
    /// for i in 0..4 {
    ///     digest.insert(i);
    /// }
    /// assert_eq!(digest.centroid_count(), 4);
    /// ```
    pub fn auto_merge(mut self, limit: usize) -> Self {
        self.auto_merge = Some(limit);
        self
    }

    /// Builds the digest.
    ///
    /// The fallible version of this method is [`DigestBuilder::try_build`].
    ///
    /// # Panics
    ///
    /// Panics if the compression is not finite and positive, or the auto-merge limit is 0.
    pub fn build<V: Value, W: Weight>(self) -> Digest<V, W> {
        match self.try_build() {
            Ok(digest) => digest,
            Err(err) => panic!("{}", err.message()),
        }
    }

    /// Builds the digest.
    ///
    /// # Errors
    ///
    /// If the compression is not finite and positive, or the auto-merge limit is 0, returns
    /// [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument).
    ///
    /// # Examples
    ///
    /// ```
    /// # use digestible::tdigest::DigestBuilder;
    /// assert!(DigestBuilder::new(f64::NAN).try_build::<f64, u64>().is_err());
    /// assert!(DigestBuilder::default().auto_merge(0).try_build::<f64, u64>().is_err());
    /// ```
    pub fn try_build<V: Value, W: Weight>(self) -> Result<Digest<V, W>, Error> {
        // validates the compression
        Digest::<V, W>::try_new(self.compression)?;
        if self.auto_merge == Some(0) {
            return Err(Error::invalid_argument("auto-merge limit must be at least 1"));
        }
        Ok(Digest::make(self.compression, self.auto_merge))
    }
}
