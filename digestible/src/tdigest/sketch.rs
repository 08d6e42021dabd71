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

use std::io::Cursor;

use byteorder::LE;
use byteorder::ReadBytesExt;
use num_traits::NumCast;

use crate::codec::DigestBytes;
use crate::codec::family::Family;
use crate::error::Error;
use crate::tdigest::centroid::Centroid;
use crate::tdigest::merge::merge_points;
use crate::tdigest::query::DigestView;
use crate::tdigest::serialization::*;
use crate::tdigest::value::Value;
use crate::tdigest::value::Weight;

/// The compression used when none is specified.
pub const DEFAULT_COMPRESSION: f64 = 100.0;

/// A mergeable t-digest over values of type `V` with centroid weights counted in `W`.
///
/// Values are appended to an insert buffer and folded into the sorted centroid list by
/// [`merge`](Self::merge). Queries merge any pending values first, which is why they take
/// `&mut self`. The digest holds no locks; sharing one between threads needs an external
/// `Mutex` or similar.
///
/// See the [module level documentation](super) for more.
#[derive(Debug, Clone)]
pub struct Digest<V = f64, W = u64> {
    compression: f64,
    auto_merge: Option<usize>,

    reverse_merge: bool,
    min: V,
    max: V,

    centroids: Vec<Centroid<V, W>>,
    buffer: Vec<Centroid<V, W>>,
    size: u64,
}

impl<V: Value, W: Weight> Default for Digest<V, W> {
    fn default() -> Self {
        Digest::new(DEFAULT_COMPRESSION)
    }
}

impl<V: Value, W: Weight> Digest<V, W> {
    /// Creates a digest with the given compression.
    ///
    /// Higher compression keeps more centroids and gives more accurate answers. The number of
    /// centroids after a merge stays below roughly `compression / 2`.
    ///
    /// The fallible version of this method is [`Digest::try_new`].
    ///
    /// # Panics
    ///
    /// Panics if `compression` is not finite or not positive.
    ///
    /// # Examples
    ///
    /// ```
    /// # use digestible::tdigest::Digest;
    /// let digest = Digest::<f64>::new(100.0);
    /// assert_eq!(digest.compression(), 100.0);
    /// ```
    pub fn new(compression: f64) -> Self {
        assert!(
            check_compression(compression),
            "compression must be finite and positive"
        );
        Self::make(compression, None)
    }

    /// Creates a digest with the given compression.
    ///
    /// The panicking version of this method is [`Digest::new`].
    ///
    /// # Errors
    ///
    /// If `compression` is not finite or not positive, returns
    /// [`ErrorKind::InvalidArgument`](crate::error::ErrorKind::InvalidArgument).
    ///
    /// # Examples
    ///
    /// ```
    /// # use digestible::tdigest::Digest;
    /// assert!(Digest::<u32>::try_new(25.0).is_ok());
    /// assert!(Digest::<u32>::try_new(0.0).is_err());
    /// ```
    pub fn try_new(compression: f64) -> Result<Self, Error> {
        if !check_compression(compression) {
            return Err(Error::invalid_argument(format!(
                "compression must be finite and positive, got {compression}"
            )));
        }
        Ok(Self::make(compression, None))
    }

    // callers validate the arguments
    pub(super) fn make(compression: f64, auto_merge: Option<usize>) -> Self {
        Digest {
            compression,
            auto_merge,
            reverse_merge: false,
            min: V::max_value(),
            max: V::min_value(),
            centroids: vec![],
            buffer: vec![],
            size: 0,
        }
    }

    /// Adds one observation of `value`.
    ///
    /// The value is buffered; it is folded into the centroids by the next merge. NaN and
    /// infinite values are ignored.
    ///
    /// # Panics
    ///
    /// A merge triggered by the auto-merge limit panics if the total weight overflows `W`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use digestible::tdigest::Digest;
    /// let mut digest = Digest::<f64>::new(100.0);
    /// digest.insert(1.0);
    /// digest.insert(f64::NAN);
    /// assert_eq!(digest.size(), 1);
    /// ```
    pub fn insert(&mut self, value: V) {
        self.insert_weighted(value, W::one());
    }

    /// Adds `weight` observations of `value` at once.
    ///
    /// NaN and infinite values are ignored, as are zero weights.
    ///
    /// # Panics
    ///
    /// A merge triggered by the auto-merge limit panics if the total weight overflows `W`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use digestible::tdigest::Digest;
    /// let mut digest = Digest::<u16, u32>::new(100.0);
    /// digest.insert_weighted(250, 10);
    /// assert_eq!(digest.size(), 10);
    /// ```
    pub fn insert_weighted(&mut self, value: V, weight: W) {
        if !value.is_finite() {
            log::trace!("ignoring non-finite value {value:?}");
            return;
        }
        if weight.is_zero() {
            return;
        }

        self.buffer.push(Centroid::new(value, weight));
        self.size = self.size.saturating_add(weight.as_u64());
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }

        if self.auto_merge.is_some_and(|limit| self.buffer.len() >= limit) {
            self.merge();
        }
    }

    /// Folds every buffered value into the centroid list.
    ///
    /// Merging with an empty buffer does nothing, so calling this repeatedly is harmless.
    ///
    /// # Panics
    ///
    /// Panics with `"weight overflow"` if the total weight does not fit in `W`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use digestible::tdigest::Digest;
    /// let mut digest = Digest::<u32>::new(10.0);
    /// for i in 0..100 {
    ///     digest.insert(i);
    /// }
    /// digest.merge();
    /// let total: u64 = digest.get().iter().map(|&(_, weight)| weight).sum();
    /// assert_eq!(total, 100);
    /// ```
    pub fn merge(&mut self) {
        if self.buffer.is_empty() {
            return;
        }

        let num_buffered = self.buffer.len();
        let num_centroids = self.centroids.len();
        let mut points = Vec::with_capacity(num_centroids + num_buffered);
        points.append(&mut self.centroids);
        points.append(&mut self.buffer);

        self.centroids = merge_points(points, self.compression, self.reverse_merge);
        log::debug!(
            "merged {num_buffered} buffered points into {num_centroids} centroids, {} centroids \
             out (reverse: {})",
            self.centroids.len(),
            self.reverse_merge
        );
        self.reverse_merge = !self.reverse_merge;
    }

    /// Merges the contents of `other` into this digest.
    ///
    /// `other` is left untouched; its centroids and buffered values become weighted points of
    /// this digest and are merged immediately, under this digest's compression.
    ///
    /// # Panics
    ///
    /// Panics with `"weight overflow"` if the combined weight does not fit in `W`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use digestible::tdigest::Digest;
    /// let mut left = Digest::<f64>::new(100.0);
    /// let mut right = Digest::<f64>::new(100.0);
    /// left.insert(1.0);
    /// right.insert(2.0);
    /// left.merge_digest(&right);
    /// assert_eq!(left.size(), 2);
    /// assert_eq!(left.max_value(), Some(2.0));
    /// ```
    pub fn merge_digest(&mut self, other: &Digest<V, W>) {
        if other.is_empty() {
            return;
        }

        self.buffer.reserve(other.centroids.len() + other.buffer.len());
        self.buffer.extend_from_slice(&other.centroids);
        self.buffer.extend_from_slice(&other.buffer);
        self.size = self.size.saturating_add(other.size);
        if other.min < self.min {
            self.min = other.min;
        }
        if other.max > self.max {
            self.max = other.max;
        }
        self.merge();
    }

    /// Returns the total weight inserted so far, merged or not.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns true if the digest has not seen any data.
    pub fn is_empty(&self) -> bool {
        self.centroids.is_empty() && self.buffer.is_empty()
    }

    /// Returns the compression this digest was configured with.
    pub fn compression(&self) -> f64 {
        self.compression
    }

    /// Returns the number of merged centroids. Buffered values are not counted.
    pub fn centroid_count(&self) -> usize {
        self.centroids.len()
    }

    /// Returns the smallest value inserted; `None` if the digest is empty.
    pub fn min_value(&self) -> Option<V> {
        if self.is_empty() {
            None
        } else {
            Some(self.min)
        }
    }

    /// Returns the largest value inserted; `None` if the digest is empty.
    pub fn max_value(&self) -> Option<V> {
        if self.is_empty() {
            None
        } else {
            Some(self.max)
        }
    }

    /// Returns the merged centroids as `(mean, weight)` pairs in ascending order of mean.
    ///
    /// Buffered values are not included; call [`merge`](Self::merge) first to see them.
    ///
    /// # Examples
    ///
    /// ```
    /// # use digestible::tdigest::Digest;
    /// let mut digest = Digest::<i64>::new(100.0);
    /// digest.insert(7);
    /// digest.insert(-3);
    /// assert!(digest.get().is_empty());
    /// digest.merge();
    /// assert_eq!(digest.get(), vec![(-3, 1), (7, 1)]);
    /// ```
    pub fn get(&self) -> Vec<(V, W)> {
        self.centroids.iter().map(|&c| c.into()).collect()
    }

    /// Discards all data, keeping the configuration.
    pub fn reset(&mut self) {
        self.reverse_merge = false;
        self.min = V::max_value();
        self.max = V::min_value();
        self.centroids.clear();
        self.buffer.clear();
        self.size = 0;
    }

    fn normalize(&mut self) {
        self.merge();
    }

    fn view(&self) -> Option<DigestView<'_, V, W>> {
        if self.centroids.is_empty() {
            return None;
        }
        Some(DigestView {
            min: self.min.as_f64(),
            max: self.max.as_f64(),
            centroids: &self.centroids,
            total_weight: self.centroids.iter().map(Centroid::weight_f64).sum(),
        })
    }

    /// Estimates the fraction of observations less than or equal to `value`, in `[0, 1]`.
    ///
    /// Pending values are merged first.
    ///
    /// # Errors
    ///
    /// * [`ErrorKind::InvalidArgument`] if `value` is NaN.
    /// * [`ErrorKind::EmptyDigest`] if nothing has been inserted.
    ///
    /// [`ErrorKind::InvalidArgument`]: crate::error::ErrorKind::InvalidArgument
    /// [`ErrorKind::EmptyDigest`]: crate::error::ErrorKind::EmptyDigest
    ///
    /// # Examples
    ///
    /// ```
    /// # use digestible::tdigest::Digest;
    /// let mut digest = Digest::<f64>::new(100.0);
    /// digest.insert(1.0);
    /// digest.insert(2.0);
    /// assert_eq!(digest.cumulative_distribution(1.5).unwrap(), 0.5);
    /// assert_eq!(digest.cumulative_distribution(3.0).unwrap(), 1.0);
    /// ```
    pub fn cumulative_distribution(&mut self, value: V) -> Result<f64, Error> {
        let value = value.as_f64();
        if value.is_nan() {
            return Err(Error::invalid_argument("value must not be NaN"));
        }

        self.normalize();
        let view = self
            .view()
            .ok_or_else(|| Error::empty_digest("cumulative_distribution"))?;
        Ok(view.rank(value))
    }

    /// Estimates the value below which `percent` percent of the observations fall.
    ///
    /// `percent` is in `[0, 100]`: 0 gives the minimum, 100 the maximum. Integral domains
    /// round the estimate to the nearest integer. Pending values are merged first.
    ///
    /// # Errors
    ///
    /// * [`ErrorKind::InvalidArgument`] if `percent` is NaN or outside `[0, 100]`.
    /// * [`ErrorKind::EmptyDigest`] if nothing has been inserted.
    ///
    /// [`ErrorKind::InvalidArgument`]: crate::error::ErrorKind::InvalidArgument
    /// [`ErrorKind::EmptyDigest`]: crate::error::ErrorKind::EmptyDigest
    ///
    /// # Examples
    ///
    /// ```
    /// # use digestible::tdigest::Digest;
    /// let mut digest = Digest::<u16>::new(100.0);
    /// digest.insert(1);
    /// digest.insert(2);
    /// assert_eq!(digest.quantile(49.9).unwrap(), 1);
    /// assert_eq!(digest.quantile(50.0).unwrap(), 2);
    /// assert!(digest.quantile(101.0).is_err());
    /// ```
    pub fn quantile(&mut self, percent: f64) -> Result<V, Error> {
        if !(0.0..=100.0).contains(&percent) {
            return Err(Error::invalid_argument(format!(
                "quantile must be in [0, 100], got {percent}"
            )));
        }

        self.normalize();
        let view = self.view().ok_or_else(|| Error::empty_digest("quantile"))?;
        Ok(V::from_estimate(view.quantile(percent / 100.0)))
    }

    fn is_single_value(&self) -> bool {
        self.centroids.len() == 1 && self.centroids[0].is_singleton()
    }

    /// Serializes this digest to bytes. Pending values are merged first.
    ///
    /// Means and bounds are written as `f64` and weights as `u64`, so integral values beyond
    /// 2^53 and weights beyond `u64::MAX` do not survive exactly.
    ///
    /// # Panics
    ///
    /// Panics with `"weight overflow"` if merging pending values overflows `W`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use digestible::tdigest::Digest;
    /// # let mut digest = Digest::<f64>::new(100.0);
    /// # digest.insert(1.0);
    /// let bytes = digest.serialize();
    /// let decoded = Digest::<f64>::deserialize(&bytes).unwrap();
    /// assert_eq!(decoded.max_value(), Some(1.0));
    /// ```
    pub fn serialize(&mut self) -> Vec<u8> {
        self.normalize();

        let is_empty = self.is_empty();
        let is_single_value = self.is_single_value();

        // preamble, then compression
        let mut total_size = size_of::<u64>() + size_of::<f64>();
        if is_empty {
            // nothing more
        } else if is_single_value {
            // + 8 bytes single value
            total_size += size_of::<f64>();
        } else {
            // + 4 bytes num centroids
            // + 4 bytes unused
            // + 8 bytes min
            // + 8 bytes max
            total_size += size_of::<u64>() + size_of::<f64>() * 2;
            total_size += self.centroids.len() * CENTROID_SIZE_BYTES;
        }

        let mut bytes = DigestBytes::with_capacity(total_size);
        bytes.write_u8(if is_empty || is_single_value {
            PREAMBLE_LONGS_EMPTY_OR_SINGLE
        } else {
            PREAMBLE_LONGS_MULTIPLE
        });
        bytes.write_u8(SERIAL_VERSION);
        bytes.write_u8(Family::TDIGEST.id);
        bytes.write_u8({
            let mut flags = 0;
            if is_empty {
                flags |= FLAGS_IS_EMPTY;
            }
            if is_single_value {
                flags |= FLAGS_IS_SINGLE_VALUE;
            }
            if V::INTEGRAL {
                flags |= FLAGS_IS_INTEGRAL;
            }
            flags
        });
        bytes.write_zeros(4); // unused
        if !is_empty && !is_single_value {
            bytes.write_u32_le(self.centroids.len() as u32);
            bytes.write_u32_le(0); // unused
        }
        bytes.write_f64_le(self.compression);

        if is_empty {
            // nothing more
        } else if is_single_value {
            bytes.write_f64_le(self.min.as_f64());
        } else {
            bytes.write_f64_le(self.min.as_f64());
            bytes.write_f64_le(self.max.as_f64());
            for centroid in &self.centroids {
                bytes.write_f64_le(centroid.mean_f64());
                bytes.write_u64_le(centroid.weight().as_u64());
            }
        }
        debug_assert_eq!(bytes.len(), total_size);
        bytes.into_bytes()
    }

    /// Deserializes a digest from bytes produced by [`serialize`](Self::serialize).
    ///
    /// The stored centroids are inserted as weighted points and merged under the stored
    /// compression, so the result answers queries like the serialized digest but need not hold
    /// the exact same centroids. The auto-merge limit is not stored.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::InvalidData`](crate::error::ErrorKind::InvalidData) if the bytes
    /// are truncated or malformed, were written for a different value domain (integral versus
    /// floating-point), or hold means or weights that do not fit `V` and `W`.
    ///
    /// # Examples
    ///
    /// ```
    /// # use digestible::tdigest::Digest;
    /// # let mut digest = Digest::<u32>::new(100.0);
    /// # digest.insert(1);
    /// # digest.insert(2);
    /// # let bytes = digest.serialize();
    /// let decoded = Digest::<u32>::deserialize(&bytes).unwrap();
    /// assert_eq!(decoded.size(), 2);
    /// assert!(Digest::<f64>::deserialize(&bytes).is_err());
    /// ```
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        fn make_error(tag: &'static str) -> impl FnOnce(std::io::Error) -> Error {
            move |_| Error::insufficient_data(tag)
        }

        let mut cursor = Cursor::new(bytes);
        let preamble_longs = cursor.read_u8().map_err(make_error("preamble_longs"))?;
        let serial_version = cursor.read_u8().map_err(make_error("serial_version"))?;
        let family_id = cursor.read_u8().map_err(make_error("family_id"))?;
        let flags = cursor.read_u8().map_err(make_error("flags"))?;
        cursor.read_u32::<LE>().map_err(make_error("<unused>"))?;

        Family::TDIGEST.validate_id(family_id)?;
        if serial_version != SERIAL_VERSION {
            return Err(Error::unsupported_serial_version(SERIAL_VERSION, serial_version));
        }
        let is_empty = (flags & FLAGS_IS_EMPTY) != 0;
        let is_single_value = (flags & FLAGS_IS_SINGLE_VALUE) != 0;
        if is_empty && is_single_value {
            return Err(Error::deserial("empty and single value flags are both set"));
        }
        let expected_preamble_longs = if is_empty || is_single_value {
            PREAMBLE_LONGS_EMPTY_OR_SINGLE
        } else {
            PREAMBLE_LONGS_MULTIPLE
        };
        if preamble_longs != expected_preamble_longs {
            return Err(Error::invalid_preamble_longs(expected_preamble_longs, preamble_longs));
        }
        let is_integral = (flags & FLAGS_IS_INTEGRAL) != 0;
        if is_integral != V::INTEGRAL {
            return Err(Error::deserial(format!(
                "value domain mismatch: serialized integral={is_integral}, requested integral={}",
                V::INTEGRAL
            ))
            .with_context("flags", flags));
        }

        let num_centroids = if is_empty || is_single_value {
            0
        } else {
            let num_centroids = cursor.read_u32::<LE>().map_err(make_error("num_centroids"))?;
            cursor.read_u32::<LE>().map_err(make_error("<unused>"))?;
            if num_centroids == 0 {
                return Err(Error::deserial(
                    "multiple value digest must hold at least one centroid",
                ));
            }
            num_centroids as usize
        };

        let compression = cursor.read_f64::<LE>().map_err(make_error("compression"))?;
        if !check_compression(compression) {
            return Err(Error::deserial(format!(
                "compression must be finite and positive, got {compression}"
            )));
        }
        let mut digest = Self::make(compression, None);
        if is_empty {
            return Ok(digest);
        }

        if is_single_value {
            let value = cursor.read_f64::<LE>().map_err(make_error("single_value"))?;
            let value = decode_value::<V>(value, "single_value")?;
            digest.insert(value);
            digest.merge();
            return Ok(digest);
        }

        let min = cursor.read_f64::<LE>().map_err(make_error("min"))?;
        let max = cursor.read_f64::<LE>().map_err(make_error("max"))?;
        let min = decode_value::<V>(min, "min")?;
        let max = decode_value::<V>(max, "max")?;
        if min > max {
            return Err(Error::deserial(format!("min {min:?} is greater than max {max:?}")));
        }

        // the preamble count is untrusted, so do not let it size the allocation
        let remaining = bytes.len().saturating_sub(cursor.position() as usize);
        let mut total_weight = W::zero();
        digest.buffer.reserve(num_centroids.min(remaining / CENTROID_SIZE_BYTES));
        for _ in 0..num_centroids {
            let mean = cursor.read_f64::<LE>().map_err(make_error("mean"))?;
            let weight = cursor.read_u64::<LE>().map_err(make_error("weight"))?;
            let mean = decode_value::<V>(mean, "centroid mean")?;
            if mean < min || mean > max {
                return Err(Error::deserial(format!(
                    "centroid mean {mean:?} is outside [{min:?}, {max:?}]"
                )));
            }
            if weight == 0 {
                return Err(Error::deserial("centroid weight must be at least 1"));
            }
            let weight = <W as NumCast>::from(weight).ok_or_else(|| {
                Error::deserial(format!(
                    "centroid weight {weight} does not fit the weight type"
                ))
            })?;
            total_weight = total_weight
                .checked_add(&weight)
                .ok_or_else(|| Error::deserial("total weight does not fit the weight type"))?;
            digest.insert_weighted(mean, weight);
        }
        digest.merge();
        digest.min = min;
        digest.max = max;
        Ok(digest)
    }
}

fn check_compression(compression: f64) -> bool {
    compression.is_finite() && compression > 0.0
}

fn decode_value<V: Value>(raw: f64, tag: &'static str) -> Result<V, Error> {
    if !raw.is_finite() {
        return Err(Error::deserial(format!("{tag} must be finite, got {raw}")));
    }
    if V::INTEGRAL && raw.fract() != 0.0 {
        return Err(Error::deserial(format!("{tag} must be a whole number, got {raw}")));
    }
    // the widest integer bounds round outward when stored as f64
    if V::INTEGRAL && raw == V::max_value().as_f64() {
        return Ok(V::max_value());
    }
    if V::INTEGRAL && raw == V::min_value().as_f64() {
        return Ok(V::min_value());
    }
    match <V as NumCast>::from(raw) {
        Some(value) if value.is_finite() => Ok(value),
        _ => Err(Error::deserial(format!("{tag} {raw} is out of range for the value type"))),
    }
}
