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

use std::fmt;

use num_traits::Bounded;
use num_traits::NumCast;
use num_traits::PrimInt;
use num_traits::ToPrimitive;
use num_traits::Unsigned;

mod sealed {
    pub trait Sealed {}
}

/// The numeric domain of observations a [`Digest`](super::Digest) summarizes.
///
/// Implemented for every primitive integer and float type. All arithmetic on values (weighted
/// means, interpolation) happens in `f64`; results are converted back with
/// [`Value::from_estimate`], which rounds to nearest for integral domains.
///
/// Integers wider than 53 bits are accepted but lose precision once they pass through a mean.
pub trait Value:
    Copy + PartialOrd + fmt::Debug + Bounded + NumCast + ToPrimitive + sealed::Sealed
{
    /// Whether the domain only holds whole numbers.
    const INTEGRAL: bool;

    /// Returns false for NaN and infinities. Integers are always finite.
    fn is_finite(self) -> bool;

    /// Widens the value to `f64`.
    fn as_f64(self) -> f64 {
        // every primitive converts to f64, possibly with rounding
        self.to_f64().unwrap_or(f64::NAN)
    }

    /// Converts an interpolated estimate back into the domain, rounding for integral types and
    /// saturating at the domain bounds.
    fn from_estimate(estimate: f64) -> Self {
        let estimate = if Self::INTEGRAL {
            estimate.round()
        } else {
            estimate
        };
        match <Self as NumCast>::from(estimate) {
            Some(value) => value,
            None if estimate < 0.0 => Self::min_value(),
            None => Self::max_value(),
        }
    }
}

macro_rules! impl_integral_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Value for $ty {
                const INTEGRAL: bool = true;

                fn is_finite(self) -> bool {
                    true
                }
            }
        )*
    };
}

macro_rules! impl_float_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}

            impl Value for $ty {
                const INTEGRAL: bool = false;

                fn is_finite(self) -> bool {
                    <$ty>::is_finite(self)
                }
            }
        )*
    };
}

impl_integral_value!(u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize);
impl_float_value!(f32, f64);

/// The unsigned counter type centroid weights are accumulated in.
///
/// Any primitive unsigned integer qualifies. The sum of all weights inserted into one digest
/// must fit in the type; exceeding it panics with `"weight overflow"` during merge.
pub trait Weight: PrimInt + Unsigned + fmt::Debug {
    /// Widens the weight to `f64`.
    fn as_f64(self) -> f64 {
        self.to_f64().unwrap_or(f64::MAX)
    }

    /// Widens the weight to `u64`, saturating for wider types.
    fn as_u64(self) -> u64 {
        self.to_u64().unwrap_or(u64::MAX)
    }
}

impl<T: PrimInt + Unsigned + fmt::Debug> Weight for T {}
