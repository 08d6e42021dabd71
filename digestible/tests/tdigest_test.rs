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

use digestible::error::ErrorKind;
use digestible::tdigest::Digest;
use digestible::tdigest::DigestBuilder;
use googletest::assert_that;
use googletest::prelude::eq;
use googletest::prelude::near;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

#[test]
fn test_empty() {
    let mut digest = Digest::<f64>::new(10.0);
    assert!(digest.is_empty());
    assert_eq!(digest.compression(), 10.0);
    assert_eq!(digest.size(), 0);
    assert_eq!(digest.centroid_count(), 0);
    assert_eq!(digest.min_value(), None);
    assert_eq!(digest.max_value(), None);
    assert!(digest.get().is_empty());

    let err = digest.quantile(50.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyDigest);
    let err = digest.cumulative_distribution(0.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EmptyDigest);
}

#[test]
fn test_one_value() {
    let mut digest = Digest::<f64>::new(100.0);
    digest.insert(1.0);
    assert_eq!(digest.size(), 1);
    assert_eq!(digest.min_value(), Some(1.0));
    assert_eq!(digest.max_value(), Some(1.0));
    assert_eq!(digest.cumulative_distribution(0.99).unwrap(), 0.0);
    assert_eq!(digest.cumulative_distribution(1.0).unwrap(), 0.5);
    assert_eq!(digest.cumulative_distribution(1.01).unwrap(), 1.0);
    assert_eq!(digest.quantile(0.0).unwrap(), 1.0);
    assert_eq!(digest.quantile(50.0).unwrap(), 1.0);
    assert_eq!(digest.quantile(100.0).unwrap(), 1.0);
}

#[test]
fn test_many_values() {
    let n = 10000;

    let mut digest = Digest::<f64>::default();
    for i in 0..n {
        digest.insert(i as f64);
    }

    assert!(!digest.is_empty());
    assert_eq!(digest.size(), n);
    assert_eq!(digest.min_value(), Some(0.0));
    assert_eq!(digest.max_value(), Some((n - 1) as f64));

    assert_that!(
        digest.cumulative_distribution(0.0).unwrap(),
        near(0.0, 0.001)
    );
    assert_that!(
        digest.cumulative_distribution((n / 4) as f64).unwrap(),
        near(0.25, 0.001)
    );
    assert_that!(
        digest.cumulative_distribution((n / 2) as f64).unwrap(),
        near(0.5, 0.001)
    );
    assert_that!(
        digest.cumulative_distribution((n * 3 / 4) as f64).unwrap(),
        near(0.75, 0.001)
    );
    assert_that!(digest.cumulative_distribution(n as f64).unwrap(), eq(1.0));
    assert_that!(digest.quantile(0.0).unwrap(), eq(0.0));
    assert_that!(
        digest.quantile(50.0).unwrap(),
        near((n / 2) as f64, 0.03 * (n / 2) as f64)
    );
    assert_that!(
        digest.quantile(90.0).unwrap(),
        near((n as f64) * 0.9, 0.01 * (n as f64) * 0.9)
    );
    assert_that!(
        digest.quantile(95.0).unwrap(),
        near((n as f64) * 0.95, 0.01 * (n as f64) * 0.95)
    );
    assert_that!(digest.quantile(100.0).unwrap(), eq((n - 1) as f64));
}

#[test]
fn test_cdf_two_values() {
    let mut digest = Digest::<f64>::new(100.0);
    digest.insert(1.0);
    digest.insert(2.0);
    assert_eq!(digest.cumulative_distribution(0.99).unwrap(), 0.0);
    assert_eq!(digest.cumulative_distribution(1.0).unwrap(), 0.25);
    assert_eq!(digest.cumulative_distribution(1.25).unwrap(), 0.375);
    assert_eq!(digest.cumulative_distribution(1.5).unwrap(), 0.5);
    assert_eq!(digest.cumulative_distribution(1.75).unwrap(), 0.625);
    assert_eq!(digest.cumulative_distribution(2.0).unwrap(), 0.75);
    assert_eq!(digest.cumulative_distribution(2.01).unwrap(), 1.0);
}

#[test]
fn test_two_values_split_at_median() {
    let mut digest = Digest::<u32>::new(100.0);
    digest.insert(1);
    digest.insert(2);
    for i in 0..=1000 {
        let q = i as f64 / 10.0;
        let expected = if q < 50.0 { 1 } else { 2 };
        assert_eq!(digest.quantile(q).unwrap(), expected, "q={q}");
    }
}

#[test]
fn test_cdf_repeated_values() {
    let mut digest = Digest::<f64>::new(100.0);
    for _ in 0..4 {
        digest.insert(1.0);
    }
    assert_eq!(digest.cumulative_distribution(0.99).unwrap(), 0.0);
    assert_eq!(digest.cumulative_distribution(1.0).unwrap(), 0.5);
    assert_eq!(digest.cumulative_distribution(1.01).unwrap(), 1.0);
    assert_eq!(digest.quantile(25.0).unwrap(), 1.0);
    assert_eq!(digest.quantile(75.0).unwrap(), 1.0);
}

#[test]
fn test_merge_conserves_weight() {
    let mut digest = Digest::<u32>::new(10.0);
    for i in 0..100 {
        digest.insert(i);
    }
    digest.merge();
    let total: u64 = digest.get().iter().map(|&(_, weight)| weight).sum();
    assert_eq!(total, 100);
    assert_eq!(digest.size(), 100);
    assert!(digest.centroid_count() < 100);
}

#[test]
fn test_merge_is_idempotent() {
    let mut digest = Digest::<f64>::new(50.0);
    for i in 0..1000 {
        digest.insert((i * 37 % 1000) as f64);
    }
    digest.merge();
    let centroids = digest.get();
    digest.merge();
    assert_eq!(digest.get(), centroids);
    assert_eq!(digest.size(), 1000);
}

#[test]
fn test_size_counts_buffered_values() {
    let mut digest = Digest::<i64>::new(100.0);
    digest.insert(3);
    digest.insert(-3);
    digest.insert(0);
    assert_eq!(digest.size(), 3);
    assert_eq!(digest.centroid_count(), 0);
    assert!(digest.get().is_empty());
    assert_eq!(digest.min_value(), Some(-3));
    assert_eq!(digest.max_value(), Some(3));
}

#[test]
fn test_get_is_sorted() {
    let mut digest = Digest::<f32, u32>::new(25.0);
    let mut rng = StdRng::seed_from_u64(7);
    for _ in 0..5000 {
        digest.insert(rng.random_range(-100.0f32..100.0));
    }
    digest.merge();
    let centroids = digest.get();
    for pair in centroids.windows(2) {
        assert!(pair[0].0 <= pair[1].0, "{:?} then {:?}", pair[0], pair[1]);
    }
    let total: u32 = centroids.iter().map(|&(_, weight)| weight).sum();
    assert_eq!(total, 5000);
}

#[test]
fn test_centroid_count_is_bounded() {
    let mut digest = Digest::<f64>::new(100.0);
    for i in 0..100_000 {
        digest.insert(i as f64);
        if i % 10_000 == 0 {
            digest.merge();
        }
    }
    digest.merge();
    assert!(
        digest.centroid_count() <= 100,
        "centroids: {}",
        digest.centroid_count()
    );
}

#[test]
fn test_cdf_is_monotonic() {
    let mut digest = Digest::<f64>::new(100.0);
    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..5000 {
        digest.insert(rng.random_range(0.0..1000.0));
    }

    let mut prev = 0.0;
    for i in -10..=1010 {
        let cdf = digest.cumulative_distribution(i as f64).unwrap();
        assert!(cdf >= prev, "cdf decreased at {i}: {prev} -> {cdf}");
        assert!((0.0..=1.0).contains(&cdf));
        prev = cdf;
    }
}

#[test]
fn test_cdf_is_monotonic_after_late_minimum() {
    let mut digest = Digest::<f64>::new(20.0);
    for i in 0..200 {
        digest.insert(i as f64);
    }
    digest.merge();
    // lands between the observed min and the first centroid
    digest.insert(0.5);
    digest.merge();

    let mut prev = 0.0;
    for i in -100..=20_100 {
        let x = i as f64 / 100.0;
        let cdf = digest.cumulative_distribution(x).unwrap();
        assert!(cdf >= prev, "cdf decreased at {x}: {prev} -> {cdf}");
        prev = cdf;
    }
}

#[test]
fn test_cdf_is_monotonic_across_many_merges() {
    let mut digest = Digest::<i32, u32>::new(20.0);
    let mut rng = StdRng::seed_from_u64(0);
    for round in 0..20 {
        for _ in 0..50 {
            digest.insert(rng.random_range(-1000..=1000));
        }
        digest.merge();

        let mut prev = 0.0;
        for x in -1001..=1001 {
            let cdf = digest.cumulative_distribution(x).unwrap();
            assert!(cdf >= prev, "round {round}: cdf decreased at {x}: {prev} -> {cdf}");
            prev = cdf;
        }
    }
}

#[test]
fn test_quantile_is_monotonic() {
    let mut digest = Digest::<u16>::new(25.0);
    let mut rng = StdRng::seed_from_u64(1);
    for _ in 0..2000 {
        digest.insert(rng.random_range(0..=u16::MAX));
    }

    let mut prev = 0;
    for i in 0..=1000 {
        let value = digest.quantile(i as f64 / 10.0).unwrap();
        assert!(value >= prev, "quantile decreased at {i}: {prev} -> {value}");
        prev = value;
    }
}

#[test]
fn test_quantile_inverts_cdf() {
    let mut digest = Digest::<f64>::new(100.0);
    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..10_000 {
        digest.insert(rng.random_range(0.0..1000.0));
    }

    for i in 1..20 {
        let x = i as f64 * 50.0;
        let cdf = digest.cumulative_distribution(x).unwrap();
        let back = digest.quantile(100.0 * cdf).unwrap();
        assert_that!(back, near(x, 10.0));
    }
}

#[test]
fn test_integral_median() {
    let mut digest = Digest::<i32>::new(100.0);
    for value in -5..=5 {
        digest.insert(value);
    }
    assert_eq!(digest.quantile(50.0).unwrap(), 0);
    assert_eq!(digest.quantile(0.0).unwrap(), -5);
    assert_eq!(digest.quantile(100.0).unwrap(), 5);
}

#[test]
fn test_invalid_arguments() {
    let mut digest = Digest::<f64>::new(100.0);
    digest.insert(1.0);
    for q in [-0.1, 100.1, f64::NAN, f64::INFINITY] {
        let err = digest.quantile(q).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument, "q={q}");
    }
    let err = digest.cumulative_distribution(f64::NAN).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    // arguments are checked before emptiness
    let mut empty = Digest::<f64>::new(100.0);
    let err = empty.quantile(-1.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);
}

#[test]
fn test_infinite_query_values() {
    let mut digest = Digest::<f64>::new(100.0);
    digest.insert(1.0);
    digest.insert(2.0);
    assert_eq!(
        digest.cumulative_distribution(f64::NEG_INFINITY).unwrap(),
        0.0
    );
    assert_eq!(digest.cumulative_distribution(f64::INFINITY).unwrap(), 1.0);
}

#[test]
fn test_non_finite_values_are_ignored() {
    let mut digest = Digest::<f64>::new(100.0);
    digest.insert(f64::NAN);
    digest.insert(f64::INFINITY);
    digest.insert(f64::NEG_INFINITY);
    assert!(digest.is_empty());
    assert_eq!(digest.size(), 0);

    digest.insert(5.0);
    assert_eq!(digest.min_value(), Some(5.0));
    assert_eq!(digest.max_value(), Some(5.0));
}

#[test]
fn test_invalid_compression() {
    for compression in [0.0, -10.0, f64::NAN, f64::INFINITY] {
        let err = Digest::<f64>::try_new(compression).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
}

#[test]
#[should_panic(expected = "compression must be finite and positive")]
fn test_new_panics_on_invalid_compression() {
    Digest::<f64>::new(0.0);
}

#[test]
fn test_insert_weighted() {
    let mut digest = Digest::<u16, u32>::new(100.0);
    digest.insert_weighted(10, 3);
    digest.insert_weighted(20, 0);
    digest.insert_weighted(30, 1);
    assert_eq!(digest.size(), 4);
    assert_eq!(digest.max_value(), Some(30));

    digest.merge();
    assert_eq!(digest.get(), vec![(10, 3), (30, 1)]);
    // the heavy centroid reaches down to the minimum
    assert_eq!(digest.quantile(0.0).unwrap(), 10);
    assert_eq!(digest.quantile(100.0).unwrap(), 30);
}

#[test]
fn test_merge_digest() {
    let mut left = Digest::<f64>::new(100.0);
    let mut right = Digest::<f64>::new(100.0);
    for i in 0..500 {
        left.insert(i as f64);
        right.insert((i + 500) as f64);
    }
    right.merge();
    // one buffered value on the right as well
    right.insert(1000.0);

    left.merge_digest(&right);
    assert_eq!(left.size(), 1001);
    assert_eq!(left.min_value(), Some(0.0));
    assert_eq!(left.max_value(), Some(1000.0));
    assert_that!(left.quantile(50.0).unwrap(), near(500.0, 10.0));
    let total: u64 = left.get().iter().map(|&(_, weight)| weight).sum();
    assert_eq!(total, 1001);

    // the source digest is untouched
    assert_eq!(right.size(), 501);
    assert_eq!(right.min_value(), Some(500.0));
}

#[test]
fn test_merge_digest_with_empty() {
    let mut digest = Digest::<u8>::new(100.0);
    digest.insert(1);
    digest.merge_digest(&Digest::new(100.0));
    assert_eq!(digest.size(), 1);

    let mut empty = Digest::<u8>::new(100.0);
    empty.merge_digest(&digest);
    assert_eq!(empty.size(), 1);
    assert_eq!(empty.quantile(50.0).unwrap(), 1);
}

#[test]
fn test_auto_merge() {
    let mut digest = DigestBuilder::new(50.0)
        .auto_merge(100)
        .build::<f64, u64>();
    for i in 0..1000 {
        digest.insert(i as f64);
    }
    assert!(digest.centroid_count() > 0);
    assert_eq!(digest.size(), 1000);

    let mut manual = Digest::<f64>::new(50.0);
    for i in 0..1000 {
        manual.insert(i as f64);
    }
    assert_eq!(manual.centroid_count(), 0);
}

#[test]
#[should_panic(expected = "weight overflow")]
fn test_weight_overflow_panics() {
    // compression this small folds everything into one centroid
    let mut digest = Digest::<f64, u8>::new(1.0);
    for i in 0..300 {
        digest.insert(i as f64);
    }
    digest.merge();
}
