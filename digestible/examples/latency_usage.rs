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

use digestible::tdigest::Digest;
use digestible::tdigest::DigestBuilder;

/// Deterministic pseudo-random latencies in microseconds: mostly fast, with a slow tail.
fn synthetic_latencies(count: usize, mut state: u64) -> Vec<u32> {
    (0..count)
        .map(|_| {
            // xorshift64
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            let base = 200 + (state % 800) as u32;
            if state % 100 == 0 {
                base * 20
            } else {
                base
            }
        })
        .collect()
}

fn main() {
    // compression 100 keeps roughly 50 centroids, whatever the stream length
    let mut digest = DigestBuilder::new(100.0)
        .auto_merge(1024)
        .build::<u32, u64>();

    println!("Created digest with compression {}", digest.compression());

    println!("\nRecording 100,000 request latencies...");
    for latency in synthetic_latencies(100_000, 0x9E37_79B9_7F4A_7C15) {
        digest.insert(latency);
    }
    digest.merge();

    println!("Recorded: {}", digest.size());
    println!("Centroids: {}", digest.centroid_count());
    println!(
        "Range: {}..={} us",
        digest.min_value().unwrap_or_default(),
        digest.max_value().unwrap_or_default()
    );
    for percent in [50.0, 90.0, 99.0, 99.9] {
        let latency = digest.quantile(percent).unwrap();
        println!("p{percent:<5} {latency:>6} us");
    }
    let fast = digest.cumulative_distribution(1000).unwrap();
    println!("Served within 1ms: {:.2}%", fast * 100.0);

    // Combine with a digest recorded on another host
    println!("\nMerging a second host's digest...");
    let mut other = Digest::<u32>::new(100.0);
    for latency in synthetic_latencies(50_000, 0xD1B5_4A32_D192_ED03) {
        other.insert(latency + 150);
    }
    digest.merge_digest(&other);
    println!("Recorded: {}", digest.size());
    println!("p99 after merge: {} us", digest.quantile(99.0).unwrap());

    // Serialize and deserialize
    println!("\nSerializing digest...");
    let bytes = digest.serialize();
    println!("Serialized size: {} bytes", bytes.len());

    let mut restored = Digest::<u32>::deserialize(&bytes).unwrap();
    println!("p99 after deserialization: {} us", restored.quantile(99.0).unwrap());
}
