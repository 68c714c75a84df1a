/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::fmt;
use std::time::Duration;

/// Units of measurement
pub mod unit {
    /// Binary byte units
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum ByteUnit {
        /// 1 byte
        Byte,
        /// 2<sup>10</sup> bytes
        Kibibyte,
        /// 2<sup>20</sup> bytes
        Mebibyte,
        /// 2<sup>30</sup> bytes
        Gibibyte,
    }

    impl ByteUnit {
        /// The number of bytes represented by this unit
        pub const fn as_bytes_u64(&self) -> u64 {
            match self {
                ByteUnit::Byte => 1,
                ByteUnit::Kibibyte => 1 << 10,
                ByteUnit::Mebibyte => 1 << 20,
                ByteUnit::Gibibyte => 1 << 30,
            }
        }

        /// Largest unit that `bytes` is at least one of
        pub fn fitting(bytes: u64) -> ByteUnit {
            [ByteUnit::Gibibyte, ByteUnit::Mebibyte, ByteUnit::Kibibyte]
                .into_iter()
                .find(|u| bytes >= u.as_bytes_u64())
                .unwrap_or(ByteUnit::Byte)
        }

        pub(crate) const fn symbol(&self) -> &'static str {
            match self {
                ByteUnit::Byte => "B",
                ByteUnit::Kibibyte => "KiB",
                ByteUnit::Mebibyte => "MiB",
                ByteUnit::Gibibyte => "GiB",
            }
        }
    }
}

use unit::ByteUnit;

/// A byte count that formats itself in the largest fitting binary unit.
///
/// Whole multiples print without a fraction (`5 MiB`), everything else with two decimals unless
/// a precision is given (`7.20 MiB`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSize(pub u64);

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = ByteUnit::fitting(self.0);
        let per_unit = unit.as_bytes_u64();
        if self.0 % per_unit == 0 {
            return write!(f, "{} {}", self.0 / per_unit, unit.symbol());
        }
        let precision = f.precision().unwrap_or(2);
        write!(
            f,
            "{:.*} {}",
            precision,
            self.0 as f64 / per_unit as f64,
            unit.symbol()
        )
    }
}

/// Payload bytes moved over the lifetime of an upload
#[derive(Debug, Clone, Copy)]
pub struct Throughput {
    bytes: u64,
    elapsed: Duration,
}

impl Throughput {
    pub(crate) const fn new(bytes: u64, elapsed: Duration) -> Throughput {
        Throughput { bytes, elapsed }
    }

    /// Bytes sent
    pub const fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Time it took to send them
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Average rate. Zero when no time elapsed.
    pub fn bytes_per_sec(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.bytes as f64 / secs
    }
}

impl fmt::Display for Throughput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(2);
        let mib = ByteUnit::Mebibyte.as_bytes_u64() as f64;
        write!(f, "{:.*} MiB/s", precision, self.bytes_per_sec() / mib)
    }
}
