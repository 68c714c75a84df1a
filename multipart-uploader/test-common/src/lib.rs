/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::io::Write;

use tempfile::NamedTempFile;

/// Byte `i` of the content written by [`create_patterned_file`]
pub fn pattern_byte(i: usize) -> u8 {
    (i % 251) as u8
}

/// Create a temporary file of `size` bytes whose content is a repeating, position-dependent
/// pattern, so misplaced or reordered bytes are detectable.
pub fn create_patterned_file(size: usize) -> NamedTempFile {
    let data = (0..size).map(pattern_byte).collect::<Vec<_>>();
    write_temp_file(&data)
}

/// Create a temporary file of `size` random bytes (practically incompressible)
pub fn create_random_file(size: usize) -> NamedTempFile {
    let mut rng = fastrand::Rng::with_seed(0x5eed);
    let data = (0..size).map(|_| rng.u8(..)).collect::<Vec<_>>();
    write_temp_file(&data)
}

/// Create a temporary file of `size` bytes of repetitive text (highly compressible)
pub fn create_compressible_file(size: usize) -> NamedTempFile {
    let line = b"2024-05-01T12:00:00Z INFO request served status=200 path=/health\n";
    let data = line.iter().copied().cycle().take(size).collect::<Vec<_>>();
    write_temp_file(&data)
}

fn write_temp_file(data: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(data).unwrap();
    file.flush().unwrap();
    file
}
