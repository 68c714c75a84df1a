/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

pub(crate) mod chunk_reader;
mod compress;
mod slicer;
mod stream;

// re-exports
pub use self::slicer::ChunkSlicer;
pub use self::stream::InputStream;
