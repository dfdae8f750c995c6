// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::num::NonZeroUsize;

/// Splits `items` into consecutive chunks of at most `batch_size`, in order.
/// Only the last chunk may be shorter; an empty input yields no chunk.
pub fn partition<T>(items: &[T], batch_size: NonZeroUsize) -> std::slice::Chunks<'_, T> {
    items.chunks(batch_size.get())
}

/// Number of chunks `partition` will yield.
#[must_use]
pub fn batch_count(len: usize, batch_size: NonZeroUsize) -> usize {
    len.div_ceil(batch_size.get())
}
