//! Static partitioning of work into one contiguous batch per worker

/// Batch size for every worker but the last: `max(1, total / workers)`
pub fn chunk_size(total: usize, workers: usize) -> usize {
    std::cmp::max(1, total / workers.max(1))
}

/// Split `items` into exactly `workers` contiguous batches
///
/// Worker `i < workers - 1` gets `[i * chunk, (i + 1) * chunk)`, clamped to
/// the collection; the last worker takes everything from `(workers - 1) *
/// chunk` to the end, so it absorbs the remainder and may be the largest.
/// Batches past the end of the collection are empty.
pub fn partition<T>(items: Vec<T>, workers: usize) -> Vec<Vec<T>> {
    let workers = workers.max(1);
    let chunk = chunk_size(items.len(), workers);

    let mut batches = Vec::with_capacity(workers);
    let mut rest = items;
    for _ in 0..workers - 1 {
        let take = std::cmp::min(chunk, rest.len());
        let tail = rest.split_off(take);
        batches.push(rest);
        rest = tail;
    }
    batches.push(rest);

    batches
}
