//! Parallel helpers built on rayon.
//!
//! `try_par_map_limited` bounds how many items are in flight, since each
//! region cut allocates a full-image graph. `par_for_each_row` hands bands of
//! grid rows to the pool.

use rayon::prelude::*;

use crate::Buffer2;

/// Row bands per pool thread. More bands than threads keeps the pool busy
/// when some bands finish early.
const BANDS_PER_THREAD: usize = 3;

fn rows_per_band(height: usize) -> usize {
    (height / (rayon::current_num_threads() * BANDS_PER_THREAD)).max(1)
}

/// Maps a fallible `f` over `items` in parallel, at most `max_concurrent`
/// at a time. Output order matches input order.
///
/// Items are processed in consecutive chunks; the first chunk containing an
/// error ends the map and later chunks are never started.
///
/// # Panics
///
/// Panics if `max_concurrent` is 0.
pub fn try_par_map_limited<T, R, E, F>(
    items: &[T],
    max_concurrent: usize,
    f: F,
) -> Result<Vec<R>, E>
where
    T: Sync,
    R: Send,
    E: Send,
    F: Fn(&T) -> Result<R, E> + Sync,
{
    assert!(max_concurrent > 0, "max_concurrent must be > 0");

    items
        .chunks(max_concurrent)
        .try_fold(Vec::with_capacity(items.len()), |mut mapped, chunk| {
            let chunk: Vec<R> = chunk.par_iter().map(&f).collect::<Result<_, E>>()?;
            mapped.extend(chunk);
            Ok(mapped)
        })
}

/// Calls `f(y, row)` for every row of `buffer`, bands of rows in parallel.
pub fn par_for_each_row<T, F>(buffer: &mut Buffer2<T>, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    let width = buffer.width();
    if width == 0 {
        return;
    }
    let band_rows = rows_per_band(buffer.height());
    buffer
        .pixels_mut()
        .par_chunks_mut(width * band_rows)
        .enumerate()
        .for_each(|(band, pixels)| {
            for (i, row) in pixels.chunks_mut(width).enumerate() {
                f(band * band_rows + i, row);
            }
        });
}
