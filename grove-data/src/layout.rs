//! Layout
//! ---
//!
//! Conversions between row-major and column-major storage.

/// Edge of the square tiles used by `transpose_blocked`
pub const BLOCK_SIZE: usize = 32;

/// Transposes a row-major `n_rows × n_cols` table into column-major order.
///
/// Works tile by tile so that both the rows being read and the columns being
/// written stay in cache for the whole tile.
pub fn transpose_blocked(src: &[f64], n_rows: usize, n_cols: usize, dst: &mut [f64]) {
    assert_eq!(src.len(), n_rows * n_cols);
    assert_eq!(dst.len(), n_rows * n_cols);
    for r0 in (0..n_rows).step_by(BLOCK_SIZE) {
        let r_max = (r0 + BLOCK_SIZE).min(n_rows);
        for c0 in (0..n_cols).step_by(BLOCK_SIZE) {
            let c_max = (c0 + BLOCK_SIZE).min(n_cols);
            for r in r0..r_max {
                let row = &src[r * n_cols..(r + 1) * n_cols];
                for c in c0..c_max {
                    dst[c * n_rows + r] = row[c];
                }
            }
        }
    }
}
