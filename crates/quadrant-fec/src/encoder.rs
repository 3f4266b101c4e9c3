use quadrant_core::{NAMESPACE_SIZE, PARITY_SHARES_NAMESPACE};
use reed_solomon_erasure::galois_8::ReedSolomon;
use thiserror::Error;

use crate::square::{ExtendedSquare, OriginalSquare};

/// Largest extended width GF(2^8) Reed-Solomon can code.
pub const MAX_EXTENDED_WIDTH: usize = 256;

/// Errors returned by square assembly and erasure extension.
#[derive(Debug, Error)]
pub enum FecError {
    #[error("share size {0} leaves no room after the namespace")]
    InvalidShareSize(usize),
    #[error("share {index} is {got} bytes, expected {expected}")]
    InvalidShare {
        index: usize,
        expected: usize,
        got: usize,
    },
    #[error("share {index} uses the reserved parity namespace")]
    ParityNamespace { index: usize },
    #[error("parity cell {index} lacks the parity namespace prefix")]
    MissingParityPrefix { index: usize },
    #[error("square width {0} is not a power of two of at least 2")]
    InvalidWidth(usize),
    #[error("square holds {got} cells, expected {expected}")]
    InvalidShareCount { expected: usize, got: usize },
    #[error("extended width {0} exceeds {MAX_EXTENDED_WIDTH}")]
    WidthTooLarge(usize),
    #[error("reed-solomon error: {0}")]
    ReedSolomon(String),
}

fn rs_err(err: reed_solomon_erasure::Error) -> FecError {
    FecError::ReedSolomon(format!("{err:?}"))
}

/// Cell bytes without the parity namespace prefix.
fn coded_bytes(square: &ExtendedSquare, row: usize, col: usize) -> &[u8] {
    let cell = square.get(row, col);
    if square.is_parity(row, col) {
        &cell[NAMESPACE_SIZE..]
    } else {
        cell
    }
}

/// Produces the erasure-extended square from original data.
pub trait ErasureEncoder: Send + Sync {
    fn extend(&self, square: &OriginalSquare) -> Result<ExtendedSquare, FecError>;
}

/// Two-dimensional Reed-Solomon extension over GF(2^8).
///
/// Rows of the original quadrant are extended to the right, then every
/// column of the top half is extended downwards.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReedSolomonEncoder;

impl ReedSolomonEncoder {
    /// Checks that every row and column of `square` is a valid codeword.
    pub fn verify(&self, square: &ExtendedSquare) -> Result<bool, FecError> {
        let w = square.width();
        let k = square.original_width();
        let rs = ReedSolomon::new(k, k).map_err(rs_err)?;
        for i in 0..w {
            let row: Vec<&[u8]> = (0..w).map(|c| coded_bytes(square, i, c)).collect();
            let col: Vec<&[u8]> = (0..w).map(|r| coded_bytes(square, r, i)).collect();
            if !rs.verify(&row).map_err(rs_err)? || !rs.verify(&col).map_err(rs_err)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl ErasureEncoder for ReedSolomonEncoder {
    fn extend(&self, square: &OriginalSquare) -> Result<ExtendedSquare, FecError> {
        let k = square.width();
        let w = 2 * k;
        if w > MAX_EXTENDED_WIDTH {
            return Err(FecError::WidthTooLarge(w));
        }
        let size = square.share_size();
        let rs = ReedSolomon::new(k, k).map_err(rs_err)?;

        let mut grid = vec![Vec::new(); w * w];
        for r in 0..k {
            for c in 0..k {
                grid[r * w + c] = square.get(r, c).to_vec();
            }
        }

        for r in 0..k {
            let mut shards: Vec<Vec<u8>> = (0..w)
                .map(|c| if c < k { grid[r * w + c].clone() } else { vec![0; size] })
                .collect();
            rs.encode(&mut shards).map_err(rs_err)?;
            for (c, shard) in shards.into_iter().enumerate().skip(k) {
                grid[r * w + c] = shard;
            }
        }

        for c in 0..w {
            let mut shards: Vec<Vec<u8>> = (0..w)
                .map(|r| if r < k { grid[r * w + c].clone() } else { vec![0; size] })
                .collect();
            rs.encode(&mut shards).map_err(rs_err)?;
            for (r, shard) in shards.into_iter().enumerate().skip(k) {
                grid[r * w + c] = shard;
            }
        }

        let cells = grid
            .into_iter()
            .enumerate()
            .map(|(i, data)| {
                if i / w >= k || i % w >= k {
                    let mut cell = Vec::with_capacity(NAMESPACE_SIZE + data.len());
                    cell.extend_from_slice(PARITY_SHARES_NAMESPACE.as_bytes());
                    cell.extend_from_slice(&data);
                    cell
                } else {
                    data
                }
            })
            .collect();
        ExtendedSquare::from_cells(w, size, cells)
    }
}
