use quadrant_codec::share::tail_padding_share;
use quadrant_core::{NamespaceId, NamespaceIdN, NAMESPACE_SIZE, PARITY_SHARES_NAMESPACE};

use crate::encoder::FecError;

/// Row-major `k x k` square of original shares, `k` a power of two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalSquare {
    width: usize,
    share_size: usize,
    shares: Vec<Vec<u8>>,
}

impl OriginalSquare {
    /// Lays shares out row-major, padding with tail-padding shares up to the
    /// smallest power-of-two width whose square holds them all.
    pub fn from_shares(mut shares: Vec<Vec<u8>>, share_size: usize) -> Result<Self, FecError> {
        if share_size <= NAMESPACE_SIZE {
            return Err(FecError::InvalidShareSize(share_size));
        }
        for (index, share) in shares.iter().enumerate() {
            if share.len() != share_size {
                return Err(FecError::InvalidShare {
                    index,
                    expected: share_size,
                    got: share.len(),
                });
            }
            if share[..NAMESPACE_SIZE] == *PARITY_SHARES_NAMESPACE.as_bytes() {
                return Err(FecError::ParityNamespace { index });
            }
        }

        let mut width = 1;
        while width * width < shares.len() {
            width *= 2;
        }
        shares.resize_with(width * width, || tail_padding_share(share_size));
        Ok(Self {
            width,
            share_size,
            shares,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn share_size(&self) -> usize {
        self.share_size
    }

    /// All shares in row-major order.
    pub fn shares(&self) -> &[Vec<u8>] {
        &self.shares
    }

    pub fn row(&self, row: usize) -> &[Vec<u8>] {
        &self.shares[row * self.width..(row + 1) * self.width]
    }

    pub fn get(&self, row: usize, col: usize) -> &[u8] {
        &self.shares[row * self.width + col]
    }
}

/// Row-major `2k x 2k` erasure-extended square.
///
/// The top-left quadrant holds the original shares. Every other cell is a
/// parity leaf: the parity namespace followed by `share_size` coded bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedSquare {
    width: usize,
    share_size: usize,
    cells: Vec<Vec<u8>>,
}

impl ExtendedSquare {
    /// Assembles an extended square from row-major cells, checking shape.
    pub fn from_cells(
        width: usize,
        share_size: usize,
        cells: Vec<Vec<u8>>,
    ) -> Result<Self, FecError> {
        if width < 2 || !width.is_power_of_two() {
            return Err(FecError::InvalidWidth(width));
        }
        if share_size <= NAMESPACE_SIZE {
            return Err(FecError::InvalidShareSize(share_size));
        }
        if cells.len() != width * width {
            return Err(FecError::InvalidShareCount {
                expected: width * width,
                got: cells.len(),
            });
        }
        let square = Self {
            width,
            share_size,
            cells,
        };
        for (index, cell) in square.cells.iter().enumerate() {
            let parity = square.is_parity(index / width, index % width);
            let expected = if parity {
                NAMESPACE_SIZE + share_size
            } else {
                share_size
            };
            if cell.len() != expected {
                return Err(FecError::InvalidShare {
                    index,
                    expected,
                    got: cell.len(),
                });
            }
            if parity && cell[..NAMESPACE_SIZE] != *PARITY_SHARES_NAMESPACE.as_bytes() {
                return Err(FecError::MissingParityPrefix { index });
            }
        }
        Ok(square)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Width of the original data quadrant.
    pub fn original_width(&self) -> usize {
        self.width / 2
    }

    pub fn share_size(&self) -> usize {
        self.share_size
    }

    pub fn get(&self, row: usize, col: usize) -> &[u8] {
        &self.cells[row * self.width + col]
    }

    /// True for cells outside the original quadrant.
    pub fn is_parity(&self, row: usize, col: usize) -> bool {
        let k = self.original_width();
        row >= k || col >= k
    }

    /// Namespace of a cell as pushed into its trees.
    pub fn namespace(&self, row: usize, col: usize) -> NamespaceId {
        if self.is_parity(row, col) {
            PARITY_SHARES_NAMESPACE
        } else {
            let mut raw = [0_u8; NAMESPACE_SIZE];
            raw.copy_from_slice(&self.get(row, col)[..NAMESPACE_SIZE]);
            NamespaceIdN(raw)
        }
    }

    /// `(cell, is_parity)` pairs of one row.
    pub fn row(&self, row: usize) -> impl Iterator<Item = (&[u8], bool)> + '_ {
        (0..self.width).map(move |col| (self.get(row, col), self.is_parity(row, col)))
    }

    /// `(cell, is_parity)` pairs of one column.
    pub fn column(&self, col: usize) -> impl Iterator<Item = (&[u8], bool)> + '_ {
        (0..self.width).map(move |row| (self.get(row, col), self.is_parity(row, col)))
    }
}
