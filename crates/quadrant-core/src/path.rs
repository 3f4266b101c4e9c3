use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// One step down a binary tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    Left,
    Right,
}

/// Root-to-node branch sequence.
///
/// Read as a binary number with the topmost branch as the most significant
/// bit, a full-depth path is the leaf's linear index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct TreePath(Vec<Branch>);

impl TreePath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of leaf `index` in a complete tree of the given depth.
    pub fn from_index(index: usize, depth: usize) -> Self {
        Self(
            (0..depth)
                .rev()
                .map(|bit| {
                    if (index >> bit) & 1 == 1 {
                        Branch::Right
                    } else {
                        Branch::Left
                    }
                })
                .collect(),
        )
    }

    pub fn push(&mut self, branch: Branch) {
        self.0.push(branch);
    }

    pub fn depth(&self) -> usize {
        self.0.len()
    }

    pub fn branches(&self) -> &[Branch] {
        &self.0
    }

    /// Linear index encoded by the path.
    pub fn index(&self) -> usize {
        self.0.iter().fold(0, |acc, branch| {
            (acc << 1)
                | match branch {
                    Branch::Left => 0,
                    Branch::Right => 1,
                }
        })
    }
}

impl FromStr for TreePath {
    type Err = CoreError;

    /// Accepts `"0/1/1"` as well as `"011"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.chars()
            .filter(|c| *c != '/')
            .map(|c| match c {
                '0' => Ok(Branch::Left),
                '1' => Ok(Branch::Right),
                _ => Err(CoreError::InvalidInput("tree path may only contain 0 and 1")),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }
}

impl fmt::Display for TreePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, branch) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            f.write_str(match branch {
                Branch::Left => "0",
                Branch::Right => "1",
            })?;
        }
        Ok(())
    }
}
