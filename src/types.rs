use std::fmt;

use anyhow::{
    bail,
    Context,
};
use ndarray::Array3;
use regex::Regex;
use rustfft::num_complex::Complex;
use serde::{
    Serialize,
    Deserialize,
};

pub type Result<T> = anyhow::Result<T>;

#[allow(non_camel_case_types)]
pub type c64 = Complex<f64>;

pub type Cube<T>   = Array3<T>;
pub type Mat33<T> = [[T;3];3];   // 3x3 matrix

/// Grid shape (n1, n2, n3) of a planewave or real-space field.
pub type GridShape = [usize; 3];


/// Cartesian axis, also used as the Pauli matrix component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }
}

impl TryFrom<usize> for Axis {
    type Error = anyhow::Error;

    fn try_from(i: usize) -> Result<Self> {
        match i {
            0 => Ok(Self::X),
            1 => Ok(Self::Y),
            2 => Ok(Self::Z),
            _ => bail!("Invalid cartesian component: {}, only 0, 1 and 2 are available.", i),
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        };
        f.write_str(s)
    }
}


/// Parse index ranges like `"3"`, `"1..4"` (inclusive) and `"-2"`.
pub fn range_parse(input: &str) -> Result<Vec<i32>> {
    let input = input.trim();
    let re = Regex::new(r"^(-?\d+)\.\.(-?\d+)$")?;

    if let Some(caps) = re.captures(input) {
        let start = caps[1].parse::<i32>()?;
        let end   = caps[2].parse::<i32>()?;
        if start > end {
            bail!("Invalid range {:?}: the start is greater than the end.", input);
        }
        Ok((start ..= end).collect())
    } else {
        let i = input.parse::<i32>()
            .with_context(|| format!("Cannot parse {:?} as an index or a range.", input))?;
        Ok(vec![i])
    }
}


/// Transform 1-based indices into 1-based positive indices, negative indices count from
/// the tail. Index 0 selects everything. Nothing is selected when `len` is 0.
pub fn index_transform(v: Vec<i32>, len: usize) -> Vec<usize> {
    if len == 0 {
        vec![]
    } else if v.contains(&0) {
        (1 ..= len).collect()
    } else {
        v.into_iter()
         .map(|i| {
            if i < 0 {
                i.rem_euclid(len as i32) as usize + 1
            } else {
                i as usize
            }
         })
        .collect()
    }
}
