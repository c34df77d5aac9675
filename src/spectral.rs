//! Numeric helpers shared by the spin-orbit engine: Levi-Civita and Pauli symbols,
//! G-vector grids in FFT ordering, n-dimensional FFTs and reciprocal-space zero padding.
//!
//! All fields are `Array3<c64>` flattened in row-major order (last axis fastest). The
//! G-vector at flat index `p` labels the coefficient at the same flat index of any field
//! with the same shape, every construction site goes through [`gvectors_with`].

use ndarray as na;
use rustfft::{
    FftDirection,
    FftPlanner,
};
use serde::{
    Serialize,
    Deserialize,
};

use crate::types::{
    c64,
    Axis,
    Cube,
    GridShape,
    Mat33,
};


const LEVI_CIVITA: [(f64, [Axis; 3]); 6] = [
    ( 1.0, [Axis::X, Axis::Y, Axis::Z]),
    ( 1.0, [Axis::Y, Axis::Z, Axis::X]),
    ( 1.0, [Axis::Z, Axis::X, Axis::Y]),
    (-1.0, [Axis::Y, Axis::X, Axis::Z]),
    (-1.0, [Axis::X, Axis::Z, Axis::Y]),
    (-1.0, [Axis::Z, Axis::Y, Axis::X]),
];


/// Nonzero components of the Levi-Civita symbol, even permutations first.
///
/// Every call returns a fresh iterator over the same 6 entries.
pub fn levi_civita() -> impl Iterator<Item = (f64, [Axis; 3])> + Clone {
    LEVI_CIVITA.iter().copied()
}


/// Element `(s1, s2)` of the Pauli matrix along `component`.
///
/// σx = [[0, 1], [1, 0]], σy = [[0, -i], [i, 0]], σz = [[1, 0], [0, -1]]
pub fn pauli(s1: bool, s2: bool, component: Axis) -> c64 {
    match component {
        Axis::X => if s1 == s2 { c64::new(0.0, 0.0) } else { c64::new(1.0, 0.0) },
        Axis::Y => if s1 == s2 { c64::new(0.0, 0.0) } else { c64::new(0.0, if s1 { 1.0 } else { -1.0 }) },
        Axis::Z => if s1 == s2 { c64::new(if s1 { -1.0 } else { 1.0 }, 0.0) } else { c64::new(0.0, 0.0) },
    }
}


/// Integer FFT frequencies of an axis with `n` points: 0, 1, ..., ceil(n/2)-1, -floor(n/2), ..., -1
pub fn fftfreq(n: usize) -> Vec<i64> {
    let n = n as i64;
    (0 .. n).map(|i| if i < (n + 1) / 2 { i } else { i - n })
        .collect()
}


/// Index convention of the G-vector mesh.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Indexing {
    /// Matrix indexing, flat index `(a * n2 + b) * n3 + c` carries `(f1[a], f2[b], f3[c])`.
    /// Matches the flattening of the fields.
    #[default]
    Ij,
    /// Cartesian (numpy's default `meshgrid`) indexing, the mesh has shape `(n2, n1, n3)`
    /// thus the first two axes are swapped with respect to the fields.
    Xy,
}


fn check_shape(shape: GridShape) {
    assert!(shape.iter().all(|&n| n > 0), "Invalid grid shape: {:?}, all the extents must be positive.", shape);
}


/// G-vectors of `shape` in matrix indexing, see [`gvectors_with`].
pub fn gvectors(shape: GridShape) -> na::Array2<i64> {
    gvectors_with(shape, Indexing::Ij)
}


/// Integer G-vectors of a grid, one row per flat index, `n1 * n2 * n3` rows in total.
///
/// Panics if any extent of `shape` is zero.
pub fn gvectors_with(shape: GridShape, indexing: Indexing) -> na::Array2<i64> {
    check_shape(shape);
    let [n1, n2, n3] = shape;
    let f1 = fftfreq(n1);
    let f2 = fftfreq(n2);
    let f3 = fftfreq(n3);

    na::Array2::from_shape_fn((n1 * n2 * n3, 3), |(p, i)| {
        let (a, b, c) = match indexing {
            Indexing::Ij => (p / (n2 * n3), (p / n3) % n2, p % n3),
            Indexing::Xy => ((p / n3) % n1, p / (n1 * n3), p % n3),
        };
        [f1[a], f2[b], f3[c]][i]
    })
}


/// Rotate integer G-vectors into cartesian coordinates: `(rprim · Gᵀ)ᵀ`.
pub fn to_cartesian(rprim: &Mat33<f64>, gvecs: &na::Array2<i64>) -> na::Array2<f64> {
    let mut ret = na::Array2::<f64>::zeros((gvecs.nrows(), 3));
    for (g, mut gc) in gvecs.rows().into_iter().zip(ret.rows_mut()) {
        for i in 0 .. 3 {
            gc[i] = (0 .. 3).map(|j| rprim[i][j] * g[j] as f64).sum();
        }
    }
    ret
}


pub fn shape_of(field: &Cube<c64>) -> GridShape {
    let dim = field.raw_dim();
    [dim[0], dim[1], dim[2]]
}


/// Element-wise maximum of several grid shapes.
pub fn max_grid(shapes: &[GridShape]) -> GridShape {
    shapes.iter().fold([0usize; 3], |acc, s| {
        [acc[0].max(s[0]), acc[1].max(s[1]), acc[2].max(s[2])]
    })
}


fn fft_inplace(field: &mut Cube<c64>, direction: FftDirection) {
    let mut planner = FftPlanner::<f64>::new();
    for iaxis in 0 .. 3 {
        let n = field.len_of(na::Axis(iaxis));
        let fft = planner.plan_fft(n, direction);
        let mut buf = vec![c64::new(0.0, 0.0); n];

        for mut lane in field.lanes_mut(na::Axis(iaxis)) {
            buf.iter_mut().zip(lane.iter()).for_each(|(b, v)| *b = *v);
            fft.process(&mut buf);
            lane.iter_mut().zip(buf.iter()).for_each(|(v, b)| *v = *b);
        }
    }
}


/// Forward 3D FFT, unnormalized.
pub fn fftn(field: &Cube<c64>) -> Cube<c64> {
    let mut ret = field.to_owned();
    fft_inplace(&mut ret, FftDirection::Forward);
    ret
}


/// Inverse 3D FFT, normalized by `1 / (n1 * n2 * n3)`.
pub fn ifftn(field: &Cube<c64>) -> Cube<c64> {
    let mut ret = field.to_owned();
    fft_inplace(&mut ret, FftDirection::Inverse);
    let n = ret.len() as f64;
    ret.mapv_inplace(|v| v.unscale(n));
    ret
}


/// Circular convolution of two fields with the same shape, evaluated with FFTs.
pub fn convolve(a: &Cube<c64>, b: &Cube<c64>) -> Cube<c64> {
    assert_eq!(a.shape(), b.shape(), "Convolution needs fields with the same shape.");
    ifftn(&(fftn(a) * fftn(b)))
}


// Position of each source coefficient on an axis of length `target`
fn frequency_map(n: usize, target: usize) -> Vec<usize> {
    fftfreq(n).into_iter()
        .map(|f| f.rem_euclid(target as i64) as usize)
        .collect()
}


/// Zero-pad a reciprocal-space field up to `shape`.
///
/// Zeros are inserted at the Nyquist boundary of each axis: the coefficient of frequency
/// `f` lands at index `f mod N` of the padded axis, so the positive frequencies stay at
/// the head and the negative ones move to the tail.
///
/// Panics if either shape has a zero extent or `shape` is smaller than the field along any axis.
pub fn pad_to(field: &Cube<c64>, shape: GridShape) -> Cube<c64> {
    check_shape(shape);
    let src = shape_of(field);
    check_shape(src);
    assert!(src.iter().zip(shape.iter()).all(|(s, t)| s <= t),
            "Cannot pad a field of shape {:?} to a smaller shape {:?}.", src, shape);

    if src == shape {
        return field.to_owned();
    }

    let m1 = frequency_map(src[0], shape[0]);
    let m2 = frequency_map(src[1], shape[1]);
    let m3 = frequency_map(src[2], shape[2]);

    let mut ret = Cube::<c64>::zeros(shape);
    for ((a, b, c), v) in field.indexed_iter() {
        ret[[m1[a], m2[b], m3[c]]] = *v;
    }
    ret
}
