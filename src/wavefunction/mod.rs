//! Access to planewave wavefunctions.
//!
//! A store owns the structure (primitive vectors, k-points) and hands out one
//! `(band, k-point, spin, spinor)` field at a time, already inverse-Fourier-transformed
//! onto its grid.

use std::fmt;
use std::f64::consts::PI;

use anyhow::{
    ensure,
    Context,
};
use ndarray as na;

use crate::{
    spectral::ifftn,
    types::{
        c64,
        Cube,
        Mat33,
        Result,
    },
};

pub mod etsf;

pub use etsf::EtsfWavefunction;


/// Band, k-point and spin indices of a single-particle state, all counting from 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QuantumNumbers {
    pub iband:   usize,
    pub ikpoint: usize,
    pub ispin:   usize,
}

impl QuantumNumbers {
    pub fn new(iband: usize, ikpoint: usize, ispin: usize) -> Self {
        Self { iband, ikpoint, ispin }
    }

    /// Spin label fed to the Pauli matrices, spin up is `false`.
    pub fn spin_label(&self) -> bool {
        self.ispin != 0
    }
}

impl fmt::Display for QuantumNumbers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(band {}, k-point {}, spin {})", self.iband + 1, self.ikpoint + 1, self.ispin + 1)
    }
}


/// Reciprocal lattice vectors `2π · inv(prim)ᵀ`, rows are the vectors.
pub fn reciprocal_matrix(prim: &Mat33<f64>) -> Result<Mat33<f64>> {
    let cross = |a: &[f64; 3], b: &[f64; 3]| [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ];

    let c0 = cross(&prim[1], &prim[2]);
    let c1 = cross(&prim[2], &prim[0]);
    let c2 = cross(&prim[0], &prim[1]);
    let volume = prim[0][0] * c0[0] + prim[0][1] * c0[1] + prim[0][2] * c0[2];
    ensure!(volume.abs() > 1E-12, "Singular primitive vectors: {:?}", prim);

    let f = 2.0 * PI / volume;
    Ok([
        [c0[0] * f, c0[1] * f, c0[2] * f],
        [c1[0] * f, c1[1] * f, c1[2] * f],
        [c2[0] * f, c2[1] * f, c2[2] * f],
    ])
}


/// Every dimension of a wavefunction store must be positive.
pub fn check_dimensions(nspin: usize, nkpoints: usize, nbands: usize, nspinor: usize) -> Result<()> {
    ensure!(nspin > 0 && nkpoints > 0 && nbands > 0 && nspinor > 0,
            "Empty wavefunction: nspin = {}, nkpoints = {}, nbands = {}, nspinor = {}.",
            nspin, nkpoints, nbands, nspinor);
    Ok(())
}


/// Source of real-space wavefunction fields.
pub trait WavefunctionStore {
    fn primitive_vectors(&self) -> Mat33<f64>;

    /// `2π · inv(prim)ᵀ`, computed once when the store is created.
    fn reciprocal_vectors(&self) -> Mat33<f64>;

    /// Fractional k-point coordinates, one row per k-point.
    fn kpoints(&self) -> na::ArrayView2<'_, f64>;

    fn nspin(&self) -> usize;
    fn nbands(&self) -> usize;
    fn nspinor(&self) -> usize;

    fn nkpoints(&self) -> usize {
        self.kpoints().nrows()
    }

    /// Field of the state `(iband, ikpoint, ispin, ispinor)`. Fails if any index is out of range.
    fn get_wavefunction(&self, iband: usize, ikpoint: usize, ispin: usize, ispinor: usize) -> Result<Cube<c64>>;

    /// Cartesian coordinate `rprim · k` of a k-point.
    fn kpoint_cartesian(&self, ikpoint: usize) -> Result<[f64; 3]> {
        let kpts = self.kpoints();
        ensure!(ikpoint < kpts.nrows(), "K-point index out of range: {} >= {}", ikpoint, kpts.nrows());
        let k = kpts.row(ikpoint);
        let rprim = self.reciprocal_vectors();

        let mut ret = [0.0; 3];
        for i in 0 .. 3 {
            ret[i] = (0 .. 3).map(|j| rprim[i][j] * k[j]).sum();
        }
        Ok(ret)
    }

    fn check_indices(&self, iband: usize, ikpoint: usize, ispin: usize, ispinor: usize) -> Result<()> {
        ensure!(iband   < self.nbands(),   "Band index out of range: {} >= {}",    iband,   self.nbands());
        ensure!(ikpoint < self.nkpoints(), "K-point index out of range: {} >= {}", ikpoint, self.nkpoints());
        ensure!(ispin   < self.nspin(),    "Spin index out of range: {} >= {}",    ispin,   self.nspin());
        ensure!(ispinor < self.nspinor(),  "Spinor index out of range: {} >= {}",  ispinor, self.nspinor());
        Ok(())
    }
}


/// Wavefunctions kept in memory as reciprocal-space coefficient grids.
///
/// Each state may carry its own grid shape.
#[derive(Clone, Debug)]
pub struct MemoryWavefunction {
    prim:    Mat33<f64>,
    rprim:   Mat33<f64>,
    kpts:    na::Array2<f64>,
    nspin:   usize,
    nbands:  usize,
    nspinor: usize,
    coeffs:  Vec<Cube<c64>>,   // [nspin, nkpoints, nbands, nspinor]
}

impl MemoryWavefunction {
    /// All the states start as zero coefficient grids of shape `ngrid`.
    pub fn new(prim: Mat33<f64>, kpts: na::Array2<f64>, nspin: usize, nbands: usize, nspinor: usize, ngrid: [usize; 3]) -> Result<Self> {
        ensure!(kpts.ncols() == 3, "K-points must have 3 fractional coordinates, found {}.", kpts.ncols());
        check_dimensions(nspin, kpts.nrows(), nbands, nspinor)?;
        ensure!(ngrid.iter().all(|&n| n > 0), "Invalid wavefunction grid: {:?}", ngrid);
        let rprim = reciprocal_matrix(&prim)?;
        let nstates = nspin * kpts.nrows() * nbands * nspinor;

        Ok(Self {
            prim,
            rprim,
            kpts,
            nspin,
            nbands,
            nspinor,
            coeffs: vec![Cube::zeros(ngrid); nstates],
        })
    }

    fn offset(&self, iband: usize, ikpoint: usize, ispin: usize, ispinor: usize) -> usize {
        ((ispin * self.nkpoints() + ikpoint) * self.nbands + iband) * self.nspinor + ispinor
    }

    pub fn set_coefficients(&mut self, iband: usize, ikpoint: usize, ispin: usize, ispinor: usize, coeffs: Cube<c64>) -> Result<()> {
        self.check_indices(iband, ikpoint, ispin, ispinor)?;
        ensure!(!coeffs.is_empty(), "Empty coefficient grid.");
        let i = self.offset(iband, ikpoint, ispin, ispinor);
        self.coeffs[i] = coeffs;
        Ok(())
    }

    pub fn coefficients(&self, iband: usize, ikpoint: usize, ispin: usize, ispinor: usize) -> Result<&Cube<c64>> {
        self.check_indices(iband, ikpoint, ispin, ispinor)?;
        self.coeffs.get(self.offset(iband, ikpoint, ispin, ispinor))
            .context("Coefficient storage is inconsistent with the dimensions.")
    }
}

impl WavefunctionStore for MemoryWavefunction {
    fn primitive_vectors(&self) -> Mat33<f64> { self.prim }
    fn reciprocal_vectors(&self) -> Mat33<f64> { self.rprim }
    fn kpoints(&self) -> na::ArrayView2<'_, f64> { self.kpts.view() }
    fn nspin(&self) -> usize { self.nspin }
    fn nbands(&self) -> usize { self.nbands }
    fn nspinor(&self) -> usize { self.nspinor }

    fn get_wavefunction(&self, iband: usize, ikpoint: usize, ispin: usize, ispinor: usize) -> Result<Cube<c64>> {
        Ok(ifftn(self.coefficients(iband, ikpoint, ispin, ispinor)?))
    }
}
