//! Spin-orbit coupling matrix elements between planewave states.
//!
//! For states at the same k-point the element reads
//!
//! <1|H_so|2> = - Σ_{ijk} ε_{ijk} σ^i_{s1 s2} Σ_G ψ1*(G) [ (G_j V) ⊛ ((k + G)_k ψ2) ](G)
//!
//! where the convolution over the G lattice is carried out with FFTs. States at different
//! k-points never couple.

use std::collections::HashMap;

use anyhow::ensure;
use itertools::iproduct;
use log::{
    debug,
    info,
};
use ndarray as na;
use rayon::prelude::*;

use crate::{
    spectral::{
        fftn,
        gvectors_with,
        ifftn,
        levi_civita,
        max_grid,
        pad_to,
        pauli,
        shape_of,
        to_cartesian,
        Indexing,
    },
    types::{
        c64,
        Cube,
        GridShape,
        Mat33,
        Result,
    },
    wavefunction::{
        QuantumNumbers,
        WavefunctionStore,
    },
};


/// Pauli factors below this magnitude are structural zeros, the whole term is skipped.
const PAULI_ZERO: f64 = 1E-12;


#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SocOptions {
    /// Spinor component fetched from the store.
    pub spinor:   usize,
    pub indexing: Indexing,
}


/// Potential-dependent part of the contraction on one common grid.
///
/// Holds the cartesian G-vectors of the grid and the forward FFTs of `G_j · V` for the three
/// cartesian components, so many state pairs can share them.
pub struct SocKernel {
    grid:   GridShape,
    gcart:  na::Array2<f64>,
    ej_fft: [Cube<c64>; 3],
}


impl SocKernel {
    /// `grid` must be at least as large as the potential along every axis.
    pub fn new(potential: &Cube<c64>, grid: GridShape, rprim: &Mat33<f64>, indexing: Indexing) -> Self {
        let gcart = to_cartesian(rprim, &gvectors_with(grid, indexing));
        let potential = pad_to(potential, grid);

        let ej = |j: usize| {
            let prod = flat_product(&potential, gcart.column(j).iter().copied());
            fftn(&prod)
        };
        let ej_fft = [ej(0), ej(1), ej(2)];

        Self { grid, gcart, ej_fft }
    }

    pub fn grid(&self) -> GridShape {
        self.grid
    }

    /// Matrix element between a bra and a ket field, `kpt` is the cartesian k-point of the ket.
    pub fn element(&self, bra: &Cube<c64>, ket: &Cube<c64>, kpt: [f64; 3], spins: (bool, bool)) -> c64 {
        let wf1 = pad_to(bra, self.grid);
        let wf2 = pad_to(ket, self.grid);

        // FFT of P_k = (k + G)_k · ψ2, built on first use
        let mut pk_fft: [Option<Cube<c64>>; 3] = [None, None, None];

        let mut me = c64::new(0.0, 0.0);
        for (levi, [i, j, k]) in levi_civita() {
            let psigma = pauli(spins.0, spins.1, i);
            if psigma.norm() < PAULI_ZERO {
                debug!("Skip term ({}, {}, {}): vanishing Pauli factor.", i, j, k);
                continue;
            }

            let pk = pk_fft[k.index()].get_or_insert_with(|| {
                let kk = kpt[k.index()];
                let prod = flat_product(&wf2, self.gcart.column(k.index()).iter().map(|g| kk + g));
                fftn(&prod)
            });

            let ejpk = ifftn(&(&self.ej_fft[j.index()] * &*pk));
            let dot = wf1.iter().zip(ejpk.iter())
                .map(|(a, b)| a.conj() * b)
                .sum::<c64>();

            me += psigma.scale(-levi) * dot;
        }

        me
    }
}


fn ensure_grid(name: &str, field: &Cube<c64>) -> Result<()> {
    let shape = shape_of(field);
    ensure!(shape.iter().all(|&n| n > 0), "Invalid grid shape of the {}: {:?}", name, shape);
    Ok(())
}


// Multiply a field by one factor per flat index, the factors follow the G-vector order.
fn flat_product(field: &Cube<c64>, factors: impl Iterator<Item = f64>) -> Cube<c64> {
    let mut ret = field.to_owned();
    ret.iter_mut().zip(factors).for_each(|(v, f)| *v = v.scale(f));
    ret
}


/// Spin-orbit matrix element `<bra|H_so|ket>` with default options.
pub fn matrix_element<S>(store: &S, bra: QuantumNumbers, ket: QuantumNumbers, potential: &Cube<c64>) -> Result<c64>
where S: WavefunctionStore + ?Sized {
    matrix_element_with(store, bra, ket, potential, &SocOptions::default())
}


/// Spin-orbit matrix element `<bra|H_so|ket>`.
///
/// Returns exactly zero without touching the store when the k-points differ. `potential`
/// is the reciprocal-space potential and is never modified.
pub fn matrix_element_with<S>(store: &S, bra: QuantumNumbers, ket: QuantumNumbers, potential: &Cube<c64>, opts: &SocOptions) -> Result<c64>
where S: WavefunctionStore + ?Sized {
    if bra.ikpoint != ket.ikpoint {
        debug!("{} and {} sit at different k-points, they do not couple.", bra, ket);
        return Ok(c64::new(0.0, 0.0));
    }

    ensure_grid("potential", potential)?;
    let wfk1 = store.get_wavefunction(bra.iband, bra.ikpoint, bra.ispin, opts.spinor)?;
    let wfk2 = store.get_wavefunction(ket.iband, ket.ikpoint, ket.ispin, opts.spinor)?;
    ensure_grid("bra", &wfk1)?;
    ensure_grid("ket", &wfk2)?;
    let kpt  = store.kpoint_cartesian(ket.ikpoint)?;

    let grid = max_grid(&[shape_of(&wfk1), shape_of(&wfk2), shape_of(potential)]);
    debug!("Common grid of {} and {}: {:?}", bra, ket, grid);

    let kernel = SocKernel::new(potential, grid, &store.reciprocal_vectors(), opts.indexing);
    Ok(kernel.element(&wfk1, &wfk2, kpt, (bra.spin_label(), ket.spin_label())))
}


/// Band-to-band spin-orbit matrix at one k-point.
///
/// `bands` counts from 0. The result has shape `(nspin * nspin, nbands, nbands)`, block
/// `s1 * nspin + s2` couples spin `s1` (bra) to spin `s2` (ket), i.e. `[uu, ud, du, dd]`
/// for spin-polarized stores. Each field is read once and the pairs run in parallel.
pub fn soc_matrix<S>(store: &S, ikpoint: usize, bands: &[usize], potential: &Cube<c64>, opts: &SocOptions) -> Result<na::Array3<c64>>
where S: WavefunctionStore + ?Sized {
    ensure!(!bands.is_empty(), "No band selected.");
    ensure!(ikpoint < store.nkpoints(), "K-point index out of range: {} >= {}", ikpoint, store.nkpoints());
    ensure_grid("potential", potential)?;

    let nspin = store.nspin();
    let nb = bands.len();
    info!("Reading {} wavefunctions at k-point {} ...", nspin * nb, ikpoint + 1);

    let fields = (0 .. nspin)
        .map(|ispin| {
            bands.iter()
                .map(|&iband| store.get_wavefunction(iband, ikpoint, ispin, opts.spinor))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    for field in fields.iter().flatten() {
        ensure_grid("wavefunction", field)?;
    }
    let kpt = store.kpoint_cartesian(ikpoint)?;
    let rprim = store.reciprocal_vectors();

    let tasks = iproduct!(0 .. nspin, 0 .. nspin, 0 .. nb, 0 .. nb)
        .map(|(s1, s2, i, j)| {
            let grid = max_grid(&[shape_of(&fields[s1][i]), shape_of(&fields[s2][j]), shape_of(potential)]);
            (s1, s2, i, j, grid)
        })
        .collect::<Vec<_>>();

    let mut kernels: HashMap<GridShape, SocKernel> = HashMap::new();
    for &(_, _, _, _, grid) in tasks.iter() {
        kernels.entry(grid)
            .or_insert_with(|| SocKernel::new(potential, grid, &rprim, opts.indexing));
    }

    info!("Contracting {} state pairs ...", tasks.len());
    let values = tasks.into_par_iter()
        .map(|(s1, s2, i, j, grid)| {
            kernels[&grid].element(&fields[s1][i], &fields[s2][j], kpt, (s1 != 0, s2 != 0))
        })
        .collect::<Vec<c64>>();

    Ok(na::Array3::from_shape_vec((nspin * nspin, nb, nb), values)?)
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use crate::wavefunction::MemoryWavefunction;

    fn identity() -> Mat33<f64> {
        [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]
    }

    #[test]
    fn test_kpoint_mismatch_is_exact_zero() {
        let kpts = na::arr2(&[[0.0, 0.0, 0.0], [0.5, 0.5, 0.0]]);
        let wav = MemoryWavefunction::new(identity(), kpts, 2, 2, 1, [2, 2, 2]).unwrap();
        let pot = Cube::from_elem([2, 2, 2], c64::new(1.0, 1.0));

        for (ib1, ib2, is1, is2) in iproduct!(0 .. 2, 0 .. 2, 0 .. 2, 0 .. 2) {
            let me = matrix_element(&wav, QuantumNumbers::new(ib1, 0, is1), QuantumNumbers::new(ib2, 1, is2), &pot).unwrap();
            assert_eq!(me, c64::new(0.0, 0.0));
        }

        // the store is not consulted, even out-of-range bands give zero
        let me = matrix_element(&wav, QuantumNumbers::new(9, 0, 0), QuantumNumbers::new(9, 1, 0), &pot).unwrap();
        assert_eq!(me, c64::new(0.0, 0.0));
    }

    #[test]
    fn test_out_of_range_propagates() {
        let kpts = na::arr2(&[[0.0, 0.0, 0.0]]);
        let wav = MemoryWavefunction::new(identity(), kpts, 1, 2, 1, [2, 2, 2]).unwrap();
        let pot = Cube::zeros([2, 2, 2]);
        assert!(matrix_element(&wav, QuantumNumbers::new(2, 0, 0), QuantumNumbers::new(0, 0, 0), &pot).is_err());
        assert!(matrix_element(&wav, QuantumNumbers::new(0, 0, 0), QuantumNumbers::new(0, 0, 1), &pot).is_err());
    }

    #[test]
    fn test_kernel_pads_to_common_grid() {
        let pot = Cube::from_shape_fn([4, 4, 3], |(a, b, c)| c64::new(1.0 + a as f64, (b + 2 * c) as f64));
        let kernel = SocKernel::new(&pot, max_grid(&[[2, 2, 2], [2, 2, 2], [4, 4, 3]]), &identity(), Indexing::Ij);
        assert_eq!(kernel.grid(), [4, 4, 3]);

        // bra: spike at G = (-1, 0, 0), which lands at index 3 of the padded first axis
        // ket: spike at G = 0, so only G_x V(3, 0, 0) k survives
        let mut bra = Cube::<c64>::zeros([2, 2, 2]);
        bra[[1, 0, 0]] = c64::new(1.0, 0.0);
        let mut ket = Cube::<c64>::zeros([2, 2, 2]);
        ket[[0, 0, 0]] = c64::new(1.0, 0.0);

        let v = pot[[3, 0, 0]];
        let (ky, kz) = (0.5, 0.25);
        let kpt = [0.0, ky, kz];
        let i = c64::new(0.0, 1.0);

        assert_abs_diff_eq!(kernel.element(&bra, &ket, kpt, (false, false)),  v * ky, epsilon = 1E-12);
        assert_abs_diff_eq!(kernel.element(&bra, &ket, kpt, (true,  true)),  -v * ky, epsilon = 1E-12);
        assert_abs_diff_eq!(kernel.element(&bra, &ket, kpt, (false, true)),   i * v * kz, epsilon = 1E-12);
        assert_abs_diff_eq!(kernel.element(&bra, &ket, kpt, (true,  false)), -i * v * kz, epsilon = 1E-12);
        assert_abs_diff_eq!(kernel.element(&bra, &ket, [0.0; 3], (false, false)), c64::new(0.0, 0.0), epsilon = 1E-12);
    }

    #[test]
    fn test_malformed_grids_are_rejected() {
        let kpts = na::arr2(&[[0.0, 0.0, 0.0]]);
        let mut wav = MemoryWavefunction::new(identity(), kpts, 1, 2, 1, [2, 2, 2]).unwrap();
        wav.set_coefficients(0, 0, 0, 0, Cube::from_elem([2, 2, 2], c64::new(1.0, 0.0))).unwrap();
        let q1 = QuantumNumbers::new(0, 0, 0);
        let q2 = QuantumNumbers::new(1, 0, 0);

        for shape in [[0, 2, 2], [2, 0, 2], [2, 2, 0]] {
            let pot = Cube::<c64>::zeros(shape);
            assert!(matrix_element(&wav, q1, q2, &pot).is_err());
            assert!(soc_matrix(&wav, 0, &[0, 1], &pot, &SocOptions::default()).is_err());
        }

        let kpts = na::arr2(&[[0.0, 0.0, 0.0]]);
        assert!(MemoryWavefunction::new(identity(), kpts, 1, 2, 1, [0, 2, 2]).is_err());
    }

    #[test]
    #[should_panic]
    fn test_kernel_rejects_empty_potential() {
        SocKernel::new(&Cube::zeros([0, 2, 2]), [2, 2, 2], &identity(), Indexing::Ij);
    }

    #[test]
    fn test_potential_is_not_mutated() {
        let kpts = na::arr2(&[[0.25, 0.0, 0.0]]);
        let mut wav = MemoryWavefunction::new(identity(), kpts, 1, 1, 1, [2, 2, 2]).unwrap();
        wav.set_coefficients(0, 0, 0, 0, Cube::from_shape_fn([2, 2, 2], |(a, b, c)| c64::new(a as f64, (b + c) as f64))).unwrap();

        let pot = Cube::from_shape_fn([3, 2, 2], |(a, b, c)| c64::new((a + b) as f64, c as f64));
        let orig = pot.clone();
        let q = QuantumNumbers::new(0, 0, 0);
        let me1 = matrix_element(&wav, q, q, &pot).unwrap();
        let me2 = matrix_element(&wav, q, q, &pot).unwrap();
        assert_eq!(pot, orig);
        assert_eq!(me1, me2);
    }

    #[test]
    fn test_soc_matrix_matches_single_elements() {
        let kpts = na::arr2(&[[0.0, 0.25, 0.0], [0.0, 0.0, 0.5]]);
        let mut wav = MemoryWavefunction::new(identity(), kpts, 2, 3, 1, [2, 2, 2]).unwrap();
        for (ispin, iband) in iproduct!(0 .. 2, 0 .. 3) {
            let coeffs = Cube::from_shape_fn([2, 2, 2], |(a, b, c)| {
                c64::new((a + 2 * b + iband) as f64, (c + ispin) as f64 - 0.5)
            });
            wav.set_coefficients(iband, 0, ispin, 0, coeffs).unwrap();
        }
        let pot = Cube::from_shape_fn([3, 2, 2], |(a, b, c)| c64::new(1.0 + a as f64, (b * c) as f64));

        let bands = [0usize, 2];
        let opts = SocOptions::default();
        let hmm = soc_matrix(&wav, 0, &bands, &pot, &opts).unwrap();
        assert_eq!(hmm.shape(), &[4, 2, 2]);

        for (s1, s2, i, j) in iproduct!(0 .. 2, 0 .. 2, 0 .. 2, 0 .. 2) {
            let me = matrix_element_with(&wav,
                                         QuantumNumbers::new(bands[i], 0, s1),
                                         QuantumNumbers::new(bands[j], 0, s2),
                                         &pot, &opts).unwrap();
            assert_abs_diff_eq!(hmm[(s1 * 2 + s2, i, j)], me, epsilon = 1E-12);
        }
    }

    #[test]
    fn test_soc_matrix_rejects_bad_input() {
        let kpts = na::arr2(&[[0.0, 0.0, 0.0]]);
        let wav = MemoryWavefunction::new(identity(), kpts, 1, 2, 1, [2, 2, 2]).unwrap();
        let pot = Cube::zeros([2, 2, 2]);
        assert!(soc_matrix(&wav, 0, &[], &pot, &SocOptions::default()).is_err());
        assert!(soc_matrix(&wav, 1, &[0], &pot, &SocOptions::default()).is_err());
        assert!(soc_matrix(&wav, 0, &[0, 5], &pot, &SocOptions::default()).is_err());
    }
}
