//! ETSF-IO wavefunction files (netCDF-4 flavour, read through HDF5), as written by ABINIT.
//!
//! Variables used:
//! - `primitive_vectors`: `[3, 3]`, rows are the lattice vectors;
//! - `reduced_coordinates_of_kpoints`: `[nkpoints, 3]`;
//! - `real_space_wavefunctions`: `[nspin, nkpoints, nbands, nspinor, n1, n2, n3, real_or_complex]`.

use std::{
    fmt,
    path::{
        Path,
        PathBuf,
    },
};

use anyhow::{
    ensure,
    Context,
};
use hdf5::File as H5File;
use log::debug;
use ndarray as na;

use crate::{
    spectral::ifftn,
    types::{
        c64,
        Cube,
        GridShape,
        Mat33,
        Result,
    },
    settings::PotentialDatasets,
    wavefunction::{
        check_dimensions,
        reciprocal_matrix,
        WavefunctionStore,
    },
};


const PRIMITIVE_VECTORS: &str = "primitive_vectors";
const KPOINTS: &str = "reduced_coordinates_of_kpoints";
const WAVEFUNCTIONS: &str = "real_space_wavefunctions";


pub struct EtsfWavefunction {
    path:    PathBuf,
    file:    H5File,
    prim:    Mat33<f64>,
    rprim:   Mat33<f64>,
    kpts:    na::Array2<f64>,
    nspin:   usize,
    nbands:  usize,
    nspinor: usize,
    ngrid:   GridShape,
    rorc:    usize,
}


impl EtsfWavefunction {
    pub fn from_file(path: &(impl AsRef<Path> + ?Sized)) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = H5File::open(&path)
            .with_context(|| format!("Failed to open wavefunction file {:?}.", path))?;

        let prim = file.dataset(PRIMITIVE_VECTORS)
            .and_then(|d| d.read_2d::<f64>())
            .with_context(|| format!("Cannot read `{}` from {:?}.", PRIMITIVE_VECTORS, path))?;
        ensure!(prim.shape() == [3, 3], "Invalid shape of `{}`: {:?}", PRIMITIVE_VECTORS, prim.shape());
        let prim = [
            [prim[(0, 0)], prim[(0, 1)], prim[(0, 2)]],
            [prim[(1, 0)], prim[(1, 1)], prim[(1, 2)]],
            [prim[(2, 0)], prim[(2, 1)], prim[(2, 2)]],
        ];
        let rprim = reciprocal_matrix(&prim)?;

        let kpts = file.dataset(KPOINTS)
            .and_then(|d| d.read_2d::<f64>())
            .with_context(|| format!("Cannot read `{}` from {:?}.", KPOINTS, path))?;
        ensure!(kpts.ncols() == 3, "Invalid shape of `{}`: {:?}", KPOINTS, kpts.shape());

        let shape = file.dataset(WAVEFUNCTIONS)
            .with_context(|| format!("Cannot find `{}` in {:?}.", WAVEFUNCTIONS, path))?
            .shape();
        ensure!(shape.len() == 8, "`{}` should have 8 dimensions, found {:?}.", WAVEFUNCTIONS, shape);
        let [nspin, nkpoints, nbands, nspinor, n1, n2, n3, rorc] =
            [shape[0], shape[1], shape[2], shape[3], shape[4], shape[5], shape[6], shape[7]];
        ensure!(nkpoints == kpts.nrows(),
                "Inconsistent k-point number: {} in `{}` but {} in `{}`.", nkpoints, WAVEFUNCTIONS, kpts.nrows(), KPOINTS);
        check_dimensions(nspin, nkpoints, nbands, nspinor)
            .with_context(|| format!("Invalid `{}` in {:?}.", WAVEFUNCTIONS, path))?;
        ensure!(rorc == 1 || rorc == 2, "Invalid real_or_complex dimension: {}", rorc);
        ensure!(n1 > 0 && n2 > 0 && n3 > 0, "Invalid wavefunction grid: {:?}", [n1, n2, n3]);

        debug!("Opened {:?}: nspin = {}, nkpoints = {}, nbands = {}, nspinor = {}, ngrid = {:?}",
               path, nspin, nkpoints, nbands, nspinor, [n1, n2, n3]);

        Ok(Self {
            path,
            file,
            prim,
            rprim,
            kpts,
            nspin,
            nbands,
            nspinor,
            ngrid: [n1, n2, n3],
            rorc,
        })
    }

    pub fn ngrid(&self) -> GridShape {
        self.ngrid
    }

    pub fn is_complex(&self) -> bool {
        self.rorc == 2
    }

    /// Stored coefficients of one state, before the inverse FFT.
    pub fn read_coefficients(&self, iband: usize, ikpoint: usize, ispin: usize, ispinor: usize) -> Result<Cube<c64>> {
        self.check_indices(iband, ikpoint, ispin, ispinor)?;

        let raw = self.file.dataset(WAVEFUNCTIONS)?
            .read_slice::<f64, _, na::Ix4>(na::s![ispin, ikpoint, iband, ispinor, .., .., .., ..])
            .with_context(|| format!("Failed to read wavefunction of band {}, k-point {}, spin {}, spinor {} from {:?}.",
                                     iband + 1, ikpoint + 1, ispin + 1, ispinor + 1, self.path))?;

        Ok(if self.is_complex() {
            Cube::from_shape_fn(self.ngrid, |(a, b, c)| c64::new(raw[(a, b, c, 0)], raw[(a, b, c, 1)]))
        } else {
            raw.index_axis(na::Axis(3), 0).mapv(|v| c64::new(v, 0.0))
        })
    }
}


impl WavefunctionStore for EtsfWavefunction {
    fn primitive_vectors(&self) -> Mat33<f64> { self.prim }
    fn reciprocal_vectors(&self) -> Mat33<f64> { self.rprim }
    fn kpoints(&self) -> na::ArrayView2<'_, f64> { self.kpts.view() }
    fn nspin(&self) -> usize { self.nspin }
    fn nbands(&self) -> usize { self.nbands }
    fn nspinor(&self) -> usize { self.nspinor }

    fn get_wavefunction(&self, iband: usize, ikpoint: usize, ispin: usize, ispinor: usize) -> Result<Cube<c64>> {
        let coeffs = self.read_coefficients(iband, ikpoint, ispin, ispinor)?;
        Ok(ifftn(&coeffs))
    }
}


impl fmt::Display for EtsfWavefunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "# Wavefunction file {:?}", self.path)?;
        writeln!(f, " NSPIN = {}, NKPOINTS = {}, NBANDS = {}, NSPINOR = {}", self.nspin, self.nkpoints(), self.nbands, self.nspinor)?;
        writeln!(f, " NGRID = {:?}, {} coefficients", self.ngrid, if self.is_complex() { "complex" } else { "real" })?;
        writeln!(f, " Primitive vectors:")?;
        for row in self.prim.iter() {
            writeln!(f, "   {:12.6} {:12.6} {:12.6}", row[0], row[1], row[2])?;
        }
        writeln!(f, " K-points (fractional):")?;
        for (ik, k) in self.kpts.rows().into_iter().enumerate() {
            writeln!(f, "   {:4}  {:9.5} {:9.5} {:9.5}", ik + 1, k[0], k[1], k[2])?;
        }
        Ok(())
    }
}


/// Read a reciprocal-space potential grid from an HDF5 file.
///
/// The imaginary part is optional, a missing dataset means a real potential.
pub fn read_potential(path: &(impl AsRef<Path> + ?Sized), datasets: &PotentialDatasets) -> Result<Cube<c64>> {
    let path = path.as_ref();
    let file = H5File::open(path)
        .with_context(|| format!("Failed to open potential file {:?}.", path))?;

    let re = file.dataset(&datasets.real)
        .and_then(|d| d.read::<f64, na::Ix3>())
        .with_context(|| format!("Cannot read `{}` from {:?}.", datasets.real, path))?;
    ensure!(!re.is_empty(), "Empty potential `{}` in {:?}.", datasets.real, path);

    let imag = match datasets.imag.as_deref() {
        Some(name) if file.link_exists(name) => {
            let im = file.dataset(name)
                .and_then(|d| d.read::<f64, na::Ix3>())
                .with_context(|| format!("Cannot read `{}` from {:?}.", name, path))?;
            ensure!(im.shape() == re.shape(),
                    "Real and imaginary parts of the potential differ in shape: {:?} vs {:?}", re.shape(), im.shape());
            Some(im)
        },
        _ => None,
    };

    Ok(match imag {
        Some(im) => na::Zip::from(&re).and(&im).map_collect(|&r, &i| c64::new(r, i)),
        None     => re.mapv(|r| c64::new(r, 0.0)),
    })
}
