use std::{
    io::Write,
    fs,
    path::Path,
};

use anyhow::{
    bail,
    ensure,
    Context,
    Result,
};
use log::info;
use ndarray::Array3;

use crate::{
    settings::Settings,
    types::{
        c64,
        Cube,
        range_parse,
        index_transform,
    },
    wavefunction::{
        etsf::read_potential,
        EtsfWavefunction,
        QuantumNumbers,
    },
};


pub fn open_wavefunction(path: &Path) -> Result<EtsfWavefunction> {
    info!("Reading wavefunctions from {:?}", path);
    EtsfWavefunction::from_file(path)
}


pub fn open_potential(path: &Path, settings: &Settings) -> Result<Cube<c64>> {
    info!("Reading potential from {:?}", path);
    let pot = read_potential(path, &settings.potential)?;
    info!("Potential grid: {:?}", pot.shape());
    Ok(pot)
}


/// Convert `[band, kpoint, spin]`, all counting from 1, to quantum numbers counting from 0.
pub fn parse_quantum_numbers(input: &[usize]) -> Result<QuantumNumbers> {
    ensure!(input.len() == 3, "Three indices are needed: band, k-point and spin. Got {:?}", input);
    if input.iter().any(|&i| i == 0) {
        bail!("Indices count from 1, got {:?}", input);
    }
    Ok(QuantumNumbers::new(input[0] - 1, input[1] - 1, input[2] - 1))
}


/// Parse the band index.
///
/// Negative indices are allowed to index from tail down to `-nbands`, `0` selects all bands. All the
/// indices are sorted, deduplicated and converted to count from 0.
pub fn parse_ibands(input: &[String], nbands: usize) -> Result<Vec<usize>> {
    ensure!(nbands > 0, "No bands available.");
    let mut ret = input.iter()
        .map(|x| range_parse(x))
        .collect::<Result<Vec<Vec<i32>>>>()?
        .into_iter()
        .map(|x| {
            if let Some(i) = x.iter().find(|i| i.unsigned_abs() as usize > nbands) {
                bail!("Band index {} out of range, only {} bands available.", i, nbands);
            }
            Ok(x)
        })
        .collect::<Result<Vec<Vec<i32>>>>()?
        .into_iter()
        .flat_map(|x| index_transform(x, nbands).into_iter())
        .map(|x| {
            ensure!(x >= 1 && x <= nbands, "Band index {} out of range, only {} bands available.", x, nbands);
            Ok(x - 1)
        })
        .collect::<Result<Vec<usize>>>()?;

    if ret.is_empty() {
        bail!("No bands selected.");
    }

    ret.sort();
    ret.dedup();
    Ok(ret)
}


/// Write the SOC matrix as a table, one pair per line, indices count from 1.
pub fn write_soc_to_txt(file_name: &(impl AsRef<Path> + ?Sized), hmm: &Array3<c64>, bands: &[usize], comment: &str) -> Result<()> {
    let nblock = hmm.shape()[0];
    let nspin = (nblock as f64).sqrt().round() as usize;
    ensure!(nspin * nspin == nblock, "Invalid SOC matrix with {} spin blocks.", nblock);
    ensure!(hmm.shape()[1] == bands.len() && hmm.shape()[2] == bands.len(),
            "SOC matrix of shape {:?} does not match {} bands.", hmm.shape(), bands.len());

    let mut f = fs::OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(file_name)
        .with_context(|| format!("Cannot open {:?} for writing.", file_name.as_ref()))?;

    writeln!(f, "# {}", comment.trim())?;
    writeln!(f, "# {:>4} {:>4} {:>6} {:>6} {:>15} {:>15} {:>15}", "s1", "s2", "band1", "band2", "Re", "Im", "Abs")?;

    for ((iblock, i, j), v) in hmm.indexed_iter() {
        writeln!(f, "  {:4} {:4} {:6} {:6} {:15.6E} {:15.6E} {:15.6E}",
                 iblock / nspin + 1, iblock % nspin + 1, bands[i] + 1, bands[j] + 1,
                 v.re, v.im, v.norm())?;
    }

    Ok(())
}
