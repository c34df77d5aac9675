use std::path::PathBuf;

use clap::Args;

use crate::{
    types::Result,
    OptProcess,
    commands::common::open_wavefunction,
};


#[derive(Debug, Args)]
/// List the brief info of a wavefunction file.
pub struct Info {
    #[arg(default_value = "./WFK.h5")]
    /// Wavefunction file in ETSF-IO format (netCDF-4/HDF5).
    wavefunction: PathBuf,
}


impl OptProcess for Info {
    fn process(&self) -> Result<()> {
        let wav = open_wavefunction(&self.wavefunction)?;
        print!("{}", wav);
        Ok(())
    }
}
