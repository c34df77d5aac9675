use std::path::PathBuf;

use clap::Args;
use colored::Colorize;
use log::info;

use crate::{
    types::Result,
    OptProcess,
    Settings,
    soc::matrix_element_with,
    commands::common::{
        open_potential,
        open_wavefunction,
        parse_quantum_numbers,
    },
};


#[derive(Debug, Args)]
/// Calculate one spin-orbit coupling matrix element <bra|H_so|ket>.
///
/// The element vanishes identically when bra and ket sit at different k-points.
pub struct Me {
    #[arg(long, short = 'w', default_value = "./WFK.h5")]
    /// Wavefunction file in ETSF-IO format (netCDF-4/HDF5).
    wavefunction: PathBuf,

    #[arg(long, short = 'p', default_value = "./POT.h5")]
    /// HDF5 file holding the potential in reciprocal space.
    potential: PathBuf,

    #[arg(long, num_args = 3, required = true, value_names = ["IBAND", "IKPOINT", "ISPIN"])]
    /// Band, k-point and spin index of the bra state, starting from 1.
    bra: Vec<usize>,

    #[arg(long, num_args = 3, required = true, value_names = ["IBAND", "IKPOINT", "ISPIN"])]
    /// Band, k-point and spin index of the ket state, starting from 1.
    ket: Vec<usize>,

    #[arg(long)]
    /// Spinor component, starting from 1. Overrides the value in the settings.
    ispinor: Option<usize>,

    #[arg(long, short = 'c')]
    /// Settings file, `~/.rssoc.toml` is used if left empty.
    config: Option<PathBuf>,
}


impl OptProcess for Me {
    fn process(&self) -> Result<()> {
        let settings = Settings::load(self.config.as_deref())?;
        let mut opts = settings.soc_options();
        if let Some(ispinor) = self.ispinor {
            anyhow::ensure!(ispinor >= 1, "Spinor index starts from 1.");
            opts.spinor = ispinor - 1;
        }

        let bra = parse_quantum_numbers(&self.bra)?;
        let ket = parse_quantum_numbers(&self.ket)?;

        let wav = open_wavefunction(&self.wavefunction)?;
        let pot = open_potential(&self.potential, &settings)?;

        info!("Calculating <{}|H_so|{}> ...", bra, ket);
        let me = matrix_element_with(&wav, bra, ket, &pot, &opts)?;

        println!("{}", "--------------------------------------------------------------------------------".bright_black());
        println!(" bra {}", bra.to_string().bright_green());
        println!(" ket {}", ket.to_string().bright_green());
        println!(" <bra|H_so|ket> = {} {} i  (|.| = {})",
                 format!("{:15.8E}", me.re).bright_cyan(),
                 format!("{:+15.8E}", me.im).bright_cyan(),
                 format!("{:.6E}", me.norm()).bright_yellow());
        println!("{}", "--------------------------------------------------------------------------------".bright_black());

        Ok(())
    }
}
