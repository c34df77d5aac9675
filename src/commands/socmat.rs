use std::path::PathBuf;

use clap::Args;
use anyhow::ensure;
use hdf5::File as H5File;
use log::{
    info,
    warn,
};

use crate::{
    types::Result,
    OptProcess,
    Settings,
    WavefunctionStore,
    soc::soc_matrix,
    commands::common::{
        open_potential,
        open_wavefunction,
        parse_ibands,
        write_soc_to_txt,
    },
};


#[derive(Debug, Args)]
#[command(allow_negative_numbers = true)]
/// Calculate the band-to-band spin-orbit coupling matrix at one k-point.
///
/// Detailed fields of the produced file:{n}
/// - ikpoint: K point index, counts from 1;{n}
/// - nspin: number of spin channels;{n}
/// - bands: selected band indices, count from 1;{n}
/// - soc_r/soc_i: real and imaginary part of the SOC matrix, shape (nspin*nspin, nbands, nbands),
///   layout [uu, ud, du, dd] for spin-polarized wavefunctions.
pub struct Socmat {
    #[arg(long, short = 'w', default_value = "./WFK.h5")]
    /// Wavefunction file in ETSF-IO format (netCDF-4/HDF5).
    wavefunction: PathBuf,

    #[arg(long, short = 'p', default_value = "./POT.h5")]
    /// HDF5 file holding the potential in reciprocal space.
    potential: PathBuf,

    #[arg(long, short = 'k', default_value_t = 1)]
    /// One selected K-Point index, count starts from 1.
    ikpoint: usize,

    #[arg(long, short = 'b', num_args(1..), required = true)]
    /// Selected band indices, starting from 1.
    ///
    /// You can input ranges directly: `-b 1..4 7 -1`
    ibands: Vec<String>,

    #[arg(long, short = 'o', default_value = "./SOC.h5")]
    /// Output file name.
    h5out: PathBuf,

    #[arg(long)]
    /// Also write the matrix as a plain text table.
    txtout: Option<PathBuf>,

    #[arg(long, short = 'c')]
    /// Settings file, `~/.rssoc.toml` is used if left empty.
    config: Option<PathBuf>,
}


impl OptProcess for Socmat {
    fn process(&self) -> Result<()> {
        let settings = Settings::load(self.config.as_deref())?;
        let opts = settings.soc_options();

        let wav = open_wavefunction(&self.wavefunction)?;
        ensure!(self.ikpoint >= 1 && self.ikpoint <= wav.nkpoints(),
                "K-point index {} out of range, only {} k-points available.", self.ikpoint, wav.nkpoints());
        let ikpoint = self.ikpoint - 1;
        let bands = parse_ibands(&self.ibands, wav.nbands())?;
        let pot = open_potential(&self.potential, &settings)?;

        if wav.nspinor() > 1 {
            warn!("Wavefunctions carry {} spinor components, only component {} is used.", wav.nspinor(), opts.spinor + 1);
        }

        let hmm = soc_matrix(&wav, ikpoint, &bands, &pot, &opts)?;

        info!("Saving to {:?}", &self.h5out);
        let bands_out = bands.iter().map(|b| b + 1).collect::<Vec<usize>>();

        let f = H5File::create(&self.h5out)?;
        f.new_dataset::<usize>().create("ikpoint")?.write_scalar(&self.ikpoint)?;
        f.new_dataset::<usize>().create("nspin")?.write_scalar(&wav.nspin())?;
        f.new_dataset_builder().with_data(&bands_out).create("bands")?;
        f.new_dataset_builder().with_data(&hmm.mapv(|v| v.re)).create("soc_r")?;
        f.new_dataset_builder().with_data(&hmm.mapv(|v| v.im)).create("soc_i")?;

        if let Some(txtout) = self.txtout.as_ref() {
            info!("Writing {:?}", txtout);
            write_soc_to_txt(txtout, &hmm, &bands,
                             &format!("SOC matrix at k-point {} of {:?}", self.ikpoint, self.wavefunction))?;
        }

        Ok(())
    }
}
