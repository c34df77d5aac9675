pub mod types;
pub mod spectral;
pub mod wavefunction;
pub mod soc;
pub mod settings;
pub mod commands;
pub mod cli;

pub use types::{
    c64,
    Result,
    Axis,
    Cube,
    GridShape,
};

pub use cli::OptProcess;

pub use spectral::{
    levi_civita,
    pauli,
    gvectors,
    gvectors_with,
    Indexing,
};

pub use wavefunction::{
    QuantumNumbers,
    WavefunctionStore,
    MemoryWavefunction,
    EtsfWavefunction,
};

pub use soc::{
    matrix_element,
    matrix_element_with,
    soc_matrix,
    SocOptions,
    SocKernel,
};

pub use settings::{
    Settings,
    PotentialDatasets,
};
