use clap::Parser;
use color_eyre::eyre;
use snoopsim::options::Options;
use snoopsim::{trace, Geometry, Simulator, NUM_CORES};
use std::fs::{self, OpenOptions};
use std::io::BufWriter;
use std::path::Path;

fn open_writable(path: &Path) -> Result<BufWriter<fs::File>, std::io::Error> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)?;
    Ok(BufWriter::new(file))
}

fn main() -> eyre::Result<()> {
    env_logger::init();
    color_eyre::install()?;

    let options = Options::parse();
    log::debug!("options: {:#?}", &options);

    let geometry = Geometry::new(options.cache_size, options.associativity, options.block_size)?;
    let traces = trace::load_traces(&options.data_folder(), &options.input_file_base)?;

    println!(
        "simulating {NUM_CORES} cores [{} protocol, L1 {geometry}]",
        options.protocol
    );
    let report = Simulator::new(options.protocol, geometry, traces).run();

    println!("{report}");

    if let Some(stats_file) = &options.stats_file {
        let writer = open_writable(stats_file)?;
        serde_json::to_writer_pretty(writer, &report)?;
        println!("wrote stats to {}", stats_file.display());
    }
    Ok(())
}
