//! Entry point for the verif-align application.
//! Loads JSON sources, aligns them and prints the aligned scores along an axis.

use clap::Parser;
use std::process::ExitCode;
use verif_align::prelude::*;

mod cli;

use cli::Args;

fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    ParallelConfig::new(args.threads).setup_global_pool()?;

    let mut sources: Vec<Box<dyn Source>> = Vec::with_capacity(args.sources.len());
    for path in &args.sources {
        sources.push(Box::new(MemorySource::from_json_path(path)?));
        log::debug!("loaded source {}", path.display());
    }
    let climatology = match &args.clim {
        Some(path) => Some(Box::new(MemorySource::from_json_path(path)?) as Box<dyn Source>),
        None => None,
    };

    let options = AlignOptions {
        times: args.times.clone(),
        offsets: args.offsets.clone(),
        locations: args.locations.clone(),
        lat_range: args.lat_range,
        lon_range: args.lon_range,
        elev_range: args.elev_range,
        climatology,
        climatology_mode: args.clim_type.parse()?,
        legend: args.legend.clone(),
        require_consistent_missingness: !args.keep_missing,
        ..AlignOptions::default()
    };
    let dataset = AlignedDataset::build(sources, options)?;

    let fields = args
        .fields
        .iter()
        .map(|name| name.parse::<Field>())
        .collect::<Result<Vec<_>>>()?;
    let axis: Axis = args.axis.parse()?;

    println!("Variable: {}", dataset.variable_and_units());
    println!("{}", dataset.axis_description_header(axis, args.csv));
    let descriptions = dataset.axis_descriptions(axis, args.csv)?;

    let positions: Vec<Option<usize>> = match (axis.needs_index(), args.index) {
        (_, Some(index)) => vec![Some(index)],
        (true, None) => (0..dataset.axis_size(axis)).map(Some).collect(),
        (false, None) => vec![None],
    };

    let legend = dataset.legend();
    for position in positions {
        if let Some(desc) = position.and_then(|i| descriptions.get(i)) {
            println!("{desc}");
        }
        for (source_index, name) in legend.iter().enumerate() {
            let scores = dataset.get_scores(&fields, source_index, axis, position)?;
            for (field, values) in fields.iter().zip(&scores) {
                let rendered: Vec<String> = values.iter().map(|v| format!("{v:.3}")).collect();
                println!("  {name} {field}: [{}]", rendered.join(", "));
            }
        }
    }

    Ok(())
}
