//! Command-line options for the verif-align binary.

use clap::Parser;
use std::path::PathBuf;

/// Align forecast verification sources and print their common scores
#[derive(Parser, Debug)]
#[command(
    version,
    name = "verif-align",
    about = "Align verification sources on common times, offsets and locations"
)]
pub struct Args {
    /// JSON source documents, in legend order
    #[arg(short, long = "source", required = true, num_args = 1..)]
    pub sources: Vec<PathBuf>,

    /// JSON climatology source used to compute anomalies
    #[arg(long)]
    pub clim: Option<PathBuf>,

    /// Operation applied with the climatology: subtract or divide
    #[arg(long, default_value = "subtract")]
    pub clim_type: String,

    /// Legend entries, comma separated, one per source
    #[arg(long, value_delimiter = ',')]
    pub legend: Option<Vec<String>>,

    /// Only use these initialization times (epoch seconds), comma separated
    #[arg(long, value_delimiter = ',')]
    pub times: Option<Vec<i64>>,

    /// Only use these offsets (hours), comma separated
    #[arg(long, value_delimiter = ',')]
    pub offsets: Option<Vec<f64>>,

    /// Only use these location ids, comma separated
    #[arg(long, value_delimiter = ',')]
    pub locations: Option<Vec<i64>>,

    /// Latitude range, formatted as <min>,<max>
    #[arg(long, value_parser = parse_range, allow_hyphen_values = true)]
    pub lat_range: Option<(f64, f64)>,

    /// Longitude range, formatted as <min>,<max>
    #[arg(long, value_parser = parse_range, allow_hyphen_values = true)]
    pub lon_range: Option<(f64, f64)>,

    /// Elevation range, formatted as <min>,<max>
    #[arg(long, value_parser = parse_range, allow_hyphen_values = true)]
    pub elev_range: Option<(f64, f64)>,

    /// Fields to retrieve (obs, fcst, ensemble<N>, p<threshold>, q<quantile>, obswindow, fcstwindow)
    #[arg(short, long, value_delimiter = ',', default_value = "obs,fcst")]
    pub fields: Vec<String>,

    /// Axis to slice along (time, offset, month, year, location, locationid, elev, lat, lon, threshold, quantile, no, all)
    #[arg(short, long, default_value = "no")]
    pub axis: String,

    /// Position along the axis; every position is printed when omitted
    #[arg(short, long)]
    pub index: Option<usize>,

    /// Keep each source's own missing values instead of the union across sources
    #[arg(long, default_value_t = false)]
    pub keep_missing: bool,

    /// Print axis descriptions as CSV
    #[arg(long, default_value_t = false)]
    pub csv: bool,

    /// Enable verbose output.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Number of threads to use for parallel processing. Defaults to number of CPU cores.
    #[arg(short = 't', long)]
    pub threads: Option<usize>,
}

fn parse_range(s: &str) -> Result<(f64, f64), String> {
    let parts: Vec<&str> = s.split(',').collect();
    match parts.as_slice() {
        [min, max] => {
            let min = min
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid range minimum '{min}'"))?;
            let max = max
                .trim()
                .parse::<f64>()
                .map_err(|_| format!("Invalid range maximum '{max}'"))?;
            Ok((min, max))
        }
        _ => Err("Invalid format: Expected '<min>,<max>'.".to_string()),
    }
}
