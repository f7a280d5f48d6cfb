use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use formats::{Topology, decode_topology, first_object};
use serde_json::Value;
use spikemap::config::object_selector;
use spikemap::{Container, PropsOverrides, SpikeMap};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "spikemap", about = "Render spike maps from TopoJSON and tabular data")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Draw a spike map and write it as SVG.
    Render {
        /// TopoJSON file with the region geometries.
        #[arg(long)]
        topology: PathBuf,
        /// JSON array of data rows.
        #[arg(long)]
        data: PathBuf,
        /// JSON props overrides.
        #[arg(long)]
        props: Option<PathBuf>,
        /// Container width in pixels.
        #[arg(long, default_value_t = 600.0)]
        width: f64,
        /// Output file; stdout when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Decode a TopoJSON object to GeoJSON.
    Decode {
        #[arg(long)]
        topology: PathBuf,
        /// Object name; the first object when omitted.
        #[arg(long)]
        object: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<()> {
    match Cli::parse().command {
        Command::Render {
            topology,
            data,
            props,
            width,
            out,
        } => cmd_render(&topology, &data, props.as_deref(), width, out.as_deref()),
        Command::Decode {
            topology,
            object,
            out,
        } => cmd_decode(&topology, object.as_deref(), out.as_deref()),
    }
}

fn cmd_render(
    topology: &Path,
    data: &Path,
    props: Option<&Path>,
    width: f64,
    out: Option<&Path>,
) -> Result<()> {
    if !(width.is_finite() && width > 0.0) {
        bail!("--width must be a positive number, got {width}");
    }
    let topology = read_topology(topology)?;
    let rows = read_rows(data)?;

    let mut chart = SpikeMap::new();
    if let Some(path) = props {
        let payload = read_to_string(path)?;
        let overrides = PropsOverrides::from_json_str(&payload)
            .with_context(|| format!("parse props {}", path.display()))?;
        chart.merge_overrides(overrides);
    }
    chart
        .set_container(Container { width })
        .set_geo_data(topology)
        .set_data(rows);
    chart.draw().context("draw spike map")?;

    info!(
        spikes = chart.sites().len(),
        regions = chart.anchors().len(),
        "rendered spike map"
    );
    write_output(out, &chart.to_svg())
}

fn cmd_decode(topology: &Path, object: Option<&str>, out: Option<&Path>) -> Result<()> {
    let topology = read_topology(topology)?;
    let select = match object {
        Some(name) => {
            if topology.objects.get(name).is_none() {
                let names: Vec<&str> = topology.objects.names().collect();
                bail!("no object named {name:?}; available: {}", names.join(", "));
            }
            let name = name.to_string();
            object_selector(move |objects| objects.get(&name))
        }
        None => object_selector(first_object),
    };
    let features = decode_topology(&topology, select.as_ref()).context("decode topology")?;

    info!(features = features.features.len(), "decoded topology");
    let geojson = features
        .to_geojson_string_pretty()
        .context("encode geojson")?;
    write_output(out, &geojson)
}

fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn read_topology(path: &Path) -> Result<Topology> {
    let payload = read_to_string(path)?;
    Topology::from_json_str(&payload).with_context(|| format!("parse topology {}", path.display()))
}

fn read_rows(path: &Path) -> Result<Vec<Value>> {
    let payload = read_to_string(path)?;
    let value: Value =
        serde_json::from_str(&payload).with_context(|| format!("parse data {}", path.display()))?;
    match value {
        Value::Array(rows) => Ok(rows),
        _ => bail!("{}: data must be a JSON array of rows", path.display()),
    }
}

fn write_output(out: Option<&Path>, payload: &str) -> Result<()> {
    match out {
        Some(path) => {
            fs::write(path, payload).with_context(|| format!("write {}", path.display()))?;
            info!(path = %path.display(), bytes = payload.len(), "wrote output");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(payload.as_bytes()).context("write stdout")?;
            if !payload.ends_with('\n') {
                stdout.write_all(b"\n").context("write stdout")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
