//! emfields: evaluate formulas, solve Gauss's law and sample fields from the command line

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use emfields::{
    evaluate_once, FieldConfig, GaussConfig, GaussSolver, Grid2D, KnownQuantity, Plane,
    ScalarFieldEngine, SymmetryKind, VectorFieldEngine,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, Level};

#[derive(Parser, Debug)]
#[command(name = "emfields")]
#[command(about = "Numeric playground for electrostatic fields")]
#[command(version)]
struct Args {
    /// Log solver progress to stderr (repeat for more detail)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print results as JSON instead of columns
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a formula at one point (r = sqrt(x² + y²))
    Eval {
        formula: String,
        #[arg(short, default_value = "0", allow_hyphen_values = true)]
        x: f64,
        #[arg(short, default_value = "0", allow_hyphen_values = true)]
        y: f64,
        #[arg(short, default_value = "0", allow_hyphen_values = true)]
        z: f64,
    },

    /// Derive charge, potential and field from one of them
    Gauss {
        /// Formula in r (or x for planar symmetry)
        #[arg(default_value = "h(2-r)")]
        formula: String,

        /// spherical, cylindrical or planar
        #[arg(long, default_value = "spherical")]
        symmetry: String,

        /// Which quantity the formula gives: charge, potential or field
        #[arg(long, default_value = "charge")]
        known: String,

        /// Upper end of the axis
        #[arg(long)]
        max_extent: Option<f64>,

        /// Number of samples including the origin
        #[arg(long)]
        points: Option<usize>,

        /// Overlay curve sampled on the same axis
        #[arg(long)]
        compare: Option<String>,

        /// JSON file with solver settings
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Sample a scalar field with its gradient and Laplacian
    Scalar {
        #[arg(default_value = emfields::fields::DEFAULT_SCALAR_FORMULA)]
        formula: String,

        #[command(flatten)]
        slice: SliceArgs,

        /// value, grad-x, grad-y, grad-z, grad-mag or laplacian
        #[arg(long, default_value = "value")]
        show: String,

        /// Report the field at a fractional grid position ROW,COL
        #[arg(long, value_parser = parse_position)]
        probe: Option<(f64, f64)>,
    },

    /// Sample a vector field with its divergence and curl
    Vector {
        #[arg(long, default_value = "")]
        ax: String,
        #[arg(long, default_value = "")]
        ay: String,
        #[arg(long, default_value = "")]
        az: String,

        #[command(flatten)]
        slice: SliceArgs,

        /// ax, ay, az, div, curl-x, curl-y or curl-z
        #[arg(long, default_value = "div")]
        show: String,
    },
}

#[derive(clap::Args, Debug)]
struct SliceArgs {
    /// Plane to slice: xy, yz or zx
    #[arg(long, default_value = "xy")]
    plane: String,

    /// Value of the coordinate held fixed
    #[arg(long, default_value = "0", allow_hyphen_values = true)]
    offset: f64,

    /// Grid side length (10-80)
    #[arg(long)]
    size: Option<usize>,

    /// JSON file with field settings
    #[arg(long)]
    config: Option<PathBuf>,
}

fn parse_symmetry(s: &str) -> Result<SymmetryKind> {
    match s.to_lowercase().as_str() {
        "spherical" | "sphere" => Ok(SymmetryKind::Spherical),
        "cylindrical" | "cylinder" => Ok(SymmetryKind::Cylindrical),
        "planar" | "plane" | "slab" => Ok(SymmetryKind::Planar),
        _ => bail!("Unknown symmetry: {}. Use: spherical, cylindrical or planar", s),
    }
}

fn parse_known(s: &str) -> Result<KnownQuantity> {
    match s.to_lowercase().as_str() {
        "charge" | "rho" => Ok(KnownQuantity::Charge),
        "potential" | "v" => Ok(KnownQuantity::Potential),
        "field" | "e" => Ok(KnownQuantity::Field),
        _ => bail!("Unknown quantity: {}. Use: charge, potential or field", s),
    }
}

fn parse_plane(s: &str) -> Result<Plane> {
    match s.to_lowercase().as_str() {
        "xy" | "z" => Ok(Plane::XY),
        "yz" | "x" => Ok(Plane::YZ),
        "zx" | "xz" | "y" => Ok(Plane::ZX),
        _ => bail!("Unknown plane: {}. Use: xy, yz or zx", s),
    }
}

fn parse_position(s: &str) -> Result<(f64, f64), String> {
    let (row, col) = s
        .split_once(',')
        .ok_or_else(|| format!("expected ROW,COL, got '{}'", s))?;
    let row = row.trim().parse().map_err(|e| format!("bad row: {}", e))?;
    let col = col.trim().parse().map_err(|e| format!("bad column: {}", e))?;
    Ok((row, col))
}

fn load_config<T: DeserializeOwned + Default>(path: Option<&Path>) -> Result<T> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config file: {:?}", path))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", text);
    Ok(())
}

fn print_grid(grid: &Grid2D) {
    for row in grid.to_row_major() {
        let line: Vec<String> = row.iter().map(|v| format!("{:.6e}", v)).collect();
        println!("{}", line.join(" "));
    }
}

fn field_config(slice: &SliceArgs) -> Result<FieldConfig> {
    let mut config: FieldConfig = load_config(slice.config.as_deref())?;
    if let Some(size) = slice.size {
        config.size = size;
    }
    Ok(config)
}

#[allow(clippy::too_many_arguments)]
fn run_gauss(
    formula: &str,
    symmetry: &str,
    known: &str,
    max_extent: Option<f64>,
    points: Option<usize>,
    compare: Option<&str>,
    config: Option<&Path>,
    json: bool,
) -> Result<()> {
    let mut settings: GaussConfig = load_config(config)?;
    if let Some(extent) = max_extent {
        settings.max_extent = extent;
    }
    if let Some(points) = points {
        settings.num_points = points;
    }

    let symmetry = parse_symmetry(symmetry)?;
    let known = parse_known(known)?;
    let solver = GaussSolver::new(settings).context("Invalid solver settings")?;
    let solution = solver
        .solve(symmetry, known, formula)
        .with_context(|| format!("Cannot solve for '{}'", formula))?;
    let overlay = compare
        .map(|f| solver.sample_comparison(f))
        .transpose()
        .context("Invalid comparison formula")?;

    let ranges = solution.ranges();
    info!(
        "Ranges: charge {:?}, potential {:?}, field {:?}",
        ranges.charge, ranges.potential, ranges.field
    );

    if json {
        return print_json(&serde_json::json!({
            "solution": solution,
            "ranges": ranges,
            "comparison": overlay,
        }));
    }

    println!("# {}\tcharge\tpotential\tfield", symmetry.coordinate());
    for (i, [s, q, v, e]) in solution.columns().into_iter().enumerate() {
        match &overlay {
            Some(c) => println!(
                "{:.6e}\t{:.6e}\t{:.6e}\t{:.6e}\t{:.6e}",
                s,
                q,
                v,
                e,
                c.get(i + 1)
            ),
            None => println!("{:.6e}\t{:.6e}\t{:.6e}\t{:.6e}", s, q, v, e),
        }
    }
    Ok(())
}

fn run_scalar(
    formula: &str,
    slice: &SliceArgs,
    show: &str,
    probe: Option<(f64, f64)>,
    json: bool,
) -> Result<()> {
    let mut engine = ScalarFieldEngine::new(field_config(slice)?);
    engine.define_plane(parse_plane(&slice.plane)?, slice.offset);
    let field = engine
        .set_formula(formula)
        .with_context(|| format!("Cannot parse scalar field '{}'", formula))?
        .clone();

    if let Some((row, col)) = probe {
        let Some(reading) = engine.probe(row, col) else {
            bail!("No field to probe");
        };
        if json {
            return print_json(&reading);
        }
        println!(
            "({:.4}, {:.4}, {:.4}): F = {:.4}, grad F = ({:.4}, {:.4}, {:.4}), laplacian F = {:.4}",
            reading.point.x,
            reading.point.y,
            reading.point.z,
            reading.value,
            reading.gradient.x,
            reading.gradient.y,
            reading.gradient.z,
            reading.laplacian
        );
        return Ok(());
    }

    if json {
        return print_json(&field);
    }
    let grid = match show {
        "value" => &field.value,
        "grad-x" => &field.gradient[0],
        "grad-y" => &field.gradient[1],
        "grad-z" => &field.gradient[2],
        "grad-mag" => &field.gradient_magnitude,
        "laplacian" => &field.laplacian,
        _ => bail!(
            "Unknown grid: {}. Use: value, grad-x, grad-y, grad-z, grad-mag or laplacian",
            show
        ),
    };
    print_grid(grid);
    Ok(())
}

fn run_vector(formulas: [&str; 3], slice: &SliceArgs, show: &str, json: bool) -> Result<()> {
    let mut engine = VectorFieldEngine::new(field_config(slice)?);
    engine.define_plane(parse_plane(&slice.plane)?, slice.offset);
    let Some(field) = engine
        .set_formulas(formulas)
        .context("Cannot parse vector field")?
    else {
        bail!("All three components are empty; give at least one of --ax, --ay, --az");
    };

    if json {
        return print_json(field);
    }
    let grid = match show {
        "ax" => &field.components[0],
        "ay" => &field.components[1],
        "az" => &field.components[2],
        "div" => &field.divergence,
        "curl-x" => &field.curl[0],
        "curl-y" => &field.curl[1],
        "curl-z" => &field.curl[2],
        _ => bail!("Unknown grid: {}. Use: ax, ay, az, div, curl-x, curl-y or curl-z", show),
    };
    print_grid(grid);
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = match args.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match &args.command {
        Command::Eval { formula, x, y, z } => {
            let value = evaluate_once(formula, *x, *y, *z)
                .with_context(|| format!("Cannot evaluate '{}'", formula))?;
            if args.json {
                print_json(&serde_json::json!({ "x": x, "y": y, "z": z, "value": value }))?;
            } else {
                println!("{}", value);
            }
        }
        Command::Gauss {
            formula,
            symmetry,
            known,
            max_extent,
            points,
            compare,
            config,
        } => run_gauss(
            formula,
            symmetry,
            known,
            *max_extent,
            *points,
            compare.as_deref(),
            config.as_deref(),
            args.json,
        )?,
        Command::Scalar {
            formula,
            slice,
            show,
            probe,
        } => run_scalar(formula, slice, show, *probe, args.json)?,
        Command::Vector {
            ax,
            ay,
            az,
            slice,
            show,
        } => run_vector([ax.as_str(), ay.as_str(), az.as_str()], slice, show, args.json)?,
    }

    Ok(())
}
