use anyhow::{anyhow, bail, Context};
use cap_std::{ambient_authority, fs::Dir};
use log::info;
use spmm_coo::{multiply_with, Coo, MulOptions};
use spmm_dense::{parse_matrix_market, DenseMatrix, MatrixType, Triplets};
use spmm_matrix::Matrix;
use std::{env, path::Path, time::Instant};

const USAGE: &str = "usage: coo_bench <sparse.mtx> <dense.mtx> [--parallel]";

fn read_to_string(path: &Path) -> anyhow::Result<String> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow!("{} is not a file", path.display()))?;
    let dir = Dir::open_ambient_dir(parent, ambient_authority())
        .with_context(|| format!("opening {}", parent.display()))?;
    dir.read_to_string(file_name)
        .with_context(|| format!("reading {}", path.display()))
}

fn load(path: &Path) -> anyhow::Result<Triplets<f64>> {
    let input = read_to_string(path)?;
    match parse_matrix_market::<i32, f64>(&input)? {
        MatrixType::Integer(t) => Ok(Triplets {
            shape: t.shape,
            entries: t.entries.into_iter().map(|(pos, i)| (pos, f64::from(i))).collect(),
        }),
        MatrixType::Real(t) => Ok(t),
        MatrixType::Complex(_) => bail!("{}: complex matrices are unsupported", path.display()),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut parallel = false;
    let mut paths = vec![];
    for arg in env::args().skip(1) {
        if arg == "--parallel" {
            parallel = true;
        } else {
            paths.push(arg);
        }
    }
    let [sparse, dense] = <[String; 2]>::try_from(paths).map_err(|_| anyhow!(USAGE))?;

    println!("coo_bench {}", env!("CARGO_PKG_VERSION"));
    let a: Coo<f64> = load(Path::new(&sparse))?.into_matrix()?;
    let b: DenseMatrix<f64> = load(Path::new(&dense))?.into_matrix()?;
    info!("loaded {:?} and {:?}", a.shape(), b.shape());

    let start = Instant::now();
    let a = a.canonicalize();
    println!("nnz of {} is {}", sparse, a.nnz());
    let options = if parallel {
        MulOptions::parallel()
    } else {
        MulOptions::default()
    };
    let c = multiply_with(&a, &b, &options)?;
    let elapsed = start.elapsed();
    info!("product has shape {:?}", c.shape());
    println!("run time is: {}", elapsed.as_secs_f64() / 60.0);
    Ok(())
}
