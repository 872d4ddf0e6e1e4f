//! Write a set of demo spectra named like SDSS pipeline products and print
//! the query string that opens them in `spectral-display`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Builder, Int64Array, ListBuilder, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

fn gaussian(x: f64, mu: f64, sigma: f64, amplitude: f64) -> f64 {
    amplitude * (-(x - mu).powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Continuum with absorption lines plus noise.
fn generate_flux(wavelength: &[f64], lines: &[(f64, f64, f64)], noise: f64, rng: &mut SimpleRng) -> Vec<f64> {
    wavelength
        .iter()
        .map(|&wl| {
            let continuum = 100.0 * (wl / 5000.0).powf(-1.5);
            let absorption: f64 = lines
                .iter()
                .map(|&(mu, sigma, depth)| gaussian(wl, mu, sigma, depth))
                .sum();
            continuum * (1.0 - absorption) + rng.gauss(0.0, noise)
        })
        .collect()
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5)).rotate_left(7).wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

/// One demo product: file name, wavelength grid, number of visits.
struct Product {
    name: &'static str,
    start: f64,
    step: f64,
    pixels: usize,
    visits: usize,
}

const PRODUCTS: &[Product] = &[
    // BOSS optical coadd + visits
    Product { name: "mwmStar-0.5.0-demo.parquet", start: 3600.0, step: 1.0, pixels: 6400, visits: 1 },
    Product { name: "mwmVisit-0.5.0-demo.parquet", start: 3600.0, step: 1.0, pixels: 6400, visits: 4 },
    Product { name: "spec-demo-59000.parquet", start: 3600.0, step: 1.5, pixels: 4000, visits: 1 },
    // APOGEE H-band
    Product { name: "apStar-dr17-demo.parquet", start: 15100.0, step: 0.2, pixels: 8000, visits: 1 },
];

/// Balmer / Ca II / Mg b absorption lines: (centre, width, depth).
const LINES: &[(f64, f64, f64)] = &[
    (3933.7, 3.0, 0.5),
    (3968.5, 3.0, 0.45),
    (4101.7, 4.0, 0.3),
    (4340.5, 4.0, 0.35),
    (4861.3, 5.0, 0.4),
    (5175.0, 6.0, 0.2),
    (6562.8, 6.0, 0.5),
    (15885.0, 1.0, 0.2),
    (16680.0, 1.2, 0.25),
];

fn write_product(dir: &Path, product: &Product, rng: &mut SimpleRng) -> Result<PathBuf> {
    let wavelength: Vec<f64> = (0..product.pixels)
        .map(|i| product.start + i as f64 * product.step)
        .collect();

    let mut wl_builder = ListBuilder::new(Float64Builder::new());
    let mut flux_builder = ListBuilder::new(Float64Builder::new());
    let mut mjd = Vec::with_capacity(product.visits);
    let mut telescope = Vec::with_capacity(product.visits);

    for visit in 0..product.visits {
        let flux = generate_flux(&wavelength, LINES, 1.0 + visit as f64 * 0.5, rng);
        wl_builder.values().append_slice(&wavelength);
        wl_builder.append(true);
        flux_builder.values().append_slice(&flux);
        flux_builder.append(true);
        mjd.push(59000 + visit as i64 * 3);
        telescope.push(if product.start > 10000.0 { "apo25m" } else { "apo25m-boss" });
    }

    let item = Arc::new(Field::new("item", DataType::Float64, true));
    let schema = Arc::new(Schema::new(vec![
        Field::new("wavelength", DataType::List(item.clone()), false),
        Field::new("flux", DataType::List(item), false),
        Field::new("mjd", DataType::Int64, false),
        Field::new("telescope", DataType::Utf8, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(wl_builder.finish()),
            Arc::new(flux_builder.finish()),
            Arc::new(Int64Array::from(mjd)),
            Arc::new(StringArray::from(telescope)),
        ],
    )
    .context("building record batch")?;

    let path = dir.join(product.name);
    let file = std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(path)
}

fn main() -> Result<()> {
    let dir = PathBuf::from(std::env::args().nth(1).unwrap_or_else(|| "demo_data".to_string()));
    std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;

    let mut rng = SimpleRng::new(42);
    let mut paths = Vec::with_capacity(PRODUCTS.len());
    for product in PRODUCTS {
        let path = write_product(&dir, product, &mut rng)?;
        println!("Wrote {} ({} visits)", path.display(), product.visits);
        paths.push(path.canonicalize().unwrap_or(path));
    }

    let files = paths
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(",");
    println!();
    println!("Open with:");
    println!("  spectral-display 'sdssid=demo&files={files}'");
    Ok(())
}
