//! Writes synthetic loan data for trying out the dashboard:
//! `Pricing_data.csv`, `Pricing_data.parquet` and `UW_data.csv`.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use serde::Serialize;

const N_APPLICATIONS: usize = 2000;

// (race, population share, rate offset in points, approval probability)
const RACES: [(&str, f64, f64, f64); 4] = [
    ("White", 0.55, 0.00, 0.78),
    ("Black", 0.20, 0.35, 0.64),
    ("Hispanic", 0.17, 0.20, 0.69),
    ("Asian", 0.08, -0.05, 0.80),
];
const SEXES: [&str; 2] = ["Male", "Female"];
// (loan type, base annual interest percentage)
const LOAN_TYPES: [(&str, f64); 3] = [("Auto", 6.5), ("Mortgage", 4.2), ("Personal", 11.0)];
const PURPOSES: [&str; 3] = ["Purchase", "Refinance", "Home Improvement"];

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PricingRecord {
    race: &'static str,
    sex: &'static str,
    loan_type: &'static str,
    purpose: &'static str,
    #[serde(rename = "AIP")]
    aip: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct UnderwritingRecord {
    race: &'static str,
    sex: &'static str,
    loan_type: &'static str,
    purpose: &'static str,
    decision: &'static str,
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
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
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

    fn pick<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        let i = (self.next_f64() * items.len() as f64) as usize;
        &items[i.min(items.len() - 1)]
    }

    /// Index drawn with the given (normalised) weights.
    fn weighted(&mut self, weights: &[f64]) -> usize {
        let mut u = self.next_f64();
        for (i, w) in weights.iter().enumerate() {
            if u < *w {
                return i;
            }
            u -= w;
        }
        weights.len() - 1
    }
}

fn generate(rng: &mut SimpleRng) -> (Vec<PricingRecord>, Vec<UnderwritingRecord>) {
    let shares: Vec<f64> = RACES.iter().map(|r| r.1).collect();
    let mut pricing = Vec::with_capacity(N_APPLICATIONS);
    let mut underwriting = Vec::with_capacity(N_APPLICATIONS);

    for _ in 0..N_APPLICATIONS {
        let (race, _, offset, p_approve) = RACES[rng.weighted(&shares)];
        let sex = *rng.pick(&SEXES);
        let (loan_type, base) = *rng.pick(&LOAN_TYPES);
        let purpose = *rng.pick(&PURPOSES);

        let decision = if rng.next_f64() < p_approve {
            "Approved"
        } else {
            "Denied"
        };
        underwriting.push(UnderwritingRecord {
            race,
            sex,
            loan_type,
            purpose,
            decision,
        });

        // Only approved applications are priced.
        if decision == "Approved" {
            let aip = (rng.gauss(base + offset, 0.9)).max(0.5);
            pricing.push(PricingRecord {
                race,
                sex,
                loan_type,
                purpose,
                aip: (aip * 1000.0).round() / 1000.0,
            });
        }
    }
    (pricing, underwriting)
}

fn write_csv<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, records: &[PricingRecord]) -> Result<()> {
    let text = |f: fn(&PricingRecord) -> &'static str| {
        StringArray::from(records.iter().map(f).collect::<Vec<_>>())
    };
    let aip = Float64Array::from(records.iter().map(|r| r.aip).collect::<Vec<_>>());

    let schema = Arc::new(Schema::new(vec![
        Field::new("Race", DataType::Utf8, false),
        Field::new("Sex", DataType::Utf8, false),
        Field::new("LoanType", DataType::Utf8, false),
        Field::new("Purpose", DataType::Utf8, false),
        Field::new("AIP", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(text(|r| r.race)),
            Arc::new(text(|r| r.sex)),
            Arc::new(text(|r| r.loan_type)),
            Arc::new(text(|r| r.purpose)),
            Arc::new(aip),
        ],
    )
    .context("building record batch")?;

    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let mut rng = SimpleRng::new(42);
    let (pricing, underwriting) = generate(&mut rng);

    write_csv(Path::new("Pricing_data.csv"), &pricing)?;
    write_parquet(Path::new("Pricing_data.parquet"), &pricing)?;
    write_csv(Path::new("UW_data.csv"), &underwriting)?;

    println!(
        "Wrote {} priced loans to Pricing_data.csv/.parquet and {} decisions to UW_data.csv",
        pricing.len(),
        underwriting.len()
    );
    Ok(())
}
