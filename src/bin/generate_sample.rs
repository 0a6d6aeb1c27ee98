use anyhow::Context;
use serde_json::json;

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// (product, base units, seasonal amplitude, peak month index)
const PRODUCTS: [(&str, f64, f64, f64); 3] = [
    ("coffee", 120.0, 40.0, 0.0),
    ("tea", 80.0, 15.0, 1.0),
    ("juice", 60.0, 35.0, 6.0),
];

fn seasonal(month: usize, base: f64, amplitude: f64, peak: f64) -> f64 {
    let phase = (month as f64 - peak) / 12.0 * std::f64::consts::TAU;
    base + amplitude * phase.cos()
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
}

fn main() -> anyhow::Result<()> {
    let mut rng = SimpleRng::new(42);

    // units[product][month], rounded to whole units
    let units: Vec<Vec<f64>> = PRODUCTS
        .iter()
        .map(|&(_, base, amplitude, peak)| {
            (0..MONTHS.len())
                .map(|m| (seasonal(m, base, amplitude, peak) + rng.gauss(0.0, 5.0)).round())
                .collect()
        })
        .collect();

    // ---- Record list: one row per month, one column per product ----
    let csv_path = "sample_data.csv";
    let mut writer = csv::Writer::from_path(csv_path)
        .with_context(|| format!("Failed to create {csv_path}"))?;
    let mut header = vec!["month"];
    header.extend(PRODUCTS.iter().map(|p| p.0));
    writer.write_record(&header)?;
    for (m, month) in MONTHS.iter().enumerate() {
        let mut row = vec![month.to_string()];
        row.extend(units.iter().map(|series| series[m].to_string()));
        writer.write_record(&row)?;
    }
    writer.flush()?;

    // ---- Labeled multi-series ----
    let json_path = "sample_data.json";
    let doc = json!({ "labels": MONTHS, "values": units });
    std::fs::write(json_path, serde_json::to_string_pretty(&doc)?)
        .with_context(|| format!("Failed to write {json_path}"))?;

    // ---- Shorthand: first product only, one quarter per line ----
    let shorthand_path = "sample_shorthand.txt";
    let shorthand = MONTHS
        .chunks(3)
        .zip(units[0].chunks(3))
        .map(|(months, values)| {
            months
                .iter()
                .zip(values)
                .map(|(m, v)| format!("{m}:{v}"))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .collect::<Vec<_>>()
        .join("\n");
    std::fs::write(shorthand_path, shorthand + "\n")
        .with_context(|| format!("Failed to write {shorthand_path}"))?;

    println!(
        "Wrote {} months x {} products to {csv_path}, {json_path} and {shorthand_path}",
        MONTHS.len(),
        PRODUCTS.len()
    );
    Ok(())
}
