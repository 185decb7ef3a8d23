//! Writes a synthetic listings dataset for trying out the cleaner.
//!
//! Roughly one row in ten is an outlier (price, location or minimum stay)
//! and some rows have no `last_review`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use clap::Parser;
use parquet::arrow::ArrowWriter;

#[derive(Parser)]
#[command(name = "generate_sample", about = "Write a synthetic listings dataset")]
struct Args {
    /// Output file (.csv or .parquet)
    #[arg(default_value = "sample.csv")]
    output: PathBuf,

    /// Number of listings
    #[arg(short = 'n', long, default_value = "1000")]
    rows: usize,

    /// PRNG seed
    #[arg(long, default_value = "42")]
    seed: u64,
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

    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        lo + (hi - lo) * self.next_f64()
    }

    fn chance(&mut self, p: f64) -> bool {
        self.next_f64() < p
    }

    fn pick<'a>(&mut self, items: &[&'a str]) -> &'a str {
        items[(self.next_u64() % items.len() as u64) as usize]
    }
}

struct Listings {
    id: Vec<i64>,
    neighbourhood_group: Vec<String>,
    room_type: Vec<String>,
    price: Vec<i64>,
    minimum_nights: Vec<i64>,
    last_review: Vec<Option<String>>,
    longitude: Vec<f64>,
    latitude: Vec<f64>,
}

fn generate(rows: usize, rng: &mut SimpleRng) -> Listings {
    let groups = ["Manhattan", "Brooklyn", "Queens", "Bronx", "Staten Island"];
    let rooms = ["Entire home/apt", "Private room", "Shared room"];
    let first_review = NaiveDate::from_ymd_opt(2012, 1, 1).unwrap_or_default();

    let mut out = Listings {
        id: Vec::with_capacity(rows),
        neighbourhood_group: Vec::with_capacity(rows),
        room_type: Vec::with_capacity(rows),
        price: Vec::with_capacity(rows),
        minimum_nights: Vec::with_capacity(rows),
        last_review: Vec::with_capacity(rows),
        longitude: Vec::with_capacity(rows),
        latitude: Vec::with_capacity(rows),
    };

    for i in 0..rows {
        out.id.push(2539 + i as i64);
        out.neighbourhood_group.push(rng.pick(&groups).to_string());
        out.room_type.push(rng.pick(&rooms).to_string());

        let price = if rng.chance(0.04) {
            rng.uniform(1000.0, 10000.0)
        } else {
            rng.uniform(20.0, 400.0)
        };
        out.price.push(price.round() as i64);

        let nights = if rng.chance(0.02) {
            rng.uniform(366.0, 1250.0)
        } else {
            rng.uniform(1.0, 30.0)
        };
        out.minimum_nights.push(nights.round() as i64);

        out.last_review.push(if rng.chance(0.2) {
            None
        } else {
            let offset = Duration::days(rng.uniform(0.0, 2700.0) as i64);
            Some((first_review + offset).format("%Y-%m-%d").to_string())
        });

        let (lon, lat) = if rng.chance(0.03) {
            (rng.uniform(-80.0, -75.0), rng.uniform(38.0, 40.0))
        } else {
            (rng.uniform(-74.2, -73.7), rng.uniform(40.5, 40.9))
        };
        out.longitude.push((lon * 1e5).round() / 1e5);
        out.latitude.push((lat * 1e5).round() / 1e5);
    }
    out
}

fn write_csv(listings: &Listings, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([
        "id",
        "neighbourhood_group",
        "room_type",
        "price",
        "minimum_nights",
        "last_review",
        "longitude",
        "latitude",
    ])?;
    for i in 0..listings.id.len() {
        writer.write_record([
            listings.id[i].to_string(),
            listings.neighbourhood_group[i].clone(),
            listings.room_type[i].clone(),
            listings.price[i].to_string(),
            listings.minimum_nights[i].to_string(),
            listings.last_review[i].clone().unwrap_or_default(),
            listings.longitude[i].to_string(),
            listings.latitude[i].to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(listings: &Listings, path: &Path) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("neighbourhood_group", DataType::Utf8, false),
        Field::new("room_type", DataType::Utf8, false),
        Field::new("price", DataType::Int64, false),
        Field::new("minimum_nights", DataType::Int64, false),
        Field::new("last_review", DataType::Utf8, true),
        Field::new("longitude", DataType::Float64, false),
        Field::new("latitude", DataType::Float64, false),
    ]));

    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(listings.id.clone())),
        Arc::new(StringArray::from(listings.neighbourhood_group.clone())),
        Arc::new(StringArray::from(listings.room_type.clone())),
        Arc::new(Int64Array::from(listings.price.clone())),
        Arc::new(Int64Array::from(listings.minimum_nights.clone())),
        Arc::new(StringArray::from(listings.last_review.clone())),
        Arc::new(Float64Array::from(listings.longitude.clone())),
        Arc::new(Float64Array::from(listings.latitude.clone())),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = SimpleRng::new(args.seed);
    let listings = generate(args.rows, &mut rng);

    let is_parquet = matches!(
        args.output.extension().and_then(|e| e.to_str()),
        Some("parquet" | "pq")
    );
    if is_parquet {
        write_parquet(&listings, &args.output)?;
    } else {
        write_csv(&listings, &args.output)?;
    }

    println!("Wrote {} listings to {}", args.rows, args.output.display());
    Ok(())
}
