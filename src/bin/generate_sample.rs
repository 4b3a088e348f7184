//! Writes small deterministic sample datasets for every dashboard into
//! `sample_data/`, so the app can be tried without downloading anything.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

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

    fn range(&mut self, lo: f64, hi: f64) -> f64 {
        lo + self.next_f64() * (hi - lo)
    }

    fn index(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }

    fn choice<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.index(items.len())]
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn main() -> Result<()> {
    let out = Path::new("sample_data");
    fs::create_dir_all(out).context("creating sample_data/")?;

    let mut rng = SimpleRng::new(42);
    write_ecommerce(out, &mut rng).context("writing ecommerce.csv")?;
    write_movies(out, &mut rng).context("writing movies/")?;
    write_climate(out, &mut rng).context("writing climate.csv")?;
    write_energy(out, &mut rng).context("writing energy.csv")?;
    write_realty(out, &mut rng).context("writing realty.csv")?;

    println!("Wrote sample datasets to {}", out.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// E-commerce transactions
// ---------------------------------------------------------------------------

fn write_ecommerce(out: &Path, rng: &mut SimpleRng) -> Result<()> {
    let countries = [
        "United Kingdom",
        "France",
        "Germany",
        "Netherlands",
        "Spain",
        "Japan",
    ];
    let stock_codes = ["85123A", "71053", "84406B", "22752", "21730", "22633"];

    let mut w = csv::Writer::from_path(out.join("ecommerce.csv"))?;
    w.write_record([
        "InvoiceNo",
        "StockCode",
        "Quantity",
        "InvoiceDate",
        "UnitPrice",
        "CustomerID",
        "Country",
    ])?;

    for invoice in 0..800u32 {
        let month = 1 + invoice % 12;
        let day = 1 + rng.index(28);
        let hour = 8 + rng.index(10);
        let customer = 12000 + rng.index(300);
        let country = rng.choice(&countries);
        for _ in 0..(1 + rng.index(4)) {
            let quantity = 1 + rng.index(24);
            let price = (rng.range(0.5, 20.0) * 100.0).round() / 100.0;
            w.write_record([
                format!("5{:05}", 36365 + invoice),
                rng.choice(&stock_codes).to_string(),
                quantity.to_string(),
                format!("2011-{month:02}-{day:02} {hour:02}:{:02}:00", rng.index(60)),
                format!("{price:.2}"),
                customer.to_string(),
                country.to_string(),
            ])?;
        }
    }
    w.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Movies ("::"-separated triplet of files)
// ---------------------------------------------------------------------------

fn write_movies(out: &Path, rng: &mut SimpleRng) -> Result<()> {
    let dir = out.join("movies");
    fs::create_dir_all(&dir)?;

    let genres = [
        "Action",
        "Comedy",
        "Drama",
        "Romance",
        "Sci-Fi",
        "Thriller",
        "Animation",
    ];

    let n_movies = 120;
    let n_users = 200;

    let mut movies = String::new();
    for id in 1..=n_movies {
        let first = rng.choice(&genres);
        let mut tags = first.to_string();
        if rng.next_f64() < 0.5 {
            let second = rng.choice(&genres);
            if second != first {
                tags = format!("{tags}|{second}");
            }
        }
        let _ = writeln!(movies, "{id}::Sample Movie {id} (199{})::{tags}", id % 10);
    }
    fs::write(dir.join("movies.dat"), movies)?;

    let ages = [1, 18, 25, 35, 45, 50, 56];
    let mut users = String::new();
    for id in 1..=n_users {
        let gender = if rng.next_f64() < 0.5 { "F" } else { "M" };
        let age = rng.choice(&ages);
        let _ = writeln!(users, "{id}::{gender}::{age}::{}::00000", rng.index(20));
    }
    fs::write(dir.join("users.dat"), users)?;

    let mut ratings = String::new();
    for user in 1..=n_users {
        for _ in 0..(5 + rng.index(20)) {
            let movie = 1 + rng.index(n_movies);
            let rating = 1 + rng.index(5);
            let ts = 956_700_000 + rng.index(40_000_000);
            let _ = writeln!(ratings, "{user}::{movie}::{rating}::{ts}");
        }
    }
    fs::write(dir.join("ratings.dat"), ratings)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Climate (monthly city temperatures)
// ---------------------------------------------------------------------------

fn write_climate(out: &Path, rng: &mut SimpleRng) -> Result<()> {
    let cities = [
        ("Oslo", "Norway", 5.0),
        ("Madrid", "Spain", 14.0),
        ("Lima", "Peru", 19.0),
        ("Tokyo", "Japan", 15.0),
        ("Cairo", "Egypt", 21.0),
    ];

    let mut w = csv::Writer::from_path(out.join("climate.csv"))?;
    w.write_record(["dt", "AverageTemperature", "City", "Country"])?;

    for year in 1990..=2013 {
        for month in 1..=12u32 {
            // Seasonal sinusoid plus a slow warming trend.
            let season = (month as f64 - 7.0) / 12.0 * std::f64::consts::TAU;
            let trend = (year - 1990) as f64 * 0.02;
            for (city, country, base) in &cities {
                let temp = base + 8.0 * season.cos() + trend + rng.gauss(0.0, 1.0);
                // An occasional missing reading, as in the real archive.
                let reading = if rng.next_f64() < 0.02 {
                    String::new()
                } else {
                    format!("{temp:.3}")
                };
                w.write_record([
                    format!("{year}-{month:02}-01"),
                    reading,
                    city.to_string(),
                    country.to_string(),
                ])?;
            }
        }
    }
    w.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Sustainable energy indicators
// ---------------------------------------------------------------------------

fn write_energy(out: &Path, rng: &mut SimpleRng) -> Result<()> {
    let countries = [
        ("Kenya", 20.0, 10.0),
        ("India", 60.0, 30.0),
        ("Brazil", 90.0, 80.0),
        ("Norway", 100.0, 100.0),
        ("Bangladesh", 40.0, 15.0),
    ];

    let mut w = csv::Writer::from_path(out.join("energy.csv"))?;
    w.write_record([
        "Entity",
        "Year",
        "Access to electricity (% of population)",
        "Access to clean fuels for cooking",
        "Renewable-electricity-generating-capacity-per-capita",
        "Financial flows to developing countries (US $)",
    ])?;

    for year in 2000..=2020 {
        let progress = (year - 2000) as f64;
        for (entity, elec_base, fuel_base) in &countries {
            let elec = (elec_base + progress * 2.0 + rng.gauss(0.0, 1.0)).clamp(0.0, 100.0);
            let fuel = (fuel_base + progress * 1.5 + rng.gauss(0.0, 1.0)).clamp(0.0, 100.0);
            let capacity = rng.range(5.0, 400.0);
            let flows = if *elec_base < 95.0 {
                rng.range(1e6, 5e8).round()
            } else {
                0.0
            };
            w.write_record([
                entity.to_string(),
                year.to_string(),
                format!("{elec:.2}"),
                format!("{fuel:.2}"),
                format!("{capacity:.2}"),
                format!("{flows:.0}"),
            ])?;
        }
    }
    w.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Real-estate listings
// ---------------------------------------------------------------------------

fn write_realty(out: &Path, rng: &mut SimpleRng) -> Result<()> {
    let markets = [
        ("Texas", "Austin", 450_000.0),
        ("Texas", "Dallas", 380_000.0),
        ("Ohio", "Columbus", 260_000.0),
        ("Florida", "Miami", 520_000.0),
        ("California", "Fresno", 410_000.0),
    ];

    let mut w = csv::Writer::from_path(out.join("realty.csv"))?;
    w.write_record(["price", "bed", "bath", "state", "city"])?;

    for i in 0..1500u32 {
        let (state, city, base) = rng.choice(&markets);
        let bed = 1 + rng.index(5);
        let bath = 1 + rng.index(3);
        let price = (base * rng.range(0.4, 2.2)).round();
        // Junk rows for the loader's clean rules to drop.
        let (price_s, bed_s) = if i % 97 == 0 {
            ("0".to_string(), "25".to_string())
        } else {
            (format!("{price:.0}"), bed.to_string())
        };
        w.write_record([
            price_s,
            bed_s,
            bath.to_string(),
            state.to_string(),
            city.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
