use criterion::{black_box, criterion_group, BenchmarkId, Criterion};
use kdneighbors::{random_points_with, BoundingBox, KdTree};
use plotters::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::process::Command;

#[derive(Deserialize)]
struct Estimates {
    mean: Stats,
}

#[derive(Deserialize)]
struct Stats {
    point_estimate: f64,
    confidence_interval: ConfidenceInterval,
}

#[derive(Deserialize)]
struct ConfidenceInterval {
    lower_bound: f64,
    upper_bound: f64,
}

const SIZES: [usize; 5] = [100, 1000, 10_000, 100_000, 1_000_000];
const METHODS: [&str; 3] = ["build", "knn", "range"];
const NUM_QUERIES: usize = 100;

fn benchmark_scaling(c: &mut Criterion) {
    let bounds = BoundingBox::new([0.0; 3], [100.0; 3]);
    let queries = random_points_with(&mut StdRng::seed_from_u64(99), NUM_QUERIES, &bounds).unwrap();

    let mut group = c.benchmark_group("scaling");
    group.sample_size(10);

    for &size in &SIZES {
        let points = random_points_with(&mut StdRng::seed_from_u64(size as u64), size, &bounds).unwrap();
        // Radius chosen so a query ball holds about 32 points on average
        let volume = 100.0f64.powi(3) * 32.0 / size as f64;
        let radius = (volume * 3.0 / (4.0 * std::f64::consts::PI)).cbrt();
        println!("N: {:8}, range radius: {:.3}", size, radius);

        group.bench_with_input(BenchmarkId::new("build", size), &size, |b, _| {
            b.iter(|| KdTree::build(black_box(&points), 16).unwrap())
        });

        let tree = KdTree::build(&points, 16).unwrap();
        group.bench_with_input(BenchmarkId::new("knn", size), &size, |b, _| {
            b.iter(|| {
                for q in &queries {
                    black_box(tree.knn_query(q, 32).unwrap().count());
                }
            })
        });

        group.bench_with_input(BenchmarkId::new("range", size), &size, |b, _| {
            b.iter(|| {
                for q in &queries {
                    black_box(tree.range_query(q, radius).unwrap().count());
                }
            })
        });
    }
    group.finish();
}

fn plot_scaling_results() -> Result<(), Box<dyn std::error::Error>> {
    let root = Path::new("target/criterion/scaling");

    if !root.exists() {
        return Ok(());
    }

    let mut data: BTreeMap<&str, Vec<(usize, f64, f64, f64)>> = BTreeMap::new();

    for &method in &METHODS {
        let mut points = Vec::new();
        for &size in &SIZES {
            let path = root
                .join(method)
                .join(size.to_string())
                .join("base/estimates.json");

            if path.exists() {
                let file = File::open(&path)?;
                let reader = BufReader::new(file);
                let estimates: Estimates = serde_json::from_reader(reader)?;
                points.push((
                    size,
                    estimates.mean.point_estimate / 1_000_000.0,
                    estimates.mean.confidence_interval.lower_bound / 1_000_000.0,
                    estimates.mean.confidence_interval.upper_bound / 1_000_000.0,
                ));
            }
        }
        if !points.is_empty() {
            points.sort_by_key(|k| k.0);
            data.insert(method, points);
        }
    }

    if data.is_empty() {
        return Ok(());
    }

    let out_dir = Path::new("benches/results");
    std::fs::create_dir_all(out_dir)?;
    let output = Command::new("git").args(["rev-parse", "--short", "HEAD"]).output()?;
    let git_hash = String::from_utf8(output.stdout)?.trim().to_string();
    let out_file = out_dir.join(format!("bench_scaling_{}.png", git_hash));
    let root_area = BitMapBackend::new(&out_file, (1024, 768)).into_drawing_area();
    root_area.fill(&WHITE)?;

    let min_y = data.values().flat_map(|v| v.iter().map(|p| p.2)).fold(f64::INFINITY, f64::min);
    let max_y = data.values().flat_map(|v| v.iter().map(|p| p.3)).fold(f64::NEG_INFINITY, f64::max);
    let (first_n, last_n) = (SIZES[0] as f64, SIZES[SIZES.len() - 1] as f64);

    let mut chart = ChartBuilder::on(&root_area)
        .caption("k-d Tree Scaling", ("sans-serif", 40).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(80)
        .build_cartesian_2d(
            (first_n..last_n).log_scale(),
            (min_y * 0.8..max_y * 1.5).log_scale(),
        )?;

    chart
        .configure_mesh()
        .x_desc("Number of Points (N)")
        .y_desc("Time (ms)")
        .draw()?;

    // N log N reference through the first build measurement
    if let Some(&(start_n, start_t, _, _)) = data.get("build").and_then(|v| v.first()) {
        let start_n = start_n as f64;
        let step = 10.0f64.powf(0.05);
        let mut reference = Vec::new();
        let mut n = first_n;
        while n <= last_n * 1.1 {
            let t = start_t * (n * n.ln()) / (start_n * start_n.ln());
            reference.push((n, t));
            n *= step;
        }

        chart
            .draw_series(PointSeries::of_element(
                reference,
                1,
                &BLACK,
                &|c, s, st| Circle::new(c, s, st.filled()),
            ))?
            .label("N log N")
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLACK));
    }

    let colors = [RED, BLUE, GREEN, MAGENTA, CYAN];

    for (i, (method, points)) in data.iter().enumerate() {
        let color = colors[i % colors.len()];

        let mut band_points = Vec::new();
        for (x, _, _, u) in points.iter() {
            band_points.push((*x as f64, *u));
        }
        for (x, _, l, _) in points.iter().rev() {
            band_points.push((*x as f64, *l));
        }

        chart.draw_series(std::iter::once(Polygon::new(
            band_points,
            color.mix(0.2).filled(),
        )))?;

        chart
            .draw_series(LineSeries::new(
                points.iter().map(|(x, y, _, _)| (*x as f64, *y)),
                &color,
            ))?
            .label(*method)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &color));

        chart.draw_series(PointSeries::of_element(
            points.iter().map(|(x, y, _, _)| (*x as f64, *y)),
            5,
            &color,
            &|c, s, st| EmptyElement::at(c) + Circle::new((0, 0), s, st.filled()),
        ))?;
    }

    chart
        .configure_series_labels()
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    println!("Plot saved to {:?}", out_file);

    Ok(())
}

criterion_group!(benches, benchmark_scaling);

fn main() {
    benches();
    if let Err(e) = plot_scaling_results() {
        eprintln!("Error generating plot: {}", e);
    }
}
