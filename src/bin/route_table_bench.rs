use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use mpath::graph::{Graph, Weight};
use mpath::model::context::RoutingContext;
use mpath::route_compute::{compute_routes, Algorithm, Scope};
use mpath::runtime::config::load_run_config;
use serde_json::{json, Value};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "route_table_bench")]
#[command(about = "Benchmark multipath route table algorithms")]
struct Args {
    #[arg(long, default_value_t = 100)]
    nodes: usize,
    #[arg(long, default_value_t = 0.04)]
    density: f64,
    #[arg(long, default_value_t = 3)]
    seeds: usize,
    #[arg(long, default_value_t = 1)]
    start_seed: u64,
    #[arg(long, default_value_t = 3)]
    iterations: usize,
    /// Run config whose topology replaces the generated one.
    #[arg(long)]
    topology: Option<PathBuf>,
    #[arg(long)]
    output_json: Option<PathBuf>,
    #[arg(long, default_value = "WARN")]
    log_level: String,
}

#[derive(Debug, Clone)]
struct LcgRng {
    state: u64,
}

impl LcgRng {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        self.state
    }

    fn next_f64(&mut self) -> f64 {
        let raw = self.next_u64() >> 11;
        (raw as f64) / ((1_u64 << 53) as f64)
    }

    fn range_u64(&mut self, low: u64, high: u64) -> u64 {
        low + self.next_u64() % (high - low + 1)
    }
}

/// Bidirectional ring plus random bidirectional chords.
fn generate_context(seed: u64, nodes: usize, density: f64) -> anyhow::Result<RoutingContext> {
    let mut rng = LcgRng::new(seed);
    let mut graph = Graph::with_nodes(nodes);
    let mut costs = Vec::new();
    let mut add_pair = |graph: &mut Graph, a: usize, b: usize, rng: &mut LcgRng| {
        let bandwidth = rng.range_u64(50, 1_000);
        let cost = rng.range_u64(1, 20) as u32;
        graph.connect(a, b, bandwidth).map(|_| {
            costs.extend([cost, cost]);
        })
    };

    // Two nodes already form a ring with the single pair (0, 1).
    let ring_pairs = if nodes > 2 { nodes } else { nodes.saturating_sub(1) };
    for node in 0..ring_pairs {
        add_pair(&mut graph, node, (node + 1) % nodes, &mut rng)?;
    }

    let p = density.clamp(0.0, 1.0);
    for a in 0..nodes {
        for b in (a + 2)..nodes {
            if (a, b) == (0, nodes - 1) {
                continue;
            }
            if rng.next_f64() < p {
                add_pair(&mut graph, a, b, &mut rng)?;
            }
        }
    }

    let weight = Weight::from_costs(&graph, costs)?;
    Ok(RoutingContext::with_weight(graph, weight)?)
}

fn bench(
    ctx: &mut RoutingContext,
    algorithm: Algorithm,
    iterations: usize,
) -> anyhow::Result<Value> {
    let iterations = iterations.max(1);
    let mut elapsed_ms = 0.0;
    for _ in 0..iterations {
        let start = Instant::now();
        compute_routes(ctx, algorithm, Scope::All)?;
        elapsed_ms += start.elapsed().as_secs_f64() * 1000.0;
    }

    let summary = ctx.routes().summary();
    let reachable_ratio = if summary.pairs == 0 {
        1.0
    } else {
        summary.reachable as f64 / summary.pairs as f64
    };
    Ok(json!({
        "algorithm": algorithm.name(),
        "runtime_ms": elapsed_ms / iterations as f64,
        "reachable_ratio": reachable_ratio,
        "mean_next_hops": summary.mean_next_hops,
        "max_next_hops": summary.max_next_hops,
    }))
}

fn aggregate(seed_rows: &[Value]) -> Value {
    let mut buckets: BTreeMap<String, Vec<&Value>> = BTreeMap::new();
    for row in seed_rows {
        if let Some(algos) = row.get("algorithms").and_then(Value::as_array) {
            for algo in algos {
                if let Some(name) = algo.get("algorithm").and_then(Value::as_str) {
                    buckets.entry(name.to_string()).or_default().push(algo);
                }
            }
        }
    }

    let avg = |rows: &[&Value], key: &str| -> f64 {
        let values: Vec<f64> = rows
            .iter()
            .filter_map(|row| row.get(key).and_then(Value::as_f64))
            .collect();
        if values.is_empty() {
            f64::NAN
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    };

    let out = buckets
        .iter()
        .map(|(name, rows)| {
            json!({
                "algorithm": name,
                "runtime_ms": avg(rows, "runtime_ms"),
                "reachable_ratio": avg(rows, "reachable_ratio"),
                "mean_next_hops": avg(rows, "mean_next_hops"),
                "max_next_hops": avg(rows, "max_next_hops"),
            })
        })
        .collect();
    Value::Array(out)
}

fn print_summary(aggregated: &Value) {
    println!("algorithm\truntime_ms\treachable_ratio\tmean_next_hops\tmax_next_hops");
    if let Some(rows) = aggregated.as_array() {
        for row in rows {
            let name = row.get("algorithm").and_then(Value::as_str).unwrap_or("?");
            let field = |key: &str| row.get(key).and_then(Value::as_f64).unwrap_or(f64::NAN);
            println!(
                "{}\t{:.4}\t{:.4}\t{:.4}\t{:.1}",
                name,
                field("runtime_ms"),
                field("reachable_ratio"),
                field("mean_next_hops"),
                field("max_next_hops")
            );
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let level = args.log_level.parse::<Level>()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let mut seed_rows = Vec::new();
    for idx in 0..args.seeds.max(1) {
        let seed = args.start_seed + idx as u64;
        let mut ctx = match args.topology.as_ref() {
            Some(path) => load_run_config(path)?.build_context()?,
            None => generate_context(seed, args.nodes.max(2), args.density)?,
        };
        info!(
            "bench seed={} nodes={} links={}",
            seed,
            ctx.graph().node_count(),
            ctx.graph().link_count()
        );

        let mut algorithms = Vec::new();
        for algorithm in Algorithm::ALL {
            algorithms.push(bench(&mut ctx, algorithm, args.iterations)?);
        }

        seed_rows.push(json!({
            "seed": seed,
            "nodes": ctx.graph().node_count(),
            "links": ctx.graph().link_count(),
            "algorithms": algorithms,
        }));
    }

    let aggregated = aggregate(&seed_rows);
    print_summary(&aggregated);

    let payload = json!({
        "config": {
            "nodes": args.nodes,
            "density": args.density,
            "seeds": args.seeds,
            "start_seed": args.start_seed,
            "iterations": args.iterations,
            "topology": args.topology,
        },
        "runs": seed_rows,
        "aggregate": aggregated,
    });

    if let Some(path) = args.output_json {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_vec_pretty(&payload)?)?;
    } else {
        println!("{}", serde_json::to_string_pretty(&payload)?);
    }

    Ok(())
}
