use std::path::PathBuf;
use std::time::Instant;

use anyhow::Result;
use clap::Parser;
use mpath::route_compute::{compute_routes, Algorithm, Scope};
use mpath::runtime::config::load_run_config;
use mpath::runtime::report::{route_table_json, route_table_rows};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mpath")]
#[command(about = "Compute multipath routing tables for a topology")]
struct Args {
    #[arg(long)]
    config: PathBuf,
    /// Overrides the algorithm named in the config file.
    #[arg(long)]
    algorithm: Option<Algorithm>,
    /// `all`, `root:<id>` or `destination:<id>`.
    #[arg(long)]
    scope: Option<Scope>,
    #[arg(long, default_value = "INFO")]
    log_level: String,
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let cfg = load_run_config(&args.config)?;
    let algorithm = args.algorithm.unwrap_or(cfg.algorithm);
    let scope = args.scope.unwrap_or(cfg.scope);
    let mut ctx = cfg.build_context()?;

    info!(
        "mpath start: algorithm={} scope={} nodes={} links={} weighted={}",
        algorithm,
        scope,
        ctx.graph().node_count(),
        ctx.graph().link_count(),
        ctx.weight().is_some()
    );

    let start = Instant::now();
    compute_routes(&mut ctx, algorithm, scope)?;
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    info!(
        "routes computed in {:.3} ms: {:?}",
        elapsed_ms,
        ctx.routes().summary()
    );

    if args.json {
        println!("{}", serde_json::to_string_pretty(&route_table_json(ctx.routes()))?);
    } else {
        println!("source\tdestination\tnext_hops");
        for row in route_table_rows(ctx.routes()) {
            println!("{row}");
        }
    }
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let level = level.parse::<Level>()?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
    Ok(())
}
