use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::graph::{Graph, NodeId, Weight};
use crate::model::context::RoutingContext;
use crate::route_compute::{Algorithm, Scope};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkConfig {
    pub from: NodeId,
    pub to: NodeId,
    pub cost: u32,
    pub bandwidth: u64,
    pub bidirectional: bool,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub nodes: usize,
    pub algorithm: Algorithm,
    pub scope: Scope,
    pub unit_weights: bool,
    pub links: Vec<LinkConfig>,
}

#[derive(Debug, Deserialize)]
struct RawLink {
    from: NodeId,
    to: NodeId,
    cost: Option<u32>,
    bandwidth: Option<u64>,
    bidirectional: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawRunConfig {
    nodes: Option<usize>,
    algorithm: Option<String>,
    scope: Option<String>,
    unit_weights: Option<bool>,
    #[serde(default)]
    links: Vec<RawLink>,
}

pub fn load_run_config(path: &Path) -> Result<RunConfig> {
    let raw_text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_run_config(&raw_text)
        .with_context(|| format!("invalid config file {}", path.display()))
}

/// Parses a YAML (or JSON) run description.
pub fn parse_run_config(raw_text: &str) -> Result<RunConfig> {
    let raw_cfg: RawRunConfig =
        serde_yaml::from_str(raw_text).context("failed to parse run config yaml")?;

    let inferred = raw_cfg
        .links
        .iter()
        .map(|link| link.from.max(link.to) + 1)
        .max()
        .unwrap_or(0);
    let nodes = raw_cfg.nodes.unwrap_or(inferred);

    let algorithm = match raw_cfg.algorithm {
        Some(name) => name.parse::<Algorithm>()?,
        None => Algorithm::Dijkstra,
    };
    let scope = match raw_cfg.scope {
        Some(scope) => scope.parse::<Scope>()?,
        None => Scope::All,
    };

    let mut links = Vec::with_capacity(raw_cfg.links.len());
    for (index, item) in raw_cfg.links.into_iter().enumerate() {
        if item.from >= nodes || item.to >= nodes {
            bail!(
                "link {} ({} -> {}) references a node outside 0..{}",
                index,
                item.from,
                item.to,
                nodes
            );
        }
        links.push(LinkConfig {
            from: item.from,
            to: item.to,
            cost: item.cost.unwrap_or(1),
            bandwidth: item.bandwidth.unwrap_or(0),
            bidirectional: item.bidirectional.unwrap_or(false),
        });
    }

    Ok(RunConfig {
        nodes,
        algorithm,
        scope,
        unit_weights: raw_cfg.unit_weights.unwrap_or(false),
        links,
    })
}

impl RunConfig {
    /// Builds the graph and, unless unit weights were requested, its bound
    /// link costs.
    pub fn build_context(&self) -> Result<RoutingContext> {
        let mut graph = Graph::with_nodes(self.nodes);
        let mut costs = Vec::new();
        for link in &self.links {
            graph.add_link(link.from, link.to, link.bandwidth)?;
            costs.push(link.cost);
            if link.bidirectional {
                graph.add_link(link.to, link.from, link.bandwidth)?;
                costs.push(link.cost);
            }
        }

        if self.unit_weights {
            return Ok(RoutingContext::new(graph));
        }
        let weight = Weight::from_costs(&graph, costs)?;
        Ok(RoutingContext::with_weight(graph, weight)?)
    }
}
