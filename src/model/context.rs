use crate::graph::{Graph, Weight};
use crate::model::routing::RouteTable;
use crate::route_compute::{
    AlgorithmFamily, LfiWorkspace, OrderingWorkspace, RouteComputeError, SpeWorkspace,
    SpfWorkspace,
};

/// Reusable working tables, one slot per algorithm family.
///
/// Slots are created on first use and kept until the graph is replaced, so
/// repeated computations only clear them.
#[derive(Debug, Default)]
pub struct WorkingData {
    pub spf: Option<SpfWorkspace>,
    pub lfi: Option<LfiWorkspace>,
    pub ordering: Option<OrderingWorkspace>,
    pub spe: Option<SpeWorkspace>,
}

impl WorkingData {
    pub fn is_allocated(&self, family: AlgorithmFamily) -> bool {
        match family {
            AlgorithmFamily::Spf => self.spf.is_some(),
            AlgorithmFamily::Lfi => self.lfi.is_some(),
            AlgorithmFamily::Ordering => self.ordering.is_some(),
            AlgorithmFamily::Spe => self.spe.is_some(),
        }
    }

    pub fn release_all(&mut self) {
        *self = Self::default();
    }
}

/// Graph, optional link costs, working data and the output route table.
#[derive(Debug)]
pub struct RoutingContext {
    graph: Graph,
    weight: Option<Weight>,
    working: WorkingData,
    routes: RouteTable,
}

impl RoutingContext {
    pub fn new(graph: Graph) -> Self {
        let routes = RouteTable::new(graph.node_count());
        Self {
            graph,
            weight: None,
            working: WorkingData::default(),
            routes,
        }
    }

    pub fn with_weight(graph: Graph, weight: Weight) -> Result<Self, RouteComputeError> {
        let mut ctx = Self::new(graph);
        ctx.set_weight(Some(weight))?;
        Ok(ctx)
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn weight(&self) -> Option<&Weight> {
        self.weight.as_ref()
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    pub fn working(&self) -> &WorkingData {
        &self.working
    }

    /// Installs or removes link costs. A weight bound to another graph is
    /// rejected and the previous weight is kept.
    pub fn set_weight(&mut self, weight: Option<Weight>) -> Result<(), RouteComputeError> {
        if let Some(weight) = weight.as_ref() {
            weight.check_bound(&self.graph)?;
        }
        self.weight = weight;
        Ok(())
    }

    /// Swaps in a new topology. The weight and working data belong to the
    /// old graph and are dropped; the route table is cleared.
    pub fn set_graph(&mut self, graph: Graph) -> Graph {
        let previous = std::mem::replace(&mut self.graph, graph);
        self.weight = None;
        self.working.release_all();
        self.routes.reset(self.graph.node_count());
        previous
    }

    pub fn check_preconditions(&self) -> Result<(), RouteComputeError> {
        if let Some(weight) = self.weight.as_ref() {
            weight.check_bound(&self.graph)?;
        }
        Ok(())
    }

    pub(crate) fn split(&mut self) -> (&Graph, Option<&Weight>, &mut WorkingData, &mut RouteTable) {
        if self.routes.size() != self.graph.node_count() {
            self.routes.reset(self.graph.node_count());
        }
        (
            &self.graph,
            self.weight.as_ref(),
            &mut self.working,
            &mut self.routes,
        )
    }
}
