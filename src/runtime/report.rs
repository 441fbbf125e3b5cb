use serde_json::{json, Value};

use crate::model::routing::RouteTable;

/// Tab-separated `source destination next_hops` rows for non-empty cells.
pub fn route_table_rows(routes: &RouteTable) -> Vec<String> {
    routes
        .pairs()
        .map(|(source, destination, hops)| {
            let hops: Vec<String> = hops.iter().map(|hop| hop.to_string()).collect();
            format!("{}\t{}\t{}", source, destination, hops.join(","))
        })
        .collect()
}

pub fn route_table_json(routes: &RouteTable) -> Value {
    let entries: Vec<Value> = routes
        .pairs()
        .map(|(source, destination, hops)| {
            json!({
                "source": source,
                "destination": destination,
                "next_hops": hops,
            })
        })
        .collect();

    json!({
        "nodes": routes.size(),
        "summary": routes.summary(),
        "routes": entries,
    })
}
