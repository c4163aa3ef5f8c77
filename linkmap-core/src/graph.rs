//! Link graph built from crawl edges, plus Mermaid and JSON rendering.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::path::Path;

use linkmap_scanner::{CrawlEdge, CrawlOutcome};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::config::OutputFormat;
use crate::error::{CoreError, Result};

/// Length of the node ids written to Mermaid output.
pub const NODE_ID_LEN: usize = 10;
/// Longest location label written to Mermaid output.
pub const LABEL_MAX_LEN: usize = 150;

const MERMAID_HEADER: &str = "flowchart LR";

/// Directed graph of locations, one node per distinct location.
#[derive(Debug, Default)]
pub struct LinkGraph {
    graph: DiGraph<String, ()>,
    index: HashMap<String, NodeIndex>,
}

impl LinkGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_edges<'a>(edges: impl IntoIterator<Item = &'a CrawlEdge>) -> Self {
        let mut graph = Self::new();
        for edge in edges {
            graph.add_edge(&edge.source, &edge.target);
        }
        graph
    }

    /// Add a location without any links, e.g. a seed that linked nowhere.
    pub fn add_location(&mut self, location: &str) -> NodeIndex {
        if let Some(&idx) = self.index.get(location) {
            return idx;
        }
        let idx = self.graph.add_node(location.to_string());
        self.index.insert(location.to_string(), idx);
        idx
    }

    pub fn add_edge(&mut self, source: &str, target: &str) {
        let from = self.add_location(source);
        let to = self.add_location(target);
        self.graph.update_edge(from, to, ());
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, location: &str) -> bool {
        self.index.contains_key(location)
    }

    pub fn links_in(&self, location: &str) -> usize {
        self.degree(location, Direction::Incoming)
    }

    pub fn links_out(&self, location: &str) -> usize {
        self.degree(location, Direction::Outgoing)
    }

    fn degree(&self, location: &str, direction: Direction) -> usize {
        self.index
            .get(location)
            .map(|&idx| self.graph.neighbors_directed(idx, direction).count())
            .unwrap_or(0)
    }

    /// Locations in insertion order.
    pub fn locations(&self) -> impl Iterator<Item = &str> {
        self.graph.node_indices().map(|idx| self.graph[idx].as_str())
    }

    /// The `n` locations with the most incoming links, ties broken by name.
    pub fn most_linked(&self, n: usize) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .graph
            .node_indices()
            .map(|idx| {
                let count = self
                    .graph
                    .neighbors_directed(idx, Direction::Incoming)
                    .count();
                (self.graph[idx].as_str(), count)
            })
            .filter(|(_, count)| *count > 0)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(n);
        ranked
    }
}

// ---------------------------------------------------------------------------
// Label helpers
// ---------------------------------------------------------------------------

/// Hex SHA-256 of `location`, cut to a Mermaid-friendly node id.
pub fn hash_id(location: &str) -> String {
    let digest = Sha256::digest(location.as_bytes());
    let hex: String = digest.iter().map(|byte| format!("{:02x}", byte)).collect();
    truncate(&hex, NODE_ID_LEN).to_string()
}

/// At most `n` bytes of `s`, backing off to a char boundary.
pub fn truncate(s: &str, n: usize) -> &str {
    if s.len() <= n {
        return s;
    }
    let mut end = n;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Like [`truncate`], but ends a cut string with `...` when there is room.
pub fn truncate_url(url: &str, n: usize) -> String {
    if url.len() <= n {
        return url.to_string();
    }
    if n > 3 {
        format!("{}...", truncate(url, n - 3))
    } else {
        truncate(url, n).to_string()
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// One `id[label]-->id[label]` line per edge under a `flowchart LR` header.
pub fn render_mermaid(edges: &[CrawlEdge]) -> String {
    let mut out = String::with_capacity(64 * (edges.len() + 1));
    out.push_str(MERMAID_HEADER);
    out.push('\n');
    for edge in edges {
        let _ = writeln!(
            out,
            "{}[{}]-->{}[{}]",
            hash_id(&edge.source),
            truncate_url(&edge.source, LABEL_MAX_LEN),
            hash_id(&edge.target),
            truncate_url(&edge.target, LABEL_MAX_LEN),
        );
    }
    out
}

#[derive(Debug, Serialize)]
struct JsonNode<'a> {
    id: String,
    location: &'a str,
    links_in: usize,
    links_out: usize,
}

/// Pretty JSON document with metadata, nodes, edges and failures.
pub fn render_json(outcome: &CrawlOutcome) -> Result<String> {
    let mut graph = LinkGraph::from_edges(&outcome.edges);
    for location in &outcome.queued {
        graph.add_location(location);
    }

    let nodes: Vec<JsonNode<'_>> = graph
        .locations()
        .map(|location| JsonNode {
            id: hash_id(location),
            location,
            links_in: graph.links_in(location),
            links_out: graph.links_out(location),
        })
        .collect();

    let document = serde_json::json!({
        "metadata": {
            "generator": "linkmap",
            "version": env!("CARGO_PKG_VERSION"),
            "generated_at": chrono::Utc::now().to_rfc3339(),
            "format": "json",
        },
        "summary": {
            "queued": outcome.queued.len(),
            "crawled": outcome.crawled,
            "failures": outcome.failures.len(),
            "nodes": graph.node_count(),
            "edges": outcome.edges.len(),
            "cancelled": outcome.cancelled,
        },
        "nodes": nodes,
        "edges": outcome.edges,
        "failures": outcome.failures,
    });

    serde_json::to_string_pretty(&document).map_err(|e| CoreError::Serialize(e.to_string()))
}

/// Render `outcome` in `format` and write it to `path`, replacing any
/// existing file.
pub fn write_graph(outcome: &CrawlOutcome, path: &Path, format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Mermaid => render_mermaid(&outcome.edges),
        OutputFormat::Json => render_json(outcome)?,
    };

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| CoreError::io(parent, e))?;
    }
    std::fs::write(path, content).map_err(|e| CoreError::io(path, e))?;

    tracing::info!(?path, %format, edges = outcome.edges.len(), "wrote link graph");
    Ok(())
}
