//! JSON-lines dump of a session's loaded graphs and restore into a backend.
//!
//! Each graph is written as a `graph` record followed by one `triple` record
//! per visible triple, so empty graphs survive a round trip. Every graph the
//! session knows to be visible is written with its staged edits; known graphs
//! that were never loaded are read from the backend without materializing
//! them. Names the session has not yet checked are not written.

use std::{
    collections::BTreeMap,
    collections::BTreeSet,
    fs::File,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
};

use serde::{Deserialize, Serialize};

use crate::{
    backend::StoreBackend,
    errors::StoreError,
    graph::GraphName,
    store::PersistentStore,
    triple::{Node, Triple},
};

#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum DumpRecord {
    Graph {
        graph: String,
    },
    Triple {
        graph: String,
        subject: Node,
        predicate: Node,
        object: Node,
    },
}

pub fn dump_store_to_path<B: StoreBackend, P: AsRef<Path>>(
    store: &PersistentStore<B>,
    path: P,
) -> Result<usize, StoreError> {
    let file = File::create(path.as_ref()).map_err(|e| StoreError::invalid_input(e.to_string()))?;
    dump_store_to_writer(store, BufWriter::new(file))
}

/// Returns the number of graphs written.
pub fn dump_store_to_writer<B: StoreBackend, W: Write>(
    store: &PersistentStore<B>,
    mut writer: W,
) -> Result<usize, StoreError> {
    let names = store.registry().known_visible();
    for name in &names {
        let triples: Vec<Triple> = match store.proxies().get(name) {
            Some(handle) => handle.triples(),
            None => store.backend_dyn().load_graph(name)?.into_iter().collect(),
        };
        let graph = name.to_key();
        write_record(
            &mut writer,
            &DumpRecord::Graph {
                graph: graph.clone(),
            },
        )?;
        for triple in triples {
            write_record(
                &mut writer,
                &DumpRecord::Triple {
                    graph: graph.clone(),
                    subject: triple.subject,
                    predicate: triple.predicate,
                    object: triple.object,
                },
            )?;
        }
    }
    writer
        .flush()
        .map_err(|e| StoreError::invalid_input(e.to_string()))?;
    tracing::debug!(graphs = names.len(), "dumped session graphs");
    Ok(names.len())
}

fn write_record<W: Write>(writer: &mut W, record: &DumpRecord) -> Result<(), StoreError> {
    let line =
        serde_json::to_string(record).map_err(|e| StoreError::invalid_input(e.to_string()))?;
    writeln!(writer, "{line}").map_err(|e| StoreError::invalid_input(e.to_string()))
}

pub fn restore_backend_from_path<B: StoreBackend + ?Sized, P: AsRef<Path>>(
    backend: &B,
    path: P,
) -> Result<usize, StoreError> {
    let file = File::open(path.as_ref()).map_err(|e| StoreError::invalid_input(e.to_string()))?;
    restore_backend_from_reader(backend, BufReader::new(file))
}

/// Save every graph in the dump to the backend, replacing graphs of the same
/// name. The whole dump is parsed before the first save. Returns the number
/// of graphs written.
pub fn restore_backend_from_reader<B: StoreBackend + ?Sized, R: BufRead>(
    backend: &B,
    reader: R,
) -> Result<usize, StoreError> {
    let mut graphs: BTreeMap<GraphName, BTreeSet<Triple>> = BTreeMap::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line.map_err(|e| StoreError::invalid_input(e.to_string()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: DumpRecord = serde_json::from_str(&line)
            .map_err(|e| StoreError::invalid_input(format!("dump line {}: {e}", idx + 1)))?;
        let line_error =
            |e: StoreError| StoreError::invalid_input(format!("dump line {}: {e}", idx + 1));
        match record {
            DumpRecord::Graph { graph } => {
                graphs
                    .entry(GraphName::from_key(&graph).map_err(line_error)?)
                    .or_default();
            }
            DumpRecord::Triple {
                graph,
                subject,
                predicate,
                object,
            } => {
                graphs
                    .entry(GraphName::from_key(&graph).map_err(line_error)?)
                    .or_default()
                    .insert(Triple::new(subject, predicate, object));
            }
        }
    }
    for (name, triples) in &graphs {
        backend.save_graph(name, triples)?;
    }
    tracing::info!(graphs = graphs.len(), "restored dump into backend");
    Ok(graphs.len())
}
