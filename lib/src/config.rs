//! Defines the configuration of a driver session.
//! Every session owns its own `Config`; there is no process-wide cache switch.

use crate::consts::{
    DEFAULT_CACHE_MILLIS, DEFAULT_CACHE_SIZE, DEFAULT_GRAPH, DEFAULT_HANDOFF_CAPACITY,
    DEFAULT_INITIAL_DELAY_MILLIS, SKOLEM_PREFIX,
};
use crate::errors::{DriverError, Result};
use crate::options::CacheMode;
use derive_builder::Builder;
use oxigraph::model::NamedNode;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Write};
use std::path::Path;
use std::time::Duration;

fn default_cache_size() -> usize {
    DEFAULT_CACHE_SIZE
}

fn default_cache_millis() -> u64 {
    DEFAULT_CACHE_MILLIS
}

fn default_initial_delay_millis() -> u64 {
    DEFAULT_INITIAL_DELAY_MILLIS
}

fn default_handoff_capacity() -> usize {
    DEFAULT_HANDOFF_CAPACITY
}

fn default_skolem_prefix() -> String {
    SKOLEM_PREFIX.to_string()
}

fn default_graph_iri() -> String {
    DEFAULT_GRAPH.as_str().to_string()
}

fn default_quad_mode() -> bool {
    true
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct Config {
    /// Number of buffered statements that forces a flush.
    #[serde(default = "default_cache_size")]
    #[builder(default = "DEFAULT_CACHE_SIZE")]
    pub cache_size: usize,
    /// Maximum age of the oldest unflushed write before the timer flushes it.
    #[serde(default = "default_cache_millis")]
    #[builder(default = "DEFAULT_CACHE_MILLIS")]
    pub cache_millis: u64,
    /// Delay before the first timer tick.
    #[serde(default = "default_initial_delay_millis")]
    #[builder(default = "DEFAULT_INITIAL_DELAY_MILLIS")]
    pub initial_delay_millis: u64,
    #[serde(default)]
    #[builder(default)]
    pub write_cache: CacheMode,
    /// Records a cursor may hold before its decoder thread blocks.
    #[serde(default = "default_handoff_capacity")]
    #[builder(default = "DEFAULT_HANDOFF_CAPACITY")]
    pub handoff_capacity: usize,
    #[serde(default = "default_skolem_prefix")]
    #[builder(default = "SKOLEM_PREFIX.to_string()")]
    pub skolem_prefix: String,
    #[serde(default = "default_graph_iri")]
    #[builder(default = "DEFAULT_GRAPH.as_str().to_string()")]
    pub default_graph: String,
    // report the named graph of every statement returned by statement lookups
    #[serde(default = "default_quad_mode")]
    #[builder(default = "true")]
    pub quad_mode: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_size: default_cache_size(),
            cache_millis: default_cache_millis(),
            initial_delay_millis: default_initial_delay_millis(),
            write_cache: CacheMode::default(),
            handoff_capacity: default_handoff_capacity(),
            skolem_prefix: default_skolem_prefix(),
            default_graph: default_graph_iri(),
            quad_mode: default_quad_mode(),
        }
    }
}

impl ConfigBuilder {
    fn validate(&self) -> std::result::Result<(), String> {
        if self.cache_size == Some(0) {
            return Err("cache_size must be at least 1".to_string());
        }
        if self.handoff_capacity == Some(0) {
            return Err("handoff_capacity must be at least 1".to_string());
        }
        if let Some(graph) = &self.default_graph {
            NamedNode::new(graph.as_str()).map_err(|e| format!("invalid default_graph: {e}"))?;
        }
        Ok(())
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    pub fn cache_period(&self) -> Duration {
        Duration::from_millis(self.cache_millis)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_millis)
    }

    /// The reserved graph substituted for an absent context.
    pub fn default_graph(&self) -> Result<NamedNode> {
        NamedNode::new(self.default_graph.as_str()).map_err(|e| {
            DriverError::IllegalState(format!(
                "configured default graph {} is not an IRI: {e}",
                self.default_graph
            ))
        })
    }

    /// Checks a configuration that did not go through the builder, e.g. one read from disk.
    pub fn validate(&self) -> Result<()> {
        if self.cache_size == 0 {
            return Err(DriverError::IllegalState(
                "cache_size must be at least 1".to_string(),
            ));
        }
        if self.handoff_capacity == 0 {
            return Err(DriverError::IllegalState(
                "handoff_capacity must be at least 1".to_string(),
            ));
        }
        self.default_graph().map(|_| ())
    }

    pub fn save_to_file(&self, file: &Path) -> anyhow::Result<()> {
        let config_str = serde_json::to_string_pretty(&self)?;
        let mut file = std::fs::File::create(file)?;
        file.write_all(config_str.as_bytes())?;
        Ok(())
    }

    pub fn from_file(file: &Path) -> anyhow::Result<Self> {
        let file = std::fs::File::open(file)?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader)?;
        config.validate()?;
        Ok(config)
    }
}
