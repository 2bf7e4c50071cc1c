//! Client-side driver for a remote RDF triple store.
//!
//! A [`Session`] hides the network behind a graph/query API: single-statement adds are
//! coalesced by a write cache, query responses are decoded on a background thread and pulled
//! through lazy cursors, and at most one remote transaction is open per session.
//!
//! ```no_run
//! use rdfdriver::{Config, HttpGateway, HttpGatewayConfig, Session};
//! use std::sync::Arc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let gateway = HttpGateway::new(
//!     HttpGatewayConfig::builder()
//!         .endpoint("http://localhost:8000")
//!         .user("admin")
//!         .password("admin")
//!         .build()?,
//! )?;
//! let session = Session::new(Arc::new(gateway), Config::default())?;
//! println!("{} statements", session.size(&[])?);
//! # Ok(())
//! # }
//! ```

extern crate derive_builder;

pub mod buffer;
pub mod config;
pub mod consts;
pub mod cursor;
pub mod dispatch;
pub mod errors;
pub mod fetch;
pub mod gateway;
pub mod http;
pub mod options;
pub mod query;
pub mod session;
pub mod skolem;
pub mod util;

pub use config::Config;
pub use cursor::{CursorState, GraphCursor, StatementCursor, TupleCursor};
pub use dispatch::{QueryForm, QueryLanguage};
pub use errors::{DriverError, GatewayError, Result};
pub use gateway::{
    GraphPermissions, QueryRequest, RemoteStoreGateway, ResponseBody, StatementPattern,
    TransactionHandle,
};
pub use http::{HttpGateway, HttpGatewayConfig};
pub use options::{CacheMode, Capability, IsolationLevel};
pub use query::{
    BooleanQuery, ExecutableQuery, GraphQuery, PreparedQuery, QueryContext, TupleQuery,
    UpdateQuery,
};
pub use session::Session;

/// Lets `RDFDRIVER_LOG` override `RUST_LOG` before a binary initialises its logger.
pub fn init_logging() {
    if let Ok(log_level) = std::env::var("RDFDRIVER_LOG") {
        std::env::set_var("RUST_LOG", log_level);
    }
}
