use crate::errors::{DriverError, Result};

use std::io::{Read, Write};
use std::path::Path;

use oxigraph::io::{RdfFormat, RdfParser, RdfSerializer};
use oxigraph::model::{GraphName, NamedNode, Quad, TripleRef};

use log::debug;
use url::Url;

/// Guesses the serialization of a file from its extension. Unknown extensions read as Turtle.
pub fn format_from_path(file: &Path) -> RdfFormat {
    let extension = file.extension().and_then(|ext| ext.to_str());
    extension
        .and_then(|ext| match ext {
            "ttl" => Some(RdfFormat::Turtle),
            "xml" | "rdf" | "owl" => Some(RdfFormat::RdfXml),
            "n3" => Some(RdfFormat::N3),
            "nt" => Some(RdfFormat::NTriples),
            "nq" => Some(RdfFormat::NQuads),
            "trig" => Some(RdfFormat::TriG),
            other => RdfFormat::from_extension(other),
        })
        .unwrap_or(RdfFormat::Turtle)
}

/// `file:` IRI of a local path, used as the base IRI when none is given.
pub fn file_base_iri(file: &Path) -> Result<String> {
    let absolute = std::fs::canonicalize(file)
        .map_err(|e| DriverError::parse(format!("cannot resolve {}", file.display()), e))?;
    Url::from_file_path(&absolute)
        .map(|url| url.to_string())
        .map_err(|()| DriverError::Parse {
            message: format!("{} has no file URI", absolute.display()),
            source: None,
        })
}

/// Lazily parses a document into quads. Triples land in the default graph unless the format
/// names one. Syntax errors surface as [`DriverError::Parse`] at the record where they occur.
pub fn parse_document<R: Read>(
    reader: R,
    format: RdfFormat,
    base_iri: Option<&str>,
) -> Result<impl Iterator<Item = Result<Quad>>> {
    let mut parser = RdfParser::from_format(format);
    if let Some(base) = base_iri {
        parser = parser
            .with_base_iri(base)
            .map_err(|e| DriverError::parse(format!("invalid base IRI {base}"), e))?;
    }
    debug!("parsing {format} document (base: {base_iri:?})");
    Ok(parser
        .for_reader(reader)
        .map(|quad| quad.map_err(|e| DriverError::parse("invalid RDF document", e))))
}

/// Moves a quad into `graph`, leaving it untouched when `graph` is `None`.
pub fn into_graph(quad: Quad, graph: Option<&GraphName>) -> Quad {
    match graph {
        Some(graph) => Quad::new(quad.subject, quad.predicate, quad.object, graph.clone()),
        None => quad,
    }
}

/// Replaces the default graph with the store's reserved default graph IRI.
pub fn with_named_graph(quad: Quad, default_graph: &NamedNode) -> Quad {
    if quad.graph_name.is_default_graph() {
        Quad::new(
            quad.subject,
            quad.predicate,
            quad.object,
            default_graph.clone(),
        )
    } else {
        quad
    }
}

/// Serializes quads to `writer`. Graph names are dropped for triple-only formats.
pub fn write_quads<W, I>(writer: W, format: RdfFormat, quads: I) -> Result<W>
where
    W: Write,
    I: IntoIterator<Item = Result<Quad>>,
{
    let io = |e: std::io::Error| DriverError::repository("failed to write statements", e);
    let mut serializer = RdfSerializer::from_format(format).for_writer(writer);
    for quad in quads {
        let quad = quad?;
        if format.supports_datasets() {
            serializer.serialize_quad(&quad).map_err(io)?;
        } else {
            serializer
                .serialize_triple(TripleRef::new(
                    quad.subject.as_ref(),
                    quad.predicate.as_ref(),
                    quad.object.as_ref(),
                ))
                .map_err(io)?;
        }
    }
    serializer.finish().map_err(io)
}
