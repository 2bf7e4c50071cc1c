//! [`RemoteStoreGateway`] over the MarkLogic REST API, using a blocking reqwest client.

use crate::consts::{N_QUADS, N_TRIPLES, SPARQL_QUERY, SPARQL_RESULTS_JSON, SPARQL_UPDATE};
use crate::errors::GatewayError;
use crate::gateway::{
    GraphPermissions, QueryRequest, RemoteStoreGateway, ResponseBody, StatementPattern,
    TransactionHandle,
};
use derive_builder::Builder;
use log::{debug, info};
use oxigraph::io::{RdfFormat, RdfSerializer};
use oxigraph::model::{NamedNode, Quad, Term};
use oxigraph::sparql::results::{
    QueryResultsFormat, QueryResultsParser, ReaderQueryResultsParserOutput,
};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Builder)]
#[builder(setter(into))]
pub struct HttpGatewayConfig {
    /// Base URL of the REST instance, e.g. `http://localhost:8000`.
    pub endpoint: String,
    #[serde(default)]
    #[builder(default, setter(into, strip_option))]
    pub user: Option<String>,
    #[serde(default)]
    #[builder(default, setter(into, strip_option))]
    pub password: Option<String>,
    #[serde(default = "default_timeout_secs")]
    #[builder(default = "30")]
    pub timeout_secs: u64,
}

impl HttpGatewayConfig {
    pub fn builder() -> HttpGatewayConfigBuilder {
        HttpGatewayConfigBuilder::default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

pub struct HttpGateway {
    config: HttpGatewayConfig,
    base: String,
    client: Client,
}

impl HttpGateway {
    pub fn new(config: HttpGatewayConfig) -> Result<Self, GatewayError> {
        let url = Url::parse(&config.endpoint).map_err(|e| {
            GatewayError::Protocol(format!("invalid endpoint {}: {e}", config.endpoint))
        })?;
        // transaction ids come back in the Location header of a redirect
        let client = Client::builder()
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::none())
            .build()?;
        Ok(Self {
            base: url.as_str().trim_end_matches('/').to_string(),
            config,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.user {
            Some(user) => request.basic_auth(user, self.config.password.as_deref()),
            None => request,
        }
    }

    fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.post(self.url(path)))
    }

    fn sparql(
        &self,
        request: &QueryRequest<'_>,
        content_type: &str,
        accept: Option<&str>,
    ) -> Result<Response, GatewayError> {
        let mut builder = self
            .post("/v1/graphs/sparql")
            .header(CONTENT_TYPE, content_type)
            .query(&query_params(request))
            .body(request.query.to_string());
        if let Some(accept) = accept {
            builder = builder.header(ACCEPT, accept);
        }
        check(builder.send()?)
    }
}

/// Maps a non-success response onto a [`GatewayError`].
fn check(response: Response) -> Result<Response, GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(GatewayError::Unauthorized(body)),
        _ => Err(GatewayError::Status {
            status: status.as_u16(),
            body,
        }),
    }
}

fn tx_param(params: &mut Vec<(String, String)>, transaction: Option<&TransactionHandle>) {
    if let Some(tx) = transaction {
        params.push(("txid".to_string(), tx.id().to_string()));
    }
}

fn perm_params(params: &mut Vec<(String, String)>, permissions: &GraphPermissions) {
    for (role, capability) in permissions.iter() {
        params.push((format!("perm:{role}"), capability.as_str().to_string()));
    }
}

fn binding_params(params: &mut Vec<(String, String)>, bindings: &BTreeMap<String, Term>) {
    for (name, value) in bindings {
        let param = match value {
            Term::NamedNode(node) => (format!("bind:{name}"), node.as_str().to_string()),
            Term::Literal(literal) => {
                let key = if let Some(language) = literal.language() {
                    format!("bind:{name}@{language}")
                } else {
                    let datatype = literal.datatype().as_str();
                    let short = datatype.strip_prefix(XSD).unwrap_or(datatype);
                    format!("bind:{name}:{short}")
                };
                (key, literal.value().to_string())
            }
            other => (format!("bind:{name}"), other.to_string()),
        };
        params.push(param);
    }
}

fn query_params(request: &QueryRequest<'_>) -> Vec<(String, String)> {
    let mut params = Vec::new();
    tx_param(&mut params, request.transaction);
    if let Some(base) = request.base_uri {
        params.push(("base".to_string(), base.to_string()));
    }
    for ruleset in request.rulesets {
        params.push(("ruleset".to_string(), ruleset.clone()));
    }
    if !request.include_inferred {
        params.push(("default-rulesets".to_string(), "exclude".to_string()));
    }
    if let Some((start, page_length)) = request.page {
        params.push(("start".to_string(), start.to_string()));
        params.push(("pageLength".to_string(), page_length.to_string()));
    }
    binding_params(&mut params, request.bindings);
    perm_params(&mut params, request.permissions);
    params
}

/// `DELETE WHERE` update removing `pattern` from each graph, or from every graph.
fn delete_where(pattern: &StatementPattern, contexts: &[NamedNode]) -> String {
    let subject = pattern
        .subject
        .as_ref()
        .map_or_else(|| "?s".to_string(), ToString::to_string);
    let predicate = pattern
        .predicate
        .as_ref()
        .map_or_else(|| "?p".to_string(), ToString::to_string);
    let object = pattern
        .object
        .as_ref()
        .map_or_else(|| "?o".to_string(), ToString::to_string);
    let triple = format!("{subject} {predicate} {object}");
    if contexts.is_empty() {
        return format!("DELETE WHERE {{ GRAPH ?g {{ {triple} }} }}");
    }
    contexts
        .iter()
        .map(|graph| format!("DELETE WHERE {{ GRAPH {graph} {{ {triple} }} }}"))
        .collect::<Vec<_>>()
        .join(" ;\n")
}

/// Extracts the id from a `Location: /v1/transactions/{id}` header value.
fn transaction_id(location: &str) -> Option<&str> {
    let path = location.split('?').next().unwrap_or(location);
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty() && *id != "transactions")
}

impl RemoteStoreGateway for HttpGateway {
    fn describe(&self) -> String {
        format!("MarkLogic REST at {}", self.base)
    }

    fn tuple_query(&self, request: QueryRequest<'_>) -> Result<ResponseBody, GatewayError> {
        let response = self.sparql(&request, SPARQL_QUERY, Some(SPARQL_RESULTS_JSON))?;
        Ok(Box::new(response))
    }

    fn graph_query(&self, request: QueryRequest<'_>) -> Result<ResponseBody, GatewayError> {
        let response = self.sparql(&request, SPARQL_QUERY, Some(N_TRIPLES))?;
        Ok(Box::new(response))
    }

    fn boolean_query(&self, request: QueryRequest<'_>) -> Result<bool, GatewayError> {
        let response = self.sparql(&request, SPARQL_QUERY, Some(SPARQL_RESULTS_JSON))?;
        let output = QueryResultsParser::from_format(QueryResultsFormat::Json)
            .for_reader(response)
            .map_err(|e| GatewayError::Protocol(format!("invalid boolean result: {e}")))?;
        match output {
            ReaderQueryResultsParserOutput::Boolean(value) => Ok(value),
            ReaderQueryResultsParserOutput::Solutions(_) => Err(GatewayError::Protocol(
                "expected a boolean result, got solutions".to_string(),
            )),
        }
    }

    fn update(&self, request: QueryRequest<'_>) -> Result<(), GatewayError> {
        self.sparql(&request, SPARQL_UPDATE, None)?;
        Ok(())
    }

    fn bulk_add(
        &self,
        quads: &[Quad],
        base_uri: Option<&str>,
        permissions: &GraphPermissions,
        transaction: Option<&TransactionHandle>,
    ) -> Result<(), GatewayError> {
        let mut serializer = RdfSerializer::from_format(RdfFormat::NQuads).for_writer(Vec::new());
        for quad in quads {
            serializer.serialize_quad(quad)?;
        }
        let body = serializer.finish()?;

        let mut params = Vec::new();
        tx_param(&mut params, transaction);
        if let Some(base) = base_uri {
            params.push(("base".to_string(), base.to_string()));
        }
        perm_params(&mut params, permissions);
        debug!("POST /v1/graphs with {} quads", quads.len());
        check(
            self.post("/v1/graphs")
                .header(CONTENT_TYPE, N_QUADS)
                .query(&params)
                .body(body)
                .send()?,
        )?;
        Ok(())
    }

    fn remove(
        &self,
        pattern: &StatementPattern,
        contexts: &[NamedNode],
        transaction: Option<&TransactionHandle>,
    ) -> Result<(), GatewayError> {
        let mut params = Vec::new();
        tx_param(&mut params, transaction);
        check(
            self.post("/v1/graphs/sparql")
                .header(CONTENT_TYPE, SPARQL_UPDATE)
                .query(&params)
                .body(delete_where(pattern, contexts))
                .send()?,
        )?;
        Ok(())
    }

    fn clear(
        &self,
        contexts: &[NamedNode],
        transaction: Option<&TransactionHandle>,
    ) -> Result<(), GatewayError> {
        for graph in contexts {
            let mut params = vec![("graph".to_string(), graph.as_str().to_string())];
            tx_param(&mut params, transaction);
            let request = self.authorize(self.client.delete(self.url("/v1/graphs")));
            check(request.query(&params).send()?)?;
        }
        Ok(())
    }

    fn clear_all(&self, transaction: Option<&TransactionHandle>) -> Result<(), GatewayError> {
        let mut params = Vec::new();
        tx_param(&mut params, transaction);
        check(
            self.post("/v1/graphs/sparql")
                .header(CONTENT_TYPE, SPARQL_UPDATE)
                .query(&params)
                .body("DROP SILENT ALL")
                .send()?,
        )?;
        Ok(())
    }

    fn open_transaction(&self) -> Result<TransactionHandle, GatewayError> {
        let response = self.post("/v1/transactions").send()?;
        let response = if response.status().is_redirection() {
            response
        } else {
            check(response)?
        };
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                GatewayError::Protocol("transaction response has no Location header".to_string())
            })?;
        let id = transaction_id(location).ok_or_else(|| {
            GatewayError::Protocol(format!("cannot read a transaction id from {location}"))
        })?;
        info!("opened transaction {id}");
        Ok(TransactionHandle::new(id))
    }

    fn commit(&self, transaction: &TransactionHandle) -> Result<(), GatewayError> {
        let path = format!("/v1/transactions/{}", transaction.id());
        check(self.post(&path).query(&[("result", "commit")]).send()?)?;
        Ok(())
    }

    fn rollback(&self, transaction: &TransactionHandle) -> Result<(), GatewayError> {
        let path = format!("/v1/transactions/{}", transaction.id());
        check(self.post(&path).query(&[("result", "rollback")]).send()?)?;
        Ok(())
    }
}
