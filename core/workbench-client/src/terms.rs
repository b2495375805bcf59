//! Taxonomy term lookup and creation.

use crate::error::{ClientError, ClientResult};
use crate::transport::{HttpTransport, Method};
use serde_json::{Value, json};
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::{info, warn};
use workbench_fields::TermResolver;

/// Longest term name the remote accepts.
const MAX_TERM_NAME_LENGTH: usize = 255;

/// [`TermResolver`] backed by the remote taxonomy endpoints.
///
/// Values are resolved in this order:
///
/// 1. numeric values are term ids and pass through untouched;
/// 2. `http(s)://` values are looked up by URI, then by authority link;
/// 3. anything else is a term name, optionally namespaced as `vocab:name`.
///
/// A bare name is only resolvable when the field targets exactly one
/// vocabulary. Missing terms are created when `allow_adding_terms` is set.
/// Results are cached per vocabulary and name for the lifetime of the
/// resolver.
pub struct RemoteTermResolver<'a> {
    transport: &'a dyn HttpTransport,
    allow_adding_terms: bool,
    cache: RefCell<HashMap<String, u64>>,
}

impl<'a> RemoteTermResolver<'a> {
    pub fn new(transport: &'a dyn HttpTransport, allow_adding_terms: bool) -> Self {
        Self {
            transport,
            allow_adding_terms,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// Looks up a term by name within one vocabulary.
    pub fn find_term(&self, vocabulary: &str, name: &str) -> ClientResult<Option<u64>> {
        let path = format!(
            "/term_from_term_name?vocab={}&name={}&_format=json",
            urlencoding::encode(vocabulary),
            urlencoding::encode(name)
        );
        self.first_tid(&path)
    }

    /// Looks up a term by one of its URIs.
    pub fn find_term_by_uri(&self, uri: &str) -> ClientResult<Option<u64>> {
        let encoded = urlencoding::encode(uri);
        if let Some(tid) = self.first_tid(&format!("/term_from_uri?_format=json&uri={encoded}"))? {
            return Ok(Some(tid));
        }
        self.first_tid(&format!(
            "/term_from_authority_link?_format=json&authority_link={encoded}"
        ))
    }

    /// Creates a term and returns its id.
    pub fn create_term(&self, vocabulary: &str, name: &str) -> ClientResult<u64> {
        let name: String = name.chars().take(MAX_TERM_NAME_LENGTH).collect();
        let path = "/taxonomy/term?_format=json";
        let body = json!({
            "vid": [{ "target_id": vocabulary }],
            "name": [{ "value": name }],
        });
        let created: Value = self
            .transport
            .issue_request(Method::Post, path, Some(&body))?
            .expect_status(201, Method::Post, path)?
            .json()?;
        let tid = created
            .pointer("/tid/0/value")
            .and_then(Value::as_u64)
            .ok_or_else(|| ClientError::UnexpectedResponse {
                path: path.to_string(),
                reason: "created term has no tid".to_string(),
            })?;
        info!(vocabulary, name = %name, tid, "created taxonomy term");
        Ok(tid)
    }

    fn first_tid(&self, path: &str) -> ClientResult<Option<u64>> {
        let resp = self.transport.issue_request(Method::Get, path, None)?;
        if resp.status == 404 {
            return Ok(None);
        }
        let found: Value = resp.expect_status(200, Method::Get, path)?.json()?;
        Ok(found
            .pointer("/0/tid/0/value")
            .and_then(|v| v.as_u64().or_else(|| v.as_str()?.parse().ok())))
    }

    fn resolve_name(&self, vocabulary: &str, name: &str) -> ClientResult<Option<u64>> {
        let key = format!("{vocabulary}:{name}");
        if let Some(tid) = self.cache.borrow().get(&key) {
            return Ok(Some(*tid));
        }
        let tid = match self.find_term(vocabulary, name)? {
            Some(tid) => Some(tid),
            None if self.allow_adding_terms => Some(self.create_term(vocabulary, name)?),
            None => None,
        };
        if let Some(tid) = tid {
            self.cache.borrow_mut().insert(key, tid);
        }
        Ok(tid)
    }

    fn try_resolve(&self, vocabularies: &[String], raw: &str) -> ClientResult<Option<u64>> {
        let value = raw.trim();
        if let Ok(tid) = value.parse::<u64>() {
            return Ok(Some(tid));
        }
        if value.starts_with("http://") || value.starts_with("https://") {
            return self.find_term_by_uri(value);
        }

        if let Some((vocab, name)) = value.split_once(':') {
            if vocabularies.iter().any(|v| v == vocab) {
                return self.resolve_name(vocab, name.trim());
            }
        }
        match vocabularies {
            [only] => self.resolve_name(only, value),
            [] => Ok(None),
            _ => {
                warn!(value, "term name is ambiguous across vocabularies; use vocabulary:name");
                Ok(None)
            }
        }
    }
}

impl TermResolver for RemoteTermResolver<'_> {
    fn resolve_or_create_term(&self, vocabularies: &[String], raw: &str) -> Option<u64> {
        match self.try_resolve(vocabularies, raw) {
            Ok(tid) => tid,
            Err(e) => {
                warn!(value = raw, error = %e, "term lookup failed");
                None
            }
        }
    }
}
