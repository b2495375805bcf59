//! Node endpoints.

use crate::error::{ClientError, ClientResult};
use crate::transport::{HttpTransport, Method};
use serde_json::Value;
use tracing::info;
use workbench_types::RemoteId;

/// Create, read, update and delete nodes through an [`HttpTransport`].
#[derive(Clone, Copy)]
pub struct NodeClient<'a> {
    transport: &'a dyn HttpTransport,
}

impl<'a> NodeClient<'a> {
    pub fn new(transport: &'a dyn HttpTransport) -> Self {
        Self { transport }
    }

    /// POSTs a node payload and returns the new node's id.
    pub fn create_node(&self, payload: &Value) -> ClientResult<RemoteId> {
        let path = "/node?_format=json";
        let created: Value = self
            .transport
            .issue_request(Method::Post, path, Some(payload))?
            .expect_status(201, Method::Post, path)?
            .json()?;
        let nid = created
            .pointer("/nid/0/value")
            .and_then(|v| match v {
                Value::Number(n) => n.as_u64().map(RemoteId::from),
                Value::String(s) if !s.trim().is_empty() => Some(RemoteId::new(s)),
                _ => None,
            })
            .ok_or_else(|| ClientError::UnexpectedResponse {
                path: path.to_string(),
                reason: "created node has no nid".to_string(),
            })?;
        info!(node_id = %nid, "created node");
        Ok(nid)
    }

    pub fn get_node(&self, id: &RemoteId) -> ClientResult<Value> {
        let path = format!("/node/{id}?_format=json");
        self.transport
            .issue_request(Method::Get, &path, None)?
            .expect_status(200, Method::Get, &path)?
            .json()
    }

    pub fn patch_node(&self, id: &RemoteId, payload: &Value) -> ClientResult<()> {
        let path = format!("/node/{id}?_format=json");
        self.transport
            .issue_request(Method::Patch, &path, Some(payload))?
            .expect_status(200, Method::Patch, &path)?;
        info!(node_id = %id, "updated node");
        Ok(())
    }

    pub fn delete_node(&self, id: &RemoteId) -> ClientResult<()> {
        let path = format!("/node/{id}?_format=json");
        self.transport
            .issue_request(Method::Delete, &path, None)?
            .expect_status(204, Method::Delete, &path)?;
        info!(node_id = %id, "deleted node");
        Ok(())
    }

    /// `true` on 200, `false` on 404. Any other status is an error.
    pub fn node_exists(&self, id: &RemoteId) -> ClientResult<bool> {
        let path = format!("/node/{id}?_format=json");
        let resp = self.transport.issue_request(Method::Head, &path, None)?;
        match resp.status {
            200 => Ok(true),
            404 => Ok(false),
            status => Err(ClientError::Status {
                method: Method::Head.to_string(),
                path,
                status,
                body: resp.body,
            }),
        }
    }
}
