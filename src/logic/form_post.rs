//! Save-then-extract handling of form posts.
//!
//! A form post is decoded into a [`FormSubmission`], saved through the
//! [`FormService`], and, when the saved item is a document whose content was
//! part of the submission, handed to the `extract-metadata` action. Save and
//! extraction run in the caller's unit of work: the action is never asked for a
//! transaction of its own.

use axum::http::StatusCode;
use log::{debug, warn};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::model::{
    default_store_ref, FieldData, FormSubmission, ItemIdentity, Node, PersistedObject,
    CONTENT_FIELD, EXTRACT_METADATA_ACTION, REDIRECT_KEY,
};
use crate::store::traits::{ActionService, FormService, NodeResolver};

const NOT_FOUND_MARKERS: [&str; 2] = [
    "FormNotFoundException",
    "PropertyValueSizeIsMoreMaxLengthException",
];

#[derive(Debug, thiserror::Error)]
pub enum FormPostError {
    #[error("No JSON body")]
    MissingBody,
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl FormPostError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            FormPostError::MissingBody => StatusCode::NOT_IMPLEMENTED,
            FormPostError::NotFound(_) => StatusCode::NOT_FOUND,
            FormPostError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Classify a failed save by its message
    pub fn from_save_failure(message: String) -> Self {
        match classify(&message) {
            ErrorKind::NotFound => FormPostError::NotFound(message),
            ErrorKind::Internal => FormPostError::Internal(message),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Internal,
}

/// Map a form service failure message to an error kind.
///
/// The form service reports failures as text only, so the kind is recovered
/// from marker substrings in the message.
pub fn classify(message: &str) -> ErrorKind {
    if NOT_FOUND_MARKERS.iter().any(|marker| message.contains(marker)) {
        ErrorKind::NotFound
    } else {
        ErrorKind::Internal
    }
}

/// Reference string for the saved item.
///
/// A reference returned by the save always wins; otherwise an item id that is
/// already a full reference is kept, and a bare id is qualified with the
/// default store.
pub fn durable_reference(persisted: &PersistedObject, item: &ItemIdentity) -> String {
    if let Some(node_ref) = persisted.as_node_ref() {
        return node_ref.to_string();
    }
    if item.is_qualified() {
        return item.id.clone();
    }
    default_store_ref(&item.id)
}

/// Decode path parameters and body into a submission.
///
/// `alf_redirect` is lifted out of the body into the redirect; every other key
/// becomes field data, in body order.
pub fn decode_submission(
    raw_item_kind: &str,
    raw_item_id: &str,
    body: Option<Map<String, Value>>,
) -> Result<FormSubmission, FormPostError> {
    let item = ItemIdentity::new(url_decode(raw_item_kind), url_decode(raw_item_id));

    let Some(body) = body else {
        warn!("json object was undefined.");
        return Err(FormPostError::MissingBody);
    };

    let mut fields = FieldData::new();
    let mut redirect = None;
    for (key, value) in body {
        if key == REDIRECT_KEY {
            redirect = Some(value);
        } else {
            fields.add_field_data(&key, value);
        }
    }

    Ok(FormSubmission {
        item,
        fields,
        redirect,
    })
}

fn url_decode(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormPostResponse {
    pub persisted_object: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<Value>,
}

/// Saves form posts and triggers metadata extraction on changed documents
pub struct FormPostHandler {
    forms: Arc<dyn FormService>,
    nodes: Arc<dyn NodeResolver>,
    actions: Arc<dyn ActionService>,
}

impl FormPostHandler {
    pub fn new(
        forms: Arc<dyn FormService>,
        nodes: Arc<dyn NodeResolver>,
        actions: Arc<dyn ActionService>,
    ) -> Self {
        Self {
            forms,
            nodes,
            actions,
        }
    }

    /// Decode and handle a raw form post
    pub async fn post(
        &self,
        raw_item_kind: &str,
        raw_item_id: &str,
        body: Option<Map<String, Value>>,
    ) -> Result<FormPostResponse, FormPostError> {
        let submission = decode_submission(raw_item_kind, raw_item_id, body)?;
        self.handle(submission).await
    }

    pub async fn handle(&self, submission: FormSubmission) -> Result<FormPostResponse, FormPostError> {
        let FormSubmission {
            item,
            fields,
            redirect,
        } = submission;

        let persisted = self.save(&item, &fields).await?;
        self.extract_if_content_changed(&persisted, &item, &fields)
            .await?;

        Ok(FormPostResponse {
            persisted_object: persisted.to_string(),
            message: format!(
                "Successfully persisted form for item [{}] {}",
                item.kind, item.id
            ),
            redirect,
        })
    }

    async fn save(&self, item: &ItemIdentity, fields: &FieldData) -> Result<PersistedObject, FormPostError> {
        self.forms
            .save_form(&item.kind, &item.id, fields)
            .await
            .map_err(|e| FormPostError::from_save_failure(e.to_string()))
    }

    async fn extract_if_content_changed(
        &self,
        persisted: &PersistedObject,
        item: &ItemIdentity,
        fields: &FieldData,
    ) -> Result<(), FormPostError> {
        let reference = durable_reference(persisted, item);
        let node = self
            .nodes
            .find_node(&reference)
            .await
            .map_err(|e| FormPostError::Internal(e.to_string()))?;

        let Some(node) = node else {
            debug!("Skipping metadata extraction: {} not found", reference);
            return Ok(());
        };
        if !node.is_document {
            debug!("Skipping metadata extraction: {} is not a document", reference);
            return Ok(());
        }

        if !fields.contains_field(CONTENT_FIELD) {
            debug!("Skipping metadata extraction: no content change detected");
            return Ok(());
        }

        self.extract_metadata(&node).await
    }

    async fn extract_metadata(&self, node: &Node) -> Result<(), FormPostError> {
        let Some(action) = self.actions.create_action(EXTRACT_METADATA_ACTION) else {
            debug!(
                "Skipping metadata extraction: action [{}] is not available",
                EXTRACT_METADATA_ACTION
            );
            return Ok(());
        };

        // Same transaction as the save, and allowed to write
        self.actions
            .execute_action(&action, node, false, false)
            .await
            .map_err(|e| FormPostError::Internal(e.to_string()))
    }
}
