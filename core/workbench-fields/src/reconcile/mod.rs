//! Field reconcilers: one per field shape, sharing the merge rules.

mod authority_link;
mod entity_reference;
mod geolocation;
mod link;
mod media_track;
mod simple;
mod typed_relation;

pub use authority_link::AuthorityLinkField;
pub use entity_reference::EntityReferenceField;
pub use geolocation::GeolocationField;
pub use link::LinkField;
pub use media_track::MediaTrackField;
pub use simple::SimpleField;
pub use typed_relation::TypedRelationField;

use crate::cardinality;
use crate::terms::TermResolver;
use crate::warning::FieldWarning;
use tracing::{debug, warn};
use workbench_types::{FieldDefinition, FieldKind, FieldState, Row, SubValue, UpdateMode};

/// Everything a reconciler needs to know about one field of one row.
#[derive(Clone, Copy)]
pub struct ReconcileContext<'a> {
    pub field_name: &'a str,
    pub definition: &'a FieldDefinition,
    pub row: &'a Row,
    pub subdelimiter: &'a str,
    /// Format attached to formatted text values.
    pub text_format: &'a str,
    pub terms: &'a dyn TermResolver,
}

impl<'a> ReconcileContext<'a> {
    pub fn new(
        field_name: &'a str,
        definition: &'a FieldDefinition,
        row: &'a Row,
        subdelimiter: &'a str,
        terms: &'a dyn TermResolver,
    ) -> Self {
        Self {
            field_name,
            definition,
            row,
            subdelimiter,
            text_format: "basic_html",
            terms,
        }
    }

    #[must_use]
    pub fn with_text_format(mut self, text_format: &'a str) -> Self {
        self.text_format = text_format;
        self
    }

    pub fn row_id(&self) -> &str {
        &self.row.id
    }

    /// Records (and logs) that `value` was dropped.
    pub fn invalid(&self, warnings: &mut Vec<FieldWarning>, value: &str, reason: &str) {
        let warning = FieldWarning::InvalidValue {
            field: self.field_name.to_string(),
            row_id: self.row.id.clone(),
            value: value.to_string(),
            reason: reason.to_string(),
        };
        warn!(field = self.field_name, row_id = %self.row.id, "{warning}");
        warnings.push(warning);
    }

    /// Records (and logs) that a taxonomy value could not be resolved.
    pub fn unresolved_term(&self, warnings: &mut Vec<FieldWarning>, value: &str) {
        let warning = FieldWarning::TermResolution {
            field: self.field_name.to_string(),
            row_id: self.row.id.clone(),
            value: value.to_string(),
        };
        warn!(field = self.field_name, row_id = %self.row.id, "{warning}");
        warnings.push(warning);
    }

    /// Truncates `value` to the field's `max_length`, recording a warning
    /// when anything was cut.
    pub fn truncate(&self, warnings: &mut Vec<FieldWarning>, value: &str) -> String {
        let Some(max_length) = self.definition.max_length else {
            return value.to_string();
        };
        if value.chars().count() <= max_length {
            return value.to_string();
        }
        let warning = FieldWarning::ValueTruncated {
            field: self.field_name.to_string(),
            row_id: self.row.id.clone(),
            max_length,
        };
        warn!(field = self.field_name, row_id = %self.row.id, "{warning}");
        warnings.push(warning);
        value.chars().take(max_length).collect()
    }
}

/// New field state plus the soft problems hit while computing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciled {
    pub state: FieldState,
    pub warnings: Vec<FieldWarning>,
}

impl Reconciled {
    fn unchanged(state: &FieldState) -> Self {
        Self {
            state: state.clone(),
            warnings: Vec::new(),
        }
    }
}

/// Translates a cell value (plus existing state) into a field's new state.
///
/// Implementors supply `parse` and `serialize`; `create` and `update` carry
/// the merge rules every field shape shares.
pub trait FieldReconciler: Sync {
    fn kind(&self) -> FieldKind;

    /// Splits a non-blank cell and applies shape-specific transforms
    /// (typing, validation, term resolution). Values that cannot be used are
    /// dropped with a warning.
    fn parse(
        &self,
        ctx: &ReconcileContext<'_>,
        raw: &str,
        warnings: &mut Vec<FieldWarning>,
    ) -> Vec<SubValue>;

    /// Renders state back into cell syntax.
    fn serialize(&self, state: &FieldState, subdelimiter: &str) -> String;

    /// Field state for a new entity. A blank cell yields an empty state.
    fn create(&self, ctx: &ReconcileContext<'_>) -> Reconciled {
        let Some(raw) = ctx.row.get_non_blank(ctx.field_name) else {
            return Reconciled::default();
        };
        let mut warnings = Vec::new();
        let incoming = dedupe(self.parse(ctx, raw, &mut warnings));
        let values = cardinality::enforce(
            incoming,
            ctx.definition.cardinality,
            ctx.field_name,
            ctx.row_id(),
            &mut warnings,
        );
        Reconciled {
            state: FieldState::new(values),
            warnings,
        }
    }

    /// Field state for an existing entity.
    ///
    /// `delete` always empties the field. Otherwise a blank cell leaves the
    /// existing state untouched; singular fields are replaced even under
    /// `append`.
    fn update(
        &self,
        ctx: &ReconcileContext<'_>,
        existing: &FieldState,
        mode: UpdateMode,
    ) -> Reconciled {
        if mode == UpdateMode::Delete {
            return Reconciled::default();
        }
        let Some(raw) = ctx.row.get_non_blank(ctx.field_name) else {
            return Reconciled::unchanged(existing);
        };

        let mut warnings = Vec::new();
        let incoming = dedupe(self.parse(ctx, raw, &mut warnings));
        let cardinality = ctx.definition.cardinality;
        let combined = if mode == UpdateMode::Append && !cardinality.is_singular() {
            let mut merged = existing.as_slice().to_vec();
            merged.extend(incoming);
            dedupe(merged)
        } else {
            incoming
        };
        debug!(
            field = ctx.field_name,
            row_id = ctx.row_id(),
            kind = %self.kind(),
            %mode,
            values = combined.len(),
            "reconciled field"
        );
        let values = cardinality::enforce(
            combined,
            cardinality,
            ctx.field_name,
            ctx.row_id(),
            &mut warnings,
        );
        Reconciled {
            state: FieldState::new(values),
            warnings,
        }
    }
}

/// Removes repeated values, keeping the first occurrence.
pub fn dedupe(values: Vec<SubValue>) -> Vec<SubValue> {
    let mut unique: Vec<SubValue> = Vec::with_capacity(values.len());
    for value in values {
        if !unique.contains(&value) {
            unique.push(value);
        }
    }
    unique
}

/// The reconciler for a field shape.
pub fn reconciler_for(kind: FieldKind) -> &'static dyn FieldReconciler {
    match kind {
        FieldKind::Simple => &SimpleField,
        FieldKind::Geolocation => &GeolocationField,
        FieldKind::Link => &LinkField,
        FieldKind::EntityReference => &EntityReferenceField,
        FieldKind::TypedRelation => &TypedRelationField,
        FieldKind::AuthorityLink => &AuthorityLinkField,
        FieldKind::MediaTrack => &MediaTrackField,
    }
}
