use super::{FieldReconciler, ReconcileContext};
use crate::split;
use crate::validate::MEDIA_TRACK_KINDS;
use crate::warning::FieldWarning;
use workbench_types::{FieldKind, FieldState, SubValue};

/// `label:kind:srclang:file_path` media track fields.
#[derive(Debug, Clone, Copy, Default)]
pub struct MediaTrackField;

impl FieldReconciler for MediaTrackField {
    fn kind(&self) -> FieldKind {
        FieldKind::MediaTrack
    }

    fn parse(
        &self,
        ctx: &ReconcileContext<'_>,
        raw: &str,
        warnings: &mut Vec<FieldWarning>,
    ) -> Vec<SubValue> {
        split::split_media_track(ctx.subdelimiter, raw)
            .into_iter()
            .filter(|sub| match sub {
                SubValue::MediaTrack { kind, .. } if !MEDIA_TRACK_KINDS.contains(&kind.as_str()) => {
                    ctx.invalid(warnings, kind, "unknown media track kind");
                    false
                }
                SubValue::MediaTrack { file_path, .. } if file_path.is_empty() => {
                    ctx.invalid(warnings, file_path, "media track has no file path");
                    false
                }
                _ => true,
            })
            .collect()
    }

    fn serialize(&self, state: &FieldState, subdelimiter: &str) -> String {
        state
            .iter()
            .filter_map(|sub| match sub {
                SubValue::MediaTrack {
                    label,
                    kind,
                    srclang,
                    file_path,
                } => Some(format!("{label}:{kind}:{srclang}:{file_path}")),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(subdelimiter)
    }
}
