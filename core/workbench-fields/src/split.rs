//! Parsing raw cell strings into subvalues.
//!
//! All functions here are pure and never fail. A part that does not have the
//! expected shape is skipped; [`crate::validate`] reports it separately.

use workbench_types::{FieldKind, SubValue, TargetId};

/// Separates a link's URI from its title, and an authority link's parts.
pub const LINK_TITLE_SEPARATOR: &str = "%%";

/// Splits `raw` into subvalues of the given shape.
///
/// Reference and typed-relation targets come back with an empty
/// `target_type`; the reconciler fills it from the field definition.
pub fn split(kind: FieldKind, subdelimiter: &str, raw: &str) -> Vec<SubValue> {
    match kind {
        FieldKind::Simple => split_simple(subdelimiter, raw),
        FieldKind::Geolocation => split_geolocation(subdelimiter, raw),
        FieldKind::Link => split_link(subdelimiter, raw),
        FieldKind::EntityReference => split_entity_reference(subdelimiter, raw),
        FieldKind::TypedRelation => split_typed_relation(subdelimiter, raw),
        FieldKind::AuthorityLink => split_authority_link(subdelimiter, raw),
        FieldKind::MediaTrack => split_media_track(subdelimiter, raw),
    }
}

/// Trimmed, non-empty parts of a cell.
pub fn split_values<'a>(subdelimiter: &'a str, raw: &'a str) -> impl Iterator<Item = &'a str> + 'a {
    raw.split(subdelimiter).map(str::trim).filter(|part| !part.is_empty())
}

pub fn split_simple(subdelimiter: &str, raw: &str) -> Vec<SubValue> {
    split_values(subdelimiter, raw).map(SubValue::scalar).collect()
}

/// `lat,lng` pairs. A leading `\` escaping a sign is removed.
pub fn split_geolocation(subdelimiter: &str, raw: &str) -> Vec<SubValue> {
    split_values(subdelimiter, raw)
        .filter_map(|part| {
            let (lat, lng) = part.split_once(',')?;
            Some(SubValue::geo(unescape_coordinate(lat), unescape_coordinate(lng)))
        })
        .collect()
}

fn unescape_coordinate(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed.strip_prefix('\\').unwrap_or(trimmed).trim()
}

/// `uri%%title` parts. Without a title the URI doubles as the title.
pub fn split_link(subdelimiter: &str, raw: &str) -> Vec<SubValue> {
    split_values(subdelimiter, raw)
        .map(|part| match part.split_once(LINK_TITLE_SEPARATOR) {
            Some((uri, title)) => SubValue::link(uri.trim(), title.trim()),
            None => SubValue::link(part, part),
        })
        .collect()
}

/// `source%%uri%%title` parts. Title defaults to empty.
pub fn split_authority_link(subdelimiter: &str, raw: &str) -> Vec<SubValue> {
    split_values(subdelimiter, raw)
        .filter_map(|part| {
            let mut pieces = part.splitn(3, LINK_TITLE_SEPARATOR).map(str::trim);
            let source = pieces.next()?;
            let uri = pieces.next()?;
            let title = pieces.next().unwrap_or_default();
            Some(SubValue::AuthorityLink {
                source: source.to_string(),
                uri: uri.to_string(),
                title: title.to_string(),
            })
        })
        .collect()
}

pub fn split_entity_reference(subdelimiter: &str, raw: &str) -> Vec<SubValue> {
    split_values(subdelimiter, raw)
        .map(|part| SubValue::Reference {
            target_id: TargetId::from_raw(part),
            target_type: String::new(),
        })
        .collect()
}

/// `namespace:predicate:target` parts. Only the first two colons separate,
/// so a target URI keeps its own colons.
pub fn split_typed_relation(subdelimiter: &str, raw: &str) -> Vec<SubValue> {
    split_values(subdelimiter, raw)
        .filter_map(|part| {
            let mut pieces = part.splitn(3, ':');
            let namespace = pieces.next()?;
            let predicate = pieces.next()?;
            let target = pieces.next()?.trim();
            if target.is_empty() {
                return None;
            }
            Some(SubValue::TypedRelation {
                target_id: TargetId::from_raw(target),
                rel_type: format!("{namespace}:{predicate}"),
                target_type: String::new(),
            })
        })
        .collect()
}

/// `label:kind:srclang:file_path` parts.
pub fn split_media_track(subdelimiter: &str, raw: &str) -> Vec<SubValue> {
    split_values(subdelimiter, raw).filter_map(parse_media_track).collect()
}

/// One media track value.
///
/// A Windows drive letter (`C:\tracks\en.vtt`) is re-joined to the path,
/// and any extra leading colons belong to the label.
pub fn parse_media_track(part: &str) -> Option<SubValue> {
    let mut pieces: Vec<&str> = part.split(':').collect();
    let mut drive_path = None;
    if pieces.len() >= 5 {
        let n = pieces.len();
        if is_drive_letter(pieces[n - 2]) && pieces[n - 1].starts_with(['\\', '/']) {
            drive_path = Some(format!("{}:{}", pieces[n - 2], pieces[n - 1]));
            pieces.truncate(n - 2);
        }
    }
    let file_path = match drive_path {
        Some(path) => path,
        None => pieces.pop()?.trim().to_string(),
    };
    let n = pieces.len();
    if n < 3 {
        return None;
    }
    Some(SubValue::MediaTrack {
        label: pieces[..n - 2].join(":").trim().to_string(),
        kind: pieces[n - 2].trim().to_string(),
        srclang: pieces[n - 1].trim().to_string(),
        file_path,
    })
}

fn is_drive_letter(s: &str) -> bool {
    let mut chars = s.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_alphabetic())
}
