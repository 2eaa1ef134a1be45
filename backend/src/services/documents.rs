//! Document requirement matcher.
//!
//! Pure and deterministic: classifies each required document type as
//! found, missing or expired against the company's on-file documents.

use chrono::{DateTime, Utc};

use cantiere_shared::{CompanyDocument, DocumentCheck, DocumentStatus, RequiredDocument};

/// Match required document types against on-file documents.
///
/// The first on-file document whose `doc_type` equals the required id
/// wins; ties are broken by `on_file` input order. A match whose expiry
/// is set and not after `now` is reported as expired.
pub fn check_documents(
    required: &[RequiredDocument],
    on_file: &[CompanyDocument],
    now: DateTime<Utc>,
) -> Vec<DocumentCheck> {
    required
        .iter()
        .map(|req| {
            let matched = on_file.iter().find(|doc| doc.doc_type == req.id);
            let (status, matched) = match matched {
                None => (DocumentStatus::Missing, None),
                Some(doc) => {
                    let status = match doc.expires_at {
                        Some(expiry) if expiry <= now => DocumentStatus::Expired,
                        _ => DocumentStatus::Found,
                    };
                    (status, Some(doc.clone()))
                }
            };
            DocumentCheck {
                id: req.id.clone(),
                label: req.label.clone(),
                status,
                matched,
            }
        })
        .collect()
}
