//! Attachment validation
//!
//! Documents carry their file attachments' metadata under `_attachments`,
//! keyed by file name. Definitions constrain attachments in two places: the
//! document-level `attachmentConstraints`, and `attachmentReference`
//! properties that name one attachment each.
//!
//! An attachment is usually uploaded in a separate write from the document
//! property that references it, so a reference is only checked against the
//! attachment's metadata once the attachment is present.

use serde_json::{Map, Value};

use super::report::ItemPath;
use super::validation::{ItemFrame, ValidationContext};
use crate::constraints::{ConstraintScope, Constraints};
use crate::error::Result;

/// Metadata of one attachment
#[derive(Debug, Clone, Copy)]
pub struct AttachmentInfo<'d> {
    /// File name
    pub name: &'d str,
    /// MIME type, if declared
    pub content_type: Option<&'d str>,
    /// Size in bytes, if declared
    pub length: Option<u64>,
}

impl<'d> AttachmentInfo<'d> {
    fn from_entry(name: &'d str, meta: &'d Value) -> Self {
        Self {
            name,
            content_type: meta.get("content_type").and_then(Value::as_str),
            length: meta.get("length").and_then(Value::as_u64),
        }
    }
}

/// Attachments of a document, in key order
pub fn attachments_of(doc: &Value) -> Vec<AttachmentInfo<'_>> {
    doc.get("_attachments")
        .and_then(Value::as_object)
        .map(|entries: &Map<String, Value>| {
            entries
                .iter()
                .map(|(name, meta)| AttachmentInfo::from_entry(name, meta))
                .collect()
        })
        .unwrap_or_default()
}

/// Whether a file name ends with one of the extensions, ignoring case
pub fn has_supported_extension(name: &str, extensions: &[String]) -> bool {
    let name = name.to_lowercase();
    extensions
        .iter()
        .any(|ext| name.ends_with(&format!(".{}", ext.to_lowercase())))
}

// =============================================================================
// Attachment references
// =============================================================================

/// Validate a property of type `attachmentReference`
pub(crate) fn validate_attachment_reference(
    value: &Value,
    constraints: &Constraints<'_, '_>,
    frame: &ItemFrame<'_>,
    context: &mut ValidationContext<'_>,
) -> Result<()> {
    let path = frame.path.as_str();
    let Some(name) = value.as_str() else {
        context.report(&frame.path, format!("attachment property \"{}\" must be a string", path));
        return Ok(());
    };
    context.attachment_references.insert(name.to_string());

    if let Some(extensions) = constraints.strings("supportedExtensions")? {
        if !has_supported_extension(name, &extensions) {
            context.report(
                &frame.path,
                format!(
                    "attachment property \"{}\" must have a supported file extension ({})",
                    path,
                    extensions.join(",")
                ),
            );
        }
    }

    let doc = context.doc;
    let Some(attachment) = attachments_of(doc).into_iter().find(|a| a.name == name) else {
        return Ok(());
    };

    if let Some(content_types) = constraints.strings("supportedContentTypes")? {
        if !attachment
            .content_type
            .is_some_and(|ct| content_types.iter().any(|t| t == ct))
        {
            context.report(
                &frame.path,
                format!(
                    "attachment property \"{}\" must have a supported content type ({})",
                    path,
                    content_types.join(",")
                ),
            );
        }
    }

    if let Some(maximum) = constraints.size("maximumSize")? {
        if attachment.length.is_some_and(|len| len > maximum) {
            context.report(
                &frame.path,
                format!("attachment property \"{}\" must not be larger than {} bytes", path, maximum),
            );
        }
    }
    Ok(())
}

// =============================================================================
// Document attachments
// =============================================================================

/// Validate the document's attachments against the definition
///
/// Runs after property traversal so that every attachment reference has been
/// recorded.
pub(crate) fn validate_document_attachments(
    definition: &Constraints<'_, '_>,
    context: &mut ValidationContext<'_>,
) -> Result<()> {
    let attachments = attachments_of(context.doc);
    let root = ItemPath::root();

    if !definition.flag("allowAttachments")? {
        if !attachments.is_empty() {
            context.report(&root, "document type does not support attachments");
        }
        return Ok(());
    }

    let Some(rules) = definition.object("attachmentConstraints")? else {
        return Ok(());
    };
    let Some(rules) = rules.as_object() else {
        return Ok(());
    };
    let rules = Constraints::new(rules, ConstraintScope::Definition, *definition.context(), "attachmentConstraints");

    if let Some(maximum) = rules.size("maximumAttachmentCount")? {
        if attachments.len() as u64 > maximum {
            context.report(&root, format!("the total number of attachments must not exceed {}", maximum));
        }
    }

    let individual = rules.size("maximumIndividualSize")?;
    let extensions = rules.strings("supportedExtensions")?;
    let content_types = rules.strings("supportedContentTypes")?;
    let filename_pattern = rules.regex("filenameRegexPattern")?;
    let require_references = rules.flag("requireAttachmentReferences")?;

    let mut total: u64 = 0;
    for attachment in &attachments {
        let length = attachment.length.unwrap_or(0);
        total = total.saturating_add(length);

        if let Some(maximum) = individual {
            if length > maximum {
                context.report(
                    &root,
                    format!("attachment {} must not exceed {} bytes", attachment.name, maximum),
                );
            }
        }

        if let Some(extensions) = &extensions {
            if !has_supported_extension(attachment.name, extensions) {
                context.report(
                    &root,
                    format!(
                        "attachment \"{}\" must have a supported file extension ({})",
                        attachment.name,
                        extensions.join(",")
                    ),
                );
            }
        }

        if let Some(content_types) = &content_types {
            if !attachment
                .content_type
                .is_some_and(|ct| content_types.iter().any(|t| t == ct))
            {
                context.report(
                    &root,
                    format!(
                        "attachment \"{}\" must have a supported content type ({})",
                        attachment.name,
                        content_types.join(",")
                    ),
                );
            }
        }

        if let Some(pattern) = &filename_pattern {
            if !pattern.is_match(attachment.name) {
                context.report(
                    &root,
                    format!("attachment filename \"{}\" must conform to expected pattern", attachment.name),
                );
            }
        }

        if require_references && !context.attachment_references.contains(attachment.name) {
            context.report(
                &root,
                format!("attachment {} must have a corresponding attachment reference property", attachment.name),
            );
        }
    }

    if let Some(maximum) = rules.size("maximumTotalSize")? {
        if total > maximum {
            context.report(
                &root,
                format!("the total size of all attachments must not exceed {} bytes", maximum),
            );
        }
    }
    Ok(())
}
