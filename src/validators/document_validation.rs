//! Document Validation
//!
//! This module implements the runtime validation of a document write against
//! a document definition. It walks the document and its previous revision in
//! lockstep, driven by the definition's property validator tree, and collects
//! every violation it finds.
//!
//! The walk is driven by an explicit work stack rather than by recursion, so
//! nesting depth is bounded only by [`Limits`] and never by the thread's
//! stack. Tasks are popped in the order a depth-first walk would visit them,
//! which keeps violations in document order.

use std::borrow::Cow;

use serde_json::Value;
use tracing::{debug, trace};

use super::attachments::{validate_attachment_reference, validate_document_attachments};
use super::builtins::{comparable, comparable_bound, is_integer, loosely_equal, strictly_equal, PropertyType};
use super::facets::{check_bounds, CountFacet};
use super::report::{ItemPath, Violation};
use super::validation::{ItemFrame, ValidationContext};
use crate::constraints::{resolve, ConstraintScope, Constraints};
use crate::error::{ConfigurationDefect, Result};
use crate::limits::Limits;
use crate::values::{CallContext, SchemaMap, SchemaValue};

/// Top-level properties every document may carry
pub const RESERVED_PROPERTIES: [&str; 5] = ["_id", "_rev", "_deleted", "_revisions", "_attachments"];

/// Validates document writes against one document definition
#[derive(Debug, Clone)]
pub struct DocumentValidator<'s> {
    definition: &'s SchemaValue,
    limits: Limits,
}

impl<'s> DocumentValidator<'s> {
    /// Create a validator for a document definition
    pub fn new(definition: &'s SchemaValue) -> Self {
        Self {
            definition,
            limits: Limits::default(),
        }
    }

    /// Use custom limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Validate a write of `doc` over `old_doc`
    ///
    /// Returns every violation in traversal order; an empty list means the
    /// write is valid. Errors are reserved for broken definitions and
    /// exceeded limits.
    pub fn validate(&self, doc: &Value, old_doc: Option<&Value>) -> Result<Vec<Violation>> {
        let definition = self.definition.as_object().ok_or_else(|| ConfigurationDefect::InvalidDefinition {
            doc_type: String::new(),
            reason: format!("expected an object, found a {}", self.definition.kind()),
        })?;

        let mut context = ValidationContext::new(doc, old_doc, self.limits.clone());
        let id = doc.get("_id").and_then(Value::as_str).unwrap_or_default();
        debug!(id, replace = context.is_replace(), delete = context.is_delete(), "validating document");

        let constraints = Constraints::new(
            definition,
            ConstraintScope::Definition,
            CallContext::document(doc, old_doc),
            "",
        );
        validate_definition(definition, &constraints, &mut context)?;

        let violations = context.into_violations();
        debug!(violations = violations.len(), "document validated");
        Ok(violations)
    }
}

/// Validate a write of `doc` over `old_doc` against a document definition
pub fn validate_document(doc: &Value, old_doc: Option<&Value>, definition: &SchemaValue) -> Result<Vec<Violation>> {
    DocumentValidator::new(definition).validate(doc, old_doc)
}

// =============================================================================
// Document level
// =============================================================================

fn validate_definition<'s>(
    definition: &'s SchemaMap,
    constraints: &Constraints<'s, '_>,
    context: &mut ValidationContext<'_>,
) -> Result<()> {
    let immutable = constraints.flag("immutable")?;
    let root = ItemFrame::root(context.doc, context.old_doc);

    if context.is_delete() {
        if context.is_replace() && (immutable || constraints.flag("cannotDelete")?) {
            context.report(&root.path, "documents of this type cannot be deleted");
        }
        return Ok(());
    }

    if context.is_replace() {
        if immutable || constraints.flag("cannotReplace")? {
            context.report(&root.path, "documents of this type cannot be replaced");
        }
    } else {
        validate_document_id(definition, constraints, context)?;
    }

    let validators = constraints
        .object("propertyValidators")?
        .unwrap_or_else(|| Cow::Owned(SchemaValue::Object(SchemaMap::new())));
    let allow_unknown = constraints.flag("allowUnknownProperties")?;

    let mut stack = Vec::new();
    schedule_properties(validators, allow_unknown, true, &root, &mut stack);
    run(stack, context)?;

    validate_document_attachments(constraints, context)
}

fn validate_document_id(
    definition: &SchemaMap,
    constraints: &Constraints<'_, '_>,
    context: &mut ValidationContext<'_>,
) -> Result<()> {
    let id_constraints = Constraints::new(
        definition,
        ConstraintScope::DocumentId,
        *constraints.context(),
        "",
    );
    let Some(pattern) = id_constraints.regex("documentIdRegexPattern")? else {
        return Ok(());
    };
    if let Some(id) = context.doc.get("_id").and_then(Value::as_str) {
        if !pattern.is_match(id) {
            context.report(&ItemPath::root(), "document Id must conform to expected format");
        }
    }
    Ok(())
}

// =============================================================================
// Work stack
// =============================================================================

/// Traversal work waiting on the stack
///
/// `'s` is the lifetime of the definition and `'d` that of the documents.
/// Validators computed by callables are owned by their task.
#[derive(Debug)]
enum Task<'s, 'd> {
    /// Validate one item against its validator
    Item {
        validator: Cow<'s, SchemaValue>,
        frame: ItemFrame<'d>,
    },
    /// Report the properties of an object item that no validator declares
    UnknownProperties {
        declared: Vec<String>,
        reserved: bool,
        frame: ItemFrame<'d>,
    },
}

type Stack<'s, 'd> = Vec<Task<'s, 'd>>;

/// Pop and process tasks until the stack is empty
fn run<'s, 'd>(mut stack: Stack<'s, 'd>, context: &mut ValidationContext<'d>) -> Result<()> {
    while let Some(task) = stack.pop() {
        match task {
            Task::Item { validator, frame } => validate_item(validator, frame, &mut stack, context)?,
            Task::UnknownProperties { declared, reserved, frame } => {
                report_unknown_properties(&declared, reserved, &frame, context)
            }
        }
    }
    Ok(())
}

/// Queue the properties of an object item
///
/// Each declared validator is applied to the property of the same name; then
/// any property with no validator is reported unless unknown properties are
/// allowed. `reserved` whitelists the document's own metadata properties.
fn schedule_properties<'s, 'd>(
    validators: Cow<'s, SchemaValue>,
    allow_unknown: bool,
    reserved: bool,
    frame: &ItemFrame<'d>,
    stack: &mut Stack<'s, 'd>,
) {
    let children: Vec<(String, Cow<'s, SchemaValue>)> = match validators {
        Cow::Borrowed(validators) => validators
            .as_object()
            .into_iter()
            .flatten()
            .map(|(name, validator)| (name.clone(), Cow::Borrowed(validator)))
            .collect(),
        Cow::Owned(SchemaValue::Object(validators)) => validators
            .into_iter()
            .map(|(name, validator)| (name, Cow::Owned(validator)))
            .collect(),
        Cow::Owned(_) => Vec::new(),
    };

    if !allow_unknown {
        stack.push(Task::UnknownProperties {
            declared: children.iter().map(|(name, _)| name.clone()).collect(),
            reserved,
            frame: frame.clone(),
        });
    }
    for (name, validator) in children.into_iter().rev() {
        stack.push(Task::Item {
            validator,
            frame: frame.property(&name),
        });
    }
}

/// Queue one validator for several child frames, first child on top
fn schedule_children<'s, 'd>(
    validator: Cow<'s, SchemaValue>,
    children: Vec<ItemFrame<'d>>,
    stack: &mut Stack<'s, 'd>,
) {
    for frame in children.into_iter().rev() {
        stack.push(Task::Item {
            validator: validator.clone(),
            frame,
        });
    }
}

fn report_unknown_properties(
    declared: &[String],
    reserved: bool,
    frame: &ItemFrame<'_>,
    context: &mut ValidationContext<'_>,
) {
    let Some(Value::Object(object)) = frame.value else {
        return;
    };
    for name in object.keys() {
        if declared.contains(name) || (reserved && RESERVED_PROPERTIES.contains(&name.as_str())) {
            continue;
        }
        let path = frame.path.property(name);
        context.report(&path, format!("property \"{}\" is not supported", path));
    }
}

// =============================================================================
// Items
// =============================================================================

/// Validate one item (property, array element or hashtable value)
///
/// Nested items are queued on `stack` rather than validated here.
fn validate_item<'s, 'd>(
    validator: Cow<'s, SchemaValue>,
    frame: ItemFrame<'d>,
    stack: &mut Stack<'s, 'd>,
    context: &mut ValidationContext<'d>,
) -> Result<()> {
    context.check_depth(&frame)?;
    trace!(path = frame.path.as_str(), "validating item");

    let call = CallContext::document(context.doc, context.old_doc).with_frame(&frame);
    match validator {
        Cow::Borrowed(validator) => {
            let node = resolve(&frame.name, validator, ConstraintScope::Property, &call)?;
            match node {
                Cow::Borrowed(node) => validate_node(node, &frame, stack, context, |nested| nested),
                Cow::Owned(node) => {
                    validate_node(&node, &frame, stack, context, |nested| Cow::Owned(nested.into_owned()))
                }
            }
        }
        Cow::Owned(validator) => {
            let node = if validator.is_function() {
                resolve(&frame.name, &validator, ConstraintScope::Property, &call)?.into_owned()
            } else {
                validator
            };
            validate_node(&node, &frame, stack, context, |nested| Cow::Owned(nested.into_owned()))
        }
    }
}

/// Apply a resolved validator node to an item
///
/// `detach` turns a validator nested in `node` into one that can outlive it:
/// a borrow for nodes taken from the definition, a copy for nodes computed by
/// a callable.
fn validate_node<'n, 's, 'd, F>(
    node: &'n SchemaValue,
    frame: &ItemFrame<'d>,
    stack: &mut Stack<'s, 'd>,
    context: &mut ValidationContext<'d>,
    detach: F,
) -> Result<()>
where
    F: Fn(Cow<'n, SchemaValue>) -> Cow<'s, SchemaValue>,
{
    let path = frame.path.as_str();
    let node = node
        .as_object()
        .ok_or_else(|| ConfigurationDefect::invalid_constraint(path, "propertyValidators", "a property validator object"))?;
    let call = CallContext::document(context.doc, context.old_doc).with_frame(frame);
    let constraints = Constraints::new(node, ConstraintScope::Property, call, path);

    validate_custom(&constraints, frame, context)?;

    match frame.value {
        None | Some(Value::Null) if constraints.flag("required")? => {
            context.report(&frame.path, format!("required property \"{}\" is missing", path));
            return Ok(());
        }
        None if constraints.flag("mustNotBeMissing")? => {
            context.report(&frame.path, format!("property \"{}\" must not be missing", path));
            return Ok(());
        }
        Some(Value::Null) if constraints.flag("mustNotBeNull")? => {
            context.report(&frame.path, format!("property \"{}\" must not be null", path));
            return Ok(());
        }
        _ => {}
    }

    // An absent item needs no type, so a dynamic type may resolve to nothing.
    let present = frame.value.filter(|v| !v.is_null());
    let ty = constraints
        .get("type")?
        .and_then(|ty| ty.as_str().and_then(PropertyType::from_name));
    if present.is_some() && ty.is_none() {
        return Err(ConfigurationDefect::UnknownType { path: path.to_string() }.into());
    }

    if context.is_replace() && is_updated_illegally(ty, &constraints, frame)? {
        context.report(&frame.path, format!("property \"{}\" may not be updated", path));
    }

    validate_equality(ty, &constraints, frame, context)?;

    let (Some(value), Some(ty)) = (present, ty) else {
        return Ok(());
    };

    for message in check_bounds(ty, value, &constraints, path)? {
        context.report(&frame.path, message);
    }

    validate_type(ty, value, &constraints, frame, stack, context, detach)
}

fn validate_custom(
    constraints: &Constraints<'_, '_>,
    frame: &ItemFrame<'_>,
    context: &mut ValidationContext<'_>,
) -> Result<()> {
    let Some(result) = constraints.get("customValidation")? else {
        return Ok(());
    };
    match &*result {
        SchemaValue::String(message) => context.report(&frame.path, message.as_str()),
        SchemaValue::Array(messages) => {
            for message in messages {
                let message = message.as_str().ok_or_else(|| {
                    ConfigurationDefect::invalid_constraint(frame.path.as_str(), "customValidation", "a list of messages")
                })?;
                context.report(&frame.path, message);
            }
        }
        _ => {
            return Err(ConfigurationDefect::invalid_constraint(
                frame.path.as_str(),
                "customValidation",
                "a message or a list of messages",
            )
            .into())
        }
    }
    Ok(())
}

fn is_updated_illegally(
    ty: Option<PropertyType>,
    constraints: &Constraints<'_, '_>,
    frame: &ItemFrame<'_>,
) -> Result<bool> {
    let (value, old_value) = (frame.value, frame.old_value);
    let old_is_set = old_value.is_some_and(|v| !v.is_null());

    Ok((constraints.flag("immutable")? && !loosely_equal(ty, value, old_value))
        || (constraints.flag("immutableStrict")? && !strictly_equal(value, old_value))
        || (old_is_set && constraints.flag("immutableWhenSet")? && !loosely_equal(ty, value, old_value))
        || (old_value.is_some() && constraints.flag("immutableWhenSetStrict")? && !strictly_equal(value, old_value)))
}

fn validate_equality(
    ty: Option<PropertyType>,
    constraints: &Constraints<'_, '_>,
    frame: &ItemFrame<'_>,
    context: &mut ValidationContext<'_>,
) -> Result<()> {
    for (name, strict) in [("mustEqual", false), ("mustEqualStrict", true)] {
        let Some(expected) = constraints.get_nullable(name)? else {
            continue;
        };
        let shown = expected
            .to_json()
            .ok_or_else(|| ConfigurationDefect::invalid_constraint(frame.path.as_str(), name, "a JSON value"))?;
        let equal = match (ty, &*expected) {
            // Date/time literals compare as instants or days, like range bounds
            (Some(ty @ (PropertyType::Date | PropertyType::DateTime)), SchemaValue::DateTime(_)) => {
                let actual = frame.value.and_then(|v| comparable(ty, v));
                actual.is_some() && actual == comparable_bound(ty, &expected)
            }
            _ if strict => strictly_equal(frame.value, Some(&shown)),
            _ => loosely_equal(ty, frame.value, Some(&shown)),
        };
        if !equal {
            context.report(
                &frame.path,
                format!("value of item \"{}\" must equal {}", frame.path, shown),
            );
        }
    }
    Ok(())
}

// =============================================================================
// Type handlers
// =============================================================================

fn validate_type<'n, 's, 'd, F>(
    ty: PropertyType,
    value: &'d Value,
    constraints: &Constraints<'n, '_>,
    frame: &ItemFrame<'d>,
    stack: &mut Stack<'s, 'd>,
    context: &mut ValidationContext<'d>,
    detach: F,
) -> Result<()>
where
    F: Fn(Cow<'n, SchemaValue>) -> Cow<'s, SchemaValue>,
{
    let path = frame.path.as_str();

    if ty == PropertyType::AttachmentReference {
        return validate_attachment_reference(value, constraints, frame, context);
    }
    if ty == PropertyType::Enum {
        return validate_enum(value, constraints, frame, context);
    }
    if !ty.accepts(value) {
        context.report(&frame.path, format!("property \"{}\" {}", path, ty.expectation()));
        return Ok(());
    }

    match ty {
        PropertyType::String => {
            let text = value.as_str().unwrap_or_default();
            if let Some(pattern) = constraints.regex("regexPattern")? {
                if !pattern.is_match(text) {
                    context.report(&frame.path, format!("property \"{}\" must conform to expected format", path));
                }
            }
        }
        PropertyType::Object => {
            if let Some(nested) = constraints.object("propertyValidators")? {
                let allow_unknown = constraints.flag("allowUnknownProperties")?;
                schedule_properties(detach(nested), allow_unknown, false, frame, stack);
            }
        }
        PropertyType::Array => {
            if let Some(elements) = constraints.object("arrayElementsValidator")? {
                let count = value.as_array().map_or(0, Vec::len);
                let children = (0..count).map(|index| frame.element(index)).collect();
                schedule_children(detach(elements), children, stack);
            }
        }
        PropertyType::Hashtable => validate_hashtable(value, constraints, frame, stack, context, detach)?,
        _ => {}
    }
    Ok(())
}

fn validate_enum(
    value: &Value,
    constraints: &Constraints<'_, '_>,
    frame: &ItemFrame<'_>,
    context: &mut ValidationContext<'_>,
) -> Result<()> {
    let path = frame.path.as_str();
    if !PropertyType::Enum.accepts(value) {
        context.report(&frame.path, format!("enum property \"{}\" must be a string or integer", path));
        return Ok(());
    }

    let Some(predefined) = constraints.get("predefinedValues")? else {
        return Ok(());
    };
    let options = predefined
        .as_array()
        .ok_or_else(|| ConfigurationDefect::invalid_constraint(path, "predefinedValues", "a list"))?;
    let matches = options.iter().any(|option| match (option.as_str(), value.as_str()) {
        (Some(a), Some(b)) => a == b,
        (None, None) => is_integer(value) && option.as_f64() == value.as_f64(),
        _ => false,
    });
    if !matches {
        context.report(
            &frame.path,
            format!(
                "value of item \"{}\" must be one of the predefined values: {}",
                path, predefined
            ),
        );
    }
    Ok(())
}

fn validate_hashtable<'n, 's, 'd, F>(
    value: &'d Value,
    constraints: &Constraints<'n, '_>,
    frame: &ItemFrame<'d>,
    stack: &mut Stack<'s, 'd>,
    context: &mut ValidationContext<'d>,
    detach: F,
) -> Result<()>
where
    F: Fn(Cow<'n, SchemaValue>) -> Cow<'s, SchemaValue>,
{
    let Some(entries) = value.as_object() else {
        return Ok(());
    };
    let path = frame.path.as_str();

    for facet in [CountFacet::MinSize, CountFacet::MaxSize] {
        if let Some(message) = facet.check(entries.len(), constraints, path)? {
            context.report(&frame.path, message);
        }
    }

    if let Some(keys) = constraints.object("hashtableKeysValidator")? {
        if let Some(keys) = keys.as_object() {
            let keys = Constraints::new(keys, ConstraintScope::Property, *constraints.context(), path);
            let must_not_be_empty = keys.flag("mustNotBeEmpty")?;
            let pattern = keys.regex("regexPattern")?;
            for key in entries.keys() {
                if must_not_be_empty && key.is_empty() {
                    context.report(&frame.path, format!("empty hashtable key in property \"{}\" is not allowed", path));
                }
                if let Some(pattern) = &pattern {
                    if !pattern.is_match(key) {
                        context.report(
                            &frame.path.entry(key),
                            format!("hashtable key \"{}\" does not conform to expected format", frame.path.entry(key)),
                        );
                    }
                }
            }
        }
    }

    if let Some(values) = constraints.object("hashtableValuesValidator")? {
        let children = entries.keys().map(|key| frame.entry(key)).collect();
        schedule_children(detach(values), children, stack);
    }
    Ok(())
}
