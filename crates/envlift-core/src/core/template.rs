// crates/envlift-core/src/core/template.rs
// ============================================================================
// Module: envlift Template Inspector
// Description: Position-aware inspection of environment templates.
// Purpose: Extract the template version and locate nodes for textual patching.
// Dependencies: yaml-rust2, thiserror
// ============================================================================

//! ## Overview
//! Templates are parsed into a lightweight node tree that keeps the source
//! position of every node. The tree is read-only: callers that need to change
//! a template splice the original text at a discovered position instead of
//! re-serializing the document, so formatting, comments, tags, and key order
//! of every other field survive untouched.
//!
//! ## Invariants
//! - Positions are 1-indexed (line and column).
//! - Only the first document of a multi-document stream is inspected.
//! - An absent or malformed version is reported as `None`, never as an error.
//! - A block sequence anchor points at its first `-` indicator, including
//!   indentless sequences whose parser marker lands on the first item's key.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;
use yaml_rust2::parser::Event;
use yaml_rust2::parser::MarkedEventReceiver;
use yaml_rust2::parser::Parser;
use yaml_rust2::scanner::Marker;

use crate::core::version::TemplateVersion;

// ============================================================================
// SECTION: Schema Paths
// ============================================================================

/// Path to the template's declared version.
const VERSION_PATH: &[&str] = &["Metadata", "Version"];
/// Path to the manager role's policy list.
const MANAGER_ROLE_POLICIES_PATH: &[&str] =
    &["Resources", "EnvironmentManagerRole", "Properties", "Policies"];
/// Path from a policy entry to its statement list.
const POLICY_STATEMENT_PATH: &[&str] = &["PolicyDocument", "Statement"];
/// Top-level key holding template parameters.
const PARAMETERS_KEY: &str = "Parameters";

// ============================================================================
// SECTION: Types
// ============================================================================

/// 1-indexed source position of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourcePosition {
    /// Line number, starting at 1.
    pub line: usize,
    /// Column number, starting at 1.
    pub column: usize,
}

impl SourcePosition {
    /// Converts a parser marker (1-indexed line, 0-indexed column).
    fn from_marker(marker: Marker) -> Self {
        Self {
            line: marker.line(),
            column: marker.col() + 1,
        }
    }
}

/// Template inspection errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
    /// The template is not a well-formed structured document.
    #[error("parse environment template at line {line}, column {column}: {message}")]
    Parse {
        /// Line of the parse failure.
        line: usize,
        /// Column of the parse failure.
        column: usize,
        /// Parser message.
        message: String,
    },
    /// The expected node path does not exist in the template.
    #[error("unable to find {path} in the environment template")]
    AnchorNotFound {
        /// Dotted path that could not be resolved.
        path: String,
    },
}

/// Parsed template with source positions.
#[derive(Debug, Clone)]
pub struct TemplateDocument {
    /// Root node of the first document, if the stream is not empty.
    root: Option<MarkedNode>,
    /// Source text the positions refer to.
    source: String,
}

/// Node value variants.
#[derive(Debug, Clone)]
enum MarkedValue {
    /// Scalar text.
    Scalar(String),
    /// Sequence items.
    Sequence(Vec<MarkedNode>),
    /// Mapping entries in source order.
    Mapping(Vec<(MarkedNode, MarkedNode)>),
    /// Alias reference (not resolved).
    Alias,
}

/// Node with its source position.
#[derive(Debug, Clone)]
struct MarkedNode {
    /// Node value.
    value: MarkedValue,
    /// Position where the node starts.
    position: SourcePosition,
}

impl MarkedNode {
    /// Returns the value stored under a scalar key of a mapping node.
    fn get(&self, key: &str) -> Option<&Self> {
        let MarkedValue::Mapping(entries) = &self.value else {
            return None;
        };
        entries.iter().find(|(k, _)| k.as_scalar() == Some(key)).map(|(_, value)| value)
    }

    /// Follows a path of mapping keys.
    fn lookup(&self, path: &[&str]) -> Option<&Self> {
        path.iter().try_fold(self, |node, key| node.get(key))
    }

    /// Returns the first item of a sequence node.
    fn first_item(&self) -> Option<&Self> {
        match &self.value {
            MarkedValue::Sequence(items) => items.first(),
            _ => None,
        }
    }

    /// Returns scalar text.
    fn as_scalar(&self) -> Option<&str> {
        match &self.value {
            MarkedValue::Scalar(value) => Some(value),
            _ => None,
        }
    }
}

// ============================================================================
// SECTION: Tree Builder
// ============================================================================

/// Open container while building the tree.
enum Frame {
    /// Sequence under construction.
    Sequence(Vec<MarkedNode>, SourcePosition),
    /// Mapping under construction; keys and values alternate.
    Mapping(Vec<MarkedNode>, SourcePosition),
}

/// Event receiver assembling a [`MarkedNode`] tree.
#[derive(Default)]
struct TreeBuilder {
    /// Open containers, innermost last.
    stack: Vec<Frame>,
    /// Completed root node.
    root: Option<MarkedNode>,
}

impl TreeBuilder {
    /// Attaches a completed node to its parent container or the root.
    fn attach(&mut self, node: MarkedNode) {
        match self.stack.last_mut() {
            Some(Frame::Sequence(items, _) | Frame::Mapping(items, _)) => items.push(node),
            None => {
                if self.root.is_none() {
                    self.root = Some(node);
                }
            }
        }
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, event: Event, marker: Marker) {
        let position = SourcePosition::from_marker(marker);
        match event {
            Event::Scalar(value, ..) => self.attach(MarkedNode {
                value: MarkedValue::Scalar(value),
                position,
            }),
            Event::Alias(..) => self.attach(MarkedNode {
                value: MarkedValue::Alias,
                position,
            }),
            Event::SequenceStart(..) => self.stack.push(Frame::Sequence(Vec::new(), position)),
            Event::MappingStart(..) => self.stack.push(Frame::Mapping(Vec::new(), position)),
            Event::SequenceEnd | Event::MappingEnd => {
                if let Some(frame) = self.stack.pop() {
                    self.attach(close_frame(frame));
                }
            }
            _ => {}
        }
    }
}

/// Converts a finished frame into a node.
fn close_frame(frame: Frame) -> MarkedNode {
    match frame {
        Frame::Sequence(items, position) => MarkedNode {
            value: MarkedValue::Sequence(items),
            position,
        },
        Frame::Mapping(items, position) => {
            let mut entries = Vec::with_capacity(items.len() / 2);
            let mut iter = items.into_iter();
            while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
                entries.push((key, value));
            }
            MarkedNode {
                value: MarkedValue::Mapping(entries),
                position,
            }
        }
    }
}

// ============================================================================
// SECTION: Document API
// ============================================================================

impl TemplateDocument {
    /// Parses a template body.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::Parse`] when the body is not well-formed.
    pub fn parse(body: &str) -> Result<Self, TemplateError> {
        let mut builder = TreeBuilder::default();
        let mut parser = Parser::new(body.chars());
        parser.load(&mut builder, false).map_err(|err| {
            let marker = err.marker();
            TemplateError::Parse {
                line: marker.line(),
                column: marker.col() + 1,
                message: err.info().to_string(),
            }
        })?;
        Ok(Self {
            root: builder.root,
            source: body.to_string(),
        })
    }

    /// Returns the declared template version, or `None` when it is absent or
    /// not a valid semantic version.
    #[must_use]
    pub fn version(&self) -> Option<TemplateVersion> {
        let raw = self.root.as_ref()?.lookup(VERSION_PATH)?.as_scalar()?;
        TemplateVersion::parse(raw).ok()
    }

    /// Locates the start of the manager role's first policy statement list.
    ///
    /// # Errors
    ///
    /// Returns [`TemplateError::AnchorNotFound`] when the role, its policies,
    /// or the statement list is missing.
    pub fn policy_statement_anchor(&self) -> Result<SourcePosition, TemplateError> {
        let not_found = |path: &[&str]| TemplateError::AnchorNotFound {
            path: path.join("."),
        };
        let policies = self
            .root
            .as_ref()
            .and_then(|root| root.lookup(MANAGER_ROLE_POLICIES_PATH))
            .ok_or_else(|| not_found(MANAGER_ROLE_POLICIES_PATH))?;
        let statements = policies
            .first_item()
            .and_then(|policy| policy.lookup(POLICY_STATEMENT_PATH))
            .ok_or_else(|| {
                let mut path = MANAGER_ROLE_POLICIES_PATH.to_vec();
                path.push("0");
                path.extend_from_slice(POLICY_STATEMENT_PATH);
                not_found(&path)
            })?;
        Ok(self.sequence_indicator(statements.position))
    }

    /// Moves a block sequence position back onto its `-` indicator.
    fn sequence_indicator(&self, position: SourcePosition) -> SourcePosition {
        let Some(line) = self.source.lines().nth(position.line.saturating_sub(1)) else {
            return position;
        };
        let prefix: String = line.chars().take(position.column.saturating_sub(1)).collect();
        let trimmed = prefix.trim_end();
        match trimmed.strip_suffix('-') {
            Some(indent) if indent.chars().all(char::is_whitespace) => SourcePosition {
                line: position.line,
                column: trimmed.chars().count(),
            },
            _ => position,
        }
    }

    /// Returns the names of the template's top-level parameters in source order.
    #[must_use]
    pub fn declared_parameters(&self) -> Vec<String> {
        let Some(MarkedValue::Mapping(entries)) =
            self.root.as_ref().and_then(|root| root.get(PARAMETERS_KEY)).map(|node| &node.value)
        else {
            return Vec::new();
        };
        entries.iter().filter_map(|(key, _)| key.as_scalar().map(str::to_string)).collect()
    }
}

// ============================================================================
// SECTION: Convenience Functions
// ============================================================================

/// Extracts the declared version of a template body.
///
/// # Errors
///
/// Returns [`TemplateError::Parse`] when the body is not well-formed.
pub fn extract_version(body: &str) -> Result<Option<TemplateVersion>, TemplateError> {
    Ok(TemplateDocument::parse(body)?.version())
}

/// Locates the manager role's policy statement list in a template body.
///
/// # Errors
///
/// Returns [`TemplateError`] when the body cannot be parsed or the statement
/// list does not exist.
pub fn locate_policy_statement_anchor(body: &str) -> Result<SourcePosition, TemplateError> {
    TemplateDocument::parse(body)?.policy_statement_anchor()
}
