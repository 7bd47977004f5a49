//! Variant selection
//!
//! Picks the variant to try from a freshly fetched list, honoring the
//! filter terms on the first hit and the positional cursor afterwards.

use crate::types::{AgentState, SelectionPolicy, Variant};
use thiserror::Error;

/// Result of a successful selection
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    /// Position of `variant` in the fetched list
    pub index: usize,
    /// Chosen variant
    pub variant: Variant,
    /// Units to request
    pub quantity: u32,
}

/// Why no variant could be chosen
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum SelectError {
    /// The fetched list was empty
    #[error("variant list is empty")]
    Empty,
    /// The cursor points past the end of the fetched list
    #[error("variant index {index} out of range for {len} variant(s)")]
    OutOfRange {
        /// Cursor position
        index: usize,
        /// Length of the fetched list
        len: usize,
    },
}

/// Chooses the next variant to reserve
#[derive(Clone, Copy, Debug, Default)]
pub struct VariantSelector;

impl VariantSelector {
    /// Select a variant from `variants`
    ///
    /// While the policy is [`SelectionPolicy::FilterMatch`], the first variant
    /// (in list order) matching any term wins wherever the cursor is. A hit
    /// clears the terms for good and moves the cursor up to the matched
    /// position, never down and never past `max_index`. Without a hit the
    /// terms stay active and the variant at the cursor is used.
    ///
    /// # Errors
    ///
    /// - [`SelectError::Empty`] if `variants` is empty
    /// - [`SelectError::OutOfRange`] if the cursor is past the end of the list
    pub fn select(variants: &[Variant], agent: &mut AgentState) -> Result<Selection, SelectError> {
        if variants.is_empty() {
            return Err(SelectError::Empty);
        }

        let matched = match &agent.selection_policy {
            SelectionPolicy::FilterMatch(terms) => {
                variants.iter().position(|v| v.matches_any(terms))
            },
            SelectionPolicy::PositionalIndex => None,
        };

        let index = match matched {
            Some(index) => {
                tracing::debug!(index, "Filter matched, switching to positional selection");
                agent.selection_policy = SelectionPolicy::PositionalIndex;
                let anchor = agent.max_index.map_or(index, |max| index.min(max));
                agent.current_index = agent.current_index.max(anchor);
                index
            },
            None => agent.current_index,
        };

        let variant = variants.get(index).ok_or(SelectError::OutOfRange {
            index,
            len: variants.len(),
        })?;

        tracing::info!("Found item '{}'", variant.name);

        Ok(Selection {
            index,
            quantity: agent.quantity_policy.quantity_for(variant),
            variant: variant.clone(),
        })
    }
}
