use crate::models::BlockType;
use thiserror::Error;

/// Lookup and shape failures of store mutations.
///
/// Invariant refusals (last block, populated category, last kanban column) are
/// not errors; they come back as the structured deletion results in `state`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("page not found: {0}")]
    PageNotFound(String),

    #[error("block not found: {0}")]
    BlockNotFound(String),

    #[error("category not found: {0}")]
    CategoryNotFound(String),

    #[error("kanban column not found: {0}")]
    ColumnNotFound(String),

    #[error("kanban card not found: {0}")]
    CardNotFound(String),

    #[error("page template not found: {0}")]
    TemplateNotFound(String),

    #[error("layout slot not found: {0}")]
    SlotNotFound(String),

    #[error("index {index} out of range for sequence of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("block {block_id} is {actual}, expected {expected}")]
    WrongBlockType {
        block_id: String,
        expected: BlockType,
        actual: BlockType,
    },

    #[error("a drag of {0} is already in progress")]
    DragInProgress(String),

    #[error("store has been disposed")]
    Disposed,
}

pub type StoreResult<T> = Result<T, StoreError>;
