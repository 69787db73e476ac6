//! Editing operations over a schema array.
//!
//! [`SchemaBuilder`] owns the working copy of a form or task-content schema
//! and keeps the block invariants (dense order, option-list floor) true after
//! every operation. Reordering is a plain splice-and-reindex behind a stable
//! interface, independent of whatever drag-and-drop surface drives it.

use uuid::Uuid;

use super::{BlockKind, BlockPayload, ContentBlock, SchemaError, validate_schema};

/// Partial update applied to an existing block. Fields that don't apply to
/// the block's type are ignored, matching merge semantics of the persisted
/// JSON documents.
#[derive(Clone, Debug, Default)]
pub struct BlockPatch {
    pub label: Option<String>,
    pub required: Option<bool>,
    pub content: Option<String>,
    pub url: Option<String>,
}

/// Stateful editor for a schema array, tracking the currently selected block.
#[derive(Clone, Debug, Default)]
pub struct SchemaBuilder {
    blocks: Vec<ContentBlock>,
    selected: Option<String>,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume editing an existing schema. Order is re-densified up front so
    /// documents saved by older builders start from a clean sequence.
    pub fn from_blocks(mut blocks: Vec<ContentBlock>) -> Self {
        super::normalize_order(&mut blocks);
        Self {
            blocks,
            selected: None,
        }
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }

    /// The currently selected block, if any.
    pub fn selected(&self) -> Option<&ContentBlock> {
        let id = self.selected.as_deref()?;
        self.blocks.iter().find(|b| b.id == id)
    }

    pub fn select(&mut self, id: &str) -> Result<(), SchemaError> {
        self.index_of(id)?;
        self.selected = Some(id.to_string());
        Ok(())
    }

    /// Append a new block of the given kind and select it. The id is
    /// timestamp-derived (UUIDv7) and stable for the block's lifetime.
    pub fn add_block(&mut self, kind: BlockKind) -> &ContentBlock {
        let block = ContentBlock {
            id: Uuid::now_v7().to_string(),
            label: kind.default_label().to_string(),
            required: false,
            order: self.blocks.len() as u32,
            payload: BlockPayload::new(kind),
        };
        self.selected = Some(block.id.clone());
        self.blocks.push(block);
        self.blocks.last().expect("just pushed")
    }

    /// Merge the patch into the block. The selection is by id, so a selected
    /// block reflects the update with no extra bookkeeping.
    pub fn update_block(&mut self, id: &str, patch: BlockPatch) -> Result<(), SchemaError> {
        let idx = self.index_of(id)?;
        let block = &mut self.blocks[idx];

        if let Some(label) = patch.label {
            block.label = label;
        }
        if let Some(required) = patch.required {
            block.required = required;
        }
        if let Some(new_content) = patch.content {
            match &mut block.payload {
                BlockPayload::Text { content }
                | BlockPayload::LongText { content }
                | BlockPayload::Code { content } => *content = new_content,
                _ => {}
            }
        }
        if let Some(new_url) = patch.url {
            match &mut block.payload {
                BlockPayload::File { url }
                | BlockPayload::Video { url }
                | BlockPayload::Image { url } => *url = new_url,
                _ => {}
            }
        }
        Ok(())
    }

    /// Delete a block, clearing the selection if it pointed at it.
    pub fn remove_block(&mut self, id: &str) -> Result<(), SchemaError> {
        let idx = self.index_of(id)?;
        self.blocks.remove(idx);
        if self.selected.as_deref() == Some(id) {
            self.selected = None;
        }
        self.renumber();
        Ok(())
    }

    /// Move the block at `from` to `to` and recompute order for the whole
    /// array in a single stable pass.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<(), SchemaError> {
        if from >= self.blocks.len() {
            return Err(SchemaError::IndexOutOfRange(from));
        }
        if to >= self.blocks.len() {
            return Err(SchemaError::IndexOutOfRange(to));
        }
        let block = self.blocks.remove(from);
        self.blocks.insert(to, block);
        self.renumber();
        Ok(())
    }

    pub fn add_option(&mut self, id: &str) -> Result<(), SchemaError> {
        let idx = self.index_of(id)?;
        let block = &mut self.blocks[idx];
        let options = block
            .payload
            .options_mut()
            .ok_or_else(|| SchemaError::NoOptions(id.to_string()))?;
        options.push(format!("Option {}", options.len() + 1));
        Ok(())
    }

    pub fn update_option(&mut self, id: &str, index: usize, value: String) -> Result<(), SchemaError> {
        let idx = self.index_of(id)?;
        let block = &mut self.blocks[idx];
        let options = block
            .payload
            .options_mut()
            .ok_or_else(|| SchemaError::NoOptions(id.to_string()))?;
        let slot = options.get_mut(index).ok_or(SchemaError::OptionOutOfRange {
            id: id.to_string(),
            index,
        })?;
        *slot = value;
        Ok(())
    }

    /// Remove an option. A choice block always retains at least one option;
    /// removing the last one is rejected.
    pub fn remove_option(&mut self, id: &str, index: usize) -> Result<(), SchemaError> {
        let idx = self.index_of(id)?;
        let block = &mut self.blocks[idx];
        let options = block
            .payload
            .options_mut()
            .ok_or_else(|| SchemaError::NoOptions(id.to_string()))?;
        if index >= options.len() {
            return Err(SchemaError::OptionOutOfRange {
                id: id.to_string(),
                index,
            });
        }
        if options.len() == 1 {
            return Err(SchemaError::LastOption(id.to_string()));
        }
        options.remove(index);
        Ok(())
    }

    /// Validate and emit the finished schema array.
    pub fn finish(self) -> Result<Vec<ContentBlock>, SchemaError> {
        validate_schema(&self.blocks)?;
        Ok(self.blocks)
    }

    fn index_of(&self, id: &str) -> Result<usize, SchemaError> {
        self.blocks
            .iter()
            .position(|b| b.id == id)
            .ok_or_else(|| SchemaError::UnknownBlock(id.to_string()))
    }

    fn renumber(&mut self) {
        for (i, block) in self.blocks.iter_mut().enumerate() {
            block.order = i as u32;
        }
    }
}
