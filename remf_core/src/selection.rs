//! Ordered items with a single cursor ("the selected item").
//!
//! Items live in a plain `Vec`; the cursor is an `Option<usize>` kept
//! consistent by every mutation. `None` means nothing is selected, which for
//! a step program means "complete".

use crate::error::{CoreError, Result};

/// Payload delivered to observers when the cursor moves.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionChanged<T> {
    pub old_index: Option<usize>,
    pub new_index: Option<usize>,
    pub old: Option<T>,
    pub new: Option<T>,
}

type Observer<T> = Box<dyn FnMut(&SelectionChanged<T>) + Send>;

pub struct Selection<T> {
    items: Vec<T>,
    cursor: Option<usize>,
    observers: Vec<Observer<T>>,
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            cursor: None,
            observers: Vec::new(),
        }
    }
}

impl<T: core::fmt::Debug> core::fmt::Debug for Selection<T> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Selection")
            .field("items", &self.items)
            .field("cursor", &self.cursor)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl<T: Clone> Selection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_items(items: Vec<T>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    /// Register an observer fired on every cursor change.
    pub fn subscribe(&mut self, f: impl FnMut(&SelectionChanged<T>) + Send + 'static) {
        self.observers.push(Box::new(f));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.cursor
    }

    pub fn selected(&self) -> Option<&T> {
        self.cursor.and_then(|i| self.items.get(i))
    }

    /// Move to the next item. Past the last item the cursor resets to `None`
    /// and `false` is returned.
    pub fn advance(&mut self) -> bool {
        if self.items.is_empty() {
            return false;
        }
        let next = self.cursor.map_or(0, |i| i + 1);
        if next >= self.items.len() {
            self.move_cursor(None);
            return false;
        }
        self.move_cursor(Some(next));
        true
    }

    /// Select by index. Returns `Ok(false)` when `index` is already selected.
    pub fn select(&mut self, index: usize) -> Result<bool> {
        if index >= self.items.len() {
            return Err(eyre::Report::new(CoreError::IndexOutOfRange {
                index,
                len: self.items.len(),
            }));
        }
        if self.cursor == Some(index) {
            return Ok(false);
        }
        self.move_cursor(Some(index));
        Ok(true)
    }

    /// Clear the selection.
    pub fn reset(&mut self) {
        self.move_cursor(None);
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    /// Insert at `index`; a cursor at or after `index` follows its item.
    pub fn insert(&mut self, index: usize, item: T) -> Result<()> {
        if index > self.items.len() {
            return Err(eyre::Report::new(CoreError::IndexOutOfRange {
                index,
                len: self.items.len(),
            }));
        }
        self.items.insert(index, item);
        if let Some(c) = self.cursor.filter(|&c| c >= index) {
            self.cursor = Some(c + 1);
        }
        Ok(())
    }

    /// Remove the item at `index`. The selected item cannot be removed.
    pub fn remove(&mut self, index: usize) -> Result<T> {
        self.check_index(index)?;
        if self.cursor == Some(index) {
            return Err(eyre::Report::new(CoreError::State(
                "cannot remove the selected item".into(),
            )));
        }
        let item = self.items.remove(index);
        if let Some(c) = self.cursor.filter(|&c| c > index) {
            self.cursor = Some(c - 1);
        }
        Ok(item)
    }

    /// Swap in a new item, returning the old one. The selected item cannot be
    /// replaced; edit it in place instead.
    pub fn replace(&mut self, index: usize, item: T) -> Result<T> {
        self.check_index(index)?;
        if self.cursor == Some(index) {
            return Err(eyre::Report::new(CoreError::State(
                "cannot replace the selected item".into(),
            )));
        }
        Ok(std::mem::replace(&mut self.items[index], item))
    }

    /// Edit an item in place. Allowed for the selected item too.
    pub fn edit<R>(&mut self, index: usize, f: impl FnOnce(&mut T) -> R) -> Result<R> {
        self.check_index(index)?;
        Ok(f(&mut self.items[index]))
    }

    /// Remove every item and clear the selection.
    pub fn clear(&mut self) {
        self.move_cursor(None);
        self.items.clear();
    }

    fn check_index(&self, index: usize) -> Result<()> {
        if index >= self.items.len() {
            return Err(eyre::Report::new(CoreError::IndexOutOfRange {
                index,
                len: self.items.len(),
            }));
        }
        Ok(())
    }

    fn move_cursor(&mut self, new_index: Option<usize>) {
        if self.cursor == new_index {
            return;
        }
        let change = SelectionChanged {
            old_index: self.cursor,
            new_index,
            old: self.selected().cloned(),
            new: new_index.and_then(|i| self.items.get(i).cloned()),
        };
        self.cursor = new_index;
        for obs in &mut self.observers {
            obs(&change);
        }
    }
}

impl<T: Clone + PartialEq> Selection<T> {
    /// Select the first item equal to `item`. `Ok(false)` when absent or
    /// already selected.
    pub fn select_item(&mut self, item: &T) -> Result<bool> {
        match self.items.iter().position(|x| x == item) {
            Some(i) => self.select(i),
            None => Ok(false),
        }
    }
}
