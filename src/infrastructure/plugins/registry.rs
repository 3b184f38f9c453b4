//! Command registry - Maps lower-cased aliases to command descriptors
//!
//! The table behind the lock is never edited in place. Writers build a new
//! table and swap the `Arc`, so a lookup sees either the old or the new set
//! of commands, never a half-loaded one.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use crate::domain::entities::CommandDescriptor;

/// Alias to descriptor mapping
pub type CommandTable = HashMap<String, Arc<CommandDescriptor>>;

/// Insert a descriptor under each of its aliases, last writer wins
pub fn insert_descriptor(table: &mut CommandTable, descriptor: Arc<CommandDescriptor>) {
    for alias in &descriptor.aliases {
        table.insert(alias.to_lowercase(), Arc::clone(&descriptor));
    }
}

/// Registry for looking up commands by alias
pub struct CommandRegistry {
    commands: RwLock<Arc<CommandTable>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: RwLock::new(Arc::new(CommandTable::new())),
        }
    }

    /// Register a descriptor under every alias
    pub fn register(&self, descriptor: impl Into<Arc<CommandDescriptor>>) {
        let descriptor = descriptor.into();
        let mut commands = self.commands.write().unwrap_or_else(PoisonError::into_inner);
        let mut table = CommandTable::clone(&**commands);
        insert_descriptor(&mut table, descriptor);
        *commands = Arc::new(table);
    }

    /// Case-insensitive lookup
    pub fn lookup(&self, alias: &str) -> Option<Arc<CommandDescriptor>> {
        self.snapshot().get(&alias.to_lowercase()).cloned()
    }

    /// Swap in a fully built table, returning its alias count
    pub fn replace(&self, table: CommandTable) -> usize {
        let size = table.len();
        *self.commands.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(table);
        size
    }

    pub fn clear(&self) {
        self.replace(CommandTable::new());
    }

    /// Number of alias entries, not unique commands
    pub fn size(&self) -> usize {
        self.snapshot().len()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    /// Current table; stays valid while a reload swaps in a new one
    pub fn snapshot(&self) -> Arc<CommandTable> {
        Arc::clone(&*self.commands.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Unique descriptors sorted by canonical name
    pub fn descriptors(&self) -> Vec<Arc<CommandDescriptor>> {
        let table = self.snapshot();
        let mut unique: Vec<Arc<CommandDescriptor>> = Vec::new();
        for descriptor in table.values() {
            if !unique.iter().any(|seen| Arc::ptr_eq(seen, descriptor)) {
                unique.push(Arc::clone(descriptor));
            }
        }
        unique.sort_by(|a, b| a.name().cmp(b.name()));
        unique
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}
