//! Content entry cache
//!
//! Caches GetContentEntry answers. A ModifyIndex command evicts every
//! identifier it touches, whether or not the modification succeeds.
//!
//! Every modification bumps a generation counter. A lookup that missed only
//! caches its answer when no modification finished while it was reading.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::content::command::{CommandOutput, GetContentEntryCommand, ModifyIndexCommand};
use crate::content::context::InvocationContext;
use crate::content::entry::ContentEntry;
use crate::content::interceptor::{Interceptor, Next};
use crate::search::{SearchError, SearchResult};

pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

pub struct CachingInterceptor {
    capacity: usize,
    entries: Mutex<HashMap<String, Option<ContentEntry>>>,
    generation: AtomicU64,
}

impl CachingInterceptor {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> SearchResult<MutexGuard<'_, HashMap<String, Option<ContentEntry>>>> {
        self.entries
            .lock()
            .map_err(|_| SearchError::execution("content cache lock poisoned"))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached entry
    pub fn clear(&self) -> SearchResult<()> {
        self.lock()?.clear();
        Ok(())
    }
}

impl Default for CachingInterceptor {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl Interceptor for CachingInterceptor {
    fn name(&self) -> &'static str {
        "caching"
    }

    fn visit_get_content_entry(
        &self,
        ctx: &InvocationContext,
        command: &GetContentEntryCommand,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        let generation = {
            let cache = self.lock()?;
            if let Some(cached) = cache.get(&command.identifier) {
                return Ok(CommandOutput::Entry(cached.clone()));
            }
            self.generation.load(Ordering::SeqCst)
        };

        let entry = next.proceed(ctx)?.into_entry()?;

        let mut cache = self.lock()?;
        if self.generation.load(Ordering::SeqCst) != generation {
            return Ok(CommandOutput::Entry(entry));
        }
        if cache.len() >= self.capacity {
            cache.clear();
        }
        cache.insert(command.identifier.clone(), entry.clone());
        Ok(CommandOutput::Entry(entry))
    }

    fn visit_modify_index(
        &self,
        ctx: &InvocationContext,
        command: &ModifyIndexCommand,
        next: Next<'_>,
    ) -> SearchResult<CommandOutput> {
        let result = next.proceed(ctx);

        // Best effort; the modification's own result is returned as is.
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut cache) = self.entries.lock() {
            for entry in &command.added {
                cache.remove(&entry.identifier);
            }
            for identifier in &command.removed {
                cache.remove(identifier);
            }
        }
        result
    }
}
