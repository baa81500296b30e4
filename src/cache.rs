use log::debug;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::options::{CompileOptions, ExpressionPolicy};
use crate::validate::{CompilerError, TemplateRoot};
use crate::CompileResult;

/// In-memory cache of compile results, keyed by a hash of the tree, the options
/// and the attribute policy's `cache_key`.
#[derive(Default)]
pub struct CompileCache {
    entries: Mutex<HashMap<String, CompileResult>>,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compute_hash(
        root: Option<&TemplateRoot>,
        options: &CompileOptions,
        policy: &dyn ExpressionPolicy,
    ) -> String {
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(&root).unwrap_or_default());
        hasher.update([0u8]);
        hasher.update(serde_json::to_vec(options).unwrap_or_default());
        hasher.update([0u8]);
        hasher.update(policy.cache_key().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn get(&self, hash: &str) -> Option<CompileResult> {
        let entries = self.entries.lock().ok()?;
        entries.get(hash).cloned()
    }

    pub fn set(&self, hash: String, result: CompileResult) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(hash, result);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    /// Returns the cached result or compiles and stores it. Errors are not cached.
    pub fn get_or_compile<F>(
        &self,
        root: Option<&TemplateRoot>,
        options: &CompileOptions,
        policy: &dyn ExpressionPolicy,
        compile: F,
    ) -> Result<CompileResult, CompilerError>
    where
        F: FnOnce() -> Result<CompileResult, CompilerError>,
    {
        let hash = Self::compute_hash(root, options, policy);
        if let Some(hit) = self.get(&hash) {
            debug!("cache hit for {} ({})", options.file_path, &hash[..12]);
            return Ok(hit);
        }

        debug!("cache miss for {} ({})", options.file_path, &hash[..12]);
        let result = compile()?;
        self.set(hash, result.clone());
        Ok(result)
    }
}
