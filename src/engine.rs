//! Named-template store
//!
//! Templates load from a root directory, compile on first access and stay
//! cached. Direct lookups re-check the backing file's modification time:
//! a changed file is recompiled and swapped in wholesale, a vanished or
//! unreadable file falls back to the cached copy. Only the very first
//! load of a name can surface an I/O error; after that the cache always
//! has something to serve.

use crate::error::TemplateLoadError;
use crate::eval::Scope;
use crate::functions::FunctionRegistry;
use crate::render::Template;
use crate::safe::SafeString;
use crate::value::Value;
use camino::{Utf8Path, Utf8PathBuf};
use miette::Result;
use std::collections::HashMap;
use std::fs;
use std::sync::{Arc, RwLock};
use std::time::SystemTime;
use tracing::{debug, warn};

/// How a cache entry relates to its backing file right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Backing file unchanged (or entry is in-memory)
    Fresh,
    /// Backing file has a different mtime
    Stale,
    /// Backing file cannot be statted
    Unreadable,
}

#[derive(Debug, Clone)]
struct CacheEntry {
    template: Arc<Template>,
    /// mtime of the backing file; `None` for in-memory entries
    mtime: Option<SystemTime>,
}

/// Template store and rendering entry point
#[derive(Debug)]
pub struct Engine {
    root: Utf8PathBuf,
    cache: RwLock<HashMap<String, CacheEntry>>,
    functions: FunctionRegistry,
    no_parse: bool,
}

impl Engine {
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: RwLock::new(HashMap::new()),
            functions: FunctionRegistry::with_builtins(),
            no_parse: false,
        }
    }

    /// Create an engine with the given templates preloaded from disk
    pub fn with_templates<I, S>(root: impl Into<Utf8PathBuf>, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let engine = Self::new(root);
        for name in names {
            engine.add_template(name.as_ref())?;
        }
        Ok(engine)
    }

    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.read_cache().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_cache().is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.read_cache().contains_key(name)
    }

    /// Register a tag function, replacing any previous one of that name
    pub fn register_function<F>(&mut self, name: impl Into<String>, f: F)
    where
        F: Fn(Value, &[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        self.functions.register(name, f);
    }

    /// Debugging aid: emit resolved values verbatim, skipping function
    /// chains and output escaping
    pub fn set_no_parse(&mut self, no_parse: bool) {
        self.no_parse = no_parse;
    }

    /// Compile `root/name` and install it, replacing any cached entry.
    pub fn add_template(&self, name: &str) -> Result<()> {
        let entry = self.load_entry(name)?;
        self.write_cache().insert(name.to_string(), entry);
        Ok(())
    }

    /// Install an in-memory template under a name. Such entries have no
    /// backing file and never go stale.
    pub fn insert(&self, name: impl Into<String>, template: Template) {
        let entry = CacheEntry {
            template: Arc::new(template),
            mtime: None,
        };
        self.write_cache().insert(name.into(), entry);
    }

    /// Report how a cached entry relates to its backing file, without
    /// reloading anything. `None` if the name is not cached.
    pub fn freshness(&self, name: &str) -> Option<Freshness> {
        let entry = self.read_cache().get(name).cloned()?;
        Some(self.probe_freshness(name, &entry))
    }

    /// Fetch a template, loading it on first access and recompiling when
    /// the backing file changed. Reload failures are logged and the
    /// cached copy served; only the initial load can fail.
    pub fn get(&self, name: &str) -> Result<Arc<Template>> {
        let cached = self.read_cache().get(name).cloned();
        let Some(entry) = cached else {
            let entry = self.load_entry(name)?;
            let template = entry.template.clone();
            self.write_cache().insert(name.to_string(), entry);
            return Ok(template);
        };
        match self.probe_freshness(name, &entry) {
            Freshness::Fresh => Ok(entry.template),
            Freshness::Stale => match self.load_entry(name) {
                Ok(new_entry) => {
                    debug!(template = name, "recompiled stale template");
                    let template = new_entry.template.clone();
                    self.write_cache().insert(name.to_string(), new_entry);
                    Ok(template)
                }
                Err(err) => {
                    warn!(template = name, error = %err, "reload failed, serving cached template");
                    Ok(entry.template)
                }
            },
            Freshness::Unreadable => {
                warn!(template = name, "backing file unreadable, serving cached template");
                Ok(entry.template)
            }
        }
    }

    /// Render the stored template `name` against `scope`.
    pub fn parse(&self, name: &str, scope: &Scope) -> Result<SafeString> {
        let template = self.get(name)?;
        template.render_impl(scope, &self.functions, Some(self), self.no_parse)
    }

    /// Compile and render a one-off template with this engine's
    /// functions and cache (so `{{ inline }}` works).
    pub fn parse_string(&self, raw: &str, scope: &Scope) -> Result<SafeString> {
        let template = Template::new(raw)?;
        template.render_impl(scope, &self.functions, Some(self), self.no_parse)
    }

    /// Plain cache read used by `{{ inline }}`: loads on first use but
    /// never re-checks freshness.
    pub(crate) fn cached(&self, name: &str) -> Result<Arc<Template>> {
        if let Some(entry) = self.read_cache().get(name) {
            return Ok(entry.template.clone());
        }
        let entry = self.load_entry(name)?;
        let template = entry.template.clone();
        self.write_cache().insert(name.to_string(), entry);
        Ok(template)
    }

    fn probe_freshness(&self, name: &str, entry: &CacheEntry) -> Freshness {
        let Some(cached) = entry.mtime else {
            return Freshness::Fresh;
        };
        match self.probe_mtime(name) {
            Ok(mtime) if mtime == cached => Freshness::Fresh,
            Ok(_) => Freshness::Stale,
            Err(_) => Freshness::Unreadable,
        }
    }

    fn probe_mtime(&self, name: &str) -> std::io::Result<SystemTime> {
        fs::metadata(self.path_for(name))?.modified()
    }

    fn load_entry(&self, name: &str) -> Result<CacheEntry> {
        let path = self.path_for(name);
        let mtime = self.probe_mtime(name).ok();
        let raw = fs::read_to_string(&path).map_err(|source| TemplateLoadError {
            name: name.to_string(),
            source,
        })?;
        let template = Template::parse(name, raw)?;
        Ok(CacheEntry {
            template: Arc::new(template),
            mtime,
        })
    }

    fn path_for(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    fn read_cache(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        self.cache.read().expect("template cache lock poisoned")
    }

    fn write_cache(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        self.cache.write().expect("template cache lock poisoned")
    }
}
