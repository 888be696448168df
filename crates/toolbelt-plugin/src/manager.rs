//! Plugin manager: the flat tool namespace over all loaded plugins.

use crate::discovery::{self, PLUGIN_SUFFIX};
use crate::error::{PluginError, Result};
use crate::process::PluginProcess;
use crate::protocol::PluginInfo;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use toolbelt_core::{PluginName, ToolName, ToolSchema};
use tracing::{debug, warn};

/// Derives the load name for a plugin binary: the file name minus the
/// plugin suffix.
pub(crate) fn plugin_name_for_path(path: &Path) -> String {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    file_name
        .strip_suffix(PLUGIN_SUFFIX)
        .map_or(file_name.clone(), ToString::to_string)
}

/// Host-side handle to one running plugin.
///
/// Owned exclusively by the [`PluginManager`]; destroyed on manager
/// shutdown or explicit unload. The tool list is frozen at load time.
#[derive(Debug)]
pub struct LoadedPlugin {
    /// Name derived from the binary's file stem.
    pub name: PluginName,
    /// Absolute path of the binary.
    pub path: PathBuf,
    pub(crate) process: PluginProcess,
    /// Descriptive information reported by the plugin at load.
    pub info: PluginInfo,
    /// Tools the plugin exposed at load time.
    pub tools: Vec<ToolSchema>,
}

/// Outcome of [`PluginManager::load_all_plugins`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Names of the plugins that loaded.
    pub loaded: Vec<PluginName>,
    /// Per-plugin failures, keyed by binary path.
    pub failures: Vec<(PathBuf, PluginError)>,
}

#[derive(Default)]
struct Inner {
    plugins: HashMap<String, Arc<LoadedPlugin>>,
    tools: HashMap<String, Arc<LoadedPlugin>>,
}

/// Owns the set of loaded plugins and dispatches tool calls by name.
///
/// Every public operation is safe to invoke concurrently. Read
/// operations (listing, lookup, tool calls) share the lock; loading,
/// unloading and shutdown take it exclusively.
///
/// # Examples
///
/// ```no_run
/// use toolbelt_plugin::PluginManager;
///
/// # async fn example() -> toolbelt_plugin::Result<()> {
/// let manager = PluginManager::new();
/// manager.load_all_plugins("./plugins").await?;
///
/// for tool in manager.list_tools().await {
///     println!("{}: {}", tool.name, tool.description);
/// }
///
/// let result = manager
///     .call_tool("current_time", serde_json::Map::new())
///     .await?;
/// assert!(!result.is_error);
///
/// manager.shutdown().await;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct PluginManager {
    inner: RwLock<Inner>,
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginManager").finish_non_exhaustive()
    }
}

impl PluginManager {
    /// Creates an empty manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans `root` for candidate plugin binaries without loading them.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Discovery`] when the traversal fails.
    pub fn scan_plugins(&self, root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        discovery::scan_plugins(root)
    }

    /// Spawns, handshakes and registers a single plugin.
    ///
    /// On any failure the child process is killed and no state is
    /// retained. A tool name that is already present is taken over by
    /// the newer registration; lookup stays deterministic because load
    /// order decides.
    ///
    /// # Errors
    ///
    /// Propagates handshake and transport failures from the load
    /// sequence.
    pub async fn load_plugin(&self, path: impl AsRef<Path>) -> Result<Arc<LoadedPlugin>> {
        let path = path.as_ref();
        let name = plugin_name_for_path(path);
        debug!(plugin = %name, path = %path.display(), "loading plugin");

        let process = PluginProcess::spawn(path).await?;

        let info = match process.plugin_info().await {
            Ok(info) => info,
            Err(err) => {
                process.shutdown().await;
                return Err(err);
            }
        };
        let tools = match process.tools().await {
            Ok(tools) => tools,
            Err(err) => {
                process.shutdown().await;
                return Err(err);
            }
        };

        debug!(plugin = %name, tool_count = tools.len(), "plugin loaded");

        let loaded = Arc::new(LoadedPlugin {
            name: PluginName::new(&name),
            path: path.to_path_buf(),
            process,
            info,
            tools,
        });
        self.install(Arc::clone(&loaded)).await;
        Ok(loaded)
    }

    /// Registers a loaded plugin in both indices, replacing and shutting
    /// down any previous plugin of the same name.
    pub(crate) async fn install(&self, loaded: Arc<LoadedPlugin>) {
        let mut inner = self.inner.write().await;

        if let Some(old) = inner.plugins.insert(loaded.name.to_string(), Arc::clone(&loaded)) {
            warn!(plugin = %loaded.name, "replacing already-loaded plugin");
            inner.tools.retain(|_, owner| !Arc::ptr_eq(owner, &old));
            old.process.shutdown().await;
        }

        for tool in &loaded.tools {
            let key = tool.name.to_string();
            if inner.tools.insert(key, Arc::clone(&loaded)).is_some() {
                warn!(
                    plugin = %loaded.name,
                    tool = %tool.name,
                    "tool name already registered, newer plugin now owns it"
                );
            }
        }
    }

    /// Scans `root` and loads every candidate, collecting per-plugin
    /// failures instead of aborting on the first.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Discovery`] when the scan fails, and an
    /// [`PluginError::Internal`] when candidates were found but none of
    /// them loaded. No candidates at all is a success with an empty
    /// report.
    pub async fn load_all_plugins(&self, root: impl AsRef<Path>) -> Result<LoadReport> {
        let paths = self.scan_plugins(root)?;
        if paths.is_empty() {
            return Ok(LoadReport::default());
        }

        let mut report = LoadReport::default();
        for path in paths {
            match self.load_plugin(&path).await {
                Ok(loaded) => report.loaded.push(loaded.name.clone()),
                Err(err) => {
                    warn!(path = %path.display(), %err, "plugin failed to load");
                    report.failures.push((path, err));
                }
            }
        }

        if report.loaded.is_empty() {
            return Err(PluginError::Internal {
                message: format!(
                    "none of {} candidate plugins loaded",
                    report.failures.len()
                ),
            });
        }
        Ok(report)
    }

    /// Snapshot of all loaded plugins, sorted by name.
    pub async fn list_plugins(&self) -> Vec<Arc<LoadedPlugin>> {
        let inner = self.inner.read().await;
        let mut plugins: Vec<_> = inner.plugins.values().cloned().collect();
        plugins.sort_by(|a, b| a.name.as_str().cmp(b.name.as_str()));
        plugins
    }

    /// Flat list of every tool across all loaded plugins, grouped by
    /// plugin name for a deterministic order.
    pub async fn list_tools(&self) -> Vec<ToolSchema> {
        self.list_plugins()
            .await
            .iter()
            .flat_map(|plugin| plugin.tools.iter().cloned())
            .collect()
    }

    /// Looks a plugin up by its load name.
    pub async fn get_plugin(&self, name: &str) -> Option<Arc<LoadedPlugin>> {
        self.inner.read().await.plugins.get(name).cloned()
    }

    /// Looks the owning plugin up for a tool name.
    pub async fn get_plugin_by_tool(&self, tool: &str) -> Option<Arc<LoadedPlugin>> {
        self.inner.read().await.tools.get(tool).cloned()
    }

    /// Resolves `tool` to its owning plugin and invokes it.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::ToolNotFound`] for an unknown name and
    /// transport failures from the RPC. A tool-reported failure is a
    /// successful call whose result carries the error flag.
    pub async fn call_tool(
        &self,
        tool: &str,
        params: Map<String, Value>,
    ) -> Result<toolbelt_core::CallToolResult> {
        let inner = self.inner.read().await;
        let plugin = inner
            .tools
            .get(tool)
            .cloned()
            .ok_or_else(|| PluginError::ToolNotFound {
                tool: tool.to_string(),
            })?;
        // The read guard stays held for the duration of the call, so
        // shutdown cannot tear the plugin down underneath it.
        plugin.process.call_tool(&ToolName::new(tool), params).await
    }

    /// Invokes a tool with a typed parameter record.
    ///
    /// The record is projected to a flat string-keyed mapping on the
    /// host side before dispatch; plugins only ever see mappings, which
    /// keeps the plugin ABI closed under caller-side extension.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::InvalidArgument`] when the record does not
    /// project to an object, plus everything [`call_tool`](Self::call_tool)
    /// can return.
    pub async fn call_tool_typed<P: Serialize + Sync>(
        &self,
        tool: &str,
        params: &P,
    ) -> Result<toolbelt_core::CallToolResult> {
        let value = serde_json::to_value(params).map_err(|err| {
            PluginError::InvalidArgument(format!("parameters do not serialize: {err}"))
        })?;
        let Value::Object(map) = value else {
            return Err(PluginError::InvalidArgument(
                "parameters must serialize to an object".to_string(),
            ));
        };
        self.call_tool(tool, map).await
    }

    /// Invokes a tool, honouring a cancellation token.
    ///
    /// Cancellation observed before dispatch returns without touching
    /// the plugin. Cancellation during the RPC releases the waiter but
    /// does not interrupt the plugin process, which keeps running until
    /// its own logic returns.
    ///
    /// # Errors
    ///
    /// Returns [`PluginError::Cancelled`] when the token fires, plus
    /// everything [`call_tool`](Self::call_tool) can return.
    pub async fn call_tool_with_context(
        &self,
        token: &CancellationToken,
        tool: &str,
        params: Map<String, Value>,
    ) -> Result<toolbelt_core::CallToolResult> {
        if token.is_cancelled() {
            return Err(PluginError::Cancelled {
                tool: tool.to_string(),
            });
        }
        tokio::select! {
            () = token.cancelled() => Err(PluginError::Cancelled {
                tool: tool.to_string(),
            }),
            result = self.call_tool(tool, params) => result,
        }
    }

    /// Shuts one plugin down and removes it from both indices.
    ///
    /// Returns `true` when a plugin of that name was loaded.
    pub async fn unload_plugin(&self, name: &str) -> bool {
        let mut inner = self.inner.write().await;
        let Some(plugin) = inner.plugins.remove(name) else {
            return false;
        };
        inner.tools.retain(|_, owner| !Arc::ptr_eq(owner, &plugin));
        plugin.process.shutdown().await;
        debug!(plugin = %name, "plugin unloaded");
        true
    }

    /// Tears down every loaded plugin and clears both indices.
    /// Idempotent.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.write().await;
        for plugin in inner.plugins.values() {
            plugin.process.shutdown().await;
        }
        inner.plugins.clear();
        inner.tools.clear();
        debug!("plugin manager shut down");
    }
}
