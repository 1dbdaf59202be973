use anyhow::{Context, Result};
use podium_core::inspect::{inspect, ElementInfo};
use podium_core::{SelectorResolver, SelectorTarget};
use podium_dom::DomSnapshot;
use std::path::Path;
use tracing::info;

/// Element info for every node the target resolves to in the snapshot at `path`.
pub fn inspect_snapshot(
    resolver: &SelectorResolver,
    path: &Path,
    target: SelectorTarget,
) -> Result<Vec<ElementInfo>> {
    let doc = DomSnapshot::from_path(path)
        .with_context(|| format!("failed to load snapshot {}", path.display()))?;
    let matches = resolver.resolve(&doc, target);
    info!(target = %target, count = matches.len(), "resolved target");
    Ok(matches
        .into_iter()
        .filter_map(|node| inspect(&doc, node))
        .collect())
}
