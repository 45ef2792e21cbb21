use tracing::warn;

use super::path::{get_nested, set_nested};

const PROGRAM_NAMESPACE: &[&str] = &["sandbox", "program_namespace"];
const APPROVED_METHODS: &[&str] = &["methods", "approved"];

/// Enforce that the workspace layer can only **narrow** what sandboxed code
/// may call, never widen it. Call this after merging the workspace layer.
///
/// `baseline` is the merged config *before* the workspace layer was applied,
/// so enforcement holds even when no user config file exists.
///
/// - `sandbox.program_namespace` cannot be set by a workspace: the namespace
///   decides which callables are trusted without a descriptor.
/// - `methods.approved` lists may only shrink. Entries absent from the
///   baseline are dropped, as are container types the baseline never approved.
pub fn enforce_restrictions(
    merged: &mut toml::Value,
    baseline: &toml::Value,
    workspace_layer: &toml::Value,
) {
    block_workspace_override(merged, baseline, workspace_layer, PROGRAM_NAMESPACE);
    narrow_approved_methods(merged, baseline, workspace_layer);
}

fn block_workspace_override(
    merged: &mut toml::Value,
    baseline: &toml::Value,
    workspace: &toml::Value,
    path: &[&str],
) {
    if get_nested(workspace, path).is_none() {
        return;
    }
    let field = path.join(".");
    warn!(field = %field, "workspace config cannot set this field; reverting to baseline");
    match get_nested(baseline, path) {
        Some(base_val) => set_nested(merged, path, base_val.clone()),
        None => remove_leaf(merged, path),
    }
}

fn narrow_approved_methods(
    merged: &mut toml::Value,
    baseline: &toml::Value,
    workspace: &toml::Value,
) {
    let Some(ws_table) = get_nested(workspace, APPROVED_METHODS).and_then(toml::Value::as_table)
    else {
        return;
    };
    let base_table = get_nested(baseline, APPROVED_METHODS).and_then(toml::Value::as_table);

    for (type_name, ws_methods) in ws_table {
        let path = ["methods", "approved", type_name.as_str()];
        let Some(base_methods) = base_table
            .and_then(|t| t.get(type_name))
            .and_then(toml::Value::as_array)
        else {
            warn!(
                container = %type_name,
                "workspace config tried to approve methods on a container type \
                 the baseline does not approve; dropping"
            );
            remove_leaf(merged, &path);
            continue;
        };

        let requested = ws_methods.as_array().cloned().unwrap_or_default();
        let (kept, dropped): (Vec<_>, Vec<_>) = requested
            .into_iter()
            .partition(|method| base_methods.contains(method));

        if !dropped.is_empty() {
            warn!(
                container = %type_name,
                dropped = dropped.len(),
                "workspace config tried to approve methods beyond baseline; dropping them"
            );
        }
        set_nested(merged, &path, toml::Value::Array(kept));
    }
}

fn remove_leaf(val: &mut toml::Value, path: &[&str]) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };
    let mut current = val;
    for segment in parents {
        let Some(next) = current.as_table_mut().and_then(|t| t.get_mut(*segment)) else {
            return;
        };
        current = next;
    }
    if let Some(table) = current.as_table_mut() {
        table.remove(*leaf);
    }
}
