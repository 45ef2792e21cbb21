use super::{ConfigLayer, FieldSources};

/// Deep-merge `overlay` into `base`, recording which layer set each leaf
/// field.
///
/// Tables merge per key. Scalars and arrays from the overlay replace the
/// base value whole. `prefix` is the dotted path of `base` within the root.
pub fn deep_merge_tracking(
    base: &mut toml::Value,
    overlay: &toml::Value,
    prefix: &str,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let path = join(prefix, key);
                match base_table.get_mut(key) {
                    Some(base_val) if overlay_val.is_table() => {
                        deep_merge_tracking(base_val, overlay_val, &path, layer, sources);
                    },
                    Some(base_val) => {
                        *base_val = overlay_val.clone();
                        forget_below(&path, sources);
                        sources.insert(path, layer);
                    },
                    None => {
                        base_table.insert(key.clone(), overlay_val.clone());
                        record_all_leaves(overlay_val, &path, layer, sources);
                    },
                }
            }
        },
        (base, overlay) => {
            *base = overlay.clone();
            record_all_leaves(overlay, prefix, layer, sources);
        },
    }
}

fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_owned()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Drop source entries for fields nested under `path`, which a scalar or
/// array overlay has just replaced.
fn forget_below(path: &str, sources: &mut FieldSources) {
    let nested = format!("{path}.");
    sources.retain(|field, _| !field.starts_with(&nested));
}

/// Walk a value tree and record every leaf path with its source layer.
fn record_all_leaves(
    val: &toml::Value,
    prefix: &str,
    layer: ConfigLayer,
    sources: &mut FieldSources,
) {
    match val {
        toml::Value::Table(table) if !table.is_empty() => {
            for (key, child) in table {
                record_all_leaves(child, &join(prefix, key), layer, sources);
            }
        },
        _ => {
            sources.insert(prefix.to_owned(), layer);
        },
    }
}
