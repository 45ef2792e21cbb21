/// Navigate into a nested `toml::Value` by dotted path segments.
pub(super) fn get_nested<'a>(val: &'a toml::Value, path: &[&str]) -> Option<&'a toml::Value> {
    let mut current = val;
    for segment in path {
        current = current.as_table()?.get(*segment)?;
    }
    Some(current)
}

/// Set a value at a nested path, creating intermediate tables as needed.
///
/// A non-table value in the way is replaced by a table.
pub(crate) fn set_nested(val: &mut toml::Value, path: &[&str], new_val: toml::Value) {
    let Some((leaf, parents)) = path.split_last() else {
        return;
    };

    let mut current = val;
    for segment in parents {
        if !current.is_table() {
            *current = toml::Value::Table(toml::map::Map::new());
        }
        let Some(table) = current.as_table_mut() else {
            return;
        };
        current = table
            .entry((*segment).to_owned())
            .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
    }

    if !current.is_table() {
        *current = toml::Value::Table(toml::map::Map::new());
    }
    if let Some(table) = current.as_table_mut() {
        table.insert((*leaf).to_owned(), new_val);
    }
}
