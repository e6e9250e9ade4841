use std::fs;

const CONFIG_PATH: &str = "src/default_config.toml";

enum Kind {
    Text,
    Count,
}

/// Keys the embedded config must set, with the kind of value each takes.
const SCHEMA: &[(&str, &str, Kind)] = &[
    ("render", "bullet", Kind::Text),
    ("render", "rule_line", Kind::Text),
    ("render", "paragraph_separator", Kind::Text),
    ("render", "list_indent", Kind::Text),
    ("limits", "max_nesting", Kind::Count),
    ("output", "max_message_len", Kind::Count),
];

fn main() {
    println!("cargo:rerun-if-changed={CONFIG_PATH}");

    let content = fs::read_to_string(CONFIG_PATH)
        .unwrap_or_else(|e| panic!("cannot read {CONFIG_PATH}: {e}"));
    let table: toml::Table = content
        .parse()
        .unwrap_or_else(|e| panic!("{CONFIG_PATH} is not valid TOML: {e}"));

    for (section, key, kind) in SCHEMA {
        let Some(value) = table.get(*section).and_then(|s| s.get(*key)) else {
            panic!("{CONFIG_PATH} is missing [{section}] {key}");
        };
        let valid = match kind {
            Kind::Text => value.is_str(),
            Kind::Count => value.as_integer().is_some_and(|n| n > 0),
        };
        if !valid {
            panic!("{CONFIG_PATH}: [{section}] {key} has the wrong type: {value}");
        }
    }
}
