//! Presentation: text rendering of command results

use crate::fs::{NodeListing, NodeType};
use crate::types::{hash_hex, short_hex, Hash};
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

/// Render a directory listing as a table
pub fn format_listing(rows: &[NodeListing]) -> String {
    if rows.is_empty() {
        return "(empty)".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Name", "Type", "Size", "Hash"]);
    for row in rows {
        let name = match row.node_type {
            NodeType::Directory => format!("{}/", row.name),
            NodeType::File => row.name.clone(),
        };
        table.add_row(vec![
            name,
            row.node_type.to_string(),
            row.size.to_string(),
            short_hex(&row.hash),
        ]);
    }
    table.to_string()
}

/// Render the details of one node
pub fn format_stat(path: &str, node_type: NodeType, size: u64, hash: &Hash, entries: Option<usize>) -> String {
    let mut lines = vec![
        format!("Path:  {}", path),
        format!("Type:  {}", node_type),
        format!("Size:  {}", size),
        format!("Hash:  {}", hash_hex(hash)),
    ];
    if let Some(entries) = entries {
        lines.push(format!("Entries: {}", entries));
    }
    lines.join("\n")
}
