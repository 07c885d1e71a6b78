use std::io::Write;

use anyhow::Result;
use e2e_topology::{
    Hop,
    entity::EndpointKind,
    rows::{self, COLUMNS},
};

pub fn write_json(hops: &[Hop], out: &mut impl Write) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, &rows::render(hops))?;
    writeln!(out)?;
    Ok(())
}

pub fn write_csv(hops: &[Hop], out: &mut impl Write) -> Result<()> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(COLUMNS)?;
    for row in rows::render(hops) {
        writer.write_record(row.cells())?;
    }
    writer.flush()?;
    Ok(())
}

fn node_id(kind: EndpointKind, id: &str) -> String {
    format!("{kind}:{id}")
}

/// Graphviz rendering: one node per endpoint, one edge per hop labelled with
/// its hop number. Dangling hops end in a point node.
pub fn write_dot(hops: &[Hop], out: &mut impl Write) -> Result<()> {
    let mut dot = String::from("digraph E2E {\n");
    dot.push_str("  rankdir=LR;\n");
    dot.push_str("  node [shape=box];\n\n");

    for hop in hops {
        let src = node_id(hop.source_kind, &hop.source.id);
        dot.push_str(&format!(
            "  \"{}\" [label=\"{}\\n{}\"];\n",
            src, hop.source.name, hop.source.edge
        ));

        if hop.is_dangling() {
            let end = format!("{src}:end");
            dot.push_str(&format!("  \"{}\" [shape=point];\n", end));
            dot.push_str(&format!(
                "  \"{}\" -> \"{}\" [label=\"{}\", style=dashed];\n",
                src, end, hop.hop_number
            ));
            continue;
        }

        let dst_kind = match hop.source_kind {
            EndpointKind::Input => EndpointKind::Output,
            EndpointKind::Output => EndpointKind::Input,
        };
        let dst = node_id(dst_kind, &hop.destination.id);
        dot.push_str(&format!(
            "  \"{}\" [label=\"{}\\n{}\"];\n",
            dst, hop.destination.name, hop.destination.edge
        ));
        let color = if hop.is_active { "black" } else { "gray" };
        dot.push_str(&format!(
            "  \"{}\" -> \"{}\" [label=\"{}\", color={}];\n",
            src, dst, hop.hop_number, color
        ));
    }

    dot.push_str("}\n");
    out.write_all(dot.as_bytes())?;
    Ok(())
}
