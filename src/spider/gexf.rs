//! GEXF 1.3 export of a finished crawl, as consumed by Gephi and similar tools.

use super::GraphView;
use crate::Result;
use chrono::{Local, NaiveDate};
use core::fmt::Write;

const CREATOR: &str = "ghspider";

const NODE_ATTRIBUTES: [(&str, &str); 5] = [
    ("followers", "integer"),
    ("public_repos", "integer"),
    ("company", "string"),
    ("location", "string"),
    ("depth", "integer"),
];

const EDGE_ATTRIBUTES: [(&str, &str); 3] = [("type", "string"), ("weight", "integer"), ("repo", "string")];

/// Write `view` as a GEXF document stamped with today's date.
pub fn write<W: Write>(view: &GraphView<'_>, seed: &str, writer: &mut W) -> Result<()> {
    write_dated(view, seed, Local::now().date_naive(), writer)
}

/// Write `view` as a GEXF document.
///
/// Nodes come out ordered by depth then login, edges by source, target and kind, with
/// ids assigned sequentially in that order. Edges touching non-admitted accounts are left out.
pub fn write_dated<W: Write>(view: &GraphView<'_>, seed: &str, date: NaiveDate, writer: &mut W) -> Result<()> {
    writeln!(writer, r#"<?xml version="1.0" encoding="UTF-8"?>"#)?;
    writeln!(writer, r#"<gexf xmlns="http://gexf.net/1.3" version="1.3">"#)?;
    writeln!(writer, r#"  <meta lastmodifieddate="{}">"#, date.format("%Y-%m-%d"))?;
    writeln!(writer, "    <creator>{CREATOR}</creator>")?;
    writeln!(writer, "    <description>GitHub social graph around {}</description>", xml_escape(seed))?;
    writeln!(writer, "  </meta>")?;
    writeln!(writer, r#"  <graph defaultedgetype="directed" mode="static">"#)?;

    write_attribute_class(writer, "node", &NODE_ATTRIBUTES)?;
    write_attribute_class(writer, "edge", &EDGE_ATTRIBUTES)?;

    writeln!(writer, "    <nodes>")?;
    for node in view.nodes() {
        let profile = &node.profile;
        writeln!(
            writer,
            r#"      <node id="{}" label="{}">"#,
            xml_escape(node.login()),
            xml_escape(&node.label())
        )?;
        write_attvalues(
            writer,
            &[
                profile.followers.to_string(),
                profile.public_repos.to_string(),
                profile.company.as_deref().map(xml_escape).unwrap_or_default(),
                profile.location.as_deref().map(xml_escape).unwrap_or_default(),
                node.depth.to_string(),
            ],
        )?;
        writeln!(writer, "      </node>")?;
    }
    writeln!(writer, "    </nodes>")?;

    writeln!(writer, "    <edges>")?;
    for (id, edge) in view.edges().into_iter().enumerate() {
        writeln!(
            writer,
            r#"      <edge id="{id}" source="{}" target="{}" weight="{}">"#,
            xml_escape(&edge.source),
            xml_escape(&edge.target),
            edge.weight
        )?;
        write_attvalues(
            writer,
            &[
                edge.kind.as_str().to_string(),
                edge.weight.to_string(),
                edge.repo.as_deref().map(xml_escape).unwrap_or_default(),
            ],
        )?;
        writeln!(writer, "      </edge>")?;
    }
    writeln!(writer, "    </edges>")?;

    writeln!(writer, "  </graph>")?;
    writeln!(writer, "</gexf>")?;
    Ok(())
}

fn write_attribute_class<W: Write>(writer: &mut W, class: &str, attributes: &[(&str, &str)]) -> Result<()> {
    writeln!(writer, r#"    <attributes class="{class}">"#)?;
    for (id, (title, kind)) in attributes.iter().enumerate() {
        writeln!(writer, r#"      <attribute id="{id}" title="{title}" type="{kind}"/>"#)?;
    }
    writeln!(writer, "    </attributes>")?;
    Ok(())
}

/// Values must already be escaped.
fn write_attvalues<W: Write>(writer: &mut W, values: &[String]) -> Result<()> {
    writeln!(writer, "        <attvalues>")?;
    for (id, value) in values.iter().enumerate() {
        writeln!(writer, r#"          <attvalue for="{id}" value="{value}"/>"#)?;
    }
    writeln!(writer, "        </attvalues>")?;
    Ok(())
}

fn xml_escape(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            '\'' => result.push_str("&apos;"),
            _ => result.push(c),
        }
    }
    result
}
