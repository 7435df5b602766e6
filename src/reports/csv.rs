use crate::Result;
use crate::spider::GraphView;
use core::fmt::Write;
use ohno::IntoAppError;

/// Write the edges between admitted accounts as a `source,target,type,weight,repo` table.
pub fn generate<W: Write>(view: &GraphView<'_>, writer: &mut W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(Vec::new());
    for edge in view.edges() {
        csv.serialize(edge).into_app_err("serializing an edge to CSV")?;
    }

    let bytes = csv.into_inner().into_app_err("flushing CSV output")?;
    write!(writer, "{}", String::from_utf8(bytes).into_app_err("CSV output is not valid UTF-8")?)?;
    Ok(())
}
