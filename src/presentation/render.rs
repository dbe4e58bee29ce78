use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::{
    data_structures::{
        DecodedRecord, Interaction, InteractionKind, Label, Prediction,
    },
    services::{FeatureImportances, FormInput},
};

const GAUGE_CELLS: usize = 20;
const CHART_CELLS: usize = 30;
const TOP_FEATURES: usize = 8;

/// Ring-gauge equivalent: filled share of the bar is the probability, the
/// caption uses the same threshold as the label.
pub fn gauge(probability: f64) -> String {
    let filled = ((probability * GAUGE_CELLS as f64).round() as usize).min(GAUGE_CELLS);
    format!(
        "[{}{}] {:.1}%  {}",
        "█".repeat(filled),
        "·".repeat(GAUGE_CELLS - filled),
        probability * 100.0,
        Label::from_probability(probability).caption()
    )
}

pub fn write_prediction<W: Write>(out: &mut W, prediction: &Prediction) -> Result<()> {
    writeln!(out, "{}", gauge(prediction.probability))?;
    writeln!(out, ">> {} <<", prediction.label.headline())?;
    Ok(())
}

pub fn write_importances<W: Write>(out: &mut W, importances: &FeatureImportances) -> Result<()> {
    let top = importances.top(TOP_FEATURES);
    let max = top.last().map(|(_, score)| *score).unwrap_or(0.0);

    writeln!(out, "Top {} Most Influential Features", top.len())?;
    for (name, score) in top.iter().rev() {
        let cells = if max > 0.0 {
            ((score / max) * CHART_CELLS as f64).round() as usize
        } else {
            0
        };
        writeln!(out, "  {:<10} {:<width$} {:.3}", name, "█".repeat(cells), score, width = CHART_CELLS)?;
    }
    Ok(())
}

pub fn write_record<W: Write>(out: &mut W, kind: InteractionKind, record: &DecodedRecord) -> Result<()> {
    writeln!(out, "{}", kind.heading())?;
    write_rows(out, &record.rows())
}

pub fn write_form<W: Write>(out: &mut W, form: &FormInput) -> Result<()> {
    write_rows(out, &form.values())
}

fn write_rows<W: Write>(out: &mut W, rows: &[(&'static str, String)]) -> Result<()> {
    for (field, value) in rows {
        writeln!(out, "  {field:<11} {value}")?;
    }
    Ok(())
}

/// Full result view: gauge, verdict, optional importance chart, scored record.
pub fn write_interaction<W: Write>(
    out: &mut W,
    interaction: &Interaction,
    decoded: &DecodedRecord,
    importances: Option<&FeatureImportances>,
) -> Result<()> {
    write_prediction(out, &interaction.prediction)?;
    if let Some(importances) = importances {
        writeln!(out)?;
        write_importances(out, importances)?;
    }
    writeln!(out)?;
    write_record(out, interaction.kind, decoded)?;
    Ok(())
}

#[derive(Serialize)]
struct InteractionView<'a> {
    kind: InteractionKind,
    label: Label,
    probability: f64,
    record: &'a DecodedRecord,
}

pub fn write_interaction_json<W: Write>(
    out: &mut W,
    interaction: &Interaction,
    decoded: &DecodedRecord,
) -> Result<()> {
    let view = InteractionView {
        kind: interaction.kind,
        label: interaction.prediction.label,
        probability: interaction.prediction.probability,
        record: decoded,
    };
    serde_json::to_writer_pretty(&mut *out, &view)?;
    writeln!(out)?;
    Ok(())
}

pub fn write_options<W: Write>(out: &mut W, values: &[String]) -> Result<()> {
    for value in values {
        writeln!(out, "{value}")?;
    }
    Ok(())
}
