use threatspec_core::{Exposure, Model, Source};

const CSV_HEADER: [&str; 8] = [
    "boundary",
    "component",
    "threat",
    "type",
    "value",
    "function",
    "file",
    "line",
];

/// One row per relation record of every project
pub fn render_csv(model: &Model) -> String {
    let mut out = String::new();
    push_row(&mut out, CSV_HEADER.iter().copied());

    for row in model.relations() {
        let record = row.record;
        let source = record.source();
        let line = source.map(|s| s.line.to_string()).unwrap_or_default();
        push_row(
            &mut out,
            [
                model.boundary_name(record.boundary()),
                model.component_name(record.component()),
                model.threat_name(record.threat()),
                record.kind().as_str(),
                record.text(),
                source.map_or("", |s| s.function.as_str()),
                source.map_or("", |s| s.file.as_str()),
                line.as_str(),
            ],
        );
    }
    out
}

fn push_row<'a>(out: &mut String, fields: impl IntoIterator<Item = &'a str>) {
    for (i, field) in fields.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&escape_field(field));
    }
    out.push_str("\r\n");
}

fn escape_field(text: &str) -> String {
    if text.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", text.replace('"', "\"\""))
    } else {
        text.to_string()
    }
}

/// `file:line:function` of an annotation source
pub fn location(source: Option<&Source>) -> String {
    source.map_or_else(
        || "(annotation file)".to_string(),
        |s| format!("{}:{}:{}", s.file, s.line, s.short_function()),
    )
}

/// `check` line for an exposure nothing mitigates
pub fn unmitigated_line(exposure: &Exposure) -> String {
    format!(
        "Unmitigated exposure in {}: {}",
        location(exposure.source.as_ref()),
        exposure.text
    )
}

/// `report` line for an exposure nothing mitigates
pub fn warning_line(model: &Model, exposure: &Exposure) -> String {
    let source = exposure.source.as_ref();
    format!(
        "WARNING: {}:{} exposed to {} by {} in {}:{} ({})",
        model.boundary_name(exposure.boundary.as_ref()),
        model.component_name(&exposure.component),
        model.threat_name(&exposure.threat),
        exposure.text,
        source.map_or("", |s| s.file.as_str()),
        source.map_or("", |s| s.function.as_str()),
        source.map_or(0, |s| s.line),
    )
}
