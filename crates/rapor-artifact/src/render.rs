//! HTML document rendering

use std::fmt::Write as _;

use log::info;
use serde_json::json;

use rapor_core::{CellKind, GridCell, RaporTemplate};
use rapor_formula::compile_template;

use crate::cohort::Cohort;
use crate::error::{ArtifactError, Result};
use crate::runtime::RUNTIME_JS;
use crate::substitute::{substitute_text, DocumentContext};

/// The effective per-student cell definition for each column: the
/// bottom-most non-hidden cell declaring a data/input/formula/dropdown type.
/// Higher rows in the same column are pure header labels.
pub fn effective_defs(template: &RaporTemplate) -> Vec<Option<&GridCell>> {
    (0..template.col_count)
        .map(|col| {
            (0..template.row_count)
                .rev()
                .filter_map(|row| template.cell(row, col).ok())
                .find(|cell| !cell.hidden && cell.kind.is_student_def())
        })
        .collect()
}

/// Render a template plus a target cohort into one self-contained HTML
/// document
pub fn generate(template: &RaporTemplate, cohort: &Cohort, ctx: &DocumentContext) -> Result<String> {
    template.validate_keys()?;
    let compiled = compile_template(template)?;

    let defs = effective_defs(template);
    // Header rows are everything above the topmost effective definition;
    // rows from there down form the per-student band, collapsed into one
    // output row per student.
    let band_start = defs
        .iter()
        .flatten()
        .map(|cell| cell.row)
        .min()
        .ok_or(ArtifactError::NoStudentBand)?;

    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"id\">\n<head>\n<meta charset=\"utf-8\">\n");
    let _ = write!(
        html,
        "<title>{} - {}</title>\n",
        escape(&template.name),
        escape(cohort.scope.display_name())
    );
    html.push_str(STYLE);
    html.push_str("</head>\n<body>\n");

    if let Some(logo) = &ctx.logo_data_uri {
        let _ = write!(html, "<img class=\"logo\" src=\"{}\" alt=\"\">\n", escape(logo));
    }

    html.push_str("<table>\n");

    // Header band: static grid, cohort-level substitution
    for row in 0..band_start {
        html.push_str("<tr>");
        for col in 0..template.col_count {
            let cell = template.cell(row, col)?;
            if cell.hidden {
                continue;
            }
            let text = substitute_text(&cell.value, ctx, cohort, None);
            let _ = write!(
                html,
                "<td{}{}>{}</td>",
                span_attrs(cell),
                style_attr(cell),
                escape(&text)
            );
        }
        html.push_str("</tr>\n");
    }

    // Per-student band: one row per student from the effective column defs
    for student in &cohort.students {
        let _ = write!(
            html,
            "<tr data-santri-row=\"{}\" data-santri-name=\"{}\">",
            student.santri_id,
            escape(&student.name)
        );
        for (col, def) in defs.iter().enumerate() {
            match def {
                None => {
                    // Column with no typed cell: blank filler keeping the
                    // grid aligned
                    let borders = bottom_borders(template, col);
                    let _ = write!(html, "<td{}></td>", borders);
                }
                Some(cell) => {
                    let _ = write!(html, "<td{}>", style_attr(cell));
                    match cell.kind {
                        CellKind::Data => {
                            let text = substitute_text(&cell.value, ctx, cohort, Some(student));
                            html.push_str(&escape(&text));
                        }
                        CellKind::Input => {
                            let _ = write!(
                                html,
                                "<input data-santri=\"{}\" data-key=\"{}\">",
                                student.santri_id,
                                escape(&cell.key)
                            );
                        }
                        CellKind::Dropdown => {
                            let _ = write!(
                                html,
                                "<select data-santri=\"{}\" data-key=\"{}\"><option value=\"\"></option>",
                                student.santri_id,
                                escape(&cell.key)
                            );
                            for option in &cell.options {
                                let _ = write!(
                                    html,
                                    "<option value=\"{0}\">{0}</option>",
                                    escape(option)
                                );
                            }
                            html.push_str("</select>");
                        }
                        CellKind::Formula => {
                            let _ = write!(
                                html,
                                "<input readonly class=\"formula\" data-santri=\"{}\" data-key=\"{}\">",
                                student.santri_id,
                                escape(&cell.key)
                            );
                        }
                        CellKind::Label => {}
                    }
                    html.push_str("</td>");
                }
            }
        }
        html.push_str("</tr>\n");
    }

    html.push_str("</table>\n");
    html.push_str("<button id=\"rapor-submit\">Kirim</button>\n");

    // Embed the compiled template and meta, then the frozen interpreter
    let meta = json!({
        "rombelId": cohort.rombel_id(),
        "rombelName": cohort.scope.display_name(),
        "templateId": template.id,
        "templateName": template.name,
        "tahunAjaran": ctx.tahun_ajaran,
        "semester": ctx.semester.map(|s| s.to_string()).unwrap_or_default(),
        "webhook": ctx.webhook_url,
        "waNumber": ctx.wa_number,
    });
    let compiled_json = serde_json::to_string(&compiled)?;
    let _ = write!(
        html,
        "<script>\nwindow.RAPOR = {{ compiled: {}, meta: {} }};\n{}\n</script>\n",
        script_safe(&compiled_json),
        script_safe(&meta.to_string()),
        RUNTIME_JS
    );
    html.push_str("</body>\n</html>\n");

    info!(
        "generated document for '{}': {} students, {} row formulas, {} rankings",
        cohort.scope.display_name(),
        cohort.students.len(),
        compiled.row_formulas.len(),
        compiled.rankings.len()
    );
    Ok(html)
}

const STYLE: &str = "<style>\n\
    body { font-family: sans-serif; margin: 16px; }\n\
    table { border-collapse: collapse; }\n\
    td { padding: 2px 6px; min-width: 40px; }\n\
    input, select { border: none; width: 100%; box-sizing: border-box; }\n\
    input.formula { background: #f3f3f3; }\n\
    img.logo { max-height: 80px; }\n\
</style>\n";

fn span_attrs(cell: &GridCell) -> String {
    let mut attrs = String::new();
    if cell.row_span > 1 {
        let _ = write!(attrs, " rowspan=\"{}\"", cell.row_span);
    }
    if cell.col_span > 1 {
        let _ = write!(attrs, " colspan=\"{}\"", cell.col_span);
    }
    attrs
}

fn style_attr(cell: &GridCell) -> String {
    let mut style = String::new();
    for (on, rule) in [
        (cell.borders.top, "border-top:1px solid #000;"),
        (cell.borders.right, "border-right:1px solid #000;"),
        (cell.borders.bottom, "border-bottom:1px solid #000;"),
        (cell.borders.left, "border-left:1px solid #000;"),
    ] {
        if on {
            style.push_str(rule);
        }
    }
    let _ = write!(style, "text-align:{};", cell.align.as_css());
    if cell.width > 0 {
        let _ = write!(style, "width:{}px;", cell.width);
    }
    format!(" style=\"{}\"", style)
}

/// Borders of the bottom-most non-hidden cell in a column, for filler cells
fn bottom_borders(template: &RaporTemplate, col: usize) -> String {
    (0..template.row_count)
        .rev()
        .filter_map(|row| template.cell(row, col).ok())
        .find(|cell| !cell.hidden)
        .map(style_attr)
        .unwrap_or_default()
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `</script>` inside embedded JSON would end the script block early
fn script_safe(json: &str) -> String {
    json.replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cohort::Student;
    use rapor_core::{Borders, CellKind, Semester};

    fn template() -> RaporTemplate {
        let mut t = RaporTemplate::new("t1", "Rapor Tahfidz", 3, 3);
        t.merge_cells(&[(0, 0), (0, 2)]).unwrap();
        t.cell_mut(0, 0).unwrap().value = "RAPOR $NAMA_LEMBAGA".into();

        let name = t.cell_mut(1, 0).unwrap();
        name.value = "Nama".into();
        let data = t.cell_mut(2, 0).unwrap();
        data.kind = CellKind::Data;
        data.value = "$NAMA_SANTRI".into();

        let input = t.cell_mut(2, 1).unwrap();
        input.kind = CellKind::Input;
        input.key = "HAFALAN".into();
        input.borders = Borders::all();

        let formula = t.cell_mut(2, 2).unwrap();
        formula.kind = CellKind::Formula;
        formula.key = "NILAI".into();
        formula.value = "=SUM($HAFALAN, 10)".into();
        t
    }

    fn students() -> Vec<Student> {
        vec![
            Student {
                santri_id: 2,
                name: "Budi".into(),
                nis: String::new(),
                nisn: String::new(),
                rombel_id: 1,
                rombel_name: "7A".into(),
                jenjang: "MTs".into(),
            },
            Student {
                santri_id: 1,
                name: "Ahmad".into(),
                nis: String::new(),
                nisn: String::new(),
                rombel_id: 1,
                rombel_name: "7A".into(),
                jenjang: "MTs".into(),
            },
        ]
    }

    fn ctx() -> DocumentContext {
        DocumentContext {
            nama_lembaga: "PP Al-Hikmah".into(),
            tahun_ajaran: "2024/2025".into(),
            semester: Some(Semester::Ganjil),
            ..Default::default()
        }
    }

    #[test]
    fn test_effective_defs_take_bottom_most() {
        let t = template();
        let defs = effective_defs(&t);
        assert_eq!(defs.len(), 3);
        assert_eq!(defs[0].unwrap().kind, CellKind::Data);
        assert_eq!(defs[1].unwrap().key, "HAFALAN");
        assert_eq!(defs[2].unwrap().key, "NILAI");
    }

    #[test]
    fn test_generate_renders_sorted_students() {
        let html = generate(&template(), &Cohort::rombel(1, "7A", students()), &ctx()).unwrap();

        // One row per student, sorted by name
        let ahmad = html.find("data-santri-name=\"Ahmad\"").unwrap();
        let budi = html.find("data-santri-name=\"Budi\"").unwrap();
        assert!(ahmad < budi);

        // Header substitution happened at generation time
        assert!(html.contains("RAPOR PP Al-Hikmah"));
        // Data column substituted per student
        assert!(html.contains(">Ahmad</td>"));
        // Input and formula fields carry their keys
        assert!(html.contains("data-key=\"HAFALAN\""));
        assert!(html.contains("readonly class=\"formula\""));
    }

    #[test]
    fn test_generate_embeds_compiled_template_and_runtime() {
        let html = generate(&template(), &Cohort::rombel(1, "7A", students()), &ctx()).unwrap();
        assert!(html.contains("\"rowFormulas\""));
        assert!(html.contains("window.RAPOR"));
        assert!(html.contains("RAPOR_V2_START"));
        // The frozen interpreter and its embedded fixture self-check
        assert!(html.contains("function evalExpr"));
        assert!(html.contains("RAPOR_CHECK_CASES"));
    }

    #[test]
    fn test_jenjang_document_uses_all_rombel_sentinel() {
        let mut many = students();
        many[0].rombel_name = "7B".into();
        let html = generate(&template(), &Cohort::jenjang("MTs", many), &ctx()).unwrap();
        assert!(html.contains("\"rombelId\":0"));
    }

    #[test]
    fn test_logo_uri_is_attribute_escaped() {
        let mut c = ctx();
        c.logo_data_uri = Some("data:image/png;base64,AA\"><script>".into());
        let html = generate(&template(), &Cohort::rombel(1, "7A", students()), &c).unwrap();
        assert!(!html.contains("AA\"><script>"));
        assert!(html.contains("AA&quot;&gt;&lt;script&gt;"));
    }

    #[test]
    fn test_template_without_band_rejected() {
        let t = RaporTemplate::new("t", "empty", 2, 2);
        let result = generate(&t, &Cohort::rombel(1, "7A", Vec::new()), &ctx());
        assert!(matches!(result, Err(ArtifactError::NoStudentBand)));
    }

    #[test]
    fn test_duplicate_keys_rejected_before_generation() {
        let mut t = template();
        t.cell_mut(1, 1).unwrap().kind = CellKind::Input;
        t.cell_mut(1, 1).unwrap().key = "HAFALAN".into();
        let result = generate(&t, &Cohort::rombel(1, "7A", Vec::new()), &ctx());
        assert!(matches!(
            result,
            Err(ArtifactError::Template(rapor_core::Error::DuplicateKeys(_)))
        ));
    }
}
