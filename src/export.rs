use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use csv::WriterBuilder;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::{Application, JoiningForm};

const HEADERS: [&str; 21] = [
    "Emp Code",
    "Name",
    "Father Name",
    "Email",
    "Mobile",
    "Alternate Mobile",
    "Aadhaar",
    "PAN",
    "UAN",
    "ESIC",
    "DOB",
    "DOJ",
    "Marital Status",
    "Bank Account",
    "IFSC",
    "Local Address",
    "Permanent Address",
    "Pincode",
    "Education",
    "Submission Date",
    "Record ID",
];

/// Write the loaded set to `applicants_<timestamp>.csv` in `out_dir`.
/// Returns `None` without touching the filesystem when there is nothing to export.
pub fn export_applications(apps: &[Application], out_dir: &Path, now: DateTime<Local>) -> Result<Option<PathBuf>> {
    if apps.is_empty() {
        return Ok(None);
    }

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Failed to create export directory: {}", out_dir.display()))?;
    let path = out_dir.join(format!("applicants_{}.csv", now.format("%Y%m%d_%H%M%S")));
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create export file: {}", path.display()))?;

    write_csv(apps, file)?;
    tracing::info!(rows = apps.len(), path = %path.display(), "exported applications");
    Ok(Some(path))
}

pub fn write_csv<W: Write>(apps: &[Application], writer: W) -> Result<()> {
    let mut writer = WriterBuilder::new().from_writer(writer);
    writer.write_record(HEADERS)?;

    for app in apps {
        let f = &app.form;
        let full_name = f.full_name();
        let marital_status = f.marital_status.to_string();
        let education = education_summary(f);
        let record: [&str; 21] = [
            &f.employee_code,
            &full_name,
            &f.father_name,
            &f.email,
            &f.mobile,
            &f.alternate_mobile,
            &f.aadhaar_number,
            &f.pan_number,
            &f.uan_number,
            &f.esic_number,
            &f.dob,
            &f.doj,
            &marital_status,
            &f.bank_account,
            &f.ifsc_code,
            &f.local_address,
            &f.permanent_address,
            &f.pincode,
            &education,
            &f.submission_date,
            &app.id,
        ];
        writer.write_record(record)?;
    }

    writer.flush()?;
    Ok(())
}

/// `10th: St. Mary's (85%, 2015); Graduation: DU (72%, 2019)`, skipping levels
/// without an institution.
pub fn education_summary(form: &JoiningForm) -> String {
    form.education
        .iter()
        .filter(|e| !e.institution.trim().is_empty())
        .map(|e| {
            let mut detail = Vec::new();
            if !e.percentage.trim().is_empty() {
                let pct = e.percentage.trim();
                if pct.ends_with('%') {
                    detail.push(pct.to_string());
                } else {
                    detail.push(format!("{}%", pct));
                }
            }
            if !e.passing_year.trim().is_empty() {
                detail.push(e.passing_year.trim().to_string());
            }
            if detail.is_empty() {
                format!("{}: {}", e.degree, e.institution.trim())
            } else {
                format!("{}: {} ({})", e.degree, e.institution.trim(), detail.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn app(code: &str, first: &str, last: &str) -> Application {
        let mut form = JoiningForm::blank(chrono::NaiveDate::from_ymd_opt(2026, 1, 10).unwrap());
        form.employee_code = code.to_string();
        form.first_name = first.to_string();
        form.last_name = last.to_string();
        form.local_address = "Flat 4, Sector 9, Noida".to_string();
        Application {
            id: format!("APP-{}", code),
            submitted_at: String::new(),
            form,
        }
    }

    #[test]
    fn test_empty_set_produces_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = export_applications(&[], dir.path(), Local::now()).unwrap();
        assert!(result.is_none());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_export_writes_timestamped_file() {
        let dir = tempfile::tempdir().unwrap();
        let now = Local.with_ymd_and_hms(2026, 3, 15, 9, 5, 7).unwrap();
        let path = export_applications(&[app("BCS-1", "Ansh", "Verma")], dir.path(), now)
            .unwrap()
            .unwrap();
        assert_eq!(path.file_name().unwrap(), "applicants_20260315_090507.csv");

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.get(0), Some("Emp Code"));
        assert_eq!(headers.get(18), Some("Education"));

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get(0), Some("BCS-1"));
        assert_eq!(rows[0].get(1), Some("Ansh Verma"));
        // Commas in addresses survive quoting.
        assert_eq!(rows[0].get(15), Some("Flat 4, Sector 9, Noida"));
        assert_eq!(rows[0].get(12), Some("Unmarried"));
    }

    #[test]
    fn test_education_summary_skips_empty_levels() {
        let mut a = app("BCS-2", "Ria", "Das");
        a.form.update_education("10th", "St. Mary's", "85", "2013");
        a.form.update_education("Graduation", "Delhi University", "72%", "");
        a.form.update_education("Others", "Tally course", "", "");
        assert_eq!(
            education_summary(&a.form),
            "10th: St. Mary's (85%, 2013); Graduation: Delhi University (72%); Others: Tally course"
        );
    }

    #[test]
    fn test_one_row_per_record() {
        let mut out = Vec::new();
        write_csv(&[app("A", "A", "A"), app("B", "B", "B")], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 3);
    }
}
