use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::Path;

use crate::models::{Education, Employment, JoiningForm, MaritalStatus, Reference, YesNo, EDUCATION_LEVELS};
use crate::sync::{SaveOutcome, SyncCoordinator};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Employment History Row {row}: Employer Name is required.")]
    EmployerMissing { row: usize },

    #[error("Employment History Row {row}: '{field}' is not a valid date (expected YYYY-MM-DD, got '{value}').")]
    InvalidDate {
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("Employment History Row {row}: 'To Date' cannot be earlier than 'From Date'.")]
    DateOrder { row: usize },

    #[error("Please check the final declaration.")]
    DeclarationMissing,

    #[error("{field} is required.")]
    MissingField { field: &'static str },

    #[error("Employment History Row {row}: {field} is required.")]
    MissingEmploymentField { row: usize, field: &'static str },

    #[error("Reference #{row}: {field} is required.")]
    MissingReferenceField { row: usize, field: &'static str },
}

impl JoiningForm {
    /// A fresh form: every education level, one empty employment row and one
    /// empty reference row.
    pub fn blank(today: NaiveDate) -> Self {
        Self {
            education: EDUCATION_LEVELS
                .iter()
                .map(|level| Education {
                    degree: level.to_string(),
                    ..Default::default()
                })
                .collect(),
            employment: vec![Employment::default()],
            references: vec![Reference::default()],
            marital_status: MaritalStatus::Unmarried,
            is_related_to_company: YesNo::No,
            submission_date: today.format(DATE_FORMAT).to_string(),
            ..Default::default()
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read form file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse form file: {}", path.display()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn add_employment_row(&mut self) {
        self.employment.push(Employment::default());
    }

    /// Removing the only row clears it instead.
    pub fn remove_employment_row(&mut self, index: usize) {
        if self.employment.len() <= 1 {
            self.employment = vec![Employment::default()];
            return;
        }
        if index < self.employment.len() {
            self.employment.remove(index);
        }
    }

    pub fn add_reference_row(&mut self) {
        self.references.push(Reference::default());
    }

    pub fn remove_reference_row(&mut self, index: usize) {
        if index < self.references.len() {
            self.references.remove(index);
        }
    }

    /// Education levels are positional; unknown levels are ignored.
    pub fn update_education(&mut self, level: &str, institution: &str, percentage: &str, passing_year: &str) -> bool {
        match self.education.iter_mut().find(|e| e.degree == level) {
            Some(entry) => {
                entry.institution = institution.to_string();
                entry.percentage = percentage.to_string();
                entry.passing_year = passing_year.to_string();
                true
            }
            None => false,
        }
    }

    /// Submit-time checks. The first failure wins.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (i, emp) in self.employment.iter().enumerate() {
            if !emp.is_blank() && emp.employer.trim().is_empty() {
                return Err(ValidationError::EmployerMissing { row: i + 1 });
            }
        }

        for (i, emp) in self.employment.iter().enumerate() {
            let row = i + 1;
            if emp.from_date.trim().is_empty() || emp.to_date.trim().is_empty() {
                continue;
            }
            let from = parse_date(row, "From Date", &emp.from_date)?;
            let to = parse_date(row, "To Date", &emp.to_date)?;
            if to < from {
                return Err(ValidationError::DateOrder { row });
            }
        }

        if !self.final_declaration {
            return Err(ValidationError::DeclarationMissing);
        }

        self.check_required()
    }

    fn check_required(&self) -> Result<(), ValidationError> {
        let required: [(&'static str, &str); 17] = [
            ("Employee Code", self.employee_code.as_str()),
            ("First Name", self.first_name.as_str()),
            ("Last Name", self.last_name.as_str()),
            ("Father's Name", self.father_name.as_str()),
            ("Mother's Name", self.mother_name.as_str()),
            ("Email Address", self.email.as_str()),
            ("Mobile Number", self.mobile.as_str()),
            ("Date of Birth", self.dob.as_str()),
            ("Date of Joining", self.doj.as_str()),
            ("Bank Account Number", self.bank_account.as_str()),
            ("IFSC Code", self.ifsc_code.as_str()),
            ("Aadhaar Number", self.aadhaar_number.as_str()),
            ("PAN Number", self.pan_number.as_str()),
            ("Local Address", self.local_address.as_str()),
            ("Permanent Address", self.permanent_address.as_str()),
            ("Pin Code", self.pincode.as_str()),
            ("Signature", self.signature.as_str()),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField { field });
            }
        }

        for (i, emp) in self.employment.iter().enumerate() {
            if emp.is_blank() {
                continue;
            }
            for (field, value) in [
                ("Designation", &emp.designation),
                ("From Date", &emp.from_date),
                ("To Date", &emp.to_date),
            ] {
                if value.trim().is_empty() {
                    return Err(ValidationError::MissingEmploymentField { row: i + 1, field });
                }
            }
        }

        for (i, reference) in self.references.iter().enumerate() {
            for (field, value) in [
                ("Name", &reference.name),
                ("Organization", &reference.organization),
                ("Mobile Number", &reference.mobile),
            ] {
                if value.trim().is_empty() {
                    return Err(ValidationError::MissingReferenceField { row: i + 1, field });
                }
            }
        }

        Ok(())
    }

    /// Drop answers that only apply to the other branch of a choice.
    fn normalize(&mut self) {
        if self.marital_status == MaritalStatus::Unmarried {
            self.wife_name.clear();
        }
        if self.is_related_to_company == YesNo::No {
            self.related_company_name.clear();
            self.related_person_name.clear();
            self.related_department.clear();
        }
    }
}

fn parse_date(row: usize, field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value.trim(), DATE_FORMAT).map_err(|_| ValidationError::InvalidDate {
        row,
        field,
        value: value.to_string(),
    })
}

/// Validate, normalize and hand the form to the coordinator.
pub fn submit(mut form: JoiningForm, sync: &mut SyncCoordinator) -> Result<SaveOutcome> {
    form.validate()?;
    form.normalize();
    sync.save(form)
}
