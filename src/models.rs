use serde::{Deserialize, Deserializer, Serialize};

pub const EDUCATION_LEVELS: [&str; 7] = [
    "10th",
    "12th",
    "Graduation",
    "Post-Graduation",
    "Diploma",
    "Post Diploma",
    "Others",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaritalStatus {
    Married,
    #[default]
    Unmarried,
}

impl std::fmt::Display for MaritalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MaritalStatus::Married => write!(f, "Married"),
            MaritalStatus::Unmarried => write!(f, "Unmarried"),
        }
    }
}

/// Answer to "are you related to anyone in this company?"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum YesNo {
    Yes,
    #[default]
    No,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Education {
    #[serde(deserialize_with = "null_as_default")]
    pub degree: String,
    #[serde(deserialize_with = "null_as_default")]
    pub institution: String,
    #[serde(deserialize_with = "null_as_default")]
    pub percentage: String,
    #[serde(deserialize_with = "null_as_default")]
    pub passing_year: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Employment {
    #[serde(deserialize_with = "null_as_default")]
    pub employer: String,
    #[serde(deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(deserialize_with = "null_as_default")]
    pub designation: String,
    #[serde(deserialize_with = "null_as_default")]
    pub from_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub to_date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ctc: String,
}

impl Employment {
    pub fn is_blank(&self) -> bool {
        [
            &self.employer,
            &self.location,
            &self.designation,
            &self.from_date,
            &self.to_date,
            &self.ctc,
        ]
        .iter()
        .all(|v| v.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reference {
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub organization: String,
    #[serde(deserialize_with = "null_as_default")]
    pub mobile: String,
}

/// Everything a new hire fills in on the joining form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JoiningForm {
    // Personal
    #[serde(deserialize_with = "null_as_default")]
    pub employee_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub first_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub middle_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub last_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub father_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub mother_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub mobile: String,
    #[serde(deserialize_with = "null_as_default")]
    pub alternate_mobile: String,
    #[serde(deserialize_with = "null_as_default")]
    pub dob: String,
    #[serde(deserialize_with = "null_as_default")]
    pub doj: String,
    #[serde(deserialize_with = "null_as_default")]
    pub marital_status: MaritalStatus,
    #[serde(deserialize_with = "null_as_default")]
    pub blood_group: String,
    #[serde(deserialize_with = "null_as_default")]
    pub wife_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub family_members_count: String,

    // Bank & identification
    #[serde(deserialize_with = "null_as_default")]
    pub bank_account: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ifsc_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub aadhaar_number: String,
    #[serde(deserialize_with = "null_as_default")]
    pub pan_number: String,
    #[serde(deserialize_with = "null_as_default")]
    pub uan_number: String,
    #[serde(deserialize_with = "null_as_default")]
    pub esic_number: String,

    // Address
    #[serde(deserialize_with = "null_as_default")]
    pub local_address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub permanent_address: String,
    #[serde(deserialize_with = "null_as_default")]
    pub pincode: String,

    #[serde(deserialize_with = "null_as_default")]
    pub education: Vec<Education>,
    #[serde(deserialize_with = "null_as_default")]
    pub employment: Vec<Employment>,
    #[serde(deserialize_with = "null_as_default")]
    pub references: Vec<Reference>,

    // Declaration
    #[serde(deserialize_with = "null_as_default")]
    pub is_related_to_company: YesNo,
    #[serde(deserialize_with = "null_as_default")]
    pub related_company_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub related_person_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub related_department: String,
    #[serde(deserialize_with = "null_as_default")]
    pub final_declaration: bool,
    #[serde(deserialize_with = "null_as_default")]
    pub signature: String,
    #[serde(deserialize_with = "null_as_default")]
    pub submission_date: String,
}

impl JoiningForm {
    pub fn full_name(&self) -> String {
        [&self.first_name, &self.middle_name, &self.last_name]
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub submitted_at: String,
    #[serde(flatten)]
    pub form: JoiningForm,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub title: String,
    pub department: String,
    pub status: String, // "Open", "On Hold", "Closed"
    #[serde(default)]
    pub applicants: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interview {
    pub id: String,
    pub name: String,
    pub role: String,
    pub time: String,
    pub date: String,
    #[serde(rename = "type")]
    pub kind: String, // "Video Call", "In Person", "Phone"
    pub status: String,
}

// SQL NULL columns arrive as JSON null.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// The backend hands out auto-increment ids; locally generated ones are strings.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}
