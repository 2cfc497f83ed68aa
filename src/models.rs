use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{BoardError, Result};
use crate::status::{self, Status};

/// A job application as the client sees it: status is symbolic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: String, // backend-assigned, never generated here
    pub company_name: String,
    pub role_name: String,
    pub date_of_application: NaiveDate,
    pub status: Status,
    pub job_link: Option<String>,
    pub tailored: bool,
    pub job_description: Option<String>,
    pub referral: Option<String>,
}

/// An application without an id, used for create and full replace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationDraft {
    pub company_name: String,
    pub role_name: String,
    pub date_of_application: NaiveDate,
    pub status: Status,
    pub job_link: Option<String>,
    #[serde(default)]
    pub tailored: bool,
    pub job_description: Option<String>,
    pub referral: Option<String>,
}

/// Partial update. `None` means "leave unchanged"; clearing an optional
/// field needs a full replace.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPatch {
    pub company_name: Option<String>,
    pub role_name: Option<String>,
    pub date_of_application: Option<NaiveDate>,
    pub status: Option<Status>,
    pub job_link: Option<String>,
    pub tailored: Option<bool>,
    pub job_description: Option<String>,
    pub referral: Option<String>,
}

impl ApplicationPatch {
    pub fn status(status: Status) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.company_name {
            require_text("companyName", name)?;
        }
        if let Some(name) = &self.role_name {
            require_text("roleName", name)?;
        }
        if let Some(link) = &self.job_link {
            validate_link(link)?;
        }
        Ok(())
    }
}

impl ApplicationDraft {
    pub fn new(
        company_name: impl Into<String>,
        role_name: impl Into<String>,
        date_of_application: NaiveDate,
        status: Status,
    ) -> Self {
        Self {
            company_name: company_name.into(),
            role_name: role_name.into(),
            date_of_application,
            status,
            job_link: None,
            tailored: false,
            job_description: None,
            referral: None,
        }
    }

    /// Trims text fields and turns empty optional strings into `None`.
    pub fn normalized(mut self) -> Self {
        self.company_name = self.company_name.trim().to_string();
        self.role_name = self.role_name.trim().to_string();
        self.job_link = non_empty(self.job_link);
        self.job_description = non_empty(self.job_description);
        self.referral = non_empty(self.referral);
        self
    }

    pub fn validate(&self) -> Result<()> {
        require_text("companyName", &self.company_name)?;
        require_text("roleName", &self.role_name)?;
        if let Some(link) = &self.job_link {
            validate_link(link)?;
        }
        Ok(())
    }

    pub fn with_id(self, id: impl Into<String>) -> Application {
        Application {
            id: id.into(),
            company_name: self.company_name,
            role_name: self.role_name,
            date_of_application: self.date_of_application,
            status: self.status,
            job_link: self.job_link,
            tailored: self.tailored,
            job_description: self.job_description,
            referral: self.referral,
        }
    }
}

impl From<Application> for ApplicationDraft {
    fn from(app: Application) -> Self {
        Self {
            company_name: app.company_name,
            role_name: app.role_name,
            date_of_application: app.date_of_application,
            status: app.status,
            job_link: app.job_link,
            tailored: app.tailored,
            job_description: app.job_description,
            referral: app.referral,
        }
    }
}

impl Application {
    pub fn apply_patch(&mut self, patch: &ApplicationPatch) {
        if let Some(v) = &patch.company_name {
            self.company_name = v.clone();
        }
        if let Some(v) = &patch.role_name {
            self.role_name = v.clone();
        }
        if let Some(v) = patch.date_of_application {
            self.date_of_application = v;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = &patch.job_link {
            self.job_link = Some(v.clone());
        }
        if let Some(v) = patch.tailored {
            self.tailored = v;
        }
        if let Some(v) = &patch.job_description {
            self.job_description = Some(v.clone());
        }
        if let Some(v) = &patch.referral {
            self.referral = Some(v.clone());
        }
    }

    pub fn from_wire(wire: WireApplication) -> Result<Self> {
        Ok(Self {
            status: status::decode(wire.status)?,
            id: wire.id,
            company_name: wire.company_name,
            role_name: wire.role_name,
            date_of_application: wire.date_of_application,
            job_link: non_empty(wire.job_link),
            tailored: wire.tailored,
            job_description: wire.job_description,
            referral: wire.referral,
        })
    }
}

fn require_text(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BoardError::validation(field, "must not be empty"));
    }
    Ok(())
}

fn validate_link(link: &str) -> Result<()> {
    let url = reqwest::Url::parse(link)
        .map_err(|e| BoardError::validation("jobLink", format!("'{}' is not a valid URL: {}", link, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(BoardError::validation(
            "jobLink",
            format!("unsupported URL scheme '{}'", other),
        )),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

// --- Wire representation (status as backend ordinal) ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireApplication {
    #[serde(deserialize_with = "opaque_id")]
    pub id: String,
    pub company_name: String,
    pub role_name: String,
    #[serde(deserialize_with = "date_only")]
    pub date_of_application: NaiveDate,
    pub status: i64,
    #[serde(default)]
    pub job_link: Option<String>,
    #[serde(default)]
    pub tailored: bool,
    #[serde(default)]
    pub job_description: Option<String>,
    #[serde(default)]
    pub referral: Option<String>,
}

/// Body for POST and PUT. Absent optionals are sent as `null` so a PUT clears them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireDraft {
    pub company_name: String,
    pub role_name: String,
    pub date_of_application: NaiveDate,
    pub status: i64,
    pub job_link: Option<String>,
    pub tailored: bool,
    pub job_description: Option<String>,
    pub referral: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WirePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_application: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tailored: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub referral: Option<String>,
}

impl From<&ApplicationDraft> for WireDraft {
    fn from(draft: &ApplicationDraft) -> Self {
        Self {
            company_name: draft.company_name.clone(),
            role_name: draft.role_name.clone(),
            date_of_application: draft.date_of_application,
            status: status::encode(draft.status),
            job_link: draft.job_link.clone(),
            tailored: draft.tailored,
            job_description: draft.job_description.clone(),
            referral: draft.referral.clone(),
        }
    }
}

impl From<&ApplicationPatch> for WirePatch {
    fn from(patch: &ApplicationPatch) -> Self {
        Self {
            company_name: patch.company_name.clone(),
            role_name: patch.role_name.clone(),
            date_of_application: patch.date_of_application,
            status: patch.status.map(status::encode),
            job_link: patch.job_link.clone(),
            tailored: patch.tailored,
            job_description: patch.job_description.clone(),
            referral: patch.referral.clone(),
        }
    }
}

/// Backends return either a JSON string or a number for the id.
fn opaque_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
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

/// Accepts `2024-05-01` as well as `2024-05-01T00:00:00...`; the time part is dropped.
fn date_only<'de, D>(deserializer: D) -> std::result::Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let date_part = raw.split('T').next().unwrap_or(&raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").map_err(serde::de::Error::custom)
}

// --- Listing ---

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub status: Option<Status>,
    /// 1-based.
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// One record of a list response that could not be decoded.
#[derive(Debug)]
pub struct RecordFailure {
    pub id: String,
    pub error: BoardError,
}

/// Result of decoding a list response record by record.
#[derive(Debug, Default)]
pub struct DecodedPage {
    pub items: Vec<Application>,
    pub failures: Vec<RecordFailure>,
}

impl DecodedPage {
    pub fn decode(records: Vec<WireApplication>) -> Self {
        let mut page = DecodedPage::default();
        for record in records {
            let id = record.id.clone();
            match Application::from_wire(record) {
                Ok(app) => page.items.push(app),
                Err(error) => {
                    tracing::warn!(id = %id, error = %error, "skipping undecodable record");
                    page.failures.push(RecordFailure { id, error });
                }
            }
        }
        page
    }
}
