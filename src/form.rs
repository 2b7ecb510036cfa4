//! Onboarding form state machine.
//!
//! Everything the multi-section intake form tracks between keystrokes:
//! field values, per-field validation messages, accordion open state,
//! file-selection bookkeeping, section completion, and the pre-submit
//! required checks. Pure state transitions except for [`OnboardingForm::submit`],
//! which posts the assembled multipart payload.

use crate::phone::PhoneValue;
use regex::Regex;
use reqwest::multipart::{Form, Part};
use std::collections::BTreeMap;

/// File extensions the pickers accept, compared case-insensitively.
pub const ACCEPTED_FILE_EXTENSIONS: [&str; 7] =
    [".pdf", ".doc", ".docx", ".md", ".txt", ".csv", ".xlsx"];

pub const SECTION_COUNT: usize = 5;

/// Link-collection inputs of the integrations section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkValues {
    pub landing_pages: String,
    pub calendars: String,
    pub webinar_links: String,
    pub forms_surveys: String,
    pub other_assets: String,
}

/// Current text of every form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormValues {
    pub company_name: String,
    pub contact_name: String,
    pub email: String,
    pub phone: String,
    pub website: String,
    pub instagram: String,
    pub crm: String,
    pub email_platform: String,
    pub links: LinkValues,
    pub brand_voice: String,
    pub sales_pitch: String,
    pub offer_info: String,
    pub brand_faq: String,
    pub product_faq: String,
    pub sales_guide: String,
    pub lead_qualification: String,
    pub credentials: String,
    pub notes: String,
    pub loom_url: String,
}

/// One file currently attached to a file input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub size: u64,
    pub content_type: String,
    pub data: Vec<u8>,
}

impl SelectedFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, data: Vec<u8>) -> Self {
        let size = data.len() as u64;
        Self {
            name: name.into(),
            size,
            content_type: content_type.into(),
            data,
        }
    }
}

/// Field-level validation messages, shown under the inputs they belong to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub instagram: Option<String>,
    pub website: Option<String>,
}

pub fn is_valid_email(value: &str) -> bool {
    Regex::new(r".+@.+\..+").unwrap().is_match(value)
}

/// Loose phone shape check; real validation happens in the phone widget.
pub fn is_valid_phone(value: &str) -> bool {
    Regex::new(r"^\+?[0-9()\-\s]{7,20}$").unwrap().is_match(value)
}

/// Letters, digits, periods, underscores; at most 30 characters; must not
/// end in a period. Leading `@`s are stripped before this runs.
pub fn is_valid_instagram(value: &str) -> bool {
    Regex::new(r"^[a-zA-Z0-9._]{1,30}$").unwrap().is_match(value) && !value.ends_with('.')
}

pub fn is_valid_url(value: &str) -> bool {
    Regex::new(r"^(https?://)?([\w-]+\.)+[\w-]{2,}(/[\w\-._~:/?#\[\]@!$&'()*+,;=.]+)?$")
        .unwrap()
        .is_match(value)
}

/// The onboarding form: five accordion sections, a phone widget, managed
/// file selections, and transient validation state.
#[derive(Debug, Clone)]
pub struct OnboardingForm {
    values: FormValues,
    phone: PhoneValue,
    files_by_field: BTreeMap<String, Vec<SelectedFile>>,
    file_counts: BTreeMap<String, usize>,
    open_sections: [bool; SECTION_COUNT],
    field_errors: FieldErrors,
    error: Option<String>,
}

impl OnboardingForm {
    pub fn new() -> Self {
        Self {
            values: FormValues::default(),
            phone: PhoneValue::empty(),
            files_by_field: BTreeMap::new(),
            file_counts: BTreeMap::new(),
            open_sections: [true, false, false, false, false],
            field_errors: FieldErrors::default(),
            error: None,
        }
    }

    pub fn values(&self) -> &FormValues {
        &self.values
    }

    pub fn phone(&self) -> &PhoneValue {
        &self.phone
    }

    pub fn field_errors(&self) -> &FieldErrors {
        &self.field_errors
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn open_sections(&self) -> &[bool; SECTION_COUNT] {
        &self.open_sections
    }

    pub fn file_count(&self, field_key: &str) -> usize {
        self.file_counts.get(field_key).copied().unwrap_or(0)
    }

    pub fn files(&self, field_key: &str) -> &[SelectedFile] {
        self.files_by_field
            .get(field_key)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn toggle_section(&mut self, index: usize) {
        if index < SECTION_COUNT {
            self.open_sections[index] = !self.open_sections[index];
        }
    }

    /// Applies a change to the named input, then re-validates it.
    ///
    /// Names use the wire spelling (`companyName`, `links.landingPages`, ...).
    /// The Instagram input strips `@` before storing, so a pasted handle
    /// validates the same as a typed one.
    pub fn set_field(&mut self, name: &str, value: &str) {
        if let Some(link_key) = name.strip_prefix("links.") {
            match link_key {
                "landingPages" => self.values.links.landing_pages = value.to_string(),
                "calendars" => self.values.links.calendars = value.to_string(),
                "webinarLinks" => self.values.links.webinar_links = value.to_string(),
                "formsSurveys" => self.values.links.forms_surveys = value.to_string(),
                "otherAssets" => self.values.links.other_assets = value.to_string(),
                _ => {}
            }
            return;
        }

        let value = if name == "instagram" {
            value.replace('@', "")
        } else {
            value.to_string()
        };

        match name {
            "companyName" => self.values.company_name = value.clone(),
            "contactName" => self.values.contact_name = value.clone(),
            "email" => self.values.email = value.clone(),
            "phone" => self.values.phone = value.clone(),
            "website" => self.values.website = value.clone(),
            "instagram" => self.values.instagram = value.clone(),
            "crm" => self.values.crm = value.clone(),
            "emailPlatform" => self.values.email_platform = value.clone(),
            "brandVoice" => self.values.brand_voice = value.clone(),
            "salesPitch" => self.values.sales_pitch = value.clone(),
            "offerInfo" => self.values.offer_info = value.clone(),
            "brandFAQ" => self.values.brand_faq = value.clone(),
            "productFAQ" => self.values.product_faq = value.clone(),
            "salesGuide" => self.values.sales_guide = value.clone(),
            "leadQualification" => self.values.lead_qualification = value.clone(),
            "credentials" => self.values.credentials = value.clone(),
            "notes" => self.values.notes = value.clone(),
            "loomUrl" => self.values.loom_url = value.clone(),
            _ => return,
        }

        self.validate_field(name, &value);
    }

    /// Updates the phone widget value and mirrors the raw string into the
    /// plain `phone` field for transport.
    pub fn set_phone(&mut self, value: PhoneValue) {
        self.values.phone = value.raw.clone();
        self.field_errors.phone = if !value.raw.is_empty() && value.e164.is_none() {
            Some("Enter a valid phone number".to_string())
        } else {
            None
        };
        self.phone = value;
    }

    /// Sets or clears the field-level message; never blocks typing.
    fn validate_field(&mut self, name: &str, value: &str) {
        match name {
            "email" => {
                let ok = value.is_empty() || is_valid_email(value);
                self.field_errors.email =
                    (!ok).then(|| "Please enter a valid email address".to_string());
            }
            "instagram" => {
                let stripped = value.replace('@', "");
                let ok = stripped.is_empty() || is_valid_instagram(&stripped);
                self.field_errors.instagram = (!ok).then(|| {
                    "Please use letters, numbers, and periods only (max 30 characters)".to_string()
                });
            }
            "website" => {
                let ok = value.is_empty() || is_valid_url(value);
                self.field_errors.website =
                    (!ok).then(|| "Please enter a valid website URL".to_string());
            }
            _ => {}
        }
    }

    /// Adds a picker selection to a file field.
    ///
    /// Filters by the accepted-extension allowlist, then merges into the
    /// existing selection deduplicated by filename+size, so re-selecting
    /// the same file is a no-op.
    pub fn add_selected_files(&mut self, field_key: &str, incoming: Vec<SelectedFile>) {
        let entry = self.files_by_field.entry(field_key.to_string()).or_default();
        for file in incoming {
            if !has_accepted_extension(&file.name) {
                continue;
            }
            let duplicate = entry
                .iter()
                .any(|existing| existing.name == file.name && existing.size == file.size);
            if !duplicate {
                entry.push(file);
            }
        }
        let count = entry.len();
        self.file_counts.insert(field_key.to_string(), count);
    }

    /// Removes one file by index; the selection forgets it entirely.
    pub fn remove_file(&mut self, field_key: &str, index: usize) {
        if let Some(files) = self.files_by_field.get_mut(field_key) {
            if index < files.len() {
                files.remove(index);
            }
            let count = files.len();
            self.file_counts.insert(field_key.to_string(), count);
        }
    }

    pub fn clear_files(&mut self, field_key: &str) {
        self.files_by_field.insert(field_key.to_string(), Vec::new());
        self.file_counts.insert(field_key.to_string(), 0);
    }

    pub fn clear_all_files(&mut self) {
        self.files_by_field.clear();
        self.file_counts.clear();
    }

    fn text_or_file(&self, text: &str, file_key: &str) -> bool {
        !text.is_empty() || self.file_count(file_key) > 0
    }

    /// Per-section completeness, used only for the UI affordance.
    pub fn section_completed(&self, index: usize) -> bool {
        let v = &self.values;
        match index {
            // Brand info: identity fields required, phone/website only
            // checked when present.
            0 => {
                if v.company_name.is_empty()
                    || v.contact_name.is_empty()
                    || v.email.is_empty()
                    || !is_valid_email(&v.email)
                {
                    return false;
                }
                if v.instagram.is_empty() || !is_valid_instagram(&v.instagram) {
                    return false;
                }
                if !v.phone.is_empty() && !is_valid_phone(&v.phone) {
                    return false;
                }
                if !v.website.is_empty() && !is_valid_url(&v.website) {
                    return false;
                }
                true
            }
            1 => {
                self.text_or_file(&v.brand_voice, "brandVoiceFile")
                    && self.text_or_file(&v.sales_pitch, "salesPitchFile")
                    && self.text_or_file(&v.offer_info, "offerInfoFile")
            }
            2 => {
                self.text_or_file(&v.brand_faq, "brandFAQFile")
                    && self.text_or_file(&v.product_faq, "productFAQFile")
                    && self.text_or_file(&v.sales_guide, "salesGuideFile")
                    && self.text_or_file(&v.lead_qualification, "leadQualificationFile")
            }
            // Only the CRM selection gates completion here; the link fields
            // are informational even when malformed.
            3 => !v.crm.is_empty(),
            4 => {
                if !v.loom_url.is_empty() && !is_valid_url(&v.loom_url) {
                    return false;
                }
                !v.notes.is_empty() || !v.loom_url.is_empty()
            }
            _ => false,
        }
    }

    /// Pre-submit required checks, in fixed order, stopping at the first
    /// failure. On failure the message is recorded and the offending
    /// section opened.
    pub fn validate_required(&mut self) -> bool {
        if self.values.instagram.is_empty() {
            return self.block("Instagram Handle is required", 0);
        }

        let missing = |text: &str, file_key: &str| text.is_empty() && self.file_count(file_key) == 0;
        let checks: [(bool, &str, usize); 7] = [
            (
                missing(&self.values.brand_voice, "brandVoiceFile"),
                "Brand Voice Guide is required (paste or upload)",
                1,
            ),
            (
                missing(&self.values.sales_pitch, "salesPitchFile"),
                "Sales Pitch Script is required (paste or upload)",
                1,
            ),
            (
                missing(&self.values.offer_info, "offerInfoFile"),
                "Offer Information is required (paste or upload)",
                1,
            ),
            (
                missing(&self.values.brand_faq, "brandFAQFile"),
                "Brand FAQ is required (paste or upload)",
                2,
            ),
            (
                missing(&self.values.product_faq, "productFAQFile"),
                "Product FAQ is required (paste or upload)",
                2,
            ),
            (
                missing(&self.values.sales_guide, "salesGuideFile"),
                "Sales Guide is required (paste or upload)",
                2,
            ),
            (
                missing(&self.values.lead_qualification, "leadQualificationFile"),
                "Lead Qualification criteria is required (paste or upload)",
                2,
            ),
        ];
        for (failed, message, section) in checks {
            if failed {
                return self.block(message, section);
            }
        }

        self.error = None;
        true
    }

    fn block(&mut self, message: &str, section: usize) -> bool {
        self.error = Some(message.to_string());
        self.open_sections[section] = true;
        false
    }

    /// The transport payload: every text value under its wire name, the
    /// phone companions, then the managed file selections.
    pub fn submission_parts(&self) -> (Vec<(String, String)>, Vec<(String, SelectedFile)>) {
        let v = &self.values;
        let mut texts: Vec<(String, String)> = vec![
            ("companyName".into(), v.company_name.clone()),
            ("contactName".into(), v.contact_name.clone()),
            ("email".into(), v.email.clone()),
            ("phone".into(), v.phone.clone()),
            ("website".into(), v.website.clone()),
            ("instagram".into(), v.instagram.clone()),
            ("crm".into(), v.crm.clone()),
            ("emailPlatform".into(), v.email_platform.clone()),
            ("brandVoice".into(), v.brand_voice.clone()),
            ("salesPitch".into(), v.sales_pitch.clone()),
            ("offerInfo".into(), v.offer_info.clone()),
            ("brandFAQ".into(), v.brand_faq.clone()),
            ("productFAQ".into(), v.product_faq.clone()),
            ("salesGuide".into(), v.sales_guide.clone()),
            ("leadQualification".into(), v.lead_qualification.clone()),
            ("credentials".into(), v.credentials.clone()),
            ("notes".into(), v.notes.clone()),
            ("loomUrl".into(), v.loom_url.clone()),
            ("links.landingPages".into(), v.links.landing_pages.clone()),
            ("links.calendars".into(), v.links.calendars.clone()),
            ("links.webinarLinks".into(), v.links.webinar_links.clone()),
            ("links.formsSurveys".into(), v.links.forms_surveys.clone()),
            ("links.otherAssets".into(), v.links.other_assets.clone()),
        ];
        texts.extend(self.phone.transport_fields("phone"));

        let files = self
            .files_by_field
            .iter()
            .flat_map(|(field, files)| {
                files.iter().map(move |file| (field.clone(), file.clone()))
            })
            .collect();

        (texts, files)
    }

    pub fn to_multipart(&self) -> Form {
        let (texts, files) = self.submission_parts();
        let mut form = Form::new();
        for (name, value) in texts {
            form = form.text(name, value);
        }
        for (field, file) in files {
            let part = match Part::bytes(file.data.clone())
                .file_name(file.name.clone())
                .mime_str(&file.content_type)
            {
                Ok(part) => part,
                Err(_) => Part::bytes(file.data).file_name(file.name),
            };
            form = form.part(field, part);
        }
        form
    }

    /// Runs the required checks, posts the multipart payload, and resets
    /// the form on success. Open/closed section state is kept as-is.
    pub async fn submit(
        &mut self,
        client: &reqwest::Client,
        endpoint: &str,
    ) -> anyhow::Result<serde_json::Value> {
        if !self.validate_required() {
            anyhow::bail!(self
                .error
                .clone()
                .unwrap_or_else(|| "Validation failed".to_string()));
        }

        let response = client
            .post(endpoint)
            .multipart(self.to_multipart())
            .send()
            .await?;
        if !response.status().is_success() {
            anyhow::bail!("Submission failed");
        }
        let body = response.json().await?;

        self.reset();
        Ok(body)
    }

    /// Back to defaults: values, files, counts, phone, and messages.
    pub fn reset(&mut self) {
        self.values = FormValues::default();
        self.files_by_field.clear();
        self.file_counts.clear();
        self.phone = PhoneValue::empty();
        self.field_errors = FieldErrors::default();
        self.error = None;
    }
}

impl Default for OnboardingForm {
    fn default() -> Self {
        Self::new()
    }
}

fn has_accepted_extension(filename: &str) -> bool {
    let Some(dot) = filename.rfind('.') else {
        return false;
    };
    let ext = filename[dot..].to_lowercase();
    ACCEPTED_FILE_EXTENSIONS.contains(&ext.as_str())
}
