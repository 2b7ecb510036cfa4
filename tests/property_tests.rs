/// Property-based tests using proptest
/// Invariants that should hold for all inputs
use intake_api::config::AttachmentsMode;
use intake_api::form::{is_valid_instagram, is_valid_phone, is_valid_url, OnboardingForm, SelectedFile};
use intake_api::handlers::{file_extension, sanitize_field_name};
use intake_api::models::{CreateResponse, IntakePayload};
use intake_api::record_store::intake_fields;
use proptest::prelude::*;

fn optional_text() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("   ".to_string())),
        "[a-zA-Z0-9 .,!@_-]{1,40}".prop_map(Some),
    ]
}

// Property: the store field mapping never carries empty values
proptest! {
    #[test]
    fn field_mapping_never_contains_empty_values(
        company in optional_text(),
        contact in optional_text(),
        email in optional_text(),
        phone in optional_text(),
        notes in optional_text(),
        landing in optional_text(),
    ) {
        let payload = IntakePayload {
            company_name: company,
            contact_name: contact,
            email,
            phone,
            notes,
            links: intake_api::models::IntakeLinks {
                landing_pages: landing,
                ..Default::default()
            },
            ..Default::default()
        };

        for mode in [AttachmentsMode::Attachment, AttachmentsMode::Text] {
            let fields = intake_fields(&payload, mode).unwrap();
            for (name, value) in &fields {
                prop_assert!(!value.is_null(), "{} was null", name);
                if let Some(s) = value.as_str() {
                    prop_assert!(!s.trim().is_empty(), "{} was blank", name);
                }
                if let Some(a) = value.as_array() {
                    prop_assert!(!a.is_empty(), "{} was an empty list", name);
                }
            }
        }
    }
}

// Property: field-name sanitization emits only the allowed set and is
// idempotent
proptest! {
    #[test]
    fn sanitized_names_stay_in_the_allowed_set(name in "\\PC{0,60}") {
        let sanitized = sanitize_field_name(&name);
        prop_assert_eq!(sanitized.chars().count(), name.chars().count());
        prop_assert!(sanitized
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')));
        prop_assert_eq!(sanitize_field_name(&sanitized.clone()), sanitized);
    }

    #[test]
    fn extension_extraction_never_panics(name in "\\PC{0,60}") {
        let ext = file_extension(&name);
        if !ext.is_empty() {
            prop_assert!(ext.starts_with('.'));
            prop_assert!(name.ends_with(ext));
        }
    }
}

// Property: the validators accept arbitrary input without panicking
proptest! {
    #[test]
    fn validators_never_panic(input in "\\PC*") {
        let _ = is_valid_instagram(&input);
        let _ = is_valid_phone(&input);
        let _ = is_valid_url(&input);
    }

    #[test]
    fn long_or_period_terminated_handles_are_rejected(handle in "[a-zA-Z0-9._]{31,60}") {
        prop_assert!(!is_valid_instagram(&handle), "over 30 chars: {}", handle);
    }

    #[test]
    fn valid_handles_lose_nothing_to_a_trailing_period(handle in "[a-zA-Z0-9_]{1,29}") {
        prop_assert!(is_valid_instagram(&handle));
        prop_assert!(!is_valid_instagram(&format!("{}.", handle)), "trailing period should be rejected");
    }
}

// Property: file selection dedup is idempotent for any batch
proptest! {
    #[test]
    fn adding_the_same_selection_twice_changes_nothing(
        names in prop::collection::vec("[a-z]{1,10}", 1..5),
        sizes in prop::collection::vec(1usize..100, 1..5),
    ) {
        let files: Vec<SelectedFile> = names
            .iter()
            .zip(sizes.iter())
            .map(|(name, size)| {
                SelectedFile::new(format!("{}.pdf", name), "application/pdf", vec![b'x'; *size])
            })
            .collect();

        let mut form = OnboardingForm::new();
        form.add_selected_files("accessDocs", files.clone());
        let first = form.file_count("accessDocs");
        form.add_selected_files("accessDocs", files);
        prop_assert_eq!(form.file_count("accessDocs"), first);
    }
}

// Property: both create-response shapes normalize to the same record list
proptest! {
    #[test]
    fn create_response_shapes_normalize_identically(id in "[a-zA-Z0-9]{1,20}") {
        let single: CreateResponse =
            serde_json::from_value(serde_json::json!({"id": id})).unwrap();
        let batch: CreateResponse =
            serde_json::from_value(serde_json::json!({"records": [{"id": id}]})).unwrap();

        prop_assert_eq!(single.first_record_id(), batch.first_record_id());
        prop_assert_eq!(single.into_records(), batch.into_records());
    }
}
