// Unit tests for story detail validation

mod common;

use chrono::NaiveDate;
use story_recorder::wizard::{age_on, Consent, MetadataError, StoryMetadata};

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
}

#[test]
fn test_valid_details() {
    assert_eq!(common::metadata().validate(today()), Ok(()));
}

#[test]
fn test_name_required_unless_anonymous() {
    let mut details = common::metadata();
    details.name = Some("   ".to_string());
    assert_eq!(details.validate(today()), Err(vec![MetadataError::NameRequired]));

    details.anonymous = true;
    details.name = None;
    assert_eq!(details.validate(today()), Ok(()));
}

#[test]
fn test_email_required_for_transcript() {
    let mut details = common::metadata();
    details.email = None;
    assert_eq!(details.validate(today()), Err(vec![MetadataError::EmailRequired]));

    details.transcript = false;
    assert_eq!(details.validate(today()), Ok(()));
}

#[test]
fn test_invalid_email() {
    let mut details = common::metadata();
    for bad in ["ada", "ada@", "@example.com", "ada@example", "ada@@example.com"] {
        details.email = Some(bad.to_string());
        assert_eq!(
            details.validate(today()),
            Err(vec![MetadataError::InvalidEmail]),
            "{} should be rejected",
            bad
        );
    }
}

#[test]
fn test_age_boundaries() {
    let mut details = common::metadata();

    details.birthdate = "2008-06-15".to_string();
    assert_eq!(details.validate(today()), Ok(()), "18th birthday today");

    details.birthdate = "2008-06-16".to_string();
    assert_eq!(details.validate(today()), Err(vec![MetadataError::Underage]));

    details.birthdate = "15/06/1990".to_string();
    assert_eq!(details.validate(today()), Err(vec![MetadataError::InvalidBirthdate]));
}

#[test]
fn test_age_on() {
    let birth = NaiveDate::from_ymd_opt(2000, 2, 29).unwrap();
    assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2018, 2, 28).unwrap()), 17);
    assert_eq!(age_on(birth, NaiveDate::from_ymd_opt(2018, 3, 1).unwrap()), 18);
}

#[test]
fn test_errors_are_collected_with_fields() {
    let details = StoryMetadata {
        name: None,
        story_title: None,
        anonymous: false,
        transcript: true,
        email: None,
        birthdate: String::new(),
    };

    let errors = details.validate(today()).unwrap_err();
    let fields: Vec<&str> = errors.iter().map(MetadataError::field).collect();
    assert_eq!(fields, vec!["name", "email", "birthdate"]);
}

#[test]
fn test_normalized_drops_email_without_transcript() {
    let mut details = common::metadata();
    details.transcript = false;
    assert_eq!(details.normalized().email, None);

    assert!(common::metadata().normalized().email.is_some());
}

#[test]
fn test_consent_requires_both_answers() {
    assert!(Consent { adult: true, terms_accepted: true }.is_granted());
    assert!(!Consent { adult: true, terms_accepted: false }.is_granted());
    assert!(!Consent { adult: false, terms_accepted: true }.is_granted());
    assert!(!Consent::default().is_granted());
}

#[test]
fn test_metadata_json_spelling() -> anyhow::Result<()> {
    let json = serde_json::to_value(common::metadata())?;
    assert_eq!(json["storyTitle"], "The chipped mug");
    assert_eq!(json["birthdate"], "1990-04-12");
    assert_eq!(json["transcript"], true);

    let anonymous: StoryMetadata =
        serde_json::from_str(r#"{"anonymous":true,"transcript":false,"birthdate":"1990-01-01"}"#)?;
    assert_eq!(anonymous.name, None);
    assert!(serde_json::to_value(&anonymous)?.get("name").is_none());
    Ok(())
}
