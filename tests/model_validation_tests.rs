use validator::Validate;

use inkpress::models::{
    DeletePostsRequest, RegisterRequest, SubscribeRequest, UpdatePostRequest, slugify,
};

#[test]
fn slug_derivation_is_deterministic_and_case_insensitive() {
    assert_eq!(slugify("Hello World"), "hello-world");
    assert_eq!(slugify("hello world"), "hello-world");
    assert_eq!(slugify("Hello World"), slugify("hello world"));
}

#[test]
fn slug_collapses_punctuation_and_whitespace_runs() {
    assert_eq!(slugify("Rust & Tokio!!"), "rust-tokio");
    assert_eq!(slugify("  spaced   out  "), "spaced-out");
    assert_eq!(slugify("Üben macht den Meister"), "üben-macht-den-meister");
}

#[test]
fn register_request_rejects_bad_fields() {
    let bad_email = RegisterRequest {
        username: "alice".to_string(),
        email: "not-an-email".to_string(),
        password: "longenough".to_string(),
    };
    assert!(bad_email.validate().is_err());

    let short_password = RegisterRequest {
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        password: "short".to_string(),
    };
    assert!(short_password.validate().is_err());

    let one_letter_name = RegisterRequest {
        username: "a".to_string(),
        email: "alice@example.com".to_string(),
        password: "longenough".to_string(),
    };
    assert!(one_letter_name.validate().is_err());

    let good = RegisterRequest {
        username: "alice".to_string(),
        email: "alice@example.com".to_string(),
        password: "longenough".to_string(),
    };
    assert!(good.validate().is_ok());
}

#[test]
fn partial_post_update_with_no_fields_is_valid() {
    let empty = UpdatePostRequest::default();
    assert!(empty.validate().is_ok());

    let bad_title = UpdatePostRequest {
        title: Some("x".to_string()),
        ..UpdatePostRequest::default()
    };
    assert!(bad_title.validate().is_err());
}

#[test]
fn batch_payloads_reject_empty_id_lists() {
    let empty = DeletePostsRequest { posts_ids: vec![] };
    assert!(empty.validate().is_err());
}

#[test]
fn subscribe_request_requires_valid_email() {
    let bad = SubscribeRequest {
        email: "nope".to_string(),
    };
    assert!(bad.validate().is_err());
}
