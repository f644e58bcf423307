use serial_test::serial;
use statewatch::config::Config;
use statewatch::handlers::{registry, ConfigError, HandlerKind, RegistryError, SetupError};
use std::env;

#[test]
fn test_every_registered_name_resolves() {
    let names = [
        "default",
        "slack",
        "slackwebhook",
        "ms-teams",
        "cloudevent",
        "mattermost",
        "flock",
        "webhook",
        "lark",
        "telegram",
        "smtp",
    ];
    for name in names {
        let handler = registry::resolve(name).unwrap();
        assert_eq!(handler.name(), name);
    }
    assert_eq!(HandlerKind::ALL.len(), names.len());
}

#[test]
fn test_unknown_name_is_rejected_before_construction() {
    let err = match registry::resolve("hipchat") {
        Err(e) => e,
        Ok(_) => panic!("hipchat should not resolve"),
    };
    assert_eq!(
        err,
        RegistryError::UnknownHandler {
            name: "hipchat".to_string()
        }
    );
}

#[test]
fn test_init_unknown_name_is_a_registry_error() {
    let result = registry::init_handler("MS-Teams", &Config::default());
    assert!(matches!(result, Err(SetupError::Registry(_))));
}

#[test]
fn test_default_handler_needs_no_configuration() {
    let handler = registry::init_handler("default", &Config::default()).unwrap();
    assert_eq!(handler.name(), "default");
}

#[test]
#[serial]
fn test_cloudevent_requires_url() {
    env::remove_var("KW_CLOUDEVENT_URL");

    let result = registry::init_handler("cloudevent", &Config::default());

    match result {
        Err(SetupError::Config(ConfigError::Missing { reason, .. })) => {
            assert_eq!(reason, "Missing cloudevent url")
        }
        Err(e) => panic!("unexpected error: {e}"),
        Ok(_) => panic!("cloudevent initialized without a url"),
    }
}

#[tokio::test]
#[serial]
async fn test_smtp_requires_recipient_sender_and_relay() {
    env::remove_var("KW_SMTP_TO");
    env::remove_var("KW_SMTP_FROM");
    env::remove_var("KW_SMTP_SMARTHOST");
    let mut config = Config::default();
    config.handler.smtp.to = "ops@example.com".to_string();

    let err = match registry::init_handler("smtp", &config) {
        Err(e) => e,
        Ok(_) => panic!("smtp initialized without a sender"),
    };
    assert!(err.to_string().starts_with("\nMissing smtp to, from or smarthost\n"));

    config.handler.smtp.from = "statewatch@example.com".to_string();
    config.handler.smtp.smarthost = "smtp.example.com:587".to_string();
    assert!(registry::init_handler("smtp", &config).is_ok());
}

#[test]
#[serial]
fn test_slack_credentials_fall_back_to_environment() {
    env::set_var("KW_SLACK_TOKEN", "xoxb-env");
    env::set_var("KW_SLACK_CHANNEL", "#env");

    let result = registry::init_handler("slack", &Config::default());

    env::remove_var("KW_SLACK_TOKEN");
    env::remove_var("KW_SLACK_CHANNEL");
    assert!(result.is_ok());
}

#[test]
#[serial]
fn test_missing_message_carries_remediation() {
    env::remove_var("KW_MSTEAMS_WEBHOOKURL");

    let err = match registry::init_handler("ms-teams", &Config::default()) {
        Err(e) => e,
        Ok(_) => panic!("ms-teams initialized without a webhook url"),
    };

    let message = err.to_string();
    assert!(message.starts_with("\nMissing MS teams webhook URL\n\n"));
    assert!(message.contains("KW_MSTEAMS_WEBHOOKURL"));
    assert!(message.ends_with("Command line flags will override environment variables\n\n"));
}
