use base64::Engine;
use flowplane_secrets::config::{EncryptionConfig, KeyConfig, ProviderConfig};
use flowplane_secrets::secrets::{AeadAlgorithm, AeadProvider, EncryptionProvider, ProviderManager};
use flowplane_secrets::{
    FlowplaneError, InMemorySecretStore, SecretParams, SecretService, SecretSource, SecretStore,
    SecretString,
};
use std::sync::Arc;

fn key(version: &str, byte: u8) -> KeyConfig {
    KeyConfig {
        version: version.to_string(),
        key: SecretString::new(base64::engine::general_purpose::STANDARD.encode([byte; 32])),
    }
}

fn provider(name: &str, version: &str, byte: u8) -> Arc<dyn EncryptionProvider> {
    Arc::new(AeadProvider::new(name, AeadAlgorithm::Aes256Gcm, &[key(version, byte)]).unwrap())
}

fn service_with(store: Arc<InMemorySecretStore>, manager: ProviderManager) -> SecretService {
    SecretService::new(store, Arc::new(manager))
}

fn service() -> SecretService {
    let manager = ProviderManager::new(vec![provider("aesgcm", "v1", 1)], "aesgcm").unwrap();
    service_with(Arc::new(InMemorySecretStore::new()), manager)
}

fn secret_yaml(name: &str, value: &str) -> SecretParams {
    SecretParams::new(
        format!(
            r#"apiVersion: flowplane.io/v1alpha1
kind: Secret
metadata:
  name: {name}
spec:
  displayName: {name} credentials
  description: Upstream credential
  value: "{value}"
"#
        ),
        "application/yaml",
    )
}

fn secret_json(name: &str, value: &str) -> SecretParams {
    let body = serde_json::json!({
        "apiVersion": "flowplane.io/v1alpha1",
        "kind": "Secret",
        "metadata": { "name": name },
        "spec": { "value": value }
    });
    SecretParams::new(body.to_string(), "application/json; charset=utf-8")
        .with_correlation_id("req-123")
}

#[test]
fn create_then_get_roundtrips_the_value() {
    let service = service();

    let created = service.create_secret(secret_yaml("payments-key", "sk_live_abc")).unwrap();
    assert_eq!(created.handle, "payments-key");
    assert_eq!(created.value(), Some("sk_live_abc"));
    assert_eq!(created.display_name.as_deref(), Some("payments-key credentials"));

    let fetched = service.get("payments-key").unwrap();
    assert_eq!(fetched.id, created.id);
    assert_eq!(fetched.value(), Some("sk_live_abc"));
}

#[test]
fn json_documents_are_accepted() {
    let service = service();
    let created = service.create_secret(secret_json("db-password", "hunter2")).unwrap();
    assert_eq!(created.value(), Some("hunter2"));
}

#[test]
fn update_keeps_identity_and_reencrypts() {
    let service = service();
    let created = service.create_secret(secret_yaml("api-key", "first")).unwrap();

    let updated = service.update_secret("api-key", secret_yaml("api-key", "second")).unwrap();

    assert_eq!(updated.id, created.id);
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at >= created.updated_at);
    assert_ne!(updated.ciphertext, created.ciphertext);
    assert_eq!(service.get("api-key").unwrap().value(), Some("second"));
}

#[test]
fn update_can_rename() {
    let service = service();
    let created = service.create_secret(secret_yaml("old-name", "value")).unwrap();

    let renamed = service.update_secret("old-name", secret_yaml("new-name", "value")).unwrap();

    assert_eq!(renamed.id, created.id);
    assert_eq!(renamed.handle, "new-name");
    assert!(service.get("old-name").unwrap_err().is_not_found());
    assert_eq!(service.get_secrets().unwrap(), vec!["new-name"]);
}

#[test]
fn rename_onto_existing_handle_conflicts() {
    let service = service();
    service.create_secret(secret_yaml("first", "one")).unwrap();
    service.create_secret(secret_yaml("second", "two")).unwrap();

    let err = service.update_secret("first", secret_yaml("second", "three")).unwrap_err();

    assert!(matches!(err, FlowplaneError::Conflict { .. }));
    assert_eq!(err.status_code(), 409);
    assert_eq!(service.get("first").unwrap().value(), Some("one"));
    assert_eq!(service.get("second").unwrap().value(), Some("two"));
}

#[test]
fn update_of_missing_secret_is_not_found() {
    let service = service();
    let err = service.update_secret("ghost", secret_yaml("ghost", "boo")).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn delete_removes_secret() {
    let service = service();
    service.create_secret(secret_yaml("temp", "value")).unwrap();

    service.delete("temp").unwrap();

    assert!(service.get("temp").unwrap_err().is_not_found());
    let err = service.delete("temp").unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.status_code(), 404);
}

#[test]
fn get_secrets_lists_handles() {
    let service = service();
    for name in ["gamma", "alpha", "beta"] {
        service.create_secret(secret_yaml(name, "v")).unwrap();
    }

    assert_eq!(service.get_secrets().unwrap(), vec!["alpha", "beta", "gamma"]);
}

#[test]
fn value_size_limit_is_ten_kibibytes() {
    let service = service();

    let at_limit = "a".repeat(10 * 1024);
    assert!(service.create_secret(secret_json("at-limit", &at_limit)).is_ok());

    let over_limit = "a".repeat(10 * 1024 + 1);
    let err = service.create_secret(secret_json("over-limit", &over_limit)).unwrap_err();
    let errors = err.validation_errors().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field, "spec.value");
    assert!(!service.get_secrets().unwrap().contains(&"over-limit".to_string()));
}

#[test]
fn invalid_documents_report_every_field() {
    let service = service();
    let params = SecretParams::new(
        r#"{"apiVersion": "v2", "kind": "Token", "metadata": {"name": ""}, "spec": {"value": ""}}"#,
        "application/json",
    );

    let err = service.create_secret(params).unwrap_err();
    assert_eq!(err.status_code(), 400);
    let fields: Vec<&str> = err.validation_errors().unwrap().iter().map(|e| e.field.as_str()).collect();
    assert_eq!(fields, vec!["apiVersion", "kind", "metadata.name", "spec.value"]);
}

#[test]
fn unsupported_content_type_is_rejected() {
    let service = service();
    let err = service
        .create_secret(SecretParams::new("value=abc", "application/x-www-form-urlencoded"))
        .unwrap_err();
    assert_eq!(err.validation_errors().unwrap()[0].field, "contentType");
}

#[test]
fn provider_rotation_keeps_old_secrets_readable() {
    let store = Arc::new(InMemorySecretStore::new());

    let before = service_with(
        store.clone(),
        ProviderManager::new(vec![provider("p1", "v1", 1)], "p1").unwrap(),
    );
    before.create_secret(secret_yaml("legacy", "old-value")).unwrap();

    let after = service_with(
        store.clone(),
        ProviderManager::new(vec![provider("p2", "v2", 2), provider("p1", "v1", 1)], "p2").unwrap(),
    );

    let legacy = after.get("legacy").unwrap();
    assert_eq!(legacy.value(), Some("old-value"));
    assert_eq!(legacy.provider, "p1");
    assert!(after.needs_rotation(&legacy));

    let fresh = after.create_secret(secret_yaml("fresh", "new-value")).unwrap();
    assert_eq!(fresh.provider, "p2");
    assert_eq!(fresh.key_version, "v2");
    assert!(!after.needs_rotation(&fresh));

    let rewritten = after.update_secret("legacy", secret_yaml("legacy", "old-value")).unwrap();
    assert_eq!(rewritten.provider, "p2");
    assert!(!after.needs_rotation(&rewritten));
}

#[test]
fn removing_a_provider_makes_its_secrets_unreadable() {
    let store = Arc::new(InMemorySecretStore::new());
    let before = service_with(
        store.clone(),
        ProviderManager::new(vec![provider("p1", "v1", 1)], "p1").unwrap(),
    );
    before.create_secret(secret_yaml("legacy", "old-value")).unwrap();

    let after =
        service_with(store, ProviderManager::new(vec![provider("p2", "v2", 2)], "p2").unwrap());

    let err = after.get("legacy").unwrap_err();
    assert!(matches!(err, FlowplaneError::Decryption { .. }));
    assert!(!err.to_string().contains("old-value"));
}

#[test]
fn store_never_holds_plaintext() {
    let store = Arc::new(InMemorySecretStore::new());
    let service = service_with(
        store.clone(),
        ProviderManager::new(vec![provider("aesgcm", "v1", 9)], "aesgcm").unwrap(),
    );
    service.create_secret(secret_yaml("api-key", "plain-text-value")).unwrap();

    let record = store.get_secret("api-key").unwrap();
    assert!(!record.ciphertext.contains("plain-text-value"));
    assert!(!serde_json::to_string(&record).unwrap().contains("plain-text-value"));
}

#[test]
fn service_from_configuration() {
    let config = EncryptionConfig {
        primary_provider: "chacha".to_string(),
        providers: vec![ProviderConfig {
            name: "chacha".to_string(),
            algorithm: AeadAlgorithm::ChaCha20Poly1305,
            keys: vec![key("2025-01", 5)],
        }],
    };

    let service =
        SecretService::from_config(Arc::new(InMemorySecretStore::new()), &config).unwrap();
    let created = service.create_secret(secret_yaml("api-key", "value")).unwrap();

    assert_eq!(created.provider, "chacha");
    assert_eq!(created.key_version, "2025-01");
    assert_eq!(service.resolve_secret("api-key").unwrap().expose_secret(), "value");
}
