//! Integration tests for building a service from configuration files.

use std::sync::Arc;

use tempfile::TempDir;
use tollgate_approval::ToolCall;
use tollgate_config::Config;
use tollgate_policy::{MemoryProposalStore, PolicyError, PolicyService};
use tollgate_test::{CountingBackend, DENY_SHELL, RecordingNotifier, RuleRunner};

fn write(dir: &TempDir, name: &str, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn build(config: &Config) -> Result<PolicyService, PolicyError> {
    PolicyService::from_config(
        config,
        Arc::new(MemoryProposalStore::new()),
        Some(Arc::new(RuleRunner::new())),
        Some(Arc::new(RecordingNotifier::new())),
        Arc::new(CountingBackend::new()),
    )
}

#[tokio::test]
async fn policy_loaded_from_source_path() {
    let dir = TempDir::new().unwrap();
    let policy = write(&dir, "policy.toml", DENY_SHELL);
    let config_path = write(
        &dir,
        "config.toml",
        &format!(
            "[policy]\nagent_id = \"builder\"\nsource_path = {:?}\ninitial_version = 7\n\n[gateway]\ncall_id_prefix = \"t:\"\n",
            policy.display().to_string()
        ),
    );

    let config = Config::load_file(&config_path).unwrap();
    let service = build(&config).unwrap();

    assert_eq!(service.engine().agent_id().as_str(), "builder");
    let active = service.active_policy();
    assert_eq!(active.version, 7);
    assert_eq!(active.source, DENY_SHELL);

    let err = service
        .call_tool(ToolCall::new("sandbox_exec"))
        .await
        .unwrap_err();
    assert!(err.is_abort());
    assert!(service.call_tool(ToolCall::new("echo")).await.is_ok());
}

#[tokio::test]
async fn missing_policy_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.policy.source_path = Some(dir.path().join("absent.toml"));

    let err = build(&config).unwrap_err();

    assert!(matches!(err, PolicyError::SourceRead { .. }), "{err}");
}

#[tokio::test]
async fn inline_source_with_self_check_disabled() {
    let mut config = Config::default();
    config.policy.source = Some(DENY_SHELL.to_owned());
    config.policy.self_check = false;

    let service = build(&config).unwrap();
    assert!(!service.engine().should_self_check());

    // Without a self-check, broken text is accepted and only fails on use.
    service.set_policy_text("[[[").await.unwrap();
    assert!(service.call_tool(ToolCall::new("echo")).await.is_err());
}

#[test]
fn conflicting_policy_sources_fail_validation() {
    let dir = TempDir::new().unwrap();
    let path = write(
        &dir,
        "config.toml",
        "[policy]\nsource = \"default = 'allow'\"\nsource_path = \"/tmp/policy.toml\"\n",
    );

    assert!(Config::load_file(&path).is_err());
}
