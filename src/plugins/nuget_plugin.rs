//! NuGet Plugin - pushes `.nupkg` artifacts with `dotnet nuget push`
//!
//! The plugin only acts on the post-publish hook. A push runs through:
//! - configuration resolution and validation (API key, source URL, package path, timeout)
//! - package discovery
//! - either a dry-run report or a sequential push that stops at the first failure
//!
//! Partial progress is always reported through the response outputs.

use crate::core::config::NuGetConfig;
use crate::core::error::PluginError;
use crate::core::traits::{
    ExecuteRequest, ExecuteResponse, Hook, Plugin, PluginInfo, RawConfig, ReleaseContext,
    ValidateResponse,
};
use crate::plugins::package_locator::find_packages;
use crate::security::{
    CommandExecutor, HostResolver, SystemCommandExecutor, SystemResolver, mask_secret_in,
    redact_flag_value,
};
use crate::validation::{validate_config, validate_raw_config};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Package manager executable
const DOTNET: &str = "dotnet";

const CONFIG_SCHEMA: &str = r#"{
  "type": "object",
  "properties": {
    "api_key": {"type": "string", "description": "NuGet API key (or use NUGET_API_KEY env)"},
    "source": {"type": "string", "format": "uri", "description": "NuGet source URL", "default": "https://api.nuget.org/v3/index.json"},
    "package_path": {"type": "string", "description": "Path to package files (supports wildcards)", "default": "*.nupkg"},
    "skip_duplicate": {"type": "boolean", "description": "Skip pushing if package already exists", "default": false},
    "timeout": {"type": "integer", "minimum": 1, "description": "Push timeout in seconds", "default": 300}
  },
  "required": []
}"#;

/// Strip a leading `v` from a release version
pub fn normalize_version(version: &str) -> &str {
    version.strip_prefix('v').unwrap_or(version)
}

/// Argument vector for `dotnet nuget push` of a single package
pub fn push_args(config: &NuGetConfig, package: &str) -> Vec<String> {
    let mut args = vec!["nuget".to_string(), "push".to_string(), package.to_string()];

    args.push("--api-key".to_string());
    args.push(config.api_key.expose_secret().to_string());
    args.push("--source".to_string());
    args.push(config.source.clone());

    // Duplicate handling is left to dotnet's own exit code
    if config.skip_duplicate {
        args.push("--skip-duplicate".to_string());
    }

    args.push("--timeout".to_string());
    args.push(config.timeout.to_string());

    args
}

/// NuGet registry plugin
pub struct NuGetPlugin {
    executor: Arc<dyn CommandExecutor>,
    resolver: Arc<dyn HostResolver>,
    env: HashMap<String, String>,
}

impl Default for NuGetPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl NuGetPlugin {
    /// Plugin backed by real processes, system DNS and the process environment
    pub fn new() -> Self {
        Self {
            executor: Arc::new(SystemCommandExecutor::new()),
            resolver: Arc::new(SystemResolver),
            env: std::env::vars().collect(),
        }
    }

    pub fn with_executor(mut self, executor: Arc<dyn CommandExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn HostResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replace the environment snapshot used for the API key fallback
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    async fn push_packages(
        &self,
        config: &NuGetConfig,
        release: &ReleaseContext,
        dry_run: bool,
        cancel: &CancellationToken,
    ) -> ExecuteResponse {
        if let Err(e) = validate_config(config, self.resolver.as_ref()).await {
            warn!(code = e.code(), security_denial = e.is_security_denial(), "{}", e);
            return ExecuteResponse::fail(format!("configuration validation failed: {}", e));
        }

        let packages = match find_packages(&config.package_path) {
            Ok(packages) => packages,
            Err(e) => return ExecuteResponse::fail(format!("failed to find packages: {}", e)),
        };

        if packages.is_empty() {
            return ExecuteResponse::fail(
                PluginError::NoPackagesFound(config.package_path.clone()).to_string(),
            );
        }

        let version = normalize_version(&release.version).to_string();
        if !version.is_empty() && semver::Version::parse(&version).is_err() {
            warn!(version = %version, "release version is not valid SemVer");
        }

        if dry_run {
            info!(count = packages.len(), source = %config.source, "dry run, nothing pushed");
            return ExecuteResponse::ok(format!(
                "Would push {} package(s) to NuGet",
                packages.len()
            ))
            .with_output("packages", packages)
            .with_output("source", config.source.clone())
            .with_output("skip_duplicate", config.skip_duplicate)
            .with_output("version", version);
        }

        let mut pushed: Vec<String> = Vec::with_capacity(packages.len());
        for package in &packages {
            if let Err(e) = self.push_package(config, package, cancel).await {
                warn!(package = %package, pushed = pushed.len(), "push failed");
                return ExecuteResponse::fail(e.to_string())
                    .with_output("pushed_packages", pushed)
                    .with_output("failed_package", package.clone());
            }
            pushed.push(package.clone());
        }

        info!(count = pushed.len(), source = %config.source, "all packages pushed");
        ExecuteResponse::ok(format!(
            "Successfully pushed {} package(s) to NuGet",
            pushed.len()
        ))
        .with_output("packages", pushed)
        .with_output("source", config.source.clone())
        .with_output("version", version)
    }

    async fn push_package(
        &self,
        config: &NuGetConfig,
        package: &str,
        cancel: &CancellationToken,
    ) -> Result<(), PluginError> {
        let args = push_args(config, package);
        debug!(args = ?redact_flag_value(&args, "--api-key"), "running {}", DOTNET);

        match self.executor.run(DOTNET, &args, cancel).await {
            Ok(_) => {
                info!(package, "package pushed");
                Ok(())
            }
            Err(source) => {
                let output = String::from_utf8_lossy(source.output());
                let output = mask_secret_in(output.trim(), config.api_key.expose_secret());
                Err(PluginError::PushFailed {
                    package: package.to_string(),
                    output,
                    source,
                })
            }
        }
    }
}

#[async_trait]
impl Plugin for NuGetPlugin {
    fn info(&self) -> PluginInfo {
        PluginInfo {
            name: "nuget".to_string(),
            version: "2.0.0".to_string(),
            description: "Publish packages to NuGet (.NET)".to_string(),
            author: "Relicta Team".to_string(),
            hooks: vec![Hook::PostPublish],
            config_schema: CONFIG_SCHEMA.to_string(),
        }
    }

    async fn execute(
        &self,
        request: ExecuteRequest,
        cancel: CancellationToken,
    ) -> anyhow::Result<ExecuteResponse> {
        match request.hook {
            Hook::PostPublish => {
                let config = NuGetConfig::resolve(&request.config, &self.env);
                Ok(self
                    .push_packages(&config, &request.context, request.dry_run, &cancel)
                    .await)
            }
            other => Ok(ExecuteResponse::ok(format!("Hook {} not handled", other))),
        }
    }

    async fn validate(&self, config: &RawConfig) -> anyhow::Result<ValidateResponse> {
        Ok(validate_raw_config(config, self.resolver.as_ref()).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::CommandError;
    use crate::testing::{RecordingExecutor, StaticResolver};
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn resolver() -> Arc<StaticResolver> {
        Arc::new(
            StaticResolver::new()
                .with_host("api.nuget.org", &["52.1.2.3"])
                .with_host("custom.nuget.org", &["93.184.216.34"]),
        )
    }

    fn plugin(executor: Arc<RecordingExecutor>) -> NuGetPlugin {
        NuGetPlugin::new()
            .with_executor(executor)
            .with_resolver(resolver())
            .with_env(HashMap::new())
    }

    fn packages_dir(names: &[&str]) -> (TempDir, Vec<String>) {
        let temp_dir = TempDir::new().unwrap();
        let paths = names
            .iter()
            .map(|name| {
                let path = temp_dir.path().join(name);
                fs::write(&path, b"test").unwrap();
                path.to_string_lossy().to_string()
            })
            .collect();
        (temp_dir, paths)
    }

    fn pattern(dir: &TempDir) -> String {
        dir.path().join("*.nupkg").to_string_lossy().to_string()
    }

    fn request(config: serde_json::Value, dry_run: bool) -> ExecuteRequest {
        ExecuteRequest {
            hook: Hook::PostPublish,
            config: config.as_object().cloned().unwrap(),
            context: ReleaseContext {
                version: "v1.2.3".to_string(),
                ..Default::default()
            },
            dry_run,
        }
    }

    fn strings(value: &serde_json::Value) -> Vec<String> {
        serde_json::from_value(value.clone()).unwrap()
    }

    #[test]
    fn test_info() {
        let info = NuGetPlugin::new().info();

        assert_eq!(info.name, "nuget");
        assert_eq!(info.version, "2.0.0");
        assert_eq!(info.hooks, vec![Hook::PostPublish]);

        let schema: serde_json::Value = serde_json::from_str(&info.config_schema).unwrap();
        let properties = schema["properties"].as_object().unwrap();
        for key in ["api_key", "source", "package_path", "skip_duplicate", "timeout"] {
            assert!(properties.contains_key(key), "{key}");
        }
        assert_eq!(properties["timeout"]["default"], json!(300));
    }

    #[test]
    fn test_normalize_version() {
        assert_eq!(normalize_version("v1.2.3"), "1.2.3");
        assert_eq!(normalize_version("1.2.3"), "1.2.3");
        assert_eq!(normalize_version("vv1"), "v1");
        assert_eq!(normalize_version(""), "");
    }

    #[test]
    fn test_push_args() {
        let config = NuGetConfig::resolve(
            json!({"api_key": "key-123", "skip_duplicate": true, "timeout": 120})
                .as_object()
                .unwrap(),
            &HashMap::new(),
        );

        assert_eq!(
            push_args(&config, "a.nupkg"),
            vec![
                "nuget",
                "push",
                "a.nupkg",
                "--api-key",
                "key-123",
                "--source",
                "https://api.nuget.org/v3/index.json",
                "--skip-duplicate",
                "--timeout",
                "120",
            ]
        );
    }

    #[test]
    fn test_push_args_without_skip_duplicate() {
        let config = NuGetConfig::resolve(
            json!({"api_key": "key-123"}).as_object().unwrap(),
            &HashMap::new(),
        );

        let args = push_args(&config, "a.nupkg");
        assert!(!args.contains(&"--skip-duplicate".to_string()));
        assert_eq!(&args[args.len() - 2..], ["--timeout", "300"]);
    }

    #[tokio::test]
    async fn test_unhandled_hook() {
        let executor = Arc::new(RecordingExecutor::new());
        let mut req = request(json!({}), false);
        req.hook = Hook::PreVersion;

        let response = plugin(executor.clone())
            .execute(req, CancellationToken::new())
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.message.as_deref(), Some("Hook pre-version not handled"));
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let executor = Arc::new(RecordingExecutor::new());
        let (dir, _) = packages_dir(&["a.nupkg"]);

        let response = plugin(executor.clone())
            .execute(
                request(json!({"package_path": pattern(&dir)}), false),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(!response.success);
        assert!(response.text().contains("API key is required"));
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_api_key_from_env() {
        let executor = Arc::new(RecordingExecutor::new());
        let (dir, _) = packages_dir(&["a.nupkg"]);
        let env = HashMap::from([("NUGET_API_KEY".to_string(), "env-key".to_string())]);

        let response = plugin(executor.clone())
            .with_env(env)
            .execute(
                request(json!({"package_path": pattern(&dir)}), false),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(response.success, "{:?}", response);
        assert_eq!(executor.calls()[0].args[4], "env-key");
    }

    #[tokio::test]
    async fn test_invalid_source_stops_before_discovery() {
        let executor = Arc::new(RecordingExecutor::new());

        let response = plugin(executor.clone())
            .execute(
                request(
                    json!({
                        "api_key": "key",
                        "source": "http://nuget.example.com/v3/index.json",
                        "package_path": "../*.nupkg",
                    }),
                    false,
                ),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(!response.success);
        let error = response.error.unwrap();
        assert!(error.starts_with("configuration validation failed"));
        assert!(error.contains("HTTPS"));
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_non_positive_timeout() {
        let executor = Arc::new(RecordingExecutor::new());

        for timeout in [0, -5] {
            let response = plugin(executor.clone())
                .execute(
                    request(json!({"api_key": "key", "timeout": timeout}), false),
                    CancellationToken::new(),
                )
                .await
                .unwrap();

            assert!(!response.success);
            assert!(response.text().contains("positive integer"));
        }
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_no_packages_found() {
        let executor = Arc::new(RecordingExecutor::new());
        let (dir, _) = packages_dir(&["notes.txt"]);
        let pattern = pattern(&dir);

        let response = plugin(executor.clone())
            .execute(
                request(json!({"api_key": "key", "package_path": pattern}), false),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(!response.success);
        assert_eq!(
            response.error.as_deref(),
            Some(format!("no packages found matching pattern: {}", pattern).as_str())
        );
        assert_eq!(executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_malformed_pattern_is_distinguished() {
        let executor = Arc::new(RecordingExecutor::new());
        let (dir, _) = packages_dir(&["a.nupkg"]);
        let broken = dir.path().join("[*.nupkg").to_string_lossy().to_string();

        let response = plugin(executor.clone())
            .execute(
                request(json!({"api_key": "key", "package_path": broken}), false),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(!response.success);
        let error = response.error.unwrap();
        assert!(error.starts_with("failed to find packages: invalid glob pattern"));
        assert!(!error.contains("no packages found"));
    }

    #[tokio::test]
    async fn test_dry_run() {
        let executor = Arc::new(RecordingExecutor::new());
        let (dir, paths) = packages_dir(&["MyLib.1.2.3.nupkg"]);

        let response = plugin(executor.clone())
            .execute(
                request(
                    json!({"api_key": "key", "package_path": pattern(&dir), "skip_duplicate": true}),
                    true,
                ),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(response.success);
        assert!(response.text().contains("Would push 1 package(s)"));
        assert_eq!(executor.call_count(), 0);
        assert_eq!(strings(&response.outputs["packages"]), paths);
        assert_eq!(
            response.outputs["source"],
            json!("https://api.nuget.org/v3/index.json")
        );
        assert_eq!(response.outputs["skip_duplicate"], json!(true));
        assert_eq!(response.outputs["version"], json!("1.2.3"));
    }

    #[tokio::test]
    async fn test_push_multiple_packages() {
        let executor = Arc::new(RecordingExecutor::new());
        let (dir, paths) = packages_dir(&["a.nupkg", "b.nupkg", "c.nupkg"]);

        let response = plugin(executor.clone())
            .execute(
                request(json!({"api_key": "key", "package_path": pattern(&dir)}), false),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(response.success);
        assert!(response.text().contains("3 package(s)"));
        assert_eq!(strings(&response.outputs["packages"]), paths);
        assert_eq!(response.outputs["version"], json!("1.2.3"));

        let calls = executor.calls();
        assert_eq!(calls.len(), 3);
        for (call, path) in calls.iter().zip(&paths) {
            assert_eq!(call.program, "dotnet");
            assert_eq!(call.args[..3], ["nuget", "push", path.as_str()]);
        }
    }

    #[tokio::test]
    async fn test_partial_push_failure() {
        let executor = Arc::new(
            RecordingExecutor::new()
                .then_succeed("Your package was pushed.")
                .then_fail("  error: Response status code does not indicate success: 409 (Conflict).\n"),
        );
        let (dir, paths) = packages_dir(&["a.nupkg", "b.nupkg", "c.nupkg"]);

        let response = plugin(executor.clone())
            .execute(
                request(json!({"api_key": "key", "package_path": pattern(&dir)}), false),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(!response.success);
        assert_eq!(executor.call_count(), 2);
        assert_eq!(strings(&response.outputs["pushed_packages"]), vec![paths[0].clone()]);
        assert_eq!(response.outputs["failed_package"], json!(paths[1]));

        let error = response.error.unwrap();
        assert_eq!(
            error,
            format!(
                "failed to push package {}: error: Response status code does not indicate success: 409 (Conflict).: exit status: 1",
                paths[1]
            )
        );
    }

    #[tokio::test]
    async fn test_first_push_failure_reports_empty_progress() {
        let executor = Arc::new(
            RecordingExecutor::new()
                .then_error(CommandError::LaunchFailed("No such file or directory".to_string())),
        );
        let (dir, paths) = packages_dir(&["a.nupkg", "b.nupkg"]);

        let response = plugin(executor.clone())
            .execute(
                request(json!({"api_key": "key", "package_path": pattern(&dir)}), false),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(!response.success);
        assert_eq!(executor.call_count(), 1);
        assert!(strings(&response.outputs["pushed_packages"]).is_empty());
        assert_eq!(response.outputs["failed_package"], json!(paths[0]));
        assert!(response.text().contains("No such file or directory"));
    }

    #[tokio::test]
    async fn test_failure_output_masks_api_key() {
        let executor = Arc::new(
            RecordingExecutor::new().then_fail("invalid key oy2supersecretvalue for source"),
        );
        let (dir, _) = packages_dir(&["a.nupkg"]);

        let response = plugin(executor)
            .execute(
                request(
                    json!({"api_key": "oy2supersecretvalue", "package_path": pattern(&dir)}),
                    false,
                ),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        let error = response.error.unwrap();
        assert!(!error.contains("oy2supersecretvalue"));
        assert!(error.contains("oy2...lue"));
    }

    #[tokio::test]
    async fn test_short_api_key_leaves_failure_output_intact() {
        let executor = Arc::new(
            RecordingExecutor::new().then_fail("Pushing a.nupkg to https://api.nuget.org failed"),
        );
        let (dir, paths) = packages_dir(&["a.nupkg"]);

        let response = plugin(executor)
            .execute(
                request(json!({"api_key": "a", "package_path": pattern(&dir)}), false),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(!response.success);
        assert_eq!(
            response.error.as_deref(),
            Some(
                format!(
                    "failed to push package {}: Pushing a.nupkg to https://api.nuget.org failed: exit status: 1",
                    paths[0]
                )
                .as_str()
            )
        );
        assert_eq!(response.outputs["failed_package"], json!(paths[0]));
    }

    #[tokio::test]
    async fn test_cancelled_push_reports_progress() {
        let executor = Arc::new(
            RecordingExecutor::new()
                .then_succeed("")
                .then_error(CommandError::Cancelled),
        );
        let (dir, paths) = packages_dir(&["a.nupkg", "b.nupkg", "c.nupkg"]);

        let response = plugin(executor.clone())
            .execute(
                request(json!({"api_key": "key", "package_path": pattern(&dir)}), false),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        assert!(!response.success);
        assert_eq!(executor.call_count(), 2);
        assert_eq!(strings(&response.outputs["pushed_packages"]), vec![paths[0].clone()]);
        assert_eq!(response.outputs["failed_package"], json!(paths[1]));
        assert!(response.text().contains("command cancelled"));
    }

    #[tokio::test]
    async fn test_command_arguments_passed_through() {
        let executor = Arc::new(RecordingExecutor::new());
        let (dir, paths) = packages_dir(&["a.nupkg"]);

        plugin(executor.clone())
            .execute(
                request(
                    json!({
                        "api_key": "key",
                        "source": "https://custom.nuget.org/v3/index.json",
                        "package_path": pattern(&dir),
                        "skip_duplicate": true,
                        "timeout": 600,
                    }),
                    false,
                ),
                CancellationToken::new(),
            )
            .await
            .unwrap();

        let calls = executor.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0].args,
            vec![
                "nuget".to_string(),
                "push".to_string(),
                paths[0].clone(),
                "--api-key".to_string(),
                "key".to_string(),
                "--source".to_string(),
                "https://custom.nuget.org/v3/index.json".to_string(),
                "--skip-duplicate".to_string(),
                "--timeout".to_string(),
                "600".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_validate_entry_point() {
        let plugin = plugin(Arc::new(RecordingExecutor::new()));

        let valid = plugin.validate(&RawConfig::new()).await.unwrap();
        assert!(valid.valid);

        let invalid = plugin
            .validate(json!({"timeout": 0}).as_object().unwrap())
            .await
            .unwrap();
        assert!(!invalid.valid);
        assert_eq!(invalid.errors[0].field, "timeout");
    }
}
