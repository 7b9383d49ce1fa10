use std::sync::Arc;

use axum::Router;
use quotecraft_agent::{build_quote_service, describe_provider, LlmError};
use quotecraft_core::config::{AppConfig, ConfigError};
use tera::Tera;
use thiserror::Error;
use tracing::info;

use crate::sessions::{SessionLimits, SessionRegistry};
use crate::studio::{self, StudioState};
use crate::health;

pub struct Application {
    pub config: AppConfig,
    pub sessions: SessionRegistry,
    templates: Arc<Tera>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("quote service initialization failed: {0}")]
    QuoteService(#[from] LlmError),
    #[error("studio templates failed to compile: {0}")]
    Templates(#[from] tera::Error),
}

impl Application {
    pub fn router(&self) -> Router {
        studio::router(StudioState::new(self.sessions.clone(), self.templates.clone()))
            .merge(health::router(describe_provider(&self.config.llm), self.sessions.clone()))
    }
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        provider = config.llm.provider.as_str(),
        "starting application bootstrap"
    );

    let templates = studio::load_templates()?;
    let quote_service = build_quote_service(&config.llm)?;
    let limits = SessionLimits::from_config(&config.server);
    let sessions = SessionRegistry::new(quote_service).with_limits(limits);

    info!(
        event_name = "system.bootstrap.quote_service_ready",
        correlation_id = "bootstrap",
        quote_service = %describe_provider(&config.llm),
        session_idle_ttl_secs = limits.idle_ttl.as_secs(),
        max_sessions = limits.max_sessions,
        "quote service ready"
    );

    Ok(Application { config, sessions, templates })
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use quotecraft_core::config::{AppConfig, ConfigOverrides, LlmProvider, LoadOptions};
    use tower::ServiceExt;

    use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};
    use crate::sessions::SessionLimits;

    fn bootstrap(overrides: ConfigOverrides) -> Result<Application, BootstrapError> {
        let config = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist/quotecraft.toml".into()),
            overrides,
            ..LoadOptions::default()
        })?;
        bootstrap_with_config(config)
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_provider_credentials() {
        let result = bootstrap(ConfigOverrides {
            llm_provider: Some(LlmProvider::OpenAi),
            ..ConfigOverrides::default()
        });

        let message = match result {
            Ok(_) => panic!("bootstrap should reject a hosted provider without api key"),
            Err(error) => error.to_string(),
        };
        assert!(message.contains("llm.api_key"));
    }

    #[tokio::test]
    async fn static_provider_serves_health_and_studio() {
        let app = bootstrap(ConfigOverrides {
            llm_provider: Some(LlmProvider::Static),
            ..ConfigOverrides::default()
        })
        .expect("static bootstrap succeeds");

        let response = app
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
            .await
            .expect("health responds");
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.expect("body");
        let payload: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(payload["quote_service"]["detail"], "static");

        let response = app
            .router()
            .oneshot(Request::get("/").body(Body::empty()).expect("request"))
            .await
            .expect("studio responds");
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn session_limits_follow_server_config() {
        let mut config = AppConfig::load(LoadOptions {
            config_path: Some("does-not-exist/quotecraft.toml".into()),
            overrides: ConfigOverrides {
                llm_provider: Some(LlmProvider::Static),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("static config loads");
        config.server.max_sessions = 2;

        let app = bootstrap_with_config(config).expect("bootstrap succeeds");
        for _ in 0..5 {
            app.sessions.create().await.expect("session");
        }
        assert_eq!(app.sessions.len().await, 2);
        assert_eq!(
            SessionLimits::from_config(&app.config.server).idle_ttl.as_secs(),
            app.config.server.session_idle_ttl_secs
        );
    }

    #[test]
    fn template_errors_surface_as_bootstrap_errors() {
        let mut tera = tera::Tera::default();
        let error = tera.add_raw_template("broken.html", "{{ unclosed").expect_err("parse fails");

        let message = BootstrapError::from(error).to_string();
        assert!(message.starts_with("studio templates failed to compile"));
    }
}
