use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use quotecraft_core::config::ServerConfig;
use quotecraft_core::{
    ApplicationError, AuditSink, GenerationController, QuoteService, TracingAuditSink,
};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

pub type SessionController = GenerationController<dyn QuoteService>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionLimits {
    pub idle_ttl: Duration,
    pub max_sessions: usize,
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self { idle_ttl: Duration::from_secs(1800), max_sessions: 10_000 }
    }
}

impl SessionLimits {
    pub fn from_config(server: &ServerConfig) -> Self {
        Self {
            idle_ttl: Duration::from_secs(server.session_idle_ttl_secs),
            max_sessions: server.max_sessions,
        }
    }

    fn sweep_period(&self) -> Duration {
        (self.idle_ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(60))
    }
}

struct SessionEntry {
    controller: Arc<SessionController>,
    last_access: Instant,
}

impl SessionEntry {
    fn evictable(&self) -> bool {
        !self.controller.is_loading()
    }
}

/// In-memory generation sessions, one controller per browser tab or API client.
///
/// Sessions idle for longer than the TTL are dropped by [`SessionRegistry::evict_idle`]
/// and on every `create`. A session that is generating is never dropped.
#[derive(Clone)]
pub struct SessionRegistry {
    service: Arc<dyn QuoteService>,
    audit: Arc<dyn AuditSink>,
    limits: SessionLimits,
    sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
}

impl SessionRegistry {
    pub fn new(service: Arc<dyn QuoteService>) -> Self {
        Self::with_audit(service, Arc::new(TracingAuditSink))
    }

    pub fn with_audit(service: Arc<dyn QuoteService>, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            service,
            audit,
            limits: SessionLimits::default(),
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    pub async fn create(&self) -> Result<(Uuid, Arc<SessionController>), ApplicationError> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let expired = evict_expired(&mut sessions, now, self.limits.idle_ttl);
        if expired > 0 {
            log_eviction(expired, "idle_ttl", sessions.len());
        }

        if sessions.len() >= self.limits.max_sessions {
            let oldest = sessions
                .iter()
                .filter(|(_, entry)| entry.evictable())
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(id, _)| *id);

            match oldest {
                Some(id) => {
                    sessions.remove(&id);
                    log_eviction(1, "capacity", sessions.len());
                }
                None => {
                    warn!(
                        event_name = "server.session.capacity_exhausted",
                        correlation_id = "session_registry",
                        max_sessions = self.limits.max_sessions,
                        "every session is generating; refusing a new one"
                    );
                    return Err(ApplicationError::SessionCapacity(self.limits.max_sessions));
                }
            }
        }

        let session_id = Uuid::new_v4();
        let controller = Arc::new(
            GenerationController::with_audit(self.service.clone(), self.audit.clone())
                .for_session(session_id.to_string())
                .with_actor("studio"),
        );
        sessions.insert(session_id, SessionEntry { controller: controller.clone(), last_access: now });
        let active = sessions.len();
        drop(sessions);

        info!(
            event_name = "server.session.created",
            correlation_id = %session_id,
            session_id = %session_id,
            active_sessions = active,
            "generation session created"
        );

        Ok((session_id, controller))
    }

    /// Looks up a session by its textual id and marks it as used; malformed ids
    /// are simply unknown.
    pub async fn get(&self, session_id: &str) -> Option<Arc<SessionController>> {
        let session_id = Uuid::parse_str(session_id.trim()).ok()?;
        let mut sessions = self.sessions.write().await;
        let entry = sessions.get_mut(&session_id)?;
        entry.last_access = Instant::now();
        Some(entry.controller.clone())
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Drops every session idle past the TTL and returns how many were removed.
    pub async fn evict_idle(&self) -> usize {
        self.evict_idle_at(Instant::now()).await
    }

    async fn evict_idle_at(&self, now: Instant) -> usize {
        let mut sessions = self.sessions.write().await;
        let evicted = evict_expired(&mut sessions, now, self.limits.idle_ttl);
        if evicted > 0 {
            log_eviction(evicted, "idle_ttl", sessions.len());
        }
        evicted
    }

    /// Background task that runs [`SessionRegistry::evict_idle`] periodically.
    pub fn spawn_sweeper(&self) -> JoinHandle<()> {
        let registry = self.clone();
        let period = self.limits.sweep_period();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                registry.evict_idle().await;
            }
        })
    }
}

fn evict_expired(sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant, ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, entry| {
        !entry.evictable() || now.saturating_duration_since(entry.last_access) < ttl
    });
    before - sessions.len()
}

fn log_eviction(count: usize, reason: &'static str, remaining: usize) {
    info!(
        event_name = "server.session.evicted",
        correlation_id = "session_registry",
        evicted = count,
        reason,
        active_sessions = remaining,
        "generation sessions evicted"
    );
}
