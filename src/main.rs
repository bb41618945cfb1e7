use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use secrecy::ExposeSecret;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use a2a_calendar_agent::{
    calendar::{
        auth::{ServiceAccountKey, ServiceAccountTokenSource},
        CalendarBackend, CalendarExecutor, DemoCalendarBackend, GoogleCalendarBackend,
    },
    config::{AgentConfig, CredentialSource},
    intent::{IntentResolver, LlmStrategy, PatternStrategy},
    llm::gateway::GatewayClient,
    protocol::AgentCard,
    service::CalendarAgentService,
    time::{SharedClock, SystemClock, TimeParser},
    transport::{serve, AppState},
};

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AgentConfig::from_env().context("loading configuration")?;
    init_logging(&config.log_level);

    let clock: SharedClock = Arc::new(SystemClock);
    let zone = config.calendar.timezone;
    let parser = TimeParser::new(zone);
    let http = reqwest::Client::new();

    let backend: Arc<dyn CalendarBackend> = if config.demo_mode {
        info!("demo mode: using the in-memory calendar");
        Arc::new(DemoCalendarBackend::seeded(zone, clock.now()))
    } else {
        let key = match &config.calendar.credentials {
            Some(CredentialSource::Inline(json)) => ServiceAccountKey::from_json(json.expose_secret())?,
            Some(CredentialSource::File(path)) => ServiceAccountKey::from_file(path)?,
            None => anyhow::bail!("calendar credentials are required outside demo mode"),
        };
        info!(client_email = %key.client_email, "using service-account credentials");
        let tokens = ServiceAccountTokenSource::new(http.clone(), key)?;
        Arc::new(GoogleCalendarBackend::new(http.clone(), Arc::new(tokens), zone)?)
    };

    let pattern = PatternStrategy::new(parser.clone(), clock.clone());
    let resolver = match (config.llm.enabled, &config.llm.gateway_url) {
        (true, Some(url)) => {
            let model = GatewayClient::new(url.clone(), config.llm.api_key.clone(), config.llm.timeout)?;
            info!(
                provider = config.llm.provider.as_str(),
                model = %config.llm.model,
                "llm intent resolution enabled"
            );
            let llm = LlmStrategy::new(Arc::new(model), &config.llm, zone, clock.clone());
            IntentResolver::with_llm(llm, pattern)
        }
        (true, None) => {
            warn!("llm enabled without a gateway url, using pattern matching only");
            IntentResolver::pattern_only(pattern)
        }
        (false, _) => IntentResolver::pattern_only(pattern),
    };

    info!(strategies = ?resolver.strategy_names(), "intent resolver ready");

    let executor = CalendarExecutor::new(
        backend,
        config.calendar.calendar_id.clone(),
        config.calendar.read_only,
        parser,
        clock,
    );
    info!(
        calendar_id = %config.calendar.calendar_id,
        read_only = config.calendar.read_only,
        timezone = %zone,
        "calendar executor ready"
    );

    let agent = CalendarAgentService::new(Arc::new(resolver), Arc::new(executor));
    let state = AppState::from_agent(
        agent,
        AgentCard::calendar_agent(config.server.agent_url.clone()),
        config.server.request_timeout,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    serve(addr, state).await.context("serving http")?;
    Ok(())
}
