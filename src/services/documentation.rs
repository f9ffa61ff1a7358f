use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for Squad Herald.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::signals::ingest_signal,
        crate::routes::registration::register,
        crate::routes::registration::unregister,
        crate::routes::settings::set_announce_channel,
        crate::routes::stats::recent_stats,
        crate::routes::stats::last_match,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::signal::SignalRequest,
            crate::dto::signal::SignalKindInput,
            crate::dto::signal::SignalAck,
            crate::dto::registration::RegisterRequest,
            crate::dto::registration::RegistrationSummary,
            crate::dto::settings::AnnounceChannelRequest,
            crate::dto::settings::AnnounceChannelSummary,
            crate::dto::stats::RecentStatsSummary,
            crate::dto::stats::LastMatchSummary,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "signals", description = "Activity signal ingestion"),
        (name = "registration", description = "Riot account registration"),
        (name = "settings", description = "Per-guild delivery settings"),
        (name = "stats", description = "On-demand match statistics"),
    )
)]
pub struct ApiDoc;
