use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod assistant;
mod config;
mod error;
mod llm;
mod middleware;
mod prediction;
mod resolver;
mod routes;
mod state;

use crate::llm::gemini::GeminiClient;
use crate::llm::{GenerativeClient, LanguageModel};
use crate::prediction::{Classifier, ImageClassifier, PredictionClient};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Krishi API",
        version = "0.1.0",
        description = "Plant-disease advice, field sensor assessment and the farm assistant for the Krishi dashboard."
    ),
    paths(
        routes::health::health_check,
        routes::advice::resolve_advice,
        routes::diagnoses::diagnose,
        routes::sensors::assess_readings,
        routes::sensors::assess_feed_entry,
        routes::chat::chat,
        routes::crops::recommend_crops,
    ),
    components(schemas(
        routes::health::HealthResponse,
        routes::health::AdvisorMode,
        routes::health::ClassifierMode,
        routes::advice::AdviceRequest,
        routes::diagnoses::DiagnosisRequest,
        routes::diagnoses::DiagnosisResponse,
        prediction::Prediction,
        routes::sensors::SensorAssessmentRequest,
        routes::sensors::FeedAssessmentRequest,
        routes::chat::ChatRequest,
        routes::chat::ChatResponse,
        routes::crops::CropRecommendationRequest,
        llm::ChatMessage,
        llm::ChatRole,
        assistant::CropRecommendations,
        assistant::CropSource,
        krishi_core::error::ApiError,
        krishi_core::advice::DiseaseAdvice,
        krishi_core::advice::Severity,
        krishi_core::advice::AdviceTier,
        krishi_core::advice::DegradationReason,
        krishi_core::sensors::SensorReadings,
        krishi_core::sensors::ChannelFeedEntry,
        krishi_core::sensors::SensorAssessment,
        krishi_core::sensors::SensorStatus,
        krishi_core::sensors::MoistureBand,
        krishi_core::sensors::MoistureAssessment,
        krishi_core::sensors::SystemStatus,
        krishi_core::sensors::PestRiskLevel,
        krishi_core::sensors::PestRisk,
        krishi_core::sensors::WaterRequirement,
        krishi_core::sensors::AdvisoryCard,
    ))
)]
struct ApiDoc;

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "krishi_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let config = config::ServerConfig::from_env().expect("invalid configuration");

    let client = GeminiClient::new(&config.llm)
        .map(|client| Arc::new(client) as Arc<dyn GenerativeClient>);
    if let Err(err) = &client {
        tracing::warn!(error = %err, "Language model unavailable, serving fallback advice only");
    }
    let model = LanguageModel::from_client(client, config.llm.timeout);
    if let Some(name) = model.model_name() {
        tracing::info!(
            model = name,
            timeout_secs = config.llm.timeout.as_secs(),
            "Language model configured"
        );
    }

    let classifier = PredictionClient::new(&config.classifier)
        .map(|client| Arc::new(client) as Arc<dyn ImageClassifier>);
    match &classifier {
        Ok(_) => tracing::info!(
            predict_url = config.classifier.predict_url.as_deref().unwrap_or_default(),
            "Image classifier configured"
        ),
        Err(err) => tracing::warn!(error = %err, "Image classifier unavailable, diagnoses disabled"),
    }
    let classifier = Classifier::from_client(classifier, config.classifier.timeout);

    let app_state = state::AppState::new(model, classifier);
    let cors_layer = middleware::cors::build_cors_layer(&config.cors_origins);

    // Rate limits only on routes that can reach the language model
    let app = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .merge(routes::health::router())
        .merge(routes::sensors::router())
        .merge(routes::advice::router().layer(middleware::rate_limit::advice_layer()))
        .merge(routes::diagnoses::router().layer(middleware::rate_limit::advice_layer()))
        .merge(routes::chat::router().layer(middleware::rate_limit::assistant_layer()))
        .merge(routes::crops::router().layer(middleware::rate_limit::assistant_layer()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer),
        )
        .with_state(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Krishi API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .unwrap();
}
