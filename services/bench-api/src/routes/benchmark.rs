use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::post,
    Json, Router,
};
use futures::Stream;
use medbench_benchmarks::{BenchmarkEvent, ChannelSink, NullSink, RunRequest};
use medbench_core::BenchmarkRun;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tracing::{info, warn};

use crate::error::{ApiError, ApiJson};
use crate::middleware::RequestId;
use crate::state::AppState;

const EVENT_BUFFER: usize = 32;
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/benchmark/run", post(run_benchmark))
        .route("/api/benchmark/run-stream", post(run_benchmark_stream))
}

async fn run_benchmark(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    ApiJson(request): ApiJson<RunRequest>,
) -> Result<Json<BenchmarkRun>, ApiError> {
    info!(
        request_id = %request_id.0,
        models = request.models.len(),
        questions = request.question_ids.len(),
        "Batch benchmark requested"
    );

    let run = state
        .orchestrator()
        .run(&request, state.config.benchmark.batch, &mut NullSink)
        .await?;
    Ok(Json(run))
}

/// Validation happens before the stream opens, so invalid input is a plain 400.
async fn run_benchmark_stream(
    State(state): State<Arc<AppState>>,
    request_id: RequestId,
    ApiJson(request): ApiJson<RunRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let orchestrator = state.orchestrator();
    let plan = orchestrator.plan(&request)?;
    let profile = state.config.benchmark.streaming;

    info!(
        request_id = %request_id.0,
        run_id = %plan.run_id,
        total = plan.total_tests(),
        "Streaming benchmark started"
    );

    let (mut sink, rx) = ChannelSink::channel(EVENT_BUFFER);
    tokio::spawn(async move {
        if let Err(e) = orchestrator.run_plan(plan, profile, &mut sink).await {
            warn!(error = %e, "Streaming benchmark ended early");
        }
    });

    let stream = ReceiverStream::new(rx).map(|event| Ok::<_, Infallible>(to_sse(&event)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL)))
}

fn to_sse(event: &BenchmarkEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(data) => Event::default().event(event.kind()).data(data),
        Err(e) => Event::default()
            .event("error")
            .data(serde_json::json!({ "type": "error", "message": e.to_string() }).to_string()),
    }
}
