use axum::{
    Router,
    extract::{
        Json, Query,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::core::{
    BaseCaseComparison, BaseCaseSummary, ComputeOptions, DEFAULT_HISTOGRAM_BINS, EngineError,
    FinalBalanceStats, HistogramBin, PercentileCurve, PercentileTableRow, Projection,
    SimulationParameters, YearlyRecord, compare_to_base_case, compute_with_options,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ProjectPayload {
    initial_balance: Option<f64>,
    annual_return: Option<f64>,
    years: Option<u32>,
    annual_contribution: Option<f64>,
    volatility: Option<f64>,
    simulations: Option<u32>,
    seed: Option<u64>,
    histogram_bins: Option<usize>,
}

#[derive(Parser, Debug)]
#[command(
    name = "portfolio-growth",
    about = "Deterministic and Monte Carlo projection of a portfolio with yearly contributions"
)]
struct Cli {
    #[arg(long, default_value_t = 10_000.0, help = "Starting balance")]
    initial_balance: f64,
    #[arg(
        long,
        default_value_t = 7.0,
        help = "Expected annual return in percent, e.g. 7"
    )]
    annual_return: f64,
    #[arg(long, default_value_t = 10, help = "Number of years to project (1-50)")]
    years: u32,
    #[arg(
        long,
        default_value_t = 2_000.0,
        help = "Contribution added at the start of every year"
    )]
    annual_contribution: f64,
    #[arg(
        long,
        default_value_t = 15.0,
        help = "Standard deviation of annual returns in percent (1-40)"
    )]
    volatility: f64,
    #[arg(
        long,
        default_value_t = 500,
        help = "Number of Monte Carlo paths (100-2000)"
    )]
    simulations: u32,
    #[arg(long, default_value_t = 42)]
    seed: u64,
    #[arg(
        long,
        default_value_t = DEFAULT_HISTOGRAM_BINS,
        help = "Number of equal-width bins for the final balance histogram"
    )]
    histogram_bins: usize,
    #[arg(long, help = "Pretty-print the JSON output")]
    pretty: bool,
}

#[derive(Debug)]
struct ApiRequest {
    params: SimulationParameters,
    seed: u64,
    options: ComputeOptions,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BaseCaseSummaryResponse {
    final_balance: f64,
    total_invested: f64,
    market_gains: f64,
    total_return_pct: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    parameters: SimulationParameters,
    seed: u64,
    base_case: Vec<YearlyRecord>,
    base_case_summary: BaseCaseSummaryResponse,
    percentile_curves: Vec<PercentileCurve>,
    mean_curve: Vec<f64>,
    final_balance: FinalBalanceStats,
    percentile_table: Vec<PercentileTableRow>,
    base_case_comparison: Option<Vec<BaseCaseComparison>>,
    histogram: Vec<HistogramBin>,
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

fn build_request(cli: Cli) -> Result<ApiRequest, String> {
    let params = SimulationParameters {
        initial_balance: cli.initial_balance,
        annual_return_pct: cli.annual_return,
        years: cli.years,
        annual_contribution: cli.annual_contribution,
        volatility_pct: cli.volatility,
        simulation_count: cli.simulations,
    };
    params.validate().map_err(|e| e.to_string())?;

    if cli.histogram_bins == 0 {
        return Err("--histogram-bins must be > 0".to_string());
    }

    Ok(ApiRequest {
        params,
        seed: cli.seed,
        options: ComputeOptions {
            histogram_bins: cli.histogram_bins,
        },
    })
}

pub fn run_cli(raw_args: Vec<String>) -> Result<String, String> {
    let cli = Cli::parse_from(raw_args);
    let pretty = cli.pretty;
    let request = build_request(cli)?;
    let projection = compute_with_options(request.params, request.seed, request.options)
        .map_err(|e| e.to_string())?;
    let response = build_project_response(&projection);

    let rendered = if pretty {
        serde_json::to_string_pretty(&response)
    } else {
        serde_json::to_string(&response)
    };
    rendered.map_err(|e| format!("Failed to serialize projection: {e}"))
}

pub async fn run_http_server(port: u16) -> std::io::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let app = Router::new()
        .route("/health", get(health_handler))
        .route(
            "/api/project",
            get(project_get_handler).post(project_post_handler),
        )
        .fallback(not_found_handler);

    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "portfolio projection API listening");

    axum::serve(listener, app).await
}

async fn health_handler() -> impl IntoResponse {
    with_cache_control("ok")
}

async fn not_found_handler() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

async fn project_get_handler(
    payload: Result<Query<ProjectPayload>, QueryRejection>,
) -> Response {
    match payload {
        Ok(Query(payload)) => project_handler_impl(payload).await,
        Err(rejection) => error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid API query: {}", rejection.body_text()),
        ),
    }
}

async fn project_post_handler(payload: Result<Json<ProjectPayload>, JsonRejection>) -> Response {
    match payload {
        Ok(Json(payload)) => project_handler_impl(payload).await,
        Err(rejection) => error_response(
            StatusCode::BAD_REQUEST,
            &format!("Invalid API JSON payload: {}", rejection.body_text()),
        ),
    }
}

async fn project_handler_impl(payload: ProjectPayload) -> Response {
    let request = match api_request_from_payload(payload) {
        Ok(request) => request,
        Err(msg) => return error_response(StatusCode::BAD_REQUEST, &msg),
    };

    let computed = tokio::task::spawn_blocking(move || {
        compute_with_options(request.params, request.seed, request.options)
    })
    .await;

    match computed {
        Ok(Ok(projection)) => json_response(StatusCode::OK, build_project_response(&projection)),
        Ok(Err(e @ EngineError::InvalidParameter { .. })) => {
            error_response(StatusCode::BAD_REQUEST, &e.to_string())
        }
        Ok(Err(e)) => {
            error!(error = %e, "projection failed");
            error_response(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string())
        }
        Err(e) => {
            error!(error = %e, "projection task did not complete");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Projection failed")
        }
    }
}

fn with_cache_control<R: IntoResponse>(response: R) -> Response {
    let mut response = response.into_response();
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        header::HeaderValue::from_static("no-store"),
    );
    response
}

fn json_response<T: Serialize>(status: StatusCode, body: T) -> Response {
    with_cache_control((status, Json(body)))
}

fn error_response(status: StatusCode, msg: &str) -> Response {
    json_response(
        status,
        ErrorResponse {
            error: msg.to_string(),
        },
    )
}

#[cfg(test)]
fn api_request_from_json(json: &str) -> Result<ApiRequest, String> {
    let payload = serde_json::from_str::<ProjectPayload>(json)
        .map_err(|e| format!("Invalid API JSON payload: {e}"))?;
    api_request_from_payload(payload)
}

fn api_request_from_payload(payload: ProjectPayload) -> Result<ApiRequest, String> {
    let mut cli = default_cli_for_api();

    if let Some(v) = payload.initial_balance {
        cli.initial_balance = v;
    }
    if let Some(v) = payload.annual_return {
        cli.annual_return = v;
    }
    if let Some(v) = payload.years {
        cli.years = v;
    }
    if let Some(v) = payload.annual_contribution {
        cli.annual_contribution = v;
    }
    if let Some(v) = payload.volatility {
        cli.volatility = v;
    }
    if let Some(v) = payload.simulations {
        cli.simulations = v;
    }
    if let Some(v) = payload.seed {
        cli.seed = v;
    }
    if let Some(v) = payload.histogram_bins {
        cli.histogram_bins = v;
    }

    build_request(cli)
}

fn default_cli_for_api() -> Cli {
    Cli {
        initial_balance: 10_000.0,
        annual_return: 7.0,
        years: 10,
        annual_contribution: 2_000.0,
        volatility: 15.0,
        simulations: 500,
        seed: 42,
        histogram_bins: DEFAULT_HISTOGRAM_BINS,
        pretty: false,
    }
}

fn build_project_response(projection: &Projection) -> ProjectResponse {
    let summary: BaseCaseSummary = projection.base_case.summary;
    let final_balance = projection.matrix_summary.final_balance;
    let mut warnings = Vec::new();

    let total_return_pct = undefined_as_none(summary.total_return_pct(), &mut warnings);
    let base_case_comparison = undefined_as_none(
        compare_to_base_case(&final_balance, summary.final_balance),
        &mut warnings,
    );

    ProjectResponse {
        parameters: projection.parameters,
        seed: projection.seed,
        base_case: projection.base_case.records.clone(),
        base_case_summary: BaseCaseSummaryResponse {
            final_balance: summary.final_balance,
            total_invested: summary.total_invested,
            market_gains: summary.market_gains,
            total_return_pct,
        },
        percentile_curves: projection.matrix_summary.percentile_curves.clone(),
        mean_curve: projection.matrix_summary.mean_curve.clone(),
        final_balance,
        percentile_table: projection.percentile_table.clone(),
        base_case_comparison,
        histogram: projection.histogram.clone(),
        warnings,
    }
}

fn undefined_as_none<T>(result: Result<T, EngineError>, warnings: &mut Vec<String>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(error = %e, "derived ratio left out of response");
            warnings.push(e.to_string());
            None
        }
    }
}
