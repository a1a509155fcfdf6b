pub mod metrics;
pub mod replay;

use std::{
	collections::{BTreeMap, HashSet},
	fs,
	path::{Path, PathBuf},
	sync::Arc,
	time::Instant,
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::{
	metrics::{Metrics, churn_against_baseline_at_k, compute_metrics, percentile, unique_ids},
	replay::{FixedEmbedding, ReplayIndex, ReplayRecording},
};
use sift_config::Config;
use sift_domain::Channel;
use sift_service::{
	ChannelWeights, MatchQuality, Providers, SearchRequest, SearchResponse, SiftService,
};
use sift_storage::qdrant::QdrantStore;

#[derive(Debug, Parser)]
#[command(
	version = sift_cli::VERSION,
	rename_all = "kebab",
	styles = sift_cli::styles(),
)]
pub struct Args {
	#[arg(long = "config-a", short = 'c', value_name = "FILE", visible_alias = "config")]
	pub config_a: PathBuf,
	#[arg(long = "config-b", value_name = "FILE")]
	pub config_b: Option<PathBuf>,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
	#[arg(long, value_name = "N")]
	pub limit: Option<u32>,
	/// Repeats every query and reports whether the ranking changed between runs.
	#[arg(long, value_name = "N", default_value_t = 1)]
	pub runs_per_query: u32,
	/// Serve index answers from each query's recording instead of Qdrant.
	#[arg(long)]
	pub replay: bool,
}

#[derive(Debug, Deserialize)]
struct EvalDataset {
	name: Option<String>,
	#[serde(default)]
	defaults: EvalDefaults,
	queries: Vec<EvalQuery>,
}

#[derive(Debug, Default, Deserialize)]
struct EvalDefaults {
	owner_id: Option<String>,
	source_id: Option<String>,
	language: Option<String>,
	limit: Option<u32>,
	weights: Option<ChannelWeights>,
}

#[derive(Debug, Deserialize)]
struct EvalQuery {
	id: Option<String>,
	query: String,
	owner_id: Option<String>,
	source_id: Option<String>,
	person_id: Option<String>,
	language: Option<String>,
	limit: Option<u32>,
	weights: Option<ChannelWeights>,
	expected_scene_ids: Vec<String>,
	replay: Option<ReplayRecording>,
}

/// One query of the dataset with the defaults applied.
struct EvalCase {
	id: String,
	expected_scene_ids: Vec<String>,
	request: SearchRequest,
	recording: Option<ReplayRecording>,
}

#[derive(Clone, Debug, Serialize)]
struct DatasetInfo {
	name: String,
	query_count: usize,
}

/// Output of a dataset run against one config.
#[derive(Debug, Serialize)]
struct RunReport {
	dataset: DatasetInfo,
	config_path: String,
	mode: &'static str,
	limit: u32,
	runs_per_query: u32,
	summary: Summary,
	queries: Vec<QueryOutcome>,
}

#[derive(Debug, Serialize)]
struct Summary {
	mean: Metrics,
	latency_ms_p50: f64,
	latency_ms_p95: f64,
	/// Ids of queries whose repeated runs disagreed. Absent when every query ran once.
	#[serde(skip_serializing_if = "Option::is_none")]
	unstable_queries: Option<Vec<String>>,
}
impl Summary {
	fn from_outcomes(outcomes: &[QueryOutcome]) -> Self {
		let metrics: Vec<Metrics> = outcomes.iter().map(|outcome| outcome.metrics).collect();
		let mut latencies: Vec<f64> = outcomes.iter().map(|outcome| outcome.latency_ms).collect();
		let repeated = outcomes.iter().any(|outcome| outcome.deterministic.is_some());
		let unstable = outcomes
			.iter()
			.filter(|outcome| outcome.deterministic == Some(false))
			.map(|outcome| outcome.id.clone())
			.collect();

		latencies.sort_by(f64::total_cmp);

		Self {
			mean: Metrics::mean(&metrics),
			latency_ms_p50: percentile(&latencies, 0.50),
			latency_ms_p95: percentile(&latencies, 0.95),
			unstable_queries: repeated.then_some(unstable),
		}
	}
}

#[derive(Debug, Serialize)]
struct QueryOutcome {
	id: String,
	query: String,
	trace_id: Uuid,
	expected_scene_ids: Vec<String>,
	ranked: Vec<RankedScene>,
	#[serde(flatten)]
	metrics: Metrics,
	latency_ms: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	signals: Option<QuerySignals>,
	/// Present when the query ran more than once.
	#[serde(skip_serializing_if = "Option::is_none")]
	deterministic: Option<bool>,
}
impl QueryOutcome {
	fn scene_ids(&self) -> Vec<String> {
		unique_ids(self.ranked.iter().map(|scene| scene.scene_id.as_str()))
	}

	fn policy_hash(&self) -> Option<&str> {
		self.signals.as_ref().and_then(|signals| signals.policy_hash.as_deref())
	}
}

/// What the user would see for one result row.
#[derive(Clone, Debug, PartialEq, Serialize)]
struct RankedScene {
	scene_id: String,
	display_score: f32,
	match_quality: MatchQuality,
}

/// Routing and channel facts taken from the search debug output.
#[derive(Debug, Serialize)]
struct QuerySignals {
	visual_mode: &'static str,
	gate_active: bool,
	person_id: Option<String>,
	channel_counts: BTreeMap<Channel, usize>,
	policy_hash: Option<String>,
}
impl QuerySignals {
	fn from_response(response: &SearchResponse) -> Option<Self> {
		let debug = response.debug.as_ref()?;

		Some(Self {
			visual_mode: debug.intent.visual_mode.as_str(),
			gate_active: debug.gate.active,
			person_id: debug.person_id.clone(),
			channel_counts: debug.channel_counts.clone(),
			policy_hash: debug.policy_hash.clone(),
		})
	}
}

/// Output of a dataset run against two configs.
#[derive(Debug, Serialize)]
struct CompareReport {
	dataset: DatasetInfo,
	mode: &'static str,
	runs_per_query: u32,
	a: ConfigSummary,
	b: ConfigSummary,
	/// `b - a` over the mean metrics.
	summary_delta: Metrics,
	queries: Vec<QueryComparison>,
}
impl CompareReport {
	fn new(a: RunReport, b: RunReport) -> Self {
		let k = a.limit.min(b.limit).max(1) as usize;
		let summary_delta = b.summary.mean.delta(&a.summary.mean);
		let queries = a
			.queries
			.into_iter()
			.zip(b.queries)
			.map(|(outcome_a, outcome_b)| QueryComparison::new(outcome_a, outcome_b, k))
			.collect();

		Self {
			dataset: a.dataset,
			mode: a.mode,
			runs_per_query: a.runs_per_query,
			a: ConfigSummary { config_path: a.config_path, summary: a.summary },
			b: ConfigSummary { config_path: b.config_path, summary: b.summary },
			summary_delta,
			queries,
		}
	}
}

#[derive(Debug, Serialize)]
struct ConfigSummary {
	config_path: String,
	summary: Summary,
}

#[derive(Debug, Serialize)]
struct QueryComparison {
	id: String,
	query: String,
	policy_changed: bool,
	/// `b - a` for this query.
	delta: Metrics,
	/// Share of the top-k positions holding a different scene under `b`.
	rank_churn_at_k: f64,
	/// Share of the top-k scenes found by both configs.
	overlap_at_k: f64,
	/// Scenes whose rank or display score differs between the two configs.
	shifts: Vec<SceneShift>,
	a: QueryOutcome,
	b: QueryOutcome,
}
impl QueryComparison {
	fn new(a: QueryOutcome, b: QueryOutcome, k: usize) -> Self {
		// Short result lists are compared over what was returned, not over empty slots.
		let k = k.min(a.ranked.len().max(b.ranked.len()));
		let (rank_churn_at_k, set_churn_at_k) =
			churn_against_baseline_at_k(&a.scene_ids(), &b.scene_ids(), k);
		let policy_changed = a.policy_hash() != b.policy_hash();
		let delta = b.metrics.delta(&a.metrics);
		let shifts = scene_shifts(&a.ranked, &b.ranked);

		Self {
			id: a.id.clone(),
			query: a.query.clone(),
			policy_changed,
			delta,
			rank_churn_at_k,
			overlap_at_k: 1.0 - set_churn_at_k,
			shifts,
			a,
			b,
		}
	}
}

#[derive(Debug, PartialEq, Serialize)]
struct SceneShift {
	scene_id: String,
	/// 1-based; `None` when the config did not return the scene.
	rank_a: Option<usize>,
	rank_b: Option<usize>,
	display_score_a: Option<f32>,
	display_score_b: Option<f32>,
}

struct QueryRun {
	response: SearchResponse,
	ranked: Vec<RankedScene>,
	latency_ms: f64,
	deterministic: Option<bool>,
}

pub async fn run(args: Args) -> color_eyre::Result<()> {
	let config_a = sift_config::load(&args.config_a)?;
	let filter = EnvFilter::new(config_a.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).init();

	let output = evaluate(&args, config_a).await?;
	let json = serde_json::to_string_pretty(&output)?;

	println!("{json}");

	Ok(())
}

/// Runs the dataset against `config_a`, the config loaded from `args.config_a`, and against
/// `--config-b` as well when it is given.
pub async fn evaluate(args: &Args, config_a: Config) -> color_eyre::Result<serde_json::Value> {
	let raw = fs::read_to_string(&args.dataset)?;
	let dataset: EvalDataset = serde_json::from_str(&raw)?;

	if dataset.queries.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one query."));
	}

	let cases = dataset
		.queries
		.iter()
		.enumerate()
		.map(|(index, query)| eval_case(&dataset.defaults, query, args, index))
		.collect::<color_eyre::Result<Vec<_>>>()?;
	let info = DatasetInfo {
		name: dataset.name.clone().unwrap_or_else(|| "eval".to_string()),
		query_count: cases.len(),
	};
	let report_a =
		run_config(&args.config_a, config_a, &info, &cases, &dataset.defaults, args).await?;
	let Some(config_b_path) = &args.config_b else {
		return Ok(serde_json::to_value(&report_a)?);
	};
	let config_b = sift_config::load(config_b_path)?;
	let report_b =
		run_config(config_b_path, config_b, &info, &cases, &dataset.defaults, args).await?;

	Ok(serde_json::to_value(CompareReport::new(report_a, report_b))?)
}

fn build_service(
	config: Config,
	replay: bool,
) -> color_eyre::Result<(SiftService, Option<Arc<ReplayIndex>>)> {
	if replay {
		let index = Arc::new(ReplayIndex::default());
		let service = SiftService::with_parts(
			config,
			index.clone(),
			Providers::new(Arc::new(FixedEmbedding)),
		);

		return Ok((service, Some(index)));
	}

	let qdrant = QdrantStore::new(&config.storage.qdrant)?;

	Ok((SiftService::new(config, qdrant), None))
}

async fn run_config(
	config_path: &Path,
	config: Config,
	dataset: &DatasetInfo,
	cases: &[EvalCase],
	defaults: &EvalDefaults,
	args: &Args,
) -> color_eyre::Result<RunReport> {
	let (service, replay_index) = build_service(config, args.replay)?;
	let runs_per_query = args.runs_per_query.max(1);
	let mut outcomes = Vec::with_capacity(cases.len());

	for (index, case) in cases.iter().enumerate() {
		if let Some(replay_index) = &replay_index {
			let Some(recording) = case.recording.clone() else {
				return Err(eyre::eyre!("Query at index {index} has no replay recording."));
			};

			replay_index.load(recording)?;
		}

		let run = run_query(&service, &case.request, runs_per_query).await?;
		let expected: HashSet<String> = case.expected_scene_ids.iter().cloned().collect();
		let retrieved = unique_ids(run.ranked.iter().map(|scene| scene.scene_id.as_str()));
		let metrics = compute_metrics(&retrieved, &expected);

		tracing::debug!(
			query_id = %case.id,
			trace_id = %run.response.trace_id,
			rr = metrics.rr,
			"Evaluated query."
		);

		outcomes.push(QueryOutcome {
			id: case.id.clone(),
			query: case.request.query.clone(),
			trace_id: run.response.trace_id,
			expected_scene_ids: case.expected_scene_ids.clone(),
			signals: QuerySignals::from_response(&run.response),
			ranked: run.ranked,
			metrics,
			latency_ms: run.latency_ms,
			deterministic: run.deterministic,
		});
	}

	Ok(RunReport {
		dataset: dataset.clone(),
		config_path: config_path.display().to_string(),
		mode: if args.replay { "replay" } else { "live" },
		limit: args.limit.or(defaults.limit).unwrap_or(service.cfg.search.default_limit),
		runs_per_query,
		summary: Summary::from_outcomes(&outcomes),
		queries: outcomes,
	})
}

/// Runs one request `runs` times. The first response is kept; the rest only check that the
/// shown ranking is reproduced exactly.
async fn run_query(
	service: &SiftService,
	request: &SearchRequest,
	runs: u32,
) -> color_eyre::Result<QueryRun> {
	let started = Instant::now();
	let response = service.search(request.clone()).await?;
	let ranked = ranked_scenes(&response);
	let mut deterministic = true;

	for _ in 1..runs {
		let repeat = service.search(request.clone()).await?;

		deterministic &= ranked_scenes(&repeat) == ranked;
	}

	let latency_ms = started.elapsed().as_secs_f64() * 1_000.0 / runs.max(1) as f64;

	Ok(QueryRun { response, ranked, latency_ms, deterministic: (runs > 1).then_some(deterministic) })
}

fn ranked_scenes(response: &SearchResponse) -> Vec<RankedScene> {
	response
		.items
		.iter()
		.map(|item| RankedScene {
			scene_id: item.scene_id.clone(),
			display_score: item.display_score,
			match_quality: item.match_quality,
		})
		.collect()
}

fn scene_shifts(a: &[RankedScene], b: &[RankedScene]) -> Vec<SceneShift> {
	let mut scene_ids: Vec<&str> = a.iter().map(|scene| scene.scene_id.as_str()).collect();

	for scene in b {
		if !scene_ids.contains(&scene.scene_id.as_str()) {
			scene_ids.push(&scene.scene_id);
		}
	}

	let find = |ranked: &[RankedScene], scene_id: &str| {
		ranked
			.iter()
			.position(|scene| scene.scene_id == scene_id)
			.map(|idx| (idx + 1, ranked[idx].display_score))
	};

	scene_ids
		.into_iter()
		.filter_map(|scene_id| {
			let in_a = find(a, scene_id);
			let in_b = find(b, scene_id);

			(in_a != in_b).then(|| SceneShift {
				scene_id: scene_id.to_string(),
				rank_a: in_a.map(|(rank, _)| rank),
				rank_b: in_b.map(|(rank, _)| rank),
				display_score_a: in_a.map(|(_, score)| score),
				display_score_b: in_b.map(|(_, score)| score),
			})
		})
		.collect()
}

fn eval_case(
	defaults: &EvalDefaults,
	query: &EvalQuery,
	args: &Args,
	index: usize,
) -> color_eyre::Result<EvalCase> {
	if query.expected_scene_ids.is_empty() {
		return Err(eyre::eyre!(
			"Query at index {index} must include at least one expected_scene_id."
		));
	}

	let owner_id = query
		.owner_id
		.clone()
		.or_else(|| defaults.owner_id.clone())
		.ok_or_else(|| eyre::eyre!("owner_id is required for query at index {index}."))?;

	Ok(EvalCase {
		id: query.id.clone().unwrap_or_else(|| format!("query-{index}")),
		expected_scene_ids: query.expected_scene_ids.clone(),
		request: SearchRequest {
			owner_id,
			query: query.query.clone(),
			language: query.language.clone().or_else(|| defaults.language.clone()),
			source_id: query.source_id.clone().or_else(|| defaults.source_id.clone()),
			person_id: query.person_id.clone(),
			limit: args.limit.or(query.limit).or(defaults.limit),
			min_score: None,
			weights: query.weights.or(defaults.weights),
			debug: true,
		},
		recording: query.replay.clone(),
	})
}
