// Command implementations for the match-analysis binary
use match_analysis::progress::{JobProgress, Spinner};
use match_analysis::{
    AnalysisConfig, AnalysisResult, EnrichmentEngine, JobOptions, JobResults, JobScheduler,
    PriceReferenceIndex, RecordedJob, ReferencePricePoint, ReplayEngine, StatsOptions,
    TokenRegistry, Trade, TradeDataset,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Input files shared by `run` and `enrich`
pub struct Inputs {
    pub trades: PathBuf,
    pub recorded: PathBuf,
    pub prices: Option<PathBuf>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> AnalysisResult<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

fn write_json<T: Serialize>(value: &T, out: Option<&Path>) -> AnalysisResult<()> {
    match out {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, value)?;
            writer.flush()?;
            info!("💾 Wrote {}", path.display());
        }
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, value)?;
            writeln!(handle)?;
        }
    }
    Ok(())
}

pub fn init_config(config_path: &str, force: bool) -> AnalysisResult<()> {
    info!("🔧 Initializing configuration...");

    if force || !Path::new(config_path).exists() {
        AnalysisConfig::default().to_file(config_path)?;
        info!("📝 Created {}", config_path);
    } else {
        warn!("⚠️  {} already exists, skipping", config_path);
    }

    info!("💡 Next steps:");
    info!("   1. Edit the [[jobs]] in {}", config_path);
    info!("   2. Run: match-analysis run --trades trades.json --recorded engine.json");
    Ok(())
}

pub fn list_tokens(chain: &str, pairs: bool) -> AnalysisResult<()> {
    let registry = TokenRegistry::for_chain(chain)?;
    info!("🪙 Tokens on {}", registry.chain());

    for token in registry.tokens() {
        info!("   {:<8} {} ({})", token.symbol.to_uppercase(), token.address, token.class);
    }

    if pairs {
        let defaults = registry.default_pairs()?;
        if defaults.is_empty() {
            warn!("⚠️  No default pairs for {}", registry.chain());
        }
        for pair in defaults {
            info!(
                "   [{}] {}/{}",
                pair.class,
                registry.symbol(&pair.base)?.to_uppercase(),
                registry.symbol(&pair.quote)?.to_uppercase()
            );
        }
    }
    Ok(())
}

fn build_scheduler(
    config: &AnalysisConfig,
    dataset: TradeDataset,
    prices: Option<PriceReferenceIndex>,
    registry: Option<&TokenRegistry>,
) -> AnalysisResult<JobScheduler> {
    let mut scheduler = JobScheduler::new(dataset, prices);

    if config.jobs.is_empty() {
        let Some(registry) = registry else {
            warn!("⚠️  No jobs configured and no chain set");
            return Ok(scheduler);
        };
        info!("📋 No jobs configured, using default pairs for {}", registry.chain());
        for pair in registry.default_pairs()? {
            scheduler.add_job(&pair.base, &pair.quote, vec![JobOptions::continuous()], None)?;
        }
        return Ok(scheduler);
    }

    for job in &config.jobs {
        let (base, quote) = job.resolve(registry)?;
        scheduler.add_job(&base, &quote, job.options.clone(), None)?;
    }
    Ok(scheduler)
}

fn execute(
    config: &AnalysisConfig,
    inputs: &Inputs,
) -> AnalysisResult<(JobResults, Option<PriceReferenceIndex>)> {
    let spinner = Spinner::new("Loading inputs...");

    let trades: Vec<Trade> = read_json(&inputs.trades)?;
    let dataset = TradeDataset::new(trades);
    let prices = match &inputs.prices {
        Some(path) => {
            let points: Vec<ReferencePricePoint> = read_json(path)?;
            Some(PriceReferenceIndex::new(points)?)
        }
        None => None,
    };
    let recordings: Vec<RecordedJob> = read_json(&inputs.recorded)?;
    let engine = ReplayEngine::from_recordings(recordings);

    spinner.update(&format!("Loaded {} trades", dataset.len()));
    if let Some((start, end)) = dataset.time_range() {
        info!("🕒 Trades from {} to {}", start, end);
    }

    let registry = config.registry()?;
    let symbols = registry.as_ref().map(TokenRegistry::symbol_lookup);
    let scheduler = build_scheduler(config, dataset, prices, registry.as_ref())?;

    spinner.update(&format!("Running {} job(s)...", scheduler.jobs().len()));
    let results = match scheduler.execute(&engine, symbols.as_ref()) {
        Ok(results) => results,
        Err(e) => {
            spinner.finish_with_error(&e.to_string());
            return Err(e);
        }
    };
    spinner.finish(&format!("{} job(s) with matches", results.len()));

    let (_, prices) = scheduler.into_parts();
    Ok((results, prices))
}

pub fn run_analysis(
    config: &AnalysisConfig,
    inputs: &Inputs,
    trim_outliers: bool,
    out: Option<&Path>,
) -> AnalysisResult<()> {
    let (results, prices) = execute(config, inputs)?;

    let enricher = EnrichmentEngine::from_settings(&config.analysis);
    let mut options = StatsOptions::from_settings(&config.analysis);
    if trim_outliers {
        options = options.trimmed();
    }

    let progress = JobProgress::new(results.len());
    let rows = results.aggregated_stats_with(&enricher, prices.as_ref(), &options, |job_id, ok| {
        progress.record(job_id, ok)
    });
    progress.finish(rows.len());

    for row in &rows {
        info!("📈 Job {} {} (batch {}s)", row.job_id, row.pair, row.batch_duration);
        for line in row.stats.to_string().lines() {
            info!("   {}", line);
        }
    }

    write_json(&rows, out)
}

pub fn enrich_job(
    config: &AnalysisConfig,
    inputs: &Inputs,
    job_id: u64,
    out: Option<&Path>,
) -> AnalysisResult<()> {
    let (results, prices) = execute(config, inputs)?;
    let job = results.get(job_id)?;

    let enricher = EnrichmentEngine::from_settings(&config.analysis);
    let enriched = job.enrich(&enricher, prices.as_ref())?;
    info!(
        "🔎 Job {} ({}): {} trades, {} matched",
        job_id,
        job.pair,
        enriched.len(),
        enriched.iter().filter(|t| t.is_matched).count()
    );

    write_json(&enriched, out)
}
