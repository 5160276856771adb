use std::io::Read;
use std::sync::Arc;

use composition_engine::rendering::UriTemplateProvider;
use composition_engine::{EngineConfig, LibraryError, QualityTier, Time, TimeRange};

const USAGE: &str = "usage: cli [--tier proxy|original] [--start SECS] [--end SECS] \
                     [--config FILE] [--media-template URI] < timeline.json";

struct Args {
    tier: QualityTier,
    start: Option<Time>,
    end: Option<Time>,
    config: Option<String>,
    template: String,
}

fn seconds(flag: &str, value: Option<String>) -> Result<Time, LibraryError> {
    let raw = value.ok_or_else(|| LibraryError::InvalidArgument(format!("{flag} needs a value")))?;
    let secs: f64 = raw
        .parse()
        .map_err(|_| LibraryError::InvalidArgument(format!("{flag}: '{raw}' is not a number")))?;
    Ok(Time::from_secs_f64(secs))
}

fn parse_args(args: Vec<String>) -> Result<Args, LibraryError> {
    let mut parsed = Args {
        tier: QualityTier::Original,
        start: None,
        end: None,
        config: None,
        template: "media://{media}/{tier}".to_string(),
    };
    let mut iter = args.into_iter().skip(1);
    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--tier" => {
                let value = iter.next().unwrap_or_default();
                parsed.tier = value.parse().map_err(LibraryError::InvalidArgument)?;
            }
            "--start" => parsed.start = Some(seconds("--start", iter.next())?),
            "--end" => parsed.end = Some(seconds("--end", iter.next())?),
            "--config" => parsed.config = iter.next(),
            "--media-template" => {
                parsed.template = iter
                    .next()
                    .ok_or_else(|| LibraryError::InvalidArgument(USAGE.to_string()))?;
            }
            _ => return Err(LibraryError::InvalidArgument(USAGE.to_string())),
        }
    }
    Ok(parsed)
}

fn main() -> Result<(), LibraryError> {
    env_logger::init();
    let args = parse_args(std::env::args().collect())?;

    let config = match &args.config {
        Some(path) => EngineConfig::from_toml_str(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };

    let mut document = String::new();
    std::io::stdin().read_to_string(&mut document)?;

    let range = match (args.start, args.end) {
        (None, None) => None,
        (start, end) => Some(TimeRange::new(
            start.unwrap_or(Time::ZERO),
            end.unwrap_or(Time::MAX),
        )),
    };
    let provider = Arc::new(UriTemplateProvider::new(args.template));
    let plan = composition_engine::resolve_document(&document, provider, &config, args.tier, range)?;
    log::info!(
        "Resolved {} instructions over {}",
        plan.instructions.len(),
        plan.range
    );
    println!("{}", plan.to_json()?);
    Ok(())
}
