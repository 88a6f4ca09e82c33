use std::env;
use std::path::PathBuf;
use tracing::{error, warn};
use tracing_subscriber::{fmt, EnvFilter};

use factsheet_service::{
    sample::sample_table, services::write_artifacts, FactsheetRequest, FactsheetService,
    SchemaProfile, Table,
};

const USAGE: &str =
    "Usage: factsheet-cli (<data.csv> | --sample) [--out DIR] [--logo PATH] [--template PATH] [--extended]";

struct Args {
    csv: Option<PathBuf>,
    sample: bool,
    out: PathBuf,
    logo: Option<PathBuf>,
    template: Option<PathBuf>,
    profile: SchemaProfile,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args {
        csv: None,
        sample: false,
        out: PathBuf::from("factsheets"),
        logo: None,
        template: None,
        profile: SchemaProfile::Standard,
    };

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--out" | "--logo" | "--template" => {
                i += 1;
                let value = args
                    .get(i)
                    .map(PathBuf::from)
                    .ok_or_else(|| format!("'{}' option requires a value", flag))?;
                match flag {
                    "--out" => parsed.out = value,
                    "--logo" => parsed.logo = Some(value),
                    _ => parsed.template = Some(value),
                }
            }
            "--extended" => parsed.profile = SchemaProfile::Extended,
            "--sample" => parsed.sample = true,
            "-h" | "--help" => return Err(USAGE.to_string()),
            unknown if unknown.starts_with('-') => {
                return Err(format!("Unknown option '{}'\n{}", unknown, USAGE));
            }
            path => {
                if parsed.csv.is_some() {
                    return Err("Multiple files specified. Only one CSV expected.".to_string());
                }
                parsed.csv = Some(PathBuf::from(path));
            }
        }
        i += 1;
    }

    if parsed.csv.is_none() && !parsed.sample {
        return Err(USAGE.to_string());
    }
    Ok(parsed)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    let raw: Vec<String> = env::args().collect();
    let args = match parse_args(&raw) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            std::process::exit(2);
        }
    };

    let table = match &args.csv {
        Some(path) => Table::from_path(path)?,
        None => sample_table()?,
    };

    let mut request = FactsheetRequest::new(table).with_profile(args.profile);
    if let Some(path) = &args.logo {
        request = request.with_logo(std::fs::read(path)?);
    }
    if let Some(path) = &args.template {
        request = request.with_template(std::fs::read_to_string(path)?);
    }

    let report = match FactsheetService::new().generate(&request) {
        Ok(report) => report,
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    };

    for w in &report.warnings {
        warn!(row = w.row + 1, fund = %w.fund_name, "{}", w.message);
    }

    let written = write_artifacts(&report, &args.out)?;
    for path in &written {
        println!("{}", path.display());
    }

    if let Some(reason) = &report.aborted {
        error!("{}", reason);
        std::process::exit(1);
    }
    Ok(())
}
