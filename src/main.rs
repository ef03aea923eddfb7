use apiconform::http::parse_cookie_header;
use apiconform::{CaptureMode, Report, Request, Response, Validator};
use clap::{Parser, ValueEnum};
use log::debug;
use std::error::Error;
use std::process::ExitCode;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Call an API endpoint and check the exchange against its OpenAPI contract
#[derive(Debug, Parser)]
#[command(name = "apiconform", version)]
struct Cli {
    /// API endpoint URL
    url: String,

    /// HTTP method
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// HTTP request body
    #[arg(short = 'd', long)]
    data: Option<String>,

    /// Custom header, `Name: value` (repeatable)
    #[arg(short = 'H', long = "headers")]
    headers: Vec<String>,

    /// Cookies, `a=1; b=2` (repeatable)
    #[arg(short = 'b', long = "cookie")]
    cookies: Vec<String>,

    /// OpenAPI document file or URL
    #[arg(short = 's', long)]
    schema: String,

    /// Connection timeout in seconds
    #[arg(long, default_value_t = 60)]
    connect_timeout: u64,

    /// Base URL to route against instead of the document's servers (repeatable)
    #[arg(long = "server")]
    servers: Vec<String>,

    /// Let path parameters span `/` like `.*` instead of one segment
    #[arg(long)]
    greedy_path_params: bool,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    let validator = match build_validator(&cli) {
        Ok(validator) => validator,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    let request = match build_request(&cli) {
        Ok(request) => request,
        Err(err) => {
            eprintln!("{err}");
            return ExitCode::from(2);
        }
    };

    let client = match reqwest::blocking::Client::builder()
        .connect_timeout(Duration::from_secs(cli.connect_timeout))
        .build()
    {
        Ok(client) => client,
        Err(err) => {
            eprintln!("Failed to create HTTP client: {err}");
            return ExitCode::from(2);
        }
    };

    let report = validator.validate_exchange(&request, |request| send(&client, request));
    if let Err(err) = print_report(&report, cli.output) {
        eprintln!("Failed to render report: {err}");
        return ExitCode::from(2);
    }

    if report.has_errors() {
        ExitCode::from(1)
    } else {
        ExitCode::SUCCESS
    }
}

fn build_validator(cli: &Cli) -> Result<Validator, Box<dyn Error>> {
    let mut builder = Validator::builder().location(&cli.schema)?;
    if cli.greedy_path_params {
        builder = builder.capture_mode(CaptureMode::Greedy);
    }
    if !cli.servers.is_empty() {
        builder = builder.servers(cli.servers.clone());
    }
    Ok(builder.build()?)
}

fn build_request(cli: &Cli) -> Result<Request, Box<dyn Error>> {
    let mut request = Request::new(&cli.method, &cli.url)
        .map_err(|err| format!("Invalid URL \"{}\": {err}", cli.url))?;

    let mut headers = Vec::new();
    for raw in &cli.headers {
        headers.push(parse_header(raw)?);
    }
    for default in ["Content-Type", "Accept"] {
        if !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case(default)) {
            headers.push((default.to_string(), "application/json".to_string()));
        }
    }
    for (name, value) in headers {
        request = request.with_header(&name, value);
    }

    if !cli.cookies.is_empty() {
        for (name, value) in cli.cookies.iter().flat_map(|raw| parse_cookie_header(raw)) {
            request = request.with_cookie(&name, value);
        }
        request = request.with_header("Cookie", cli.cookies.join("; "));
    }

    if let Some(data) = &cli.data {
        request = request.with_body(data.clone());
    }
    Ok(request)
}

/// `Name: value`, optionally wrapped in single quotes
fn parse_header(raw: &str) -> Result<(String, String), String> {
    let trimmed = raw.trim().trim_start_matches('\'').trim_end_matches('\'');
    match trimmed.split_once(':') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.trim().to_string()))
        }
        _ => Err(format!("Invalid header \"{raw}\", expected \"Name: value\"")),
    }
}

fn send(client: &reqwest::blocking::Client, request: &Request) -> Result<Response, Box<dyn Error>> {
    let method = reqwest::Method::from_bytes(request.method().as_bytes())?;
    let mut builder = client.request(method, request.url().clone());
    for (name, values) in request.headers() {
        for value in values {
            builder = builder.header(name, value);
        }
    }
    if let Some(body) = request.body() {
        builder = builder.body(body.to_string());
    }

    let started = Instant::now();
    let reply = builder.send()?;
    let mut response = Response::new(reply.status().as_u16());
    for (name, value) in reply.headers() {
        if let Ok(value) = value.to_str() {
            response = response.with_header(name.as_str(), value);
        }
    }
    let body = reply.text()?;
    debug!(
        "{} {} answered {} in {:?}",
        request.method(),
        request.url(),
        response.status,
        started.elapsed()
    );

    Ok(response.with_body(body))
}

fn print_report(report: &Report, format: OutputFormat) -> Result<(), serde_json::Error> {
    match format {
        OutputFormat::Text => {
            for line in report.lines() {
                println!("{line}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_header() {
        assert_eq!(
            parse_header("'X-Api-Key: abc:def'").unwrap(),
            ("X-Api-Key".to_string(), "abc:def".to_string())
        );
        assert!(parse_header("no-colon").is_err());
        assert!(parse_header(": value").is_err());
    }

    #[test]
    fn test_build_request_adds_json_defaults() {
        let cli = Cli::parse_from([
            "apiconform",
            "http://localhost/pets?limit=1",
            "-s",
            "openapi.json",
            "-H",
            "accept: text/plain",
            "-b",
            "session=abc",
        ]);
        let request = build_request(&cli).unwrap();

        assert_eq!(request.method(), "GET");
        assert_eq!(request.header("Accept").unwrap(), ["text/plain"]);
        assert_eq!(request.header("Content-Type").unwrap(), ["application/json"]);
        assert_eq!(request.cookies()["session"], vec!["abc"]);
        assert_eq!(request.header("cookie").unwrap(), ["session=abc"]);
    }
}
