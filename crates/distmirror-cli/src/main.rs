use atty::Stream;
use clap::Parser;
use color_eyre::Result;
use distmirror_core::{
    format_status_message, mirror_resolve, mirror_sync, to_json_response, CommandStatus,
    ExecutionOutcome, GlobalOptions, MirrorRequest, RunConfig, Selection, WorkspaceConfig,
};
use serde_json::{json, Value};

mod cli;
mod style;

use cli::{CommandCli, DistmirrorCli, RunArgs};
use style::Style;

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = DistmirrorCli::parse();
    init_tracing(cli.trace, cli.quiet, cli.verbose);

    let global = GlobalOptions {
        quiet: cli.quiet,
        verbose: cli.verbose,
        trace: cli.trace,
        json: cli.json,
    };

    let outcome = execute(&cli.command);
    let code = emit_output(&global, cli.no_color, cli.command.name(), &outcome)?;

    if code == 0 {
        Ok(())
    } else {
        std::process::exit(code);
    }
}

fn init_tracing(trace: bool, quiet: bool, verbose: u8) {
    let level = if trace {
        "trace"
    } else if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = format!("distmirror_core={level},distmirror_cli={level}");
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .with_writer(std::io::stderr)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn execute(command: &CommandCli) -> ExecutionOutcome {
    let request = match build_request(command) {
        Ok(request) => request,
        Err(err) => {
            return ExecutionOutcome::user_error(
                format!("{err:#}"),
                json!({
                    "reason": "invalid_configuration",
                    "hint": "Check --upstream, --prefix, and --origin.",
                }),
            )
        }
    };
    let result = match command {
        CommandCli::Resolve(_) => mirror_resolve(&request),
        CommandCli::Sync(args) => {
            let selection = if args.all {
                Selection::All
            } else if let Some(reference) = &args.reference {
                Selection::Reference(reference.clone())
            } else {
                Selection::Newest
            };
            mirror_sync(&request, &selection)
        }
    };
    result.unwrap_or_else(|err| {
        ExecutionOutcome::failure(format!("{err:#}"), json!({ "reason": "infrastructure" }))
    })
}

fn build_request(command: &CommandCli) -> anyhow::Result<MirrorRequest> {
    let args: &RunArgs = command.run_args();
    let config = RunConfig::new(&args.prefix, args.version, &args.upstream)?
        .with_origin(&args.origin)?
        .with_no_storage_download(args.no_storage_download)
        .with_import_key(args.group_by.into());
    let export_store = match command {
        CommandCli::Sync(sync) => sync.export_store.clone(),
        CommandCli::Resolve(_) => None,
    };
    Ok(MirrorRequest {
        config,
        workspace: WorkspaceConfig {
            workdir: args.workdir.clone(),
            blob_store: args.blob_store.clone(),
            export_store,
        },
    })
}

fn emit_output(
    global: &GlobalOptions,
    no_color: bool,
    command: &str,
    outcome: &ExecutionOutcome,
) -> Result<i32> {
    let code = outcome.status.exit_code();
    let style = Style::new(no_color, atty::is(Stream::Stdout));

    if global.json {
        let payload = to_json_response(command, outcome);
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else if !global.quiet {
        let message = format_status_message(command, &outcome.message);
        println!("{}", style.status(outcome.status, &message));
        if let Some(hint) = hint_from_details(&outcome.details) {
            let hint_line = format!("Hint: {hint}");
            println!("{}", style.info(&hint_line));
        }
        if outcome.status == CommandStatus::Ok {
            if let Some(table) = render_details(&style, command, &outcome.details) {
                println!("{table}");
            }
        }
    }

    Ok(code)
}

fn hint_from_details(details: &Value) -> Option<&str> {
    details
        .as_object()
        .and_then(|map| map.get("hint"))
        .and_then(Value::as_str)
}

fn render_details(style: &Style, command: &str, details: &Value) -> Option<String> {
    match command {
        "resolve" => render_candidates(style, details.get("candidates")?.as_array()?),
        "sync" => render_references(details.get("references")?.as_array()?),
        _ => None,
    }
}

fn render_candidates(style: &Style, candidates: &[Value]) -> Option<String> {
    if candidates.is_empty() {
        return None;
    }
    let mut rows = Vec::new();
    for candidate in candidates {
        rows.push([
            candidate.get("timestamp")?.as_str()?.to_string(),
            candidate.get("import_name")?.as_str()?.to_string(),
            candidate.get("reference")?.as_str()?.to_string(),
        ]);
    }
    let headers = ["Timestamp", "Import", "Reference"];
    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.len());
        }
    }
    let format_row = |cells: [&str; 3]| {
        format!(
            "{:<w0$}  {:<w1$}  {}",
            cells[0],
            cells[1],
            cells[2],
            w0 = widths[0],
            w1 = widths[1],
        )
    };

    let mut lines = vec![style.table_header(&format_row(headers))];
    lines.push(format!(
        "{:-<w0$}  {:-<w1$}  {:-<w2$}",
        "",
        "",
        "",
        w0 = widths[0],
        w1 = widths[1],
        w2 = widths[2],
    ));
    for row in &rows {
        lines.push(format_row([&row[0], &row[1], &row[2]]));
    }
    Some(lines.join("\n"))
}

fn render_references(references: &[Value]) -> Option<String> {
    let mut lines = Vec::new();
    for reference in references {
        let name = reference.get("reference")?.as_str()?;
        let sources = reference.get("sources")?.as_array()?;
        let tiers = reference.get("tiers")?;
        let count = |tier: &str| tiers.get(tier).and_then(Value::as_u64).unwrap_or(0);
        lines.push(format!(
            "  {name}: {} source(s) (cache {}, store {}, origin {})",
            sources.len(),
            count("cache"),
            count("store"),
            count("origin"),
        ));
        for source in sources {
            lines.push(format!(
                "    {} {} {}",
                source.get("hash_function")?.as_str()?,
                source.get("hash")?.as_str()?,
                source.get("path")?.as_str()?,
            ));
        }
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}
