mod calc;
mod classes;
mod config;
mod grading;
mod ipc;
mod letters;
mod logging;
mod marks;
mod term;

use serde_json::json;
use std::io::{self, BufRead, Write};
use tracing::{info, info_span, warn};

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = config::DaemonConfig::from_env()?;
    logging::init_tracing(&config.log_filter);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        quarter_weight = config.default_quarter_weight,
        pass_mark = config.pass_mark,
        "reportcardd ready"
    );

    let mut state = ipc::AppState::new(config);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(_) => break,
        };
        if line.trim().is_empty() {
            continue;
        }

        let req: ipc::Request = match serde_json::from_str(&line) {
            Ok(v) => v,
            Err(e) => {
                // No id to echo back.
                warn!(error = %e, "bad request line");
                let resp = json!({
                    "ok": false,
                    "error": { "code": "bad_json", "message": e.to_string() },
                });
                let _ = writeln!(stdout, "{}", resp);
                let _ = stdout.flush();
                continue;
            }
        };

        let span = info_span!("request", id = %req.id, method = %req.method);
        let resp = span.in_scope(|| ipc::handle_request(&mut state, req));
        let _ = writeln!(
            stdout,
            "{}",
            serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string())
        );
        let _ = stdout.flush();
    }

    info!("stdin closed, shutting down");
    Ok(())
}
